pub mod account_repo;
pub mod models;
pub mod room_repo;
