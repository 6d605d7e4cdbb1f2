pub mod assign;
pub mod catalog;
