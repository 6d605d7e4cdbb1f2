pub mod config;
pub mod db;
pub mod error;
pub mod game;
pub mod http;
pub mod metrics;
pub mod protocol;
pub mod reconciler;
pub mod roles;
pub mod transport;
pub mod validation;
pub mod ws;
