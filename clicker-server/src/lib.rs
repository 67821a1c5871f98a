pub use crate::{
    config::ServerConfig,
    database::Database,
    error::ServerError,
    http::{AppState, router},
    server::ClickerServer,
};

pub mod config;
pub mod database;
pub mod error;
mod http;
mod pages;
pub mod password;
mod server;
mod session;
