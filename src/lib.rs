pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod middleware;
pub mod proxy;
pub mod server;
pub mod state;

pub use error::ApiError;
pub use server::app;
pub use state::AppState;
