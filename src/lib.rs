pub mod adapters;
pub mod api;
pub mod app;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod messaging;
pub mod services;

pub use app::{Application, Ports};
pub use config::AppConfig;
pub use error::{PensionError, Result};
