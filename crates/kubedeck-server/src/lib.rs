//! kubedeck Server - REST surface over the resource gateway
//!
//! Routes translate requests into gateway and orchestrator calls and map the
//! error taxonomy onto HTTP status codes. Nothing below this crate knows about HTTP.

pub mod config;
pub mod error;
pub mod routes;
pub mod startup;
pub mod state;

pub use config::ServerConfig;
pub use error::{ApiError, ErrorMessage};
pub use startup::{Application, configure_routes, cors_headers, run};
pub use state::AppState;
