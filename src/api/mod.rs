//! REST API over the tool registry
//!
//! - `GET /health`
//! - `GET /tools`
//! - `POST /tools/:name` with a flat JSON body of series and parameters

pub mod routes;

pub use routes::{router, serve, ApiConfig, AppState};
