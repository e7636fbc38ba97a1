//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID)
//!     → instrumentation.rs (access log, latency/status metrics)
//!     → handlers.rs
//!         /         → workload generator
//!         /metrics  → Prometheus scrape
//!         /config   → active snapshot
//!         anything else → workload generator
//! ```

pub mod handlers;
pub mod instrumentation;
pub mod request;
pub mod server;

pub use handlers::ConfigStatus;
pub use request::{MakeRequestUuid, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
