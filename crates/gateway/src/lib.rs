//! Gateway: HTTP server exposing the first-run initialization routes.
//!
//! Lifecycle:
//! 1. Load + validate config
//! 2. Open the store (runs migrations) and the flag record
//! 3. Serve `/health` and `/api/system/*` until shutdown
//! 4. Close the store

pub mod server;
pub mod state;
pub mod system_routes;
