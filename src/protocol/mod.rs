//! `tablegate` Protocol
//!
//! HTTP surface over the CRUD handler.
//!
//! # Architecture
//!
//! ```text
//! +-------------------------------------------------------------+
//! |                    tablegate Protocol                        |
//! +-------------------------------------------------------------+
//! |  HTTP Endpoints:                                            |
//! |    - /crud/:table, /crud/:table/:item_id: generic CRUD       |
//! |    - /sql: raw passthrough (operator only)                  |
//! |    - /, /health, /live, /ready: health checks               |
//! +-------------------------------------------------------------+
//! |  Errors: GatewayError -> RestError -> {"detail": ...}       |
//! +-------------------------------------------------------------+
//! ```
//!
//! # Module Structure
//!
//! - `error` - Gateway error taxonomy
//! - `handler` - Handler implementing the request state machine
//! - `rest` - REST API handlers and routing

pub mod error;
pub mod handler;
pub mod rest;

pub use error::{GatewayError, GatewayResult};
pub use handler::{Handler, DEFAULT_ID_COLUMN};

/// Default HTTP server port
pub const DEFAULT_PORT: u16 = 8000;
