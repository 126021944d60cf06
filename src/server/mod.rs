//! HTTP layer: webhook endpoint and admin/test endpoints.
//!
//! The layer is deliberately thin; it maps typed service outcomes onto
//! status codes and JSON bodies. All decision logic lives in the webhook
//! service and the forge port.

mod routes;

pub use routes::{AppState, router};
