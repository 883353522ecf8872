//! Gateway: HTTP server for the mail webhook.
//!
//! `POST /gmail/inbound` takes one forwarded message and commits it; `GET /health` is the
//! liveness check. Each request is handled independently; the store arbitrates concurrent writes.

mod protocol;
mod server;

pub use protocol::{ErrorResponse, HealthResponse, InboundResponse};
pub use server::{build_router, run_gateway, GatewayState, WEBHOOK_TOKEN_HEADER};
