//! Tapwire API
//!
//! Admin HTTP surface for the tapwire control plane, built on Axum.
//!
//! # Endpoints
//!
//! - `POST /tap` - attach a tap session. The JSON body carries
//!   `{config_id, tap_config}`. On success the response streams
//!   captured trace records as plain text and stays open until the
//!   client disconnects, which detaches the session. Attach failures
//!   (already attached, missing or malformed body, unknown config id)
//!   are `400` with a plain-text message.
//! - `GET /tap/config_ids` - newline-separated list of config ids
//!   currently registered, unordered, empty body if none.
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use tapwire_api::{build_router, AppState};
//! use tapwire_core::{ConfigIdRegistry, TapSessionManager};
//!
//! let registry = Arc::new(ConfigIdRegistry::new());
//! let sessions = TapSessionManager::new(Arc::clone(&registry));
//! let app = build_router(AppState { registry, sessions });
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:9901").await?;
//! axum::serve(listener, app).await?;
//! ```

pub mod error;
pub mod routes;
pub mod state;
pub mod transport;

pub use error::{ApiError, Result};
pub use routes::build_router;
pub use state::AppState;
pub use transport::ChannelStream;
