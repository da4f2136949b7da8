//! Error types for the tap control plane

use thiserror::Error;

use crate::component::TraceFormat;

/// Errors that can occur in the tap control plane
///
/// Caller-contract violations (duplicate registration, unregistering a
/// component that is not registered) are panics, not variants here:
/// they indicate a programming error in a component's lifecycle code.
#[derive(Error, Debug)]
pub enum TapError {
    /// An admin tap session is already attached
    #[error("an attached tap session already exists; detach it first")]
    AlreadyAttached,

    /// The attach request carried no tap configuration payload
    #[error("tap request requires a tap_config payload")]
    MissingTapConfig,

    /// No component has registered under the requested config id
    #[error("unknown config_id '{0}'; no component has registered with this id")]
    UnknownConfigId(String),

    /// The requested trace output format is not implemented
    #[error("unsupported trace output format '{0}'")]
    UnsupportedFormat(TraceFormat),

    /// Rendering a trace record failed
    #[error("failed to render trace record: {0}")]
    Render(#[from] serde_json::Error),
}

/// Result type for tap operations
pub type Result<T> = std::result::Result<T, TapError>;
