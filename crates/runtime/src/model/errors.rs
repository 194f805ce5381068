use thiserror::Error;

/// Why a model call produced no response.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ModelError {
    /// The request never got an HTTP answer (DNS, connect, timeout).
    #[error("network: {0}")]
    Network(String),

    /// The provider answered with a non-success status.
    #[error("provider returned {status}: {body}")]
    Api { status: u16, body: String },

    /// The provider answered 2xx with a body we cannot use.
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}
