//! Error taxonomy for the backend. Most of these are logged and
//! swallowed at the call site rather than propagated — they describe
//! per-connection or per-frame failures that must never take down the
//! simulator.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("buffer exhausted while decoding {0}")]
    UnexpectedEof(&'static str),
    #[error("string field exceeded max length ({len} > {max})")]
    StringTooLong { len: usize, max: usize },
    #[error("unknown frame tag {0}")]
    UnknownTag(u8),
}

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] axum::Error),
    #[error("read deadline exceeded")]
    ReadTimeout,
    #[error("send channel closed or saturated")]
    SendChannelFull,
    #[error("malformed client message: {0}")]
    MalformedMessage(#[from] serde_json::Error),
}
