//! Error types for the claims layer.

/// Errors that can occur while decoding a bearer token's claims.
///
/// Only structural problems are reported here. A token whose signature
/// would not verify, or which has already expired, still decodes fine:
/// judging that is the API server's job.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The token is not made of `header.payload.signature`.
    #[error("malformed token: expected 3 segments, found {0}")]
    Segments(usize),

    /// A segment is not base64url, the header names no known algorithm, or
    /// the payload is not a JSON claims object.
    #[error("malformed token: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}
