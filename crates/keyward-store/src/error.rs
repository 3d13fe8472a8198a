/// Errors that can occur when writing to a session store.
///
/// `Clone` because a store failure during a token refresh is fanned out to
/// every request waiting on that refresh.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The cookie name is empty or contains characters a cookie name
    /// cannot hold.
    #[error("invalid cookie name: {0:?}")]
    InvalidName(String),

    /// The value contains characters that are not legal in a cookie value
    /// (whitespace, `;`, `,`, `"`, `\` or control characters).
    #[error("invalid value for cookie {0:?}")]
    InvalidValue(String),

    /// The retention window does not fit a cookie `Max-Age`.
    #[error("retention window out of range for cookie {0:?}")]
    MaxAgeOutOfRange(String),
}
