//! Local decoding of a bearer token's claims payload.
//!
//! Tokens are JWTs: `header.payload.signature`, each segment
//! base64url-encoded. Nothing here checks the signature or the `exp` claim.

use jsonwebtoken::{Algorithm, DecodingKey, Validation};

use crate::{Claims, DecodeError};

/// Decodes the permission and role claims embedded in `token`.
///
/// Trailing padding (`=`) on a segment is tolerated, since some issuers
/// emit it.
///
/// # Errors
/// - [`DecodeError::Segments`] if the token does not have three segments
/// - [`DecodeError::Token`] if the header or payload cannot be read
///
/// # Example
///
/// ```rust
/// use keyward_claims::decode;
///
/// // {"permissions":["metrics.list"],"roles":["editor"]}
/// let token = "eyJhbGciOiJIUzI1NiJ9.\
///     eyJwZXJtaXNzaW9ucyI6WyJtZXRyaWNzLmxpc3QiXSwicm9sZXMiOlsiZWRpdG9yIl19.\
///     sig";
/// let claims = decode(token).unwrap();
/// assert!(claims.permissions.contains("metrics.list"));
/// ```
pub fn decode(token: &str) -> Result<Claims, DecodeError> {
    let segments: Vec<&str> = token
        .trim()
        .split('.')
        .map(|segment| segment.trim_end_matches('='))
        .collect();
    if segments.len() != 3 {
        return Err(DecodeError::Segments(segments.len()));
    }

    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();
    validation.insecure_disable_signature_validation();

    let data = jsonwebtoken::decode::<Claims>(
        &segments.join("."),
        &DecodingKey::from_secret(&[]),
        &validation,
    )?;
    Ok(data.claims)
}
