//! Access gate for inbound requests.
//!
//! Callers present `Authorization: Bearer <secret>`. The secret is compared
//! against the named endpoint's configured secret in constant time. A missing
//! header, a different scheme and a wrong token all produce the same
//! [`ConflagentError::Unauthorized`].

pub mod middleware;

pub use middleware::{AuthorizedEndpoint, EndpointAuth};

use crate::endpoint::Endpoint;
use crate::error::{ConflagentError, ConflagentResult};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

const BEARER_PREFIX: &str = "Bearer ";

/// Extract the token from an `Authorization` header value.
pub fn parse_bearer(header: &str) -> Option<&str> {
    let token = header.strip_prefix(BEARER_PREFIX)?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Both sides are digested first so the comparison time does not depend on
/// the secret's length.
fn secrets_match(presented: &str, expected: &str) -> bool {
    let presented = Sha256::digest(presented.as_bytes());
    let expected = Sha256::digest(expected.as_bytes());
    bool::from(presented.as_slice().ct_eq(expected.as_slice()))
}

/// Check the presented header against the endpoint's shared secret.
pub fn authenticate(endpoint: &Endpoint, presented_header: Option<&str>) -> ConflagentResult<()> {
    let token = presented_header.and_then(parse_bearer).unwrap_or("");
    // Compare even when the header is absent so every rejection costs the same.
    let matched = secrets_match(token, &endpoint.shared_secret);
    if matched && !token.is_empty() {
        Ok(())
    } else {
        Err(ConflagentError::Unauthorized)
    }
}

/// Reject a request for an endpoint name that is not configured, spending the
/// same work as a real comparison.
pub fn reject_unknown(presented_header: Option<&str>) -> ConflagentError {
    let token = presented_header.and_then(parse_bearer).unwrap_or("");
    let _ = secrets_match(token, "");
    ConflagentError::Unauthorized
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(secret: &str) -> Endpoint {
        Endpoint {
            name: "team-a".to_string(),
            base_url: "https://wiki.example.com".to_string(),
            email: "bot@example.com".to_string(),
            api_token: "token".to_string(),
            space_key: "TEAM".to_string(),
            root_page_id: "1".to_string(),
            shared_secret: secret.to_string(),
        }
    }

    #[test]
    fn parses_bearer_header() {
        assert_eq!(parse_bearer("Bearer abc"), Some("abc"));
        assert_eq!(parse_bearer("Bearer   abc  "), Some("abc"));
        assert_eq!(parse_bearer("Bearer "), None);
        assert_eq!(parse_bearer("Basic abc"), None);
        assert_eq!(parse_bearer("abc"), None);
    }

    #[test]
    fn accepts_matching_secret() {
        assert!(authenticate(&endpoint("s3cret"), Some("Bearer s3cret")).is_ok());
    }

    #[test]
    fn rejections_are_indistinguishable() {
        let ep = endpoint("s3cret");
        let outcomes = [
            authenticate(&ep, None),
            authenticate(&ep, Some("Basic s3cret")),
            authenticate(&ep, Some("Bearer wrong")),
            authenticate(&ep, Some("Bearer s3cre")),
        ];
        for outcome in outcomes {
            assert!(matches!(outcome, Err(ConflagentError::Unauthorized)));
        }
    }

    #[test]
    fn unknown_endpoint_is_unauthorized() {
        assert!(matches!(
            reject_unknown(Some("Bearer anything")),
            ConflagentError::Unauthorized
        ));
    }
}
