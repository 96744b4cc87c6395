use thiserror::Error;

/// Closed failure taxonomy for the upstream WMS. Callers (the order job
/// processor, the HTTP handlers) match on the variant, never on message
/// wording.
#[derive(Debug, Clone, Error)]
pub enum WmsError {
    #[error("wms unauthorized")]
    Unauthorized,
    #[error("wms rate limited")]
    RateLimited,
    #[error("wms bad request: {message}")]
    BadRequest { message: String },
    #[error("wms resource not found")]
    NotFound,
    #[error("wms unavailable (status {status})")]
    Unavailable { status: u16 },
    #[error("wms unreachable: {message}")]
    Network { message: String },
    #[error("wms unexpected response (status {status}): {message}")]
    Unknown { status: u16, message: String },
}

impl WmsError {
    /// Map an HTTP response status (plus the upstream body, for context)
    /// into the taxonomy. 401 handling (token invalidation) happens at the
    /// call site; this is pure classification.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            400 => WmsError::BadRequest { message: body },
            401 => WmsError::Unauthorized,
            404 => WmsError::NotFound,
            429 => WmsError::RateLimited,
            500 | 502 | 503 | 504 => WmsError::Unavailable { status },
            _ => WmsError::Unknown {
                status,
                message: body,
            },
        }
    }

    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() || err.is_request() {
            return WmsError::Network {
                message: err.to_string(),
            };
        }
        match err.status() {
            Some(status) => WmsError::from_status(status.as_u16(), err.to_string()),
            None => WmsError::Network {
                message: err.to_string(),
            },
        }
    }

    /// Whether the condition is expected to resolve on its own.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            WmsError::RateLimited
                | WmsError::Unavailable { .. }
                | WmsError::Network { .. }
                | WmsError::Unauthorized
        )
    }

    /// Whether an idempotent GET should be re-issued by the client's own
    /// backoff loop. Narrower than `is_transient`: a 401 is handled by
    /// clearing the token, not by replaying the same call.
    pub fn retriable_get(&self) -> bool {
        matches!(
            self,
            WmsError::RateLimited | WmsError::Unavailable { .. } | WmsError::Network { .. }
        )
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            WmsError::Unauthorized => Some(401),
            WmsError::RateLimited => Some(429),
            WmsError::BadRequest { .. } => Some(400),
            WmsError::NotFound => Some(404),
            WmsError::Unavailable { status } => Some(*status),
            WmsError::Unknown { status, .. } => Some(*status),
            WmsError::Network { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_is_stable() {
        assert!(matches!(
            WmsError::from_status(400, "bad".into()),
            WmsError::BadRequest { .. }
        ));
        assert!(matches!(
            WmsError::from_status(401, String::new()),
            WmsError::Unauthorized
        ));
        assert!(matches!(
            WmsError::from_status(404, String::new()),
            WmsError::NotFound
        ));
        assert!(matches!(
            WmsError::from_status(429, String::new()),
            WmsError::RateLimited
        ));
        for s in [500u16, 502, 503, 504] {
            assert!(matches!(
                WmsError::from_status(s, String::new()),
                WmsError::Unavailable { .. }
            ));
        }
        assert!(matches!(
            WmsError::from_status(418, String::new()),
            WmsError::Unknown { .. }
        ));
    }

    #[test]
    fn transience_per_variant() {
        assert!(WmsError::RateLimited.is_transient());
        assert!(WmsError::Unavailable { status: 503 }.is_transient());
        assert!(WmsError::Network { message: "t".into() }.is_transient());
        assert!(WmsError::Unauthorized.is_transient());
        assert!(!WmsError::BadRequest { message: "m".into() }.is_transient());
        assert!(!WmsError::NotFound.is_transient());
    }

    #[test]
    fn get_retry_excludes_auth_and_client_errors() {
        assert!(WmsError::RateLimited.retriable_get());
        assert!(WmsError::Unavailable { status: 500 }.retriable_get());
        assert!(!WmsError::Unauthorized.retriable_get());
        assert!(!WmsError::NotFound.retriable_get());
        assert!(!WmsError::BadRequest { message: String::new() }.retriable_get());
    }
}
