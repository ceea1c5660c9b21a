// Header-supplied tenancy and role extraction.
//
// Real authentication (OAuth, API keys, session cookies) lives in the
// collaborator service that fronts this one; this crate only reads the
// headers that service forwards downstream.

use axum::http::HeaderMap;
use uuid::Uuid;

use crate::error::ApiError;

/// Role carried on `X-User-Role`. Only `create_run` enforces membership in
/// this set; lookups and the event stream are read paths with no role check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Owner,
    Admin,
    Member,
}

impl std::str::FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "OWNER" => Ok(Role::Owner),
            "ADMIN" => Ok(Role::Admin),
            "MEMBER" => Ok(Role::Member),
            _ => Err(()),
        }
    }
}

pub fn org_id(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get("X-Org-Id")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
}

pub fn user_id(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get("X-User-Id")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
}

/// Require a recognized role header; anything missing or unrecognized is a
/// 403, matching the intake API's authorization contract.
pub fn require_role(headers: &HeaderMap) -> Result<Role, ApiError> {
    headers
        .get("X-User-Role")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<Role>().ok())
        .ok_or(ApiError::Forbidden)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn parses_known_roles_case_insensitively() {
        for (raw, expected) in [("OWNER", Role::Owner), ("admin", Role::Admin), ("Member", Role::Member)] {
            assert_eq!(raw.parse::<Role>().unwrap(), expected);
        }
    }

    #[test]
    fn rejects_unknown_role() {
        assert!("guest".parse::<Role>().is_err());
    }

    #[test]
    fn require_role_rejects_missing_header() {
        let headers = HeaderMap::new();
        assert!(matches!(require_role(&headers), Err(ApiError::Forbidden)));
    }

    #[test]
    fn require_role_rejects_unknown_header_value() {
        let mut headers = HeaderMap::new();
        headers.insert("X-User-Role", HeaderValue::from_static("guest"));
        assert!(matches!(require_role(&headers), Err(ApiError::Forbidden)));
    }

    #[test]
    fn require_role_accepts_known_value() {
        let mut headers = HeaderMap::new();
        headers.insert("X-User-Role", HeaderValue::from_static("MEMBER"));
        assert_eq!(require_role(&headers).unwrap(), Role::Member);
    }
}
