//! User identity seam.
//!
//! There is no authentication yet. `Fixed` stands in for it; `Header`
//! trusts the `X-User-Email` header set by the caller.

use http::HeaderMap;
use thiserror::Error;

pub const USER_EMAIL_HEADER: &str = "x-user-email";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("missing {USER_EMAIL_HEADER} header")]
    Missing,
    #[error("invalid user email: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserResolver {
    Fixed(String),
    Header,
}

impl UserResolver {
    /// `Fixed` when a stub user is configured, `Header` otherwise.
    pub fn from_stub(stub: Option<String>) -> Self {
        match stub {
            Some(email) if !email.trim().is_empty() => Self::Fixed(email.trim().to_string()),
            _ => Self::Header,
        }
    }

    pub fn resolve(&self, headers: &HeaderMap) -> Result<String, IdentityError> {
        match self {
            Self::Fixed(email) => Ok(email.clone()),
            Self::Header => {
                let raw = headers
                    .get(USER_EMAIL_HEADER)
                    .ok_or(IdentityError::Missing)?
                    .to_str()
                    .map_err(|_| IdentityError::Invalid("non-ascii header".to_string()))?
                    .trim();
                if raw.is_empty() {
                    return Err(IdentityError::Missing);
                }
                if !raw.contains('@') {
                    return Err(IdentityError::Invalid(raw.to_string()));
                }
                Ok(raw.to_string())
            }
        }
    }
}
