//! `Authorization: Bearer` token.

use crate::auth::CloudAuth;
use crate::error::{CloudError, Result};

/// Static bearer token, sent with every request.
pub struct BearerToken {
    token: String,
}

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BearerToken(***)")
    }
}

impl CloudAuth for BearerToken {
    fn sign_request(
        &self,
        _url: &str,
        _method: &str,
        headers: &mut Vec<(String, String)>,
    ) -> Result<()> {
        let token = self.token.trim();
        if token.is_empty() {
            return Err(CloudError::Auth("bearer token is empty".into()));
        }
        if token.chars().any(|c| c.is_control()) {
            return Err(CloudError::Auth("bearer token contains control characters".into()));
        }
        headers.push(("Authorization".into(), format!("Bearer {token}")));
        Ok(())
    }
}
