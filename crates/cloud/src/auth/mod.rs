//! Request signing for remote evaluators.

mod bearer;
mod none;

pub use bearer::BearerToken;
pub use none::NoAuth;

use crate::error::Result;

/// Adds authentication headers to an outgoing request.
pub trait CloudAuth: Send + Sync {
    /// `url` is the full request URL; headers are appended to `headers`.
    fn sign_request(
        &self,
        url: &str,
        method: &str,
        headers: &mut Vec<(String, String)>,
    ) -> Result<()>;
}
