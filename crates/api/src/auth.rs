use crate::error::ApiResult;
use crate::models::{AccessCheck, Denial, Subject};

/// Outcome of authenticating a request against an access check.
#[derive(Debug, Clone)]
pub enum Authentication {
    Granted(Subject),
    /// The caller must receive this response as-is.
    Denied(Denial),
}

pub trait Authorizer: Send + Sync {
    /// Authenticates the caller of `request` and checks it against `check`.
    ///
    /// Failing either step yields [`Authentication::Denied`] carrying the
    /// 401/403 response for the client. `Err` is reserved for failures of the
    /// authorizer itself.
    fn authenticate(
        &self,
        request: &http::Request<()>,
        check: &AccessCheck,
    ) -> ApiResult<Authentication>;
}
