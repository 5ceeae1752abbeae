use super::users::UserDirectory;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use http::header::{AUTHORIZATION, HeaderValue, WWW_AUTHENTICATE};
use http::StatusCode;
use symserve_api::{AccessCheck, ApiResult, Authentication, Authorizer, Denial, Subject};
use tracing::debug;

const AUTHENTICATION_REQUIRED: &str = "Authentication required";
const INVALID_CREDENTIALS: &str = "Invalid credentials";
const ACCESS_DENIED: &str = "Access denied";

/// HTTP Basic authentication against a [`UserDirectory`].
///
/// Requests without credentials fall back to the guest account when it is enabled.
pub struct BasicAuthorizer {
    directory: UserDirectory,
    challenge: HeaderValue,
}

impl BasicAuthorizer {
    pub fn new(directory: UserDirectory, realm: &str) -> Self {
        let realm = realm.replace('"', "");
        let challenge = HeaderValue::from_str(&format!("Basic realm=\"{realm}\""))
            .unwrap_or_else(|_| HeaderValue::from_static("Basic"));
        Self {
            directory,
            challenge,
        }
    }

    fn unauthorized(&self, message: &str) -> Authentication {
        let mut denial = Denial::new(StatusCode::UNAUTHORIZED, message);
        denial
            .headers
            .insert(WWW_AUTHENTICATE, self.challenge.clone());
        Authentication::Denied(denial)
    }

    /// `Err` carries the denial to send back.
    fn identify(&self, request: &http::Request<()>) -> Result<Subject, Authentication> {
        let Some(header) = request.headers().get(AUTHORIZATION) else {
            return match self.directory.guest() {
                Some(guest) => Ok(guest.subject()),
                None => Err(self.unauthorized(AUTHENTICATION_REQUIRED)),
            };
        };

        let Some((name, password)) = parse_basic(header) else {
            debug!("Malformed Authorization header");
            return Err(self.unauthorized(INVALID_CREDENTIALS));
        };

        match self.directory.find(&name) {
            Some(user) if user.verify(&password) => Ok(user.subject()),
            _ => {
                debug!(user = %name, "Rejected credentials");
                Err(self.unauthorized(INVALID_CREDENTIALS))
            }
        }
    }
}

impl Authorizer for BasicAuthorizer {
    fn authenticate(
        &self,
        request: &http::Request<()>,
        check: &AccessCheck,
    ) -> ApiResult<Authentication> {
        let subject = match self.identify(request) {
            Ok(subject) => subject,
            Err(denial) => return Ok(denial),
        };

        if check.is_satisfied_by(&subject) {
            return Ok(Authentication::Granted(subject));
        }

        debug!(
            user = %subject.name,
            project_id = %check.project_id,
            permission = %check.permission,
            "Permission not granted"
        );
        if subject.guest {
            // Give anonymous callers the chance to log in.
            Ok(self.unauthorized(AUTHENTICATION_REQUIRED))
        } else {
            Ok(Authentication::Denied(Denial::new(
                StatusCode::FORBIDDEN,
                ACCESS_DENIED,
            )))
        }
    }
}

fn parse_basic(header: &HeaderValue) -> Option<(String, String)> {
    let value = header.to_str().ok()?.trim();
    let (scheme, encoded) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (name, password) = decoded.split_once(':')?;
    Some((name.to_string(), password.to_string()))
}
