use http::HeaderMap;
use relay_config::AuthConfig;
use secrecy::{ExposeSecret as _, SecretString};

use crate::error::ServerError;

/// Result of inbound authentication
#[derive(Debug, Clone, Copy)]
pub struct AuthOutcome {
    /// The client carried credentials that are not the proxy's own;
    /// providers supporting transparent auth forward them unchanged
    pub client_supplied_auth: bool,
}

/// Validates inbound client credentials
///
/// A client matching the configured `x-api-key` or bearer secret is a
/// proxy user. Anything else is either rejected (`required = true`) or
/// treated as a client bringing its own upstream credential.
pub struct AuthGate {
    api_key: Option<SecretString>,
    bearer_secret: Option<SecretString>,
    required: bool,
}

impl AuthGate {
    /// Build the gate from configuration
    pub fn from_config(config: &AuthConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            bearer_secret: config.bearer_secret.clone(),
            required: config.required,
        }
    }

    /// Check one request's credentials
    ///
    /// # Errors
    ///
    /// Returns `Unauthenticated` when auth is required and the request
    /// matches neither configured secret.
    pub fn check(&self, headers: &HeaderMap) -> Result<AuthOutcome, ServerError> {
        let api_key = header_str(headers, "x-api-key");
        let bearer = header_str(headers, http::header::AUTHORIZATION.as_str())
            .and_then(|v| v.strip_prefix("Bearer "));

        let matches_api_key = matches!(
            (&self.api_key, api_key),
            (Some(expected), Some(got)) if expected.expose_secret() == got
        );
        let matches_bearer = matches!(
            (&self.bearer_secret, bearer),
            (Some(expected), Some(got)) if expected.expose_secret() == got
        );

        if matches_api_key || matches_bearer {
            return Ok(AuthOutcome {
                client_supplied_auth: false,
            });
        }

        if self.required {
            return Err(ServerError::Unauthenticated);
        }

        Ok(AuthOutcome {
            client_supplied_auth: api_key.is_some() || bearer.is_some(),
        })
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate(api_key: Option<&str>, bearer: Option<&str>, required: bool) -> AuthGate {
        AuthGate {
            api_key: api_key.map(SecretString::from),
            bearer_secret: bearer.map(SecretString::from),
            required,
        }
    }

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(
                http::HeaderName::try_from(*name).unwrap(),
                value.parse().unwrap(),
            );
        }
        map
    }

    #[test]
    fn matching_api_key_is_a_proxy_user() {
        let gate = gate(Some("proxy-secret"), None, true);
        let outcome = gate.check(&headers(&[("x-api-key", "proxy-secret")])).unwrap();
        assert!(!outcome.client_supplied_auth);
    }

    #[test]
    fn matching_bearer_is_a_proxy_user() {
        let gate = gate(None, Some("bearer-secret"), true);
        let outcome = gate
            .check(&headers(&[("authorization", "Bearer bearer-secret")]))
            .unwrap();
        assert!(!outcome.client_supplied_auth);
    }

    #[test]
    fn required_rejects_mismatch() {
        let gate = gate(Some("proxy-secret"), None, true);
        assert!(gate.check(&headers(&[("x-api-key", "wrong")])).is_err());
        assert!(gate.check(&HeaderMap::new()).is_err());
    }

    #[test]
    fn optional_auth_flags_foreign_credentials() {
        let gate = gate(Some("proxy-secret"), None, false);
        let outcome = gate
            .check(&headers(&[("x-api-key", "sk-ant-client-own")]))
            .unwrap();
        assert!(outcome.client_supplied_auth);
    }

    #[test]
    fn optional_auth_allows_anonymous() {
        let gate = gate(None, None, false);
        let outcome = gate.check(&HeaderMap::new()).unwrap();
        assert!(!outcome.client_supplied_auth);
    }
}
