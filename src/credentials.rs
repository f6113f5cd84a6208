// Sources of short lived OAuth access tokens for the Firestore admin API
use super::errors::{CredentialsSnafu, HttpSnafu, MetadataStatusSnafu, Result};
use goauth::auth::JwtClaims;
use goauth::credentials::Credentials;
use goauth::scopes::Scope;
use serde_derive::Deserialize;
use smpl_jwt::Jwt;
use snafu::ResultExt;
use std::fmt;
use std::time::Duration;

pub const GOOGLE_APPLICATION_CREDENTIALS_KEY: &'static str = "GOOGLE_APPLICATION_CREDENTIALS";
pub const METADATA_HOST_KEY: &'static str = "GCE_METADATA_HOST";

const DEFAULT_METADATA_HOST: &'static str = "metadata.google.internal";
const DATASTORE_SCOPE: &'static str = "https://www.googleapis.com/auth/datastore";
const REFRESH_TIMEOUT: Duration = Duration::from_secs(10);

/// A bearer token ready to put on a request.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new<S: Into<String>>(token: S) -> AccessToken {
        AccessToken(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }

    // Used to give us the key for our Authorization Header
    // Authorization: Bearer <token>
    // ------------------^
    pub fn authorization_value(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// Anything that can mint a fresh access token scoped for database exports.
///
/// `refresh` must fetch synchronously every time. Callers do not cache.
pub trait TokenSource {
    fn refresh(&self) -> Result<AccessToken>;
}

/// Signs a JWT with a service account key and trades it for a token.
#[derive(Debug, Clone)]
pub struct ServiceAccount {
    key_path: String,
    timeout: Duration,
}

impl ServiceAccount {
    pub fn new<S: Into<String>>(key_path: S) -> ServiceAccount {
        ServiceAccount {
            key_path: key_path.into(),
            timeout: REFRESH_TIMEOUT,
        }
    }

    /// Bounds the token exchange, connect through body.
    pub fn with_timeout(mut self, timeout: Duration) -> ServiceAccount {
        self.timeout = timeout;
        self
    }
}

impl TokenSource for ServiceAccount {
    fn refresh(&self) -> Result<AccessToken> {
        // get jwt & credentials from file
        let credentials = Credentials::from_file(&*self.key_path).map_err(|e| {
            CredentialsSnafu {
                message: format!("failed to load {}: {}", self.key_path, e),
            }
            .build()
        })?;
        let claims = JwtClaims::new(
            credentials.iss(),
            &Scope::DataStore,
            credentials.token_uri(),
            None,
            None,
        );
        let rsa_key = credentials.rsa_key().map_err(|e| {
            CredentialsSnafu {
                message: format!("failed to read private key: {}", e),
            }
            .build()
        })?;
        let jwt = Jwt::new(claims, rsa_key, None);

        // goauth's own blocking helper uses a client without a timeout
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .context(HttpSnafu)?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| {
                CredentialsSnafu {
                    message: format!("failed to start token runtime: {}", e),
                }
                .build()
            })?;
        let token = runtime
            .block_on(goauth::get_token_with_client(&client, &jwt, &credentials))
            .map_err(|e| {
                CredentialsSnafu {
                    message: format!("token exchange failed: {}", e),
                }
                .build()
            })?;
        Ok(AccessToken::new(token.access_token()))
    }
}

/// Asks the compute metadata server for the attached service account's token.
#[derive(Debug, Clone)]
pub struct MetadataServer {
    host: String,
}

#[derive(Deserialize)]
struct MetadataToken {
    access_token: String,
}

impl MetadataServer {
    pub fn new<S: Into<String>>(host: S) -> MetadataServer {
        MetadataServer { host: host.into() }
    }

    fn token_url(&self) -> String {
        format!(
            "http://{}/computeMetadata/v1/instance/service-accounts/default/token",
            self.host
        )
    }
}

impl Default for MetadataServer {
    fn default() -> Self {
        MetadataServer::new(DEFAULT_METADATA_HOST)
    }
}

impl TokenSource for MetadataServer {
    fn refresh(&self) -> Result<AccessToken> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REFRESH_TIMEOUT)
            .build()
            .context(HttpSnafu)?;
        let response = client
            .get(&*self.token_url())
            .query(&[("scopes", DATASTORE_SCOPE)])
            .header("Metadata-Flavor", "Google")
            .send()
            .context(HttpSnafu)?;
        let status = response.status();
        if !status.is_success() {
            return MetadataStatusSnafu {
                status: status.as_u16(),
            }
            .fail();
        }
        let token = response.json::<MetadataToken>().context(HttpSnafu)?;
        Ok(AccessToken::new(token.access_token))
    }
}

/// Picks the process default credentials: a key file named by
/// `GOOGLE_APPLICATION_CREDENTIALS`, otherwise the metadata server.
pub fn default_token_source<F>(lookup: F) -> Box<dyn TokenSource>
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| {
        lookup(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    };
    match non_empty(GOOGLE_APPLICATION_CREDENTIALS_KEY) {
        Some(path) => {
            tracing::debug!(key_path = %path, "using service account key");
            Box::new(ServiceAccount::new(path))
        }
        None => {
            let host = non_empty(METADATA_HOST_KEY)
                .unwrap_or_else(|| DEFAULT_METADATA_HOST.to_string());
            tracing::debug!(host = %host, "using metadata server credentials");
            Box::new(MetadataServer::new(host))
        }
    }
}
