// This file contains 1:1 representations of the REST APIs firestore provides

use super::credentials::AccessToken;
use super::errors::{CredentialsSnafu, HttpSnafu, Result};
use super::request::ExportRequest;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use snafu::ResultExt;
use std::time::Duration;

pub const FIRESTORE_BASE_V1: &'static str = "https://firestore.googleapis.com/v1";

/// Upper bound on a single export call, connect through body.
pub const EXPORT_TIMEOUT: Duration = Duration::from_secs(60);

/// Contains 1:1 representations of gRPC firestore types
pub mod types {
    use serde_derive::Deserialize;

    /// https://firebase.google.com/docs/firestore/reference/rest/Shared.Types/Operation
    /// Only `name` is read, other fields are ignored.
    #[derive(Deserialize, Debug, Default)]
    pub struct Operation {
        #[serde(default)]
        pub name: Option<String>,
    }
}

/// Status and body exactly as the API returned them, byte for byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Client for the `projects.databases` admin endpoints.
#[derive(Debug, Clone)]
pub struct FirestoreAdmin {
    client: Client,
    base_url: String,
}

impl FirestoreAdmin {
    pub fn new() -> Result<FirestoreAdmin> {
        FirestoreAdmin::with_base_url(FIRESTORE_BASE_V1)
    }

    /// Points the client at another API root, e.g. an emulator or a test server.
    pub fn with_base_url<S: Into<String>>(base_url: S) -> Result<FirestoreAdmin> {
        let client = Client::builder()
            .timeout(EXPORT_TIMEOUT)
            .build()
            .context(HttpSnafu)?;
        Ok(FirestoreAdmin {
            client,
            base_url: base_url.into(),
        })
    }

    /// `{base}/projects/{project_id}/databases/{database_id}:exportDocuments`
    pub fn export_url(&self, project_id: &str, database_id: &str) -> String {
        make_export_url(&self.base_url, project_id, database_id)
    }

    /// https://firebase.google.com/docs/firestore/reference/rest/v1/projects.databases/exportDocuments
    /// Exports a copy of all or a subset of documents from
    /// Google Cloud Firestore to Google Cloud Storage.
    ///
    /// Error statuses are returned as a `RawResponse`, only transport
    /// failures are errors.
    pub fn export_documents(
        &self,
        token: &AccessToken,
        project_id: &str,
        database_id: &str,
        request: &ExportRequest,
    ) -> Result<RawResponse> {
        let url = &*self.export_url(project_id, database_id);
        let headers = make_headers(token)?;
        // send request
        let response = self
            .client
            .post(url)
            .headers(headers)
            .json(request)
            .send()
            .context(HttpSnafu)?;
        let status = response.status().as_u16();
        let body = response.bytes().context(HttpSnafu)?.to_vec();
        Ok(RawResponse { status, body })
    }
}

fn make_export_url(base_url: &str, project_id: &str, database_id: &str) -> String {
    format!(
        "{}/projects/{}/databases/{}:exportDocuments",
        base_url.trim_end_matches('/'),
        project_id,
        database_id
    )
}

fn make_headers(token: &AccessToken) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    let mut authorization = HeaderValue::from_str(&*token.authorization_value())
        .map_err(|e| {
            CredentialsSnafu {
                message: format!("token is not a valid header value: {}", e),
            }
            .build()
        })?;
    authorization.set_sensitive(true);
    headers.insert(AUTHORIZATION, authorization);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(headers)
}
