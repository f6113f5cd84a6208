use super::config::ExportConfig;
use super::credentials::TokenSource;
use super::errors::{DecodeSnafu, Error, Result};
use super::firestore::FirestoreAdmin;
use super::request::{check_method, ExportRequest};
use super::submitter::{submit, ExportOutcome, SuccessBody};
use chrono::{DateTime, Utc};
use snafu::ResultExt;

/// HTTP style reply handed back to the trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    /// Raw bytes, upstream error bodies are not required to be UTF-8.
    pub body: Vec<u8>,
    pub headers: Vec<(String, String)>,
}

impl Response {
    pub fn text<B: Into<Vec<u8>>>(status: u16, body: B) -> Response {
        Response {
            status,
            body: body.into(),
            headers: Vec::new(),
        }
    }

    pub fn json(body: String) -> Response {
        Response {
            status: 200,
            body: body.into_bytes(),
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
        }
    }

    pub fn is_success(&self) -> bool {
        self.status < 400
    }

    /// Body for display, invalid UTF-8 replaced.
    pub fn body_text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

impl ExportOutcome {
    pub fn into_response(self) -> Result<Response> {
        match self {
            ExportOutcome::Success {
                operation,
                output_uri_prefix,
            } => {
                let body = SuccessBody {
                    operation: operation.as_deref(),
                    output_uri_prefix: &output_uri_prefix,
                };
                let body = serde_json::to_string(&body).context(DecodeSnafu)?;
                Ok(Response::json(body))
            }
            // upstream status and body, no content type forced
            ExportOutcome::Failure { status, body } => Ok(Response::text(status, body)),
        }
    }
}

/// Collaborators one invocation needs. Built fresh per invocation.
pub struct Invocation<'a, F> {
    pub lookup: F,
    pub started_at: DateTime<Utc>,
    pub tokens: &'a dyn TokenSource,
    pub admin: &'a FirestoreAdmin,
}

/// Runs one backup trigger.
///
/// Bad methods and missing settings come back as 405 and 500 responses
/// before anything touches the network. Credential and transport faults
/// are returned as `Err` for the caller to deal with.
pub fn handle_backup<F>(method: &str, invocation: Invocation<'_, F>) -> Result<Response>
where
    F: Fn(&str) -> Option<String>,
{
    let (config, request) = match prepare(method, &invocation.lookup, invocation.started_at) {
        Ok(prepared) => prepared,
        Err(err) => return reject(err),
    };
    submit(&config, &request, invocation.tokens, invocation.admin)?.into_response()
}

/// Validates the method, resolves settings and builds the request body.
/// Makes no network calls.
pub fn prepare<F>(
    method: &str,
    lookup: &F,
    started_at: DateTime<Utc>,
) -> Result<(ExportConfig, ExportRequest)>
where
    F: Fn(&str) -> Option<String>,
{
    check_method(method)?;
    let config = ExportConfig::resolve(lookup)?;
    let request = ExportRequest::new(&config, started_at);
    Ok((config, request))
}

fn reject(err: Error) -> Result<Response> {
    match err.status_code() {
        Some(status) => Ok(Response::text(status, err.to_string())),
        None => Err(err),
    }
}
