use super::config::ExportConfig;
use super::credentials::TokenSource;
use super::errors::{DecodeSnafu, Result};
use super::firestore::{types::Operation, FirestoreAdmin, RawResponse};
use super::request::ExportRequest;
use serde_derive::Serialize;
use snafu::ResultExt;
use tracing::{error, info};

/// What came of one export call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    /// The API accepted the export. `operation` is the long running
    /// operation handle, absent if the body did not carry one.
    Success {
        operation: Option<String>,
        output_uri_prefix: String,
    },
    /// The API rejected the export. Passed through untouched.
    Failure { status: u16, body: Vec<u8> },
}

/// JSON body returned to the caller on success.
#[derive(Serialize, Debug)]
pub struct SuccessBody<'a> {
    pub operation: Option<&'a str>,
    #[serde(rename = "outputUriPrefix")]
    pub output_uri_prefix: &'a str,
}

impl ExportOutcome {
    /// The status code decides success. The body only has to be JSON, its
    /// shape is not checked beyond picking out `name`.
    pub fn classify(response: RawResponse, output_uri_prefix: &str) -> Result<ExportOutcome> {
        if response.status >= 400 {
            return Ok(ExportOutcome::Failure {
                status: response.status,
                body: response.body,
            });
        }
        let operation: Operation =
            serde_json::from_slice(&response.body).context(DecodeSnafu)?;
        Ok(ExportOutcome::Success {
            operation: operation.name,
            output_uri_prefix: output_uri_prefix.to_string(),
        })
    }

    pub fn is_success(&self) -> bool {
        match self {
            ExportOutcome::Success { .. } => true,
            ExportOutcome::Failure { .. } => false,
        }
    }
}

/// Refreshes a token, submits the export and classifies the reply.
///
/// Nothing is retried. A failed export is reported once, a transport or
/// credential fault is returned as an error.
pub fn submit(
    config: &ExportConfig,
    request: &ExportRequest,
    tokens: &dyn TokenSource,
    admin: &FirestoreAdmin,
) -> Result<ExportOutcome> {
    info!(database_id = %config.database_id, "Starting export");
    info!(retention_days = %config.retention_days, "Retention days (GCS lifecycle)");
    info!(output_uri_prefix = %request.output_uri_prefix, "Export destination");

    let token = tokens.refresh()?;
    let response =
        admin.export_documents(&token, &config.project_id, &config.database_id, request)?;
    let outcome = ExportOutcome::classify(response, &request.output_uri_prefix)?;

    match &outcome {
        ExportOutcome::Success { operation, .. } => {
            info!(operation = ?operation, "Export operation started");
        }
        ExportOutcome::Failure { status, body } => {
            error!(
                status = *status,
                body = %String::from_utf8_lossy(body),
                "Export failed"
            );
        }
    }
    Ok(outcome)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::credentials::AccessToken;
    use crate::errors::Error;
    use std::cell::Cell;

    const PREFIX: &str = "gs://b1/firestore-backups/2024-03-05/070809/";

    struct FixedToken {
        refreshed: Cell<u32>,
    }

    impl TokenSource for FixedToken {
        fn refresh(&self) -> Result<AccessToken> {
            self.refreshed.set(self.refreshed.get() + 1);
            Ok(AccessToken::new("tok"))
        }
    }

    struct BrokenToken;

    impl TokenSource for BrokenToken {
        fn refresh(&self) -> Result<AccessToken> {
            Err(Error::Credentials {
                message: "no credentials".into(),
            })
        }
    }

    fn config() -> ExportConfig {
        ExportConfig {
            storage_bucket: "b1".into(),
            project_id: "p1".into(),
            database_id: "(default)".into(),
            retention_days: "60".into(),
            collection_filter: vec!["sales".into()],
        }
    }

    fn request() -> ExportRequest {
        ExportRequest {
            output_uri_prefix: PREFIX.into(),
            collection_ids: vec!["sales".into()],
        }
    }

    fn raw(status: u16, body: &str) -> RawResponse {
        RawResponse {
            status,
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn ok_status_extracts_operation_name() {
        let outcome = ExportOutcome::classify(raw(200, r#"{"name":"op123"}"#), PREFIX).unwrap();
        assert_eq!(
            outcome,
            ExportOutcome::Success {
                operation: Some("op123".into()),
                output_uri_prefix: PREFIX.into(),
            }
        );
        assert!(outcome.is_success());
    }

    #[test]
    fn missing_name_is_still_success() {
        let outcome = ExportOutcome::classify(raw(202, r#"{"done":false}"#), PREFIX).unwrap();
        assert_eq!(
            outcome,
            ExportOutcome::Success {
                operation: None,
                output_uri_prefix: PREFIX.into(),
            }
        );
    }

    #[test]
    fn error_status_keeps_body_verbatim() {
        let outcome =
            ExportOutcome::classify(raw(403, r#"{"error":"forbidden"}"#), PREFIX).unwrap();
        assert_eq!(
            outcome,
            ExportOutcome::Failure {
                status: 403,
                body: br#"{"error":"forbidden"}"#.to_vec(),
            }
        );
        assert!(!outcome.is_success());
    }

    #[test]
    fn exactly_400_is_failure() {
        let outcome = ExportOutcome::classify(raw(400, "not json"), PREFIX).unwrap();
        assert!(!outcome.is_success());
        let outcome = ExportOutcome::classify(raw(399, "{}"), PREFIX).unwrap();
        assert!(outcome.is_success());
    }

    #[test]
    fn non_json_success_body_is_a_decode_error() {
        match ExportOutcome::classify(raw(200, "<html>"), PREFIX) {
            Err(Error::Decode { .. }) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn submit_refreshes_and_posts() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/v1/projects/p1/databases/(default):exportDocuments")
            .match_header("authorization", "Bearer tok")
            .match_body(mockito::Matcher::Json(serde_json::json!({
                "outputUriPrefix": PREFIX,
                "collectionIds": ["sales"]
            })))
            .with_status(200)
            .with_body(r#"{"name":"op123","metadata":{}}"#)
            .create();

        let admin = FirestoreAdmin::with_base_url(format!("{}/v1", server.url())).unwrap();
        let tokens = FixedToken {
            refreshed: Cell::new(0),
        };
        let outcome = submit(&config(), &request(), &tokens, &admin).unwrap();
        assert_eq!(
            outcome,
            ExportOutcome::Success {
                operation: Some("op123".into()),
                output_uri_prefix: PREFIX.into(),
            }
        );
        assert_eq!(tokens.refreshed.get(), 1);
        mock.assert();
    }

    #[test]
    fn credential_failure_skips_the_call() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", mockito::Matcher::Any)
            .expect(0)
            .create();

        let admin = FirestoreAdmin::with_base_url(format!("{}/v1", server.url())).unwrap();
        match submit(&config(), &request(), &BrokenToken, &admin) {
            Err(Error::Credentials { .. }) => {}
            other => panic!("unexpected result: {:?}", other),
        }
        mock.assert();
    }
}
