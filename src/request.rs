use super::config::ExportConfig;
use super::errors::{MethodNotAllowedSnafu, Result};
use chrono::{DateTime, Utc};
use serde_derive::Serialize;

/// Request methods a trigger may use. Compared case sensitively.
pub const ALLOWED_METHODS: &'static [&'static str] = &["POST", "GET"];

const STORAGE_SCHEME: &'static str = "gs";
const BACKUP_FOLDER: &'static str = "firestore-backups";

/// Rejects any method outside `ALLOWED_METHODS`.
pub fn check_method(method: &str) -> Result<()> {
    if ALLOWED_METHODS.iter().any(|allowed| *allowed == method) {
        Ok(())
    } else {
        MethodNotAllowedSnafu { method }.fail()
    }
}

/// Body of `projects.databases.exportDocuments`.
/// https://firebase.google.com/docs/firestore/reference/rest/v1/projects.databases/exportDocuments
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ExportRequest {
    #[serde(rename = "outputUriPrefix")]
    pub output_uri_prefix: String,
    /// Left out of the body when empty: an absent field exports every
    /// collection, an empty list does not mean the same thing.
    #[serde(rename = "collectionIds", skip_serializing_if = "Vec::is_empty")]
    pub collection_ids: Vec<String>,
}

impl ExportRequest {
    /// Builds the request for an invocation that started at `started_at`.
    pub fn new(config: &ExportConfig, started_at: DateTime<Utc>) -> ExportRequest {
        ExportRequest {
            output_uri_prefix: output_uri_prefix(&config.storage_bucket, started_at),
            collection_ids: config.collection_filter.clone(),
        }
    }
}

/// `gs://<bucket>/firestore-backups/<YYYY-MM-DD>/<HHMMSS>/`
///
/// Only unique at one second granularity. Two invocations inside the same
/// UTC second share a prefix and the later export writes over the earlier.
pub fn output_uri_prefix(bucket: &str, started_at: DateTime<Utc>) -> String {
    format!(
        "{}://{}/{}/{}/{}/",
        STORAGE_SCHEME,
        bucket,
        BACKUP_FOLDER,
        started_at.format("%Y-%m-%d"),
        started_at.format("%H%M%S")
    )
}
