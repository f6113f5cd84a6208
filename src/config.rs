//! Resolves the export settings from environment variables.

use super::errors::{MissingBucketSnafu, MissingProjectIdSnafu, Result};
use snafu::OptionExt;

pub const BUCKET_NAME_KEY: &'static str = "BUCKET_NAME";
pub const DATABASE_ID_KEY: &'static str = "DATABASE_ID";
pub const RETENTION_DAYS_KEY: &'static str = "RETENTION_DAYS";
pub const COLLECTION_IDS_KEY: &'static str = "EXPORT_COLLECTION_IDS";

/// Variables that may carry the project id, highest priority first.
/// Different runtimes expose it under different names.
pub const PROJECT_ID_KEYS: &'static [&'static str] =
    &["GCP_PROJECT", "GOOGLE_CLOUD_PROJECT", "PROJECT_ID"];

/// The platform's default database instance.
pub const DEFAULT_DATABASE_ID: &'static str = "(default)";
pub const DEFAULT_RETENTION_DAYS: &'static str = "60";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportConfig {
    pub storage_bucket: String,
    pub project_id: String,
    pub database_id: String,
    /// Only logged. Retention is enforced by the bucket lifecycle policy.
    pub retention_days: String,
    /// Empty means every collection.
    pub collection_filter: Vec<String>,
}

impl ExportConfig {
    /// Reads the settings from the process environment.
    pub fn from_env() -> Result<ExportConfig> {
        ExportConfig::resolve(|key| std::env::var(key).ok())
    }

    /// Resolves settings from any variable lookup. Pure in `lookup`.
    pub fn resolve<F>(lookup: F) -> Result<ExportConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let storage_bucket =
            non_empty(&lookup, BUCKET_NAME_KEY).context(MissingBucketSnafu)?;
        let project_id =
            first_non_empty(&lookup, PROJECT_ID_KEYS).context(MissingProjectIdSnafu)?;
        let database_id = non_empty(&lookup, DATABASE_ID_KEY)
            .unwrap_or_else(|| DEFAULT_DATABASE_ID.to_string());
        let retention_days = non_empty(&lookup, RETENTION_DAYS_KEY)
            .unwrap_or_else(|| DEFAULT_RETENTION_DAYS.to_string());
        let collection_filter = lookup(COLLECTION_IDS_KEY)
            .map(|raw| parse_collection_ids(&raw))
            .unwrap_or_default();
        Ok(ExportConfig {
            storage_bucket,
            project_id,
            database_id,
            retention_days,
            collection_filter,
        })
    }
}

/// Splits a comma separated list, trimming segments and dropping empty ones.
pub fn parse_collection_ids(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(String::from)
        .collect()
}

/// Returns the first key in `keys` whose trimmed value is non-empty.
pub fn first_non_empty<F>(lookup: &F, keys: &[&str]) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    keys.iter().find_map(|key| non_empty(lookup, key))
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
