use chrono::Utc;
use libfirebackup::entrypoint::{self, Invocation};
use libfirebackup::logging::{init_logging, LogFormat};
use libfirebackup::{default_token_source, FirestoreAdmin};
use std::io::{self, Write};
use std::process;
use structopt::StructOpt;
use tracing::{error, info};

/// Trigger a Firestore export into Cloud Storage.
///
/// Settings come from BUCKET_NAME, GCP_PROJECT / GOOGLE_CLOUD_PROJECT /
/// PROJECT_ID, DATABASE_ID, RETENTION_DAYS and EXPORT_COLLECTION_IDS.
#[derive(Debug, StructOpt)]
#[structopt(name = "firebackup")]
struct Opt {
    /// Request method presented to the trigger (POST or GET)
    #[structopt(long, default_value = "POST")]
    method: String,

    /// Log output format
    #[structopt(long, default_value = "text", possible_values = LogFormat::VARIANTS, case_insensitive = true)]
    log_format: LogFormat,

    /// Resolve settings and print the request without exporting
    #[structopt(long)]
    dry_run: bool,
}

fn lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn run(opt: &Opt) -> libfirebackup::Result<i32> {
    // captured once, everything downstream uses this instant
    let started_at = Utc::now();

    if opt.dry_run {
        return match entrypoint::prepare(&opt.method, &lookup, started_at) {
            Ok((config, request)) => {
                let admin = FirestoreAdmin::new()?;
                info!(
                    url = %admin.export_url(&config.project_id, &config.database_id),
                    retention_days = %config.retention_days,
                    "dry run, not exporting"
                );
                let body = serde_json::to_string_pretty(&request)
                    .map_err(|source| libfirebackup::Error::Decode { source })?;
                println!("{}", body);
                Ok(0)
            }
            Err(err) => {
                error!(error = %err, "dry run rejected");
                println!("{}", err);
                Ok(1)
            }
        };
    }

    let tokens = default_token_source(lookup);
    let admin = FirestoreAdmin::new()?;
    let response = entrypoint::handle_backup(
        &opt.method,
        Invocation {
            lookup,
            started_at,
            tokens: tokens.as_ref(),
            admin: &admin,
        },
    )?;
    let mut stdout = io::stdout();
    stdout
        .write_all(&response.body)
        .and_then(|_| stdout.write_all(b"\n"))
        .map_err(|source| libfirebackup::Error::Output { source })?;
    Ok(if response.is_success() { 0 } else { 1 })
}

fn main() {
    let opt = Opt::from_args();
    init_logging(opt.log_format);
    let code = match run(&opt) {
        Ok(code) => code,
        Err(err) => {
            error!(error = %err, "backup trigger failed");
            1
        }
    };
    process::exit(code);
}
