//! Starts a managed export of a Firestore database into Cloud Storage and
//! reports the long running operation it creates.
//!
//! One invocation runs `entrypoint::handle_backup`: check the request
//! method, resolve settings from the environment, build a timestamped
//! output prefix, refresh a token and call `exportDocuments`.

pub mod config;
pub mod credentials;
pub mod entrypoint;
pub mod errors;
pub mod firestore;
pub mod logging;
pub mod request;
pub mod submitter;

pub use config::ExportConfig;
pub use credentials::{default_token_source, AccessToken, TokenSource};
pub use entrypoint::{handle_backup, Invocation, Response};
pub use errors::{Error, Result};
pub use firestore::FirestoreAdmin;
pub use request::ExportRequest;
pub use submitter::ExportOutcome;
