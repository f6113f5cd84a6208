use reqwest::Error as ReqwestError;
use serde_json::error::Error as SerdeError;
use snafu::Snafu;

/// General purpose error enum
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    // Errors the caller can act on. These become plain text responses.
    #[snafu(display("Method not allowed"))]
    MethodNotAllowed { method: String },

    #[snafu(display("BUCKET_NAME is required."))]
    MissingBucket,

    #[snafu(display("Project ID not detected."))]
    MissingProjectId,

    // Faults below are not turned into responses, they propagate to
    // whatever is driving the invocation.
    #[snafu(display("Failed to acquire access token: {}", message))]
    Credentials { message: String },

    #[snafu(display("Metadata server refused token request with status {}", status))]
    MetadataStatus { status: u16 },

    #[snafu(display("Network request failed: {}", source))]
    Http { source: ReqwestError },

    #[snafu(display("JSON Encoding/Decoding failed: {}", source))]
    Decode { source: SerdeError },

    #[snafu(display("Failed to write response: {}", source))]
    Output { source: std::io::Error },
}

impl Error {
    /// HTTP status a caller should see for errors that are reported as
    /// responses. Faults return `None`.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::MethodNotAllowed { .. } => Some(405),
            Error::MissingBucket | Error::MissingProjectId => Some(500),
            _ => None,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod test {
    use super::Error;

    #[test]
    fn configuration_errors_map_to_500() {
        assert_eq!(Error::MissingBucket.status_code(), Some(500));
        assert_eq!(Error::MissingProjectId.status_code(), Some(500));
        assert_eq!(
            Error::MissingBucket.to_string(),
            "BUCKET_NAME is required."
        );
    }

    #[test]
    fn method_not_allowed_maps_to_405() {
        let err = Error::MethodNotAllowed {
            method: "PUT".into(),
        };
        assert_eq!(err.status_code(), Some(405));
        assert_eq!(err.to_string(), "Method not allowed");
    }

    #[test]
    fn faults_have_no_status() {
        let err = Error::MetadataStatus { status: 503 };
        assert_eq!(err.status_code(), None);
    }
}
