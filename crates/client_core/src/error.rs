use shared::domain::{SequenceId, UnitId};
use thiserror::Error;

/// Failure taxonomy for a single API request.
///
/// `Network` means the request produced no response at all, `Status` a
/// well-formed non-2xx response, and `Parse` a 2xx response whose body could
/// not be decoded. Access denial is not represented here: a denied course is
/// a successful response whose payload says so, and is classified by the
/// fetch orchestrator rather than the transport.
#[derive(Debug, Clone, Error)]
pub enum ApiFailure {
    #[error("network failure: {0}")]
    Network(String),
    #[error("request failed with status {code}")]
    Status { code: u16 },
    #[error("malformed response body: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for ApiFailure {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            Self::Status {
                code: status.as_u16(),
            }
        } else if err.is_decode() {
            Self::Parse(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Caller errors surfaced by dependent thunks. Request failures never take
/// this path; they are logged and absorbed by the orchestrator.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    #[error("sequence {0} is not loaded in the entity store")]
    SequenceNotLoaded(SequenceId),
    #[error("unit {0} is not loaded in the entity store")]
    UnitNotLoaded(UnitId),
}
