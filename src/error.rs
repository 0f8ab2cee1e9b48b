use kube::Error as KubeError;
use kube::error::ErrorResponse;
use thiserror::Error;

const STATUS_CODE_404_NOT_FOUND: u16 = 404;
const STATUS_CODE_409_CONFLICT: u16 = 409;

/// Errors surfaced by the [`crate::client::ClusterClient`] trait.
///
/// Every variant is something the [retry wrapper](crate::retry) or a monitor
/// can reasonably branch on; anything else is wrapped in `Other`.
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("kubernetes api error: {0}")]
    Kube(#[from] KubeError),

    #[error(transparent)]
    Other(#[from] eyre::Report),
}

impl ClusterError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClusterError::Kube(err) if is_404_not_found_error(err))
    }
}

pub fn is_404_not_found_error(err: &KubeError) -> bool {
    matches!(
        err,
        KubeError::Api(ErrorResponse {
            code: STATUS_CODE_404_NOT_FOUND,
            ..
        })
    )
}

pub fn is_409_conflict_error(err: &KubeError) -> bool {
    matches!(
        err,
        KubeError::Api(ErrorResponse {
            code: STATUS_CODE_409_CONFLICT,
            ..
        })
    )
}

/// Errors that can prevent a [`crate::client::ClientFactory`] from building a client.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("both oauth_token_file and oauth_token_value were set; they are mutually exclusive")]
    ConflictingCredentials,

    #[error("failed to read oauth token file '{path}': {source}")]
    TokenFileUnreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Kube(#[from] KubeError),
}
