/// Error type for billing platform client operations.
///
/// Only failures that prevent a response from being observed surface here. An unexpected HTTP
/// status or an unparseable body is not an error at this level; those are check failures for
/// the scenario to record.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}
