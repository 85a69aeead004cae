pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Infrastructure faults. Anything recoverable (missing records, missing
/// tokens, per-token delivery failures) is reported as an outcome instead
/// and never surfaces here.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("user store request for {user_id} failed: {source}")]
    Store { user_id: String, source: BoxError },

    #[error("push gateway request failed: {0}")]
    Gateway(#[source] BoxError),

    #[error("missing configuration: {0}")]
    Config(String),
}
