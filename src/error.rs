/// Error type for this crate.
#[derive(Debug, thiserror::Error)]
pub enum VisitGateError {
    /// The window buffer already holds `capacity` events.
    ///
    /// This is the expected outcome for an over-limit key and is turned into a
    /// denial by [`AccessController`](crate::AccessController).
    #[error("window buffer is full")]
    Full,

    /// Pop on an empty window buffer.
    #[error("window buffer is empty")]
    Empty,

    /// Invalid window duration.
    #[error("invalid window duration: {0}")]
    InvalidWindowDuration(String),

    /// Invalid sweep interval.
    #[error("invalid sweep interval: {0}")]
    InvalidSweepInterval(String),

    /// Invalid visit limit.
    #[error("invalid visit limit: {0}")]
    InvalidVisitLimit(String),

    /// Invalid expected concurrency.
    #[error("invalid expected concurrency: {0}")]
    InvalidExpectedConcurrency(String),

    /// The background sweep thread could not be started.
    #[error("failed to spawn sweeper thread: {0}")]
    SweeperSpawn(#[from] std::io::Error),
}
