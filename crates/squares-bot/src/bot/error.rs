use crate::bot::session::SessionError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    #[error(transparent)]
    Session(#[from] SessionError),
    /// A candidate slot was still unset after every worker finished.
    #[error("no evaluation was recorded for candidate cell {cell}")]
    UnsetSlot { cell: usize },
    #[error("failed to build search thread pool: {0}")]
    ThreadPool(String),
}
