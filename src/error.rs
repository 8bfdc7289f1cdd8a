use thiserror::Error;

/// Everything that can go wrong inside the game core.
#[derive(Debug, Error)]
pub enum Error {
    /// The requested direction points back into the snake's neck.
    #[error("unable to move in reverse direction")]
    ReverseDirection,
    /// Wall or self collision.
    #[error("obstacle hit")]
    ObstacleHit,
    /// The snake covers every cell.
    #[error("grid filled")]
    GridFull,
    #[error("invalid direction: {0}")]
    InvalidDirection(u8),
    #[error("invalid arena dimension {0}, expected 2..=256")]
    InvalidDimension(u16),
    #[error("game already started")]
    AlreadyStarted,
    #[error("printer failed: {0}")]
    Printer(anyhow::Error),
    /// A failure whose printer notification failed as well.
    #[error("{report}: {cause}")]
    Unreported {
        cause: Box<Error>,
        report: anyhow::Error,
    },
}
