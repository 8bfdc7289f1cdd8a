//! Terminal snake on a square grid, advanced by a background tick loop.

pub mod arena;
pub mod cancel;
pub mod config;
pub mod error;
pub mod game;
pub mod term;

pub use arena::{Arena, Direction, Field, Moved};
pub use cancel::{cancellation, CancelSignal, Canceller};
pub use error::Error;
pub use game::{Game, Outcome, Printer, Steering};
