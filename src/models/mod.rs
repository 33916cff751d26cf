//! Score model
//!
//! Durations, pitches, cross-note notations and the immutable score produced by the builders.

pub mod duration;
pub mod notation;
pub mod pitch;
pub mod score;

pub use duration::RationalDuration;
pub use notation::{Connected, Connection, ConnectionRole, Notation, NotationId, NotationKind, NotationStyle};
pub use pitch::{Pitch, Step};
pub use score::*;
