//! Score model with a MusicXML reader and writer
//!
//! Durations are exact fractions of a whole note ([`RationalDuration`]). Ties, slurs,
//! glissandi and arpeggio brackets are [`Notation`]s linking the notes they span. The
//! streaming reader collects notes into builders and resolves those links when each part
//! ends. The writer turns them back into numbered start and stop markers.
//!
//! ```no_run
//! use notation_xml::{read_path, write_string, ReaderOptions, WriterOptions};
//!
//! let score = read_path("song.musicxml", &ReaderOptions::default())?;
//! let xml = write_string(&score, &WriterOptions::minified())?;
//! # Ok::<(), notation_xml::NotationError>(())
//! ```

pub mod builders;
pub mod config;
pub mod converters;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::{ReaderOptions, WriterOptions};
pub use converters::{read, read_path, read_str, write_path, write_string};
pub use error::{NotationError, Result};
pub use models::{
    Connection, ConnectionRole, Durational, Notation, NotationKind, NotationStyle, Note, Part,
    Pitch, RationalDuration, Score, Step,
};
