//! MusicXML reading and writing
//!
//! Only uncompressed `score-partwise` documents are handled. The reader streams the
//! document with `quick-xml`. The writer builds the output in a string buffer.

pub mod duration;
pub mod helpers;
pub mod reader;
pub mod tags;
pub mod writer;

use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::info;

use crate::config::{ReaderOptions, WriterOptions};
use crate::error::{NotationError, Result};
use crate::models::Score;

pub use duration::{NoteType, SymbolicDuration, TupletRatio};
pub use reader::resolution::NotationResolutionTable;
pub use writer::NotationNumberAllocator;

/// Read a score from any buffered source
pub fn read<R: BufRead>(source: R, options: &ReaderOptions) -> Result<Score> {
    reader::read_score(source, options)
}

pub fn read_str(xml: &str, options: &ReaderOptions) -> Result<Score> {
    read(xml.as_bytes(), options)
}

/// Read a score from a file. Errors carry the path.
pub fn read_path<P: AsRef<Path>>(path: P, options: &ReaderOptions) -> Result<Score> {
    let path = path.as_ref();
    info!("reading {}", path.display());
    let file = File::open(path).map_err(|e| NotationError::from(e).with_path(path))?;
    read(BufReader::new(file), options).map_err(|e| e.with_path(path))
}

pub fn write_string(score: &Score, options: &WriterOptions) -> Result<String> {
    writer::write_score(score, options)
}

/// Write a score to a file, replacing it if it exists
pub fn write_path<P: AsRef<Path>>(score: &Score, path: P, options: &WriterOptions) -> Result<()> {
    let path = path.as_ref();
    let xml = write_string(score, options)?;
    fs::write(path, xml).map_err(|e| NotationError::from(e).with_path(path))?;
    info!("wrote {}", path.display());
    Ok(())
}
