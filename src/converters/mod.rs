//! Format converters

pub mod musicxml;

pub use musicxml::{read, read_path, read_str, write_path, write_string};
