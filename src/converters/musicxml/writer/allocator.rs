//! Number attributes for notations that are open while writing
//!
//! MusicXML tells overlapping slurs, ties and glissandi apart by a small `number` attribute.
//! The allocator hands out the lowest free number when a notation begins and takes it back
//! when the notation ends, so numbers stay within the range readers expect.

use std::collections::{BTreeSet, HashMap};

use log::warn;

use crate::models::{Notation, NotationKind};

/// Highest number handed out
pub const MAX_NOTATION_NUMBER: u8 = 6;

#[derive(Debug, Default)]
pub struct NotationNumberAllocator {
    numbers: HashMap<Notation, u8>,
    used: BTreeSet<u8>,
}

impl NotationNumberAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number for a notation that begins on the note being written.
    ///
    /// Arpeggios are written on every note they cover and take no number. A non-arpeggiate
    /// bracket is written at its ends and numbered like a slur.
    pub fn start(&mut self, notation: &Notation) -> Option<u8> {
        let kind = notation.kind();
        if kind.is_arpeggiation() && kind != NotationKind::NonArpeggiate {
            return None;
        }
        if let Some(number) = self.numbers.get(notation) {
            return Some(*number);
        }

        let number = match (1..=MAX_NOTATION_NUMBER).find(|n| !self.used.contains(n)) {
            Some(number) => number,
            None => {
                warn!(
                    "more than {} notations open at once, {} shares number {}",
                    MAX_NOTATION_NUMBER, notation, MAX_NOTATION_NUMBER
                );
                MAX_NOTATION_NUMBER
            }
        };
        self.used.insert(number);
        self.numbers.insert(*notation, number);
        Some(number)
    }

    /// Number of a notation that ends on the note being written, freeing it.
    ///
    /// Returns `None` for arpeggios and for notations that were never started.
    pub fn stop(&mut self, notation: &Notation) -> Option<u8> {
        let number = self.numbers.remove(notation)?;
        if !self.numbers.values().any(|n| *n == number) {
            self.used.remove(&number);
        }
        Some(number)
    }

    pub fn open_count(&self) -> usize {
        self.numbers.len()
    }
}
