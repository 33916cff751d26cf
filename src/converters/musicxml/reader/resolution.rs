//! Tracking of notations that are still open while a part is read
//!
//! A MusicXML document marks a slur on the note where it starts and on the note where it
//! stops, possibly many notes later. The table collects the builders a notation passes
//! through, per staff and voice, and connects them in the [`BuilderArena`] once the notation
//! is closed.
//!
//! Open notations are keyed by `(number, kind)`. The line style is not part of the key, so a
//! slur that starts dashed and stops without a `line-type` still closes, keeping the style
//! of its first marker.

use std::collections::BTreeMap;

use log::{debug, warn};

use crate::builders::{BuilderArena, BuilderId};
use crate::error::{NotationError, Result};
use crate::models::{NotationKind, NotationStyle};

/// Staff and voice a note was read in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Scope {
    pub staff: u32,
    pub voice: u32,
}

impl Scope {
    pub fn new(staff: u32, voice: u32) -> Self {
        Self { staff, voice }
    }
}

type Key = (i32, NotationKind);

#[derive(Debug, Clone, Copy)]
struct Marked {
    number: i32,
    kind: NotationKind,
    style: NotationStyle,
}

impl Marked {
    fn key(&self) -> Key {
        (self.number, self.kind)
    }
}

#[derive(Debug)]
struct Unresolved {
    number: i32,
    kind: NotationKind,
    style: NotationStyle,
    builders: Vec<BuilderId>,
}

impl Unresolved {
    fn new(marked: Marked) -> Self {
        Self {
            number: marked.number,
            kind: marked.kind,
            style: marked.style,
            builders: Vec::new(),
        }
    }

    fn push(&mut self, builder: BuilderId) {
        if !self.builders.contains(&builder) {
            self.builders.push(builder);
        }
    }

    /// Connect the collected builders in order. When the notation ends on a grace note the
    /// closest ordinary note before it is returned, since the trailing grace notes ornament
    /// that note.
    fn resolve(&self, arena: &mut BuilderArena) -> Result<Option<BuilderId>> {
        let notation = arena.new_notation(self.kind, self.style);
        for pair in self.builders.windows(2) {
            arena.connect(pair[0], notation, pair[1])?;
        }
        debug!(
            "resolved {} number {} over {} notes",
            notation,
            self.number,
            self.builders.len()
        );

        match self.builders.last() {
            Some(last) if arena.is_grace(*last) => Ok(self
                .builders
                .iter()
                .rev()
                .find(|id| !arena.is_grace(**id))
                .copied()),
            _ => Ok(None),
        }
    }
}

#[derive(Debug, Default)]
pub struct NotationResolutionTable {
    strict: bool,
    unresolved: BTreeMap<u32, BTreeMap<u32, BTreeMap<Key, Unresolved>>>,
    to_start: Vec<Marked>,
    to_end: Vec<Marked>,
}

impl NotationResolutionTable {
    pub fn new(strict: bool) -> Self {
        Self {
            strict,
            ..Self::default()
        }
    }

    /// Mark a notation to be started, or continued, by the next builder
    pub fn queue_start(&mut self, number: i32, kind: NotationKind, style: NotationStyle) {
        self.to_start.push(Marked { number, kind, style });
    }

    /// Mark a notation to be closed by the next builder
    pub fn queue_end(&mut self, number: i32, kind: NotationKind) {
        self.to_end.push(Marked {
            number,
            kind,
            style: NotationStyle::default(),
        });
    }

    pub fn has_queued(&self) -> bool {
        !self.to_start.is_empty() || !self.to_end.is_empty()
    }

    /// Drop queued markers that have no builder to attach to. Returns how many were dropped.
    pub fn discard_queued(&mut self) -> usize {
        let count = self.to_start.len() + self.to_end.len();
        self.to_start.clear();
        self.to_end.clear();
        count
    }

    pub fn has_unresolved(&self, scope: Scope) -> bool {
        self.unresolved
            .get(&scope.staff)
            .and_then(|voices| voices.get(&scope.voice))
            .map(|open| !open.is_empty())
            .unwrap_or(false)
    }

    pub fn unresolved_count(&self) -> usize {
        self.unresolved
            .values()
            .flat_map(|voices| voices.values())
            .map(|open| open.len())
            .sum()
    }

    fn open_mut(&mut self, scope: Scope) -> &mut BTreeMap<Key, Unresolved> {
        self.unresolved
            .entry(scope.staff)
            .or_default()
            .entry(scope.voice)
            .or_default()
    }

    /// Add `builder` to every queued start marker, opening the notations not yet open
    pub fn start_or_continue_notations(&mut self, scope: Scope, builder: BuilderId) {
        let queued = std::mem::take(&mut self.to_start);
        let open = self.open_mut(scope);
        for marked in queued {
            open.entry(marked.key())
                .or_insert_with(|| Unresolved::new(marked))
                .push(builder);
        }
    }

    /// Add `builder` to the open notations of its scope that run through unmarked notes
    pub fn continue_ongoing_notations(&mut self, scope: Scope, builder: BuilderId) {
        if !self.has_unresolved(scope) {
            return;
        }
        for unresolved in self.open_mut(scope).values_mut() {
            if unresolved.kind.is_implicitly_continued() {
                unresolved.push(builder);
            }
        }
    }

    /// Close every queued end marker with `builder`.
    ///
    /// Returns the notes that should take the pending grace notes as succeeding grace notes.
    pub fn end_notations(
        &mut self,
        scope: Scope,
        builder: BuilderId,
        arena: &mut BuilderArena,
    ) -> Result<Vec<BuilderId>> {
        let queued = std::mem::take(&mut self.to_end);
        let mut principals = Vec::new();
        for marked in queued {
            if let Some(principal) = self.end_notation(scope, marked.key(), builder, arena)? {
                principals.push(principal);
            }
        }
        Ok(principals)
    }

    fn end_notation(
        &mut self,
        scope: Scope,
        key: Key,
        builder: BuilderId,
        arena: &mut BuilderArena,
    ) -> Result<Option<BuilderId>> {
        let removed = self
            .unresolved
            .get_mut(&scope.staff)
            .and_then(|voices| voices.get_mut(&scope.voice))
            .and_then(|open| open.remove(&key));

        match removed {
            Some(mut unresolved) => {
                unresolved.push(builder);
                unresolved.resolve(arena)
            }
            None => {
                let message = format!(
                    "end of {:?} number {} without a start, staff {}, voice {}",
                    key.1, key.0, scope.staff, scope.voice
                );
                if self.strict {
                    return Err(NotationError::parse(message));
                }
                warn!("{}", message);
                Ok(None)
            }
        }
    }

    /// Close the arpeggios of a chord that was just completed.
    ///
    /// Arpeggio brackets are marked on every note of the chord but have no end marker, so
    /// the last note collected so far closes them. Non-arpeggiate brackets have explicit
    /// ends and are left open.
    pub fn resolve_arpeggios(
        &mut self,
        scope: Scope,
        arena: &mut BuilderArena,
    ) -> Result<Vec<BuilderId>> {
        if !self.has_unresolved(scope) {
            return Ok(Vec::new());
        }

        let open = self.open_mut(scope);
        let closable: Vec<Key> = open
            .iter()
            .filter(|(_, u)| u.kind.is_arpeggiation() && u.kind != NotationKind::NonArpeggiate)
            .filter(|(_, u)| u.builders.len() > 1)
            .map(|(key, _)| *key)
            .collect();

        let mut principals = Vec::new();
        for key in closable {
            if let Some(unresolved) = open.remove(&key) {
                if let Some(principal) = unresolved.resolve(arena)? {
                    principals.push(principal);
                }
            }
        }
        Ok(principals)
    }

    /// Forget everything. Returns the number of notations that were still open.
    pub fn reset(&mut self) -> usize {
        for (staff, voices) in &self.unresolved {
            for (voice, open) in voices {
                for unresolved in open.values() {
                    warn!(
                        "{:?} number {} was never closed, staff {}, voice {}",
                        unresolved.kind, unresolved.number, staff, voice
                    );
                }
            }
        }
        let count = self.unresolved_count();
        self.unresolved.clear();
        self.to_start.clear();
        self.to_end.clear();
        count
    }
}
