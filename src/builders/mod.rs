//! Mutable builders and the notation connection graph
//!
//! Notes are constructed in two phases. While a document is read, each note gets a
//! [`NoteBuilder`] stored in a [`BuilderArena`] and addressed by [`BuilderId`]. Notations
//! that span several notes are recorded as edges between builders:
//!
//! ```text
//!   connect(A, slur, B)         A.forward[slur] = B      B.connected_from += slur
//!   connect(B, slur, C)         B.forward[slur] = C      C.connected_from += slur
//! ```
//!
//! Nothing is resolved until a note is built. [`BuilderArena::build_note`] turns every
//! notation touching a builder into a [`Connection`]:
//!
//! - connected from only: `End`
//! - forward only: `Begin`, building the target first
//! - both: `Middle`, building the target first
//!
//! Builds are memoized per builder, so a tie chain built from its first note is shared with
//! the measures holding the later notes. A builder that is asked to build while its own build
//! is still running fails with [`NotationError::CyclicBuildDependency`] instead of recursing.

mod measure;

use std::fmt;
use std::sync::Arc;

use log::debug;

use crate::error::{NotationError, Result};
use crate::models::{
    Articulation, Connected, Connection, ConnectionRole, GraceNote, GraceNoteKind, Note, Notation,
    NotationId, NotationKind, NotationStyle, Ornament, Ornamental, Pitch, RationalDuration,
};

pub use measure::{DurationalBuilder, MeasureBuilder, PartBuilder, RestBuilder};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BuilderId(usize);

impl fmt::Display for BuilderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Values of a note or grace note before it is built
#[derive(Debug, Clone)]
pub struct NoteBuilder {
    pitch: Pitch,
    unpitched: bool,
    duration: RationalDuration,
    articulations: Vec<Articulation>,
    ornaments: Vec<Ornament>,
    grace: Option<GraceNoteKind>,
}

impl NoteBuilder {
    pub fn new(pitch: Pitch, duration: RationalDuration) -> Self {
        Self {
            pitch,
            unpitched: false,
            duration,
            articulations: Vec::new(),
            ornaments: Vec::new(),
            grace: None,
        }
    }

    /// A grace note drawn with `display_duration`
    pub fn grace(pitch: Pitch, display_duration: RationalDuration, kind: GraceNoteKind) -> Self {
        Self {
            grace: Some(kind),
            ..Self::new(pitch, display_duration)
        }
    }

    /// Mark as unpitched. The pitch is then only a display position.
    pub fn unpitched(mut self) -> Self {
        self.unpitched = true;
        self
    }

    pub fn with_articulation(mut self, articulation: Articulation) -> Self {
        self.add_articulation(articulation);
        self
    }

    pub fn pitch(&self) -> Pitch {
        self.pitch
    }

    pub fn set_pitch(&mut self, pitch: Pitch) {
        self.pitch = pitch;
    }

    pub fn is_unpitched(&self) -> bool {
        self.unpitched
    }

    /// Duration, or the display duration for grace notes
    pub fn duration(&self) -> RationalDuration {
        self.duration
    }

    pub fn set_duration(&mut self, duration: RationalDuration) {
        self.duration = duration;
    }

    pub fn articulations(&self) -> &[Articulation] {
        &self.articulations
    }

    pub fn add_articulation(&mut self, articulation: Articulation) {
        if !self.articulations.contains(&articulation) {
            self.articulations.push(articulation);
        }
    }

    pub fn ornaments(&self) -> &[Ornament] {
        &self.ornaments
    }

    pub fn add_ornament(&mut self, ornament: Ornament) {
        if !self.ornaments.contains(&ornament) {
            self.ornaments.push(ornament);
        }
    }

    pub fn grace_kind(&self) -> Option<GraceNoteKind> {
        self.grace
    }

    pub fn set_grace_kind(&mut self, kind: GraceNoteKind) {
        self.grace = Some(kind);
    }

    pub fn is_grace(&self) -> bool {
        self.grace.is_some()
    }
}

/// Grace notes attached to a principal note, single or as a chord
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrnamentalGroup {
    Single(BuilderId),
    Chord(Vec<BuilderId>),
}

impl OrnamentalGroup {
    pub fn members(&self) -> &[BuilderId] {
        match self {
            OrnamentalGroup::Single(id) => std::slice::from_ref(id),
            OrnamentalGroup::Chord(ids) => ids,
        }
    }
}

#[derive(Debug, Clone)]
enum Built {
    Note(Arc<Note>),
    Grace(Arc<GraceNote>),
}

#[derive(Debug)]
struct Node {
    builder: NoteBuilder,
    connected_from: Vec<Notation>,
    forward: Vec<(Notation, BuilderId)>,
    // Links from a preceding grace note into its own principal
    principal_links: Vec<(Notation, ConnectionRole)>,
    preceding: Vec<OrnamentalGroup>,
    succeeding: Vec<OrnamentalGroup>,
    principal: Option<BuilderId>,
    cached: Option<Built>,
    is_building: bool,
}

impl Node {
    fn new(builder: NoteBuilder) -> Self {
        Self {
            builder,
            connected_from: Vec::new(),
            forward: Vec::new(),
            principal_links: Vec::new(),
            preceding: Vec::new(),
            succeeding: Vec::new(),
            principal: None,
            cached: None,
            is_building: false,
        }
    }
}

#[derive(Debug, Default)]
pub struct BuilderArena {
    nodes: Vec<Node>,
    next_notation: u64,
}

impl BuilderArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, builder: NoteBuilder) -> BuilderId {
        self.nodes.push(Node::new(builder));
        BuilderId(self.nodes.len() - 1)
    }

    fn node(&self, id: BuilderId) -> Result<&Node> {
        self.nodes
            .get(id.0)
            .ok_or_else(|| NotationError::InvalidInput(format!("unknown builder {}", id)))
    }

    fn node_mut(&mut self, id: BuilderId) -> Result<&mut Node> {
        self.nodes
            .get_mut(id.0)
            .ok_or_else(|| NotationError::InvalidInput(format!("unknown builder {}", id)))
    }

    pub fn builder(&self, id: BuilderId) -> Result<&NoteBuilder> {
        Ok(&self.node(id)?.builder)
    }

    /// Mutable access to the builder values. Drops any cached build of this builder.
    pub fn builder_mut(&mut self, id: BuilderId) -> Result<&mut NoteBuilder> {
        let node = self.node_mut(id)?;
        node.cached = None;
        Ok(&mut node.builder)
    }

    pub fn is_grace(&self, id: BuilderId) -> bool {
        self.node(id).map(|n| n.builder.is_grace()).unwrap_or(false)
    }

    /// A fresh notation occurrence, distinct from every other one made by this arena
    pub fn new_notation(&mut self, kind: NotationKind, style: NotationStyle) -> Notation {
        self.next_notation += 1;
        Notation::new(NotationId(self.next_notation), kind, style)
    }

    /// Record that `notation` continues from `from` to `to`
    pub fn connect(&mut self, from: BuilderId, notation: Notation, to: BuilderId) -> Result<()> {
        self.node(to)?;
        let source = self.node_mut(from)?;
        match source.forward.iter_mut().find(|(n, _)| *n == notation) {
            Some(entry) => entry.1 = to,
            None => source.forward.push((notation, to)),
        }
        source.cached = None;

        let target = self.node_mut(to)?;
        if !target.connected_from.contains(&notation) {
            target.connected_from.push(notation);
        }
        target.cached = None;
        Ok(())
    }

    /// Tie `from` to `to` with a new solid tie
    pub fn tie(&mut self, from: BuilderId, to: BuilderId) -> Result<Notation> {
        let tie = self.new_notation(NotationKind::Tie, NotationStyle::Solid);
        self.connect(from, tie, to)?;
        Ok(tie)
    }

    pub fn following(&self, id: BuilderId, notation: &Notation) -> Option<BuilderId> {
        self.node(id)
            .ok()?
            .forward
            .iter()
            .find(|(n, _)| n == notation)
            .map(|(_, target)| *target)
    }

    pub fn is_connected_from(&self, id: BuilderId, notation: &Notation) -> bool {
        self.node(id)
            .map(|n| n.connected_from.contains(notation))
            .unwrap_or(false)
    }

    pub fn set_preceding_grace_notes(
        &mut self,
        principal: BuilderId,
        groups: Vec<OrnamentalGroup>,
    ) -> Result<()> {
        self.attach_grace_notes(principal, &groups)?;
        let node = self.node_mut(principal)?;
        node.preceding = groups;
        node.cached = None;
        Ok(())
    }

    pub fn set_succeeding_grace_notes(
        &mut self,
        principal: BuilderId,
        groups: Vec<OrnamentalGroup>,
    ) -> Result<()> {
        self.attach_grace_notes(principal, &groups)?;
        let node = self.node_mut(principal)?;
        node.succeeding = groups;
        node.cached = None;
        Ok(())
    }

    fn attach_grace_notes(&mut self, principal: BuilderId, groups: &[OrnamentalGroup]) -> Result<()> {
        if self.node(principal)?.builder.is_grace() {
            return Err(NotationError::InvalidInput(format!(
                "grace notes cannot be attached to grace note {}",
                principal
            )));
        }
        for id in groups.iter().flat_map(|g| g.members()) {
            let node = self.node_mut(*id)?;
            if !node.builder.is_grace() {
                return Err(NotationError::InvalidInput(format!(
                    "builder {} is not a grace note",
                    id
                )));
            }
            node.principal = Some(principal);
        }
        Ok(())
    }

    pub fn preceding_grace_notes(&self, principal: BuilderId) -> &[OrnamentalGroup] {
        self.node(principal).map(|n| n.preceding.as_slice()).unwrap_or(&[])
    }

    pub fn succeeding_grace_notes(&self, principal: BuilderId) -> &[OrnamentalGroup] {
        self.node(principal).map(|n| n.succeeding.as_slice()).unwrap_or(&[])
    }

    pub fn clear_cache(&mut self, id: BuilderId) -> Result<()> {
        self.node_mut(id)?.cached = None;
        Ok(())
    }

    pub fn build_note(&mut self, id: BuilderId) -> Result<Arc<Note>> {
        let node = self.node(id)?;
        if let Some(Built::Note(note)) = &node.cached {
            return Ok(Arc::clone(note));
        }
        if node.builder.is_grace() {
            return Err(NotationError::InvalidInput(format!(
                "builder {} holds a grace note",
                id
            )));
        }
        if node.is_building {
            return Err(NotationError::CyclicBuildDependency(format!(
                "note builder {} was asked to build while building; the notation graph loops back to it",
                id
            )));
        }

        self.node_mut(id)?.is_building = true;
        let result = self.assemble_note(id);
        let node = self.node_mut(id)?;
        node.is_building = false;

        let note = Arc::new(result?);
        node.cached = Some(Built::Note(Arc::clone(&note)));
        Ok(note)
    }

    /// Build a grace note. When its principal note is not built yet the principal is built
    /// first, which builds this grace note along with it.
    pub fn build_grace_note(&mut self, id: BuilderId) -> Result<Arc<GraceNote>> {
        let node = self.node(id)?;
        if let Some(Built::Grace(note)) = &node.cached {
            return Ok(Arc::clone(note));
        }
        if !node.builder.is_grace() {
            return Err(NotationError::InvalidInput(format!(
                "builder {} does not hold a grace note",
                id
            )));
        }

        if let Some(principal) = node.principal {
            let principal_node = self.node(principal)?;
            if !principal_node.is_building && principal_node.cached.is_none() {
                debug!("building principal {} before grace note {}", principal, id);
                self.build_note(principal)?;
                if let Some(Built::Grace(note)) = &self.node(id)?.cached {
                    return Ok(Arc::clone(note));
                }
            }
        }

        self.build_grace_in_place(id)
    }

    fn build_grace_in_place(&mut self, id: BuilderId) -> Result<Arc<GraceNote>> {
        let node = self.node(id)?;
        if let Some(Built::Grace(note)) = &node.cached {
            return Ok(Arc::clone(note));
        }
        if node.is_building {
            return Err(NotationError::CyclicBuildDependency(format!(
                "grace note builder {} was asked to build while building; the notation graph loops back to it",
                id
            )));
        }

        self.node_mut(id)?.is_building = true;
        let result = self.assemble_grace_note(id);
        let node = self.node_mut(id)?;
        node.is_building = false;

        let note = Arc::new(result?);
        node.cached = Some(Built::Grace(Arc::clone(&note)));
        Ok(note)
    }

    fn assemble_note(&mut self, id: BuilderId) -> Result<Note> {
        self.link_grace_notes_to_principal(id)?;
        let connections = self.resolve_connections(id)?;

        let node = self.node(id)?;
        let preceding_groups = node.preceding.clone();
        let succeeding_groups = node.succeeding.clone();
        let preceding_grace_notes = self.build_ornamentals(&preceding_groups)?;
        let succeeding_grace_notes = self.build_ornamentals(&succeeding_groups)?;

        let builder = &self.node(id)?.builder;
        Ok(Note {
            pitch: builder.pitch,
            unpitched: builder.unpitched,
            duration: builder.duration,
            articulations: builder.articulations.clone(),
            ornaments: builder.ornaments.clone(),
            connections,
            preceding_grace_notes,
            succeeding_grace_notes,
        })
    }

    fn assemble_grace_note(&mut self, id: BuilderId) -> Result<GraceNote> {
        let mut connections = self.resolve_connections(id)?;

        let node = self.node(id)?;
        for (notation, role) in &node.principal_links {
            connections.push(match role {
                ConnectionRole::Middle => Connection::middle(*notation, Connected::PrincipalNote),
                _ => Connection::begin(*notation, Connected::PrincipalNote),
            });
        }

        let builder = &node.builder;
        Ok(GraceNote {
            pitch: builder.pitch,
            unpitched: builder.unpitched,
            display_duration: builder.duration,
            kind: builder.grace.unwrap_or(GraceNoteKind::Grace),
            articulations: builder.articulations.clone(),
            ornaments: builder.ornaments.clone(),
            connections,
        })
    }

    /// Notations running from the last preceding grace notes into `principal` are turned
    /// into principal links on the grace notes, so building them does not build `principal`.
    fn link_grace_notes_to_principal(&mut self, principal: BuilderId) -> Result<()> {
        let last_group = match self.node(principal)?.preceding.last() {
            Some(group) => group.clone(),
            None => return Ok(()),
        };

        for grace in last_group.members() {
            let node = self.node_mut(*grace)?;
            let (into_principal, others): (Vec<_>, Vec<_>) = node
                .forward
                .drain(..)
                .partition(|(_, target)| *target == principal);
            node.forward = others;

            for (notation, _) in into_principal {
                let role = match node.connected_from.iter().position(|n| *n == notation) {
                    Some(index) => {
                        node.connected_from.remove(index);
                        ConnectionRole::Middle
                    }
                    None => ConnectionRole::Begin,
                };
                node.principal_links.push((notation, role));
            }
        }
        Ok(())
    }

    fn resolve_connections(&mut self, id: BuilderId) -> Result<Vec<Connection>> {
        let node = self.node(id)?;
        let connected_from = node.connected_from.clone();
        let forward = node.forward.clone();

        let mut notations: Vec<Notation> = connected_from.clone();
        for (notation, _) in &forward {
            if !notations.contains(notation) {
                notations.push(*notation);
            }
        }

        let mut connections = Vec::with_capacity(notations.len());
        for notation in notations {
            let target = forward
                .iter()
                .find(|(n, _)| *n == notation)
                .map(|(_, target)| *target);

            let connection = match (connected_from.contains(&notation), target) {
                (true, None) => Connection::end(notation),
                (true, Some(target)) => Connection::middle(notation, self.build_connected(target)?),
                (false, Some(target)) => Connection::begin(notation, self.build_connected(target)?),
                (false, None) => continue,
            };
            connections.push(connection);
        }
        Ok(connections)
    }

    fn build_connected(&mut self, target: BuilderId) -> Result<Connected> {
        if self.is_grace(target) {
            Ok(Connected::GraceNote(self.build_grace_note(target)?))
        } else {
            Ok(Connected::Note(self.build_note(target)?))
        }
    }

    fn build_ornamentals(&mut self, groups: &[OrnamentalGroup]) -> Result<Vec<Ornamental>> {
        let mut ornamentals = Vec::with_capacity(groups.len());
        for group in groups {
            ornamentals.push(match group {
                OrnamentalGroup::Single(id) => Ornamental::Single(self.build_grace_in_place(*id)?),
                OrnamentalGroup::Chord(ids) => {
                    let mut notes = Vec::with_capacity(ids.len());
                    for id in ids {
                        notes.push(self.build_grace_in_place(*id)?);
                    }
                    Ornamental::Chord(notes)
                }
            });
        }
        Ok(ornamentals)
    }
}
