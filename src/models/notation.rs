//! Notations that span several notes: ties, slurs, glissandi and arpeggio brackets
//!
//! A [`Notation`] value names one occurrence of a marking. Two slurs with the same kind and
//! style are still different notations, so every notation carries a [`NotationId`] handed out
//! by the [`BuilderArena`](crate::builders::BuilderArena) that created it, and equality goes
//! through that id.
//!
//! Each note touched by a notation owns one [`Connection`] for it. The connections form a
//! singly linked chain from the first note to the last:
//!
//! ```text
//! Begin(next = B)  ->  Middle(next = C)  ->  End
//!      A                    B                  C
//! ```

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::score::{GraceNote, Note};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NotationKind {
    Tie,
    Slur,
    Glissando,
    Arpeggiate,
    ArpeggiateUp,
    ArpeggiateDown,
    NonArpeggiate,
}

impl NotationKind {
    pub fn is_arpeggiation(&self) -> bool {
        matches!(
            self,
            NotationKind::Arpeggiate
                | NotationKind::ArpeggiateUp
                | NotationKind::ArpeggiateDown
                | NotationKind::NonArpeggiate
        )
    }

    /// Arpeggio brackets other than non-arpeggiate are marked on every note they cover,
    /// so they never pick up notes implicitly.
    pub fn is_implicitly_continued(&self) -> bool {
        !self.is_arpeggiation() || *self == NotationKind::NonArpeggiate
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotationStyle {
    #[default]
    Solid,
    Dashed,
    Dotted,
    Wavy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NotationId(pub(crate) u64);

impl NotationId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Notation {
    id: NotationId,
    kind: NotationKind,
    style: NotationStyle,
}

impl Notation {
    pub(crate) fn new(id: NotationId, kind: NotationKind, style: NotationStyle) -> Self {
        Self { id, kind, style }
    }

    pub fn id(&self) -> NotationId {
        self.id
    }

    pub fn kind(&self) -> NotationKind {
        self.kind
    }

    pub fn style(&self) -> NotationStyle {
        self.style
    }
}

impl fmt::Display for Notation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}#{} ({:?})", self.kind, self.id.0, self.style)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionRole {
    Begin,
    Middle,
    End,
}

/// The next participant of a notation chain
#[derive(Debug, Clone)]
pub enum Connected {
    Note(Arc<Note>),
    GraceNote(Arc<GraceNote>),
    /// The principal note of the grace note holding this connection.
    /// Used when a grace note is slurred or tied into the note it ornaments.
    PrincipalNote,
}

impl Connected {
    pub fn as_note(&self) -> Option<&Arc<Note>> {
        match self {
            Connected::Note(note) => Some(note),
            _ => None,
        }
    }

    pub fn as_grace_note(&self) -> Option<&Arc<GraceNote>> {
        match self {
            Connected::GraceNote(note) => Some(note),
            _ => None,
        }
    }

    fn connection(&self, notation: &Notation) -> Option<&Connection> {
        match self {
            Connected::Note(note) => note.connection(notation),
            Connected::GraceNote(note) => note.connection(notation),
            Connected::PrincipalNote => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Connection {
    notation: Notation,
    role: ConnectionRole,
    next: Option<Connected>,
}

impl Connection {
    pub fn begin(notation: Notation, next: Connected) -> Self {
        Self {
            notation,
            role: ConnectionRole::Begin,
            next: Some(next),
        }
    }

    pub fn middle(notation: Notation, next: Connected) -> Self {
        Self {
            notation,
            role: ConnectionRole::Middle,
            next: Some(next),
        }
    }

    pub fn end(notation: Notation) -> Self {
        Self {
            notation,
            role: ConnectionRole::End,
            next: None,
        }
    }

    pub fn notation(&self) -> &Notation {
        &self.notation
    }

    pub fn role(&self) -> ConnectionRole {
        self.role
    }

    pub fn next(&self) -> Option<&Connected> {
        self.next.as_ref()
    }

    pub fn is_begin(&self) -> bool {
        self.role == ConnectionRole::Begin
    }

    pub fn is_end(&self) -> bool {
        self.role == ConnectionRole::End
    }

    /// All participants after the holder of this connection, in order.
    /// Stops at a principal-note link since the principal is not reachable from here.
    pub fn following(&self) -> Vec<Connected> {
        let mut following = Vec::new();
        let mut current = self.next.clone();
        while let Some(connected) = current {
            current = connected
                .connection(&self.notation)
                .and_then(|connection| connection.next.clone());
            following.push(connected);
        }
        following
    }
}
