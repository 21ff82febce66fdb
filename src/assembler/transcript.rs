//! Conversation transcript types

use chrono::{DateTime, Utc};
use std::borrow::Cow;
use uuid::Uuid;

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// Lifecycle of a turn's text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnStatus {
    /// Assistant reply still receiving frames
    Open,
    Complete,
    /// Reply ended by a failure; `note` is shown after any partial text
    Errored { note: String },
}

/// One message in the conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub text: String,
    /// Position in the transcript
    pub sequence: usize,
    pub created_at: DateTime<Utc>,
    pub status: TurnStatus,
}

impl Turn {
    pub fn is_open(&self) -> bool {
        self.status == TurnStatus::Open
    }

    pub fn is_errored(&self) -> bool {
        matches!(self.status, TurnStatus::Errored { .. })
    }

    /// A finished assistant turn with nothing to show. Renderers skip these.
    pub fn is_blank(&self) -> bool {
        self.role == Role::Assistant && self.status == TurnStatus::Complete && self.text.is_empty()
    }

    /// Text as it should be rendered, including the error note if any.
    pub fn display_text(&self) -> Cow<'_, str> {
        match &self.status {
            TurnStatus::Errored { note } if self.text.is_empty() => Cow::Borrowed(note.as_str()),
            TurnStatus::Errored { note } => Cow::Owned(format!("{}\n\n{note}", self.text)),
            TurnStatus::Open | TurnStatus::Complete => Cow::Borrowed(self.text.as_str()),
        }
    }
}

/// Ordered history of one conversation.
///
/// Only the assembler mutates it, which is what keeps at most one assistant
/// turn open at a time.
#[derive(Debug, Clone)]
pub struct Transcript {
    id: Uuid,
    turns: Vec<Turn>,
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}

impl Transcript {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            turns: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn open_turn(&self) -> Option<&Turn> {
        self.turns.last().filter(|t| t.is_open())
    }

    pub(super) fn push_user(&mut self, text: String) -> &Turn {
        self.push(Role::User, text, TurnStatus::Complete)
    }

    /// The open assistant turn, created empty if there is none.
    pub(super) fn ensure_open_assistant(&mut self) -> &mut Turn {
        if !self.turns.last().is_some_and(Turn::is_open) {
            self.push(Role::Assistant, String::new(), TurnStatus::Open);
        }
        let last = self.turns.len() - 1;
        &mut self.turns[last]
    }

    fn push(&mut self, role: Role, text: String, status: TurnStatus) -> &Turn {
        let sequence = self.turns.len();
        self.turns.push(Turn {
            role,
            text,
            sequence,
            created_at: Utc::now(),
            status,
        });
        &self.turns[sequence]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_follows_insertion_order() {
        let mut transcript = Transcript::new();
        transcript.push_user("one".to_string());
        transcript.ensure_open_assistant();
        let seqs: Vec<usize> = transcript.turns().iter().map(|t| t.sequence).collect();
        assert_eq!(seqs, vec![0, 1]);
        assert!(transcript.open_turn().is_some());
    }

    #[test]
    fn test_display_text_with_error_note() {
        let turn = Turn {
            role: Role::Assistant,
            text: "Partial".to_string(),
            sequence: 1,
            created_at: Utc::now(),
            status: TurnStatus::Errored {
                note: "oops".to_string(),
            },
        };
        assert_eq!(turn.display_text(), "Partial\n\noops");
        assert!(!turn.is_blank());
    }

    #[test]
    fn test_blank_assistant_turn() {
        let mut transcript = Transcript::new();
        let turn = transcript.ensure_open_assistant();
        turn.status = TurnStatus::Complete;
        assert!(transcript.turns()[0].is_blank());
        assert!(transcript.open_turn().is_none());
    }

    #[test]
    fn test_clone_keeps_identity_and_turns() {
        let mut transcript = Transcript::new();
        transcript.push_user("Do you sell footballs?".to_string());
        let copy = transcript.clone();
        assert_eq!(copy.id(), transcript.id());
        assert_eq!(copy.turns(), transcript.turns());
        assert!(format!("{copy:?}").contains("Do you sell footballs?"));
    }
}
