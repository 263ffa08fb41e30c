//! Per-conversation state, externalized in a store keyed by chat id.
//!
//! The workflow core itself is stateless between calls; everything a
//! conversation accumulates (an intake draft, a staff collection sub-mode, a
//! pending close confirmation) lives here and is dropped when the
//! conversation returns to idle.

use std::collections::HashMap;

use crate::intake::IntakeSession;
use crate::models::Role;

#[derive(Debug, Clone, Default)]
pub enum Conversation {
    #[default]
    Idle,
    /// Client filling in a new ticket.
    Intake(IntakeSession),
    /// Engineer appending photos to their active ticket until "done".
    AddingPhotos { ticket_id: i64 },
    /// Engineer or accountant appending comments until "done".
    AddingComments { ticket_id: i64, role: Role },
    /// Staff member asked to close; waiting for the confirmation answer.
    ConfirmingClose { ticket_id: i64 },
}

#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: HashMap<i64, Conversation>,
}

impl SessionStore {
    pub fn new() -> Self {
        SessionStore::default()
    }

    pub fn get(&self, chat_id: i64) -> &Conversation {
        static IDLE: Conversation = Conversation::Idle;
        self.sessions.get(&chat_id).unwrap_or(&IDLE)
    }

    pub fn get_mut(&mut self, chat_id: i64) -> &mut Conversation {
        self.sessions.entry(chat_id).or_default()
    }

    pub fn set(&mut self, chat_id: i64, conversation: Conversation) {
        self.sessions.insert(chat_id, conversation);
    }

    /// Return the conversation to idle, discarding any accumulated state.
    pub fn clear(&mut self, chat_id: i64) {
        self.sessions.remove(&chat_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_chat_is_idle() {
        let store = SessionStore::new();
        assert!(matches!(store.get(42), Conversation::Idle));
    }

    #[test]
    fn conversations_are_independent_per_chat() {
        let mut store = SessionStore::new();
        store.set(1, Conversation::Intake(IntakeSession::new()));
        store.set(2, Conversation::AddingPhotos { ticket_id: 7 });

        assert!(matches!(store.get(1), Conversation::Intake(_)));
        assert!(matches!(
            store.get(2),
            Conversation::AddingPhotos { ticket_id: 7 }
        ));

        store.clear(1);
        assert!(matches!(store.get(1), Conversation::Idle));
        assert!(matches!(store.get(2), Conversation::AddingPhotos { .. }));
    }

    #[test]
    fn get_mut_materializes_an_idle_conversation() {
        let mut store = SessionStore::new();
        let conv = store.get_mut(5);
        assert!(matches!(conv, Conversation::Idle));
        *conv = Conversation::ConfirmingClose { ticket_id: 3 };
        assert!(matches!(
            store.get(5),
            Conversation::ConfirmingClose { ticket_id: 3 }
        ));
    }
}
