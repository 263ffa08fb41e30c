//! Client-facing intake flow: a linear, per-conversation state machine that
//! collects machine number, optional photo, name and phone, and commits a
//! validated ticket draft on explicit confirmation.
//!
//! Validation failures are not faults: the session stays in the same state
//! and the reply tells the transport to re-prompt.

use crate::db::Database;
use crate::error::StorageResult;
use crate::models::TicketDraft;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntakeState {
    AwaitingMachineNumber,
    AwaitingPhoto,
    AwaitingFullName,
    AwaitingPhone,
    AwaitingConfirmation,
    Committed(i64),
    Cancelled,
}

/// One unit of client input, as classified by the transport.
#[derive(Debug, Clone, Copy)]
pub enum IntakeInput<'a> {
    Text(&'a str),
    Photo(&'a str),
    Skip,
    Accept,
    Reject,
    Cancel,
}

/// What the transport should say or do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntakeReply {
    /// Machine number not in the reference set; ask again.
    UnknownMachine(String),
    PromptPhoto,
    PromptFullName,
    PromptPhone,
    /// Phone failed the grammar; ask again.
    InvalidPhone,
    ConfirmDetails {
        full_name: String,
        phone: String,
        machine_number: String,
    },
    Committed(i64),
    /// Persistence failed; the conversation ends, the client must restart.
    CommitFailed,
    Cancelled,
    /// Input that makes no sense in the current state; repeat the prompt.
    Unexpected,
}

#[derive(Debug, Clone, Default)]
struct Draft {
    machine_number: Option<String>,
    photo: Option<String>,
    full_name: Option<String>,
    phone: Option<String>,
}

/// Per-conversation intake session. The draft lives only here and is
/// discarded on any terminal transition.
#[derive(Debug, Clone)]
pub struct IntakeSession {
    state: IntakeState,
    draft: Draft,
}

impl Default for IntakeSession {
    fn default() -> Self {
        Self::new()
    }
}

impl IntakeSession {
    pub fn new() -> Self {
        IntakeSession {
            state: IntakeState::AwaitingMachineNumber,
            draft: Draft::default(),
        }
    }

    pub fn state(&self) -> &IntakeState {
        &self.state
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.state,
            IntakeState::Committed(_) | IntakeState::Cancelled
        )
    }

    /// Feed one input into the machine. Storage errors from the machine
    /// lookup propagate; a failed commit is reported as [`IntakeReply::CommitFailed`]
    /// and ends the conversation.
    pub fn advance(&mut self, input: IntakeInput<'_>, db: &Database) -> StorageResult<IntakeReply> {
        if matches!(input, IntakeInput::Cancel) && !self.is_terminal() {
            self.cancel();
            return Ok(IntakeReply::Cancelled);
        }

        match (self.state.clone(), input) {
            (IntakeState::AwaitingMachineNumber, IntakeInput::Text(raw)) => {
                let number = raw.trim();
                if !db.machine_exists(number)? {
                    return Ok(IntakeReply::UnknownMachine(number.to_string()));
                }
                self.draft.machine_number = Some(number.to_string());
                self.state = IntakeState::AwaitingPhoto;
                Ok(IntakeReply::PromptPhoto)
            }
            (IntakeState::AwaitingPhoto, IntakeInput::Photo(media_ref)) => {
                self.draft.photo = Some(media_ref.to_string());
                self.state = IntakeState::AwaitingFullName;
                Ok(IntakeReply::PromptFullName)
            }
            (IntakeState::AwaitingPhoto, IntakeInput::Skip) => {
                self.state = IntakeState::AwaitingFullName;
                Ok(IntakeReply::PromptFullName)
            }
            (IntakeState::AwaitingFullName, IntakeInput::Text(raw)) => {
                // Taken as-is, no validation.
                self.draft.full_name = Some(raw.trim().to_string());
                self.state = IntakeState::AwaitingPhone;
                Ok(IntakeReply::PromptPhone)
            }
            (IntakeState::AwaitingPhone, IntakeInput::Text(raw)) => {
                let phone = raw.trim();
                if !phone_is_valid(phone) {
                    return Ok(IntakeReply::InvalidPhone);
                }
                self.draft.phone = Some(phone.to_string());
                self.state = IntakeState::AwaitingConfirmation;
                Ok(IntakeReply::ConfirmDetails {
                    full_name: self.draft.full_name.clone().unwrap_or_default(),
                    phone: phone.to_string(),
                    machine_number: self.draft.machine_number.clone().unwrap_or_default(),
                })
            }
            (IntakeState::AwaitingConfirmation, IntakeInput::Accept) => {
                let draft = TicketDraft {
                    machine_number: self.draft.machine_number.take().unwrap_or_default(),
                    client_photo: self.draft.photo.take(),
                    full_name: self.draft.full_name.take().unwrap_or_default(),
                    phone: self.draft.phone.take().unwrap_or_default(),
                    issue_description: None,
                };
                match db.create_ticket(&draft) {
                    Ok(id) => {
                        self.state = IntakeState::Committed(id);
                        Ok(IntakeReply::Committed(id))
                    }
                    Err(e) => {
                        // No retry loop: the client has to start over.
                        tracing::error!(error = %e, "ticket creation failed at intake commit");
                        self.cancel();
                        Ok(IntakeReply::CommitFailed)
                    }
                }
            }
            (IntakeState::AwaitingConfirmation, IntakeInput::Reject) => {
                self.cancel();
                Ok(IntakeReply::Cancelled)
            }
            _ => Ok(IntakeReply::Unexpected),
        }
    }

    fn cancel(&mut self) {
        self.state = IntakeState::Cancelled;
        self.draft = Draft::default();
    }
}

/// Phone grammar: after stripping everything but digits and `+`, the number
/// must be `+7` or `8` followed by exactly ten digits.
pub fn phone_is_valid(raw: &str) -> bool {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect();
    let rest = if let Some(rest) = cleaned.strip_prefix("+7") {
        rest
    } else if let Some(rest) = cleaned.strip_prefix('8') {
        rest
    } else {
        return false;
    };
    rest.len() == 10 && rest.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::{setup_test_db, test_machine};
    use crate::models::TrackStatus;
    use proptest::prelude::*;

    fn setup() -> (Database, tempfile::TempDir) {
        let (db, dir) = setup_test_db();
        db.insert_machine(&test_machine("0078")).unwrap();
        (db, dir)
    }

    fn advance<'a>(
        session: &mut IntakeSession,
        db: &Database,
        input: IntakeInput<'a>,
    ) -> IntakeReply {
        session.advance(input, db).unwrap()
    }

    #[test]
    fn unknown_machine_reprompts_in_place() {
        let (db, _dir) = setup();
        let mut session = IntakeSession::new();
        let reply = advance(&mut session, &db, IntakeInput::Text("9999"));
        assert_eq!(reply, IntakeReply::UnknownMachine("9999".to_string()));
        assert_eq!(session.state(), &IntakeState::AwaitingMachineNumber);
    }

    #[test]
    fn happy_path_commits_a_ticket() {
        let (db, _dir) = setup();
        let mut session = IntakeSession::new();
        assert_eq!(
            advance(&mut session, &db, IntakeInput::Text(" 0078 ")),
            IntakeReply::PromptPhoto
        );
        assert_eq!(
            advance(&mut session, &db, IntakeInput::Photo("client-photo-1")),
            IntakeReply::PromptFullName
        );
        assert_eq!(
            advance(&mut session, &db, IntakeInput::Text("Anna Petrova")),
            IntakeReply::PromptPhone
        );
        let reply = advance(&mut session, &db, IntakeInput::Text("+7 (999) 123-45-67"));
        assert_eq!(
            reply,
            IntakeReply::ConfirmDetails {
                full_name: "Anna Petrova".to_string(),
                phone: "+7 (999) 123-45-67".to_string(),
                machine_number: "0078".to_string(),
            }
        );

        let reply = advance(&mut session, &db, IntakeInput::Accept);
        let IntakeReply::Committed(id) = reply else {
            panic!("expected commit, got {reply:?}");
        };
        assert!(session.is_terminal());

        let ticket = db.get_ticket(id).unwrap().unwrap();
        assert_eq!(ticket.full_name, "Anna Petrova");
        assert_eq!(ticket.machine_number, "0078");
        assert_eq!(ticket.client_photo.as_deref(), Some("client-photo-1"));
        assert_eq!(ticket.engineer.status, TrackStatus::Open);
        assert_eq!(ticket.accountant.status, TrackStatus::Open);
    }

    #[test]
    fn photo_step_is_skippable() {
        let (db, _dir) = setup();
        let mut session = IntakeSession::new();
        advance(&mut session, &db, IntakeInput::Text("0078"));
        assert_eq!(
            advance(&mut session, &db, IntakeInput::Skip),
            IntakeReply::PromptFullName
        );
        advance(&mut session, &db, IntakeInput::Text("Anna"));
        advance(&mut session, &db, IntakeInput::Text("89991234567"));
        let IntakeReply::Committed(id) = advance(&mut session, &db, IntakeInput::Accept) else {
            panic!("expected commit");
        };
        assert!(db.get_ticket(id).unwrap().unwrap().client_photo.is_none());
    }

    #[test]
    fn invalid_phone_reprompts_in_place() {
        let (db, _dir) = setup();
        let mut session = IntakeSession::new();
        advance(&mut session, &db, IntakeInput::Text("0078"));
        advance(&mut session, &db, IntakeInput::Skip);
        advance(&mut session, &db, IntakeInput::Text("Anna"));
        assert_eq!(
            advance(&mut session, &db, IntakeInput::Text("9991234567")),
            IntakeReply::InvalidPhone
        );
        assert_eq!(session.state(), &IntakeState::AwaitingPhone);
    }

    #[test]
    fn cancel_works_in_every_non_terminal_state() {
        let (db, _dir) = setup();
        let steps: [&[IntakeInput<'_>]; 5] = [
            &[],
            &[IntakeInput::Text("0078")],
            &[IntakeInput::Text("0078"), IntakeInput::Skip],
            &[
                IntakeInput::Text("0078"),
                IntakeInput::Skip,
                IntakeInput::Text("Anna"),
            ],
            &[
                IntakeInput::Text("0078"),
                IntakeInput::Skip,
                IntakeInput::Text("Anna"),
                IntakeInput::Text("89991234567"),
            ],
        ];
        for inputs in steps {
            let mut session = IntakeSession::new();
            for input in inputs {
                advance(&mut session, &db, *input);
            }
            assert_eq!(
                advance(&mut session, &db, IntakeInput::Cancel),
                IntakeReply::Cancelled
            );
            assert_eq!(session.state(), &IntakeState::Cancelled);
        }
        // No ticket was created along the way.
        assert!(db.list_all().unwrap().is_empty());
    }

    #[test]
    fn reject_at_confirmation_has_no_side_effects() {
        let (db, _dir) = setup();
        let mut session = IntakeSession::new();
        advance(&mut session, &db, IntakeInput::Text("0078"));
        advance(&mut session, &db, IntakeInput::Skip);
        advance(&mut session, &db, IntakeInput::Text("Anna"));
        advance(&mut session, &db, IntakeInput::Text("89991234567"));
        assert_eq!(
            advance(&mut session, &db, IntakeInput::Reject),
            IntakeReply::Cancelled
        );
        assert!(db.list_all().unwrap().is_empty());
    }

    #[test]
    fn out_of_order_input_is_ignored() {
        let (db, _dir) = setup();
        let mut session = IntakeSession::new();
        assert_eq!(
            advance(&mut session, &db, IntakeInput::Accept),
            IntakeReply::Unexpected
        );
        assert_eq!(
            advance(&mut session, &db, IntakeInput::Photo("early")),
            IntakeReply::Unexpected
        );
        assert_eq!(session.state(), &IntakeState::AwaitingMachineNumber);
    }

    #[test]
    fn phone_grammar_cases() {
        assert!(phone_is_valid("+79991234567"));
        assert!(phone_is_valid("89991234567"));
        assert!(phone_is_valid("+7 (999) 123-45-67"));
        assert!(phone_is_valid("8 999 123 45 67"));
        assert!(!phone_is_valid("9991234567"));
        assert!(!phone_is_valid("+79991234"));
        assert!(!phone_is_valid("123"));
        assert!(!phone_is_valid(""));
        assert!(!phone_is_valid("+7999123456+7"));
    }

    proptest! {
        #[test]
        fn phone_validation_never_panics(raw in ".{0,40}") {
            let _ = phone_is_valid(&raw);
        }

        #[test]
        fn ten_digits_after_plus7_always_accepted(digits in "[0-9]{10}") {
            let plus7 = format!("+7{}", digits);
            let eight = format!("8{}", digits);
            prop_assert!(phone_is_valid(&plus7));
            prop_assert!(phone_is_valid(&eight));
        }

        #[test]
        fn wrong_length_always_rejected(digits in "[0-9]{0,9}") {
            let plus7 = format!("+7{}", digits);
            prop_assert!(!phone_is_valid(&plus7));
        }
    }
}
