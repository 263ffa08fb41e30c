//! Ticket lifecycle engine.
//!
//! Every operation acts on exactly one resolution track of one ticket,
//! selected by the acting staff member's role. Preconditions are checked
//! against a fresh read, then the transition runs as a status-guarded
//! compare-and-swap in storage, so concurrent actors cannot leave a track
//! half-updated.

use crate::db::Database;
use crate::error::WorkflowError;
use crate::models::{Role, Staff, Ticket, TrackKind, TrackStatus};

/// Everything a staff member can ask the workflow to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaffAction {
    Claim,
    Release,
    Close,
    Reopen,
    Comment,
    Photo,
    ListTickets,
    ViewReport,
    CreateTicket,
    ExportReport,
}

/// Role capability table. Single source of truth for who may do what.
pub fn permits(role: Role, action: StaffAction) -> bool {
    use StaffAction::*;
    match action {
        Claim | Release | Close | Reopen | Comment => {
            matches!(role, Role::Engineer | Role::Accountant)
        }
        Photo => role == Role::Engineer,
        ListTickets => true,
        ViewReport | CreateTicket | ExportReport => role == Role::Manager,
    }
}

/// Confirmation prompt data for the two-step close.
#[derive(Debug, Clone, PartialEq)]
pub struct CloseSummary {
    pub ticket_id: i64,
    pub machine_number: String,
    pub address: Option<String>,
}

pub struct Engine<'a> {
    db: &'a Database,
}

type Result<T> = std::result::Result<T, WorkflowError>;

impl<'a> Engine<'a> {
    pub fn new(db: &'a Database) -> Self {
        Engine { db }
    }

    /// Take an open track into work under this staff member's ownership.
    pub fn claim(&self, ticket_id: i64, staff: &Staff) -> Result<Ticket> {
        let kind = self.track_for(staff, StaffAction::Claim)?;

        if self.db.find_active_ticket(staff.id, kind)?.is_some() {
            return Err(WorkflowError::ActiveTicketExists);
        }

        let ticket = self
            .db
            .get_ticket(ticket_id)?
            .ok_or(WorkflowError::TicketNotFound(ticket_id))?;
        match ticket.track(kind).status {
            TrackStatus::Closed => return Err(WorkflowError::AlreadyClosed(kind, ticket_id)),
            TrackStatus::InWork => return Err(WorkflowError::AlreadyInWork(kind, ticket_id)),
            TrackStatus::Open => {}
        }

        match self.db.claim_track(ticket_id, kind, staff.id) {
            Ok(true) => {}
            // Someone else won the race between the read and the swap.
            Ok(false) => return Err(WorkflowError::AlreadyInWork(kind, ticket_id)),
            // The partial unique index fired: a concurrent claim by the same
            // staff member (double-tap) already went through elsewhere.
            Err(e) if e.is_constraint_violation() => {
                tracing::warn!(ticket_id, staff_id = staff.id, track = %kind,
                    "claim rejected by storage constraint");
                return Err(WorkflowError::ActiveTicketExists);
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!(ticket_id, staff_id = staff.id, track = %kind, "ticket claimed");
        self.db
            .get_ticket(ticket_id)?
            .ok_or(WorkflowError::TicketNotFound(ticket_id))
    }

    /// Give up the currently owned ticket, returning its track to `open`.
    pub fn release(&self, staff: &Staff) -> Result<i64> {
        let kind = self.track_for(staff, StaffAction::Release)?;
        let active = self
            .db
            .find_active_ticket(staff.id, kind)?
            .ok_or(WorkflowError::NoActiveTicket)?;
        if !self.db.release_track(active.id, kind, staff.id)? {
            return Err(WorkflowError::NoActiveTicket);
        }
        tracing::info!(ticket_id = active.id, staff_id = staff.id, track = %kind, "ticket released");
        Ok(active.id)
    }

    /// First step of the two-step close: the summary the actor must confirm.
    /// No state changes.
    pub fn request_close(&self, staff: &Staff) -> Result<CloseSummary> {
        let kind = self.track_for(staff, StaffAction::Close)?;
        let active = self
            .db
            .find_active_ticket(staff.id, kind)?
            .ok_or(WorkflowError::NoActiveTicket)?;
        Ok(CloseSummary {
            ticket_id: active.id,
            machine_number: active.machine_number.clone(),
            address: active.machine.map(|m| m.address),
        })
    }

    /// Second step: close the acting role's track, stamping closed-at and
    /// closed-by together. The other track is untouched.
    pub fn confirm_close(&self, staff: &Staff) -> Result<i64> {
        let kind = self.track_for(staff, StaffAction::Close)?;
        let active = self
            .db
            .find_active_ticket(staff.id, kind)?
            .ok_or(WorkflowError::NoActiveTicket)?;
        if !self
            .db
            .close_track(active.id, kind, staff.id, &staff.full_name)?
        {
            return Err(WorkflowError::NoActiveTicket);
        }
        tracing::info!(ticket_id = active.id, staff_id = staff.id, track = %kind, "ticket closed");
        Ok(active.id)
    }

    /// Resume a closed track directly to `in_work`. Only the staff member who
    /// closed it may reopen, and only while they hold no other active ticket.
    pub fn reopen(&self, ticket_id: i64, staff: &Staff) -> Result<Ticket> {
        let kind = self.track_for(staff, StaffAction::Reopen)?;

        if self.db.find_active_ticket(staff.id, kind)?.is_some() {
            return Err(WorkflowError::ActiveTicketExists);
        }

        let ticket = self
            .db
            .get_ticket(ticket_id)?
            .ok_or(WorkflowError::TicketNotFound(ticket_id))?;
        let track = ticket.track(kind);
        if track.status != TrackStatus::Closed {
            return Err(WorkflowError::NotClosed(kind, ticket_id));
        }
        if track.assigned_to != Some(staff.id) {
            return Err(WorkflowError::NotTheCloser);
        }

        match self.db.reopen_track(ticket_id, kind, staff.id) {
            Ok(true) => {}
            Ok(false) => return Err(WorkflowError::NotClosed(kind, ticket_id)),
            Err(e) if e.is_constraint_violation() => {
                return Err(WorkflowError::ActiveTicketExists)
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!(ticket_id, staff_id = staff.id, track = %kind, "ticket reopened");
        self.db
            .get_ticket(ticket_id)?
            .ok_or(WorkflowError::TicketNotFound(ticket_id))
    }

    /// Append a comment to the actor's active ticket.
    pub fn add_comment(&self, staff: &Staff, text: &str) -> Result<i64> {
        let kind = self.track_for(staff, StaffAction::Comment)?;
        let active = self
            .db
            .find_active_ticket(staff.id, kind)?
            .ok_or(WorkflowError::NoActiveTicket)?;
        Ok(self.db.add_comment(active.id, text, staff.role)?)
    }

    /// Append a photo to the actor's active ticket. Engineers only.
    pub fn add_photo(&self, staff: &Staff, media_ref: &str) -> Result<i64> {
        let kind = self.track_for(staff, StaffAction::Photo)?;
        let active = self
            .db
            .find_active_ticket(staff.id, kind)?
            .ok_or(WorkflowError::NoActiveTicket)?;
        Ok(self.db.add_photo(active.id, media_ref)?)
    }

    /// Role-scoped "open tickets" listing: engineers and accountants see the
    /// unclaimed tickets of their own track, managers see everything not yet
    /// resolved on both tracks.
    pub fn list_open(&self, staff: &Staff) -> Result<Vec<Ticket>> {
        if !permits(staff.role, StaffAction::ListTickets) {
            return Err(WorkflowError::NotPermitted(staff.role));
        }
        let tickets = match staff.role.track() {
            Some(kind) => self.db.list_open_for(kind)?,
            None => self.db.list_any_open()?,
        };
        Ok(tickets)
    }

    /// Role-scoped "closed tickets" listing: engineers and accountants see
    /// tickets they closed themselves, managers see tickets resolved on both
    /// tracks.
    pub fn list_closed(&self, staff: &Staff) -> Result<Vec<Ticket>> {
        if !permits(staff.role, StaffAction::ListTickets) {
            return Err(WorkflowError::NotPermitted(staff.role));
        }
        let tickets = match staff.role.track() {
            Some(kind) => self.db.list_closed_by(kind, staff.id)?,
            None => self.db.list_fully_closed()?,
        };
        Ok(tickets)
    }

    fn track_for(&self, staff: &Staff, action: StaffAction) -> Result<TrackKind> {
        if !permits(staff.role, action) {
            return Err(WorkflowError::NotPermitted(staff.role));
        }
        staff
            .role
            .track()
            .ok_or(WorkflowError::NotPermitted(staff.role))
    }
}
