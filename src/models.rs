use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Staff role. Fixed reference data; never mutated by the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Engineer,
    Accountant,
    Manager,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Engineer => "engineer",
            Role::Accountant => "accountant",
            Role::Manager => "manager",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "engineer" => Some(Role::Engineer),
            "accountant" => Some(Role::Accountant),
            "manager" => Some(Role::Manager),
            _ => None,
        }
    }

    /// The resolution track this role works on. Managers own no track.
    pub fn track(&self) -> Option<TrackKind> {
        match self {
            Role::Engineer => Some(TrackKind::Engineer),
            Role::Accountant => Some(TrackKind::Accountant),
            Role::Manager => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Selector for one of the two independent resolution tracks on a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Engineer,
    Accountant,
}

impl TrackKind {
    /// Column prefix in the tickets table (`engineer_status`, `accountant_id`, ...).
    pub fn column_prefix(&self) -> &'static str {
        match self {
            TrackKind::Engineer => "engineer",
            TrackKind::Accountant => "accountant",
        }
    }
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_prefix())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackStatus {
    #[default]
    Open,
    InWork,
    Closed,
}

impl TrackStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackStatus::Open => "open",
            TrackStatus::InWork => "in_work",
            TrackStatus::Closed => "closed",
        }
    }

    pub fn parse(s: &str) -> Option<TrackStatus> {
        match s {
            "open" => Some(TrackStatus::Open),
            "in_work" => Some(TrackStatus::InWork),
            "closed" => Some(TrackStatus::Closed),
            _ => None,
        }
    }
}

impl fmt::Display for TrackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One per-role status thread on a ticket. A ticket carries two of these
/// and they move independently; the ticket is resolved only when both are
/// closed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolutionTrack {
    pub status: TrackStatus,
    /// Staff id currently owning this track (while `in_work`), or the staff
    /// id that closed it (after `closed`).
    pub assigned_to: Option<i64>,
    pub closed_at: Option<DateTime<Utc>>,
    pub closed_by: Option<String>,
}

/// Vending machine reference data, pre-provisioned and read-only for the
/// workflow. Used only for presentation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Machine {
    pub number: String,
    pub name: Option<String>,
    pub model: Option<String>,
    pub address: String,
    pub priority: Option<i64>,
    pub pump: Option<bool>,
    pub saturday: Option<bool>,
    pub sunday: Option<bool>,
    pub ip: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Staff {
    pub id: i64,
    /// Transport identity (chat id) used by the auth lookup.
    pub chat_id: i64,
    pub full_name: String,
    pub role: Role,
}

/// A single reported machine malfunction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub full_name: String,
    pub phone: String,
    pub machine_number: String,
    /// Photo attached by the client at intake, distinct from staff photos.
    pub client_photo: Option<String>,
    pub issue_description: Option<String>,
    pub engineer: ResolutionTrack,
    pub accountant: ResolutionTrack,
    pub machine: Option<Machine>,
}

impl Ticket {
    pub fn track(&self, kind: TrackKind) -> &ResolutionTrack {
        match kind {
            TrackKind::Engineer => &self.engineer,
            TrackKind::Accountant => &self.accountant,
        }
    }

    pub fn fully_closed(&self) -> bool {
        self.engineer.status == TrackStatus::Closed && self.accountant.status == TrackStatus::Closed
    }
}

/// Validated ticket-creation payload produced by the intake flow.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TicketDraft {
    pub machine_number: String,
    pub client_photo: Option<String>,
    pub full_name: String,
    pub phone: String,
    pub issue_description: Option<String>,
}

/// Staff-submitted photo, append-only, ordered by insertion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Photo {
    pub id: i64,
    pub ticket_id: i64,
    pub media_ref: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub ticket_id: i64,
    pub text: String,
    pub author_role: Role,
    pub created_at: DateTime<Utc>,
}
