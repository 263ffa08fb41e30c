//! Notification composition and fan-out.
//!
//! Views are pure functions of a ticket and the recipient; delivery goes
//! through the [`NotifySink`] trait so the core stays transport-agnostic.
//! Fan-out is best-effort: a failed delivery is logged and the rest of the
//! recipients still get theirs.

use chrono::{DateTime, FixedOffset, Utc};
use std::fmt;

use crate::db::Database;
use crate::error::StorageResult;
use crate::models::{Role, Staff, Ticket, TrackKind, TrackStatus};

/// Operation reference carried by an action button, e.g. `claim:17`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpToken {
    Claim(i64),
    Reopen(i64),
    ViewReport(i64),
}

impl OpToken {
    pub fn parse(s: &str) -> Option<OpToken> {
        let (op, id) = s.split_once(':')?;
        let id: i64 = id.parse().ok()?;
        match op {
            "claim" => Some(OpToken::Claim(id)),
            "reopen" => Some(OpToken::Reopen(id)),
            "view_report" => Some(OpToken::ViewReport(id)),
            _ => None,
        }
    }
}

impl fmt::Display for OpToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpToken::Claim(id) => write!(f, "claim:{id}"),
            OpToken::Reopen(id) => write!(f, "reopen:{id}"),
            OpToken::ViewReport(id) => write!(f, "view_report:{id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub label: String,
    pub token: String,
}

impl Action {
    fn new(label: &str, token: OpToken) -> Self {
        Action {
            label: label.to_string(),
            token: token.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewBody {
    Text(String),
    Media { media_ref: String, caption: String },
}

impl ViewBody {
    pub fn text(&self) -> &str {
        match self {
            ViewBody::Text(text) => text,
            ViewBody::Media { caption, .. } => caption,
        }
    }
}

/// A composed message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    pub body: ViewBody,
    pub actions: Vec<Action>,
}

/// Abstract delivery seam; the transport implements this.
pub trait NotifySink {
    fn notify(&self, recipient: &Staff, view: View) -> anyhow::Result<()>;
}

/// Shared ticket header: intake fields plus the machine reference data.
pub fn ticket_summary(ticket: &Ticket, tz: FixedOffset) -> String {
    let mut text = format!(
        "Ticket #{}\n\nCreated: {}\nClient: {}\nPhone: {}\nClient photo: {}\nMachine: {}\n",
        ticket.id,
        format_display(ticket.created_at, tz),
        ticket.full_name,
        ticket.phone,
        if ticket.client_photo.is_some() {
            "attached"
        } else {
            "none"
        },
        ticket.machine_number,
    );
    if let Some(desc) = &ticket.issue_description {
        text.push_str(&format!("Issue: {desc}\n"));
    }
    if let Some(machine) = &ticket.machine {
        if let Some(model) = &machine.model {
            text.push_str(&format!("Model: {model}\n"));
        }
        text.push_str(&format!("Address: {}\n", machine.address));
        if let Some(name) = &machine.name {
            text.push_str(&format!("Site: {name}\n"));
        }
        if let Some(priority) = machine.priority {
            text.push_str(&format!("Priority: {priority}\n"));
        }
        if let Some(pump) = machine.pump {
            text.push_str(&format!("Pump: {}\n", if pump { "yes" } else { "no" }));
        }
        if machine.saturday.is_some() || machine.sunday.is_some() {
            text.push_str(&format!(
                "Weekend service sat/sun: {}/{}\n",
                if machine.saturday.unwrap_or(false) { "yes" } else { "no" },
                if machine.sunday.unwrap_or(false) { "yes" } else { "no" },
            ));
        }
        if let Some(ip) = &machine.ip {
            text.push_str(&format!("Proprietor: {ip}\n"));
        }
    }
    text
}

/// Role-specific view of a ticket for one recipient.
///
/// `origin` is the reporting client's transport identity; it is only passed
/// for the fan-out triggered at creation and only managers see it.
pub fn staff_view(
    ticket: &Ticket,
    recipient: &Staff,
    origin: Option<i64>,
    tz: FixedOffset,
) -> View {
    let mut caption = ticket_summary(ticket, tz);
    let actions = match recipient.role.track() {
        None => {
            if let Some(chat_id) = origin {
                caption.push_str(&format!("\nClient chat id: {chat_id}"));
            }
            vec![Action::new("View report", OpToken::ViewReport(ticket.id))]
        }
        Some(kind) => {
            if ticket.track(kind).status == TrackStatus::Closed {
                vec![Action::new("Reopen ticket", OpToken::Reopen(ticket.id))]
            } else {
                vec![Action::new("Take into work", OpToken::Claim(ticket.id))]
            }
        }
    };
    View {
        body: body_for(ticket, caption),
        actions,
    }
}

/// Manager drill-down: the summary plus closure metadata, per-role comments
/// and the staff photo count for both tracks.
pub fn manager_report(db: &Database, ticket: &Ticket, tz: FixedOffset) -> StorageResult<View> {
    let comments = db.comments(ticket.id)?;
    let photos = db.photos(ticket.id)?;

    let mut text = ticket_summary(ticket, tz);
    text.push('\n');
    for (kind, label) in [
        (TrackKind::Engineer, "Engineer"),
        (TrackKind::Accountant, "Dispatcher"),
    ] {
        let track = ticket.track(kind);
        text.push_str(&format!(
            "{label} closed by: {}\n",
            track.closed_by.as_deref().unwrap_or("not closed")
        ));
        text.push_str(&format!(
            "{label} closed at: {}\n",
            track
                .closed_at
                .map(|dt| format_display(dt, tz))
                .unwrap_or_else(|| "not closed".to_string())
        ));
        let role = match kind {
            TrackKind::Engineer => Role::Engineer,
            TrackKind::Accountant => Role::Accountant,
        };
        let role_comments: Vec<&str> = comments
            .iter()
            .filter(|c| c.author_role == role)
            .map(|c| c.text.as_str())
            .collect();
        if role_comments.is_empty() {
            text.push_str("No comments\n");
        } else {
            text.push_str("Comments:\n");
            for comment in role_comments {
                text.push_str(&format!("- {comment}\n"));
            }
        }
        text.push('\n');
    }
    text.push_str(&format!("Staff photos: {}", photos.len()));

    Ok(View {
        body: body_for(ticket, text),
        actions: Vec::new(),
    })
}

fn body_for(ticket: &Ticket, caption: String) -> ViewBody {
    match &ticket.client_photo {
        Some(media_ref) => ViewBody::Media {
            media_ref: media_ref.clone(),
            caption,
        },
        None => ViewBody::Text(caption),
    }
}

/// Deliver a ticket view to each recipient, composing per role. Returns the
/// number of successful deliveries; failures never abort the rest.
pub fn fan_out(
    sink: &dyn NotifySink,
    ticket: &Ticket,
    recipients: &[Staff],
    origin: Option<i64>,
    tz: FixedOffset,
) -> usize {
    let mut delivered = 0;
    for recipient in recipients {
        let view = staff_view(ticket, recipient, origin, tz);
        match sink.notify(recipient, view) {
            Ok(()) => delivered += 1,
            Err(e) => {
                tracing::warn!(
                    ticket_id = ticket.id,
                    staff_id = recipient.id,
                    error = %e,
                    "notification delivery failed"
                );
            }
        }
    }
    delivered
}

pub fn format_display(dt: DateTime<Utc>, tz: FixedOffset) -> String {
    dt.with_timezone(&tz).format("%d.%m.%Y %H:%M").to_string()
}
