pub mod admin;
pub mod export;
pub mod init;
pub mod list;
pub mod ticket;

use anyhow::{bail, Result};

use vendesk::db::Database;
use vendesk::models::Staff;
use vendesk::notify::{NotifySink, View, ViewBody};

/// Map a transport identity to a staff member; unknown identities are denied.
pub fn resolve_staff(db: &Database, chat_id: i64) -> Result<Staff> {
    match db.staff_by_chat_id(chat_id)? {
        Some(staff) => Ok(staff),
        None => bail!("No staff member registered for chat id {chat_id}"),
    }
}

/// Console rendering of notification views.
pub struct StdoutSink;

impl NotifySink for StdoutSink {
    fn notify(&self, recipient: &Staff, view: View) -> Result<()> {
        println!("--- to {} ({}) ---", recipient.full_name, recipient.role);
        match &view.body {
            ViewBody::Text(text) => println!("{text}"),
            ViewBody::Media { media_ref, caption } => {
                println!("[photo {media_ref}]");
                println!("{caption}");
            }
        }
        for action in &view.actions {
            println!("  [{}] -> {}", action.label, action.token);
        }
        Ok(())
    }
}
