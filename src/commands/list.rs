use anyhow::Result;

use vendesk::config::Config;
use vendesk::db::Database;
use vendesk::models::Staff;
use vendesk::notify::{staff_view, NotifySink};
use vendesk::workflow::Engine;

use super::StdoutSink;

/// Role-scoped ticket listing, rendered one notification view per ticket so
/// the claim/reopen action for this staff member is visible.
pub fn run(db: &Database, config: &Config, staff: &Staff, closed: bool) -> Result<()> {
    let engine = Engine::new(db);
    let tickets = if closed {
        engine.list_closed(staff)?
    } else {
        engine.list_open(staff)?
    };

    if tickets.is_empty() {
        println!("No {} tickets", if closed { "closed" } else { "open" });
        return Ok(());
    }

    let tz = config.display_offset();
    for ticket in &tickets {
        let view = staff_view(ticket, staff, None, tz);
        StdoutSink.notify(staff, view)?;
    }
    println!("{} ticket(s)", tickets.len());
    Ok(())
}
