use anyhow::{bail, Result};
use std::path::Path;

use vendesk::config::Config;
use vendesk::db::Database;
use vendesk::models::Staff;
use vendesk::report::export_all_tickets;
use vendesk::workflow::{permits, StaffAction};

/// Manager-only whole-table snapshot. The CLI is the delivery channel, so
/// the file lands in the requested directory instead of being deleted.
pub fn run(db: &Database, config: &Config, staff: &Staff, output_dir: &Path) -> Result<()> {
    if !permits(staff.role, StaffAction::ExportReport) {
        bail!("Only managers may export the ticket report");
    }
    let path = export_all_tickets(db, output_dir, config.display_offset())?;
    println!("Report written to {}", path.display());
    Ok(())
}
