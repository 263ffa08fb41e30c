use anyhow::{bail, Result};

use vendesk::config::Config;
use vendesk::db::Database;
use vendesk::intake::phone_is_valid;
use vendesk::models::{Role, Staff, TicketDraft};
use vendesk::notify::{fan_out, manager_report};
use vendesk::workflow::{permits, Engine, StaffAction};

use super::StdoutSink;

/// Manager-created ticket, bypassing the conversational intake but keeping
/// its validation, then fanning out to all staff.
pub fn create(
    db: &Database,
    config: &Config,
    staff: &Staff,
    machine: &str,
    full_name: &str,
    phone: &str,
    description: Option<String>,
    photo: Option<String>,
) -> Result<()> {
    if !permits(staff.role, StaffAction::CreateTicket) {
        bail!("Only managers may create tickets directly");
    }
    if !db.machine_exists(machine)? {
        bail!("Machine {machine} is not in the reference set");
    }
    if !phone_is_valid(phone) {
        bail!("Phone must be +7 or 8 followed by ten digits");
    }

    let id = db.create_ticket(&TicketDraft {
        machine_number: machine.to_string(),
        client_photo: photo,
        full_name: full_name.to_string(),
        phone: phone.to_string(),
        issue_description: description,
    })?;
    println!("Created ticket #{id}");

    let ticket = match db.get_ticket(id)? {
        Some(ticket) => ticket,
        None => bail!("Ticket #{id} vanished after creation"),
    };
    let recipients =
        db.list_staff_by_roles(&[Role::Engineer, Role::Accountant, Role::Manager])?;
    let delivered = fan_out(
        &StdoutSink,
        &ticket,
        &recipients,
        None,
        config.display_offset(),
    );
    println!("Notified {delivered} of {} staff members", recipients.len());
    Ok(())
}

pub fn claim(db: &Database, staff: &Staff, ticket_id: i64) -> Result<()> {
    let ticket = Engine::new(db).claim(ticket_id, staff)?;
    println!(
        "Ticket #{} is now in work on the {} track",
        ticket.id,
        staff.role
    );
    Ok(())
}

pub fn release(db: &Database, staff: &Staff) -> Result<()> {
    let id = Engine::new(db).release(staff)?;
    println!("Released ticket #{id}; it is open again");
    Ok(())
}

/// Two-step close: without `--yes` only the confirmation summary is shown.
pub fn close(db: &Database, staff: &Staff, confirmed: bool) -> Result<()> {
    let engine = Engine::new(db);
    let summary = engine.request_close(staff)?;
    if !confirmed {
        println!("About to close ticket #{}", summary.ticket_id);
        println!("Machine: {}", summary.machine_number);
        if let Some(address) = &summary.address {
            println!("Address: {address}");
        }
        println!("Re-run with --yes to confirm.");
        return Ok(());
    }
    let id = engine.confirm_close(staff)?;
    println!("Closed ticket #{id} on the {} track", staff.role);
    Ok(())
}

pub fn reopen(db: &Database, staff: &Staff, ticket_id: i64) -> Result<()> {
    let ticket = Engine::new(db).reopen(ticket_id, staff)?;
    println!("Reopened ticket #{}; it is back in work", ticket.id);
    Ok(())
}

pub fn comment(db: &Database, staff: &Staff, text: &str) -> Result<()> {
    Engine::new(db).add_comment(staff, text)?;
    println!("Comment added");
    Ok(())
}

pub fn photo(db: &Database, staff: &Staff, media_ref: &str) -> Result<()> {
    Engine::new(db).add_photo(staff, media_ref)?;
    println!("Photo added");
    Ok(())
}

/// Manager drill-down report for one ticket.
pub fn report(db: &Database, config: &Config, staff: &Staff, ticket_id: i64) -> Result<()> {
    if !permits(staff.role, StaffAction::ViewReport) {
        bail!("Only managers may view ticket reports");
    }
    let ticket = match db.get_ticket(ticket_id)? {
        Some(ticket) => ticket,
        None => bail!("Ticket #{ticket_id} not found"),
    };
    let view = manager_report(db, &ticket, config.display_offset())?;
    use vendesk::notify::NotifySink;
    StdoutSink.notify(staff, view)?;
    Ok(())
}
