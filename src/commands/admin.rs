use anyhow::{bail, Result};

use vendesk::db::Database;
use vendesk::models::{Machine, Role};

/// Register a vending machine in the reference set.
#[allow(clippy::too_many_arguments)]
pub fn add_machine(
    db: &Database,
    number: &str,
    address: &str,
    name: Option<String>,
    model: Option<String>,
    priority: Option<i64>,
    pump: Option<bool>,
    saturday: Option<bool>,
    sunday: Option<bool>,
    ip: Option<String>,
) -> Result<()> {
    if db.machine_exists(number)? {
        bail!("Machine {number} already registered");
    }
    db.insert_machine(&Machine {
        number: number.to_string(),
        name,
        model,
        address: address.to_string(),
        priority,
        pump,
        saturday,
        sunday,
        ip,
    })?;
    println!("Registered machine {number}");
    Ok(())
}

/// Register a staff member under a transport chat id.
pub fn add_staff(db: &Database, chat_id: i64, full_name: &str, role: &str) -> Result<()> {
    let Some(role) = Role::parse(role) else {
        bail!("Invalid role '{role}'. Must be one of: engineer, accountant, manager");
    };
    if db.staff_by_chat_id(chat_id)?.is_some() {
        bail!("Chat id {chat_id} is already registered");
    }
    let id = db.insert_staff(chat_id, full_name, role)?;
    println!("Registered {role} {full_name} (staff #{id})");
    Ok(())
}
