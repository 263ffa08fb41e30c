use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;

use vendesk::config::{DATA_DIR, DB_FILE, DEFAULT_TZ_OFFSET_HOURS};
use vendesk::db::Database;

/// Create a `.vendesk` workspace in the given directory.
pub fn run(cwd: &Path) -> Result<()> {
    let data_dir = cwd.join(DATA_DIR);
    if data_dir.exists() {
        bail!("Already a vendesk workspace: {}", data_dir.display());
    }
    fs::create_dir(&data_dir)
        .with_context(|| format!("Failed to create {}", data_dir.display()))?;

    // Opening the database creates the schema.
    Database::open(&data_dir.join(DB_FILE))?;

    let config = format!(
        "# vendesk configuration\n\
         # Fixed UTC offset used for staff views and report exports.\n\
         display_tz_offset_hours = {DEFAULT_TZ_OFFSET_HOURS}\n"
    );
    fs::write(data_dir.join("config.toml"), config).context("Failed to write config.toml")?;

    println!("Initialized vendesk workspace in {}", data_dir.display());
    println!("Next: add machines with 'vendesk machine add' and staff with 'vendesk staff add'.");
    Ok(())
}
