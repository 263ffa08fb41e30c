mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::env;
use std::path::PathBuf;

use vendesk::config::{find_data_dir, Config, DB_FILE};
use vendesk::db::Database;

#[derive(Parser)]
#[command(name = "vendesk")]
#[command(about = "Vending machine service desk: ticket workflow and reporting")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a vendesk workspace in the current directory
    Init,

    /// Manage the machine reference set
    Machine {
        #[command(subcommand)]
        action: MachineCommands,
    },

    /// Manage staff members
    Staff {
        #[command(subcommand)]
        action: StaffCommands,
    },

    /// Create a ticket directly (managers only)
    Create {
        /// Machine number
        #[arg(long)]
        machine: String,
        /// Client full name
        #[arg(long)]
        name: String,
        /// Client phone (+7 or 8 followed by ten digits)
        #[arg(long)]
        phone: String,
        /// Issue description
        #[arg(short, long)]
        description: Option<String>,
        /// Client photo reference
        #[arg(long)]
        photo: Option<String>,
        /// Acting staff chat id
        #[arg(long)]
        staff: i64,
    },

    /// Take a ticket into work on your role's track
    Claim {
        /// Ticket id
        id: i64,
        /// Acting staff chat id
        #[arg(long)]
        staff: i64,
    },

    /// Give up your active ticket, returning it to open
    Release {
        /// Acting staff chat id
        #[arg(long)]
        staff: i64,
    },

    /// Close your active ticket (shows a summary; confirm with --yes)
    Close {
        /// Acting staff chat id
        #[arg(long)]
        staff: i64,
        /// Confirm the close
        #[arg(short, long)]
        yes: bool,
    },

    /// Reopen a ticket you closed, straight back into work
    Reopen {
        /// Ticket id
        id: i64,
        /// Acting staff chat id
        #[arg(long)]
        staff: i64,
    },

    /// Add a comment to your active ticket
    Comment {
        /// Comment text
        text: String,
        /// Acting staff chat id
        #[arg(long)]
        staff: i64,
    },

    /// Add a photo to your active ticket (engineers only)
    Photo {
        /// Media reference
        media_ref: String,
        /// Acting staff chat id
        #[arg(long)]
        staff: i64,
    },

    /// List tickets visible to your role
    List {
        /// Acting staff chat id
        #[arg(long)]
        staff: i64,
        /// Show closed tickets instead of open ones
        #[arg(short, long)]
        closed: bool,
    },

    /// Full per-ticket report with both tracks (managers only)
    Report {
        /// Ticket id
        id: i64,
        /// Acting staff chat id
        #[arg(long)]
        staff: i64,
    },

    /// Export all tickets as a CSV snapshot (managers only)
    Export {
        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
        /// Acting staff chat id
        #[arg(long)]
        staff: i64,
    },
}

#[derive(Subcommand)]
enum MachineCommands {
    /// Register a machine
    Add {
        /// Machine number (business key)
        number: String,
        /// Street address
        #[arg(long)]
        address: String,
        /// Site name
        #[arg(long)]
        name: Option<String>,
        /// Machine model
        #[arg(long)]
        model: Option<String>,
        /// Service priority
        #[arg(long)]
        priority: Option<i64>,
        /// Machine has a water pump
        #[arg(long)]
        pump: Option<bool>,
        /// Serviced on Saturdays
        #[arg(long)]
        saturday: Option<bool>,
        /// Serviced on Sundays
        #[arg(long)]
        sunday: Option<bool>,
        /// Proprietor
        #[arg(long)]
        ip: Option<String>,
    },
}

#[derive(Subcommand)]
enum StaffCommands {
    /// Register a staff member
    Add {
        /// Transport chat id
        chat_id: i64,
        /// Full name
        #[arg(long)]
        name: String,
        /// Role (engineer, accountant, manager)
        #[arg(long)]
        role: String,
    },
}

fn open_workspace() -> Result<(Database, Config)> {
    let data_dir = find_data_dir()?;
    let db = Database::open(&data_dir.join(DB_FILE)).context("Failed to open database")?;
    let config = Config::load(&data_dir)?;
    Ok((db, config))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            let cwd = env::current_dir()?;
            commands::init::run(&cwd)
        }

        Commands::Machine { action } => {
            let (db, _) = open_workspace()?;
            match action {
                MachineCommands::Add {
                    number,
                    address,
                    name,
                    model,
                    priority,
                    pump,
                    saturday,
                    sunday,
                    ip,
                } => commands::admin::add_machine(
                    &db, &number, &address, name, model, priority, pump, saturday, sunday, ip,
                ),
            }
        }

        Commands::Staff { action } => {
            let (db, _) = open_workspace()?;
            match action {
                StaffCommands::Add {
                    chat_id,
                    name,
                    role,
                } => commands::admin::add_staff(&db, chat_id, &name, &role),
            }
        }

        Commands::Create {
            machine,
            name,
            phone,
            description,
            photo,
            staff,
        } => {
            let (db, config) = open_workspace()?;
            let staff = commands::resolve_staff(&db, staff)?;
            commands::ticket::create(
                &db,
                &config,
                &staff,
                &machine,
                &name,
                &phone,
                description,
                photo,
            )
        }

        Commands::Claim { id, staff } => {
            let (db, _) = open_workspace()?;
            let staff = commands::resolve_staff(&db, staff)?;
            commands::ticket::claim(&db, &staff, id)
        }

        Commands::Release { staff } => {
            let (db, _) = open_workspace()?;
            let staff = commands::resolve_staff(&db, staff)?;
            commands::ticket::release(&db, &staff)
        }

        Commands::Close { staff, yes } => {
            let (db, _) = open_workspace()?;
            let staff = commands::resolve_staff(&db, staff)?;
            commands::ticket::close(&db, &staff, yes)
        }

        Commands::Reopen { id, staff } => {
            let (db, _) = open_workspace()?;
            let staff = commands::resolve_staff(&db, staff)?;
            commands::ticket::reopen(&db, &staff, id)
        }

        Commands::Comment { text, staff } => {
            let (db, _) = open_workspace()?;
            let staff = commands::resolve_staff(&db, staff)?;
            commands::ticket::comment(&db, &staff, &text)
        }

        Commands::Photo { media_ref, staff } => {
            let (db, _) = open_workspace()?;
            let staff = commands::resolve_staff(&db, staff)?;
            commands::ticket::photo(&db, &staff, &media_ref)
        }

        Commands::List { staff, closed } => {
            let (db, config) = open_workspace()?;
            let staff = commands::resolve_staff(&db, staff)?;
            commands::list::run(&db, &config, &staff, closed)
        }

        Commands::Report { id, staff } => {
            let (db, config) = open_workspace()?;
            let staff = commands::resolve_staff(&db, staff)?;
            commands::ticket::report(&db, &config, &staff, id)
        }

        Commands::Export { output, staff } => {
            let (db, config) = open_workspace()?;
            let staff = commands::resolve_staff(&db, staff)?;
            commands::export::run(&db, &config, &staff, &output)
        }
    }
}
