//! # CLI
//!
//! Command-line interface: database setup, account and material
//! administration, snapshots, and the HTTP server.
//!
//! Every command is a plain `cmd_*` function so tests can call it without
//! going through argument parsing.

use crate::api::{self, AppState};
use clap::{Parser, Subcommand, ValueEnum};
use furnish_core::{Catalog, CatalogSnapshot, MaterialInput, UserInput};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Error type for CLI commands.
pub type CliError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for CLI commands.
pub type CliResult<T = ()> = Result<T, CliError>;

// =============================================================================
// ARGUMENTS
// =============================================================================

/// Furnish: a furniture catalog with reviews.
#[derive(Debug, Parser)]
#[command(name = "furnish", version, about)]
pub struct Cli {
    /// Path to the catalog database.
    #[arg(
        long,
        short = 'd',
        global = true,
        env = "FURNISH_DATABASE",
        default_value = "furnish.redb"
    )]
    pub database: PathBuf,

    /// Storage backend.
    #[arg(
        long,
        global = true,
        env = "FURNISH_BACKEND",
        value_enum,
        default_value_t = Backend::Redb
    )]
    pub backend: Backend,

    #[command(subcommand)]
    pub command: Command,
}

/// Where the catalog lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// redb database file (persistent).
    Redb,
    /// In-process memory (lost on exit).
    Memory,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create an empty catalog database.
    Init {
        /// Replace an existing database.
        #[arg(long)]
        force: bool,
    },

    /// Run the HTTP server.
    Serve {
        /// Address to listen on.
        #[arg(long, env = "FURNISH_BIND", default_value = "127.0.0.1:8080")]
        bind: SocketAddr,

        /// Requests per second across the whole server (0 = unlimited).
        #[arg(long, env = "FURNISH_RATE_LIMIT", default_value_t = 0)]
        rate_limit: u32,
    },

    /// Manage user accounts.
    User {
        #[command(subcommand)]
        command: UserCommand,
    },

    /// Manage materials.
    Material {
        #[command(subcommand)]
        command: MaterialCommand,
    },

    /// Show record counts.
    Status {
        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Write the whole catalog to a JSON file.
    Export {
        /// Destination file.
        file: PathBuf,
    },

    /// Load a JSON snapshot into an empty catalog.
    Import {
        /// Snapshot file.
        file: PathBuf,
    },
}

#[derive(Debug, Subcommand)]
pub enum UserCommand {
    /// Register a user.
    Add {
        username: String,

        /// Password (at least 8 characters).
        #[arg(long, env = "FURNISH_PASSWORD")]
        password: String,

        /// Let the user edit and delete anyone's furniture.
        #[arg(long)]
        superuser: bool,
    },
    /// List users.
    List,
}

#[derive(Debug, Subcommand)]
pub enum MaterialCommand {
    /// Register a material.
    Add { name: String },
    /// List materials.
    List,
}

// =============================================================================
// COMMANDS
// =============================================================================

/// Open the catalog for `backend`.
pub fn open_catalog(database: &Path, backend: Backend) -> CliResult<Catalog> {
    match backend {
        Backend::Redb => Ok(Catalog::open_redb(database)?),
        Backend::Memory => Ok(Catalog::in_memory()),
    }
}

/// Create an empty database file.
pub fn cmd_init(database: &Path, force: bool) -> CliResult {
    if database.exists() {
        if !force {
            return Err(format!(
                "{} already exists (use --force to replace it)",
                database.display()
            )
            .into());
        }
        std::fs::remove_file(database)?;
    }
    Catalog::open_redb(database)?;
    println!("Initialized catalog at {}", database.display());
    Ok(())
}

/// Register a user.
pub fn cmd_user_add(
    database: &Path,
    backend: Backend,
    username: &str,
    password: &str,
    superuser: bool,
) -> CliResult {
    let mut catalog = open_catalog(database, backend)?;
    let input = UserInput {
        username: username.to_string(),
        password: password.to_string(),
    };
    let user = catalog.register_user(&input, superuser)?;
    println!(
        "Created {} {} (id {})",
        if user.is_superuser { "superuser" } else { "user" },
        user.username,
        user.id
    );
    Ok(())
}

pub fn cmd_user_list(database: &Path, backend: Backend) -> CliResult {
    let catalog = open_catalog(database, backend)?;
    for user in catalog.store().list_users()? {
        let flag = if user.is_superuser { " (superuser)" } else { "" };
        println!("{:>6}  {}{flag}", user.id, user.username);
    }
    Ok(())
}

/// Register a material.
pub fn cmd_material_add(database: &Path, backend: Backend, name: &str) -> CliResult {
    let mut catalog = open_catalog(database, backend)?;
    let material = catalog.create_material(&MaterialInput {
        name: name.to_string(),
    })?;
    println!("Created material {} (id {})", material.name, material.id);
    Ok(())
}

pub fn cmd_material_list(database: &Path, backend: Backend) -> CliResult {
    let catalog = open_catalog(database, backend)?;
    for material in catalog.materials()? {
        println!("{:>6}  {}", material.id, material.name);
    }
    Ok(())
}

/// Print record counts.
pub fn cmd_status(database: &Path, backend: Backend, json: bool) -> CliResult {
    let catalog = open_catalog(database, backend)?;
    let counts = catalog.status()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&counts)?);
    } else {
        println!("Catalog:   {}", database.display());
        println!("Users:     {}", counts.users);
        println!("Materials: {}", counts.materials);
        println!("Furniture: {}", counts.furniture);
        println!("Reviews:   {}", counts.reviews);
    }
    Ok(())
}

/// Write a JSON snapshot of the catalog.
pub fn cmd_export(database: &Path, backend: Backend, file: &Path) -> CliResult {
    let catalog = open_catalog(database, backend)?;
    let snapshot = catalog.export()?;
    std::fs::write(file, snapshot.to_json()?)?;
    println!(
        "Exported {} furniture items to {}",
        snapshot.furniture.len(),
        file.display()
    );
    Ok(())
}

/// Load a JSON snapshot into an empty catalog.
pub fn cmd_import(database: &Path, backend: Backend, file: &Path) -> CliResult {
    let json = std::fs::read_to_string(file)?;
    let snapshot = CatalogSnapshot::from_json(&json)?;
    let mut catalog = open_catalog(database, backend)?;
    catalog.import(&snapshot)?;
    println!(
        "Imported {} users, {} furniture items, {} reviews",
        snapshot.users.len(),
        snapshot.furniture.len(),
        snapshot.reviews.len()
    );
    Ok(())
}

/// Run the HTTP server until Ctrl-C.
pub async fn cmd_serve(
    database: &Path,
    backend: Backend,
    bind: SocketAddr,
    rate_limit: u32,
) -> CliResult {
    let catalog = open_catalog(database, backend)?;
    if backend == Backend::Memory {
        tracing::warn!("serving an in-memory catalog; nothing will be saved");
    }
    let state = AppState::new(catalog).with_rate_limit(rate_limit);
    api::serve(state, bind).await?;
    Ok(())
}

/// Dispatch a parsed command line.
pub async fn run(cli: Cli) -> CliResult {
    let database = cli.database.as_path();
    let backend = cli.backend;
    match cli.command {
        Command::Init { force } => cmd_init(database, force),
        Command::Serve { bind, rate_limit } => {
            cmd_serve(database, backend, bind, rate_limit).await
        }
        Command::User { command } => match command {
            UserCommand::Add {
                username,
                password,
                superuser,
            } => cmd_user_add(database, backend, &username, &password, superuser),
            UserCommand::List => cmd_user_list(database, backend),
        },
        Command::Material { command } => match command {
            MaterialCommand::Add { name } => cmd_material_add(database, backend, &name),
            MaterialCommand::List => cmd_material_list(database, backend),
        },
        Command::Status { json } => cmd_status(database, backend, json),
        Command::Export { file } => cmd_export(database, backend, &file),
        Command::Import { file } => cmd_import(database, backend, &file),
    }
}
