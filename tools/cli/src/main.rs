//! Resivault CLI - bootstrap for the local secrets vault.
//!
//! Runs the HTTP service on a Unix socket, or performs one-shot vault
//! operations directly against the data directory.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use zeroize::Zeroizing;

#[cfg(unix)]
use resivault_server::{AppState, ServerConfig};
use resivault_vault::{Registry, Vault};

#[derive(Parser)]
#[command(name = "resivault")]
#[command(about = "Resivault - local secrets vault")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Directory holding the vault's metadata and entries.
    #[arg(long, env = "RESIVAULT_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Unix socket the server listens on.
    #[arg(long, env = "RESIVAULT_SOCKET")]
    socket: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API on the Unix socket.
    Serve,

    /// Initialize a new vault.
    Init,

    /// List entries.
    List,

    /// Print a revealed secret.
    Reveal {
        /// Entry id.
        entry_id: String,

        /// Secret label.
        label: String,
    },

    /// Show the registered secret and usage types.
    Types,

    /// Change the vault password.
    ChangePassword,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => home_dir()?.join(".resivault"),
    };

    match cli.command {
        Commands::Serve => {
            let socket = match cli.socket {
                Some(path) => path,
                None => home_dir()?.join(".resivault.sock"),
            };
            cmd_serve(&data_dir, socket).await
        }
        Commands::Init => cmd_init(&data_dir).await,
        Commands::List => cmd_list(&data_dir).await,
        Commands::Reveal { entry_id, label } => cmd_reveal(&data_dir, &entry_id, &label).await,
        Commands::Types => cmd_types(),
        Commands::ChangePassword => cmd_change_password(&data_dir).await,
    }
}

fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().context("Could not determine home directory")
}

/// Prompt for password securely.
fn prompt_password(prompt: &str) -> Result<Zeroizing<String>> {
    let password = rpassword::prompt_password(prompt).context("Failed to read password")?;
    Ok(Zeroizing::new(password))
}

/// Prompt twice and insist both answers agree.
fn prompt_new_password(prompt: &str) -> Result<Zeroizing<String>> {
    let password = prompt_password(prompt)?;
    let confirm = prompt_password("Confirm password: ")?;

    if password != confirm {
        anyhow::bail!("Passwords do not match");
    }

    if password.is_empty() {
        anyhow::bail!("Password cannot be empty");
    }

    Ok(password)
}

fn open_vault(data_dir: &Path) -> Result<Vault> {
    let registry =
        Arc::new(Registry::with_builtin_variants().context("Failed to register variants")?);
    Vault::open_dir(data_dir, registry)
        .with_context(|| format!("Failed to open vault at {}", data_dir.display()))
}

/// Open, unlock and load every entry.
async fn unlock_vault(data_dir: &Path) -> Result<Vault> {
    let mut vault = open_vault(data_dir)?;
    let password = prompt_password("Enter password: ")?;

    vault
        .unlock(&password)
        .await
        .context("Failed to unlock vault")?;
    vault
        .load_entries()
        .await
        .context("Failed to load entries")?;

    Ok(vault)
}

/// Run the HTTP service until interrupted.
#[cfg(unix)]
async fn cmd_serve(data_dir: &Path, socket: PathBuf) -> Result<()> {
    info!("Serving vault at {}", data_dir.display());

    let vault = open_vault(data_dir)?;
    let state = Arc::new(AppState::new(vault));
    let config = ServerConfig::new(socket);

    resivault_server::serve_unix(&config, state)
        .await
        .context("Server failed")?;

    Ok(())
}

#[cfg(not(unix))]
async fn cmd_serve(_data_dir: &Path, _socket: PathBuf) -> Result<()> {
    anyhow::bail!("Serving requires Unix domain sockets")
}

/// Create a new vault.
async fn cmd_init(data_dir: &Path) -> Result<()> {
    info!("Initializing vault at {}", data_dir.display());

    let mut vault = open_vault(data_dir)?;
    if vault.is_initialized().await? {
        anyhow::bail!("Vault at {} is already initialized", data_dir.display());
    }

    let password = prompt_new_password("Enter password: ")?;
    vault
        .initialize_new(&password)
        .await
        .context("Failed to initialize vault")?;

    println!("Vault initialized successfully!");
    println!("  Location: {}", data_dir.display());

    Ok(())
}

/// List entries and any that failed to load.
async fn cmd_list(data_dir: &Path) -> Result<()> {
    let vault = unlock_vault(data_dir).await?;

    let entries: Vec<_> = vault.entries()?.collect();
    if entries.is_empty() {
        println!("Vault is empty.");
    } else {
        for entry in entries {
            let tags: Vec<String> = entry.all_tags().iter().map(|t| t.to_string()).collect();
            println!(
                "  {}  {} [{}] {}",
                entry.id(),
                entry.name(),
                entry.usage().type_tag(),
                tags.join(", ")
            );
            for label in entry.secret_labels() {
                println!("      - {}", label);
            }
        }
    }

    let errors = vault.loading_errors();
    if !errors.is_empty() {
        println!("\nFailed to load {} entries:", errors.len());
        for (id, err) in errors {
            println!("  {}: {}", id, err);
        }
    }

    Ok(())
}

/// Print one revealed secret.
async fn cmd_reveal(data_dir: &Path, entry_id: &str, label: &str) -> Result<()> {
    let vault = unlock_vault(data_dir).await?;

    let value = vault
        .reveal_entry_secret(entry_id, label)
        .with_context(|| format!("Failed to reveal {}/{}", entry_id, label))?;

    match value.as_str() {
        Some(text) => println!("{}", text),
        None => println!("{}", serde_json::to_string_pretty(&value)?),
    }

    Ok(())
}

fn cmd_types() -> Result<()> {
    let registry = Registry::with_builtin_variants().context("Failed to register variants")?;
    println!("{}", serde_json::to_string_pretty(&registry.describe())?);
    Ok(())
}

/// Change vault password.
async fn cmd_change_password(data_dir: &Path) -> Result<()> {
    info!("Changing vault password");

    let mut vault = open_vault(data_dir)?;
    let old_password = prompt_password("Enter current password: ")?;
    let new_password = prompt_new_password("Enter new password: ")?;

    vault
        .unlock(&old_password)
        .await
        .context("Failed to unlock vault")?;
    vault
        .change_password(&old_password, &new_password)
        .await
        .context("Failed to change password")?;

    println!("Password changed successfully!");

    Ok(())
}
