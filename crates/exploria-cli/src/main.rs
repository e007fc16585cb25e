//! Exploria CLI - account administration
//!
//! Usage:
//!   exploria create-account --email <email> --role admin
//!   exploria import <accounts.json>
//!   exploria list
//!   exploria gen-secret

use anyhow::Context;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use clap::{Parser, Subcommand};
use exploria_api::auth::{AccountStore, NewAccount, SecretHasher};
use exploria_core::{AppConfig, Role};
use rand::{rngs::OsRng, RngCore};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "exploria")]
#[command(about = "Exploria account administration")]
#[command(version)]
struct Cli {
    /// TOML configuration file; environment variables override it
    #[arg(long, env = "CONFIG_FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a single account with any role
    CreateAccount {
        #[arg(long)]
        email: String,
        /// Read from EXPLORIA_PASSWORD when omitted
        #[arg(long, env = "EXPLORIA_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, default_value = "user")]
        role: Role,
    },
    /// Import accounts from a JSON array
    Import {
        /// File containing `[{"email", "password", "name"?, "role"?}]`
        path: PathBuf,
    },
    /// List active accounts
    List,
    /// Print a random secret suitable for JWT_SECRET
    GenSecret,
}

#[derive(Deserialize)]
struct ImportRecord {
    email: String,
    password: String,
    name: Option<String>,
    #[serde(default)]
    role: Option<Role>,
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::from_file(path)?.with_env_override()?,
        None => AppConfig::from_env()?,
    };
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

async fn open_store(config: &AppConfig) -> anyhow::Result<AccountStore> {
    let repo = exploria_store::connect(&config.database)
        .await
        .context("Failed to open account store")?;
    let hasher = SecretHasher::new(&config.auth)?;
    Ok(AccountStore::new(repo, hasher, config.auth.min_password_len))
}

fn new_account(email: String, password: String, name: Option<String>, role: Role) -> NewAccount {
    NewAccount {
        email,
        password_confirm: password.clone(),
        password,
        name,
        role,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::CreateAccount {
            email,
            password,
            name,
            role,
        } => {
            let config = load_config(cli.config)?;
            let store = open_store(&config).await?;
            let account = store
                .create(new_account(email, password, name, role))
                .await
                .context("Failed to create account")?;
            println!("Created {} account {} ({})", account.role, account.email, account.id);
        }
        Commands::Import { path } => {
            let config = load_config(cli.config)?;
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let records: Vec<ImportRecord> =
                serde_json::from_str(&raw).context("Expected a JSON array of accounts")?;

            let store = open_store(&config).await?;
            let mut created = 0usize;
            for record in records {
                let email = record.email.clone();
                let role = record.role.unwrap_or(Role::User);
                match store
                    .create(new_account(record.email, record.password, record.name, role))
                    .await
                {
                    Ok(_) => created += 1,
                    Err(e) => {
                        tracing::warn!(email = %email, error = %e, "Skipping account");
                        eprintln!("Skipped {email}: {e}");
                    }
                }
            }
            println!("Imported {created} account(s)");
        }
        Commands::List => {
            let config = load_config(cli.config)?;
            let store = open_store(&config).await?;
            for account in store.list_active().await? {
                println!(
                    "{}\t{}\t{}\t{}",
                    account.id,
                    account.email,
                    account.role,
                    account.name.as_deref().unwrap_or("-")
                );
            }
        }
        Commands::GenSecret => {
            let mut bytes = [0u8; 48];
            OsRng.fill_bytes(&mut bytes);
            println!("{}", URL_SAFE_NO_PAD.encode(bytes));
        }
    }

    Ok(())
}
