use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use daygrid::infrastructure::credential_store::{KeyringSecretStore, SecretStore};
use daygrid::{init_tracing, run, RunOptions};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "daygrid", version, about = "Time-block day planner with a focus timer")]
struct Args {
    /// Workspace directory holding config/, state/ and logs/
    #[arg(long)]
    workspace: Option<PathBuf>,

    #[arg(long)]
    host: Option<String>,

    #[arg(long)]
    port: Option<u16>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Manage the remote store token kept in the OS keyring
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },
}

#[derive(Debug, Subcommand)]
enum TokenAction {
    Set { token: String },
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    match args.command {
        Some(Command::Token { action }) => {
            let store = KeyringSecretStore::default();
            match action {
                TokenAction::Set { token } => {
                    store.save_secret(&token).context("storing token in keyring")?;
                    println!("token stored");
                }
                TokenAction::Clear => {
                    store.delete_secret().context("removing token from keyring")?;
                    println!("token removed");
                }
            }
            Ok(())
        }
        None => {
            let workspace_root = match args.workspace {
                Some(path) => path,
                None => std::env::current_dir().context("resolving current directory")?,
            };
            run(RunOptions {
                workspace_root,
                host: args.host,
                port: args.port,
            })
            .await
            .context("daygrid server failed")
        }
    }
}
