//! Diary CLI - a private diary with an administrator panel.
//!
//! Every command restores the stored session, performs one application
//! action and exits. `diary shell` keeps a session open instead.

mod auth;
mod cli;
mod commands;
mod config;
mod error;
mod platform;
mod surface;

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use cli::{AdminCommands, Cli, Commands, ConfigCommands};
use commands::account::{run_admin_login, run_login, run_logout, run_signup, run_whoami};
use commands::add::run_add;
use commands::admin::{run_admin_delete, run_admin_edit, run_admin_list};
use commands::common::SessionOptions;
use commands::completions::run_completions;
use commands::config::{run_config_init, run_config_show, ConfigUpdate};
use commands::delete::run_delete;
use commands::edit::run_edit;
use commands::export::{run_delivery, Delivery};
use commands::list::run_list;
use commands::shell::run_shell;
use commands::unlock::run_unlock;
use error::CliError;

const DEFAULT_LOG_FILTER: &str = "diary=info";

#[tokio::main]
async fn main() {
    match run().await {
        Ok(()) => {}
        Err(CliError::Reported) => std::process::exit(1),
        Err(error) => {
            eprintln!("Error: {error}");
            std::process::exit(1);
        }
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let options = SessionOptions::new(cli.yes);

    match cli.command {
        Some(Commands::Signup {
            name,
            email,
            password,
        }) => run_signup(&options, name, email, password).await?,
        Some(Commands::Login {
            email,
            password,
            google,
        }) => run_login(&options, email, password, google).await?,
        Some(Commands::AdminLogin { email, password }) => {
            run_admin_login(&options, email, password).await?;
        }
        Some(Commands::Logout) => run_logout(&options).await?,
        Some(Commands::Whoami) => run_whoami(&options).await?,
        Some(Commands::Add {
            content,
            lock,
            color,
        }) => run_add(&options, &content, lock, color).await?,
        Some(Commands::List { search, date, json }) => {
            run_list(&options, search, date, json).await?;
        }
        Some(Commands::Edit { id, content }) => run_edit(&options, &id, &content).await?,
        Some(Commands::Delete { id }) => run_delete(&options, &id).await?,
        Some(Commands::Unlock { id, passphrase }) => {
            run_unlock(&options, &id, passphrase).await?;
        }
        Some(Commands::Export { id, output_dir }) => {
            let options = options.with_output_dir(output_dir);
            run_delivery(&options, Delivery::Pdf, id.as_deref()).await?;
        }
        Some(Commands::Print { id }) => {
            run_delivery(&options, Delivery::Print, id.as_deref()).await?;
        }
        Some(Commands::Share { id }) => {
            run_delivery(&options, Delivery::Share, id.as_deref()).await?;
        }
        Some(Commands::Admin { command }) => match command {
            AdminCommands::List { email, json } => run_admin_list(&options, email, json).await?,
            AdminCommands::Edit { id, content } => {
                run_admin_edit(&options, &id, &content).await?;
            }
            AdminCommands::Delete { id } => run_admin_delete(&options, &id).await?,
        },
        Some(Commands::Shell) => run_shell(&options).await?,
        Some(Commands::Completions { shell, output }) => {
            run_completions(shell, output.as_deref())?;
        }
        Some(Commands::Config { command }) => match command {
            ConfigCommands::Init {
                supabase_url,
                supabase_anon_key,
                admin_email,
                search_debounce_ms,
            } => run_config_init(ConfigUpdate {
                supabase_url,
                supabase_anon_key,
                admin_email,
                search_debounce_ms,
            })?,
            ConfigCommands::Show => run_config_show()?,
        },
        None => {
            // Quick capture mode: diary "dear diary..."
            if cli.note.is_empty() {
                Cli::command().print_help().map_err(CliError::Io)?;
                println!();
            } else {
                run_add(&options, &cli.note, None, None).await?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests;
