//! House Marketplace CLI - browse, create and edit property listings
//!
//! Every command drives the same core flows a page would: sign-in,
//! category and offers browsing, and the create/edit listing editor.

mod auth;
mod cli;
mod commands;
mod config_profiles;
mod error;


use clap::Parser;
use tracing_subscriber::filter::Directive;

use crate::cli::{Cli, Commands};
use crate::commands::auth_cmd::run_auth;
use crate::commands::browse::{run_list, run_show, ListOptions};
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::listing::{run_create, run_edit, ListingChanges};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "marketplace=info".parse::<Directive>() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let profile = cli.profile.as_deref();

    match cli.command {
        Commands::List {
            listing_type,
            offers,
            mine,
            limit,
            json,
        } => {
            let options = ListOptions {
                listing_type: listing_type.map(Into::into),
                offers,
                mine,
                limit,
                json,
            };
            run_list(options, profile).await?;
        }
        Commands::Show { id, json } => run_show(&id, json, profile).await?,
        Commands::Create {
            assignments,
            images,
        } => {
            run_create(
                ListingChanges {
                    assignments,
                    images,
                },
                profile,
            )
            .await?;
        }
        Commands::Edit {
            id,
            assignments,
            images,
        } => {
            run_edit(
                &id,
                ListingChanges {
                    assignments,
                    images,
                },
                profile,
            )
            .await?;
        }
        Commands::Completions { shell, output } => run_completions(shell, output.as_deref())?,
        Commands::Config { command } => run_config(command, profile)?,
        Commands::Auth { command } => run_auth(command, profile).await?,
    }

    Ok(())
}
