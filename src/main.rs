// SPDX-License-Identifier: MIT

//! stk - sync runs from SmashRun into Supabase.

use clap::{Parser, Subcommand};
use runstreak::{
    config::{Config, CredentialSource},
    db::SupabaseDb,
    models::DEFAULT_SOURCE_TYPE,
    services::{SmashrunClient, SyncOptions},
    SyncContext,
};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "stk", about = "Sync runs from SmashRun to Supabase")]
struct Cli {
    /// Load credentials from a JSON file instead of the environment
    #[arg(long, global = true)]
    credentials_file: Option<PathBuf>,

    /// Override the configured user id
    #[arg(long, global = true)]
    user_id: Option<Uuid>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sync runs from SmashRun
    ///
    /// Examples:
    ///   stk sync                      sync since the last successful sync
    ///   stk sync --year 2015          sync all runs from 2015
    ///   stk sync --since 2020-01-01   sync from Jan 1, 2020
    ///   stk sync --full               sync everything since 2010
    Sync {
        /// Sync from date (YYYY-MM-DD)
        #[arg(short, long)]
        since: Option<String>,
        /// Sync until date (YYYY-MM-DD)
        #[arg(short, long)]
        until: Option<String>,
        /// Sync a specific year
        #[arg(short, long)]
        year: Option<i32>,
        /// Full sync from the SmashRun launch date
        #[arg(short, long)]
        full: bool,
    },
    /// SmashRun authorization helpers
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
    /// Run the HTTP sync-trigger service
    Serve {
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[derive(Subcommand)]
enum AuthCommands {
    /// Print the SmashRun authorization URL
    Authorize,
    /// Exchange an authorization code for tokens and store them
    Exchange {
        /// Authorization code shown by SmashRun
        #[arg(long)]
        code: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let cli = Cli::parse();

    let source = match &cli.credentials_file {
        Some(path) => CredentialSource::File(path.clone()),
        None => CredentialSource::Env,
    };

    let config = match Config::load(&source) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            process::exit(1);
        }
    };

    let user_id = cli.user_id.unwrap_or(config.user_id);
    let store = Arc::new(SupabaseDb::new(&config.supabase_url, &config.supabase_key));
    let smashrun = SmashrunClient::new(
        config.smashrun_client_id.clone(),
        config.smashrun_client_secret.clone(),
        config.smashrun_redirect_uri.clone(),
    );
    let ctx = Arc::new(SyncContext::new(
        config,
        store,
        Arc::new(smashrun.clone()),
    ));

    match cli.command {
        Commands::Sync {
            since,
            until,
            year,
            full,
        } => {
            let options = SyncOptions {
                since,
                until,
                year,
                full,
            };
            match ctx.sync_service(user_id).run(&options).await {
                Ok(outcome) => {
                    if outcome.runs_synced == 0 && outcome.skipped == 0 {
                        println!("You're up to date!");
                    } else {
                        println!(
                            "Synced {} runs ({} splits, {} skipped) for {} to {}",
                            outcome.runs_synced,
                            outcome.splits_synced,
                            outcome.skipped,
                            outcome.since,
                            outcome.until
                        );
                    }
                }
                Err(e) => {
                    eprintln!("Sync failed: {e}");
                    process::exit(1);
                }
            }
        }

        Commands::Auth { command } => match command {
            AuthCommands::Authorize => {
                println!("Open this URL in your browser:\n");
                println!("  {}\n", smashrun.authorization_url());
                println!("After authorizing, run: stk auth exchange --code <code>");
            }
            AuthCommands::Exchange { code } => {
                let tokens = match smashrun.exchange_code(&code).await {
                    Ok(tokens) => tokens,
                    Err(e) => {
                        eprintln!("Authorization failed: {e}");
                        process::exit(1);
                    }
                };

                if let Err(e) = ctx
                    .token_repository()
                    .save_user_tokens(
                        user_id,
                        &tokens.access_token,
                        &tokens.refresh_token,
                        tokens.expires_in,
                        DEFAULT_SOURCE_TYPE,
                    )
                    .await
                {
                    eprintln!("Failed to store tokens: {e}");
                    process::exit(1);
                }

                match smashrun.get_user_info(&tokens.access_token).await {
                    Ok(info) => println!(
                        "Connected as {}",
                        info.user_name.as_deref().unwrap_or("(unknown user)")
                    ),
                    Err(e) => {
                        tracing::warn!(error = %e, "Stored tokens but profile lookup failed");
                        println!("Tokens stored.");
                    }
                }
            }
        },

        Commands::Serve { port } => {
            let port = port.unwrap_or(ctx.config.port);
            let app = runstreak::routes::create_router(ctx);

            let addr = format!("0.0.0.0:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            tracing::info!(address = %addr, "Sync trigger listening");

            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("runstreak=debug".parse().expect("valid directive"))
                .add_directive("info".parse().expect("valid directive")),
        )
        .with(format)
        .init();
}
