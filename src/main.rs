//! IPD service
//!
//! Main entry point for the inpatient module service.

use actix_web::{web, App, HttpServer};
use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_actix_web::TracingLogger;

use ipd::config::{self, Config};
use ipd::{api, telemetry, Database};

#[derive(Parser)]
#[command(name = "ipd", version, about = "Inpatient module: beds, clinical records, pharmacy and discharge billing")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API (default)
    Serve,
    /// Apply database migrations and exit
    Migrate,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    // Load configuration
    let config = config::load_config().context("failed to load configuration")?;
    telemetry::init(&config.logging);

    // Connect to database
    let database = Database::connect(&config.database)
        .await
        .context("failed to connect to database")?
        .with_numbering(config.numbering.clone())
        .with_billing_policy(config.billing.clone());

    // Run migrations
    database.run_migrations().await.context("failed to run database migrations")?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Migrate => {
            info!("migrations applied");
            Ok(())
        }
        Commands::Serve => serve(config, database).await,
    }
}

async fn serve(config: Config, database: Database) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let cors = config.cors.clone();
    let db = web::Data::new(database);

    info!(%addr, "starting IPD service");

    // Start HTTP server
    HttpServer::new(move || {
        App::new()
            .app_data(db.clone())
            .wrap(api::middleware::cors(&cors))
            .wrap(TracingLogger::default())
            .configure(api::configure)
    })
    .bind(&addr)
    .with_context(|| format!("failed to bind {}", addr))?
    .run()
    .await?;

    Ok(())
}
