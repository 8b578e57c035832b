use clap::Parser;
use fund_budget::args::{AggregateSubcommand, Args, Command, RowSubcommand};
use fund_budget::{commands, Config, Result};
use std::process::ExitCode;
use tracing::{debug, error, trace};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().budget_home().path();

    // Route to appropriate command handler
    let _: () = match args.command() {
        Command::Init(init_args) => commands::init(home, init_args).await?.print(),

        Command::Labels(filter) => commands::labels(filter)?.print(),

        Command::Show(filter) => {
            let config = Config::load(home).await?;
            commands::show(&config, filter).await?.print()
        }

        Command::Meta(meta_args) => {
            let config = Config::load(home).await?;
            commands::meta(&config, meta_args).await?.print()
        }

        Command::Row(row_args) => {
            let config = Config::load(home).await?;
            match row_args.action() {
                RowSubcommand::Add(args) => commands::row_add(&config, args).await?.print(),
                RowSubcommand::Set(args) => commands::row_set(&config, args).await?.print(),
                RowSubcommand::Remove(args) => commands::row_remove(&config, args).await?.print(),
            }
        }

        Command::Export(export_args) => {
            let config = Config::load(home).await?;
            commands::export(&config, export_args).await?.print()
        }

        Command::Import(import_args) => {
            let config = Config::load(home).await?;
            commands::import(&config, import_args.path())
                .await?
                .print()
        }

        Command::Aggregate(aggregate_args) => {
            let config = Config::load(home).await?;
            match aggregate_args.action() {
                AggregateSubcommand::Add(args) => commands::aggregate_add(&config, args.paths())
                    .await?
                    .print(),
                AggregateSubcommand::List => commands::aggregate_list(&config).await?.print(),
                AggregateSubcommand::Remove(args) => {
                    commands::aggregate_remove(&config, args.index())
                        .await?
                        .print()
                }
                AggregateSubcommand::Clear => commands::aggregate_clear(&config).await?.print(),
                AggregateSubcommand::Summary => {
                    commands::aggregate_summary(&config).await?.print()
                }
            }
        }
    };
    Ok(())
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use default log level for the binary and the library only.
            EnvFilter::new(format!(
                "{}={level},fund_budget={level}",
                env!("CARGO_CRATE_NAME")
            ))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
