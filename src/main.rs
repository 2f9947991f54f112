use clap::Parser;
use placemat_aggregator::adapters::{MemoryCache, NoopCache};
use placemat_aggregator::config::cli::Command;
use placemat_aggregator::core::CacheStore;
use placemat_aggregator::utils::error::ErrorCategory;
use placemat_aggregator::utils::logger;
use placemat_aggregator::utils::validation::Validate;
use placemat_aggregator::{AggregationFacade, AggregatorConfig, AggregatorError, CliConfig};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

const JANITOR_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    if cli.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting placemat-aggregator");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let config = match AggregatorConfig::from_file(&cli.config) {
        Ok(config) => config,
        Err(e) => exit_with(&e),
    };
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        exit_with(&e);
    }

    let memory_cache = config
        .aggregator
        .cache_enabled
        .then(|| Arc::new(MemoryCache::new()));
    let janitor = memory_cache
        .as_ref()
        .map(|cache| cache.spawn_janitor(JANITOR_INTERVAL));
    let cache: Arc<dyn CacheStore> = match &memory_cache {
        Some(cache) => cache.clone() as Arc<dyn CacheStore>,
        None => {
            tracing::info!("Cache disabled by configuration");
            Arc::new(NoopCache)
        }
    };

    let facade = match config.build_facade(cache) {
        Ok(facade) => facade,
        Err(e) => exit_with(&e),
    };

    let outcome = run(&facade, cli.command).await;

    if let Some(janitor) = janitor {
        janitor.abort();
    }
    if let Some(cache) = memory_cache {
        cache.clear().await;
    }

    match outcome {
        Ok(output) => {
            println!("{}", output);
            Ok(())
        }
        Err(e) => exit_with(&e),
    }
}

async fn run(facade: &AggregationFacade, command: Command) -> Result<String, AggregatorError> {
    match command {
        Command::Contacts(args) => render(&facade.get_contacts(args.into()).await?),
        Command::Projects(args) => render(&facade.get_projects(args.into()).await?),
        Command::Finance(args) => render(&facade.get_finance_data(args.into()).await?),
        Command::Health => render(&facade.get_health_status().await),
    }
}

fn render<T: Serialize>(value: &T) -> Result<String, AggregatorError> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn exit_with(e: &AggregatorError) -> ! {
    tracing::error!("❌ Request failed: {} (Category: {:?})", e, e.category());
    eprintln!("❌ {}", e.user_friendly_message());

    let exit_code = match e.category() {
        ErrorCategory::Client => 2,
        ErrorCategory::Upstream => 3,
        ErrorCategory::Internal => 1,
    };
    std::process::exit(exit_code);
}
