//! ftt-siren - SIREN/SIRET matcher
//!
//! Matches companies of the funding tracker with their official French
//! SIREN/SIRET numbers using the INSEE Sirene API.
//!
//! Prerequisites: an INSEE API account subscribed to "API Sirene" (free
//! tier), and either Supabase credentials or a local SQLite copy of the
//! `companies` table.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use ftt_common::config::{get_user_agent, load_toml_config};
use ftt_siren::config::{ConfigOverrides, MatcherConfig, StoreConfig};
use ftt_siren::db::{CompanyStore, RestStore, SqliteStore, TargetFilter};
use ftt_siren::services::{RequestPacer, SireneClient};
use ftt_siren::workflow::{BatchMatcher, RunOptions, StdinConfirm};
use ftt_siren::MatchError;

const EXIT_FAILURE: u8 = 1;
const EXIT_HALTED: u8 = 2;

/// Command-line arguments for ftt-siren
#[derive(Parser, Debug)]
#[command(name = "ftt-siren")]
#[command(about = "Match companies with their SIREN/SIRET numbers via the INSEE Sirene API")]
#[command(version)]
struct Args {
    /// Preview matches without updating the database
    #[arg(long)]
    dry_run: bool,

    /// Process only N companies
    #[arg(long, value_name = "N")]
    limit: Option<usize>,

    /// Process only companies whose name contains NAME
    #[arg(long, value_name = "NAME")]
    company: Option<String>,

    /// Re-match companies that already have a SIREN
    #[arg(long)]
    force: bool,

    /// Show results first, then ask before applying high confidence matches
    #[arg(long)]
    confirm: bool,

    /// TOML config file
    #[arg(long, value_name = "PATH", env = "FTT_CONFIG")]
    config: Option<PathBuf>,

    /// Supabase project URL
    #[arg(long, env = "SUPABASE_URL")]
    supabase_url: Option<String>,

    /// Supabase service-role key
    #[arg(long, env = "SUPABASE_SERVICE_KEY", hide_env_values = true)]
    supabase_service_key: Option<String>,

    /// INSEE Sirene API key
    #[arg(long, env = "INSEE_API_KEY", hide_env_values = true)]
    insee_api_key: Option<String>,

    /// Sirene establishment search endpoint
    #[arg(long, env = "SIRENE_API_URL")]
    sirene_url: Option<String>,

    /// Minimum delay between registry requests, in milliseconds
    #[arg(long, value_name = "MS")]
    rate_limit_ms: Option<u64>,

    /// Headquarters country of the companies to match
    #[arg(long)]
    country: Option<String>,

    /// Use a local SQLite companies table instead of Supabase
    #[arg(long, value_name = "PATH")]
    sqlite: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            supabase_url: self.supabase_url.clone(),
            supabase_service_key: self.supabase_service_key.clone(),
            insee_api_key: self.insee_api_key.clone(),
            sirene_url: self.sirene_url.clone(),
            rate_limit_ms: self.rate_limit_ms,
            country: self.country.clone(),
            sqlite_path: self.sqlite.clone(),
        }
    }

    fn print_banner(&self) {
        println!("=================================================");
        println!("French Tech Funding - SIREN/SIRET Matching");
        println!("=================================================");
        if self.dry_run {
            println!("MODE: Dry run (no database updates)");
        }
        if self.force {
            println!("MODE: Force re-match existing SIRENs");
        }
        if self.confirm {
            println!("MODE: Confirm before applying high confidence matches");
        }
        if let Some(limit) = self.limit {
            println!("MODE: Limited to {} companies", limit);
        }
        if let Some(company) = &self.company {
            println!("MODE: Matching company \"{}\"", company);
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("\nFatal error: {:#}", e);
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

async fn run(args: Args) -> Result<ExitCode> {
    let loaded = load_toml_config(args.config.as_deref(), "ftt-siren")
        .context("Failed to load config file")?;
    let toml_config = loaded.config;

    let default_level = if args.verbose {
        "debug"
    } else {
        toml_config.logging.level.as_str()
    };
    ftt_common::logging::init_tracing(&format!("ftt_siren={},ftt_common={}", default_level, default_level))?;

    if let Some(path) = &loaded.missing_file {
        warn!("Config file {} not found, using defaults", path.display());
    }

    args.print_banner();

    let config = match MatcherConfig::resolve(&args.overrides(), &toml_config) {
        Ok(config) => config,
        Err(MatchError::Configuration(message)) => {
            eprintln!("\n  Configuration errors:");
            for line in message.split("; ") {
                eprintln!("    - {}", line);
            }
            eprintln!("\n  Set them in the environment or in ~/.config/ftt/ftt-siren.toml.\n");
            return Ok(ExitCode::from(EXIT_FAILURE));
        }
        Err(e) => return Err(e.into()),
    };

    let user_agent = get_user_agent("ftt-siren", env!("CARGO_PKG_VERSION"));

    let store: Arc<dyn CompanyStore> = match &config.store {
        StoreConfig::Rest { url, service_key } => {
            info!("Datastore: {}", url);
            Arc::new(RestStore::new(url, service_key.clone(), &user_agent)?)
        }
        StoreConfig::Sqlite { path } => {
            info!("Datastore: {}", path.display());
            Arc::new(SqliteStore::open(path).await?)
        }
    };

    let pacer = Arc::new(RequestPacer::new(config.rate_limit));
    info!(
        "Registry pacing: one request every {:?} (~{:.0}/min)",
        pacer.interval(),
        pacer.requests_per_minute()
    );
    let registry = Arc::new(
        SireneClient::new(config.insee_api_key.clone(), &user_agent)?
            .with_base_url(config.sirene_url.clone())
            .with_results_per_query(config.results_per_query)
            .with_pacer(pacer),
    );

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Received Ctrl+C, finishing current company");
                cancel.cancel();
            }
        }
    });

    let options = RunOptions {
        dry_run: args.dry_run,
        confirm: args.confirm,
        limit: args.limit,
    };
    let matcher = BatchMatcher::new(registry, store, options).with_cancellation(cancel);

    let filter = TargetFilter {
        country: config.country.clone(),
        include_matched: args.force,
        name_contains: args.company.clone(),
        limit: args.limit,
    };

    println!("\n--- Fetching companies ---");
    let targets = matcher.fetch_targets(&filter).await?;
    println!("Found {} companies to process", targets.len());

    if targets.is_empty() {
        println!("\nNo companies to process. Use --force to re-match existing.");
        return Ok(ExitCode::SUCCESS);
    }

    println!("\n--- Processing companies ---");
    let mut report = matcher.process(targets).await;
    println!("{}", report);

    if let Some(outcome) = matcher.confirm_high_matches(&mut report, &StdinConfirm).await {
        println!("\n{}", outcome);
    }

    if report.is_halted() {
        return Ok(ExitCode::from(EXIT_HALTED));
    }
    Ok(ExitCode::SUCCESS)
}
