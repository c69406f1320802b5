use anyhow::Result;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use osintwatch::{
    aggregate,
    cache::ResultCache,
    config::Config,
    logging::{self, LogFormat, LogLevel},
    model::{Query, ScanResult},
    notify::{AlertState, DeliveryStatus, Dispatcher, MailgunTransport},
    output::{format_result_to_string, print_result, OutputFormat},
    scan::Orchestrator,
    ModuleRegistry, ThreatSignals,
};
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Exit codes for CI integration
mod exit_codes {
    pub const SUCCESS: u8 = 0;
    pub const ERROR: u8 = 1;
    pub const THREATS_FOUND: u8 = 2;
}

#[derive(Parser)]
#[command(name = "osintwatch")]
#[command(
    author,
    version,
    about = "Run OSINT lookups against a target and alert on threats"
)]
struct Cli {
    /// Logging verbosity level
    #[arg(long, global = true, default_value = "warn")]
    log_level: LogLevel,

    /// Logging output format
    #[arg(long, global = true, default_value = "pretty")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan an email address, domain, URL or IP address
    Scan {
        /// Search target
        target: String,

        /// Comma-separated modules to run (default: from config)
        #[arg(short, long, value_delimiter = ',')]
        modules: Option<Vec<String>>,

        /// Output format (table, json, text, html)
        #[arg(short, long)]
        format: Option<String>,

        /// Write output to file
        #[arg(short, long)]
        output: Option<String>,

        /// Email an alert when threats are found
        #[arg(long)]
        notify: bool,

        /// Run modules one at a time
        #[arg(long)]
        no_parallel: bool,

        /// Ignore and don't update the result cache
        #[arg(long)]
        no_cache: bool,

        /// Exit with code 2 if any threat category is positive
        #[arg(long)]
        fail_on_threat: bool,
    },

    /// List available intelligence modules
    ListModules,

    /// Show or create config file
    Config {
        /// Generate default config file
        #[arg(long)]
        init: bool,

        /// Show config file path
        #[arg(long)]
        path: bool,
    },

    /// Clear the result cache
    ClearCache,
}

struct ScanArgs {
    target: String,
    modules: Option<Vec<String>>,
    format: Option<String>,
    output: Option<String>,
    notify: bool,
    parallel: bool,
    use_cache: bool,
    fail_on_threat: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.log_level.into(), cli.log_format) {
        eprintln!("Error: failed to initialize logging: {}", e);
        return ExitCode::from(exit_codes::ERROR);
    }

    match run(cli.command).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("Error: {}", e);
            ExitCode::from(exit_codes::ERROR)
        }
    }
}

async fn run(command: Commands) -> Result<u8> {
    let mut config = Config::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "ignoring unreadable config file");
        Config::default()
    });
    config.apply_env(|key| std::env::var(key).ok());

    match command {
        Commands::Scan {
            target,
            modules,
            format,
            output,
            notify,
            no_parallel,
            no_cache,
            fail_on_threat,
        } => {
            let args = ScanArgs {
                target,
                modules,
                format,
                output,
                notify,
                parallel: !no_parallel,
                use_cache: !no_cache,
                fail_on_threat,
            };
            run_scan(&config, args).await
        }
        Commands::ListModules => {
            list_modules(&config)?;
            Ok(exit_codes::SUCCESS)
        }
        Commands::Config { init, path } => {
            handle_config(init, path)?;
            Ok(exit_codes::SUCCESS)
        }
        Commands::ClearCache => {
            let cache = ResultCache::new(config.cache_ttl_hours);
            cache.clear()?;
            println!("Cache cleared.");
            Ok(exit_codes::SUCCESS)
        }
    }
}

async fn run_scan(config: &Config, args: ScanArgs) -> Result<u8> {
    let format_str = args
        .format
        .unwrap_or_else(|| config.default_format.clone());
    let format = OutputFormat::from_str(&format_str).map_err(|e| anyhow::anyhow!(e))?;
    let is_interactive = format == OutputFormat::Table;

    let query = Query::parse(&args.target)?;
    let module_names = args
        .modules
        .unwrap_or_else(|| config.default_modules.clone());

    let registry = Arc::new(ModuleRegistry::from_config(config)?);
    let mut limits = config.limits();
    if !args.parallel {
        limits.max_concurrency = 1;
    }

    let mut orchestrator = Orchestrator::new(registry, limits);
    if args.use_cache && config.cache_ttl_hours > 0 {
        orchestrator = orchestrator.with_cache(ResultCache::new(config.cache_ttl_hours));
    }

    let progress = if is_interactive {
        let pb = ProgressBar::new_spinner();
        pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message(format!("Scanning {} ({})...", query, query.query_type()));
        Some(pb)
    } else {
        None
    };

    let result = orchestrator.run_scan(&query, module_names.as_slice()).await;

    let result = match result {
        Ok(result) => {
            if let Some(pb) = &progress {
                pb.finish_with_message(format!(
                    "Ran {} modules ({} failed)",
                    result.modules_run.len(),
                    result.failed_modules().count()
                ));
            }
            result
        }
        Err(e) => {
            if let Some(pb) = progress {
                pb.finish_and_clear();
            }
            return Err(e.into());
        }
    };

    let signals = aggregate(&result);

    // Handle output
    if let Some(path) = args.output {
        let content = format_result_to_string(&query, &result, &signals, format)?;
        std::fs::write(&path, content)?;
        if is_interactive {
            println!("Results written to: {}", path);
        }
    } else {
        print_result(&query, &result, &signals, format)?;
    }

    let alert = if args.notify {
        Some(send_alert(config, &query, &result).await?)
    } else {
        None
    };

    Ok(determine_exit_code(
        &signals,
        args.fail_on_threat,
        alert.as_ref(),
    ))
}

async fn send_alert(config: &Config, query: &Query, result: &ScanResult) -> Result<AlertState> {
    let transport = MailgunTransport::from_config(config)?;
    let dispatcher = Dispatcher::new(Arc::new(transport), config);

    let state = dispatcher.process(query, result).await;
    match &state {
        AlertState::Suppressed => {
            eprintln!("No threats detected; no alert sent.");
        }
        AlertState::Dispatched(outcome) => match outcome.status {
            DeliveryStatus::Sent => {
                eprintln!(
                    "Alert sent to {} (id: {})",
                    config.recipient_email,
                    outcome.message_id.as_deref().unwrap_or("-")
                );
            }
            DeliveryStatus::Failed | DeliveryStatus::Error => {
                eprintln!(
                    "Alert not delivered ({:?}): {}",
                    outcome.status,
                    outcome.error_detail.as_deref().unwrap_or("unknown error")
                );
            }
        },
    }
    Ok(state)
}

/// Determine the exit code from the threat signals, --fail-on-threat and
/// the alert outcome. An undelivered alert is an error.
fn determine_exit_code(
    signals: &ThreatSignals,
    fail_on_threat: bool,
    alert: Option<&AlertState>,
) -> u8 {
    let undelivered = matches!(
        alert,
        Some(AlertState::Dispatched(outcome)) if outcome.status != DeliveryStatus::Sent
    );

    if undelivered {
        exit_codes::ERROR
    } else if fail_on_threat && signals.has_threats() {
        exit_codes::THREATS_FOUND
    } else {
        exit_codes::SUCCESS
    }
}

fn list_modules(config: &Config) -> Result<()> {
    let registry = ModuleRegistry::from_config(config)?;

    println!("Available modules:");
    println!();

    for module in registry.iter() {
        let types: Vec<&str> = module.supported_types().iter().map(|t| t.as_str()).collect();
        let default = if config.default_modules.iter().any(|m| m == module.name()) {
            " [default]"
        } else {
            ""
        };

        println!(
            "  {:<14} {:<24}{}",
            module.name(),
            module.kind().display_name(),
            default
        );
        println!("  {:<14} Query types: {}", "", types.join(", "));
        println!();
    }

    Ok(())
}

fn handle_config(init: bool, show_path: bool) -> Result<()> {
    let config_path = Config::config_path();

    if show_path {
        println!("{}", config_path.display());
        return Ok(());
    }

    if init {
        if config_path.exists() {
            println!("Config file already exists at: {}", config_path.display());
            return Ok(());
        }

        let config = Config::default();
        config.save()?;
        println!("Created config file at: {}", config_path.display());
        println!();
        println!("Default configuration:");
        println!("{}", Config::generate_default_config());
        return Ok(());
    }

    if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)?;
        println!("Config file: {}", config_path.display());
        println!();
        println!("{}", content);
    } else {
        println!("No config file found.");
        println!("Run 'osintwatch config --init' to create one.");
        println!();
        println!("Config path: {}", config_path.display());
    }

    Ok(())
}
