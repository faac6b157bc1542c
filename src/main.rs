//! Deferral - run join and loop combinators over scripted outcomes
//!
//! Outcomes are written as `ok:VALUE`, `err:ERROR` or `never`, with an
//! optional `@N` suffix that completes the entry after `N` reactor ticks.

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use deferral::config::CONFIG_FILE_NAME;
use deferral::script::parse_script;
use deferral::{
    CombinatorConfig, DeferralError, JoinPolicy, LoopPolicy, OutputFormat, Report, Runner,
    SchedulingMode,
};

#[derive(Parser)]
#[command(name = "deferral")]
#[command(version = "0.1.0")]
#[command(about = "Join and loop combinators over deferred values", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file (defaults to ./deferral.json)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Join a set of operations under a completion policy
    Join {
        /// Join policy
        #[arg(value_enum)]
        policy: JoinPolicy,

        /// Scripted operations, e.g. ok:1 err:timeout@2 never
        #[arg(required = true, allow_hyphen_values = true)]
        outcomes: Vec<String>,
    },

    /// Repeatedly run attempts, one scripted outcome per attempt
    Loop {
        /// Loop policy
        #[arg(value_enum)]
        policy: LoopPolicy,

        /// Scheduling mode (overrides the configuration file)
        #[arg(short, long, value_enum)]
        scheduling: Option<SchedulingMode>,

        /// Scripted attempts, consumed in order
        #[arg(required = true, allow_hyphen_values = true)]
        outcomes: Vec<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        "deferral=debug,info"
    } else {
        "deferral=info,warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(output) => {
            println!("{output}");
            Ok(())
        }
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            if e.is_usage_error() {
                eprintln!("Run 'deferral --help' for usage.");
            }
            std::process::exit(e.exit_code());
        }
    }
}

fn run(cli: Cli) -> deferral::Result<String> {
    let mut config = match &cli.config {
        // An explicit file must exist; the default one is optional.
        Some(path) if !path.exists() => {
            return Err(DeferralError::config_with_path(
                format!("file not found: {}", path.display()),
                path.clone(),
            ));
        }
        Some(path) => CombinatorConfig::load(path)?,
        None => CombinatorConfig::load(&PathBuf::from(CONFIG_FILE_NAME))?,
    };
    if cli.json {
        config = config.with_output(OutputFormat::Json);
    }

    let report = match cli.command {
        Commands::Join { policy, outcomes } => {
            let script = parse_script(&outcomes)?;
            Runner::new(config.clone()).join(policy, &script)
        }
        Commands::Loop {
            policy,
            scheduling,
            outcomes,
        } => {
            if let Some(mode) = scheduling {
                config = config.with_scheduling(mode);
            }
            let script = parse_script(&outcomes)?;
            Runner::new(config.clone()).repeat(policy, &script)?
        }
    };

    render(&report, config.output)
}

fn render(report: &Report, output: OutputFormat) -> Result<String, DeferralError> {
    match output {
        OutputFormat::Json => report.to_json(),
        OutputFormat::Text => Ok(report.render_text().trim_end().to_string()),
    }
}
