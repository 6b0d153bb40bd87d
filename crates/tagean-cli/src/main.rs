//! CLI application for inferring EAN codes from price-tag photographs.

mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{config, extract, infer, inspect};

/// Price tag to EAN - Extract price-tag text with a vision model and match it to a catalog
#[derive(Parser)]
#[command(name = "tagean")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract text from every image in a directory into the result log
    Extract(extract::ExtractArgs),

    /// Infer EAN codes for the result log and write the inference table
    Infer(infer::InferArgs),

    /// Print the fields parsed from a result log as JSON
    Inspect(inspect::InspectArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Extract(args) => extract::run(args, cli.config.as_deref()).await,
        Commands::Infer(args) => infer::run(args, cli.config.as_deref()).await,
        Commands::Inspect(args) => inspect::run(args).await,
        Commands::Config(args) => config::run(args, cli.config.as_deref()).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_infer_flags_do_not_shadow_global_config() {
        let cli = Cli::try_parse_from([
            "tagean", "-c", "cfg.json", "infer", "-d", "db.csv", "-l", "log.txt",
        ])
        .unwrap();

        assert_eq!(cli.config.as_deref(), Some("cfg.json"));
        assert!(matches!(cli.command, Commands::Infer(_)));
    }
}
