use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use dbslice_catalog::PostgresCatalog;
use dbslice_core::Config;
use dbslice_engine::Dumper;

/// PostgreSQL partial-dump utility with foreign-key dependency resolution
#[derive(Parser)]
#[command(name = "dbslice")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file path (default: config.toml, then config/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(cli.config.as_deref())?;

    let conn_str = config.database.connection_string();
    let catalog = if config.database.ssl_mode == "require" {
        PostgresCatalog::connect_with_tls(&conn_str).await?
    } else {
        PostgresCatalog::connect(&conn_str).await?
    };

    let output = output_path(&config.settings.output);
    let file = File::create(&output)
        .with_context(|| format!("failed to create {}", output.display()))?;
    let mut writer = BufWriter::new(file);

    Dumper::new(&catalog, &config.settings)
        .dump_to(&mut writer)
        .await?;

    eprintln!("{} {}", "Export finished:".green(), output.display());
    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    if let Some(path) = path {
        return Config::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()));
    }
    for candidate in ["config.toml", "config/config.toml"] {
        let candidate = Path::new(candidate);
        if candidate.exists() {
            return Config::from_file(candidate)
                .with_context(|| format!("failed to load config from {}", candidate.display()));
        }
    }
    anyhow::bail!("no config file found; pass one with --config")
}

/// Output path from config, or a timestamped default when unset.
fn output_path(configured: &str) -> PathBuf {
    if configured.is_empty() {
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        PathBuf::from(format!("backup_{timestamp}.sql"))
    } else {
        PathBuf::from(configured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_output_path_wins() {
        assert_eq!(output_path("dump.sql"), PathBuf::from("dump.sql"));
    }

    #[test]
    fn empty_output_gets_timestamped_default() {
        let path = output_path("");
        let name = path.to_string_lossy();
        assert!(name.starts_with("backup_"));
        assert!(name.ends_with(".sql"));
    }
}
