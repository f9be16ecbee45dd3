use anyhow::{Context, Result};
use clap::Parser;

use sqlx_prepare::cli::Cli;
use sqlx_prepare::cli_utils::{prepare_prefix, summary_lines};
use sqlx_prepare::config::FileConfig;
use sqlx_prepare::logging;
use sqlx_prepare::regenerate::{default_root, Mode, Regenerator};

fn main() -> Result<()> {
    logging::init();

    let cli = Cli::parse();

    let root = cli.root.clone().unwrap_or_else(default_root);
    let file_config = FileConfig::load(cli.config.as_deref(), &root)?;
    let config = cli.merge(root, file_config);
    config.validate().context("Invalid configuration")?;

    let mode = if cli.check { Mode::Verify } else { Mode::Replace };
    let regenerator = Regenerator::new(config);

    tracing::info!(
        root = %regenerator.root().display(),
        prepare_dir = %regenerator.layout().prepare_dir.display(),
        "regenerating offline query cache"
    );

    let report = regenerator
        .run(mode)
        .context("Failed to regenerate the offline query cache")?;

    for line in summary_lines(&report) {
        println!("{} {}", prepare_prefix(), line);
    }

    if let Some(diff) = report.diff {
        if !diff.is_empty() {
            return Err(diff.into_error().into());
        }
    }

    Ok(())
}
