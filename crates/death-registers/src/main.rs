mod bootstrap;

use anyhow::{Context, Result};
use clap::Parser;
use registers_core::settings::Settings;
use registers_data::pipeline::run_pipeline;
use registers_data::writer::{write_dataset, write_forename_table, write_summary};

fn main() -> Result<()> {
    let settings = Settings::parse();

    bootstrap::setup_logging(settings.effective_log_level(), settings.log_file.as_deref())?;

    tracing::info!("death-registers v{} starting", env!("CARGO_PKG_VERSION"));

    let config = settings
        .pipeline_config()
        .context("invalid configuration")?;

    tracing::info!(
        "Years {}-{} step {}, threshold {}, schema cutoff {}, root {}",
        config.start_year,
        config.end_year,
        config.step,
        config.age_threshold,
        config.schema_cutoff_year,
        config.source_root.display()
    );

    let output = run_pipeline(&config).context("ingestion aborted")?;

    write_forename_table(&settings.output, &output.forenames)
        .with_context(|| format!("writing forename table to {}", settings.output.display()))?;
    tracing::info!(
        "Wrote {} forenames to {}",
        output.forenames.len(),
        settings.output.display()
    );

    if let Some(path) = &settings.dataset_output {
        write_dataset(path, &output.dataset)
            .with_context(|| format!("writing dataset to {}", path.display()))?;
        tracing::info!("Wrote {} records to {}", output.dataset.len(), path.display());
    }

    if let Some(path) = &settings.summary_output {
        write_summary(path, &output.summary)
            .with_context(|| format!("writing run summary to {}", path.display()))?;
    }

    Ok(())
}
