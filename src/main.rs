use std::path::PathBuf;

use anyhow::{Context, Result};

use gemma_diag::data::loader;
use gemma_diag::report::ScaleReportWriter;
use gemma_diag::{RunConfig, batch};

const DEFAULT_RUN_FILE: &str = "gemma-diag.json";

fn main() -> Result<()> {
    env_logger::init();

    let run_file = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_RUN_FILE));
    let config = RunConfig::load(&run_file)?;

    if config.samples.is_none() && config.vectors.is_none() {
        log::warn!(
            "{} names neither 'samples' nor 'vectors'; nothing to do",
            run_file.display()
        );
    }

    if let Some(samples) = &config.samples {
        let table = loader::load_samples(samples)
            .with_context(|| format!("loading samples from {}", samples.display()))?;
        let mut report = ScaleReportWriter::create(&config.scale_report)?;
        let run = batch::run_scale_check(&table, &mut report, config.max_vectors_per_experiment)?;
        let not_log = run.verdicts.iter().filter(|r| !r.verdict.is_log()).count();
        log::info!(
            "{} quantitation types classified, {not_log} not log scaled",
            run.verdicts.len()
        );
    }

    if let (Some(vectors), Some(destination)) = (&config.vectors, config.vectors_destination()) {
        let mut store = loader::load_vectors(vectors)
            .with_context(|| format!("loading vectors from {}", vectors.display()))?;
        if config.mode == gemma_diag::CheckMode::Full {
            log::info!("A full check of all vectors will be done");
        }
        let run = batch::run_integrity_check(&mut store, config.mode, config.checkpoint_interval)?;
        log::info!(
            "{} vectors repaired, {} size mismatches",
            run.repaired(),
            run.mismatched()
        );

        if run.vectors_written > 0 {
            loader::save_vectors(destination, store.all())
                .with_context(|| format!("saving vectors to {}", destination.display()))?;
            log::info!("Saved repaired vectors to {}", destination.display());
        }
    }

    Ok(())
}
