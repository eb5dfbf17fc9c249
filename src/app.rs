use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::config::RunConfig;
use crate::data::loader::load_table;
use crate::data::writer::write_table;
use crate::selection::{SelectionEngine, SelectionResult};

// ---------------------------------------------------------------------------
// One selection run: load → select → write
// ---------------------------------------------------------------------------

/// How a run ended when nothing went wrong.
#[derive(Debug)]
pub enum RunOutcome {
    /// The output path was already taken; nothing was read or written.
    OutputExists(PathBuf),
    /// The subsample was written.
    Written(SelectionResult),
}

/// Subsample the catalogue, score the selection and write the result.
///
/// Fatal errors (unreadable table, malformed number in a criterion, missing
/// identifier column) are returned before anything is written.
pub fn run(config: &RunConfig) -> Result<RunOutcome> {
    // Be careful not to overwrite existing files.
    if config.output.exists() {
        log::warn!("Output {} already exists", config.output.display());
        return Ok(RunOutcome::OutputExists(config.output.clone()));
    }

    let catalogue = load_table(&config.catalogue)
        .with_context(|| format!("loading catalogue {}", config.catalogue.display()))?;
    let random = load_table(&config.random)
        .with_context(|| format!("loading random {}", config.random.display()))?;
    let ideal = load_table(&config.ideal)
        .with_context(|| format!("loading ideal {}", config.ideal.display()))?;

    let engine = SelectionEngine::new(config.id_column.as_str());
    let result = engine
        .select(&catalogue, &random, &ideal, config.criteria.as_slice())
        .context("selection failed")?;

    for criterion in &result.applied {
        log::info!("Selecting by {criterion}");
    }
    for diagnostic in &result.diagnostics {
        log::warn!("{diagnostic}");
    }
    log::info!("{} objects were selected from the catalogue", result.catalogue.len());
    log::info!("{} objects were selected from the random file", result.random_selected);
    log::info!("{} objects were selected from the ideal file", result.ideal_selected);

    if !result.completeness.is_defined() {
        log::warn!("Completeness is undefined: no objects were selected from the ideal file");
    }
    if !result.purity.is_defined() {
        log::warn!("Purity is undefined: no objects were selected from the random file");
    }

    write_table(&result.catalogue, &result.metadata(), &config.output)
        .with_context(|| format!("writing {}", config.output.display()))?;

    Ok(RunOutcome::Written(result))
}
