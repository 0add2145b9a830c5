//! Input/output side of sfrc.
//!
//! This crate provides:
//! - **Rewrite pipeline** streaming a deck through ordered edit rules
//! - **Edit rules** for orientation injection and material property changes
//! - **Orientation tables** (`;`-delimited, one row per inclusion)
//! - **Run configuration** loaded from JSON or built by the CLI
//! - **Reports** as pretty JSON plus a plain-text debug dump

use std::path::Path;

use sfrc_inp::InpFile;
use sfrc_model::{FiberSession, SessionOptions, detect_family};
use sfrc_orient::OrientationIds;

pub mod config;
pub mod error;
pub mod orientation_table;
pub mod report;
pub mod rewrite;
pub mod rules;

pub use config::{MaterialPropertyChange, OrientationSource, RunConfig};
pub use error::{IoError, Result};
pub use orientation_table::{OrientationRow, OrientationTable};
pub use report::{
    FiberRecord, GroupRecord, RunReport, debug_dump, load_report, write_debug_dump, write_report,
};
pub use rewrite::{Edit, EditRule, RewritePipeline, RewriteStats};
pub use rules::{ChangeMaterialProperty, FiberOrientation, InjectOrientations, Isotropy};

/// What a run produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub report: RunReport,
    pub session: Option<FiberSession>,
    /// Present when a rewritten deck was written.
    pub rewrite: Option<RewriteStats>,
}

/// Estimate or read orientations, rewrite the deck and write reports.
pub fn run(config: &RunConfig) -> Result<RunOutcome> {
    config.validate()?;
    let deck_name = config.input.display().to_string();

    let mut deck = InpFile::open(&config.input)?;
    let family = detect_family(deck.index(), &config.family_candidates)?;

    let needs_session = config.compare
        || config.debug_dump.is_some()
        || config.source == OrientationSource::Estimate;
    let session = if needs_session {
        let options = SessionOptions {
            family_candidates: vec![family.clone()],
            compare: config.compare,
        };
        Some(FiberSession::run(&mut deck, &options)?)
    } else {
        None
    };

    let orientations = match &config.source {
        OrientationSource::Estimate => session
            .iter()
            .flat_map(|s| s.orientations())
            .map(|(name, orientation)| FiberOrientation {
                elset: name.to_string(),
                orientation: orientation.clone(),
            })
            .collect(),
        OrientationSource::Table { path } => {
            let table = OrientationTable::read(path)?;
            table.fiber_orientations(&family, &mut OrientationIds::new(&family))?
        }
    };

    let mut report = match &session {
        Some(session) => RunReport::from_session(&deck_name, session),
        None => RunReport::new(&deck_name, &family),
    };

    let rewrite = match &config.output {
        Some(output) => {
            let injected = orientations.len();
            let stats = rewrite_deck(config, &family, orientations, &config.input, output)?;
            let applied = RewritePipeline::hits(&stats, InjectOrientations::NAME) > 0;
            report.injected_sections = if applied { injected } else { 0 };
            report.output = Some(output.display().to_string());
            if !applied {
                log::warn!("no '*Solid Section, elset={family}' line found, nothing injected");
            }
            Some(stats)
        }
        None => None,
    };

    if let Some(path) = &config.report {
        write_report(path, &report)?;
    }
    if let (Some(path), Some(session)) = (&config.debug_dump, &session) {
        write_debug_dump(path, session)?;
    }

    Ok(RunOutcome {
        report,
        session,
        rewrite,
    })
}

fn rewrite_deck(
    config: &RunConfig,
    family: &str,
    orientations: Vec<FiberOrientation>,
    input: &Path,
    output: &Path,
) -> Result<RewriteStats> {
    let mut pipeline = RewritePipeline::new()
        .with_rule(InjectOrientations::new(family, config.material.clone(), orientations))
        .break_at(config.break_point.clone());
    if let Some(change) = &config.material_property {
        pipeline.push_rule(Box::new(change.rule()?));
    }
    pipeline.rewrite_file(input, output)
}
