//! JSON run report and plain-text debug dump.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sfrc_model::{BoundaryFace, FiberSession};
use sfrc_orient::ComparisonReport;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiberRecord {
    pub name: String,
    pub elements: usize,
    pub nodes: usize,
    pub surface_nodes: usize,
    pub boundaries: Vec<String>,
    pub orientation_id: Option<String>,
    pub principal: Option<[f64; 3]>,
    pub secondary: Option<[f64; 3]>,
    pub reference: Option<[f64; 3]>,
    pub error_degrees: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupRecord {
    pub members: Vec<String>,
    pub combined_nodes: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub generated_at: String,
    pub deck: String,
    pub family: String,
    pub model_center: Option<[f64; 3]>,
    pub model_dimensions: Option<[f64; 3]>,
    pub fibers: Vec<FiberRecord>,
    pub groups: Vec<GroupRecord>,
    pub individual: Vec<String>,
    pub unpaired: Vec<String>,
    pub warnings: Vec<String>,
    pub comparison: Option<ComparisonReport>,
    pub injected_sections: usize,
    pub output: Option<String>,
}

impl RunReport {
    pub fn new(deck: impl Into<String>, family: impl Into<String>) -> Self {
        Self {
            generated_at: Utc::now().to_rfc3339(),
            deck: deck.into(),
            family: family.into(),
            model_center: None,
            model_dimensions: None,
            fibers: Vec::new(),
            groups: Vec::new(),
            individual: Vec::new(),
            unpaired: Vec::new(),
            warnings: Vec::new(),
            comparison: None,
            injected_sections: 0,
            output: None,
        }
    }

    pub fn from_session(deck: impl Into<String>, session: &FiberSession) -> Self {
        let mut report = Self::new(deck, session.model.family());
        report.model_center = Some(session.geometry.center());
        report.model_dimensions = Some(session.geometry.dimensions());
        report.fibers = session
            .model
            .fibers()
            .iter()
            .map(|fiber| FiberRecord {
                name: fiber.name.clone(),
                elements: fiber.element_set.len(),
                nodes: fiber.node_set.len(),
                surface_nodes: fiber.surface_node_set.len(),
                boundaries: fiber
                    .intersections
                    .keys()
                    .filter(|face| **face != BoundaryFace::All)
                    .map(|face| face.label().to_string())
                    .collect(),
                orientation_id: fiber.orientation_id().map(str::to_string),
                principal: fiber.orientation.as_ref().map(|o| o.principal),
                secondary: fiber.orientation.as_ref().map(|o| o.secondary),
                reference: fiber.reference_orientation,
                error_degrees: fiber.orientation_error_degrees,
            })
            .collect();
        report.groups = session
            .pairing
            .groups
            .iter()
            .map(|group| GroupRecord {
                members: group.members.clone(),
                combined_nodes: group.combined_nodes.len(),
            })
            .collect();
        report.individual = session.individual.clone();
        report.unpaired = session.pairing.unpaired.clone();
        report.warnings = session
            .pairing
            .warnings
            .iter()
            .map(ToString::to_string)
            .collect();
        if let Some(comparison) = &session.comparison {
            report.warnings.extend(
                comparison
                    .skipped
                    .iter()
                    .map(|name| format!("{name}: zero magnitude orientation, not compared")),
            );
            report.comparison = Some(comparison.clone());
        }
        report
    }
}

pub fn write_report(path: impl AsRef<Path>, report: &RunReport) -> Result<()> {
    let path = path.as_ref();
    ensure_parent_dir(path)?;
    fs::write(path, serde_json::to_vec_pretty(report)?)?;
    log::info!("report written to {}", path.display());
    Ok(())
}

pub fn load_report(path: impl AsRef<Path>) -> Result<RunReport> {
    let bytes = fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Human-readable listing of buckets, groups and orientations.
pub fn debug_dump(session: &FiberSession) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "family: {}", session.model.family());
    let _ = writeln!(out, "fibers: {}", session.model.len());
    let _ = writeln!(
        out,
        "model center: {:?}, dimensions: {:?}",
        session.geometry.center(),
        session.geometry.dimensions()
    );

    let _ = writeln!(out, "\n[boundary buckets]");
    for (face, names) in session.buckets.iter() {
        let _ = writeln!(out, "{face}: {}", names.join(", "));
    }

    let _ = writeln!(out, "\n[groups]");
    for group in &session.pairing.groups {
        let _ = writeln!(
            out,
            "{} ({} combined nodes)",
            group.members.join(" + "),
            group.combined_nodes.len()
        );
    }
    for name in &session.pairing.unpaired {
        let _ = writeln!(out, "{name} (unpaired)");
    }

    let _ = writeln!(out, "\n[individual fibers]");
    for name in &session.individual {
        let _ = writeln!(out, "{name}");
    }

    let _ = writeln!(out, "\n[orientations]");
    for (name, orientation) in session.orientations() {
        let _ = writeln!(
            out,
            "{name}: {} principal {:?} secondary {:?}",
            orientation.id, orientation.principal, orientation.secondary
        );
    }

    if !session.pairing.warnings.is_empty() {
        let _ = writeln!(out, "\n[warnings]");
        for warning in &session.pairing.warnings {
            let _ = writeln!(out, "{warning}");
        }
    }
    out
}

pub fn write_debug_dump(path: impl AsRef<Path>, session: &FiberSession) -> Result<()> {
    let path = path.as_ref();
    ensure_parent_dir(path)?;
    fs::write(path, debug_dump(session))?;
    Ok(())
}

fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}
