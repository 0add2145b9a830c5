//! One end-to-end orientation run over a deck.

use std::io::{Read, Seek};

use sfrc_inp::{Coord, InpFile};
use sfrc_orient::{ComparisonReport, Orientation, OrientationIds, compare, estimate_many};

use crate::boundary::{BoundarySets, BoundingGeometry};
use crate::error::Result;
use crate::fiber::{FiberModel, detect_family, reference_orientation};
use crate::pairing::{Buckets, Pairing, intersect, pair};

/// Knobs for [`FiberSession::run`].
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    /// Fiber family names to try, in order.
    pub family_candidates: Vec<String>,
    /// Read reference orientations and compare them with the estimates.
    pub compare: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            family_candidates: vec!["Fiber".to_string()],
            compare: true,
        }
    }
}

/// Results of a run; owns every fiber and group.
#[derive(Debug, Clone)]
pub struct FiberSession {
    pub model: FiberModel,
    pub geometry: BoundingGeometry,
    pub buckets: Buckets,
    pub pairing: Pairing,
    /// Fibers estimated from their own surface cloud.
    pub individual: Vec<String>,
    pub comparison: Option<ComparisonReport>,
    pub orientations_issued: u32,
    /// Fibers that ended up without an orientation.
    pub unoriented: Vec<String>,
}

impl FiberSession {
    pub fn run<R: Read + Seek>(deck: &mut InpFile<R>, options: &SessionOptions) -> Result<Self> {
        let family = detect_family(deck.index(), &options.family_candidates)?;
        let mut model = FiberModel::build(deck, &family)?;

        let boundaries = BoundarySets::load(deck)?;
        let geometry = BoundingGeometry::load(deck, &boundaries)?;

        let buckets = intersect(model.fibers_mut(), &boundaries);
        let pairing = pair(&model, &buckets);
        let individual: Vec<String> = model
            .fibers()
            .iter()
            .filter(|f| !f.touches_boundary() && !pairing.is_grouped(&f.name))
            .map(|f| f.name.clone())
            .collect();
        log::info!(
            "{} individual fibers, {} groups",
            individual.len(),
            pairing.groups.len()
        );

        let mut ids = OrientationIds::new(&family);
        assign_orientations(&mut model, &individual, &pairing, &mut ids)?;
        let unoriented: Vec<String> = model
            .fibers()
            .iter()
            .filter(|f| f.orientation.is_none())
            .map(|f| f.name.clone())
            .collect();
        for name in &unoriented {
            log::warn!("{name} received no orientation");
        }

        let comparison = if options.compare {
            for name in model.fibers().iter().map(|f| f.name.clone()).collect::<Vec<_>>() {
                let reference = reference_orientation(deck, &name)?;
                if let Some(fiber) = model.fiber_mut(&name) {
                    fiber.reference_orientation = reference;
                }
            }
            Some(compare_with_reference(&mut model))
        } else {
            None
        };

        Ok(Self {
            model,
            geometry,
            buckets,
            pairing,
            individual,
            comparison,
            orientations_issued: ids.issued(),
            unoriented,
        })
    }

    /// `(fiber, orientation)` for every fiber that received one, in model order.
    pub fn orientations(&self) -> impl Iterator<Item = (&str, &Orientation)> {
        self.model
            .fibers()
            .iter()
            .filter_map(|f| f.orientation.as_ref().map(|o| (f.name.as_str(), o)))
    }
}

/// Individual fibers first, then unpaired boundary fibers, then groups.
fn assign_orientations(
    model: &mut FiberModel,
    individual: &[String],
    pairing: &Pairing,
    ids: &mut OrientationIds,
) -> Result<()> {
    let mut targets: Vec<Vec<String>> = Vec::new();
    let mut clouds: Vec<&[Coord]> = Vec::new();
    for name in individual.iter().chain(&pairing.unpaired) {
        if let Some(fiber) = model.fiber(name) {
            targets.push(vec![name.clone()]);
            clouds.push(&fiber.surface_nodes);
        }
    }
    for group in &pairing.groups {
        targets.push(group.members.clone());
        clouds.push(&group.combined_nodes);
    }

    let estimates = estimate_many(&clouds, ids)?;
    for (members, orientation) in targets.into_iter().zip(estimates) {
        for name in members {
            if let Some(fiber) = model.fiber_mut(&name) {
                fiber.orientation = Some(orientation.clone());
            }
        }
    }
    Ok(())
}

fn compare_with_reference(model: &mut FiberModel) -> ComparisonReport {
    let report = compare(model.fibers().iter().filter_map(|f| {
        let estimate = f.orientation.as_ref()?;
        Some((f.name.as_str(), estimate.principal, f.reference_orientation?))
    }));
    for error in &report.errors {
        if let Some(fiber) = model.fiber_mut(&error.name) {
            fiber.orientation_error_degrees = Some(error.degrees);
        }
    }
    report
}
