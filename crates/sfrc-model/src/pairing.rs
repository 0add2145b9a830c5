//! Boundary intersection and reassembly of fibers cut by the periodic box.
//!
//! A fiber leaving the box through one face re-enters through the opposite
//! one and is meshed as a separate element set. Segments of the same fiber
//! are expected to carry consecutive numbers, the segment with the lowest
//! number being the lead of its group. Each partner is shifted back across
//! the box by the distance between the centers of the two intersection
//! patches, and the shifted clouds are merged with the lead's surface nodes.

use std::collections::BTreeMap;
use std::fmt;

use sfrc_inp::Coord;
use sfrc_inp::sets::intersect_sorted;

use crate::boundary::{BoundaryFace, BoundarySets, midpoint};
use crate::fiber::{Fiber, FiberModel, Intersection};

/// Fiber names per boundary face, in model order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Buckets {
    faces: BTreeMap<BoundaryFace, Vec<String>>,
}

impl Buckets {
    pub fn add(&mut self, face: BoundaryFace, name: &str) {
        let bucket = self.faces.entry(face).or_default();
        if !bucket.iter().any(|n| n == name) {
            bucket.push(name.to_string());
        }
    }

    pub fn get(&self, face: BoundaryFace) -> &[String] {
        self.faces.get(&face).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (BoundaryFace, &[String])> {
        self.faces.iter().map(|(face, names)| (*face, names.as_slice()))
    }

    pub fn contains(&self, face: BoundaryFace, name: &str) -> bool {
        self.get(face).iter().any(|n| n == name)
    }
}

/// Non-fatal pairing anomaly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairingWarning {
    pub lead: String,
    pub face: Option<BoundaryFace>,
    pub message: String,
}

impl fmt::Display for PairingWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.face {
            Some(face) => write!(f, "{} ({face}): {}", self.lead, self.message),
            None => write!(f, "{}: {}", self.lead, self.message),
        }
    }
}

/// Segments of one fiber and their merged surface cloud.
#[derive(Debug, Clone, PartialEq)]
pub struct FiberGroup {
    /// Lead first.
    pub members: Vec<String>,
    pub combined_nodes: Vec<Coord>,
}

impl FiberGroup {
    pub fn lead(&self) -> &str {
        &self.members[0]
    }
}

/// Outcome of grouping and merging.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pairing {
    pub groups: Vec<FiberGroup>,
    /// Boundary fibers whose run had no partner left in the model.
    pub unpaired: Vec<String>,
    pub warnings: Vec<PairingWarning>,
}

impl Pairing {
    fn warn(&mut self, lead: &str, face: Option<BoundaryFace>, message: String) {
        let warning = PairingWarning {
            lead: lead.to_string(),
            face,
            message,
        };
        log::warn!("pairing {warning}");
        self.warnings.push(warning);
    }

    pub fn is_grouped(&self, name: &str) -> bool {
        self.groups
            .iter()
            .any(|g| g.members.iter().any(|m| m == name))
    }
}

/// Record every boundary face each fiber touches and fill the buckets.
pub fn intersect(fibers: &mut [Fiber], boundaries: &BoundarySets) -> Buckets {
    let mut buckets = Buckets::default();
    for fiber in fibers.iter_mut() {
        fiber.intersections.clear();
        for face in BoundaryFace::ALL {
            let shared = intersect_sorted(&fiber.node_set, boundaries.nodes(face));
            if shared.is_empty() {
                continue;
            }
            let points: Vec<Coord> = shared.iter().filter_map(|&id| fiber.coordinate(id)).collect();
            let Some(center) = midpoint(&points) else {
                continue;
            };
            fiber.intersections.insert(
                face,
                Intersection {
                    nodes: shared,
                    center,
                },
            );
            buckets.add(face, &fiber.name);
        }
        if fiber.touches_boundary() {
            log::debug!(
                "{} touches {:?}",
                fiber.name,
                fiber.intersections.keys().map(|f| f.label()).collect::<Vec<_>>()
            );
        }
    }
    buckets
}

/// Group boundary fibers into runs of consecutive numbers and merge each run.
pub fn pair(model: &FiberModel, buckets: &Buckets) -> Pairing {
    let mut numbers: Vec<u32> = buckets
        .get(BoundaryFace::All)
        .iter()
        .filter_map(|name| model.fiber(name).map(|f| f.number))
        .collect();
    numbers.sort_unstable();

    let mut pairing = Pairing::default();
    let mut cursor = 0;
    while cursor < numbers.len() {
        let lead_name = model.name_of(numbers[cursor]);
        let Some(lead) = model.fiber(&lead_name) else {
            cursor += 1;
            continue;
        };
        let run = lead.boundary_count();
        let last = lead.number + run as u32;

        let mut members = vec![lead.name.clone()];
        for number in lead.number + 1..=last {
            let name = model.name_of(number);
            match model.fiber(&name) {
                Some(member) => {
                    if !member.touches_boundary() {
                        pairing.warn(
                            &lead.name,
                            None,
                            format!("group member {name} touches no boundary"),
                        );
                    }
                    members.push(name);
                }
                None => pairing.warn(&lead.name, None, format!("expected partner {name} is missing")),
            }
        }

        if members.len() < 2 {
            pairing.unpaired.push(lead.name.clone());
        } else {
            let combined_nodes = combine(model, lead, &members[1..], &mut pairing);
            log::debug!("group {members:?}: {} combined nodes", combined_nodes.len());
            pairing.groups.push(FiberGroup {
                members,
                combined_nodes,
            });
        }
        // Gaps and boundary-free members hold no slot in `numbers`.
        while cursor < numbers.len() && numbers[cursor] <= last {
            cursor += 1;
        }
    }

    log::info!(
        "{} fiber groups, {} unpaired boundary fibers",
        pairing.groups.len(),
        pairing.unpaired.len()
    );
    pairing
}

fn combine(model: &FiberModel, lead: &Fiber, partners: &[String], pairing: &mut Pairing) -> Vec<Coord> {
    let mut combined = lead.surface_nodes.clone();
    for (face, intersection) in &lead.intersections {
        let (Some(opposite), Some(axis)) = (face.opposite(), face.axis()) else {
            continue;
        };
        let partner = partners
            .iter()
            .filter_map(|name| model.fiber(name))
            .find_map(|f| f.intersections.get(&opposite).map(|i| (f, i)));
        let Some((partner, partner_patch)) = partner else {
            pairing.warn(
                &lead.name,
                Some(*face),
                format!("no group member touches {opposite}"),
            );
            continue;
        };
        let offset = intersection.center[axis] - partner_patch.center[axis];
        combined.extend(translate(&partner.surface_nodes, axis, offset));
    }
    dedup_points(&mut combined);
    combined
}

/// Shift every point along one axis.
pub fn translate(points: &[Coord], axis: usize, offset: f64) -> Vec<Coord> {
    points
        .iter()
        .map(|p| {
            let mut shifted = *p;
            shifted[axis] += offset;
            shifted
        })
        .collect()
}

/// Sort rows lexicographically and drop exact duplicates.
pub fn dedup_points(points: &mut Vec<Coord>) {
    points.sort_by(|a, b| {
        a[0].total_cmp(&b[0])
            .then(a[1].total_cmp(&b[1]))
            .then(a[2].total_cmp(&b[2]))
    });
    points.dedup();
}

#[cfg(test)]
mod tests {
    use sfrc_inp::ElementTopology;

    use super::*;

    fn fiber(name: &str, number: u32, points: &[(u32, Coord)]) -> Fiber {
        let mut fiber = Fiber::new(name, number);
        fiber.node_set = points.iter().map(|(id, _)| *id).collect();
        fiber.nodes = points.iter().map(|(_, p)| *p).collect();
        fiber.surface_node_set = fiber.node_set.clone();
        fiber.surface_nodes = fiber.nodes.clone();
        fiber
    }

    /// `Fiber_0` leaves through x = 4, `Fiber_1` re-enters at x = 0.
    fn split_model() -> (FiberModel, BoundarySets) {
        let lead = fiber(
            "Fiber_0",
            0,
            &[(1, [3.0, 1.0, 1.0]), (2, [4.0, 1.0, 1.0]), (3, [4.0, 1.2, 1.0])],
        );
        let partner = fiber(
            "Fiber_1",
            1,
            &[(4, [0.0, 1.0, 1.0]), (5, [0.0, 1.2, 1.0]), (6, [1.0, 1.1, 1.0])],
        );
        let inside = fiber("Fiber_2", 2, &[(7, [2.0, 2.0, 2.0]), (8, [2.5, 2.0, 2.0])]);
        let model =
            FiberModel::from_fibers("Fiber", ElementTopology::Tet4, [lead, partner, inside]);
        let boundaries = BoundarySets::from_faces([
            (BoundaryFace::XSup, vec![2, 3]),
            (BoundaryFace::XInf, vec![4, 5]),
        ]);
        (model, boundaries)
    }

    #[test]
    fn buckets_mirror_the_intersections() {
        let (mut model, boundaries) = split_model();
        let buckets = intersect(model.fibers_mut(), &boundaries);

        for fiber in model.fibers() {
            for face in BoundaryFace::ALL {
                assert_eq!(
                    fiber.intersections.contains_key(&face),
                    buckets.contains(face, &fiber.name),
                    "{} / {face}",
                    fiber.name
                );
            }
        }
        assert_eq!(buckets.get(BoundaryFace::All), &["Fiber_0", "Fiber_1"]);
        let lead = model.fiber("Fiber_0").unwrap();
        assert_eq!(lead.boundary_count(), 1);
        assert_eq!(lead.intersections[&BoundaryFace::XSup].center, [4.0, 1.1, 1.0]);
    }

    #[test]
    fn split_fiber_is_reassembled_across_x() {
        let (mut model, boundaries) = split_model();
        let buckets = intersect(model.fibers_mut(), &boundaries);
        let pairing = pair(&model, &buckets);

        assert!(pairing.warnings.is_empty());
        assert_eq!(pairing.groups.len(), 1);
        let group = &pairing.groups[0];
        assert_eq!(group.members, vec!["Fiber_0", "Fiber_1"]);
        assert_eq!(group.lead(), "Fiber_0");
        // Partner shifted by +4 along x; its two patch nodes coincide with the lead's.
        assert_eq!(
            group.combined_nodes,
            vec![[3.0, 1.0, 1.0], [4.0, 1.0, 1.0], [4.0, 1.2, 1.0], [5.0, 1.1, 1.0]]
        );
        assert!(!pairing.is_grouped("Fiber_2"));
    }

    #[test]
    fn missing_partner_is_a_warning() {
        let (model, boundaries) = split_model();
        let lead = model.fiber("Fiber_0").unwrap().clone();
        let mut model = FiberModel::from_fibers("Fiber", ElementTopology::Tet4, [lead]);
        let buckets = intersect(model.fibers_mut(), &boundaries);
        let pairing = pair(&model, &buckets);

        assert!(pairing.groups.is_empty());
        assert_eq!(pairing.unpaired, vec!["Fiber_0"]);
        assert_eq!(pairing.warnings.len(), 1);
        assert!(pairing.warnings[0].message.contains("Fiber_1"));
    }

    #[test]
    fn numbering_gap_does_not_swallow_the_next_boundary_fiber() {
        let lead = fiber("Fiber_0", 0, &[(1, [3.0, 1.0, 1.0]), (2, [4.0, 1.0, 1.0])]);
        let entering = fiber("Fiber_2", 2, &[(3, [0.0, 2.0, 2.0]), (4, [1.0, 2.0, 2.0])]);
        let leaving = fiber("Fiber_3", 3, &[(5, [3.0, 2.0, 2.0]), (6, [4.0, 2.0, 2.0])]);
        let mut model =
            FiberModel::from_fibers("Fiber", ElementTopology::Tet4, [lead, entering, leaving]);
        let boundaries = BoundarySets::from_faces([
            (BoundaryFace::XSup, vec![2, 6]),
            (BoundaryFace::XInf, vec![3]),
        ]);
        let buckets = intersect(model.fibers_mut(), &boundaries);
        let pairing = pair(&model, &buckets);

        assert_eq!(pairing.unpaired, vec!["Fiber_0"]);
        assert_eq!(pairing.groups.len(), 1);
        assert_eq!(pairing.groups[0].members, vec!["Fiber_2", "Fiber_3"]);
        assert_eq!(pairing.warnings.len(), 1);
        assert!(pairing.warnings[0].message.contains("Fiber_1"));
        for f in model.fibers() {
            assert!(pairing.is_grouped(&f.name) || pairing.unpaired.contains(&f.name));
        }
    }

    #[test]
    fn boundary_free_member_is_grouped_with_a_warning() {
        let lead = fiber("Fiber_0", 0, &[(1, [3.0, 1.0, 1.0]), (2, [4.0, 1.0, 1.0])]);
        let stray = fiber("Fiber_1", 1, &[(3, [2.0, 2.0, 2.0]), (4, [2.5, 2.0, 2.0])]);
        let next = fiber("Fiber_2", 2, &[(5, [0.0, 3.0, 3.0]), (6, [1.0, 3.0, 3.0])]);
        let mut model = FiberModel::from_fibers("Fiber", ElementTopology::Tet4, [lead, stray, next]);
        let boundaries = BoundarySets::from_faces([
            (BoundaryFace::XSup, vec![2]),
            (BoundaryFace::XInf, vec![5]),
        ]);
        let buckets = intersect(model.fibers_mut(), &boundaries);
        let pairing = pair(&model, &buckets);

        assert_eq!(pairing.groups[0].members, vec!["Fiber_0", "Fiber_1"]);
        assert!(
            pairing
                .warnings
                .iter()
                .any(|w| w.lead == "Fiber_0" && w.message.contains("group member Fiber_1 touches no boundary"))
        );
        // Fiber_2 still gets a turn as a lead.
        assert_eq!(pairing.unpaired, vec!["Fiber_2"]);
    }

    #[test]
    fn lead_on_the_reference_face_pulls_its_partner_back() {
        let lead = fiber(
            "Fiber_0",
            0,
            &[(1, [0.0, 1.0, 1.0]), (2, [0.0, 1.2, 1.0]), (3, [1.0, 1.1, 1.0])],
        );
        let partner = fiber(
            "Fiber_1",
            1,
            &[(4, [3.0, 1.0, 1.0]), (5, [4.0, 1.0, 1.0]), (6, [4.0, 1.2, 1.0])],
        );
        let mut model = FiberModel::from_fibers("Fiber", ElementTopology::Tet4, [lead, partner]);
        let boundaries = BoundarySets::from_faces([
            (BoundaryFace::XInf, vec![1, 2]),
            (BoundaryFace::XSup, vec![5, 6]),
        ]);
        let buckets = intersect(model.fibers_mut(), &boundaries);
        let pairing = pair(&model, &buckets);

        assert!(pairing.warnings.is_empty());
        let group = &pairing.groups[0];
        assert_eq!(group.lead(), "Fiber_0");
        // Partner shifted by -4 along x.
        assert_eq!(
            group.combined_nodes,
            vec![[-1.0, 1.0, 1.0], [0.0, 1.0, 1.0], [0.0, 1.2, 1.0], [1.0, 1.1, 1.0]]
        );
    }

    #[test]
    fn translation_by_zero_is_identity() {
        let points = vec![[1.0, 2.0, 3.0], [-1.0, 0.5, 0.0]];
        assert_eq!(translate(&points, 1, 0.0), points);
        let there = translate(&points, 2, 2.5);
        assert_eq!(translate(&there, 2, -2.5), points);
    }

    #[test]
    fn dedup_sorts_rows_lexicographically() {
        let mut points = vec![[1.0, 0.0, 0.0], [0.0, 2.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 5.0]];
        dedup_points(&mut points);
        assert_eq!(points, vec![[0.0, 1.0, 5.0], [0.0, 2.0, 0.0], [1.0, 0.0, 0.0]]);
    }
}
