//! Per-fiber element, node and surface data assembled from a deck.

use std::collections::{BTreeMap, HashMap};
use std::io::{Read, Seek};

use sfrc_inp::sets::union_into;
use sfrc_inp::{Coord, ElementTopology, EntityIndex, EntityKind, InpError, InpFile, split_fields};
use sfrc_orient::Orientation;

use crate::boundary::BoundaryFace;
use crate::error::{ModelError, Result};

/// Where a fiber meets one boundary face.
#[derive(Debug, Clone, PartialEq)]
pub struct Intersection {
    pub nodes: Vec<u32>,
    /// Per-axis midpoint of the shared nodes' extents.
    pub center: Coord,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fiber {
    pub name: String,
    /// Numeric suffix of `<family>_<n>`.
    pub number: u32,
    pub element_set: Vec<u32>,
    pub surface_element_faces: Vec<(u32, String)>,
    pub node_set: Vec<u32>,
    pub surface_node_set: Vec<u32>,
    /// Coordinates aligned with `node_set`.
    pub nodes: Vec<Coord>,
    /// Coordinates aligned with `surface_node_set`.
    pub surface_nodes: Vec<Coord>,
    pub intersections: BTreeMap<BoundaryFace, Intersection>,
    pub orientation: Option<Orientation>,
    pub reference_orientation: Option<[f64; 3]>,
    pub orientation_error_degrees: Option<f64>,
}

impl Fiber {
    pub fn new(name: impl Into<String>, number: u32) -> Self {
        Self {
            name: name.into(),
            number,
            element_set: Vec::new(),
            surface_element_faces: Vec::new(),
            node_set: Vec::new(),
            surface_node_set: Vec::new(),
            nodes: Vec::new(),
            surface_nodes: Vec::new(),
            intersections: BTreeMap::new(),
            orientation: None,
            reference_orientation: None,
            orientation_error_degrees: None,
        }
    }

    pub fn orientation_id(&self) -> Option<&str> {
        self.orientation.as_ref().map(|o| o.id.as_str())
    }

    /// Coordinates of a node of this fiber.
    pub fn coordinate(&self, node_id: u32) -> Option<Coord> {
        self.node_set
            .binary_search(&node_id)
            .ok()
            .and_then(|idx| self.nodes.get(idx).copied())
    }

    /// Geometric faces touched, not counting the aggregate.
    pub fn boundary_count(&self) -> usize {
        self.intersections
            .keys()
            .filter(|face| **face != BoundaryFace::All)
            .count()
    }

    pub fn touches_boundary(&self) -> bool {
        !self.intersections.is_empty()
    }
}

/// Surface name bounding a fiber.
pub fn surface_name(fiber: &str) -> String {
    format!("Surf-{fiber}")
}

/// Numeric suffix of `<family>_<n>`, or `None` for any other name.
pub fn fiber_number(family: &str, name: &str) -> Option<u32> {
    let suffix = name.strip_prefix(family)?.strip_prefix('_')?;
    if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    suffix.parse().ok()
}

/// The first candidate with an elset named after it or prefixed `<candidate>_`.
pub fn detect_family<S: AsRef<str>>(index: &EntityIndex, candidates: &[S]) -> Result<String> {
    for candidate in candidates {
        let candidate = candidate.as_ref();
        let prefix = format!("{candidate}_");
        if index
            .names(EntityKind::ElementSet)
            .any(|name| name == candidate || name.starts_with(&prefix))
        {
            log::info!("fiber family '{candidate}'");
            return Ok(candidate.to_string());
        }
    }
    let tried: Vec<&str> = candidates.iter().map(AsRef::as_ref).collect();
    Err(ModelError::Config(format!(
        "no element set matches any fiber family in {tried:?}"
    )))
}

/// Reference axis recorded for a fiber through its solid section.
pub fn reference_orientation<R: Read + Seek>(
    deck: &mut InpFile<R>,
    fiber: &str,
) -> Result<Option<[f64; 3]>> {
    let Some(section) = deck.index().get(EntityKind::SolidSection, fiber) else {
        return Ok(None);
    };
    let Some(orientation) = section.parameter("orientation").map(str::to_string) else {
        return Ok(None);
    };

    let Some((line_no, line)) = deck
        .block(EntityKind::Orientation, &orientation)?
        .into_iter()
        .next()
    else {
        return Err(ModelError::Malformed {
            line: deck.index().require(EntityKind::Orientation, &orientation)?.start_line,
            message: format!("orientation '{orientation}' has no data line"),
        });
    };

    let values = split_fields(&line)
        .iter()
        .filter(|token| !token.is_empty())
        .map(|token| token.parse::<f64>())
        .collect::<std::result::Result<Vec<f64>, _>>()
        .map_err(|err| ModelError::Malformed {
            line: line_no,
            message: format!("orientation '{orientation}': {err}"),
        })?;
    if values.len() < 3 {
        return Err(ModelError::Malformed {
            line: line_no,
            message: format!("orientation '{orientation}' needs at least 3 values"),
        });
    }
    Ok(Some([values[0], values[1], values[2]]))
}

/// All fibers of one family, in deck order.
#[derive(Debug, Clone, PartialEq)]
pub struct FiberModel {
    family: String,
    topology: ElementTopology,
    fibers: Vec<Fiber>,
    by_name: HashMap<String, usize>,
}

impl FiberModel {
    /// Discover and materialize every `<family>_<n>` element set.
    pub fn build<R: Read + Seek>(deck: &mut InpFile<R>, family: &str) -> Result<Self> {
        let elements = deck.element_table().map_err(|err| match err {
            InpError::UnsupportedElement(kind) => {
                ModelError::Config(format!("unsupported element type '{kind}'"))
            }
            other => other.into(),
        })?;
        let nodes = deck.node_table()?;

        let discovered: Vec<(String, u32)> = deck
            .index()
            .names(EntityKind::ElementSet)
            .filter_map(|name| fiber_number(family, name).map(|n| (name.to_string(), n)))
            .collect();
        log::info!("{} fibers in family '{family}'", discovered.len());

        let mut model = Self {
            family: family.to_string(),
            topology: elements.topology(),
            fibers: Vec::with_capacity(discovered.len()),
            by_name: HashMap::with_capacity(discovered.len()),
        };

        for (name, number) in discovered {
            let mut fiber = Fiber::new(&name, number);
            fiber.element_set = deck.resolve(EntityKind::ElementSet, &name)?;

            for (line_no, line) in deck.block(EntityKind::Surface, &surface_name(&name))? {
                let fields = split_fields(&line);
                let (Some(subset), Some(label)) = (fields.first(), fields.get(1)) else {
                    return Err(ModelError::Malformed {
                        line: line_no,
                        message: format!("expected 'elset, face', got '{}'", line.trim()),
                    });
                };
                for element in deck.resolve(EntityKind::ElementSet, subset)? {
                    fiber.surface_element_faces.push((element, label.clone()));
                }
            }

            let mut volume = Vec::new();
            for &element in &fiber.element_set {
                volume.extend(elements.connectivity(deck.lines(), element)?);
            }
            union_into(&mut fiber.node_set, volume);

            let mut surface = Vec::new();
            for (element, label) in &fiber.surface_element_faces {
                let connectivity = elements.connectivity(deck.lines(), *element)?;
                surface.extend(elements.topology().face_nodes(&connectivity, label)?);
            }
            union_into(&mut fiber.surface_node_set, surface);

            fiber.nodes = nodes.coordinates_batch(deck.lines(), &fiber.node_set)?;
            fiber.surface_nodes = nodes.coordinates_batch(deck.lines(), &fiber.surface_node_set)?;
            log::debug!(
                "{name}: {} elements, {} nodes, {} surface nodes",
                fiber.element_set.len(),
                fiber.node_set.len(),
                fiber.surface_node_set.len()
            );
            model.insert(fiber);
        }

        Ok(model)
    }

    /// Assemble a model from fibers built elsewhere.
    pub fn from_fibers(
        family: impl Into<String>,
        topology: ElementTopology,
        fibers: impl IntoIterator<Item = Fiber>,
    ) -> Self {
        let mut model = Self {
            family: family.into(),
            topology,
            fibers: Vec::new(),
            by_name: HashMap::new(),
        };
        for fiber in fibers {
            model.insert(fiber);
        }
        model
    }

    fn insert(&mut self, fiber: Fiber) {
        if let Some(&idx) = self.by_name.get(&fiber.name) {
            self.fibers[idx] = fiber;
        } else {
            self.by_name.insert(fiber.name.clone(), self.fibers.len());
            self.fibers.push(fiber);
        }
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn topology(&self) -> ElementTopology {
        self.topology
    }

    pub fn fibers(&self) -> &[Fiber] {
        &self.fibers
    }

    pub fn fibers_mut(&mut self) -> &mut [Fiber] {
        &mut self.fibers
    }

    pub fn fiber(&self, name: &str) -> Option<&Fiber> {
        self.by_name.get(name).map(|&idx| &self.fibers[idx])
    }

    pub fn fiber_mut(&mut self, name: &str) -> Option<&mut Fiber> {
        self.by_name.get(name).map(|&idx| &mut self.fibers[idx])
    }

    /// Name `<family>_<number>`.
    pub fn name_of(&self, number: u32) -> String {
        format!("{}_{number}", self.family)
    }

    pub fn len(&self) -> usize {
        self.fibers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fibers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fiber_numbers_need_a_plain_numeric_suffix() {
        assert_eq!(fiber_number("Fiber", "Fiber_12"), Some(12));
        assert_eq!(fiber_number("Glass_Fiber", "Glass_Fiber_0"), Some(0));
        assert_eq!(fiber_number("Fiber", "Fiber_0_S1"), None);
        assert_eq!(fiber_number("Fiber", "Fiber"), None);
        assert_eq!(fiber_number("Fiber", "Fibers_1"), None);
    }

    #[test]
    fn family_detection_takes_the_first_matching_candidate() {
        let deck = InpFile::parse_str(
            "*Elset, elset=Matrix\n1\n*Elset, elset=Glass_3\n2\n*Elset, elset=Fiber_0\n3\n",
        )
        .unwrap();
        let index = deck.index();
        assert_eq!(detect_family(index, &["Inclusion", "Fiber", "Glass"]).unwrap(), "Fiber");
        assert_eq!(detect_family(index, &["Matrix"]).unwrap(), "Matrix");
        assert!(matches!(
            detect_family(index, &["Inclusion"]),
            Err(ModelError::Config(_))
        ));
    }

    #[test]
    fn coordinate_lookup_uses_the_sorted_node_set() {
        let mut fiber = Fiber::new("Fiber_0", 0);
        fiber.node_set = vec![2, 5, 9];
        fiber.nodes = vec![[0.0; 3], [1.0, 2.0, 3.0], [4.0; 3]];
        assert_eq!(fiber.coordinate(5), Some([1.0, 2.0, 3.0]));
        assert_eq!(fiber.coordinate(4), None);
    }
}
