//! The six periodic bounding faces and the model extents derived from them.

use std::fmt;
use std::io::{Read, Seek};

use sfrc_inp::sets::union_into;
use sfrc_inp::{Coord, EntityKind, InpFile};

use crate::error::{ModelError, Result};

/// A named boundary node set of the periodic box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BoundaryFace {
    XInf,
    YInf,
    ZInf,
    XSup,
    YSup,
    ZSup,
    /// Union of the six faces.
    All,
}

impl BoundaryFace {
    /// The six geometric faces, reference faces first.
    pub const FACES: [BoundaryFace; 6] = [
        BoundaryFace::XInf,
        BoundaryFace::YInf,
        BoundaryFace::ZInf,
        BoundaryFace::XSup,
        BoundaryFace::YSup,
        BoundaryFace::ZSup,
    ];

    /// Faces plus the aggregate.
    pub const ALL: [BoundaryFace; 7] = [
        BoundaryFace::XInf,
        BoundaryFace::YInf,
        BoundaryFace::ZInf,
        BoundaryFace::XSup,
        BoundaryFace::YSup,
        BoundaryFace::ZSup,
        BoundaryFace::All,
    ];

    /// Node set name in the deck.
    pub fn label(self) -> &'static str {
        match self {
            BoundaryFace::XInf => "xinfall",
            BoundaryFace::YInf => "yinfall",
            BoundaryFace::ZInf => "zinfall",
            BoundaryFace::XSup => "xsupall",
            BoundaryFace::YSup => "ysupall",
            BoundaryFace::ZSup => "zsupall",
            BoundaryFace::All => "all",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|face| face.label().eq_ignore_ascii_case(label))
    }

    /// The face across the box. `All` has none.
    pub fn opposite(self) -> Option<Self> {
        match self {
            BoundaryFace::XInf => Some(BoundaryFace::XSup),
            BoundaryFace::YInf => Some(BoundaryFace::YSup),
            BoundaryFace::ZInf => Some(BoundaryFace::ZSup),
            BoundaryFace::XSup => Some(BoundaryFace::XInf),
            BoundaryFace::YSup => Some(BoundaryFace::YInf),
            BoundaryFace::ZSup => Some(BoundaryFace::ZInf),
            BoundaryFace::All => None,
        }
    }

    /// Coordinate axis normal to the face.
    pub fn axis(self) -> Option<usize> {
        match self {
            BoundaryFace::XInf | BoundaryFace::XSup => Some(0),
            BoundaryFace::YInf | BoundaryFace::YSup => Some(1),
            BoundaryFace::ZInf | BoundaryFace::ZSup => Some(2),
            BoundaryFace::All => None,
        }
    }

    pub fn is_reference(self) -> bool {
        matches!(
            self,
            BoundaryFace::XInf | BoundaryFace::YInf | BoundaryFace::ZInf
        )
    }
}

impl fmt::Display for BoundaryFace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Resolved node sets of every boundary face.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoundarySets {
    sets: [Vec<u32>; 7],
}

impl BoundarySets {
    /// Resolve the six face node sets and build their union.
    pub fn load<R: Read + Seek>(deck: &mut InpFile<R>) -> Result<Self> {
        let mut sets: [Vec<u32>; 7] = Default::default();
        let mut all = Vec::new();
        for face in BoundaryFace::FACES {
            let ids = deck.resolve(EntityKind::NodeSet, face.label())?;
            log::debug!("boundary {face}: {} nodes", ids.len());
            union_into(&mut all, ids.iter().copied());
            sets[face as usize] = ids;
        }
        sets[BoundaryFace::All as usize] = all;
        Ok(Self { sets })
    }

    /// Build from already resolved face sets.
    pub fn from_faces(faces: impl IntoIterator<Item = (BoundaryFace, Vec<u32>)>) -> Self {
        let mut sets: [Vec<u32>; 7] = Default::default();
        for (face, mut ids) in faces {
            if face == BoundaryFace::All {
                continue;
            }
            ids.sort_unstable();
            ids.dedup();
            sets[face as usize] = ids;
        }
        let mut all = Vec::new();
        for face in BoundaryFace::FACES {
            union_into(&mut all, sets[face as usize].iter().copied());
        }
        sets[BoundaryFace::All as usize] = all;
        Self { sets }
    }

    pub fn nodes(&self, face: BoundaryFace) -> &[u32] {
        &self.sets[face as usize]
    }
}

/// Center and extents of the model, taken from the boundary nodes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingGeometry {
    pub min: Coord,
    pub max: Coord,
}

impl BoundingGeometry {
    pub fn from_points(points: &[Coord]) -> Result<Self> {
        let (min, max) = extents(points)
            .ok_or_else(|| ModelError::Config("no boundary nodes to size the model".into()))?;
        Ok(Self { min, max })
    }

    pub fn load<R: Read + Seek>(deck: &mut InpFile<R>, boundaries: &BoundarySets) -> Result<Self> {
        let table = deck.node_table()?;
        let coords = table.coordinates_batch(deck.lines(), boundaries.nodes(BoundaryFace::All))?;
        let geometry = Self::from_points(&coords)?;
        log::debug!(
            "model center {:?}, dimensions {:?}",
            geometry.center(),
            geometry.dimensions()
        );
        Ok(geometry)
    }

    pub fn center(&self) -> Coord {
        std::array::from_fn(|axis| (self.min[axis] + self.max[axis]) / 2.0)
    }

    pub fn dimensions(&self) -> Coord {
        std::array::from_fn(|axis| self.max[axis] - self.min[axis])
    }
}

/// Per-axis minimum and maximum of a point cloud.
pub fn extents(points: &[Coord]) -> Option<(Coord, Coord)> {
    let first = *points.first()?;
    Some(points.iter().fold((first, first), |(mut lo, mut hi), p| {
        for axis in 0..3 {
            lo[axis] = lo[axis].min(p[axis]);
            hi[axis] = hi[axis].max(p[axis]);
        }
        (lo, hi)
    }))
}

/// Per-axis midpoint of the extents.
pub fn midpoint(points: &[Coord]) -> Option<Coord> {
    let (lo, hi) = extents(points)?;
    Some(std::array::from_fn(|axis| (lo[axis] + hi[axis]) / 2.0))
}
