//! Fiber geometry of short-fiber composite decks.
//!
//! Builds per-fiber element, node and surface data from an indexed deck,
//! finds where fibers cross the periodic bounding box, reassembles split
//! fibers and runs orientation estimation over the result.

pub mod boundary;
pub mod error;
pub mod fiber;
pub mod pairing;
pub mod session;

pub use boundary::{BoundaryFace, BoundarySets, BoundingGeometry};
pub use error::{ModelError, Result};
pub use fiber::{Fiber, FiberModel, Intersection, detect_family, reference_orientation};
pub use pairing::{Buckets, FiberGroup, Pairing, PairingWarning};
pub use session::{FiberSession, SessionOptions};
