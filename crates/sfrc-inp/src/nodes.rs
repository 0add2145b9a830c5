//! Coordinate lookup in the all-node table.

use std::io::{Read, Seek};

use crate::error::{InpError, Result};
use crate::index::{EntityIndex, EntityKind};
use crate::lines::LineFile;
use crate::split_fields;

/// A 3D point as read from the deck.
pub type Coord = [f64; 3];

/// Name of the all-node table written by the mesh generator.
pub const ALL_NODES: &str = "ALL_NODES";

/// The contiguous node table; node `k` sits on line `header_line + k`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeTable {
    header_line: usize,
}

impl NodeTable {
    pub fn new(header_line: usize) -> Self {
        Self { header_line }
    }

    pub fn from_index(index: &EntityIndex, name: &str) -> Result<Self> {
        let entry = index.require(EntityKind::NodeTable, name)?;
        Ok(Self::new(entry.header_line))
    }

    pub fn header_line(&self) -> usize {
        self.header_line
    }

    /// Coordinates of one node.
    pub fn coordinates<R: Read + Seek>(&self, file: &mut LineFile<R>, node_id: u32) -> Result<Coord> {
        let line_no = self.header_line + node_id as usize;
        let line = file.line(line_no)?;
        let fields = split_fields(&line);

        if fields.first().and_then(|f| f.parse::<u32>().ok()) != Some(node_id) {
            return Err(InpError::IdMismatch {
                line: line_no,
                expected: node_id,
                found: fields.first().cloned().unwrap_or_default(),
            });
        }
        if fields.len() < 4 {
            return Err(InpError::Malformed {
                line: line_no,
                message: format!("expected 'id, x, y, z', got '{}'", line.trim()),
            });
        }

        let mut coord = [0.0; 3];
        for (axis, token) in fields[1..4].iter().enumerate() {
            coord[axis] = token.parse::<f64>().map_err(|_| InpError::Malformed {
                line: line_no,
                message: format!("invalid coordinate '{token}' for node {node_id}"),
            })?;
        }
        Ok(coord)
    }

    /// Coordinates of many nodes, in the order given.
    pub fn coordinates_batch<R: Read + Seek>(
        &self,
        file: &mut LineFile<R>,
        ids: &[u32],
    ) -> Result<Vec<Coord>> {
        ids.iter()
            .map(|&id| self.coordinates(file, id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    const DECK: &str = "*Heading\n*NODE, NSET=ALL_NODES\n1, 0., 0., 0.\n2, 1.5, -2., 3e-1\n3,  0.25,\t1., 2.\n*Element, type=C3D4, elset=ALL_ELEMENTS\n";

    fn setup() -> (LineFile<Cursor<Vec<u8>>>, NodeTable) {
        let mut file = LineFile::new(Cursor::new(DECK.as_bytes().to_vec())).unwrap();
        let index = EntityIndex::build(&mut file).unwrap();
        let table = NodeTable::from_index(&index, ALL_NODES).unwrap();
        (file, table)
    }

    #[test]
    fn reads_coordinates_by_id() {
        let (mut file, table) = setup();
        assert_eq!(table.header_line(), 2);
        assert_eq!(table.coordinates(&mut file, 2).unwrap(), [1.5, -2.0, 0.3]);
    }

    #[test]
    fn batch_preserves_input_order() {
        let (mut file, table) = setup();
        let coords = table.coordinates_batch(&mut file, &[3, 1]).unwrap();
        assert_eq!(coords, vec![[0.25, 1.0, 2.0], [0.0, 0.0, 0.0]]);
    }

    #[test]
    fn id_past_eof_is_a_lookup_error() {
        let (mut file, table) = setup();
        let err = table.coordinates(&mut file, 40).unwrap_err();
        assert!(matches!(err, InpError::LineOutOfRange { line: 42, .. }));
    }

    #[test]
    fn line_with_other_id_breaks_the_layout_assumption() {
        let (mut file, table) = setup();
        let err = table.coordinates(&mut file, 4).unwrap_err();
        assert!(matches!(err, InpError::IdMismatch { expected: 4, .. }));
    }
}
