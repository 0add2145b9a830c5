//! Element connectivity lookup in the all-element table.

use std::io::{Read, Seek};

use crate::error::{InpError, Result};
use crate::index::{EntityIndex, EntityKind};
use crate::lines::LineFile;
use crate::sets::parse_ids;

/// Name of the all-element table written by the mesh generator.
pub const ALL_ELEMENTS: &str = "ALL_ELEMENTS";

/// Element topologies with a known face-to-node mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementTopology {
    /// 4-node tetrahedron (C3D4, DC3D4)
    Tet4,
}

impl ElementTopology {
    /// Parse from the `type=` header parameter.
    pub fn from_abaqus_type(type_str: &str) -> Option<Self> {
        match type_str.to_ascii_uppercase().as_str() {
            "C3D4" | "DC3D4" => Some(ElementTopology::Tet4),
            _ => None,
        }
    }

    pub fn num_nodes(&self) -> usize {
        match self {
            ElementTopology::Tet4 => 4,
        }
    }

    /// Local node index left out by face `S<face>`.
    fn excluded_local_node(&self, face: u8) -> Option<usize> {
        match (self, face) {
            (ElementTopology::Tet4, 1) => Some(3),
            (ElementTopology::Tet4, 2) => Some(2),
            (ElementTopology::Tet4, 3) => Some(0),
            (ElementTopology::Tet4, 4) => Some(1),
            _ => None,
        }
    }

    /// Nodes of the face named by `label` (e.g. `S3`), in connectivity order.
    pub fn face_nodes(&self, connectivity: &[u32], label: &str) -> Result<Vec<u32>> {
        let excluded = label
            .trim()
            .strip_prefix(['S', 's'])
            .and_then(|n| n.parse::<u8>().ok())
            .and_then(|face| self.excluded_local_node(face))
            .ok_or_else(|| InpError::InvalidFace(label.to_string()))?;

        Ok(connectivity
            .iter()
            .enumerate()
            .filter(|(local, _)| *local != excluded)
            .map(|(_, node)| *node)
            .collect())
    }
}

/// The contiguous element table; element `k` sits on line `header_line + k`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementTable {
    header_line: usize,
    topology: ElementTopology,
}

impl ElementTable {
    pub fn new(header_line: usize, topology: ElementTopology) -> Self {
        Self {
            header_line,
            topology,
        }
    }

    /// Look the table up and check its element type is supported.
    pub fn from_index(index: &EntityIndex, name: &str) -> Result<Self> {
        let entry = index.require(EntityKind::ElementTable, name)?;
        let type_str = entry.parameter("type").unwrap_or_default();
        let topology = ElementTopology::from_abaqus_type(type_str)
            .ok_or_else(|| InpError::UnsupportedElement(type_str.to_string()))?;
        Ok(Self::new(entry.header_line, topology))
    }

    pub fn topology(&self) -> ElementTopology {
        self.topology
    }

    /// Node ids of one element.
    pub fn connectivity<R: Read + Seek>(
        &self,
        file: &mut LineFile<R>,
        element_id: u32,
    ) -> Result<Vec<u32>> {
        let line_no = self.header_line + element_id as usize;
        let line = file.line(line_no)?;
        let ids = parse_ids(&line, line_no)?;

        match ids.split_first() {
            Some((&id, nodes)) if id == element_id => {
                if nodes.len() != self.topology.num_nodes() {
                    return Err(InpError::Malformed {
                        line: line_no,
                        message: format!(
                            "element {element_id} has {} nodes, expected {}",
                            nodes.len(),
                            self.topology.num_nodes()
                        ),
                    });
                }
                Ok(nodes.to_vec())
            }
            Some((&id, _)) => Err(InpError::IdMismatch {
                line: line_no,
                expected: element_id,
                found: id.to_string(),
            }),
            None => Err(InpError::Malformed {
                line: line_no,
                message: "empty element line".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn tet_faces_drop_one_local_node() {
        let tet = ElementTopology::Tet4;
        let conn = [10, 20, 30, 40];
        assert_eq!(tet.face_nodes(&conn, "S1").unwrap(), vec![10, 20, 30]);
        assert_eq!(tet.face_nodes(&conn, "S2").unwrap(), vec![10, 20, 40]);
        assert_eq!(tet.face_nodes(&conn, "S3").unwrap(), vec![20, 30, 40]);
        assert_eq!(tet.face_nodes(&conn, "S4").unwrap(), vec![10, 30, 40]);
    }

    #[test]
    fn unknown_face_label_is_rejected() {
        let err = ElementTopology::Tet4.face_nodes(&[1, 2, 3, 4], "S5").unwrap_err();
        assert!(matches!(err, InpError::InvalidFace(_)));
    }

    #[test]
    fn parses_supported_types() {
        assert_eq!(ElementTopology::from_abaqus_type("dc3d4"), Some(ElementTopology::Tet4));
        assert_eq!(ElementTopology::from_abaqus_type("C3D10"), None);
    }

    #[test]
    fn reads_connectivity_and_rejects_unsupported_tables() {
        let src = "*Element, type=DC3D4, elset=ALL_ELEMENTS\n1, 1, 2, 3, 4\n2, 2, 3, 4, 5\n*Element, type=C3D8, elset=BRICKS\n1, 1, 2, 3, 4, 5, 6, 7, 8\n";
        let mut file = LineFile::new(Cursor::new(src.as_bytes().to_vec())).unwrap();
        let index = EntityIndex::build(&mut file).unwrap();

        let table = ElementTable::from_index(&index, ALL_ELEMENTS).unwrap();
        assert_eq!(table.connectivity(&mut file, 2).unwrap(), vec![2, 3, 4, 5]);

        let err = ElementTable::from_index(&index, "BRICKS").unwrap_err();
        assert!(matches!(err, InpError::UnsupportedElement(t) if t == "C3D8"));
    }
}
