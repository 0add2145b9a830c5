//! Lookups through a deck opened from disk.

use std::fs;

use sfrc_inp::{ElementTopology, EntityKind, InpError, InpFile};

const DECK: &str = "*Heading
*Part, name=Coupon
*Node, nset=ALL_NODES
1, 0., 0., 0.
2, 1., 0., 0.
3, 0., 1., 0.
4, 0., 0., 1.
5, 1., 1., 1.
*Element, type=C3D4, elset=ALL_ELEMENTS
1, 1, 2, 3, 4
2, 2, 3, 4, 5
*Nset, nset=xinfall, generate
1, 9, 4
*Nset, nset=corners
5, 1,
  4, 1
3
*Elset, elset=Fiber_0
1, 2
*Elset, elset=Fiber_0_S3
2
*Surface, type=ELEMENT, name=Surf-Fiber_0
Fiber_0_S3, S3
*End Part
";

/// The deck is opened from a fresh temp dir that lives as long as the guard.
fn open_deck() -> (tempfile::TempDir, InpFile<fs::File>) {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("coupon.inp");
    fs::write(&path, DECK).expect("write deck");
    let deck = InpFile::open(&path).expect("deck should open");
    (dir, deck)
}

#[test]
fn generated_set_stops_at_last() {
    let (_dir, mut deck) = open_deck();
    assert_eq!(deck.resolve(EntityKind::NodeSet, "xinfall").unwrap(), vec![1, 5, 9]);
}

#[test]
fn explicit_set_spans_lines_and_is_sorted_unique() {
    let (_dir, mut deck) = open_deck();
    assert_eq!(deck.resolve(EntityKind::NodeSet, "corners").unwrap(), vec![1, 3, 4, 5]);
}

#[test]
fn surface_faces_restrict_connectivity() {
    let (_dir, mut deck) = open_deck();
    let elements = deck.element_table().unwrap();
    assert_eq!(elements.topology(), ElementTopology::Tet4);

    let body = deck.block(EntityKind::Surface, "Surf-Fiber_0").unwrap();
    assert_eq!(body.len(), 1);
    let conn = elements.connectivity(deck.lines(), 2).unwrap();
    assert_eq!(conn, vec![2, 3, 4, 5]);
    assert_eq!(elements.topology().face_nodes(&conn, "S3").unwrap(), vec![3, 4, 5]);
}

#[test]
fn coordinates_come_from_the_node_table() {
    let (_dir, mut deck) = open_deck();
    let nodes = deck.node_table().unwrap();
    let coords = nodes.coordinates_batch(deck.lines(), &[5, 2]).unwrap();
    assert_eq!(coords, vec![[1.0, 1.0, 1.0], [1.0, 0.0, 0.0]]);
}

#[test]
fn unknown_names_fail_on_lookup() {
    let (_dir, mut deck) = open_deck();
    let err = deck.resolve(EntityKind::ElementSet, "Fiber_7").unwrap_err();
    assert!(matches!(err, InpError::NotIndexed { kind: EntityKind::ElementSet, .. }));
    assert!(deck.index().get(EntityKind::Orientation, "Ori-1").is_none());
}
