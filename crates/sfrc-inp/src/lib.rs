//! Random-access reader for Abaqus-style `.inp` mesh decks.
//!
//! Only the blocks needed for fiber post-processing are indexed: node and
//! element sets, surfaces, the all-node and all-element tables, orientations
//! and solid sections. Bodies are never loaded eagerly; every lookup seeks to
//! the recorded line through a [`LineFile`] offset table.

use std::fs::File;
use std::io::{Cursor, Read, Seek};
use std::path::Path;

pub mod elements;
pub mod error;
pub mod index;
pub mod lines;
pub mod nodes;
pub mod sets;

pub use elements::{ALL_ELEMENTS, ElementTable, ElementTopology};
pub use error::{InpError, Result};
pub use index::{EntityIndex, EntityKind, IndexEntry};
pub use lines::LineFile;
pub use nodes::{ALL_NODES, Coord, NodeTable};

/// Remove all whitespace from a line and split it on commas.
pub fn split_fields(line: &str) -> Vec<String> {
    split_fields_by(line, ',')
}

/// Remove all whitespace from a line and split it on `delimiter`.
pub fn split_fields_by(line: &str, delimiter: char) -> Vec<String> {
    let compact: String = line.chars().filter(|c| !c.is_whitespace()).collect();
    compact.split(delimiter).map(str::to_string).collect()
}

/// An open deck together with its entity index.
#[derive(Debug)]
pub struct InpFile<R> {
    lines: LineFile<R>,
    index: EntityIndex,
}

impl InpFile<File> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        log::info!("opening deck {}", path.display());
        Self::from_reader(File::open(path)?)
    }
}

impl InpFile<Cursor<Vec<u8>>> {
    /// Index an in-memory deck.
    pub fn parse_str(raw: &str) -> Result<Self> {
        Self::from_reader(Cursor::new(raw.as_bytes().to_vec()))
    }
}

impl<R: Read + Seek> InpFile<R> {
    pub fn from_reader(reader: R) -> Result<Self> {
        let mut lines = LineFile::new(reader)?;
        let index = EntityIndex::build(&mut lines)?;
        Ok(Self { lines, index })
    }

    pub fn index(&self) -> &EntityIndex {
        &self.index
    }

    pub fn lines(&mut self) -> &mut LineFile<R> {
        &mut self.lines
    }

    /// Throw the index away and scan the file again.
    pub fn reindex(&mut self) -> Result<()> {
        self.index = EntityIndex::build(&mut self.lines)?;
        Ok(())
    }

    /// Resolve a named node or element set.
    pub fn resolve(&mut self, kind: EntityKind, name: &str) -> Result<Vec<u32>> {
        let entry = self.index.require(kind, name)?;
        sets::resolve(&mut self.lines, entry)
    }

    /// Body lines of a named block.
    pub fn block(&mut self, kind: EntityKind, name: &str) -> Result<Vec<(usize, String)>> {
        let entry = self.index.require(kind, name)?;
        self.lines.block_lines(entry.start_line)
    }

    pub fn node_table(&self) -> Result<NodeTable> {
        NodeTable::from_index(&self.index, ALL_NODES)
    }

    pub fn element_table(&self) -> Result<ElementTable> {
        ElementTable::from_index(&self.index, ALL_ELEMENTS)
    }

    pub fn into_inner(self) -> Result<R> {
        self.lines.into_inner()
    }
}
