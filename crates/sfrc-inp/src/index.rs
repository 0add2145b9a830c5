//! Entity index: named blocks of the deck resolved to line positions.

use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::io::{Read, Seek};

use crate::error::{InpError, Result};
use crate::lines::LineFile;
use crate::split_fields;

/// The block kinds the index records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    /// `*Nset`
    NodeSet,
    /// `*Elset`
    ElementSet,
    /// `*Surface`
    Surface,
    /// `*Node`, the all-node table
    NodeTable,
    /// `*Element`, the all-element table
    ElementTable,
    /// `*Orientation`
    Orientation,
    /// `*Solid Section`
    SolidSection,
}

impl EntityKind {
    pub const ALL: [EntityKind; 7] = [
        EntityKind::NodeSet,
        EntityKind::ElementSet,
        EntityKind::Surface,
        EntityKind::NodeTable,
        EntityKind::ElementTable,
        EntityKind::Orientation,
        EntityKind::SolidSection,
    ];

    /// Header keyword with all whitespace removed.
    pub fn keyword(self) -> &'static str {
        match self {
            EntityKind::NodeSet => "*Nset",
            EntityKind::ElementSet => "*Elset",
            EntityKind::Surface => "*Surface",
            EntityKind::NodeTable => "*Node",
            EntityKind::ElementTable => "*Element",
            EntityKind::Orientation => "*Orientation",
            EntityKind::SolidSection => "*SolidSection",
        }
    }

    /// Position of the `key=name` token in the header.
    pub fn name_token(self) -> usize {
        match self {
            EntityKind::NodeSet
            | EntityKind::ElementSet
            | EntityKind::NodeTable
            | EntityKind::Orientation
            | EntityKind::SolidSection => 1,
            EntityKind::Surface | EntityKind::ElementTable => 2,
        }
    }

    /// Match the first header token (whitespace already removed).
    pub fn from_keyword(token: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.keyword().eq_ignore_ascii_case(token))
    }

    fn slot(self) -> usize {
        self as usize
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.keyword()[1..])
    }
}

/// One named block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub name: String,
    pub kind: EntityKind,
    /// Line of the `*` header (1-based).
    pub header_line: usize,
    /// First body line, i.e. `header_line + 1`.
    pub start_line: usize,
    /// Body is a single `first, last, step` triple.
    pub generate: bool,
    /// Header tokens with whitespace removed, keyword included.
    pub header: Vec<String>,
}

impl IndexEntry {
    /// Value of a `key=value` header parameter, key compared case-insensitively.
    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.header.iter().skip(1).find_map(|token| {
            let (k, v) = token.split_once('=')?;
            k.eq_ignore_ascii_case(key).then_some(v)
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct KindTable {
    entries: Vec<IndexEntry>,
    by_name: HashMap<String, usize>,
}

impl KindTable {
    fn insert(&mut self, entry: IndexEntry) {
        if let Some(&slot) = self.by_name.get(&entry.name) {
            log::warn!(
                "{} '{}' redefined at line {}, replacing definition from line {}",
                entry.kind,
                entry.name,
                entry.header_line,
                self.entries[slot].header_line
            );
            self.entries[slot] = entry;
            return;
        }
        self.by_name.insert(entry.name.clone(), self.entries.len());
        self.entries.push(entry);
    }
}

/// Immutable index of every recognized block in a deck.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityIndex {
    tables: [KindTable; 7],
}

impl EntityIndex {
    /// Scan the whole file from the top and record every recognized header.
    pub fn build<R: Read + Seek>(file: &mut LineFile<R>) -> Result<Self> {
        let mut index = Self::default();
        file.scan(|line_no, line| {
            if let Some(entry) = parse_header(line, line_no) {
                index.tables[entry.kind.slot()].insert(entry);
            }
        })?;

        for kind in index.empty_kinds() {
            log::warn!("no {kind} blocks found in deck");
        }
        log::debug!(
            "indexed {} blocks over {} lines",
            EntityKind::ALL.iter().map(|k| index.len(*k)).sum::<usize>(),
            file.line_count()
        );
        Ok(index)
    }

    pub fn get(&self, kind: EntityKind, name: &str) -> Option<&IndexEntry> {
        let table = &self.tables[kind.slot()];
        table.by_name.get(name).map(|&slot| &table.entries[slot])
    }

    /// Like [`EntityIndex::get`], but a missing block is an error.
    pub fn require(&self, kind: EntityKind, name: &str) -> Result<&IndexEntry> {
        self.get(kind, name).ok_or_else(|| InpError::NotIndexed {
            kind,
            name: name.to_string(),
        })
    }

    /// Entries of one kind in file order.
    pub fn entries(&self, kind: EntityKind) -> &[IndexEntry] {
        &self.tables[kind.slot()].entries
    }

    pub fn names(&self, kind: EntityKind) -> impl Iterator<Item = &str> {
        self.entries(kind).iter().map(|e| e.name.as_str())
    }

    pub fn len(&self, kind: EntityKind) -> usize {
        self.entries(kind).len()
    }

    pub fn empty_kinds(&self) -> Vec<EntityKind> {
        EntityKind::ALL
            .into_iter()
            .filter(|kind| self.entries(*kind).is_empty())
            .collect()
    }
}

fn parse_header(line: &str, line_no: usize) -> Option<IndexEntry> {
    if !line.trim_start().starts_with('*') {
        return None;
    }

    let header = split_fields(line);
    let kind = EntityKind::from_keyword(header.first()?)?;

    let Some(name) = header
        .get(kind.name_token())
        .and_then(|token| token.split_once('='))
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
    else {
        log::warn!("line {line_no}: {kind} header without a name, skipping: {line}");
        return None;
    };

    let generate = header
        .iter()
        .any(|token| token.eq_ignore_ascii_case("generate"));

    Some(IndexEntry {
        name,
        kind,
        header_line: line_no,
        start_line: line_no + 1,
        generate,
        header,
    })
}
