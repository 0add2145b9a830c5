//! Node and element set resolution.

use std::io::{Read, Seek};

use crate::error::{InpError, Result};
use crate::index::IndexEntry;
use crate::lines::LineFile;
use crate::split_fields;

/// Expand a `*Nset`/`*Elset` entry into its sorted, de-duplicated ids.
pub fn resolve<R: Read + Seek>(file: &mut LineFile<R>, entry: &IndexEntry) -> Result<Vec<u32>> {
    if entry.generate {
        resolve_generated(file, entry.start_line)
    } else {
        resolve_explicit(file, entry.start_line)
    }
}

fn resolve_generated<R: Read + Seek>(file: &mut LineFile<R>, line_no: usize) -> Result<Vec<u32>> {
    let line = file.line(line_no)?;
    let values = parse_ids(&line, line_no)?;

    let (first, last, step) = match values.as_slice() {
        [first, last] => (*first, *last, 1),
        [first, last, step] => (*first, *last, *step),
        _ => {
            return Err(InpError::Malformed {
                line: line_no,
                message: format!("expected 'first, last, step', got '{}'", line.trim()),
            });
        }
    };
    if step == 0 {
        return Err(InpError::Resolve {
            line: line_no,
            token: "0".to_string(),
        });
    }

    Ok((first..=last).step_by(step as usize).collect())
}

fn resolve_explicit<R: Read + Seek>(file: &mut LineFile<R>, start: usize) -> Result<Vec<u32>> {
    let mut ids = Vec::new();
    for (line_no, line) in file.block_lines(start)? {
        ids.extend(parse_ids(&line, line_no)?);
    }
    ids.sort_unstable();
    ids.dedup();
    Ok(ids)
}

/// Parse every non-empty comma-separated field of a line as an id.
pub fn parse_ids(line: &str, line_no: usize) -> Result<Vec<u32>> {
    split_fields(line)
        .into_iter()
        .filter(|token| !token.is_empty())
        .map(|token| {
            token
                .parse::<u32>()
                .map_err(|_| InpError::Resolve {
                    line: line_no,
                    token,
                })
        })
        .collect()
}

/// Merge `extra` into a sorted, unique id list.
pub fn union_into(ids: &mut Vec<u32>, extra: impl IntoIterator<Item = u32>) {
    ids.extend(extra);
    ids.sort_unstable();
    ids.dedup();
}

/// Intersection of two sorted, unique id lists.
pub fn intersect_sorted(a: &[u32], b: &[u32]) -> Vec<u32> {
    let mut out = Vec::new();
    let (mut i, mut j) = (0usize, 0usize);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::index::{EntityIndex, EntityKind};

    fn resolve_named(src: &str, kind: EntityKind, name: &str) -> Result<Vec<u32>> {
        let mut file = LineFile::new(Cursor::new(src.as_bytes().to_vec()))?;
        let index = EntityIndex::build(&mut file)?;
        let entry = index.require(kind, name)?.clone();
        resolve(&mut file, &entry)
    }

    #[test]
    fn generated_range_is_inclusive_of_reachable_last() {
        let src = "*Nset, nset=a, generate\n1, 10, 3\n*Nset, nset=b, generate\n 4, 8, 2\n";
        assert_eq!(
            resolve_named(src, EntityKind::NodeSet, "a").unwrap(),
            vec![1, 4, 7, 10]
        );
        assert_eq!(
            resolve_named(src, EntityKind::NodeSet, "b").unwrap(),
            vec![4, 6, 8]
        );
    }

    #[test]
    fn generated_range_stops_before_unreachable_last() {
        let src = "*Elset, elset=e, generate\n2, 11, 4\n";
        assert_eq!(
            resolve_named(src, EntityKind::ElementSet, "e").unwrap(),
            vec![2, 6, 10]
        );
    }

    #[test]
    fn generated_range_without_step_defaults_to_one() {
        let src = "*Elset, elset=e, generate\n3, 5\n";
        assert_eq!(
            resolve_named(src, EntityKind::ElementSet, "e").unwrap(),
            vec![3, 4, 5]
        );
    }

    #[test]
    fn zero_step_is_rejected() {
        let src = "*Elset, elset=e, generate\n1, 5, 0\n";
        let err = resolve_named(src, EntityKind::ElementSet, "e").unwrap_err();
        assert!(matches!(err, InpError::Resolve { line: 2, .. }));
    }

    #[test]
    fn explicit_list_spans_lines_and_is_sorted_unique() {
        let src = "*Nset, nset=n\n 9, 3, 5,\n3, 1,\n 12\n*Elset, elset=x\n100\n";
        assert_eq!(
            resolve_named(src, EntityKind::NodeSet, "n").unwrap(),
            vec![1, 3, 5, 9, 12]
        );
    }

    #[test]
    fn explicit_list_stops_at_eof() {
        let src = "*Elset, elset=last\n7, 8";
        assert_eq!(
            resolve_named(src, EntityKind::ElementSet, "last").unwrap(),
            vec![7, 8]
        );
    }

    #[test]
    fn malformed_token_fails_the_resolve() {
        let src = "*Nset, nset=n\n1, 2\n3, x4\n";
        let err = resolve_named(src, EntityKind::NodeSet, "n").unwrap_err();
        match err {
            InpError::Resolve { line, token } => {
                assert_eq!(line, 3);
                assert_eq!(token, "x4");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn sorted_set_helpers() {
        let mut ids = vec![1, 4, 9];
        union_into(&mut ids, [4, 2, 10]);
        assert_eq!(ids, vec![1, 2, 4, 9, 10]);
        assert_eq!(intersect_sorted(&ids, &[2, 3, 9, 11]), vec![2, 9]);
        assert!(intersect_sorted(&ids, &[]).is_empty());
    }
}
