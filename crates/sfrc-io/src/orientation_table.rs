//! Reader for `;`-delimited per-inclusion orientation tables.
//!
//! The header names columns; whitespace inside names is ignored, so
//! `inclusion nb` and `inclusionnb` are the same column. Angles are in
//! radians.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use sfrc_inp::split_fields_by;
use sfrc_orient::{Orientation, OrientationIds, frame_from_angles};

use crate::error::{IoError, Result};
use crate::rules::FiberOrientation;

const DELIMITER: char = ';';
const REQUIRED: [&str; 3] = ["inclusionnb", "theta", "phi"];

#[derive(Debug, Clone, PartialEq)]
pub struct OrientationRow {
    pub inclusion: u32,
    pub theta: f64,
    pub phi: f64,
    pub z_rotation: Option<f64>,
    /// `rotMat11..rotMat33`, row major, when all nine columns are present.
    pub rotation: Option<[[f64; 3]; 3]>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrientationTable {
    pub rows: Vec<OrientationRow>,
}

struct Columns {
    inclusion: usize,
    theta: usize,
    phi: usize,
    z_rotation: Option<usize>,
    rotation: Option<[[usize; 3]; 3]>,
}

impl Columns {
    fn from_header(header: &[String]) -> Result<Self> {
        let find = |name: &str| header.iter().position(|h| h.eq_ignore_ascii_case(name));

        let missing: Vec<String> = REQUIRED
            .into_iter()
            .filter(|name| find(*name).is_none())
            .map(String::from)
            .collect();
        let (Some(inclusion), Some(theta), Some(phi)) =
            (find("inclusionnb"), find("theta"), find("phi"))
        else {
            return Err(IoError::MissingColumns {
                missing,
                found: header.iter().filter(|h| !h.is_empty()).cloned().collect(),
            });
        };

        let mut rotation = [[0usize; 3]; 3];
        let mut complete = true;
        for (i, row) in rotation.iter_mut().enumerate() {
            for (j, slot) in row.iter_mut().enumerate() {
                match find(format!("rotMat{}{}", i + 1, j + 1).as_str()) {
                    Some(idx) => *slot = idx,
                    None => complete = false,
                }
            }
        }

        Ok(Self {
            inclusion,
            theta,
            phi,
            z_rotation: find("Zrotation"),
            rotation: complete.then_some(rotation),
        })
    }
}

impl OrientationTable {
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        log::info!("reading orientation table {}", path.display());
        Self::parse(BufReader::new(File::open(path)?))
    }

    pub fn parse<R: BufRead>(reader: R) -> Result<Self> {
        let mut lines = reader.lines().enumerate();
        let header = loop {
            match lines.next() {
                Some((_, line)) => {
                    let line = line?;
                    if !line.trim().is_empty() {
                        break split_fields_by(&line, DELIMITER);
                    }
                }
                None => return Err(IoError::EmptyTable),
            }
        };
        let columns = Columns::from_header(&header)?;

        let mut rows = Vec::new();
        for (idx, line) in lines {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            rows.push(parse_row(&split_fields_by(&line, DELIMITER), &columns, idx + 1)?);
        }

        if rows.is_empty() {
            return Err(IoError::EmptyTable);
        }
        log::debug!("{} orientation rows", rows.len());
        Ok(Self { rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// One orientation per row, attached to `<family>_<row>` in row order.
    pub fn fiber_orientations(&self, family: &str, ids: &mut OrientationIds) -> Result<Vec<FiberOrientation>> {
        self.rows
            .iter()
            .enumerate()
            .map(|(idx, row)| -> Result<FiberOrientation> {
                let (principal, secondary) = frame_from_angles(row.theta, row.phi)?;
                Ok(FiberOrientation {
                    elset: format!("{family}_{idx}"),
                    orientation: Orientation {
                        id: ids.next_id(),
                        principal,
                        secondary,
                    },
                })
            })
            .collect()
    }
}

fn parse_row(fields: &[String], columns: &Columns, line: usize) -> Result<OrientationRow> {
    let value = |idx: usize, name: &str| -> Result<f64> {
        let token = fields.get(idx).map(String::as_str).unwrap_or_default();
        token.parse::<f64>().map_err(|_| IoError::Parse {
            line,
            message: format!("invalid {name} '{token}'"),
        })
    };

    let inclusion = value(columns.inclusion, "inclusion nb")?;
    if inclusion < 0.0 || inclusion.fract() != 0.0 || inclusion > u32::MAX as f64 {
        return Err(IoError::Parse {
            line,
            message: format!("inclusion number {inclusion} is not a non-negative integer"),
        });
    }

    let rotation = match &columns.rotation {
        Some(cols) => {
            let mut matrix = [[0.0; 3]; 3];
            for i in 0..3 {
                for j in 0..3 {
                    matrix[i][j] = value(cols[i][j], "rotation entry")?;
                }
            }
            Some(matrix)
        }
        None => None,
    };

    Ok(OrientationRow {
        inclusion: inclusion as u32,
        theta: value(columns.theta, "theta")?,
        phi: value(columns.phi, "phi")?,
        z_rotation: columns
            .z_rotation
            .map(|idx| value(idx, "Z rotation"))
            .transpose()?,
        rotation,
    })
}
