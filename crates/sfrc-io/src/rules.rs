//! Edit rules for orientation injection and material property changes.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use sfrc_inp::split_fields;
use sfrc_orient::Orientation;

use crate::error::{IoError, Result};
use crate::rewrite::{Edit, EditRule};

/// Value of a `key=value` parameter among header fields.
pub fn header_parameter<'a>(fields: &'a [String], key: &str) -> Option<&'a str> {
    fields.iter().skip(1).find_map(|field| {
        let (k, v) = field.split_once('=')?;
        k.eq_ignore_ascii_case(key).then_some(v)
    })
}

/// Six-decimal scientific notation with a signed two-digit exponent.
pub fn scientific(value: f64) -> String {
    let raw = format!("{value:.6e}");
    let Some((mantissa, exponent)) = raw.split_once('e') else {
        return raw;
    };
    match exponent.parse::<i32>() {
        Ok(exp) => format!("{mantissa}e{}{:02}", if exp < 0 { '-' } else { '+' }, exp.abs()),
        Err(_) => raw,
    }
}

fn is_keyword(fields: &[String], keyword: &str) -> bool {
    fields
        .first()
        .is_some_and(|first| first.eq_ignore_ascii_case(keyword))
}

/// An orientation to attach to one element set.
#[derive(Debug, Clone, PartialEq)]
pub struct FiberOrientation {
    pub elset: String,
    pub orientation: Orientation,
}

/// Replaces the family's `*Solid Section` with one oriented section per fiber.
///
/// Fibers sharing an orientation id (segments of one split fiber) get a
/// single `*Orientation` block.
#[derive(Debug, Clone)]
pub struct InjectOrientations {
    family: String,
    material: Option<String>,
    fibers: Vec<FiberOrientation>,
}

impl InjectOrientations {
    pub const NAME: &'static str = "inject-orientations";

    pub fn new(family: impl Into<String>, material: Option<String>, fibers: Vec<FiberOrientation>) -> Self {
        Self {
            family: family.into(),
            material,
            fibers,
        }
    }

    pub fn len(&self) -> usize {
        self.fibers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fibers.is_empty()
    }

    /// Lines for every fiber, using `material` in each section.
    pub fn render(&self, material: &str) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.fibers.len() * 5);
        let mut emitted = HashSet::new();
        for fiber in &self.fibers {
            let id = &fiber.orientation.id;
            if emitted.insert(id.as_str()) {
                lines.push(format!("*Orientation, name={id}"));
                lines.push(
                    fiber
                        .orientation
                        .fields()
                        .iter()
                        .map(|&v| scientific(v))
                        .collect::<Vec<_>>()
                        .join(", "),
                );
                lines.push("3, 0.".to_string());
            }
            lines.push(format!(
                "*Solid Section, elset={}, material={material}, orientation={id}",
                fiber.elset
            ));
            lines.push(",".to_string());
        }
        lines
    }
}

impl EditRule for InjectOrientations {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn applies(&mut self, line: &str) -> bool {
        let fields = split_fields(line);
        is_keyword(&fields, "*SolidSection")
            && header_parameter(&fields, "elset") == Some(self.family.as_str())
    }

    fn transform(&mut self, line: &str) -> Result<Edit> {
        let fields = split_fields(line);
        let material = self
            .material
            .clone()
            .or_else(|| header_parameter(&fields, "material").map(str::to_string))
            .ok_or_else(|| {
                IoError::Config(format!(
                    "no material for the sections of '{}'; set one explicitly",
                    self.family
                ))
            })?;
        log::info!(
            "injecting {} oriented sections for '{}' (material {material})",
            self.fibers.len(),
            self.family
        );
        Ok(Edit {
            lines: self.render(&material),
            skip: 1,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Isotropy {
    Isotropic,
    Orthotropic,
    Anisotropic,
}

impl Isotropy {
    pub fn value_count(self) -> usize {
        match self {
            Isotropy::Isotropic => 1,
            Isotropy::Orthotropic | Isotropy::Anisotropic => 3,
        }
    }

    fn type_parameter(self) -> &'static str {
        match self {
            Isotropy::Isotropic => "",
            Isotropy::Orthotropic => ", type=ORTHO",
            Isotropy::Anisotropic => ", type=ANISO",
        }
    }
}

impl fmt::Display for Isotropy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Isotropy::Isotropic => "isotropic",
            Isotropy::Orthotropic => "orthotropic",
            Isotropy::Anisotropic => "anisotropic",
        };
        f.write_str(name)
    }
}

/// Replaces a property block (e.g. `*Conductivity`) inside one `*Material`.
#[derive(Debug, Clone)]
pub struct ChangeMaterialProperty {
    material: String,
    property: String,
    isotropy: Isotropy,
    values: Vec<f64>,
    in_material: bool,
}

impl ChangeMaterialProperty {
    pub fn new(
        material: impl Into<String>,
        property: impl Into<String>,
        isotropy: Isotropy,
        values: Vec<f64>,
    ) -> Result<Self> {
        let property = property.into();
        if values.len() != isotropy.value_count() {
            return Err(IoError::Config(format!(
                "{isotropy} {property} takes {} values, got {}",
                isotropy.value_count(),
                values.len()
            )));
        }
        Ok(Self {
            material: material.into(),
            property,
            isotropy,
            values,
            in_material: false,
        })
    }

    fn keyword(&self) -> String {
        let compact: String = self.property.chars().filter(|c| !c.is_whitespace()).collect();
        format!("*{compact}")
    }
}

impl EditRule for ChangeMaterialProperty {
    fn name(&self) -> &str {
        "change-material-property"
    }

    fn applies(&mut self, line: &str) -> bool {
        let fields = split_fields(line);
        if is_keyword(&fields, "*Material") {
            self.in_material = header_parameter(&fields, "name") == Some(self.material.as_str());
            return false;
        }
        self.in_material && is_keyword(&fields, &self.keyword())
    }

    fn transform(&mut self, _line: &str) -> Result<Edit> {
        self.in_material = false;
        let values = self
            .values
            .iter()
            .map(|&v| scientific(v))
            .collect::<Vec<_>>()
            .join(",");
        Ok(Edit {
            lines: vec![
                format!("*{}{}", self.property, self.isotropy.type_parameter()),
                values,
            ],
            skip: 1,
        })
    }
}
