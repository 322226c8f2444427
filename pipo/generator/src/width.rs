// Licensed under the Apache-2.0 license

//! Bit widths of scalar field types.
//!
//! Widths are *logical* bit-vector widths, not storage sizes. Resolution
//! order is: explicit override, builtin table, then the parametric
//! `wire<N>_t` / `reg<N>_t` pattern.

use std::collections::BTreeMap;

use crate::error::{GenError, Result};

/// Builtin widths.
///
/// `uint16`/`uint16_t` map to 6 bits. That is the existing bit-vector
/// convention for the cache/TLB models and is kept as-is; use an override
/// to pack a true 16-bit value.
pub const BUILTIN_WIDTHS: &[(&str, usize)] = &[
    ("bool", 1),
    ("uint8", 8),
    ("uint8_t", 8),
    ("uint16", 6),
    ("uint16_t", 6),
    ("uint32", 32),
    ("uint32_t", 32),
    ("uint64", 64),
    ("uint64_t", 64),
];

/// Type name to bit width mapping with user overrides layered on top.
///
/// # Example
///
/// ```
/// use pipo_generator::WidthTable;
///
/// let widths = WidthTable::new().with_override("uint16_t", 16);
/// assert_eq!(widths.width_of("uint16_t").unwrap(), 16);
/// assert_eq!(widths.width_of("uint16").unwrap(), 6);
/// assert_eq!(widths.width_of("wire12_t").unwrap(), 12);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WidthTable {
    overrides: BTreeMap<String, usize>,
}

impl WidthTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an override.
    pub fn with_override(mut self, type_name: &str, width: usize) -> Self {
        self.overrides.insert(type_name.to_string(), width);
        self
    }

    /// Build a table from `Type=Width` specs. Later specs win.
    pub fn from_specs<S: AsRef<str>>(specs: &[S]) -> Result<Self> {
        let mut table = Self::new();
        for spec in specs {
            let (type_name, width) = parse_override(spec.as_ref())?;
            table.overrides.insert(type_name, width);
        }
        Ok(table)
    }

    pub fn width_of(&self, type_name: &str) -> Result<usize> {
        if let Some(width) = self.overrides.get(type_name) {
            return Ok(*width);
        }
        if let Some((_, width)) = BUILTIN_WIDTHS.iter().find(|(name, _)| *name == type_name) {
            return Ok(*width);
        }
        parametric_width(type_name).ok_or_else(|| GenError::UnsupportedType(type_name.to_string()))
    }
}

/// `wire<N>_t` or `reg<N>_t` with a positive decimal `N`.
fn parametric_width(type_name: &str) -> Option<usize> {
    let digits = type_name
        .strip_prefix("wire")
        .or_else(|| type_name.strip_prefix("reg"))?
        .strip_suffix("_t")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().filter(|w| *w > 0)
}

fn parse_override(spec: &str) -> Result<(String, usize)> {
    let invalid = || GenError::InvalidSpec {
        kind: "override",
        spec: spec.to_string(),
        expected: "Type=Width with a positive width",
    };
    let (type_name, width) = spec.split_once('=').ok_or_else(invalid)?;
    let type_name = type_name.trim();
    let width: usize = width.trim().parse().map_err(|_| invalid())?;
    if type_name.is_empty() || width == 0 {
        return Err(invalid());
    }
    Ok((type_name.to_string(), width))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_widths() {
        let widths = WidthTable::new();
        assert_eq!(widths.width_of("bool").unwrap(), 1);
        assert_eq!(widths.width_of("uint8").unwrap(), 8);
        assert_eq!(widths.width_of("uint8_t").unwrap(), 8);
        assert_eq!(widths.width_of("uint16").unwrap(), 6);
        assert_eq!(widths.width_of("uint16_t").unwrap(), 6);
        assert_eq!(widths.width_of("uint32_t").unwrap(), 32);
        assert_eq!(widths.width_of("uint64").unwrap(), 64);
    }

    #[test]
    fn test_parametric_widths() {
        let widths = WidthTable::new();
        assert_eq!(widths.width_of("wire1_t").unwrap(), 1);
        assert_eq!(widths.width_of("reg33_t").unwrap(), 33);
        assert_eq!(widths.width_of("wire128_t").unwrap(), 128);
        for bad in ["wire_t", "wire0_t", "wirex_t", "wire4", "reg4_t_", "regs4_t", "Wire4_t"] {
            assert!(
                matches!(widths.width_of(bad), Err(GenError::UnsupportedType(ref t)) if t == bad),
                "{bad} should be unsupported"
            );
        }
    }

    #[test]
    fn test_override_wins() {
        let widths = WidthTable::from_specs(&["uint16_t=16", " wire4_t = 5 ", "Addr=39"]).unwrap();
        assert_eq!(widths.width_of("uint16_t").unwrap(), 16);
        assert_eq!(widths.width_of("wire4_t").unwrap(), 5);
        assert_eq!(widths.width_of("Addr").unwrap(), 39);
        assert_eq!(widths.width_of("uint16").unwrap(), 6);
    }

    #[test]
    fn test_unsupported_type() {
        let err = WidthTable::new().width_of("float").unwrap_err();
        assert_eq!(
            err.to_string(),
            "unsupported type for bitvector packing: float"
        );
    }

    #[test]
    fn test_invalid_override_specs() {
        for spec in ["uint8", "=8", "uint8=", "uint8=0", "uint8=-1", "uint8=eight"] {
            assert!(
                matches!(
                    WidthTable::from_specs(&[spec]),
                    Err(GenError::InvalidSpec { kind: "override", .. })
                ),
                "{spec} should be rejected"
            );
        }
    }
}
