// Licensed under the Apache-2.0 license

//! Deterministic bit layout of the PI and PO vectors.
//!
//! Bits are assigned by walking, in order: bindings, the bound struct's
//! fields in declaration order, and each field's array elements in
//! row-major order (last dimension fastest). Every scalar instance gets one
//! contiguous range and the ranges of a vector exactly cover
//! `[0, total_width)`.

use std::fmt;
use std::str::FromStr;

use log::debug;

use crate::dims::DimensionTable;
use crate::error::{GenError, Result};
use crate::extract::StructSet;
use crate::width::WidthTable;

/// Which flattened vector a range belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Vector {
    /// Primary input.
    Pi,
    /// Primary output.
    Po,
}

impl Vector {
    pub const ALL: [Vector; 2] = [Vector::Pi, Vector::Po];

    pub fn as_str(&self) -> &'static str {
        match self {
            Vector::Pi => "pi",
            Vector::Po => "po",
        }
    }
}

impl fmt::Display for Vector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Vector {
    type Err = GenError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pi" => Ok(Vector::Pi),
            "po" => Ok(Vector::Po),
            _ => Err(GenError::InvalidSpec {
                kind: "vector",
                spec: s.to_string(),
                expected: "pi or po",
            }),
        }
    }
}

/// A wrapper field and the struct type stored in it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Binding {
    pub wrapper_field: String,
    pub struct_name: String,
}

impl Binding {
    pub fn new(wrapper_field: &str, struct_name: &str) -> Self {
        Self {
            wrapper_field: wrapper_field.to_string(),
            struct_name: struct_name.to_string(),
        }
    }

    /// Parse a list of `field:Struct` specs.
    pub fn parse_all<S: AsRef<str>>(specs: &[S]) -> Result<Vec<Binding>> {
        specs.iter().map(|s| s.as_ref().parse()).collect()
    }
}

impl FromStr for Binding {
    type Err = GenError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || GenError::InvalidSpec {
            kind: "field spec",
            spec: s.to_string(),
            expected: "field:StructName",
        };
        let (field, struct_name) = s.split_once(':').ok_or_else(invalid)?;
        let (field, struct_name) = (field.trim(), struct_name.trim());
        if field.is_empty() || struct_name.is_empty() {
            return Err(invalid());
        }
        Ok(Binding::new(field, struct_name))
    }
}

/// The bit range owned by one scalar field instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignalRange {
    pub vector: Vector,
    pub bit_lsb: usize,
    pub bit_msb: usize,
    pub width: usize,
    pub wrapper_field: String,
    pub struct_name: String,
    /// Symbolic path, e.g. `regs.tag[3][1]`.
    pub signal: String,
    pub type_name: String,
}

impl SignalRange {
    pub fn contains(&self, bit: usize) -> bool {
        self.bit_lsb <= bit && bit <= self.bit_msb
    }
}

/// Row-major enumeration of every index tuple for a list of dimension sizes.
///
/// Zero dimensions yield one empty tuple; any zero-sized dimension yields
/// nothing.
pub struct IndexTuples {
    dims: Vec<usize>,
    next: Option<Vec<usize>>,
}

impl IndexTuples {
    pub fn new(dims: &[usize]) -> Self {
        let next = if dims.contains(&0) {
            None
        } else {
            Some(vec![0; dims.len()])
        };
        Self {
            dims: dims.to_vec(),
            next,
        }
    }
}

impl Iterator for IndexTuples {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        let current = self.next.take()?;
        let mut advanced = current.clone();
        for pos in (0..advanced.len()).rev() {
            advanced[pos] += 1;
            if advanced[pos] < self.dims[pos] {
                self.next = Some(advanced);
                return Some(current);
            }
            advanced[pos] = 0;
        }
        Some(current)
    }
}

/// `[i0][i1]...` suffix for an index tuple.
pub fn index_suffix(indices: &[usize]) -> String {
    indices.iter().map(|i| format!("[{i}]")).collect()
}

/// All ranges of one vector.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Layout {
    pub vector: Vector,
    pub ranges: Vec<SignalRange>,
    pub total_width: usize,
}

impl Layout {
    pub fn build(
        vector: Vector,
        bindings: &[Binding],
        structs: &StructSet,
        widths: &WidthTable,
        dims: &DimensionTable,
    ) -> Result<Layout> {
        let mut ranges = Vec::new();
        let mut cursor: usize = 0;
        for binding in bindings {
            let model = structs
                .get(&binding.struct_name)
                .ok_or_else(|| GenError::UnknownStruct(binding.struct_name.clone()))?;
            for field in &model.fields {
                let width = widths.width_of(&field.type_name)?;
                let too_wide = || {
                    GenError::Evaluation(format!(
                        "{vector} vector overflows at {}.{}",
                        binding.wrapper_field, field.name
                    ))
                };
                let field_bits = width
                    .checked_mul(dims.element_count(&field.dims)?)
                    .ok_or_else(too_wide)?;
                cursor.checked_add(field_bits).ok_or_else(too_wide)?;
                for indices in IndexTuples::new(&dims.resolve(&field.dims)?) {
                    ranges.push(SignalRange {
                        vector,
                        bit_lsb: cursor,
                        bit_msb: cursor + width - 1,
                        width,
                        wrapper_field: binding.wrapper_field.clone(),
                        struct_name: binding.struct_name.clone(),
                        signal: format!(
                            "{}.{}{}",
                            binding.wrapper_field,
                            field.name,
                            index_suffix(&indices)
                        ),
                        type_name: field.type_name.clone(),
                    });
                    cursor += width;
                }
            }
        }
        debug!("{vector} layout: {} ranges, {cursor} bits", ranges.len());
        Ok(Layout {
            vector,
            ranges,
            total_width: cursor,
        })
    }

    /// The range owning `bit`.
    ///
    /// Negative indices and indices at or past the total width are
    /// [`GenError::QueryOutOfRange`].
    pub fn query(&self, bit: i64) -> Result<&SignalRange> {
        let out_of_range = || GenError::QueryOutOfRange {
            vector: self.vector,
            bit,
            width: self.total_width,
        };
        let index = usize::try_from(bit).map_err(|_| out_of_range())?;
        let pos = self.ranges.partition_point(|r| r.bit_lsb <= index);
        let candidate = pos
            .checked_sub(1)
            .and_then(|p| self.ranges.get(p))
            .ok_or_else(out_of_range)?;
        if candidate.contains(index) {
            Ok(candidate)
        } else {
            Err(out_of_range())
        }
    }

    /// Pack one value per range into a bit vector, LSB first.
    ///
    /// Values are truncated to their range width, matching the generated
    /// C++ `pack_*` routines.
    pub fn pack(&self, values: &[u64]) -> Result<Vec<bool>> {
        if values.len() != self.ranges.len() {
            return Err(GenError::ShapeMismatch {
                vector: self.vector,
                what: "values",
                expected: self.ranges.len(),
                actual: values.len(),
            });
        }
        let mut bits = Vec::with_capacity(self.total_width);
        for (range, value) in self.ranges.iter().zip(values) {
            for b in 0..range.width {
                bits.push(b < 64 && (value >> b) & 1 != 0);
            }
        }
        Ok(bits)
    }

    /// Inverse of [`Layout::pack`]: read one value per range.
    pub fn unpack(&self, bits: &[bool]) -> Result<Vec<u64>> {
        if bits.len() != self.total_width {
            return Err(GenError::ShapeMismatch {
                vector: self.vector,
                what: "bits",
                expected: self.total_width,
                actual: bits.len(),
            });
        }
        Ok(self
            .ranges
            .iter()
            .map(|range| {
                bits[range.bit_lsb..=range.bit_msb]
                    .iter()
                    .enumerate()
                    .filter(|(b, set)| **set && *b < 64)
                    .fold(0u64, |acc, (b, _)| acc | (1u64 << b))
            })
            .collect())
    }
}
