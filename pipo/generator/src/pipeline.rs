// Licensed under the Apache-2.0 license

//! One generation run over one module header.
//!
//! [`Generation`] is the explicit context threaded through the steps: the
//! parsed header, the PI/PO configuration and the extracted structs. Header
//! emission only needs the symbolic dimension expressions; bit maps need them
//! resolved by a [`DimensionEvaluator`].

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::bitmap::{bit_table_csv, range_table_csv, BitMaps};
use crate::dims::DimensionEvaluator;
use crate::emit::{generate_header, HeaderOptions};
use crate::error::{GenError, Result};
use crate::extract::{Header, StructSet};
use crate::layout::{Binding, Layout, Vector};
use crate::output::OutputSet;
use crate::width::WidthTable;

/// Namespace, bindings and width overrides of one module.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IoConfig {
    pub namespace: String,
    pub pi: Vec<Binding>,
    pub po: Vec<Binding>,
    pub widths: WidthTable,
}

impl IoConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from command-line style `field:Struct` and `Type=Width` specs.
    pub fn from_specs<S: AsRef<str>>(
        namespace: &str,
        pi: &[S],
        po: &[S],
        overrides: &[S],
    ) -> Result<Self> {
        Ok(Self {
            namespace: namespace.to_string(),
            pi: Binding::parse_all(pi)?,
            po: Binding::parse_all(po)?,
            widths: WidthTable::from_specs(overrides)?,
        })
    }

    pub fn namespace(mut self, namespace: &str) -> Self {
        self.namespace = namespace.to_string();
        self
    }

    pub fn pi(mut self, wrapper_field: &str, struct_name: &str) -> Self {
        self.pi.push(Binding::new(wrapper_field, struct_name));
        self
    }

    pub fn po(mut self, wrapper_field: &str, struct_name: &str) -> Self {
        self.po.push(Binding::new(wrapper_field, struct_name));
        self
    }

    pub fn widths(mut self, widths: WidthTable) -> Self {
        self.widths = widths;
        self
    }

    /// Bound struct names, PI first, with duplicates.
    fn struct_names(&self) -> impl Iterator<Item = &str> {
        self.pi
            .iter()
            .chain(&self.po)
            .map(|b| b.struct_name.as_str())
    }
}

/// Parsed header plus the structs bound by an [`IoConfig`].
pub struct Generation {
    io: IoConfig,
    structs: StructSet,
}

impl Generation {
    pub fn new(header_text: &str, io: IoConfig) -> Result<Self> {
        let header = Header::parse(header_text);
        let structs = StructSet::extract(&header, io.struct_names())?;
        debug!(
            "{} PI bindings, {} PO bindings, {} distinct structs",
            io.pi.len(),
            io.po.len(),
            structs.len()
        );
        Ok(Self { io, structs })
    }

    pub fn from_header_file(path: &Path, io: IoConfig) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| GenError::io(format!("failed to read {}", path.display()), e))?;
        Self::new(&text, io)
    }

    pub fn io(&self) -> &IoConfig {
        &self.io
    }

    pub fn structs(&self) -> &StructSet {
        &self.structs
    }

    /// Distinct dimension expressions used by the bound structs.
    pub fn dimension_exprs(&self) -> Vec<String> {
        self.structs.dim_exprs()
    }

    /// Render the PI/PO C++ header.
    pub fn header(&self, opts: &HeaderOptions) -> Result<String> {
        generate_header(
            opts,
            &self.structs,
            &self.io.pi,
            &self.io.po,
            &self.io.widths,
        )
    }

    /// Resolve dimensions and lay out both vectors.
    pub fn bit_maps(&self, evaluator: &dyn DimensionEvaluator) -> Result<BitMaps> {
        let dims = evaluator.evaluate(&self.dimension_exprs())?;
        let build = |vector, bindings: &[Binding]| {
            Layout::build(vector, bindings, &self.structs, &self.io.widths, &dims)
        };
        let maps = BitMaps {
            pi: build(Vector::Pi, &self.io.pi)?,
            po: build(Vector::Po, &self.io.po)?,
        };
        info!(
            "PI width {}, PO width {}",
            maps.pi.total_width, maps.po.total_width
        );
        Ok(maps)
    }
}

/// `<prefix>_<vector>_<kind>.csv`
pub fn map_path(prefix: &Path, vector: Vector, kind: &str) -> PathBuf {
    let mut name: OsString = prefix.as_os_str().to_owned();
    name.push(format!("_{vector}_{kind}.csv"));
    PathBuf::from(name)
}

/// Range tables for both vectors, followed by the per-bit tables if asked.
pub fn map_outputs(maps: &BitMaps, prefix: &Path, per_bit: bool) -> OutputSet {
    let mut outputs = OutputSet::new();
    for vector in Vector::ALL {
        outputs.add(
            map_path(prefix, vector, "map"),
            range_table_csv(maps.layout(vector)),
        );
    }
    if per_bit {
        for vector in Vector::ALL {
            outputs.add(
                map_path(prefix, vector, "bits"),
                bit_table_csv(maps.layout(vector)),
            );
        }
    }
    outputs
}
