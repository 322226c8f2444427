// Licensed under the Apache-2.0 license

//! Batch job files.
//!
//! A job file lists modules to generate in one run:
//!
//! ```toml
//! [[module]]
//! name = "tlb"
//! header = "mmu/include/tlb_module.h"
//! namespace = "tlb_module_n"
//! wrapper_type = "TLB_IO_t"
//! pi = ["in:TLB_in_t", "regs:TLB_regs_t"]
//! po = ["out:TLB_out_t", "reg_write:TLB_regs_t"]
//! overrides = { uint16_t = 16 }
//! output = "gen/tlb_pi_po.h"
//! map_prefix = "gen/tlb"
//! include_dirs = ["mmu/include"]
//! ```
//!
//! Relative paths are resolved against the directory holding the job file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::debug;
use serde::Deserialize;

use crate::dims::{CxxEvaluator, DEFAULT_CXX};
use crate::emit::{HeaderOptions, DEFAULT_COMB_FN, DEFAULT_IO_MEMBER, DEFAULT_OUT_NAMESPACE};
use crate::error::{GenError, Result};
use crate::layout::Binding;
use crate::pipeline::IoConfig;
use crate::width::WidthTable;

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobFile {
    #[serde(default, rename = "module")]
    pub modules: Vec<ModuleJob>,
}

/// Everything needed to generate the header and bit maps of one module.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleJob {
    pub name: String,
    pub header: PathBuf,
    /// `#include` path in the generated header; defaults to the header's
    /// file name.
    #[serde(default)]
    pub include: Option<String>,
    #[serde(default)]
    pub namespace: String,
    #[serde(default = "default_out_namespace")]
    pub out_namespace: String,
    #[serde(default)]
    pub wrapper_type: Option<String>,
    #[serde(default = "default_io_member")]
    pub io_member: String,
    #[serde(default = "default_comb_fn")]
    pub comb_fn: String,
    #[serde(default)]
    pub pi: Vec<String>,
    #[serde(default)]
    pub po: Vec<String>,
    #[serde(default)]
    pub overrides: BTreeMap<String, usize>,
    /// Generated header path. No header is produced when absent.
    #[serde(default)]
    pub output: Option<PathBuf>,
    /// Bit map prefix. No tables are produced when absent.
    #[serde(default)]
    pub map_prefix: Option<PathBuf>,
    #[serde(default)]
    pub per_bit: bool,
    #[serde(default)]
    pub include_dirs: Vec<PathBuf>,
    #[serde(default = "default_cxx")]
    pub cxx: String,
    #[serde(default)]
    pub cxxflags: Vec<String>,
}

fn default_out_namespace() -> String {
    DEFAULT_OUT_NAMESPACE.to_string()
}

fn default_io_member() -> String {
    DEFAULT_IO_MEMBER.to_string()
}

fn default_comb_fn() -> String {
    DEFAULT_COMB_FN.to_string()
}

fn default_cxx() -> String {
    DEFAULT_CXX.to_string()
}

impl JobFile {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| GenError::io(format!("failed to read {}", path.display()), e))?;
        Self::parse(&text, path)
    }

    /// Parse job file text. `path` names the file for errors and anchors
    /// relative paths.
    pub fn parse(text: &str, path: &Path) -> Result<Self> {
        let mut job: JobFile = toml::from_str(text).map_err(|source| GenError::JobFile {
            path: path.to_path_buf(),
            source,
        })?;
        let base_dir = path.parent().unwrap_or(Path::new(""));
        for module in &mut job.modules {
            module.resolve_paths(base_dir);
            module.validate()?;
        }
        debug!("{}: {} modules", path.display(), job.modules.len());
        Ok(job)
    }

    pub fn module(&self, name: &str) -> Option<&ModuleJob> {
        self.modules.iter().find(|m| m.name == name)
    }
}

impl ModuleJob {
    fn resolve_paths(&mut self, base_dir: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base_dir.join(&*p);
            }
        };
        resolve(&mut self.header);
        if let Some(output) = &mut self.output {
            resolve(output);
        }
        if let Some(prefix) = &mut self.map_prefix {
            resolve(prefix);
        }
        self.include_dirs.iter_mut().for_each(resolve);
    }

    fn validate(&self) -> Result<()> {
        let invalid = |expected| GenError::InvalidSpec {
            kind: "module",
            spec: self.name.clone(),
            expected,
        };
        if self.output.is_none() && self.map_prefix.is_none() {
            return Err(invalid("at least one of output or map_prefix"));
        }
        if self.output.is_some() && self.wrapper_type.is_none() {
            return Err(invalid("wrapper_type when output is set"));
        }
        if self.overrides.values().any(|w| *w == 0) {
            return Err(invalid("positive override widths"));
        }
        Binding::parse_all(&self.pi)?;
        Binding::parse_all(&self.po)?;
        Ok(())
    }

    pub fn include_path(&self) -> String {
        self.include.clone().unwrap_or_else(|| {
            self.header
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        })
    }

    pub fn io_config(&self) -> Result<IoConfig> {
        let widths = self
            .overrides
            .iter()
            .fold(WidthTable::new(), |t, (ty, w)| t.with_override(ty, *w));
        Ok(IoConfig {
            namespace: self.namespace.clone(),
            pi: Binding::parse_all(&self.pi)?,
            po: Binding::parse_all(&self.po)?,
            widths,
        })
    }

    /// Header options, when this module produces a header.
    pub fn header_options(&self) -> Option<HeaderOptions> {
        let wrapper_type = self.wrapper_type.as_deref()?;
        Some(
            HeaderOptions::new(&self.include_path(), wrapper_type)
                .namespace(&self.namespace)
                .out_namespace(&self.out_namespace)
                .io_member(&self.io_member)
                .comb_fn(&self.comb_fn),
        )
    }

    pub fn evaluator(&self) -> CxxEvaluator {
        CxxEvaluator::new(&self.header)
            .namespace(&self.namespace)
            .include_dirs(&self.include_dirs)
            .cxx(&self.cxx)
            .cxxflags(&self.cxxflags)
    }
}
