// Licensed under the Apache-2.0 license

//! Array dimension evaluation.
//!
//! Dimension expressions (`ICACHE_SET_NUM`, `WAYS * 2`, `cfg::LINE_BYTES / 4`,
//! ...) are not evaluated here. They are handed to a [`DimensionEvaluator`];
//! the default one, [`CxxEvaluator`], compiles a small program against the
//! module header with the real C++ toolchain and reads the values back, so
//! the result always agrees with the actual build.

use std::collections::BTreeMap;
use std::fmt::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::{debug, info};

use crate::error::{GenError, Result};

/// Resolved dimension values, keyed by expression text.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DimensionTable {
    values: BTreeMap<String, u64>,
}

impl DimensionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, expr: &str, value: u64) {
        self.values.insert(expr.to_string(), value);
    }

    pub fn with(mut self, expr: &str, value: u64) -> Self {
        self.insert(expr, value);
        self
    }

    pub fn get(&self, expr: &str) -> Option<u64> {
        self.values.get(expr).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Concrete sizes for a field's dimension list.
    pub fn resolve(&self, dims: &[String]) -> Result<Vec<usize>> {
        dims.iter()
            .map(|d| {
                let value = self
                    .get(d)
                    .ok_or_else(|| GenError::Evaluation(format!("no value for dimension `{d}`")))?;
                usize::try_from(value).map_err(|_| {
                    GenError::Evaluation(format!("dimension `{d}` = {value} does not fit in usize"))
                })
            })
            .collect()
    }

    /// Number of scalar instances in an array with these dimensions.
    pub fn element_count(&self, dims: &[String]) -> Result<usize> {
        let sizes = self.resolve(dims)?;
        if sizes.contains(&0) {
            return Ok(0);
        }
        sizes
            .iter()
            .try_fold(1usize, |acc, &n| acc.checked_mul(n))
            .ok_or_else(|| {
                GenError::Evaluation(format!("element count of [{}] overflows", dims.join("][")))
            })
    }
}

/// Resolves dimension expression texts to integers.
pub trait DimensionEvaluator {
    fn evaluate(&self, exprs: &[String]) -> Result<DimensionTable>;
}

/// A fixed table evaluates only the expressions it already knows.
impl DimensionEvaluator for DimensionTable {
    fn evaluate(&self, exprs: &[String]) -> Result<DimensionTable> {
        let mut out = DimensionTable::new();
        let mut missing = Vec::new();
        for expr in exprs {
            match self.get(expr) {
                Some(v) => out.insert(expr, v),
                None => missing.push(expr.as_str()),
            }
        }
        if !missing.is_empty() {
            return Err(GenError::Evaluation(format!(
                "no value for: {}",
                missing.join(", ")
            )));
        }
        Ok(out)
    }
}

/// Evaluates dimension expressions by compiling and running a C++ program.
///
/// # Example
///
/// ```no_run
/// use pipo_generator::{CxxEvaluator, DimensionEvaluator};
///
/// let evaluator = CxxEvaluator::new("mmu/include/tlb_module.h")
///     .namespace("tlb_module_n")
///     .include_dir("include")
///     .cxx("clang++");
/// let dims = evaluator.evaluate(&["TLB_ENTRY_NUM".to_string()]).unwrap();
/// println!("{:?}", dims.get("TLB_ENTRY_NUM"));
/// ```
#[derive(Clone, Debug)]
pub struct CxxEvaluator {
    header: PathBuf,
    namespace: String,
    include_dirs: Vec<PathBuf>,
    cxx: String,
    cxxflags: Vec<String>,
}

pub const DEFAULT_CXX: &str = "g++";

impl CxxEvaluator {
    pub fn new(header: impl Into<PathBuf>) -> Self {
        Self {
            header: header.into(),
            namespace: String::new(),
            include_dirs: Vec::new(),
            cxx: DEFAULT_CXX.to_string(),
            cxxflags: Vec::new(),
        }
    }

    /// Namespace opened with `using namespace` before evaluating.
    pub fn namespace(mut self, namespace: &str) -> Self {
        self.namespace = namespace.to_string();
        self
    }

    pub fn include_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.include_dirs.push(dir.into());
        self
    }

    pub fn include_dirs<P: Into<PathBuf>>(mut self, dirs: impl IntoIterator<Item = P>) -> Self {
        self.include_dirs.extend(dirs.into_iter().map(Into::into));
        self
    }

    pub fn cxx(mut self, cxx: &str) -> Self {
        self.cxx = cxx.to_string();
        self
    }

    pub fn cxxflags<S: Into<String>>(mut self, flags: impl IntoIterator<Item = S>) -> Self {
        self.cxxflags.extend(flags.into_iter().map(Into::into));
        self
    }

    /// Source of the evaluator program.
    ///
    /// Prints one `<index> <value>` line per expression.
    pub fn render_program(&self, exprs: &[String]) -> Result<String> {
        let header = absolute(&self.header)?;
        let mut src = String::new();
        writeln!(src, "#include <cstdint>").unwrap();
        writeln!(src, "#include <iostream>").unwrap();
        writeln!(src, "#include \"{}\"", cpp_escape(&header.to_string_lossy())).unwrap();
        writeln!(src, "int main() {{").unwrap();
        if !self.namespace.is_empty() {
            writeln!(src, "  using namespace {};", self.namespace).unwrap();
        }
        for (i, expr) in exprs.iter().enumerate() {
            writeln!(
                src,
                "  std::cout << {i} << ' ' << static_cast<unsigned long long>(({expr})) << '\\n';"
            )
            .unwrap();
        }
        writeln!(src, "  return 0;").unwrap();
        writeln!(src, "}}").unwrap();
        Ok(src)
    }

    fn compile_command(&self, src: &Path, exe: &Path) -> Command {
        let mut cmd = Command::new(&self.cxx);
        cmd.arg("-std=c++17").arg("-O0").arg(src).arg("-o").arg(exe);
        for dir in &self.include_dirs {
            cmd.arg("-I").arg(dir);
        }
        cmd.args(&self.cxxflags);
        cmd
    }
}

impl DimensionEvaluator for CxxEvaluator {
    fn evaluate(&self, exprs: &[String]) -> Result<DimensionTable> {
        if exprs.is_empty() {
            return Ok(DimensionTable::new());
        }

        let temp_dir = tempfile::Builder::new()
            .prefix("pipo_dims_")
            .tempdir()
            .map_err(|e| GenError::io("failed to create evaluator directory", e))?;
        let src_path = temp_dir.path().join("eval_exprs.cpp");
        let exe_path = temp_dir.path().join("eval_exprs.out");
        std::fs::write(&src_path, self.render_program(exprs)?)
            .map_err(|e| GenError::io(format!("failed to write {}", src_path.display()), e))?;

        let mut compile = self.compile_command(&src_path, &exe_path);
        let command = format!("{compile:?}");
        debug!("evaluating {} dimension expressions: {command}", exprs.len());
        let output = compile.output().map_err(|e| GenError::Compiler {
            command: command.clone(),
            diagnostics: e.to_string(),
        })?;
        if !output.status.success() {
            return Err(GenError::Compiler {
                command,
                diagnostics: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        let run = Command::new(&exe_path)
            .output()
            .map_err(|e| GenError::Evaluation(format!("failed to run evaluator: {e}")))?;
        if !run.status.success() {
            return Err(GenError::Evaluation(format!(
                "evaluator exited with {}:\n{}",
                run.status,
                String::from_utf8_lossy(&run.stderr)
            )));
        }

        let table = parse_output(exprs, &String::from_utf8_lossy(&run.stdout))?;
        info!("resolved {} dimension expressions", table.len());
        Ok(table)
    }
}

/// Parse `<index> <value>` lines printed by the evaluator program.
pub fn parse_output(exprs: &[String], stdout: &str) -> Result<DimensionTable> {
    let mut table = DimensionTable::new();
    for line in stdout.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let malformed = || GenError::Evaluation(format!("malformed evaluator output line `{line}`"));
        let (idx, value) = line.split_once(char::is_whitespace).ok_or_else(malformed)?;
        let idx: usize = idx.parse().map_err(|_| malformed())?;
        let value: u64 = value.trim().parse().map_err(|_| malformed())?;
        let expr = exprs
            .get(idx)
            .ok_or_else(|| GenError::Evaluation(format!("invalid evaluator output index: {idx}")))?;
        table.insert(expr, value);
    }

    let missing: Vec<&str> = exprs
        .iter()
        .filter(|e| table.get(e).is_none())
        .map(String::as_str)
        .collect();
    if !missing.is_empty() {
        return Err(GenError::Evaluation(format!(
            "evaluator produced incomplete output; missing: {}",
            missing.join(", ")
        )));
    }
    Ok(table)
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir()
        .map_err(|e| GenError::io("failed to read current directory", e))?;
    Ok(cwd.join(path))
}

fn cpp_escape(path: &str) -> String {
    path.replace('\\', "\\\\").replace('"', "\\\"")
}
