// Licensed under the Apache-2.0 license

use std::path::PathBuf;
use thiserror::Error;

use crate::layout::Vector;

/// Errors produced while generating PI/PO helpers and bit maps.
///
/// Everything except [`GenError::QueryOutOfRange`] aborts the whole
/// generation run.
#[derive(Error, Debug)]
pub enum GenError {
    #[error("struct not found: {0}")]
    StructNotFound(String),

    #[error("unterminated struct body: {0}")]
    UnterminatedStruct(String),

    #[error("cannot parse field declaration in struct {struct_name}: `{statement};`")]
    BadDeclaration {
        struct_name: String,
        statement: String,
    },

    #[error("unsupported type for bitvector packing: {0}")]
    UnsupportedType(String),

    #[error("type {type_name} is {width} bits wide; packing goes through a 64-bit intermediate")]
    WidthTooLarge { type_name: String, width: usize },

    #[error("failed to evaluate array dimensions with C++ compiler:\ncommand: {command}\n{diagnostics}")]
    Compiler {
        command: String,
        diagnostics: String,
    },

    #[error("dimension evaluator: {0}")]
    Evaluation(String),

    #[error("{vector}:{bit} is out of range (width={width})")]
    QueryOutOfRange {
        vector: Vector,
        bit: i64,
        width: usize,
    },

    #[error("{vector} vector expects {expected} {what} but {actual} were given")]
    ShapeMismatch {
        vector: Vector,
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("struct {0} is bound but was never extracted")]
    UnknownStruct(String),

    #[error("invalid {kind} `{spec}` (expected {expected})")]
    InvalidSpec {
        kind: &'static str,
        spec: String,
        expected: &'static str,
    },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid job file {}: {source}", path.display())]
    JobFile {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl GenError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        GenError::Io {
            context: context.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, GenError>;
