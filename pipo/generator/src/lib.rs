// Licensed under the Apache-2.0 license

//! PI/PO bit-vector generator for C++ hardware models.
//!
//! Given a module header and an ordered list of `field:Struct` bindings for
//! the primary inputs (PI) and primary outputs (PO), this crate flattens the
//! bound structs into two bit vectors and produces:
//!
//! - a C++ header with `pack_*`/`unpack_*` routines and an `eval_comb`
//!   harness entry point,
//! - CSV bit maps from every bit index to the signal that owns it,
//! - bit-index queries against those maps.
//!
//! ## Usage
//!
//! ```
//! use pipo_generator::{DimensionTable, Generation, HeaderOptions, IoConfig};
//!
//! let header = "namespace m_n { struct In { bool valid; uint32 addr[WAYS]; }; }";
//! let io = IoConfig::new().namespace("m_n").pi("in", "In");
//! let generation = Generation::new(header, io).unwrap();
//!
//! let code = generation
//!     .header(&HeaderOptions::new("m.h", "IO").namespace("m_n"))
//!     .unwrap();
//! assert!(code.contains("static constexpr size_t PI_WIDTH = In_BITS;"));
//!
//! let maps = generation
//!     .bit_maps(&DimensionTable::new().with("WAYS", 4))
//!     .unwrap();
//! assert_eq!(maps.pi.total_width, 1 + 4 * 32);
//! ```
//!
//! ## Module Organization
//!
//! - [`lexer`]: tokenizer for the recognized C++ subset
//! - [`extract`]: struct field extraction ([`StructSet`])
//! - [`width`]: type bit widths ([`WidthTable`])
//! - [`dims`]: array dimension evaluation ([`CxxEvaluator`])
//! - [`layout`]: bit assignment and queries ([`Layout`])
//! - [`emit`]: C++ header generation ([`HeaderOptions`])
//! - [`bitmap`]: CSV tables and query reports ([`BitMaps`])
//! - [`output`]: atomic multi-file writes ([`OutputSet`])
//! - [`config`]: batch job files ([`JobFile`])

pub mod bitmap;
pub mod config;
pub mod dims;
pub mod emit;
pub mod extract;
pub mod layout;
pub mod lexer;
pub mod output;
pub mod width;

mod error;
mod pipeline;

pub use bitmap::{BitMaps, BitQuery};
pub use config::{JobFile, ModuleJob};
pub use dims::{CxxEvaluator, DimensionEvaluator, DimensionTable};
pub use emit::{generate_header, HeaderOptions};
pub use error::{GenError, Result};
pub use extract::{FieldDecl, Header, StructModel, StructSet};
pub use layout::{Binding, Layout, SignalRange, Vector};
pub use output::OutputSet;
pub use pipeline::{map_outputs, map_path, Generation, IoConfig};
pub use width::WidthTable;
