// Licensed under the Apache-2.0 license

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::LevelFilter;
use pipo_generator::{Generation, IoConfig};
use simple_logger::SimpleLogger;
use std::path::PathBuf;

mod pi_po;
mod pi_po_all;
mod pi_po_map;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Xtask {
    /// Increase log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    xtask: XTask,
}

/// Struct selection shared by the single-module commands.
#[derive(clap::Args, Debug)]
struct IoArgs {
    /// Module header containing the structs
    #[arg(long, value_name = "FILE")]
    header: PathBuf,

    /// Namespace owning the structs (e.g. icache_module_n)
    #[arg(long, default_value = "")]
    namespace: String,

    /// PI field spec field:StructName (repeatable, in order)
    #[arg(long = "pi-field", value_name = "FIELD:STRUCT")]
    pi_fields: Vec<String>,

    /// PO field spec field:StructName (repeatable, in order)
    #[arg(long = "po-field", value_name = "FIELD:STRUCT")]
    po_fields: Vec<String>,

    /// Type width override Type=Width (repeatable)
    #[arg(long = "override", value_name = "TYPE=WIDTH")]
    overrides: Vec<String>,
}

impl IoArgs {
    fn generation(&self) -> Result<Generation> {
        let io = IoConfig::from_specs(
            &self.namespace,
            &self.pi_fields,
            &self.po_fields,
            &self.overrides,
        )?;
        Generation::from_header_file(&self.header, io)
            .with_context(|| format!("failed to process {}", self.header.display()))
    }
}

#[derive(Subcommand)]
enum XTask {
    /// Generate the PI/PO pack/unpack C++ header for a module
    ///
    /// Total widths are printed only when no array dimension needs the C++
    /// compiler; pi-po-map always reports them.
    PiPo {
        #[command(flatten)]
        io: IoArgs,

        /// Include path used in the generated header
        #[arg(long = "include", value_name = "PATH")]
        include_path: String,

        /// Namespace for the generated helpers, nested in --namespace
        #[arg(long, default_value = pipo_generator::emit::DEFAULT_OUT_NAMESPACE)]
        out_namespace: String,

        /// Wrapper struct type owning the bound fields (e.g. ICache_IO_t)
        #[arg(long)]
        wrapper_type: String,

        /// Module member holding the wrapper
        #[arg(long, default_value = pipo_generator::emit::DEFAULT_IO_MEMBER)]
        io_member: String,

        /// Module member function running one combinational step
        #[arg(long, default_value = pipo_generator::emit::DEFAULT_COMB_FN)]
        comb_fn: String,

        /// Output header path
        #[arg(long, value_name = "FILE")]
        output: PathBuf,
    },

    /// Generate PI/PO bit map CSV files and answer bit queries
    PiPoMap {
        #[command(flatten)]
        io: IoArgs,

        /// Output prefix; writes <prefix>_pi_map.csv and <prefix>_po_map.csv
        #[arg(long, value_name = "PREFIX")]
        out_prefix: PathBuf,

        /// Also write <prefix>_pi_bits.csv and <prefix>_po_bits.csv
        #[arg(long)]
        emit_per_bit_csv: bool,

        /// Bit query pi:K or po:K (repeatable)
        #[arg(long = "query", value_name = "VEC:BIT")]
        queries: Vec<String>,

        /// Additional include directory for dimension evaluation
        #[arg(long = "include-dir", value_name = "DIR")]
        include_dirs: Vec<PathBuf>,

        /// C++ compiler used to evaluate array dimensions
        #[arg(long, default_value = pipo_generator::dims::DEFAULT_CXX, env = "CXX")]
        cxx: String,

        /// Extra flag for the evaluator compile (repeatable)
        #[arg(long = "cxxflag", value_name = "FLAG", allow_hyphen_values = true)]
        cxxflags: Vec<String>,
    },

    /// Generate headers and bit maps for every module in a job file
    PiPoAll {
        /// TOML job file
        #[arg(long, value_name = "FILE")]
        jobs: PathBuf,

        /// Only generate the named module (repeatable)
        #[arg(long = "module", value_name = "NAME")]
        modules: Vec<String>,

        /// Generate everything in memory without writing files
        #[arg(long)]
        check: bool,
    },
}

fn main() {
    let cli = Xtask::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let _ = SimpleLogger::new().with_level(level).init();

    let result = match &cli.xtask {
        XTask::PiPo {
            io,
            include_path,
            out_namespace,
            wrapper_type,
            io_member,
            comb_fn,
            output,
        } => pi_po::generate(
            io,
            &pi_po::HeaderArgs {
                include_path,
                out_namespace,
                wrapper_type,
                io_member,
                comb_fn,
            },
            output,
        ),
        XTask::PiPoMap {
            io,
            out_prefix,
            emit_per_bit_csv,
            queries,
            include_dirs,
            cxx,
            cxxflags,
        } => pi_po_map::generate(
            io,
            &pi_po_map::MapArgs {
                out_prefix,
                per_bit: *emit_per_bit_csv,
                queries,
                include_dirs,
                cxx,
                cxxflags,
            },
        ),
        XTask::PiPoAll {
            jobs,
            modules,
            check,
        } => pi_po_all::generate(jobs, modules, *check),
    };
    result.unwrap_or_else(|e| {
        eprintln!("{:#}", e);
        std::process::exit(1);
    });
}
