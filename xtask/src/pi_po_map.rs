// Licensed under the Apache-2.0 license

//! Generate PI/PO bit maps for one module and answer bit queries.

use anyhow::Result;
use log::warn;
use pipo_generator::{map_outputs, BitMaps, BitQuery, CxxEvaluator};
use std::path::{Path, PathBuf};

use crate::IoArgs;

pub(crate) struct MapArgs<'a> {
    pub out_prefix: &'a Path,
    pub per_bit: bool,
    pub queries: &'a [String],
    pub include_dirs: &'a [PathBuf],
    pub cxx: &'a str,
    pub cxxflags: &'a [String],
}

pub(crate) fn generate(io: &IoArgs, args: &MapArgs) -> Result<()> {
    // Malformed queries are configuration errors, reported before any work.
    let queries = args
        .queries
        .iter()
        .map(|q| q.parse::<BitQuery>())
        .collect::<pipo_generator::Result<Vec<_>>>()?;

    let generation = io.generation()?;
    let evaluator = CxxEvaluator::new(&io.header)
        .namespace(&io.namespace)
        .include_dirs(args.include_dirs)
        .cxx(args.cxx)
        .cxxflags(args.cxxflags);
    let maps = generation.bit_maps(&evaluator)?;

    let outputs = map_outputs(&maps, args.out_prefix, args.per_bit);
    outputs.write_all()?;

    println!("PI_WIDTH={}", maps.pi.total_width);
    println!("PO_WIDTH={}", maps.po.total_width);
    for path in outputs.paths() {
        println!("{}", path.display());
    }
    for line in query_report(&maps, &queries) {
        println!("{line}");
    }
    Ok(())
}

/// One `QUERY` line per query. Out-of-range queries are reported, not fatal.
pub(crate) fn query_report(maps: &BitMaps, queries: &[BitQuery]) -> Vec<String> {
    queries
        .iter()
        .map(|q| {
            if maps.query(q).is_err() {
                warn!(
                    "query {}:{} is out of range (width={})",
                    q.vector,
                    q.index(),
                    maps.layout(q.vector).total_width
                );
            }
            maps.describe(q)
        })
        .collect()
}
