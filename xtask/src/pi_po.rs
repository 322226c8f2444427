// Licensed under the Apache-2.0 license

//! Generate the PI/PO pack/unpack header for one module.

use anyhow::Result;
use log::info;
use pipo_generator::{DimensionTable, Generation, HeaderOptions, OutputSet};
use std::path::Path;

use crate::IoArgs;

pub(crate) struct HeaderArgs<'a> {
    pub include_path: &'a str,
    pub out_namespace: &'a str,
    pub wrapper_type: &'a str,
    pub io_member: &'a str,
    pub comb_fn: &'a str,
}

impl HeaderArgs<'_> {
    fn options(&self, namespace: &str) -> HeaderOptions {
        HeaderOptions::new(self.include_path, self.wrapper_type)
            .namespace(namespace)
            .out_namespace(self.out_namespace)
            .io_member(self.io_member)
            .comb_fn(self.comb_fn)
    }
}

pub(crate) fn generate(io: &IoArgs, args: &HeaderArgs, output: &Path) -> Result<()> {
    let generation = io.generation()?;
    let code = generation.header(&args.options(&io.namespace))?;

    let mut outputs = OutputSet::new();
    outputs.add(output, code);
    outputs.write_all()?;
    println!("{}", output.display());
    match static_widths(&generation)? {
        Some((pi, po)) => {
            println!("PI_WIDTH={pi}");
            println!("PO_WIDTH={po}");
        }
        None => info!("widths depend on array dimensions; pi-po-map evaluates them"),
    }
    Ok(())
}

/// Total PI/PO widths, when no array dimension needs the C++ compiler.
///
/// The generated header keeps widths as `constexpr` sums either way.
fn static_widths(generation: &Generation) -> Result<Option<(usize, usize)>> {
    if !generation.dimension_exprs().is_empty() {
        return Ok(None);
    }
    let maps = generation.bit_maps(&DimensionTable::new())?;
    Ok(Some((maps.pi.total_width, maps.po.total_width)))
}
