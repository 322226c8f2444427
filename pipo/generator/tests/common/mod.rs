// Licensed under the Apache-2.0 license

use std::path::PathBuf;

use pipo_generator::{IoConfig, WidthTable};

pub const NAMESPACE: &str = "tlb_module_n";

pub fn tlb_header_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data/tlb_module.h")
}

pub fn tlb_io() -> IoConfig {
    IoConfig::new()
        .namespace(NAMESPACE)
        .pi("in", "TLB_in_t")
        .pi("regs", "TLB_regs_t")
        .po("out", "TLB_out_t")
        .po("reg_write", "TLB_regs_t")
        .widths(WidthTable::new())
}
