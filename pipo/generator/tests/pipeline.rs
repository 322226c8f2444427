// Licensed under the Apache-2.0 license

mod common;

use log::LevelFilter;
use pipo_generator::bitmap::{bit_table_csv, range_table_csv};
use pipo_generator::{BitQuery, DimensionTable, GenError, Generation, HeaderOptions, Layout, Vector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use simple_logger::SimpleLogger;

use common::{tlb_header_path, tlb_io, NAMESPACE};

fn dims() -> DimensionTable {
    DimensionTable::new().with("TLB_SETS", 2).with("TLB_WAYS", 4)
}

fn generation() -> Generation {
    let _ = SimpleLogger::new().with_level(LevelFilter::Info).init();
    Generation::from_header_file(&tlb_header_path(), tlb_io()).unwrap()
}

fn assert_partition(layout: &Layout) {
    let mut next = 0;
    for r in &layout.ranges {
        assert_eq!(r.bit_lsb, next);
        assert_eq!(r.bit_msb - r.bit_lsb + 1, r.width);
        next = r.bit_msb + 1;
    }
    assert_eq!(next, layout.total_width);
}

#[test]
fn test_tlb_widths() {
    let generation = generation();
    assert_eq!(generation.dimension_exprs(), ["TLB_SETS", "TLB_WAYS"]);

    let maps = generation.bit_maps(&dims()).unwrap();
    // in: 1 + 32 + 2; regs: 8 * 1 + 8 * 20 + 2 * 8
    assert_eq!(maps.pi.total_width, 35 + 184);
    // out: 1 + 32 + 6
    assert_eq!(maps.po.total_width, 39 + 184);
    assert_partition(&maps.pi);
    assert_partition(&maps.po);

    let widths = &generation.io().widths;
    for (vector, bindings) in [
        (Vector::Pi, &generation.io().pi),
        (Vector::Po, &generation.io().po),
    ] {
        let sum: usize = bindings
            .iter()
            .map(|b| {
                generation
                    .structs()
                    .get(&b.struct_name)
                    .unwrap()
                    .bit_count(widths, &dims())
                    .unwrap()
            })
            .sum();
        assert_eq!(sum, maps.layout(vector).total_width);
    }
}

#[test]
fn test_tlb_signal_order() {
    let maps = generation().bit_maps(&dims()).unwrap();
    let signals: Vec<_> = maps.pi.ranges.iter().map(|r| r.signal.as_str()).collect();
    assert_eq!(
        &signals[..5],
        [
            "in.valid",
            "in.vaddr",
            "in.op",
            "regs.entry_valid[0][0]",
            "regs.entry_valid[0][1]"
        ]
    );
    assert_eq!(signals[3 + 4], "regs.entry_valid[1][0]");
    assert_eq!(signals.last(), Some(&"regs.lru[1]"));

    let po: Vec<_> = maps.po.ranges.iter().map(|r| r.signal.as_str()).collect();
    assert_eq!(
        &po[..4],
        [
            "out.hit",
            "out.paddr",
            "out.fault_code",
            "reg_write.entry_valid[0][0]"
        ]
    );
}

#[test]
fn test_tlb_queries() {
    let maps = generation().bit_maps(&dims()).unwrap();
    let q = |s: &str| maps.describe(&s.parse::<BitQuery>().unwrap());
    assert_eq!(
        q("pi:34"),
        "QUERY pi:34 -> in.op[1] (range=33:34, type=wire2_t, width=2)"
    );
    // in (35) + entry_valid (8) + vpn[0][0] (20) puts vpn[0][1] at 63.
    assert_eq!(
        q("pi:63"),
        "QUERY pi:63 -> regs.vpn[0][1][0] (range=63:82, type=wire20_t, width=20)"
    );
    assert_eq!(
        q("po:38"),
        "QUERY po:38 -> out.fault_code[5] (range=33:38, type=uint16, width=6)"
    );
    assert_eq!(q("po:223"), "QUERY po:223 -> out_of_range (width=223)");
    assert_eq!(q("pi:-1"), "QUERY pi:-1 -> out_of_range (width=219)");

    for bit in 0..maps.po.total_width {
        let hit = maps.po.query(bit as i64).unwrap();
        assert!(hit.contains(bit));
    }
}

#[test]
fn test_tlb_header() {
    let opts = HeaderOptions::new("tlb_module.h", "TLB_IO_t")
        .namespace(NAMESPACE)
        .out_namespace("tlb_pi_po");
    let code = generation().header(&opts).unwrap();

    assert!(code.contains("namespace tlb_module_n {\nnamespace tlb_pi_po {\n"));
    assert!(code.contains(
        "static constexpr size_t TLB_regs_t_BITS = (1 * (TLB_SETS) * (TLB_WAYS)) + (20 * (TLB_SETS) * (TLB_WAYS)) + (8 * (TLB_SETS));\n"
    ));
    assert!(code.contains("static constexpr size_t PI_WIDTH = TLB_in_t_BITS + TLB_regs_t_BITS;\n"));
    assert!(code.contains("static constexpr size_t PO_WIDTH = TLB_out_t_BITS + TLB_regs_t_BITS;\n"));
    assert!(code.contains("  pack_TLB_regs_t(io.reg_write, po, idx);\n"));
    assert_eq!(code.matches("inline void pack_TLB_regs_t(").count(), 1);
    assert!(code.ends_with("} // namespace tlb_pi_po\n} // namespace tlb_module_n\n"));
}

#[test]
fn test_outputs_are_deterministic() {
    let opts = HeaderOptions::new("tlb_module.h", "TLB_IO_t").namespace(NAMESPACE);
    let a = generation();
    let b = generation();
    assert_eq!(a.header(&opts).unwrap(), b.header(&opts).unwrap());

    let (ma, mb) = (a.bit_maps(&dims()).unwrap(), b.bit_maps(&dims()).unwrap());
    for vector in Vector::ALL {
        assert_eq!(
            range_table_csv(ma.layout(vector)),
            range_table_csv(mb.layout(vector))
        );
        assert_eq!(
            bit_table_csv(ma.layout(vector)),
            bit_table_csv(mb.layout(vector))
        );
    }
}

#[test]
fn test_random_bits_round_trip() {
    let maps = generation().bit_maps(&dims()).unwrap();
    let mut rng = StdRng::seed_from_u64(0x7115);
    for layout in [&maps.pi, &maps.po] {
        for _ in 0..32 {
            let bits: Vec<bool> = (0..layout.total_width).map(|_| rng.gen()).collect();
            let values = layout.unpack(&bits).unwrap();
            assert_eq!(layout.pack(&values).unwrap(), bits);
        }
    }
}

#[test]
fn test_random_values_truncate_to_width() {
    let maps = generation().bit_maps(&dims()).unwrap();
    let mut rng = StdRng::seed_from_u64(42);
    let values: Vec<u64> = maps.po.ranges.iter().map(|_| rng.gen()).collect();
    let unpacked = maps.po.unpack(&maps.po.pack(&values).unwrap()).unwrap();
    for ((range, original), back) in maps.po.ranges.iter().zip(&values).zip(&unpacked) {
        let mask = if range.width >= 64 {
            u64::MAX
        } else {
            (1u64 << range.width) - 1
        };
        assert_eq!(*back, original & mask, "{}", range.signal);
    }
}

#[test]
fn test_missing_dimension_is_fatal() {
    let err = generation()
        .bit_maps(&DimensionTable::new().with("TLB_SETS", 2))
        .unwrap_err();
    assert!(matches!(err, GenError::Evaluation(ref m) if m.contains("TLB_WAYS")));
}
