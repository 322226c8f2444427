// Licensed under the Apache-2.0 license

//! PI/PO bit maps: CSV tables and bit-index queries.

use std::fmt::Write;
use std::str::FromStr;

use crate::error::{GenError, Result};
use crate::layout::{Layout, SignalRange, Vector};

pub const RANGE_COLUMNS: [&str; 8] = [
    "vector",
    "bit_lsb",
    "bit_msb",
    "width",
    "wrapper_field",
    "struct_name",
    "signal",
    "type_name",
];

pub const BIT_COLUMNS: [&str; 8] = [
    "vector",
    "bit",
    "signal",
    "signal_bit",
    "width",
    "wrapper_field",
    "struct_name",
    "type_name",
];

/// One row per scalar instance.
pub fn range_table_csv(layout: &Layout) -> String {
    let mut output = String::new();
    write_row(&mut output, &RANGE_COLUMNS);
    for r in &layout.ranges {
        write_row(
            &mut output,
            &[
                r.vector.as_str(),
                r.bit_lsb.to_string().as_str(),
                r.bit_msb.to_string().as_str(),
                r.width.to_string().as_str(),
                r.wrapper_field.as_str(),
                r.struct_name.as_str(),
                r.signal.as_str(),
                r.type_name.as_str(),
            ],
        );
    }
    output
}

/// One row per bit.
pub fn bit_table_csv(layout: &Layout) -> String {
    let mut output = String::new();
    write_row(&mut output, &BIT_COLUMNS);
    for r in &layout.ranges {
        let width = r.width.to_string();
        for bit in r.bit_lsb..=r.bit_msb {
            write_row(
                &mut output,
                &[
                    r.vector.as_str(),
                    bit.to_string().as_str(),
                    r.signal.as_str(),
                    (bit - r.bit_lsb).to_string().as_str(),
                    width.as_str(),
                    r.wrapper_field.as_str(),
                    r.struct_name.as_str(),
                    r.type_name.as_str(),
                ],
            );
        }
    }
    output
}

fn write_row(output: &mut String, cells: &[&str]) {
    for (i, cell) in cells.iter().enumerate() {
        if i > 0 {
            output.push(',');
        }
        if cell.contains([',', '"', '\n', '\r']) {
            write!(output, "\"{}\"", cell.replace('"', "\"\"")).unwrap();
        } else {
            output.push_str(cell);
        }
    }
    output.push('\n');
}

/// A `pi:K` / `po:K` bit query.
///
/// Any integer index is accepted. Indices beyond the `i64` range saturate,
/// which keeps them out of range, and the text as written is kept for the
/// report line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BitQuery {
    pub vector: Vector,
    pub bit: i64,
    index: String,
}

impl BitQuery {
    pub fn new(vector: Vector, bit: i64) -> Self {
        Self {
            vector,
            bit,
            index: bit.to_string(),
        }
    }

    /// The bit index as written in the query.
    pub fn index(&self) -> &str {
        &self.index
    }
}

impl FromStr for BitQuery {
    type Err = GenError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || GenError::InvalidSpec {
            kind: "query",
            spec: s.to_string(),
            expected: "pi:K or po:K",
        };
        let (vector, index) = s.split_once(':').ok_or_else(invalid)?;
        let vector = vector.parse().map_err(|_| invalid())?;
        let index = index.trim();
        let (negative, digits) = match index.as_bytes().first() {
            Some(b'-') => (true, &index[1..]),
            Some(b'+') => (false, &index[1..]),
            _ => (false, index),
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let bit = index.parse::<i64>().unwrap_or(if negative { i64::MIN } else { i64::MAX });
        Ok(BitQuery {
            vector,
            bit,
            index: index.to_string(),
        })
    }
}

/// Both vector layouts of one module.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BitMaps {
    pub pi: Layout,
    pub po: Layout,
}

impl BitMaps {
    pub fn layout(&self, vector: Vector) -> &Layout {
        match vector {
            Vector::Pi => &self.pi,
            Vector::Po => &self.po,
        }
    }

    pub fn query(&self, query: &BitQuery) -> Result<&SignalRange> {
        self.layout(query.vector).query(query.bit)
    }

    /// Render the report line for one query.
    ///
    /// ```text
    /// QUERY pi:40 -> x.b[1][7] (range=33:64, type=uint32, width=32)
    /// QUERY pi:65 -> out_of_range (width=65)
    /// ```
    pub fn describe(&self, query: &BitQuery) -> String {
        let (vector, index) = (query.vector, query.index());
        match self.query(query) {
            Ok(hit) => format!(
                "QUERY {vector}:{index} -> {}[{}] (range={}:{}, type={}, width={})",
                hit.signal,
                query.bit - hit.bit_lsb as i64,
                hit.bit_lsb,
                hit.bit_msb,
                hit.type_name,
                hit.width
            ),
            Err(_) => format!(
                "QUERY {vector}:{index} -> out_of_range (width={})",
                self.layout(vector).total_width
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dims::DimensionTable;
    use crate::extract::{Header, StructSet};
    use crate::layout::Binding;
    use crate::width::WidthTable;

    fn maps() -> BitMaps {
        let header = Header::parse("struct S { bool a; uint32 b[2]; }; struct O { wire3_t o; };");
        let structs = StructSet::extract(&header, ["S", "O"]).unwrap();
        let widths = WidthTable::new();
        let dims = DimensionTable::new().with("2", 2);
        let build = |vector, binding| {
            Layout::build(vector, &[binding], &structs, &widths, &dims).unwrap()
        };
        let pi = build(Vector::Pi, Binding::new("x", "S"));
        let po = build(Vector::Po, Binding::new("out", "O"));
        BitMaps { pi, po }
    }

    #[test]
    fn test_range_table() {
        let maps = maps();
        assert_eq!(
            range_table_csv(&maps.pi),
            "vector,bit_lsb,bit_msb,width,wrapper_field,struct_name,signal,type_name\n\
             pi,0,0,1,x,S,x.a,bool\n\
             pi,1,32,32,x,S,x.b[0],uint32\n\
             pi,33,64,32,x,S,x.b[1],uint32\n"
        );
    }

    #[test]
    fn test_bit_table() {
        let maps = maps();
        let csv = bit_table_csv(&maps.po);
        assert_eq!(
            csv,
            "vector,bit,signal,signal_bit,width,wrapper_field,struct_name,type_name\n\
             po,0,out.o,0,3,out,O,wire3_t\n\
             po,1,out.o,1,3,out,O,wire3_t\n\
             po,2,out.o,2,3,out,O,wire3_t\n"
        );
        assert_eq!(bit_table_csv(&maps.pi).lines().count(), 1 + 65);
    }

    #[test]
    fn test_empty_layout_has_header_only() {
        let empty = Layout {
            vector: Vector::Po,
            ranges: Vec::new(),
            total_width: 0,
        };
        assert_eq!(range_table_csv(&empty).lines().count(), 1);
        assert_eq!(bit_table_csv(&empty).lines().count(), 1);
    }

    #[test]
    fn test_csv_quoting() {
        let mut row = String::new();
        write_row(&mut row, &["a,b", "say \"hi\"", "plain"]);
        assert_eq!(row, "\"a,b\",\"say \"\"hi\"\"\",plain\n");
    }

    #[test]
    fn test_describe() {
        let maps = maps();
        let q = |s: &str| s.parse::<BitQuery>().unwrap();
        assert_eq!(
            maps.describe(&q("pi:40")),
            "QUERY pi:40 -> x.b[1][7] (range=33:64, type=uint32, width=32)"
        );
        assert_eq!(
            maps.describe(&q("PI:0")),
            "QUERY pi:0 -> x.a[0] (range=0:0, type=bool, width=1)"
        );
        assert_eq!(
            maps.describe(&q("pi:65")),
            "QUERY pi:65 -> out_of_range (width=65)"
        );
        assert_eq!(
            maps.describe(&q("po:-1")),
            "QUERY po:-1 -> out_of_range (width=3)"
        );
        assert!(matches!(
            maps.query(&q("po:3")),
            Err(GenError::QueryOutOfRange { width: 3, .. })
        ));
    }

    #[test]
    fn test_huge_query_index_is_out_of_range() {
        let maps = maps();
        let huge: BitQuery = "pi:99999999999999999999".parse().unwrap();
        assert_eq!(huge.bit, i64::MAX);
        assert_eq!(huge.index(), "99999999999999999999");
        assert!(matches!(
            maps.query(&huge),
            Err(GenError::QueryOutOfRange { width: 65, .. })
        ));
        assert_eq!(
            maps.describe(&huge),
            "QUERY pi:99999999999999999999 -> out_of_range (width=65)"
        );

        let tiny: BitQuery = "po:-99999999999999999999".parse().unwrap();
        assert_eq!(tiny.bit, i64::MIN);
        assert_eq!(
            maps.describe(&tiny),
            "QUERY po:-99999999999999999999 -> out_of_range (width=3)"
        );
    }

    #[test]
    fn test_parse_query() {
        assert_eq!(
            " po : 12 ".parse::<BitQuery>().unwrap(),
            BitQuery::new(Vector::Po, 12)
        );
        for bad in ["pi", "px:1", "pi:", "pi:x", "pi:1.5", "pi:-", "pi:--1", "pi:1e3"] {
            assert!(
                matches!(bad.parse::<BitQuery>(), Err(GenError::InvalidSpec { kind: "query", .. })),
                "{bad}"
            );
        }
    }
}
