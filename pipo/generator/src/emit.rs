// Licensed under the Apache-2.0 license

//! C++ header generation.
//!
//! ## Generated Code Structure
//!
//! For a module namespace `tlb_module_n` and the default output namespace:
//!
//! ```text
//! #pragma once
//! #include <cstddef>
//! #include <cstdint>
//! #include "tlb_module.h"
//!
//! namespace tlb_module_n {
//! namespace pi_po {
//!
//! static constexpr size_t TLB_in_t_BITS = (1 * 1) + (32 * (TLB_WAYS));
//! inline void pack_TLB_in_t(const tlb_module_n::TLB_in_t &v, bool *bits, size_t &idx) { ... }
//! inline void unpack_TLB_in_t(const bool *bits, size_t &idx, tlb_module_n::TLB_in_t &v) { ... }
//! ...
//! static constexpr size_t PI_WIDTH = TLB_in_t_BITS + TLB_regs_t_BITS;
//! static constexpr size_t PO_WIDTH = TLB_out_t_BITS;
//! inline void pack_pi(const tlb_module_n::TLB_IO_t &io, bool *pi) { ... }
//! ...
//! template <typename ModuleT>
//! inline void eval_comb(ModuleT &module, const bool *pi, bool *po) { ... }
//!
//! } // namespace pi_po
//! } // namespace tlb_module_n
//! ```
//!
//! Pack and unpack visit scalar instances in exactly the order used by
//! [`crate::layout::Layout::build`].

use std::fmt::Write;

use log::debug;

use crate::error::{GenError, Result};
use crate::extract::{FieldDecl, StructModel, StructSet};
use crate::layout::{Binding, Vector};
use crate::width::WidthTable;

const BITS_NAME: &str = "bits";
const IDX_NAME: &str = "idx";

/// Options for the generated header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeaderOptions {
    /// Path used in the `#include` of the module header.
    pub include_path: String,
    /// Namespace owning the structs; empty for the global namespace.
    pub namespace: String,
    /// Namespace of the generated helpers, nested in `namespace`.
    pub out_namespace: String,
    /// Wrapper type holding the bound fields.
    pub wrapper_type: String,
    /// Member of the module holding the wrapper.
    pub io_member: String,
    /// Module member function evaluating one combinational step.
    pub comb_fn: String,
}

pub const DEFAULT_OUT_NAMESPACE: &str = "pi_po";
pub const DEFAULT_IO_MEMBER: &str = "io";
pub const DEFAULT_COMB_FN: &str = "comb";

impl HeaderOptions {
    pub fn new(include_path: &str, wrapper_type: &str) -> Self {
        Self {
            include_path: include_path.to_string(),
            namespace: String::new(),
            out_namespace: DEFAULT_OUT_NAMESPACE.to_string(),
            wrapper_type: wrapper_type.to_string(),
            io_member: DEFAULT_IO_MEMBER.to_string(),
            comb_fn: DEFAULT_COMB_FN.to_string(),
        }
    }

    pub fn namespace(mut self, namespace: &str) -> Self {
        self.namespace = namespace.to_string();
        self
    }

    pub fn out_namespace(mut self, out_namespace: &str) -> Self {
        self.out_namespace = out_namespace.to_string();
        self
    }

    pub fn io_member(mut self, io_member: &str) -> Self {
        self.io_member = io_member.to_string();
        self
    }

    pub fn comb_fn(mut self, comb_fn: &str) -> Self {
        self.comb_fn = comb_fn.to_string();
        self
    }

    /// Qualify a type with the owning namespace unless it already is.
    fn qualified(&self, type_name: &str) -> String {
        if self.namespace.is_empty() || type_name.contains("::") {
            type_name.to_string()
        } else {
            format!("{}::{}", self.namespace, type_name)
        }
    }
}

/// Generate the complete PI/PO header.
///
/// Structs are emitted in `structs` order; PI and PO helpers follow the
/// binding order.
pub fn generate_header(
    opts: &HeaderOptions,
    structs: &StructSet,
    pi: &[Binding],
    po: &[Binding],
    widths: &WidthTable,
) -> Result<String> {
    if let Some(missing) = pi
        .iter()
        .chain(po)
        .find(|b| structs.get(&b.struct_name).is_none())
    {
        return Err(GenError::UnknownStruct(missing.struct_name.clone()));
    }

    let mut output = String::new();
    writeln!(output, "#pragma once").unwrap();
    writeln!(output, "#include <cstddef>").unwrap();
    writeln!(output, "#include <cstdint>").unwrap();
    writeln!(output, "#include \"{}\"", opts.include_path).unwrap();
    writeln!(output).unwrap();

    if !opts.namespace.is_empty() {
        writeln!(output, "namespace {} {{", opts.namespace).unwrap();
    }
    writeln!(output, "namespace {} {{", opts.out_namespace).unwrap();
    writeln!(output).unwrap();

    for model in structs.iter() {
        generate_struct(&mut output, opts, model, widths)?;
    }

    for (vector, bindings) in [(Vector::Pi, pi), (Vector::Po, po)] {
        let terms: Vec<String> = bindings
            .iter()
            .map(|b| format!("{}_BITS", b.struct_name))
            .collect();
        let sum = if terms.is_empty() {
            "0".to_string()
        } else {
            terms.join(" + ")
        };
        writeln!(
            output,
            "static constexpr size_t {}_WIDTH = {sum};",
            vector.as_str().to_uppercase()
        )
        .unwrap();
    }
    writeln!(output).unwrap();

    for (vector, bindings) in [(Vector::Pi, pi), (Vector::Po, po)] {
        generate_vector_helpers(&mut output, opts, vector, bindings);
    }
    generate_comb_helpers(&mut output, opts);

    writeln!(output, "}} // namespace {}", opts.out_namespace).unwrap();
    if !opts.namespace.is_empty() {
        writeln!(output, "}} // namespace {}", opts.namespace).unwrap();
    }

    debug!(
        "generated header for {} structs ({} bytes)",
        structs.len(),
        output.len()
    );
    Ok(output)
}

/// `<Struct>_BITS` plus the `pack_`/`unpack_` pair for one struct.
fn generate_struct(
    output: &mut String,
    opts: &HeaderOptions,
    model: &StructModel,
    widths: &WidthTable,
) -> Result<()> {
    let mut bits_terms = Vec::new();
    let mut pack = String::new();
    let mut unpack = String::new();
    for field in &model.fields {
        let width = widths.width_of(&field.type_name)?;
        let is_bool_bit = width == 1 && field.type_name == "bool";
        if width > 64 && !is_bool_bit {
            return Err(GenError::WidthTooLarge {
                type_name: field.type_name.clone(),
                width,
            });
        }
        bits_terms.push(format!("({width} * {})", dim_product(&field.dims)));
        emit_field(&mut pack, field, |access| pack_scalar(is_bool_bit, width, access));
        emit_field(&mut unpack, field, |access| {
            unpack_scalar(is_bool_bit, width, &field.type_name, access)
        });
    }

    let name = &model.name;
    let qualified = opts.qualified(name);
    let bits_expr = if bits_terms.is_empty() {
        "0".to_string()
    } else {
        bits_terms.join(" + ")
    };
    writeln!(output, "static constexpr size_t {name}_BITS = {bits_expr};").unwrap();
    writeln!(
        output,
        "inline void pack_{name}(const {qualified} &v, bool *{BITS_NAME}, size_t &{IDX_NAME}) {{"
    )
    .unwrap();
    write!(output, "{pack}").unwrap();
    writeln!(output, "}}").unwrap();
    writeln!(output).unwrap();
    writeln!(
        output,
        "inline void unpack_{name}(const bool *{BITS_NAME}, size_t &{IDX_NAME}, {qualified} &v) {{"
    )
    .unwrap();
    write!(output, "{unpack}").unwrap();
    writeln!(output, "}}").unwrap();
    writeln!(output).unwrap();
    Ok(())
}

/// `1` for scalars, otherwise `(d0) * (d1) * ...`.
fn dim_product(dims: &[String]) -> String {
    if dims.is_empty() {
        return "1".to_string();
    }
    dims.iter()
        .map(|d| format!("({d})"))
        .collect::<Vec<_>>()
        .join(" * ")
}

/// Wrap the per-scalar statement in one loop per dimension.
///
/// Loop variables are `i0, i1, ...` from the outermost dimension inwards, so
/// the last dimension varies fastest.
fn emit_field(out: &mut String, field: &FieldDecl, scalar: impl Fn(&str) -> String) {
    let mut access = format!("v.{}", field.name);
    let mut indent = String::from("  ");
    for (depth, dim) in field.dims.iter().enumerate() {
        writeln!(
            out,
            "{indent}for (size_t i{depth} = 0; i{depth} < ({dim}); ++i{depth}) {{"
        )
        .unwrap();
        write!(access, "[i{depth}]").unwrap();
        indent.push_str("  ");
    }
    writeln!(out, "{indent}{}", scalar(&access)).unwrap();
    for _ in &field.dims {
        indent.truncate(indent.len() - 2);
        writeln!(out, "{indent}}}").unwrap();
    }
}

fn pack_scalar(is_bool_bit: bool, width: usize, access: &str) -> String {
    if is_bool_bit {
        return format!("{BITS_NAME}[{IDX_NAME}++] = {access};");
    }
    format!(
        "for (size_t b = 0; b < {width}; ++b) {{ {BITS_NAME}[{IDX_NAME}++] = ((static_cast<uint64_t>({access}) >> b) & 1u) != 0; }}"
    )
}

fn unpack_scalar(is_bool_bit: bool, width: usize, type_name: &str, access: &str) -> String {
    if is_bool_bit {
        return format!("{access} = {BITS_NAME}[{IDX_NAME}++];");
    }
    format!(
        "{{ uint64_t tmp = 0; for (size_t b = 0; b < {width}; ++b) {{ if ({BITS_NAME}[{IDX_NAME}++]) tmp |= (uint64_t(1) << b); }} {access} = static_cast<{type_name}>(tmp); }}"
    )
}

/// `pack_<vec>` / `unpack_<vec>` over the wrapper type.
fn generate_vector_helpers(
    output: &mut String,
    opts: &HeaderOptions,
    vector: Vector,
    bindings: &[Binding],
) {
    let vec = vector.as_str();
    let wrapper = opts.qualified(&opts.wrapper_type);

    writeln!(output, "inline void pack_{vec}(const {wrapper} &io, bool *{vec}) {{").unwrap();
    writeln!(output, "  size_t idx = 0;").unwrap();
    for b in bindings {
        writeln!(
            output,
            "  pack_{}(io.{}, {vec}, idx);",
            b.struct_name, b.wrapper_field
        )
        .unwrap();
    }
    writeln!(output, "}}").unwrap();
    writeln!(output).unwrap();

    writeln!(output, "inline void unpack_{vec}(const bool *{vec}, {wrapper} &io) {{").unwrap();
    writeln!(output, "  size_t idx = 0;").unwrap();
    for b in bindings {
        writeln!(
            output,
            "  unpack_{}({vec}, idx, io.{});",
            b.struct_name, b.wrapper_field
        )
        .unwrap();
    }
    writeln!(output, "}}").unwrap();
    writeln!(output).unwrap();
}

/// Directional helpers and the `eval_comb` harness entry point.
fn generate_comb_helpers(output: &mut String, opts: &HeaderOptions) {
    let wrapper = opts.qualified(&opts.wrapper_type);
    let io = &opts.io_member;
    let comb = &opts.comb_fn;

    writeln!(output, "inline void pi_to_inputs(const bool *pi, {wrapper} &io) {{").unwrap();
    writeln!(output, "  unpack_pi(pi, io);").unwrap();
    writeln!(output, "}}").unwrap();
    writeln!(output).unwrap();

    writeln!(output, "inline void outputs_to_po(const {wrapper} &io, bool *po) {{").unwrap();
    writeln!(output, "  pack_po(io, po);").unwrap();
    writeln!(output, "}}").unwrap();
    writeln!(output).unwrap();

    writeln!(output, "template <typename ModuleT>").unwrap();
    writeln!(
        output,
        "inline void eval_comb(ModuleT &module, const bool *pi, bool *po) {{"
    )
    .unwrap();
    writeln!(output, "  unpack_pi(pi, module.{io});").unwrap();
    writeln!(output, "  module.{comb}();").unwrap();
    writeln!(output, "  pack_po(module.{io}, po);").unwrap();
    writeln!(output, "}}").unwrap();
    writeln!(output).unwrap();
}
