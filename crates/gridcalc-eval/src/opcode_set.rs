//! Textual form of opcode sets: a semicolon-separated list of English
//! symbols or raw decimal opcode values.
//!
//! This is the persisted shape of [`CalcConfig::vector_subset_opcodes`]
//! (which operators/functions the vector engine may evaluate).
//!
//! [`CalcConfig::vector_subset_opcodes`]: crate::calc_config::CalcConfig

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::sync::Arc;

use gridcalc_common::{OpCode, OpCodeSet};

/// Encodes a set as `sym;sym;...` in set (ascending opcode) order. Opcodes
/// without an entry in the English symbol table render as decimal values.
pub fn opcode_set_to_symbolic_string(opcodes: &OpCodeSet) -> String {
    let mut result = String::with_capacity(256);
    for (i, op) in opcodes.iter().enumerate() {
        if i > 0 {
            result.push(';');
        }
        let _ = write!(result, "{op}");
    }
    result
}

/// Decodes a `sym;sym;...` list into an opcode set.
///
/// Empty segments contribute nothing, a segment that parses as a
/// non-negative integer (including the literal `0`) is taken as a raw
/// opcode value before any name lookup, and unknown symbolic names are
/// silently dropped.
///
/// Binary subtraction and unary negation share the `-` display symbol, so
/// whenever the decoded set contains subtraction, negation is inserted as
/// well. The textual form is never expected to carry the negation opcode
/// itself.
pub fn opcode_set_from_symbolic_string(input: &str) -> OpCodeSet {
    let mut result = BTreeSet::new();
    for segment in input.split(';') {
        if segment.is_empty() {
            continue;
        }
        if let Ok(value) = segment.parse::<u16>() {
            result.insert(OpCode(value));
        } else if let Some(op) = OpCode::from_symbol(segment) {
            result.insert(op);
        }
    }
    if result.contains(&OpCode::SUB) {
        result.insert(OpCode::NEG_SUB);
    }
    Arc::new(result)
}
