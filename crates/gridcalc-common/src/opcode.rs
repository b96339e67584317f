//! Internal numeric identifiers for formula operators and functions, plus
//! the fixed English symbol table used wherever opcode lists are serialized.
//!
//! The symbol table is deliberately locale-independent: persisted opcode
//! lists must mean the same thing no matter which UI language produced them.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;

/// Internal numeric identifier for a formula operator or function.
///
/// Known operators and functions have associated constants below, but any
/// `u16` is a representable opcode: persisted opcode lists may name opcodes
/// by raw number, including ones this build does not know about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OpCode(pub u16);

/// A de-duplicated, ordered set of opcodes.
///
/// Sets are immutable after construction and shared by reference count;
/// consumers that need a different set build a new one.
pub type OpCodeSet = Arc<BTreeSet<OpCode>>;

impl OpCode {
    // Binary operators.
    pub const ADD: OpCode = OpCode(1);
    pub const SUB: OpCode = OpCode(2);
    pub const MUL: OpCode = OpCode(3);
    pub const DIV: OpCode = OpCode(4);
    pub const POW: OpCode = OpCode(5);
    pub const AMP: OpCode = OpCode(6);
    pub const EQUAL: OpCode = OpCode(7);
    pub const NOT_EQUAL: OpCode = OpCode(8);
    pub const LESS: OpCode = OpCode(9);
    pub const GREATER: OpCode = OpCode(10);
    pub const LESS_EQUAL: OpCode = OpCode(11);
    pub const GREATER_EQUAL: OpCode = OpCode(12);

    // Unary operators. NEG_SUB shares the `-` display symbol with SUB but is
    // a distinct operation; see `OpCode::from_symbol`.
    pub const NEG_SUB: OpCode = OpCode(13);
    pub const PERCENT: OpCode = OpCode(14);

    // Functions.
    pub const SUM: OpCode = OpCode(30);
    pub const AVERAGE: OpCode = OpCode(31);
    pub const MIN: OpCode = OpCode(32);
    pub const MAX: OpCode = OpCode(33);
    pub const COUNT: OpCode = OpCode(34);
    pub const PRODUCT: OpCode = OpCode(35);
    pub const SUM_PRODUCT: OpCode = OpCode(36);
    pub const IF: OpCode = OpCode(37);
    pub const AND: OpCode = OpCode(38);
    pub const OR: OpCode = OpCode(39);
    pub const NOT: OpCode = OpCode(40);
    pub const ABS: OpCode = OpCode(41);
    pub const SQRT: OpCode = OpCode(42);
    pub const EXP: OpCode = OpCode(43);
    pub const LN: OpCode = OpCode(44);
    pub const POWER: OpCode = OpCode(45);

    /// English symbol for this opcode, or `None` for opcodes outside the
    /// known table.
    pub fn symbol(self) -> Option<&'static str> {
        SYMBOLS.iter().find(|(op, _)| *op == self).map(|(_, s)| *s)
    }

    /// Reverse lookup in the English symbol table.
    ///
    /// `-` resolves to the binary subtraction opcode; unary negation is
    /// never produced by symbol lookup (the two share a display symbol, and
    /// consumers that care apply the alias themselves).
    pub fn from_symbol(sym: &str) -> Option<OpCode> {
        SYMBOL_MAP.get(sym).copied()
    }

    /// Raw numeric value.
    pub fn value(self) -> u16 {
        self.0
    }
}

/// Renders the English symbol where one exists, the decimal value otherwise.
impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.symbol() {
            Some(sym) => f.write_str(sym),
            None => write!(f, "{}", self.0),
        }
    }
}

/// Opcode → English symbol, in opcode order. `SUB` must precede `NEG_SUB`
/// so that reverse lookup of `-` yields binary subtraction.
const SYMBOLS: &[(OpCode, &str)] = &[
    (OpCode::ADD, "+"),
    (OpCode::SUB, "-"),
    (OpCode::MUL, "*"),
    (OpCode::DIV, "/"),
    (OpCode::POW, "^"),
    (OpCode::AMP, "&"),
    (OpCode::EQUAL, "="),
    (OpCode::NOT_EQUAL, "<>"),
    (OpCode::LESS, "<"),
    (OpCode::GREATER, ">"),
    (OpCode::LESS_EQUAL, "<="),
    (OpCode::GREATER_EQUAL, ">="),
    (OpCode::NEG_SUB, "-"),
    (OpCode::PERCENT, "%"),
    (OpCode::SUM, "SUM"),
    (OpCode::AVERAGE, "AVERAGE"),
    (OpCode::MIN, "MIN"),
    (OpCode::MAX, "MAX"),
    (OpCode::COUNT, "COUNT"),
    (OpCode::PRODUCT, "PRODUCT"),
    (OpCode::SUM_PRODUCT, "SUMPRODUCT"),
    (OpCode::IF, "IF"),
    (OpCode::AND, "AND"),
    (OpCode::OR, "OR"),
    (OpCode::NOT, "NOT"),
    (OpCode::ABS, "ABS"),
    (OpCode::SQRT, "SQRT"),
    (OpCode::EXP, "EXP"),
    (OpCode::LN, "LN"),
    (OpCode::POWER, "POWER"),
];

static SYMBOL_MAP: Lazy<FxHashMap<&'static str, OpCode>> = Lazy::new(|| {
    let mut map = FxHashMap::default();
    for (op, sym) in SYMBOLS {
        // First entry wins on duplicate symbols (`-`).
        map.entry(*sym).or_insert(*op);
    }
    map
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_round_trip_for_known_opcodes() {
        for (op, sym) in SYMBOLS {
            assert_eq!(op.symbol(), Some(*sym));
            if *op != OpCode::NEG_SUB {
                assert_eq!(OpCode::from_symbol(sym), Some(*op), "symbol {sym}");
            }
        }
    }

    #[test]
    fn minus_symbol_resolves_to_binary_subtraction() {
        assert_eq!(OpCode::from_symbol("-"), Some(OpCode::SUB));
        assert_eq!(OpCode::NEG_SUB.symbol(), Some("-"));
    }

    #[test]
    fn unknown_symbols_and_opcodes() {
        assert_eq!(OpCode::from_symbol("NOTAFUNCTION"), None);
        // Case matters: function symbols are stored upper-case.
        assert_eq!(OpCode::from_symbol("sum"), None);
        assert_eq!(OpCode(999).symbol(), None);
    }

    #[test]
    fn display_falls_back_to_decimal() {
        assert_eq!(OpCode::SUM.to_string(), "SUM");
        assert_eq!(OpCode(999).to_string(), "999");
    }
}
