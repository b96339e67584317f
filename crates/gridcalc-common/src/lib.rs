pub mod address;
pub mod opcode;

pub use address::*;
pub use opcode::*;

/// 0-based sheet (tab) index within a document.
pub type SheetIndex = u32;

/// 0-based column index within a sheet.
pub type ColIndex = u32;

/// Maximum number of columns a sheet may hold.
///
/// Also serves as the multiplier when folding a (sheet, column) pair into a
/// single hash value, so two distinct pairs never collide as long as the
/// column index stays in range.
pub const MAX_COL_COUNT: u64 = 16_384;
