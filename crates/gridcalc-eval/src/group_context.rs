//! Per-pass columnar cache for formula-group evaluation.
//!
//! Group evaluation reads whole columns at a time, and converting cell
//! storage into flat arrays is the expensive part. Each calculation pass
//! owns a [`FormulaGroupContext`] that keeps the converted arrays per
//! (sheet, column) so every formula of a group referencing the same column
//! range reuses one materialization.
//!
//! The context owns two growable pools of arrays and hands out index
//! handles into them, so a handle stays valid for the context's whole
//! lifetime no matter how the pools grow.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use rustc_hash::FxHashMap;

use gridcalc_common::{ColIndex, MAX_COL_COUNT, SheetIndex};

/// Backing numeric column array. NaN marks cells without a numeric value.
pub type NumArray = Vec<f64>;

/// Backing string column array. `None` marks cells without a string value.
pub type StrArray = Vec<Option<Arc<str>>>;

/// Cache key: one column of one sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColKey {
    pub tab: SheetIndex,
    pub col: ColIndex,
}

impl ColKey {
    pub fn new(tab: SheetIndex, col: ColIndex) -> Self {
        Self { tab, col }
    }
}

impl Hash for ColKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(u64::from(self.tab) * MAX_COL_COUNT + u64::from(self.col));
    }
}

/// Handle to a numeric array in a [`FormulaGroupContext`] pool.
///
/// Only meaningful with the context that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumArrayHandle(usize);

/// Handle to a string array in a [`FormulaGroupContext`] pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrArrayHandle(usize);

/// One cached column slice: at most one numeric and one string array, plus
/// the recorded element count.
///
/// `size` equals the length of whichever array is present; when both are
/// present their lengths match.
#[derive(Debug, Clone, Copy)]
pub struct ColArray {
    pub num_array: Option<NumArrayHandle>,
    pub str_array: Option<StrArrayHandle>,
    pub size: usize,
}

/// Columnar cache owned by one calculation pass and dropped with it.
///
/// Not internally synchronized: parallel group evaluation gives each worker
/// its own context, or serializes access externally.
#[derive(Debug, Default)]
pub struct FormulaGroupContext {
    col_arrays: FxHashMap<ColKey, ColArray>,
    num_pool: Vec<NumArray>,
    str_pool: Vec<StrArray>,
}

impl FormulaGroupContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves a caller-built numeric column into the context. The returned
    /// handle stays valid until the context is dropped.
    pub fn alloc_num_array(&mut self, array: NumArray) -> NumArrayHandle {
        self.num_pool.push(array);
        NumArrayHandle(self.num_pool.len() - 1)
    }

    /// Moves a caller-built string column into the context.
    pub fn alloc_str_array(&mut self, array: StrArray) -> StrArrayHandle {
        self.str_pool.push(array);
        StrArrayHandle(self.str_pool.len() - 1)
    }

    pub fn num_array(&self, handle: NumArrayHandle) -> &[f64] {
        &self.num_pool[handle.0]
    }

    pub fn num_array_mut(&mut self, handle: NumArrayHandle) -> &mut [f64] {
        &mut self.num_pool[handle.0]
    }

    pub fn str_array(&self, handle: StrArrayHandle) -> &[Option<Arc<str>>] {
        &self.str_pool[handle.0]
    }

    pub fn str_array_mut(&mut self, handle: StrArrayHandle) -> &mut [Option<Arc<str>>] {
        &mut self.str_pool[handle.0]
    }

    /// Returns the cached entry for the column only if one exists and its
    /// recorded size covers `min_size`. Absence and a too-short array are
    /// both ordinary cache misses.
    pub fn get_cached_col_array(
        &self,
        tab: SheetIndex,
        col: ColIndex,
        min_size: usize,
    ) -> Option<ColArray> {
        let cached = self.col_arrays.get(&ColKey::new(tab, col))?;
        if cached.size < min_size {
            // Cached data does not reach far enough for the requested range.
            return None;
        }
        Some(*cached)
    }

    /// Caches an entry built from the given arrays, fully replacing any
    /// prior entry for the column. The recorded size is taken from the
    /// numeric array when both are given, in which case the lengths must
    /// match.
    pub fn set_cached_col_array(
        &mut self,
        tab: SheetIndex,
        col: ColIndex,
        num_array: Option<NumArrayHandle>,
        str_array: Option<StrArrayHandle>,
    ) -> ColArray {
        if let (Some(num), Some(st)) = (num_array, str_array) {
            debug_assert_eq!(self.num_pool[num.0].len(), self.str_pool[st.0].len());
        }
        let size = match (num_array, str_array) {
            (Some(num), _) => self.num_pool[num.0].len(),
            (None, Some(st)) => self.str_pool[st.0].len(),
            (None, None) => 0,
        };
        let entry = ColArray {
            num_array,
            str_array,
            size,
        };
        self.col_arrays.insert(ColKey::new(tab, col), entry);
        entry
    }

    /// Drops the cached entry for the column; no-op when nothing is cached.
    pub fn discard_cached_col_array(&mut self, tab: SheetIndex, col: ColIndex) {
        self.col_arrays.remove(&ColKey::new(tab, col));
    }

    /// Attaches a NaN-filled numeric array of `len` elements to the cached
    /// entry unless it already has one, and returns the entry's numeric
    /// handle. `None` when nothing is cached for the column. The cache's
    /// key set is never altered.
    pub fn ensure_num_array(
        &mut self,
        tab: SheetIndex,
        col: ColIndex,
        len: usize,
    ) -> Option<NumArrayHandle> {
        let entry = self.col_arrays.get_mut(&ColKey::new(tab, col))?;
        if let Some(handle) = entry.num_array {
            return Some(handle);
        }
        debug_assert!(entry.str_array.is_none() || entry.size == len);
        self.num_pool.push(vec![f64::NAN; len]);
        let handle = NumArrayHandle(self.num_pool.len() - 1);
        entry.num_array = Some(handle);
        Some(handle)
    }

    /// String-side counterpart of [`FormulaGroupContext::ensure_num_array`];
    /// new arrays are filled with the `None` sentinel.
    pub fn ensure_str_array(
        &mut self,
        tab: SheetIndex,
        col: ColIndex,
        len: usize,
    ) -> Option<StrArrayHandle> {
        let entry = self.col_arrays.get_mut(&ColKey::new(tab, col))?;
        if let Some(handle) = entry.str_array {
            return Some(handle);
        }
        debug_assert!(entry.num_array.is_none() || entry.size == len);
        self.str_pool.push(vec![None; len]);
        let handle = StrArrayHandle(self.str_pool.len() - 1);
        entry.str_array = Some(handle);
        Some(handle)
    }
}

/// One run of formula cells found by a group scan: a shared run evaluated
/// as a group, or a single ungrouped cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormulaGroupEntry {
    Shared { row: u32, len: u32 },
    Single { row: u32 },
}

impl FormulaGroupEntry {
    /// First row of the run.
    pub fn row(&self) -> u32 {
        match self {
            Self::Shared { row, .. } | Self::Single { row } => *row,
        }
    }

    /// Number of cells covered.
    pub fn span(&self) -> u32 {
        match self {
            Self::Shared { len, .. } => *len,
            Self::Single { .. } => 1,
        }
    }

    pub fn is_shared(&self) -> bool {
        matches!(self, Self::Shared { .. })
    }
}
