//! Calculation configuration and the columnar formula-group cache.
//!
//! Formula groups (runs of cells sharing one formula pattern) are evaluated
//! in bulk over column arrays. This crate owns the pieces around that:
//! which engine family handles groups ([`calc_config`], [`settings`]), the
//! per-pass cache of materialized column data ([`group_context`]), the
//! persisted form of opcode subsets ([`opcode_set`]), and the process-wide
//! engine registration seam ([`group_interpreter`]).

pub mod calc_config;
pub mod group_context;
pub mod group_interpreter;
pub mod opcode_set;
pub mod settings;

pub use calc_config::{CalcConfig, ForcedCalcMode, StringConversion, is_threading_enabled};
pub use group_context::{
    ColArray, ColKey, FormulaGroupContext, FormulaGroupEntry, NumArrayHandle, StrArrayHandle,
};
pub use group_interpreter::{FormulaGroupEngine, FormulaGroupInterpreter};
pub use opcode_set::{opcode_set_from_symbolic_string, opcode_set_to_symbolic_string};
pub use settings::{CalcSettings, ConfigurationSource, SettingsFile};
