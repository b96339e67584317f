//! Per-document and process-global calculation configuration, plus the
//! forced-calculation-mode override used to pin the engine family.

use std::collections::BTreeSet;
use std::env;
use std::process;
use std::sync::{Arc, OnceLock, RwLock};

use once_cell::sync::Lazy;
use thiserror::Error;

use gridcalc_common::{AddressConvention, OpCode, OpCodeSet};

use crate::settings;

/// How a string operand is converted when a numeric value is required.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringConversion {
    /// Conversion is an error.
    Illegal,
    /// Any string converts to zero.
    AsZero,
    /// Convert only unambiguous forms, independent of locale.
    Unambiguous,
    /// Convert according to locale rules.
    Locale,
}

/// Calculation configuration.
///
/// Each document owns one instance, and the process owns a global default
/// (see [`global_config`]). The string-conversion and string-reference
/// fields are document-scoped; the `vector_*` fields select engine behavior
/// and survive a document merge untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalcConfig {
    /// Convention for parsing string-valued cell references. Stays
    /// [`AddressConvention::Unspecified`] until explicitly assigned.
    pub string_ref_syntax: AddressConvention,
    /// Distinguishes "never assigned" from "assigned, possibly back to
    /// `Unspecified`".
    pub has_string_ref_syntax: bool,
    pub string_conversion: StringConversion,
    /// Treat an empty string operand as numeric zero.
    pub empty_string_as_zero: bool,

    /// Hand groups to the vector engine only when every opcode in the group
    /// is in [`CalcConfig::vector_subset_opcodes`].
    pub vector_subset_only: bool,
    /// Opcodes the vector engine is trusted with.
    pub vector_subset_opcodes: OpCodeSet,
    /// Groups shorter than this stay on the scalar interpreter.
    pub vector_min_group_size: u32,
}

fn default_vector_subset() -> OpCodeSet {
    Arc::new(BTreeSet::from([
        OpCode::SUM,
        OpCode::AVERAGE,
        OpCode::MIN,
        OpCode::MAX,
        OpCode::SUM_PRODUCT,
        OpCode::IF,
    ]))
}

impl Default for CalcConfig {
    fn default() -> Self {
        Self {
            string_ref_syntax: AddressConvention::Unspecified,
            has_string_ref_syntax: false,
            string_conversion: StringConversion::Locale,
            empty_string_as_zero: false,
            vector_subset_only: true,
            vector_subset_opcodes: default_vector_subset(),
            vector_min_group_size: 100,
        }
    }
}

impl CalcConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-applies the fixed defaults.
    pub fn reset(&mut self) {
        *self = CalcConfig::default();
    }

    /// Assigns the string-reference convention and records that it has been
    /// explicitly set.
    pub fn set_string_ref_syntax(&mut self, conv: AddressConvention) {
        self.string_ref_syntax = conv;
        self.has_string_ref_syntax = true;
    }

    /// Copies the document-scoped fields of `other` into `self`.
    /// Engine-selection fields keep their current values.
    pub fn merge_document_specific(&mut self, other: &CalcConfig) {
        // String conversion options are per document.
        self.string_conversion = other.string_conversion;
        self.empty_string_as_zero = other.empty_string_as_zero;
        // String reference syntax is per document.
        self.string_ref_syntax = other.string_ref_syntax;
        self.has_string_ref_syntax = other.has_string_ref_syntax;
    }
}

static GLOBAL_CONFIG: Lazy<RwLock<CalcConfig>> = Lazy::new(|| RwLock::new(CalcConfig::default()));

/// Snapshot of the process-global calculation configuration.
pub fn global_config() -> CalcConfig {
    GLOBAL_CONFIG
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .clone()
}

/// Replaces the process-global calculation configuration.
pub fn set_global_config(config: CalcConfig) {
    *GLOBAL_CONFIG.write().unwrap_or_else(|e| e.into_inner()) = config;
}

/// Developer/debug override pinning the engine family regardless of
/// persisted configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForcedCalcMode {
    /// Force threaded group calculation.
    Threads,
    /// Force the scalar core interpreter.
    Core,
}

/// Environment variable read once per process to pin the engine family.
pub const FORCE_CALCULATION_VAR: &str = "GRIDCALC_FORCE_CALCULATION";

#[derive(Debug, Error)]
#[error("unrecognized forced calculation mode {0:?}, expected \"threads\" or \"core\"")]
pub struct UnknownForcedMode(pub String);

impl ForcedCalcMode {
    pub fn parse(value: &str) -> Result<ForcedCalcMode, UnknownForcedMode> {
        match value {
            "threads" => Ok(ForcedCalcMode::Threads),
            "core" => Ok(ForcedCalcMode::Core),
            other => Err(UnknownForcedMode(other.to_owned())),
        }
    }
}

fn forced_calc_mode_init() -> Option<ForcedCalcMode> {
    let raw = match env::var(FORCE_CALCULATION_VAR) {
        Ok(value) => value,
        Err(env::VarError::NotPresent) => return None,
        Err(env::VarError::NotUnicode(value)) => {
            tracing::error!(
                ?value,
                "unrecognized value of {FORCE_CALCULATION_VAR}, aborting"
            );
            process::abort();
        }
    };
    match ForcedCalcMode::parse(&raw) {
        Ok(mode) => {
            tracing::info!(?mode, "forcing formula-group calculation mode");
            Some(mode)
        }
        Err(err) => {
            tracing::error!("{err}, aborting");
            process::abort();
        }
    }
}

/// Forced calculation mode from [`FORCE_CALCULATION_VAR`], resolved once
/// per process and immutable afterwards. An unrecognized value is a fatal
/// configuration error and aborts the process.
pub fn forced_calc_mode() -> Option<ForcedCalcMode> {
    static FORCED: OnceLock<Option<ForcedCalcMode>> = OnceLock::new();
    *FORCED.get_or_init(forced_calc_mode_init)
}

/// Whether threaded formula-group calculation is active.
///
/// A forced mode is final for the process lifetime. Otherwise fuzzing or
/// headless mode reports threading as disabled, and failing that the
/// registered configuration source is consulted on every call, so a live
/// settings change takes effect without a restart.
pub fn is_threading_enabled() -> bool {
    if let Some(mode) = forced_calc_mode() {
        return mode == ForcedCalcMode::Threads;
    }
    if settings::is_fuzzing_mode() {
        return false;
    }
    settings::threaded_group_calculation()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn defaults() {
        let config = CalcConfig::default();
        assert_eq!(config.string_ref_syntax, AddressConvention::Unspecified);
        assert!(!config.has_string_ref_syntax);
        assert_eq!(config.string_conversion, StringConversion::Locale);
        assert!(!config.empty_string_as_zero);
        assert!(config.vector_subset_only);
        assert_eq!(config.vector_min_group_size, 100);
        assert!(config.vector_subset_opcodes.contains(&OpCode::SUM));
    }

    #[test]
    fn set_string_ref_syntax_marks_explicit() {
        let mut config = CalcConfig::default();
        config.set_string_ref_syntax(AddressConvention::XlA1);
        assert_eq!(config.string_ref_syntax, AddressConvention::XlA1);
        assert!(config.has_string_ref_syntax);

        // Assigning the "unset" value still counts as an explicit choice.
        config.reset();
        config.set_string_ref_syntax(AddressConvention::Unspecified);
        assert_eq!(config.string_ref_syntax, AddressConvention::Unspecified);
        assert!(config.has_string_ref_syntax);
    }

    #[test]
    fn reset_restores_defaults() {
        let mut config = CalcConfig::default();
        config.set_string_ref_syntax(AddressConvention::XlR1C1);
        config.empty_string_as_zero = true;
        config.vector_min_group_size = 1;
        config.reset();
        assert_eq!(config, CalcConfig::default());
    }

    #[test]
    fn merge_overwrites_document_fields_only() {
        let mut target = CalcConfig {
            vector_subset_only: false,
            vector_subset_opcodes: Arc::new(BTreeSet::from([OpCode::SUM])),
            vector_min_group_size: 7,
            ..CalcConfig::default()
        };
        let mut source = CalcConfig::default();
        source.set_string_ref_syntax(AddressConvention::XlOox);
        source.string_conversion = StringConversion::AsZero;
        source.empty_string_as_zero = true;
        source.vector_min_group_size = 9999;

        target.merge_document_specific(&source);

        // Document-scoped fields follow the source.
        assert_eq!(target.string_ref_syntax, AddressConvention::XlOox);
        assert!(target.has_string_ref_syntax);
        assert_eq!(target.string_conversion, StringConversion::AsZero);
        assert!(target.empty_string_as_zero);
        // Engine-selection fields are untouched.
        assert!(!target.vector_subset_only);
        assert_eq!(*target.vector_subset_opcodes, BTreeSet::from([OpCode::SUM]));
        assert_eq!(target.vector_min_group_size, 7);
    }

    #[test]
    fn equality_is_structural() {
        let a = CalcConfig::default();
        let mut b = CalcConfig::default();
        assert_eq!(a, b);
        b.empty_string_as_zero = true;
        assert_ne!(a, b);
        b.reset();
        b.vector_subset_opcodes = Arc::new(BTreeSet::from([OpCode::SUM]));
        assert_ne!(a, b);
    }

    #[test]
    fn forced_mode_parsing() {
        assert_eq!(
            ForcedCalcMode::parse("threads").unwrap(),
            ForcedCalcMode::Threads
        );
        assert_eq!(ForcedCalcMode::parse("core").unwrap(), ForcedCalcMode::Core);
        assert!(ForcedCalcMode::parse("").is_err());
        assert!(ForcedCalcMode::parse("Threads").is_err());
        assert!(ForcedCalcMode::parse("thread").is_err());
        let err = ForcedCalcMode::parse("gpu").unwrap_err();
        assert!(err.to_string().contains("gpu"));
    }

    // The only test that touches the process-global configuration source
    // and fuzzing flag; keeping it alone avoids races between parallel test
    // threads. The force-mode environment variable is unset under the test
    // runner, so the live-settings path is the one exercised.
    #[test]
    fn threading_resolution_follows_source_and_fuzzing_flag() {
        struct Fixed(bool);
        impl settings::ConfigurationSource for Fixed {
            fn threaded_group_calculation(&self) -> bool {
                self.0
            }
        }

        assert_eq!(forced_calc_mode(), None);

        settings::set_configuration_source(Arc::new(Fixed(false)));
        assert!(!is_threading_enabled());

        // Re-read on every call: swapping the source takes effect at once.
        settings::set_configuration_source(Arc::new(Fixed(true)));
        assert!(is_threading_enabled());

        settings::set_fuzzing_mode(true);
        assert!(!is_threading_enabled());
        settings::set_fuzzing_mode(false);
        assert!(is_threading_enabled());
    }
}
