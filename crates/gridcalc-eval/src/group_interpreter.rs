//! Registration seam for vectorized formula-group evaluation engines.
//!
//! A concrete engine registers itself at startup. Callers that want group
//! evaluation ask for the process-wide interpreter and fall back to the
//! scalar interpreter when none is present; an empty registration slot is
//! an ordinary state, not an error.

use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;

use gridcalc_common::{ColIndex, SheetIndex};

use crate::calc_config::{self, CalcConfig};
use crate::group_context::{FormulaGroupContext, FormulaGroupEntry};

/// A vectorized evaluation engine for formula groups.
///
/// Engine construction and registration live with the engine crates; this
/// crate only defines the seam.
pub trait FormulaGroupEngine: Send + Sync {
    /// Engine family name, for logs.
    fn name(&self) -> &'static str;

    /// Evaluates one formula group against the context. Returning `false`
    /// declines the group and the caller falls back to the scalar
    /// interpreter.
    fn interpret(
        &self,
        ctx: &mut FormulaGroupContext,
        tab: SheetIndex,
        col: ColIndex,
        entry: &FormulaGroupEntry,
    ) -> bool;
}

/// Process-wide selector pairing the registered engine with the merged
/// calculation configuration it must honor.
pub struct FormulaGroupInterpreter {
    engine: Arc<dyn FormulaGroupEngine>,
    calc_config: RwLock<CalcConfig>,
}

static INSTANCE: Lazy<RwLock<Option<Arc<FormulaGroupInterpreter>>>> =
    Lazy::new(|| RwLock::new(None));

impl FormulaGroupInterpreter {
    /// Installs `engine` as the process-wide group interpreter, replacing
    /// any previous registration. The interpreter starts out with the
    /// process-global configuration.
    pub fn register(engine: Arc<dyn FormulaGroupEngine>) -> Arc<FormulaGroupInterpreter> {
        let interpreter = Arc::new(FormulaGroupInterpreter {
            calc_config: RwLock::new(calc_config::global_config()),
            engine,
        });
        tracing::info!(
            engine = interpreter.engine.name(),
            "registered formula-group engine"
        );
        *INSTANCE.write().unwrap_or_else(|e| e.into_inner()) = Some(Arc::clone(&interpreter));
        interpreter
    }

    /// The registered interpreter, or `None` when no engine has been
    /// registered.
    pub fn get() -> Option<Arc<FormulaGroupInterpreter>> {
        INSTANCE.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Rebuilds this interpreter's configuration: the process-global
    /// configuration overlaid with `document`'s document-specific fields.
    pub fn merge_calc_config(&self, document: &CalcConfig) {
        let mut config = calc_config::global_config();
        config.merge_document_specific(document);
        *self.calc_config.write().unwrap_or_else(|e| e.into_inner()) = config;
    }

    /// Snapshot of the merged configuration.
    pub fn calc_config(&self) -> CalcConfig {
        self.calc_config
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn engine(&self) -> Arc<dyn FormulaGroupEngine> {
        Arc::clone(&self.engine)
    }
}
