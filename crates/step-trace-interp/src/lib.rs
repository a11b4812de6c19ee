//! Tree-walking evaluator for the traced-language subset, plus the runtime
//! value model, step hooks, and object/var table construction that feed a
//! step's `locals`/`var_table`/`object_table` fields.

pub mod builtins;
pub mod env;
pub mod eval;
pub mod format;
pub mod hooks;
pub mod object_table;
pub mod prelude;
pub mod value;

pub use eval::{Interp, RuntimeErr, Signal};
pub use hooks::{NoopHooks, StepEvent, StepHooks, DEFAULT_DEPTH_LIMIT, DEFAULT_STEP_LIMIT};
pub use value::Value;
