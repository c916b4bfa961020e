//! # loom_context - Process-wide subcontext registry
//!
//! [`Context`] is the single process-wide container every dynamically
//! loaded module shares: a type-keyed map of [`Subcontext`]s, the
//! [`Profiler`], and the `ImGui enabled`/`running` flags. Module code
//! reaches it the same way regardless of which shared library it was
//! compiled into, because the `Context` itself lives in the host process,
//! not in any one module's static storage.

pub mod context;
pub mod profiler;
pub mod subcontext;

pub use context::Context;
pub use profiler::{CompletedMeasurement, Profiler};
pub use subcontext::{AsAny, Subcontext};

pub mod prelude {
    pub use crate::context::Context;
    pub use crate::profiler::Profiler;
    pub use crate::subcontext::Subcontext;
}
