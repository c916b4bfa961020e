//! The [`Subcontext`] trait: a named service registered in the
//! [`crate::Context`], receiving frame and module-lifecycle callbacks.

use core::any::Any;
use loom_core::Module;

/// Blanket conversion to `&dyn Any`, letting [`crate::Context::get`] recover
/// a concrete subcontext type from the type-erased registry.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A process-wide service. Only one instance per concrete type may be
/// registered in a [`crate::Context`] at a time. Every callback is a no-op
/// by default; overriding the base method is never required.
pub trait Subcontext: AsAny {
    fn name(&self) -> &str {
        ""
    }

    fn initialize(&mut self) {}
    fn pre_update(&mut self) {}
    fn before_update(&mut self) {}
    fn update(&mut self, delta_time: f32) {
        let _ = delta_time;
    }
    fn after_update(&mut self) {}
    fn before_imgui(&mut self, rendering_to_imgui_subwindow: bool) {
        let _ = rendering_to_imgui_subwindow;
    }
    fn imgui(&mut self, delta_time: f32, rendering_to_imgui_subwindow: bool) {
        let _ = (delta_time, rendering_to_imgui_subwindow);
    }
    fn after_imgui(&mut self, rendering_to_imgui_subwindow: bool) {
        let _ = rendering_to_imgui_subwindow;
    }
    fn post_update(&mut self) {}
    fn shutdown(&mut self) {}

    fn before_load_module(&mut self, module: &Module) {
        let _ = module;
    }
    fn after_load_module(&mut self, module: &Module) {
        let _ = module;
    }
    fn before_load_modules(&mut self, modules: &[Module]) {
        let _ = modules;
    }
    fn after_load_modules(&mut self, modules: &[Module]) {
        let _ = modules;
    }
    fn before_unload_module(&mut self, module: &Module) {
        let _ = module;
    }
    fn after_unload_module(&mut self, module: &Module) {
        let _ = module;
    }
    fn before_unload_modules(&mut self, modules: &[Module]) {
        let _ = modules;
    }
    fn after_unload_modules(&mut self, modules: &[Module]) {
        let _ = modules;
    }
}
