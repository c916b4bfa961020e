//! The [`Context`]: a process-wide, type-keyed container of
//! [`Subcontext`]s, owning the [`Profiler`], the "ImGui enabled" flag and
//! the "running" flag subcontexts use to request shutdown.

use crate::profiler::Profiler;
use crate::subcontext::Subcontext;
use loom_core::type_registry::TypeHandle;
use loom_core::Module;
use std::cell::{Ref, RefCell, RefMut};
use std::collections::BTreeMap;
use std::rc::Rc;

/// Owns every registered [`Subcontext`] plus the profiler and the two frame
/// flags. Exactly one instance should exist per process; lifetime brackets
/// init to teardown.
pub struct Context {
    profiler: Profiler,
    imgui_enabled: bool,
    running: bool,
    subcontexts: BTreeMap<TypeHandle, Rc<RefCell<dyn Subcontext>>>,
}

impl Context {
    pub fn new(profiler: Profiler) -> Self {
        Self {
            profiler,
            imgui_enabled: false,
            running: true,
            subcontexts: BTreeMap::new(),
        }
    }

    pub fn profiler(&self) -> &Profiler {
        &self.profiler
    }

    pub fn profiler_mut(&mut self) -> &mut Profiler {
        &mut self.profiler
    }

    pub fn is_imgui_enabled(&self) -> bool {
        self.imgui_enabled
    }

    pub fn set_imgui_enabled(&mut self, enabled: bool) {
        self.imgui_enabled = enabled;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn request_shutdown(&mut self) {
        self.running = false;
    }

    /// Registers `subcontext` under type `T`. Panics if one of that type is
    /// already registered. `OnInitialize` is not called here: callers (the
    /// resource framework) invoke it explicitly after registration.
    pub fn register<T: Subcontext + 'static>(&mut self, subcontext: Rc<RefCell<T>>) {
        let handle = TypeHandle::of::<T>();
        assert!(
            !self.subcontexts.contains_key(&handle),
            "a subcontext of this type is already registered"
        );
        self.subcontexts.insert(handle, subcontext);
    }

    /// Deregisters the subcontext of type `T`. Panics if absent.
    /// `OnShutdown` is not called here; callers invoke it before
    /// deregistering.
    pub fn deregister<T: 'static>(&mut self) {
        let handle = TypeHandle::of::<T>();
        assert!(
            self.subcontexts.remove(&handle).is_some(),
            "no subcontext of this type is registered"
        );
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.subcontexts.contains_key(&TypeHandle::of::<T>())
    }

    pub fn get<T: 'static>(&self) -> Option<Ref<'_, T>> {
        let cell = self.subcontexts.get(&TypeHandle::of::<T>())?;
        Some(Ref::map(cell.borrow(), |s| {
            s.as_any()
                .downcast_ref::<T>()
                .expect("subcontext registry type/key mismatch")
        }))
    }

    pub fn get_mut<T: 'static>(&self) -> Option<RefMut<'_, T>> {
        let cell = self.subcontexts.get(&TypeHandle::of::<T>())?;
        Some(RefMut::map(cell.borrow_mut(), |s| {
            s.as_any_mut()
                .downcast_mut::<T>()
                .expect("subcontext registry type/key mismatch")
        }))
    }

    /// A snapshot of every registered subcontext's handle. Lets a caller
    /// that holds `Context` behind a `RefCell` release the borrow before
    /// invoking callbacks that may themselves need to reach back into
    /// `Context` (e.g. the module manager registering a subcontext while
    /// loading a module) - driving dispatch off this snapshot instead of
    /// off `*_all` avoids that reentrant borrow ever conflicting with one
    /// still held by the dispatch loop itself.
    pub fn subcontext_cells(&self) -> Vec<Rc<RefCell<dyn Subcontext>>> {
        self.subcontexts.values().cloned().collect()
    }

    /// Calls `f` on every registered subcontext. Registration order carries
    /// no meaning; iteration order here is by `TypeHandle`.
    fn for_each(&self, mut f: impl FnMut(&mut dyn Subcontext)) {
        for cell in self.subcontexts.values() {
            f(&mut *cell.borrow_mut());
        }
    }

    pub fn initialize_all(&self) {
        self.for_each(|s| s.initialize());
    }

    pub fn pre_update_all(&self) {
        self.for_each(|s| s.pre_update());
    }

    pub fn update_all(&self, delta_time: f32) {
        self.for_each(|s| s.before_update());
        self.for_each(|s| s.update(delta_time));
        self.for_each(|s| s.after_update());
    }

    pub fn imgui_all(&self, delta_time: f32, rendering_to_imgui_subwindow: bool) {
        self.for_each(|s| s.before_imgui(rendering_to_imgui_subwindow));
        self.for_each(|s| s.imgui(delta_time, rendering_to_imgui_subwindow));
        self.for_each(|s| s.after_imgui(rendering_to_imgui_subwindow));
    }

    pub fn post_update_all(&self) {
        self.for_each(|s| s.post_update());
    }

    pub fn shutdown_all(&self) {
        self.for_each(|s| s.shutdown());
    }

    pub fn before_load_module_all(&self, module: &Module) {
        self.for_each(|s| s.before_load_module(module));
    }

    pub fn after_load_module_all(&self, module: &Module) {
        self.for_each(|s| s.after_load_module(module));
    }

    pub fn before_load_modules_all(&self, modules: &[Module]) {
        self.for_each(|s| s.before_load_modules(modules));
    }

    pub fn after_load_modules_all(&self, modules: &[Module]) {
        self.for_each(|s| s.after_load_modules(modules));
    }

    pub fn before_unload_module_all(&self, module: &Module) {
        self.for_each(|s| s.before_unload_module(module));
    }

    pub fn after_unload_module_all(&self, module: &Module) {
        self.for_each(|s| s.after_unload_module(module));
    }

    pub fn before_unload_modules_all(&self, modules: &[Module]) {
        self.for_each(|s| s.before_unload_modules(modules));
    }

    pub fn after_unload_modules_all(&self, modules: &[Module]) {
        self.for_each(|s| s.after_unload_modules(modules));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Scores {
        total: u32,
    }
    impl Subcontext for Scores {
        fn name(&self) -> &str {
            "Scores"
        }
        fn update(&mut self, _delta_time: f32) {
            self.total += 1;
        }
    }

    #[test]
    fn register_get_and_update_round_trip() {
        let mut ctx = Context::new(Profiler::new());
        ctx.register(Rc::new(RefCell::new(Scores::default())));
        ctx.update_all(0.016);
        ctx.update_all(0.016);
        assert_eq!(ctx.get::<Scores>().unwrap().total, 2);
    }

    #[test]
    #[should_panic]
    fn double_registration_panics() {
        let mut ctx = Context::new(Profiler::new());
        ctx.register(Rc::new(RefCell::new(Scores::default())));
        ctx.register(Rc::new(RefCell::new(Scores::default())));
    }

    #[test]
    fn running_flag_defaults_true_and_honors_shutdown_request() {
        let mut ctx = Context::new(Profiler::new());
        assert!(ctx.is_running());
        ctx.request_shutdown();
        assert!(!ctx.is_running());
    }
}
