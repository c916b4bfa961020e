//! # loom - Engine facade
//!
//! Wires every runtime crate into one process-wide [`Engine`]: constructs
//! the shared registries, bundles them into a
//! [`loom_modules::RuntimeHandles`], registers the bootstrap subcontexts
//! (preferences, the module manager) and drives the per-frame control flow:
//! module loads, subcontext pre-update, systems-group update (in
//! topological order), an optional ImGui pass, subcontext post-update,
//! module unloads, end-of-frame entity cleanup.

pub use loom_context;
pub use loom_core;
pub use loom_ecs;
pub use loom_graph;
pub use loom_math;
pub use loom_modules;
pub use loom_serialize;
pub use loom_structures;
pub use loom_systems;

use loom_context::{Context, Profiler, Subcontext};
use loom_ecs::{ComponentRegistry, EntityManager};
use loom_modules::{ModuleManager, PreferencesContext, RuntimeHandles};
use loom_serialize::SerializationRegistry;
use loom_systems::{Phase, SystemsGroupRegistry};
use std::cell::RefCell;
use std::rc::Rc;

/// Coarse engine lifecycle state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineState {
    Created,
    Initializing,
    Running,
    Stopped,
}

impl Default for EngineState {
    fn default() -> Self {
        Self::Created
    }
}

/// Per-frame timing, updated by [`Engine::update`].
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameTime {
    pub delta: f32,
    pub total: f64,
    pub frame: u64,
}

/// Top-level engine configuration.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub app_name: String,
    /// Upper bound on a single frame's delta time, to avoid a spiral of
    /// death after a stall.
    pub max_delta_time: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            app_name: "Loom App".to_string(),
            max_delta_time: 0.25,
        }
    }
}

/// The process-wide runtime. Owns every registry behind a
/// [`RuntimeHandles`] bundle, the bootstrap subcontexts, and the frame loop
/// described in [`ModuleManager`]'s module docs.
pub struct Engine {
    config: EngineConfig,
    state: EngineState,
    time: FrameTime,
    runtime: RuntimeHandles,
    module_manager: Rc<RefCell<ModuleManager>>,
}

impl Engine {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let context = Rc::new(RefCell::new(Context::new(Profiler::new())));
        let components = Rc::new(RefCell::new(ComponentRegistry::new()));
        let entities = Rc::new(RefCell::new(EntityManager::new()));
        let systems = Rc::new(RefCell::new(SystemsGroupRegistry::new()));
        let serializers = Rc::new(RefCell::new(SerializationRegistry::new()));

        let runtime = RuntimeHandles {
            context: context.clone(),
            components,
            entities,
            systems,
            serializers,
        };

        context
            .borrow_mut()
            .register(Rc::new(RefCell::new(PreferencesContext::new())));

        let module_manager = Rc::new(RefCell::new(ModuleManager::new(runtime.clone())));
        context.borrow_mut().register(module_manager.clone());

        Self {
            config,
            state: EngineState::Created,
            time: FrameTime::default(),
            runtime,
            module_manager,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn time(&self) -> FrameTime {
        self.time
    }

    pub fn runtime(&self) -> &RuntimeHandles {
        &self.runtime
    }

    pub fn module_manager(&self) -> &Rc<RefCell<ModuleManager>> {
        &self.module_manager
    }

    /// Runs `initialize` on every subcontext, rescans `modules/`, and
    /// schedules every module named in `modules/Default.modlist` (plus its
    /// dependencies) to load on the first [`Self::update`].
    pub fn initialize(&mut self) {
        if self.state != EngineState::Created {
            return;
        }
        self.state = EngineState::Initializing;

        self.dispatch_subcontexts(|s| s.initialize());
        self.module_manager.borrow_mut().refresh_available_modules();

        for name in loom_modules::discovery::parse_modlist() {
            let module = self.module_manager.borrow().module_from_name(&name);
            match module {
                Some(module) => {
                    self.module_manager.borrow_mut().load_with_dependencies(module);
                }
                None => log::warn!("startup modlist names unknown module '{name}'"),
            }
        }

        self.state = EngineState::Running;
    }

    /// Runs one frame.
    pub fn update(&mut self, delta_time: f32) {
        if self.state != EngineState::Running {
            return;
        }

        let delta = delta_time.min(self.config.max_delta_time);
        self.time.delta = delta;
        self.time.total += delta as f64;
        self.time.frame += 1;

        self.module_manager.borrow_mut().pre_update();
        self.dispatch_subcontexts(|s| s.pre_update());

        self.runtime.systems.borrow_mut().run_phase(Phase::PreUpdate);
        self.runtime.systems.borrow_mut().run_phase(Phase::Update(delta));

        self.dispatch_subcontexts(|s| {
            s.before_update();
            s.update(delta);
            s.after_update();
        });

        self.dispatch_subcontexts(|s| s.post_update());
        self.module_manager.borrow_mut().post_update();

        self.runtime
            .entities
            .borrow_mut()
            .cleanup(&self.runtime.components.borrow());
        self.runtime.context.borrow_mut().profiler_mut().clear_measurements();
    }

    /// Runs the ImGui phase for every system and subcontext. Call after
    /// [`Self::update`], only while ImGui is enabled.
    pub fn imgui(&mut self, delta_time: f32, rendering_to_imgui_subwindow: bool) {
        if self.state != EngineState::Running {
            return;
        }

        self.dispatch_subcontexts(|s| s.before_imgui(rendering_to_imgui_subwindow));
        self.runtime.systems.borrow_mut().run_phase(Phase::ImGui(delta_time));
        self.dispatch_subcontexts(|s| s.imgui(delta_time, rendering_to_imgui_subwindow));
        self.dispatch_subcontexts(|s| s.after_imgui(rendering_to_imgui_subwindow));
    }

    /// Shuts down every subcontext, including unloading every still-loaded
    /// module in reverse dependency order.
    pub fn shutdown(&mut self) {
        if self.state == EngineState::Stopped {
            return;
        }
        self.dispatch_subcontexts(|s| s.shutdown());
        self.state = EngineState::Stopped;
    }

    /// Dispatches `f` over a snapshot of every registered subcontext
    /// without holding a `Context` borrow across the calls, so a
    /// subcontext reached through the snapshot (the module manager, mid
    /// load or unload) can freely re-borrow `Context` itself.
    fn dispatch_subcontexts(&self, mut f: impl FnMut(&mut dyn Subcontext)) {
        let cells = self.runtime.context.borrow().subcontext_cells();
        for cell in cells {
            f(&mut *cell.borrow_mut());
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

pub mod prelude {
    pub use crate::{Engine, EngineConfig, EngineState, FrameTime};

    pub use loom_context::prelude::*;
    pub use loom_core::prelude::*;
    pub use loom_ecs::prelude::*;
    pub use loom_math::prelude::*;
    pub use loom_modules::prelude::*;
    pub use loom_serialize::prelude::*;
    pub use loom_structures::prelude::*;
    pub use loom_systems::prelude::*;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_lifecycle_without_any_modules_present() {
        let mut engine = Engine::new();
        assert_eq!(engine.state(), EngineState::Created);

        engine.initialize();
        assert_eq!(engine.state(), EngineState::Running);

        engine.update(1.0 / 60.0);
        assert_eq!(engine.time().frame, 1);

        engine.shutdown();
        assert_eq!(engine.state(), EngineState::Stopped);
    }

    #[test]
    fn delta_time_is_clamped_to_max_delta_time() {
        let mut engine = Engine::with_config(EngineConfig {
            app_name: "Test".to_string(),
            max_delta_time: 0.1,
        });
        engine.initialize();
        engine.update(5.0);
        assert_eq!(engine.time().delta, 0.1);
    }
}
