//! [`ModuleManager`]: discovery, dependency-aware load/unload scheduling
//! and the module init/shutdown ABI.

use crate::discovery;
use crate::library;
use crate::module_info::ModuleInfo;
use crate::module_resources::ModuleResources;
use crate::preferences::PreferencesContext;
use crate::resource::RuntimeHandles;
use loom_context::Subcontext;
use loom_core::Module;
use loom_graph::DependencyGraph;
use std::collections::BTreeMap;

/// Discovers available modules, schedules their load/unload across frame
/// boundaries, and drives the dynamic-library init/shutdown ABI.
pub struct ModuleManager {
    runtime: RuntimeHandles,
    available: BTreeMap<Module, ModuleInfo>,
    loaded: BTreeMap<Module, ModuleResources>,
    dependencies: DependencyGraph<Module>,
    modules_to_load: Vec<Module>,
    modules_to_unload: Vec<Module>,
}

impl ModuleManager {
    pub fn new(runtime: RuntimeHandles) -> Self {
        Self {
            runtime,
            available: BTreeMap::new(),
            loaded: BTreeMap::new(),
            dependencies: DependencyGraph::new(),
            modules_to_load: Vec::new(),
            modules_to_unload: Vec::new(),
        }
    }

    /// Every available module, ordered by topological distance from the
    /// start of the dependency graph (modules with no dependencies first).
    pub fn available_modules(&self) -> Vec<Module> {
        let mut modules: Vec<Module> = self.available.keys().cloned().collect();
        modules.sort_by_key(|m| self.dependencies.max_distance_from_start(m));
        modules
    }

    pub fn loaded_modules(&self) -> Vec<Module> {
        self.loaded.keys().cloned().collect()
    }

    pub fn module_exists(&self, module: &Module) -> bool {
        self.available.contains_key(module)
    }

    pub fn module_is_currently_loaded(&self, module: &Module) -> bool {
        self.loaded.contains_key(module)
    }

    pub fn will_be_loaded(&self, module: &Module) -> bool {
        self.modules_to_load.contains(module)
    }

    pub fn will_be_unloaded(&self, module: &Module) -> bool {
        self.modules_to_unload.contains(module)
    }

    pub fn module_is_still_loaded_next_frame(&self, module: &Module) -> bool {
        (self.module_is_currently_loaded(module) && !self.will_be_unloaded(module))
            || self.will_be_loaded(module)
    }

    pub fn module_from_name(&self, name: &str) -> Option<Module> {
        self.available_modules()
            .into_iter()
            .find(|m| m.name == name)
    }

    /// Panics if `module` is not available.
    pub fn info_of(&self, module: &Module) -> &ModuleInfo {
        self.available
            .get(module)
            .unwrap_or_else(|| panic!("cannot get the info of a module ({module}) that does not exist"))
    }

    pub fn can_load(&self, module: &Module) -> bool {
        !self.module_is_still_loaded_next_frame(module)
            && self
                .dependencies
                .all_prevs_of(module)
                .iter()
                .all(|dependency| self.module_is_still_loaded_next_frame(dependency))
    }

    pub fn can_unload(&self, module: &Module) -> bool {
        self.module_is_still_loaded_next_frame(module)
            && self
                .dependencies
                .all_nexts_of(module)
                .iter()
                .all(|dependant| !self.module_is_still_loaded_next_frame(dependant))
    }

    /// Schedules `module` to be loaded at the begin of the next frame.
    /// Panics if [`Self::can_load`] is false.
    pub fn load_at_begin_of_frame(&mut self, module: Module) {
        assert!(
            self.can_load(&module),
            "module {module} cannot be loaded right now"
        );
        self.modules_to_load.push(module);
    }

    /// Schedules `module` to be unloaded at the end of the current frame.
    /// Panics if [`Self::can_unload`] is false.
    pub fn unload_at_end_of_frame(&mut self, module: Module) {
        assert!(
            self.can_unload(&module),
            "module {module} cannot be unloaded right now"
        );
        self.modules_to_unload.push(module);
    }

    /// Loads `module` and every not-yet-scheduled dependency, in
    /// dependency order. Returns every module scheduled, including `module`.
    pub fn load_with_dependencies(&mut self, module: Module) -> Vec<Module> {
        let ancestors = self.dependencies.all_prevs_of(&module);
        let order = self.dependencies.all_nodes_start_to_end();
        let to_schedule: Vec<Module> = order
            .into_iter()
            .filter(|m| (*m == module || ancestors.contains(m)) && !self.module_is_still_loaded_next_frame(m))
            .collect();
        for m in &to_schedule {
            self.load_at_begin_of_frame(m.clone());
        }
        to_schedule
    }

    /// Unloads `module` and every still-loaded dependant first, in reverse
    /// dependency order. Returns every module scheduled, including `module`.
    pub fn unload_with_dependants(&mut self, module: Module) -> Vec<Module> {
        let descendants = self.dependencies.all_nexts_of(&module);
        let order = self.dependencies.all_nodes_end_to_start();
        let to_schedule: Vec<Module> = order
            .into_iter()
            .filter(|m| (*m == module || descendants.contains(m)) && self.module_is_still_loaded_next_frame(m))
            .collect();
        for m in &to_schedule {
            self.unload_at_end_of_frame(m.clone());
        }
        to_schedule
    }

    /// Rescans `modules/` and rebuilds the dependency graph. A module
    /// previously available that is no longer valid is logged, but stays
    /// loaded if it already was.
    pub fn refresh_available_modules(&mut self) {
        let (available, dependencies) = discovery::discover_available_modules();
        for module in self.loaded.keys() {
            if !available.contains_key(module) {
                log::warn!("loaded module {module} is no longer available and cannot be reloaded");
            }
        }
        self.available = available;
        self.dependencies = dependencies;
    }

    pub fn dependency_graph(&self) -> &DependencyGraph<Module> {
        &self.dependencies
    }

    fn preferences_or_default(&self) -> PreferencesContext {
        self.runtime
            .context
            .borrow()
            .get::<PreferencesContext>()
            .map(|p| PreferencesContext::from_map(p.all().clone()))
            .unwrap_or_default()
    }

    fn initialize_and_add_module(&mut self, module: &Module) {
        let info = self.info_of(module).clone();
        let mut resources = ModuleResources::new(info.clone());

        let folder = library::module_folder(&info.name);
        let library = library::load_module_library(&folder, &info.name);

        resources.begin_initializing();

        if let Some(library) = &library {
            let preferences = self.preferences_or_default();
            let init_fn = library::resolve_initialize_fn_name(
                &info.name,
                &info.initialize_function_override,
                &preferences,
            );
            unsafe {
                library::invoke_lifecycle_fn(library, &init_fn, &mut resources);
            }
        }

        if let Some(library) = library {
            resources.set_library(library);
        }

        resources.finish_initializing();
        resources.run_load(&self.runtime);

        log::info!("module '{}' has been initialized", info.name);
        self.loaded.insert(module.clone(), resources);
    }

    fn remove_and_shutdown_module(&mut self, module: &Module) {
        let mut resources = self
            .loaded
            .remove(module)
            .expect("cannot remove a module that is not loaded");

        // Component descriptors are owned by the unloading module; wipe the
        // entity store before its ComponentResource deregisters them below,
        // so chunk cleanup still sees valid destructor glue.
        self.runtime
            .entities
            .borrow_mut()
            .wipe_all(&self.runtime.components.borrow());

        resources.run_unload(&self.runtime);
        resources.begin_shutting_down();

        let name = resources.info().name.clone();
        let library = resources.take_library();

        if let Some(library) = &library {
            let preferences = self.preferences_or_default();
            let shutdown_fn = library::resolve_shutdown_fn_name(
                &name,
                &resources.info().shutdown_function_override,
                &preferences,
            );
            unsafe {
                library::invoke_lifecycle_fn(library, &shutdown_fn, &mut resources);
            }
        }

        if let Some(library) = library {
            let folder = library::module_folder(&name);
            library::free_module_library(&folder, &name, library);
        }

        log::info!("module '{name}' has been shut down");
    }
}

impl Subcontext for ModuleManager {
    fn name(&self) -> &str {
        "Module Manager"
    }

    fn pre_update(&mut self) {
        if self.modules_to_load.is_empty() {
            return;
        }
        let to_load = std::mem::take(&mut self.modules_to_load);
        self.runtime.context.borrow().before_load_modules_all(&to_load);
        for module in &to_load {
            self.runtime.context.borrow().before_load_module_all(module);
            self.initialize_and_add_module(module);
            self.runtime.context.borrow().after_load_module_all(module);
        }
        self.runtime.context.borrow().after_load_modules_all(&to_load);
    }

    fn post_update(&mut self) {
        if self.modules_to_unload.is_empty() {
            return;
        }
        let to_unload = std::mem::take(&mut self.modules_to_unload);
        self.runtime.context.borrow().before_unload_modules_all(&to_unload);
        for module in &to_unload {
            self.runtime.context.borrow().before_unload_module_all(module);
            self.remove_and_shutdown_module(module);
            self.runtime.context.borrow().after_unload_module_all(module);
        }
        self.runtime.context.borrow().after_unload_modules_all(&to_unload);
    }

    fn shutdown(&mut self) {
        let reverse_order = self.dependencies.all_nodes_end_to_start();
        let still_loaded: Vec<Module> = reverse_order
            .into_iter()
            .filter(|m| self.loaded.contains_key(m))
            .collect();
        for module in still_loaded {
            self.remove_and_shutdown_module(&module);
        }
    }
}
