//! # loom_modules - Module discovery, loading and the resource framework
//!
//! A [`manager::ModuleManager`] discovers modules under `modules/`,
//! schedules their load/unload across frame boundaries, and drives the
//! dynamic-library init/shutdown ABI described in [`library`]. Each
//! module's code registers [`resource::Resource`]s on the
//! [`module_resources::ModuleResources`] handed to its init function;
//! the standard wrappers in [`resource`] attach those registrations to
//! the process-wide registries bundled in [`resource::RuntimeHandles`].

pub mod discovery;
pub mod error;
pub mod library;
pub mod manager;
pub mod module_info;
pub mod module_resources;
pub mod preferences;
pub mod resource;

pub use error::ModuleConfigError;
pub use manager::ModuleManager;
pub use module_info::{ModuleDependency, ModuleInfo, VersionString};
pub use module_resources::{ModuleResources, ModuleStatus};
pub use preferences::PreferencesContext;
pub use resource::{
    ComponentResource, Resource, RuntimeHandles, SerializerResource, SubcontextResource,
    SystemResource, SystemsGroupResource,
};

pub mod prelude {
    pub use crate::manager::ModuleManager;
    pub use crate::module_info::ModuleInfo;
    pub use crate::module_resources::{ModuleResources, ModuleStatus};
    pub use crate::preferences::PreferencesContext;
    pub use crate::resource::{
        ComponentResource, Resource, RuntimeHandles, SerializerResource, SubcontextResource,
        SystemResource, SystemsGroupResource,
    };
}
