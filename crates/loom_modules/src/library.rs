//! Locating, opening and symbol-resolving a module's shared library.
//!
//! A module's code lives at `modules/<name>/<name>.<dll-ext>`. If a
//! `<name>_hotloadable.<dll-ext>` sits next to it, that file is copied over
//! the loaded path first (so an IDE can keep rebuilding the hotloadable
//! copy while the loaded one stays open) and the copy is deleted again on
//! unload. A library failing to open, or a required symbol failing to
//! resolve, is treated as a broken deployment and panics rather than
//! returning a `Result` - see [`crate::error`].

use crate::module_resources::ModuleResources;
use crate::preferences::PreferencesContext;
use libloading::{Library, Symbol};
use std::fs;
use std::path::{Path, PathBuf};

/// The signature every module's initialize/shutdown entry point exports.
pub type LifecycleFn = unsafe extern "C" fn(&mut ModuleResources);

/// Used when neither a module-specific override nor an engine preference
/// names an initialize function to call.
pub const FALLBACK_INITIALIZE_FN: &str = "initialize";
/// Used when neither a module-specific override nor an engine preference
/// names a shutdown function to call.
pub const FALLBACK_SHUTDOWN_FN: &str = "shutdown";

const DEFAULT_INITIALIZE_PREFERENCE: &str = "DefaultInitializeFunctionName";
const DEFAULT_SHUTDOWN_PREFERENCE: &str = "DefaultShutdownFunctionName";

/// `<exe dir>/modules`.
pub fn modules_root_folder() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("modules")
}

pub fn module_folder(name: &str) -> PathBuf {
    modules_root_folder().join(name)
}

pub fn module_config_file(module_folder: &Path) -> PathBuf {
    module_folder.join("Module.modconfig")
}

pub fn module_dll_path(module_folder: &Path, name: &str) -> PathBuf {
    module_folder.join(format!("{name}.{}", std::env::consts::DLL_EXTENSION))
}

pub fn hotloadable_dll_path(module_folder: &Path, name: &str) -> PathBuf {
    module_folder.join(format!(
        "{name}_hotloadable.{}",
        std::env::consts::DLL_EXTENSION
    ))
}

/// Opens `<name>`'s shared library, first copying its hotloadable sibling
/// over it if one exists. Returns `None` if the module has no code to
/// load at all (neither a loaded nor a hotloadable copy is present).
///
/// # Panics
/// If the hotloadable copy fails, or the library fails to open.
pub fn load_module_library(module_folder: &Path, name: &str) -> Option<Library> {
    let hotloadable = hotloadable_dll_path(module_folder, name);
    let loaded = module_dll_path(module_folder, name);

    if hotloadable.exists() {
        log::info!("found a hotloadable library for module '{name}', creating a copy");
        fs::copy(&hotloadable, &loaded).unwrap_or_else(|e| {
            panic!("could not copy the hotloadable module library '{name}' to be loaded: {e}")
        });
    }

    if !loaded.exists() {
        return None;
    }

    let library = unsafe { Library::new(&loaded) }
        .unwrap_or_else(|e| panic!("the '{name}' module at '{loaded:?}' could not be loaded: {e}"));

    log::info!("loaded library for module '{name}'");
    Some(library)
}

/// Drops `library`, then deletes the loaded copy if it was a hotloadable
/// copy to begin with.
pub fn free_module_library(module_folder: &Path, name: &str, library: Library) {
    drop(library);

    let hotloadable = hotloadable_dll_path(module_folder, name);
    let loaded = module_dll_path(module_folder, name);
    if hotloadable.exists() {
        log::info!("deleting the hotloaded copy of module '{name}'");
        if let Err(e) = fs::remove_file(&loaded) {
            log::warn!("could not delete the copy of module library '{name}': {e}");
        }
    }
}

/// Resolves which symbol name to call for a lifecycle entry point:
/// the module's own override, then the matching engine preference, then
/// `fallback`.
pub fn resolve_lifecycle_fn_name(
    module_name: &str,
    override_name: &str,
    preference_key: &str,
    preferences: &PreferencesContext,
    fallback: &str,
) -> String {
    if !override_name.is_empty() {
        log::info!(
            "module '{module_name}' uses the function name override '{override_name}'"
        );
        return override_name.to_string();
    }
    if let Some(default_name) = preferences.try_get(preference_key) {
        log::info!(
            "module '{module_name}' uses the config-default function name '{default_name}'"
        );
        return default_name.to_string();
    }
    log::info!("module '{module_name}' uses the fallback function name '{fallback}'");
    fallback.to_string()
}

pub fn resolve_initialize_fn_name(
    module_name: &str,
    override_name: &str,
    preferences: &PreferencesContext,
) -> String {
    resolve_lifecycle_fn_name(
        module_name,
        override_name,
        DEFAULT_INITIALIZE_PREFERENCE,
        preferences,
        FALLBACK_INITIALIZE_FN,
    )
}

pub fn resolve_shutdown_fn_name(
    module_name: &str,
    override_name: &str,
    preferences: &PreferencesContext,
) -> String {
    resolve_lifecycle_fn_name(
        module_name,
        override_name,
        DEFAULT_SHUTDOWN_PREFERENCE,
        preferences,
        FALLBACK_SHUTDOWN_FN,
    )
}

/// Looks up `fn_name` in `library` and calls it with `resources`.
///
/// # Panics
/// If the symbol cannot be resolved.
///
/// # Safety
/// The caller must ensure `library` actually exports `fn_name` with the
/// [`LifecycleFn`] signature; a mismatched signature is undefined behavior.
pub unsafe fn invoke_lifecycle_fn(library: &Library, fn_name: &str, resources: &mut ModuleResources) {
    let mut symbol_name = fn_name.as_bytes().to_vec();
    symbol_name.push(0);
    let symbol: Symbol<LifecycleFn> = library.get(&symbol_name).unwrap_or_else(|_| {
        panic!(
            "the '{fn_name}' function of module '{}' could not be found",
            resources.info().name
        )
    });
    symbol(resources);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_dll_path_uses_the_platform_extension() {
        let folder = PathBuf::from("/modules/Physics");
        let path = module_dll_path(&folder, "Physics");
        assert_eq!(
            path.extension().unwrap().to_str().unwrap(),
            std::env::consts::DLL_EXTENSION
        );
    }

    #[test]
    fn hotloadable_path_is_named_distinctly_from_the_loaded_path() {
        let folder = PathBuf::from("/modules/Physics");
        assert_ne!(
            hotloadable_dll_path(&folder, "Physics"),
            module_dll_path(&folder, "Physics")
        );
    }

    #[test]
    fn missing_library_returns_none_without_panicking() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_module_library(dir.path(), "NoSuchModule").is_none());
    }

    #[test]
    fn resolve_prefers_override_over_preference_and_fallback() {
        let preferences = PreferencesContext::from_map(
            [(DEFAULT_INITIALIZE_PREFERENCE.to_string(), "ConfiguredInit".to_string())]
                .into_iter()
                .collect(),
        );
        assert_eq!(
            resolve_initialize_fn_name("Physics", "CustomInit", &preferences),
            "CustomInit"
        );
    }

    #[test]
    fn resolve_falls_back_to_preference_then_default() {
        let empty = PreferencesContext::from_map(Default::default());
        let with_pref = PreferencesContext::from_map(
            [(DEFAULT_SHUTDOWN_PREFERENCE.to_string(), "ConfiguredShutdown".to_string())]
                .into_iter()
                .collect(),
        );
        assert_eq!(resolve_shutdown_fn_name("Physics", "", &empty), "shutdown");
        assert_eq!(
            resolve_shutdown_fn_name("Physics", "", &with_pref),
            "ConfiguredShutdown"
        );
    }
}
