//! Scanning `modules/` for available module configs, and the dependency
//! graph built across them.

use crate::error::ModuleConfigError;
use crate::library;
use crate::module_info::ModuleInfo;
use loom_core::Module;
use loom_graph::DependencyGraph;
use std::collections::BTreeMap;
use std::path::Path;

const MODLIST_FILE: &str = "Default.modlist";

/// Parses one module's `Module.modconfig`.
pub fn load_module_info(config_path: &Path) -> Result<ModuleInfo, ModuleConfigError> {
    let contents = std::fs::read_to_string(config_path).map_err(|source| ModuleConfigError::Io {
        path: config_path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&contents).map_err(|source| ModuleConfigError::Yaml {
        path: config_path.to_path_buf(),
        source,
    })
}

/// Scans every immediate subdirectory of `modules/` for a
/// `Module.modconfig`, parses it, and rebuilds the dependency graph across
/// every module found valid. Subdirectories with no config, or an invalid
/// one, are logged and skipped rather than failing the whole scan.
pub fn discover_available_modules() -> (BTreeMap<Module, ModuleInfo>, DependencyGraph<Module>) {
    let root = library::modules_root_folder();
    let mut available = BTreeMap::new();

    let entries = match std::fs::read_dir(&root) {
        Ok(entries) => entries,
        Err(_) => {
            log::warn!("modules folder {root:?} does not exist, no modules are available");
            return (available, DependencyGraph::new());
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let config_path = library::module_config_file(&path);
        if !config_path.exists() {
            continue;
        }
        match load_module_info(&config_path) {
            Ok(info) => {
                available.insert(info.as_module(), info);
            }
            Err(e) => log::warn!("skipping invalid module config at {config_path:?}: {e}"),
        }
    }

    let graph = build_dependency_graph(&available);
    (available, graph)
}

fn build_dependency_graph(available: &BTreeMap<Module, ModuleInfo>) -> DependencyGraph<Module> {
    let mut graph = DependencyGraph::new();
    for module in available.keys() {
        graph.add(module.clone());
    }

    let by_name: BTreeMap<&str, &Module> = available
        .iter()
        .map(|(module, info)| (info.name.as_str(), module))
        .collect();

    for (module, info) in available {
        for dependency in &info.dependencies {
            match by_name.get(dependency.module.as_str()) {
                Some(dependency_module) => graph.add_edge(dependency_module, module),
                None => log::warn!(
                    "module '{}' depends on '{}', which is not an available module",
                    info.name,
                    dependency.module
                ),
            }
        }
    }

    graph
}

/// Reads `modules/Default.modlist`: an optional YAML sequence of module
/// names to load at startup. Missing or malformed, this returns an empty
/// list rather than failing.
pub fn parse_modlist() -> Vec<String> {
    let path = library::modules_root_folder().join(MODLIST_FILE);
    let contents = match std::fs::read_to_string(&path) {
        Ok(c) => c,
        Err(_) => return Vec::new(),
    };
    match serde_yaml::from_str::<Vec<String>>(&contents) {
        Ok(names) => names,
        Err(e) => {
            log::warn!("could not parse {path:?} as a sequence of module names: {e}");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loom_core::Version;

    fn info(name: &str, guid: &str, dependencies: Vec<crate::module_info::ModuleDependency>) -> ModuleInfo {
        ModuleInfo {
            name: name.to_string(),
            guid: guid.to_string(),
            description: String::new(),
            authors: String::new(),
            version: crate::module_info::VersionString(Version::new(0, 1, 0)),
            initialize_function_override: String::new(),
            shutdown_function_override: String::new(),
            dependencies,
        }
    }

    #[test]
    fn builds_an_edge_from_dependency_to_dependant() {
        let physics = info("Physics", "11111111-1111-1111-1111-111111111111", vec![]);
        let combat = info(
            "Combat",
            "22222222-2222-2222-2222-222222222222",
            vec![crate::module_info::ModuleDependency {
                module: "Physics".to_string(),
                version: crate::module_info::VersionString(Version::new(0, 1, 0)),
            }],
        );

        let mut available = BTreeMap::new();
        let physics_module = physics.as_module();
        let combat_module = combat.as_module();
        available.insert(physics_module.clone(), physics);
        available.insert(combat_module.clone(), combat);

        let graph = build_dependency_graph(&available);
        assert!(graph.is_any_prev_of(&physics_module, &combat_module));
    }

    #[test]
    fn unresolvable_dependency_is_skipped_not_fatal() {
        let combat = info(
            "Combat",
            "22222222-2222-2222-2222-222222222222",
            vec![crate::module_info::ModuleDependency {
                module: "Nonexistent".to_string(),
                version: crate::module_info::VersionString(Version::new(0, 1, 0)),
            }],
        );
        let mut available = BTreeMap::new();
        available.insert(combat.as_module(), combat);

        let graph = build_dependency_graph(&available);
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn load_module_info_reports_missing_file() {
        let result = load_module_info(Path::new("/no/such/Module.modconfig"));
        assert!(matches!(result, Err(ModuleConfigError::Io { .. })));
    }
}
