//! [`ModuleInfo`]: the parsed contents of a module's `Module.modconfig`.

use loom_core::{Module, Version};
use serde::Deserialize;

/// One entry of a module's `dependencies:` list.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ModuleDependency {
    pub module: String,
    pub version: VersionString,
}

/// `"major.minor.fix"`, parsed via [`Version::parse`] at the config
/// boundary so the rest of the crate only ever sees a real [`Version`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VersionString(pub Version);

impl<'de> Deserialize<'de> for VersionString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Version::parse(&raw)
            .map(VersionString)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid version string {raw:?}")))
    }
}

fn default_version() -> VersionString {
    VersionString(Version::new(0, 1, 0))
}

/// The deserialized shape of `Module.modconfig` (see the external
/// interfaces section of the runtime's YAML schema).
#[derive(Clone, Debug, Deserialize)]
pub struct ModuleInfo {
    pub name: String,
    pub guid: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub authors: String,
    #[serde(default = "default_version")]
    pub version: VersionString,
    #[serde(default, rename = "initializeFunctionOverride")]
    pub initialize_function_override: String,
    #[serde(default, rename = "shutdownFunctionOverride")]
    pub shutdown_function_override: String,
    #[serde(default)]
    pub dependencies: Vec<ModuleDependency>,
}

impl ModuleInfo {
    /// The [`Module`] handle this info's module is identified by.
    pub fn as_module(&self) -> Module {
        Module::new(self.name.clone(), self.guid.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_minimal_modconfig() {
        let yaml = "name: Physics\nguid: 11111111-1111-1111-1111-111111111111\n";
        let info: ModuleInfo = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(info.name, "Physics");
        assert_eq!(info.version.0, Version::new(0, 1, 0));
        assert!(info.dependencies.is_empty());
    }

    #[test]
    fn parses_dependencies_and_overrides() {
        let yaml = "\
name: Combat
guid: 22222222-2222-2222-2222-222222222222
version: \"2.3.1\"
initializeFunctionOverride: CombatInit
dependencies:
  - module: Physics
    version: \"1.0.0\"
";
        let info: ModuleInfo = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(info.version.0, Version::new(2, 3, 1));
        assert_eq!(info.initialize_function_override, "CombatInit");
        assert_eq!(info.dependencies.len(), 1);
        assert_eq!(info.dependencies[0].module, "Physics");
    }

    #[test]
    fn rejects_a_malformed_version_string() {
        let yaml = "name: Bad\nguid: x\nversion: \"not-a-version\"\n";
        assert!(serde_yaml::from_str::<ModuleInfo>(yaml).is_err());
    }
}
