//! Registries.
//!
//! | Registry | Keyed by | Holds |
//! |----------|----------|-------|
//! | `NameRegistry` | category, owner scope, name | instance counts and name → instance maps |
//! | `ProjectionTypeRegistry` | keyword | `ProjectionType` |
//!
//! Both are plain objects owned by (or injected into) a `Session`; nothing
//! here is global.

use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::Mutex;

use crate::function::{ControlSignalFunction, MappingFunction};
use crate::model::{MechanismId, ProjectionFamily, ProjectionType};

/// Built-in projection type keywords.
pub const MAPPING: &str = "Mapping";
pub const CONTROL_SIGNAL: &str = "ControlSignal";

// ============================================================================
// NameRegistry
// ============================================================================

/// Per-category instance bookkeeping.
#[derive(Debug, Clone, Default)]
struct Category {
    instance_count: u64,
    /// (owner scope, name) → raw instance id
    instances: HashMap<(MechanismId, String), u64>,
}

/// Instance counters and name maps for every component category.
///
/// Names are unique within one owner scope of one category; a colliding
/// request is suffixed `-1`, `-2`, ... The lock makes count increments and
/// name insertions atomic, so one registry may be shared between sessions.
#[derive(Debug, Default)]
pub struct NameRegistry {
    categories: Mutex<HashMap<String, Category>>,
}

impl NameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `instance` and return its final name.
    ///
    /// Without a requested name the instance is named `<category>-<n>`,
    /// where `n` is the category's instance count so far.
    pub fn register(
        &self,
        category: &str,
        scope: MechanismId,
        requested: Option<&str>,
        instance: u64,
    ) -> String {
        let mut categories = self.categories.lock();
        let entry = categories.entry(category.to_string()).or_default();

        let base = match requested {
            Some(name) => name.to_string(),
            None => format!("{category}-{}", entry.instance_count),
        };
        let mut name = base.clone();
        let mut suffix = 1;
        while entry.instances.contains_key(&(scope, name.clone())) {
            name = format!("{base}-{suffix}");
            suffix += 1;
        }

        entry.instance_count += 1;
        entry.instances.insert((scope, name.clone()), instance);
        name
    }

    /// Remove a name. The instance count is not decremented.
    pub fn unregister(&self, category: &str, scope: MechanismId, name: &str) -> Option<u64> {
        let mut categories = self.categories.lock();
        categories
            .get_mut(category)
            .and_then(|c| c.instances.remove(&(scope, name.to_string())))
    }

    pub fn lookup(&self, category: &str, scope: MechanismId, name: &str) -> Option<u64> {
        let categories = self.categories.lock();
        categories
            .get(category)
            .and_then(|c| c.instances.get(&(scope, name.to_string())).copied())
    }

    /// Instances ever registered in `category`.
    pub fn instance_count(&self, category: &str) -> u64 {
        self.categories.lock().get(category).map_or(0, |c| c.instance_count)
    }

    /// Names currently registered in `category` for `scope`, sorted.
    pub fn names(&self, category: &str, scope: MechanismId) -> Vec<String> {
        let categories = self.categories.lock();
        let mut names: Vec<String> = categories
            .get(category)
            .map(|c| {
                c.instances
                    .keys()
                    .filter(|(s, _)| *s == scope)
                    .map(|(_, n)| n.clone())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }
}

// ============================================================================
// ProjectionTypeRegistry
// ============================================================================

/// Keyword → Projection type lookup.
#[derive(Debug, Clone, Default)]
pub struct ProjectionTypeRegistry {
    types: HashMap<String, Arc<ProjectionType>>,
}

impl ProjectionTypeRegistry {
    /// Registry holding no types at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry pre-populated with `Mapping` and `ControlSignal`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register(ProjectionType::new(
            MAPPING,
            ProjectionFamily::Mapping,
            Arc::new(MappingFunction),
        ));
        registry.register(ProjectionType::new(
            CONTROL_SIGNAL,
            ProjectionFamily::ControlSignal,
            Arc::new(ControlSignalFunction),
        ));
        registry
    }

    /// Register (or replace) a type under its keyword.
    pub fn register(&mut self, projection_type: ProjectionType) -> Arc<ProjectionType> {
        let projection_type = Arc::new(projection_type);
        self.types
            .insert(projection_type.keyword.clone(), Arc::clone(&projection_type));
        projection_type
    }

    pub fn get(&self, keyword: &str) -> Option<Arc<ProjectionType>> {
        self.types.get(keyword).cloned()
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.types.contains_key(keyword)
    }

    pub fn keywords(&self) -> Vec<&str> {
        let mut keywords: Vec<&str> = self.types.keys().map(String::as_str).collect();
        keywords.sort_unstable();
        keywords
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_requested_name() {
        let reg = NameRegistry::new();
        let name = reg.register("InputState", MechanismId(1), Some("stimulus"), 10);
        assert_eq!(name, "stimulus");
        assert_eq!(reg.lookup("InputState", MechanismId(1), "stimulus"), Some(10));
    }

    #[test]
    fn test_collision_is_suffixed_within_scope() {
        let reg = NameRegistry::new();
        assert_eq!(reg.register("InputState", MechanismId(1), Some("x"), 1), "x");
        assert_eq!(reg.register("InputState", MechanismId(1), Some("x"), 2), "x-1");
        assert_eq!(reg.register("InputState", MechanismId(1), Some("x"), 3), "x-2");
        // Other owners and other categories have their own namespaces.
        assert_eq!(reg.register("InputState", MechanismId(2), Some("x"), 4), "x");
        assert_eq!(reg.register("OutputState", MechanismId(1), Some("x"), 5), "x");
        assert_eq!(reg.instance_count("InputState"), 4);
    }

    #[test]
    fn test_generated_names_use_instance_count() {
        let reg = NameRegistry::new();
        assert_eq!(reg.register("ParameterState", MechanismId(1), None, 1), "ParameterState-0");
        assert_eq!(reg.register("ParameterState", MechanismId(1), None, 2), "ParameterState-1");
    }

    #[test]
    fn test_unregister_frees_name() {
        let reg = NameRegistry::new();
        reg.register("InputState", MechanismId(1), Some("x"), 1);
        assert_eq!(reg.unregister("InputState", MechanismId(1), "x"), Some(1));
        assert_eq!(reg.register("InputState", MechanismId(1), Some("x"), 2), "x");
        assert_eq!(reg.names("InputState", MechanismId(1)), vec!["x"]);
    }

    #[test]
    fn test_builtin_projection_types() {
        let types = ProjectionTypeRegistry::with_builtins();
        assert_eq!(types.keywords(), vec!["ControlSignal", "Mapping"]);
        assert_eq!(types.get(MAPPING).unwrap().family, ProjectionFamily::Mapping);
        assert!(types.get("Learning").is_none());
    }
}
