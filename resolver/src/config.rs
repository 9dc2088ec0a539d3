// config.rs — Generation configuration
//
// Settings an integrator supplies alongside the component model: the API
// name prefix, the communication-boundary predicate, and the mapping of
// events onto OS tasks. All plain serde data so outer layers can load it
// from whatever format they keep project settings in.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// One OS task definition with the event names mapped onto it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OsTaskConfig {
    pub name: String,
    /// Event names dispatched by this task. Events not named by any task
    /// fall to the default task.
    #[serde(default)]
    pub events: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenConfig {
    /// Prefix for all generated API symbols (long and short names).
    pub prefix: String,
    /// Components treated as inter-ECU communication boundaries. A signal
    /// provided by one of these bypasses the shared-storage optimization and
    /// is accessed through a generated call-based accessor instead.
    #[serde(default)]
    pub boundary_components: BTreeSet<String>,
    /// OS tasks in declaration order. When empty, a single default task
    /// named `<Partition>_Task` is synthesized. The first task doubles as
    /// the default for unmapped events.
    #[serde(default)]
    pub os_tasks: Vec<OsTaskConfig>,
    /// Also emit the test-double (mock) API pair.
    #[serde(default)]
    pub mock_api: bool,
}

impl Default for GenConfig {
    fn default() -> Self {
        GenConfig {
            prefix: "Rte".to_string(),
            boundary_components: BTreeSet::new(),
            os_tasks: Vec::new(),
            mock_api: false,
        }
    }
}

impl GenConfig {
    /// The boundary predicate: does a signal provided by `component` cross
    /// a communication boundary?
    pub fn is_boundary(&self, component: &str) -> bool {
        self.boundary_components.contains(component)
    }

    /// Compact JSON form used for fingerprinting.
    pub fn canonical_json(&self) -> String {
        serde_json::to_string(self).expect("internal: config serialization")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_prefix() {
        let cfg = GenConfig::default();
        assert_eq!(cfg.prefix, "Rte");
        assert!(!cfg.mock_api);
    }

    #[test]
    fn boundary_predicate() {
        let mut cfg = GenConfig::default();
        cfg.boundary_components.insert("CanIf".to_string());
        assert!(cfg.is_boundary("CanIf"));
        assert!(!cfg.is_boundary("Producer"));
    }

    #[test]
    fn config_roundtrips_through_json() {
        let mut cfg = GenConfig::default();
        cfg.os_tasks.push(OsTaskConfig {
            name: "AppTask".to_string(),
            events: vec!["T10".to_string()],
        });
        let json = cfg.canonical_json();
        let back: GenConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.os_tasks[0].name, "AppTask");
        assert_eq!(back.os_tasks[0].events, vec!["T10"]);
    }
}
