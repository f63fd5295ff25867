//! Options recognized by the lifecycle phases

use serde::{Deserialize, Serialize};

/// Per-invocation phase options
///
/// Deserializes from camelCase so it can be embedded in a workload spec or a
/// controller config file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PhaseOptions {
    /// Detach schema-defining resources (CustomResourceDefinitions) from the
    /// owner instead of deleting them. The detach is one-way.
    pub skip_schema_resource_deletion: bool,
}

impl PhaseOptions {
    /// Set whether schema-defining resources survive teardown
    pub fn preserve_schema_resources(mut self, preserve: bool) -> Self {
        self.skip_schema_resource_deletion = preserve;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_deletes_everything() {
        assert!(!PhaseOptions::default().skip_schema_resource_deletion);
    }

    #[test]
    fn deserializes_camel_case_with_defaults() {
        let opts: PhaseOptions =
            serde_json::from_str(r#"{"skipSchemaResourceDeletion": true}"#).expect("valid json");
        assert!(opts.skip_schema_resource_deletion);

        let opts: PhaseOptions = serde_json::from_str("{}").expect("valid json");
        assert_eq!(opts, PhaseOptions::default());
    }

    #[test]
    fn builder_sets_flag() {
        let opts = PhaseOptions::default().preserve_schema_resources(true);
        assert!(opts.skip_schema_resource_deletion);
    }
}
