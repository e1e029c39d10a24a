use serde::Deserialize;

/// Evaluator-wide settings, fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EvaluatorConfig {
    /// Deepest chain of derived fields resolved while deriving another.
    pub max_derived_field_depth: usize,
    /// Deepest chain of nested user-defined function calls.
    pub max_function_depth: usize,
    /// Report node identities and decision paths even when no output asks.
    pub track_entities: bool,
    /// Run embedded verification fixtures once at construction.
    pub verify_on_build: bool,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        EvaluatorConfig {
            max_derived_field_depth: 64,
            max_function_depth: 64,
            track_entities: false,
            verify_on_build: true,
        }
    }
}

impl EvaluatorConfig {
    pub fn max_derived_field_depth(mut self, depth: usize) -> Self {
        self.max_derived_field_depth = depth;
        self
    }

    pub fn max_function_depth(mut self, depth: usize) -> Self {
        self.max_function_depth = depth;
        self
    }

    pub fn track_entities(mut self, track: bool) -> Self {
        self.track_entities = track;
        self
    }

    pub fn verify_on_build(mut self, verify: bool) -> Self {
        self.verify_on_build = verify;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EvaluatorConfig::default();
        assert_eq!(config.max_derived_field_depth, 64);
        assert!(config.verify_on_build);
        assert!(!config.track_entities);
    }

    #[test]
    fn test_partial_deserialize() {
        let config: EvaluatorConfig = serde_json::from_str(r#"{"maxFunctionDepth": 8, "trackEntities": true}"#).unwrap();
        assert_eq!(config.max_function_depth, 8);
        assert_eq!(config.max_derived_field_depth, 64);
        assert!(config.track_entities);
    }

    #[test]
    fn test_builder() {
        let config = EvaluatorConfig::default().max_derived_field_depth(2).verify_on_build(false);
        assert_eq!(config.max_derived_field_depth, 2);
        assert!(!config.verify_on_build);
    }
}
