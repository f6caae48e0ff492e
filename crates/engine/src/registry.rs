//! Workflow definition catalog

use careflow_types::{
    WorkflowDefinition, WorkflowDefinitionId, WorkflowError, WorkflowResult, WorkflowTriggerType,
};
use parking_lot::RwLock;
use std::collections::HashMap;

/// In-memory catalog of workflow definitions
///
/// Definitions are validated on registration and immutable afterwards;
/// re-registering an id replaces the previous version.
#[derive(Default)]
pub struct DefinitionRegistry {
    definitions: RwLock<HashMap<WorkflowDefinitionId, WorkflowDefinition>>,
}

impl DefinitionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and store a definition
    pub fn register(&self, definition: WorkflowDefinition) -> WorkflowResult<()> {
        definition.validate()?;
        tracing::info!(
            definition_id = %definition.id,
            trigger = %definition.trigger_type,
            steps = definition.steps.len(),
            "workflow definition registered"
        );
        self.definitions
            .write()
            .insert(definition.id.clone(), definition);
        Ok(())
    }

    /// Remove a definition; running executions are unaffected
    pub fn unregister(&self, id: &WorkflowDefinitionId) -> WorkflowResult<WorkflowDefinition> {
        self.definitions
            .write()
            .remove(id)
            .ok_or_else(|| WorkflowError::DefinitionNotFound(id.clone()))
    }

    pub fn get(&self, id: &WorkflowDefinitionId) -> Option<WorkflowDefinition> {
        self.definitions.read().get(id).cloned()
    }

    pub fn contains(&self, id: &WorkflowDefinitionId) -> bool {
        self.definitions.read().contains_key(id)
    }

    pub fn list(&self) -> Vec<WorkflowDefinition> {
        let mut all: Vec<_> = self.definitions.read().values().cloned().collect();
        all.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        all
    }

    pub fn count(&self) -> usize {
        self.definitions.read().len()
    }

    /// Enabled definitions listening for a trigger type
    pub fn by_trigger(&self, trigger: WorkflowTriggerType) -> Vec<WorkflowDefinition> {
        let mut matched: Vec<_> = self
            .definitions
            .read()
            .values()
            .filter(|d| d.enabled && d.trigger_type == trigger)
            .cloned()
            .collect();
        matched.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        matched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use careflow_types::AssistantType;
    use serde_json::json;

    fn definition(id: &str, trigger: WorkflowTriggerType) -> WorkflowDefinition {
        WorkflowDefinition::builder()
            .with_id(id)
            .with_name("Flow")
            .with_trigger(trigger)
            .add_ai_step(
                "draft",
                "Draft",
                AssistantType::Documentation,
                json!({}),
                false,
                1,
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = DefinitionRegistry::new();
        registry
            .register(definition("flow-a", WorkflowTriggerType::EncounterCreated))
            .unwrap();

        assert_eq!(registry.count(), 1);
        assert!(registry.contains(&WorkflowDefinitionId::new("flow-a")));
        assert!(registry.get(&WorkflowDefinitionId::new("flow-b")).is_none());
    }

    #[test]
    fn test_register_replaces_same_id() {
        let registry = DefinitionRegistry::new();
        registry
            .register(definition("flow-a", WorkflowTriggerType::EncounterCreated))
            .unwrap();
        registry
            .register(definition("flow-a", WorkflowTriggerType::ManualTrigger))
            .unwrap();

        assert_eq!(registry.count(), 1);
        let stored = registry.get(&WorkflowDefinitionId::new("flow-a")).unwrap();
        assert_eq!(stored.trigger_type, WorkflowTriggerType::ManualTrigger);
    }

    #[test]
    fn test_by_trigger_skips_disabled() {
        let registry = DefinitionRegistry::new();
        registry
            .register(definition("flow-a", WorkflowTriggerType::LabResultReceived))
            .unwrap();

        let mut disabled = definition("flow-b", WorkflowTriggerType::LabResultReceived);
        disabled.enabled = false;
        registry.register(disabled).unwrap();

        let matched = registry.by_trigger(WorkflowTriggerType::LabResultReceived);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].id.as_str(), "flow-a");
    }

    #[test]
    fn test_unregister_missing_errors() {
        let registry = DefinitionRegistry::new();
        let err = registry
            .unregister(&WorkflowDefinitionId::new("nope"))
            .unwrap_err();
        assert!(matches!(err, WorkflowError::DefinitionNotFound(_)));
    }
}
