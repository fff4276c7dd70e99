// verity-core/src/domain/plan.rs
//
// The immutable declaration of what a run will do, produced by the
// planner and shown to the user before anything executes.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Create,
    Update,
    NoChange,
    Delete,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ModelChange {
    pub model_name: String,
    pub change_type: ChangeType,
    pub reason: String,
    pub affected: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct PlanSummary {
    pub total_models: usize,
    pub creates: usize,
    pub updates: usize,
    pub deletes: usize,
    pub no_changes: usize,
    pub execution_levels: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ExecutionPlan {
    pub changes: Vec<ModelChange>,
    pub execution_order: Vec<Vec<String>>,
}

impl ExecutionPlan {
    pub fn add_change(&mut self, change: ModelChange) {
        self.changes.push(change);
    }

    pub fn changes_of(&self, change_type: ChangeType) -> impl Iterator<Item = &ModelChange> {
        self.changes
            .iter()
            .filter(move |c| c.change_type == change_type)
    }

    pub fn models_to_execute(&self) -> Vec<String> {
        self.changes
            .iter()
            .filter(|c| matches!(c.change_type, ChangeType::Create | ChangeType::Update))
            .map(|c| c.model_name.clone())
            .collect()
    }

    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            total_models: self.changes.len(),
            creates: self.changes_of(ChangeType::Create).count(),
            updates: self.changes_of(ChangeType::Update).count(),
            deletes: self.changes_of(ChangeType::Delete).count(),
            no_changes: self.changes_of(ChangeType::NoChange).count(),
            execution_levels: self.execution_order.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_counts_each_change_type() {
        let mut plan = ExecutionPlan::default();
        plan.add_change(ModelChange {
            model_name: "a".into(),
            change_type: ChangeType::Create,
            reason: "new model".into(),
            affected: vec![],
        });
        plan.add_change(ModelChange {
            model_name: "b".into(),
            change_type: ChangeType::NoChange,
            reason: "no changes detected".into(),
            affected: vec![],
        });
        plan.execution_order = vec![vec!["a".into()]];

        let summary = plan.summary();
        assert_eq!(summary.creates, 1);
        assert_eq!(summary.no_changes, 1);
        assert_eq!(summary.execution_levels, 1);
        assert_eq!(plan.models_to_execute(), vec!["a".to_string()]);
    }
}
