// verity-core/src/domain/lineage.rs
//
// Column-level provenance: which upstream (table, column) pairs and which
// transformations feed each output column of a model.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Provenance of a single output column.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct ColumnLineage {
    pub column_name: String,
    /// Upstream `(table, column)` pairs this column's expression reads from.
    pub source_columns: Vec<(String, String)>,
    /// One tag per function call applied on the way to this column, e.g.
    /// `"upper"`, `"sum"`, `"cast"`.
    pub transformations: Vec<String>,
}

impl ColumnLineage {
    pub fn new(column_name: impl Into<String>) -> Self {
        ColumnLineage {
            column_name: column_name.into(),
            source_columns: Vec::new(),
            transformations: Vec::new(),
        }
    }
}

/// Per-model lineage: every output column mapped to its provenance, plus
/// the set of model names this model's SELECT depends on.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct ModelLineage {
    pub model_name: String,
    pub columns: HashMap<String, ColumnLineage>,
    pub dependencies: BTreeSet<String>,
}

impl ModelLineage {
    pub fn new(model_name: impl Into<String>) -> Self {
        ModelLineage {
            model_name: model_name.into(),
            columns: HashMap::new(),
            dependencies: BTreeSet::new(),
        }
    }

    pub fn add_column(&mut self, lineage: ColumnLineage) {
        self.columns.insert(lineage.column_name.clone(), lineage);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_lineage_tracks_sources_and_transforms() {
        let mut lineage = ModelLineage::new("orders_summary");
        let mut col = ColumnLineage::new("total_amount");
        col.source_columns
            .push(("orders".to_string(), "amount".to_string()));
        col.transformations.push("sum".to_string());
        lineage.add_column(col);

        let stored = lineage.columns.get("total_amount").expect("column present");
        assert_eq!(stored.source_columns[0].0, "orders");
        assert_eq!(stored.transformations[0], "sum");
    }
}
