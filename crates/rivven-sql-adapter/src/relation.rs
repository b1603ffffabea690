//! Contract between the adapter and a relation-mapping layer
//!
//! The mapping layer owns relations; the adapter only installs its SQL
//! capability on relation classes and binds relation models to datasets.

use std::fmt;

use crate::dataset::DatasetHandle;
use crate::error::Result;

/// Where write commands for this adapter's relations are dispatched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandNamespace {
    /// SQL command family
    Sql,
}

impl CommandNamespace {
    /// Namespace name
    pub const fn name(self) -> &'static str {
        match self {
            Self::Sql => "sql",
        }
    }
}

impl fmt::Display for CommandNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// SQL capability installed on relation classes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationInclusion {
    namespace: CommandNamespace,
}

impl RelationInclusion {
    /// Capability for the SQL command family
    pub const fn sql() -> Self {
        Self {
            namespace: CommandNamespace::Sql,
        }
    }

    /// Namespace write commands go to
    pub fn command_namespace(&self) -> CommandNamespace {
        self.namespace
    }

    /// Column names of a relation's dataset
    pub async fn columns(&self, dataset: &DatasetHandle) -> Result<Vec<String>> {
        dataset.columns().await
    }

    /// Column names qualified with the dataset's table (`users.id`)
    pub async fn qualified_columns(&self, dataset: &DatasetHandle) -> Result<Vec<String>> {
        Ok(dataset
            .columns()
            .await?
            .into_iter()
            .map(|column| format!("{}.{}", dataset.table(), column))
            .collect())
    }
}

/// Relation class as seen by the adapter
pub trait RelationClass {
    /// Class name, for diagnostics
    fn name(&self) -> &str;

    /// Install a capability
    fn include(&mut self, inclusion: RelationInclusion);

    /// Installed capabilities, in installation order
    fn inclusions(&self) -> &[RelationInclusion];
}

/// Minimal relation class definition
#[derive(Debug, Clone, Default)]
pub struct RelationClassDef {
    name: String,
    inclusions: Vec<RelationInclusion>,
}

impl RelationClassDef {
    /// Class with no capabilities
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inclusions: Vec::new(),
        }
    }
}

impl RelationClass for RelationClassDef {
    fn name(&self) -> &str {
        &self.name
    }

    fn include(&mut self, inclusion: RelationInclusion) {
        self.inclusions.push(inclusion);
    }

    fn inclusions(&self) -> &[RelationInclusion] {
        &self.inclusions
    }
}

/// Model bound to a relation, backed by a dataset once the adapter binds it
#[derive(Debug, Clone, Default)]
pub struct RelationModel {
    dataset: Option<DatasetHandle>,
}

impl RelationModel {
    /// Unbound model
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the model to a dataset
    pub fn set_dataset(&mut self, dataset: DatasetHandle) {
        self.dataset = Some(dataset);
    }

    /// Bound dataset, if any
    pub fn dataset(&self) -> Option<&DatasetHandle> {
        self.dataset.as_ref()
    }
}

/// Relation instance as seen by the adapter
pub trait Relation {
    /// Dataset the relation reads from
    fn dataset(&self) -> &DatasetHandle;

    /// The relation's model
    fn model(&self) -> &RelationModel;

    /// Mutable access to the relation's model
    fn model_mut(&mut self) -> &mut RelationModel;
}

/// Relation over a single dataset
#[derive(Debug, Clone)]
pub struct DatasetRelation {
    dataset: DatasetHandle,
    model: RelationModel,
}

impl DatasetRelation {
    /// Relation with an unbound model
    pub fn new(dataset: DatasetHandle) -> Self {
        Self {
            dataset,
            model: RelationModel::new(),
        }
    }
}

impl Relation for DatasetRelation {
    fn dataset(&self) -> &DatasetHandle {
        &self.dataset
    }

    fn model(&self) -> &RelationModel {
        &self.model
    }

    fn model_mut(&mut self) -> &mut RelationModel {
        &mut self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_namespace() {
        assert_eq!(CommandNamespace::Sql.name(), "sql");
        assert_eq!(CommandNamespace::Sql.to_string(), "sql");
        assert_eq!(
            RelationInclusion::sql().command_namespace(),
            CommandNamespace::Sql
        );
    }

    #[test]
    fn test_relation_class_def() {
        let mut class = RelationClassDef::new("Users");
        assert_eq!(class.name(), "Users");
        assert!(class.inclusions().is_empty());

        class.include(RelationInclusion::sql());
        assert_eq!(class.inclusions(), &[RelationInclusion::sql()]);
    }

    #[test]
    fn test_unbound_model() {
        assert!(RelationModel::new().dataset().is_none());
    }
}
