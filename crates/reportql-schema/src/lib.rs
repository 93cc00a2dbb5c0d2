//! Schema metadata for the generation pipeline
//!
//! Read-only descriptors for tables, columns, and foreign-key relationships,
//! loaded wholesale per schema. Descriptors are validated on load and never
//! mutated afterwards; a reload swaps in a fresh snapshot.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod catalog;
pub use catalog::{PathHop, SchemaCatalog};

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("schema not found: {0}")]
    SchemaNotFound(String),

    #[error("duplicate table name in schema {schema}: {table}")]
    DuplicateTable { schema: String, table: String },

    #[error("table {table} references unknown table {referenced}")]
    DanglingRelationship { table: String, referenced: String },

    #[error("relationship on table {table} names unknown column {column}")]
    UnknownRelationshipColumn { table: String, column: String },
}

/// Semantic column type, coarser than any SQL type system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
    Text,
    Number,
    Date,
    Boolean,
    Identifier,
}

impl SemanticType {
    /// Aggregatable as a measure (SUM/AVG make sense)
    pub fn is_numeric(&self) -> bool {
        matches!(self, SemanticType::Number)
    }

    pub fn is_date(&self) -> bool {
        matches!(self, SemanticType::Date)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub semantic_type: SemanticType,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, semantic_type: SemanticType) -> Self {
        Self { name: name.into(), semantic_type }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    OneToMany,
    ManyToMany,
}

/// Foreign-key edge from a local column to a column on another table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipDescriptor {
    pub local_column: String,
    pub referenced_table: String,
    pub referenced_column: String,
    pub cardinality: Cardinality,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableDescriptor {
    pub name: String,
    pub columns: Vec<ColumnDescriptor>,
    #[serde(default)]
    pub relationships: Vec<RelationshipDescriptor>,
    /// Approximate row count, used by the validator's large-table heuristic
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_hint: Option<u64>,
}

impl TableDescriptor {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnDescriptor>) -> Self {
        Self {
            name: name.into(),
            columns,
            relationships: Vec::new(),
            row_hint: None,
        }
    }

    pub fn with_relationships(mut self, relationships: Vec<RelationshipDescriptor>) -> Self {
        self.relationships = relationships;
        self
    }

    pub fn with_row_hint(mut self, rows: u64) -> Self {
        self.row_hint = Some(rows);
        self
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn first_column_of_type(&self, semantic_type: SemanticType) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.semantic_type == semantic_type)
    }

    pub fn numeric_columns(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns.iter().filter(|c| c.semantic_type.is_numeric())
    }
}

/// One named schema: an ordered, immutable set of tables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaDescriptor {
    pub name: String,
    pub tables: Vec<TableDescriptor>,
}

impl SchemaDescriptor {
    pub fn new(name: impl Into<String>, tables: Vec<TableDescriptor>) -> Self {
        Self { name: name.into(), tables }
    }

    pub fn table(&self, name: &str) -> Option<&TableDescriptor> {
        self.tables.iter().find(|t| t.name.eq_ignore_ascii_case(name))
    }

    /// Load-time integrity check. Every relationship must stay inside this
    /// schema: referenced tables and both endpoint columns must exist.
    pub fn validate(&self) -> Result<(), SchemaError> {
        for (idx, table) in self.tables.iter().enumerate() {
            if self.tables[..idx]
                .iter()
                .any(|t| t.name.eq_ignore_ascii_case(&table.name))
            {
                return Err(SchemaError::DuplicateTable {
                    schema: self.name.clone(),
                    table: table.name.clone(),
                });
            }

            for rel in &table.relationships {
                if table.column(&rel.local_column).is_none() {
                    return Err(SchemaError::UnknownRelationshipColumn {
                        table: table.name.clone(),
                        column: rel.local_column.clone(),
                    });
                }
                let Some(referenced) = self.table(&rel.referenced_table) else {
                    return Err(SchemaError::DanglingRelationship {
                        table: table.name.clone(),
                        referenced: rel.referenced_table.clone(),
                    });
                };
                if referenced.column(&rel.referenced_column).is_none() {
                    return Err(SchemaError::UnknownRelationshipColumn {
                        table: rel.referenced_table.clone(),
                        column: rel.referenced_column.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}
