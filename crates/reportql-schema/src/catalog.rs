//! Snapshot catalog and relationship-path search

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{SchemaDescriptor, SchemaError, TableDescriptor};

/// One traversal step on a relationship path between two tables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathHop {
    pub from_table: String,
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
}

/// Read-mostly store of schema snapshots.
///
/// Each schema is held as an `Arc<SchemaDescriptor>`; a reload validates the
/// incoming descriptor and replaces the pointer in one step, so requests that
/// already hold the old snapshot finish consistently. The generation counter
/// lets the result cache detect entries minted against a stale snapshot.
pub struct SchemaCatalog {
    schemas: DashMap<String, Arc<SchemaDescriptor>>,
    generation: AtomicU64,
}

impl SchemaCatalog {
    pub fn new() -> Self {
        Self {
            schemas: DashMap::new(),
            generation: AtomicU64::new(0),
        }
    }

    fn key(name: &str) -> String {
        name.to_ascii_uppercase()
    }

    /// Validate and install (or replace) a schema snapshot
    pub fn install(&self, descriptor: SchemaDescriptor) -> Result<(), SchemaError> {
        descriptor.validate()?;
        let name = descriptor.name.clone();
        self.schemas.insert(Self::key(&name), Arc::new(descriptor));
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        info!(schema = %name, generation, "schema snapshot installed");
        Ok(())
    }

    /// Fetch the current snapshot for a schema
    pub fn load(&self, name: &str) -> Result<Arc<SchemaDescriptor>, SchemaError> {
        self.schemas
            .get(&Self::key(name))
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| SchemaError::SchemaNotFound(name.to_string()))
    }

    pub fn get_table(&self, schema: &str, table: &str) -> Option<TableDescriptor> {
        let snapshot = self.load(schema).ok()?;
        snapshot.table(table).cloned()
    }

    /// Bumped on every install; cache entries compare against it
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Shortest relationship path between two tables, or `None` when the
    /// tables are disconnected. Disconnection is a hard failure for join
    /// generation upstream, never silently ignored.
    pub fn find_relationship_path(
        &self,
        schema: &str,
        table_a: &str,
        table_b: &str,
    ) -> Result<Option<Vec<PathHop>>, SchemaError> {
        let snapshot = self.load(schema)?;
        Ok(find_path(&snapshot, table_a, table_b))
    }
}

impl Default for SchemaCatalog {
    fn default() -> Self {
        Self::new()
    }
}

/// Breadth-first search over the undirected foreign-key graph.
///
/// Adjacency is built in descriptor order and the frontier is a FIFO queue,
/// so the returned path is shortest and deterministic for a given snapshot.
pub fn find_path(schema: &SchemaDescriptor, table_a: &str, table_b: &str) -> Option<Vec<PathHop>> {
    let start = schema.table(table_a)?.name.clone();
    let goal = schema.table(table_b)?.name.clone();
    if start.eq_ignore_ascii_case(&goal) {
        return Some(Vec::new());
    }

    let mut adjacency: HashMap<String, Vec<PathHop>> = HashMap::new();
    for table in &schema.tables {
        for rel in &table.relationships {
            let referenced = match schema.table(&rel.referenced_table) {
                Some(t) => t.name.clone(),
                None => continue,
            };
            adjacency.entry(table.name.clone()).or_default().push(PathHop {
                from_table: table.name.clone(),
                from_column: rel.local_column.clone(),
                to_table: referenced.clone(),
                to_column: rel.referenced_column.clone(),
            });
            adjacency.entry(referenced.clone()).or_default().push(PathHop {
                from_table: referenced,
                from_column: rel.referenced_column.clone(),
                to_table: table.name.clone(),
                to_column: rel.local_column.clone(),
            });
        }
    }

    let mut queue = VecDeque::new();
    let mut parent: HashMap<String, PathHop> = HashMap::new();
    let mut visited: Vec<String> = vec![start.clone()];
    queue.push_back(start);

    while let Some(current) = queue.pop_front() {
        let Some(edges) = adjacency.get(&current) else {
            continue;
        };
        for hop in edges {
            if visited.iter().any(|v| v.eq_ignore_ascii_case(&hop.to_table)) {
                continue;
            }
            visited.push(hop.to_table.clone());
            parent.insert(hop.to_table.clone(), hop.clone());
            if hop.to_table.eq_ignore_ascii_case(&goal) {
                let mut path = Vec::new();
                let mut cursor = hop.to_table.clone();
                while let Some(step) = parent.get(&cursor) {
                    cursor = step.from_table.clone();
                    path.push(step.clone());
                }
                path.reverse();
                return Some(path);
            }
            queue.push_back(hop.to_table.clone());
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Cardinality, ColumnDescriptor, RelationshipDescriptor, SemanticType};

    fn three_hop_schema() -> SchemaDescriptor {
        // REGIONS <- CUSTOMERS <- SALES, ISLANDS disconnected
        SchemaDescriptor::new(
            "RETAIL",
            vec![
                TableDescriptor::new(
                    "REGIONS",
                    vec![ColumnDescriptor::new("REGION_ID", SemanticType::Identifier)],
                ),
                TableDescriptor::new(
                    "CUSTOMERS",
                    vec![
                        ColumnDescriptor::new("CUSTOMER_ID", SemanticType::Identifier),
                        ColumnDescriptor::new("REGION_ID", SemanticType::Identifier),
                    ],
                )
                .with_relationships(vec![RelationshipDescriptor {
                    local_column: "REGION_ID".to_string(),
                    referenced_table: "REGIONS".to_string(),
                    referenced_column: "REGION_ID".to_string(),
                    cardinality: Cardinality::OneToMany,
                }]),
                TableDescriptor::new(
                    "SALES",
                    vec![
                        ColumnDescriptor::new("SALE_ID", SemanticType::Identifier),
                        ColumnDescriptor::new("CUSTOMER_ID", SemanticType::Identifier),
                    ],
                )
                .with_relationships(vec![RelationshipDescriptor {
                    local_column: "CUSTOMER_ID".to_string(),
                    referenced_table: "CUSTOMERS".to_string(),
                    referenced_column: "CUSTOMER_ID".to_string(),
                    cardinality: Cardinality::OneToMany,
                }]),
                TableDescriptor::new(
                    "ISLANDS",
                    vec![ColumnDescriptor::new("ISLAND_ID", SemanticType::Identifier)],
                ),
            ],
        )
    }

    #[test]
    fn test_direct_path() {
        let schema = three_hop_schema();
        let path = find_path(&schema, "SALES", "CUSTOMERS").unwrap();
        assert_eq!(path.len(), 1);
        assert_eq!(path[0].from_table, "SALES");
        assert_eq!(path[0].to_table, "CUSTOMERS");
    }

    #[test]
    fn test_two_hop_path() {
        let schema = three_hop_schema();
        let path = find_path(&schema, "SALES", "REGIONS").unwrap();
        assert_eq!(path.len(), 2);
        assert_eq!(path[0].to_table, "CUSTOMERS");
        assert_eq!(path[1].to_table, "REGIONS");
    }

    #[test]
    fn test_reverse_direction_path() {
        let schema = three_hop_schema();
        let path = find_path(&schema, "REGIONS", "SALES").unwrap();
        assert_eq!(path.len(), 2);
        assert_eq!(path[0].from_table, "REGIONS");
        assert_eq!(path[1].to_table, "SALES");
    }

    #[test]
    fn test_disconnected_tables_yield_none() {
        let schema = three_hop_schema();
        assert!(find_path(&schema, "SALES", "ISLANDS").is_none());
    }

    #[test]
    fn test_same_table_yields_empty_path() {
        let schema = three_hop_schema();
        assert_eq!(find_path(&schema, "SALES", "sales"), Some(Vec::new()));
    }

    #[test]
    fn test_catalog_install_and_load() {
        let catalog = SchemaCatalog::new();
        catalog.install(three_hop_schema()).unwrap();
        let snapshot = catalog.load("retail").unwrap();
        assert_eq!(snapshot.tables.len(), 4);
        assert!(catalog.load("HCM").is_err());
    }

    #[test]
    fn test_catalog_reload_bumps_generation() {
        let catalog = SchemaCatalog::new();
        catalog.install(three_hop_schema()).unwrap();
        let before = catalog.generation();
        catalog.install(three_hop_schema()).unwrap();
        assert!(catalog.generation() > before);
    }

    #[test]
    fn test_catalog_reload_replaces_snapshot() {
        let catalog = SchemaCatalog::new();
        catalog.install(three_hop_schema()).unwrap();
        let old = catalog.load("RETAIL").unwrap();

        let mut smaller = three_hop_schema();
        smaller.tables.pop();
        catalog.install(smaller).unwrap();

        // The old Arc is still intact for in-flight readers.
        assert_eq!(old.tables.len(), 4);
        assert_eq!(catalog.load("RETAIL").unwrap().tables.len(), 3);
    }

    #[test]
    fn test_get_table() {
        let catalog = SchemaCatalog::new();
        catalog.install(three_hop_schema()).unwrap();
        assert!(catalog.get_table("RETAIL", "sales").is_some());
        assert!(catalog.get_table("RETAIL", "ORDERS").is_none());
        assert!(catalog.get_table("FIN", "SALES").is_none());
    }
}
