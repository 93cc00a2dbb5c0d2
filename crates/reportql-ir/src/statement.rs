//! The intermediate statement: a dialect-neutral SQL shape.
//!
//! Built by the SQL builder from classified intents and resolved entities,
//! rendered to literal text by a dialect renderer. Invariant: every column
//! reference must name a table present in `from` or `joins` (or carry no
//! table qualifier at all for single-table statements).

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Column reference, optionally qualified by table
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnRef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    pub column: String,
}

impl ColumnRef {
    pub fn bare(column: impl Into<String>) -> Self {
        Self { table: None, column: column.into() }
    }

    pub fn qualified(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self { table: Some(table.into()), column: column.into() }
    }
}

/// Aggregate functions the builder can emit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggregateFunc {
    Sum,
    Count,
    Avg,
    Min,
    Max,
}

impl AggregateFunc {
    pub fn as_sql(&self) -> &'static str {
        match self {
            AggregateFunc::Sum => "SUM",
            AggregateFunc::Count => "COUNT",
            AggregateFunc::Avg => "AVG",
            AggregateFunc::Min => "MIN",
            AggregateFunc::Max => "MAX",
        }
    }
}

/// One select-list entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SelectItem {
    Column { col: ColumnRef },
    Aggregate {
        func: AggregateFunc,
        col: ColumnRef,
        #[serde(skip_serializing_if = "Option::is_none")]
        alias: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinType {
    Inner,
    Left,
}

/// One join hop: joined table plus the column pairs connecting it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Join {
    pub table: String,
    pub join_type: JoinType,
    /// Equality pairs (left column, right column). Empty means the join has
    /// no connecting predicate, which the validator flags as cartesian risk.
    pub on: Vec<(ColumnRef, ColumnRef)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Like,
}

impl CompareOp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Like => "LIKE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Conjunction {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntervalUnit {
    Day,
    Month,
    Year,
}

/// Predicate right-hand side.
///
/// Temporal values stay symbolic here; the dialect renderer materializes
/// them into `SYSDATE - INTERVAL ...`, `NOW() - INTERVAL ...`, etc.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PredicateValue {
    Number { value: f64 },
    String { value: String },
    /// ISO-8601 date literal, e.g. "2024-01-01"
    Date { value: String },
    /// N days/months/years back from now
    RelativeInterval { amount: u32, unit: IntervalUnit },
    /// Start of the current day/month/year
    PeriodStart { unit: IntervalUnit },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    pub column: ColumnRef,
    pub op: CompareOp,
    pub value: PredicateValue,
    /// How this predicate chains onto the previous one; ignored on the first.
    pub conjunction: Conjunction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBy {
    pub column: ColumnRef,
    pub direction: SortDirection,
}

/// Dialect-neutral statement shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntermediateStatement {
    /// Empty select list renders as `SELECT *`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub select: Vec<SelectItem>,

    pub from: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub joins: Vec<Join>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub predicates: Vec<Predicate>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub group_by: Vec<ColumnRef>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub order_by: Vec<OrderBy>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
}

impl IntermediateStatement {
    pub fn single_table(from: impl Into<String>) -> Self {
        Self {
            select: Vec::new(),
            from: from.into(),
            joins: Vec::new(),
            predicates: Vec::new(),
            group_by: Vec::new(),
            order_by: Vec::new(),
            limit: None,
        }
    }

    /// All tables the statement draws from, `from` first
    pub fn tables(&self) -> Vec<&str> {
        let mut tables = vec![self.from.as_str()];
        tables.extend(self.joins.iter().map(|j| j.table.as_str()));
        tables
    }

    pub fn has_aggregate(&self) -> bool {
        self.select
            .iter()
            .any(|item| matches!(item, SelectItem::Aggregate { .. }))
    }

    /// Select-list columns that are not wrapped in an aggregate
    pub fn bare_select_columns(&self) -> Vec<&ColumnRef> {
        self.select
            .iter()
            .filter_map(|item| match item {
                SelectItem::Column { col } => Some(col),
                SelectItem::Aggregate { .. } => None,
            })
            .collect()
    }

    /// Check the table-reference invariant: every qualified column must name
    /// a table present in `from`/`joins`.
    pub fn references_known_tables(&self) -> bool {
        let tables = self.tables();
        let known = |col: &ColumnRef| match &col.table {
            Some(t) => tables.iter().any(|k| k.eq_ignore_ascii_case(t)),
            None => true,
        };

        let select_ok = self.select.iter().all(|item| match item {
            SelectItem::Column { col } => known(col),
            SelectItem::Aggregate { col, .. } => known(col),
        });
        let join_ok = self
            .joins
            .iter()
            .all(|j| j.on.iter().all(|(l, r)| known(l) && known(r)));
        let predicate_ok = self.predicates.iter().all(|p| known(&p.column));
        let group_ok = self.group_by.iter().all(known);
        let order_ok = self.order_by.iter().all(|o| {
            // Order keys may reference an aggregate alias, which carries no table.
            o.column.table.is_none() || known(&o.column)
        });

        select_ok && join_ok && predicate_ok && group_ok && order_ok
    }

    /// Fingerprint over the canonical JSON form. Two structurally identical
    /// statements always hash the same, which backs the determinism tests.
    pub fn fingerprint(&self) -> String {
        let json = serde_json::to_string(self).expect("statement should always serialize");
        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_statement() -> IntermediateStatement {
        IntermediateStatement {
            select: vec![
                SelectItem::Column { col: ColumnRef::qualified("CUSTOMERS", "CUSTOMER_ID") },
                SelectItem::Aggregate {
                    func: AggregateFunc::Sum,
                    col: ColumnRef::qualified("SALES", "PURCHASE_AMOUNT"),
                    alias: Some("SUM_PURCHASE_AMOUNT".to_string()),
                },
            ],
            from: "CUSTOMERS".to_string(),
            joins: vec![Join {
                table: "SALES".to_string(),
                join_type: JoinType::Inner,
                on: vec![(
                    ColumnRef::qualified("CUSTOMERS", "CUSTOMER_ID"),
                    ColumnRef::qualified("SALES", "CUSTOMER_ID"),
                )],
            }],
            predicates: vec![],
            group_by: vec![ColumnRef::qualified("CUSTOMERS", "CUSTOMER_ID")],
            order_by: vec![OrderBy {
                column: ColumnRef::bare("SUM_PURCHASE_AMOUNT"),
                direction: SortDirection::Desc,
            }],
            limit: Some(10),
        }
    }

    #[test]
    fn test_tables_lists_from_then_joins() {
        let stmt = sample_statement();
        assert_eq!(stmt.tables(), vec!["CUSTOMERS", "SALES"]);
    }

    #[test]
    fn test_references_known_tables_holds() {
        assert!(sample_statement().references_known_tables());
    }

    #[test]
    fn test_references_unknown_table_fails() {
        let mut stmt = sample_statement();
        stmt.predicates.push(Predicate {
            column: ColumnRef::qualified("ORDERS", "STATUS"),
            op: CompareOp::Eq,
            value: PredicateValue::String { value: "open".to_string() },
            conjunction: Conjunction::And,
        });
        assert!(!stmt.references_known_tables());
    }

    #[test]
    fn test_fingerprint_stable_across_clones() {
        let stmt = sample_statement();
        assert_eq!(stmt.fingerprint(), stmt.clone().fingerprint());
    }

    #[test]
    fn test_json_round_trip() {
        let stmt = sample_statement();
        let json = serde_json::to_string(&stmt).unwrap();
        let parsed: IntermediateStatement = serde_json::from_str(&json).unwrap();
        assert_eq!(stmt.fingerprint(), parsed.fingerprint());
    }

    #[test]
    fn test_bare_select_columns_skips_aggregates() {
        let stmt = sample_statement();
        let bare = stmt.bare_select_columns();
        assert_eq!(bare.len(), 1);
        assert_eq!(bare[0].column, "CUSTOMER_ID");
    }
}
