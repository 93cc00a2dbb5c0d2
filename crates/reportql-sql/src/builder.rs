//! Intermediate statement assembly
//!
//! Composition rules when several intents match: Aggregation governs the
//! select list and grouping, Ranking governs ordering and the row limit,
//! Filter and Temporal contribute predicates, and the join list mirrors the
//! resolver's relationship path one hop per entry.

use std::collections::BTreeSet;

use reportql_ir::{
    AggregateFunc, ColumnRef, ComplexityTier, CompareOp, Conjunction, IntermediateStatement, Join,
    JoinType, OrderBy, Predicate, PredicateValue, QueryIntent, SelectItem, SortDirection,
};
use reportql_nl::{RequestProfile, Resolution, TemporalSpan};
use reportql_schema::{SchemaDescriptor, SemanticType, TableDescriptor};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("aggregation requested but no numeric column resolved")]
    NoAggregatableColumn,

    #[error("no table resolved to select from")]
    MissingPrimaryTable,
}

/// Complexity of a finished statement, derived from its shape alone.
///
/// A grouped top-N over a join is the window-style case and reports
/// Advanced; a join with aggregation is Complex; one of the two is
/// Moderate; a bare single-table statement is Simple.
pub fn complexity_of(stmt: &IntermediateStatement) -> ComplexityTier {
    let joined = !stmt.joins.is_empty();
    let aggregated = stmt.has_aggregate();
    let ranked = stmt.limit.is_some() && !stmt.order_by.is_empty();
    match (joined, aggregated) {
        (true, true) if ranked => ComplexityTier::Advanced,
        (true, true) => ComplexityTier::Complex,
        (false, false) => ComplexityTier::Simple,
        _ => ComplexityTier::Moderate,
    }
}

pub struct SqlBuilder {
    /// Row limit used when ranking is present but no number is stated
    default_limit: u64,
}

impl SqlBuilder {
    pub fn new(default_limit: u64) -> Self {
        Self { default_limit }
    }

    /// Assemble the dialect-neutral statement.
    pub fn build(
        &self,
        intents: &BTreeSet<QueryIntent>,
        resolution: &Resolution,
        profile: &RequestProfile,
        schema: &SchemaDescriptor,
    ) -> Result<IntermediateStatement, BuildError> {
        let primary_name = resolution
            .primary_table()
            .ok_or(BuildError::MissingPrimaryTable)?;
        let primary = schema
            .table(primary_name)
            .ok_or(BuildError::MissingPrimaryTable)?;

        let mut stmt = IntermediateStatement::single_table(primary.name.clone());

        // Joins: one entry per hop on the resolver's relationship path.
        let join_type = if profile.inclusive_join { JoinType::Left } else { JoinType::Inner };
        for hop in &resolution.join_path {
            stmt.joins.push(Join {
                table: hop.to_table.clone(),
                join_type,
                on: vec![(
                    ColumnRef::qualified(hop.from_table.clone(), hop.from_column.clone()),
                    ColumnRef::qualified(hop.to_table.clone(), hop.to_column.clone()),
                )],
            });
        }
        let qualify = !stmt.joins.is_empty();
        let col_ref = |table: &str, column: &str| {
            if qualify {
                ColumnRef::qualified(table, column)
            } else {
                ColumnRef::bare(column)
            }
        };

        let conjunction = if profile.wants_or { Conjunction::Or } else { Conjunction::And };

        // Predicates before the select list so grouping can exclude
        // filtered columns.
        for comparison in &profile.comparisons {
            let Some((table, column)) =
                bind_comparison_column(comparison.qualifier.as_deref(), &comparison.value, resolution, schema, primary)
            else {
                continue;
            };
            stmt.predicates.push(Predicate {
                column: col_ref(&table, &column),
                op: comparison.op,
                value: comparison.value.clone(),
                conjunction,
            });
        }

        for term in &profile.status_terms {
            if let Some(column) = status_column(primary) {
                stmt.predicates.push(Predicate {
                    column: col_ref(&primary.name, &column),
                    op: CompareOp::Eq,
                    value: PredicateValue::String { value: term.clone() },
                    conjunction,
                });
            }
        }

        if let Some(span) = &profile.temporal {
            if let Some((table, column)) = date_column(resolution, schema, primary) {
                let value = match span {
                    TemporalSpan::Relative { amount, unit } => {
                        PredicateValue::RelativeInterval { amount: *amount, unit: *unit }
                    }
                    TemporalSpan::PeriodStart { unit } => PredicateValue::PeriodStart { unit: *unit },
                    TemporalSpan::Since { date } => PredicateValue::Date { value: date.clone() },
                };
                stmt.predicates.push(Predicate {
                    column: col_ref(&table, &column),
                    op: CompareOp::Ge,
                    value,
                    conjunction,
                });
            }
        }

        let filtered: Vec<String> = stmt
            .predicates
            .iter()
            .map(|p| p.column.column.clone())
            .collect();

        // Select list and grouping.
        let mut order_target: Option<ColumnRef> = None;
        if intents.contains(&QueryIntent::Aggregation) {
            let (func, measure) =
                aggregate_measure(profile.aggregate_cue, resolution, schema, primary)?;

            let mut group_cols: Vec<ColumnRef> = resolution
                .entities
                .iter()
                .filter_map(|e| {
                    let column = e.column.as_deref()?;
                    if !e.table.eq_ignore_ascii_case(&primary.name) {
                        return None;
                    }
                    let descriptor = primary.column(column)?;
                    if descriptor.semantic_type.is_numeric() {
                        return None;
                    }
                    if filtered.iter().any(|f| f.eq_ignore_ascii_case(column)) {
                        return None;
                    }
                    Some(col_ref(&primary.name, &descriptor.name))
                })
                .collect();
            group_cols.dedup();

            // A grouped ranking or a join with no resolved dimension still
            // needs a key; fall back to the primary table's identifier.
            if group_cols.is_empty()
                && (intents.contains(&QueryIntent::Ranking) || !stmt.joins.is_empty())
            {
                if let Some(key) = primary
                    .first_column_of_type(SemanticType::Identifier)
                    .or_else(|| primary.first_column_of_type(SemanticType::Text))
                {
                    group_cols.push(col_ref(&primary.name, &key.name));
                }
            }

            let alias = match &measure {
                Some(col) => format!("{}_{}", func.as_sql(), col.column),
                None => "COUNT_ALL".to_string(),
            };
            order_target = Some(ColumnRef::bare(alias.clone()));

            stmt.select = group_cols
                .iter()
                .cloned()
                .map(|col| SelectItem::Column { col })
                .collect();
            stmt.select.push(SelectItem::Aggregate {
                func,
                col: measure.unwrap_or_else(|| ColumnRef::bare("*")),
                alias: Some(alias),
            });
            stmt.group_by = group_cols;
        } else {
            // Plain selection: resolved columns, or `*` when only tables
            // were named.
            stmt.select = resolution
                .entities
                .iter()
                .filter_map(|e| {
                    let column = e.column.as_deref()?;
                    Some(SelectItem::Column { col: col_ref(&e.table, column) })
                })
                .collect();
        }

        if intents.contains(&QueryIntent::Ranking) {
            let target = order_target.or_else(|| {
                numeric_column(resolution, schema, primary)
                    .map(|(table, column)| col_ref(&table, &column))
            });
            if let Some(column) = target {
                let direction = if profile.ascending_rank {
                    SortDirection::Asc
                } else {
                    SortDirection::Desc
                };
                stmt.order_by.push(OrderBy { column, direction });
            }
            stmt.limit = Some(profile.limit.unwrap_or(self.default_limit));
        }

        debug!(
            from = %stmt.from,
            joins = stmt.joins.len(),
            predicates = stmt.predicates.len(),
            complexity = ?complexity_of(&stmt),
            "statement assembled"
        );
        debug_assert!(stmt.references_known_tables());
        Ok(stmt)
    }
}

/// Aggregate function and measure column. COUNT works without a measure
/// (renders as COUNT(*)); everything else needs a resolved numeric column.
fn aggregate_measure(
    cue: Option<AggregateFunc>,
    resolution: &Resolution,
    schema: &SchemaDescriptor,
    primary: &TableDescriptor,
) -> Result<(AggregateFunc, Option<ColumnRef>), BuildError> {
    let qualify = resolution.tables.len() > 1;
    let measure = numeric_column(resolution, schema, primary).map(|(table, column)| {
        if qualify {
            ColumnRef::qualified(table, column)
        } else {
            ColumnRef::bare(column)
        }
    });

    match cue {
        Some(AggregateFunc::Count) => Ok((AggregateFunc::Count, None)),
        Some(func) => match measure {
            Some(col) => Ok((func, Some(col))),
            None => Err(BuildError::NoAggregatableColumn),
        },
        None => match measure {
            Some(col) => Ok((AggregateFunc::Sum, Some(col))),
            None => Err(BuildError::NoAggregatableColumn),
        },
    }
}

/// First resolved numeric column, falling back to the primary table's own.
fn numeric_column(
    resolution: &Resolution,
    schema: &SchemaDescriptor,
    primary: &TableDescriptor,
) -> Option<(String, String)> {
    for entity in &resolution.entities {
        let Some(column) = entity.column.as_deref() else { continue };
        let Some(table) = schema.table(&entity.table) else { continue };
        if table.column(column).is_some_and(|c| c.semantic_type.is_numeric()) {
            return Some((table.name.clone(), column.to_string()));
        }
    }
    primary
        .numeric_columns()
        .next()
        .map(|c| (primary.name.clone(), c.name.clone()))
}

/// First resolved date column, falling back to the primary table's own.
fn date_column(
    resolution: &Resolution,
    schema: &SchemaDescriptor,
    primary: &TableDescriptor,
) -> Option<(String, String)> {
    for entity in &resolution.entities {
        let Some(column) = entity.column.as_deref() else { continue };
        let Some(table) = schema.table(&entity.table) else { continue };
        if table.column(column).is_some_and(|c| c.semantic_type.is_date()) {
            return Some((table.name.clone(), column.to_string()));
        }
    }
    primary
        .first_column_of_type(SemanticType::Date)
        .map(|c| (primary.name.clone(), c.name.clone()))
}

fn status_column(primary: &TableDescriptor) -> Option<String> {
    primary
        .columns
        .iter()
        .find(|c| {
            c.semantic_type == SemanticType::Text
                && c.name.to_ascii_uppercase().contains("STATUS")
        })
        .map(|c| c.name.clone())
}

/// Bind a comparison phrase to a column: the qualifier word when it names or
/// contains a column, otherwise the first column whose type fits the literal.
fn bind_comparison_column(
    qualifier: Option<&str>,
    value: &PredicateValue,
    resolution: &Resolution,
    schema: &SchemaDescriptor,
    primary: &TableDescriptor,
) -> Option<(String, String)> {
    let tables: Vec<&TableDescriptor> = resolution
        .tables
        .iter()
        .filter_map(|t| schema.table(t))
        .collect();
    let tables = if tables.is_empty() { vec![primary] } else { tables };

    if let Some(word) = qualifier {
        let needle = word.to_ascii_uppercase();
        for table in &tables {
            for column in &table.columns {
                let name = column.name.to_ascii_uppercase();
                if name == needle || name.contains(&needle) {
                    return Some((table.name.clone(), column.name.clone()));
                }
            }
        }
    }

    let wanted = |t: SemanticType| -> Option<(String, String)> {
        for table in &tables {
            if let Some(c) = table.first_column_of_type(t) {
                return Some((table.name.clone(), c.name.clone()));
            }
        }
        None
    };

    match value {
        PredicateValue::Number { .. } => wanted(SemanticType::Number),
        PredicateValue::String { .. } => wanted(SemanticType::Text),
        _ => None,
    }
}
