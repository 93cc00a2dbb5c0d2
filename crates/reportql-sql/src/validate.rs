//! Rendered-SQL validation
//!
//! Ordered checks over the SQL text and, when available, the intermediate
//! statement. Only the two security checks (multi-statement, forbidden
//! keyword) clear the `valid` flag; the performance checks annotate without
//! rejecting. Security rejections log on the `reportql::security` target so
//! operators can watch for adversarial input separately from ordinary noise.

use once_cell::sync::Lazy;
use regex::Regex;
use reportql_ir::{IntermediateStatement, Severity, Warning};
use reportql_schema::SchemaDescriptor;
use serde::Serialize;
use tracing::warn;

static FORBIDDEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(DROP|DELETE|UPDATE|INSERT|ALTER|TRUNCATE)\b").unwrap()
});

#[derive(Debug, Clone, Serialize)]
pub struct Validation {
    pub valid: bool,
    pub warnings: Vec<Warning>,
}

impl Validation {
    fn from_warnings(warnings: Vec<Warning>) -> Self {
        Self {
            valid: !warnings.iter().any(|w| w.severity == Severity::Critical),
            warnings,
        }
    }
}

pub struct Validator {
    /// Row-hint threshold above which an unfiltered table draws a warning
    large_table_rows: u64,
}

impl Validator {
    pub fn new(large_table_rows: u64) -> Self {
        Self { large_table_rows }
    }

    /// Text-only validation, used for caller-supplied SQL
    pub fn validate_text(&self, sql: &str) -> Validation {
        Validation::from_warnings(text_checks(sql))
    }

    /// Full validation of a generated statement
    pub fn validate(
        &self,
        sql: &str,
        stmt: &IntermediateStatement,
        schema: &SchemaDescriptor,
    ) -> Validation {
        let mut warnings = text_checks(sql);

        for join in &stmt.joins {
            if join.on.is_empty() {
                warnings.push(Warning::new(
                    "cartesian_join_risk",
                    Severity::High,
                    format!("join to {} has no connecting predicate", join.table),
                ));
            }
        }

        if stmt.has_aggregate() && stmt.bare_select_columns().len() > 1 && stmt.group_by.is_empty()
        {
            warnings.push(Warning::new(
                "missing_group_by",
                Severity::Medium,
                "aggregate select list has multiple ungrouped columns",
            ));
        }

        for table_name in stmt.tables() {
            let Some(table) = schema.table(table_name) else { continue };
            let Some(rows) = table.row_hint else { continue };
            if rows <= self.large_table_rows {
                continue;
            }
            let filtered = stmt.predicates.iter().any(|p| match &p.column.table {
                Some(t) => t.eq_ignore_ascii_case(&table.name),
                None => stmt.from.eq_ignore_ascii_case(&table.name),
            });
            if !filtered {
                warnings.push(Warning::new(
                    "unfiltered_large_table",
                    Severity::Low,
                    format!("no filter predicate on large table {}", table.name),
                ));
            }
        }

        Validation::from_warnings(warnings)
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(1_000_000)
    }
}

fn text_checks(sql: &str) -> Vec<Warning> {
    let mut warnings = Vec::new();

    if let Some(split) = sql.find(';') {
        if sql[split + 1..].chars().any(|c| !c.is_whitespace()) {
            warn!(target: "reportql::security", "multi-statement input rejected");
            warnings.push(Warning::new(
                "multi_statement_rejected",
                Severity::Critical,
                "more than one top-level statement",
            ));
        }
    }

    if let Some(found) = FORBIDDEN_RE.find(sql) {
        let keyword = found.as_str().to_ascii_uppercase();
        warn!(target: "reportql::security", keyword = %keyword, "forbidden keyword rejected");
        warnings.push(Warning::new(
            "forbidden_keyword",
            Severity::Critical,
            format!("statement contains disallowed keyword {keyword}"),
        ));
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use reportql_ir::{ColumnRef, Join, JoinType, SelectItem};
    use reportql_schema::{ColumnDescriptor, SemanticType, TableDescriptor};

    fn schema_with_large_table() -> SchemaDescriptor {
        SchemaDescriptor::new(
            "RETAIL",
            vec![TableDescriptor::new(
                "SALES",
                vec![ColumnDescriptor::new("SALE_ID", SemanticType::Identifier)],
            )
            .with_row_hint(50_000_000)],
        )
    }

    #[test]
    fn test_select_passes() {
        let v = Validator::default().validate_text("SELECT * FROM SALES");
        assert!(v.valid);
        assert!(v.warnings.is_empty());
    }

    #[test]
    fn test_multi_statement_rejected() {
        let v = Validator::default().validate_text("SELECT * FROM SALES; DROP TABLE SALES");
        assert!(!v.valid);
        assert!(v.warnings.iter().any(|w| w.code == "multi_statement_rejected"));
    }

    #[test]
    fn test_trailing_semicolon_is_tolerated() {
        let v = Validator::default().validate_text("SELECT * FROM SALES;");
        assert!(v.valid);
    }

    #[test]
    fn test_forbidden_keyword_rejected() {
        for sql in [
            "DELETE FROM SALES",
            "update SALES set X = 1",
            "TRUNCATE TABLE SALES",
        ] {
            let v = Validator::default().validate_text(sql);
            assert!(!v.valid, "{sql} should be rejected");
            let critical = v
                .warnings
                .iter()
                .find(|w| w.code == "forbidden_keyword")
                .unwrap();
            assert_eq!(critical.severity, Severity::Critical);
        }
    }

    #[test]
    fn test_trunc_function_is_not_truncate() {
        let v = Validator::default()
            .validate_text("SELECT * FROM SALES WHERE SALE_DATE >= TRUNC(SYSDATE, 'MM')");
        assert!(v.valid);
    }

    #[test]
    fn test_cartesian_join_warns_but_stays_valid() {
        let mut stmt = IntermediateStatement::single_table("SALES");
        stmt.joins.push(Join {
            table: "CUSTOMERS".to_string(),
            join_type: JoinType::Inner,
            on: vec![],
        });
        let schema = schema_with_large_table();
        let v = Validator::default().validate("SELECT * FROM SALES INNER JOIN CUSTOMERS", &stmt, &schema);
        assert!(v.valid);
        let w = v.warnings.iter().find(|w| w.code == "cartesian_join_risk").unwrap();
        assert_eq!(w.severity, Severity::High);
        assert!(w.message.contains("CUSTOMERS"));
    }

    #[test]
    fn test_missing_group_by_warns() {
        let mut stmt = IntermediateStatement::single_table("SALES");
        stmt.select = vec![
            SelectItem::Column { col: ColumnRef::bare("A") },
            SelectItem::Column { col: ColumnRef::bare("B") },
            SelectItem::Aggregate {
                func: reportql_ir::AggregateFunc::Sum,
                col: ColumnRef::bare("AMOUNT"),
                alias: None,
            },
        ];
        let schema = schema_with_large_table();
        let v = Validator::default().validate("SELECT A, B, SUM(AMOUNT) FROM SALES", &stmt, &schema);
        assert!(v.valid);
        assert!(v.warnings.iter().any(|w| w.code == "missing_group_by"));
    }

    #[test]
    fn test_unfiltered_large_table_warns_low() {
        let stmt = IntermediateStatement::single_table("SALES");
        let schema = schema_with_large_table();
        let v = Validator::default().validate("SELECT * FROM SALES", &stmt, &schema);
        assert!(v.valid);
        let w = v.warnings.iter().find(|w| w.code == "unfiltered_large_table").unwrap();
        assert_eq!(w.severity, Severity::Low);
    }

    #[test]
    fn test_filtered_large_table_is_quiet() {
        let mut stmt = IntermediateStatement::single_table("SALES");
        stmt.predicates.push(reportql_ir::Predicate {
            column: ColumnRef::bare("SALE_ID"),
            op: reportql_ir::CompareOp::Eq,
            value: reportql_ir::PredicateValue::Number { value: 7.0 },
            conjunction: reportql_ir::Conjunction::And,
        });
        let schema = schema_with_large_table();
        let v = Validator::default().validate("SELECT * FROM SALES WHERE SALE_ID = 7", &stmt, &schema);
        assert!(v.warnings.is_empty());
    }
}
