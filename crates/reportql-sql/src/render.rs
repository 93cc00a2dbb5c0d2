//! Dialect rendering
//!
//! One renderer per target dialect behind a single capability trait, chosen
//! by the `Dialect` enum. The statement walk is shared; each dialect supplies
//! its own date arithmetic, pagination clause, and (Oracle only) optimizer
//! hints. Rendering is byte-deterministic for a given (statement, dialect).

use reportql_ir::{
    ColumnRef, ComplexityTier, Conjunction, Dialect, IntermediateStatement, IntervalUnit,
    JoinType, PredicateValue, SelectItem,
};

use crate::builder::complexity_of;

/// Render a statement for the given dialect
pub fn render(stmt: &IntermediateStatement, dialect: Dialect) -> String {
    match dialect {
        Dialect::Oracle => OracleRenderer.render(stmt),
        Dialect::Postgres => PostgresRenderer.render(stmt),
        Dialect::Mysql => MySqlRenderer.render(stmt),
    }
}

pub trait DialectRenderer {
    fn dialect(&self) -> Dialect;

    /// Hint text injected directly after SELECT, or `None`
    fn optimizer_hint(&self, _stmt: &IntermediateStatement) -> Option<&'static str> {
        None
    }

    /// Row-limiting clause appended to the statement
    fn limit_clause(&self, n: u64) -> String;

    /// "N days/months/years ago" as a dialect expression
    fn relative_interval(&self, amount: u32, unit: IntervalUnit) -> String;

    /// Start of the current day/month/year
    fn period_start(&self, unit: IntervalUnit) -> String;

    fn date_literal(&self, iso: &str) -> String {
        format!("DATE '{iso}'")
    }

    fn render(&self, stmt: &IntermediateStatement) -> String {
        render_statement(self, stmt)
    }
}

pub struct OracleRenderer;

impl DialectRenderer for OracleRenderer {
    fn dialect(&self) -> Dialect {
        Dialect::Oracle
    }

    /// USE_HASH for complex multi-table joins; PARALLEL for an unlimited
    /// aggregate over an unfiltered table, where a full scan is certain and
    /// benefits most from parallelism.
    fn optimizer_hint(&self, stmt: &IntermediateStatement) -> Option<&'static str> {
        let tier = complexity_of(stmt);
        if !stmt.joins.is_empty() && tier >= ComplexityTier::Complex {
            Some("USE_HASH")
        } else if stmt.limit.is_none() && stmt.has_aggregate() && stmt.predicates.is_empty() {
            Some("PARALLEL")
        } else {
            None
        }
    }

    fn limit_clause(&self, n: u64) -> String {
        format!("FETCH FIRST {n} ROWS ONLY")
    }

    fn relative_interval(&self, amount: u32, unit: IntervalUnit) -> String {
        let unit = match unit {
            IntervalUnit::Day => "DAY",
            IntervalUnit::Month => "MONTH",
            IntervalUnit::Year => "YEAR",
        };
        format!("SYSDATE - INTERVAL '{amount}' {unit}")
    }

    fn period_start(&self, unit: IntervalUnit) -> String {
        match unit {
            IntervalUnit::Day => "TRUNC(SYSDATE)".to_string(),
            IntervalUnit::Month => "TRUNC(SYSDATE, 'MM')".to_string(),
            IntervalUnit::Year => "TRUNC(SYSDATE, 'YYYY')".to_string(),
        }
    }
}

pub struct PostgresRenderer;

impl DialectRenderer for PostgresRenderer {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn limit_clause(&self, n: u64) -> String {
        format!("LIMIT {n}")
    }

    fn relative_interval(&self, amount: u32, unit: IntervalUnit) -> String {
        let unit = match unit {
            IntervalUnit::Day => "days",
            IntervalUnit::Month => "months",
            IntervalUnit::Year => "years",
        };
        format!("NOW() - INTERVAL '{amount} {unit}'")
    }

    fn period_start(&self, unit: IntervalUnit) -> String {
        let unit = match unit {
            IntervalUnit::Day => "day",
            IntervalUnit::Month => "month",
            IntervalUnit::Year => "year",
        };
        format!("DATE_TRUNC('{unit}', NOW())")
    }
}

pub struct MySqlRenderer;

impl DialectRenderer for MySqlRenderer {
    fn dialect(&self) -> Dialect {
        Dialect::Mysql
    }

    fn limit_clause(&self, n: u64) -> String {
        format!("LIMIT {n}")
    }

    fn relative_interval(&self, amount: u32, unit: IntervalUnit) -> String {
        let unit = match unit {
            IntervalUnit::Day => "DAY",
            IntervalUnit::Month => "MONTH",
            IntervalUnit::Year => "YEAR",
        };
        format!("DATE_SUB(NOW(), INTERVAL {amount} {unit})")
    }

    fn period_start(&self, unit: IntervalUnit) -> String {
        match unit {
            IntervalUnit::Day => "CURDATE()".to_string(),
            IntervalUnit::Month => "DATE_FORMAT(NOW(), '%Y-%m-01')".to_string(),
            IntervalUnit::Year => "MAKEDATE(YEAR(NOW()), 1)".to_string(),
        }
    }
}

fn column_sql(col: &ColumnRef) -> String {
    match &col.table {
        Some(table) => format!("{}.{}", table, col.column),
        None => col.column.clone(),
    }
}

fn number_sql(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

fn string_sql(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn value_sql<R: DialectRenderer + ?Sized>(r: &R, value: &PredicateValue) -> String {
    match value {
        PredicateValue::Number { value } => number_sql(*value),
        PredicateValue::String { value } => string_sql(value),
        PredicateValue::Date { value } => r.date_literal(value),
        PredicateValue::RelativeInterval { amount, unit } => r.relative_interval(*amount, *unit),
        PredicateValue::PeriodStart { unit } => r.period_start(*unit),
    }
}

fn render_statement<R: DialectRenderer + ?Sized>(r: &R, stmt: &IntermediateStatement) -> String {
    let mut sql = String::from("SELECT ");

    if let Some(hint) = r.optimizer_hint(stmt) {
        sql.push_str(&format!("/*+ {hint} */ "));
    }

    if stmt.select.is_empty() {
        sql.push('*');
    } else {
        let items: Vec<String> = stmt
            .select
            .iter()
            .map(|item| match item {
                SelectItem::Column { col } => column_sql(col),
                SelectItem::Aggregate { func, col, alias } => {
                    let body = format!("{}({})", func.as_sql(), column_sql(col));
                    match alias {
                        Some(alias) => format!("{body} AS {alias}"),
                        None => body,
                    }
                }
            })
            .collect();
        sql.push_str(&items.join(", "));
    }

    sql.push_str(" FROM ");
    sql.push_str(&stmt.from);

    for join in &stmt.joins {
        let keyword = match join.join_type {
            JoinType::Inner => "INNER JOIN",
            JoinType::Left => "LEFT JOIN",
        };
        sql.push_str(&format!(" {keyword} {}", join.table));
        if !join.on.is_empty() {
            let pairs: Vec<String> = join
                .on
                .iter()
                .map(|(left, right)| format!("{} = {}", column_sql(left), column_sql(right)))
                .collect();
            sql.push_str(&format!(" ON {}", pairs.join(" AND ")));
        }
    }

    for (i, predicate) in stmt.predicates.iter().enumerate() {
        if i == 0 {
            sql.push_str(" WHERE ");
        } else {
            sql.push_str(match predicate.conjunction {
                Conjunction::And => " AND ",
                Conjunction::Or => " OR ",
            });
        }
        sql.push_str(&format!(
            "{} {} {}",
            column_sql(&predicate.column),
            predicate.op.as_sql(),
            value_sql(r, &predicate.value)
        ));
    }

    if !stmt.group_by.is_empty() {
        let cols: Vec<String> = stmt.group_by.iter().map(column_sql).collect();
        sql.push_str(&format!(" GROUP BY {}", cols.join(", ")));
    }

    if !stmt.order_by.is_empty() {
        let keys: Vec<String> = stmt
            .order_by
            .iter()
            .map(|o| format!("{} {}", column_sql(&o.column), o.direction.as_sql()))
            .collect();
        sql.push_str(&format!(" ORDER BY {}", keys.join(", ")));
    }

    if let Some(limit) = stmt.limit {
        sql.push(' ');
        sql.push_str(&r.limit_clause(limit));
    }

    sql
}

#[cfg(test)]
mod tests {
    use super::*;
    use reportql_ir::{
        AggregateFunc, CompareOp, Join, OrderBy, Predicate, SortDirection,
    };

    fn filter_statement() -> IntermediateStatement {
        let mut stmt = IntermediateStatement::single_table("PER_ALL_PEOPLE_F");
        stmt.predicates.push(Predicate {
            column: ColumnRef::bare("STATUS"),
            op: CompareOp::Eq,
            value: PredicateValue::String { value: "active".to_string() },
            conjunction: Conjunction::And,
        });
        stmt
    }

    fn temporal_statement() -> IntermediateStatement {
        let mut stmt = IntermediateStatement::single_table("SALES");
        stmt.predicates.push(Predicate {
            column: ColumnRef::bare("SALE_DATE"),
            op: CompareOp::Ge,
            value: PredicateValue::RelativeInterval { amount: 30, unit: IntervalUnit::Day },
            conjunction: Conjunction::And,
        });
        stmt
    }

    fn ranked_join_statement() -> IntermediateStatement {
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
    fn test_oracle_simple_filter() {
        let sql = render(&filter_statement(), Dialect::Oracle);
        assert_eq!(sql, "SELECT * FROM PER_ALL_PEOPLE_F WHERE STATUS = 'active'");
    }

    #[test]
    fn test_oracle_relative_interval() {
        let sql = render(&temporal_statement(), Dialect::Oracle);
        assert_eq!(
            sql,
            "SELECT * FROM SALES WHERE SALE_DATE >= SYSDATE - INTERVAL '30' DAY"
        );
    }

    #[test]
    fn test_postgres_relative_interval() {
        let sql = render(&temporal_statement(), Dialect::Postgres);
        assert!(sql.contains("SALE_DATE >= NOW() - INTERVAL '30 days'"));
    }

    #[test]
    fn test_mysql_relative_interval() {
        let sql = render(&temporal_statement(), Dialect::Mysql);
        assert!(sql.contains("SALE_DATE >= DATE_SUB(NOW(), INTERVAL 30 DAY)"));
    }

    #[test]
    fn test_oracle_ranked_join_has_hint_and_fetch_first() {
        let sql = render(&ranked_join_statement(), Dialect::Oracle);
        assert!(sql.starts_with("SELECT /*+ USE_HASH */ "));
        assert!(sql.contains("INNER JOIN SALES ON CUSTOMERS.CUSTOMER_ID = SALES.CUSTOMER_ID"));
        assert!(sql.contains("GROUP BY CUSTOMERS.CUSTOMER_ID"));
        assert!(sql.contains("ORDER BY SUM_PURCHASE_AMOUNT DESC"));
        assert!(sql.ends_with("FETCH FIRST 10 ROWS ONLY"));
    }

    #[test]
    fn test_non_oracle_dialects_have_no_hints() {
        for dialect in [Dialect::Postgres, Dialect::Mysql] {
            let sql = render(&ranked_join_statement(), dialect);
            assert!(!sql.contains("/*+"), "{dialect} should not carry hints");
            assert!(sql.ends_with("LIMIT 10"));
        }
    }

    #[test]
    fn test_oracle_parallel_hint_for_unfiltered_aggregate() {
        let mut stmt = IntermediateStatement::single_table("SALES");
        stmt.select.push(SelectItem::Aggregate {
            func: AggregateFunc::Sum,
            col: ColumnRef::bare("PURCHASE_AMOUNT"),
            alias: Some("SUM_PURCHASE_AMOUNT".to_string()),
        });
        let sql = render(&stmt, Dialect::Oracle);
        assert!(sql.starts_with("SELECT /*+ PARALLEL */ "));
    }

    #[test]
    fn test_string_literals_are_escaped() {
        let mut stmt = IntermediateStatement::single_table("CUSTOMERS");
        stmt.predicates.push(Predicate {
            column: ColumnRef::bare("CUSTOMER_NAME"),
            op: CompareOp::Eq,
            value: PredicateValue::String { value: "O'Brien".to_string() },
            conjunction: Conjunction::And,
        });
        let sql = render(&stmt, Dialect::Oracle);
        assert!(sql.contains("CUSTOMER_NAME = 'O''Brien'"));
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let stmt = ranked_join_statement();
        assert_eq!(render(&stmt, Dialect::Oracle), render(&stmt, Dialect::Oracle));
    }

    #[test]
    fn test_period_start_forms() {
        let oracle = OracleRenderer.period_start(IntervalUnit::Month);
        assert_eq!(oracle, "TRUNC(SYSDATE, 'MM')");
        let pg = PostgresRenderer.period_start(IntervalUnit::Year);
        assert_eq!(pg, "DATE_TRUNC('year', NOW())");
        let mysql = MySqlRenderer.period_start(IntervalUnit::Day);
        assert_eq!(mysql, "CURDATE()");
    }
}
