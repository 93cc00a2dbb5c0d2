//! End-to-end pipeline tests over the public engine surface

use reportql_engine::Engine;
use reportql_ir::{ComplexityTier, Dialect, Severity};
use reportql_schema::{
    Cardinality, ColumnDescriptor, RelationshipDescriptor, SchemaDescriptor, SemanticType,
    TableDescriptor,
};

fn hcm_schema() -> SchemaDescriptor {
    SchemaDescriptor::new(
        "HCM",
        vec![
            TableDescriptor::new(
                "PER_ALL_PEOPLE_F",
                vec![
                    ColumnDescriptor::new("PERSON_ID", SemanticType::Identifier),
                    ColumnDescriptor::new("STATUS", SemanticType::Text),
                    ColumnDescriptor::new("HIRE_DATE", SemanticType::Date),
                    ColumnDescriptor::new("SALARY", SemanticType::Number),
                ],
            ),
            TableDescriptor::new(
                "AUDIT_LOG",
                vec![ColumnDescriptor::new("ENTRY_ID", SemanticType::Identifier)],
            ),
        ],
    )
}

fn retail_schema() -> SchemaDescriptor {
    SchemaDescriptor::new(
        "RETAIL",
        vec![
            TableDescriptor::new(
                "CUSTOMERS",
                vec![
                    ColumnDescriptor::new("CUSTOMER_ID", SemanticType::Identifier),
                    ColumnDescriptor::new("CUSTOMER_NAME", SemanticType::Text),
                ],
            ),
            TableDescriptor::new(
                "SALES",
                vec![
                    ColumnDescriptor::new("SALE_ID", SemanticType::Identifier),
                    ColumnDescriptor::new("CUSTOMER_ID", SemanticType::Identifier),
                    ColumnDescriptor::new("PURCHASE_AMOUNT", SemanticType::Number),
                    ColumnDescriptor::new("SALE_DATE", SemanticType::Date),
                ],
            )
            .with_relationships(vec![RelationshipDescriptor {
                local_column: "CUSTOMER_ID".to_string(),
                referenced_table: "CUSTOMERS".to_string(),
                referenced_column: "CUSTOMER_ID".to_string(),
                cardinality: Cardinality::OneToMany,
            }])
            .with_row_hint(50_000_000),
        ],
    )
}

fn engine() -> Engine {
    let engine = Engine::new();
    engine.reload_schema(hcm_schema()).unwrap();
    engine.reload_schema(retail_schema()).unwrap();
    engine
}

#[test]
fn test_active_employees_filter() {
    let engine = engine();
    let result = engine
        .generate("HCM", "Show me all active employees", Dialect::Oracle)
        .unwrap();

    assert_eq!(result.sql, "SELECT * FROM PER_ALL_PEOPLE_F WHERE STATUS = 'active'");
    assert!(result.valid);
    assert_eq!(result.complexity, ComplexityTier::Simple);
    assert!(result.confidence > 0.5);
}

#[test]
fn test_sales_last_30_days() {
    let engine = engine();
    let result = engine
        .generate("RETAIL", "Show sales from the last 30 days", Dialect::Oracle)
        .unwrap();

    assert!(result.sql.contains("SALE_DATE >= SYSDATE - INTERVAL '30' DAY"));
    assert!(result.valid);
}

#[test]
fn test_top_customers_across_dialects() {
    let engine = engine();
    let request = "List the top 10 customers by purchase amount";

    let oracle = engine.generate("RETAIL", request, Dialect::Oracle).unwrap();
    assert!(oracle.sql.starts_with("SELECT /*+ USE_HASH */ "));
    assert!(oracle.sql.contains("INNER JOIN SALES ON CUSTOMERS.CUSTOMER_ID = SALES.CUSTOMER_ID"));
    assert!(oracle.sql.contains("GROUP BY"));
    assert!(oracle.sql.contains("ORDER BY SUM_PURCHASE_AMOUNT DESC"));
    assert!(oracle.sql.ends_with("FETCH FIRST 10 ROWS ONLY"));
    assert!(oracle.valid);

    for dialect in [Dialect::Postgres, Dialect::Mysql] {
        let result = engine.generate("RETAIL", request, dialect).unwrap();
        assert!(result.sql.ends_with("LIMIT 10"));
        assert!(!result.sql.contains("/*+"));
        assert!(result.valid);
    }
}

#[test]
fn test_ddl_request_is_unrecognized() {
    let engine = engine();
    let result = engine
        .generate("HCM", "delete all employees", Dialect::Oracle)
        .unwrap();

    assert!(!result.valid);
    assert!(result.sql.is_empty());
    assert_eq!(result.confidence, 0.0);
    assert_eq!(result.warnings[0].code, "unrecognized_query_pattern");
}

#[test]
fn test_validate_only_rejects_ddl() {
    let engine = engine();
    let validation = engine
        .validate_only("DELETE FROM PER_ALL_PEOPLE_F", "HCM")
        .unwrap();

    assert!(!validation.valid);
    let critical = validation
        .warnings
        .iter()
        .find(|w| w.severity == Severity::Critical)
        .unwrap();
    assert_eq!(critical.code, "forbidden_keyword");
}

#[test]
fn test_validate_only_rejects_multi_statement() {
    let engine = engine();
    let validation = engine
        .validate_only("SELECT * FROM SALES; DROP TABLE SALES", "RETAIL")
        .unwrap();

    assert!(!validation.valid);
    assert!(validation
        .warnings
        .iter()
        .any(|w| w.code == "multi_statement_rejected"));
}

#[test]
fn test_disjoint_entities_name_both_tables() {
    let engine = engine();
    let result = engine
        .generate("HCM", "count of employees and audit_log entries", Dialect::Oracle)
        .unwrap();

    assert!(!result.valid);
    let warning = &result.warnings[0];
    assert_eq!(warning.code, "disjoint_entities");
    assert!(warning.message.contains("PER_ALL_PEOPLE_F"));
    assert!(warning.message.contains("AUDIT_LOG"));
}

#[test]
fn test_unknown_schema_is_an_error() {
    let engine = engine();
    assert!(engine.generate("CRM", "show customers", Dialect::Oracle).is_err());
    assert!(engine.validate_only("SELECT 1 FROM DUAL", "CRM").is_err());
}

#[test]
fn test_low_severity_warnings_keep_valid() {
    let engine = engine();
    // Unfiltered, unlimited aggregate over a large table: PARALLEL hint plus
    // an informational warning, but still valid.
    let result = engine
        .generate("RETAIL", "total purchase amount", Dialect::Oracle)
        .unwrap();

    assert!(result.valid);
    assert!(result.sql.starts_with("SELECT /*+ PARALLEL */ "));
    let warning = result
        .warnings
        .iter()
        .find(|w| w.code == "unfiltered_large_table")
        .unwrap();
    assert_eq!(warning.severity, Severity::Low);
}

#[test]
fn test_generation_is_deterministic() {
    let engine = engine();
    let request = "List the top 10 customers by purchase amount";

    let first = engine.generate("RETAIL", request, Dialect::Oracle).unwrap();
    let second = engine.generate("RETAIL", request, Dialect::Oracle).unwrap();

    assert_eq!(first.sql, second.sql);
    assert_eq!(first.confidence, second.confidence);
}

#[test]
fn test_no_aggregatable_column_is_reported() {
    let engine = Engine::new();
    engine
        .reload_schema(SchemaDescriptor::new(
            "NOTES",
            vec![TableDescriptor::new(
                "NOTES",
                vec![ColumnDescriptor::new("BODY", SemanticType::Text)],
            )],
        ))
        .unwrap();

    let result = engine
        .generate("NOTES", "total notes", Dialect::Oracle)
        .unwrap();
    assert!(!result.valid);
    assert_eq!(result.warnings[0].code, "no_aggregatable_column");
}
