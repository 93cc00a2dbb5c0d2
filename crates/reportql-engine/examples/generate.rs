//! Run a few natural-language requests through the engine and print the
//! generated SQL for each dialect.
//!
//! ```bash
//! cargo run -p reportql-engine --example generate
//! ```

use anyhow::Result;
use reportql_engine::{logging, Engine};
use reportql_ir::Dialect;
use reportql_schema::{
    Cardinality, ColumnDescriptor, RelationshipDescriptor, SchemaDescriptor, SemanticType,
    TableDescriptor,
};

fn main() -> Result<()> {
    logging::init();

    let engine = Engine::new();
    engine.reload_schema(hcm())?;
    engine.reload_schema(retail())?;

    let requests = [
        ("HCM", "Show me all active employees"),
        ("RETAIL", "Show sales from the last 30 days"),
        ("RETAIL", "List the top 10 customers by purchase amount"),
        ("HCM", "delete all employees"),
    ];

    for (schema, request) in requests {
        println!("== {schema}: {request}");
        for dialect in [Dialect::Oracle, Dialect::Postgres, Dialect::Mysql] {
            let result = engine.generate(schema, request, dialect)?;
            if result.valid {
                println!("  [{dialect}] {}", result.sql);
            } else {
                println!(
                    "  [{dialect}] rejected: {}",
                    serde_json::to_string(&result.warnings)?
                );
            }
        }
        println!();
    }

    let validation = engine.validate_only("SELECT * FROM SALES; DROP TABLE SALES", "RETAIL")?;
    println!(
        "validate_only on injection attempt: valid={} warnings={}",
        validation.valid,
        serde_json::to_string(&validation.warnings)?
    );

    Ok(())
}

fn hcm() -> SchemaDescriptor {
    SchemaDescriptor::new(
        "HCM",
        vec![TableDescriptor::new(
            "PER_ALL_PEOPLE_F",
            vec![
                ColumnDescriptor::new("PERSON_ID", SemanticType::Identifier),
                ColumnDescriptor::new("STATUS", SemanticType::Text),
                ColumnDescriptor::new("HIRE_DATE", SemanticType::Date),
                ColumnDescriptor::new("SALARY", SemanticType::Number),
            ],
        )],
    )
}

fn retail() -> SchemaDescriptor {
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
