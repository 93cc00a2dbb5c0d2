//! ReportQL generation engine
//!
//! The facade the reporting API layer calls: natural-language request in,
//! validated dialect-correct SQL plus a confidence and complexity assessment
//! out. Stateless per request apart from the schema catalog and the result
//! cache; recognition and structural failures come back as low-confidence
//! results, never as errors. Only configuration problems (an unknown schema,
//! a malformed descriptor) surface as `Err`.

use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use reportql_ir::{
    request_fingerprint, Dialect, GenerationResult, QueryIntent, Severity, Warning,
};
use reportql_nl::{
    normalize, EntityResolver, IntentRule, PatternClassifier, RequestProfile, ResolveError,
    SynonymTable,
};
use reportql_schema::{SchemaCatalog, SchemaDescriptor, SchemaError};
use reportql_sql::{complexity_of, render, BuildError, SqlBuilder, Validation, Validator};

mod cache;
pub mod config;
pub mod logging;

pub use cache::ResultCache;
pub use config::{ConfigError, EngineConfig};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

pub struct Engine {
    catalog: SchemaCatalog,
    cache: ResultCache,
    classifier: PatternClassifier,
    synonyms: SynonymTable,
    builder: SqlBuilder,
    validator: Validator,
    fuzzy_threshold: f64,
}

impl Engine {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let mut classifier = PatternClassifier::with_default_rules();
        for rule in &config.rules {
            match IntentRule::new(rule.intent, &rule.pattern) {
                Ok(rule) => classifier.add_rule(rule),
                Err(err) => {
                    tracing::warn!(pattern = %rule.pattern, %err, "ignoring invalid classifier rule");
                }
            }
        }

        let mut synonyms = SynonymTable::with_defaults();
        synonyms.extend(config.synonyms.iter().map(|(k, v)| (k.clone(), v.clone())));

        Self {
            catalog: SchemaCatalog::new(),
            cache: ResultCache::new(Duration::from_secs(config.cache.ttl_secs)),
            classifier,
            synonyms,
            builder: SqlBuilder::new(config.resolver.default_row_limit),
            validator: Validator::new(config.validator.large_table_rows),
            fuzzy_threshold: config.resolver.fuzzy_threshold,
        }
    }

    pub fn catalog(&self) -> &SchemaCatalog {
        &self.catalog
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Install or replace a schema snapshot. Administrative path: the new
    /// descriptor is validated, the snapshot swaps atomically, and every
    /// cached result is purged so stale-schema entries are never served.
    pub fn reload_schema(&self, descriptor: SchemaDescriptor) -> Result<(), EngineError> {
        self.catalog.install(descriptor)?;
        self.cache.invalidate_all();
        Ok(())
    }

    /// Generate SQL for a natural-language request.
    pub fn generate(
        &self,
        schema_name: &str,
        request_text: &str,
        dialect: Dialect,
    ) -> Result<GenerationResult, EngineError> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("generate", %request_id, schema = schema_name, %dialect);
        let _guard = span.enter();

        let schema = self.catalog.load(schema_name)?;
        let normalized = normalize(request_text);
        let fingerprint = request_fingerprint(&schema.name, &normalized, dialect);
        let generation = self.catalog.generation();

        if let Some(hit) = self.cache.get(&schema.name, &fingerprint, dialect, generation) {
            debug!("serving cached result");
            return Ok(hit);
        }

        let classification = self.classifier.classify(&normalized);
        if classification.is_unknown() {
            info!("request matched no intent rule");
            return Ok(GenerationResult::rejected(
                dialect,
                Warning::new(
                    "unrecognized_query_pattern",
                    Severity::Medium,
                    "unrecognized query pattern",
                ),
            ));
        }

        let resolver =
            EntityResolver::new(&schema, &self.synonyms).with_fuzzy_threshold(self.fuzzy_threshold);
        let resolution = match resolver.resolve(&normalized) {
            Ok(resolution) => resolution,
            Err(ResolveError::DisjointEntities { table_a, table_b }) => {
                info!(%table_a, %table_b, "entities resolve to disconnected tables");
                return Ok(GenerationResult::rejected(
                    dialect,
                    Warning::new(
                        "disjoint_entities",
                        Severity::High,
                        format!("no relationship path connects {table_a} and {table_b}"),
                    ),
                ));
            }
        };
        if resolution.entities.is_empty() {
            return Ok(GenerationResult::rejected(
                dialect,
                Warning::new(
                    "no_entities_resolved",
                    Severity::Medium,
                    "no schema entities resolved from the request",
                ),
            ));
        }

        let mut intents = classification.intents;
        if resolution.tables.len() > 1 {
            intents.insert(QueryIntent::Join);
        }

        let profile = RequestProfile::extract(&normalized);
        let stmt = match self.builder.build(&intents, &resolution, &profile, &schema) {
            Ok(stmt) => stmt,
            Err(err @ BuildError::NoAggregatableColumn) => {
                return Ok(GenerationResult::rejected(
                    dialect,
                    Warning::new("no_aggregatable_column", Severity::Medium, err.to_string()),
                ));
            }
            Err(err @ BuildError::MissingPrimaryTable) => {
                return Ok(GenerationResult::rejected(
                    dialect,
                    Warning::new("no_entities_resolved", Severity::Medium, err.to_string()),
                ));
            }
        };

        let sql = render(&stmt, dialect);
        let validation = self.validator.validate(&sql, &stmt, &schema);
        let result = GenerationResult {
            sql,
            dialect,
            valid: validation.valid,
            warnings: validation.warnings,
            complexity: complexity_of(&stmt),
            confidence: resolution.confidence(),
            generated_at: Utc::now(),
        };

        info!(
            valid = result.valid,
            confidence = result.confidence,
            complexity = ?result.complexity,
            warnings = result.warnings.len(),
            "generation complete"
        );

        if result.valid {
            self.cache
                .put(&schema.name, &fingerprint, dialect, result.clone(), generation);
        }

        Ok(result)
    }

    /// Validate caller-supplied SQL without generating anything.
    pub fn validate_only(&self, sql_text: &str, schema_name: &str) -> Result<Validation, EngineError> {
        self.catalog.load(schema_name)?;
        Ok(self.validator.validate_text(sql_text))
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
