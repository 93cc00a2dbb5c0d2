//! Entity resolution against a schema snapshot
//!
//! Candidate noun phrases are tried in a fixed ladder: exact table name,
//! exact column name, fuzzy match, synonym lookup. Unmatched phrases drop
//! silently but pull the overall confidence down. When resolved entities
//! span more than one table, a relationship path is required; disconnected
//! tables fail resolution outright rather than risking a cartesian join.

use reportql_schema::{catalog::find_path, PathHop, SchemaDescriptor};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::synonyms::SynonymTable;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no relationship path connects {table_a} and {table_b}")]
    DisjointEntities { table_a: String, table_b: String },
}

/// A phrase-to-schema binding. `column` is `None` for table-only resolution
/// ("show me employees" names a table, not a column).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedEntity {
    pub span: String,
    pub table: String,
    pub column: Option<String>,
    pub confidence: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Resolution {
    pub entities: Vec<ResolvedEntity>,
    /// Fraction of candidate phrases that resolved, in [0,1]
    pub matched_fraction: f64,
    /// Distinct resolved tables in first-mention order; index 0 is primary
    pub tables: Vec<String>,
    /// Relationship hops connecting the primary table to every other table
    pub join_path: Vec<PathHop>,
}

impl Resolution {
    pub fn primary_table(&self) -> Option<&str> {
        self.tables.first().map(String::as_str)
    }

    /// Deterministic confidence: mean entity confidence scaled by the
    /// matched-phrase fraction. Purely a function of resolution
    /// completeness; there is no learned component.
    pub fn confidence(&self) -> f64 {
        if self.entities.is_empty() {
            return 0.0;
        }
        let mean: f64 = self.entities.iter().map(|e| e.confidence).sum::<f64>()
            / self.entities.len() as f64;
        (mean * self.matched_fraction).clamp(0.0, 1.0)
    }
}

// Words that never name a table or column: command verbs, articles, and the
// trigger vocabulary already consumed by the classifier and profile.
const STOPWORDS: &[&str] = &[
    "a", "an", "the", "show", "me", "all", "list", "give", "display", "find", "get", "what",
    "which", "who", "how", "many", "much", "of", "in", "on", "for", "to", "from", "with",
    "their", "his", "her", "its", "our", "and", "or", "not", "is", "are", "was", "were", "be",
    "been", "top", "bottom", "first", "last", "past", "this", "that", "these", "those", "by",
    "per", "each", "every", "most", "least", "highest", "lowest", "largest", "smallest", "best",
    "worst", "total", "sum", "count", "number", "average", "mean", "minimum", "maximum",
    "greater", "less", "more", "fewer", "than", "at", "over", "under", "above", "below",
    "between", "equal", "day", "days", "week", "weeks", "month", "months", "year", "years",
    "since", "today", "yesterday", "including", "include", "even", "if", "no", "without",
    "regardless", "where", "having", "active", "inactive", "open", "closed", "pending",
    "completed", "terminated", "cancelled", "like",
];

fn is_candidate(word: &str) -> bool {
    !word.is_empty()
        && word.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
        && !word.contains('\'')
        && !STOPWORDS.contains(&word)
}

pub struct EntityResolver<'a> {
    schema: &'a SchemaDescriptor,
    synonyms: &'a SynonymTable,
    fuzzy_threshold: f64,
}

impl<'a> EntityResolver<'a> {
    pub fn new(schema: &'a SchemaDescriptor, synonyms: &'a SynonymTable) -> Self {
        Self {
            schema,
            synonyms,
            fuzzy_threshold: 0.85,
        }
    }

    pub fn with_fuzzy_threshold(mut self, threshold: f64) -> Self {
        self.fuzzy_threshold = threshold;
        self
    }

    /// Resolve normalized request text into schema entities.
    ///
    /// Deterministic for a given (text, snapshot) pair: phrases are scanned
    /// left to right, bigrams before unigrams, and the catalog is walked in
    /// descriptor order.
    pub fn resolve(&self, normalized: &str) -> Result<Resolution, ResolveError> {
        let words: Vec<&str> = normalized.split(' ').collect();

        let mut entities: Vec<ResolvedEntity> = Vec::new();
        let mut phrase_count = 0usize;

        let mut i = 0;
        while i < words.len() {
            if !is_candidate(words[i]) {
                i += 1;
                continue;
            }
            // Bigram first so multi-word names like "purchase amount" win
            // over their fragments.
            if i + 1 < words.len() && is_candidate(words[i + 1]) {
                let bigram = format!("{} {}", words[i], words[i + 1]);
                if let Some(entity) = self.resolve_phrase(&bigram) {
                    phrase_count += 1;
                    entities.push(entity);
                    i += 2;
                    continue;
                }
            }
            phrase_count += 1;
            if let Some(entity) = self.resolve_phrase(words[i]) {
                entities.push(entity);
            }
            i += 1;
        }

        let mut tables: Vec<String> = Vec::new();
        for entity in &entities {
            if !tables.iter().any(|t| t.eq_ignore_ascii_case(&entity.table)) {
                tables.push(entity.table.clone());
            }
        }

        let join_path = self.connect_tables(&tables)?;

        let matched_fraction = if phrase_count == 0 {
            0.0
        } else {
            entities.len() as f64 / phrase_count as f64
        };

        debug!(
            entities = entities.len(),
            phrases = phrase_count,
            tables = tables.len(),
            "resolved request entities"
        );

        Ok(Resolution {
            entities,
            matched_fraction,
            tables,
            join_path,
        })
    }

    fn resolve_phrase(&self, phrase: &str) -> Option<ResolvedEntity> {
        let ident = phrase.replace(' ', "_");
        let variants = ident_variants(&ident);

        // (a) exact table name
        for table in &self.schema.tables {
            if variants.iter().any(|v| v.eq_ignore_ascii_case(&table.name)) {
                return Some(ResolvedEntity {
                    span: phrase.to_string(),
                    table: table.name.clone(),
                    column: None,
                    confidence: 1.0,
                });
            }
        }

        // (b) exact column name, first table in descriptor order wins
        for table in &self.schema.tables {
            for column in &table.columns {
                if variants.iter().any(|v| v.eq_ignore_ascii_case(&column.name)) {
                    return Some(ResolvedEntity {
                        span: phrase.to_string(),
                        table: table.name.clone(),
                        column: Some(column.name.clone()),
                        confidence: 0.95,
                    });
                }
            }
        }

        // (c) fuzzy match over table and column names
        if let Some(entity) = self.fuzzy_match(phrase, &ident) {
            return Some(entity);
        }

        // (d) synonym table
        for variant in &variants {
            if let Some(target) = self.synonyms.lookup(variant) {
                if let Some(table) = self.schema.table(target) {
                    return Some(ResolvedEntity {
                        span: phrase.to_string(),
                        table: table.name.clone(),
                        column: None,
                        confidence: 0.9,
                    });
                }
            }
        }

        None
    }

    fn fuzzy_match(&self, phrase: &str, ident: &str) -> Option<ResolvedEntity> {
        let needle = ident.to_lowercase();
        let mut best: Option<(f64, String, Option<String>)> = None;

        let mut consider = |score: f64, table: &str, column: Option<&str>| {
            if score >= self.fuzzy_threshold
                && best.as_ref().map_or(true, |(s, _, _)| score > *s)
            {
                best = Some((score, table.to_string(), column.map(str::to_string)));
            }
        };

        for table in &self.schema.tables {
            consider(similarity(&needle, &table.name), &table.name, None);
            for column in &table.columns {
                consider(
                    similarity(&needle, &column.name),
                    &table.name,
                    Some(&column.name),
                );
            }
        }

        best.map(|(score, table, column)| ResolvedEntity {
            span: phrase.to_string(),
            table,
            column,
            confidence: (score * 0.9).clamp(0.0, 1.0),
        })
    }

    /// Discover the hops connecting every resolved table to the primary one.
    /// Disconnection anywhere fails the whole resolution.
    fn connect_tables(&self, tables: &[String]) -> Result<Vec<PathHop>, ResolveError> {
        let Some((primary, rest)) = tables.split_first() else {
            return Ok(Vec::new());
        };

        let mut hops: Vec<PathHop> = Vec::new();
        for table in rest {
            let path = find_path(self.schema, primary, table).ok_or_else(|| {
                ResolveError::DisjointEntities {
                    table_a: primary.clone(),
                    table_b: table.clone(),
                }
            })?;
            for hop in path {
                if !hops.contains(&hop) {
                    hops.push(hop);
                }
            }
        }
        Ok(hops)
    }
}

fn ident_variants(ident: &str) -> Vec<String> {
    let mut variants = vec![ident.to_string()];
    if let Some(stripped) = ident.strip_suffix('s') {
        if !stripped.is_empty() {
            variants.push(stripped.to_string());
        }
    } else {
        variants.push(format!("{ident}s"));
    }
    variants
}

/// Jaro-Winkler with a containment floor: a name that contains the phrase
/// outright (or vice versa) is a strong match even when edit distance says
/// otherwise, e.g. "department" inside "DEPARTMENT_NAME".
fn similarity(needle: &str, name: &str) -> f64 {
    let haystack = name.to_lowercase();
    let mut score = strsim::jaro_winkler(needle, &haystack);
    if needle.len() >= 4 && (haystack.contains(needle) || needle.contains(&haystack)) {
        score = score.max(0.88);
    }
    score
}
