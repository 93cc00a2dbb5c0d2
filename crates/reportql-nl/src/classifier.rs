//! Pattern classification over a declarative rule table
//!
//! Intents come from an ordered list of (regex, intent) rules evaluated
//! against the normalized request. Rules are data, not code: the default
//! table below can be extended at engine construction without touching the
//! pipeline. Rules are non-exclusive; everything that matches is returned.

use std::collections::BTreeSet;

use regex::Regex;
use reportql_ir::{ComplexityTier, QueryIntent};
use tracing::debug;

/// One classification rule: trigger pattern plus the intent it signals
#[derive(Debug, Clone)]
pub struct IntentRule {
    pub intent: QueryIntent,
    pattern: Regex,
}

impl IntentRule {
    pub fn new(intent: QueryIntent, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            intent,
            pattern: Regex::new(pattern)?,
        })
    }

    pub fn matches(&self, normalized: &str) -> bool {
        self.pattern.is_match(normalized)
    }
}

/// Classification outcome: matched intents and a complexity hint.
///
/// The hint is advisory; the engine recomputes the final tier from the built
/// statement. When Ranking and Aggregation both match they compose: Ranking
/// governs ORDER BY/LIMIT, Aggregation governs SELECT/GROUP BY.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub intents: BTreeSet<QueryIntent>,
    pub complexity_hint: ComplexityTier,
}

impl Classification {
    pub fn is_unknown(&self) -> bool {
        self.intents.contains(&QueryIntent::Unknown)
    }
}

pub struct PatternClassifier {
    rules: Vec<IntentRule>,
}

impl PatternClassifier {
    pub fn new(rules: Vec<IntentRule>) -> Self {
        Self { rules }
    }

    /// Classifier loaded with the built-in rule table
    pub fn with_default_rules() -> Self {
        Self::new(default_rules())
    }

    /// Append a rule after the defaults; later rules never shadow earlier
    /// ones since matching is non-exclusive.
    pub fn add_rule(&mut self, rule: IntentRule) {
        self.rules.push(rule);
    }

    /// Classify normalized request text.
    ///
    /// No match is not an error: the result is `{Unknown}` and the caller
    /// short-circuits generation with a low-confidence result.
    pub fn classify(&self, normalized: &str) -> Classification {
        let mut intents = BTreeSet::new();
        for rule in &self.rules {
            if rule.matches(normalized) {
                intents.insert(rule.intent);
            }
        }

        if intents.is_empty() {
            intents.insert(QueryIntent::Unknown);
        }

        let classification = Classification {
            complexity_hint: hint_for(&intents),
            intents,
        };
        debug!(?classification.intents, "classified request");
        classification
    }
}

fn hint_for(intents: &BTreeSet<QueryIntent>) -> ComplexityTier {
    if intents.contains(&QueryIntent::Unknown) {
        return ComplexityTier::Simple;
    }
    let ranked_aggregate = intents.contains(&QueryIntent::Ranking)
        && intents.contains(&QueryIntent::Aggregation);
    if ranked_aggregate || intents.len() >= 3 {
        ComplexityTier::Complex
    } else if intents.contains(&QueryIntent::Aggregation) || intents.len() == 2 {
        ComplexityTier::Moderate
    } else {
        ComplexityTier::Simple
    }
}

/// Built-in rule table. Order is documentation only; all rules run.
pub fn default_rules() -> Vec<IntentRule> {
    let table: &[(QueryIntent, &str)] = &[
        // Ranking
        (QueryIntent::Ranking, r"\b(?:top|first|bottom|worst)\s+\d+\b"),
        (QueryIntent::Ranking, r"\b(?:highest|lowest|largest|smallest|most|least|best|worst)\b"),
        // Aggregation
        (QueryIntent::Aggregation, r"\b(?:total|sum|count|average|mean)\b"),
        (QueryIntent::Aggregation, r"\b(?:number of|how many)\b"),
        (QueryIntent::Aggregation, r"\b(?:by|per)\s+[a-z]"),
        // Temporal
        (QueryIntent::Temporal, r"\b(?:last|past)\s+\d+\s+(?:day|week|month|year)s?\b"),
        (QueryIntent::Temporal, r"\b(?:last|past|this)\s+(?:day|week|month|quarter|year)\b"),
        (QueryIntent::Temporal, r"\bsince\s+\d{4}"),
        (QueryIntent::Temporal, r"\b(?:today|yesterday)\b"),
        // Filter
        (QueryIntent::Filter, r"\b(?:greater than|more than|less than|fewer than|at least|at most|above|below|over|under)\s+\d"),
        (QueryIntent::Filter, r"\bequal to\b"),
        (QueryIntent::Filter, r"\bbetween\s+\d+(?:\.\d+)?\s+and\s+\d+(?:\.\d+)?\b"),
        (QueryIntent::Filter, r"\b(?:active|inactive|open|closed|pending|completed|terminated|cancelled)\b"),
    ];

    table
        .iter()
        .map(|(intent, pattern)| {
            IntentRule::new(*intent, pattern).expect("built-in rule patterns are valid")
        })
        .collect()
}
