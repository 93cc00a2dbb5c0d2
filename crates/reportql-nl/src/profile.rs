//! Request profile extraction
//!
//! Pulls the literal material the SQL builder needs out of the normalized
//! text: row limits, comparison phrases, temporal spans, sort direction,
//! conjunction and inclusivity cues, and explicit aggregate function words.

use once_cell::sync::Lazy;
use regex::Regex;
use reportql_ir::{AggregateFunc, CompareOp, IntervalUnit, PredicateValue};
use serde::{Deserialize, Serialize};

/// A temporal span detected in the request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemporalSpan {
    /// "last 30 days", "past 2 years", "yesterday"
    Relative { amount: u32, unit: IntervalUnit },
    /// "this month", "this year", "today"
    PeriodStart { unit: IntervalUnit },
    /// "since 2024", "since 2024-01-15"
    Since { date: String },
}

/// One comparison phrase, e.g. "amount greater than 500"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonPhrase {
    /// Word immediately preceding the comparison, a binding hint for the
    /// predicate column ("amount greater than 500" → "amount")
    pub qualifier: Option<String>,
    pub op: CompareOp,
    pub value: PredicateValue,
}

/// Everything the builder reads from the text besides intents and entities
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestProfile {
    pub limit: Option<u64>,
    /// Ranking direction cue: "lowest"/"bottom"/"worst" flip the default
    pub ascending_rank: bool,
    pub comparisons: Vec<ComparisonPhrase>,
    pub temporal: Option<TemporalSpan>,
    pub wants_or: bool,
    pub inclusive_join: bool,
    pub aggregate_cue: Option<AggregateFunc>,
    /// Status adjectives ("active", "closed") bound later to a status column
    pub status_terms: Vec<String>,
}

static LIMIT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:top|first|bottom|worst)\s+(\d+)\b").unwrap());
static ASCENDING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:lowest|bottom|worst|least|smallest)\b").unwrap());
static OR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bor\b").unwrap());
static INCLUSIVE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:including|include|with no|even those|regardless)\b").unwrap());
static STATUS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(active|inactive|open|closed|pending|completed|terminated|cancelled)\b").unwrap()
});

static BETWEEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:([a-z_]\w*)\s+)?between\s+(\d+(?:\.\d+)?)\s+and\s+(\d+(?:\.\d+)?)").unwrap()
});
static GT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:([a-z_]\w*)\s+)?(?:greater than|more than|above|over)\s+(\d+(?:\.\d+)?)")
        .unwrap()
});
static GE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:([a-z_]\w*)\s+)?at least\s+(\d+(?:\.\d+)?)").unwrap());
static LT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:([a-z_]\w*)\s+)?(?:less than|fewer than|below|under)\s+(\d+(?:\.\d+)?)")
        .unwrap()
});
static LE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:([a-z_]\w*)\s+)?at most\s+(\d+(?:\.\d+)?)").unwrap());
static EQ_QUOTED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:([a-z_]\w*)\s+)?equal to\s+'([^']+)'").unwrap());
static EQ_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:([a-z_]\w*)\s+)?equal to\s+(\d+(?:\.\d+)?)\b").unwrap());
static EQ_BARE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:([a-z_]\w*)\s+)?equal to\s+([a-z_]\w*)").unwrap());

static RELATIVE_N_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:last|past)\s+(\d+)\s+(day|week|month|year)s?\b").unwrap());
static RELATIVE_ONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:last|past)\s+(day|week|month|year)\b").unwrap());
static THIS_PERIOD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bthis\s+(month|year)\b").unwrap());
static TODAY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\btoday\b").unwrap());
static YESTERDAY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\byesterday\b").unwrap());
static SINCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bsince\s+(\d{4})(?:-(\d{2})-(\d{2}))?\b").unwrap());

static COUNT_CUE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:count|number of|how many)\b").unwrap());
static AVG_CUE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:average|mean)\b").unwrap());
static MIN_CUE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bminimum\b").unwrap());
static MAX_CUE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bmaximum\b").unwrap());
static SUM_CUE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:total|sum)\b").unwrap());

impl RequestProfile {
    /// Extract the profile from normalized request text
    pub fn extract(normalized: &str) -> Self {
        let mut profile = RequestProfile {
            limit: LIMIT_RE
                .captures(normalized)
                .and_then(|c| c[1].parse().ok()),
            ascending_rank: ASCENDING_RE.is_match(normalized),
            wants_or: OR_RE.is_match(normalized),
            inclusive_join: INCLUSIVE_RE.is_match(normalized),
            aggregate_cue: aggregate_cue(normalized),
            ..Default::default()
        };

        for cap in STATUS_RE.captures_iter(normalized) {
            profile.status_terms.push(cap[1].to_string());
        }

        profile.comparisons = extract_comparisons(normalized);
        profile.temporal = extract_temporal(normalized);
        profile
    }
}

fn aggregate_cue(text: &str) -> Option<AggregateFunc> {
    if COUNT_CUE_RE.is_match(text) {
        Some(AggregateFunc::Count)
    } else if AVG_CUE_RE.is_match(text) {
        Some(AggregateFunc::Avg)
    } else if MIN_CUE_RE.is_match(text) {
        Some(AggregateFunc::Min)
    } else if MAX_CUE_RE.is_match(text) {
        Some(AggregateFunc::Max)
    } else if SUM_CUE_RE.is_match(text) {
        Some(AggregateFunc::Sum)
    } else {
        None
    }
}

fn qualifier(cap: &regex::Captures<'_>) -> Option<String> {
    cap.get(1).map(|m| m.as_str().to_string())
}

fn number(text: &str) -> PredicateValue {
    PredicateValue::Number {
        value: text.parse().unwrap_or(0.0),
    }
}

fn extract_comparisons(text: &str) -> Vec<ComparisonPhrase> {
    let mut out = Vec::new();

    for cap in BETWEEN_RE.captures_iter(text) {
        out.push(ComparisonPhrase {
            qualifier: qualifier(&cap),
            op: CompareOp::Ge,
            value: number(&cap[2]),
        });
        out.push(ComparisonPhrase {
            qualifier: qualifier(&cap),
            op: CompareOp::Le,
            value: number(&cap[3]),
        });
    }
    for (re, op) in [
        (&*GT_RE, CompareOp::Gt),
        (&*GE_RE, CompareOp::Ge),
        (&*LT_RE, CompareOp::Lt),
        (&*LE_RE, CompareOp::Le),
    ] {
        for cap in re.captures_iter(text) {
            out.push(ComparisonPhrase {
                qualifier: qualifier(&cap),
                op,
                value: number(&cap[2]),
            });
        }
    }

    // Equality: quoted wins over numeric, numeric over a bare word.
    if let Some(cap) = EQ_QUOTED_RE.captures(text) {
        out.push(ComparisonPhrase {
            qualifier: qualifier(&cap),
            op: CompareOp::Eq,
            value: PredicateValue::String { value: cap[2].to_string() },
        });
    } else if let Some(cap) = EQ_NUMBER_RE.captures(text) {
        out.push(ComparisonPhrase {
            qualifier: qualifier(&cap),
            op: CompareOp::Eq,
            value: number(&cap[2]),
        });
    } else if let Some(cap) = EQ_BARE_RE.captures(text) {
        out.push(ComparisonPhrase {
            qualifier: qualifier(&cap),
            op: CompareOp::Eq,
            value: PredicateValue::String { value: cap[2].to_string() },
        });
    }

    out
}

fn extract_temporal(text: &str) -> Option<TemporalSpan> {
    if let Some(cap) = RELATIVE_N_RE.captures(text) {
        let amount: u32 = cap[1].parse().unwrap_or(1);
        let (amount, unit) = match &cap[2] {
            "day" => (amount, IntervalUnit::Day),
            "week" => (amount * 7, IntervalUnit::Day),
            "month" => (amount, IntervalUnit::Month),
            _ => (amount, IntervalUnit::Year),
        };
        return Some(TemporalSpan::Relative { amount, unit });
    }
    if let Some(cap) = RELATIVE_ONE_RE.captures(text) {
        let (amount, unit) = match &cap[1] {
            "day" => (1, IntervalUnit::Day),
            "week" => (7, IntervalUnit::Day),
            "month" => (1, IntervalUnit::Month),
            _ => (1, IntervalUnit::Year),
        };
        return Some(TemporalSpan::Relative { amount, unit });
    }
    if let Some(cap) = THIS_PERIOD_RE.captures(text) {
        let unit = if &cap[1] == "month" { IntervalUnit::Month } else { IntervalUnit::Year };
        return Some(TemporalSpan::PeriodStart { unit });
    }
    if TODAY_RE.is_match(text) {
        return Some(TemporalSpan::PeriodStart { unit: IntervalUnit::Day });
    }
    if YESTERDAY_RE.is_match(text) {
        return Some(TemporalSpan::Relative { amount: 1, unit: IntervalUnit::Day });
    }
    if let Some(cap) = SINCE_RE.captures(text) {
        let date = match (cap.get(2), cap.get(3)) {
            (Some(month), Some(day)) => format!("{}-{}-{}", &cap[1], month.as_str(), day.as_str()),
            _ => format!("{}-01-01", &cap[1]),
        };
        return Some(TemporalSpan::Since { date });
    }
    None
}
