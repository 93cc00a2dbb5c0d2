//! Natural-language front-end for ReportQL
//!
//! Turns free request text into everything the SQL builder needs: a
//! normalized form, a set of classified intents, a request profile (numbers,
//! comparisons, temporal spans, direction cues), and entities resolved
//! against a schema snapshot.

pub mod classifier;
pub mod normalize;
pub mod profile;
pub mod resolver;
pub mod synonyms;

pub use classifier::{Classification, IntentRule, PatternClassifier};
pub use normalize::normalize;
pub use profile::{ComparisonPhrase, RequestProfile, TemporalSpan};
pub use resolver::{EntityResolver, ResolveError, ResolvedEntity, Resolution};
pub use synonyms::SynonymTable;
