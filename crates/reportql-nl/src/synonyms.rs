//! Business-vocabulary synonym table
//!
//! Maps report-speak nouns to physical table names, the last rung of the
//! resolution ladder. The defaults cover the vocabulary of the shipped HCM
//! and retail schemas; deployments extend the table through engine config.

use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct SynonymTable {
    entries: HashMap<String, String>,
}

impl SynonymTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        let mut table = Self::new();
        for (phrase, target) in [
            ("employee", "PER_ALL_PEOPLE_F"),
            ("employees", "PER_ALL_PEOPLE_F"),
            ("people", "PER_ALL_PEOPLE_F"),
            ("person", "PER_ALL_PEOPLE_F"),
            ("staff", "PER_ALL_PEOPLE_F"),
            ("workers", "PER_ALL_PEOPLE_F"),
            ("headcount", "PER_ALL_PEOPLE_F"),
            ("customer", "CUSTOMERS"),
            ("customers", "CUSTOMERS"),
            ("client", "CUSTOMERS"),
            ("clients", "CUSTOMERS"),
            ("sale", "SALES"),
            ("sales", "SALES"),
            ("order", "SALES"),
            ("orders", "SALES"),
            ("purchase", "SALES"),
            ("purchases", "SALES"),
            ("revenue", "SALES"),
            ("department", "DEPARTMENTS"),
            ("departments", "DEPARTMENTS"),
            ("product", "PRODUCTS"),
            ("products", "PRODUCTS"),
            ("item", "PRODUCTS"),
            ("items", "PRODUCTS"),
        ] {
            table.insert(phrase, target);
        }
        table
    }

    pub fn insert(&mut self, phrase: impl Into<String>, table: impl Into<String>) {
        self.entries
            .insert(phrase.into().to_lowercase(), table.into());
    }

    pub fn extend<I, K, V>(&mut self, pairs: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (phrase, table) in pairs {
            self.insert(phrase, table);
        }
    }

    pub fn lookup(&self, phrase: &str) -> Option<&str> {
        self.entries.get(&phrase.to_lowercase()).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_lookup() {
        let table = SynonymTable::with_defaults();
        assert_eq!(table.lookup("employees"), Some("PER_ALL_PEOPLE_F"));
        assert_eq!(table.lookup("People"), Some("PER_ALL_PEOPLE_F"));
        assert_eq!(table.lookup("widgets"), None);
    }

    #[test]
    fn test_custom_entries_override() {
        let mut table = SynonymTable::with_defaults();
        table.insert("employees", "HR_WORKERS");
        assert_eq!(table.lookup("employees"), Some("HR_WORKERS"));
    }
}
