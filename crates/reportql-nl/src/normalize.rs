//! Request text normalization
//!
//! Lowercase, punctuation stripped, whitespace collapsed. Single quotes are
//! kept so quoted filter literals survive ("equal to 'electronics'"), and
//! '.'/'-' are kept inside numbers and dates ("500.5", "2024-01-01").

/// Normalize request text into the form the classifier, profile extractor,
/// resolver, and cache fingerprint all operate on.
pub fn normalize(text: &str) -> String {
    let lower = text.to_lowercase();
    let chars: Vec<char> = lower.chars().collect();

    let mut out = String::with_capacity(lower.len());
    for (i, &c) in chars.iter().enumerate() {
        let keep = c.is_ascii_alphanumeric()
            || c == '\''
            || ((c == '.' || c == '-')
                && i > 0
                && i + 1 < chars.len()
                && chars[i - 1].is_ascii_digit()
                && chars[i + 1].is_ascii_digit());
        out.push(if keep { c } else { ' ' });
    }

    out.split_whitespace().collect::<Vec<_>>().join(" ")
}
