//! Theme vocabularies per guide category.

use std::collections::HashMap;

/// Catch-all theme, valid in every category.
pub const OTHER_THEME: &str = "Other";

const BUILTIN: &[(&str, &[&str])] = &[
    (
        "warm-up",
        &["Experience/Setting", "Role/Unit", "Patient Mix", "Other"],
    ),
    (
        "background",
        &["Experience/Setting", "Role/Unit", "Patient Mix", "Other"],
    ),
    (
        "current treatment",
        &[
            "Pharmacological",
            "Non-pharmacological",
            "Protocols/Guidelines",
            "Barriers",
            "Other",
        ],
    ),
    (
        "unmet needs",
        &["Efficacy", "Safety/Tolerability", "Access/Cost", "Workflow", "Other"],
    ),
    (
        "product perceptions",
        &["Positive", "Negative", "Neutral/Mixed", "Questions/Concerns", "Other"],
    ),
    (
        "wrap-up",
        &["Recommendations", "Final Thoughts", "Other"],
    ),
];

const GENERIC: &[&str] = &["Positive", "Negative", "Mixed", "Suggestion", "Other"];

/// Allowed themes, keyed by guide category (case-insensitive).
#[derive(Debug, Clone)]
pub struct ThemeVocabulary {
    categories: HashMap<String, Vec<String>>,
    generic: Vec<String>,
}

impl Default for ThemeVocabulary {
    fn default() -> Self {
        Self::builtin()
    }
}

fn owned(terms: &[&str]) -> Vec<String> {
    terms.iter().map(|t| t.to_string()).collect()
}

impl ThemeVocabulary {
    pub fn builtin() -> Self {
        Self {
            categories: BUILTIN
                .iter()
                .map(|(category, terms)| (category.to_string(), owned(terms)))
                .collect(),
            generic: owned(GENERIC),
        }
    }

    /// Add or replace categories. "Other" is appended where missing.
    pub fn with_overrides(mut self, overrides: &HashMap<String, Vec<String>>) -> Self {
        for (category, terms) in overrides {
            let mut terms: Vec<String> = terms
                .iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect();
            if !terms.iter().any(|t| t.eq_ignore_ascii_case(OTHER_THEME)) {
                terms.push(OTHER_THEME.to_string());
            }
            self.categories.insert(category.trim().to_lowercase(), terms);
        }
        self
    }

    /// Themes allowed for `category`, or the generic list.
    pub fn terms_for(&self, category: &str) -> &[String] {
        self.categories
            .get(&category.trim().to_lowercase())
            .unwrap_or(&self.generic)
    }

    /// Canonical spelling of `theme` within `category`, or "Other".
    pub fn canonicalize(&self, category: &str, theme: &str) -> String {
        let theme = theme.trim();
        self.terms_for(category)
            .iter()
            .find(|t| t.eq_ignore_ascii_case(theme))
            .cloned()
            .unwrap_or_else(|| OTHER_THEME.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warm_up_terms() {
        let vocab = ThemeVocabulary::builtin();
        assert_eq!(
            vocab.terms_for("Warm-up"),
            &["Experience/Setting", "Role/Unit", "Patient Mix", "Other"]
        );
    }

    #[test]
    fn test_canonicalize() {
        let vocab = ThemeVocabulary::builtin();
        assert_eq!(vocab.canonicalize("warm-up", "role/unit"), "Role/Unit");
        assert_eq!(vocab.canonicalize("Warm-up", "Pricing"), "Other");
        assert_eq!(vocab.canonicalize("Warm-up", "other"), "Other");
    }

    #[test]
    fn test_unknown_category_uses_generic() {
        let vocab = ThemeVocabulary::builtin();
        assert_eq!(vocab.terms_for("Something new").len(), 5);
        assert_eq!(vocab.canonicalize("Something new", "suggestion"), "Suggestion");
    }

    #[test]
    fn test_overrides() {
        let mut overrides = HashMap::new();
        overrides.insert(
            "Pricing".to_string(),
            vec!["Too expensive".to_string(), "Fair".to_string()],
        );
        let vocab = ThemeVocabulary::builtin().with_overrides(&overrides);

        assert_eq!(vocab.terms_for("pricing"), &["Too expensive", "Fair", "Other"]);
        assert_eq!(vocab.canonicalize("PRICING", "fair"), "Fair");
    }
}
