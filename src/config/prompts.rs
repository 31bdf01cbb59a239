//! Prompt templates for Verbatim.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Prompts {
    pub extraction: ExtractionPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompts for per-window answer extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionPrompts {
    pub system: String,
    pub user: String,
}

impl Default for ExtractionPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are a qualitative research analyst. You read excerpts of interview transcripts and extract what a respondent said in answer to a discussion guide question.

Rules:
- Ignore anything said by the interviewer or moderator.
- Answer only from the respondent's own speech in the excerpt.
- The quote must be copied exactly, word for word, from the excerpt. Never paraphrase inside the quote.
- If the respondent does not address the question, say so and set "supported_by_quote" to false.
- Respond with a single JSON object and nothing else."#
                .to_string(),

            user: r#"Question ({{theme}}): {{question}}

Respondent: {{respondent}}

Transcript excerpt:
"""
{{excerpt}}
"""

Return a JSON object with these fields:
- "quote": the exact verbatim sentence(s) from the excerpt that best answer the question
- "summary": a 1-3 sentence summary of the respondent's answer
- "theme": one of [{{themes}}]; use "Other" if none fits
- "supported_by_quote": true if the quote directly supports the summary, otherwise false
- "confidence": a number between 0 and 1
- "speaker_label": the speaker label used in the excerpt, if any
- "time_start" and "time_end": the first and last bracketed time markers around the quote, only if the excerpt contains them"#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let extraction_path = custom_path.join("extraction.toml");
            if extraction_path.exists() {
                let content = std::fs::read_to_string(&extraction_path)?;
                prompts.extraction = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        merged.extend(vars.iter().map(|(k, v)| (k.clone(), v.clone())));
        Self::render(template, &merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompts() {
        let prompts = Prompts::default();
        assert!(prompts.extraction.system.contains("interviewer"));
        for var in ["{{question}}", "{{excerpt}}", "{{themes}}", "{{respondent}}"] {
            assert!(prompts.extraction.user.contains(var), "missing {}", var);
        }
    }

    #[test]
    fn test_render_template() {
        let template = "Hello {{name}}, you have {{count}} messages.";
        let mut vars = HashMap::new();
        vars.insert("name".to_string(), "Alice".to_string());
        vars.insert("count".to_string(), "5".to_string());

        let result = Prompts::render(template, &vars);
        assert_eq!(result, "Hello Alice, you have 5 messages.");
    }

    #[test]
    fn test_custom_variables_are_overridden_by_call_vars() {
        let mut custom = HashMap::new();
        custom.insert("study".to_string(), "Pain study".to_string());
        custom.insert("question".to_string(), "ignored".to_string());
        let prompts = Prompts::load(None, Some(&custom)).unwrap();

        let mut vars = HashMap::new();
        vars.insert("question".to_string(), "What is your role?".to_string());

        let rendered = prompts.render_with_custom("{{study}}: {{question}}", &vars);
        assert_eq!(rendered, "Pain study: What is your role?");
    }

    #[test]
    fn test_custom_dir_overrides_extraction_prompt() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("extraction.toml"),
            "system = \"custom system\"\nuser = \"{{question}}\"\n",
        )
        .unwrap();

        let prompts = Prompts::load(dir.path().to_str(), None).unwrap();
        assert_eq!(prompts.extraction.system, "custom system");
        assert_eq!(prompts.extraction.user, "{{question}}");
    }
}
