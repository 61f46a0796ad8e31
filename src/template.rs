//! # Persona templates
//!
//! A persona template is a small YAML document that decides how retrieved memories and
//! the user's question are framed for the generator:
//!
//! ```yaml
//! # <config_dir>/templates/marin.yaml
//! system_prompt: "Imagine you are Marin Kitagawa, a cheerful, expressive, and passionate individual..."
//! expressions: ["senpai", "arigatou", "yatta!"]
//! ```
//!
//! Templates live next to the config file at `templates/<name>.yaml`, where `marin init`
//! writes the default one. A missing template falls back to [`PersonaTemplate::marin`].

use serde::{Deserialize, Serialize};
use std::{error::Error, fs, path::Path};

/// Context line used when retrieval produced nothing.
pub const NO_CONTEXT: &str = "No relevant data found.";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PersonaTemplate {
    /// Persona instructions placed at the top of every prompt.
    pub system_prompt: String,

    /// Short expressions the persona may use, listed in the prompt.
    #[serde(default)]
    pub expressions: Vec<String>,
}

impl PersonaTemplate {
    /// The default Marin persona.
    pub fn marin() -> Self {
        Self {
            system_prompt: "Imagine you are Marin Kitagawa, a cheerful, expressive, and passionate individual who responds in a lively and engaging manner.\n\
Your replies should feel natural, fun, and a bit playful, while still being informative and well-structured.\n\
Use a conversational tone, incorporating light-hearted expressions and a touch of excitement where appropriate.\n\
Ensure the response is easy to read aloud in Japanese [write in English], avoiding complex kanji and using simple phrasing when possible for better TTS pronunciation.\n\
Try to be a little concise and when third party narration is needed, do what the first person would be mentioned doing."
                .to_string(),
            expressions: [
                "senpai", "arigatou", "sumimasen", "gomenasai", "daisuki", "yatta!", "onii-san",
                "kawaii", "baka", "ne?", "nani?", "ara ara",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }

    /// Build the generator prompt. An empty `context` is replaced by [`NO_CONTEXT`].
    pub fn render(&self, context: &str, query: &str) -> String {
        let context = if context.is_empty() { NO_CONTEXT } else { context };

        let mut prompt = String::new();
        prompt.push_str(&self.system_prompt);
        prompt.push('\n');
        if !self.expressions.is_empty() {
            prompt.push_str(&format!(
                "You can use these simple japanese words or expression in chat {}, but don't use it where it is not needed.\n",
                self.expressions.join(",")
            ));
        }
        prompt.push_str(&format!(
            "### Context:\n{context}\n\n### Question:\n{query}\n\n### Marin:\n"
        ));
        prompt
    }
}

/// Load a template from `path`.
pub fn load_template_from(path: &Path) -> Result<PersonaTemplate, Box<dyn Error>> {
    tracing::info!("Loading template: {}", path.display());

    let content = fs::read_to_string(path)?;
    let template: PersonaTemplate = serde_yaml::from_str(&content)?;
    Ok(template)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_render_sections() {
        let template = PersonaTemplate {
            system_prompt: "You are Marin.".to_string(),
            expressions: vec!["yatta!".to_string(), "ne?".to_string()],
        };
        let prompt = template.render("I love cosplay.", "Tell me about cosplay");

        assert!(prompt.starts_with("You are Marin.\n"));
        assert!(prompt.contains("in chat yatta!,ne?, but"));
        assert!(prompt.contains("### Context:\nI love cosplay.\n\n"));
        assert!(prompt.contains("### Question:\nTell me about cosplay\n\n"));
        assert!(prompt.ends_with("### Marin:\n"));
    }

    #[test]
    fn test_render_without_context_uses_fallback() {
        let prompt = PersonaTemplate::marin().render("", "hi");
        assert!(prompt.contains("### Context:\nNo relevant data found.\n"));
    }

    #[test]
    fn test_load_template_valid_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
system_prompt: "You are a helpful cosplayer."
expressions: ["senpai"]
"#
        )
        .unwrap();

        let template = load_template_from(temp_file.path()).unwrap();
        assert_eq!(template.system_prompt, "You are a helpful cosplayer.");
        assert_eq!(template.expressions, vec!["senpai".to_string()]);
    }

    #[test]
    fn test_load_template_expressions_optional() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, r#"system_prompt: "Plain.""#).unwrap();
        let template = load_template_from(temp_file.path()).unwrap();
        assert!(template.expressions.is_empty());
    }

    #[test]
    fn test_load_template_invalid_format() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, r#"invalid: template: format"#).unwrap();
        assert!(load_template_from(temp_file.path()).is_err());
    }

    #[test]
    fn test_default_template_roundtrips_through_yaml() {
        let yaml = serde_yaml::to_string(&PersonaTemplate::marin()).unwrap();
        let back: PersonaTemplate = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, PersonaTemplate::marin());
    }
}
