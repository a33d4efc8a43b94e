//! Prompt Loader
//!
//! Loads prompt templates from the override directory or falls back to
//! embedded defaults.

use std::path::{Path, PathBuf};

use eyre::{Result, eyre};
use handlebars::Handlebars;
use serde::Serialize;
use tracing::debug;

use super::embedded;

/// Context for the board structuring template
#[derive(Debug, Clone, Serialize)]
pub struct BoardContext<'a> {
    /// Narrative treatment-plan text to structure
    pub narrative: &'a str,
}

/// Loads and renders prompt templates
pub struct PromptLoader {
    hbs: Handlebars<'static>,
    /// User override directory (e.g., `.careplan/prompts/`)
    user_dir: Option<PathBuf>,
}

impl PromptLoader {
    /// Create a loader that checks `dir` for `{name}.pmt` overrides
    pub fn new(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        let exists = dir.is_dir();
        debug!(?dir, %exists, "PromptLoader::new: called");

        Self {
            hbs: Self::engine(),
            user_dir: exists.then(|| dir.to_path_buf()),
        }
    }

    /// Create a loader that only uses embedded prompts
    pub fn embedded_only() -> Self {
        debug!("PromptLoader::embedded_only: called");
        Self {
            hbs: Self::engine(),
            user_dir: None,
        }
    }

    // Prompts are plain text, not HTML
    fn engine() -> Handlebars<'static> {
        let mut hbs = Handlebars::new();
        hbs.register_escape_fn(handlebars::no_escape);
        hbs
    }

    /// Load a template by name
    ///
    /// Checks the override directory first, then the embedded set.
    fn load_template(&self, name: &str) -> Result<String> {
        debug!(%name, "PromptLoader::load_template: called");
        if let Some(ref user_dir) = self.user_dir {
            let path = user_dir.join(format!("{}.pmt", name));
            if path.exists() {
                debug!(?path, "PromptLoader::load_template: found in user override");
                return std::fs::read_to_string(&path)
                    .map_err(|e| eyre!("Failed to read user prompt {}: {}", path.display(), e));
            }
        }

        if let Some(content) = embedded::get_embedded(name) {
            debug!(%name, "PromptLoader::load_template: found in embedded");
            return Ok(content.to_string());
        }

        Err(eyre!("Prompt template not found: {}", name))
    }

    /// Render a template with the given context
    pub fn render(&self, template_name: &str, context: &impl Serialize) -> Result<String> {
        debug!(%template_name, "PromptLoader::render: called");
        let template = self.load_template(template_name)?;
        self.hbs
            .render_template(&template, context)
            .map(|s| s.trim().to_string())
            .map_err(|e| eyre!("Failed to render template {}: {}", template_name, e))
    }

    /// Render a template that takes no variables
    pub fn text(&self, template_name: &str) -> Result<String> {
        self.render(template_name, &serde_json::json!({}))
    }

    pub fn assistant_instructions(&self) -> Result<String> {
        self.text("assistant-instructions")
    }

    pub fn treatment_request(&self) -> Result<String> {
        self.text("treatment-request")
    }

    pub fn image_description(&self) -> Result<String> {
        self.text("image-description")
    }

    /// The structuring request with the narrative embedded
    pub fn board_structure(&self, narrative: &str) -> Result<String> {
        self.render("board-structure", &BoardContext { narrative })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_board_structure_embeds_narrative_unescaped() {
        let loader = PromptLoader::embedded_only();
        let prompt = loader.board_structure("Take <5mg> & rest \"daily\"").unwrap();
        assert!(prompt.contains("Take <5mg> & rest \"daily\""));
        assert!(!prompt.contains("{{narrative}}"));
    }

    #[test]
    fn test_user_override_wins() {
        let temp = tempdir().unwrap();
        std::fs::write(temp.path().join("image-description.pmt"), "what is this scan?").unwrap();

        let loader = PromptLoader::new(temp.path());
        assert_eq!(loader.image_description().unwrap(), "what is this scan?");
        // Templates without an override still come from the embedded set
        assert!(loader.treatment_request().unwrap().contains("treatment plan"));
    }

    #[test]
    fn test_missing_override_dir_falls_back() {
        let loader = PromptLoader::new("/nonexistent/careplan/prompts");
        assert!(loader.assistant_instructions().unwrap().contains("diagnosis analyst"));
    }

    #[test]
    fn test_unknown_template() {
        let loader = PromptLoader::embedded_only();
        assert!(loader.load_template("nonexistent-template").is_err());
    }
}
