use handlebars::Handlebars;
use serde::Serialize;
use tracing::info;

use crate::error::{AppError, Result};

pub const MODERATION_TEMPLATE: &str = "moderation_email";

const DEFAULT_MODERATION_TEMPLATE: &str = include_str!("../../templates/moderation_email.hbs");

/// Values available to the moderation email template.
#[derive(Debug, Clone, Serialize)]
pub struct ModerationEmailContext {
    pub name: String,
    pub email: String,
    pub comment: String,
    pub approve_url: String,
    pub reject_url: String,
}

pub struct TemplateRenderer {
    registry: Handlebars<'static>,
}

impl TemplateRenderer {
    /// Loads the moderation template from `template_path`, or the bundled default.
    pub fn new(template_path: Option<&str>) -> Result<Self> {
        let source = match template_path {
            Some(path) => {
                info!("Loading moderation email template from {}", path);
                std::fs::read_to_string(path).map_err(|e| {
                    AppError::Template(format!("Failed to read template {}: {}", path, e))
                })?
            }
            None => DEFAULT_MODERATION_TEMPLATE.to_string(),
        };
        Self::from_source(&source)
    }

    pub fn from_source(source: &str) -> Result<Self> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        // plain-text mail body
        registry.register_escape_fn(handlebars::no_escape);
        registry.register_template_string(MODERATION_TEMPLATE, source)?;
        Ok(Self { registry })
    }

    pub fn render_moderation_email(&self, context: &ModerationEmailContext) -> Result<String> {
        Ok(self.registry.render(MODERATION_TEMPLATE, context)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> ModerationEmailContext {
        ModerationEmailContext {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            comment: "First!".to_string(),
            approve_url: "https://example.com/approve".to_string(),
            reject_url: "https://example.com/reject".to_string(),
        }
    }

    #[test]
    fn test_default_template_mentions_everything() {
        let renderer = TemplateRenderer::new(None).unwrap();
        let body = renderer.render_moderation_email(&context()).unwrap();
        assert!(body.contains("Ada"));
        assert!(body.contains("ada@example.com"));
        assert!(body.contains("First!"));
        assert!(body.contains("https://example.com/approve"));
        assert!(body.contains("https://example.com/reject"));
    }

    #[test]
    fn test_custom_template() {
        let renderer = TemplateRenderer::from_source("{{name}}|{{approve_url}}").unwrap();
        assert_eq!(
            renderer.render_moderation_email(&context()).unwrap(),
            "Ada|https://example.com/approve"
        );
    }

    #[test]
    fn test_unknown_variable_is_an_error() {
        let renderer = TemplateRenderer::from_source("{{missing}}").unwrap();
        assert!(matches!(
            renderer.render_moderation_email(&context()),
            Err(AppError::Template(_))
        ));
    }

    #[test]
    fn test_missing_template_file() {
        assert!(matches!(
            TemplateRenderer::new(Some("/nonexistent/moderation.hbs")),
            Err(AppError::Template(_))
        ));
    }
}
