//! Theme engine
//!
//! This module provides template rendering using Tera.
//! Features:
//! - Page templates embedded in the binary
//! - Per-template overrides from a directory on disk
//! - Standard template variables (site identity, current user, year)
//! - Plain HTML fallback when even the error template fails

use anyhow::{Context, Result};
use chrono::Datelike;
use rust_embed::RustEmbed;
use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use std::fs;
use std::path::{Path, PathBuf};
use tera::{Context as TeraContext, Tera};

mod error;

pub use error::ThemeError;

/// Templates shipped with the binary
#[derive(RustEmbed)]
#[folder = "templates/"]
#[include = "*.html"]
struct EmbeddedTemplates;

/// Template used for error pages
pub const ERROR_TEMPLATE: &str = "error.html";

/// Theme engine for rendering templates
pub struct ThemeEngine {
    /// Tera template engine instance
    tera: Tera,
    /// Directory searched for overrides
    override_path: PathBuf,
    /// Names of templates replaced from `override_path`
    overridden: Vec<String>,
}

impl ThemeEngine {
    /// Create a theme engine from the embedded templates, replacing any of
    /// them with a same-named `.html` file under `override_path`.
    ///
    /// A missing override directory is not an error.
    pub fn new(override_path: &Path) -> Result<Self> {
        let mut engine = Self {
            tera: Tera::default(),
            override_path: override_path.to_path_buf(),
            overridden: Vec::new(),
        };
        engine.reload_templates()?;
        Ok(engine)
    }

    /// Rebuild the template set from the embedded files and overrides
    pub fn reload_templates(&mut self) -> Result<()> {
        let mut templates: Vec<(String, String)> = Vec::new();
        for name in EmbeddedTemplates::iter() {
            let file = EmbeddedTemplates::get(&name)
                .ok_or_else(|| ThemeError::NotFound(name.to_string()))?;
            let content = std::str::from_utf8(&file.data)
                .map_err(|_| ThemeError::InvalidEncoding(name.to_string()))?;
            templates.push((name.to_string(), content.to_string()));
        }

        let mut overrides: Vec<(String, String)> = Vec::new();
        self.collect_templates_from_dir(&self.override_path, &self.override_path, &mut overrides)?;

        let mut overridden = Vec::new();
        for (name, content) in overrides {
            match templates.iter_mut().find(|(existing, _)| *existing == name) {
                Some(slot) => slot.1 = content,
                None => templates.push((name.clone(), content)),
            }
            overridden.push(name);
        }
        overridden.sort();

        let mut tera = Tera::default();
        tera.add_raw_templates(templates)
            .map_err(|e| ThemeError::TemplateError(format!("Failed to load templates: {}", describe(&e))))?;

        if !overridden.is_empty() {
            tracing::info!(
                path = %self.override_path.display(),
                templates = ?overridden,
                "Template overrides loaded"
            );
        }

        self.tera = tera;
        self.overridden = overridden;
        Ok(())
    }

    /// Collect templates from a directory
    fn collect_templates_from_dir(
        &self,
        base_path: &Path,
        current_path: &Path,
        templates: &mut Vec<(String, String)>,
    ) -> Result<()> {
        if !current_path.is_dir() {
            return Ok(());
        }

        for entry in fs::read_dir(current_path)? {
            let entry = entry?;
            let path = entry.path();

            if path.is_dir() {
                self.collect_templates_from_dir(base_path, &path, templates)?;
            } else if path.extension().is_some_and(|ext| ext == "html") {
                let relative_path = path
                    .strip_prefix(base_path)
                    .map_err(|_| ThemeError::TemplateError("Failed to get relative path".to_string()))?;

                let template_name = relative_path.to_string_lossy().replace('\\', "/");

                let content = fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read template: {:?}", path))?;

                templates.push((template_name, content));
            }
        }

        Ok(())
    }

    /// Render a template with the given context
    pub fn render(&self, template: &str, context: &TeraContext) -> Result<String> {
        if !self.has_template(template) {
            return Err(ThemeError::NotFound(template.to_string()).into());
        }
        self.tera.render(template, context).map_err(|e| {
            ThemeError::TemplateError(format!("Failed to render '{}': {}", template, describe(&e))).into()
        })
    }

    /// Render a template with standard variables automatically added
    pub fn render_with_standard_vars(
        &self,
        template: &str,
        context: &TeraContext,
        standard_vars: &StandardTemplateVars,
    ) -> Result<String> {
        let mut full_context = context.clone();
        standard_vars.apply(&mut full_context);
        self.render(template, &full_context)
    }

    /// Render a template, falling back to the error template and then to a
    /// plain HTML page. Never fails.
    pub fn render_with_fallback(&self, template: &str, context: &TeraContext) -> String {
        match self.render(template, context) {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!("Failed to render template '{}': {}, trying error template", template, e);

                let mut error_context = context.clone();
                error_context.insert("status", &500);
                error_context.insert("error_message", "The page could not be displayed.");

                match self.render(ERROR_TEMPLATE, &error_context) {
                    Ok(html) => html,
                    Err(error_template_err) => {
                        tracing::warn!(
                            "Failed to render error template: {}, returning simple HTML error page",
                            error_template_err
                        );
                        Self::simple_error_page(500, "The page could not be displayed.")
                    }
                }
            }
        }
    }

    /// Last-resort error page that needs no template
    pub fn simple_error_page(status: u16, message: &str) -> String {
        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Error {status}</title>
</head>
<body>
    <h1>Error {status}</h1>
    <p>{message}</p>
</body>
</html>"#,
            status = status,
            message = escape_html(message)
        )
    }

    pub fn has_template(&self, template: &str) -> bool {
        self.tera.get_template_names().any(|name| name == template)
    }

    /// Sorted names of every loaded template
    pub fn template_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tera.get_template_names().map(str::to_string).collect();
        names.sort();
        names
    }

    /// Templates replaced by files from the override directory
    pub fn overridden_templates(&self) -> &[String] {
        &self.overridden
    }

    pub fn override_path(&self) -> &Path {
        &self.override_path
    }
}

/// Flatten an error and its sources into one line
fn describe(error: &dyn StdError) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(s) = source {
        message.push_str(&format!(": {}", s));
        source = s.source();
    }
    message
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Variables every page receives
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardTemplateVars {
    pub site_name: String,
    pub site_description: String,
    /// Logged-in user, if any
    pub current_user: Option<CurrentUser>,
    pub request_path: String,
    /// Current year (for copyright)
    pub year: i32,
}

/// Current user information for templates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
    pub is_staff: bool,
}

impl From<&crate::models::User> for CurrentUser {
    fn from(user: &crate::models::User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            is_staff: user.is_staff,
        }
    }
}

impl StandardTemplateVars {
    pub fn new(
        site_name: impl Into<String>,
        site_description: impl Into<String>,
        request_path: impl Into<String>,
    ) -> Self {
        Self {
            site_name: site_name.into(),
            site_description: site_description.into(),
            current_user: None,
            request_path: request_path.into(),
            year: chrono::Utc::now().year(),
        }
    }

    pub fn with_user(mut self, user: CurrentUser) -> Self {
        self.current_user = Some(user);
        self
    }

    /// Insert every variable into `context`
    pub fn apply(&self, context: &mut TeraContext) {
        context.insert("site_name", &self.site_name);
        context.insert("site_description", &self.site_description);
        context.insert("request_path", &self.request_path);
        context.insert("year", &self.year);
        context.insert("current_user", &self.current_user);
    }
}

#[cfg(test)]
mod tests;
