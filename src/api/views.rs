//! Page rendering
//!
//! Templates live in `templates/` and are embedded in the binary, so the
//! server runs without any files beside it.

use anyhow::{anyhow, Context as _, Result};
use axum::response::Html;
use rust_embed::RustEmbed;
use tera::{Context, Tera};

use super::middleware::{AppError, CurrentUser};

#[derive(RustEmbed)]
#[folder = "templates/"]
#[include = "*.html"]
struct TemplateAssets;

/// Tera environment holding every embedded template
pub struct Views {
    tera: Tera,
}

impl Views {
    /// Load all embedded templates.
    ///
    /// Templates are added in one batch so `{% extends %}` resolves no
    /// matter which file comes first.
    pub fn load() -> Result<Self> {
        let mut templates = Vec::new();
        for name in TemplateAssets::iter() {
            let file = TemplateAssets::get(&name)
                .ok_or_else(|| anyhow!("Embedded template vanished: {}", name))?;
            let content = String::from_utf8(file.data.into_owned())
                .with_context(|| format!("Template is not UTF-8: {}", name))?;
            templates.push((name.to_string(), content));
        }

        let mut tera = Tera::default();
        tera.add_raw_templates(templates)
            .context("Failed to parse templates")?;

        tracing::debug!(count = tera.get_template_names().count(), "Templates loaded");
        Ok(Self { tera })
    }

    /// Render a template to an HTML response body
    pub fn render(&self, template: &str, context: &Context) -> Result<Html<String>, AppError> {
        Ok(Html(self.tera.render(template, context)?))
    }
}

/// Context every page starts from: who is logged in
pub fn page_context(user: &CurrentUser) -> Context {
    let mut context = Context::new();
    context.insert("user", &user.0);
    context
}

/// Form errors keyed by field name, as templates expect them
pub fn insert_form_error(context: &mut Context, field: &str, message: &str) {
    let mut errors = std::collections::HashMap::new();
    errors.insert(field.to_string(), vec![message.to_string()]);
    context.insert("errors", &errors);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::User;

    #[test]
    fn test_all_templates_load() {
        let views = Views::load().expect("Templates should parse");

        for name in [
            "base.html",
            "notes/home.html",
            "notes/list.html",
            "notes/detail.html",
            "notes/form.html",
            "notes/delete.html",
            "notes/success.html",
            "news/home.html",
            "news/detail.html",
            "news/edit.html",
            "news/delete.html",
            "registration/login.html",
            "registration/logged_out.html",
            "registration/signup.html",
        ] {
            assert!(
                views.tera.get_template_names().any(|t| t == name),
                "missing template {name}"
            );
        }
    }

    #[test]
    fn test_render_escapes_user_content() {
        let views = Views::load().unwrap();
        let user = CurrentUser(Some(User::new("<b>alice</b>".to_string(), String::new())));

        let html = views
            .render("notes/home.html", &page_context(&user))
            .expect("Render failed");

        assert!(html.0.contains("&lt;b&gt;alice&lt;&#x2F;b&gt;"));
        assert!(!html.0.contains("<b>alice</b>"));
    }
}
