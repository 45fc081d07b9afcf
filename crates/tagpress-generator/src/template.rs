//! Named templates with `{{ variable }}` interpolation.
//!
//! Templates are plain files in the templates directory, addressed by file
//! name (`document.html`, `index.html`). Built-in defaults are registered
//! first so a site only needs to override what it customizes.

use std::{collections::HashMap, fs, path::Path};

use thiserror::Error;
use tracing::debug;

/// Template rendering errors.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Missing required variable.
    #[error("template {template}: missing required variable {variable}")]
    MissingVariable { template: String, variable: String },

    /// Template not found.
    #[error("template not found: {0}")]
    NotFound(String),

    /// Invalid template syntax.
    #[error("template {template}: {message}")]
    InvalidSyntax { template: String, message: String },

    /// Template directory could not be read.
    #[error("cannot read template {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for template operations.
pub type Result<T> = std::result::Result<T, TemplateError>;

/// Variables available to a template.
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    variables: HashMap<String, String>,
}

impl TemplateContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a raw value. The value is written verbatim.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.variables.insert(key.into(), value.into());
    }

    /// Insert a text value, escaping it for HTML.
    pub fn insert_text(&mut self, key: impl Into<String>, value: &str) {
        self.insert(key, escape_html(value));
    }

    #[must_use]
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.variables.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.variables.contains_key(key)
    }
}

/// A template supporting `{{ name }}` and optional `{{ name? }}` placeholders.
#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    content: String,
}

impl Template {
    #[must_use]
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Render with `context`. Substituted values are not re-scanned.
    pub fn render(&self, context: &TemplateContext) -> Result<String> {
        let mut out = String::with_capacity(self.content.len());
        let mut rest = self.content.as_str();

        while let Some(open) = rest.find("{{") {
            out.push_str(&rest[..open]);
            let after = &rest[open + 2..];
            let close = after.find("}}").ok_or_else(|| TemplateError::InvalidSyntax {
                template: self.name.clone(),
                message: "unclosed {{ delimiter".to_string(),
            })?;

            let placeholder = after[..close].trim();
            let (variable, optional) = match placeholder.strip_suffix('?') {
                Some(stripped) => (stripped.trim_end(), true),
                None => (placeholder, false),
            };

            match context.get(variable) {
                Some(value) => out.push_str(value),
                None if optional => {}
                None => {
                    return Err(TemplateError::MissingVariable {
                        template: self.name.clone(),
                        variable: variable.to_string(),
                    });
                }
            }
            rest = &after[close + 2..];
        }

        out.push_str(rest);
        Ok(out)
    }
}

/// Registry of named templates.
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    templates: HashMap<String, Template>,
}

impl TemplateRegistry {
    /// Create a registry holding the built-in templates.
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Self::default();
        registry.register(Template::new("document.html", DEFAULT_DOCUMENT_TEMPLATE));
        registry.register(Template::new("index.html", DEFAULT_INDEX_TEMPLATE));
        registry.register(Template::new("index-item.html", DEFAULT_INDEX_ITEM_TEMPLATE));
        registry
    }

    /// Built-in templates overridden by every regular file in `dir`.
    ///
    /// A missing directory leaves only the built-ins.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let mut registry = Self::new();
        if !dir.is_dir() {
            debug!(dir = %dir.display(), "no templates directory, using built-ins");
            return Ok(registry);
        }

        let entries = fs::read_dir(dir).map_err(|source| TemplateError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        for entry in entries {
            let path = entry
                .map_err(|source| TemplateError::Io {
                    path: dir.to_path_buf(),
                    source,
                })?
                .path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let content = fs::read_to_string(&path).map_err(|source| TemplateError::Io {
                path: path.clone(),
                source,
            })?;
            debug!(template = name, "loaded template");
            registry.register(Template::new(name, content));
        }
        Ok(registry)
    }

    pub fn register(&mut self, template: Template) {
        self.templates.insert(template.name.clone(), template);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Template> {
        self.templates.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// Render a named template.
    pub fn render(&self, name: &str, context: &TemplateContext) -> Result<String> {
        self.get(name)
            .ok_or_else(|| TemplateError::NotFound(name.to_string()))?
            .render(context)
    }
}

/// Escape text for inclusion in HTML content or attribute values.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Default page for a single document.
pub const DEFAULT_DOCUMENT_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <meta name="generator" content="{{ generator }}">
    <title>{{ title }} | {{ site_title }}</title>
    <link rel="canonical" href="{{ url }}">
</head>
<body>
    <article>
        <header>
            <h1>{{ title }}</h1>
            <time datetime="{{ created_iso }}">{{ created_date }}</time>
        </header>
        {{ content }}
    </article>
</body>
</html>
"#;

/// Default listing page.
pub const DEFAULT_INDEX_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <meta name="generator" content="{{ generator }}">
    <title>{{ feed_slug }} | {{ site_title }}</title>
</head>
<body>
    <section class="post-list">
        <ul>
{{ items }}
        </ul>
        <nav class="pagination">{{ pagination? }}</nav>
    </section>
</body>
</html>
"#;

/// Default entry of a listing page.
pub const DEFAULT_INDEX_ITEM_TEMPLATE: &str = r#"            <li><a href="{{ url }}">{{ title }}</a> <time datetime="{{ created_iso }}">{{ created_date }}</time></li>
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_variables() {
        let template = Template::new("t", "Hello, {{ name }}! {{name}}.");
        let ctx = TemplateContext::new().with_var("name", "World");
        assert_eq!(template.render(&ctx).expect("render"), "Hello, World! World.");
    }

    #[test]
    fn test_optional_variable() {
        let template = Template::new("t", "a{{ missing? }}b");
        assert_eq!(template.render(&TemplateContext::new()).expect("render"), "ab");
    }

    #[test]
    fn test_missing_variable() {
        let template = Template::new("t", "{{ missing }}");
        let err = template.render(&TemplateContext::new()).unwrap_err();
        assert!(matches!(err, TemplateError::MissingVariable { ref variable, .. } if variable == "missing"));
    }

    #[test]
    fn test_values_are_not_rescanned() {
        let template = Template::new("t", "{{ body }}");
        let ctx = TemplateContext::new().with_var("body", "{{ not_a_var }}");
        assert_eq!(template.render(&ctx).expect("render"), "{{ not_a_var }}");
    }

    #[test]
    fn test_unclosed_delimiter() {
        let template = Template::new("t", "{{ open");
        assert!(matches!(
            template.render(&TemplateContext::new()),
            Err(TemplateError::InvalidSyntax { .. })
        ));
    }

    #[test]
    fn test_insert_text_escapes() {
        let mut ctx = TemplateContext::new();
        ctx.insert_text("title", "Tom & <Jerry>");
        assert_eq!(ctx.get("title"), Some("Tom &amp; &lt;Jerry&gt;"));
    }

    #[test]
    fn test_registry_defaults_and_overrides() {
        let dir = tempfile::tempdir().expect("create temp dir");
        std::fs::write(dir.path().join("index.html"), "custom {{ items }}").expect("write");
        std::fs::write(dir.path().join("post.html"), "post {{ title }}").expect("write");

        let registry = TemplateRegistry::load_dir(dir.path()).expect("load");
        assert!(registry.contains("document.html"));
        assert!(registry.contains("post.html"));

        let ctx = TemplateContext::new().with_var("items", "x");
        assert_eq!(registry.render("index.html", &ctx).expect("render"), "custom x");
        assert!(matches!(
            registry.render("nope.html", &ctx),
            Err(TemplateError::NotFound(_))
        ));
    }

    #[test]
    fn test_missing_dir_uses_builtins() {
        let registry = TemplateRegistry::load_dir(Path::new("/nonexistent/templates")).expect("load");
        assert!(registry.contains("index.html"));
    }
}
