// Server-rendered HTML pages (templates compiled into the binary)

use minijinja::Environment;
use serde::Serialize;

use crate::core::errors::AdminError;

const TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../../templates/base.html")),
    ("login.html", include_str!("../../templates/login.html")),
    ("signup.html", include_str!("../../templates/signup.html")),
    ("dashboard.html", include_str!("../../templates/dashboard.html")),
    ("collections.html", include_str!("../../templates/collections.html")),
    ("data_view.html", include_str!("../../templates/data_view.html")),
    ("upload.html", include_str!("../../templates/upload.html")),
];

/// Template environment shared by all page handlers
///
/// `.html` templates are auto-escaped.
pub struct Views {
    env: Environment<'static>,
}

impl Views {
    pub fn new() -> Result<Self, AdminError> {
        let mut env = Environment::new();
        for &(name, source) in TEMPLATES {
            env.add_template(name, source)
                .map_err(|e| AdminError::Render(format!("template {}: {}", name, e)))?;
        }
        Ok(Self { env })
    }

    pub fn render<S: Serialize>(&self, name: &str, context: S) -> Result<String, AdminError> {
        let template = self
            .env
            .get_template(name)
            .map_err(|e| AdminError::Render(e.to_string()))?;
        template
            .render(context)
            .map_err(|e| AdminError::Render(format!("{}: {}", name, e)))
    }
}
