//! Renders the service's main configuration file (`app.config`) from a
//! handlebars template.  Rendering is strict and pure; writing the result
//! to disk is the applier's job.

use crate::error::{self, Result};
use crate::settings::Settings;
use handlebars::Handlebars;
use snafu::ResultExt;
use std::fs;

/// Fallback template, used unless settings point at one on disk.
const APP_CONFIG_TEMPLATE: &str = include_str!("../templates/app.config.template");
const APP_CONFIG: &str = "app.config";

/// Render the app.config contents for the given settings.
pub fn render_app_config(settings: &Settings) -> Result<String> {
    let template = match &settings.templates.app_config {
        Some(path) => {
            debug!("Reading app.config template from '{}'", path.display());
            fs::read_to_string(path).context(error::FileReadSnafu { path })?
        }
        None => APP_CONFIG_TEMPLATE.to_string(),
    };

    let mut registry = Handlebars::new();
    registry.set_strict_mode(true);
    registry
        .register_template_string(APP_CONFIG, template)
        .context(error::TemplateCompileSnafu {
            template: APP_CONFIG,
        })?;

    registry
        .render(APP_CONFIG, &settings.app_config)
        .context(error::TemplateRenderSnafu {
            template: APP_CONFIG,
        })
}

#[cfg(test)]
mod test {
    use super::render_app_config;
    use crate::error::Error;
    use crate::layers;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn built_in_template_renders_defaults() {
        let settings = layers::load(None, None).unwrap();
        let rendered = render_app_config(&settings).unwrap();
        assert!(rendered.contains("{cs_ip, \"127.0.0.1\"}"));
        assert!(rendered.contains("{cs_port, 8080}"));
        assert!(rendered.contains("{anonymous_user_creation, false}"));
    }

    #[test]
    fn template_override_from_disk() {
        let dir = TempDir::new().unwrap();
        let template = dir.path().join("app.config.template");
        fs::write(&template, "port is {{cs_port}}").unwrap();

        let mut settings = layers::load(None, None).unwrap();
        settings.templates.app_config = Some(template);
        assert_eq!(render_app_config(&settings).unwrap(), "port is 8080");
    }

    #[test]
    fn missing_template_key_is_an_error() {
        let dir = TempDir::new().unwrap();
        let template = dir.path().join("app.config.template");
        fs::write(&template, "{{no_such_key}}").unwrap();

        let mut settings = layers::load(None, None).unwrap();
        settings.templates.app_config = Some(template);
        let err = render_app_config(&settings).unwrap_err();
        assert!(matches!(err, Error::TemplateRender { .. }));
    }
}
