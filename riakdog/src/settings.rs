//! The settings model: the shape the merged configuration layers must
//! deserialize into.  Field names are kebab-case in the TOML sources; the
//! built-in defaults layer supplies a value for every required field, so a
//! host only overrides what it cares about.

use erl_args::ArgumentSet;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct Settings {
    /// Directory the rendered configuration files land in.
    pub config_dir: PathBuf,
    /// Remove everything this tool manages instead of installing it.
    pub absent: bool,
    /// Restart the service when a rendered configuration file changes.
    pub service_autorestart: bool,
    pub package: PackageSettings,
    pub service: ServiceSettings,
    pub user: UserSettings,
    pub templates: TemplateSettings,
    /// Free-form data handed to the app.config template.
    pub app_config: toml::value::Table,
    /// Directives for the VM arguments file.
    pub vm_args: ArgumentSet,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct PackageSettings {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    /// Install from the distro repos; when false, the package is installed
    /// from a downloaded artifact described by the fields below.
    pub use_repos: bool,
    #[serde(default)]
    pub download_url: Option<String>,
    /// Expected SHA-256 of the downloaded artifact.
    #[serde(default)]
    pub download_hash: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct ServiceSettings {
    pub name: String,
    /// Commands run to refresh the service after a config change.
    pub restart_commands: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct UserSettings {
    pub name: String,
    pub system: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct TemplateSettings {
    /// Path to an app.config template overriding the built-in one.
    #[serde(default)]
    pub app_config: Option<PathBuf>,
}
