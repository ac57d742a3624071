use snafu::Snafu;
use std::io;
use std::num;
use std::path::PathBuf;

/// Potential errors while resolving settings, building the catalog, or
/// applying it to the host
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("Built-in default settings are not valid TOML: {}", source))]
    InvalidDefaults { source: toml::de::Error },

    #[snafu(display("Failed to list settings files in {}: {}", dir.display(), source))]
    ListSettingsFiles {
        dir: PathBuf,
        source: walkdir::Error,
    },

    #[snafu(display("Failed to read {}: {}", path.display(), source))]
    FileRead { path: PathBuf, source: io::Error },

    #[snafu(display("Settings file {} is not valid TOML: {}", path.display(), source))]
    ParseSettingsFile {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[snafu(display("Cannot merge mismatched types between settings layers"))]
    LayerTypeMismatch {},

    #[snafu(display("Merged settings don't form a valid model: {}", source))]
    SettingsModel { source: toml::de::Error },

    #[snafu(display("Failed to compile template '{}': {}", template, source))]
    TemplateCompile {
        template: &'static str,
        #[snafu(source(from(handlebars::TemplateError, Box::new)))]
        source: Box<handlebars::TemplateError>,
    },

    #[snafu(display("Template '{}' failed to render: {}", template, source))]
    TemplateRender {
        template: &'static str,
        source: handlebars::RenderError,
    },

    #[snafu(display(
        "Installing outside the repos requires package version, download-url, and download-hash"
    ))]
    IncompleteDownload {},

    #[snafu(display("Failed to assemble resource catalog: {}", source))]
    Catalog { source: catalog::Error },

    #[snafu(display("File resource for {} has no content to write", path.display()))]
    FileContent { path: PathBuf },

    #[snafu(display("Failed to write {} {}: {}", pathtype, path.display(), source))]
    FileWrite {
        path: PathBuf,
        pathtype: &'static str,
        source: io::Error,
    },

    #[snafu(display("Failed to remove {}: {}", path.display(), source))]
    FileRemove { path: PathBuf, source: io::Error },

    #[snafu(display("Failed to set {} to mode {}: {}", path.display(), mode, source))]
    FileMode {
        path: PathBuf,
        mode: String,
        source: num::ParseIntError,
    },

    #[snafu(display(
        "Artifact {} has SHA-256 {} but settings expect {}",
        path.display(),
        actual,
        expected
    ))]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[snafu(display("Failed to run command - '{}': {}", command, source))]
    CommandExecutionFailure { command: String, source: io::Error },

    #[snafu(display("Command failed - '{}': {}", command, stderr))]
    FailedCommand { command: String, stderr: String },

    #[snafu(display("Command is invalid (empty, space prefix, etc.) - {}", command))]
    InvalidCommand { command: String },

    #[snafu(display("Catalog order references missing resource '{}'", id))]
    MissingResource { id: catalog::ResourceId },

    #[snafu(display("Failed to serialize plan output: {}", source))]
    PlanJson { source: serde_json::Error },
}

pub type Result<T> = std::result::Result<T, Error>;
