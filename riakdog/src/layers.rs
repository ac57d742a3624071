//! Layered settings resolution.
//!
//! Settings come from an ordered list of sources: the built-in defaults,
//! then every `*.toml` file in the settings directory sorted by file name,
//! then an optional explicit settings file.  Later sources win per key;
//! tables merge recursively and scalars/arrays replace wholesale.  The
//! merged value must deserialize into the `Settings` model.

use crate::error::{self, Result};
use crate::settings::Settings;
use snafu::{ensure, ResultExt};
use std::fs;
use std::path::{Path, PathBuf};
use toml::map::Entry;
use toml::Value;
use walkdir::WalkDir;

/// The base layer; supplies a value for every key the model requires.
const DEFAULTS: &str = include_str!("../defaults.toml");

/// Resolve the settings layers into one `Settings`.
pub fn load(settings_dir: Option<&Path>, settings_file: Option<&Path>) -> Result<Settings> {
    let mut merged: Value = toml::from_str(DEFAULTS).context(error::InvalidDefaultsSnafu)?;

    if let Some(dir) = settings_dir {
        for path in list_layer_files(dir)? {
            debug!("Merging settings layer '{}'", path.display());
            let layer = read_layer(&path)?;
            merge_values(&mut merged, &layer)?;
        }
    }

    if let Some(path) = settings_file {
        debug!("Merging settings file '{}'", path.display());
        let layer = read_layer(path)?;
        merge_values(&mut merged, &layer)?;
    }

    merged.try_into().context(error::SettingsModelSnafu)
}

/// The `*.toml` files in the settings directory, sorted by file name so
/// hosts can order layers with a numeric prefix.
fn list_layer_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let walker = WalkDir::new(dir)
        .follow_links(true)
        .min_depth(1)
        .max_depth(1)
        .sort_by(|a, b| a.file_name().cmp(b.file_name()))
        .into_iter()
        .filter_entry(|e| e.file_name().to_string_lossy().ends_with(".toml"));

    let mut paths = Vec::new();
    for entry in walker {
        let entry = entry.context(error::ListSettingsFilesSnafu { dir })?;
        paths.push(entry.path().to_path_buf());
    }
    Ok(paths)
}

fn read_layer(path: &Path) -> Result<Value> {
    let data = fs::read_to_string(path).context(error::FileReadSnafu { path })?;
    toml::from_str(&data).context(error::ParseSettingsFileSnafu { path })
}

/// Merge `from` into `into`.  Tables merge key by key; anything else is
/// replaced by the later layer.  A table on one side and a scalar on the
/// other (or two scalars of different types) means the layers disagree
/// about the model, which is an error rather than a silent override.
fn merge_values(into: &mut Value, from: &Value) -> Result<()> {
    match (into, from) {
        (Value::Table(into_table), Value::Table(from_table)) => {
            for (key, from_value) in from_table {
                match into_table.entry(key.as_str()) {
                    Entry::Vacant(slot) => {
                        slot.insert(from_value.clone());
                    }
                    Entry::Occupied(mut slot) => merge_values(slot.get_mut(), from_value)?,
                }
            }
        }
        (into_value, from_value) => {
            ensure!(
                into_value.same_type(from_value),
                error::LayerTypeMismatchSnafu
            );
            *into_value = from_value.clone();
        }
    }
    Ok(())
}
