//! Configuration sources layered onto an [`OptionsDict`].
//!
//! Precedence, lowest first: declared defaults, the JSON config file, then
//! `key=value` overrides (typically from the command line).

use crate::error::{OptionsError, Result};
use crate::options::{OptionValue, OptionsDict};

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const CONFIG_FILE_NAME: &str = "params.json";

/// Returns the path to the kami data directory, if the platform has one.
pub fn data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|dd| dd.join("kami"))
}

/// Returns the default config file location.
pub fn default_path() -> Option<PathBuf> {
    data_dir().map(|d| d.join(CONFIG_FILE_NAME))
}

/// Applies a flat JSON object of option values to `options`.
///
/// Keys may be option keys or UCI names. Nothing is applied unless every entry
/// is valid. Returns the number of values applied.
pub fn apply_json(options: &OptionsDict, json: &str) -> Result<usize> {
    let entries: BTreeMap<String, OptionValue> = serde_json::from_str(json)?;
    options.set_values(entries)
}

/// Loads a JSON config file into `options`.
pub fn load_file(options: &OptionsDict, path: &Path) -> Result<usize> {
    let text = fs::read_to_string(path)?;
    let count = apply_json(options, &text)?;

    info!(path = %path.display(), count, "loaded search options");
    Ok(count)
}

/// Loads the config file at the default location, if there is one.
/// Returns the path that was loaded.
pub fn load_default(options: &OptionsDict) -> Result<Option<PathBuf>> {
    let path = match default_path() {
        Some(p) => p,
        None => {
            debug!("no data directory available, skipping config file");
            return Ok(None);
        }
    };

    if !path.is_file() {
        debug!(path = %path.display(), "no config file, using defaults");
        return Ok(None);
    }

    load_file(options, &path)?;
    Ok(Some(path))
}

/// Applies `key=value` overrides. Nothing is applied unless every override is valid.
pub fn apply_overrides<I, S>(options: &OptionsDict, overrides: I) -> Result<usize>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut pairs = Vec::new();

    for item in overrides {
        let item = item.as_ref();
        let arg = item.trim_start_matches("--");

        let (key, value) = arg.split_once('=').ok_or_else(|| OptionsError::Parse {
            option: arg.to_string(),
            reason: format!("expected key=value, got '{}'", item),
        })?;

        pairs.push((key.trim().to_string(), value.to_string()));
    }

    options.set_strs(pairs)
}
