//! Load `.rpnbatch.toml` from the input file's directory (CLI only). Lib callers pass `Opts` directly.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::Opts;
use crate::utils::config::PackagePaths;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RpnToml {
    #[serde(default)]
    settings: SettingsSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SettingsSection {
    worker_threads_count: Option<usize>,
    process_limit_size: Option<usize>,
    comment_identifier: Option<String>,
    delimiter: Option<char>,
    cache_size: Option<usize>,
    verbose: Option<bool>,
}

/// Load the settings file from `dir`. `Ok(None)` when there is no file; `Err` when it
/// exists but cannot be read or parsed (caller warns and carries on with defaults).
pub(crate) fn load_rpn_toml(dir: &Path) -> Result<Option<RpnToml>> {
    let path = dir.join(PackagePaths::get().config_filename());
    if !path.is_file() {
        return Ok(None);
    }
    let s = std::fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    let parsed = toml::from_str(&s).with_context(|| format!("parse {}", path.display()))?;
    Ok(Some(parsed))
}

/// Overwrite opts field from file when present.
macro_rules! apply_file_opt {
    ($section:expr, $opts:expr, $file_field:ident => $opts_field:ident) => {
        if let Some(v) = $section.$file_field.clone() {
            $opts.$opts_field = v;
        }
    };
}

/// Apply file config to opts (only fields present in the file). Call before applying CLI.
pub(crate) fn apply_file_to_opts(file: &RpnToml, opts: &mut Opts) {
    let s = &file.settings;
    apply_file_opt!(s, opts, worker_threads_count => worker_threads);
    apply_file_opt!(s, opts, process_limit_size => batch_size);
    apply_file_opt!(s, opts, comment_identifier => comment_identifier);
    apply_file_opt!(s, opts, delimiter => delimiter);
    apply_file_opt!(s, opts, cache_size => cache_size);
    apply_file_opt!(s, opts, verbose => verbose);
}
