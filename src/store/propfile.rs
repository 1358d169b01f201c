// Property file persistence for the scaling configuration.
//
// Format is one `key = value` pair per line. `#` starts a comment that runs
// to the end of the line, blank lines are ignored, and key case is kept.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::{ConfigStore, StoreResult};
use crate::config::{is_valid_scale_factor, ScaleConfig};
use crate::graphics::ScalingAlgorithm;

/// File name used inside a config directory.
pub const CONFIG_FILE_NAME: &str = "resolutioncontrol.properties";

const KEY_SCALE_FACTOR: &str = "scaleFactor";
const KEY_UPSCALE: &str = "upscaleAlgorithm";
const KEY_DOWNSCALE: &str = "downscaleAlgorithm";

/// Parse property file content, invoking `handler` with `(key, value)` for
/// each entry in file order.
///
/// Lines without `=` are skipped with a warning. Keys and values are
/// trimmed; an empty value is passed through as `""`.
pub fn parse_propfile(data: &str, handler: &mut dyn FnMut(&str, &str)) {
    for (index, raw) in data.lines().enumerate() {
        let line = match raw.find('#') {
            Some(pos) => &raw[..pos],
            None => raw,
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            log::warn!("line {}: key without value: {:?}", index + 1, line);
            continue;
        };

        let key = key.trim();
        if key.is_empty() {
            log::warn!("line {}: value without key", index + 1);
            continue;
        }
        handler(key, value.trim());
    }
}

/// Build a [`ScaleConfig`] from property file content.
///
/// Starts from defaults; unknown keys and bad values are logged and
/// skipped so a damaged file never prevents startup.
pub fn parse_config(data: &str) -> ScaleConfig {
    let mut config = ScaleConfig::default();
    parse_propfile(data, &mut |key, value| match key {
        KEY_SCALE_FACTOR => match value.parse::<f64>() {
            Ok(factor) if is_valid_scale_factor(factor) => config.scale_factor = factor,
            _ => log::warn!("ignoring invalid {}: {:?}", KEY_SCALE_FACTOR, value),
        },
        KEY_UPSCALE => match value.parse::<ScalingAlgorithm>() {
            Ok(alg) => config.upscale_algorithm = alg,
            Err(err) => log::warn!("ignoring {}: {}", KEY_UPSCALE, err),
        },
        KEY_DOWNSCALE => match value.parse::<ScalingAlgorithm>() {
            Ok(alg) => config.downscale_algorithm = alg,
            Err(err) => log::warn!("ignoring {}: {}", KEY_DOWNSCALE, err),
        },
        other => log::warn!("unknown config key: {}", other),
    });
    config
}

/// Serialize a config to property file content.
pub fn render_config(config: &ScaleConfig) -> String {
    format!(
        "# resolutioncontrol\n{} = {}\n{} = {}\n{} = {}\n",
        KEY_SCALE_FACTOR,
        config.scale_factor,
        KEY_UPSCALE,
        config.upscale_algorithm,
        KEY_DOWNSCALE,
        config.downscale_algorithm,
    )
}

/// Store backed by a property file on disk.
#[derive(Debug, Clone)]
pub struct PropFileStore {
    path: PathBuf,
}

impl PropFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store for the standard file name inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(CONFIG_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for PropFileStore {
    fn load(&mut self) -> StoreResult<ScaleConfig> {
        match fs::read_to_string(&self.path) {
            Ok(data) => Ok(parse_config(&data)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                log::info!("no config at {}, using defaults", self.path.display());
                Ok(ScaleConfig::default())
            }
            Err(err) => Err(err.into()),
        }
    }

    fn save(&mut self, config: &ScaleConfig) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, render_config(config))?;
        log::debug!("saved config to {}", self.path.display());
        Ok(())
    }
}
