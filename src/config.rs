use anyhow::{Context, Result};

use crate::graphics::ScalingAlgorithm;

/// Default internal-resolution multiplier (no scaling).
pub const DEFAULT_SCALE_FACTOR: f64 = 1.0;

/// Persisted scaling configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleConfig {
    /// Internal resolution multiplier. 1.0 disables scaling.
    pub scale_factor: f64,
    /// Filter used when the factor is above 1.0
    pub upscale_algorithm: ScalingAlgorithm,
    /// Filter used when the factor is below 1.0
    pub downscale_algorithm: ScalingAlgorithm,
}

impl Default for ScaleConfig {
    fn default() -> Self {
        Self {
            scale_factor: DEFAULT_SCALE_FACTOR,
            upscale_algorithm: ScalingAlgorithm::Nearest,
            downscale_algorithm: ScalingAlgorithm::Linear,
        }
    }
}

impl ScaleConfig {
    /// Whether the factor is the identity sentinel.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.scale_factor == 1.0
    }

    /// Algorithm that applies to the configured factor.
    #[must_use]
    pub fn algorithm(&self) -> ScalingAlgorithm {
        if self.scale_factor > 1.0 {
            self.upscale_algorithm
        } else {
            self.downscale_algorithm
        }
    }
}

/// Whether `factor` is usable as a scale factor.
#[must_use]
pub fn is_valid_scale_factor(factor: f64) -> bool {
    factor.is_finite() && factor > 0.0
}

/// Resolution in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

/// Options for the headless host, merged from the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    pub window: Resolution,
    pub resize_to: Option<Resolution>,
    pub frames: u32,
    pub output: Option<String>,
    pub config_file: Option<String>,
    pub log_level: i32,
    pub scale_factor: Option<f64>,
    pub upscale_algorithm: Option<ScalingAlgorithm>,
    pub downscale_algorithm: Option<ScalingAlgorithm>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            window: Resolution {
                width: 854,
                height: 480,
            },
            resize_to: None,
            frames: 1,
            output: None,
            config_file: None,
            log_level: 4,
            scale_factor: None,
            upscale_algorithm: None,
            downscale_algorithm: None,
        }
    }
}

impl Options {
    /// Apply command line overrides on top of a loaded configuration.
    #[must_use]
    pub fn apply_to(&self, mut config: ScaleConfig) -> ScaleConfig {
        if let Some(factor) = self.scale_factor {
            config.scale_factor = factor;
        }
        if let Some(alg) = self.upscale_algorithm {
            config.upscale_algorithm = alg;
        }
        if let Some(alg) = self.downscale_algorithm {
            config.downscale_algorithm = alg;
        }
        config
    }
}

/// Parse a resolution string in the format "WIDTHxHEIGHT"
pub fn parse_resolution(s: &str) -> Result<Resolution> {
    let parts: Vec<&str> = s.split('x').collect();
    if parts.len() != 2 {
        anyhow::bail!("Resolution must be in WIDTHxHEIGHT format");
    }

    let width: u32 = parts[0].parse().context("Invalid width value")?;
    let height: u32 = parts[1].parse().context("Invalid height value")?;

    if width == 0 || height == 0 {
        anyhow::bail!("Resolution values must be positive");
    }

    Ok(Resolution { width, height })
}

/// Parse a scale factor such as "2", "0.5" or "1.25"
pub fn parse_scale_factor(s: &str) -> Result<f64> {
    let factor: f64 = s.trim().parse().context("Invalid scale factor value")?;
    if !is_valid_scale_factor(factor) {
        anyhow::bail!("Scale factor must be a finite number greater than 0");
    }
    Ok(factor)
}
