use crate::config::{parse_resolution, parse_scale_factor, Options};
use crate::graphics::ScalingAlgorithm;
use anyhow::{Context, Result};
use clap::Parser;

/// Headless driver for the resolution scaler
#[derive(Parser, Debug, Default)]
#[command(name = "rescontrol")]
#[command(version = "0.3.0")]
#[command(about = "Render frames through the resolution scaler and save the result", long_about = None)]
pub struct Cli {
    /// Window size (e.g., 854x480)
    #[arg(long, value_name = "WIDTHxHEIGHT")]
    pub size: Option<String>,

    /// Scale factor for the world pass (e.g., 0.5, 2)
    #[arg(short, long, value_name = "FACTOR")]
    pub scale: Option<String>,

    /// Algorithm used when the factor is above 1 (nearest, linear)
    #[arg(long, value_name = "ALGORITHM")]
    pub upscale: Option<String>,

    /// Algorithm used when the factor is 1 or below (nearest, linear)
    #[arg(long, value_name = "ALGORITHM")]
    pub downscale: Option<String>,

    /// Number of frames to render
    #[arg(short, long, value_name = "COUNT")]
    pub frames: Option<u32>,

    /// Resize the window to this size halfway through the run
    #[arg(long = "resize-to", value_name = "WIDTHxHEIGHT")]
    pub resize_to: Option<String>,

    /// Write the final output frame to this PNG file
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<String>,

    /// Property file to load and save the scaling configuration
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<String>,

    /// Log verbosity (0 = nothing .. 6 = all)
    #[arg(short, long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<i32>,
}

impl Cli {
    /// Merge CLI arguments into the options struct
    pub fn merge_into_options(&self, mut opts: Options) -> Result<Options> {
        if let Some(ref size) = self.size {
            opts.window = parse_resolution(size).context("Invalid window size")?;
        }

        if let Some(ref scale) = self.scale {
            opts.scale_factor = Some(parse_scale_factor(scale)?);
        }

        if let Some(ref alg) = self.upscale {
            opts.upscale_algorithm = Some(Self::parse_algorithm(alg)?);
        }

        if let Some(ref alg) = self.downscale {
            opts.downscale_algorithm = Some(Self::parse_algorithm(alg)?);
        }

        if let Some(frames) = self.frames {
            if frames == 0 {
                anyhow::bail!("Frame count must be at least 1");
            }
            opts.frames = frames;
        }

        if let Some(ref size) = self.resize_to {
            opts.resize_to = Some(parse_resolution(size).context("Invalid resize target")?);
        }

        if let Some(ref output) = self.output {
            opts.output = Some(output.clone());
        }

        if let Some(ref config) = self.config {
            opts.config_file = Some(config.clone());
        }

        if let Some(level) = self.log_level {
            opts.log_level = level;
        }

        Ok(opts)
    }

    fn parse_algorithm(s: &str) -> Result<ScalingAlgorithm> {
        s.parse::<ScalingAlgorithm>()
            .with_context(|| format!("Invalid scaling algorithm: {}. Valid options: nearest, linear", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Resolution;

    #[test]
    fn test_parse_algorithm() {
        assert_eq!(
            Cli::parse_algorithm("nearest").unwrap(),
            ScalingAlgorithm::Nearest
        );
        assert_eq!(
            Cli::parse_algorithm("LINEAR").unwrap(),
            ScalingAlgorithm::Linear
        );
        assert!(Cli::parse_algorithm("bicubic").is_err());
    }

    #[test]
    fn test_merge_basic_options() {
        let cli = Cli {
            size: Some("800x600".to_string()),
            scale: Some("0.5".to_string()),
            frames: Some(3),
            ..Default::default()
        };

        let opts = cli.merge_into_options(Options::default()).unwrap();
        assert_eq!(
            opts.window,
            Resolution {
                width: 800,
                height: 600
            }
        );
        assert_eq!(opts.scale_factor, Some(0.5));
        assert_eq!(opts.frames, 3);
        assert_eq!(opts.upscale_algorithm, None);
    }

    #[test]
    fn test_merge_algorithms_and_paths() {
        let cli = Cli {
            upscale: Some("linear".to_string()),
            downscale: Some("nearest".to_string()),
            resize_to: Some("1280x720".to_string()),
            output: Some("out.png".to_string()),
            config: Some("rc.properties".to_string()),
            log_level: Some(5),
            ..Default::default()
        };

        let opts = cli.merge_into_options(Options::default()).unwrap();
        assert_eq!(opts.upscale_algorithm, Some(ScalingAlgorithm::Linear));
        assert_eq!(opts.downscale_algorithm, Some(ScalingAlgorithm::Nearest));
        assert_eq!(
            opts.resize_to,
            Some(Resolution {
                width: 1280,
                height: 720
            })
        );
        assert_eq!(opts.output.as_deref(), Some("out.png"));
        assert_eq!(opts.config_file.as_deref(), Some("rc.properties"));
        assert_eq!(opts.log_level, 5);
    }

    #[test]
    fn test_invalid_size() {
        let cli = Cli {
            size: Some("invalid".to_string()),
            ..Default::default()
        };
        assert!(cli.merge_into_options(Options::default()).is_err());
    }

    #[test]
    fn test_invalid_scale_and_frames() {
        let cli = Cli {
            scale: Some("0".to_string()),
            ..Default::default()
        };
        assert!(cli.merge_into_options(Options::default()).is_err());

        let cli = Cli {
            frames: Some(0),
            ..Default::default()
        };
        assert!(cli.merge_into_options(Options::default()).is_err());
    }

    #[test]
    fn test_parse_from_args() {
        let cli = Cli::parse_from([
            "rescontrol",
            "--size",
            "640x360",
            "--scale",
            "2",
            "--upscale",
            "linear",
            "--log-level",
            "2",
        ]);
        let opts = cli.merge_into_options(Options::default()).unwrap();
        assert_eq!(opts.window.width, 640);
        assert_eq!(opts.scale_factor, Some(2.0));
        assert_eq!(opts.log_level, 2);
    }
}
