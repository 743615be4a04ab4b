
mod logging;

use std::path::PathBuf;

use clap::Parser;
use log::error;

use iccflow::error::{CliError, EXIT_BAD_CONFIG};
use iccflow::ConverterConfig;

/// Batch color-space conversion of JPEG images through ICC profiles.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Input folder to read JPEGs (and other files) from.
    #[arg(short = 'i', long = "input")]
    input: String,

    /// Output folder to write converted/copied files to.
    #[arg(short = 'o', long = "output")]
    output: String,

    /// Destination ICC profile to embed (a standalone profile file, or a
    /// JPEG to resolve one from). Defaults to sRGB.
    #[arg(short = 'p', long = "profile")]
    output_profile: Option<String>,

    /// Default input RGB profile, used when a source JPEG supplies neither
    /// an embedded nor an EXIF-inferred profile. Defaults to sRGB.
    #[arg(long = "prgb")]
    default_rgb: Option<String>,

    /// Default input CMYK profile. If unset, a CMYK source with no
    /// embedded/EXIF profile falls back to a non-color-managed CMYK -> RGB
    /// approximation rather than a bundled default.
    #[arg(long = "pcmyk")]
    default_cmyk: Option<String>,

    /// Default input Gray profile. Defaults to a D50 gamma-2.2 gray profile.
    #[arg(long = "pgray")]
    default_gray: Option<String>,

    /// Rendering intent: 0=perceptual, 1=relative colorimetric,
    /// 2=saturation, 3=absolute colorimetric.
    #[arg(short = 'c', long = "intent", default_value_t = 1)]
    intent: i64,

    /// JPEG output quality, 0-100.
    #[arg(short = 'q', long = "quality", default_value_t = 85)]
    quality: i64,

    /// Disable black-point compensation (enabled by default).
    #[arg(long = "nbpc")]
    no_black_point_compensation: bool,

    /// Disable transform optimization (enabled by default).
    #[arg(long = "no")]
    no_optimize: bool,

    /// Print per-file progress percentage while converting.
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

impl Args {
    fn into_config(self) -> Result<ConverterConfig, CliError> {
        if !(0..=3).contains(&self.intent) {
            return Err(CliError::InvalidIntent(self.intent));
        }
        if !(0..=100).contains(&self.quality) {
            return Err(CliError::InvalidQuality(self.quality));
        }

        // Existence of the input folder is not a parse-time concern: an
        // unreadable/missing input folder is the batch driver's own exit-2
        // condition (`batch::run`'s `read_dir` call), not a bad-config exit 1.
        let input_folder = PathBuf::from(strip_trailing_slash(&self.input));

        Ok(ConverterConfig {
            input_folder,
            output_folder: PathBuf::from(strip_trailing_slash(&self.output)),
            output_profile_path: self.output_profile.map(PathBuf::from),
            default_rgb_profile_path: self.default_rgb.map(PathBuf::from),
            default_cmyk_profile_path: self.default_cmyk.map(PathBuf::from),
            default_gray_profile_path: self.default_gray.map(PathBuf::from),
            rendering_intent: self.intent as u8,
            jpeg_quality: self.quality as u8,
            black_point_compensation: !self.no_black_point_compensation,
            optimize: !self.no_optimize,
            verbose: self.verbose,
        })
    }
}

/// Strips a single trailing `/` or `\` left over from shell completion.
fn strip_trailing_slash(path: &str) -> &str {
    path.trim_end_matches(['/', '\\'])
}

fn main() {
    let args = Args::parse();

    logging::LoggingConfig::default().verbose(args.verbose).apply();

    let config = match args.into_config() {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            std::process::exit(EXIT_BAD_CONFIG);
        }
    };

    std::process::exit(iccflow::batch::run(&config));
}
