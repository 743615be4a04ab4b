//! Validated configuration for a conversion run, independent of how the
//! values were gathered (the CLI binary builds one from `clap`-parsed
//! arguments; tests build one directly).

use std::path::PathBuf;

use crate::error::ProfileError;
use crate::profile::Profile;

#[derive(Debug, Clone)]
pub struct ConverterConfig {
    pub input_folder: PathBuf,
    pub output_folder: PathBuf,
    pub output_profile_path: Option<PathBuf>,
    pub default_rgb_profile_path: Option<PathBuf>,
    pub default_cmyk_profile_path: Option<PathBuf>,
    pub default_gray_profile_path: Option<PathBuf>,
    pub rendering_intent: u8,
    pub jpeg_quality: u8,
    pub black_point_compensation: bool,
    pub optimize: bool,
    pub verbose: bool,
}

impl ConverterConfig {
    /// Resolves the output (destination) profile: the configured path if
    /// any, otherwise sRGB.
    pub fn output_profile(&self) -> Result<Profile, ProfileError> {
        match &self.output_profile_path {
            Some(path) => Profile::load_from_file(path)?
                .ok_or(ProfileError::Lcms("output profile file contained no usable profile".into())),
            None => Ok(Profile::load_srgb()),
        }
    }

    pub fn default_rgb_profile(&self) -> Result<Profile, ProfileError> {
        match &self.default_rgb_profile_path {
            Some(path) => Profile::load_from_file(path)?
                .ok_or(ProfileError::Lcms("default RGB profile file contained no usable profile".into())),
            None => Ok(Profile::load_srgb()),
        }
    }

    /// Resolves the configured default CMYK profile, or `None` if the
    /// operator did not configure one (in which case the session falls back
    /// to a non-color-managed approximation rather than a synthesized
    /// profile — see `default_profiles`).
    pub fn default_cmyk_profile(&self) -> Result<Option<Profile>, ProfileError> {
        match &self.default_cmyk_profile_path {
            Some(path) => {
                let profile = Profile::load_from_file(path)?
                    .ok_or(ProfileError::Lcms("default CMYK profile file contained no usable profile".into()))?;
                Ok(Some(profile))
            }
            None => Ok(None),
        }
    }

    pub fn default_gray_profile(&self) -> Result<Profile, ProfileError> {
        match &self.default_gray_profile_path {
            Some(path) => Profile::load_from_file(path)?
                .ok_or(ProfileError::Lcms("default gray profile file contained no usable profile".into())),
            None => Profile::load_gray(2.2),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> ConverterConfig {
        ConverterConfig {
            input_folder: PathBuf::from("in"),
            output_folder: PathBuf::from("out"),
            output_profile_path: None,
            default_rgb_profile_path: None,
            default_cmyk_profile_path: None,
            default_gray_profile_path: None,
            rendering_intent: 1,
            jpeg_quality: 85,
            black_point_compensation: true,
            optimize: true,
            verbose: false,
        }
    }

    #[test]
    fn defaults_resolve_without_configured_paths() {
        let config = base_config();
        assert_eq!(config.output_profile().unwrap().num_channels().unwrap(), 3);
        assert_eq!(config.default_rgb_profile().unwrap().num_channels().unwrap(), 3);
        assert_eq!(config.default_gray_profile().unwrap().num_channels().unwrap(), 1);
        assert!(config.default_cmyk_profile().unwrap().is_none());
    }
}
