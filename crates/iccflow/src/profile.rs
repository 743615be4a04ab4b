//! Loading, cloning, and introspecting ICC color profiles.

use std::path::Path;

use lcms2::{CIExyY, CIExyYTRIPLE, ColorSpaceSignature, InfoType, Locale, Profile as LcmsProfile, PixelFormat, ToneCurve};
use log::trace;

use crate::error::ProfileError;
use crate::extract::ExifColorSpace;

/// Where a loaded profile's bytes came from. Purely diagnostic, but
/// surfaced to the operator on every conversion so they can tell whether a
/// file supplied its own profile or a default was substituted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileSource {
    /// Extracted from the source JPEG's own APP2 chunks.
    Embedded,
    /// Inferred from the source JPEG's EXIF tags (sRGB or Adobe RGB).
    Exif,
    /// Loaded from a standalone profile file on disk.
    File,
    /// Parsed from an in-memory byte buffer (a bundled default).
    Memory,
    /// Synthesized by the color-management library itself (sRGB, gray gamma).
    Library,
}

/// An ICC color profile plus the provenance of how it was obtained.
///
/// Cloning a `Profile` serializes the underlying handle to memory and
/// re-parses it, since the color-management library's handles have no
/// native copy operation.
pub struct Profile {
    handle: LcmsProfile,
    source: ProfileSource,
    name: String,
}

impl Profile {
    fn from_handle(handle: LcmsProfile, source: ProfileSource) -> Self {
        let name = handle
            .info(InfoType::Description, Locale::none())
            .unwrap_or_default();
        Profile { handle, source, name }
    }

    /// Loads a profile from a path. If the path's extension is `.jpg`/`.jpeg`
    /// (case-insensitive), the profile is resolved from the JPEG's own
    /// metadata (embedded ICC, else EXIF color space); otherwise the path is
    /// opened as a standalone ICC profile file.
    pub fn load_from_file(path: &Path) -> Result<Option<Self>, ProfileError> {
        let is_jpeg = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("jpg") || e.eq_ignore_ascii_case("jpeg"))
            .unwrap_or(false);

        if is_jpeg {
            return Self::load_from_jpeg(path);
        }

        let handle = LcmsProfile::new_file(path).map_err(ProfileError::Io)?;
        trace!("loaded profile from file {}", path.display());
        Ok(Some(Self::from_handle(handle, ProfileSource::File)))
    }

    /// Resolves a profile from a JPEG file's own metadata: an embedded ICC
    /// profile takes priority, then the EXIF-declared color space (sRGB or
    /// the Adobe RGB heuristic), otherwise `None` so the caller can fall
    /// back to a configured default for the detected JPEG color space.
    fn load_from_jpeg(path: &Path) -> Result<Option<Self>, ProfileError> {
        let extraction = crate::extract::extract(path).unwrap_or_default();

        if !extraction.profile_bytes.is_empty() {
            let profile = Self::load_from_memory(&extraction.profile_bytes)?;
            return Ok(Some(Profile {
                source: ProfileSource::Embedded,
                ..profile
            }));
        }

        match extraction.exif_color_space {
            ExifColorSpace::AdobeRgb => {
                let profile = crate::default_profiles::adobe_rgb()?;
                Ok(Some(Profile { source: ProfileSource::Exif, ..profile }))
            }
            ExifColorSpace::Srgb => {
                let profile = Self::load_srgb();
                Ok(Some(Profile { source: ProfileSource::Exif, ..profile }))
            }
            ExifColorSpace::NotFound | ExifColorSpace::Uncalibrated => Ok(None),
        }
    }

    /// Parses a profile from an in-memory ICC byte blob.
    pub fn load_from_memory(bytes: &[u8]) -> Result<Self, ProfileError> {
        let handle = LcmsProfile::new_icc(bytes).map_err(|e| ProfileError::Lcms(e.to_string()))?;
        Ok(Self::from_handle(handle, ProfileSource::Memory))
    }

    /// Synthesizes the standard sRGB profile.
    pub fn load_srgb() -> Self {
        Self::from_handle(LcmsProfile::new_srgb(), ProfileSource::Library)
    }

    /// Synthesizes a D50 gray profile with the given gamma.
    pub fn load_gray(gamma: f64) -> Result<Self, ProfileError> {
        let curve = ToneCurve::new(gamma);
        let white_point = white_point_d50();
        let handle = LcmsProfile::new_gray(&white_point, &curve)
            .map_err(|e| ProfileError::Lcms(e.to_string()))?;
        Ok(Self::from_handle(handle, ProfileSource::Library))
    }

    /// Synthesizes an RGB working-space profile from explicit primaries,
    /// white point, and a single gamma applied to all three channels. Used
    /// by `default_profiles::adobe_rgb` to build the Adobe RGB (1998)
    /// default from its published numbers.
    pub fn load_rgb(
        white_point: CIExyY,
        primaries: CIExyYTRIPLE,
        gamma: f64,
    ) -> Result<Self, ProfileError> {
        let curve = ToneCurve::new(gamma);
        let handle = LcmsProfile::new_rgb(&white_point, &primaries, &[&curve, &curve, &curve])
            .map_err(|e| ProfileError::Lcms(e.to_string()))?;
        Ok(Self::from_handle(handle, ProfileSource::Library))
    }

    pub fn source(&self) -> ProfileSource {
        self.source
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handle(&self) -> &LcmsProfile {
        &self.handle
    }

    /// Number of color channels implied by this profile's color space, or
    /// an error if it is not one of the three channel counts this pipeline
    /// supports (gray, RGB, CMYK).
    pub fn num_channels(&self) -> Result<u32, ProfileError> {
        match self.handle.color_space() {
            ColorSpaceSignature::GrayData => Ok(1),
            ColorSpaceSignature::RgbData => Ok(3),
            ColorSpaceSignature::CmykData => Ok(4),
            other => Err(ProfileError::UnsupportedChannelCount(other as u32)),
        }
    }

    /// Maps this profile's channel count to the `lcms2` pixel format used
    /// to build a `Transform` against it. JPEG stores CMYK data inverted,
    /// hence `CMYK_8_REV` rather than `CMYK_8`.
    pub fn pixel_format(&self) -> Result<PixelFormat, ProfileError> {
        match self.num_channels()? {
            1 => Ok(PixelFormat::GRAY_8),
            3 => Ok(PixelFormat::RGB_8),
            4 => Ok(PixelFormat::CMYK_8_REV),
            n => Err(ProfileError::UnsupportedChannelCount(n)),
        }
    }
}

/// CIE xyY coordinates of the D50 standard illuminant, the ICC PCS white
/// point used by `cmsCreateGrayProfile` in the original converter.
fn white_point_d50() -> CIExyY {
    CIExyY { x: 0.3457, y: 0.3585, Y: 1.0 }
}

impl Clone for Profile {
    fn clone(&self) -> Self {
        let bytes = self.handle.icc().expect("profile handle must be serializable");
        let handle = LcmsProfile::new_icc(&bytes).expect("serialized profile must re-parse");
        Profile {
            handle,
            source: self.source,
            name: self.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn srgb_has_three_channels() {
        let p = Profile::load_srgb();
        assert_eq!(p.num_channels().unwrap(), 3);
        assert_eq!(p.source(), ProfileSource::Library);
    }

    #[test]
    fn gray_profile_has_one_channel() {
        let p = Profile::load_gray(2.2).unwrap();
        assert_eq!(p.num_channels().unwrap(), 1);
    }

    #[test]
    fn clone_produces_independent_handle() {
        let p = Profile::load_srgb();
        let cloned = p.clone();
        assert_eq!(p.name(), cloned.name());
        assert_eq!(cloned.num_channels().unwrap(), 3);
    }

    #[test]
    fn memory_round_trip_preserves_bytes() {
        let p = Profile::load_srgb();
        let bytes = p.handle().icc().unwrap();
        let reloaded = Profile::load_from_memory(&bytes).unwrap();
        assert_eq!(reloaded.handle().icc().unwrap(), bytes);
    }
}
