//! Synthesized default profiles used when a JPEG supplies neither an
//! embedded ICC profile nor a recognizable EXIF color space, and the
//! operator did not configure an explicit default.
//!
//! The original converter ships a bundled vendor ICC file (FOGRA27) as the
//! CMYK default, loaded from a binary blob. That blob is a measured
//! press-characterization profile (a CMYK→Lab output-class profile) with no
//! closed-form equivalent, and no real vendor file is available to bundle
//! here, so there is no synthesized `Profile` for it: `session::convert`
//! falls back to a direct, non-color-managed CMYK→RGB approximation for
//! that one case instead (see its `naive_cmyk_to_rgb`). Adobe RGB (1998),
//! by contrast, is fully defined by published primaries, white point, and
//! gamma, so it is synthesized here with `lcms2` rather than vendored as a
//! binary blob.

use crate::error::ProfileError;
use crate::profile::Profile;

/// Adobe RGB (1998): the exact primaries and white point published in the
/// Adobe RGB (1998) Color Image Encoding specification, gamma 2.2.
pub fn adobe_rgb() -> Result<Profile, ProfileError> {
    use lcms2::{CIExyY, CIExyYTRIPLE};

    let primaries = CIExyYTRIPLE {
        Red: CIExyY { x: 0.6400, y: 0.3300, Y: 1.0 },
        Green: CIExyY { x: 0.2100, y: 0.7100, Y: 1.0 },
        Blue: CIExyY { x: 0.1500, y: 0.0600, Y: 1.0 },
    };
    let white_point = CIExyY { x: 0.3127, y: 0.3290, Y: 1.0 };

    Profile::load_rgb(white_point, primaries, 2.2)
}
