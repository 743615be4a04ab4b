//! Per-file conversion session: decode, color-transform, embed the
//! destination profile, encode, and commit via temp-file-then-rename.
//!
//! Every handle a session acquires is released on every exit path through
//! `SessionGuard`'s `Drop`, so a codec fault, an unsupported color space,
//! or a successful run all leave the filesystem in a consistent state
//! without duplicating teardown code per branch.
//!
//! The underlying `mozjpeg` crate's safe wrapper decodes and encodes a
//! whole image per call rather than exposing a one-scanline-at-a-time
//! entry point (`read_scanlines`/`write_scanlines` each loop internally
//! until the image is exhausted). The color transform is therefore applied
//! to the decoded buffer in row-chunks rather than truly streamed
//! scanline-by-scanline; this still gives the verbose progress indicator
//! real, incrementally-growing work to report against.

use std::io::Write;
use std::path::{Path, PathBuf};

use lcms2::{Flags, Intent, PixelFormat, Transform};
use log::{info, trace, warn};
use mozjpeg::decompress::Format as DecodedFormat;
use mozjpeg::{ColorSpace as JpegColorSpace, Compress, Decompress, Marker};

use crate::config::ConverterConfig;
use crate::error::SessionError;
use crate::profile::Profile;

const MAX_ICC_CHUNK_PAYLOAD: usize = 65517;
const PROGRESS_CHUNK_ROWS: usize = 64;

/// Converts one JPEG file at `source_path`, writing the result to
/// `<output_dir>/<basename>`. Returns `Ok(())` once the output file has
/// been committed, or an error without leaving any partial output behind.
pub fn convert(source_path: &Path, output_dir: &Path, config: &ConverterConfig) -> Result<(), SessionError> {
    // Resolved per file, matching the source's own design: a bad output
    // profile is a per-file failure (the original is still mirrored by the
    // batch driver), not a reason to abort the whole run.
    let output_profile = config.output_profile()?;

    let basename = source_path.file_name().expect("source_path must name a file");
    let final_path = output_dir.join(basename);
    let tmp_path = {
        let mut name = basename.to_os_string();
        name.push(".tmp");
        output_dir.join(name)
    };

    let guard = SessionGuard { tmp_path: tmp_path.clone(), committed: false };

    let decompress = Decompress::with_markers(&[Marker::APP(1), Marker::APP(2)])
        .from_path(source_path)
        .map_err(|e| SessionError::Codec(e.to_string()))?;

    let (width, height) = decompress.size();

    let (input_pixels, input_channels) = match decompress
        .image()
        .map_err(|e| SessionError::Codec(e.to_string()))?
    {
        DecodedFormat::Gray(d) => (read_flat(d)?, 1usize),
        DecodedFormat::RGB(d) => (read_flat(d)?, 3usize),
        DecodedFormat::CMYK(d) => (read_flat(d)?, 4usize),
    };

    // The decoder's own output format (gray/RGB/CMYK) tells us which
    // default profile category applies; no separate color-space query is
    // needed, and none is relied upon beyond what `Format` already reports.
    let (input_profile, input_format, input_pixels, input_channels) =
        match resolve_input_profile(source_path, input_channels as u32, config)? {
            InputColor::Profiled(profile) => {
                let format = pixel_format_for_channels(input_channels as u32)?;
                (profile, format, input_pixels, input_channels)
            }
            InputColor::NaiveCmyk => {
                warn!(
                    "{}: no CMYK characterization profile configured or found; approximating CMYK -> RGB without color management",
                    source_path.display()
                );
                (Profile::load_srgb(), PixelFormat::RGB_8, naive_cmyk_to_rgb(&input_pixels), 3usize)
            }
        };

    trace!(
        "decoded {} ({}x{}, {} channels)",
        source_path.display(),
        width,
        height,
        input_channels
    );

    let output_channels = output_profile.num_channels()? as usize;
    let output_format = output_profile.pixel_format()?;

    let intent = intent_from_code(config.rendering_intent);
    let mut transform_flags = Flags::empty();
    if config.black_point_compensation {
        transform_flags |= Flags::BLACKPOINT_COMPENSATION;
    }
    if !config.optimize {
        transform_flags |= Flags::NO_OPTIMIZE;
    }

    let transform: Transform<u8, u8> = Transform::new_flags(
        input_profile.handle(),
        input_format,
        output_profile.handle(),
        output_format,
        intent,
        transform_flags,
    )
    .map_err(|e| SessionError::Codec(e.to_string()))?;

    let row_stride_in = width * input_channels;
    let row_stride_out = width * output_channels;
    let mut output_pixels = vec![0u8; height * row_stride_out];

    let mut row = 0;
    while row < height {
        let rows_in_chunk = PROGRESS_CHUNK_ROWS.min(height - row);
        let in_start = row * row_stride_in;
        let in_end = in_start + rows_in_chunk * row_stride_in;
        let out_start = row * row_stride_out;
        let out_end = out_start + rows_in_chunk * row_stride_out;
        transform.transform_pixels(&input_pixels[in_start..in_end], &mut output_pixels[out_start..out_end]);
        row += rows_in_chunk;
        if config.verbose {
            eprint!("\r{}: {:.0}%", source_path.display(), 100.0 * row as f64 / height as f64);
            let _ = std::io::stderr().flush();
        }
    }
    if config.verbose {
        eprintln!();
    }

    let jpeg_color_space = match output_channels {
        1 => JpegColorSpace::JCS_GRAYSCALE,
        3 => JpegColorSpace::JCS_RGB,
        4 => JpegColorSpace::JCS_CMYK,
        n => return Err(SessionError::UnsupportedChannelCount(n as u32)),
    };

    let mut compress = Compress::new(jpeg_color_space);
    compress.set_size(width, height);
    compress.set_quality(config.jpeg_quality as f32);
    compress.set_mem_dest();

    compress.start_compress();
    write_icc_marker(&mut compress, &output_profile)?;
    if !compress.write_scanlines(&output_pixels) {
        return Err(SessionError::Codec("failed to write scanlines".into()));
    }
    compress.finish_compress();

    let encoded = compress
        .data_to_vec()
        .map_err(|_| SessionError::Codec("failed to retrieve compressed JPEG data".into()))?;

    std::fs::write(&tmp_path, &encoded)?;

    let _ = std::fs::remove_file(&final_path);
    std::fs::rename(&tmp_path, &final_path).map_err(SessionError::Rename)?;

    info!(
        "{} -> {} (input profile: {} [{:?}], output profile: {} [{:?}])",
        source_path.display(),
        final_path.display(),
        input_profile.name(),
        input_profile.source(),
        output_profile.name(),
        output_profile.source(),
    );

    guard.commit();
    Ok(())
}

fn read_flat(mut decoded: mozjpeg::decompress::DecompressStarted<'_>) -> Result<Vec<u8>, SessionError> {
    let data = decoded
        .read_scanlines_flat()
        .ok_or_else(|| SessionError::Codec("failed to decode scanlines".into()))?;
    decoded.finish_decompress();
    Ok(data)
}

/// Releases the temp file unless `commit()` was called.
struct SessionGuard {
    tmp_path: PathBuf,
    committed: bool,
}

impl SessionGuard {
    fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if !self.committed {
            let _ = std::fs::remove_file(&self.tmp_path);
        }
    }
}

fn intent_from_code(code: u8) -> Intent {
    match code {
        0 => Intent::Perceptual,
        1 => Intent::RelativeColorimetric,
        2 => Intent::Saturation,
        3 => Intent::AbsoluteColorimetric,
        _ => Intent::RelativeColorimetric,
    }
}

fn pixel_format_for_channels(channels: u32) -> Result<PixelFormat, SessionError> {
    match channels {
        1 => Ok(PixelFormat::GRAY_8),
        3 => Ok(PixelFormat::RGB_8),
        4 => Ok(PixelFormat::CMYK_8_REV),
        n => Err(SessionError::UnsupportedChannelCount(n)),
    }
}

/// Outcome of resolving the source's input color: either a real profile to
/// drive the color-managed transform, or a signal that no CMYK
/// characterization is available and the session must fall back to a
/// direct numeric approximation instead of building a transform at all.
enum InputColor {
    Profiled(Profile),
    NaiveCmyk,
}

/// Resolves the source JPEG's color profile: its own embedded/EXIF profile
/// if present, otherwise the configured default for the decoded channel
/// count (1 = gray, 3 = RGB, 4 = CMYK). For CMYK, no configured default and
/// no per-file profile yields `NaiveCmyk` rather than failing or
/// approximating with a device-link profile (see `default_profiles`).
fn resolve_input_profile(
    source_path: &Path,
    input_channels: u32,
    config: &ConverterConfig,
) -> Result<InputColor, SessionError> {
    if let Some(profile) = Profile::load_from_file(source_path)? {
        return Ok(InputColor::Profiled(profile));
    }

    match input_channels {
        1 => Ok(InputColor::Profiled(config.default_gray_profile()?)),
        4 => match config.default_cmyk_profile()? {
            Some(profile) => Ok(InputColor::Profiled(profile)),
            None => Ok(InputColor::NaiveCmyk),
        },
        3 => Ok(InputColor::Profiled(config.default_rgb_profile()?)),
        n => Err(SessionError::UnsupportedChannelCount(n)),
    }
}

/// Approximates CMYK -> RGB for a JPEG with no real color-managed profile
/// to characterize it, using the common inverted-CMYK formula for
/// Adobe-style CMYK JPEGs: the decoder's raw bytes are already stored
/// inverted (matching `PixelFormat::CMYK_8_REV`'s expectations), so
/// `R = C*K/255`, `G = M*K/255`, `B = Y*K/255` directly on the stored
/// bytes. This is not color-managed; it only avoids hard-failing a CMYK
/// JPEG that carries no characterization data at all.
fn naive_cmyk_to_rgb(cmyk: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(cmyk.len() / 4 * 3);
    for px in cmyk.chunks_exact(4) {
        let (c, m, y, k) = (px[0] as u32, px[1] as u32, px[2] as u32, px[3] as u32);
        rgb.push((c * k / 255) as u8);
        rgb.push((m * k / 255) as u8);
        rgb.push((y * k / 255) as u8);
    }
    rgb
}

fn write_icc_marker(compress: &mut Compress, profile: &Profile) -> Result<(), SessionError> {
    let bytes = profile
        .handle()
        .icc()
        .map_err(|e| SessionError::Codec(e.to_string()))?;

    // A serialized profile is never empty; `bytes.len()` is at least a
    // full ICC header (128 bytes).
    let chunk_count = (bytes.len() - 1) / MAX_ICC_CHUNK_PAYLOAD + 1;

    for (i, chunk) in bytes.chunks(MAX_ICC_CHUNK_PAYLOAD).enumerate() {
        let mut marker = Vec::with_capacity(14 + chunk.len());
        marker.extend_from_slice(b"ICC_PROFILE\0");
        marker.push((i + 1) as u8);
        marker.push(chunk_count as u8);
        marker.extend_from_slice(chunk);
        compress.write_marker(Marker::APP(2), &marker);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_count_boundary_at_65517() {
        let exact = vec![0u8; MAX_ICC_CHUNK_PAYLOAD];
        let chunks: Vec<_> = exact.chunks(MAX_ICC_CHUNK_PAYLOAD).collect();
        assert_eq!(chunks.len(), 1);

        let one_over = vec![0u8; MAX_ICC_CHUNK_PAYLOAD + 1];
        let chunks: Vec<_> = one_over.chunks(MAX_ICC_CHUNK_PAYLOAD).collect();
        assert_eq!(chunks.len(), 2);
    }

    #[test]
    fn intent_codes_map_as_specified() {
        assert!(matches!(intent_from_code(0), Intent::Perceptual));
        assert!(matches!(intent_from_code(1), Intent::RelativeColorimetric));
        assert!(matches!(intent_from_code(2), Intent::Saturation));
        assert!(matches!(intent_from_code(3), Intent::AbsoluteColorimetric));
    }

    #[test]
    fn pixel_format_rejects_unsupported_channel_counts() {
        assert!(pixel_format_for_channels(2).is_err());
        assert!(pixel_format_for_channels(5).is_err());
    }

    #[test]
    fn naive_cmyk_to_rgb_no_ink_is_white() {
        // CMYK_8_REV: 255 = 0% ink on every channel.
        let white = naive_cmyk_to_rgb(&[255, 255, 255, 255]);
        assert_eq!(white, vec![255, 255, 255]);
    }

    #[test]
    fn naive_cmyk_to_rgb_full_black_channel_is_black() {
        // Full black ink (K stored as 0), no C/M/Y ink.
        let black = naive_cmyk_to_rgb(&[255, 255, 255, 0]);
        assert_eq!(black, vec![0, 0, 0]);
    }
}
