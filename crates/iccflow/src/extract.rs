//! Byte-level JPEG metadata extraction: reassembling a chunked embedded ICC
//! profile and reading the EXIF-declared color space, including the Adobe
//! RGB white-point/primaries heuristic.
//!
//! This is a purpose-built marker walk, not a delegation to the JPEG codec's
//! own marker-saving machinery: the chunk-reassembly order (file-encounter
//! order, not declared chunk index, see module-level note on `reassemble`)
//! and the Adobe RGB heuristic are specific, narrow behaviors that must be
//! reproduced exactly rather than approximated.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use crate::error::ExtractError;

const ICC_SIGNATURE: &[u8; 12] = b"ICC_PROFILE\0";
const EXIF_SIGNATURE: &[u8; 6] = b"Exif\0\0";
const MAX_ICC_CHUNK_PAYLOAD: usize = 65517;

const ADOBE_RGB_RATIONALS: [u32; 16] = [
    313, 1000, 329, 1000, // white point x, y
    64, 100, 33, 100, // red x, y
    21, 100, 71, 100, // green x, y
    15, 100, 6, 100, // blue x, y
];

const TAG_EXIF_IFD: u16 = 0x8769;
const TAG_WHITE_POINT: u16 = 0x013E;
const TAG_PRIMARY_CHROMATICITIES: u16 = 0x013F;
const TAG_COLOR_SPACE: u16 = 0xA001;

/// The EXIF-declared color space of a JPEG, after the Adobe RGB heuristic
/// has been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExifColorSpace {
    #[default]
    NotFound,
    Srgb,
    AdobeRgb,
    /// Declared "uncalibrated" (0xFFFF) and the Adobe RGB heuristic did not
    /// match; never produced as a final result to callers outside this
    /// module other than as a transient intermediate value.
    Uncalibrated,
}

/// Result of scanning one JPEG file for embedded color metadata.
#[derive(Debug, Clone, Default)]
pub struct ExtractionResult {
    /// The reassembled embedded ICC profile, or empty if none was found.
    pub profile_bytes: Vec<u8>,
    pub exif_color_space: ExifColorSpace,
}

impl ExtractionResult {
    pub fn not_found() -> Self {
        Self::default()
    }
}

/// Scans `path` for an embedded ICC profile and EXIF color space. Any I/O
/// failure, truncated read, or malformed marker degrades to
/// `ExtractionResult::not_found()` rather than propagating — a single file
/// that can't be parsed as expected must not abort the batch; the caller
/// simply falls back to a default profile.
pub fn extract(path: &Path) -> Result<ExtractionResult, ExtractError> {
    scan(path).or_else(|_| Ok(ExtractionResult::not_found()))
}

fn scan(path: &Path) -> Result<ExtractionResult, ExtractError> {
    let mut f = File::open(path)?;

    let mut soi = [0u8; 2];
    f.read_exact(&mut soi)?;
    if soi != [0xFF, 0xD8] {
        return Err(ExtractError::NotAJpeg);
    }

    let mut icc_chunks: Vec<(u8, u8, Vec<u8>)> = Vec::new();
    let mut exif_color_space = ExifColorSpace::NotFound;

    loop {
        let mut marker_byte = [0u8; 1];
        if f.read_exact(&mut marker_byte).is_err() {
            break;
        }
        if marker_byte[0] != 0xFF {
            return Err(ExtractError::Malformed);
        }

        let mut kind = [0u8; 1];
        f.read_exact(&mut kind)?;
        if kind[0] == 0xFF {
            // Padding byte between markers; re-read the marker kind.
            continue;
        }

        if !(0xE0..=0xEF).contains(&kind[0]) {
            // Any marker outside the APP range ends the scan, matching the
            // original's behavior of stopping rather than erroring.
            break;
        }

        let segment_start = f.stream_position()?;
        let mut len_bytes = [0u8; 2];
        f.read_exact(&mut len_bytes)?;
        let segment_length = u16::from_be_bytes(len_bytes) as u64;
        if segment_length < 2 {
            return Err(ExtractError::Malformed);
        }
        let body_len = segment_length - 2;

        if kind[0] == 0xE1 {
            if let Some(cs) = read_exif_app1(&mut f, body_len)? {
                exif_color_space = cs;
            }
        } else if kind[0] == 0xE2 {
            read_icc_app2(&mut f, body_len, &mut icc_chunks)?;
        }

        f.seek(SeekFrom::Start(segment_start + segment_length))?;
    }

    Ok(ExtractionResult {
        profile_bytes: reassemble(icc_chunks),
        exif_color_space,
    })
}

/// Concatenates ICC chunks in the order they were *encountered in the
/// file*, not sorted by their self-declared chunk index. This matches
/// observed real-world behavior exactly; a stricter sort-by-index variant
/// is a one-line change (`chunks.sort_by_key(|(index, _, _)| *index)`)
/// should that ever be wanted.
fn reassemble(chunks: Vec<(u8, u8, Vec<u8>)>) -> Vec<u8> {
    let mut out = Vec::new();
    for (_index, _count, data) in chunks {
        out.extend_from_slice(&data);
    }
    out
}

fn read_icc_app2(
    f: &mut File,
    body_len: u64,
    chunks: &mut Vec<(u8, u8, Vec<u8>)>,
) -> Result<(), ExtractError> {
    if body_len < ICC_SIGNATURE.len() as u64 + 2 {
        return Ok(());
    }
    let mut sig = [0u8; 12];
    f.read_exact(&mut sig)?;
    if &sig != ICC_SIGNATURE {
        return Ok(());
    }
    let mut header = [0u8; 2];
    f.read_exact(&mut header)?;
    let chunk_index = header[0];
    let chunk_count = header[1];

    let payload_len = body_len - ICC_SIGNATURE.len() as u64 - 2;
    let mut payload = vec![0u8; payload_len as usize];
    f.read_exact(&mut payload)?;

    chunks.push((chunk_index, chunk_count, payload));
    Ok(())
}

fn read_exif_app1(f: &mut File, body_len: u64) -> Result<Option<ExifColorSpace>, ExtractError> {
    if body_len < EXIF_SIGNATURE.len() as u64 + 8 {
        return Ok(None);
    }
    let mut sig = [0u8; 6];
    f.read_exact(&mut sig)?;
    if &sig != EXIF_SIGNATURE {
        return Ok(None);
    }

    let tiff_header_pos = f.stream_position()?;
    let mut tiff_header = [0u8; 8];
    f.read_exact(&mut tiff_header)?;

    let little_endian = match tiff_header[0] {
        0x49 => true,
        0x4D => false,
        _ => return Ok(None),
    };
    let ifd0_offset = read_u32(&tiff_header[4..8], little_endian);

    f.seek(SeekFrom::Start(tiff_header_pos + ifd0_offset as u64))?;

    let mut exif_ifd_offset: Option<u32> = None;
    let mut white_point_offset: Option<u32> = None;
    let mut primaries_offset: Option<u32> = None;

    read_ifd(f, little_endian, |tag, value_offset| {
        match tag {
            TAG_EXIF_IFD => exif_ifd_offset = Some(value_offset),
            TAG_WHITE_POINT => white_point_offset = Some(value_offset),
            TAG_PRIMARY_CHROMATICITIES => primaries_offset = Some(value_offset),
            _ => {}
        }
        exif_ifd_offset.is_some() && white_point_offset.is_some() && primaries_offset.is_some()
    })?;

    let Some(exif_ifd_offset) = exif_ifd_offset else {
        return Ok(None);
    };

    f.seek(SeekFrom::Start(tiff_header_pos + exif_ifd_offset as u64))?;

    let mut color_space_code: Option<u16> = None;
    read_ifd(f, little_endian, |tag, value_offset| {
        if tag == TAG_COLOR_SPACE {
            // ColorSpace is a SHORT stored directly in the value/offset
            // field; the low two bytes hold it regardless of endianness
            // because it was written at the natural position for a 2-byte
            // value within the 4-byte field.
            color_space_code = Some(if little_endian {
                (value_offset & 0xFFFF) as u16
            } else {
                (value_offset >> 16) as u16
            });
            true
        } else {
            false
        }
    })?;

    let Some(code) = color_space_code else {
        return Ok(None);
    };

    if code != 0xFFFF {
        return Ok(Some(match code {
            1 => ExifColorSpace::Srgb,
            2 => ExifColorSpace::AdobeRgb,
            _ => ExifColorSpace::Uncalibrated,
        }));
    }

    // Uncalibrated: apply the Adobe RGB heuristic if both tags were found.
    if let (Some(wp_off), Some(pr_off)) = (white_point_offset, primaries_offset) {
        if adobe_rgb_heuristic_matches(f, tiff_header_pos, wp_off, pr_off, little_endian)? {
            return Ok(Some(ExifColorSpace::AdobeRgb));
        }
    }
    Ok(Some(ExifColorSpace::Uncalibrated))
}

/// Reads IFD entries one at a time, calling `visit(tag, value_offset_raw)`
/// for each; `visit` returns `true` to stop early once everything the
/// caller needs has been found, mirroring the original's early-exit IFD0
/// walk.
fn read_ifd(
    f: &mut File,
    little_endian: bool,
    mut visit: impl FnMut(u16, u32) -> bool,
) -> Result<(), ExtractError> {
    let mut count_bytes = [0u8; 2];
    f.read_exact(&mut count_bytes)?;
    let entry_count = read_u16(&count_bytes, little_endian);

    for _ in 0..entry_count {
        let mut entry = [0u8; 12];
        f.read_exact(&mut entry)?;
        let tag = read_u16(&entry[0..2], little_endian);
        let value_offset = read_u32(&entry[8..12], little_endian);
        if visit(tag, value_offset) {
            break;
        }
    }
    Ok(())
}

/// Reads the raw numerator/denominator longs of WhitePoint (2 rationals, 4
/// longs) and PrimaryChromaticities (6 rationals, 12 longs) and compares
/// the 16-long sequence against the Adobe RGB constant. The rationals are
/// compared as raw integers, never divided.
fn adobe_rgb_heuristic_matches(
    f: &mut File,
    tiff_header_pos: u64,
    white_point_offset: u32,
    primaries_offset: u32,
    little_endian: bool,
) -> Result<bool, ExtractError> {
    let mut values = Vec::with_capacity(16);

    f.seek(SeekFrom::Start(tiff_header_pos + white_point_offset as u64))?;
    for _ in 0..4 {
        values.push(read_u32_from(f, little_endian)?);
    }

    f.seek(SeekFrom::Start(tiff_header_pos + primaries_offset as u64))?;
    for _ in 0..12 {
        values.push(read_u32_from(f, little_endian)?);
    }

    Ok(values == ADOBE_RGB_RATIONALS)
}

fn read_u32_from(f: &mut File, little_endian: bool) -> Result<u32, ExtractError> {
    let mut buf = [0u8; 4];
    f.read_exact(&mut buf)?;
    Ok(read_u32(&buf, little_endian))
}

fn read_u16(buf: &[u8], little_endian: bool) -> u16 {
    if little_endian {
        u16::from_le_bytes([buf[0], buf[1]])
    } else {
        u16::from_be_bytes([buf[0], buf[1]])
    }
}

fn read_u32(buf: &[u8], little_endian: bool) -> u32 {
    if little_endian {
        u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]])
    } else {
        u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]])
    }
}
