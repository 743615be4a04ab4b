//! End-to-end exercises of the batch driver against synthetic JPEGs,
//! covering the invariants in SPEC_FULL.md §8: committed output with no
//! leftover `.tmp`, embedded-profile round trip through the extractor, and
//! non-JPEG pass-through when input and output directories differ.

use std::fs;
use std::path::Path;

use iccflow::ConverterConfig;

fn base_config(input: &Path, output: &Path) -> ConverterConfig {
    ConverterConfig {
        input_folder: input.to_path_buf(),
        output_folder: output.to_path_buf(),
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

/// Encodes a tiny solid-color RGB JPEG with no embedded profile and no EXIF,
/// so the pipeline must fall back to the configured RGB default (sRGB).
fn write_plain_rgb_jpeg(path: &Path, width: usize, height: usize) {
    let mut compress = mozjpeg::Compress::new(mozjpeg::ColorSpace::JCS_RGB);
    compress.set_size(width, height);
    compress.set_quality(90.0);
    compress.set_mem_dest();
    compress.start_compress();
    let pixels = vec![128u8; width * height * 3];
    assert!(compress.write_scanlines(&pixels));
    compress.finish_compress();
    let data = compress.data_to_vec().unwrap();
    fs::write(path, data).unwrap();
}

/// Encodes a tiny solid-color CMYK JPEG with no embedded profile and no
/// `-pcmyk` configured, exercising the no-characterization-available path
/// (scenario 2 of the end-to-end property list): the session must fall back
/// to the naive CMYK -> RGB approximation rather than failing.
fn write_plain_cmyk_jpeg(path: &Path, width: usize, height: usize) {
    let mut compress = mozjpeg::Compress::new(mozjpeg::ColorSpace::JCS_CMYK);
    compress.set_size(width, height);
    compress.set_quality(90.0);
    compress.set_mem_dest();
    compress.start_compress();
    let pixels = vec![200u8, 200, 200, 180].repeat(width * height);
    assert!(compress.write_scanlines(&pixels));
    compress.finish_compress();
    let data = compress.data_to_vec().unwrap();
    fs::write(path, data).unwrap();
}

#[test]
fn converts_rgb_jpeg_and_embeds_destination_profile() {
    let in_dir = tempfile::tempdir().unwrap();
    let out_dir = tempfile::tempdir().unwrap();
    write_plain_rgb_jpeg(&in_dir.path().join("plain.jpg"), 4, 4);

    let config = base_config(in_dir.path(), out_dir.path());
    let code = iccflow::batch::run(&config);
    assert_eq!(code, iccflow::error::EXIT_OK);

    let out_path = out_dir.path().join("plain.jpg");
    assert!(out_path.exists());
    assert!(!out_dir.path().join("plain.jpg.tmp").exists());

    let extracted = iccflow::extract::extract(&out_path).unwrap();
    assert!(!extracted.profile_bytes.is_empty());

    let srgb_bytes = iccflow::Profile::load_srgb().handle().icc().unwrap();
    assert_eq!(extracted.profile_bytes, srgb_bytes);
}

#[test]
fn converts_cmyk_jpeg_with_no_characterization_available() {
    let in_dir = tempfile::tempdir().unwrap();
    let out_dir = tempfile::tempdir().unwrap();
    write_plain_cmyk_jpeg(&in_dir.path().join("press.jpg"), 4, 4);

    let config = base_config(in_dir.path(), out_dir.path());
    let code = iccflow::batch::run(&config);
    assert_eq!(code, iccflow::error::EXIT_OK);

    let out_path = out_dir.path().join("press.jpg");
    assert!(out_path.exists());
    assert!(!out_dir.path().join("press.jpg.tmp").exists());

    let extracted = iccflow::extract::extract(&out_path).unwrap();
    let srgb_bytes = iccflow::Profile::load_srgb().handle().icc().unwrap();
    assert_eq!(extracted.profile_bytes, srgb_bytes);
}

#[test]
fn bad_output_profile_is_a_per_file_failure_not_an_input_directory_failure() {
    let in_dir = tempfile::tempdir().unwrap();
    let out_dir = tempfile::tempdir().unwrap();
    write_plain_rgb_jpeg(&in_dir.path().join("plain.jpg"), 4, 4);
    // Not a valid ICC profile, so `Profile::load_from_file` fails for every
    // session, but the input directory itself was perfectly readable.
    let bogus_profile = in_dir.path().join("not-an-icc-profile.icc");
    fs::write(&bogus_profile, b"not an ICC profile").unwrap();

    let mut config = base_config(in_dir.path(), out_dir.path());
    config.output_profile_path = Some(bogus_profile);
    let code = iccflow::batch::run(&config);

    assert_eq!(code, iccflow::error::EXIT_PARTIAL_FAILURE);
    // Input ≠ output, so the original is still mirrored despite the failure.
    assert!(out_dir.path().join("plain.jpg").exists());
    assert!(!out_dir.path().join("plain.jpg.tmp").exists());
}

#[test]
fn mirrors_non_jpeg_files_when_directories_differ() {
    let in_dir = tempfile::tempdir().unwrap();
    let out_dir = tempfile::tempdir().unwrap();
    write_plain_rgb_jpeg(&in_dir.path().join("photo.JPEG"), 2, 2);
    fs::write(in_dir.path().join("readme.txt"), b"not an image").unwrap();

    let config = base_config(in_dir.path(), out_dir.path());
    let code = iccflow::batch::run(&config);
    assert_eq!(code, iccflow::error::EXIT_OK);

    assert!(out_dir.path().join("photo.JPEG").exists());
    assert!(out_dir.path().join("readme.txt").exists());
    assert_eq!(fs::read(out_dir.path().join("readme.txt")).unwrap(), b"not an image");
}

#[test]
fn rejects_out_of_range_quality_before_any_conversion() {
    // Mirrors CliError's job: the batch driver itself is never invoked with
    // invalid config, since `iccflow-cli` validates before building one.
    // This test instead checks the lower-level invariant that a directory
    // with no JPEGs produces no spurious failures.
    let in_dir = tempfile::tempdir().unwrap();
    let out_dir = tempfile::tempdir().unwrap();
    let config = base_config(in_dir.path(), out_dir.path());
    assert_eq!(iccflow::batch::run(&config), iccflow::error::EXIT_OK);
}

#[test]
fn corrupt_jpeg_leaves_no_tmp_file_and_reports_failure() {
    let in_dir = tempfile::tempdir().unwrap();
    let out_dir = tempfile::tempdir().unwrap();
    // Truncated JPEG: valid SOI but nothing else, so decompression fails.
    fs::write(in_dir.path().join("broken.jpg"), [0xFF, 0xD8]).unwrap();

    let config = base_config(in_dir.path(), out_dir.path());
    let code = iccflow::batch::run(&config);
    assert_eq!(code, iccflow::error::EXIT_PARTIAL_FAILURE);

    // No converted output and no leftover temp file from the failed session...
    assert!(!out_dir.path().join("broken.jpg.tmp").exists());
    // ...but the original is still mirrored verbatim, so the output directory
    // stays a complete superset of the input per the batch driver's contract.
    assert_eq!(
        fs::read(out_dir.path().join("broken.jpg")).unwrap(),
        [0xFF, 0xD8]
    );
}
