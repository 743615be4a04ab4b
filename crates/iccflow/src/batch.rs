//! Directory walk, per-file dispatch, and exit-code aggregation.

use std::path::Path;

use log::error;

use crate::config::ConverterConfig;
use crate::error::{EXIT_INPUT_INACCESSIBLE, EXIT_OK, EXIT_OUTPUT_UNCREATABLE, EXIT_PARTIAL_FAILURE};

/// Runs a full batch conversion per `config`, returning the process exit
/// code. A per-file failure does not abort the run: the driver logs one
/// diagnostic line, mirrors the original file to the output directory (if
/// input and output differ), and continues with the next file. This
/// includes a failure to resolve the output profile, which `session::convert`
/// resolves per file rather than once for the whole run, so a bad output
/// profile path is a per-file failure (exit 3), not an input-directory
/// failure (exit 2).
pub fn run(config: &ConverterConfig) -> i32 {
    if std::fs::create_dir_all(&config.output_folder).is_err() {
        error!("could not create output folder: {}", config.output_folder.display());
        return EXIT_OUTPUT_UNCREATABLE;
    }

    let entries = match std::fs::read_dir(&config.input_folder) {
        Ok(entries) => entries,
        Err(e) => {
            error!("could not open input folder {}: {}", config.input_folder.display(), e);
            return EXIT_INPUT_INACCESSIBLE;
        }
    };

    let mirror = config.input_folder != config.output_folder;
    let mut any_failed = false;

    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else { continue };
        if !file_type.is_file() {
            continue;
        }

        if is_jpeg(&path) {
            if let Err(e) = crate::session::convert(&path, &config.output_folder, config) {
                error!("failed to convert {}: {}", path.display(), e);
                any_failed = true;
                if mirror {
                    mirror_file(&path, &config.output_folder);
                }
            }
        } else if mirror {
            mirror_file(&path, &config.output_folder);
        }
    }

    if any_failed { EXIT_PARTIAL_FAILURE } else { EXIT_OK }
}

fn is_jpeg(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("jpg") || e.eq_ignore_ascii_case("jpeg"))
        .unwrap_or(false)
}

fn mirror_file(source: &Path, output_dir: &Path) {
    let Some(name) = source.file_name() else { return };
    let dest = output_dir.join(name);
    if let Err(e) = std::fs::copy(source, &dest) {
        error!("failed to copy {} to {}: {}", source.display(), dest.display(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn mirrors_non_jpeg_files_and_converts_nothing_for_empty_input() {
        let in_dir = tempfile::tempdir().unwrap();
        let out_dir = tempfile::tempdir().unwrap();
        fs::write(in_dir.path().join("notes.txt"), b"hello").unwrap();

        let config = ConverterConfig {
            input_folder: in_dir.path().to_path_buf(),
            output_folder: out_dir.path().to_path_buf(),
            output_profile_path: None,
            default_rgb_profile_path: None,
            default_cmyk_profile_path: None,
            default_gray_profile_path: None,
            rendering_intent: 1,
            jpeg_quality: 85,
            black_point_compensation: true,
            optimize: true,
            verbose: false,
        };

        let code = run(&config);
        assert_eq!(code, EXIT_OK);
        assert!(out_dir.path().join("notes.txt").exists());
    }

    #[test]
    fn reports_exit_code_2_for_missing_input_folder() {
        let out_dir = tempfile::tempdir().unwrap();
        let config = ConverterConfig {
            input_folder: "/nonexistent/does/not/exist".into(),
            output_folder: out_dir.path().to_path_buf(),
            output_profile_path: None,
            default_rgb_profile_path: None,
            default_cmyk_profile_path: None,
            default_gray_profile_path: None,
            rendering_intent: 1,
            jpeg_quality: 85,
            black_point_compensation: true,
            optimize: true,
            verbose: false,
        };
        assert_eq!(run(&config), EXIT_INPUT_INACCESSIBLE);
    }
}
