use std::{collections::HashSet, fs::File, path::Path, path::PathBuf};

use common::error::AppError;
use tracing::{info, warn};
use zip::result::ZipError;

use super::routing::walk_files;

/// Unpacks `archive` into `dest`, creating the destination if absent.
///
/// An invalid container maps to `CorruptArchive`; everything else that goes
/// wrong mid-extraction is an `Extraction` error.
pub fn extract_archive(archive: &Path, dest: &Path) -> Result<(), AppError> {
    std::fs::create_dir_all(dest)?;

    let file = File::open(archive)?;
    let mut zip = zip::ZipArchive::new(file).map_err(corrupt_or_extraction)?;
    zip.extract(dest).map_err(corrupt_or_extraction)?;

    info!(archive = %archive.display(), dest = %dest.display(), "archive extracted");
    Ok(())
}

fn corrupt_or_extraction(err: ZipError) -> AppError {
    match err {
        ZipError::InvalidArchive(_) | ZipError::UnsupportedArchive(_) => {
            AppError::CorruptArchive(err.to_string())
        }
        other => AppError::Extraction(other.to_string()),
    }
}

fn is_zip(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case("zip"))
        .unwrap_or(false)
}

/// Extracts archives nested inside an already-extracted tree.
///
/// Vendor bundles sometimes wrap their payload in secondary containers. Each
/// nested zip is unpacked into a sibling `<stem>_unzipped` directory and then
/// deleted; freshly unpacked content is rescanned on the next pass, up to
/// `max_depth` passes. Failures are per-archive: logged, the file is left in
/// place, and the scan moves on. Returns the number of archives extracted.
pub fn extract_nested_archives(root: &Path, max_depth: u32) -> usize {
    let mut extracted = 0usize;
    let mut failed: HashSet<PathBuf> = HashSet::new();

    for _pass in 0..max_depth {
        let nested: Vec<PathBuf> = walk_files(root)
            .into_iter()
            .filter(|path| is_zip(path) && !failed.contains(path))
            .collect();
        if nested.is_empty() {
            return extracted;
        }

        for archive in nested {
            let stem = archive
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "nested".to_string());
            let target = archive
                .parent()
                .map(|parent| parent.join(format!("{stem}_unzipped")))
                .unwrap_or_else(|| root.join(format!("{stem}_unzipped")));

            info!(archive = %archive.display(), target = %target.display(), "extracting nested archive");
            match extract_archive(&archive, &target) {
                Ok(()) => {
                    if let Err(err) = std::fs::remove_file(&archive) {
                        warn!(path = %archive.display(), error = %err, "failed to remove nested archive after extraction");
                    }
                    extracted = extracted.saturating_add(1);
                }
                Err(err) => {
                    warn!(path = %archive.display(), error = %err, "failed to extract nested archive");
                    failed.insert(archive);
                }
            }
        }
    }

    let leftovers = walk_files(root)
        .into_iter()
        .filter(|path| is_zip(path) && !failed.contains(path))
        .count();
    if leftovers > 0 {
        warn!(
            leftovers,
            max_depth, "nested archives remain beyond recursion depth limit"
        );
    }

    extracted
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    pub(crate) fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
        let file = File::create(path).expect("create zip");
        let mut writer = zip::ZipWriter::new(file);
        for (name, contents) in entries {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .expect("start file");
            writer.write_all(contents).expect("write entry");
        }
        writer.finish().expect("finish zip");
    }

    #[test]
    fn extracts_entries_with_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let archive = dir.path().join("bundle.zip");
        write_zip(
            &archive,
            &[("JMXData.gz", b"gz".as_ref()), ("logs/server.log", b"log")],
        );

        let dest = dir.path().join("extracted");
        extract_archive(&archive, &dest).expect("extract");
        assert!(dest.join("JMXData.gz").is_file());
        assert!(dest.join("logs/server.log").is_file());
    }

    #[test]
    fn garbage_is_a_corrupt_archive() {
        let dir = tempfile::tempdir().expect("tempdir");
        let archive = dir.path().join("bad.zip");
        std::fs::write(&archive, b"definitely not a zip").expect("write");

        let err = extract_archive(&archive, &dir.path().join("out")).expect_err("corrupt");
        assert!(matches!(err, AppError::CorruptArchive(_)), "got {err:?}");
    }

    #[test]
    fn nested_zip_is_unpacked_in_place_and_removed() {
        let dir = tempfile::tempdir().expect("tempdir");

        // extra.zip contains one more log file.
        let inner = dir.path().join("inner.zip");
        write_zip(&inner, &[("extra.log", b"nested log".as_ref())]);
        let inner_bytes = std::fs::read(&inner).expect("read inner");
        std::fs::remove_file(&inner).expect("rm");

        let root = dir.path().join("extracted");
        std::fs::create_dir_all(root.join("sub")).expect("mkdir");
        std::fs::write(root.join("sub/extra.zip"), &inner_bytes).expect("write nested");

        let count = extract_nested_archives(&root, 4);
        assert_eq!(count, 1);
        assert!(root.join("sub/extra_unzipped/extra.log").is_file());
        assert!(!root.join("sub/extra.zip").exists());
    }

    #[test]
    fn broken_nested_zip_is_skipped_not_fatal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path().join("extracted");
        std::fs::create_dir_all(&root).expect("mkdir");
        std::fs::write(root.join("broken.zip"), b"junk").expect("write");

        let count = extract_nested_archives(&root, 4);
        assert_eq!(count, 0);
        // The broken archive stays behind, untouched.
        assert!(root.join("broken.zip").is_file());
    }

    #[test]
    fn recursion_stops_at_depth_limit() {
        let dir = tempfile::tempdir().expect("tempdir");

        // level2.zip inside level1.zip inside the tree, with max_depth 1.
        let level2 = dir.path().join("level2.zip");
        write_zip(&level2, &[("deep.log", b"deep".as_ref())]);
        let level2_bytes = std::fs::read(&level2).expect("read");
        std::fs::remove_file(&level2).expect("rm");

        let level1 = dir.path().join("level1.zip");
        write_zip(&level1, &[("level2.zip", level2_bytes.as_slice())]);
        let level1_bytes = std::fs::read(&level1).expect("read");
        std::fs::remove_file(&level1).expect("rm");

        let root = dir.path().join("extracted");
        std::fs::create_dir_all(&root).expect("mkdir");
        std::fs::write(root.join("level1.zip"), &level1_bytes).expect("write");

        let count = extract_nested_archives(&root, 1);
        assert_eq!(count, 1);
        // The inner archive surfaced but was not unpacked.
        assert!(root.join("level1_unzipped/level2.zip").is_file());
        assert!(!root.join("level1_unzipped/level2_unzipped").exists());
    }
}
