use std::path::{Path, PathBuf};

use common::storage::types::session::SessionId;
use tracing::{info, warn};

/// Collects every regular file under `root`, depth-first. Unreadable
/// directories are logged and skipped so one bad entry never sinks a scan.
pub fn walk_files(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(path = %dir.display(), error = %err, "failed to read directory during scan");
                continue;
            }
        };
        for entry in entries {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(err) => {
                    warn!(path = %dir.display(), error = %err, "failed to read directory entry");
                    continue;
                }
            };
            if path.is_dir() {
                stack.push(path);
            } else if path.is_file() {
                files.push(path);
            }
        }
    }

    files
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(extension))
        .unwrap_or(false)
}

/// Moves every file under `extract_root` with the given extension
/// (case-insensitive) into `dest_root/<session>/`.
///
/// Nested directory structure is flattened; name collisions resolve by
/// overwrite, last writer wins. Individual move failures are logged and
/// skipped. Returns the number of files moved.
pub fn route_files_by_extension(
    extract_root: &Path,
    session: &SessionId,
    extension: &str,
    dest_root: &Path,
) -> usize {
    let dest_base = dest_root.join(session.as_str());
    if let Err(err) = std::fs::create_dir_all(&dest_base) {
        warn!(path = %dest_base.display(), error = %err, "failed to create routing destination");
        return 0;
    }

    let mut moved = 0usize;
    for file in walk_files(extract_root) {
        if !has_extension(&file, extension) {
            continue;
        }
        let Some(file_name) = file.file_name() else {
            continue;
        };
        let dest = dest_base.join(file_name);

        if dest.exists() {
            if let Err(err) = std::fs::remove_file(&dest) {
                warn!(path = %dest.display(), error = %err, "failed to replace routed file");
                continue;
            }
        }
        if let Err(err) = move_file(&file, &dest) {
            warn!(
                from = %file.display(),
                to = %dest.display(),
                error = %err,
                "failed to route file"
            );
            continue;
        }
        moved = moved.saturating_add(1);
    }

    info!(
        extension,
        moved,
        dest = %dest_base.display(),
        "routed files by extension"
    );
    moved
}

/// Rename with a copy-and-delete fallback for cross-device destinations.
fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    match std::fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(_) => {
            std::fs::copy(from, to)?;
            std::fs::remove_file(from)
        }
    }
}

/// Locates the required payload file by case-insensitive name match.
///
/// The first hit in traversal order wins; additional matches are logged. No
/// disambiguation beyond that is attempted.
pub fn find_payload(extract_root: &Path, payload_name: &str) -> Option<PathBuf> {
    let matches: Vec<PathBuf> = walk_files(extract_root)
        .into_iter()
        .filter(|file| {
            file.file_name()
                .map(|name| name.to_string_lossy().eq_ignore_ascii_case(payload_name))
                .unwrap_or(false)
        })
        .collect();

    if matches.len() > 1 {
        warn!(
            payload_name,
            count = matches.len(),
            using = %matches[0].display(),
            "multiple payload files found, using first"
        );
    }

    match matches.into_iter().next() {
        Some(found) => {
            info!(path = %found.display(), "payload located");
            Some(found)
        }
        None => {
            warn!(payload_name, root = %extract_root.display(), "no payload found in extracted archive");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path, contents: &str) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("mkdir");
        }
        std::fs::write(path, contents).expect("write");
    }

    fn session() -> SessionId {
        SessionId::from_folder_name("20250101_upload1")
    }

    #[test]
    fn routing_flattens_and_counts() {
        let dir = tempfile::tempdir().expect("tempdir");
        let extract = dir.path().join("extracted");
        touch(&extract.join("server.log"), "a");
        touch(&extract.join("nested/deeper/agent.LOG"), "b");
        touch(&extract.join("nested/app.properties"), "c");

        let dest_root = dir.path().join("server_logs");
        let moved = route_files_by_extension(&extract, &session(), "log", &dest_root);
        assert_eq!(moved, 2);

        let dest = dest_root.join("20250101_upload1");
        assert!(dest.join("server.log").is_file());
        assert!(dest.join("agent.LOG").is_file());
        // The properties file stays behind for the second routing pass.
        assert!(extract.join("nested/app.properties").is_file());
        assert!(!extract.join("server.log").exists());
    }

    #[test]
    fn collisions_overwrite_last_writer_wins() {
        let dir = tempfile::tempdir().expect("tempdir");
        let extract = dir.path().join("extracted");
        touch(&extract.join("a/server.log"), "first");
        touch(&extract.join("b/server.log"), "second");

        let dest_root = dir.path().join("server_logs");
        let moved = route_files_by_extension(&extract, &session(), "log", &dest_root);
        assert_eq!(moved, 2);

        let survivors: Vec<_> =
            std::fs::read_dir(dest_root.join("20250101_upload1"))
                .expect("read_dir")
                .collect();
        assert_eq!(survivors.len(), 1);
    }

    #[test]
    fn payload_lookup_is_case_insensitive_first_match() {
        let dir = tempfile::tempdir().expect("tempdir");
        let extract = dir.path().join("extracted");
        touch(&extract.join("bundle/jmxdata.GZ"), "payload");
        touch(&extract.join("readme.txt"), "no");

        let found = find_payload(&extract, "JMXData.gz").expect("payload");
        assert_eq!(found.file_name().map(|n| n.to_string_lossy().to_string()),
            Some("jmxdata.GZ".to_string()));
    }

    #[test]
    fn missing_payload_is_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let extract = dir.path().join("extracted");
        touch(&extract.join("only.log"), "x");
        assert!(find_payload(&extract, "JMXData.gz").is_none());
    }
}
