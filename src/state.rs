// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::Path;

use crate::error::StateError;

/// Make sure the target directory exists and drop leftovers of interrupted
/// downloads and conversions
///
/// Returns the number of `.partial` and `.partial.m4a` files that were removed.
pub fn prepare_target_dir(target_dir: &Path) -> Result<usize, StateError> {
    if !target_dir.exists() {
        std::fs::create_dir_all(target_dir).map_err(|e| StateError::CreateDirectoryFailed {
            path: target_dir.to_path_buf(),
            source: e,
        })?;
        return Ok(0);
    }

    let entries = std::fs::read_dir(target_dir).map_err(|e| StateError::ReadDirectoryFailed {
        path: target_dir.to_path_buf(),
        source: e,
    })?;

    let mut partial_files_cleaned = 0;
    for entry in entries {
        let entry = entry.map_err(|e| StateError::ReadDirectoryFailed {
            path: target_dir.to_path_buf(),
            source: e,
        })?;

        let path = entry.path();
        let is_partial = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name.ends_with(".partial") || name.ends_with(".partial.m4a"));

        if is_partial && path.is_file() {
            match std::fs::remove_file(&path) {
                Ok(()) => partial_files_cleaned += 1,
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "could not remove partial file"),
            }
        }
    }

    Ok(partial_files_cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn empty_dir_has_nothing_to_clean() {
        let dir = tempdir().unwrap();
        assert_eq!(prepare_target_dir(dir.path()).unwrap(), 0);
    }

    #[test]
    fn creates_nonexistent_dir() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("books").join("nested");

        assert!(!target.exists());
        assert_eq!(prepare_target_dir(&target).unwrap(), 0);
        assert!(target.is_dir());
    }

    #[test]
    fn cleans_partial_files() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("2021-06-01-Book.B01.LC_64_22050_stereo.aax.partial"),
            b"half",
        )
        .unwrap();
        std::fs::write(dir.path().join("other.aaxc.partial"), b"half").unwrap();

        assert_eq!(prepare_target_dir(dir.path()).unwrap(), 2);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn cleans_interrupted_conversions() {
        let dir = tempdir().unwrap();
        let m4a = dir.path().join("2021-06-01-Book.B01.LC_64_22050_stereo.m4a");
        std::fs::write(&m4a, b"audio").unwrap();
        std::fs::write(
            dir.path().join("2022-01-01-Other.B02.LC_64_22050_stereo.partial.m4a"),
            b"trunc",
        )
        .unwrap();

        assert_eq!(prepare_target_dir(dir.path()).unwrap(), 1);
        assert!(m4a.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn keeps_complete_downloads_and_sidecars() {
        let dir = tempdir().unwrap();
        let download = dir.path().join("2021-06-01-Book.B01.LC_64_22050_stereo.aax");
        let sidecar = dir.path().join("2021-06-01-Book.B01.LC_64_22050_stereo.json");
        std::fs::write(&download, b"audio").unwrap();
        std::fs::write(&sidecar, b"{}").unwrap();
        std::fs::write(dir.path().join("stale.aax.partial"), b"x").unwrap();

        assert_eq!(prepare_target_dir(dir.path()).unwrap(), 1);
        assert!(download.exists());
        assert!(sidecar.exists());
    }

    #[test]
    fn target_that_is_a_file_fails() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("not-a-dir");
        std::fs::write(&file, b"x").unwrap();

        assert!(matches!(
            prepare_target_dir(&file),
            Err(StateError::ReadDirectoryFailed { .. })
        ));
    }
}
