// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Source image discovery.

use std::path::{Path, PathBuf};

use pagewerk_core::error::Result;
use pagewerk_core::types::ImageKind;

/// Supported images directly inside `dir`, sorted by file name.
///
/// Subdirectories and files with other extensions are skipped.
pub fn collect(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut images = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && ImageKind::from_path(&path).is_some() {
            images.push(path);
        }
    }
    images.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_supported_images_in_name_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        for name in ["b.JPG", "a.png", "notes.txt", "c.tiff", "d.gif", "e.bmp"] {
            std::fs::write(dir.path().join(name), b"x").expect("write");
        }
        std::fs::create_dir(dir.path().join("f.png")).expect("subdir");

        let names: Vec<String> = collect(dir.path())
            .expect("collect")
            .iter()
            .filter_map(|path| path.file_name()?.to_str().map(str::to_string))
            .collect();
        assert_eq!(names, ["a.png", "b.JPG", "c.tiff", "d.gif", "e.bmp"]);
    }

    #[test]
    fn missing_directory_is_an_error() {
        assert!(collect(Path::new("/nonexistent/pagewerk-images")).is_err());
    }
}
