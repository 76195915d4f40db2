use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::UploadedFile;
use crate::error::{CoursemateError, Result};

/// Discover supported course files under `root`, sorted by path.
///
/// **Supported extensions** (case-insensitive): `.pdf`, `.png`, `.jpg`,
/// `.jpeg`, `.txt`, `.md`. Everything else is skipped.
pub fn discover_files(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(CoursemateError::InvalidInput(format!(
            "Not a directory: {}",
            root.display()
        )));
    }

    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();

        if !path.is_file() {
            continue;
        }

        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_lowercase();

        if !matches!(
            extension.as_str(),
            "pdf" | "png" | "jpg" | "jpeg" | "txt" | "md"
        ) {
            continue;
        }

        files.push(path.to_path_buf());
    }

    files.sort();
    log::info!("Discovered {} files in {}", files.len(), root.display());
    Ok(files)
}

/// Read every supported file under `root` as an upload batch named by file name
pub fn load_directory(root: &Path) -> Result<Vec<UploadedFile>> {
    discover_files(root)?
        .into_iter()
        .map(|path| -> Result<UploadedFile> {
            let bytes = std::fs::read(&path)?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| path.display().to_string());
            Ok(UploadedFile::new(name, bytes))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_discover_files() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::create_dir_all(root.join("week1/scans")).unwrap();
        fs::write(root.join("syllabus.PDF"), b"%PDF-1.4").unwrap();
        fs::write(root.join("notes.txt"), "plain text note").unwrap();
        fs::write(root.join("week1/summary.md"), "# Week 1").unwrap();
        fs::write(root.join("week1/scans/board.jpg"), b"\xFF\xD8\xFF").unwrap();
        fs::write(root.join("data.json"), "{}").unwrap();

        let files = discover_files(root).unwrap();

        assert_eq!(files.len(), 4);
        assert!(files.iter().any(|f| f.ends_with("syllabus.PDF")));
        assert!(files.iter().any(|f| f.ends_with("board.jpg")));
        assert!(!files.iter().any(|f| f.ends_with("data.json")));
    }

    #[test]
    fn test_load_directory_names_by_file_name() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("nested")).unwrap();
        fs::write(temp_dir.path().join("nested/a.txt"), "alpha").unwrap();

        let uploads = load_directory(temp_dir.path()).unwrap();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].name, "a.txt");
        assert_eq!(uploads[0].bytes, b"alpha");
    }

    #[test]
    fn test_missing_directory() {
        let err = discover_files(Path::new("/nonexistent/coursemate/dir")).unwrap_err();
        assert!(matches!(err, CoursemateError::InvalidInput(_)));
    }
}
