use std::path::PathBuf;

use walkdir::WalkDir;

/// Expand directories into their files, hidden entries are skipped
///
/// An empty `extensions` accepts every file found inside a directory.
/// Paths given explicitly are always kept.
pub(crate) fn get_all_files(paths: &[PathBuf], extensions: &[&str]) -> Vec<PathBuf> {
    paths
        .iter()
        .flat_map(move |path| {
            if path.is_dir() {
                WalkDir::new(path)
                    .into_iter()
                    .filter_entry(|e| {
                        e.depth() == 0
                            || e.file_name()
                                .to_str()
                                .map(|s| !s.starts_with('.'))
                                .unwrap_or(false)
                    })
                    .filter_map(Result::ok)
                    .filter(|e| e.path().is_file())
                    .filter(|e| {
                        extensions.is_empty()
                            || e.path()
                                .extension()
                                .and_then(|s| s.to_str())
                                .map(|ext| extensions.contains(&ext))
                                .unwrap_or(false)
                    })
                    .map(|e| e.path().to_path_buf())
                    .collect::<Vec<_>>()
            } else if path.is_file() {
                vec![path.clone()]
            } else {
                Vec::new()
            }
        })
        .collect()
}
