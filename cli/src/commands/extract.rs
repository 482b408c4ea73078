use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::warn;
use theme_overlay_zip::entry::ZipEntry;

use crate::commands::path_helpers::get_all_files;

fn unpacked_name(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| {
            let mut s = n.to_os_string();
            s.push(".unp");
            s
        })
        .unwrap_or_else(|| "output.unp".into());
    PathBuf::from(name)
}

pub(crate) fn command_extract(paths: &[PathBuf], output: &Option<PathBuf>) -> Result<()> {
    let all_files = get_all_files(paths, &[]);
    let multiple_files = all_files.len() > 1;

    for path in all_files {
        let out_dir = match output {
            Some(out) if multiple_files => out.join(unpacked_name(&path)),
            Some(out) => out.clone(),
            None => path.with_file_name(unpacked_name(&path)),
        };

        extract(&path, &out_dir)?;
    }

    Ok(())
}

fn extract(path: &Path, out_dir: &Path) -> Result<()> {
    let buf = fs::read(path).with_context(|| format!("can't open file: {:?}", path))?;
    let zip = ZipEntry::new(buf).with_context(|| format!("not a theme archive: {:?}", path))?;

    fs::create_dir_all(out_dir)
        .with_context(|| format!("can't create output directory {:?}", out_dir))?;

    for file_name in zip.namelist() {
        if file_name.ends_with('/') {
            continue;
        }

        if file_name.starts_with('/') || file_name.split('/').any(|part| part == "..") {
            warn!("skipping {:?}, path escapes the output directory", file_name);
            continue;
        }

        let file_path = out_dir.join(file_name);

        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("can't create parent dirs for {:?}", parent))?;
        }

        let data = zip
            .read(file_name)
            .with_context(|| format!("can't read file {:?} from archive", file_name))?;

        fs::write(&file_path, data).with_context(|| format!("can't write to {:?}", file_path))?;
    }

    Ok(())
}
