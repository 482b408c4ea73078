use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use colored::Colorize;
use theme_overlay::density::best_density_order;
use theme_overlay::values::values_file_name;
use theme_overlay::{ThemeArchive, read_value_entries};
use walkdir::WalkDir;

pub(crate) fn command_show(roots: &[PathBuf], density: u16) -> Result<()> {
    for (i, root) in roots.iter().enumerate() {
        show(root, density)?;

        // Add a newline between roots except after the last one
        if i != roots.len() - 1 {
            println!();
        }
    }

    Ok(())
}

/// Component archives are the plain files directly inside the theme root
fn components(root: &Path) -> Vec<PathBuf> {
    let mut components: Vec<PathBuf> = WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.path().is_file())
        .filter(|e| {
            e.file_name()
                .to_str()
                .map(|s| !s.starts_with('.'))
                .unwrap_or(false)
        })
        .map(|e| e.path().to_path_buf())
        .collect();
    components.sort();
    components
}

fn show(root: &Path, density: u16) -> Result<()> {
    if !root.is_dir() {
        bail!("theme root is not a directory: {:?}", root);
    }

    println!("{}: {}", "Theme Root", root.display().to_string().green());

    for path in components(root) {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let archive = ThemeArchive::new(&path, name.as_str());
        archive.check_for_update();

        println!();
        println!("{}: {}", "Component", name.green());
        if !archive.is_open() {
            println!("{}: {}", "Status", "unreadable".red());
            continue;
        }
        println!("{}: {}", "Entries", archive.names().len().to_string().green());

        let values = best_density_order(density).into_iter().find_map(|slot| {
            let file_name = values_file_name(slot);
            let document = read_value_entries(&archive.read(&file_name)?);
            document.recognized.then_some((file_name, document))
        });

        match values {
            Some((file_name, document)) => {
                println!(
                    "{}: {} ({} entries)",
                    "Values",
                    file_name.green(),
                    document.entries.len()
                );
                if let Some(err) = document.error {
                    println!("{}: {}", "Values Error", err.to_string().red());
                }
            }
            None => println!("{}: {}", "Values", "-".green()),
        }
    }

    Ok(())
}
