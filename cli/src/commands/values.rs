use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use colored::Colorize;
use theme_overlay::density::{Density, DensitySlot};
use theme_overlay::values::values_file_name;
use theme_overlay::{ThemeArchive, read_value_entries};

use crate::commands::path_helpers::get_all_files;

pub(crate) fn command_values(paths: &[PathBuf]) -> Result<()> {
    let files = get_all_files(paths, &[]);

    for (i, path) in files.iter().enumerate() {
        dump(path)?;

        if i != files.len() - 1 {
            println!();
        }
    }

    Ok(())
}

fn slots() -> impl Iterator<Item = DensitySlot> {
    std::iter::once(None).chain(Density::ALL.into_iter().map(Some))
}

fn dump(path: &Path) -> Result<()> {
    let archive = ThemeArchive::new(path, "");
    archive.check_for_update();
    if !archive.is_open() {
        bail!("can't open theme archive: {:?}", path);
    }

    println!("{}: {}", "Archive", path.display().to_string().green());

    for file_name in slots().map(values_file_name) {
        let Some(data) = archive.read(&file_name) else {
            continue;
        };

        let document = read_value_entries(&data);
        if !document.recognized {
            println!("{}: {} (unknown root)", "File", file_name.yellow());
            continue;
        }

        println!("{}: {}", "File", file_name.green());
        for entry in &document.entries {
            let name = match &entry.package {
                Some(package) => format!("{}:{}", package, entry.name),
                None => entry.name.clone(),
            };
            println!(
                "  {}/{} = {}",
                entry.kind.resource_type(),
                name.cyan(),
                entry.text
            );
        }

        if let Some(err) = document.error {
            println!("  {}: {}", "Error", err.to_string().red());
        }
    }

    Ok(())
}
