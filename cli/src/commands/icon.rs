use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use theme_overlay::icon::IconKey;

use crate::EngineArgs;
use crate::commands::engine::build_engine;

pub(crate) fn command_icon(
    package: &str,
    class_name: Option<&str>,
    base: Option<&Path>,
    output: &Path,
    args: &EngineArgs,
) -> Result<()> {
    let base = base
        .map(|path| fs::read(path).with_context(|| format!("can't open icon: {:?}", path)))
        .transpose()?;

    let (engine, _) = build_engine(args)?;
    let key = IconKey::new(package, class_name, 0);

    let icon = engine
        .composer()
        .themed_icon(&key, base.as_deref())
        .with_context(|| format!("no themed icon for {}", package))?;

    let data = icon.encode_png().context("can't encode icon")?;
    fs::write(output, data).with_context(|| format!("can't write to {:?}", output))?;

    println!(
        "{}: {}",
        "Icon",
        format!("{}x{}", icon.width(), icon.height()).green()
    );
    println!("{}: {}", "Output", output.display().to_string().green());

    Ok(())
}
