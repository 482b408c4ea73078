use anyhow::{Context, Result};
use log::warn;
use theme_overlay::{ResourceTable, ThemeConfig, ThemeEngine};

use crate::EngineArgs;

/// Build an engine from the configuration file and command line overrides
///
/// The id table is handed back as well, commands resolve names through it.
pub(crate) fn build_engine(args: &EngineArgs) -> Result<(ThemeEngine, ResourceTable)> {
    let mut config = match &args.config {
        Some(path) => ThemeConfig::from_file(path)
            .with_context(|| format!("can't load configuration: {:?}", path))?,
        None => ThemeConfig::default(),
    };

    if let Some(root) = &args.root {
        config.theme_root = root.clone();
    }
    if let Some(density) = args.density {
        config.display.density_dpi = density;
    }

    let table = match &args.ids {
        Some(path) => ResourceTable::from_file(path)
            .with_context(|| format!("can't load resource id table: {:?}", path))?,
        None => {
            warn!("no resource id table given, value overrides can't be resolved");
            ResourceTable::new()
        }
    };

    let engine = ThemeEngine::with_table(config, table.clone());
    Ok((engine, table))
}
