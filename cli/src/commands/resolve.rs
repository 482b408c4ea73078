use std::sync::Arc;

use anyhow::{Context, Result, bail};
use colored::Colorize;
use theme_overlay::density::best_density_order;
use theme_overlay::{BaseResources, Drawable, IdentifierResolver, ResourceId};

use crate::EngineArgs;
use crate::commands::engine::build_engine;

/// Original resources are not available here, only the drawable path is
/// guessed so file overrides can be found
struct Unthemed {
    id: ResourceId,
    drawable_path: Option<String>,
}

impl BaseResources for Unthemed {
    fn integer(&self, _id: ResourceId) -> Option<i32> {
        None
    }

    fn dimension(&self, _id: ResourceId) -> Option<f32> {
        None
    }

    fn text(&self, _id: ResourceId) -> Option<String> {
        None
    }

    fn drawable_path(&self, id: ResourceId) -> Option<String> {
        if id == self.id {
            self.drawable_path.clone()
        } else {
            None
        }
    }

    fn open_drawable(&self, _id: ResourceId) -> Option<Vec<u8>> {
        None
    }
}

/// Split `package:type/name`, the package defaults to `default_package`
fn parse_resource<'a>(
    resource: &'a str,
    default_package: &'a str,
) -> Result<(&'a str, &'a str, &'a str)> {
    let (package, rest) = match resource.split_once(':') {
        Some((package, rest)) => (package, rest),
        None => (default_package, resource),
    };

    match rest.split_once('/') {
        Some((type_, name)) if !type_.is_empty() && !name.is_empty() => Ok((package, type_, name)),
        _ => bail!("expected `type/name` or `package:type/name`, got {:?}", resource),
    }
}

pub(crate) fn command_resolve(package: &str, resource: &str, args: &EngineArgs) -> Result<()> {
    let (owner, type_, name) = parse_resource(resource, package)?;
    let (engine, table) = build_engine(args)?;

    let id = table
        .identifier(name, type_, owner)
        .with_context(|| format!("unknown resource {}:{}/{}", owner, type_, name))?;

    let density_dpi = engine.config().display.density_dpi;
    let drawable_path = (type_ == "drawable").then(|| {
        let dir = best_density_order(density_dpi)
            .into_iter()
            .flatten()
            .next()
            .map(|density| format!("res/drawable-{}", density))
            .unwrap_or_else(|| "res/drawable".to_owned());
        format!("{}/{}.png", dir, name)
    });

    let router = engine.router(package, Arc::new(Unthemed { id, drawable_path }));

    println!("{}: {}", "Resource", format!("{}:{}/{}", owner, type_, name).green());
    println!("{}: {}", "Id", format!("0x{:08x}", id).green());
    println!(
        "{}: {}",
        "Theme Values",
        router.has_theme_values().to_string().green()
    );

    let value = match type_ {
        "bool" => router.boolean(id).map(|v| v.to_string()),
        "color" => router.color(id).map(|v| format!("#{:08x}", v)),
        "integer" => router.integer(id).map(|v| v.to_string()),
        "dimen" => router.integer(id).map(|packed| {
            let px = router.dimension(id).unwrap_or_default();
            let size = router.dimension_pixel_size(id).unwrap_or_default();
            format!("0x{:08x} ({}px, {}px rounded)", packed as u32, px, size)
        }),
        "string" => router.text(id),
        "drawable" => router.open_drawable(id).map(|drawable| match drawable {
            Drawable::Color(argb) => format!("color #{:08x}", argb),
            Drawable::Image(data) => format!("image, {} bytes", data.len()),
        }),
        _ => router.integer(id).map(|v| v.to_string()).or_else(|| router.text(id)),
    };

    println!("{}: {}", "Value", value.as_deref().unwrap_or("-").green());

    Ok(())
}
