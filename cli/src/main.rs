use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::commands::{
    command_dimen, command_extract, command_icon, command_resolve, command_show, command_values,
};

mod commands;

#[derive(Parser)]
#[command(version, about, arg_required_else_help(true))]
struct Cli {
    #[command(subcommand)]
    commands: Option<Commands>,
}

/// Where the engine finds its theme and how the display looks
#[derive(Args)]
pub(crate) struct EngineArgs {
    #[arg(short, long, help = "Engine configuration (json)")]
    config: Option<PathBuf>,

    #[arg(short, long, help = "Theme root, overrides the configuration")]
    root: Option<PathBuf>,

    #[arg(short, long, help = "Display density in dpi, overrides the configuration")]
    density: Option<u16>,

    #[arg(short, long, help = "Resource id table (json)")]
    ids: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show theme components and their value counts
    Show {
        #[arg(required = true)]
        roots: Vec<PathBuf>,

        #[arg(short, long, default_value_t = 320, help = "Display density in dpi")]
        density: u16,
    },
    /// Dump raw value entries of theme archives
    Values {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Unpack theme archives as zip archive
    Extract {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        #[arg(short, long, help = "Output folder")]
        output: Option<PathBuf>,
    },
    /// Resolve themed value of a resource through the lookup chain
    Resolve {
        #[arg(required = true, help = "Application package")]
        package: String,

        #[arg(required = true, help = "Resource as `type/name` or `package:type/name`")]
        resource: String,

        #[command(flatten)]
        engine: EngineArgs,
    },
    /// Compose a themed application icon to png
    Icon {
        #[arg(required = true, help = "Application package")]
        package: String,

        #[arg(long, help = "Activity class name")]
        class: Option<String>,

        #[arg(short, long, help = "Original application icon")]
        base: Option<PathBuf>,

        #[arg(short, long, required = true, help = "Output png")]
        output: PathBuf,

        #[command(flatten)]
        engine: EngineArgs,
    },
    /// Pack textual dimensions and decode them back
    Dimen {
        #[arg(required = true)]
        values: Vec<String>,

        #[arg(short, long, default_value_t = 320, help = "Display density in dpi")]
        density: u16,
    },
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match &cli.commands {
        Some(Commands::Show { roots, density }) => command_show(roots, *density),
        Some(Commands::Values { paths }) => command_values(paths),
        Some(Commands::Extract { paths, output }) => command_extract(paths, output),
        Some(Commands::Resolve {
            package,
            resource,
            engine,
        }) => command_resolve(package, resource, engine),
        Some(Commands::Icon {
            package,
            class,
            base,
            output,
            engine,
        }) => command_icon(package, class.as_deref(), base.as_deref(), output, engine),
        Some(Commands::Dimen { values, density }) => command_dimen(values, *density),
        None => Ok(()),
    };

    if let Err(err) = result {
        eprintln!("{:#}", err);
    }
}
