pub mod archive;
pub mod compat;
pub mod config;
pub mod counter;
pub mod density;
pub mod dimension;
pub mod engine;
pub mod errors;
pub mod icon;
pub mod node;
pub mod resolver;
pub mod router;
pub mod values;

#[cfg(test)]
mod test_utils;

pub use archive::{ArchiveRegistry, ThemeArchive};
pub use compat::CompatibilityMapper;
pub use config::{DisplayMetrics, ThemeConfig};
pub use counter::{ThemeChange, ThemeChangeCounter, ThemeChangeFlags, ThemeChangeListener};
pub use density::{BestDensityOrder, Density, DensityOrder, DensitySlot};
pub use engine::{Collaborators, ThemeEngine};
pub use errors::{ThemeError, ValuesError};
pub use node::{Cookie, NodeRegistry, Role, ThemeResources};
pub use resolver::{EntryNameResolver, IdentifierResolver, ResourceId, ResourceName, ResourceTable};
pub use router::{BaseResources, Drawable, ResourceRouter};
pub use values::{OverrideTable, ValueDocument, ValueEntry, ValueKind, read_value_entries};
