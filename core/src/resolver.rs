use std::collections::HashMap;
use std::fmt::{self, Display};
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::errors::ThemeError;

/// Compiled resource identifier, `0xPPTTEEEE`
pub type ResourceId = u32;

/// Check that an id can refer to a real resource
///
/// Package ids live in the top byte and are positive, so anything that is
/// not a positive `i32` is a failed lookup.
#[inline]
pub fn is_valid_id(id: ResourceId) -> bool {
    (id as i32) > 0
}

/// Fully qualified resource name, `package:type/entry`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceName {
    pub package: String,
    pub type_: String,
    pub entry: String,
}

impl Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}/{}", self.package, self.type_, self.entry)
    }
}

/// Resolves `(name, type, package)` to an id
pub trait IdentifierResolver: Send + Sync {
    fn identifier(&self, name: &str, type_: &str, package: &str) -> Option<ResourceId>;
}

/// Resolves an id back to its name
pub trait EntryNameResolver: Send + Sync {
    fn entry_name(&self, id: ResourceId) -> Option<ResourceName>;
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(u32),
    Text(String),
}

impl RawId {
    fn value(&self) -> Option<ResourceId> {
        match self {
            RawId::Number(v) => Some(*v),
            RawId::Text(s) => {
                let s = s.trim();
                match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
                    Some(hex) => u32::from_str_radix(hex, 16).ok(),
                    None => s.parse().ok(),
                }
            }
        }
    }
}

/// package -> type -> entry -> id
type RawTable = HashMap<String, HashMap<String, HashMap<String, RawId>>>;

/// In-memory id table, resolves in both directions
#[derive(Debug, Default, Clone)]
pub struct ResourceTable {
    by_name: HashMap<(String, String, String), ResourceId>,
    by_id: HashMap<ResourceId, ResourceName>,
}

impl ResourceTable {
    pub fn new() -> ResourceTable {
        ResourceTable::default()
    }

    /// Load a `{ "<package>": { "<type>": { "<entry>": id } } }` document
    ///
    /// Ids are numbers or `"0x7f010000"` style strings, unparsable ids are
    /// dropped.
    pub fn from_json(data: &[u8]) -> Result<ResourceTable, ThemeError> {
        let raw: RawTable = serde_json::from_slice(data).map_err(ThemeError::ResolverError)?;
        let mut table = ResourceTable::new();

        for (package, types) in raw {
            for (type_, entries) in types {
                for (entry, id) in entries {
                    if let Some(id) = id.value() {
                        table.insert(&package, &type_, &entry, id);
                    }
                }
            }
        }

        Ok(table)
    }

    pub fn from_file(path: &Path) -> Result<ResourceTable, ThemeError> {
        let data = fs::read(path)?;
        Self::from_json(&data)
    }

    pub fn insert(&mut self, package: &str, type_: &str, entry: &str, id: ResourceId) {
        self.by_name.insert(
            (package.to_owned(), type_.to_owned(), entry.to_owned()),
            id,
        );
        self.by_id.insert(
            id,
            ResourceName {
                package: package.to_owned(),
                type_: type_.to_owned(),
                entry: entry.to_owned(),
            },
        );
    }

    /// Builder flavour of [`ResourceTable::insert`]
    pub fn with(mut self, package: &str, type_: &str, entry: &str, id: ResourceId) -> Self {
        self.insert(package, type_, entry, id);
        self
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

impl IdentifierResolver for ResourceTable {
    fn identifier(&self, name: &str, type_: &str, package: &str) -> Option<ResourceId> {
        self.by_name
            .get(&(package.to_owned(), type_.to_owned(), name.to_owned()))
            .copied()
    }
}

impl EntryNameResolver for ResourceTable {
    fn entry_name(&self, id: ResourceId) -> Option<ResourceName> {
        self.by_id.get(&id).cloned()
    }
}
