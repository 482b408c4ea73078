//! Resolution chain nodes.
//!
//! Every theme component (framework, icons, lockscreen, one per application
//! package) is a [`ThemeResources`] node. Lookups try the node's own archive
//! first, then the wrapped node and finally, for integers, the system node.

use std::collections::HashMap;
use std::fmt::{self, Display};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use log::debug;
use parking_lot::{Mutex, RwLock};

use crate::archive::ThemeArchive;
use crate::compat::CompatibilityMapper;
use crate::density::{DensitySlot, substitute_density};
use crate::resolver::{IdentifierResolver, ResourceId};
use crate::values::OverrideTable;

/// Archive prefix under which package archives carry framework resources
pub const FRAMEWORK_PREFIX: &str = "framework-res/";

/// Package name of the framework resources
pub const FRAMEWORK_PACKAGE: &str = "android";

/// Place of a node in the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Framework resources, the last fallback of every chain
    System,
    Package,
    Icons,
    Lockscreen,
}

impl Role {
    /// Icons are a flat layer set and never wrap another node
    #[inline]
    pub fn wraps(self) -> bool {
        !matches!(self, Role::Icons)
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::System => "system",
            Role::Package => "package",
            Role::Icons => "icons",
            Role::Lockscreen => "lockscreen",
        };
        f.write_str(name)
    }
}

/// Which resource set a file request addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cookie {
    Framework,
    Package,
}

/// Collaborators shared by every node of an engine
#[derive(Clone)]
pub struct NodeContext {
    pub resolver: Arc<dyn IdentifierResolver>,
    /// Density preference of the device, closest first
    pub densities: Arc<[DensitySlot]>,
}

#[derive(Default)]
struct Memo {
    /// Bumped whenever memoized values are dropped
    generation: u64,
    integers: HashMap<ResourceId, i32>,
    texts: HashMap<ResourceId, String>,
}

/// One level of the resolution chain
pub struct ThemeResources {
    role: Role,
    archive: Arc<ThemeArchive>,
    /// Replaced as a whole on rebuild, readers keep their snapshot
    table: RwLock<Arc<OverrideTable>>,
    memo: RwLock<Memo>,
    wrapped: Option<Arc<ThemeResources>>,
    system: Option<Arc<ThemeResources>>,
    context: NodeContext,
    /// Archive generation the table was built from
    built_from: AtomicU64,
    /// Combined generation of wrapped and system node at the last check
    upstream_seen: AtomicU64,
    update_lock: Mutex<()>,
}

impl ThemeResources {
    /// Create a node and load its override table
    ///
    /// `wrapped` is ignored for roles that don't wrap, `system` is ignored for
    /// the system node itself.
    pub fn new(
        role: Role,
        archive: Arc<ThemeArchive>,
        wrapped: Option<Arc<ThemeResources>>,
        system: Option<Arc<ThemeResources>>,
        context: NodeContext,
    ) -> Arc<ThemeResources> {
        let wrapped = wrapped.filter(|_| role.wraps());
        let system = system.filter(|_| role != Role::System);

        archive.check_for_update();
        let built_from = archive.generation();
        let table = OverrideTable::load(&archive, &context.densities, context.resolver.as_ref());

        debug!(
            "{} node for {:?}: {} overrides, wraps {:?}",
            role,
            archive.path(),
            table.len(),
            wrapped.as_ref().map(|w| w.package())
        );

        let node = ThemeResources {
            role,
            archive,
            table: RwLock::new(Arc::new(table)),
            memo: RwLock::new(Memo::default()),
            wrapped,
            system,
            context,
            built_from: AtomicU64::new(built_from),
            upstream_seen: AtomicU64::new(0),
            update_lock: Mutex::new(()),
        };
        node.upstream_seen
            .store(node.upstream_generation(), Ordering::Release);

        Arc::new(node)
    }

    #[inline]
    pub fn role(&self) -> Role {
        self.role
    }

    #[inline]
    pub fn archive(&self) -> &Arc<ThemeArchive> {
        &self.archive
    }

    #[inline]
    pub fn package(&self) -> &str {
        self.archive.package()
    }

    pub fn wrapped(&self) -> Option<&Arc<ThemeResources>> {
        self.wrapped.as_ref()
    }

    /// Density preference the node was built with, closest first
    pub fn densities(&self) -> &[DensitySlot] {
        &self.context.densities
    }

    /// Current override table snapshot
    pub fn table(&self) -> Arc<OverrideTable> {
        self.table.read().clone()
    }

    /// Changes whenever values served by this node may have changed
    pub fn generation(&self) -> u64 {
        self.memo.read().generation
    }

    fn upstream_generation(&self) -> u64 {
        let wrapped = self.wrapped.as_ref().map_or(0, |w| w.generation());
        let system = self.system.as_ref().map_or(0, |s| s.generation());
        wrapped.wrapping_add(system)
    }

    /// Integer override: local, wrapped, then system
    pub fn get_int(&self, id: ResourceId) -> Option<i32> {
        let generation = {
            let memo = self.memo.read();
            if let Some(value) = memo.integers.get(&id) {
                return Some(*value);
            }
            memo.generation
        };

        let value = self
            .table()
            .integer(id)
            .or_else(|| self.wrapped.as_ref().and_then(|w| w.get_int(id)))
            .or_else(|| self.system.as_ref().and_then(|s| s.get_int(id)))?;

        let mut memo = self.memo.write();
        // values computed against dropped tables must not be memoized
        if memo.generation == generation {
            memo.integers.insert(id, value);
        }
        Some(value)
    }

    /// Text override: local, then wrapped; the system node is not consulted
    pub fn get_text(&self, id: ResourceId) -> Option<String> {
        let generation = {
            let memo = self.memo.read();
            if let Some(value) = memo.texts.get(&id) {
                return Some(value.clone());
            }
            memo.generation
        };

        let value = self
            .table()
            .text(id)
            .map(str::to_owned)
            .or_else(|| self.wrapped.as_ref().and_then(|w| w.get_text(id)))?;

        let mut memo = self.memo.write();
        if memo.generation == generation {
            memo.texts.insert(id, value.clone());
        }
        Some(value)
    }

    /// Node or anything it wraps carries value overrides
    pub fn has_values(&self) -> bool {
        !self.table().is_empty() || self.wrapped.as_ref().is_some_and(|w| w.has_values())
    }

    fn entry_path(&self, cookie: Cookie, path: &str) -> String {
        match (cookie, self.role) {
            (Cookie::Framework, Role::Package) => format!("{}{}", FRAMEWORK_PREFIX, path),
            _ => path.to_owned(),
        }
    }

    /// Read an entry as named, then with the other density qualifiers
    fn read_local(&self, name: &str) -> Option<Vec<u8>> {
        if let Some(data) = self.archive.read(name) {
            return Some(data);
        }

        for slot in self.context.densities.iter() {
            let Some(candidate) = substitute_density(name, *slot) else {
                continue;
            };
            if candidate == name {
                continue;
            }
            if let Some(data) = self.archive.read(&candidate) {
                debug!("{:?} served as {:?}", name, candidate);
                return Some(data);
            }
        }

        None
    }

    /// Themed file contents for a resource path
    ///
    /// Tries the local archive (with density substitution), the wrapped node,
    /// the compatibility name of the file and finally the path with the
    /// framework prefix stripped.
    pub fn get_file_stream(&self, cookie: Cookie, path: &str) -> Option<Vec<u8>> {
        let name = self.entry_path(cookie, path);

        if let Some(data) = self.read_local(&name) {
            return Some(data);
        }

        if let Some(data) = self
            .wrapped
            .as_ref()
            .and_then(|w| w.get_file_stream(cookie, path))
        {
            return Some(data);
        }

        if self.role != Role::System {
            let owner = match cookie {
                Cookie::Framework => FRAMEWORK_PACKAGE,
                Cookie::Package => self.package(),
            };
            if let Some(mapped) = CompatibilityMapper::map_resource_name(owner, &name) {
                if let Some(data) = self.read_local(&mapped) {
                    debug!("{:?} served by compatible name {:?}", name, mapped);
                    return Some(data);
                }
            }
        }

        name.strip_prefix(FRAMEWORK_PREFIX)
            .and_then(|stripped| self.read_local(stripped))
    }

    /// Check the archives of the chain for modifications
    ///
    /// The wrapped node, the system node and the own archive are checked.
    /// Returns `true` when values served by this node may have changed, in
    /// which case the memoized values are dropped.
    pub fn check_update(&self) -> bool {
        let _guard = self.update_lock.lock();
        let mut changed = false;

        if let Some(wrapped) = &self.wrapped {
            changed |= wrapped.check_update();
        }
        // picked up below through the upstream generation
        if let Some(system) = &self.system {
            system.check_update();
        }

        self.archive.check_for_update();
        let archive_generation = self.archive.generation();
        if self.built_from.load(Ordering::Acquire) != archive_generation {
            let table = OverrideTable::load(
                &self.archive,
                &self.context.densities,
                self.context.resolver.as_ref(),
            );
            debug!(
                "rebuilt {} overrides for {:?}",
                table.len(),
                self.archive.path()
            );

            *self.table.write() = Arc::new(table);
            self.built_from.store(archive_generation, Ordering::Release);
            changed = true;
        }

        let upstream = self.upstream_generation();
        if self.upstream_seen.swap(upstream, Ordering::AcqRel) != upstream {
            changed = true;
        }

        if changed {
            let mut memo = self.memo.write();
            memo.integers.clear();
            memo.texts.clear();
            memo.generation += 1;
        }

        changed
    }
}

/// Shares one package node per package name
///
/// Weak values only: nodes nobody uses are dropped and rebuilt on demand.
#[derive(Default)]
pub struct NodeRegistry {
    nodes: Mutex<HashMap<String, Weak<ThemeResources>>>,
}

impl NodeRegistry {
    pub fn new() -> NodeRegistry {
        NodeRegistry::default()
    }

    pub fn get(&self, package: &str) -> Option<Arc<ThemeResources>> {
        self.nodes.lock().get(package).and_then(Weak::upgrade)
    }

    /// Return the live node for `package` or store the one `create` builds
    ///
    /// `create` runs under the registry lock and must not use the registry.
    pub fn get_or_insert_with<F>(&self, package: &str, create: F) -> Arc<ThemeResources>
    where
        F: FnOnce() -> Arc<ThemeResources>,
    {
        let mut nodes = self.nodes.lock();

        if let Some(node) = nodes.get(package).and_then(Weak::upgrade) {
            return node;
        }

        nodes.retain(|_, node| node.strong_count() > 0);

        let node = create();
        nodes.insert(package.to_owned(), Arc::downgrade(&node));
        node
    }

    /// Live nodes
    pub fn nodes(&self) -> Vec<Arc<ThemeResources>> {
        self.nodes.lock().values().filter_map(Weak::upgrade).collect()
    }

    pub fn len(&self) -> usize {
        self.nodes
            .lock()
            .values()
            .filter(|node| node.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::density::{Density, best_density_order};
    use crate::resolver::ResourceTable;
    use crate::test_utils::{bump_mtime, values_archive, values_xml, write_archive};
    use std::path::Path;
    use theme_overlay_zip::testing::ZipBuilder;

    const PHONE: &str = "com.android.phone";
    const UI: &str = "com.android.systemui";

    const ACCENT: ResourceId = 0x01060010;
    const TITLE: ResourceId = 0x01040010;
    const PAD: ResourceId = 0x7f050001;

    fn context(densities: Vec<DensitySlot>) -> NodeContext {
        let ids = ResourceTable::new()
            .with(FRAMEWORK_PACKAGE, "color", "accent", ACCENT)
            .with(FRAMEWORK_PACKAGE, "string", "title", TITLE)
            .with(PHONE, "dimen", "pad", PAD);

        NodeContext {
            resolver: Arc::new(ids),
            densities: densities.into(),
        }
    }

    fn node(
        root: &Path,
        name: &str,
        package: &str,
        role: Role,
        wrapped: Option<Arc<ThemeResources>>,
        system: Option<Arc<ThemeResources>>,
        context: &NodeContext,
    ) -> Arc<ThemeResources> {
        let archive = Arc::new(ThemeArchive::new(root.join(name), package));
        ThemeResources::new(role, archive, wrapped, system, context.clone())
    }

    fn system_node(root: &Path, context: &NodeContext) -> Arc<ThemeResources> {
        node(root, "framework-res", FRAMEWORK_PACKAGE, Role::System, None, None, context)
    }

    fn accent_values(color: &str) -> Vec<u8> {
        String::from_utf8(values_xml(&[("color", "accent", color)]))
            .unwrap()
            .replace("name=\"accent\"", "name=\"accent\" package=\"android\"")
            .into_bytes()
    }

    #[test]
    fn wrapped_beats_system() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let context = context(best_density_order(320));

        write_archive(
            &root.join("framework-res"),
            values_archive(&[("color", "accent", "#111111")]),
        );
        write_archive(
            &root.join("wrapped"),
            ZipBuilder::new().stored("theme_values.xml", &accent_values("#222222")),
        );
        write_archive(&root.join(PHONE), ZipBuilder::new().stored("readme.txt", b"-"));

        let system = system_node(root, &context);
        let wrapped = node(
            root,
            "wrapped",
            UI,
            Role::Package,
            None,
            Some(system.clone()),
            &context,
        );
        let phone = node(
            root,
            PHONE,
            PHONE,
            Role::Package,
            Some(wrapped),
            Some(system.clone()),
            &context,
        );

        assert_eq!(phone.get_int(ACCENT), Some(0xFF222222u32 as i32));
        assert_eq!(system.get_int(ACCENT), Some(0xFF111111u32 as i32));
    }

    #[test]
    fn system_is_last_resort_for_integers_only() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let context = context(best_density_order(320));

        write_archive(
            &root.join("framework-res"),
            ZipBuilder::new().stored(
                "theme_values.xml",
                &values_xml(&[("color", "accent", "#111111"), ("string", "title", "Themed")]),
            ),
        );

        let system = system_node(root, &context);
        let phone = node(root, PHONE, PHONE, Role::Package, None, Some(system.clone()), &context);

        assert_eq!(phone.get_int(ACCENT), Some(0xFF111111u32 as i32));
        assert_eq!(system.get_text(TITLE).as_deref(), Some("Themed"));
        assert_eq!(phone.get_text(TITLE), None);
    }

    #[test]
    fn memoized_values_follow_modifications() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let path = root.join(PHONE);
        let context = context(best_density_order(320));

        write_archive(&path, values_archive(&[("dimen", "pad", "4dp")]));
        let phone = node(root, PHONE, PHONE, Role::Package, None, None, &context);

        assert_eq!(phone.get_int(PAD), Some((4 << 8) | 1));
        assert!(!phone.check_update());
        assert_eq!(phone.get_int(PAD), Some((4 << 8) | 1));

        write_archive(&path, values_archive(&[("dimen", "pad", "8dp")]));
        bump_mtime(&path);

        assert!(phone.check_update());
        assert_eq!(phone.get_int(PAD), Some((8 << 8) | 1));
    }

    #[test]
    fn system_change_drops_package_memo() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let framework = root.join("framework-res");
        let context = context(best_density_order(320));

        write_archive(&framework, values_archive(&[("color", "accent", "#111111")]));
        let system = system_node(root, &context);
        let phone = node(root, PHONE, PHONE, Role::Package, None, Some(system.clone()), &context);
        assert_eq!(phone.get_int(ACCENT), Some(0xFF111111u32 as i32));

        write_archive(&framework, values_archive(&[("color", "accent", "#333333")]));
        bump_mtime(&framework);

        assert!(system.check_update());
        assert!(phone.check_update());
        assert_eq!(phone.get_int(ACCENT), Some(0xFF333333u32 as i32));
    }

    #[test]
    fn package_check_reloads_system() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let framework = root.join("framework-res");
        let context = context(best_density_order(320));

        write_archive(
            &framework,
            values_archive(&[("color", "accent", "#111111")]),
        );
        let system = system_node(root, &context);
        let phone = node(root, PHONE, PHONE, Role::Package, None, Some(system.clone()), &context);
        assert_eq!(phone.get_int(ACCENT), Some(0xFF111111u32 as i32));

        write_archive(
            &framework,
            values_archive(&[("color", "accent", "#444444")]),
        );
        bump_mtime(&framework);

        // only the package node is asked
        assert!(phone.check_update());
        assert_eq!(phone.get_int(ACCENT), Some(0xFF444444u32 as i32));
        assert_eq!(system.get_int(ACCENT), Some(0xFF444444u32 as i32));
        assert!(!phone.check_update());
    }

    #[test]
    fn density_substitution() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let context = context(vec![
            Some(Density::High),
            Some(Density::XHigh),
            Some(Density::Medium),
        ]);

        write_archive(
            &root.join(PHONE),
            ZipBuilder::new()
                .stored("res/drawable-xhdpi/icon.png", b"xhdpi")
                .stored("res/drawable-mdpi/icon.png", b"mdpi"),
        );
        let phone = node(root, PHONE, PHONE, Role::Package, None, None, &context);

        assert_eq!(
            phone.get_file_stream(Cookie::Package, "res/drawable-hdpi/icon.png").unwrap(),
            b"xhdpi"
        );
        assert!(phone.get_file_stream(Cookie::Package, "res/drawable-hdpi/other.png").is_none());
    }

    #[test]
    fn file_lookup_chain() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let context = context(best_density_order(320));

        write_archive(
            &root.join("base"),
            ZipBuilder::new().stored("res/drawable/base_only.png", b"base"),
        );
        write_archive(
            &root.join(UI),
            ZipBuilder::new()
                .stored("res/drawable-xhdpi/stat_sys_battery_circle.png", b"circle")
                .stored("framework-res/res/drawable/dialog_bg.9.png", b"framework")
                .stored("res/drawable/btn_default_normal.9.png", b"flat"),
        );

        let base = node(root, "base", UI, Role::Package, None, None, &context);
        let ui = node(root, UI, UI, Role::Package, Some(base), None, &context);

        // wrapped node
        assert_eq!(
            ui.get_file_stream(Cookie::Package, "res/drawable/base_only.png").unwrap(),
            b"base"
        );
        // compatible file name
        assert_eq!(
            ui.get_file_stream(Cookie::Package, "res/drawable-xhdpi/stat_sys_battery.png").unwrap(),
            b"circle"
        );
        // framework resources inside a package archive
        assert_eq!(
            ui.get_file_stream(Cookie::Framework, "res/drawable/dialog_bg.9.png").unwrap(),
            b"framework"
        );
        // prefix stripped as the last resort
        assert_eq!(
            ui.get_file_stream(Cookie::Framework, "res/drawable/btn_default_normal.9.png").unwrap(),
            b"flat"
        );
        assert!(ui.get_file_stream(Cookie::Package, "res/drawable/missing.png").is_none());
    }

    #[test]
    fn icons_never_wrap() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let context = context(best_density_order(320));

        let other = node(root, "other", PHONE, Role::Package, None, None, &context);
        let icons = node(root, "icons", "icons", Role::Icons, Some(other), None, &context);
        assert!(icons.wrapped().is_none());
    }

    #[test]
    fn missing_root_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("nothing");
        let context = context(best_density_order(320));

        let system = system_node(&root, &context);
        let phone = node(&root, PHONE, PHONE, Role::Package, None, Some(system.clone()), &context);

        assert_eq!(phone.get_int(ACCENT), None);
        assert_eq!(phone.get_text(TITLE), None);
        assert!(phone.get_file_stream(Cookie::Framework, "res/drawable/x.png").is_none());
        assert!(!phone.has_values());
        assert!(!phone.check_update());
        assert!(!system.check_update());
    }

    #[test]
    fn registry_reuses_live_nodes() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let context = context(best_density_order(320));
        let registry = NodeRegistry::new();

        let first = registry.get_or_insert_with(PHONE, || {
            node(root, PHONE, PHONE, Role::Package, None, None, &context)
        });
        let second = registry.get_or_insert_with(PHONE, || unreachable!());
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);

        drop(first);
        drop(second);
        assert!(registry.get(PHONE).is_none());
        assert!(registry.is_empty());
    }
}
