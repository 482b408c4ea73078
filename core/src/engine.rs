use std::path::PathBuf;
use std::sync::Arc;

use log::info;

use crate::archive::ArchiveRegistry;
use crate::compat::CompatibilityMapper;
use crate::config::ThemeConfig;
use crate::counter::{ThemeChange, ThemeChangeCounter, ThemeChangeFlags};
use crate::density::{BestDensityOrder, DensityOrder};
use crate::icon::IconComposer;
use crate::node::{FRAMEWORK_PACKAGE, NodeContext, NodeRegistry, Role, ThemeResources};
use crate::resolver::{EntryNameResolver, IdentifierResolver, ResourceTable};
use crate::router::{BaseResources, ResourceRouter};

/// Component archive with the framework resources
pub const FRAMEWORK_COMPONENT: &str = "framework-res";
pub const ICONS_COMPONENT: &str = "icons";
pub const LOCKSCREEN_COMPONENT: &str = "lockscreen";

/// Services the engine needs from its host
pub struct Collaborators {
    pub ids: Arc<dyn IdentifierResolver>,
    pub names: Arc<dyn EntryNameResolver>,
    pub density_order: Arc<dyn DensityOrder>,
    pub archives: Arc<ArchiveRegistry>,
    pub nodes: Arc<NodeRegistry>,
}

impl Collaborators {
    /// Resolvers with default density order and private registries
    pub fn new(
        ids: Arc<dyn IdentifierResolver>,
        names: Arc<dyn EntryNameResolver>,
    ) -> Collaborators {
        Collaborators {
            ids,
            names,
            density_order: Arc::new(BestDensityOrder),
            archives: Arc::new(ArchiveRegistry::new()),
            nodes: Arc::new(NodeRegistry::new()),
        }
    }
}

/// Entry point: owns the top level nodes, the change counter and the icon
/// composer, hands out package nodes and resource routers
pub struct ThemeEngine {
    config: ThemeConfig,
    context: NodeContext,
    names: Arc<dyn EntryNameResolver>,
    archives: Arc<ArchiveRegistry>,
    nodes: Arc<NodeRegistry>,
    system: Arc<ThemeResources>,
    icons: Arc<ThemeResources>,
    lockscreen: Arc<ThemeResources>,
    counter: Arc<ThemeChangeCounter>,
    composer: Arc<IconComposer>,
}

impl ThemeEngine {
    pub fn new(config: ThemeConfig, collaborators: Collaborators) -> ThemeEngine {
        let Collaborators {
            ids,
            names,
            density_order,
            archives,
            nodes,
        } = collaborators;

        let context = NodeContext {
            resolver: ids,
            densities: density_order
                .density_order(config.display.density_dpi)
                .into(),
        };

        let component = |name: &str, package: &str| {
            archives.get_or_create(&config.theme_root.join(name), package)
        };

        let system = ThemeResources::new(
            Role::System,
            component(FRAMEWORK_COMPONENT, FRAMEWORK_PACKAGE),
            None,
            None,
            context.clone(),
        );
        let icons = ThemeResources::new(
            Role::Icons,
            component(ICONS_COMPONENT, ICONS_COMPONENT),
            None,
            Some(system.clone()),
            context.clone(),
        );
        let lockscreen = ThemeResources::new(
            Role::Lockscreen,
            component(LOCKSCREEN_COMPONENT, LOCKSCREEN_COMPONENT),
            None,
            Some(system.clone()),
            context.clone(),
        );

        let composer = Arc::new(IconComposer::new(
            icons.clone(),
            config.customized_icons_dir.clone(),
            config.display.density_dpi,
            config.icon_cache_bytes,
        ));
        let counter = Arc::new(ThemeChangeCounter::new());
        counter.subscribe(composer.clone());

        info!(
            "theme engine at {:?}, {} dpi, framework overrides {}",
            config.theme_root,
            config.display.density_dpi,
            system.table().len()
        );

        ThemeEngine {
            config,
            context,
            names,
            archives,
            nodes,
            system,
            icons,
            lockscreen,
            counter,
            composer,
        }
    }

    /// Engine whose resolvers are one in-memory id table
    pub fn with_table(config: ThemeConfig, table: ResourceTable) -> ThemeEngine {
        let table = Arc::new(table);
        ThemeEngine::new(config, Collaborators::new(table.clone(), table))
    }

    #[inline]
    pub fn config(&self) -> &ThemeConfig {
        &self.config
    }

    pub fn component_path(&self, component: &str) -> PathBuf {
        self.config.theme_root.join(component)
    }

    #[inline]
    pub fn system(&self) -> &Arc<ThemeResources> {
        &self.system
    }

    #[inline]
    pub fn icons(&self) -> &Arc<ThemeResources> {
        &self.icons
    }

    #[inline]
    pub fn lockscreen(&self) -> &Arc<ThemeResources> {
        &self.lockscreen
    }

    #[inline]
    pub fn counter(&self) -> &Arc<ThemeChangeCounter> {
        &self.counter
    }

    #[inline]
    pub fn composer(&self) -> &Arc<IconComposer> {
        &self.composer
    }

    #[inline]
    pub fn archives(&self) -> &Arc<ArchiveRegistry> {
        &self.archives
    }

    #[inline]
    pub fn nodes(&self) -> &Arc<NodeRegistry> {
        &self.nodes
    }

    fn package_node(
        &self,
        package: &str,
        wrapped: Option<Arc<ThemeResources>>,
    ) -> Arc<ThemeResources> {
        let archive = self
            .archives
            .get_or_create(&self.component_path(package), package);
        ThemeResources::new(
            Role::Package,
            archive,
            wrapped,
            Some(self.system.clone()),
            self.context.clone(),
        )
    }

    /// Node for an application package
    ///
    /// The node wraps the archive of the compatible package, if there is one.
    /// Framework requests get the system node.
    pub fn package(&self, package: &str) -> Arc<ThemeResources> {
        if package == FRAMEWORK_PACKAGE {
            return self.system.clone();
        }

        self.nodes.get_or_insert_with(package, || {
            let wrapped = CompatibilityMapper::map_package(package)
                .map(|compatible| self.package_node(compatible, None));
            self.package_node(package, wrapped)
        })
    }

    pub fn router(&self, package: &str, base: Arc<dyn BaseResources>) -> ResourceRouter {
        ResourceRouter::new(
            self.package(package),
            base,
            self.names.clone(),
            self.counter.clone(),
            self.config.display.clone(),
        )
    }

    /// Check every live node for modified archives
    pub fn check_for_update(&self) -> bool {
        let mut changed = self.system.check_update();
        changed |= self.icons.check_update();
        changed |= self.lockscreen.check_update();
        for node in self.nodes.nodes() {
            changed |= node.check_update();
        }
        changed
    }

    /// Pick up a newly installed theme and announce it
    pub fn apply_theme(&self, flags: ThemeChangeFlags) -> ThemeChange {
        let changed = self.check_for_update();
        info!("applying theme {:?}, archives changed {}", flags, changed);
        self.counter.advance(flags)
    }

    /// Announce removal of the theme, every aspect is affected
    pub fn reset_theme(&self) -> ThemeChange {
        self.apply_theme(ThemeChangeFlags::ALL)
    }

    pub fn invalidate_icon_cache(&self) {
        self.composer.invalidate();
    }
}
