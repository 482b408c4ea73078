use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use log::debug;

use crate::config::DisplayMetrics;
use crate::counter::ThemeChangeCounter;
use crate::dimension::{complex_to_dimension, complex_to_dimension_pixel_size};
use crate::node::{Cookie, FRAMEWORK_PACKAGE, ThemeResources};
use crate::resolver::{EntryNameResolver, ResourceId};

/// Un-themed resources of an application
pub trait BaseResources: Send + Sync {
    fn integer(&self, id: ResourceId) -> Option<i32>;

    /// Dimension in pixels
    fn dimension(&self, id: ResourceId) -> Option<f32>;

    fn text(&self, id: ResourceId) -> Option<String>;

    /// Path of the drawable file inside the application, `res/drawable-hdpi/x.png`
    fn drawable_path(&self, id: ResourceId) -> Option<String>;

    fn open_drawable(&self, id: ResourceId) -> Option<Vec<u8>>;
}

/// Drawable handed out by the router
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Drawable {
    /// Value override turning the drawable into a plain color
    Color(u32),
    /// Encoded image, themed or original
    Image(Vec<u8>),
}

/// Themed view on an application's resources
///
/// Every lookup asks the node chain first and falls back to the original
/// resources. The chain is re-checked lazily, on the first lookup after the
/// theme counter moved.
pub struct ResourceRouter {
    node: Arc<ThemeResources>,
    base: Arc<dyn BaseResources>,
    names: Arc<dyn EntryNameResolver>,
    counter: Arc<ThemeChangeCounter>,
    metrics: DisplayMetrics,
    seen: AtomicU64,
}

impl ResourceRouter {
    pub fn new(
        node: Arc<ThemeResources>,
        base: Arc<dyn BaseResources>,
        names: Arc<dyn EntryNameResolver>,
        counter: Arc<ThemeChangeCounter>,
        metrics: DisplayMetrics,
    ) -> ResourceRouter {
        let seen = AtomicU64::new(counter.version());
        ResourceRouter {
            node,
            base,
            names,
            counter,
            metrics,
            seen,
        }
    }

    #[inline]
    pub fn node(&self) -> &Arc<ThemeResources> {
        &self.node
    }

    fn refresh(&self) {
        let version = self.counter.version();
        let seen = self.seen.load(Ordering::Acquire);
        if seen >= version {
            return;
        }

        if self
            .seen
            .compare_exchange(seen, version, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            let changed = self.node.check_update();
            debug!(
                "router for {} refreshed to version {}, changed {}",
                self.node.package(),
                version,
                changed
            );
        }
    }

    pub fn integer(&self, id: ResourceId) -> Option<i32> {
        self.refresh();
        self.node.get_int(id).or_else(|| self.base.integer(id))
    }

    /// ARGB color
    pub fn color(&self, id: ResourceId) -> Option<u32> {
        self.integer(id).map(|v| v as u32)
    }

    pub fn boolean(&self, id: ResourceId) -> Option<bool> {
        self.integer(id).map(|v| v != 0)
    }

    /// Dimension in pixels
    pub fn dimension(&self, id: ResourceId) -> Option<f32> {
        self.refresh();
        match self.node.get_int(id) {
            Some(complex) => Some(complex_to_dimension(complex as u32, &self.metrics)),
            None => self.base.dimension(id),
        }
    }

    /// Dimension rounded to whole pixels, non-zero values stay non-zero
    pub fn dimension_pixel_size(&self, id: ResourceId) -> Option<i32> {
        self.refresh();
        match self.node.get_int(id) {
            Some(complex) => Some(complex_to_dimension_pixel_size(
                complex as u32,
                &self.metrics,
            )),
            None => self.base.dimension(id).map(|px| {
                let rounded = px.round() as i32;
                match rounded {
                    0 if px > 0.0 => 1,
                    0 if px < 0.0 => -1,
                    v => v,
                }
            }),
        }
    }

    pub fn text(&self, id: ResourceId) -> Option<String> {
        self.refresh();
        self.node.get_text(id).or_else(|| self.base.text(id))
    }

    /// Drawable for `id`: color override, themed file or the original file
    pub fn open_drawable(&self, id: ResourceId) -> Option<Drawable> {
        self.refresh();

        if let Some(color) = self.node.get_int(id) {
            return Some(Drawable::Color(color as u32));
        }

        let themed = self.base.drawable_path(id).and_then(|path| {
            let cookie = match self.names.entry_name(id) {
                Some(name) if name.package == FRAMEWORK_PACKAGE => Cookie::Framework,
                _ => Cookie::Package,
            };
            self.node.get_file_stream(cookie, &path)
        });

        themed
            .or_else(|| self.base.open_drawable(id))
            .map(Drawable::Image)
    }

    pub fn has_theme_values(&self) -> bool {
        self.refresh();
        self.node.has_values()
    }
}
