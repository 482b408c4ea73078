use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, warn};
use parking_lot::{Mutex, RwLock};
use phf::phf_map;

use crate::counter::{ThemeChange, ThemeChangeListener};
use crate::density::Density;
use crate::errors::ThemeError;
use crate::icon::cache::{CacheStats, IconCache};
use crate::icon::filter::ColorFilter;
use crate::icon::pixels::PixelBuffer;
use crate::node::{Cookie, ThemeResources};
use crate::resolver::ResourceId;

/// Icon edge length at mdpi
const ICON_BASE_SIZE: u32 = 72;

const MASK_LAYER: &str = "icon_mask.png";
const BACKGROUND_LAYER: &str = "icon_background.png";
const PATTERN_LAYER: &str = "icon_pattern.png";
const BORDER_LAYER: &str = "icon_border.png";
const FILTERS_FILE: &str = "filters.xml";

/// Activities whose themed icon is published under another activity's name
static ICON_ALIASES: phf::Map<&'static str, &'static str> = phf_map! {
    "com.android.dialer.DialtactsActivity" =>
        "com.android.contacts.activities.DialtactsActivity",
    "com.android.dialer.app.DialtactsActivity" =>
        "com.android.contacts.activities.DialtactsActivity",
    "com.android.dialer.main.impl.MainActivity" =>
        "com.android.contacts.activities.DialtactsActivity",
    "com.android.contacts.activities.TwelveKeyDialer" =>
        "com.android.contacts.activities.DialtactsActivity",
    "com.android.contacts.DialtactsContactsEntryActivity" =>
        "com.android.contacts.activities.PeopleActivity",
    "com.android.contacts.activities.ContactsFrontDoor" =>
        "com.android.contacts.activities.PeopleActivity",
};

/// Identity of a themed icon
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IconKey {
    pub package: String,
    /// Activity class, `None` for the application icon
    pub class_name: Option<String>,
    pub resource_id: ResourceId,
}

impl IconKey {
    pub fn new(package: &str, class_name: Option<&str>, resource_id: ResourceId) -> IconKey {
        IconKey {
            package: package.to_owned(),
            class_name: class_name.map(str::to_owned),
            resource_id,
        }
    }

    /// Candidate file names, most specific first
    fn names(&self) -> Vec<&str> {
        let mut names = Vec::with_capacity(4);
        if let Some(class_name) = &self.class_name {
            names.push(class_name.as_str());
            if let Some(alias) = ICON_ALIASES.get(class_name.as_str()) {
                names.push(*alias);
            }
        }
        names.push(self.package.as_str());
        if let Some(alias) = ICON_ALIASES.get(self.package.as_str()) {
            names.push(*alias);
        }
        names
    }
}

/// Overlay layers of the icon theme, scaled to the canvas
struct IconLayers {
    mask: Option<PixelBuffer>,
    background: Option<PixelBuffer>,
    pattern: Option<PixelBuffer>,
    border: Option<PixelBuffer>,
    filter: Option<ColorFilter>,
}

impl IconLayers {
    fn has_overlays(&self) -> bool {
        self.background.is_some() || self.pattern.is_some() || self.border.is_some()
    }
}

/// Edge length of composed icons for a display density
pub fn canvas_size(density_dpi: u16) -> u32 {
    // tvdpi icons are rendered at hdpi size
    let dpi = if density_dpi == Density::TV.dpi() {
        Density::High.dpi()
    } else {
        density_dpi
    };
    ((ICON_BASE_SIZE * dpi as u32) as f32 / 160.0).round() as u32
}

/// Produces themed application icons
///
/// Icons shipped by the theme are used as they are, everything else is the
/// application's own icon composed with the theme's overlay layers. Results
/// are cached until the next theme change.
pub struct IconComposer {
    icons: Arc<ThemeResources>,
    customized_icons_dir: PathBuf,
    canvas: u32,
    density_dir: String,
    layers: RwLock<Option<Arc<IconLayers>>>,
    cache: Mutex<IconCache<IconKey>>,
}

impl IconComposer {
    pub fn new(
        icons: Arc<ThemeResources>,
        customized_icons_dir: impl Into<PathBuf>,
        density_dpi: u16,
        cache_bytes: usize,
    ) -> IconComposer {
        let qualifier = icons
            .densities()
            .iter()
            .flatten()
            .next()
            .copied()
            .unwrap_or(Density::XHigh);

        IconComposer {
            icons,
            customized_icons_dir: customized_icons_dir.into(),
            canvas: canvas_size(density_dpi),
            density_dir: format!("res/drawable-{}/", qualifier),
            layers: RwLock::new(None),
            cache: Mutex::new(IconCache::new(cache_bytes)),
        }
    }

    #[inline]
    pub fn canvas(&self) -> u32 {
        self.canvas
    }

    /// Theme file by name, density folder first, then the archive root
    fn theme_file(&self, name: &str) -> Option<Vec<u8>> {
        self.icons
            .get_file_stream(Cookie::Package, &format!("{}{}", self.density_dir, name))
            .or_else(|| self.icons.get_file_stream(Cookie::Package, name))
    }

    fn load_layer(&self, name: &str) -> Option<PixelBuffer> {
        let data = self.theme_file(name)?;
        match PixelBuffer::decode(&data).and_then(|layer| layer.resize(self.canvas, self.canvas)) {
            Ok(layer) => Some(layer),
            Err(e) => {
                warn!("can't use icon layer {:?}: {}", name, e);
                None
            }
        }
    }

    fn load_filter(&self) -> Result<Option<ColorFilter>, ThemeError> {
        match self.theme_file(FILTERS_FILE) {
            Some(data) => Ok(Some(ColorFilter::parse(&data)?)),
            None => Ok(None),
        }
    }

    fn layers(&self) -> Arc<IconLayers> {
        if let Some(layers) = self.layers.read().as_ref() {
            return layers.clone();
        }

        let mut slot = self.layers.write();
        if let Some(layers) = slot.as_ref() {
            return layers.clone();
        }

        let filter = self.load_filter().unwrap_or_else(|e| {
            warn!("can't read icon filters: {}", e);
            None
        });

        let layers = Arc::new(IconLayers {
            mask: self.load_layer(MASK_LAYER),
            background: self.load_layer(BACKGROUND_LAYER),
            pattern: self.load_layer(PATTERN_LAYER),
            border: self.load_layer(BORDER_LAYER),
            filter,
        });
        debug!(
            "icon layers loaded, overlays {}, mask {}, filter {}",
            layers.has_overlays(),
            layers.mask.is_some(),
            layers.filter.is_some()
        );

        *slot = Some(layers.clone());
        layers
    }

    /// Compose a base icon with the theme's layers
    ///
    /// The base is scaled to the canvas and cut by the mask, then stacked as
    /// background, pattern, base, border. Without overlay layers the color
    /// filter is applied to the base instead.
    pub fn compose(&self, base: &PixelBuffer) -> Result<PixelBuffer, ThemeError> {
        let layers = self.layers();
        let mut canvas = PixelBuffer::new(self.canvas, self.canvas)?;
        let mut icon = base.resize(self.canvas, self.canvas)?;

        if let Some(mask) = &layers.mask {
            icon.mask_alpha(mask);
        }
        if !layers.has_overlays() {
            if let Some(filter) = &layers.filter {
                icon.apply_filter(filter);
            }
        }

        if let Some(background) = &layers.background {
            canvas.draw(background, 0, 0);
        }
        if let Some(pattern) = &layers.pattern {
            canvas.draw(pattern, 0, 0);
        }
        canvas.draw(&icon, 0, 0);
        if let Some(border) = &layers.border {
            canvas.draw(border, 0, 0);
        }

        Ok(canvas)
    }

    /// Icon shipped by the theme or placed by the user for `key`
    fn prebuilt(&self, key: &IconKey) -> Option<Vec<u8>> {
        let names = key.names();

        for name in &names {
            if let Some(data) = self.theme_file(&format!("{}.png", name)) {
                debug!("themed icon {:?} for {}", name, key.package);
                return Some(data);
            }
        }

        for name in &names {
            let path = self.customized_icons_dir.join(name);
            if let Ok(data) = fs::read(&path) {
                debug!("customized icon {:?}", path);
                return Some(data);
            }
        }

        None
    }

    fn build(
        &self,
        key: &IconKey,
        base: Option<&[u8]>,
    ) -> Result<Option<PixelBuffer>, ThemeError> {
        if let Some(data) = self.prebuilt(key) {
            let icon = PixelBuffer::decode(&data)?;
            return icon.resize(self.canvas, self.canvas).map(Some);
        }

        match base {
            Some(data) => self.compose(&PixelBuffer::decode(data)?).map(Some),
            None => Ok(None),
        }
    }

    /// Themed icon for `key`, `base` is the encoded original icon
    ///
    /// `None` means the original icon should be used as it is.
    pub fn themed_icon(&self, key: &IconKey, base: Option<&[u8]>) -> Option<Arc<PixelBuffer>> {
        let generation = {
            let mut cache = self.cache.lock();
            if let Some(icon) = cache.get(key) {
                return Some(icon);
            }
            cache.generation()
        };

        match self.build(key, base) {
            Ok(Some(icon)) => Some(
                self.cache
                    .lock()
                    .insert_at(generation, key.clone(), Arc::new(icon)),
            ),
            Ok(None) => None,
            Err(e) => {
                warn!("can't theme icon of {}: {}", key.package, e);
                None
            }
        }
    }

    /// Reload the icons archive and forget composed icons and loaded layers
    ///
    /// The cache is cleared last, builds that started before it are not
    /// stored.
    pub fn invalidate(&self) {
        let changed = self.icons.check_update();
        *self.layers.write() = None;
        self.cache.lock().clear();
        debug!("icon cache invalidated, icons archive changed {}", changed);
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.lock().stats()
    }
}

impl ThemeChangeListener for IconComposer {
    fn theme_changed(&self, _change: ThemeChange) {
        self.invalidate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ThemeArchive;
    use crate::density::{DensitySlot, best_density_order};
    use crate::errors::ValuesError;
    use crate::node::{NodeContext, Role};
    use crate::resolver::ResourceTable;
    use crate::test_utils::{bump_mtime, solid_png, write_archive};
    use std::path::Path;
    use theme_overlay_zip::testing::ZipBuilder;

    const CANVAS: u32 = 144;
    const BLUE: [u8; 4] = [0, 0, 255, 255];
    const GREEN: [u8; 4] = [0, 255, 0, 255];
    const RED: [u8; 4] = [255, 0, 0, 255];

    fn composer_with(
        root: &Path,
        customized: &Path,
        densities: Vec<DensitySlot>,
    ) -> IconComposer {
        let context = NodeContext {
            resolver: Arc::new(ResourceTable::new()),
            densities: densities.into(),
        };
        let archive = Arc::new(ThemeArchive::new(root.join("icons"), "icons"));
        let icons = ThemeResources::new(Role::Icons, archive, None, None, context);
        IconComposer::new(icons, customized, 320, 1024 * 1024)
    }

    fn composer(root: &Path, customized: &Path) -> IconComposer {
        composer_with(root, customized, best_density_order(320))
    }

    fn layered_theme() -> ZipBuilder {
        layered_theme_with(BLUE)
    }

    /// Mask with a transparent top left corner over a solid background
    fn layered_theme_with(background: [u8; 4]) -> ZipBuilder {
        let mut mask = image::RgbaImage::from_pixel(8, 8, image::Rgba([0, 0, 0, 255]));
        mask.put_pixel(0, 0, image::Rgba([0, 0, 0, 0]));
        let mut mask_png = std::io::Cursor::new(Vec::new());
        mask.write_to(&mut mask_png, image::ImageFormat::Png).unwrap();

        ZipBuilder::new()
            .stored("res/drawable-xhdpi/icon_mask.png", &mask_png.into_inner())
            .stored("res/drawable-xhdpi/icon_background.png", &solid_png(8, background))
            .stored("icon_border.png", &solid_png(8, [0, 0, 0, 0]))
    }

    #[test]
    fn canvas_sizes() {
        assert_eq!(canvas_size(160), 72);
        assert_eq!(canvas_size(240), 108);
        assert_eq!(canvas_size(213), 108);
        assert_eq!(canvas_size(320), 144);
        assert_eq!(canvas_size(480), 216);
    }

    #[test]
    fn compose_with_layers() {
        let dir = tempfile::tempdir().unwrap();
        write_archive(&dir.path().join("icons"), layered_theme());
        let composer = composer(dir.path(), &dir.path().join("customized"));

        let base = PixelBuffer::decode(&solid_png(48, [255, 0, 0, 255])).unwrap();
        let icon = composer.compose(&base).unwrap();

        assert_eq!((icon.width(), icon.height()), (CANVAS, CANVAS));
        // base shows where the mask is opaque
        assert_eq!(icon.get(CANVAS / 2, CANVAS / 2), Some([255, 0, 0, 255]));
        // masked out corner shows the background
        assert_eq!(icon.get(0, 0), Some([0, 0, 255, 255]));
    }

    #[test]
    fn compose_plain_with_filter() {
        let dir = tempfile::tempdir().unwrap();
        write_archive(
            &dir.path().join("icons"),
            ZipBuilder::new().stored(
                "filters.xml",
                br#"<filters><filter name="saturation" value="0"/></filters>"#,
            ),
        );
        let composer = composer(dir.path(), &dir.path().join("customized"));

        let base = PixelBuffer::decode(&solid_png(48, [255, 0, 0, 255])).unwrap();
        let icon = composer.compose(&base).unwrap();
        assert_eq!(icon.get(5, 5), Some([54, 54, 54, 255]));
    }

    #[test]
    fn filter_is_skipped_with_overlays() {
        let dir = tempfile::tempdir().unwrap();
        write_archive(
            &dir.path().join("icons"),
            ZipBuilder::new()
                .stored("icon_background.png", &solid_png(8, BLUE))
                .stored(
                    "filters.xml",
                    br#"<filters><filter name="saturation" value="0"/></filters>"#,
                ),
        );
        let composer = composer(dir.path(), &dir.path().join("customized"));

        let base = PixelBuffer::decode(&solid_png(48, RED)).unwrap();
        let icon = composer.compose(&base).unwrap();
        assert_eq!(icon.get(5, 5), Some(RED));
    }

    #[test]
    fn broken_filters_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        write_archive(
            &dir.path().join("icons"),
            ZipBuilder::new().stored(
                "filters.xml",
                br#"<filters><filter name="alpha" value="0.5"></oops>"#,
            ),
        );
        let composer = composer(dir.path(), &dir.path().join("customized"));

        assert!(matches!(
            composer.load_filter(),
            Err(ThemeError::ValuesError(ValuesError::Malformed(_)))
        ));

        // the base is still composed, unfiltered
        let base = PixelBuffer::decode(&solid_png(48, RED)).unwrap();
        assert_eq!(composer.compose(&base).unwrap().get(5, 5), Some(RED));
    }

    #[test]
    fn layer_folder_follows_density_order() {
        let dir = tempfile::tempdir().unwrap();
        write_archive(
            &dir.path().join("icons"),
            layered_theme_with(BLUE)
                .stored("res/drawable-hdpi/icon_background.png", &solid_png(8, GREEN)),
        );
        let order = vec![Some(Density::High), Some(Density::XHigh), None];
        let composer = composer_with(dir.path(), &dir.path().join("customized"), order);

        let base = PixelBuffer::decode(&solid_png(48, RED)).unwrap();
        assert_eq!(composer.compose(&base).unwrap().get(0, 0), Some(GREEN));
    }

    #[test]
    fn invalidation_reloads_icons_archive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("icons");
        write_archive(&path, layered_theme_with(BLUE));
        let composer = composer(dir.path(), &dir.path().join("customized"));

        let base = solid_png(48, RED);
        let key = IconKey::new("com.example", None, 0x7f020000);
        let before = composer.themed_icon(&key, Some(base.as_slice())).unwrap();
        assert_eq!(before.get(0, 0), Some(BLUE));

        write_archive(&path, layered_theme_with(GREEN));
        bump_mtime(&path);
        composer.invalidate();

        let after = composer.themed_icon(&key, Some(base.as_slice())).unwrap();
        assert_eq!(after.get(0, 0), Some(GREEN));
        assert_eq!(after.get(CANVAS / 2, CANVAS / 2), Some(RED));
    }

    #[test]
    fn compose_is_deterministic_and_cached() {
        let dir = tempfile::tempdir().unwrap();
        write_archive(&dir.path().join("icons"), layered_theme());
        let composer = composer(dir.path(), &dir.path().join("customized"));

        let base = solid_png(48, [10, 200, 10, 255]);
        let key = IconKey::new("com.example", Some("com.example.Main"), 0x7f020000);

        let first = composer.themed_icon(&key, Some(base.as_slice())).unwrap();
        let second = composer.themed_icon(&key, Some(base.as_slice())).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let direct = composer
            .compose(&PixelBuffer::decode(&base).unwrap())
            .unwrap();
        assert_eq!(direct.as_bytes(), first.as_bytes());

        let stats = composer.cache_stats();
        assert_eq!((stats.hits, stats.misses, stats.entries), (1, 1, 1));
    }

    #[test]
    fn invalidation_recomputes() {
        let dir = tempfile::tempdir().unwrap();
        write_archive(&dir.path().join("icons"), layered_theme());
        let composer = composer(dir.path(), &dir.path().join("customized"));

        let base = solid_png(48, [10, 200, 10, 255]);
        let key = IconKey::new("com.example", None, 0x7f020000);

        let before = composer.themed_icon(&key, Some(base.as_slice())).unwrap();
        composer.theme_changed(ThemeChange {
            version: 1,
            flags: crate::counter::ThemeChangeFlags::ICONS,
        });
        assert_eq!(composer.cache_stats().entries, 0);

        let after = composer.themed_icon(&key, Some(base.as_slice())).unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(before.as_bytes(), after.as_bytes());
    }

    #[test]
    fn prebuilt_icons_win() {
        let dir = tempfile::tempdir().unwrap();
        let customized = dir.path().join("customized");
        write_archive(
            &dir.path().join("icons"),
            layered_theme().stored(
                "res/drawable-xxhdpi/com.android.contacts.activities.DialtactsActivity.png",
                &solid_png(16, [1, 2, 3, 255]),
            ),
        );
        fs::create_dir_all(&customized).unwrap();
        fs::write(customized.join("com.example.notes"), solid_png(16, [4, 5, 6, 255])).unwrap();

        let composer = composer(dir.path(), &customized);

        // alias resolved through the icons archive, density substituted
        let dialer = IconKey::new(
            "com.android.dialer",
            Some("com.android.dialer.DialtactsActivity"),
            1,
        );
        let icon = composer.themed_icon(&dialer, None).unwrap();
        assert_eq!(icon.width(), CANVAS);
        assert_eq!(icon.get(3, 3), Some([1, 2, 3, 255]));

        // user placed override
        let notes = IconKey::new("com.example.notes", None, 2);
        let icon = composer.themed_icon(&notes, None).unwrap();
        assert_eq!(icon.get(3, 3), Some([4, 5, 6, 255]));
    }

    #[test]
    fn failures_are_absent() {
        let dir = tempfile::tempdir().unwrap();
        let composer = composer(&dir.path().join("missing"), &dir.path().join("customized"));

        let key = IconKey::new("com.example", None, 1);
        assert!(composer.themed_icon(&key, None).is_none());
        assert!(composer.themed_icon(&key, Some(&b"not an image"[..])).is_none());

        // no theme at all still composes the plain base icon
        let icon = composer
            .themed_icon(&key, Some(solid_png(10, [9, 9, 9, 255]).as_slice()))
            .unwrap();
        assert_eq!(icon.get(0, 0), Some([9, 9, 9, 255]));
    }
}
