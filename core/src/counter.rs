use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bitflags::bitflags;
use log::info;
use parking_lot::RwLock;

bitflags! {
    /// Aspects of the theme touched by an apply or reset
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ThemeChangeFlags: u32 {
        const FRAMEWORK = 1 << 0;
        const ICONS = 1 << 1;
        const FONTS = 1 << 2;
        const STATUSBAR = 1 << 3;
        const LAUNCHER = 1 << 4;
        const LOCKSCREEN = 1 << 5;
        const WALLPAPER = 1 << 6;
        const BOOT_ANIMATION = 1 << 7;
        const RINGTONES = 1 << 8;
        const APPLICATIONS = 1 << 9;

        const ALL = Self::FRAMEWORK.bits()
            | Self::ICONS.bits()
            | Self::FONTS.bits()
            | Self::STATUSBAR.bits()
            | Self::LAUNCHER.bits()
            | Self::LOCKSCREEN.bits()
            | Self::WALLPAPER.bits()
            | Self::BOOT_ANIMATION.bits()
            | Self::RINGTONES.bits()
            | Self::APPLICATIONS.bits();
    }
}

/// Broadcast payload of one counter advance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemeChange {
    pub version: u64,
    pub flags: ThemeChangeFlags,
}

/// Receives every theme change
pub trait ThemeChangeListener: Send + Sync {
    fn theme_changed(&self, change: ThemeChange);
}

/// Monotonic theme version plus the flags of the latest change
///
/// Consumers remember the version they built their caches for and compare it
/// with [`ThemeChangeCounter::version`] before trusting them again.
pub struct ThemeChangeCounter {
    version: AtomicU64,
    flags: RwLock<ThemeChangeFlags>,
    listeners: RwLock<Vec<Arc<dyn ThemeChangeListener>>>,
}

impl Default for ThemeChangeCounter {
    fn default() -> Self {
        ThemeChangeCounter::new()
    }
}

impl ThemeChangeCounter {
    pub fn new() -> ThemeChangeCounter {
        ThemeChangeCounter {
            version: AtomicU64::new(0),
            flags: RwLock::new(ThemeChangeFlags::empty()),
            listeners: RwLock::new(Vec::new()),
        }
    }

    #[inline]
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Flags of the most recent change
    pub fn flags(&self) -> ThemeChangeFlags {
        *self.flags.read()
    }

    #[inline]
    pub fn is_stale(&self, seen: u64) -> bool {
        seen < self.version()
    }

    pub fn subscribe(&self, listener: Arc<dyn ThemeChangeListener>) {
        self.listeners.write().push(listener);
    }

    /// Bump the version and notify all listeners
    pub fn advance(&self, flags: ThemeChangeFlags) -> ThemeChange {
        let change = {
            let mut current = self.flags.write();
            *current = flags;
            ThemeChange {
                version: self.version.fetch_add(1, Ordering::AcqRel) + 1,
                flags,
            }
        };

        info!(
            "theme changed, version {} flags {:?}",
            change.version, change.flags
        );

        let listeners = self.listeners.read().clone();
        for listener in listeners {
            listener.theme_changed(change);
        }

        change
    }
}
