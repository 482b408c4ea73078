use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::SystemTime;

use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};
use theme_overlay_zip::{WILDCARD_MARKER, ZipEntry};

use crate::errors::ThemeError;

/// What the archive looked like on disk when it was last opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp {
    modified: Option<SystemTime>,
    len: u64,
}

impl FileStamp {
    fn of(path: &Path) -> Option<FileStamp> {
        let metadata = fs::metadata(path).ok()?;
        if !metadata.is_file() {
            return None;
        }

        Some(FileStamp {
            modified: metadata.modified().ok(),
            len: metadata.len(),
        })
    }
}

#[derive(Default)]
struct ArchiveState {
    /// `false` until the first update check ran
    checked: bool,
    stamp: Option<FileStamp>,
    zip: Option<ZipEntry>,
}

/// One theme component archive on disk
///
/// The handle is absent when the file is missing or corrupt, such an archive
/// behaves as an empty one. Reloads take the write lock, so readers never see
/// a half replaced handle.
pub struct ThemeArchive {
    path: PathBuf,
    package: String,
    state: RwLock<ArchiveState>,
    /// Bumped on every (re)open or close
    generation: AtomicU64,
}

impl ThemeArchive {
    pub fn new(path: impl Into<PathBuf>, package: impl Into<String>) -> ThemeArchive {
        ThemeArchive {
            path: path.into(),
            package: package.into(),
            state: RwLock::new(ArchiveState::default()),
            generation: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Package the archive's values belong to when they don't say otherwise
    #[inline]
    pub fn package(&self) -> &str {
        &self.package
    }

    /// Reopen the archive if the file changed since the last check
    ///
    /// Returns `true` when the handle was (re)opened or closed, which includes
    /// the very first check.
    pub fn check_for_update(&self) -> bool {
        let current = FileStamp::of(&self.path);

        {
            let state = self.state.read();
            if state.checked && state.stamp == current {
                return false;
            }
        }

        let mut state = self.state.write();
        // somebody else could reload while we were waiting for the lock
        if state.checked && state.stamp == current {
            return false;
        }

        state.zip = None;
        state.stamp = current;
        state.checked = true;

        if current.is_some() {
            match Self::open(&self.path) {
                Ok(zip) => {
                    info!("opened theme archive {:?} ({} entries)", self.path, zip.len());
                    state.zip = Some(zip);
                }
                Err(e) => warn!("can't open theme archive {:?}: {}", self.path, e),
            }
        } else {
            debug!("theme archive {:?} is absent", self.path);
        }

        self.generation.fetch_add(1, Ordering::AcqRel);
        true
    }

    /// Number of handle changes so far, lets several users of one archive
    /// notice a reload that somebody else triggered
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    fn open(path: &Path) -> Result<ZipEntry, ThemeError> {
        let data = fs::read(path)?;
        Ok(ZipEntry::new(data)?)
    }

    /// Archive was opened successfully and can serve entries
    pub fn is_open(&self) -> bool {
        self.state.read().zip.is_some()
    }

    /// Check that a name (or wildcard pattern) resolves to an entry
    pub fn contains(&self, name: &str) -> bool {
        let state = self.state.read();
        let Some(zip) = state.zip.as_ref() else {
            return false;
        };

        if name.contains(WILDCARD_MARKER) {
            zip.find_wildcard(name).is_some()
        } else {
            zip.contains(name)
        }
    }

    /// Read an entry, `None` when it is missing or unreadable
    pub fn read(&self, name: &str) -> Option<Vec<u8>> {
        let state = self.state.read();
        let zip = state.zip.as_ref()?;

        let name = if name.contains(WILDCARD_MARKER) {
            zip.find_wildcard(name)?
        } else {
            name
        };

        if !zip.contains(name) {
            return None;
        }

        match zip.read(name) {
            Ok(data) => Some(data),
            Err(e) => {
                warn!("can't read {:?} from {:?}: {}", name, self.path, e);
                None
            }
        }
    }

    /// Sorted entry names
    pub fn names(&self) -> Vec<String> {
        let state = self.state.read();
        let mut names: Vec<String> = state
            .zip
            .as_ref()
            .map(|zip| zip.namelist().map(str::to_owned).collect())
            .unwrap_or_default();
        names.sort();
        names
    }
}

/// Shares one [`ThemeArchive`] per path between all users
///
/// Holds weak references only: an archive lives as long as some node uses it.
#[derive(Default)]
pub struct ArchiveRegistry {
    archives: Mutex<HashMap<PathBuf, Weak<ThemeArchive>>>,
}

impl ArchiveRegistry {
    pub fn new() -> ArchiveRegistry {
        ArchiveRegistry::default()
    }

    /// Get the shared archive for `path`, creating it (unopened) if needed
    pub fn get_or_create(&self, path: &Path, package: &str) -> Arc<ThemeArchive> {
        let mut archives = self.archives.lock();

        if let Some(archive) = archives.get(path).and_then(Weak::upgrade) {
            return archive;
        }

        archives.retain(|_, archive| archive.strong_count() > 0);

        let archive = Arc::new(ThemeArchive::new(path, package));
        archives.insert(path.to_path_buf(), Arc::downgrade(&archive));
        archive
    }

    /// Number of archives still alive
    pub fn len(&self) -> usize {
        self.archives
            .lock()
            .values()
            .filter(|archive| archive.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
