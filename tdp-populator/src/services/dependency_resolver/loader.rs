//! Process-wide library loading
//!
//! Loading a library mutates global process state: symbols stay resolvable
//! until the handle drops and the loader's handles live as long as the loader.
//! Two population runs must not load dependencies concurrently in the same
//! process.

use libloading::Library;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// Loads a staged library into the running process
pub trait LibraryLoader: Send + Sync {
    /// Load the library at `path`
    ///
    /// `image` is the file content read from `path` just before the call. It
    /// only proves the staged file is readable and non-empty; the library is
    /// always opened from `path`, since the dynamic linker cannot map a
    /// library from memory.
    fn load(&self, path: &Path, image: &[u8]) -> io::Result<()>;
}

/// Loader backed by the platform dynamic linker
///
/// Handles are retained, so a library loaded twice through the same loader is
/// only opened once.
#[derive(Default)]
pub struct DynamicLibraryLoader {
    loaded: Mutex<HashMap<PathBuf, Library>>,
}

impl DynamicLibraryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn loaded_count(&self) -> usize {
        match self.loaded.lock() {
            Ok(loaded) => loaded.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }
}

impl LibraryLoader for DynamicLibraryLoader {
    fn load(&self, path: &Path, image: &[u8]) -> io::Result<()> {
        if image.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("empty library image: {}", path.display()),
            ));
        }

        let mut loaded = match self.loaded.lock() {
            Ok(loaded) => loaded,
            Err(poisoned) => poisoned.into_inner(),
        };

        if loaded.contains_key(path) {
            debug!(path = %path.display(), "Library already loaded");
            return Ok(());
        }

        // SAFETY: staged libraries come from the configured library folder and
        // their initialisers are trusted the same way the import engine is.
        let library = unsafe { Library::new(path) }
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

        debug!(path = %path.display(), bytes = image.len(), "Library loaded");
        loaded.insert(path.to_path_buf(), library);
        Ok(())
    }
}
