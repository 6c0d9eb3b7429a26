//! Recently opened files, persisted as JSON in the home directory

use std::fs;
use std::path::{Path, PathBuf};

/// How many entries the list keeps.
const MAX_ENTRIES: usize = 10;

/// Ordered list of recently opened documents, most recent first.
#[derive(Debug)]
pub struct RecentFiles {
    entries: Vec<PathBuf>,
    file_path: Option<PathBuf>,
}

impl RecentFiles {
    /// In-memory list that never touches disk.
    #[must_use]
    pub fn ephemeral() -> Self {
        Self {
            entries: Vec::new(),
            file_path: None,
        }
    }

    #[must_use]
    pub fn with_file(file_path: PathBuf) -> Self {
        Self {
            entries: Vec::new(),
            file_path: Some(file_path),
        }
    }

    /// Default location: `~/.pdfsnip_recent.json`.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".pdfsnip_recent.json"))
    }

    /// Load from the given file, degrading to an empty list on any error.
    pub fn load_or_ephemeral(file_path: Option<PathBuf>) -> Self {
        match file_path {
            Some(path) => Self::load_from_file(&path).unwrap_or_else(|e| {
                log::error!("Failed to load recent files from {}: {e}", path.display());
                Self::with_file(path)
            }),
            None => Self::ephemeral(),
        }
    }

    pub fn load_from_file(file_path: &Path) -> anyhow::Result<Self> {
        if !file_path.exists() {
            return Ok(Self::with_file(file_path.to_path_buf()));
        }
        let content = fs::read_to_string(file_path)?;
        let entries: Vec<PathBuf> = serde_json::from_str(&content)?;
        Ok(Self {
            // Entries whose files have disappeared are dropped on load.
            entries: entries.into_iter().filter(|p| p.exists()).collect(),
            file_path: Some(file_path.to_path_buf()),
        })
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let Some(path) = &self.file_path else {
            return Ok(());
        };
        let content = serde_json::to_string(&self.entries)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Record a newly opened file, moving it to the top when already known.
    pub fn add(&mut self, path: &Path) {
        let absolute = path
            .canonicalize()
            .unwrap_or_else(|_| path.to_path_buf());
        self.entries.retain(|p| p != &absolute);
        self.entries.insert(0, absolute);
        self.entries.truncate(MAX_ENTRIES);
        if let Err(e) = self.save() {
            log::error!("Failed to save recent files: {e}");
        }
    }

    #[must_use]
    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
