// One-URL-per-line link files, one per category

use hacklinks_scanner::Category;
use std::collections::HashSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// The links of one category, seeded from its file and flushed back to it.
#[derive(Debug)]
pub struct LinkStore {
    path: PathBuf,
    links: Vec<String>,
    loaded: usize,
}

impl LinkStore {
    /// Load `path`, or start empty when it does not exist yet.
    ///
    /// Lines are kept verbatim (surrounding whitespace trimmed, blank lines
    /// skipped), duplicates included, unless `dedup` is set.
    pub fn open(path: impl Into<PathBuf>, dedup: bool) -> Result<Self> {
        let path = path.into();

        let mut links = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|source| StoreError::Read {
                path: path.clone(),
                source,
            })?;
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect()
        } else {
            debug!("No existing link file at {}", path.display());
            Vec::new()
        };

        if dedup {
            let before = links.len();
            let mut seen = HashSet::new();
            links.retain(|link: &String| seen.insert(link.clone()));
            if links.len() < before {
                info!(
                    "Dropped {} duplicate links from {}",
                    before - links.len(),
                    path.display()
                );
            }
        }

        let loaded = links.len();
        Ok(Self {
            path,
            links,
            loaded,
        })
    }

    /// The store for `category` inside `output_dir`.
    pub fn for_category(output_dir: &Path, category: Category, dedup: bool) -> Result<Self> {
        Self::open(output_dir.join(category.file_name()), dedup)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn links(&self) -> &[String] {
        &self.links
    }

    /// Append-only handle for a collection run.
    pub fn links_mut(&mut self) -> &mut Vec<String> {
        &mut self.links
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Links present when the store was opened.
    pub fn loaded(&self) -> usize {
        self.loaded
    }

    /// Links added since the store was opened.
    pub fn new_links(&self) -> usize {
        self.links.len().saturating_sub(self.loaded)
    }

    /// Write every link, one per line, replacing the file atomically.
    pub fn save(&self) -> Result<()> {
        let write_err = |source| StoreError::Write {
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
        {
            let mut writer = io::BufWriter::new(tmp.as_file_mut());
            for link in &self.links {
                writeln!(writer, "{}", link).map_err(write_err)?;
            }
            writer.flush().map_err(write_err)?;
        }
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(&self.path).map_err(|e| write_err(e.error))?;

        info!("Saved {} links to {}", self.links.len(), self.path.display());
        Ok(())
    }

    pub fn exists(path: &Path) -> bool {
        path.exists()
    }
}

/// Create the output directory (and parents) if missing.
pub fn create_output_directory(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|source| StoreError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })?;
    debug!("Output directory ready at {}", dir.display());
    Ok(())
}

/// Number of lines in a file, 0 when it is missing or unreadable.
pub fn count_lines(path: &Path) -> usize {
    if !path.exists() {
        return 0;
    }
    match fs::read_to_string(path) {
        Ok(content) => content.lines().count(),
        Err(e) => {
            warn!("Error counting lines in {}: {}", path.display(), e);
            0
        }
    }
}
