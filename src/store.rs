use globset::GlobSet;
use log::{debug, info};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::catalog;
use crate::check::Inconsistency;
use crate::codec;
use crate::collection::Collection;
use crate::config::{Config, Layout};
use crate::error::StoreError;

/// Read/write/link primitives the operations need from a collection.
///
/// Paths passed in are relative to the collection root; note filenames are
/// relative to the zettel folder.
pub trait ContentStore {
    /// Filenames of all notes, sorted.
    fn list_note_files(&self) -> Result<Vec<String>, StoreError>;
    fn read_index(&self) -> Result<String, StoreError>;
    fn read_bibliography(&self) -> Result<String, StoreError>;
    /// Creates a new note file. Never overwrites.
    fn write_note(&self, filename: &str, content: &str) -> Result<(), StoreError>;
    fn write_file(&self, relative: &Path, content: &str) -> Result<(), StoreError>;
    /// Links the note file `target` to `link`, creating parent folders.
    fn create_link(&self, target: &str, link: &Path) -> Result<(), StoreError>;
    fn path_exists(&self, relative: &Path) -> bool;
}

/// A collection on disk.
pub struct FsStore {
    root: PathBuf,
    layout: Layout,
    ignore: GlobSet,
}

impl FsStore {
    pub fn open(root: &Path, config: &Config) -> Result<FsStore, StoreError> {
        let layout = config.layout.clone();
        let complete = root.join(&layout.zettel_dir).is_dir()
            && root.join(&layout.index_file).is_file()
            && root.join(&layout.references_file).is_file();
        if !complete {
            return Err(StoreError::NotACollection(root.to_path_buf()));
        }
        let ignore = config.ignore_set()?;
        Ok(FsStore {
            root: root.to_path_buf(),
            layout,
            ignore,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn zettel_dir(&self) -> PathBuf {
        self.root.join(&self.layout.zettel_dir)
    }

    fn read(&self, name: &str) -> Result<String, StoreError> {
        let path = self.root.join(name);
        fs::read_to_string(&path).map_err(|e| StoreError::io(path, e))
    }
}

fn create_parent(path: &Path) -> Result<(), StoreError> {
    match path.parent() {
        Some(dir) => fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e)),
        None => Ok(()),
    }
}

impl ContentStore for FsStore {
    fn list_note_files(&self) -> Result<Vec<String>, StoreError> {
        let dir = self.zettel_dir();
        let mut names = Vec::new();
        for entry in WalkDir::new(&dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| StoreError::Walk {
                path: dir.clone(),
                message: e.to_string(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str() else {
                debug!("skipping non UTF-8 filename {}", entry.path().display());
                continue;
            };
            if name.starts_with('.') || self.ignore.is_match(name) {
                continue;
            }
            names.push(name.to_string());
        }
        names.sort();
        Ok(names)
    }

    fn read_index(&self) -> Result<String, StoreError> {
        self.read(&self.layout.index_file)
    }

    fn read_bibliography(&self) -> Result<String, StoreError> {
        self.read(&self.layout.references_file)
    }

    fn write_note(&self, filename: &str, content: &str) -> Result<(), StoreError> {
        let path = self.zettel_dir().join(filename);
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::AlreadyExists => StoreError::Exists(path.clone()),
                _ => StoreError::io(&path, e),
            })?;
        file.write_all(content.as_bytes())
            .map_err(|e| StoreError::io(&path, e))
    }

    fn write_file(&self, relative: &Path, content: &str) -> Result<(), StoreError> {
        let path = self.root.join(relative);
        create_parent(&path)?;
        fs::write(&path, content).map_err(|e| StoreError::io(path, e))
    }

    fn create_link(&self, target: &str, link: &Path) -> Result<(), StoreError> {
        let original = self.zettel_dir().join(target);
        let link = self.root.join(link);
        create_parent(&link)?;
        fs::hard_link(&original, &link).map_err(|e| StoreError::io(link, e))
    }

    fn path_exists(&self, relative: &Path) -> bool {
        self.root.join(relative).exists()
    }
}

/// Reads and decodes the whole collection.
///
/// Undecodable filenames do not fail the load; they are recorded as
/// findings together with the decode and index defects.
pub fn load(store: &dyn ContentStore) -> Result<Collection, StoreError> {
    let mut notes = Vec::new();
    let mut findings = Vec::new();

    for name in store.list_note_files()? {
        match codec::decode(&name) {
            Ok(decoded) => {
                findings.extend(decoded.inconsistencies);
                notes.push(decoded.note);
            }
            Err(e) => {
                debug!("cannot decode {name:?}: {e}");
                findings.push(Inconsistency::MalformedFilename {
                    name,
                    reason: e.to_string(),
                });
            }
        }
    }

    let (index, index_findings) = catalog::parse_index(&store.read_index()?);
    findings.extend(index_findings);
    let bibkeys = catalog::parse_bibkeys(&store.read_bibliography()?);

    info!(
        "loaded {} notes, {} topics, {} bibkeys",
        notes.len(),
        index.len(),
        bibkeys.len()
    );
    Ok(Collection::build(notes, index, bibkeys).with_findings(findings))
}
