use ahash::AHashSet;
use ignore::WalkBuilder;
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};

use crate::check::Inconsistency;
use crate::codec;
use crate::error::{ImportError, ImportFailure, StoreError};
use crate::note::Identity;
use crate::store::ContentStore;

/// A text file waiting to become a note.
#[derive(Debug, Clone)]
pub struct Source {
    pub path: PathBuf,
    pub content: String,
}

#[derive(Debug, Default)]
pub struct Imported {
    /// Filenames written to the zettel folder, in source order.
    pub names: Vec<String>,
    /// Defects of the imported headers, e.g. more than one predecessor.
    pub warnings: Vec<Inconsistency>,
}

/// Reads every file below `dir` with one of `extensions`, sorted by path.
/// Hidden files and anything excluded by `.gitignore` are skipped.
pub fn read_sources(dir: &Path, extensions: &[String]) -> Result<Vec<Source>, StoreError> {
    let extensions: AHashSet<String> = extensions.iter().map(|e| e.to_lowercase()).collect();

    let mut builder = WalkBuilder::new(dir);
    builder.hidden(true).git_ignore(true).git_global(false);

    let mut sources = Vec::new();
    for entry in builder.build() {
        let entry = entry.map_err(|e| StoreError::Walk {
            path: dir.to_path_buf(),
            message: e.to_string(),
        })?;
        let path = entry.path();
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        if !extensions.contains(&ext) {
            debug!("not importing {}", path.display());
            continue;
        }
        let content = fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
        sources.push(Source {
            path: path.to_path_buf(),
            content,
        });
    }
    sources.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(sources)
}

/// Turns every source into a new note, or none of them.
///
/// Each accepted note reserves its identity before the next source is
/// encoded, so a batch never hands out the same identity twice.
pub fn import(store: &dyn ContentStore, sources: &[Source]) -> Result<Imported, ImportFailure> {
    let mut existing: AHashSet<Identity> = store
        .list_note_files()?
        .iter()
        .filter_map(|name| Identity::prefix_of(name))
        .collect();

    let mut batch = Vec::new();
    let mut warnings = Vec::new();
    let mut errors = Vec::new();

    for source in sources {
        match codec::encode_content(&source.content, &existing) {
            Ok(decoded) => {
                debug!("{} -> {}", source.path.display(), decoded.note.name);
                existing.insert(decoded.note.identity.clone());
                warnings.extend(decoded.inconsistencies);
                batch.push((decoded.note.name, source.content.as_str()));
            }
            Err(error) => errors.push(ImportError {
                source_path: source.path.clone(),
                error,
            }),
        }
    }

    if !errors.is_empty() {
        return Err(ImportFailure::Rejected(errors));
    }

    let mut names = Vec::with_capacity(batch.len());
    for (name, content) in batch {
        store.write_note(&name, content)?;
        names.push(name);
    }
    info!("imported {} notes", names.len());
    Ok(Imported { names, warnings })
}
