use log::{debug, info};
use std::fs::{self, File};
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use zip::ZipArchive;

use crate::config::Layout;
use crate::error::{InitError, StoreError};

/// Folder created by `init` inside the chosen parent directory.
pub const COLLECTION_DIR: &str = "zettelkasten";

fn target(parent: &Path) -> Result<PathBuf, InitError> {
    let target = parent.join(COLLECTION_DIR);
    if target.exists() {
        return Err(InitError::Exists(target));
    }
    Ok(target)
}

/// Creates an empty collection: the zettel folder, an empty index and an
/// empty bibliography.
pub fn init_empty(parent: &Path, layout: &Layout) -> Result<PathBuf, InitError> {
    let target = target(parent)?;
    let zettel = target.join(&layout.zettel_dir);
    fs::create_dir_all(&zettel).map_err(|e| StoreError::io(&zettel, e))?;
    for name in [&layout.index_file, &layout.references_file] {
        let path = target.join(name);
        fs::write(&path, "").map_err(|e| StoreError::io(&path, e))?;
    }
    info!("created empty collection at {}", target.display());
    Ok(target)
}

/// Downloads the example collection from `url` and unpacks it.
pub fn init_example(parent: &Path, url: &str) -> Result<PathBuf, InitError> {
    target(parent)?;
    debug!("downloading {url}");
    let response = reqwest::blocking::get(url)?;
    if !response.status().is_success() {
        return Err(InitError::Status(response.status().as_u16()));
    }
    let bytes = response.bytes()?;
    extract_example(&bytes, parent)
}

/// Unpacks a zip whose entries share one top folder into `parent/zettelkasten`.
pub fn extract_example(data: &[u8], parent: &Path) -> Result<PathBuf, InitError> {
    let target = target(parent)?;
    let mut archive = ZipArchive::new(Cursor::new(data))?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let Some(enclosed) = entry.enclosed_name() else {
            return Err(InitError::UnsafeEntry(entry.name().to_string()));
        };
        // drop the archive's top folder, e.g. `zet_example-main/`
        let relative: PathBuf = enclosed.components().skip(1).collect();
        if relative.as_os_str().is_empty() {
            continue;
        }
        let out = target.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out).map_err(|e| StoreError::io(&out, e))?;
            continue;
        }
        if let Some(dir) = out.parent() {
            fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;
        }
        let mut file = File::create(&out).map_err(|e| StoreError::io(&out, e))?;
        io::copy(&mut entry, &mut file).map_err(|e| StoreError::io(&out, e))?;
    }

    info!("unpacked example collection to {}", target.display());
    Ok(target)
}
