use ahash::AHashMap;
use log::{debug, info};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::collection::{Collection, LabelKind};
use crate::error::StoreError;
use crate::note::{Identity, Index, Note};
use crate::store::ContentStore;

#[derive(Serialize)]
struct ExportedNote<'a> {
    #[serde(flatten)]
    note: &'a Note,
    folgezettel: &'a [Identity],
}

#[derive(Serialize)]
struct Dump<'a> {
    zettel: Vec<ExportedNote<'a>>,
    index: &'a Index,
    bibkeys: &'a BTreeSet<String>,
}

/// `label;frequency` lines, sorted.
fn frequencies<'a>(labels: impl IntoIterator<Item = &'a str>) -> String {
    let mut counts: AHashMap<&str, usize> = AHashMap::new();
    for label in labels {
        *counts.entry(label).or_default() += 1;
    }
    let mut lines: Vec<String> = counts
        .into_iter()
        .map(|(label, n)| format!("{label};{n}"))
        .collect();
    lines.sort();
    lines.into_iter().map(|l| l + "\n").collect()
}

/// Deepest chain below every root that no index topic points to.
fn unindexed(collection: &Collection) -> String {
    let indexed: BTreeSet<&Identity> = collection.index().values().flatten().collect();
    let mut depths: BTreeMap<Identity, usize> = BTreeMap::new();
    for note in collection.all_notes() {
        match collection.chain_root(&note.identity) {
            Some((root, depth)) if depth > 0 && !indexed.contains(&root) => {
                let deepest = depths.entry(root).or_default();
                *deepest = (*deepest).max(depth);
            }
            Some(_) => {}
            None => debug!("predecessors of {} form a loop", note.identity),
        }
    }
    depths
        .into_iter()
        .map(|(root, depth)| format!("{root};{depth}\n"))
        .collect()
}

fn dump(collection: &Collection) -> serde_json::Result<String> {
    let zettel = collection
        .all_notes()
        .iter()
        .map(|note| ExportedNote {
            note,
            folgezettel: collection.forward_links(&note.identity),
        })
        .collect();
    serde_json::to_string_pretty(&Dump {
        zettel,
        index: collection.index(),
        bibkeys: collection.bibkeys(),
    })
}

/// Writes statistics and a JSON dump of the collection to `export_dir`.
/// Returns the written paths.
pub fn export(
    store: &dyn ContentStore,
    collection: &Collection,
    export_dir: &str,
) -> Result<Vec<PathBuf>, StoreError> {
    let dir = Path::new(export_dir);
    if store.path_exists(dir) {
        return Err(StoreError::Exists(dir.to_path_buf()));
    }

    let json = dump(collection).map_err(|e| StoreError::io(dir.join("zettelkasten.json"), e.into()))?;
    let files = [
        (
            "ids.csv",
            frequencies(collection.all_notes().iter().map(|n| n.identity.as_str())),
        ),
        (
            "keywords.csv",
            frequencies(collection.label_occurrences(LabelKind::Keyword)),
        ),
        (
            "context.csv",
            frequencies(collection.label_occurrences(LabelKind::Context)),
        ),
        (
            "references.csv",
            frequencies(collection.label_occurrences(LabelKind::Reference)),
        ),
        (
            "bibkeys.csv",
            frequencies(collection.bibkeys().iter().map(String::as_str)),
        ),
        ("unindexed.csv", unindexed(collection)),
        ("zettelkasten.json", json),
    ];

    let mut written = Vec::with_capacity(files.len());
    for (name, content) in files {
        let path = dir.join(name);
        store.write_file(&path, &content)?;
        written.push(path);
    }
    info!("exported {} files to {export_dir}", written.len());
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::tests::collection;
    use crate::store::tests::MemoryStore;

    fn sample() -> Collection {
        collection(
            &[
                "190119e - Komplexität - clausen2021 3.txt",
                "190119d - Testing, Komplexität - clausen2021 87 - 190119e.txt",
                "180522a - Tiefe - Marco Fitz - 190119d.png",
                "210101a - Anfang.txt",
                "210101b - Weiter - 210101a.txt",
                "220101a - Loop - 220101b.txt",
                "220101b - Loop - 220101a.txt",
            ],
            &[("Komplexität", &["190119e"])],
            &["clausen2021", "adler1972"],
        )
    }

    #[test]
    fn test_frequencies() {
        assert_eq!(frequencies(["b", "a", "b"]), "a;1\nb;2\n");
        assert_eq!(frequencies(Vec::<&str>::new()), "");
    }

    #[test]
    fn test_unindexed_roots() {
        assert_eq!(unindexed(&sample()), "210101a;1\n");
    }

    #[test]
    fn test_export_files() {
        let store = MemoryStore::default();
        let written = export(&store, &sample(), "EXPORT").unwrap();
        assert_eq!(written.len(), 7);

        let files = store.files.borrow();
        assert_eq!(
            files[Path::new("EXPORT/keywords.csv")],
            "Anfang;1\nKomplexität;2\nLoop;2\nTesting;1\nTiefe;1\nWeiter;1\n"
        );
        assert_eq!(files[Path::new("EXPORT/references.csv")], "clausen2021;2\n");
        assert_eq!(files[Path::new("EXPORT/context.csv")], "Marco Fitz;1\n");
        assert_eq!(files[Path::new("EXPORT/bibkeys.csv")], "adler1972;1\nclausen2021;1\n");
        assert!(files[Path::new("EXPORT/ids.csv")].starts_with("180522a;1\n190119d;1\n"));

        let json: serde_json::Value =
            serde_json::from_str(&files[Path::new("EXPORT/zettelkasten.json")]).unwrap();
        assert_eq!(json["zettel"].as_array().unwrap().len(), 7);
        assert_eq!(json["zettel"][2]["identity"], "190119e");
        assert_eq!(json["zettel"][2]["folgezettel"], serde_json::json!(["190119d"]));
        assert_eq!(json["index"]["Komplexität"], serde_json::json!(["190119e"]));
    }

    #[test]
    fn test_export_refuses_existing_dir() {
        let store = MemoryStore::default();
        store
            .files
            .borrow_mut()
            .insert(PathBuf::from("EXPORT/ids.csv"), String::new());
        assert!(matches!(
            export(&store, &sample(), "EXPORT"),
            Err(StoreError::Exists(_))
        ));
    }
}
