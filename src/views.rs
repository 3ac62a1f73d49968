//! Link structures over the zettel folder: the numbered index tree and the
//! flat per-label groups.

use log::info;
use std::path::{Path, PathBuf};

use crate::collection::{Collection, LabelKind};
use crate::error::{StoreError, ViewError};
use crate::note::{Identity, Note};
use crate::store::ContentStore;
use crate::tree::{path_component, Materializer, TreeLayout};

/// How many of the newest notes are checked for a missing predecessor.
const UNLINKED_WINDOW: usize = 20;
/// Keywords sharing this many leading characters count as similar.
const SIMILAR_PREFIX: usize = 5;

fn refuse_existing(store: &dyn ContentStore, dir: &str) -> Result<(), StoreError> {
    if store.path_exists(Path::new(dir)) {
        return Err(StoreError::Exists(PathBuf::from(dir)));
    }
    Ok(())
}

fn note<'c>(collection: &'c Collection, id: &Identity) -> Result<&'c Note, StoreError> {
    collection
        .lookup(id)
        .ok_or_else(|| StoreError::UnknownIdentity(id.clone()))
}

/// Links every index topic tree below `index_dir`. Returns the link count.
pub fn create_index(
    store: &dyn ContentStore,
    collection: &Collection,
    layout: &TreeLayout,
    index_dir: &str,
) -> Result<usize, ViewError> {
    refuse_existing(store, index_dir)?;
    let links = Materializer::new(collection, layout).materialize_index()?;
    for (path, id) in &links {
        let target = note(collection, id)?;
        store.create_link(&target.name, &Path::new(index_dir).join(path))?;
    }
    info!("created {} index links in {index_dir}", links.len());
    Ok(links.len())
}

/// Links every note into one folder per keyword, context and bibkey, plus
/// `unlinked/` for recent notes without a predecessor. Returns the link count.
pub fn create_views(
    store: &dyn ContentStore,
    collection: &Collection,
    views_dir: &str,
) -> Result<usize, ViewError> {
    refuse_existing(store, views_dir)?;
    let base = Path::new(views_dir);
    let mut count = 0;

    for kind in LabelKind::ALL {
        for (label, ids) in collection.notes_by_label(kind) {
            let dir = base.join(kind.dir_name()).join(path_component(&label));
            for id in &ids {
                let target = note(collection, id)?;
                store.create_link(&target.name, &dir.join(&target.name))?;
                count += 1;
            }
        }
    }

    for lonely in unlinked(collection) {
        let dir = base.join("unlinked").join(lonely.identity.as_str());
        store.create_link(&lonely.name, &dir.join(&lonely.name))?;
        count += 1;
        for kind in LabelKind::ALL {
            for id in similar(collection, lonely, kind) {
                let target = note(collection, &id)?;
                store.create_link(&target.name, &dir.join(kind.dir_name()).join(&target.name))?;
                count += 1;
            }
        }
    }

    info!("created {count} view links in {views_dir}");
    Ok(count)
}

/// Newest notes that do not continue any other note.
fn unlinked(collection: &Collection) -> impl Iterator<Item = &Note> {
    let notes = collection.all_notes();
    notes[notes.len().saturating_sub(UNLINKED_WINDOW)..]
        .iter()
        .filter(|n| n.predecessor.is_none())
}

/// Other notes sharing a label of `kind` with `note`, sorted and unique.
fn similar(collection: &Collection, note: &Note, kind: LabelKind) -> Vec<Identity> {
    let matches = |other: &Note| match kind {
        LabelKind::Keyword => note
            .keywords
            .iter()
            .any(|k| other.keywords.iter().any(|o| similar_keyword(k, o))),
        LabelKind::Context => note.context.iter().any(|c| other.context.contains(c)),
        LabelKind::Reference => note
            .references
            .iter()
            .any(|r| other.references.iter().any(|o| o.bibkey == r.bibkey)),
    };
    let mut ids: Vec<Identity> = collection
        .all_notes()
        .iter()
        .filter(|other| other.identity != note.identity && matches(*other))
        .map(|other| other.identity.clone())
        .collect();
    ids.dedup();
    ids
}

/// Equal on the first few characters, or on the whole shorter keyword.
fn similar_keyword(a: &str, b: &str) -> bool {
    let len = SIMILAR_PREFIX.min(a.chars().count()).min(b.chars().count());
    a.chars().take(len).eq(b.chars().take(len))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::tests::collection;
    use crate::error::MaterializeError;
    use crate::store::tests::MemoryStore;

    fn links(store: &MemoryStore) -> Vec<(String, String)> {
        store
            .links
            .borrow()
            .iter()
            .map(|(link, target)| (link.to_string_lossy().into_owned(), target.clone()))
            .collect()
    }

    #[test]
    fn test_create_index() {
        let c = collection(
            &[
                "190119e - Komplexität.txt",
                "190119d - Testing - 190119e.txt",
                "180522a - Tiefe - 190119d.png",
                "170224a - Polymorphismus - 190119d.png",
            ],
            &[("Komplexität", &["190119e"])],
            &[],
        );
        let store = MemoryStore::default();
        let n = create_index(&store, &c, &TreeLayout::default(), "INDEX").unwrap();
        assert_eq!(n, 4);
        assert_eq!(
            links(&store),
            vec![
                (
                    "INDEX/Komplexität/190119e/000 190119e - Komplexität.txt".to_string(),
                    "190119e - Komplexität.txt".to_string()
                ),
                (
                    "INDEX/Komplexität/190119e/001 190119d - Testing - 190119e.txt".to_string(),
                    "190119d - Testing - 190119e.txt".to_string()
                ),
                (
                    "INDEX/Komplexität/190119e/002 180522a/000 180522a - Tiefe - 190119d.png".to_string(),
                    "180522a - Tiefe - 190119d.png".to_string()
                ),
                (
                    "INDEX/Komplexität/190119e/003 170224a - Polymorphismus - 190119d.png".to_string(),
                    "170224a - Polymorphismus - 190119d.png".to_string()
                ),
            ]
        );
    }

    #[test]
    fn test_create_index_refuses_existing_dir() {
        let c = collection(&["190119e - Komplexität.txt"], &[("K", &["190119e"])], &[]);
        let store = MemoryStore::default();
        store
            .files
            .borrow_mut()
            .insert(PathBuf::from("INDEX/old.txt"), String::new());
        assert!(matches!(
            create_index(&store, &c, &TreeLayout::default(), "INDEX"),
            Err(ViewError::Store(StoreError::Exists(_)))
        ));
        assert!(store.links.borrow().is_empty());
    }

    #[test]
    fn test_create_index_duplicate_path_writes_nothing() {
        let c = collection(&["190119e - Komplexität.txt"], &[("K", &["190119e", "190119e"])], &[]);
        let store = MemoryStore::default();
        assert!(matches!(
            create_index(&store, &c, &TreeLayout::default(), "INDEX"),
            Err(ViewError::Materialize(MaterializeError::DuplicatePath { .. }))
        ));
        assert!(store.links.borrow().is_empty());
    }

    #[test]
    fn test_create_views() {
        let c = collection(
            &[
                "220115p - Refactoring - Marco Fitz, clausen2021 5 - 220101a.pdf",
                "220101a - Refactorings, Code Smells - Marco Fitz.txt",
            ],
            &[],
            &[],
        );
        let store = MemoryStore::default();
        create_views(&store, &c, "VIEWS").unwrap();
        let paths: Vec<String> = links(&store).into_iter().map(|(link, _)| link).collect();
        assert_eq!(
            paths,
            vec![
                "VIEWS/context/Marco Fitz/220101a - Refactorings, Code Smells - Marco Fitz.txt",
                "VIEWS/context/Marco Fitz/220115p - Refactoring - Marco Fitz, clausen2021 5 - 220101a.pdf",
                "VIEWS/keywords/Code Smells/220101a - Refactorings, Code Smells - Marco Fitz.txt",
                "VIEWS/keywords/Refactoring/220115p - Refactoring - Marco Fitz, clausen2021 5 - 220101a.pdf",
                "VIEWS/keywords/Refactorings/220101a - Refactorings, Code Smells - Marco Fitz.txt",
                "VIEWS/references/clausen2021/220115p - Refactoring - Marco Fitz, clausen2021 5 - 220101a.pdf",
                "VIEWS/unlinked/220101a/220101a - Refactorings, Code Smells - Marco Fitz.txt",
                "VIEWS/unlinked/220101a/context/220115p - Refactoring - Marco Fitz, clausen2021 5 - 220101a.pdf",
                "VIEWS/unlinked/220101a/keywords/220115p - Refactoring - Marco Fitz, clausen2021 5 - 220101a.pdf",
            ]
        );
    }

    #[test]
    fn test_dot_labels_stay_inside() {
        let name = "220122a - .., Ordner - ., Peter.txt";
        let c = collection(&[name], &[], &[]);
        let store = MemoryStore::default();
        create_views(&store, &c, "VIEWS").unwrap();
        let paths: Vec<String> = links(&store).into_iter().map(|(link, _)| link).collect();
        assert_eq!(
            paths,
            vec![
                format!("VIEWS/context/Peter/{name}"),
                format!("VIEWS/context/_/{name}"),
                format!("VIEWS/keywords/Ordner/{name}"),
                format!("VIEWS/keywords/_/{name}"),
                format!("VIEWS/unlinked/220122a/{name}"),
            ]
        );
    }

    #[test]
    fn test_similar_keyword() {
        assert!(similar_keyword("Komplexität", "Komplex"));
        assert!(similar_keyword("Evolution", "Evolutionstheorie"));
        assert!(similar_keyword("Lego", "Lego bauen"));
        assert!(!similar_keyword("Evolution", "Ethik"));
    }
}
