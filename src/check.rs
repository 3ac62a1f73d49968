use ahash::AHashMap;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::collection::Collection;
use crate::note::Identity;

/// A structural defect of the collection. Reported, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Inconsistency {
    #[error("zettel: duplicate id {identity}")]
    DuplicateIdentity { identity: Identity },
    #[error("zettel: link to id {predecessor} not existing")]
    DanglingPredecessor { predecessor: Identity },
    #[error("index: link to id {identity} not existing")]
    DanglingIndexEntry { identity: Identity },
    #[error("reference: missing bibkey {bibkey:?}")]
    UnresolvedBibkey { bibkey: String },
    #[error("zettel: more than one predecessor: {identity}")]
    MultiplePredecessors {
        identity: Identity,
        predecessors: Vec<Identity>,
    },
    #[error("zettel: cannot parse filename {name:?}: {reason}")]
    MalformedFilename { name: String, reason: String },
    #[error("index: line {line}: {reason}")]
    MalformedIndexLine { line: usize, reason: String },
}

/// Runs every check over `collection` in one pass.
///
/// Findings recorded while loading are included. The result holds each
/// rendered message once and is sorted by it.
pub fn check(collection: &Collection) -> Vec<Inconsistency> {
    let found = collection
        .findings()
        .iter()
        .cloned()
        .chain(duplicate_identities(collection))
        .chain(dangling_predecessors(collection))
        .chain(dangling_index_entries(collection))
        .chain(unresolved_bibkeys(collection));

    let mut unique: BTreeMap<String, Inconsistency> = BTreeMap::new();
    for inconsistency in found {
        unique.entry(inconsistency.to_string()).or_insert(inconsistency);
    }
    unique.into_values().collect()
}

fn duplicate_identities(collection: &Collection) -> Vec<Inconsistency> {
    let mut counts: AHashMap<&Identity, usize> = AHashMap::new();
    for note in collection.all_notes() {
        *counts.entry(&note.identity).or_default() += 1;
    }
    counts
        .into_iter()
        .filter(|(_, n)| *n > 1)
        .map(|(identity, _)| Inconsistency::DuplicateIdentity {
            identity: identity.clone(),
        })
        .collect()
}

// Surplus predecessors are not linked but still have to name an existing note.
fn dangling_predecessors(collection: &Collection) -> Vec<Inconsistency> {
    let surplus = collection
        .findings()
        .iter()
        .filter_map(|f| match f {
            Inconsistency::MultiplePredecessors { predecessors, .. } => Some(predecessors),
            _ => None,
        })
        .flatten();
    collection
        .all_notes()
        .iter()
        .filter_map(|n| n.predecessor.as_ref())
        .chain(surplus)
        .filter(|p| !collection.contains(p))
        .map(|p| Inconsistency::DanglingPredecessor {
            predecessor: p.clone(),
        })
        .collect()
}

fn dangling_index_entries(collection: &Collection) -> Vec<Inconsistency> {
    collection
        .index()
        .values()
        .flatten()
        .filter(|id| !collection.contains(id))
        .map(|id| Inconsistency::DanglingIndexEntry {
            identity: id.clone(),
        })
        .collect()
}

fn unresolved_bibkeys(collection: &Collection) -> Vec<Inconsistency> {
    let known = collection.bibkeys();
    collection
        .all_notes()
        .iter()
        .flat_map(|n| &n.references)
        .filter(|r| !known.contains(&r.bibkey))
        .map(|r| Inconsistency::UnresolvedBibkey {
            bibkey: r.bibkey.clone(),
        })
        .collect()
}
