use ahash::AHashSet;
use std::collections::{BTreeMap, BTreeSet};

use crate::check::Inconsistency;
use crate::note::{Identity, Index, Note};

/// Metadata label a note can be grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelKind {
    Keyword,
    Context,
    Reference,
}

impl LabelKind {
    pub const ALL: [LabelKind; 3] = [LabelKind::Keyword, LabelKind::Context, LabelKind::Reference];

    pub fn dir_name(self) -> &'static str {
        match self {
            LabelKind::Keyword => "keywords",
            LabelKind::Context => "context",
            LabelKind::Reference => "references",
        }
    }

    fn labels(self, note: &Note) -> Vec<&str> {
        match self {
            LabelKind::Keyword => note.keywords.iter().map(String::as_str).collect(),
            LabelKind::Context => note.context.iter().map(String::as_str).collect(),
            LabelKind::Reference => note.references.iter().map(|r| r.bibkey.as_str()).collect(),
        }
    }
}

/// All notes of one zettelkasten plus the derived follow-up links.
///
/// Built once per run and read-only afterwards. Notes are kept sorted by
/// identity and every follow-up list is sorted, so all derived output is
/// reproducible across runs.
#[derive(Debug, Clone)]
pub struct Collection {
    notes: Vec<Note>,
    index: Index,
    bibkeys: BTreeSet<String>,
    folgezettel: BTreeMap<Identity, Vec<Identity>>,
    findings: Vec<Inconsistency>,
}

impl Collection {
    pub fn build(mut notes: Vec<Note>, index: Index, bibkeys: BTreeSet<String>) -> Self {
        notes.sort_by(|a, b| a.identity.cmp(&b.identity).then_with(|| a.name.cmp(&b.name)));

        let mut folgezettel: BTreeMap<Identity, Vec<Identity>> = BTreeMap::new();
        for note in &notes {
            if let Some(predecessor) = &note.predecessor {
                folgezettel
                    .entry(predecessor.clone())
                    .or_default()
                    .push(note.identity.clone());
            }
        }
        for successors in folgezettel.values_mut() {
            successors.sort();
        }

        Collection {
            notes,
            index,
            bibkeys,
            folgezettel,
            findings: Vec::new(),
        }
    }

    /// Attaches defects found while reading the raw files.
    pub fn with_findings(mut self, findings: Vec<Inconsistency>) -> Self {
        self.findings = findings;
        self
    }

    /// First note with this identity, if any.
    pub fn lookup(&self, identity: &Identity) -> Option<&Note> {
        let pos = self.notes.partition_point(|n| n.identity < *identity);
        self.notes.get(pos).filter(|n| n.identity == *identity)
    }

    pub fn contains(&self, identity: &Identity) -> bool {
        self.lookup(identity).is_some()
    }

    /// Follow-up notes of `identity`, sorted ascending.
    pub fn forward_links(&self, identity: &Identity) -> &[Identity] {
        self.folgezettel
            .get(identity)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn all_notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.index.keys().map(String::as_str)
    }

    pub fn bibkeys(&self) -> &BTreeSet<String> {
        &self.bibkeys
    }

    pub fn findings(&self) -> &[Inconsistency] {
        &self.findings
    }

    /// label -> identities carrying it, both sorted, identities deduplicated.
    pub fn notes_by_label(&self, kind: LabelKind) -> BTreeMap<String, Vec<Identity>> {
        let mut groups: BTreeMap<String, Vec<Identity>> = BTreeMap::new();
        for note in &self.notes {
            for label in kind.labels(note) {
                groups
                    .entry(label.to_string())
                    .or_default()
                    .push(note.identity.clone());
            }
        }
        for ids in groups.values_mut() {
            ids.dedup();
        }
        groups
    }

    /// Every label occurrence of `kind`, in note order.
    pub fn label_occurrences(&self, kind: LabelKind) -> Vec<&str> {
        self.notes.iter().flat_map(|n| kind.labels(n)).collect()
    }

    /// Walks predecessors up to the start of the chain.
    ///
    /// Returns the root and the number of steps taken. A dangling predecessor
    /// ends the walk at the last existing note; a cycle yields `None`.
    pub fn chain_root(&self, identity: &Identity) -> Option<(Identity, usize)> {
        let mut visited = AHashSet::new();
        let mut current = self.lookup(identity)?;
        let mut depth = 0;
        loop {
            if !visited.insert(&current.identity) {
                return None;
            }
            match current.predecessor.as_ref().and_then(|p| self.lookup(p)) {
                Some(predecessor) => {
                    current = predecessor;
                    depth += 1;
                }
                None => return Some((current.identity.clone(), depth)),
            }
        }
    }
}
