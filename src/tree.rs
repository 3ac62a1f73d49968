//! Flattens the follow-up forest into numbered folders.
//!
//! Starting at a root, the chain of *first* follow-ups stays in one folder and
//! is numbered `000`, `001`, ... Every further follow-up at a branch point gets
//! its own folder `NNN <identity>` at the current number and restarts at `000`
//! inside it. The first follow-up then continues in the parent folder after the
//! branch folders. For a root `190119e` with follow-up `190119d`, which in turn
//! has `170224a` and `180522a`:
//!
//! ```text
//! Komplexität/190119e/000 190119e - Komplexität.txt
//! Komplexität/190119e/001 190119d - Testing - 190119e.txt
//! Komplexität/190119e/002 180522a/000 180522a - Tiefe - 190119d.png
//! Komplexität/190119e/003 170224a - Polymorphismus - 190119d.png
//! ```

use ahash::AHashSet;
use log::debug;
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::collection::Collection;
use crate::error::MaterializeError;
use crate::note::Identity;

/// relative path -> identity the link points to
pub type LinkMap = BTreeMap<String, Identity>;

/// Presentation of the sequence numbers in generated names.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TreeLayout {
    pub counter_width: usize,
    pub separator: String,
}

impl Default for TreeLayout {
    fn default() -> Self {
        TreeLayout {
            counter_width: 3,
            separator: " ".to_string(),
        }
    }
}

impl TreeLayout {
    fn entry(&self, counter: usize, name: &str) -> String {
        format!(
            "{:0width$}{}{}",
            counter,
            self.separator,
            name,
            width = self.counter_width
        )
    }
}

/// Makes a label usable as a single path component below its output dir.
pub fn path_component(label: &str) -> String {
    match label {
        "" | "." | ".." => "_".to_string(),
        _ => label.replace(['/', '\\'], "_"),
    }
}

pub struct Materializer<'a> {
    collection: &'a Collection,
    layout: &'a TreeLayout,
}

/// State of one materialize call. Never shared between roots.
struct Walk {
    visited: AHashSet<Identity>,
    links: LinkMap,
}

impl<'a> Materializer<'a> {
    pub fn new(collection: &'a Collection, layout: &'a TreeLayout) -> Self {
        Materializer { collection, layout }
    }

    /// Link layout of the tree below `root`, placed in `topic/root/`.
    pub fn materialize(&self, root: &Identity, topic: &str) -> LinkMap {
        let mut walk = Walk {
            visited: AHashSet::new(),
            links: LinkMap::new(),
        };
        let base = format!("{}/{}", path_component(topic), root);
        self.visit(&mut walk, root.clone(), 0, &base);
        walk.links
    }

    /// Materializes every root of every index topic into one mapping.
    pub fn materialize_index(&self) -> Result<LinkMap, MaterializeError> {
        let mut merged = LinkMap::new();
        for (topic, roots) in self.collection.index() {
            for root in roots {
                for (path, identity) in self.materialize(root, topic) {
                    if let Some(first) = merged.get(&path) {
                        return Err(MaterializeError::DuplicatePath {
                            path,
                            first: first.clone(),
                            second: identity,
                        });
                    }
                    merged.insert(path, identity);
                }
            }
        }
        Ok(merged)
    }

    // Branches recurse, the linear chain is followed in the loop.
    fn visit(&self, walk: &mut Walk, mut id: Identity, mut counter: usize, path: &str) {
        loop {
            if walk.visited.contains(&id) {
                debug!("cycle at {id} below {path}, stopping");
                return;
            }
            let Some(note) = self.collection.lookup(&id) else {
                return;
            };
            walk.visited.insert(id.clone());
            walk.links
                .insert(format!("{path}/{}", self.layout.entry(counter, &note.name)), id.clone());
            counter += 1;

            let Some((first, rest)) = self.collection.forward_links(&id).split_first() else {
                return;
            };
            for child in rest {
                let branch = format!("{path}/{}", self.layout.entry(counter, child.as_str()));
                self.visit(walk, child.clone(), 0, &branch);
                counter += 1;
            }
            id = first.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::tests::collection;

    const NAMES: [&str; 9] = [
        "190119e - Komplexität.txt",
        "190119d - Testing - clausen2021 87 - 190119e.txt",
        "180522a - Komplexität, Thermodynamische Tiefe - 190119d.png",
        "220116s - Spezifikation - Marco Fitz - 180522a.pdf",
        "210520var - Varietät, Komplexität - 180522a.txt",
        "170224a - Polymorphismus, Objektorientierte Programmierung, Schnittstelle - 190119d.png",
        "190412d - Presentation, Domain Driven Design, Programmierung - 170224a.txt",
        "220122a - Some keyword.txt",
        "210328obj - Objektorientiert, Programmierung - kernighan2016 155.pdf",
    ];

    fn id(s: &str) -> Identity {
        Identity::parse(s).unwrap()
    }

    #[test]
    fn test_materialize_index_layout() {
        let c = collection(
            &NAMES,
            &[
                ("Komplexität", &["190119e", "220122a"]),
                ("Programmieren, Objektorientiert", &["210328obj"]),
            ],
            &[],
        );
        let layout = TreeLayout::default();
        let links = Materializer::new(&c, &layout).materialize_index().unwrap();
        let paths: Vec<&str> = links.keys().map(String::as_str).collect();
        assert_eq!(
            paths,
            vec![
                "Komplexität/190119e/000 190119e - Komplexität.txt",
                "Komplexität/190119e/001 190119d - Testing - clausen2021 87 - 190119e.txt",
                "Komplexität/190119e/002 180522a/000 180522a - Komplexität, Thermodynamische Tiefe - 190119d.png",
                "Komplexität/190119e/002 180522a/001 220116s/000 220116s - Spezifikation - Marco Fitz - 180522a.pdf",
                "Komplexität/190119e/002 180522a/002 210520var - Varietät, Komplexität - 180522a.txt",
                "Komplexität/190119e/003 170224a - Polymorphismus, Objektorientierte Programmierung, Schnittstelle - 190119d.png",
                "Komplexität/190119e/004 190412d - Presentation, Domain Driven Design, Programmierung - 170224a.txt",
                "Komplexität/220122a/000 220122a - Some keyword.txt",
                "Programmieren, Objektorientiert/210328obj/000 210328obj - Objektorientiert, Programmierung - kernighan2016 155.pdf",
            ]
        );
        assert_eq!(
            links["Komplexität/190119e/002 180522a/001 220116s/000 220116s - Spezifikation - Marco Fitz - 180522a.pdf"],
            id("220116s")
        );
    }

    #[test]
    fn test_cycle_terminates() {
        let c = collection(
            &["210101a - Loop - 210101b.txt", "210101b - Loop - 210101a.txt"],
            &[],
            &[],
        );
        let layout = TreeLayout::default();
        let links = Materializer::new(&c, &layout).materialize(&id("210101a"), "T");
        assert_eq!(links.len(), 2);
        assert_eq!(links["T/210101a/000 210101a - Loop - 210101b.txt"], id("210101a"));
        assert_eq!(links["T/210101a/001 210101b - Loop - 210101a.txt"], id("210101b"));
    }

    #[test]
    fn test_visited_is_reset_per_root() {
        let c = collection(&NAMES, &[], &[]);
        let layout = TreeLayout::default();
        let m = Materializer::new(&c, &layout);
        let first = m.materialize(&id("190119e"), "A");
        let second = m.materialize(&id("190119e"), "A");
        assert_eq!(first.len(), 7);
        assert_eq!(first, second);
    }

    #[test]
    fn test_unknown_root_is_empty() {
        let c = collection(&NAMES, &[], &[]);
        let layout = TreeLayout::default();
        assert!(Materializer::new(&c, &layout)
            .materialize(&id("990101a"), "A")
            .is_empty());
    }

    #[test]
    fn test_duplicate_path() {
        let c = collection(&NAMES, &[("Komplexität", &["220122a", "220122a"])], &[]);
        let layout = TreeLayout::default();
        assert_eq!(
            Materializer::new(&c, &layout).materialize_index(),
            Err(MaterializeError::DuplicatePath {
                path: "Komplexität/220122a/000 220122a - Some keyword.txt".to_string(),
                first: id("220122a"),
                second: id("220122a"),
            })
        );
    }

    #[test]
    fn test_custom_layout_and_topic_sanitizing() {
        let c = collection(&NAMES, &[], &[]);
        let layout = TreeLayout {
            counter_width: 2,
            separator: "_".to_string(),
        };
        let links = Materializer::new(&c, &layout).materialize(&id("220122a"), "Input/Output");
        assert_eq!(
            links.keys().collect::<Vec<_>>(),
            vec!["Input_Output/220122a/00_220122a - Some keyword.txt"]
        );
    }

    #[test]
    fn test_dot_topics_stay_inside() {
        let c = collection(
            &["220122a - Some keyword.txt", "190119e - Komplexität.txt"],
            &[("..", &["220122a"]), (".", &["190119e"])],
            &[],
        );
        let layout = TreeLayout::default();
        let links = Materializer::new(&c, &layout).materialize_index().unwrap();
        assert_eq!(
            links.keys().collect::<Vec<_>>(),
            vec![
                "_/190119e/000 190119e - Komplexität.txt",
                "_/220122a/000 220122a - Some keyword.txt",
            ]
        );
        assert_eq!(path_component(""), "_");
        assert_eq!(path_component("..."), "...");
    }
}
