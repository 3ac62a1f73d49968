//! Parsers for the two hand-maintained files next to `zettel/`: the topic
//! index and the BibTeX bibliography.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

use crate::check::Inconsistency;
use crate::note::{Identity, Index};

static BIB_ENTRY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@[a-zA-Z]+\{[a-z]+\d{4}[a-z]?,").unwrap());
static BIBKEY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[a-z]+\d{4}[a-z]?").unwrap());

/// Parses lines of the form `Topic: 170224a, 190119e`.
///
/// Bad lines are skipped and reported with their 1-based line number; the
/// rest of the file is still used.
pub fn parse_index(text: &str) -> (Index, Vec<Inconsistency>) {
    let mut index = Index::new();
    let mut findings = Vec::new();

    for (n, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match parse_index_line(line) {
            Ok((topic, ids)) => index.entry(topic).or_default().extend(ids),
            Err(reason) => findings.push(Inconsistency::MalformedIndexLine {
                line: n + 1,
                reason,
            }),
        }
    }
    (index, findings)
}

fn parse_index_line(line: &str) -> Result<(String, Vec<Identity>), String> {
    let mut parts = line.split(':');
    let (Some(topic), Some(ids), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(format!("expected exactly one ':' in {line:?}"));
    };
    let topic = topic.trim();
    if topic.is_empty() {
        return Err(format!("no topic in {line:?}"));
    }
    if ids.trim().is_empty() {
        return Err(format!("no ids for topic {topic:?}"));
    }
    ids.split(',')
        .map(str::trim)
        .map(|raw| Identity::parse(raw).ok_or_else(|| format!("not an id {raw:?}")))
        .collect::<Result<Vec<_>, _>>()
        .map(|ids| (topic.to_string(), ids))
}

/// Extracts bibkeys from BibTeX entries such as `@book{pandza2010,`.
pub fn parse_bibkeys(text: &str) -> BTreeSet<String> {
    BIB_ENTRY_RE
        .find_iter(text)
        .filter_map(|entry| BIBKEY_RE.find(entry.as_str()))
        .map(|m| m.as_str().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(items: &[&str]) -> Vec<Identity> {
        items.iter().map(|s| Identity::parse(s).unwrap()).collect()
    }

    #[test]
    fn test_parse_index() {
        let text = "Komplexität: 190119e, 180522a\nPolymorphismus:170224a\n\nTesting: 190119d\n";
        let (index, findings) = parse_index(text);
        assert!(findings.is_empty());
        assert_eq!(index.len(), 3);
        assert_eq!(index["Komplexität"], ids(&["190119e", "180522a"]));
        assert_eq!(index["Polymorphismus"], ids(&["170224a"]));
    }

    #[test]
    fn test_parse_index_empty() {
        let (index, findings) = parse_index("");
        assert!(index.is_empty());
        assert!(findings.is_empty());
    }

    #[test]
    fn test_parse_index_repeated_topic_appends() {
        let (index, _) = parse_index("A: 170224a\nA: 170224b\n");
        assert_eq!(index["A"], ids(&["170224a", "170224b"]));
    }

    #[test]
    fn test_parse_index_bad_lines() {
        let text = "Good: 170224a\nNo colon here\nA: b: 170224a\nEmpty:  \n: 170224a\nBad: 170224a, Foo\n";
        let (index, findings) = parse_index(text);
        assert_eq!(index.len(), 1);
        let lines: Vec<usize> = findings
            .iter()
            .map(|f| match f {
                Inconsistency::MalformedIndexLine { line, .. } => *line,
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(lines, vec![2, 3, 4, 5, 6]);
        assert_eq!(
            findings[4].to_string(),
            "index: line 6: not an id \"Foo\""
        );
    }

    #[test]
    fn test_parse_bibkeys() {
        let text = r#"@book{pandza2010,
  title = {Die Dynamik der Evolution},
  author = {Pandza, Krsto},
  year = {2010}
}

@Article{gutmann2000a,
  title = {Ein Artikel},
}

@misc{Broken2000,
}
"#;
        let keys: Vec<String> = parse_bibkeys(text).into_iter().collect();
        assert_eq!(keys, vec!["gutmann2000a", "pandza2010"]);
        assert!(parse_bibkeys("").is_empty());
    }
}
