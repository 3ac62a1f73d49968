use ahash::AHashSet;
use chrono::NaiveDate;

use crate::error::GenerationError;
use crate::note::Identity;

/// Builds a new identity `YYMMDD` + letter that is not in `existing`.
///
/// The letter is taken from the first character of each keyword in turn, then
/// from the alphabet scan `a..y`. `z` is never handed out by the scan; it stays
/// reserved the way older collections were numbered. Keywords starting with
/// something other than an ASCII letter (digits, umlauts) give no candidate.
pub fn generate(
    date: NaiveDate,
    keywords: &[String],
    existing: &AHashSet<Identity>,
) -> Result<Identity, GenerationError> {
    let datecode = date.format("%y%m%d").to_string();

    let from_keywords = keywords
        .iter()
        .filter_map(|k| k.chars().next())
        .filter_map(|c| c.to_lowercase().next());

    from_keywords
        .chain('a'..'z')
        .filter(|c| c.is_ascii_lowercase())
        .filter_map(|c| Identity::parse(&format!("{datecode}{c}")))
        .find(|candidate| !existing.contains(candidate))
        .ok_or_else(|| GenerationError::IdentitySpaceExhausted(datecode.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, 12).unwrap()
    }

    fn keywords(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn ids(items: &[&str]) -> AHashSet<Identity> {
        items.iter().map(|s| Identity::parse(s).unwrap()).collect()
    }

    #[test]
    fn test_first_keyword_letter() {
        let id = generate(date(), &keywords(&["Modelle", "Theorien"]), &AHashSet::new()).unwrap();
        assert_eq!(id.as_str(), "200112m");
    }

    #[test]
    fn test_next_keyword_on_collision() {
        let id = generate(date(), &keywords(&["Modelle", "Theorien"]), &ids(&["200112m"])).unwrap();
        assert_eq!(id.as_str(), "200112t");
    }

    #[test]
    fn test_alphabet_fallback() {
        let existing = ids(&["200112m", "200112t", "200112a"]);
        let id = generate(date(), &keywords(&["Modelle", "Theorien"]), &existing).unwrap();
        assert_eq!(id.as_str(), "200112b");

        let id = generate(date(), &[], &AHashSet::new()).unwrap();
        assert_eq!(id.as_str(), "200112a");
    }

    #[test]
    fn test_non_ascii_keyword_is_skipped() {
        let id = generate(date(), &keywords(&["Übung", "3D Druck"]), &AHashSet::new()).unwrap();
        assert_eq!(id.as_str(), "200112a");
    }

    #[test]
    fn test_z_is_never_scanned() {
        let taken: Vec<String> = ('a'..'z').map(|c| format!("200112{c}")).collect();
        let existing: AHashSet<Identity> =
            taken.iter().map(|s| Identity::parse(s).unwrap()).collect();

        assert_eq!(
            generate(date(), &[], &existing),
            Err(GenerationError::IdentitySpaceExhausted("200112".to_string()))
        );
        // A keyword can still claim `z`.
        let id = generate(date(), &keywords(&["Zeit"]), &existing).unwrap();
        assert_eq!(id.as_str(), "200112z");
    }

    #[test]
    fn test_never_returns_existing() {
        let mut existing = AHashSet::new();
        let words = keywords(&["Risiko", "Unsicherheit", "Risiko"]);
        while let Ok(id) = generate(date(), &words, &existing) {
            assert!(existing.insert(id));
        }
        // r and u come first, then the rest of a..y
        assert_eq!(existing.len(), 25);
    }
}
