use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

static IDENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{6}[a-z]{1,3}$").unwrap());
static IDENTITY_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{6}[a-z]{1,3}").unwrap());

/// Unique key of a note: a `YYMMDD` date code followed by 1-3 lowercase letters.
#[derive(Serialize, Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    /// Accepts the whole string only, e.g. `170712a` but not `170712a - x`.
    pub fn parse(s: &str) -> Option<Identity> {
        if IDENTITY_RE.is_match(s) {
            Some(Identity(s.to_string()))
        } else {
            None
        }
    }

    /// Leading identity of a longer string such as a filename.
    pub fn prefix_of(s: &str) -> Option<Identity> {
        IDENTITY_PREFIX_RE
            .find(s)
            .map(|m| Identity(m.as_str().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A citation into the bibliography, e.g. `gutmann2000a 14f`.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub bibkey: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl Reference {
    pub fn new(bibkey: &str, location: Option<&str>) -> Self {
        Reference {
            bibkey: bibkey.to_string(),
            location: location.map(str::to_string),
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{} {}", self.bibkey, location),
            None => f.write_str(&self.bibkey),
        }
    }
}

/// One atomic thought. Everything but the body lives in the filename.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub identity: Identity,
    pub keywords: Vec<String>,
    pub context: Vec<String>,
    pub references: Vec<Reference>,
    pub predecessor: Option<Identity>,
    /// Literal filename, e.g. `170212g - Go.txt`. Empty until encoded.
    pub name: String,
}

impl Note {
    pub fn new(identity: Identity) -> Self {
        Note {
            identity,
            keywords: Vec::new(),
            context: Vec::new(),
            references: Vec::new(),
            predecessor: None,
            name: String::new(),
        }
    }
}

/// Curated entry points: topic -> root identities, topics in sorted order.
pub type Index = BTreeMap<String, Vec<Identity>>;
