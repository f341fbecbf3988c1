//! Glob/regex pattern matching used to select archive entries.

use std::fmt;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid glob pattern {0:?}: {1}")]
    Glob(String, glob::PatternError),
    #[error("invalid regular expression {0:?}: {1}")]
    Regex(String, regex::Error),
}

/// The three pattern dialects the archiver recognizes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PatternType {
    Glob,
    Regex,
    ExtendedRegex,
}

impl fmt::Display for PatternType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PatternType::Glob => "glob",
            PatternType::Regex => "regex",
            PatternType::ExtendedRegex => "extended",
        };
        f.write_str(s)
    }
}

/// A single compiled match expression.
#[derive(Clone, Debug)]
pub struct Pattern {
    source: String,
    kind: PatternType,
    glob: Option<glob::Pattern>,
    regex: Option<regex::Regex>,
}

/// Unescapes `\n`, `\r`, `\\` after a surrounding-quote strip has already
/// been applied by the config reader.
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('r') => out.push('\r'),
                Some('\\') => out.push('\\'),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

impl Pattern {
    /// Parses a pattern value, honoring an optional `glob:`/`g:`, `regex:`/`r:`,
    /// or `extended:`/`x:` prefix that overrides `default_type`.
    pub fn parse(value: &str, default_type: PatternType) -> Result<Self, Error> {
        let (kind, rest) = if let Some(r) = value.strip_prefix("glob:") {
            (PatternType::Glob, r)
        } else if let Some(r) = value.strip_prefix("g:") {
            (PatternType::Glob, r)
        } else if let Some(r) = value.strip_prefix("regex:") {
            (PatternType::Regex, r)
        } else if let Some(r) = value.strip_prefix("r:") {
            (PatternType::Regex, r)
        } else if let Some(r) = value.strip_prefix("extended:") {
            (PatternType::ExtendedRegex, r)
        } else if let Some(r) = value.strip_prefix("x:") {
            (PatternType::ExtendedRegex, r)
        } else {
            (default_type, value)
        };

        let source = unescape(rest);
        Self::compile(source, kind)
    }

    fn compile(source: String, kind: PatternType) -> Result<Self, Error> {
        match kind {
            PatternType::Glob => {
                let glob = glob::Pattern::new(&source)
                    .map_err(|e| Error::Glob(source.clone(), e))?;
                Ok(Pattern {
                    source,
                    kind,
                    glob: Some(glob),
                    regex: None,
                })
            }
            PatternType::Regex | PatternType::ExtendedRegex => {
                let regex = regex::Regex::new(&source)
                    .map_err(|e| Error::Regex(source.clone(), e))?;
                Ok(Pattern {
                    source,
                    kind,
                    glob: None,
                    regex: Some(regex),
                })
            }
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn kind(&self) -> PatternType {
        self.kind
    }

    /// Tests whether `path` matches this pattern.
    pub fn matches(&self, path: &str) -> bool {
        match self.kind {
            PatternType::Glob => self
                .glob
                .as_ref()
                .expect("glob pattern compiled")
                .matches(path),
            PatternType::Regex | PatternType::ExtendedRegex => self
                .regex
                .as_ref()
                .expect("regex pattern compiled")
                .is_match(path),
        }
    }
}

/// An ordered sequence of patterns; membership is true on first match.
#[derive(Clone, Debug, Default)]
pub struct PatternList(Vec<Pattern>);

impl PatternList {
    pub fn new() -> Self {
        PatternList(Vec::new())
    }

    pub fn push(&mut self, pattern: Pattern) {
        self.0.push(pattern);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn matches(&self, path: &str) -> bool {
        self.0.iter().any(|p| p.matches(path))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pattern> {
        self.0.iter()
    }
}

impl FromIterator<Pattern> for PatternList {
    fn from_iter<T: IntoIterator<Item = Pattern>>(iter: T) -> Self {
        PatternList(iter.into_iter().collect())
    }
}

/// The kind of filesystem object an include pattern selects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum EntryKind {
    File,
    Image,
}

/// A pattern paired with the entry kind it selects.
#[derive(Clone, Debug)]
pub struct EntryList(Vec<(Pattern, EntryKind)>);

impl EntryList {
    pub fn new() -> Self {
        EntryList(Vec::new())
    }

    pub fn push(&mut self, pattern: Pattern, kind: EntryKind) {
        self.0.push((pattern, kind));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the entry kind of the first pattern matching `path`, if any.
    pub fn match_kind(&self, path: &str) -> Option<EntryKind> {
        self.0
            .iter()
            .find(|(p, _)| p.matches(path))
            .map(|(_, k)| *k)
    }
}

impl Default for EntryList {
    fn default() -> Self {
        Self::new()
    }
}
