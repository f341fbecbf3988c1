//! Declarative option schema and `[section]` / `key=value` config file
//! parsing, layered underneath the CLI flags the binary crate defines with
//! `clap`.

pub mod schema;

use std::collections::BTreeMap;

use cairn_util::OptionMap;

pub use schema::{OptionSchema, OptionSpec, OptionType};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("unknown option {section}.{name}")]
    UnknownOption { section: String, name: String },
    /// All issues found while parsing one file. `parse` keeps reading after
    /// a malformed line or unknown option so a file with several mistakes
    /// is reported in one pass instead of one error per run.
    #[error("{}", .issues.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "))]
    Invalid { issues: Vec<Error> },
}

/// A parsed config file: an optional leading comment block plus one
/// `OptionMap` per `[section]`.
#[derive(Clone, Debug, Default)]
pub struct ConfigDocument {
    pub header: Vec<String>,
    pub sections: BTreeMap<String, OptionMap>,
}

impl ConfigDocument {
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections.get(section).and_then(|m| m.get(key))
    }

    pub fn set(&mut self, section: &str, key: &str, value: impl Into<String>) {
        self.sections
            .entry(section.to_string())
            .or_default()
            .set(key, value);
    }
}

/// Parses `text` against `schema`, rewriting any deprecated alias to its
/// canonical name and emitting a `tracing::warn` for each rewrite so
/// operators notice before the alias is removed.
///
/// A malformed line or unknown option does not abort the parse: the issue
/// is recorded and the rest of the file is still read, so every mistake in
/// a file comes back in one `Error::Invalid` instead of one run per line.
pub fn parse(text: &str, schema: &OptionSchema) -> Result<ConfigDocument, Error> {
    let mut document = ConfigDocument::default();
    let mut current_section = String::from("global");
    let mut in_header = true;
    let mut issues = Vec::new();

    for (index, raw_line) in text.lines().enumerate() {
        let line_number = index + 1;
        let trimmed = raw_line.trim();

        if trimmed.is_empty() {
            continue;
        }
        if trimmed.starts_with('#') || trimmed.starts_with(';') {
            if in_header {
                document.header.push(trimmed.trim_start_matches(['#', ';']).trim().to_string());
            }
            continue;
        }
        in_header = false;

        if let Some(name) = trimmed.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
            current_section = name.trim().to_string();
            continue;
        }

        let Some((raw_key, raw_value)) = trimmed.split_once('=') else {
            issues.push(Error::Parse {
                line: line_number,
                message: format!("expected key=value, found {trimmed:?}"),
            });
            continue;
        };
        let raw_key = raw_key.trim();
        let value = raw_value.trim();

        let canonical = match schema.canonical_name(&current_section, raw_key) {
            Some(canonical) => canonical,
            None => {
                issues.push(Error::UnknownOption {
                    section: current_section.clone(),
                    name: raw_key.to_string(),
                });
                continue;
            }
        };
        if canonical != raw_key {
            tracing::warn!(
                section = %current_section,
                alias = raw_key,
                canonical,
                "config option renamed; update your config file"
            );
        }
        document.set(&current_section, canonical, value.to_string());
    }

    if !issues.is_empty() {
        return Err(Error::Invalid { issues });
    }
    Ok(document)
}

/// Serializes `document` back to text, using only canonical option names.
pub fn write(document: &ConfigDocument) -> String {
    let mut out = String::new();
    for line in &document.header {
        out.push_str("# ");
        out.push_str(line);
        out.push('\n');
    }
    if !document.header.is_empty() {
        out.push('\n');
    }
    for (section, options) in &document.sections {
        out.push('[');
        out.push_str(section);
        out.push_str("]\n");
        for (key, value) in options.iter() {
            out.push_str(key);
            out.push('=');
            out.push_str(value);
            out.push('\n');
        }
        out.push('\n');
    }
    out
}
