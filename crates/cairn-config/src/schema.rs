//! The option descriptor table: one [`OptionSpec`] per recognized config
//! key, grouped by section, with deprecated aliases so old config files
//! keep working.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OptionType {
    Bool,
    Integer,
    String,
    ByteSize,
    Duration,
    StringList,
    Pattern,
}

#[derive(Clone, Copy, Debug)]
pub struct OptionSpec {
    pub section: &'static str,
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub kind: OptionType,
    pub default: Option<&'static str>,
    pub description: &'static str,
}

#[derive(Clone, Debug)]
pub struct OptionSchema {
    specs: Vec<OptionSpec>,
}

impl OptionSchema {
    pub fn new(specs: Vec<OptionSpec>) -> Self {
        OptionSchema { specs }
    }

    pub fn specs(&self) -> &[OptionSpec] {
        &self.specs
    }

    /// Resolves `name` (which may be a deprecated alias) to the canonical
    /// option name registered for `section`, or `None` if neither the name
    /// nor any alias matches.
    pub fn canonical_name(&self, section: &str, name: &str) -> Option<&'static str> {
        self.specs
            .iter()
            .find(|spec| spec.section == section && (spec.name == name || spec.aliases.contains(&name)))
            .map(|spec| spec.name)
    }

    pub fn find(&self, section: &str, name: &str) -> Option<&OptionSpec> {
        let canonical = self.canonical_name(section, name)?;
        self.specs.iter().find(|spec| spec.section == section && spec.name == canonical)
    }
}

/// The built-in schema covering every option the archive engine, catalog
/// and scheduler read from a config file.
pub fn default_schema() -> OptionSchema {
    OptionSchema::new(vec![
        OptionSpec {
            section: "global",
            name: "compress-algorithm",
            aliases: &["compression-algorithm"],
            kind: OptionType::String,
            default: Some("zip6"),
            description: "default entry compression algorithm",
        },
        OptionSpec {
            section: "global",
            name: "crypt-algorithm",
            aliases: &["crypt-type"],
            kind: OptionType::String,
            default: Some("none"),
            description: "default entry encryption algorithm",
        },
        OptionSpec {
            section: "global",
            name: "max-band-width",
            aliases: &["bandwidth-limit"],
            kind: OptionType::ByteSize,
            default: None,
            description: "maximum upload bandwidth",
        },
        OptionSpec {
            section: "global",
            name: "volume-size",
            aliases: &[],
            kind: OptionType::ByteSize,
            default: None,
            description: "size at which an archive splits into a new volume",
        },
        OptionSpec {
            section: "global",
            name: "worker-threads",
            aliases: &["threads"],
            kind: OptionType::Integer,
            default: Some("4"),
            description: "number of parallel compress/encrypt worker threads",
        },
        OptionSpec {
            section: "global",
            name: "min-keep",
            aliases: &[],
            kind: OptionType::Integer,
            default: Some("1"),
            description: "minimum number of versions of a path to retain",
        },
        OptionSpec {
            section: "global",
            name: "max-keep",
            aliases: &[],
            kind: OptionType::Integer,
            default: Some("-1"),
            description: "maximum number of versions of a path to retain, -1 for unlimited",
        },
        OptionSpec {
            section: "global",
            name: "max-age-days",
            aliases: &["max-storage-age"],
            kind: OptionType::Integer,
            default: Some("-1"),
            description: "maximum age in days before a version is pruned, -1 to keep forever",
        },
        OptionSpec {
            section: "global",
            name: "include",
            aliases: &[],
            kind: OptionType::Pattern,
            default: None,
            description: "pattern selecting paths to archive",
        },
        OptionSpec {
            section: "global",
            name: "exclude",
            aliases: &[],
            kind: OptionType::Pattern,
            default: None,
            description: "pattern excluding paths from the archive",
        },
        OptionSpec {
            section: "global",
            name: "exclude-compress",
            aliases: &["no-compress"],
            kind: OptionType::StringList,
            default: None,
            description: "patterns of already-compressed paths to store uncompressed",
        },
    ])
}
