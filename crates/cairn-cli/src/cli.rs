//! Command-line surface: one subcommand per entry in the mutually exclusive
//! command list, options grouped the way the archive engine groups them
//! (archive selection, pipeline selection, catalog/job identity).

use std::path::PathBuf;

use cairn_util::LogArgs;

#[derive(Debug, clap::Parser)]
#[command(name = "cairn", author, version, about = "Chunked backup archiver")]
pub struct Cli {
    #[command(flatten)]
    pub log: LogArgs,

    /// Config file providing defaults for any flag not given on the command
    /// line. CLI flags always win over values read from here.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, clap::Subcommand)]
#[command(rename_all = "kebab-case")]
pub enum Command {
    /// Create a new archive from a set of files and directories.
    CreateFiles(CreateArgs),
    /// Create a new archive from raw device/partition images.
    CreateImages(CreateArgs),
    /// List entries recorded for a job in the catalog.
    List(ListArgs),
    /// Read an archive back and verify every entry's content hash.
    Test(TestArgs),
    /// Compare an archive's entries against the current filesystem state.
    Compare(TestArgs),
    /// Restore entries from an archive to a destination directory.
    Restore(RestoreArgs),
    /// Convert an archive to a different compress/crypt configuration.
    Convert(ConvertArgs),
    /// Generate an RSA key pair for asymmetric entry encryption.
    GenerateEncryptionKeys(GenerateKeysArgs),
    /// Generate an RSA key pair for archive signing.
    GenerateSignatureKeys(GenerateKeysArgs),
}

/// Pipeline-shaping flags. Fields are left unset by default (rather than
/// given a `clap` `default_value`) so that `resolve` can tell "not given on
/// the command line" apart from "user typed the default", and fall back to
/// the config file before the built-in default.
#[derive(Debug, Clone, clap::Args)]
pub struct PipelineArgs {
    /// Compression algorithm: none, zip0..zip9, lz4-0..lz4-16, zstd0..zstd19.
    /// Defaults to the config file's `compress-algorithm`, then `zip6`.
    #[arg(long)]
    pub compress: Option<String>,

    /// Entry encryption: none or symmetric. Asymmetric needs a key file and
    /// is not wired into this command yet. Defaults to the config file's
    /// `crypt-algorithm`, then `none`.
    #[arg(long)]
    pub crypt: Option<String>,

    /// Password for symmetric encryption, read from the environment so it
    /// never lands in shell history or `ps`.
    #[arg(long, env = "CAIRN_PASSWORD")]
    pub password: Option<String>,

    /// Maximum size, in bytes, of a single archive volume before the
    /// engine rolls to the next one. Defaults to the config file's
    /// `volume-size`, then 1 GiB.
    #[arg(long)]
    pub volume_size: Option<u64>,

    /// Glob/regex patterns naming already-compressed content (images,
    /// archives, video) that should skip the compress step entirely.
    #[arg(long = "compress-exclude")]
    pub compress_exclude: Vec<String>,
}

#[derive(Debug, clap::Args)]
pub struct CreateArgs {
    /// Base name of the archive file (and its volumes: `name`, `name.2`, ...).
    pub archive: PathBuf,

    /// Files and directories to add to the archive.
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Identity of the job this archive belongs to. Defaults to a freshly
    /// generated UUID when omitted, so every unlabeled run still lands its
    /// own row in the catalog rather than colliding on a shared default.
    #[arg(long)]
    pub job_uuid: Option<String>,

    /// Archive type recorded against the entity: normal, full, incremental,
    /// differential, continuous.
    #[arg(long, default_value = "full")]
    pub archive_type: String,

    /// Sqlite catalog database file. Defaults to an in-memory catalog that
    /// does not outlive the process, useful for one-shot verification runs.
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Glob/regex exclude patterns (see the pattern-type prefixes).
    #[arg(long = "exclude")]
    pub exclude: Vec<String>,

    /// Worker threads used to encode entries in parallel. Defaults to the
    /// number of CPU cores.
    #[arg(long)]
    pub max_threads: Option<usize>,

    /// What to do when the archive file already exists: stop (abort),
    /// rename (add a sequenced suffix), append (resume after the last
    /// whole chunk), or overwrite.
    #[arg(long, default_value = "stop")]
    pub archive_file_mode: String,

    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

#[derive(Debug, clap::Args)]
pub struct ListArgs {
    #[arg(long)]
    pub catalog: PathBuf,

    /// Only list entries for this job.
    #[arg(long)]
    pub job_uuid: Option<String>,

    /// Only show the newest version of each (name, type).
    #[arg(long)]
    pub newest_only: bool,
}

#[derive(Debug, clap::Args)]
pub struct TestArgs {
    pub archive: PathBuf,

    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

#[derive(Debug, clap::Args)]
pub struct RestoreArgs {
    pub archive: PathBuf,

    /// Directory entries are restored into, preserving their archived name
    /// as a relative path.
    #[arg(long)]
    pub destination: PathBuf,

    /// What to do when the destination path already exists.
    #[arg(long, default_value = "stop")]
    pub entry_mode: String,

    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

#[derive(Debug, clap::Args)]
pub struct ConvertArgs {
    pub archive: PathBuf,
    pub output: PathBuf,

    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

#[derive(Debug, clap::Args)]
pub struct GenerateKeysArgs {
    /// Base path keys are written to: `<base>.pub` and `<base>.priv`.
    pub output_base: PathBuf,

    /// RSA modulus size in bits.
    #[arg(long, default_value_t = 2048)]
    pub bits: usize,
}
