//! One function per subcommand. Kept free of `clap` concerns beyond reading
//! the already-parsed argument structs, so the dispatch in `main.rs` stays a
//! thin match.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use cairn_archive::pipeline::{encode_entry, PipelineConfig};
use cairn_archive::reader::restore_all;
use cairn_archive::volume::{last_valid_chunk_boundary, read_chunks_across_volumes, volume_name};
use cairn_archive::writer::{ArchiveWriter, SourceEntry};
use cairn_catalog::model::{EntryType, StorageMode};
use cairn_catalog::query::EntryFilter;
use cairn_catalog::Catalog;
use cairn_codec::compress::CompressAlgorithm;
use cairn_codec::crypt::CryptAlgorithm;
use cairn_config::ConfigDocument;
use cairn_crypto::password::Password;
use cairn_storage::file::FileStorage;
use cairn_storage::OpenMode;
use cairn_thread::{Registry, WorkerPool};
use cairn_util::pattern::{Pattern, PatternType};
use cairn_util::PatternList;

use crate::cli::{CreateArgs, ListArgs, PipelineArgs, RestoreArgs, TestArgs};
use crate::error::Error;
use crate::walk::walk;

/// Loads and parses the config file named by `--config`, if given. A missing
/// `--config` flag is not an error: every flag this resolves falls back to a
/// built-in default, so there is always a usable configuration.
pub fn load_config(path: Option<&Path>) -> Result<Option<ConfigDocument>, Error> {
    let Some(path) = path else { return Ok(None) };
    let text = std::fs::read_to_string(path)?;
    let schema = cairn_config::schema::default_schema();
    let document = cairn_config::parse(&text, &schema).map_err(|e| Error::Config(e.to_string()))?;
    Ok(Some(document))
}

fn now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system clock before epoch")
        .as_secs() as i64
}

fn build_pipeline_config(args: &PipelineArgs, config: Option<&ConfigDocument>) -> Result<PipelineConfig, Error> {
    let compress_name = args
        .compress
        .clone()
        .or_else(|| config.and_then(|c| c.get("global", "compress-algorithm")).map(str::to_string))
        .unwrap_or_else(|| "zip6".to_string());
    let compress = CompressAlgorithm::parse(&compress_name).map_err(|e| Error::Config(e.to_string()))?;

    let crypt_name = args
        .crypt
        .clone()
        .or_else(|| config.and_then(|c| c.get("global", "crypt-algorithm")).map(str::to_string))
        .unwrap_or_else(|| "none".to_string());
    let crypt = match crypt_name.as_str() {
        "none" => CryptAlgorithm::None,
        "symmetric" => CryptAlgorithm::Symmetric,
        "asymmetric" => CryptAlgorithm::Asymmetric,
        other => return Err(Error::Config(format!("unknown crypt type {other:?}"))),
    };
    let password = args.password.as_ref().map(|p| Password::new(p.clone()));
    let compress_exclude = exclude_patterns(&args.compress_exclude)?;
    Ok(PipelineConfig {
        compress,
        crypt,
        password,
        delta_block_size: 4096,
        compress_exclude,
    })
}

fn resolve_volume_size(args: &PipelineArgs, config: Option<&ConfigDocument>) -> Result<u64, Error> {
    if let Some(size) = args.volume_size {
        return Ok(size);
    }
    if let Some(raw) = config.and_then(|c| c.get("global", "volume-size")) {
        return cairn_util::units::parse_byte_size(raw).map_err(|e| Error::Config(e.to_string()));
    }
    Ok(1 << 30)
}

fn exclude_patterns(raw: &[String]) -> Result<PatternList, Error> {
    let mut list = PatternList::new();
    for value in raw {
        list.push(Pattern::parse(value, PatternType::Glob)?);
    }
    Ok(list)
}

async fn open_catalog(path: Option<&Path>) -> Result<Catalog, Error> {
    match path {
        Some(path) => Ok(Catalog::open(&format!("sqlite3:{}", path.display())).await?),
        None => Ok(Catalog::open_memory().await?),
    }
}

/// An entry with its content already read off disk, owned so it can move
/// into a worker pool job.
struct StagedEntry {
    archive_name: String,
    entry_type: EntryType,
    time_last_changed: i64,
    content: Vec<u8>,
    destination_name: Option<String>,
}

/// Where a create job starts writing, decided by `archive-file-mode` against
/// whatever already sits at the target path.
enum ArchiveFilePlan {
    Fresh { base_name: String },
    Resume { base_name: String, volume_index: u32, bytes_in_current_volume: u64 },
}

/// Resolves the archive-file-mode collision policy against an existing file
/// at `archive`: `stop` aborts, `overwrite` and a fresh, nonexistent path
/// both start clean, `rename` picks a sequenced sibling name, and `append`
/// finds the last volume, truncates any dangling partial chunk left by a
/// prior crash, and resumes writing after it.
fn resolve_archive_file_plan(archive: &Path, mode: &str) -> Result<ArchiveFilePlan, Error> {
    let base_name = archive.to_string_lossy().into_owned();
    if !archive.exists() {
        return Ok(ArchiveFilePlan::Fresh { base_name });
    }
    match mode {
        "stop" => Err(Error::DestinationExists(archive.to_path_buf())),
        "overwrite" => Ok(ArchiveFilePlan::Fresh { base_name }),
        "rename" => {
            let renamed = rename_for_collision(archive);
            Ok(ArchiveFilePlan::Fresh { base_name: renamed.to_string_lossy().into_owned() })
        }
        "append" => {
            let mut volume_index = 1;
            while Path::new(&volume_name(&base_name, volume_index + 1)).exists() {
                volume_index += 1;
            }
            let last_volume_path = PathBuf::from(volume_name(&base_name, volume_index));
            let bytes = std::fs::read(&last_volume_path)?;
            let boundary = last_valid_chunk_boundary(&bytes);
            if boundary < bytes.len() as u64 {
                let file = std::fs::OpenOptions::new().write(true).open(&last_volume_path)?;
                file.set_len(boundary)?;
            }
            Ok(ArchiveFilePlan::Resume { base_name, volume_index, bytes_in_current_volume: boundary })
        }
        other => Err(Error::Config(format!("unknown archive file mode {other:?}"))),
    }
}

pub async fn create_files(args: CreateArgs, file_config: Option<&ConfigDocument>) -> Result<(), Error> {
    let pipeline_config = build_pipeline_config(&args.pipeline, file_config)?;
    let volume_size = resolve_volume_size(&args.pipeline, file_config)?;
    let exclude = exclude_patterns(&args.exclude)?;
    let entries = walk(&args.paths, &exclude)?;

    let catalog = open_catalog(args.catalog.as_deref()).await?;
    let job_uuid = args.job_uuid.clone().unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let uuid_id = catalog.find_or_create_uuid(&job_uuid).await?;
    let entity_id = catalog
        .create_entity(uuid_id, &job_uuid, None, &args.archive_type, now())
        .await?;
    let plan = resolve_archive_file_plan(&args.archive, &args.archive_file_mode)?;
    let archive_name = match &plan {
        ArchiveFilePlan::Fresh { base_name } => base_name.clone(),
        ArchiveFilePlan::Resume { base_name, .. } => base_name.clone(),
    };
    let storage_id = catalog
        .create_storage(entity_id, &archive_name, StorageMode::Auto, now())
        .await?;

    // Boxed so both arms of the match below produce the same `ArchiveWriter<O>`
    // instantiation despite opening volumes in different `OpenMode`s.
    type OpenFn = Box<dyn FnMut(&str) -> Result<Box<dyn cairn_storage::Storage>, cairn_storage::Error>>;
    let mut writer: ArchiveWriter<OpenFn> = match plan {
        ArchiveFilePlan::Fresh { base_name } => {
            let open: OpenFn = Box::new(|name: &str| {
                Ok(Box::new(FileStorage::open(Path::new(name), OpenMode::Write)?) as Box<dyn cairn_storage::Storage>)
            });
            ArchiveWriter::create(base_name, volume_size, pipeline_config.clone(), open)?
        }
        ArchiveFilePlan::Resume { base_name, volume_index, bytes_in_current_volume } => {
            let open: OpenFn = Box::new(|name: &str| {
                Ok(Box::new(FileStorage::open(Path::new(name), OpenMode::Append)?) as Box<dyn cairn_storage::Storage>)
            });
            ArchiveWriter::resume(base_name, volume_size, volume_index, bytes_in_current_volume, pipeline_config.clone(), open)?
        }
    };

    let mut staged = Vec::with_capacity(entries.len());
    for entry in &entries {
        let content = if entry.fs_path.is_file() {
            std::fs::read(&entry.fs_path)?
        } else {
            Vec::new()
        };
        let metadata = std::fs::symlink_metadata(&entry.fs_path)?;
        let destination_name = if entry.entry_type == EntryType::Link {
            std::fs::read_link(&entry.fs_path)
                .ok()
                .map(|target| target.to_string_lossy().into_owned())
        } else {
            None
        };
        staged.push(StagedEntry {
            archive_name: entry.archive_name.clone(),
            entry_type: entry.entry_type,
            time_last_changed: file_mtime(&metadata),
            content,
            destination_name,
        });
    }

    // Encoding (hash, delta, compress, encrypt) is pure and CPU-bound, so
    // it runs across a worker pool; writing each result to the volume and
    // the catalog stays on this thread so entries land in submission order.
    let registry = Arc::new(Registry::new());
    let pool = WorkerPool::new("cairn-encode", args.max_threads, &registry)?;
    type EncodeSlot = Mutex<Option<Result<cairn_archive::pipeline::EncodedEntry, cairn_archive::pipeline::Error>>>;
    let slots: Arc<Vec<EncodeSlot>> = Arc::new((0..staged.len()).map(|_| Mutex::new(None)).collect());

    for (index, entry) in staged.iter().enumerate() {
        let slots = slots.clone();
        let name = entry.archive_name.clone();
        let entry_type = entry.entry_type;
        let time_last_changed = entry.time_last_changed;
        let content = entry.content.clone();
        let config = pipeline_config.clone();
        pool.submit(move || {
            let result = encode_entry(&name, entry_type, time_last_changed, 0, 0, 0o644, &content, None, &config);
            *slots[index].lock().unwrap() = Some(result);
        });
    }
    pool.join()?;

    // Every submitted closure held a clone of `slots` and has now run to
    // completion and dropped its clone, so this is the only strong
    // reference left.
    let mut encoded_slots = Arc::try_unwrap(slots)
        .expect("worker pool join drops every job closure's Arc clone before returning")
        .into_iter();

    for entry in &staged {
        let encoded = encoded_slots
            .next()
            .expect("one slot per staged entry")
            .into_inner()
            .unwrap()
            .expect("worker pool job always fills its slot before join returns")?;
        writer
            .write_encoded_entry(
                &catalog,
                uuid_id,
                entity_id,
                Some(storage_id),
                &SourceEntry {
                    name: &entry.archive_name,
                    entry_type: entry.entry_type,
                    time_last_changed: entry.time_last_changed,
                    user_id: 0,
                    group_id: 0,
                    permission: 0o644,
                    content: &entry.content,
                    delta_source: None,
                    destination_name: entry.destination_name.as_deref(),
                },
                encoded,
            )
            .await?;
    }

    let written = writer.entries_written();
    let volumes = writer.finish()?;
    tracing::info!(entries = written, volumes, archive = %archive_name, "archive created");
    Ok(())
}

#[cfg(unix)]
fn file_mtime(metadata: &std::fs::Metadata) -> i64 {
    use std::os::unix::fs::MetadataExt;
    metadata.mtime()
}

#[cfg(not(unix))]
fn file_mtime(metadata: &std::fs::Metadata) -> i64 {
    metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

pub async fn list(args: ListArgs) -> Result<(), Error> {
    let catalog = Catalog::open(&format!("sqlite3:{}", args.catalog.display())).await?;
    let uuid_id = match &args.job_uuid {
        Some(job_uuid) => Some(catalog.find_or_create_uuid(job_uuid).await?),
        None => None,
    };
    let mut filter = EntryFilter::new();
    filter.uuid_id = uuid_id;
    filter.newest_only = args.newest_only;
    let entries = catalog.list_entries(filter).await?;
    for entry in entries {
        println!(
            "{:<10} {:>12} {}",
            entry.entry_type, entry.size, entry.name
        );
    }
    Ok(())
}

fn open_archive_chunks(archive: &Path) -> Result<Vec<cairn_archive::Chunk>, Error> {
    let base_name = archive
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| archive.to_string_lossy().into_owned());
    let parent = archive.parent().map(Path::to_path_buf).unwrap_or_default();
    let chunks = read_chunks_across_volumes(&base_name, |name| {
        Ok(Box::new(FileStorage::open(&parent.join(name), OpenMode::Read)?) as Box<dyn cairn_storage::Storage>)
    })?;
    Ok(chunks)
}

pub async fn test(args: TestArgs, file_config: Option<&ConfigDocument>) -> Result<(), Error> {
    let config = build_pipeline_config(&args.pipeline, file_config)?;
    let chunks = open_archive_chunks(&args.archive)?;
    let restored = restore_all(&chunks, &config, |_name| None)?;

    for entry in &restored {
        let mut hasher = cairn_crypto::hash::StreamingHasher::new(entry.metadata.content_hash.algorithm);
        hasher.update(&entry.content);
        let actual = hasher.finish();
        if actual != entry.metadata.content_hash {
            return Err(Error::HashMismatch(entry.metadata.name.clone()));
        }
    }
    println!("{} entries verified", restored.len());
    Ok(())
}

pub async fn restore(args: RestoreArgs, file_config: Option<&ConfigDocument>) -> Result<(), Error> {
    let config = build_pipeline_config(&args.pipeline, file_config)?;
    let chunks = open_archive_chunks(&args.archive)?;
    let restored = restore_all(&chunks, &config, |_name| None)?;

    for entry in &restored {
        let destination = args.destination.join(&entry.metadata.name);
        if destination.exists() {
            match args.entry_mode.as_str() {
                "skip-existing" => continue,
                "stop" => return Err(Error::DestinationExists(destination)),
                "overwrite" => {}
                "rename" => {
                    let renamed = rename_for_collision(&destination);
                    write_restored_file(&renamed, &entry.content)?;
                    continue;
                }
                other => return Err(Error::Config(format!("unknown restore entry mode {other:?}"))),
            }
        }
        write_restored_file(&destination, &entry.content)?;
    }
    println!("{} entries restored", restored.len());
    Ok(())
}

fn write_restored_file(path: &Path, content: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)
}

fn rename_for_collision(path: &Path) -> std::path::PathBuf {
    for suffix in 1..1000 {
        let candidate = path.with_file_name(format!(
            "{}.{suffix}",
            path.file_name().unwrap_or_default().to_string_lossy()
        ));
        if !candidate.exists() {
            return candidate;
        }
    }
    path.to_path_buf()
}

pub fn generate_encryption_keys(output_base: &Path, bits: usize) -> Result<(), Error> {
    write_rsa_keypair(output_base, bits)
}

pub fn generate_signature_keys(output_base: &Path, bits: usize) -> Result<(), Error> {
    write_rsa_keypair(output_base, bits)
}

fn write_rsa_keypair(output_base: &Path, bits: usize) -> Result<(), Error> {
    use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
    use rsa::{RsaPrivateKey, RsaPublicKey};

    let mut rng = rsa::rand_core::OsRng;
    let private_key = RsaPrivateKey::new(&mut rng, bits)?;
    let public_key = RsaPublicKey::from(&private_key);

    let private_pem = private_key
        .to_pkcs8_pem(LineEnding::LF)
        .map_err(|e| Error::KeyEncoding(e.to_string()))?;
    let public_pem = public_key
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| Error::KeyEncoding(e.to_string()))?;

    std::fs::write(output_base.with_extension("priv"), private_pem.as_bytes())?;
    std::fs::write(output_base.with_extension("pub"), public_pem)?;
    Ok(())
}
