//! Top-level CLI error, composing every crate's error type behind one enum
//! so `main` can map it to an exit code per the external-interfaces policy.

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Catalog(#[from] cairn_catalog::Error),
    #[error(transparent)]
    Archive(#[from] cairn_archive::Error),
    #[error(transparent)]
    Writer(#[from] cairn_archive::writer::Error),
    #[error(transparent)]
    Pipeline(#[from] cairn_archive::pipeline::Error),
    #[error(transparent)]
    Reader(#[from] cairn_archive::reader::Error),
    #[error(transparent)]
    Thread(#[from] cairn_thread::Error),
    #[error(transparent)]
    Volume(#[from] cairn_archive::volume::Error),
    #[error(transparent)]
    Storage(#[from] cairn_storage::Error),
    #[error(transparent)]
    Crypt(#[from] cairn_codec::crypt::Error),
    #[error(transparent)]
    Pattern(#[from] cairn_util::pattern::Error),
    #[error(transparent)]
    Rsa(#[from] rsa::Error),
    #[error("key encoding error: {0}")]
    KeyEncoding(String),
    #[error("content hash mismatch for {0:?}")]
    HashMismatch(String),
    #[error("{0} is not yet implemented")]
    StillNotImplemented(&'static str),
    #[error("restore destination {0:?} already exists")]
    DestinationExists(std::path::PathBuf),
}

/// Maps an error to the process exit code the external-interfaces policy
/// calls for: 0 success, distinct small integers per error family.
pub fn exit_code(error: &Error) -> i32 {
    match error {
        Error::Config(_) => 2,
        Error::Archive(_) | Error::Writer(_) | Error::Pipeline(_) | Error::Reader(_) | Error::Volume(_) | Error::HashMismatch(_) => 3,
        Error::Crypt(_) | Error::Rsa(_) | Error::KeyEncoding(_) => 4,
        Error::Catalog(_) => 5,
        Error::StillNotImplemented(_) => 6,
        Error::Thread(_) => 7,
        Error::Io(_) | Error::Storage(_) | Error::Pattern(_) | Error::DestinationExists(_) => 1,
    }
}
