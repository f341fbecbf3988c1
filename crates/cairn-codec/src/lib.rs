//! Named codec capabilities consumed by the archive engine: byte compression,
//! symmetric/asymmetric encryption, delta compression against a prior
//! source, and archive signing. Each is a thin, swappable layer over a real
//! crate; algorithms the corpus has no crate for (bzip2, lzma, lzo, xdelta)
//! are represented as named, currently-unimplemented capabilities rather
//! than hand-rolled reimplementations.

pub mod compress;
pub mod crypt;
pub mod delta;
pub mod signature;

pub use compress::CompressAlgorithm;
pub use crypt::CryptAlgorithm;
