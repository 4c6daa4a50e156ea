//! File digests and the directory checksum aggregate.

use std::io::Read;
use std::path::Path;

use fsjet_types::{Checksum, ChecksumAlgorithm};
use sha2::Digest;
use tokio::io::AsyncReadExt;

use crate::error::{Error, Result};

/// Files are streamed through the hasher in chunks of this size.
const CHUNK_SIZE: usize = 64 * 1024;

/// Incremental hasher over any supported algorithm.
pub(crate) enum Hasher {
    Md5(md5::Md5),
    Sha1(sha1::Sha1),
    Sha256(sha2::Sha256),
    Sha512(sha2::Sha512),
}

impl Hasher {
    pub(crate) fn new(algorithm: ChecksumAlgorithm) -> Self {
        match algorithm {
            ChecksumAlgorithm::Md5 => Hasher::Md5(md5::Md5::new()),
            ChecksumAlgorithm::Sha1 => Hasher::Sha1(sha1::Sha1::new()),
            ChecksumAlgorithm::Sha256 => Hasher::Sha256(sha2::Sha256::new()),
            ChecksumAlgorithm::Sha512 => Hasher::Sha512(sha2::Sha512::new()),
        }
    }

    pub(crate) fn update(&mut self, data: &[u8]) {
        match self {
            Hasher::Md5(h) => h.update(data),
            Hasher::Sha1(h) => h.update(data),
            Hasher::Sha256(h) => h.update(data),
            Hasher::Sha512(h) => h.update(data),
        }
    }

    pub(crate) fn finish(self) -> Checksum {
        match self {
            Hasher::Md5(h) => Checksum::from_digest(ChecksumAlgorithm::Md5, &h.finalize()),
            Hasher::Sha1(h) => Checksum::from_digest(ChecksumAlgorithm::Sha1, &h.finalize()),
            Hasher::Sha256(h) => Checksum::from_digest(ChecksumAlgorithm::Sha256, &h.finalize()),
            Hasher::Sha512(h) => Checksum::from_digest(ChecksumAlgorithm::Sha512, &h.finalize()),
        }
    }
}

/// Digest an in-memory buffer.
pub fn digest_bytes(algorithm: ChecksumAlgorithm, data: &[u8]) -> Checksum {
    let mut hasher = Hasher::new(algorithm);
    hasher.update(data);
    hasher.finish()
}

/// Digest a file's contents, blocking.
pub fn file_checksum_sync(path: &Path, algorithm: ChecksumAlgorithm) -> Result<Checksum> {
    let mut file = std::fs::File::open(path).map_err(|e| Error::io(path, e))?;
    let mut hasher = Hasher::new(algorithm);
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = file.read(&mut buf).map_err(|e| Error::io(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finish())
}

/// Digest a file's contents.
pub async fn file_checksum(path: &Path, algorithm: ChecksumAlgorithm) -> Result<Checksum> {
    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|e| Error::io(path, e))?;
    let mut hasher = Hasher::new(algorithm);
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = file.read(&mut buf).await.map_err(|e| Error::io(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finish())
}

/// Combine child checksums into a directory checksum.
///
/// Hashes `name + hex` for every child in the order given. No children
/// hashes the empty string.
///
/// Symlinks and special files carry no checksum. They are not skipped and no
/// placeholder digest is invented for them: such a child contributes its
/// name alone, so `name + hex` holds only for children that were digested.
///
/// ```
/// use fsjet::checksum::aggregate;
/// use fsjet::ChecksumAlgorithm;
///
/// let empty = aggregate(std::iter::empty(), ChecksumAlgorithm::Md5);
/// assert_eq!(empty.hex, "d41d8cd98f00b204e9800998ecf8427e");
/// ```
pub fn aggregate<'a, I>(children: I, algorithm: ChecksumAlgorithm) -> Checksum
where
    I: IntoIterator<Item = (&'a str, Option<&'a Checksum>)>,
{
    let mut hasher = Hasher::new(algorithm);
    for (name, checksum) in children {
        hasher.update(name.as_bytes());
        if let Some(checksum) = checksum {
            hasher.update(checksum.hex.as_bytes());
        }
    }
    hasher.finish()
}
