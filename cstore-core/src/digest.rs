//! SHA256 content addressing.
//!
//! A [`Digest`] is the lowercase hex SHA256 of a blob's bytes and is the only
//! way blobs are addressed. [`DigestReader`] hashes bytes as they flow through
//! it so that an upload can be verified without a second pass over the data.

use bytes::Bytes;
use futures_util::Stream;
use sha2::{Digest as _, Sha256};
use std::fmt;
use std::io::{self, Read};
use std::pin::Pin;
use std::task::{Context, Poll};

use crate::error::{CstoreError, Result};

/// Length of a hex-encoded SHA256 digest.
pub const DIGEST_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest(String);

impl Digest {
    /// Compute the digest of `content`.
    pub fn of(content: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(content);
        Self(hex::encode(hasher.finalize()))
    }

    /// Parse a digest, accepting exactly 64 lowercase hex characters.
    pub fn parse(value: &str) -> Result<Self> {
        if value.len() != DIGEST_LEN {
            return Err(CstoreError::InvalidDigest(format!(
                "expected {} hex characters, got {}",
                DIGEST_LEN,
                value.len()
            )));
        }

        if !value
            .bytes()
            .all(|byte| byte.is_ascii_digit() || (b'a'..=b'f').contains(&byte))
        {
            return Err(CstoreError::InvalidDigest(format!(
                "not a lowercase hex digest: {}",
                value
            )));
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compute the hex SHA256 of `content`.
pub fn compute_digest(content: &[u8]) -> String {
    Digest::of(content).0
}

/// Wraps a byte source and keeps a running SHA256 of everything read from it.
///
/// Works over blocking readers ([`Read`]) and over chunked byte streams such as
/// an HTTP request body ([`Stream`]). The hash is independent of how the source
/// is chunked.
pub struct DigestReader<R> {
    inner: R,
    hasher: Sha256,
    bytes_read: u64,
}

impl<R> DigestReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            hasher: Sha256::new(),
            bytes_read: 0,
        }
    }

    /// Digest of all data read so far.
    pub fn digest(&self) -> Digest {
        Digest(hex::encode(self.hasher.clone().finalize()))
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    fn record(&mut self, chunk: &[u8]) {
        // Updating an in-memory SHA256 state cannot fail.
        self.hasher.update(chunk);
        self.bytes_read += chunk.len() as u64;
    }
}

impl<R: Read> Read for DigestReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n > 0 {
            self.record(&buf[..n]);
        }
        Ok(n)
    }
}

impl<S, E> Stream for DigestReader<S>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
{
    type Item = std::result::Result<Bytes, E>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        match Pin::new(&mut this.inner).poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                this.record(&chunk);
                Poll::Ready(Some(Ok(chunk)))
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    const TEST_DIGEST: &str = "314ad142957febe390cc7223b4deb1d1b21c187f84f6e7257a23fe46c27fcae3";

    #[test]
    fn digest_matches_known_value() {
        assert_eq!(compute_digest(b"Test."), TEST_DIGEST);
        assert_eq!(Digest::of(b"Test.").as_str(), TEST_DIGEST);
        assert_eq!(Digest::of(b"Test."), Digest::of(b"Test."));
    }

    #[test]
    fn parse_accepts_only_lowercase_hex() {
        assert!(Digest::parse(TEST_DIGEST).is_ok());
        assert!(Digest::parse("foo").is_err());
        assert!(Digest::parse("---").is_err());
        assert!(Digest::parse("").is_err());
        assert!(Digest::parse(&TEST_DIGEST.to_uppercase()).is_err());
        assert!(Digest::parse(&format!("{}0", TEST_DIGEST)).is_err());

        let mut bad = TEST_DIGEST.to_string();
        bad.replace_range(0..1, "g");
        assert!(matches!(
            Digest::parse(&bad),
            Err(CstoreError::InvalidDigest(_))
        ));
    }

    #[test]
    fn reader_hashes_everything_read() {
        let mut reader = DigestReader::new(&b"Test."[..]);
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();

        assert_eq!(out, b"Test.");
        assert_eq!(reader.digest().as_str(), TEST_DIGEST);
        assert_eq!(reader.bytes_read(), 5);
    }

    #[test]
    fn reader_digest_is_independent_of_read_size() {
        let content: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let expected = Digest::of(&content);

        for chunk_size in [1usize, 7, 64, 4096, 20_000] {
            let mut reader = DigestReader::new(content.as_slice());
            let mut buf = vec![0u8; chunk_size];
            let mut out = Vec::new();
            loop {
                let n = reader.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                out.extend_from_slice(&buf[..n]);
            }
            assert_eq!(out, content);
            assert_eq!(reader.digest(), expected, "chunk size {}", chunk_size);
        }
    }

    #[tokio::test]
    async fn stream_digest_is_independent_of_chunking() {
        let chunks: Vec<std::result::Result<Bytes, io::Error>> = vec![
            Ok(Bytes::from_static(b"Te")),
            Ok(Bytes::new()),
            Ok(Bytes::from_static(b"st")),
            Ok(Bytes::from_static(b".")),
        ];
        let mut reader = DigestReader::new(futures_util::stream::iter(chunks));

        let mut out = Vec::new();
        while let Some(chunk) = reader.next().await {
            out.extend_from_slice(&chunk.unwrap());
        }

        assert_eq!(out, b"Test.");
        assert_eq!(reader.digest().as_str(), TEST_DIGEST);
    }
}
