//! Sequential fixed-size file chunking.
//!
//! Whole-slide images run to tens of gigabytes, so the source file is never
//! buffered in full: each chunk is read on demand as the orchestrator
//! consumes it. Chunks are numbered from 1 in file order, matching the part
//! numbers the completion manifest will list.

use std::path::Path;

use bytes::Bytes;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use crate::error::UploadError;

/// Default chunk size (16 MiB), matching the platform's web uploader.
pub const DEFAULT_CHUNK_SIZE: usize = 16 * 1024 * 1024;

/// One chunk of the source file, numbered from 1.
#[derive(Debug, Clone)]
pub struct FilePart {
    /// 1-based, gap-free part number.
    pub number: u32,
    /// The chunk payload; exactly the chunk size except for the final chunk.
    pub data: Bytes,
}

/// Reads a file as a finite sequence of fixed-size chunks.
///
/// The reader is forward-only and not restartable; open a new one to
/// iterate again.
#[derive(Debug)]
pub struct ChunkReader {
    file: File,
    chunk_size: usize,
    next_number: u32,
    done: bool,
}

impl ChunkReader {
    /// Open `path` for chunked reading.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::InvalidChunkSize`] for a zero `chunk_size` and
    /// [`UploadError::Io`] when the file cannot be opened.
    pub async fn open(path: impl AsRef<Path>, chunk_size: usize) -> Result<Self, UploadError> {
        if chunk_size == 0 {
            return Err(UploadError::InvalidChunkSize);
        }
        let file = File::open(path).await?;
        Ok(Self {
            file,
            chunk_size,
            next_number: 1,
            done: false,
        })
    }

    /// Read the next chunk, or `None` once the file is exhausted.
    ///
    /// A file whose size is an exact multiple of the chunk size produces no
    /// trailing empty chunk.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::Io`] when reading fails; the reader is
    /// unusable afterwards.
    pub async fn next_part(&mut self) -> Result<Option<FilePart>, UploadError> {
        if self.done {
            return Ok(None);
        }

        let mut buffer = vec![0u8; self.chunk_size];
        let mut filled = 0;
        while filled < self.chunk_size {
            let n = self.file.read(&mut buffer[filled..]).await?;
            if n == 0 {
                self.done = true;
                break;
            }
            filled += n;
        }

        if filled == 0 {
            return Ok(None);
        }

        buffer.truncate(filled);
        let number = self.next_number;
        self.next_number += 1;
        Ok(Some(FilePart {
            number,
            data: Bytes::from(buffer),
        }))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn temp_file_with(content: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content).unwrap();
        file.flush().unwrap();
        file
    }

    async fn collect_parts(path: &Path, chunk_size: usize) -> Vec<FilePart> {
        let mut reader = ChunkReader::open(path, chunk_size).await.unwrap();
        let mut parts = Vec::new();
        while let Some(part) = reader.next_part().await.unwrap() {
            parts.push(part);
        }
        parts
    }

    #[tokio::test]
    async fn test_should_chunk_file_with_short_tail() {
        let chunk_size = 64;
        let file = temp_file_with(&vec![0xabu8; 7 * chunk_size + 3]);

        let parts = collect_parts(file.path(), chunk_size).await;
        assert_eq!(parts.len(), 8);
        for (index, part) in parts.iter().enumerate() {
            assert_eq!(part.number as usize, index + 1);
        }
        assert!(parts[..7].iter().all(|p| p.data.len() == chunk_size));
        assert_eq!(parts[7].data.len(), 3);
    }

    #[tokio::test]
    async fn test_should_not_emit_trailing_empty_chunk_for_exact_multiple() {
        let chunk_size = 32;
        let file = temp_file_with(&vec![0x11u8; 4 * chunk_size]);

        let parts = collect_parts(file.path(), chunk_size).await;
        assert_eq!(parts.len(), 4);
        assert!(parts.iter().all(|p| p.data.len() == chunk_size));
    }

    #[tokio::test]
    async fn test_should_yield_nothing_for_empty_file() {
        let file = temp_file_with(b"");
        let parts = collect_parts(file.path(), 16).await;
        assert!(parts.is_empty());
    }

    #[tokio::test]
    async fn test_should_preserve_chunk_content_and_order() {
        let content: Vec<u8> = (0u16..600).map(|i| (i % 251) as u8).collect();
        let file = temp_file_with(&content);

        let parts = collect_parts(file.path(), 256).await;
        let rejoined: Vec<u8> = parts.iter().flat_map(|p| p.data.iter().copied()).collect();
        assert_eq!(rejoined, content);
    }

    #[tokio::test]
    async fn test_should_reject_zero_chunk_size() {
        let file = temp_file_with(b"data");
        let result = ChunkReader::open(file.path(), 0).await;
        assert!(matches!(result, Err(UploadError::InvalidChunkSize)));
    }

    #[tokio::test]
    async fn test_should_keep_returning_none_after_exhaustion() {
        let file = temp_file_with(b"tiny");
        let mut reader = ChunkReader::open(file.path(), 16).await.unwrap();
        assert!(reader.next_part().await.unwrap().is_some());
        assert!(reader.next_part().await.unwrap().is_none());
        assert!(reader.next_part().await.unwrap().is_none());
    }
}
