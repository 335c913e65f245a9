use std::io;

use tokio::io::{AsyncRead, AsyncReadExt};

/// Pulls a channel into one reusable buffer until end-of-stream.
///
/// The buffer is owned by the reader and overwritten on every pull, so a chunk handed out by
/// [`ChunkReader::next_chunk`] is only valid until the next call.
pub struct ChunkReader<R> {
    reader: R,
    buffer: Box<[u8]>,
    bytes_read: u64,
    chunks: u64,
}

impl<R: AsyncRead + Unpin> ChunkReader<R> {
    pub fn new(reader: R, buffer_size: usize) -> Self {
        Self {
            reader,
            buffer: vec![0u8; buffer_size.max(1)].into_boxed_slice(),
            bytes_read: 0,
            chunks: 0,
        }
    }

    /// Returns the next chunk, or `None` once the channel reports end-of-stream.
    pub async fn next_chunk(&mut self) -> io::Result<Option<&[u8]>> {
        let n = loop {
            match self.reader.read(&mut self.buffer).await {
                Ok(n) => break n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        };
        if n == 0 {
            return Ok(None);
        }
        self.bytes_read += n as u64;
        self.chunks += 1;
        Ok(Some(&self.buffer[..n]))
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer.len()
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    pub fn chunks_read(&self) -> u64 {
        self.chunks
    }
}
