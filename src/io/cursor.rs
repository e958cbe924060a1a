use std::io::{self, Read, Seek, SeekFrom};
use std::sync::Arc;

use super::source::ByteSource;

/// Wraps an `Arc<dyn ByteSource>` into a stateful `Read + Seek` stream so it
/// can be handed to `zip::ZipArchive`.
pub struct SourceCursor {
    inner: Arc<dyn ByteSource>,
    position: u64,
}

impl SourceCursor {
    pub fn new(inner: Arc<dyn ByteSource>) -> Self {
        Self { inner, position: 0 }
    }
}

impl Read for SourceCursor {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let total_len = self.inner.len();
        if self.position >= total_len {
            return Ok(0);
        }

        let n = (total_len - self.position).min(buf.len() as u64) as usize;
        self.inner.read_exact_at(self.position, &mut buf[..n])?;
        self.position += n as u64;
        Ok(n)
    }
}

impl Seek for SourceCursor {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let base = match pos {
            SeekFrom::Start(p) => {
                self.position = p;
                return Ok(p);
            }
            SeekFrom::End(_) => self.inner.len(),
            SeekFrom::Current(_) => self.position,
        };
        let delta = match pos {
            SeekFrom::End(d) | SeekFrom::Current(d) => d,
            SeekFrom::Start(_) => 0,
        };

        self.position = base
            .checked_add_signed(delta)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "seek before 0"))?;
        Ok(self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemorySource;

    #[test]
    fn test_cursor_reads_and_seeks() {
        let mut cursor = SourceCursor::new(Arc::new(MemorySource::new(b"abcdef".to_vec())));

        let mut buf = [0u8; 4];
        assert_eq!(cursor.read(&mut buf).unwrap(), 4);
        assert_eq!(&buf, b"abcd");

        assert_eq!(cursor.seek(SeekFrom::End(-2)).unwrap(), 4);
        let mut rest = Vec::new();
        cursor.read_to_end(&mut rest).unwrap();
        assert_eq!(rest, b"ef");

        assert!(cursor.seek(SeekFrom::Current(-10)).is_err());
    }
}
