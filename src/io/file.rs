//! Whole-file input for the codecs.
//!
//! Both formats are decoded from one immutable byte slice. Files are
//! memory-mapped when the `mmap` feature is on, read into memory otherwise.

use std::fs::File;
use std::path::Path;

#[cfg(feature = "mmap")]
use memmap2::Mmap;

use crate::util::{Error, Result};

/// Read-only file contents.
pub struct FileBytes {
    inner: Inner,
}

enum Inner {
    #[cfg(feature = "mmap")]
    Mmap(Mmap),
    Owned(Vec<u8>),
}

impl FileBytes {
    /// Open a file, memory-mapping it if possible.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_opts(path, true)
    }

    /// Open a file with optional memory mapping.
    pub fn open_opts(path: impl AsRef<Path>, use_mmap: bool) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;
        let size = file.metadata()?.len();

        #[cfg(feature = "mmap")]
        {
            if use_mmap && size > 0 {
                // Safety: the map is read-only and never outlives this value.
                let mmap = unsafe { Mmap::map(&file) }.map_err(|e| Error::MmapFailed(e.to_string()))?;
                tracing::debug!("mapped {} ({} bytes)", path.display(), size);
                return Ok(Self { inner: Inner::Mmap(mmap) });
            }
        }

        let _ = use_mmap;
        let mut file = file;
        let mut data = Vec::with_capacity(size as usize);
        std::io::Read::read_to_end(&mut file, &mut data)?;
        tracing::debug!("read {} ({} bytes)", path.display(), data.len());
        Ok(Self { inner: Inner::Owned(data) })
    }

    pub fn as_slice(&self) -> &[u8] {
        match &self.inner {
            #[cfg(feature = "mmap")]
            Inner::Mmap(m) => &m[..],
            Inner::Owned(v) => &v[..],
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }
}

/// Write a whole buffer to `path`, replacing any existing file.
pub fn write_file(path: impl AsRef<Path>, bytes: &[u8]) -> Result<()> {
    let path = path.as_ref();
    std::fs::write(path, bytes)?;
    tracing::debug!("wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileBytes::open(dir.path().join("nope.pak")).err().unwrap();
        assert!(matches!(err, Error::FileNotFound(_)));
    }

    #[test]
    fn test_mapped_and_buffered_agree() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        write_file(&path, &[1, 2, 3, 4, 5]).unwrap();
        let mapped = FileBytes::open(&path).unwrap();
        let buffered = FileBytes::open_opts(&path, false).unwrap();
        assert_eq!(mapped.as_slice(), buffered.as_slice());
        assert_eq!(mapped.len(), 5);
    }

    #[test]
    fn test_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.bin");
        write_file(&path, &[]).unwrap();
        assert!(FileBytes::open(&path).unwrap().is_empty());
    }
}
