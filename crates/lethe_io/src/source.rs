use std::fs::File;
use std::io::Read;
use std::path::Path;

use lethe_core::Result;
use memmap2::Mmap;

/// Whole-file byte source for a JPEG on disk.
///
/// Maps the file when possible and falls back to a buffered whole-file read
/// (empty files, filesystems that refuse mapping). Either way the scanning
/// core sees one contiguous read-only buffer, and all file I/O has completed
/// before the first segment is walked.
pub enum ImageSource {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl ImageSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match Self::map(path) {
            Ok(mmap) => Ok(Self::Mapped(mmap)),
            Err(_) => Self::read(path),
        }
    }

    fn map(path: &Path) -> std::io::Result<Mmap> {
        let file = File::open(path)?;
        if file.metadata()?.len() == 0 {
            return Err(std::io::Error::other("cannot map an empty file"));
        }

        let mmap = unsafe { Mmap::map(&file) }?;

        #[cfg(target_os = "linux")]
        {
            use memmap2::Advice;
            let _ = mmap.advise(Advice::Sequential);
            let _ = mmap.advise(Advice::WillNeed);
        }

        Ok(mmap)
    }

    fn read(path: &Path) -> Result<Self> {
        let mut file = File::open(path)?;

        #[cfg(target_os = "linux")]
        {
            use rustix::fs::{fadvise, Advice};
            let _ = fadvise(&file, 0, None, Advice::Sequential);
        }

        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        Ok(Self::Owned(bytes))
    }

    #[inline]
    pub fn bytes(&self) -> &[u8] {
        match self {
            Self::Mapped(mmap) => mmap,
            Self::Owned(bytes) => bytes,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes().is_empty()
    }

    #[inline]
    pub fn is_mapped(&self) -> bool {
        matches!(self, Self::Mapped(_))
    }
}

impl AsRef<[u8]> for ImageSource {
    fn as_ref(&self) -> &[u8] {
        self.bytes()
    }
}
