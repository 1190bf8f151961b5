//! Page I/O
//!
//! Maps page buffers to their byte range in the backing file.
//!
//! Every read and write names its own byte offset (pread/pwrite style), so
//! there is no shared file cursor to keep in sync between calls.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use tracing::trace;

use crate::error::Result;

use super::{Page, PageId, PAGE_SIZE};

/// The backing file, addressed in whole pages
pub struct PageFile {
    /// File handle, exclusively owned for the lifetime of the store
    file: File,
    /// Path the file was opened from
    path: PathBuf,
    /// `sync_data` after each page write
    sync_on_write: bool,
}

impl PageFile {
    /// Open the backing file for reading and writing, creating it if absent
    pub fn open(path: &Path, sync_on_write: bool) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
            sync_on_write,
        })
    }

    /// Read exactly one page
    ///
    /// Fails with an `UnexpectedEof` I/O error when the file does not hold a
    /// full page at this id.
    pub fn read_page(&self, page_id: PageId) -> Result<Page> {
        let offset = page_offset(page_id)?;
        let mut data = Box::new([0u8; PAGE_SIZE]);
        read_exact_at(&self.file, &mut data[..], offset)?;

        trace!(page_id, offset, "read page");
        Ok(Page::from_bytes(page_id, data))
    }

    /// Write a page back if it is dirty
    ///
    /// Returns `true` when bytes were written. Writes are always the whole
    /// page, never a partial range.
    pub fn write_page(&self, page: &mut Page) -> Result<bool> {
        if !page.is_dirty() {
            trace!(page_id = page.id(), "skip write of clean page");
            return Ok(false);
        }

        let offset = page_offset(page.id())?;
        write_all_at(&self.file, &page.as_bytes()[..], offset)?;
        if self.sync_on_write {
            self.file.sync_data()?;
        }
        page.mark_clean();

        trace!(page_id = page.id(), offset, "wrote page");
        Ok(true)
    }

    /// Current file length in bytes
    pub fn len(&self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Number of whole pages in the file (a trailing partial page is not counted)
    pub fn page_count(&self) -> Result<u64> {
        Ok(self.len()? / PAGE_SIZE as u64)
    }

    /// Flush file contents and metadata to disk
    pub fn sync(&self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Byte offset of a page within the file
fn page_offset(page_id: PageId) -> Result<u64> {
    page_id.checked_mul(PAGE_SIZE as u64).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("page id {} is beyond the addressable file range", page_id),
        )
        .into()
    })
}

// =============================================================================
// Positioned I/O
// =============================================================================

#[cfg(unix)]
fn read_exact_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.read_exact_at(buf, offset)
}

#[cfg(unix)]
fn write_all_at(file: &File, buf: &[u8], offset: u64) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.write_all_at(buf, offset)
}

#[cfg(windows)]
fn read_exact_at(file: &File, mut buf: &mut [u8], mut offset: u64) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
        match file.seek_read(buf, offset) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "failed to fill whole page buffer",
                ))
            }
            Ok(n) => {
                let rest = buf;
                buf = &mut rest[n..];
                offset += n as u64;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

#[cfg(windows)]
fn write_all_at(file: &File, mut buf: &[u8], mut offset: u64) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
        match file.seek_write(buf, offset) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "failed to write whole page buffer",
                ))
            }
            Ok(n) => {
                buf = &buf[n..];
                offset += n as u64;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
