//! Fixed-size page I/O over a file or an in-memory buffer.
//!
//! Page 0 holds the [`FileHeader`]; node pages follow at
//! `page_id * PAGE_SIZE`. Every page is bincode encoded and zero padded to
//! the page size.

use std::fs::{File, OpenOptions};
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use super::constants::{HEADER_PAGE, PAGE_SIZE};
use super::types::{decode, encode, FileHeader, Node, PageId, PageWithChecksum, RTreeError, RTreeResult};

/// Backing store of a page file.
pub enum PageFile {
    Disk(File),
    Memory(Cursor<Vec<u8>>),
}

impl PageFile {
    fn truncate(&mut self, len: u64) -> io::Result<()> {
        match self {
            PageFile::Disk(file) => file.set_len(len),
            PageFile::Memory(buffer) => {
                let len = usize::try_from(len)
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
                buffer.get_mut().truncate(len);
                Ok(())
            }
        }
    }

    fn sync(&mut self) -> io::Result<()> {
        match self {
            PageFile::Disk(file) => file.sync_all(),
            PageFile::Memory(_) => Ok(()),
        }
    }

    fn len(&self) -> io::Result<u64> {
        match self {
            PageFile::Disk(file) => Ok(file.metadata()?.len()),
            PageFile::Memory(buffer) => Ok(buffer.get_ref().len() as u64),
        }
    }
}

impl Read for PageFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            PageFile::Disk(file) => file.read(buf),
            PageFile::Memory(buffer) => buffer.read(buf),
        }
    }
}

impl Write for PageFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            PageFile::Disk(file) => file.write(buf),
            PageFile::Memory(buffer) => buffer.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            PageFile::Disk(file) => file.flush(),
            PageFile::Memory(buffer) => buffer.flush(),
        }
    }
}

impl Seek for PageFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self {
            PageFile::Disk(file) => file.seek(pos),
            PageFile::Memory(buffer) => buffer.seek(pos),
        }
    }
}

pub struct Storage {
    file: Mutex<PageFile>,
    path: Option<PathBuf>,
}

impl Storage {
    /// Creates (or truncates) a page file at `path`.
    pub fn create(path: &Path) -> RTreeResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(Self {
            file: Mutex::new(PageFile::Disk(file)),
            path: Some(path.to_path_buf()),
        })
    }

    /// Opens an existing page file.
    pub fn open(path: &Path) -> RTreeResult<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(Self {
            file: Mutex::new(PageFile::Disk(file)),
            path: Some(path.to_path_buf()),
        })
    }

    /// An anonymous page file that lives in memory.
    pub fn in_memory() -> Self {
        Self {
            file: Mutex::new(PageFile::Memory(Cursor::new(Vec::new()))),
            path: None,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn read_header(&self) -> RTreeResult<FileHeader> {
        let buffer = self.read_raw(HEADER_PAGE)?;
        decode(&buffer)
    }

    pub fn write_header(&self, header: &FileHeader) -> RTreeResult<()> {
        let bytes = encode(header)?;
        self.write_raw(HEADER_PAGE, bytes)
    }

    pub fn read_page(&self, page_id: PageId) -> RTreeResult<Node> {
        check_node_page(page_id)?;
        let buffer = self.read_raw(page_id)?;
        let page: PageWithChecksum = decode(&buffer)?;
        page.into_node()
    }

    pub fn write_page(&self, page_id: PageId, node: &Node) -> RTreeResult<()> {
        check_node_page(page_id)?;
        let bytes = encode(&PageWithChecksum::new(node.clone())?)?;
        self.write_raw(page_id, bytes)
    }

    pub fn sync(&self) -> RTreeResult<()> {
        self.file.lock().sync()?;
        Ok(())
    }

    /// Cuts the file down to `pages` pages.
    pub fn truncate(&self, pages: u64) -> RTreeResult<()> {
        self.file.lock().truncate(pages * PAGE_SIZE as u64)?;
        Ok(())
    }

    /// Current length of the backing file in bytes.
    pub fn len(&self) -> RTreeResult<u64> {
        Ok(self.file.lock().len()?)
    }

    fn read_raw(&self, page_id: PageId) -> RTreeResult<Vec<u8>> {
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(page_id * PAGE_SIZE as u64))?;
        let mut buffer = vec![0u8; PAGE_SIZE];
        file.read_exact(&mut buffer).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => {
                RTreeError::Corrupted(format!("Page {} is truncated", page_id))
            }
            _ => RTreeError::Io(e),
        })?;
        Ok(buffer)
    }

    fn write_raw(&self, page_id: PageId, mut bytes: Vec<u8>) -> RTreeResult<()> {
        if bytes.len() > PAGE_SIZE {
            return Err(RTreeError::InvalidOperation(format!(
                "Page too large: {} bytes (max {})",
                bytes.len(),
                PAGE_SIZE
            )));
        }
        bytes.resize(PAGE_SIZE, 0);

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(page_id * PAGE_SIZE as u64))?;
        file.write_all(&bytes)?;
        Ok(())
    }
}

fn check_node_page(page_id: PageId) -> RTreeResult<()> {
    if page_id == HEADER_PAGE {
        return Err(RTreeError::InvalidOperation(
            "Page 0 is reserved for the header".into(),
        ));
    }
    Ok(())
}
