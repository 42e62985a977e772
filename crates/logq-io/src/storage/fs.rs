use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use logq_mem::error::{Error as MemError, Result as MemResult};
use logq_mem::SpillStorage;

/// Local filesystem storage (paths are host paths).
#[derive(Debug, Clone, Default)]
pub struct FsStorage;

impl FsStorage {
    pub fn new() -> Self {
        Self
    }
}

impl SpillStorage for FsStorage {
    fn write(&self, path: &str, bytes: &[u8]) -> MemResult<()> {
        let p = Path::new(path);
        if let Some(parent) = p.parent() {
            fs::create_dir_all(parent).map_err(|e| MemError::Storage(format!("mkparent: {e}")))?;
        }
        let mut f = File::create(p).map_err(|e| MemError::Storage(format!("create: {e}")))?;
        f.write_all(bytes)
            .map_err(|e| MemError::Storage(format!("write: {e}")))?;
        f.flush()
            .map_err(|e| MemError::Storage(format!("flush: {e}")))?;
        Ok(())
    }

    fn read_range(&self, path: &str, offset: u64, len: usize) -> MemResult<Vec<u8>> {
        let mut f =
            File::open(Path::new(path)).map_err(|e| MemError::Storage(format!("open: {e}")))?;
        f.seek(SeekFrom::Start(offset))
            .map_err(|e| MemError::Storage(format!("seek: {e}")))?;
        let mut buf = Vec::with_capacity(len);
        f.take(len as u64)
            .read_to_end(&mut buf)
            .map_err(|e| MemError::Storage(format!("read: {e}")))?;
        Ok(buf)
    }

    fn delete(&self, path: &str) -> MemResult<()> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(MemError::Storage(format!("delete: {e}"))),
        }
    }

    fn list(&self, prefix: &str) -> MemResult<Vec<String>> {
        let root = Path::new(prefix);
        let mut results = Vec::new();
        if !root.exists() {
            return Ok(results);
        }

        fn visit(dir: &Path, results: &mut Vec<String>) -> std::io::Result<()> {
            for entry in fs::read_dir(dir)? {
                let path = entry?.path();
                if path.is_dir() {
                    visit(&path, results)?;
                } else if let Some(s) = path.to_str() {
                    results.push(s.to_string());
                }
            }
            Ok(())
        }

        if root.is_file() {
            results.push(prefix.to_string());
        } else {
            visit(root, &mut results).map_err(|e| MemError::Storage(format!("list: {e}")))?;
        }
        results.sort();
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_read_list_delete() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("spill");
        let path = root.join("a/seg0.seg");
        let path = path.to_str().unwrap();

        let fs = FsStorage::new();
        fs.write(path, b"hello world").unwrap();
        assert_eq!(fs.read_range(path, 6, 5).unwrap(), b"world");
        assert_eq!(fs.read_range(path, 6, 100).unwrap(), b"world");
        assert_eq!(fs.list(root.to_str().unwrap()).unwrap(), vec![path.to_string()]);

        fs.delete(path).unwrap();
        fs.delete(path).unwrap();
        assert!(fs.list(root.to_str().unwrap()).unwrap().is_empty());
    }
}
