//! Reading the process's own code through `/proc/self/mem`.

use std::fs::File;
use std::os::unix::fs::FileExt;
use std::path::PathBuf;

use super::MemoryReader;

/// Default memory file for the current process.
pub const SELF_MEM: &str = "/proc/self/mem";

/// Positional reads from a `mem` file, opened per read.
#[derive(Debug, Clone)]
pub struct ProcMemReader {
    mem_path: PathBuf,
}

impl Default for ProcMemReader {
    fn default() -> Self {
        Self {
            mem_path: PathBuf::from(SELF_MEM),
        }
    }
}

impl MemoryReader for ProcMemReader {
    fn read(&self, address: usize, len: usize) -> std::io::Result<Vec<u8>> {
        let file = File::open(&self.mem_path)?;
        let mut buf = vec![0u8; len];
        file.read_exact_at(&mut buf, address as u64)?;
        Ok(buf)
    }
}
