use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use encoding_rs::WINDOWS_1252;
use memmap2::{Mmap, MmapOptions};

use crate::limits::ParserLimits;
use crate::model::ParseResult;
use crate::parse::{parse, ParseOptions};

/// A successfully decoded length-prefixed string and the offset just past
/// its last byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PascalStr {
    pub text: String,
    pub next: usize,
}

/// Bounds-checked view over a raw `.VND` buffer.
///
/// Every integer read is clamped: out-of-bounds reads return zero instead
/// of failing, because the validators and recovery scanners routinely
/// probe speculative offsets. A failed [`VndReader::try_read_string`] is
/// the primary misalignment signal for all of them.
#[derive(Debug, Clone, Copy)]
pub struct VndReader<'a> {
    bytes: &'a [u8],
}

impl<'a> VndReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        VndReader { bytes }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn read_u8(&self, offset: usize) -> u8 {
        if offset >= self.bytes.len() {
            return 0;
        }
        self.bytes[offset]
    }

    pub fn read_u32(&self, offset: usize) -> u32 {
        match self.bytes.get(offset..offset + 4) {
            Some(slice) => u32::from_le_bytes(slice.try_into().unwrap()),
            None => 0,
        }
    }

    pub fn read_i32(&self, offset: usize) -> i32 {
        match self.bytes.get(offset..offset + 4) {
            Some(slice) => i32::from_le_bytes(slice.try_into().unwrap()),
            None => 0,
        }
    }

    /// Reads a Pascal string (u32 length followed by that many bytes)
    /// without advancing any cursor.
    ///
    /// Returns `None` when the declared length exceeds the configured
    /// ceiling, the payload would overrun the buffer, or too many of the
    /// payload bytes are control characters outside tab/LF/CR. Trailing
    /// NULs are stripped and the text trimmed; the legacy engine wrote
    /// WINDOWS-1252.
    pub fn try_read_string(&self, offset: usize, limits: &ParserLimits) -> Option<PascalStr> {
        if offset + 4 > self.bytes.len() {
            return None;
        }
        let len = self.read_u32(offset) as usize;

        if len > limits.max_string_len {
            return None;
        }
        if offset + 4 + len > self.bytes.len() {
            return None;
        }
        if len == 0 {
            return Some(PascalStr {
                text: String::new(),
                next: offset + 4,
            });
        }

        let payload = &self.bytes[offset + 4..offset + 4 + len];
        let binary_count = payload
            .iter()
            .filter(|&&b| b < 32 && b != 9 && b != 10 && b != 13)
            .count();
        if binary_count > 0 && binary_count * 100 > len * limits.max_control_percent {
            return None;
        }

        let (decoded, _, _) = WINDOWS_1252.decode(payload);
        let text = decoded.replace('\0', "").trim().to_string();
        Some(PascalStr {
            text,
            next: offset + 4 + len,
        })
    }

    /// Decodes up to `max_len` raw bytes at `offset` as WINDOWS-1252,
    /// clamped to the buffer. Used by detectors peeking at script
    /// literals without a length prefix.
    pub fn decode_window(&self, offset: usize, max_len: usize) -> String {
        let start = offset.min(self.bytes.len());
        let end = (offset + max_len).min(self.bytes.len());
        let (decoded, _, _) = WINDOWS_1252.decode(&self.bytes[start..end]);
        decoded.into_owned()
    }
}

/// A memory-mapped `.VND` file on disk.
#[derive(Debug)]
pub struct VndFile {
    path: PathBuf,
    mmap: Mmap,
}

impl VndFile {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_buf = path.as_ref().to_path_buf();
        let file = File::open(&path_buf)
            .with_context(|| format!("opening VND file at {}", path_buf.display()))?;
        let mmap = unsafe { MmapOptions::new().map(&file) }
            .with_context(|| format!("memory-mapping VND file {}", path_buf.display()))?;
        Ok(VndFile {
            path: path_buf,
            mmap,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn bytes(&self) -> &[u8] {
        &self.mmap
    }

    pub fn parse(&self, options: &ParseOptions) -> ParseResult {
        parse(&self.mmap, options)
    }
}
