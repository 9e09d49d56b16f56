//! Fixed-width phrase payload records and the memory-mapped payload table.
//!
//! One 17-byte record per pattern, little-endian, in pattern insertion
//! order: phrase_id (u32), salience (f32), count (u32), 4 reserved bytes,
//! length n (u8). The reserved padding is part of the on-disk contract and
//! must be written verbatim.

use memmap2::Mmap;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

/// Size of one serialized payload record.
pub const PAYLOAD_SIZE: usize = 17;

/// Per-phrase payload attached to an automaton pattern.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Payload {
    pub phrase_id: u32,
    pub salience: f32,
    pub count: u32,
    pub n: u8,
}

impl Payload {
    pub fn new(phrase_id: u32, salience: f32, count: u32, n: u8) -> Self {
        Self {
            phrase_id,
            salience,
            count,
            n,
        }
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.phrase_id.to_le_bytes())?;
        writer.write_all(&self.salience.to_le_bytes())?;
        writer.write_all(&self.count.to_le_bytes())?;
        writer.write_all(&[0u8; 4])?;
        writer.write_all(&[self.n])?;
        Ok(())
    }

    pub fn from_bytes(buf: &[u8; PAYLOAD_SIZE]) -> Self {
        Self {
            phrase_id: u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]),
            salience: f32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]),
            count: u32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]),
            n: buf[16],
        }
    }
}

/// Memory-mapped payload table. Records are decoded on demand by pattern
/// index; the file stays a contiguous read-only slab for the lifetime of
/// the loaded artifact set.
#[derive(Debug)]
pub struct PayloadTable {
    map: Option<Mmap>,
    len: usize,
}

impl PayloadTable {
    /// Map `payloads.bin`. Fails if the file size is not a multiple of the
    /// record size.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        let file_len = file.metadata()?.len() as usize;

        if file_len % PAYLOAD_SIZE != 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "payload table size {} is not a multiple of {}",
                    file_len, PAYLOAD_SIZE
                ),
            ));
        }

        // An empty file cannot be mapped on all platforms; an empty table
        // is still representable.
        let map = if file_len == 0 {
            None
        } else {
            Some(unsafe { Mmap::map(&file)? })
        };

        Ok(Self {
            map,
            len: file_len / PAYLOAD_SIZE,
        })
    }

    /// Number of records in the table.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Total mapped bytes.
    pub fn bytes_len(&self) -> usize {
        self.len * PAYLOAD_SIZE
    }

    /// Decode the record at a pattern index.
    pub fn get(&self, index: usize) -> Option<Payload> {
        if index >= self.len {
            return None;
        }
        let map = self.map.as_ref()?;
        let start = index * PAYLOAD_SIZE;
        let mut buf = [0u8; PAYLOAD_SIZE];
        buf.copy_from_slice(&map[start..start + PAYLOAD_SIZE]);
        Some(Payload::from_bytes(&buf))
    }
}
