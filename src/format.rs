//! Versioned binary serialization of a [`SuffixDatabase`].
//!
//! Layout (all counts and offsets are LEB128 uvarints):
//!
//! ```text
//! magic "PSLT" | version u8
//! huffman_count | huffman_count * 2 * (flag u8, value)
//! label_len     | label bytes
//! node_count    | node_count * (kind u8 [, bit_offset, len u8], child_start, child_count)
//! ```
//!
//! Node kinds: 0 root, 1 text, 2 wildcard, 3 exception.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use tracing::debug;

use crate::database::SuffixDatabase;
use crate::error::{PslError, Result};
use crate::types::{HuffNode, HuffSlot, LabelRef, SuffixNode};

pub const MAGIC: &[u8; 4] = b"PSLT";
pub const VERSION: u8 = 1;

/// Maximum entries per table.
/// Prevents OOM from malformed files with absurdly large varint counts.
const MAX_TABLE_LEN: usize = 16 * 1024 * 1024;

const KIND_ROOT: u8 = 0;
const KIND_TEXT: u8 = 1;
const KIND_WILDCARD: u8 = 2;
const KIND_EXCEPTION: u8 = 3;

/// Serialize a database.
pub fn write_database<W: Write>(db: &SuffixDatabase, writer: &mut W) -> Result<()> {
    writer.write_all(MAGIC)?;
    writer.write_all(&[VERSION])?;

    write_uvarint(writer, db.huffman.len() as u64)?;
    for node in &db.huffman {
        for slot in &node.slots {
            writer.write_all(&[slot.terminal as u8])?;
            write_uvarint(writer, slot.value as u64)?;
        }
    }

    write_uvarint(writer, db.labels.len() as u64)?;
    writer.write_all(&db.labels)?;

    write_uvarint(writer, db.nodes.len() as u64)?;
    for node in &db.nodes {
        match node.label {
            LabelRef::Root => writer.write_all(&[KIND_ROOT])?,
            LabelRef::Text { bit_offset, len } => {
                writer.write_all(&[KIND_TEXT])?;
                write_uvarint(writer, bit_offset as u64)?;
                writer.write_all(&[len])?;
            }
            LabelRef::Wildcard => writer.write_all(&[KIND_WILDCARD])?,
            LabelRef::Exception => writer.write_all(&[KIND_EXCEPTION])?,
        }
        write_uvarint(writer, node.child_start as u64)?;
        write_uvarint(writer, node.child_count as u64)?;
    }

    Ok(())
}

/// Deserialize and validate a database.
pub fn read_database<R: Read>(reader: &mut R) -> Result<SuffixDatabase> {
    let mut magic = [0u8; 4];
    reader
        .read_exact(&mut magic)
        .map_err(|e| PslError::invalid_format(format!("Failed to read header: {}", e)))?;
    if &magic != MAGIC {
        return Err(PslError::invalid_format(format!(
            "Bad magic {:02x?}, not a suffix database",
            magic
        )));
    }

    let version = read_byte(reader)?;
    if version != VERSION {
        return Err(PslError::invalid_format(format!(
            "Unknown suffix database version: {}",
            version
        )));
    }

    let count = read_len(reader, "Huffman table")?;
    let mut huffman = Vec::with_capacity(count);
    for _ in 0..count {
        let mut node = HuffNode::default();
        for slot in node.slots.iter_mut() {
            let terminal = match read_byte(reader)? {
                0 => false,
                1 => true,
                flag => {
                    return Err(PslError::invalid_format(format!(
                        "Invalid Huffman slot flag: {}",
                        flag
                    )))
                }
            };
            let value = read_uvarint(reader)?;
            let value = u16::try_from(value).map_err(|_| {
                PslError::invalid_format(format!("Huffman slot value {} out of range", value))
            })?;
            *slot = HuffSlot { terminal, value };
        }
        huffman.push(node);
    }

    let len = read_len(reader, "label table")?;
    let mut labels = vec![0u8; len];
    reader
        .read_exact(&mut labels)
        .map_err(|e| PslError::invalid_format(format!("Failed to read label table: {}", e)))?;

    let count = read_len(reader, "node table")?;
    let mut nodes = Vec::with_capacity(count);
    for _ in 0..count {
        let label = match read_byte(reader)? {
            KIND_ROOT => LabelRef::Root,
            KIND_TEXT => {
                let bit_offset = read_u32(reader)?;
                let len = read_byte(reader)?;
                LabelRef::Text { bit_offset, len }
            }
            KIND_WILDCARD => LabelRef::Wildcard,
            KIND_EXCEPTION => LabelRef::Exception,
            kind => {
                return Err(PslError::invalid_format(format!(
                    "Unknown node kind: {}",
                    kind
                )))
            }
        };
        let child_start = read_u32(reader)?;
        let child_count = read_u32(reader)?;
        nodes.push(SuffixNode {
            label,
            child_start,
            child_count,
        });
    }

    SuffixDatabase::from_parts(huffman, labels, nodes)
}

/// Deserialize a database from an in-memory blob.
pub fn from_bytes(mut bytes: &[u8]) -> Result<SuffixDatabase> {
    read_database(&mut bytes)
}

/// Serialize a database to an in-memory blob.
pub fn to_bytes(db: &SuffixDatabase) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    write_database(db, &mut buf)?;
    Ok(buf)
}

/// Load a compiled database file
pub fn load_database(path: impl AsRef<Path>) -> Result<SuffixDatabase> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| {
        PslError::invalid_format(format!(
            "Failed to open suffix database '{}': {}",
            path.display(),
            e
        ))
    })?;
    let db = read_database(&mut BufReader::new(file))?;
    debug!(path = %path.display(), nodes = db.node_count(), "loaded suffix database");
    Ok(db)
}

/// Save a compiled database file
pub fn save_database(db: &SuffixDatabase, path: impl AsRef<Path>) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    write_database(db, &mut writer)?;
    writer.flush()?;
    Ok(())
}

/// Verify compiled database file integrity
pub fn verify(path: impl AsRef<Path>) -> Result<()> {
    let _ = load_database(path)?;
    Ok(())
}

// Helper functions for varint-encoded data

fn write_uvarint<W: Write>(writer: &mut W, mut value: u64) -> Result<()> {
    while value >= 0x80 {
        writer.write_all(&[(value as u8) | 0x80])?;
        value >>= 7;
    }
    writer.write_all(&[value as u8])?;
    Ok(())
}

fn read_byte<R: Read>(reader: &mut R) -> Result<u8> {
    let mut buf = [0u8; 1];
    reader
        .read_exact(&mut buf)
        .map_err(|e| PslError::invalid_format(format!("Failed to read byte: {}", e)))?;
    Ok(buf[0])
}

fn read_uvarint<R: Read>(reader: &mut R) -> Result<u64> {
    let mut result = 0u64;
    let mut shift = 0u32;

    loop {
        let byte = read_byte(reader)?;
        result |= ((byte & 0x7f) as u64) << shift;

        if byte & 0x80 == 0 {
            break;
        }

        shift += 7;
        if shift >= 64 {
            return Err(PslError::invalid_format("Varint overflow"));
        }
    }

    Ok(result)
}

fn read_u32<R: Read>(reader: &mut R) -> Result<u32> {
    let value = read_uvarint(reader)?;
    u32::try_from(value)
        .map_err(|_| PslError::invalid_format(format!("Value {} exceeds 32 bits", value)))
}

fn read_len<R: Read>(reader: &mut R, what: &str) -> Result<usize> {
    let len = read_uvarint(reader)?;
    if len > MAX_TABLE_LEN as u64 {
        return Err(PslError::invalid_format(format!(
            "{} length {} exceeds limit of {}",
            what, len, MAX_TABLE_LEN
        )));
    }
    Ok(len as usize)
}
