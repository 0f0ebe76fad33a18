//! Compiled suffix database.
//!
//! Three flat, index-addressed tables produced once (by [`crate::compile`] or
//! [`crate::format::read_database`]) and then only read:
//!
//! - a Huffman code table, root at index 0, two slots per node
//! - a bit-packed label table; labels are addressed by bit offset
//! - a suffix tree node table, root at index 0, children in contiguous ranges
//!
//! All structural invariants are checked in [`SuffixDatabase::from_parts`], so
//! lookups never need to re-check them.

use crate::error::{PslError, Result};
use crate::matcher::huffman::LabelDecoder;
use crate::types::{DatabaseStats, HuffNode, LabelRef, SuffixNode};

/// Index of the tree root in the node table
pub const ROOT: usize = 0;

/// Immutable compiled public suffix database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuffixDatabase {
    pub(crate) huffman: Vec<HuffNode>,
    pub(crate) labels: Vec<u8>,
    pub(crate) nodes: Vec<SuffixNode>,
}

impl SuffixDatabase {
    /// Build a database from raw tables, validating every structural invariant.
    pub fn from_parts(huffman: Vec<HuffNode>, labels: Vec<u8>, nodes: Vec<SuffixNode>) -> Result<Self> {
        let db = Self {
            huffman,
            labels,
            nodes,
        };
        db.validate()?;
        Ok(db)
    }

    /// Huffman code table
    pub fn huffman(&self) -> &[HuffNode] {
        &self.huffman
    }

    /// Bit-packed label table
    pub fn label_table(&self) -> &[u8] {
        &self.labels
    }

    /// Suffix tree node table
    pub fn nodes(&self) -> &[SuffixNode] {
        &self.nodes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn label_table_len(&self) -> usize {
        self.labels.len()
    }

    pub fn huffman_len(&self) -> usize {
        self.huffman.len()
    }

    /// Size summary, e.g. for logging after a load
    pub fn stats(&self) -> DatabaseStats {
        let wildcards = self
            .nodes
            .iter()
            .filter(|n| n.label == LabelRef::Wildcard)
            .count();
        let exceptions = self
            .nodes
            .iter()
            .filter(|n| n.label == LabelRef::Exception)
            .count();

        DatabaseStats {
            nodes: self.nodes.len(),
            huffman_nodes: self.huffman.len(),
            label_bytes: self.labels.len(),
            wildcards,
            exceptions,
        }
    }

    /// Decode the text label of node `idx`, or `None` for root and sentinels.
    pub fn label_text(&self, idx: usize) -> Option<Vec<u8>> {
        match self.nodes.get(idx)?.label {
            LabelRef::Text { bit_offset, len } => {
                let mut decoder = LabelDecoder::new(&self.huffman, &self.labels, bit_offset as usize);
                (0..len).map(|_| decoder.next_byte()).collect()
            }
            LabelRef::Root | LabelRef::Wildcard | LabelRef::Exception => None,
        }
    }

    fn validate(&self) -> Result<()> {
        self.validate_huffman()?;

        let root = self
            .nodes
            .get(ROOT)
            .ok_or_else(|| PslError::corrupt("node table is empty"))?;
        if root.label != LabelRef::Root {
            return Err(PslError::corrupt("node 0 is not the tree root"));
        }

        for (idx, node) in self.nodes.iter().enumerate() {
            if idx != ROOT && node.label == LabelRef::Root {
                return Err(PslError::corrupt(format!("node {} is a second root", idx)));
            }

            if let LabelRef::Text { bit_offset, len } = node.label {
                self.validate_label(idx, bit_offset, len)?;
            }

            if node.child_count == 0 {
                continue;
            }

            let children = node.children();
            if children.start <= idx || children.end > self.nodes.len() {
                return Err(PslError::corrupt(format!(
                    "node {} has child range {:?} outside {}..{}",
                    idx,
                    children,
                    idx + 1,
                    self.nodes.len()
                )));
            }

            self.validate_siblings(idx, node, children)?;
        }

        Ok(())
    }

    fn validate_siblings(
        &self,
        parent: usize,
        node: &SuffixNode,
        children: std::ops::Range<usize>,
    ) -> Result<()> {
        let mut wildcards = 0;

        for child_idx in children {
            let child = &self.nodes[child_idx];
            match child.label {
                LabelRef::Wildcard => {
                    wildcards += 1;
                    if child.child_count != 0 {
                        return Err(PslError::corrupt(format!(
                            "wildcard node {} has children",
                            child_idx
                        )));
                    }
                }
                LabelRef::Exception => {
                    if node.child_count != 1 || parent == ROOT {
                        return Err(PslError::corrupt(format!(
                            "exception node {} is not the only child of a labelled node",
                            child_idx
                        )));
                    }
                    if child.child_count != 0 {
                        return Err(PslError::corrupt(format!(
                            "exception node {} has children",
                            child_idx
                        )));
                    }
                }
                LabelRef::Root | LabelRef::Text { .. } => {}
            }
        }

        if wildcards > 1 {
            return Err(PslError::corrupt(format!(
                "node {} has {} wildcard children",
                parent, wildcards
            )));
        }

        Ok(())
    }

    fn validate_huffman(&self) -> Result<()> {
        if self.huffman.is_empty() {
            return Err(PslError::corrupt("Huffman code table is empty"));
        }

        for (idx, node) in self.huffman.iter().enumerate() {
            for slot in &node.slots {
                if slot.terminal {
                    if slot.value > u8::MAX as u16 {
                        return Err(PslError::corrupt(format!(
                            "Huffman node {} decodes to non-byte value {}",
                            idx, slot.value
                        )));
                    }
                } else if slot.value as usize >= self.huffman.len() {
                    return Err(PslError::corrupt(format!(
                        "Huffman node {} points to missing node {}",
                        idx, slot.value
                    )));
                }
            }
        }

        Ok(())
    }

    fn validate_label(&self, idx: usize, bit_offset: u32, len: u8) -> Result<()> {
        if len == 0 {
            return Err(PslError::corrupt(format!("node {} has an empty label", idx)));
        }

        let mut decoder = LabelDecoder::new(&self.huffman, &self.labels, bit_offset as usize);
        for _ in 0..len {
            if decoder.next_byte().is_none() {
                return Err(PslError::corrupt(format!(
                    "label of node {} runs past the end of the label table",
                    idx
                )));
            }
        }

        Ok(())
    }
}
