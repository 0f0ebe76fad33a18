use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap, HashMap, VecDeque};

use tracing::debug;

use crate::database::{SuffixDatabase, ROOT};
use crate::error::{PslError, Result};
use crate::types::{HuffNode, HuffSlot, LabelRef, Rule, RuleKind, Section, SuffixNode};

/// Options for compiling policy rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    /// Keep rules from the PRIVATE section (e.g. `github.io`)
    pub include_private: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            include_private: true,
        }
    }
}

impl CompileOptions {
    /// Create new compile options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether PRIVATE section rules are kept.
    pub fn with_private(mut self, include: bool) -> Self {
        self.include_private = include;
        self
    }
}

/// Label trie built from rules, TLD at the top
#[derive(Debug, Default)]
struct TrieNode {
    children: BTreeMap<Vec<u8>, TrieNode>,
    wildcard: bool,
    exception: bool,
}

impl TrieNode {
    fn insert(&mut self, rule: &Rule) {
        let mut node = self;
        for label in rule.labels.iter().rev() {
            node = node.children.entry(label.as_bytes().to_vec()).or_default();
        }
        match rule.kind {
            RuleKind::Normal => {}
            RuleKind::Wildcard => node.wildcard = true,
            RuleKind::Exception => node.exception = true,
        }
    }

    /// Exception nodes must stay leaves: the sentinel has to be the only child.
    fn check(&self, path: &mut Vec<String>) -> Result<()> {
        if self.exception && (self.wildcard || !self.children.is_empty()) {
            return Err(PslError::InvalidRule(format!(
                "exception rule !{} conflicts with rules below it",
                path.iter().rev().cloned().collect::<Vec<_>>().join(".")
            )));
        }
        for (label, child) in &self.children {
            path.push(String::from_utf8_lossy(label).into_owned());
            child.check(path)?;
            path.pop();
        }
        Ok(())
    }

    fn collect_labels<'a>(&'a self, out: &mut BTreeSet<&'a [u8]>) {
        for (label, child) in &self.children {
            out.insert(label.as_slice());
            child.collect_labels(out);
        }
    }
}

/// Compile policy rules into a suffix database.
pub fn compile(rules: &[Rule], options: &CompileOptions) -> Result<SuffixDatabase> {
    let mut root = TrieNode::default();
    let mut kept = 0usize;
    for rule in rules {
        if rule.section == Section::Private && !options.include_private {
            continue;
        }
        root.insert(rule);
        kept += 1;
    }
    root.check(&mut Vec::new())?;

    let mut distinct = BTreeSet::new();
    root.collect_labels(&mut distinct);

    let code = HuffmanCode::build(&distinct);
    let mut writer = BitWriter::default();
    let mut offsets = HashMap::with_capacity(distinct.len());
    for label in &distinct {
        let offset = u32::try_from(writer.bit_len)
            .map_err(|_| PslError::InvalidRule("label table exceeds 2^32 bits".to_string()))?;
        for &b in label.iter() {
            for &bit in &code.codes[b as usize] {
                writer.push(bit);
            }
        }
        offsets.insert(*label, offset);
    }

    let nodes = layout(&root, &offsets)?;

    debug!(
        rules = kept,
        nodes = nodes.len(),
        labels = distinct.len(),
        label_bits = writer.bit_len,
        huffman_nodes = code.table.len(),
        "compiled public suffix database"
    );

    SuffixDatabase::from_parts(code.table, writer.bytes, nodes)
}

/// Flatten the trie breadth-first so every node's children are contiguous.
/// Sentinels come first, then labels in ascending byte order.
fn layout(root: &TrieNode, offsets: &HashMap<&[u8], u32>) -> Result<Vec<SuffixNode>> {
    let mut nodes = vec![SuffixNode {
        label: LabelRef::Root,
        child_start: 0,
        child_count: 0,
    }];
    let mut queue = VecDeque::from([(ROOT, root)]);

    while let Some((idx, trie)) = queue.pop_front() {
        let start = nodes.len();

        if trie.exception {
            nodes.push(leaf(LabelRef::Exception));
        }
        if trie.wildcard {
            nodes.push(leaf(LabelRef::Wildcard));
        }
        for (label, child) in &trie.children {
            let len = u8::try_from(label.len()).map_err(|_| {
                PslError::InvalidRule(format!(
                    "label longer than 255 bytes: {}",
                    String::from_utf8_lossy(label)
                ))
            })?;
            let label = LabelRef::Text {
                bit_offset: offsets[label.as_slice()],
                len,
            };
            queue.push_back((nodes.len(), child));
            nodes.push(leaf(label));
        }

        let child_start = to_u32(start)?;
        let child_count = to_u32(nodes.len() - start)?;
        let node = &mut nodes[idx];
        node.child_start = child_start;
        node.child_count = child_count;
    }

    Ok(nodes)
}

fn leaf(label: LabelRef) -> SuffixNode {
    SuffixNode {
        label,
        child_start: 0,
        child_count: 0,
    }
}

fn to_u32(n: usize) -> Result<u32> {
    u32::try_from(n).map_err(|_| PslError::InvalidRule("too many suffix nodes".to_string()))
}

/// Huffman code over label bytes
struct HuffmanCode {
    table: Vec<HuffNode>,
    /// Bits per byte value, in stream order
    codes: Vec<Vec<u8>>,
}

enum BuildNode {
    Leaf(u8),
    Branch(usize, usize),
}

impl HuffmanCode {
    fn build(labels: &BTreeSet<&[u8]>) -> Self {
        let mut freq = [0u64; 256];
        for label in labels {
            for &b in label.iter() {
                freq[b as usize] += 1;
            }
        }

        let mut arena = Vec::new();
        // (weight, arena index); the index breaks ties so the code is deterministic
        let mut heap = BinaryHeap::new();
        for (byte, &weight) in freq.iter().enumerate() {
            if weight > 0 {
                heap.push(Reverse((weight, arena.len())));
                arena.push(BuildNode::Leaf(byte as u8));
            }
        }

        let mut codes = vec![Vec::new(); 256];

        if heap.len() < 2 {
            // one symbol (or none) still costs a bit per byte
            let byte = match heap.pop() {
                Some(Reverse((_, idx))) => match arena[idx] {
                    BuildNode::Leaf(b) => b,
                    BuildNode::Branch(..) => 0,
                },
                None => 0,
            };
            codes[byte as usize] = vec![0];
            let table = vec![HuffNode {
                slots: [HuffSlot::leaf(byte), HuffSlot::leaf(byte)],
            }];
            return Self { table, codes };
        }

        while let Some(Reverse((w0, a))) = heap.pop() {
            let Some(Reverse((w1, b))) = heap.pop() else {
                // last entry is the root
                let mut table = Vec::new();
                emit(&arena, a, &mut table, &mut codes, &mut Vec::new());
                return Self { table, codes };
            };
            heap.push(Reverse((w0 + w1, arena.len())));
            arena.push(BuildNode::Branch(a, b));
        }

        unreachable!("heap drained without a root")
    }
}

/// Write branch `idx` and its subtree into `table`; returns its table index.
fn emit(
    arena: &[BuildNode],
    idx: usize,
    table: &mut Vec<HuffNode>,
    codes: &mut [Vec<u8>],
    prefix: &mut Vec<u8>,
) -> u16 {
    let BuildNode::Branch(zero, one) = arena[idx] else {
        unreachable!("emit called on a leaf");
    };

    let me = table.len();
    table.push(HuffNode::default());

    for (bit, child) in [(0u8, zero), (1u8, one)] {
        prefix.push(bit);
        let slot = match arena[child] {
            BuildNode::Leaf(byte) => {
                codes[byte as usize] = prefix.clone();
                HuffSlot::leaf(byte)
            }
            BuildNode::Branch(..) => HuffSlot::branch(emit(arena, child, table, codes, prefix)),
        };
        prefix.pop();
        table[me].slots[bit as usize] = slot;
    }

    me as u16
}

/// LSB-first bit packer matching the label table addressing
#[derive(Default)]
struct BitWriter {
    bytes: Vec<u8>,
    bit_len: usize,
}

impl BitWriter {
    fn push(&mut self, bit: u8) {
        if self.bit_len % 8 == 0 {
            self.bytes.push(0);
        }
        if bit != 0 {
            self.bytes[self.bit_len >> 3] |= 1 << (self.bit_len & 7);
        }
        self.bit_len += 1;
    }
}
