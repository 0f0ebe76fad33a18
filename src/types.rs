use serde::{Deserialize, Serialize};

/// Kind of a policy rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    /// Plain suffix rule, e.g. `co.uk`
    Normal,
    /// Wildcard rule, e.g. `*.ck` (any single label under `ck`)
    Wildcard,
    /// Exception rule, e.g. `!www.ck` (`www.ck` is registrable)
    Exception,
}

/// Section of the policy file a rule came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Section {
    /// Rules maintained by ICANN registries
    #[default]
    Icann,
    /// Rules submitted by private domain owners (e.g. `github.io`)
    Private,
}

/// Parsed policy rule before compilation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    /// Labels in hostname order, lowercased, without the `*` / `!` markers.
    /// `*.ck` is stored as `["ck"]`, `!www.ck` as `["www", "ck"]`.
    pub labels: Vec<String>,
    pub kind: RuleKind,
    pub section: Section,
    /// Line number in the policy text (for error reporting)
    pub line_num: usize,
}

impl Rule {
    /// Rule text as it would appear in the policy file
    pub fn to_rule_string(&self) -> String {
        let name = self.labels.join(".");
        match self.kind {
            RuleKind::Normal => name,
            RuleKind::Wildcard => format!("*.{}", name),
            RuleKind::Exception => format!("!{}", name),
        }
    }
}

/// One slot of a Huffman code node, selected by the next input bit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HuffSlot {
    /// Set when `value` is a decoded byte rather than a node index
    pub terminal: bool,
    /// Decoded byte when terminal, else index of the next code node
    pub value: u16,
}

impl HuffSlot {
    pub const fn leaf(byte: u8) -> Self {
        Self {
            terminal: true,
            value: byte as u16,
        }
    }

    pub const fn branch(node: u16) -> Self {
        Self {
            terminal: false,
            value: node,
        }
    }
}

/// Huffman code table node; `slots[bit]` is followed for input bit `bit`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HuffNode {
    pub slots: [HuffSlot; 2],
}

/// Label carried by a suffix tree node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelRef {
    /// Tree root, the empty label beyond the TLD
    Root,
    /// Huffman-coded text at `bit_offset` in the label table, `len` bytes long
    Text { bit_offset: u32, len: u8 },
    /// Matches any single label
    Wildcard,
    /// Annuls the parent's match; never compared against input
    Exception,
}

/// Node of the flattened suffix tree.
///
/// Children occupy `nodes[child_start..child_start + child_count]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuffixNode {
    pub label: LabelRef,
    pub child_start: u32,
    pub child_count: u32,
}

impl SuffixNode {
    pub(crate) fn children(&self) -> std::ops::Range<usize> {
        let start = self.child_start as usize;
        start..start + self.child_count as usize
    }
}

/// Outcome of a hostname lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// Registrable domain starts at this byte offset of the hostname
    Registrable(usize),
    /// The hostname is itself exactly a public suffix
    PublicSuffix,
    /// Empty hostname or leading separator
    Invalid,
}

impl Lookup {
    /// Registrable domain offset, if any
    pub fn offset(self) -> Option<usize> {
        match self {
            Lookup::Registrable(offset) => Some(offset),
            Lookup::PublicSuffix | Lookup::Invalid => None,
        }
    }
}

/// Size summary of a compiled database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseStats {
    pub nodes: usize,
    pub huffman_nodes: usize,
    pub label_bytes: usize,
    pub wildcards: usize,
    pub exceptions: usize,
}
