use crate::database::SuffixDatabase;
use crate::types::HuffNode;

/// Streaming decoder over the bit-packed label table.
///
/// Bit `i` of the stream is `(table[i >> 3] >> (i & 7)) & 1`.
pub(crate) struct LabelDecoder<'a> {
    code: &'a [HuffNode],
    stream: &'a [u8],
    bit: usize,
}

impl<'a> LabelDecoder<'a> {
    pub(crate) fn new(code: &'a [HuffNode], stream: &'a [u8], bit_offset: usize) -> Self {
        Self {
            code,
            stream,
            bit: bit_offset,
        }
    }

    #[inline]
    fn next_bit(&mut self) -> Option<usize> {
        let byte = *self.stream.get(self.bit >> 3)?;
        let bit = (byte >> (self.bit & 7)) & 1;
        self.bit += 1;
        Some(bit as usize)
    }

    /// Decode one byte, or `None` if the stream ends mid-code.
    #[inline]
    pub(crate) fn next_byte(&mut self) -> Option<u8> {
        let mut node = 0usize;
        loop {
            let bit = self.next_bit()?;
            let slot = self.code[node].slots[bit];
            if slot.terminal {
                return Some(slot.value as u8);
            }
            node = slot.value as usize;
        }
    }
}

impl SuffixDatabase {
    /// Compare the label stored at `bit_offset` against `candidate`, ASCII
    /// case-insensitively, decoding exactly `candidate.len()` bytes.
    ///
    /// Stops at the first mismatching byte. The caller is responsible for
    /// checking the stored label length first.
    ///
    /// # Panics
    ///
    /// If the label table ends before `candidate.len()` bytes are decoded.
    /// Databases built through [`SuffixDatabase::from_parts`] never do this.
    pub fn label_matches(&self, bit_offset: u32, candidate: &[u8]) -> bool {
        let mut decoder = LabelDecoder::new(&self.huffman, &self.labels, bit_offset as usize);

        for &c in candidate {
            let decoded = decoder
                .next_byte()
                .expect("label table exhausted mid-label: corrupt suffix database");
            if c.to_ascii_lowercase() != decoded {
                return false;
            }
        }

        true
    }
}
