use crate::database::{SuffixDatabase, ROOT};
use crate::types::Lookup;

const SEPARATOR: u8 = b'.';

/// Start offset of the label ending at `end`.
#[inline]
fn label_start(host: &[u8], end: usize) -> usize {
    host[..end]
        .iter()
        .rposition(|&b| b == SEPARATOR)
        .map_or(0, |pos| pos + 1)
}

impl SuffixDatabase {
    /// Classify `hostname` against the suffix tree.
    ///
    /// Labels are matched right to left starting at the tree root. The first
    /// label that fails to match marks the start of the registrable domain.
    /// An unknown top-level label counts as a one-label public suffix.
    pub fn lookup(&self, hostname: &str) -> Lookup {
        let host = hostname.as_bytes();
        if host.first().map_or(true, |&b| b == SEPARATOR) {
            return Lookup::Invalid;
        }

        // fully qualified names carry one trailing separator
        let mut end = host.len();
        if host[end - 1] == SEPARATOR {
            end -= 1;
        }

        let mut node = ROOT;
        let mut label_count = 0;
        let start = loop {
            let start = label_start(host, end);
            label_count += 1;

            match self.match_child(node, &host[start..end]) {
                Some(child) => node = child,
                None => break start,
            }

            if start == 0 {
                return Lookup::PublicSuffix;
            }
            end = start - 1;
        };

        if label_count > 1 {
            return Lookup::Registrable(start);
        }

        // unknown TLD: it is the suffix, the label before it is registrable
        if start == 0 {
            Lookup::PublicSuffix
        } else {
            Lookup::Registrable(label_start(host, start - 1))
        }
    }

    /// Byte offset in `hostname` where the registrable domain (public suffix
    /// plus one label) begins, or `None` if there is none.
    pub fn registrable_domain_start(&self, hostname: &str) -> Option<usize> {
        self.lookup(hostname).offset()
    }

    /// Registrable domain of `hostname`, borrowed from the input.
    ///
    /// A trailing separator on a fully qualified name is kept.
    pub fn registrable_domain<'a>(&self, hostname: &'a str) -> Option<&'a str> {
        self.registrable_domain_start(hostname)
            .map(|start| &hostname[start..])
    }

    /// Public suffix of `hostname`: the registrable domain minus its first label.
    pub fn public_suffix<'a>(&self, hostname: &'a str) -> Option<&'a str> {
        let domain = self.registrable_domain(hostname)?;
        let dot = domain.find('.')?;
        Some(&domain[dot + 1..])
    }

    /// True when `hostname` is exactly a public suffix.
    pub fn is_public_suffix(&self, hostname: &str) -> bool {
        self.lookup(hostname) == Lookup::PublicSuffix
    }
}
