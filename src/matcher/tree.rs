use crate::database::SuffixDatabase;
use crate::types::{LabelRef, SuffixNode};

impl SuffixDatabase {
    /// Find the child of `parent` matching `label`.
    ///
    /// Children are scanned in stored order. A wildcard child is remembered
    /// but scanning continues; the first exact match ends the scan and wins
    /// over any wildcard. An exact match whose only child is an exception
    /// sentinel yields `None` outright.
    ///
    /// # Panics
    ///
    /// If `parent` is not a node index of this database.
    pub fn match_child(&self, parent: usize, label: &[u8]) -> Option<usize> {
        let mut matched = None;

        for idx in self.nodes[parent].children() {
            let child = &self.nodes[idx];
            match child.label {
                LabelRef::Wildcard => matched = Some(idx),
                LabelRef::Text { bit_offset, len } => {
                    if len as usize == label.len() && self.label_matches(bit_offset, label) {
                        if self.is_exception(child) {
                            return None;
                        }
                        return Some(idx);
                    }
                }
                LabelRef::Root | LabelRef::Exception => {}
            }
        }

        matched
    }

    /// True when `node`'s only child is the exception sentinel.
    fn is_exception(&self, node: &SuffixNode) -> bool {
        node.child_count == 1 && self.nodes[node.child_start as usize].label == LabelRef::Exception
    }
}

#[cfg(test)]
mod tests {
    use crate::compile::{compile, CompileOptions};
    use crate::database::{SuffixDatabase, ROOT};
    use crate::parser::parse_rules;
    use crate::types::{HuffNode, HuffSlot, LabelRef, Lookup, SuffixNode};

    fn db(rules: &str) -> SuffixDatabase {
        compile(&parse_rules(rules).unwrap(), &CompileOptions::default()).unwrap()
    }

    fn label_of(db: &SuffixDatabase, idx: Option<usize>) -> Option<Vec<u8>> {
        idx.and_then(|i| db.label_text(i))
    }

    #[test]
    fn test_exact_match() {
        let db = db("com\nnet\norg\n");
        let idx = db.match_child(ROOT, b"net");
        assert_eq!(label_of(&db, idx), Some(b"net".to_vec()));
        assert_eq!(db.match_child(ROOT, b"io"), None);
    }

    #[test]
    fn test_length_must_match() {
        let db = db("com\n");
        assert_eq!(db.match_child(ROOT, b"co"), None);
        assert_eq!(db.match_child(ROOT, b"comm"), None);
        assert_eq!(db.match_child(ROOT, b""), None);
    }

    #[test]
    fn test_case_insensitive() {
        let db = db("com\n");
        assert!(db.match_child(ROOT, b"COM").is_some());
        assert!(db.match_child(ROOT, b"cOm").is_some());
    }

    #[test]
    fn test_wildcard_fallback() {
        let db = db("*.ck\n");
        let ck = db.match_child(ROOT, b"ck").unwrap();
        let any = db.match_child(ck, b"anything").unwrap();
        assert_eq!(db.label_text(any), None);
        assert_eq!(db.nodes()[any].label, LabelRef::Wildcard);
    }

    #[test]
    fn test_exact_beats_wildcard() {
        let db = db("*.jp\nkawasaki.jp\n");
        let jp = db.match_child(ROOT, b"jp").unwrap();
        let idx = db.match_child(jp, b"kawasaki");
        assert_eq!(label_of(&db, idx), Some(b"kawasaki".to_vec()));
    }

    #[test]
    fn test_exception_annuls_match() {
        let db = db("*.ck\n!www.ck\n");
        let ck = db.match_child(ROOT, b"ck").unwrap();
        assert_eq!(db.match_child(ck, b"www"), None);
        assert!(db.match_child(ck, b"foo").is_some());
    }

    #[test]
    fn test_leaf_has_no_matches() {
        let db = db("uk\nco.uk\n");
        let uk = db.match_child(ROOT, b"uk").unwrap();
        let co = db.match_child(uk, b"co").unwrap();
        assert_eq!(db.match_child(co, b"example"), None);
    }

    // a -> [a -> [!], *], text child stored ahead of the wildcard
    fn text_before_wildcard() -> SuffixDatabase {
        let node = |label, child_start, child_count| SuffixNode {
            label,
            child_start,
            child_count,
        };
        let a = LabelRef::Text {
            bit_offset: 0,
            len: 1,
        };
        SuffixDatabase::from_parts(
            vec![HuffNode {
                slots: [HuffSlot::leaf(b'a'), HuffSlot::leaf(b'b')],
            }],
            vec![0],
            vec![
                node(LabelRef::Root, 1, 1),
                node(a, 2, 2),
                node(a, 4, 1),
                node(LabelRef::Wildcard, 0, 0),
                node(LabelRef::Exception, 0, 0),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_stored_order_exception_before_wildcard() {
        let db = text_before_wildcard();
        let parent = db.match_child(ROOT, b"a").unwrap();
        assert_eq!(parent, 1);

        // exact match carrying the exception ends the scan, the later
        // wildcard is never consulted
        assert_eq!(db.match_child(parent, b"a"), None);
        assert_eq!(db.match_child(parent, b"b"), Some(3));

        assert_eq!(db.lookup("a.a.a"), Lookup::Registrable(2));
        assert_eq!(db.lookup("b.a"), Lookup::PublicSuffix);
        assert_eq!(db.lookup("x.b.a"), Lookup::Registrable(0));
    }
}
