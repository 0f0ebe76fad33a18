//! PSL Engine - compact public suffix list lookup for Rust
//!
//! Answers "where does the registrable domain of this hostname start?"
//! against the public suffix list, with support for:
//! - Multi-label suffixes (`co.uk`), wildcard (`*.ck`) and exception (`!www.ck`) rules
//! - The implicit `*` rule for unknown top-level labels
//! - A flat, index-addressed suffix tree with Huffman-compressed labels
//! - Allocation-free, lock-free lookups over a shared immutable database
//! - Versioned binary blobs and optional auto-download of the policy list
//!
//! # Example
//!
//! ```rust
//! use psl_engine::{compile, parse_rules, CompileOptions};
//!
//! let rules_text = "
//! // ===BEGIN ICANN DOMAINS===
//! com
//! uk
//! co.uk
//! *.ck
//! !www.ck
//! // ===BEGIN PRIVATE DOMAINS===
//! github.io
//! ";
//!
//! // Parse and compile the policy
//! let rules = parse_rules(rules_text).unwrap();
//! let db = compile(&rules, &CompileOptions::default()).unwrap();
//!
//! // Look up hostnames
//! assert_eq!(db.registrable_domain("www.example.co.uk"), Some("example.co.uk"));
//! assert_eq!(db.registrable_domain("user.github.io"), Some("user.github.io"));
//! assert_eq!(db.registrable_domain("www.ck"), Some("www.ck"));
//! assert_eq!(db.registrable_domain("co.uk"), None);
//! ```
//!
//! # Lookup results
//!
//! | Hostname | Result |
//! |----------|--------|
//! | `www.example.com` | `example.com` |
//! | `example.com.` | `example.com.` (trailing dot kept) |
//! | `co.uk` | none, it is a public suffix |
//! | `foo.unknowntld` | `foo.unknowntld` (implicit `*` rule) |
//! | `""`, `.com` | none, invalid |

pub mod compile;
pub mod database;
pub mod error;
pub mod format;
pub mod global;
pub mod loader;
pub mod matcher;
pub mod parser;
pub mod types;

// Re-export commonly used items
pub use compile::{compile, CompileOptions};
pub use database::{SuffixDatabase, ROOT};
pub use error::{DatabaseErrorKind, PslError, Result};
pub use format::{load_database, read_database, save_database, write_database};
pub use loader::{LoaderConfig, SuffixLoader, DEFAULT_LIST_URL, DEFAULT_UPDATE_INTERVAL};
pub use parser::{parse_rules, parse_rules_from_file};
pub use types::{
    DatabaseStats, HuffNode, HuffSlot, LabelRef, Lookup, Rule, RuleKind, Section, SuffixNode,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_workflow() {
        let rules_text = r#"
// ===BEGIN ICANN DOMAINS===
com
uk
co.uk
jp
*.kawasaki.jp
!city.kawasaki.jp
// ===END ICANN DOMAINS===
// ===BEGIN PRIVATE DOMAINS===
github.io
"#;

        // Parse rules
        let rules = parse_rules(rules_text).unwrap();
        assert_eq!(rules.len(), 7);

        // Compile rules
        let db = compile(&rules, &CompileOptions::default()).unwrap();

        // Round-trip through the binary format
        let db = format::from_bytes(&format::to_bytes(&db).unwrap()).unwrap();

        // Multi-label suffix
        assert_eq!(
            db.registrable_domain("mail.example.co.uk"),
            Some("example.co.uk")
        );

        // Wildcard and exception
        assert_eq!(
            db.registrable_domain("a.b.kawasaki.jp"),
            Some("a.b.kawasaki.jp")
        );
        assert!(db.is_public_suffix("b.kawasaki.jp"));
        assert_eq!(
            db.registrable_domain("www.city.kawasaki.jp"),
            Some("city.kawasaki.jp")
        );

        // Private section
        assert_eq!(db.public_suffix("me.github.io"), Some("github.io"));

        // Unknown TLD and invalid input
        assert_eq!(db.registrable_domain("host.example.zz"), Some("example.zz"));
        assert_eq!(db.lookup(""), Lookup::Invalid);
    }
}
