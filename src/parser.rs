use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::Path;

use crate::error::{PslError, Result};
use crate::types::{Rule, RuleKind, Section};

/// Regex pattern for a single policy rule
/// Format: [!][*.]name, where name is letters, digits, marks, `-`, `_` and `.`
static RULE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(!)?(\*\.)?([\p{L}\p{N}\p{M}_.\-]+)$")
        .expect("RULE_PATTERN: hardcoded regex is invalid")
});

const ICANN_MARKER: &str = "===BEGIN ICANN DOMAINS===";
const PRIVATE_MARKER: &str = "===BEGIN PRIVATE DOMAINS===";

/// Longest label the compiled label table can describe.
pub const MAX_LABEL_LEN: usize = u8::MAX as usize;

/// Parse public suffix policy rules from text.
///
/// Follows the `public_suffix_list.dat` conventions: `//` comments, one rule
/// per line (first whitespace-delimited token), section markers inside
/// comments.
pub fn parse_rules(text: &str) -> Result<Vec<Rule>> {
    let mut rules = Vec::new();
    let mut section = Section::Icann;

    for (line_num, line) in text.lines().enumerate() {
        let line_num = line_num + 1; // 1-based line numbers

        let line = match line.find("//") {
            Some(comment_pos) => {
                let comment = &line[comment_pos..];
                if comment.contains(PRIVATE_MARKER) {
                    section = Section::Private;
                } else if comment.contains(ICANN_MARKER) {
                    section = Section::Icann;
                }
                &line[..comment_pos]
            }
            None => line,
        };

        let Some(token) = line.split_whitespace().next() else {
            continue;
        };

        rules.push(parse_single_rule(token, section, line_num)?);
    }

    Ok(rules)
}

/// Parse public suffix policy rules from a file.
pub fn parse_rules_from_file(path: impl AsRef<Path>) -> Result<Vec<Rule>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| {
        PslError::InvalidRule(format!(
            "Failed to read rules file '{}': {}",
            path.display(),
            e
        ))
    })?;
    parse_rules(&text)
}

/// Lowercase ASCII labels; convert internationalized ones to their ACE
/// (`xn--`) form so they compare against normalized hostnames.
fn normalize_label(label: &str, line_num: usize) -> Result<String> {
    if label.is_ascii() {
        return Ok(label.to_ascii_lowercase());
    }
    let ace = idna::domain_to_ascii(label).map_err(|e| PslError::ParseErrorAtLine {
        line: line_num,
        message: format!("Invalid internationalized label {}: {:?}", label, e),
    })?;
    if ace.is_empty() || ace.contains('.') || ace.len() > MAX_LABEL_LEN {
        return Err(PslError::ParseErrorAtLine {
            line: line_num,
            message: format!("Invalid internationalized label: {}", label),
        });
    }
    Ok(ace)
}

/// Parse a single rule token
fn parse_single_rule(token: &str, section: Section, line_num: usize) -> Result<Rule> {
    let captures = RULE_PATTERN
        .captures(token)
        .ok_or_else(|| PslError::ParseErrorAtLine {
            line: line_num,
            message: format!("Invalid rule format: {}", token),
        })?;

    let exception = captures.get(1).is_some();
    let wildcard = captures.get(2).is_some();
    let name = captures.get(3).map_or("", |m| m.as_str());

    let kind = match (exception, wildcard) {
        (false, false) => RuleKind::Normal,
        (false, true) => RuleKind::Wildcard,
        (true, false) => RuleKind::Exception,
        (true, true) => {
            return Err(PslError::ParseErrorAtLine {
                line: line_num,
                message: format!("Exception rule cannot be a wildcard: {}", token),
            })
        }
    };

    let mut labels = Vec::new();
    for label in name.split('.') {
        if label.is_empty() {
            return Err(PslError::ParseErrorAtLine {
                line: line_num,
                message: format!("Empty label in rule: {}", token),
            });
        }
        if label.len() > MAX_LABEL_LEN {
            return Err(PslError::ParseErrorAtLine {
                line: line_num,
                message: format!("Label longer than {} bytes in rule: {}", MAX_LABEL_LEN, token),
            });
        }
        labels.push(normalize_label(label, line_num)?);
    }

    if kind == RuleKind::Exception && labels.len() < 2 {
        return Err(PslError::ParseErrorAtLine {
            line: line_num,
            message: format!("Exception rule needs a parent suffix: {}", token),
        });
    }

    Ok(Rule {
        labels,
        kind,
        section,
        line_num,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_rules() {
        let text = r#"
// This is a comment
com
co.uk
*.ck
!www.ck
"#;

        let rules = parse_rules(text).unwrap();
        assert_eq!(rules.len(), 4);

        assert_eq!(rules[0].labels, vec!["com"]);
        assert_eq!(rules[0].kind, RuleKind::Normal);

        assert_eq!(rules[1].labels, vec!["co", "uk"]);

        assert_eq!(rules[2].labels, vec!["ck"]);
        assert_eq!(rules[2].kind, RuleKind::Wildcard);

        assert_eq!(rules[3].labels, vec!["www", "ck"]);
        assert_eq!(rules[3].kind, RuleKind::Exception);
        assert_eq!(rules[3].line_num, 6);
    }

    #[test]
    fn test_parse_sections() {
        let text = r#"
// ===BEGIN ICANN DOMAINS===
uk
co.uk
// ===END ICANN DOMAINS===
// ===BEGIN PRIVATE DOMAINS===
github.io
"#;

        let rules = parse_rules(text).unwrap();
        assert_eq!(rules.len(), 3);
        assert_eq!(rules[0].section, Section::Icann);
        assert_eq!(rules[1].section, Section::Icann);
        assert_eq!(rules[2].section, Section::Private);
    }

    #[test]
    fn test_only_first_token_is_rule() {
        let rules = parse_rules("com trailing words\n\tnet // comment\n").unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].labels, vec!["com"]);
        assert_eq!(rules[1].labels, vec!["net"]);
    }

    #[test]
    fn test_rules_are_lowercased() {
        let rules = parse_rules("Co.UK\n").unwrap();
        assert_eq!(rules[0].labels, vec!["co", "uk"]);
    }

    #[test]
    fn test_non_ascii_rules_become_punycode() {
        let rules = parse_rules("公司.cn\n中国\n*.Zürich.ch\n").unwrap();
        assert_eq!(rules[0].labels, vec!["xn--55qx5d", "cn"]);
        assert_eq!(rules[1].labels, vec!["xn--fiqs8s"]);
        assert_eq!(rules[2].labels, vec!["xn--zrich-kva", "ch"]);
        assert_eq!(rules[2].kind, RuleKind::Wildcard);
    }

    #[test]
    fn test_invalid_rules() {
        for text in [
            "!*.ck", "foo.*.ck", "a..b", ".com", "com.", "!com", "ex!ample", "<html>",
        ] {
            let err = parse_rules(text).unwrap_err();
            assert!(
                matches!(err, PslError::ParseErrorAtLine { line: 1, .. }),
                "{} should fail, got {:?}",
                text,
                err
            );
        }
    }

    #[test]
    fn test_label_too_long() {
        let text = format!("{}.com", "a".repeat(MAX_LABEL_LEN + 1));
        assert!(parse_rules(&text).is_err());

        let text = format!("{}.com", "a".repeat(MAX_LABEL_LEN));
        assert!(parse_rules(&text).is_ok());
    }

    #[test]
    fn test_error_reports_line_number() {
        let err = parse_rules("com\nnet\n*.*.bad\n").unwrap_err();
        assert!(matches!(err, PslError::ParseErrorAtLine { line: 3, .. }));
    }

    #[test]
    fn test_rule_pattern_is_valid() {
        // Forces Lazy evaluation; if the pattern is invalid, this panics
        assert!(RULE_PATTERN.is_match("com"));
    }
}
