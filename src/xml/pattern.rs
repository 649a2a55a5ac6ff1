//! Wildcard patterns
//!
//! `*` matches any run of characters (possibly empty) and `?` matches exactly
//! one. Every wildcard is a capture, so a match also yields the text each
//! wildcard consumed.

use crate::error::{DeployError, DeployResult};
use regex::Regex;

#[derive(Debug, Clone)]
pub struct WildcardPattern {
    pattern: String,
    regex: Regex,
}

impl WildcardPattern {
    pub fn new(pattern: &str) -> DeployResult<Self> {
        let mut source = String::from("^");
        for c in pattern.chars() {
            match c {
                '*' => source.push_str("(.*?)"),
                '?' => source.push_str("(.)"),
                other => source.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
            }
        }
        source.push('$');
        let regex = Regex::new(&source).map_err(|e| {
            DeployError::InvalidArgument(format!("Invalid pattern '{}': {}", pattern, e))
        })?;
        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// Text consumed by each wildcard, or `None` when the text does not match
    pub fn captures(&self, text: &str) -> Option<Vec<String>> {
        let caps = self.regex.captures(text)?;
        Some(
            caps.iter()
                .skip(1)
                .map(|m| m.map(|m| m.as_str().to_string()).unwrap_or_default())
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn star_and_question_mark() {
        let p = WildcardPattern::new("sys_Make*Link*").unwrap();
        assert!(p.is_match("sys_MakeAbsLink"));
        assert!(p.is_match("sys_MakeIntLinkSecure"));
        assert!(!p.is_match("sys_CopyLink"));

        let q = WildcardPattern::new("v?.xsl").unwrap();
        assert!(q.is_match("v1.xsl"));
        assert!(!q.is_match("v10.xsl"));
    }

    #[test]
    fn captures_each_wildcard() {
        let p = WildcardPattern::new("concat($*,*)").unwrap();
        let caps = p
            .captures("concat($rxRoot, '/sys_resources/images/icon.gif')")
            .unwrap();
        assert_eq!(caps, vec!["rxRoot", " '/sys_resources/images/icon.gif'"]);
        assert!(p.captures("substring($a, 1)").is_none());
    }

    #[test]
    fn regex_metacharacters_are_literal() {
        let p = WildcardPattern::new("a.b(c)").unwrap();
        assert!(p.is_match("a.b(c)"));
        assert!(!p.is_match("axb(c)"));
    }
}
