//! Composite document identity.
//!
//! A document is addressed by `(space, name, language)`. The empty language
//! denotes the original; every other language is a translation that shares
//! the original's space and name.
//!
//! Text forms:
//! - full name: `Space.Name`, with `.` and `\` in the space escaped by `\`
//! - archive entry name: `Space/Name` or `Space/Name.fr`, with `%`, `.`, `/`
//!   and `\` in space and name written as `%XX`
//! - display: `Space.Name` or `Space.Name:fr`

use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of one document-translation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentKey {
    pub space: String,
    pub name: String,
    /// Empty for the original document.
    pub language: String,
}

impl DocumentKey {
    /// Key of an original (default language) document.
    pub fn new(space: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            space: space.into(),
            name: name.into(),
            language: String::new(),
        }
    }

    /// Same space and name, with the given language.
    pub fn with_language(&self, language: impl Into<String>) -> Self {
        Self {
            space: self.space.clone(),
            name: self.name.clone(),
            language: language.into(),
        }
    }

    pub fn is_translation(&self) -> bool {
        !self.language.is_empty()
    }

    /// Key of the original this key translates (itself when already original).
    pub fn original(&self) -> Self {
        self.with_language("")
    }

    /// `Space.Name` with the space part escaped.
    pub fn full_name(&self) -> String {
        let mut out = String::with_capacity(self.space.len() + self.name.len() + 1);
        for c in self.space.chars() {
            if c == '.' || c == '\\' {
                out.push('\\');
            }
            out.push(c);
        }
        out.push('.');
        out.push_str(&self.name);
        out
    }

    /// Parse a full name, splitting at the first unescaped dot.
    pub fn from_full_name(full_name: &str, language: &str) -> Result<Self, ModelError> {
        let invalid = || ModelError::InvalidFullName(full_name.to_string());

        let mut space = String::new();
        let mut chars = full_name.char_indices();
        let mut split = None;
        while let Some((i, c)) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some((_, escaped)) => space.push(escaped),
                    None => return Err(invalid()),
                },
                '.' => {
                    split = Some(i);
                    break;
                }
                _ => space.push(c),
            }
        }

        let split = split.ok_or_else(invalid)?;
        let name = &full_name[split + 1..];
        if space.is_empty() || name.is_empty() {
            return Err(invalid());
        }

        Ok(Self {
            space,
            name: name.to_string(),
            language: language.to_string(),
        })
    }

    /// Path of this document inside a package archive. The only literal
    /// dot marks the language, so `Notes.fr` the page and `Notes` in French
    /// never share a path.
    pub fn entry_name(&self) -> String {
        let mut out = escape_entry_part(&self.space);
        out.push('/');
        out.push_str(&escape_entry_part(&self.name));
        if !self.language.is_empty() {
            out.push('.');
            out.push_str(&self.language);
        }
        out
    }
}

fn escape_entry_part(part: &str) -> String {
    let mut out = String::with_capacity(part.len());
    for c in part.chars() {
        match c {
            '%' | '.' | '/' | '\\' => out.push_str(&format!("%{:02X}", c as u32)),
            _ => out.push(c),
        }
    }
    out
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.language.is_empty() {
            write!(f, "{}", self.full_name())
        } else {
            write!(f, "{}:{}", self.full_name(), self.language)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_name_roundtrip() {
        let key = DocumentKey::new("Main", "WebHome");
        assert_eq!(key.full_name(), "Main.WebHome");
        assert_eq!(DocumentKey::from_full_name("Main.WebHome", "").unwrap(), key);
    }

    #[test]
    fn test_full_name_escapes_space_dots() {
        let key = DocumentKey::new("a.b\\c", "Page.With.Dots");
        let full = key.full_name();
        assert_eq!(full, "a\\.b\\\\c.Page.With.Dots");
        assert_eq!(DocumentKey::from_full_name(&full, "").unwrap(), key);
    }

    #[test]
    fn test_full_name_rejects_missing_parts() {
        assert!(DocumentKey::from_full_name("NoDot", "").is_err());
        assert!(DocumentKey::from_full_name(".Name", "").is_err());
        assert!(DocumentKey::from_full_name("Space.", "").is_err());
        assert!(DocumentKey::from_full_name("Trailing\\", "").is_err());
    }

    #[test]
    fn test_entry_name() {
        let key = DocumentKey::new("Test", "DocImport");
        assert_eq!(key.entry_name(), "Test/DocImport");
        assert_eq!(key.with_language("fr").entry_name(), "Test/DocImport.fr");
    }

    #[test]
    fn test_entry_name_escapes_reserved_characters() {
        let dotted = DocumentKey::new("Main", "Notes.fr");
        let translated = DocumentKey::new("Main", "Notes").with_language("fr");
        assert_eq!(dotted.entry_name(), "Main/Notes%2Efr");
        assert_eq!(translated.entry_name(), "Main/Notes.fr");
        assert_ne!(dotted.entry_name(), translated.entry_name());

        let odd = DocumentKey::new("a.b/c", "50%\\x");
        assert_eq!(odd.entry_name(), "a%2Eb%2Fc/50%25%5Cx");
    }

    #[test]
    fn test_translation_original() {
        let fr = DocumentKey::new("Test", "DocImport").with_language("fr");
        assert!(fr.is_translation());
        assert!(!fr.original().is_translation());
        assert_eq!(fr.original(), DocumentKey::new("Test", "DocImport"));
    }

    #[test]
    fn test_display() {
        let key = DocumentKey::new("Main", "WebHome");
        assert_eq!(key.to_string(), "Main.WebHome");
        assert_eq!(key.with_language("de").to_string(), "Main.WebHome:de");
    }

    #[test]
    fn test_ordering_groups_translations() {
        let mut keys = vec![
            DocumentKey::new("B", "X"),
            DocumentKey::new("A", "X").with_language("fr"),
            DocumentKey::new("A", "X"),
        ];
        keys.sort();
        assert_eq!(keys[0], DocumentKey::new("A", "X"));
        assert_eq!(keys[1].language, "fr");
    }
}
