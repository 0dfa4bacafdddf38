//! Ordered pattern table for the categorical attributes.
//!
//! Rows are listed in priority order within each category: the first row
//! whose pattern matches anywhere in the text wins. Changing a priority is a
//! matter of moving a row.

use std::sync::LazyLock;

use regex::Regex;

/// Attribute a rule contributes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Codec,
    Hdr,
    Audio,
    SourceType,
}

/// Canonical output of a matching rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
    /// Fixed canonical name.
    Fixed(&'static str),
    /// The matched text itself, uppercased.
    Literal,
}

/// One compiled row of the table.
#[derive(Debug)]
pub struct Rule {
    pub category: Category,
    /// Lower wins. Derived from row order.
    pub priority: usize,
    pub pattern: Regex,
    pub label: Label,
}

impl Rule {
    /// Canonical label if this rule matches `text`.
    pub fn apply(&self, text: &str) -> Option<String> {
        let found = self.pattern.find(text)?;
        Some(match self.label {
            Label::Fixed(name) => name.to_string(),
            Label::Literal => found.as_str().to_ascii_uppercase(),
        })
    }
}

/// `(category, pattern, label)` rows in priority order.
const TABLE: &[(Category, &str, Label)] = &[
    // Codec
    (Category::Codec, r"\b(?:hevc|[xh]\.?265)\b", Label::Fixed("HEVC")),
    (Category::Codec, r"\b(?:[xh]\.?264|avc)\b", Label::Fixed("x264")),
    (Category::Codec, r"\bav1\b", Label::Fixed("AV1")),
    (Category::Codec, r"\b(?:xvid|divx|vp9|mpeg-?2|vc-?1)\b", Label::Literal),
    // HDR
    (Category::Hdr, r"\b(?:dolby[ ._-]?vision|dovi|dv)\b", Label::Fixed("DV")),
    (Category::Hdr, r"\bhdr10(?:\+|plus\b|p\b)", Label::Fixed("HDR10+")),
    (Category::Hdr, r"\bhdr10\b", Label::Fixed("HDR10")),
    (Category::Hdr, r"\bhdr\b", Label::Fixed("HDR")),
    // Audio
    (Category::Audio, r"\batmos\b", Label::Fixed("Atmos")),
    (Category::Audio, r"\bdts[ ._-]?(?:hd|ma|x)\b|\bdts:x\b", Label::Fixed("DTS-HD")),
    (Category::Audio, r"\btrue[ ._-]?hd\b", Label::Fixed("TrueHD")),
    (Category::Audio, r"\bdts\b", Label::Fixed("DTS")),
    (Category::Audio, r"\b(?:dd\+|ddp|e-?ac-?3)", Label::Fixed("DD+")),
    (Category::Audio, r"\bdd(?:[ ._-]?[1-7]\.[01])?\b|\bac-?3\b|\bdolby[ ._-]?digital\b", Label::Fixed("DD")),
    (Category::Audio, r"\baac", Label::Fixed("AAC")),
    // Source type
    (Category::SourceType, r"\bweb[ ._-]?dl\b", Label::Fixed("WEB-DL")),
    (Category::SourceType, r"\bweb[ ._-]?rip\b", Label::Fixed("WEBRip")),
    (Category::SourceType, r"\b(?:blu[ ._-]?ray|bd[ ._-]?rip|br[ ._-]?rip|bdremux)\b", Label::Fixed("BluRay")),
    (Category::SourceType, r"\bhdtv\b", Label::Fixed("HDTV")),
    (Category::SourceType, r"\bdvd[ ._-]?rip\b|\bdvd\b", Label::Fixed("DVDRip")),
    (Category::SourceType, r"\b(?:hd)?cam(?:rip)?\b|\bhd[ ._-]?ts\b|\btelesync\b", Label::Fixed("CAM")),
    (Category::SourceType, r"\bremux\b", Label::Fixed("Remux")),
];

/// The compiled table, in priority order.
pub static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    TABLE
        .iter()
        .enumerate()
        .map(|(priority, &(category, pattern, label))| Rule {
            category,
            priority,
            pattern: Regex::new(&format!("(?i){pattern}")).expect("rule table pattern"),
            label,
        })
        .collect()
});

/// Highest-priority label for `category`, if any rule matches.
pub fn best_match(category: Category, text: &str) -> Option<String> {
    RULES
        .iter()
        .filter(|rule| rule.category == category)
        .find_map(|rule| rule.apply(text))
}
