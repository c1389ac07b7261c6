//! Single `field=pattern` filter rules

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use regex::Regex;

use super::date;
use super::error::RuleError;
use crate::models::Entry;

/// Entry attribute a rule is evaluated against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// Author, comments URL, content, title, URL or any tag
    Any,
    Author,
    CommentsUrl,
    Content,
    Title,
    Url,
    Tag,
    Date,
}

impl Field {
    /// Canonical lower-case name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::Author => "entryauthor",
            Self::CommentsUrl => "entrycommentsurl",
            Self::Content => "entrycontent",
            Self::Title => "entrytitle",
            Self::Url => "entryurl",
            Self::Tag => "entrytag",
            Self::Date => "entrydate",
        }
    }
}

impl FromStr for Field {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "any" => Ok(Self::Any),
            "entryauthor" | "author" => Ok(Self::Author),
            "entrycommentsurl" | "commentsurl" => Ok(Self::CommentsUrl),
            "entrycontent" | "content" => Ok(Self::Content),
            "entrytitle" | "title" => Ok(Self::Title),
            "entryurl" | "url" => Ok(Self::Url),
            "entrytag" | "tag" => Ok(Self::Tag),
            "entrydate" | "date" => Ok(Self::Date),
            _ => Err(RuleError::UnknownField(s.trim().to_string())),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One compiled rule
///
/// Text fields carry a compiled regular expression. The date field keeps
/// only its raw pattern, which is interpreted on every evaluation.
#[derive(Debug, Clone)]
pub struct Rule {
    field: Field,
    pattern: String,
    matcher: Option<Regex>,
}

impl Rule {
    /// Build a rule from a field name and pattern
    pub fn new(field: &str, pattern: &str) -> Result<Self, RuleError> {
        let field: Field = field.parse()?;
        let pattern = pattern.trim().to_string();

        let matcher = match field {
            Field::Date => {
                if !date::is_well_formed(&pattern) {
                    return Err(RuleError::InvalidDatePattern(pattern));
                }
                None
            }
            _ => Some(
                Regex::new(&pattern).map_err(|e| RuleError::InvalidPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })?,
            ),
        };

        Ok(Self {
            field,
            pattern,
            matcher,
        })
    }

    /// Parse a single `field=pattern` line
    pub fn parse(line: &str) -> Result<Self, RuleError> {
        let (field, pattern) = line
            .split_once('=')
            .ok_or_else(|| RuleError::MissingSeparator(line.to_string()))?;
        Self::new(field, pattern)
    }

    pub fn field(&self) -> Field {
        self.field
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Whether this rule matches the entry
    pub fn matches(&self, entry: &Entry, now: DateTime<Utc>) -> bool {
        let Some(re) = &self.matcher else {
            return date::matches(&self.pattern, entry.date, now);
        };

        match self.field {
            Field::Any => {
                re.is_match(&entry.author)
                    || re.is_match(&entry.comments_url)
                    || re.is_match(&entry.content)
                    || re.is_match(&entry.title)
                    || re.is_match(&entry.url)
                    || entry.tags.iter().any(|tag| re.is_match(tag))
            }
            Field::Author => re.is_match(&entry.author),
            Field::CommentsUrl => re.is_match(&entry.comments_url),
            Field::Content => re.is_match(&entry.content),
            Field::Title => re.is_match(&entry.title),
            Field::Url => re.is_match(&entry.url),
            Field::Tag => entry.tags.iter().any(|tag| re.is_match(tag)),
            Field::Date => false,
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.field, self.pattern)
    }
}
