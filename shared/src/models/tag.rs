//! Report category tags

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum length of a tag name
pub const TAG_NAME_MAX_LEN: usize = 50;

/// A category label attached to a photo report (e.g. "道路", "公園")
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Find the tag whose name matches a classifier label, ignoring case and
/// surrounding whitespace
pub fn match_tag_by_label<'a>(tags: &'a [Tag], label: &str) -> Option<&'a Tag> {
    let needle = label.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }
    tags.iter().find(|t| t.name.trim().to_lowercase() == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(name: &str) -> Tag {
        Tag {
            id: Uuid::new_v4(),
            name: name.to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_match_tag_by_label() {
        let tags = vec![tag("Road"), tag("Bench"), tag("公園")];
        assert_eq!(match_tag_by_label(&tags, "bench").map(|t| t.name.as_str()), Some("Bench"));
        assert_eq!(match_tag_by_label(&tags, " ROAD ").map(|t| t.name.as_str()), Some("Road"));
        assert_eq!(match_tag_by_label(&tags, "公園").map(|t| t.name.as_str()), Some("公園"));
        assert!(match_tag_by_label(&tags, "streetlight").is_none());
        assert!(match_tag_by_label(&tags, "  ").is_none());
    }
}
