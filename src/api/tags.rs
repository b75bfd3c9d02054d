use serde::{Deserialize, Serialize};

/// The tags attached to a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tags {
    /// Tag names, in server order.
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Tags {
    /// Wraps a list of tag names.
    pub fn new(tags: Vec<String>) -> Self {
        Self { tags }
    }
}

/// Tags to add to and remove from a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagsUpdate {
    /// Tags to attach.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags_add: Vec<String>,
    /// Tags to detach.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags_remove: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_skips_empty_lists() {
        let update = TagsUpdate {
            tags_add: vec!["a".to_string()],
            tags_remove: Vec::new(),
        };
        assert_eq!(serde_json::to_string(&update).unwrap(), r#"{"tags_add":["a"]}"#);
    }
}
