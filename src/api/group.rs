//! Recipient groups.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{comma_joined, GroupId};
use crate::paged::PageSource;
use crate::update::UpdateValue;

/// A keyword pair matched against inbound messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordPair {
    /// First word of the message, matched case-insensitively.
    pub first_word: String,
    /// Optional second word.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub second_word: Option<String>,
}

/// Rules for joining and leaving a group by sending keywords to a number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoUpdate {
    /// The number keywords are sent to.
    pub to: String,
    /// Keywords that add the sender to the group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub add: Option<KeywordPair>,
    /// Keywords that remove the sender.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remove: Option<KeywordPair>,
}

/// A group to create, or to replace an existing group with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GroupCreate {
    /// Display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Phone numbers in the group.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<String>,
    /// Groups whose members are included in this one.
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub child_groups: BTreeSet<GroupId>,
    /// Keyword rules for joining and leaving.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_update: Option<AutoUpdate>,
    /// Tags to attach to the group.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// A partial update of a group.
///
/// `name` and `auto_update` can be cleared with [`UpdateValue::unset`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GroupUpdate {
    /// New name; `None` leaves it untouched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<UpdateValue<String>>,
    /// Phone numbers to add.
    #[serde(rename = "add", skip_serializing_if = "Vec::is_empty")]
    pub member_insertions: Vec<String>,
    /// Phone numbers to remove.
    #[serde(rename = "remove", skip_serializing_if = "Vec::is_empty")]
    pub member_removals: Vec<String>,
    /// Child groups to add.
    #[serde(rename = "child_groups_add", skip_serializing_if = "BTreeSet::is_empty")]
    pub child_group_insertions: BTreeSet<GroupId>,
    /// Child groups to remove.
    #[serde(rename = "child_groups_remove", skip_serializing_if = "BTreeSet::is_empty")]
    pub child_group_removals: BTreeSet<GroupId>,
    /// Copies every member of this group into the updated one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub add_from_group: Option<GroupId>,
    /// Removes every member of this group from the updated one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remove_from_group: Option<GroupId>,
    /// New keyword rules, or unset to remove them.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_update: Option<UpdateValue<AutoUpdate>>,
}

/// A group as stored by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupResponse {
    /// Server-assigned id.
    pub id: GroupId,
    /// Display name, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Number of members, including those of child groups.
    pub size: u32,
    /// Groups included in this one.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub child_groups: BTreeSet<GroupId>,
    /// Keyword rules, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_update: Option<AutoUpdate>,
    /// When the group was created.
    pub created_at: DateTime<Utc>,
    /// When the group was last changed.
    pub modified_at: DateTime<Utc>,
}

/// Filter for listing groups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupFilter {
    /// Items per page; the server default applies when `None`.
    pub page_size: Option<u32>,
    /// Only groups carrying at least one of these tags.
    pub tags: Vec<String>,
}

impl PageSource for GroupFilter {
    type Item = GroupResponse;

    const PATH: &'static str = "/groups";
    const ITEMS_KEY: &'static str = "groups";

    fn query_params(&self, page: u32) -> Vec<(String, String)> {
        let mut params = vec![("page".to_string(), page.to_string())];

        if let Some(page_size) = self.page_size {
            params.push(("page_size".to_string(), page_size.to_string()));
        }
        if !self.tags.is_empty() {
            params.push(("tags".to_string(), comma_joined(&self.tags)));
        }

        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn update_renders_the_three_field_states() {
        let update = GroupUpdate {
            name: Some(UpdateValue::unset()),
            member_insertions: vec!["123".to_string()],
            auto_update: None,
            ..Default::default()
        };

        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            json!({ "name": null, "add": ["123"] })
        );

        let renamed = GroupUpdate {
            name: Some("friends".to_string().into()),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&renamed).unwrap(),
            json!({ "name": "friends" })
        );
    }

    #[test]
    fn decodes_group_response() {
        let group: GroupResponse = serde_json::from_value(json!({
            "id": "g1",
            "name": "friends",
            "size": 2,
            "child_groups": ["g2", "g3"],
            "auto_update": {
                "to": "12345",
                "add": {"first_word": "JOIN"}
            },
            "created_at": "2016-12-01T11:03:13.192Z",
            "modified_at": "2016-12-02T11:03:13.192Z"
        }))
        .unwrap();

        assert_eq!(group.id, GroupId::from("g1"));
        assert_eq!(group.child_groups.len(), 2);
        let auto_update = group.auto_update.unwrap();
        assert_eq!(auto_update.add.unwrap().first_word, "JOIN");
        assert!(auto_update.remove.is_none());
    }

    #[test]
    fn filter_renders_query_params() {
        let filter = GroupFilter {
            page_size: None,
            tags: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(
            filter.query_params(1),
            vec![
                ("page".to_string(), "1".to_string()),
                ("tags".to_string(), "a,b".to_string()),
            ]
        );
    }
}
