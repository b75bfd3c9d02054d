//! Request and response types of the XMS REST API.
//!
//! These are plain serde data types. Field names follow the JSON wire format;
//! optional fields are left out of request bodies when unset.

mod batch;
mod delivery;
mod group;
mod tags;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use batch::{
    BatchFilter, DeliveryReport, MtBatchBinarySmsCreate, MtBatchBinarySmsResult,
    MtBatchBinarySmsUpdate, MtBatchSmsResult, MtBatchTextSmsCreate, MtBatchTextSmsResult,
    MtBatchTextSmsUpdate, Parameters,
};
pub use delivery::{
    BatchDeliveryReport, BatchDeliveryReportParams, DeliveryReportType, DeliveryStatus,
    RecipientDeliveryReport, StatusCount,
};
pub use group::{AutoUpdate, GroupCreate, GroupFilter, GroupResponse, GroupUpdate, KeywordPair};
pub use tags::{Tags, TagsUpdate};

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps a server-assigned identifier.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrows the identifier.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

identifier! {
    /// Identifier of a message batch.
    BatchId
}

identifier! {
    /// Identifier of a recipient group.
    GroupId
}

/// Joins list filters the way the API expects them in a query string.
fn comma_joined<T: AsRef<str>>(values: &[T]) -> String {
    values
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_are_transparent_strings() {
        let id = BatchId::from("01FC66621XXXXX119Z8PMV1QPQ");
        assert_eq!(
            serde_json::to_string(&id).unwrap(),
            r#""01FC66621XXXXX119Z8PMV1QPQ""#
        );
        assert_eq!(id.to_string(), "01FC66621XXXXX119Z8PMV1QPQ");

        let group: GroupId = serde_json::from_str(r#""g1""#).unwrap();
        assert_eq!(group, GroupId::new("g1"));
    }

    #[test]
    fn comma_joined_filters() {
        assert_eq!(comma_joined(&["a", "b"]), "a,b");
        assert_eq!(comma_joined::<&str>(&[]), "");
    }
}
