//! Mobile-terminated SMS batches.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{comma_joined, BatchId};
use crate::paged::PageSource;
use crate::update::UpdateValue;

/// Per-recipient template parameters: parameter name to recipient to value.
pub type Parameters = BTreeMap<String, BTreeMap<String, String>>;

/// How much delivery reporting a batch requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryReport {
    /// No reports.
    None,
    /// One aggregated report with counts per status.
    Summary,
    /// Like `Summary`, with the recipients of each status.
    Full,
    /// A report for every recipient.
    PerRecipient,
}

/// A text batch to create, or to replace an existing batch with.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename = "mt_text")]
pub struct MtBatchTextSmsCreate {
    /// Originator: a short code, long number or alphanumeric sender.
    pub from: String,
    /// Recipient phone numbers.
    pub to: Vec<String>,
    /// Message text.
    pub body: String,
    /// Delivery reporting requested for the batch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_report: Option<DeliveryReport>,
    /// When to send; immediately when `None`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub send_at: Option<DateTime<Utc>>,
    /// Give up delivering after this time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expire_at: Option<DateTime<Utc>>,
    /// Where the server posts delivery reports.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
    /// Tags to attach.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Values substituted into `${name}` placeholders of the body.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: Parameters,
}

impl MtBatchTextSmsCreate {
    /// A batch sending `body` from `from` to every recipient in `to`.
    pub fn new(from: impl Into<String>, to: Vec<String>, body: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to,
            body: body.into(),
            delivery_report: None,
            send_at: None,
            expire_at: None,
            callback_url: None,
            tags: Vec::new(),
            parameters: Parameters::new(),
        }
    }
}

/// A binary batch to create, or to replace an existing batch with.
///
/// `body` is the base64 encoded payload and `udh` the hex encoded user data
/// header, both exactly as sent on the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename = "mt_binary")]
pub struct MtBatchBinarySmsCreate {
    /// Originator: a short code, long number or alphanumeric sender.
    pub from: String,
    /// Recipient phone numbers.
    pub to: Vec<String>,
    /// Base64 encoded payload.
    pub body: String,
    /// Hex encoded user data header.
    pub udh: String,
    /// Delivery reporting requested for the batch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_report: Option<DeliveryReport>,
    /// When to send; immediately when `None`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub send_at: Option<DateTime<Utc>>,
    /// Give up delivering after this time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expire_at: Option<DateTime<Utc>>,
    /// Where the server posts delivery reports.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
    /// Tags to attach.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl MtBatchBinarySmsCreate {
    /// A batch sending the encoded `body` and `udh` to every recipient in `to`.
    pub fn new(
        from: impl Into<String>,
        to: Vec<String>,
        body: impl Into<String>,
        udh: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            to,
            body: body.into(),
            udh: udh.into(),
            delivery_report: None,
            send_at: None,
            expire_at: None,
            callback_url: None,
            tags: Vec::new(),
        }
    }
}

/// A partial update of a text batch.
///
/// `None` leaves a field untouched; see [`UpdateValue`] for clearing fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "type", rename = "mt_text")]
pub struct MtBatchTextSmsUpdate {
    /// New originator.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// Recipients to add.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub to_add: Vec<String>,
    /// Recipients to remove.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub to_remove: Vec<String>,
    /// New message text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// New delivery reporting level, or unset to restore the default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_report: Option<UpdateValue<DeliveryReport>>,
    /// New send time, or unset to send immediately.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub send_at: Option<UpdateValue<DateTime<Utc>>>,
    /// New expiry, or unset for the server default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expire_at: Option<UpdateValue<DateTime<Utc>>>,
    /// New report callback, or unset to use the account default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<UpdateValue<String>>,
    /// New template parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<UpdateValue<Parameters>>,
}

/// A partial update of a binary batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "type", rename = "mt_binary")]
pub struct MtBatchBinarySmsUpdate {
    /// New originator.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// Recipients to add.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub to_add: Vec<String>,
    /// Recipients to remove.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub to_remove: Vec<String>,
    /// New base64 payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// New user data header.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub udh: Option<String>,
    /// New delivery reporting level, or unset to restore the default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_report: Option<UpdateValue<DeliveryReport>>,
    /// New send time, or unset to send immediately.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub send_at: Option<UpdateValue<DateTime<Utc>>>,
    /// New expiry, or unset for the server default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expire_at: Option<UpdateValue<DateTime<Utc>>>,
    /// New report callback, or unset to use the account default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<UpdateValue<String>>,
}

/// A text batch as stored by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MtBatchTextSmsResult {
    /// Server-assigned id.
    pub id: BatchId,
    /// Originator.
    pub from: String,
    /// Recipient phone numbers.
    pub to: Vec<String>,
    /// Message text.
    pub body: String,
    /// Whether the batch was cancelled.
    #[serde(default)]
    pub canceled: bool,
    /// Delivery reporting level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_report: Option<DeliveryReport>,
    /// Scheduled send time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub send_at: Option<DateTime<Utc>>,
    /// Expiry time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expire_at: Option<DateTime<Utc>>,
    /// Report callback, when overridden.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
    /// When the batch was created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// When the batch was last changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
    /// Template parameters, if any.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: Parameters,
}

/// A binary batch as stored by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MtBatchBinarySmsResult {
    /// Server-assigned id.
    pub id: BatchId,
    /// Originator.
    pub from: String,
    /// Recipient phone numbers.
    pub to: Vec<String>,
    /// Base64 encoded payload.
    pub body: String,
    /// Hex encoded user data header.
    pub udh: String,
    /// Whether the batch was cancelled.
    #[serde(default)]
    pub canceled: bool,
    /// Delivery reporting level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_report: Option<DeliveryReport>,
    /// Scheduled send time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub send_at: Option<DateTime<Utc>>,
    /// Expiry time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expire_at: Option<DateTime<Utc>>,
    /// Report callback, when overridden.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
    /// When the batch was created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// When the batch was last changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
}

/// A batch of either kind, discriminated by its `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MtBatchSmsResult {
    /// A text batch.
    #[serde(rename = "mt_text")]
    Text(MtBatchTextSmsResult),
    /// A binary batch.
    #[serde(rename = "mt_binary")]
    Binary(MtBatchBinarySmsResult),
}

impl MtBatchSmsResult {
    /// The batch id, whatever the kind.
    pub fn id(&self) -> &BatchId {
        match self {
            MtBatchSmsResult::Text(batch) => &batch.id,
            MtBatchSmsResult::Binary(batch) => &batch.id,
        }
    }

    /// Returns `true` if the batch was cancelled.
    pub fn is_canceled(&self) -> bool {
        match self {
            MtBatchSmsResult::Text(batch) => batch.canceled,
            MtBatchSmsResult::Binary(batch) => batch.canceled,
        }
    }
}

/// Filter for listing batches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchFilter {
    /// Items per page; the server default applies when `None`.
    pub page_size: Option<u32>,
    /// Only batches sent from one of these originators.
    pub senders: Vec<String>,
    /// Only batches carrying at least one of these tags.
    pub tags: Vec<String>,
    /// Only batches created on or after this day.
    pub start_date: Option<NaiveDate>,
    /// Only batches created before this day.
    pub end_date: Option<NaiveDate>,
}

impl PageSource for BatchFilter {
    type Item = MtBatchSmsResult;

    const PATH: &'static str = "/batches";
    const ITEMS_KEY: &'static str = "batches";

    fn query_params(&self, page: u32) -> Vec<(String, String)> {
        let mut params = vec![("page".to_string(), page.to_string())];

        if let Some(page_size) = self.page_size {
            params.push(("page_size".to_string(), page_size.to_string()));
        }
        if !self.senders.is_empty() {
            params.push(("from".to_string(), comma_joined(&self.senders)));
        }
        if !self.tags.is_empty() {
            params.push(("tags".to_string(), comma_joined(&self.tags)));
        }
        if let Some(start) = self.start_date {
            params.push(("start_date".to_string(), start.format("%Y-%m-%d").to_string()));
        }
        if let Some(end) = self.end_date {
            params.push(("end_date".to_string(), end.format("%Y-%m-%d").to_string()));
        }

        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_create_carries_type_and_skips_unset_fields() {
        let batch = MtBatchTextSmsCreate::new("12345", vec!["987654321".to_string()], "Hello");

        assert_eq!(
            serde_json::to_value(&batch).unwrap(),
            json!({
                "type": "mt_text",
                "from": "12345",
                "to": ["987654321"],
                "body": "Hello"
            })
        );
    }

    #[test]
    fn binary_create_carries_encoded_payload() {
        let mut batch = MtBatchBinarySmsCreate::new(
            "1234",
            vec!["987654321".to_string()],
            "SGVsbG8sIHdvcmxkIQ==",
            "01020304",
        );
        batch.delivery_report = Some(DeliveryReport::PerRecipient);

        assert_eq!(
            serde_json::to_value(&batch).unwrap(),
            json!({
                "type": "mt_binary",
                "from": "1234",
                "to": ["987654321"],
                "body": "SGVsbG8sIHdvcmxkIQ==",
                "udh": "01020304",
                "delivery_report": "per_recipient"
            })
        );
    }

    #[test]
    fn update_distinguishes_untouched_from_cleared() {
        let update = MtBatchTextSmsUpdate {
            body: Some("new body".to_string()),
            callback_url: Some(UpdateValue::unset()),
            ..Default::default()
        };

        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            json!({
                "type": "mt_text",
                "body": "new body",
                "callback_url": null
            })
        );
    }

    #[test]
    fn batch_results_decode_by_type() {
        let binary: MtBatchSmsResult = serde_json::from_value(json!({
            "type": "mt_binary",
            "id": "b1",
            "from": "1234",
            "to": ["987654321"],
            "canceled": false,
            "body": "SGVsbG8sIHdvcmxkIQ==",
            "udh": "01020304"
        }))
        .unwrap();

        match &binary {
            MtBatchSmsResult::Binary(batch) => {
                assert_eq!(batch.udh, "01020304");
                assert_eq!(batch.body, "SGVsbG8sIHdvcmxkIQ==");
            }
            other => panic!("expected binary batch, got {:?}", other),
        }
        assert_eq!(binary.id().as_str(), "b1");

        let text: MtBatchSmsResult = serde_json::from_value(json!({
            "type": "mt_text",
            "id": "b2",
            "from": "12345",
            "to": ["987654321"],
            "body": "Hello",
            "canceled": true,
            "created_at": "2016-12-01T11:03:13.192Z"
        }))
        .unwrap();

        assert!(text.is_canceled());
        assert!(matches!(text, MtBatchSmsResult::Text(ref t) if t.created_at.is_some()));
    }

    #[test]
    fn unknown_batch_type_fails_to_decode() {
        let result = serde_json::from_value::<MtBatchSmsResult>(json!({
            "type": "mt_media",
            "id": "b3"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn filter_renders_query_params() {
        let filter = BatchFilter {
            page_size: Some(10),
            senders: vec!["12345".to_string(), "6789".to_string()],
            tags: vec!["promo".to_string()],
            start_date: NaiveDate::from_ymd_opt(2016, 12, 1),
            end_date: None,
        };

        assert_eq!(
            filter.query_params(3),
            vec![
                ("page".to_string(), "3".to_string()),
                ("page_size".to_string(), "10".to_string()),
                ("from".to_string(), "12345,6789".to_string()),
                ("tags".to_string(), "promo".to_string()),
                ("start_date".to_string(), "2016-12-01".to_string()),
            ]
        );
        assert_eq!(
            BatchFilter::default().query_params(0),
            vec![("page".to_string(), "0".to_string())]
        );
    }
}
