//! Delivery reports of batches.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{comma_joined, BatchId};

/// Level of detail of a batch delivery report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryReportType {
    /// Counts per status and code.
    Summary,
    /// Counts plus the recipients in each bucket.
    Full,
}

impl DeliveryReportType {
    /// The query parameter value.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryReportType::Summary => "summary",
            DeliveryReportType::Full => "full",
        }
    }
}

/// Delivery state of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeliveryStatus {
    /// Waiting to be sent to the operator.
    Queued,
    /// Handed to the operator.
    Dispatched,
    /// Stopped before dispatch, for example by cancelling the batch.
    Aborted,
    /// Refused by the operator.
    Rejected,
    /// Reached the handset.
    Delivered,
    /// Could not be delivered.
    Failed,
    /// Validity period ran out.
    Expired,
    /// The operator gave no usable status.
    Unknown,
}

impl DeliveryStatus {
    /// The name used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Queued => "Queued",
            DeliveryStatus::Dispatched => "Dispatched",
            DeliveryStatus::Aborted => "Aborted",
            DeliveryStatus::Rejected => "Rejected",
            DeliveryStatus::Delivered => "Delivered",
            DeliveryStatus::Failed => "Failed",
            DeliveryStatus::Expired => "Expired",
            DeliveryStatus::Unknown => "Unknown",
        }
    }
}

/// Selects what a batch delivery report contains.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchDeliveryReportParams {
    /// Report type; the server default applies when `None`.
    pub report_type: Option<DeliveryReportType>,
    /// Only these statuses.
    pub statuses: Vec<DeliveryStatus>,
    /// Only these status codes.
    pub codes: Vec<u32>,
}

impl BatchDeliveryReportParams {
    pub(crate) fn query_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();

        if let Some(report_type) = self.report_type {
            params.push(("type".to_string(), report_type.as_str().to_string()));
        }
        if !self.statuses.is_empty() {
            let statuses: Vec<&str> = self.statuses.iter().map(DeliveryStatus::as_str).collect();
            params.push(("status".to_string(), comma_joined(&statuses)));
        }
        if !self.codes.is_empty() {
            let codes: Vec<String> = self.codes.iter().map(u32::to_string).collect();
            params.push(("code".to_string(), comma_joined(&codes)));
        }

        params
    }
}

/// One status bucket of a batch delivery report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCount {
    /// Detailed status code.
    pub code: u32,
    /// Delivery state the code belongs to.
    pub status: DeliveryStatus,
    /// Messages in this bucket.
    pub count: u32,
    /// Only present in full reports.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recipients: Vec<String>,
}

/// Aggregated delivery report of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchDeliveryReport {
    /// The batch reported on.
    pub batch_id: BatchId,
    /// Messages in the batch, across every bucket.
    pub total_message_count: u32,
    /// Buckets, one per status and code.
    #[serde(default)]
    pub statuses: Vec<StatusCount>,
    /// The report's level of detail.
    #[serde(rename = "type")]
    pub report_type: DeliveryReportType,
}

/// Delivery report of a single recipient of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientDeliveryReport {
    /// The batch reported on.
    pub batch_id: BatchId,
    /// Phone number the report is about.
    pub recipient: String,
    /// Detailed status code.
    pub code: u32,
    /// Delivery state the code belongs to.
    pub status: DeliveryStatus,
    /// Free-form detail, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    /// Operator that handled the message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    /// When the status was recorded.
    pub at: DateTime<Utc>,
    /// When the operator reported the status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator_status_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn params_render_only_what_is_set() {
        assert!(BatchDeliveryReportParams::default().query_params().is_empty());

        let params = BatchDeliveryReportParams {
            report_type: Some(DeliveryReportType::Full),
            statuses: vec![DeliveryStatus::Delivered, DeliveryStatus::Failed],
            codes: vec![0, 402],
        };
        assert_eq!(
            params.query_params(),
            vec![
                ("type".to_string(), "full".to_string()),
                ("status".to_string(), "Delivered,Failed".to_string()),
                ("code".to_string(), "0,402".to_string()),
            ]
        );
    }

    #[test]
    fn decodes_batch_report() {
        let report: BatchDeliveryReport = serde_json::from_value(json!({
            "batch_id": "b1",
            "total_message_count": 3,
            "type": "full",
            "statuses": [
                {"code": 0, "status": "Delivered", "count": 2, "recipients": ["123", "456"]},
                {"code": 402, "status": "Failed", "count": 1}
            ]
        }))
        .unwrap();

        assert_eq!(report.report_type, DeliveryReportType::Full);
        assert_eq!(report.statuses.len(), 2);
        assert_eq!(report.statuses[0].recipients, vec!["123", "456"]);
        assert!(report.statuses[1].recipients.is_empty());
    }

    #[test]
    fn decodes_recipient_report() {
        let report: RecipientDeliveryReport = serde_json::from_value(json!({
            "batch_id": "b1",
            "recipient": "987654321",
            "code": 0,
            "status": "Delivered",
            "at": "2016-12-01T11:03:13.192Z"
        }))
        .unwrap();

        assert_eq!(report.status, DeliveryStatus::Delivered);
        assert!(report.operator.is_none());
    }
}
