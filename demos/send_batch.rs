//! Sends a text batch and follows it until the delivery report is in.
//!
//! This example shows how to:
//! - Create a client from environment variables
//! - Send a batch with `.await`
//! - Tell API errors apart from unexpected responses
//! - Fetch a delivery report and attach tags
//!
//! Run with: `XMS_USERNAME=... XMS_TOKEN=... XMS_TO=... cargo run --example send_batch`

use std::env;
use std::time::Duration;

use xms::{
    BatchDeliveryReportParams, Client, DeliveryReport, DeliveryReportType, Error,
    MtBatchTextSmsCreate, TagsUpdate,
};

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("xms=debug,send_batch=info")
        .init();

    let client = Client::builder()
        .username(env::var("XMS_USERNAME").unwrap_or_default())
        .token(env::var("XMS_TOKEN").unwrap_or_default())
        .timeout(Duration::from_secs(30))
        .use_current_runtime()
        .build()?;

    let recipient = env::var("XMS_TO").unwrap_or_else(|_| "987654321".to_string());

    println!("=== Sending batch ===");
    let mut batch = MtBatchTextSmsCreate::new("12345", vec![recipient.clone()], "Hello from xms");
    batch.delivery_report = Some(DeliveryReport::Full);

    let created = match client.create_text_batch(&batch).await {
        Ok(created) => created,
        Err(Error::Api(e)) => {
            eprintln!("Batch rejected: {} ({})", e.text, e.code);
            return Err(Error::Api(e));
        }
        Err(Error::UnexpectedResponse(response)) => {
            eprintln!("Unexpected HTTP {}: {}", response.status, response.body_text());
            if let Some(delay) = response.retry_hint().delay(Duration::from_secs(60)) {
                eprintln!("Server asks to wait {:?} before retrying", delay);
            }
            return Err(Error::UnexpectedResponse(response));
        }
        Err(e) => return Err(e),
    };
    println!("Created batch {}", created.id);

    println!("=== Tagging batch ===");
    let update = TagsUpdate {
        tags_add: vec!["demo".to_string()],
        tags_remove: Vec::new(),
    };
    let tags = client.update_tags(&created.id, &update).await?;
    println!("Tags: {:?}", tags.tags);

    println!("=== Delivery report ===");
    tokio::time::sleep(Duration::from_secs(5)).await;

    let params = BatchDeliveryReportParams {
        report_type: Some(DeliveryReportType::Summary),
        ..Default::default()
    };
    let report = client.fetch_delivery_report(&created.id, &params).await?;
    for status in &report.statuses {
        println!("{:?} (code {}): {}", status.status, status.code, status.count);
    }

    let recipient_report = client
        .fetch_recipient_delivery_report(&created.id, &recipient)
        .await?;
    println!("{} is {:?}", recipient_report.recipient, recipient_report.status);

    Ok(())
}
