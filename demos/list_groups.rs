//! Lists groups page by page from a plain (non-async) program.
//!
//! This example shows how to:
//! - Let the client own its reactor
//! - Iterate a paginated listing with a blocking iterator
//! - Dispatch a call with a completion callback while blocking on another
//!
//! Run with: `XMS_USERNAME=... XMS_TOKEN=... cargo run --example list_groups`

use std::env;

use xms::callback::{self, Outcome};
use xms::{Client, Error, GroupFilter, GroupResponse};

fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("xms=debug,list_groups=info")
        .init();

    let client = Client::builder()
        .username(env::var("XMS_USERNAME").unwrap_or_default())
        .token(env::var("XMS_TOKEN").unwrap_or_default())
        .build()?;

    let filter = GroupFilter {
        page_size: Some(20),
        ..Default::default()
    };

    println!("=== Groups ===");
    let mut first = None;
    for page in client.fetch_groups(filter).pages() {
        let page = page?;
        println!("Page {} ({} of {} groups)", page.page, page.len(), page.total_count);
        for group in page {
            println!("  {} {}", group.id, group.name.as_deref().unwrap_or("<unnamed>"));
            first.get_or_insert(group.id);
        }
    }

    if let Some(id) = first {
        println!("=== Members of {} ===", id);
        let handle = client.fetch_group(&id).send_with(callback::from_fn(
            |outcome: Outcome<'_, GroupResponse>| match outcome {
                Outcome::Completed(group) => println!("Group has {} members", group.size),
                Outcome::Failed(e) => eprintln!("Fetching group failed: {}", e),
                Outcome::Cancelled => eprintln!("Fetching group was cancelled"),
            },
        ));

        let members = client.fetch_group_members(&id).blocking()?;
        for member in members {
            println!("  {}", member);
        }

        handle.blocking_get()?;
    }

    client.close();
    Ok(())
}
