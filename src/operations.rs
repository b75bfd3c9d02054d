//! The XMS API operations, one method per endpoint.
//!
//! Every method only builds the call; nothing is sent until the returned
//! [`Call`] is awaited or dispatched.

use crate::api::{
    BatchDeliveryReport, BatchDeliveryReportParams, BatchFilter, BatchId, GroupCreate,
    GroupFilter, GroupId, GroupResponse, GroupUpdate, MtBatchBinarySmsCreate,
    MtBatchBinarySmsResult, MtBatchBinarySmsUpdate, MtBatchSmsResult, MtBatchTextSmsCreate,
    MtBatchTextSmsResult, MtBatchTextSmsUpdate, RecipientDeliveryReport, Tags, TagsUpdate,
};
use crate::classify::{Classifier, Empty, Json, OK_ONLY};
use crate::client::Client;
use crate::handle::Call;
use crate::paged::PagedFetcher;

fn batch_path(id: &BatchId) -> String {
    format!("/batches/{}", id)
}

fn group_path(id: &GroupId) -> String {
    format!("/groups/{}", id)
}

/// Batches.
impl Client {
    /// Creates and sends a text batch.
    pub fn create_text_batch(
        &self,
        batch: &MtBatchTextSmsCreate,
    ) -> Call<Json<MtBatchTextSmsResult>> {
        self.post(self.url("/batches", &[]), batch)
    }

    /// Creates and sends a binary batch.
    pub fn create_binary_batch(
        &self,
        batch: &MtBatchBinarySmsCreate,
    ) -> Call<Json<MtBatchBinarySmsResult>> {
        self.post(self.url("/batches", &[]), batch)
    }

    /// Replaces a batch that has not been sent yet with a text batch.
    pub fn replace_text_batch(
        &self,
        id: &BatchId,
        batch: &MtBatchTextSmsCreate,
    ) -> Call<Json<MtBatchTextSmsResult>> {
        self.put(self.url(&batch_path(id), &[]), batch)
    }

    /// Replaces a batch that has not been sent yet with a binary batch.
    pub fn replace_binary_batch(
        &self,
        id: &BatchId,
        batch: &MtBatchBinarySmsCreate,
    ) -> Call<Json<MtBatchBinarySmsResult>> {
        self.put(self.url(&batch_path(id), &[]), batch)
    }

    /// Partially updates a text batch.
    pub fn update_text_batch(
        &self,
        id: &BatchId,
        update: &MtBatchTextSmsUpdate,
    ) -> Call<Json<MtBatchTextSmsResult>> {
        self.post(self.url(&batch_path(id), &[]), update)
    }

    /// Partially updates a binary batch.
    pub fn update_binary_batch(
        &self,
        id: &BatchId,
        update: &MtBatchBinarySmsUpdate,
    ) -> Call<Json<MtBatchBinarySmsResult>> {
        self.post(self.url(&batch_path(id), &[]), update)
    }

    /// Fetches a batch of either kind.
    pub fn fetch_batch(&self, id: &BatchId) -> Call<Json<MtBatchSmsResult>> {
        self.get(self.url(&batch_path(id), &[]))
    }

    /// Lists batches matching `filter`, lazily, page by page.
    pub fn fetch_batches(&self, filter: BatchFilter) -> PagedFetcher<BatchFilter> {
        PagedFetcher::new(self.clone(), filter)
    }

    /// Cancels a batch and returns it in its cancelled state.
    pub fn cancel_batch(&self, id: &BatchId) -> Call<Json<MtBatchSmsResult>> {
        self.delete(self.url(&batch_path(id), &[]), Classifier::new(Json::new()))
    }
}

/// Delivery reports.
impl Client {
    /// Fetches the aggregated delivery report of a batch.
    pub fn fetch_delivery_report(
        &self,
        id: &BatchId,
        params: &BatchDeliveryReportParams,
    ) -> Call<Json<BatchDeliveryReport>> {
        let path = format!("{}/delivery_report", batch_path(id));
        self.get(self.url(&path, &params.query_params()))
    }

    /// Fetches the delivery report of one recipient of a batch.
    pub fn fetch_recipient_delivery_report(
        &self,
        id: &BatchId,
        recipient: &str,
    ) -> Call<Json<RecipientDeliveryReport>> {
        let path = format!("{}/delivery_report/{}", batch_path(id), recipient);
        self.get(self.url(&path, &[]))
    }
}

/// Batch tags.
impl Client {
    /// Fetches the tags of a batch.
    pub fn fetch_tags(&self, id: &BatchId) -> Call<Json<Tags>> {
        self.get(self.url(&format!("{}/tags", batch_path(id)), &[]))
    }

    /// Replaces all tags of a batch.
    pub fn replace_tags(&self, id: &BatchId, tags: &Tags) -> Call<Json<Tags>> {
        self.put(self.url(&format!("{}/tags", batch_path(id)), &[]), tags)
    }

    /// Adds and removes tags of a batch.
    pub fn update_tags(&self, id: &BatchId, update: &TagsUpdate) -> Call<Json<Tags>> {
        self.post(self.url(&format!("{}/tags", batch_path(id)), &[]), update)
    }
}

/// Groups.
impl Client {
    /// Creates a group.
    pub fn create_group(&self, group: &GroupCreate) -> Call<Json<GroupResponse>> {
        self.post(self.url("/groups", &[]), group)
    }

    /// Fetches a group by id.
    pub fn fetch_group(&self, id: &GroupId) -> Call<Json<GroupResponse>> {
        self.get(self.url(&group_path(id), &[]))
    }

    /// Fetches the phone numbers in a group.
    pub fn fetch_group_members(&self, id: &GroupId) -> Call<Json<Vec<String>>> {
        self.get(self.url(&format!("{}/members", group_path(id)), &[]))
    }

    /// Lists groups matching `filter`, lazily, page by page.
    pub fn fetch_groups(&self, filter: GroupFilter) -> PagedFetcher<GroupFilter> {
        PagedFetcher::new(self.clone(), filter)
    }

    /// Partially updates a group.
    pub fn update_group(&self, id: &GroupId, update: &GroupUpdate) -> Call<Json<GroupResponse>> {
        self.post(self.url(&group_path(id), &[]), update)
    }

    /// Replaces a group.
    pub fn replace_group(&self, id: &GroupId, group: &GroupCreate) -> Call<Json<GroupResponse>> {
        self.put(self.url(&group_path(id), &[]), group)
    }

    /// Deletes a group. Only `200 OK` counts as success.
    pub fn delete_group(&self, id: &GroupId) -> Call<Empty> {
        self.delete(
            self.url(&group_path(id), &[]),
            Classifier::new(Empty).success_codes(OK_ONLY),
        )
    }
}

#[cfg(test)]
mod tests {
    use http::Method;

    use super::*;

    fn client() -> Client {
        Client::builder()
            .endpoint("https://api.example.com/xms/v1")
            .username("jdoe")
            .token("secret")
            .build()
            .unwrap()
    }

    #[test]
    fn calls_describe_method_and_target() {
        let client = client();
        let id = BatchId::from("b1");

        let call = client.cancel_batch(&id);
        let descriptor = call.descriptor().unwrap();
        assert_eq!(descriptor.method(), &Method::DELETE);
        assert_eq!(
            descriptor.url().as_str(),
            "https://api.example.com/xms/v1/jdoe/batches/b1"
        );
        assert!(descriptor.body().is_none());

        let call = client.update_tags(&id, &TagsUpdate::default());
        let descriptor = call.descriptor().unwrap();
        assert_eq!(descriptor.method(), &Method::POST);
        assert_eq!(descriptor.url().path(), "/xms/v1/jdoe/batches/b1/tags");
        assert_eq!(descriptor.body(), Some(&b"{}"[..]));

        let call = client.replace_group(&GroupId::from("g1"), &GroupCreate::default());
        assert_eq!(call.descriptor().unwrap().method(), &Method::PUT);
    }

    #[test]
    fn delivery_report_params_become_query() {
        let client = client();
        let params = BatchDeliveryReportParams {
            report_type: Some(crate::api::DeliveryReportType::Summary),
            ..Default::default()
        };

        let call = client.fetch_delivery_report(&BatchId::from("b1"), &params);
        assert_eq!(
            call.descriptor().unwrap().url().as_str(),
            "https://api.example.com/xms/v1/jdoe/batches/b1/delivery_report?type=summary"
        );

        let call = client.fetch_recipient_delivery_report(&BatchId::from("b1"), "987654321");
        assert_eq!(
            call.descriptor().unwrap().url().path(),
            "/xms/v1/jdoe/batches/b1/delivery_report/987654321"
        );
    }

    #[test]
    fn pretty_printing_indents_bodies() {
        let client = Client::builder()
            .username("jdoe")
            .token("secret")
            .pretty_print_json(true)
            .build()
            .unwrap();

        let update = TagsUpdate {
            tags_add: vec!["a".to_string()],
            tags_remove: Vec::new(),
        };
        let call = client.update_tags(&BatchId::from("b1"), &update);
        let body = std::str::from_utf8(call.descriptor().unwrap().body().unwrap()).unwrap();
        assert!(body.contains('\n'));
    }
}
