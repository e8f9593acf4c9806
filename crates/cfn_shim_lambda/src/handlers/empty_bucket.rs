use serde_json::json;

use crate::adapters::object_store::BucketStore;
use crate::handlers::dispatch::LifecycleHandler;
use crate::logging::log_info;
use crate::runtime::contract::{
    derived_physical_id, ActionResult, HandlerError, LifecycleEvent,
};
use crate::runtime::properties::EmptyBucketProps;

/// Drains a bucket before the orchestrator deletes it, so the deletion does
/// not fail on the non-empty-bucket constraint. Each listed page is deleted
/// before the next page is fetched; a zero-object bucket is a no-op.
pub struct EmptyBucketHandler<'a> {
    store: &'a dyn BucketStore,
}

impl<'a> EmptyBucketHandler<'a> {
    pub fn new(store: &'a dyn BucketStore) -> Self {
        Self { store }
    }

    fn drain(&self, bucket: &str) -> Result<usize, HandlerError> {
        let mut deleted = 0usize;
        let mut token: Option<String> = None;

        loop {
            let page = self
                .store
                .list_page(bucket, token.as_deref())
                .map_err(|error| {
                    HandlerError::Upstream(format!("listing bucket {bucket} failed: {error}"))
                })?;

            if !page.objects.is_empty() {
                self.store
                    .delete_batch(bucket, &page.objects)
                    .map_err(|error| {
                        HandlerError::Upstream(format!(
                            "deleting {} objects from bucket {bucket} failed: {error}",
                            page.objects.len()
                        ))
                    })?;
                deleted += page.objects.len();
                log_info(
                    self.component(),
                    "page_deleted",
                    json!({
                        "bucket": bucket,
                        "objects_in_page": page.objects.len(),
                        "objects_deleted": deleted,
                    }),
                );
            }

            match page.next_token {
                Some(next) => token = Some(next),
                None => break,
            }
        }

        Ok(deleted)
    }
}

impl LifecycleHandler for EmptyBucketHandler<'_> {
    fn component(&self) -> &'static str {
        "empty_bucket_handler"
    }

    fn on_create(&self, event: &LifecycleEvent) -> Result<ActionResult, HandlerError> {
        // Validation only; emptying happens on the way out.
        EmptyBucketProps::from_event(event)?;
        Ok(ActionResult::success(derived_physical_id(
            &event.stack_id,
            &event.logical_resource_id,
        )))
    }

    fn on_update(&self, event: &LifecycleEvent) -> Result<ActionResult, HandlerError> {
        self.on_create(event)
    }

    fn on_delete(&self, event: &LifecycleEvent) -> Result<ActionResult, HandlerError> {
        let props = EmptyBucketProps::from_event(event)?;
        let deleted = self.drain(&props.bucket_name)?;

        log_info(
            self.component(),
            "bucket_emptied",
            json!({
                "bucket": props.bucket_name,
                "objects_deleted": deleted,
            }),
        );

        Ok(ActionResult::success(
            event.physical_resource_id.clone().unwrap_or_else(|| {
                derived_physical_id(&event.stack_id, &event.logical_resource_id)
            }),
        ))
    }
}
