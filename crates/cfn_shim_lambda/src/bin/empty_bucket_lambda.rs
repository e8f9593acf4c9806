use aws_sdk_s3::types::{
    BucketVersioningStatus, Delete, ObjectIdentifier,
};
use cfn_shim_lambda::adapters::callback::HttpCallbackSender;
use cfn_shim_lambda::adapters::object_store::{BucketStore, ObjectPage, StoredObject};
use cfn_shim_lambda::handlers::dispatch::handle_lifecycle_event;
use cfn_shim_lambda::handlers::empty_bucket::EmptyBucketHandler;
use cfn_shim_lambda::runtime::retry::{run_with_retry, RetryPolicy};
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;

/// Continuation token prefixes distinguishing the two listing modes the
/// first page selects between.
const PLAIN_TOKEN_PREFIX: &str = "p:";
const VERSIONED_TOKEN_PREFIX: &str = "v:";
const MARKER_SEPARATOR: char = '\u{1f}';

struct AwsBucketStore {
    s3_client: aws_sdk_s3::Client,
    retry: RetryPolicy,
}

impl AwsBucketStore {
    async fn bucket_is_versioned(&self, bucket: &str) -> Result<bool, String> {
        let response = self
            .s3_client
            .get_bucket_versioning()
            .bucket(bucket)
            .send()
            .await
            .map_err(|error| format!("failed to read bucket versioning state: {error}"))?;

        Ok(matches!(
            response.status(),
            Some(BucketVersioningStatus::Enabled) | Some(BucketVersioningStatus::Suspended)
        ))
    }

    async fn list_plain(&self, bucket: &str, token: Option<&str>) -> Result<ObjectPage, String> {
        let response = self
            .s3_client
            .list_objects_v2()
            .bucket(bucket)
            .set_continuation_token(token.map(str::to_string))
            .send()
            .await
            .map_err(|error| format!("failed to list objects: {error}"))?;

        let objects = response
            .contents()
            .iter()
            .filter_map(|object| object.key().map(StoredObject::plain))
            .collect();
        let next_token = response
            .next_continuation_token()
            .map(|token| format!("{PLAIN_TOKEN_PREFIX}{token}"));

        Ok(ObjectPage {
            objects,
            next_token,
        })
    }

    async fn list_versioned(
        &self,
        bucket: &str,
        markers: Option<(&str, &str)>,
    ) -> Result<ObjectPage, String> {
        let mut request = self.s3_client.list_object_versions().bucket(bucket);
        if let Some((key_marker, version_marker)) = markers {
            request = request.key_marker(key_marker);
            if !version_marker.is_empty() {
                request = request.version_id_marker(version_marker);
            }
        }

        let response = request
            .send()
            .await
            .map_err(|error| format!("failed to list object versions: {error}"))?;

        let mut objects: Vec<StoredObject> = Vec::new();
        for version in response.versions() {
            if let (Some(key), Some(version_id)) = (version.key(), version.version_id()) {
                objects.push(StoredObject::versioned(key, version_id));
            }
        }
        for marker in response.delete_markers() {
            if let (Some(key), Some(version_id)) = (marker.key(), marker.version_id()) {
                objects.push(StoredObject::versioned(key, version_id));
            }
        }

        let next_token = response.next_key_marker().map(|key_marker| {
            format!(
                "{VERSIONED_TOKEN_PREFIX}{key_marker}{MARKER_SEPARATOR}{}",
                response.next_version_id_marker().unwrap_or_default()
            )
        });

        Ok(ObjectPage {
            objects,
            next_token,
        })
    }

    async fn list_page_async(
        &self,
        bucket: &str,
        token: Option<&str>,
    ) -> Result<ObjectPage, String> {
        match token {
            None => {
                if self.bucket_is_versioned(bucket).await? {
                    self.list_versioned(bucket, None).await
                } else {
                    self.list_plain(bucket, None).await
                }
            }
            Some(token) => {
                if let Some(rest) = token.strip_prefix(PLAIN_TOKEN_PREFIX) {
                    self.list_plain(bucket, Some(rest)).await
                } else if let Some(rest) = token.strip_prefix(VERSIONED_TOKEN_PREFIX) {
                    let (key_marker, version_marker) =
                        rest.split_once(MARKER_SEPARATOR).ok_or_else(|| {
                            format!("malformed continuation token: {token}")
                        })?;
                    self.list_versioned(bucket, Some((key_marker, version_marker)))
                        .await
                } else {
                    Err(format!("unrecognized continuation token: {token}"))
                }
            }
        }
    }

    async fn delete_batch_async(
        &self,
        bucket: &str,
        objects: &[StoredObject],
    ) -> Result<(), String> {
        let mut identifiers = Vec::with_capacity(objects.len());
        for object in objects {
            let identifier = ObjectIdentifier::builder()
                .key(&object.key)
                .set_version_id(object.version_id.clone())
                .build()
                .map_err(|error| format!("invalid object identifier: {error}"))?;
            identifiers.push(identifier);
        }

        let delete = Delete::builder()
            .set_objects(Some(identifiers))
            .quiet(true)
            .build()
            .map_err(|error| format!("invalid delete request: {error}"))?;

        let response = self
            .s3_client
            .delete_objects()
            .bucket(bucket)
            .delete(delete)
            .send()
            .await
            .map_err(|error| format!("failed to delete objects: {error}"))?;

        let errors = response.errors();
        if let Some(first) = errors.first() {
            return Err(format!(
                "{} objects failed to delete, first: {} ({})",
                errors.len(),
                first.key().unwrap_or("unknown key"),
                first.message().unwrap_or("no message")
            ));
        }

        Ok(())
    }
}

impl BucketStore for AwsBucketStore {
    fn list_page(&self, bucket: &str, token: Option<&str>) -> Result<ObjectPage, String> {
        run_with_retry(
            &self.retry,
            || {
                tokio::task::block_in_place(|| {
                    tokio::runtime::Handle::current()
                        .block_on(self.list_page_async(bucket, token))
                })
            },
            |delay_ms| std::thread::sleep(std::time::Duration::from_millis(delay_ms)),
        )
    }

    fn delete_batch(&self, bucket: &str, objects: &[StoredObject]) -> Result<(), String> {
        run_with_retry(
            &self.retry,
            || {
                tokio::task::block_in_place(|| {
                    tokio::runtime::Handle::current()
                        .block_on(self.delete_batch_async(bucket, objects))
                })
            },
            |delay_ms| std::thread::sleep(std::time::Duration::from_millis(delay_ms)),
        )
    }
}

async fn handle_request(event: LambdaEvent<Value>) -> Result<Value, Error> {
    let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let store = AwsBucketStore {
        s3_client: aws_sdk_s3::Client::new(&config),
        retry: RetryPolicy::default(),
    };
    let sender = HttpCallbackSender::new();

    let payload = handle_lifecycle_event(event.payload, &EmptyBucketHandler::new(&store), &sender)
        .map_err(|error| Error::from(error.to_string()))?;
    Ok(serde_json::to_value(&payload)?)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    lambda_runtime::run(service_fn(handle_request)).await
}
