/// One stored object, with its version id when the bucket is versioned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub version_id: Option<String>,
}

impl StoredObject {
    pub fn plain(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            version_id: None,
        }
    }

    pub fn versioned(key: impl Into<String>, version_id: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            version_id: Some(version_id.into()),
        }
    }
}

/// One page of a lazy object listing. `next_token` is opaque to callers and
/// owned by the adapter; `None` means the listing is exhausted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectPage {
    pub objects: Vec<StoredObject>,
    pub next_token: Option<String>,
}

pub trait BucketStore {
    fn list_page(&self, bucket: &str, token: Option<&str>) -> Result<ObjectPage, String>;
    fn delete_batch(&self, bucket: &str, objects: &[StoredObject]) -> Result<(), String>;
}
