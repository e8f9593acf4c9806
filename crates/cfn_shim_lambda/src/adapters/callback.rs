/// Delivery of the serialized callback body to the orchestrator's
/// presigned response URL.
pub trait CallbackSender {
    fn send(&self, response_url: &str, body: &[u8]) -> Result<(), String>;
}

/// HTTP PUT sender used by the Lambda binaries. The presigned callback URL
/// is signed over an empty Content-Type, so the header is set explicitly
/// blank.
pub struct HttpCallbackSender {
    client: reqwest::Client,
}

impl HttpCallbackSender {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpCallbackSender {
    fn default() -> Self {
        Self::new()
    }
}

impl CallbackSender for HttpCallbackSender {
    fn send(&self, response_url: &str, body: &[u8]) -> Result<(), String> {
        let client = self.client.clone();
        let url = response_url.to_string();
        let body = body.to_vec();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let response = client
                    .put(&url)
                    .header(reqwest::header::CONTENT_TYPE, "")
                    .body(body)
                    .send()
                    .await
                    .map_err(|error| format!("failed to deliver callback: {error}"))?;

                if !response.status().is_success() {
                    return Err(format!(
                        "callback endpoint returned status {}",
                        response.status()
                    ));
                }

                Ok(())
            })
        })
    }
}
