use cfn_shim_lambda::adapters::callback::HttpCallbackSender;
use cfn_shim_lambda::adapters::resolver::ResolverEndpointApi;
use cfn_shim_lambda::handlers::dispatch::handle_lifecycle_event;
use cfn_shim_lambda::handlers::ip_lookup::IpLookupHandler;
use cfn_shim_lambda::runtime::retry::{run_with_retry, RetryPolicy};
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;

struct AwsResolverEndpointApi {
    resolver_client: aws_sdk_route53resolver::Client,
    retry: RetryPolicy,
}

impl ResolverEndpointApi for AwsResolverEndpointApi {
    fn list_ip_addresses(&self, resolver_endpoint_id: &str) -> Result<Vec<String>, String> {
        let endpoint_id = resolver_endpoint_id.to_string();
        let client = self.resolver_client.clone();

        run_with_retry(
            &self.retry,
            || {
                let client = client.clone();
                let endpoint_id = endpoint_id.clone();

                tokio::task::block_in_place(|| {
                    tokio::runtime::Handle::current().block_on(async move {
                        let mut addresses = Vec::new();
                        let mut next_token: Option<String> = None;

                        loop {
                            let response = client
                                .list_resolver_endpoint_ip_addresses()
                                .resolver_endpoint_id(&endpoint_id)
                                .set_next_token(next_token)
                                .send()
                                .await
                                .map_err(|error| {
                                    format!("failed to list resolver endpoint ip addresses: {error}")
                                })?;

                            for ip_address in response.ip_addresses() {
                                if let Some(ip) = ip_address.ip() {
                                    addresses.push(ip.to_string());
                                }
                            }

                            match response.next_token() {
                                Some(token) => next_token = Some(token.to_string()),
                                None => break,
                            }
                        }

                        Ok(addresses)
                    })
                })
            },
            |delay_ms| std::thread::sleep(std::time::Duration::from_millis(delay_ms)),
        )
    }
}

async fn handle_request(event: LambdaEvent<Value>) -> Result<Value, Error> {
    let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let resolver = AwsResolverEndpointApi {
        resolver_client: aws_sdk_route53resolver::Client::new(&config),
        retry: RetryPolicy::default(),
    };
    let sender = HttpCallbackSender::new();

    let payload = handle_lifecycle_event(event.payload, &IpLookupHandler::new(&resolver), &sender)
        .map_err(|error| Error::from(error.to_string()))?;
    Ok(serde_json::to_value(&payload)?)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    lambda_runtime::run(service_fn(handle_request)).await
}
