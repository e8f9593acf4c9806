use aws_sdk_iot::types::CertificateStatus;
use cfn_shim_lambda::adapters::callback::HttpCallbackSender;
use cfn_shim_lambda::adapters::device_identity::{DeviceIdentityApi, IssuedCertificate};
use cfn_shim_lambda::adapters::secret_store::SecretStore;
use cfn_shim_lambda::handlers::device_cert::DeviceCertHandler;
use cfn_shim_lambda::handlers::dispatch::handle_lifecycle_event;
use cfn_shim_lambda::runtime::retry::{run_with_retry, RetryPolicy};
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;

struct AwsDeviceIdentityApi {
    iot_client: aws_sdk_iot::Client,
    retry: RetryPolicy,
}

fn block_on<T>(
    future: impl std::future::Future<Output = Result<T, String>>,
) -> Result<T, String> {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}

impl DeviceIdentityApi for AwsDeviceIdentityApi {
    fn describe_endpoint(&self, endpoint_type: &str) -> Result<String, String> {
        let client = self.iot_client.clone();
        let endpoint_type = endpoint_type.to_string();

        run_with_retry(
            &self.retry,
            || {
                let client = client.clone();
                let endpoint_type = endpoint_type.clone();
                block_on(async move {
                    let response = client
                        .describe_endpoint()
                        .endpoint_type(&endpoint_type)
                        .send()
                        .await
                        .map_err(|error| {
                            format!("failed to describe {endpoint_type} endpoint: {error}")
                        })?;
                    response
                        .endpoint_address()
                        .map(str::to_string)
                        .ok_or_else(|| {
                            format!("describe {endpoint_type} endpoint returned no address")
                        })
                })
            },
            |delay_ms| std::thread::sleep(std::time::Duration::from_millis(delay_ms)),
        )
    }

    fn create_certificate(&self) -> Result<IssuedCertificate, String> {
        // Mints a new identity on every call; never retried.
        let client = self.iot_client.clone();
        block_on(async move {
            let response = client
                .create_keys_and_certificate()
                .set_as_active(true)
                .send()
                .await
                .map_err(|error| format!("failed to create keys and certificate: {error}"))?;

            let key_pair = response
                .key_pair()
                .ok_or_else(|| "certificate response missing key pair".to_string())?;

            Ok(IssuedCertificate {
                certificate_id: required_field(response.certificate_id(), "certificateId")?,
                certificate_arn: required_field(response.certificate_arn(), "certificateArn")?,
                certificate_pem: required_field(response.certificate_pem(), "certificatePem")?,
                private_key_pem: required_field(key_pair.private_key(), "privateKey")?,
                public_key_pem: required_field(key_pair.public_key(), "publicKey")?,
            })
        })
    }

    fn deactivate_certificate(&self, certificate_id: &str) -> Result<(), String> {
        let client = self.iot_client.clone();
        let certificate_id = certificate_id.to_string();
        block_on(async move {
            client
                .update_certificate()
                .certificate_id(&certificate_id)
                .new_status(CertificateStatus::Inactive)
                .send()
                .await
                .map(|_| ())
                .map_err(|error| format!("failed to deactivate certificate: {error}"))
        })
    }

    fn delete_certificate(&self, certificate_id: &str) -> Result<(), String> {
        let client = self.iot_client.clone();
        let certificate_id = certificate_id.to_string();
        block_on(async move {
            client
                .delete_certificate()
                .certificate_id(&certificate_id)
                .force_delete(true)
                .send()
                .await
                .map(|_| ())
                .map_err(|error| format!("failed to delete certificate: {error}"))
        })
    }

    fn create_role_alias(&self, alias: &str, role_arn: &str) -> Result<String, String> {
        let client = self.iot_client.clone();
        let alias = alias.to_string();
        let role_arn = role_arn.to_string();
        block_on(async move {
            let response = client
                .create_role_alias()
                .role_alias(&alias)
                .role_arn(&role_arn)
                .send()
                .await
                .map_err(|error| format!("failed to create role alias: {error}"))?;
            response
                .role_alias_arn()
                .map(str::to_string)
                .ok_or_else(|| "role alias response missing arn".to_string())
        })
    }

    fn delete_role_alias(&self, alias: &str) -> Result<(), String> {
        let client = self.iot_client.clone();
        let alias = alias.to_string();
        block_on(async move {
            client
                .delete_role_alias()
                .role_alias(&alias)
                .send()
                .await
                .map(|_| ())
                .map_err(|error| format!("failed to delete role alias: {error}"))
        })
    }
}

fn required_field(value: Option<&str>, name: &str) -> Result<String, String> {
    value
        .map(str::to_string)
        .ok_or_else(|| format!("certificate response missing {name}"))
}

struct AwsSecretStore {
    secrets_client: aws_sdk_secretsmanager::Client,
}

impl SecretStore for AwsSecretStore {
    fn put_secret(&self, name: &str, value: &str) -> Result<String, String> {
        let client = self.secrets_client.clone();
        let name = name.to_string();
        let value = value.to_string();
        block_on(async move {
            match client
                .create_secret()
                .name(&name)
                .secret_string(&value)
                .send()
                .await
            {
                Ok(response) => response
                    .arn()
                    .map(str::to_string)
                    .ok_or_else(|| "create secret response missing arn".to_string()),
                Err(error) => {
                    let service_error = error.into_service_error();
                    if !service_error.is_resource_exists_exception() {
                        return Err(format!("failed to create secret: {service_error}"));
                    }

                    // A retried Create finds the previous secret; overwrite
                    // it with the fresh material.
                    let response = client
                        .update_secret()
                        .secret_id(&name)
                        .secret_string(&value)
                        .send()
                        .await
                        .map_err(|error| format!("failed to update existing secret: {error}"))?;
                    response
                        .arn()
                        .map(str::to_string)
                        .ok_or_else(|| "update secret response missing arn".to_string())
                }
            }
        })
    }

    fn delete_secret(&self, name: &str) -> Result<(), String> {
        let client = self.secrets_client.clone();
        let name = name.to_string();
        block_on(async move {
            client
                .delete_secret()
                .secret_id(&name)
                .force_delete_without_recovery(true)
                .send()
                .await
                .map(|_| ())
                .map_err(|error| format!("failed to delete secret: {error}"))
        })
    }
}

async fn handle_request(event: LambdaEvent<Value>) -> Result<Value, Error> {
    let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let identity = AwsDeviceIdentityApi {
        iot_client: aws_sdk_iot::Client::new(&config),
        retry: RetryPolicy::default(),
    };
    let secrets = AwsSecretStore {
        secrets_client: aws_sdk_secretsmanager::Client::new(&config),
    };
    let sender = HttpCallbackSender::new();

    let payload = handle_lifecycle_event(
        event.payload,
        &DeviceCertHandler::new(&identity, &secrets),
        &sender,
    )
    .map_err(|error| Error::from(error.to_string()))?;
    Ok(serde_json::to_value(&payload)?)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    lambda_runtime::run(service_fn(handle_request)).await
}
