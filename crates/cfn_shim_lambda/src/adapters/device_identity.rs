/// Key material and identity minted by the device-identity service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCertificate {
    pub certificate_id: String,
    pub certificate_arn: String,
    pub certificate_pem: String,
    pub private_key_pem: String,
    pub public_key_pem: String,
}

pub trait DeviceIdentityApi {
    /// Connectivity endpoint address for the given endpoint type
    /// (`iot:Data-ATS`, `iot:Data`, `iot:CredentialProvider`).
    fn describe_endpoint(&self, endpoint_type: &str) -> Result<String, String>;

    /// Mints an active key pair and certificate. Not idempotent; callers
    /// own compensation on downstream failure.
    fn create_certificate(&self) -> Result<IssuedCertificate, String>;

    fn deactivate_certificate(&self, certificate_id: &str) -> Result<(), String>;
    fn delete_certificate(&self, certificate_id: &str) -> Result<(), String>;

    /// Creates the role alias and returns its ARN.
    fn create_role_alias(&self, alias: &str, role_arn: &str) -> Result<String, String>;
    fn delete_role_alias(&self, alias: &str) -> Result<(), String>;
}
