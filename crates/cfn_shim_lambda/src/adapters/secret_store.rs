/// Named secret storage for private credential material.
pub trait SecretStore {
    /// Creates the secret, or updates it when it already exists. Returns
    /// the secret's ARN.
    fn put_secret(&self, name: &str, value: &str) -> Result<String, String>;

    /// Deletes the secret immediately, without a recovery window.
    fn delete_secret(&self, name: &str) -> Result<(), String>;
}
