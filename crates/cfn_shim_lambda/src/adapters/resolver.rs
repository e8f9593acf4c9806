/// Lookup of the IP addresses assigned to a DNS resolver endpoint. The
/// implementation drains upstream pagination and returns the full set.
pub trait ResolverEndpointApi {
    fn list_ip_addresses(&self, resolver_endpoint_id: &str) -> Result<Vec<String>, String>;
}
