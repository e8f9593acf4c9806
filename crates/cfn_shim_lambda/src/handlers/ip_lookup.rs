use std::net::Ipv4Addr;

use serde_json::json;

use crate::adapters::resolver::ResolverEndpointApi;
use crate::handlers::dispatch::LifecycleHandler;
use crate::logging::log_info;
use crate::runtime::contract::{
    derived_physical_id, ActionResult, HandlerError, LifecycleEvent,
};
use crate::runtime::properties::IpLookupProps;

pub const IP_ATTRIBUTE_COUNT: usize = 2;

/// Reads the IP addresses assigned to a resolver endpoint and exposes the
/// first two as named output attributes. Pure read; Delete is a no-op and
/// repeated Creates are byte-identical.
pub struct IpLookupHandler<'a> {
    resolver: &'a dyn ResolverEndpointApi,
}

impl<'a> IpLookupHandler<'a> {
    pub fn new(resolver: &'a dyn ResolverEndpointApi) -> Self {
        Self { resolver }
    }
}

impl LifecycleHandler for IpLookupHandler<'_> {
    fn component(&self) -> &'static str {
        "ip_lookup_handler"
    }

    fn on_create(&self, event: &LifecycleEvent) -> Result<ActionResult, HandlerError> {
        let props = IpLookupProps::from_event(event)?;

        let addresses = self
            .resolver
            .list_ip_addresses(&props.resolver_id)
            .map_err(|error| {
                HandlerError::Upstream(format!(
                    "resolver endpoint {} lookup failed: {error}",
                    props.resolver_id
                ))
            })?;

        // Fail closed when the endpoint reports fewer addresses than the
        // contract promises, rather than returning a partial attribute set.
        if addresses.len() < IP_ATTRIBUTE_COUNT {
            return Err(HandlerError::Upstream(format!(
                "resolver endpoint {} reported {} IP addresses, expected at least {IP_ATTRIBUTE_COUNT}",
                props.resolver_id,
                addresses.len()
            )));
        }

        for address in addresses.iter().take(IP_ATTRIBUTE_COUNT) {
            if address.parse::<Ipv4Addr>().is_err() {
                return Err(HandlerError::Upstream(format!(
                    "resolver endpoint {} returned a non-IPv4 address: {address}",
                    props.resolver_id
                )));
            }
        }

        log_info(
            self.component(),
            "resolver_ips_resolved",
            json!({
                "resolver_id": props.resolver_id,
                "addresses_reported": addresses.len(),
            }),
        );

        Ok(
            ActionResult::success(derived_physical_id(
                &event.stack_id,
                &event.logical_resource_id,
            ))
            .with_attribute("IpAddress1", addresses[0].clone())
            .with_attribute("IpAddress2", addresses[1].clone()),
        )
    }

    fn on_delete(&self, event: &LifecycleEvent) -> Result<ActionResult, HandlerError> {
        // Nothing was provisioned; acknowledge immediately.
        Ok(ActionResult::success(
            event.physical_resource_id.clone().unwrap_or_else(|| {
                derived_physical_id(&event.stack_id, &event.logical_resource_id)
            }),
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::{json, Value};

    use crate::handlers::dispatch::test_support::{lifecycle_event_json, CapturingSender};
    use crate::handlers::dispatch::handle_lifecycle_event;
    use crate::runtime::contract::ResponseStatus;

    use super::*;

    struct FakeResolverApi {
        addresses: Result<Vec<String>, String>,
        lookups: Mutex<Vec<String>>,
    }

    impl FakeResolverApi {
        fn returning(addresses: &[&str]) -> Self {
            Self {
                addresses: Ok(addresses.iter().map(|a| a.to_string()).collect()),
                lookups: Mutex::new(Vec::new()),
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                addresses: Err(message.to_string()),
                lookups: Mutex::new(Vec::new()),
            }
        }

        fn lookups(&self) -> Vec<String> {
            self.lookups.lock().expect("poisoned mutex").clone()
        }
    }

    impl ResolverEndpointApi for FakeResolverApi {
        fn list_ip_addresses(&self, resolver_endpoint_id: &str) -> Result<Vec<String>, String> {
            self.lookups
                .lock()
                .expect("poisoned mutex")
                .push(resolver_endpoint_id.to_string());
            self.addresses.clone()
        }
    }

    fn create_event() -> Value {
        lifecycle_event_json("Create", json!({"ResolverId": "rslvr-12345"}))
    }

    #[test]
    fn create_returns_first_two_addresses_as_attributes() {
        let resolver = FakeResolverApi::returning(&["10.0.1.5", "10.0.2.9"]);
        let sender = CapturingSender::new();

        let payload =
            handle_lifecycle_event(create_event(), &IpLookupHandler::new(&resolver), &sender)
                .expect("event should be handled");

        assert_eq!(payload.status, ResponseStatus::Success);
        assert_eq!(payload.data.get("IpAddress1").map(String::as_str), Some("10.0.1.5"));
        assert_eq!(payload.data.get("IpAddress2").map(String::as_str), Some("10.0.2.9"));
        assert_eq!(payload.data.len(), 2);
        assert_eq!(resolver.lookups(), vec!["rslvr-12345"]);
    }

    #[test]
    fn extra_reported_addresses_are_ignored() {
        let resolver = FakeResolverApi::returning(&["10.0.1.5", "10.0.2.9", "10.0.3.1"]);
        let sender = CapturingSender::new();

        let payload =
            handle_lifecycle_event(create_event(), &IpLookupHandler::new(&resolver), &sender)
                .expect("event should be handled");

        assert_eq!(payload.data.len(), 2);
    }

    #[test]
    fn repeated_create_is_idempotent() {
        let resolver = FakeResolverApi::returning(&["10.0.1.5", "10.0.2.9"]);
        let sender = CapturingSender::new();
        let handler = IpLookupHandler::new(&resolver);

        let first = handle_lifecycle_event(create_event(), &handler, &sender)
            .expect("first create should succeed");
        let second = handle_lifecycle_event(create_event(), &handler, &sender)
            .expect("second create should succeed");

        assert_eq!(first, second);
        assert_eq!(resolver.lookups().len(), 2);
    }

    #[test]
    fn fewer_than_two_addresses_fails_closed() {
        let resolver = FakeResolverApi::returning(&["10.0.1.5"]);
        let sender = CapturingSender::new();

        let payload =
            handle_lifecycle_event(create_event(), &IpLookupHandler::new(&resolver), &sender)
                .expect("event should be handled");

        assert_eq!(payload.status, ResponseStatus::Failed);
        assert!(payload
            .reason
            .as_deref()
            .expect("failure should carry a reason")
            .contains("reported 1 IP addresses"));
        assert!(payload.data.is_empty());
    }

    #[test]
    fn non_ipv4_address_fails_closed() {
        let resolver = FakeResolverApi::returning(&["10.0.1.5", "fd00::1"]);
        let sender = CapturingSender::new();

        let payload =
            handle_lifecycle_event(create_event(), &IpLookupHandler::new(&resolver), &sender)
                .expect("event should be handled");

        assert_eq!(payload.status, ResponseStatus::Failed);
        assert!(payload
            .reason
            .as_deref()
            .expect("failure should carry a reason")
            .contains("non-IPv4"));
    }

    #[test]
    fn upstream_failure_surfaces_provider_message() {
        let resolver = FakeResolverApi::failing("ResourceNotFoundException: rslvr-12345");
        let sender = CapturingSender::new();

        let payload =
            handle_lifecycle_event(create_event(), &IpLookupHandler::new(&resolver), &sender)
                .expect("event should be handled");

        assert_eq!(payload.status, ResponseStatus::Failed);
        assert!(payload
            .reason
            .as_deref()
            .expect("failure should carry a reason")
            .contains("ResourceNotFoundException"));
    }

    #[test]
    fn missing_resolver_id_fails_before_any_lookup() {
        let resolver = FakeResolverApi::returning(&["10.0.1.5", "10.0.2.9"]);
        let sender = CapturingSender::new();

        let payload = handle_lifecycle_event(
            lifecycle_event_json("Create", json!({})),
            &IpLookupHandler::new(&resolver),
            &sender,
        )
        .expect("event should be handled");

        assert_eq!(payload.status, ResponseStatus::Failed);
        assert_eq!(payload.reason.as_deref(), Some("missing property: ResolverId"));
        assert!(resolver.lookups().is_empty());
    }

    #[test]
    fn delete_succeeds_with_zero_upstream_calls() {
        let resolver = FakeResolverApi::returning(&["10.0.1.5", "10.0.2.9"]);
        let sender = CapturingSender::new();

        let payload = handle_lifecycle_event(
            lifecycle_event_json("Delete", json!({"ResolverId": "rslvr-12345"})),
            &IpLookupHandler::new(&resolver),
            &sender,
        )
        .expect("event should be handled");

        assert_eq!(payload.status, ResponseStatus::Success);
        assert!(resolver.lookups().is_empty());
    }
}
