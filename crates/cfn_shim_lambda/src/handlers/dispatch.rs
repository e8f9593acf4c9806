use serde_json::{json, Value};

use crate::adapters::callback::CallbackSender;
use crate::logging::{log_error, log_info};
use crate::runtime::contract::{
    parse_lifecycle_event, stable_callback_json, ActionResult, CallbackPayload, HandlerError,
    LifecycleEvent, RequestType, FAILED_CREATE_PHYSICAL_ID,
};

/// One custom resource's imperative actions. Every action is expected to be
/// idempotent under orchestrator retry.
pub trait LifecycleHandler {
    fn component(&self) -> &'static str;

    fn on_create(&self, event: &LifecycleEvent) -> Result<ActionResult, HandlerError>;

    /// Defaults to a fresh Create for resources whose state is a pure read.
    fn on_update(&self, event: &LifecycleEvent) -> Result<ActionResult, HandlerError> {
        self.on_create(event)
    }

    fn on_delete(&self, event: &LifecycleEvent) -> Result<ActionResult, HandlerError>;
}

/// Invocation skeleton shared by all custom resource binaries: parse,
/// dispatch, convert every failure into a FAILED result, deliver the
/// callback. Returns the payload that was (or could not be) delivered;
/// `Err` only when the event is too malformed to even address a callback.
pub fn handle_lifecycle_event(
    raw_event: Value,
    handler: &dyn LifecycleHandler,
    sender: &dyn CallbackSender,
) -> Result<CallbackPayload, HandlerError> {
    let event = match parse_lifecycle_event(raw_event.clone()) {
        Ok(event) => event,
        Err(error) => return reject_unparseable_event(raw_event, handler, sender, error),
    };

    log_info(
        handler.component(),
        "event_received",
        json!({
            "request_type": event.request_type,
            "logical_resource_id": event.logical_resource_id,
            "request_id": event.request_id,
        }),
    );

    let outcome = match event.request_type {
        RequestType::Create => handler.on_create(&event),
        RequestType::Update => handler.on_update(&event),
        RequestType::Delete => handler.on_delete(&event),
    };

    let result = match outcome {
        Ok(result) => {
            log_info(
                handler.component(),
                "action_completed",
                json!({
                    "request_type": event.request_type,
                    "physical_resource_id": result.physical_resource_id,
                }),
            );
            result
        }
        Err(error) => {
            log_error(
                handler.component(),
                "action_failed",
                json!({
                    "request_type": event.request_type,
                    "error_kind": error.kind(),
                    "reason": error.reason(),
                }),
            );
            ActionResult::failed(fallback_physical_id(&event), error.reason())
        }
    };

    let payload = CallbackPayload::from_result(&event, result);
    deliver(handler, sender, &event.response_url, &payload);
    Ok(payload)
}

/// Best-effort FAILED callback for an event the typed parser rejected; the
/// orchestrator would otherwise stall until its own timeout.
fn reject_unparseable_event(
    raw_event: Value,
    handler: &dyn LifecycleHandler,
    sender: &dyn CallbackSender,
    error: HandlerError,
) -> Result<CallbackPayload, HandlerError> {
    log_error(
        handler.component(),
        "event_rejected",
        json!({"reason": error.reason()}),
    );

    let field = |name: &str| {
        raw_event
            .get(name)
            .and_then(Value::as_str)
            .map(str::to_string)
    };

    let Some(response_url) = field("ResponseURL") else {
        return Err(error);
    };

    let payload = CallbackPayload {
        status: crate::runtime::contract::ResponseStatus::Failed,
        reason: Some(error.reason().to_string()),
        physical_resource_id: field("PhysicalResourceId")
            .unwrap_or_else(|| FAILED_CREATE_PHYSICAL_ID.to_string()),
        stack_id: field("StackId").unwrap_or_default(),
        request_id: field("RequestId").unwrap_or_default(),
        logical_resource_id: field("LogicalResourceId").unwrap_or_default(),
        data: Default::default(),
    };

    deliver(handler, sender, &response_url, &payload);
    Ok(payload)
}

fn deliver(
    handler: &dyn LifecycleHandler,
    sender: &dyn CallbackSender,
    response_url: &str,
    payload: &CallbackPayload,
) {
    let body = stable_callback_json(payload);
    if let Err(error) = sender.send(response_url, body.as_bytes()) {
        // Unrecoverable from here; the orchestrator will time the
        // operation out on its side.
        log_error(
            handler.component(),
            "callback_delivery_failed",
            json!({
                "request_id": payload.request_id,
                "error": error,
            }),
        );
    }
}

fn fallback_physical_id(event: &LifecycleEvent) -> String {
    event
        .physical_resource_id
        .clone()
        .unwrap_or_else(|| FAILED_CREATE_PHYSICAL_ID.to_string())
}


#[cfg(test)]
mod tests {
    use super::test_support::{lifecycle_event_json, CapturingSender};
    use super::*;

    struct StaticHandler {
        delete_result: Option<ActionResult>,
    }

    impl LifecycleHandler for StaticHandler {
        fn component(&self) -> &'static str {
            "static_handler"
        }

        fn on_create(&self, _event: &LifecycleEvent) -> Result<ActionResult, HandlerError> {
            Ok(ActionResult::success("phys-create").with_attribute("Key", "value"))
        }

        fn on_delete(&self, _event: &LifecycleEvent) -> Result<ActionResult, HandlerError> {
            match &self.delete_result {
                Some(result) => Ok(result.clone()),
                None => Err(HandlerError::Upstream("delete exploded".to_string())),
            }
        }
    }

    #[test]
    fn delivers_success_callback_to_event_url() {
        let sender = CapturingSender::new();
        let payload = handle_lifecycle_event(
            lifecycle_event_json("Create", json!({})),
            &StaticHandler {
                delete_result: None,
            },
            &sender,
        )
        .expect("event should be handled");

        assert_eq!(payload.status, crate::runtime::contract::ResponseStatus::Success);
        assert_eq!(sender.urls(), vec!["https://callback.example/respond"]);
        let bodies = sender.bodies();
        assert_eq!(bodies[0]["Status"], Value::from("SUCCESS"));
        assert_eq!(bodies[0]["Data"]["Key"], Value::from("value"));
    }

    #[test]
    fn update_defaults_to_create() {
        let sender = CapturingSender::new();
        let payload = handle_lifecycle_event(
            lifecycle_event_json("Update", json!({})),
            &StaticHandler {
                delete_result: None,
            },
            &sender,
        )
        .expect("event should be handled");

        assert_eq!(payload.physical_resource_id, "phys-create");
    }

    #[test]
    fn failed_delete_echoes_event_physical_id() {
        let sender = CapturingSender::new();
        let mut raw = lifecycle_event_json("Delete", json!({}));
        raw["PhysicalResourceId"] = Value::from("phys-existing");

        let payload = handle_lifecycle_event(
            raw,
            &StaticHandler {
                delete_result: None,
            },
            &sender,
        )
        .expect("event should be handled");

        assert_eq!(payload.status, crate::runtime::contract::ResponseStatus::Failed);
        assert_eq!(payload.physical_resource_id, "phys-existing");
        assert_eq!(payload.reason.as_deref(), Some("delete exploded"));
    }

    #[test]
    fn failed_create_uses_placeholder_physical_id() {
        struct FailingCreate;
        impl LifecycleHandler for FailingCreate {
            fn component(&self) -> &'static str {
                "failing_create"
            }
            fn on_create(&self, _event: &LifecycleEvent) -> Result<ActionResult, HandlerError> {
                Err(HandlerError::missing_property("ResolverId"))
            }
            fn on_delete(&self, _event: &LifecycleEvent) -> Result<ActionResult, HandlerError> {
                Ok(ActionResult::success("unused"))
            }
        }

        let sender = CapturingSender::new();
        let payload = handle_lifecycle_event(
            lifecycle_event_json("Create", json!({})),
            &FailingCreate,
            &sender,
        )
        .expect("event should be handled");

        assert_eq!(payload.physical_resource_id, FAILED_CREATE_PHYSICAL_ID);
        assert_eq!(payload.reason.as_deref(), Some("missing property: ResolverId"));
    }

    #[test]
    fn unparseable_event_still_reports_failed_when_addressable() {
        let sender = CapturingSender::new();
        let raw = json!({
            "RequestType": "Replace",
            "ResponseURL": "https://callback.example/respond",
            "StackId": "stack-1",
            "RequestId": "req-9",
            "LogicalResourceId": "TestResource",
        });

        let payload = handle_lifecycle_event(
            raw,
            &StaticHandler {
                delete_result: None,
            },
            &sender,
        )
        .expect("addressable event should produce a callback");

        assert_eq!(payload.status, crate::runtime::contract::ResponseStatus::Failed);
        assert_eq!(payload.request_id, "req-9");
        assert_eq!(sender.urls().len(), 1);
    }

    #[test]
    fn unaddressable_event_returns_error_without_delivery() {
        let sender = CapturingSender::new();
        let error = handle_lifecycle_event(
            json!({"not": "an event"}),
            &StaticHandler {
                delete_result: None,
            },
            &sender,
        )
        .expect_err("event without a response url cannot be answered");

        assert!(matches!(error, HandlerError::Validation(_)));
        assert!(sender.urls().is_empty());
    }

    #[test]
    fn callback_delivery_failure_does_not_fail_the_invocation() {
        let sender = CapturingSender::failing("connection reset");
        let payload = handle_lifecycle_event(
            lifecycle_event_json("Create", json!({})),
            &StaticHandler {
                delete_result: None,
            },
            &sender,
        )
        .expect("delivery failure is logged, not propagated");

        assert_eq!(payload.status, crate::runtime::contract::ResponseStatus::Success);
        assert_eq!(sender.urls().len(), 1);
    }
}
