use std::collections::BTreeMap;

use serde_json::Value;

use crate::contract::{HandlerError, LifecycleEvent};

/// Typed property bag for the resolver IP lookup resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpLookupProps {
    pub resolver_id: String,
}

impl IpLookupProps {
    pub fn from_event(event: &LifecycleEvent) -> Result<Self, HandlerError> {
        Ok(Self {
            resolver_id: required_string(&event.resource_properties, "ResolverId")?,
        })
    }
}

/// Typed property bag for the bucket-emptying resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmptyBucketProps {
    pub bucket_name: String,
}

impl EmptyBucketProps {
    pub fn from_event(event: &LifecycleEvent) -> Result<Self, HandlerError> {
        Ok(Self {
            bucket_name: required_string(&event.resource_properties, "BucketName")?,
        })
    }
}

/// Typed property bag for the device certificate resource. The role alias
/// pair is optional but must be supplied together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceCertProps {
    pub thing_name: String,
    pub role_alias: Option<RoleAliasProps>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleAliasProps {
    pub alias: String,
    pub role_arn: String,
}

impl DeviceCertProps {
    pub fn from_event(event: &LifecycleEvent) -> Result<Self, HandlerError> {
        let thing_name = required_string(&event.resource_properties, "ThingName")?;
        let alias = optional_string(&event.resource_properties, "RoleAlias")?;
        let role_arn = optional_string(&event.resource_properties, "RoleArn")?;

        let role_alias = match (alias, role_arn) {
            (Some(alias), Some(role_arn)) => Some(RoleAliasProps { alias, role_arn }),
            (None, None) => None,
            (Some(_), None) => return Err(HandlerError::missing_property("RoleArn")),
            (None, Some(_)) => return Err(HandlerError::missing_property("RoleAlias")),
        };

        Ok(Self {
            thing_name,
            role_alias,
        })
    }

    /// Secret name the credential material is stored under.
    pub fn secret_name(&self) -> String {
        format!("{}-Credentials", self.thing_name)
    }
}

fn required_string(
    properties: &BTreeMap<String, Value>,
    name: &str,
) -> Result<String, HandlerError> {
    match optional_string(properties, name)? {
        Some(value) => Ok(value),
        None => Err(HandlerError::missing_property(name)),
    }
}

fn optional_string(
    properties: &BTreeMap<String, Value>,
    name: &str,
) -> Result<Option<String>, HandlerError> {
    let Some(raw) = properties.get(name) else {
        return Ok(None);
    };

    let Some(text) = raw.as_str() else {
        return Err(HandlerError::Validation(format!(
            "property {name} must be a string"
        )));
    };

    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(HandlerError::Validation(format!(
            "property {name} cannot be empty"
        )));
    }

    Ok(Some(trimmed.to_string()))
}
