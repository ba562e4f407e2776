//! Legacy grammar: JSON text stored under the `metadata` key.
//!
//! The grammar is permissive. Only the name and, for roles, the issuer are
//! required; everything else falls back to a default.

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::constants::{DEFAULT_DEFINITION_VERSION, DEFAULT_ROLE_TYPE};
use crate::definition::{
    AppDefinition, DomainDefinition, FieldDefinition, IssuerSpec, OrgDefinition, Precondition,
    RoleDefinition,
};
use crate::error::{CoreError, Result};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyRoleRecord {
    role_name: String,
    #[serde(default = "default_role_type")]
    role_type: String,
    #[serde(default = "default_version", deserialize_with = "lenient_version")]
    version: u64,
    issuer: IssuerSpec,
    #[serde(default)]
    revoker: Option<IssuerSpec>,
    #[serde(default)]
    enrolment_preconditions: Vec<Precondition>,
    #[serde(default, alias = "fields")]
    requestor_fields: Vec<FieldDefinition>,
    #[serde(default)]
    issuer_fields: Vec<FieldDefinition>,
    #[serde(default)]
    metadata: Value,
    #[serde(default)]
    default_validity_period: Option<u64>,
}

fn default_role_type() -> String {
    DEFAULT_ROLE_TYPE.to_string()
}

fn default_version() -> u64 {
    DEFAULT_DEFINITION_VERSION
}

/// Versions were written both as numbers and as strings (`"1"`, `"1.0.0"`).
fn lenient_version<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match &value {
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| serde::de::Error::custom(format!("invalid version {n}"))),
        Value::String(s) => s
            .split('.')
            .next()
            .and_then(|major| major.trim().parse().ok())
            .ok_or_else(|| serde::de::Error::custom(format!("invalid version {s:?}"))),
        Value::Null => Ok(DEFAULT_DEFINITION_VERSION),
        other => Err(serde::de::Error::custom(format!("invalid version {other}"))),
    }
}

fn metadata_map(value: Value) -> Result<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        Value::Array(items) if items.is_empty() => Ok(Map::new()),
        other => Err(CoreError::MalformedDefinition(format!(
            "metadata must be an object, got {other}"
        ))),
    }
}

fn malformed(err: serde_json::Error) -> CoreError {
    CoreError::MalformedDefinition(err.to_string())
}

pub(super) fn decode(text: &str) -> Result<DomainDefinition> {
    let value: Value = serde_json::from_str(text).map_err(malformed)?;
    let Value::Object(object) = &value else {
        return Err(CoreError::MalformedDefinition(
            "definition record is not a JSON object".to_string(),
        ));
    };

    if object.contains_key("roleName") {
        let record: LegacyRoleRecord = serde_json::from_value(value).map_err(malformed)?;
        let revoker = record.revoker.unwrap_or_else(|| record.issuer.clone());
        return Ok(DomainDefinition::Role(RoleDefinition {
            role_name: record.role_name,
            role_type: record.role_type,
            version: record.version,
            issuer: record.issuer,
            revoker,
            enrolment_preconditions: record.enrolment_preconditions,
            requestor_fields: record.requestor_fields,
            issuer_fields: record.issuer_fields,
            metadata: metadata_map(record.metadata)?,
            default_validity_period: record.default_validity_period,
        }));
    }

    if object.contains_key("orgName") {
        let org: OrgDefinition = serde_json::from_value(value).map_err(malformed)?;
        return Ok(DomainDefinition::Org(org));
    }

    if object.contains_key("appName") {
        let app: AppDefinition = serde_json::from_value(value).map_err(malformed)?;
        return Ok(DomainDefinition::App(app));
    }

    Err(CoreError::MalformedDefinition(
        "record has none of roleName, orgName, appName".to_string(),
    ))
}

pub(super) fn encode(definition: &DomainDefinition) -> Result<String> {
    let encoded = match definition {
        DomainDefinition::Role(role) => serde_json::to_string(role),
        DomainDefinition::Org(org) => serde_json::to_string(org),
        DomainDefinition::App(app) => serde_json::to_string(app),
    };
    encoded.map_err(|e| CoreError::MalformedDefinition(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_role_gets_defaults() {
        let text = r#"{
            "roleName": "admin",
            "issuer": {"issuerType": "DID", "did": ["did:ethr:0x1111111111111111111111111111111111111111"]}
        }"#;

        let DomainDefinition::Role(role) = decode(text).unwrap() else {
            panic!("expected role definition");
        };
        assert_eq!(role.role_name, "admin");
        assert_eq!(role.role_type, "custom");
        assert_eq!(role.version, 1);
        assert_eq!(role.revoker, role.issuer);
        assert!(role.enrolment_preconditions.is_empty());
        assert!(role.metadata.is_empty());
        assert!(role.default_validity_period.is_none());
    }

    #[test]
    fn test_fields_alias_and_string_version() {
        let text = r#"{
            "roleName": "user",
            "roleType": "custom",
            "version": "2.0.0",
            "issuer": {"issuerType": "ROLE", "roleName": "admin.roles.myorg"},
            "fields": [{"fieldType": "text", "label": "email", "required": true}],
            "metadata": [],
            "enrolmentPreconditions": [{"type": "role", "conditions": ["email.roles.myorg"]}]
        }"#;

        let DomainDefinition::Role(role) = decode(text).unwrap() else {
            panic!("expected role definition");
        };
        assert_eq!(role.version, 2);
        assert_eq!(role.requestor_fields.len(), 1);
        assert_eq!(role.requestor_fields[0].label, "email");
        assert_eq!(
            role.issuer,
            IssuerSpec::Role {
                role_name: "admin.roles.myorg".to_string()
            }
        );
        assert_eq!(role.required_roles().collect::<Vec<_>>(), ["email.roles.myorg"]);
    }

    #[test]
    fn test_org_and_app_detection() {
        let org = decode(r#"{"orgName": "My Org", "websiteUrl": "https://x.example"}"#).unwrap();
        assert_eq!(org.kind(), "org");

        let app = decode(r#"{"appName": "Dashboard"}"#).unwrap();
        assert_eq!(app.kind(), "app");
    }

    #[test]
    fn test_malformed_records() {
        for text in [
            "",
            "not json",
            "[1, 2, 3]",
            r#"{"description": "no name"}"#,
            r#"{"roleName": "admin"}"#,
            r#"{"roleName": "admin", "issuer": {"issuerType": "NOBODY"}}"#,
            r#"{"roleName": "admin", "issuer": {"issuerType": "DID", "did": ["not-a-did"]}}"#,
            r#"{"roleName": "admin", "issuer": {"issuerType": "DID", "did": []}, "metadata": 5}"#,
        ] {
            assert!(
                matches!(decode(text), Err(CoreError::MalformedDefinition(_))),
                "expected malformed for {text:?}"
            );
        }
    }
}
