//! Structured grammar: ABI-encoded envelope with a format discriminator.

use alloy_primitives::Bytes;
use alloy_sol_types::SolValue;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use super::ResolverVersion;
use crate::definition::{
    AppDefinition, DomainDefinition, IssuerSpec, OrgDefinition, Precondition, PreconditionType,
    RoleDefinition,
};
use crate::error::{CoreError, Result};
use crate::types::Did;

mod records {
    #![allow(missing_docs)]

    alloy_sol_types::sol! {
        struct DefinitionEnvelope {
            uint8 formatVersion;
            uint8 kind;
            bytes body;
        }

        struct IssuerRecord {
            uint8 issuerType;
            string[] dids;
            string roleName;
        }

        struct PreconditionRecord {
            uint8 conditionType;
            string[] conditions;
        }

        struct RoleRecordV1 {
            uint64 version;
            string roleName;
            string roleType;
            IssuerRecord issuer;
            PreconditionRecord[] enrolmentPreconditions;
            string requestorFields;
            string issuerFields;
            string metadata;
        }

        struct RoleRecordV2 {
            uint64 version;
            string roleName;
            string roleType;
            IssuerRecord issuer;
            IssuerRecord revoker;
            PreconditionRecord[] enrolmentPreconditions;
            string requestorFields;
            string issuerFields;
            string metadata;
            uint64 defaultValidityPeriod;
        }

        struct OrgRecord {
            string orgName;
            string description;
            string websiteUrl;
            string logoUrl;
            string others;
        }

        struct AppRecord {
            string appName;
            string description;
            string websiteUrl;
            string logoUrl;
            string others;
        }
    }
}

use records::*;

const KIND_ROLE: u8 = 0;
const KIND_ORG: u8 = 1;
const KIND_APP: u8 = 2;

const ISSUER_DID: u8 = 0;
const ISSUER_ROLE: u8 = 1;

const CONDITION_ROLE: u8 = 0;

fn malformed(what: impl std::fmt::Display) -> CoreError {
    CoreError::MalformedDefinition(what.to_string())
}

fn abi_decode<T: alloy_sol_types::SolType>(bytes: &[u8], what: &str) -> Result<T::RustType> {
    T::abi_decode(bytes, true).map_err(|e| malformed(format!("invalid {what}: {e}")))
}

pub(super) fn decode(bytes: &Bytes, version: ResolverVersion) -> Result<DomainDefinition> {
    let envelope = abi_decode::<DefinitionEnvelope>(bytes, "definition envelope")?;

    if Some(envelope.formatVersion) != version.discriminator() {
        return Err(malformed(format!(
            "record format version {} does not match {version} resolver",
            envelope.formatVersion
        )));
    }

    match envelope.kind {
        KIND_ROLE => decode_role(&envelope.body, version).map(DomainDefinition::Role),
        KIND_ORG => {
            let record = abi_decode::<OrgRecord>(&envelope.body, "org record")?;
            Ok(DomainDefinition::Org(OrgDefinition {
                org_name: record.orgName,
                description: record.description,
                website_url: record.websiteUrl,
                logo_url: record.logoUrl,
                others: json_map(&record.others)?,
            }))
        }
        KIND_APP => {
            let record = abi_decode::<AppRecord>(&envelope.body, "app record")?;
            Ok(DomainDefinition::App(AppDefinition {
                app_name: record.appName,
                description: record.description,
                website_url: record.websiteUrl,
                logo_url: record.logoUrl,
                others: json_map(&record.others)?,
            }))
        }
        other => Err(malformed(format!("unknown definition kind {other}"))),
    }
}

pub(super) fn encode(definition: &DomainDefinition, version: ResolverVersion) -> Result<Bytes> {
    let format_version = version
        .discriminator()
        .ok_or_else(|| malformed(format!("{version} resolvers have no structured grammar")))?;

    let (kind, body) = match definition {
        DomainDefinition::Role(role) => (KIND_ROLE, encode_role(role, version)?),
        DomainDefinition::Org(org) => (
            KIND_ORG,
            OrgRecord {
                orgName: org.org_name.clone(),
                description: org.description.clone(),
                websiteUrl: org.website_url.clone(),
                logoUrl: org.logo_url.clone(),
                others: map_json(&org.others)?,
            }
            .abi_encode(),
        ),
        DomainDefinition::App(app) => (
            KIND_APP,
            AppRecord {
                appName: app.app_name.clone(),
                description: app.description.clone(),
                websiteUrl: app.website_url.clone(),
                logoUrl: app.logo_url.clone(),
                others: map_json(&app.others)?,
            }
            .abi_encode(),
        ),
    };

    let envelope = DefinitionEnvelope {
        formatVersion: format_version,
        kind,
        body: body.into(),
    };

    Ok(envelope.abi_encode().into())
}

fn decode_role(body: &[u8], version: ResolverVersion) -> Result<RoleDefinition> {
    if version.supports_revoker() {
        let record = abi_decode::<RoleRecordV2>(body, "role record")?;
        let default_validity_period = match record.defaultValidityPeriod {
            0 => None,
            period => Some(period),
        };
        return Ok(RoleDefinition {
            role_name: record.roleName,
            role_type: record.roleType,
            version: record.version,
            issuer: issuer_from_record(record.issuer)?,
            revoker: issuer_from_record(record.revoker)?,
            enrolment_preconditions: preconditions_from_records(record.enrolmentPreconditions)?,
            requestor_fields: json_list(&record.requestorFields)?,
            issuer_fields: json_list(&record.issuerFields)?,
            metadata: json_map(&record.metadata)?,
            default_validity_period,
        });
    }

    let record = abi_decode::<RoleRecordV1>(body, "role record")?;
    let issuer = issuer_from_record(record.issuer)?;
    Ok(RoleDefinition {
        role_name: record.roleName,
        role_type: record.roleType,
        version: record.version,
        revoker: issuer.clone(),
        issuer,
        enrolment_preconditions: preconditions_from_records(record.enrolmentPreconditions)?,
        requestor_fields: json_list(&record.requestorFields)?,
        issuer_fields: json_list(&record.issuerFields)?,
        metadata: json_map(&record.metadata)?,
        default_validity_period: None,
    })
}

fn encode_role(role: &RoleDefinition, version: ResolverVersion) -> Result<Vec<u8>> {
    if role.default_validity_period == Some(0) {
        return Err(malformed("defaultValidityPeriod must be positive"));
    }

    if !version.supports_revoker() {
        if role.revoker != role.issuer {
            return Err(CoreError::UnsupportedField {
                field: "revoker",
                version,
            });
        }
        if role.default_validity_period.is_some() {
            return Err(CoreError::UnsupportedField {
                field: "defaultValidityPeriod",
                version,
            });
        }

        return Ok(RoleRecordV1 {
            version: role.version,
            roleName: role.role_name.clone(),
            roleType: role.role_type.clone(),
            issuer: issuer_to_record(&role.issuer),
            enrolmentPreconditions: preconditions_to_records(&role.enrolment_preconditions),
            requestorFields: to_json(&role.requestor_fields)?,
            issuerFields: to_json(&role.issuer_fields)?,
            metadata: map_json(&role.metadata)?,
        }
        .abi_encode());
    }

    Ok(RoleRecordV2 {
        version: role.version,
        roleName: role.role_name.clone(),
        roleType: role.role_type.clone(),
        issuer: issuer_to_record(&role.issuer),
        revoker: issuer_to_record(&role.revoker),
        enrolmentPreconditions: preconditions_to_records(&role.enrolment_preconditions),
        requestorFields: to_json(&role.requestor_fields)?,
        issuerFields: to_json(&role.issuer_fields)?,
        metadata: map_json(&role.metadata)?,
        defaultValidityPeriod: role.default_validity_period.unwrap_or(0),
    }
    .abi_encode())
}

fn issuer_to_record(issuer: &IssuerSpec) -> IssuerRecord {
    match issuer {
        IssuerSpec::Did { did } => IssuerRecord {
            issuerType: ISSUER_DID,
            dids: did.iter().map(|d| d.as_str().to_string()).collect(),
            roleName: String::new(),
        },
        IssuerSpec::Role { role_name } => IssuerRecord {
            issuerType: ISSUER_ROLE,
            dids: Vec::new(),
            roleName: role_name.clone(),
        },
    }
}

fn issuer_from_record(record: IssuerRecord) -> Result<IssuerSpec> {
    match record.issuerType {
        ISSUER_DID => {
            let did = record
                .dids
                .into_iter()
                .map(Did::new)
                .collect::<Result<Vec<_>>>()
                .map_err(|e| malformed(format!("issuer list: {e}")))?;
            Ok(IssuerSpec::Did { did })
        }
        ISSUER_ROLE if !record.roleName.is_empty() => Ok(IssuerSpec::Role {
            role_name: record.roleName,
        }),
        ISSUER_ROLE => Err(malformed("role issuer without role name")),
        other => Err(malformed(format!("unknown issuer type {other}"))),
    }
}

fn preconditions_to_records(preconditions: &[Precondition]) -> Vec<PreconditionRecord> {
    preconditions
        .iter()
        .map(|p| PreconditionRecord {
            conditionType: match p.condition_type {
                PreconditionType::Role => CONDITION_ROLE,
            },
            conditions: p.conditions.clone(),
        })
        .collect()
}

fn preconditions_from_records(records: Vec<PreconditionRecord>) -> Result<Vec<Precondition>> {
    records
        .into_iter()
        .map(|record| match record.conditionType {
            CONDITION_ROLE => Ok(Precondition {
                condition_type: PreconditionType::Role,
                conditions: record.conditions,
            }),
            other => Err(malformed(format!("unknown precondition type {other}"))),
        })
        .collect()
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(malformed)
}

fn map_json(map: &Map<String, Value>) -> Result<String> {
    if map.is_empty() {
        return Ok(String::new());
    }
    to_json(map)
}

fn json_list<T: DeserializeOwned>(text: &str) -> Result<Vec<T>> {
    if text.is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(text).map_err(malformed)
}

fn json_map(text: &str) -> Result<Map<String, Value>> {
    if text.is_empty() {
        return Ok(Map::new());
    }
    serde_json::from_str(text).map_err(malformed)
}
