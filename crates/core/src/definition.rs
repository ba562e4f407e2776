//! Canonical in-memory model of role, org and app definitions.
//!
//! Both on-chain grammars decode into these types. Field names serialize in
//! the camelCase form used by the legacy text records.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::constants::{DEFAULT_DEFINITION_VERSION, DEFAULT_ROLE_TYPE};
use crate::types::Did;

/// Who may issue (or revoke) a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "issuerType")]
pub enum IssuerSpec {
    /// A fixed allow-list of identities.
    #[serde(rename = "DID")]
    Did {
        /// Allowed issuer DIDs.
        #[serde(default)]
        did: Vec<Did>,
    },
    /// Anyone currently holding the named role.
    #[serde(rename = "ROLE", rename_all = "camelCase")]
    Role {
        /// Namespace of the role a delegated issuer must hold.
        role_name: String,
    },
}

impl IssuerSpec {
    /// Whether `did` is on a DID allow-list.
    pub fn allows_did(&self, did: &Did) -> bool {
        match self {
            IssuerSpec::Did { did: allowed } => allowed.iter().any(|d| d.same_subject(did)),
            IssuerSpec::Role { .. } => false,
        }
    }
}

/// Kind of enrolment precondition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PreconditionType {
    /// The subject must already hold every listed role.
    #[serde(rename = "role")]
    Role,
}

/// Condition a subject must meet before enrolling into a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Precondition {
    /// Precondition kind.
    #[serde(rename = "type")]
    pub condition_type: PreconditionType,
    /// Role namespaces that must already be held.
    pub conditions: Vec<String>,
}

impl Precondition {
    /// A role precondition over the given namespaces.
    pub fn roles<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            condition_type: PreconditionType::Role,
            conditions: roles.into_iter().map(Into::into).collect(),
        }
    }
}

/// Description of one requestor- or issuer-supplied claim field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    /// `text`, `number`, `date`, `boolean` or `json`.
    pub field_type: String,
    /// Field label.
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_date: Option<String>,
}

/// Definition of a role domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleDefinition {
    /// Short role name, e.g. `manager`.
    pub role_name: String,
    /// Role type, `custom` unless the owner says otherwise.
    pub role_type: String,
    /// Definition revision, bumped by the owner on each update.
    pub version: u64,
    /// Who may issue the role.
    pub issuer: IssuerSpec,
    /// Who may revoke the role.
    pub revoker: IssuerSpec,
    /// Conditions a subject must meet before enrolment.
    pub enrolment_preconditions: Vec<Precondition>,
    /// Fields the requestor fills in.
    pub requestor_fields: Vec<FieldDefinition>,
    /// Fields the issuer fills in.
    pub issuer_fields: Vec<FieldDefinition>,
    /// Free-form metadata.
    pub metadata: Map<String, Value>,
    /// Default credential validity in milliseconds.
    pub default_validity_period: Option<u64>,
}

impl RoleDefinition {
    /// A minimal role definition with the given issuer as revoker and no
    /// preconditions or fields.
    pub fn new(role_name: impl Into<String>, issuer: IssuerSpec) -> Self {
        Self {
            role_name: role_name.into(),
            role_type: DEFAULT_ROLE_TYPE.to_string(),
            version: DEFAULT_DEFINITION_VERSION,
            revoker: issuer.clone(),
            issuer,
            enrolment_preconditions: Vec::new(),
            requestor_fields: Vec::new(),
            issuer_fields: Vec::new(),
            metadata: Map::new(),
            default_validity_period: None,
        }
    }

    /// Every role namespace named by a role precondition.
    pub fn required_roles(&self) -> impl Iterator<Item = &str> {
        self.enrolment_preconditions
            .iter()
            .filter(|p| p.condition_type == PreconditionType::Role)
            .flat_map(|p| p.conditions.iter().map(String::as_str))
    }
}

/// Definition of an organization domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgDefinition {
    /// Display name.
    pub org_name: String,
    /// Free-text description.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Public website.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub website_url: String,
    /// Logo image URL.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub logo_url: String,
    /// Free-form extra properties.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub others: Map<String, Value>,
}

impl OrgDefinition {
    /// An organization definition with only a name.
    pub fn new(org_name: impl Into<String>) -> Self {
        Self {
            org_name: org_name.into(),
            description: String::new(),
            website_url: String::new(),
            logo_url: String::new(),
            others: Map::new(),
        }
    }
}

/// Definition of an application domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppDefinition {
    /// Display name.
    pub app_name: String,
    /// Free-text description.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Public website.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub website_url: String,
    /// Logo image URL.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub logo_url: String,
    /// Free-form extra properties.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub others: Map<String, Value>,
}

impl AppDefinition {
    /// An application definition with only a name.
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            description: String::new(),
            website_url: String::new(),
            logo_url: String::new(),
            others: Map::new(),
        }
    }
}

/// Any definition a domain can carry.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainDefinition {
    /// Role domain.
    Role(RoleDefinition),
    /// Organization domain.
    Org(OrgDefinition),
    /// Application domain.
    App(AppDefinition),
}

impl DomainDefinition {
    /// Short kind name, used in logs and errors.
    pub const fn kind(&self) -> &'static str {
        match self {
            DomainDefinition::Role(_) => "role",
            DomainDefinition::Org(_) => "org",
            DomainDefinition::App(_) => "app",
        }
    }

    /// The role definition, if this is one.
    pub fn as_role(&self) -> Option<&RoleDefinition> {
        match self {
            DomainDefinition::Role(role) => Some(role),
            _ => None,
        }
    }

    /// Take the role definition out, if this is one.
    pub fn into_role(self) -> Option<RoleDefinition> {
        match self {
            DomainDefinition::Role(role) => Some(role),
            _ => None,
        }
    }
}

impl From<RoleDefinition> for DomainDefinition {
    fn from(def: RoleDefinition) -> Self {
        DomainDefinition::Role(def)
    }
}

impl From<OrgDefinition> for DomainDefinition {
    fn from(def: OrgDefinition) -> Self {
        DomainDefinition::Org(def)
    }
}

impl From<AppDefinition> for DomainDefinition {
    fn from(def: AppDefinition) -> Self {
        DomainDefinition::App(def)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn did(s: &str) -> Did {
        Did::new(s).unwrap()
    }

    #[test]
    fn test_issuer_spec_json_shape() {
        let issuer = IssuerSpec::Did {
            did: vec![did("did:ethr:0x1111111111111111111111111111111111111111")],
        };
        let json = serde_json::to_value(&issuer).unwrap();
        assert_eq!(json["issuerType"], "DID");
        assert_eq!(
            json["did"][0],
            "did:ethr:0x1111111111111111111111111111111111111111"
        );

        let issuer = IssuerSpec::Role {
            role_name: "manager.roles.myorg.iam.ewc".to_string(),
        };
        let json = serde_json::to_value(&issuer).unwrap();
        assert_eq!(json["issuerType"], "ROLE");
        assert_eq!(json["roleName"], "manager.roles.myorg.iam.ewc");
    }

    #[test]
    fn test_allows_did_only_for_did_lists() {
        let member = did("did:ethr:0x1111111111111111111111111111111111111111");
        let outsider = did("did:ethr:0x2222222222222222222222222222222222222222");

        let list = IssuerSpec::Did {
            did: vec![member.clone()],
        };
        assert!(list.allows_did(&member));
        assert!(!list.allows_did(&outsider));

        let delegated = IssuerSpec::Role {
            role_name: "manager.roles.myorg".to_string(),
        };
        assert!(!delegated.allows_did(&member));
    }

    #[test]
    fn test_required_roles() {
        let mut role = RoleDefinition::new(
            "user",
            IssuerSpec::Role {
                role_name: "manager.roles.myorg".to_string(),
            },
        );
        role.enrolment_preconditions = vec![
            Precondition::roles(["email.roles.myorg", "kyc.roles.myorg"]),
            Precondition::roles(["adult.roles.myorg"]),
        ];

        let required: Vec<&str> = role.required_roles().collect();
        assert_eq!(
            required,
            ["email.roles.myorg", "kyc.roles.myorg", "adult.roles.myorg"]
        );
        assert_eq!(role.revoker, role.issuer);
    }
}
