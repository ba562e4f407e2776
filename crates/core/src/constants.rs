//! Canonical constants shared by readers, writers and the verification engine.

/// Labels reserved for organizing the domain tree.
///
/// A domain whose leaf label is one of these is never a resolvable
/// role, org or app definition.
pub const META_DOMAIN_LABELS: [&str; 3] = ["roles", "apps", "orgs"];

/// Meta-domain holding role definitions under an org or app.
pub const ROLES_LABEL: &str = "roles";

/// Meta-domain holding application definitions under an org.
pub const APPS_LABEL: &str = "apps";

/// Meta-domain holding sub-organization definitions.
pub const ORGS_LABEL: &str = "orgs";

/// Text record key under which definitions are stored and announced.
pub const METADATA_KEY: &str = "metadata";

/// Role type written when a legacy record omits `roleType`.
pub const DEFAULT_ROLE_TYPE: &str = "custom";

/// Definition version assumed when a legacy record omits `version`.
pub const DEFAULT_DEFINITION_VERSION: u64 = 1;

/// Check whether a label is one of the reserved meta-domain labels.
pub fn is_meta_label(label: &str) -> bool {
    META_DOMAIN_LABELS.contains(&label)
}
