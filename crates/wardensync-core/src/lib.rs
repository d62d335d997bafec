//! Wardensync Core Library
//!
//! Core types, traits, and the reconciliation engine for keeping vault
//! organization membership in line with a directory service.

pub mod config;
pub mod error;
pub mod filter;
pub mod provider;
pub mod reconcile;
pub mod self_lock;
pub mod types;

pub use config::{OrgConfigSet, OrganizationConfig, SyncConfig};
pub use error::{Error, Result};
pub use filter::build_filter;
pub use provider::{DirectoryProvider, VaultConnector, VaultProvider};
pub use reconcile::reconcile;
pub use types::{
    member_map, DirectoryQuery, DirectoryUser, ManagedOrganization, MemberId, MemberMap,
    MemberStatus, OrgMember, SyncActions, VaultCredentials,
};

/// Wardensync version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default directory group membership attribute
pub const DEFAULT_GROUP_ATTRIBUTE: &str = "memberOf";

/// Default directory mail attribute
pub const DEFAULT_MAIL_ATTRIBUTE: &str = "mail";

/// Default attribute carrying the account lock flag (389ds / FreeIPA)
pub const DEFAULT_DISABLED_ATTRIBUTE: &str = "nsAccountLock";

/// Values of the disabled attribute that mark an account as locked
pub const DEFAULT_DISABLED_VALUES: &[&str] = &["TRUE", "true", "1", "yes", "YES"];

/// Default directory URL
pub const DEFAULT_LDAP_HOST: &str = "ldap://localhost:389";

/// Default vault URL
pub const DEFAULT_VAULT_URL: &str = "http://localhost:8080";
