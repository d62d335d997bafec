//! Directory snapshot provider backed by LDAP
//!
//! Supports:
//! - LDAP and LDAPS (389 Directory Server, FreeIPA, OpenLDAP, Active Directory)
//! - STARTTLS upgrade
//! - Custom CA bundles and disabled certificate verification

mod client;
mod error;
mod tls;
mod types;

pub use client::{user_from_entry, LdapDirectory};
pub use error::{DirectoryError, DirectoryResult};
pub use types::LdapSettings;
