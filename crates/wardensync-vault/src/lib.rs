//! Vault membership provider
//!
//! REST client for Bitwarden-compatible servers (Vaultwarden). One client is
//! bound to one personal API key and caches its bearer token.

mod client;
mod error;
mod models;

pub use client::{HttpVaultConnector, VaultClient};
pub use error::{VaultError, VaultResult};
pub use models::{InviteRequest, MemberDto, OrganizationDto, ProfileDto, TokenResponse};

/// Device name announced when requesting a token
pub const DEVICE_NAME: &str = "wardensync";

/// Bitwarden device type code for SDK clients
pub const DEVICE_TYPE: &str = "21";

/// A cached token is refreshed this many seconds before it expires
pub const TOKEN_REFRESH_MARGIN_SECS: u64 = 30;
