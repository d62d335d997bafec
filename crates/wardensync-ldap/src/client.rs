//! LDAP directory client
//!
//! Binds with the service account and takes one subtree snapshot of the
//! users matching the query. Supports LDAP, LDAPS and STARTTLS connections.

use async_trait::async_trait;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, Scope, SearchEntry};
use std::collections::HashMap;
use tracing::{debug, info, warn};
use wardensync_core::config::DirectoryConfig;
use wardensync_core::{DirectoryProvider, DirectoryQuery, DirectoryUser};

use crate::error::{DirectoryError, DirectoryResult};
use crate::tls::load_ca_config;
use crate::types::LdapSettings;

/// Directory snapshot provider for an LDAP server
pub struct LdapDirectory {
    settings: LdapSettings,
}

impl LdapDirectory {
    pub fn new(settings: LdapSettings) -> Self {
        Self { settings }
    }

    pub fn from_config(config: &DirectoryConfig) -> Self {
        Self::new(LdapSettings::from_config(config))
    }

    pub fn settings(&self) -> &LdapSettings {
        &self.settings
    }

    /// Take one snapshot of the users matching `query`
    pub async fn search(&self, query: &DirectoryQuery) -> DirectoryResult<Vec<DirectoryUser>> {
        self.settings
            .validate()
            .map_err(DirectoryError::InvalidSettings)?;

        let mut ldap = self.connect().await?;
        let result = self.search_with_connection(&mut ldap, query).await;
        let _ = ldap.unbind().await;
        result
    }

    /// Create LDAP connection with proper TLS settings
    async fn create_connection(&self) -> DirectoryResult<(LdapConnAsync, Ldap)> {
        let mut conn_settings = LdapConnSettings::new()
            .set_conn_timeout(self.settings.timeout)
            .set_starttls(self.settings.start_tls)
            .set_no_tls_verify(!self.settings.tls_verify);

        if let Some(ca_file) = &self.settings.ca_file {
            if self.settings.tls_verify {
                conn_settings = conn_settings.set_config(load_ca_config(ca_file)?);
            } else {
                warn!(ca_file = %ca_file, "Certificate verification is off, ignoring CA file");
            }
        }

        debug!(server = %self.settings.server_url, "Connecting to directory server");

        LdapConnAsync::with_settings(conn_settings, &self.settings.server_url)
            .await
            .map_err(|e| DirectoryError::Connect(e.to_string()))
    }

    async fn connect(&self) -> DirectoryResult<Ldap> {
        let (conn, mut ldap) = self.create_connection().await?;
        ldap3::drive!(conn);

        let result = ldap
            .with_timeout(self.settings.timeout)
            .simple_bind(&self.settings.bind_dn, &self.settings.bind_password)
            .await
            .map_err(|e| DirectoryError::Connect(format!("Bind failed: {}", e)))?;

        if result.rc != 0 {
            let _ = ldap.unbind().await;
            return Err(DirectoryError::Bind {
                dn: self.settings.bind_dn.clone(),
                rc: result.rc,
                message: result.text,
            });
        }

        Ok(ldap)
    }

    async fn search_with_connection(
        &self,
        ldap: &mut Ldap,
        query: &DirectoryQuery,
    ) -> DirectoryResult<Vec<DirectoryUser>> {
        let filter = query.filter();
        let attrs = query.attributes();

        debug!(base = %self.settings.base_dn, filter = %filter, "Searching directory");

        let (rs, _res) = ldap
            .with_timeout(self.settings.timeout)
            .search(&self.settings.base_dn, Scope::Subtree, &filter, attrs)
            .await
            .map_err(|e| DirectoryError::Search(e.to_string()))?
            .success()
            .map_err(|e| DirectoryError::Search(e.to_string()))?;

        let users: Vec<DirectoryUser> = rs
            .into_iter()
            .map(SearchEntry::construct)
            .map(|entry| user_from_entry(entry.dn, &entry.attrs, query))
            .collect();

        let disabled = users.iter().filter(|u| u.disabled).count();
        info!(
            users = users.len(),
            disabled = disabled,
            "Fetched directory snapshot"
        );
        Ok(users)
    }
}

#[async_trait]
impl DirectoryProvider for LdapDirectory {
    async fn fetch_users(&self, query: &DirectoryQuery) -> wardensync_core::Result<Vec<DirectoryUser>> {
        Ok(self.search(query).await?)
    }
}

/// Attribute values, matching the name case-insensitively
fn attr_values<'a>(attrs: &'a HashMap<String, Vec<String>>, name: &str) -> Option<&'a [String]> {
    attrs
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, values)| values.as_slice())
}

/// Build a directory user from a raw search entry
pub fn user_from_entry(
    dn: String,
    attrs: &HashMap<String, Vec<String>>,
    query: &DirectoryQuery,
) -> DirectoryUser {
    let email = attr_values(attrs, &query.mail_attribute)
        .and_then(|values| values.first())
        .map(String::as_str);

    let disabled = match &query.disabled_attribute {
        Some(attr) => query.classify_disabled(attr_values(attrs, attr)),
        None => query.missing_is_disabled,
    };

    let mut user = DirectoryUser::new(dn, email, disabled);
    user.groups = attr_values(attrs, &query.group_attribute)
        .map(<[String]>::to_vec)
        .unwrap_or_default();
    user
}
