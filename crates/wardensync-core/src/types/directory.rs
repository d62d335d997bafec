//! Directory-side types

use serde::{Deserialize, Serialize};

use crate::filter::build_filter;
use crate::{
    DEFAULT_DISABLED_ATTRIBUTE, DEFAULT_DISABLED_VALUES, DEFAULT_GROUP_ATTRIBUTE,
    DEFAULT_MAIL_ATTRIBUTE,
};

/// A user entry as seen in one directory snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryUser {
    /// Distinguished name
    pub dn: String,

    /// Mail address (first value of the mail attribute)
    pub email: Option<String>,

    /// Group memberships
    pub groups: Vec<String>,

    /// Whether the account is locked in the directory
    pub disabled: bool,
}

impl DirectoryUser {
    pub fn new(dn: impl Into<String>, email: Option<&str>, disabled: bool) -> Self {
        Self {
            dn: dn.into(),
            email: email.map(str::to_string),
            groups: Vec::new(),
            disabled,
        }
    }

    /// Lower-cased, trimmed email, `None` when absent or blank
    pub fn normalized_email(&self) -> Option<String> {
        self.email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_lowercase)
    }
}

/// What to ask the directory for and how to classify the answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryQuery {
    /// objectClass restriction; `*` or empty disables it
    pub object_type: Option<String>,

    /// Raw group list (`;`, `|` or `, ` separated DNs)
    pub groups: Option<String>,

    /// Raw additional filter, used verbatim
    pub additional_filter: Option<String>,

    /// Attribute holding group membership
    pub group_attribute: String,

    /// Attribute holding the mail address
    pub mail_attribute: String,

    /// Attribute carrying the lock flag; `None` means every account is
    /// classified through `missing_is_disabled`
    pub disabled_attribute: Option<String>,

    /// Values of `disabled_attribute` that mean "locked"
    pub disabled_values: Vec<String>,

    /// Classification used when the lock attribute is absent or empty
    pub missing_is_disabled: bool,
}

impl Default for DirectoryQuery {
    fn default() -> Self {
        Self {
            object_type: None,
            groups: None,
            additional_filter: None,
            group_attribute: DEFAULT_GROUP_ATTRIBUTE.to_string(),
            mail_attribute: DEFAULT_MAIL_ATTRIBUTE.to_string(),
            disabled_attribute: Some(DEFAULT_DISABLED_ATTRIBUTE.to_string()),
            disabled_values: DEFAULT_DISABLED_VALUES.iter().map(|v| v.to_string()).collect(),
            missing_is_disabled: false,
        }
    }
}

impl DirectoryQuery {
    /// Search filter for this query
    pub fn filter(&self) -> String {
        build_filter(
            self.object_type.as_deref(),
            self.groups.as_deref(),
            self.additional_filter.as_deref(),
            &self.group_attribute,
        )
    }

    /// Copy of this query with a different group restriction
    pub fn with_groups(&self, groups: Option<&str>) -> Self {
        Self {
            groups: groups.map(str::to_string),
            ..self.clone()
        }
    }

    /// Attributes to request from the directory
    pub fn attributes(&self) -> Vec<String> {
        let mut attrs = vec![self.mail_attribute.clone(), self.group_attribute.clone()];
        if let Some(attr) = &self.disabled_attribute {
            attrs.push(attr.clone());
        }
        attrs
    }

    /// Classify the lock state from the raw values of the disabled attribute.
    ///
    /// `values` is `None` when the attribute is absent from the entry.
    pub fn classify_disabled(&self, values: Option<&[String]>) -> bool {
        match values {
            Some(values) if values.iter().any(|v| !v.is_empty()) => values
                .iter()
                .any(|v| self.disabled_values.iter().any(|d| d == v)),
            _ => self.missing_is_disabled,
        }
    }
}
