//! Session field declarations.
//!
//! Each platform adapter declares up front which named fields its session
//! carries (tokens, cookies, cached profile, ...). The engine persists
//! exactly that set and nothing else.

use serde::{Deserialize, Serialize};

/// One declared session field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionField {
    pub name: String,
    /// When true, a null value for this field means the session cannot
    /// authenticate and the bot must re-run the OTP handshake.
    pub required_for_auth: bool,
}

impl SessionField {
    pub fn required(name: &str) -> Self {
        Self {
            name: name.to_string(),
            required_for_auth: true,
        }
    }

    pub fn optional(name: &str) -> Self {
        Self {
            name: name.to_string(),
            required_for_auth: false,
        }
    }
}

/// The fixed, adapter-declared set of session fields for one platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSpec {
    pub fields: Vec<SessionField>,
}

impl SessionSpec {
    pub fn new(fields: Vec<SessionField>) -> Self {
        Self { fields }
    }

    /// Whether `name` is one of the declared fields.
    pub fn declares(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }

    /// Names of all declared fields, in declaration order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Names of the fields that must be non-null for a valid session.
    pub fn required_names(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|f| f.required_for_auth)
            .map(|f| f.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declares() {
        let spec = SessionSpec::new(vec![
            SessionField::required("access_token"),
            SessionField::optional("profile"),
        ]);
        assert!(spec.declares("access_token"));
        assert!(spec.declares("profile"));
        assert!(!spec.declares("cookie_jar"));
    }

    #[test]
    fn test_required_names_filters() {
        let spec = SessionSpec::new(vec![
            SessionField::required("access_token"),
            SessionField::required("refresh_token"),
            SessionField::optional("profile"),
        ]);
        let required: Vec<&str> = spec.required_names().collect();
        assert_eq!(required, vec!["access_token", "refresh_token"]);
    }
}
