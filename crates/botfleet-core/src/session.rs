//! Per-identity durable session bundle.
//!
//! A [`Session`] holds the adapter-declared set of named fields (tokens,
//! cookies, cached profile data) for one external account. Values live in
//! memory as JSON and are persisted per `(identity, field)` through a
//! [`SessionBackend`]. `load` is tolerant: a missing or corrupt field comes
//! back as null and the caller treats it as "logged out". `save` is atomic
//! across all declared fields. No retries happen here; the caller applies
//! its own policy.

use botfleet_types::error::{RepositoryError, SessionError};
use botfleet_types::session::SessionSpec;
use serde_json::Value;

use std::collections::HashMap;
use std::sync::Arc;

/// Storage port for session fields.
///
/// Values travel as raw JSON text; decoding happens in [`Session`] so that
/// a single corrupt field degrades to null instead of failing the load.
/// `store_all` must be all-or-nothing: on failure, previously persisted
/// values stay untouched. Implementations live in botfleet-infra.
pub trait SessionBackend: Send + Sync {
    /// Fetch the raw stored text for one field, if present.
    fn fetch(
        &self,
        identity: &str,
        field: &str,
    ) -> impl std::future::Future<Output = Result<Option<String>, RepositoryError>> + Send;

    /// Atomically persist every given `(field, json_text)` pair.
    fn store_all(
        &self,
        identity: &str,
        entries: &[(String, String)],
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Delete the given fields. Missing fields are not an error.
    fn remove_all(
        &self,
        identity: &str,
        fields: &[String],
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}

/// In-memory view of one identity's session, bound to a backend.
pub struct Session<S: SessionBackend> {
    identity: String,
    spec: SessionSpec,
    backend: Arc<S>,
    values: HashMap<String, Value>,
}

impl<S: SessionBackend> Session<S> {
    /// Create an empty session (all declared fields null) for `identity`.
    pub fn new(identity: impl Into<String>, spec: SessionSpec, backend: Arc<S>) -> Self {
        let values = spec
            .field_names()
            .map(|name| (name.to_string(), Value::Null))
            .collect();
        Self {
            identity: identity.into(),
            spec,
            backend,
            values,
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn spec(&self) -> &SessionSpec {
        &self.spec
    }

    /// Current in-memory value of a field. Undeclared fields read as null.
    pub fn get(&self, field: &str) -> &Value {
        self.values.get(field).unwrap_or(&Value::Null)
    }

    /// Set a declared field. Writing an undeclared field fails and never
    /// creates new state.
    pub fn set(&mut self, field: &str, value: Value) -> Result<(), SessionError> {
        if !self.spec.declares(field) {
            return Err(SessionError::UndeclaredField(field.to_string()));
        }
        self.values.insert(field.to_string(), value);
        Ok(())
    }

    /// Whether every `required_for_auth` field is non-null.
    pub fn is_auth_complete(&self) -> bool {
        self.spec
            .required_names()
            .all(|name| !self.get(name).is_null())
    }

    /// Read every declared field from the backend.
    ///
    /// A missing key yields null. A field whose stored text fails to decode
    /// yields null for that field only, with a warning; the load itself
    /// still succeeds. Only backend failures are errors.
    pub async fn load(&mut self) -> Result<(), SessionError> {
        for field in self.spec.field_names().map(str::to_string).collect::<Vec<_>>() {
            let raw = self.backend.fetch(&self.identity, &field).await?;
            let value = match raw {
                None => Value::Null,
                Some(text) => match serde_json::from_str(&text) {
                    Ok(value) => value,
                    Err(err) => {
                        tracing::warn!(
                            identity = %self.identity,
                            field = %field,
                            %err,
                            "corrupt session field, treating as logged out"
                        );
                        Value::Null
                    }
                },
            };
            self.values.insert(field, value);
        }
        Ok(())
    }

    /// Persist all declared fields in one atomic backend write.
    pub async fn save(&self) -> Result<(), SessionError> {
        let mut entries = Vec::with_capacity(self.values.len());
        for field in self.spec.field_names() {
            let value = self.get(field);
            let text = serde_json::to_string(value).map_err(|err| SessionError::Serialize {
                field: field.to_string(),
                reason: err.to_string(),
            })?;
            entries.push((field.to_string(), text));
        }
        self.backend.store_all(&self.identity, &entries).await?;
        Ok(())
    }

    /// Reset every field to null and delete the persisted keys.
    pub async fn clear(&mut self) -> Result<(), SessionError> {
        for value in self.values.values_mut() {
            *value = Value::Null;
        }
        let fields: Vec<String> = self.spec.field_names().map(str::to_string).collect();
        self.backend.remove_all(&self.identity, &fields).await?;
        Ok(())
    }
}
