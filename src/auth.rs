//! Credential sources queried when a session opens.
//!
//! The credential is looked up at authentication time, not when the client is
//! started, so a provider may read state that only exists once the session begins.

use crate::types::{RealtimeError, Result};

/// Supplies the credential sent in the AUTH request
pub trait CredentialProvider: Send + Sync + 'static {
    fn credential(&self) -> Result<String>;
}

impl<F> CredentialProvider for F
where
    F: Fn() -> Result<String> + Send + Sync + 'static,
{
    fn credential(&self) -> Result<String> {
        self()
    }
}

/// A credential known up front
#[derive(Debug, Clone)]
pub struct StaticCredential(String);

impl StaticCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl CredentialProvider for StaticCredential {
    fn credential(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// Reads the credential from an environment variable on every connect
#[derive(Debug, Clone)]
pub struct EnvCredential {
    var: String,
}

impl EnvCredential {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl CredentialProvider for EnvCredential {
    fn credential(&self) -> Result<String> {
        std::env::var(&self.var)
            .map_err(|e| RealtimeError::Auth(format!("cannot read {}: {}", self.var, e)))
    }
}

/// Queries `provider` and rejects empty credentials
pub(crate) fn resolve(provider: &dyn CredentialProvider) -> Result<String> {
    let credential = provider.credential()?;
    if credential.is_empty() {
        return Err(RealtimeError::Auth("credential provider returned an empty credential".to_string()));
    }
    Ok(credential)
}
