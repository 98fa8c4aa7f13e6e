//! Credential resolution.

use secrecy::SecretString;

use super::config::CredentialSource;
use crate::error::ConfigError;

/// Read the credential from its source.
///
/// The value is wrapped in a [`SecretString`] straight away so it cannot end
/// up in `Debug` output or logs.
pub fn resolve_credential(source: &CredentialSource) -> Result<SecretString, ConfigError> {
    let value = match source {
        CredentialSource::Env(var) => std::env::var(var)
            .map_err(|_| ConfigError::MissingCredentialEnv(var.clone()))?,
        CredentialSource::File(path) => {
            let mut contents =
                std::fs::read_to_string(path).map_err(|source| ConfigError::CredentialFile {
                    path: path.clone(),
                    source,
                })?;
            if contents.ends_with('\n') {
                contents.pop();
                if contents.ends_with('\r') {
                    contents.pop();
                }
            }
            contents
        }
    };

    if value.is_empty() {
        return Err(ConfigError::EmptyCredential);
    }
    Ok(SecretString::from(value))
}
