use std::fmt;

use crate::error::HarvestError;

pub const DEFAULT_EMAIL_VAR: &str = "GIS_HARVEST_EMAIL";
pub const DEFAULT_PASSWORD_VAR: &str = "GIS_HARVEST_PASSWORD";

/// Portal login. The secret is redacted from `Debug` output.
#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

pub trait CredentialSource {
    fn credentials(&self) -> Result<Credentials, HarvestError>;
}

/// Reads the login from two environment variables at authentication time.
#[derive(Debug, Clone)]
pub struct EnvCredentials {
    email_var: String,
    password_var: String,
}

impl EnvCredentials {
    pub fn new(email_var: impl Into<String>, password_var: impl Into<String>) -> Self {
        Self {
            email_var: email_var.into(),
            password_var: password_var.into(),
        }
    }

    fn read(name: &str) -> Result<String, HarvestError> {
        match std::env::var(name) {
            Ok(value) if !value.trim().is_empty() => Ok(value),
            _ => Err(HarvestError::MissingCredentials(format!(
                "environment variable {name} is not set"
            ))),
        }
    }
}

impl Default for EnvCredentials {
    fn default() -> Self {
        Self::new(DEFAULT_EMAIL_VAR, DEFAULT_PASSWORD_VAR)
    }
}

impl CredentialSource for EnvCredentials {
    fn credentials(&self) -> Result<Credentials, HarvestError> {
        Ok(Credentials {
            email: Self::read(&self.email_var)?,
            password: Self::read(&self.password_var)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct StaticCredentials(pub Credentials);

impl StaticCredentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self(Credentials {
            email: email.into(),
            password: password.into(),
        })
    }
}

impl CredentialSource for StaticCredentials {
    fn credentials(&self) -> Result<Credentials, HarvestError> {
        Ok(self.0.clone())
    }
}
