//! User model

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A mirrored user account.
///
/// The password hash is only present when the server includes it for offline
/// sign-in; it is never produced locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "id_usuario")]
    pub id: Option<i64>,
    pub email: String,
    #[serde(rename = "senha", default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    #[serde(rename = "telefone", default)]
    pub phone: Option<String>,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "pontos", default)]
    pub points: f64,
}

impl User {
    pub fn new(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: None,
            email: email.into(),
            password_hash: None,
            phone: None,
            name: name.into(),
            points: 0.0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let email = self.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(Error::InvalidInput("user requires a valid email".into()));
        }
        if self.name.trim().is_empty() {
            return Err(Error::InvalidInput("user name must not be empty".into()));
        }
        Ok(())
    }
}
