use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{LedgerError, Result};
use crate::types::{ClientId, ClientStatus};

/// a borrower
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub first_name: String,
    pub last_name: String,
    /// national identity document number, unique per client
    pub national_id: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub registered_at: DateTime<Utc>,
    pub status: ClientStatus,
}

/// client registration request
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NewClient {
    pub first_name: String,
    pub last_name: String,
    pub national_id: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

/// full replacement of a client's editable fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientUpdate {
    pub first_name: String,
    pub last_name: String,
    pub national_id: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub status: ClientStatus,
}

impl NewClient {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        national_id: impl Into<String>,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            national_id: national_id.into(),
            ..Default::default()
        }
    }

    pub fn phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        require_identity(&self.first_name, &self.last_name, &self.national_id)
    }
}

impl ClientUpdate {
    pub fn validate(&self) -> Result<()> {
        require_identity(&self.first_name, &self.last_name, &self.national_id)
    }
}

impl From<&Client> for ClientUpdate {
    fn from(client: &Client) -> Self {
        Self {
            first_name: client.first_name.clone(),
            last_name: client.last_name.clone(),
            national_id: client.national_id.clone(),
            phone: client.phone.clone(),
            email: client.email.clone(),
            address: client.address.clone(),
            status: client.status,
        }
    }
}

impl Client {
    pub fn register(request: NewClient, registered_at: DateTime<Utc>) -> Result<Self> {
        request.validate()?;

        Ok(Self {
            id: Uuid::new_v4(),
            first_name: request.first_name.trim().to_string(),
            last_name: request.last_name.trim().to_string(),
            national_id: request.national_id.trim().to_string(),
            phone: clean(request.phone),
            email: clean(request.email),
            address: clean(request.address),
            registered_at,
            status: ClientStatus::Active,
        })
    }

    /// replace the editable fields
    pub fn apply_update(&mut self, update: ClientUpdate) -> Result<()> {
        update.validate()?;

        self.first_name = update.first_name.trim().to_string();
        self.last_name = update.last_name.trim().to_string();
        self.national_id = update.national_id.trim().to_string();
        self.phone = clean(update.phone);
        self.email = clean(update.email);
        self.address = clean(update.address);
        self.status = update.status;
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.status == ClientStatus::Active
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// case-insensitive substring match on names and national id
    pub fn matches(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return true;
        }

        [&self.first_name, &self.last_name, &self.national_id]
            .iter()
            .any(|field| field.to_lowercase().contains(&term))
    }
}

fn require_identity(first_name: &str, last_name: &str, national_id: &str) -> Result<()> {
    let missing: Vec<&str> = [
        ("first_name", first_name),
        ("last_name", last_name),
        ("national_id", national_id),
    ]
    .iter()
    .filter(|(_, value)| value.trim().is_empty())
    .map(|(name, _)| *name)
    .collect();

    if !missing.is_empty() {
        return Err(LedgerError::InvalidInput {
            message: format!("required fields missing: {}", missing.join(", ")),
        });
    }

    Ok(())
}

/// blank optional fields are stored as absent
fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_trims_and_activates() {
        let request = NewClient::new(" Ana ", "Torres", "12345678")
            .phone("555-0101")
            .email("  ");
        let client = Client::register(request, Utc::now()).unwrap();

        assert_eq!(client.first_name, "Ana");
        assert_eq!(client.full_name(), "Ana Torres");
        assert_eq!(client.phone.as_deref(), Some("555-0101"));
        assert_eq!(client.email, None);
        assert!(client.is_active());
    }

    #[test]
    fn test_missing_required_fields() {
        let err = Client::register(NewClient::new("Ana", " ", ""), Utc::now()).unwrap_err();
        match err {
            LedgerError::InvalidInput { message } => {
                assert!(message.contains("last_name"));
                assert!(message.contains("national_id"));
                assert!(!message.contains("first_name"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_search_matching() {
        let client = Client::register(NewClient::new("Lucía", "Fernández", "X-99812"), Utc::now()).unwrap();

        assert!(client.matches("luc"));
        assert!(client.matches("FERN"));
        assert!(client.matches("998"));
        assert!(!client.matches("garcia"));
    }

    #[test]
    fn test_apply_update_replaces_fields() {
        let mut client = Client::register(NewClient::new("Ana", "Torres", "1").address("Calle 1"), Utc::now()).unwrap();
        let mut update = ClientUpdate::from(&client);
        update.address = None;
        update.status = ClientStatus::Inactive;

        client.apply_update(update).unwrap();
        assert_eq!(client.address, None);
        assert!(!client.is_active());
    }
}
