//! # Users
//!
//! Authenticated users and the token directory that resolves them.
//! Identity comes from an external auth system; shopfront only reads it.
//! The directory is loaded from `config/users.toml`.

use serde::{Deserialize, Serialize};

pub type UserId = u64;

/// Caller role used by the access policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// No credentials presented (payment gateway callbacks, public pages)
    Anonymous,
    /// Regular signed-in shopper
    Customer,
    /// Staff member with admin rights over orders
    Staff,
}

/// A user profile as known to the shop
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,

    /// Opaque bearer token issued by the auth system
    #[serde(skip_serializing)]
    pub token: String,

    #[serde(default)]
    pub first_name: String,

    #[serde(default)]
    pub last_name: String,

    pub email: String,

    #[serde(default)]
    pub phone_number: String,

    #[serde(default)]
    pub address: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,

    #[serde(default)]
    pub is_staff: bool,
}

impl User {
    pub fn new(id: UserId, token: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id,
            token: token.into(),
            first_name: String::new(),
            last_name: String::new(),
            email: email.into(),
            phone_number: String::new(),
            address: String::new(),
            city: None,
            country: None,
            is_staff: false,
        }
    }

    /// Builder: set first and last name
    pub fn with_name(mut self, first: impl Into<String>, last: impl Into<String>) -> Self {
        self.first_name = first.into();
        self.last_name = last.into();
        self
    }

    /// Builder: set phone and street address
    pub fn with_contact(mut self, phone: impl Into<String>, address: impl Into<String>) -> Self {
        self.phone_number = phone.into();
        self.address = address.into();
        self
    }

    /// Builder: grant staff rights
    pub fn staff(mut self) -> Self {
        self.is_staff = true;
        self
    }

    pub fn role(&self) -> Role {
        if self.is_staff {
            Role::Staff
        } else {
            Role::Customer
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Token-to-user lookup table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserDirectory {
    #[serde(default)]
    pub users: Vec<User>,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self { users: Vec::new() }
    }

    pub fn add(&mut self, user: User) {
        self.users.push(user);
    }

    pub fn with_user(mut self, user: User) -> Self {
        self.add(user);
        self
    }

    /// Resolve a bearer token
    pub fn authenticate(&self, token: &str) -> Option<&User> {
        if token.is_empty() {
            return None;
        }
        self.users.iter().find(|u| u.token == token)
    }

    pub fn get(&self, id: UserId) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Load directory from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }
}
