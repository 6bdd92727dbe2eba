use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Agent,
    Admin,
}

/// Signed-in account
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
    /// Ids of properties the user has liked
    #[serde(default)]
    pub saved_properties: Vec<String>,
    pub phone: Option<String>,
    pub avatar: Option<String>,
    pub bio: Option<String>,
}

impl User {
    pub fn has_saved(&self, property_id: &str) -> bool {
        self.saved_properties.iter().any(|id| id == property_id)
    }

    /// Add or remove a property id, never leaving duplicates behind
    pub fn set_saved(&mut self, property_id: &str, saved: bool) {
        self.saved_properties.retain(|id| id != property_id);
        if saved {
            self.saved_properties.push(property_id.to_string());
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_agent(&self) -> bool {
        self.role == Role::Agent
    }
}
