use serde::{Deserialize, Serialize};

/// Aggregate star rating for an agent
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub struct Rating {
    pub average: f32,
    pub count: u32,
}

/// Agent profile
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Agent {
    pub id: String,
    /// Account behind the profile
    pub user_id: Option<String>,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub agency: Option<String>,
    pub rating: Rating,
    pub bio: Option<String>,
    pub license: Option<String>,
    pub specialties: Vec<String>,
    pub avatar: Option<String>,
}

impl Agent {
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id.as_deref() == Some(user_id)
    }
}
