//! Common types used across the ledger core

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role of the user acting on the ledger
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ActorRole {
    Admin,
    Manager,
    #[default]
    Member,
}

impl ActorRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorRole::Admin => "admin",
            ActorRole::Manager => "manager",
            ActorRole::Member => "member",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(ActorRole::Admin),
            "manager" => Some(ActorRole::Manager),
            "member" => Some(ActorRole::Member),
            _ => None,
        }
    }

    /// Elevated roles see and act on records of every user
    pub fn is_elevated(&self) -> bool {
        matches!(self, ActorRole::Admin | ActorRole::Manager)
    }
}

/// The authenticated user on whose behalf an operation runs
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: ActorRole,
}

impl Actor {
    pub fn new(user_id: Uuid, role: ActorRole) -> Self {
        Self { user_id, role }
    }

    pub fn member(user_id: Uuid) -> Self {
        Self::new(user_id, ActorRole::Member)
    }

    pub fn admin(user_id: Uuid) -> Self {
        Self::new(user_id, ActorRole::Admin)
    }

    /// Query scope for this actor: everything for elevated roles, own records otherwise
    pub fn scope(&self) -> Scope {
        if self.role.is_elevated() {
            Scope::All
        } else {
            Scope::Owner(self.user_id)
        }
    }

    /// Whether the actor may act on a record owned by `owner_id`
    pub fn can_access(&self, owner_id: Uuid) -> bool {
        self.role.is_elevated() || self.user_id == owner_id
    }
}

/// Visibility scope for read queries
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "kind", content = "user_id")]
pub enum Scope {
    All,
    Owner(Uuid),
}

impl Scope {
    pub fn includes(&self, owner_id: Uuid) -> bool {
        match self {
            Scope::All => true,
            Scope::Owner(user_id) => *user_id == owner_id,
        }
    }

    /// Owner filter for SQL binds (`NULL` means no filter)
    pub fn owner(&self) -> Option<Uuid> {
        match self {
            Scope::All => None,
            Scope::Owner(user_id) => Some(*user_id),
        }
    }
}

/// Date range for queries (inclusive on both ends)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DateRange {
    pub start: chrono::NaiveDate,
    pub end: chrono::NaiveDate,
}

impl DateRange {
    pub fn contains(&self, date: chrono::NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}
