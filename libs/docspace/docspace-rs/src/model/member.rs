use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::privilege::RawPrivilege;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemberKind {
    /// A person signing in to the console.
    User,
    /// An external application client holding api credentials.
    AppClient,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct PrivilegeRecord {
    pub id: Uuid,
    pub privilege: RawPrivilege,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub id: Uuid,
    pub name: String,
    pub kind: MemberKind,
    pub records: Vec<PrivilegeRecord>,
}

impl Member {
    pub fn grants(&self) -> BTreeSet<RawPrivilege> {
        self.records.iter().map(|r| r.privilege).collect()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UserRole {
    #[default]
    Member,
    /// Authorized for every action in every space without consulting grants.
    GlobalAdmin,
}

/// The person operating the console.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct User {
    pub name: String,
    pub role: UserRole,
}

impl User {
    pub fn is_global_admin(&self) -> bool {
        self.role == UserRole::GlobalAdmin
    }
}
