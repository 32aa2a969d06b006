//! Mapping between raw grant atoms and the tiers shown to administrators.
//!
//! Authorization is always decided per atom (see [crate::service::privileges]).
//! Tiers exist for display and for editing members: a member holding
//! `Membership` shows as [PrivilegeTier::Admin] whether or not it also holds
//! `Write`.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::member::Member;

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RawPrivilege {
    Read,
    Write,
    /// Allows managing the other members of a space.
    Membership,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrivilegeTier {
    Viewer,
    Editor,
    Admin,
}

pub const TIERS: [PrivilegeTier; 3] =
    [PrivilegeTier::Viewer, PrivilegeTier::Editor, PrivilegeTier::Admin];

pub fn tier_of(grants: &BTreeSet<RawPrivilege>) -> PrivilegeTier {
    if grants.contains(&RawPrivilege::Membership) {
        PrivilegeTier::Admin
    } else if grants.contains(&RawPrivilege::Write) {
        PrivilegeTier::Editor
    } else {
        PrivilegeTier::Viewer
    }
}

/// The smallest grant set that resolves to `tier`. Read is implicit.
pub fn grants_for(tier: PrivilegeTier) -> BTreeSet<RawPrivilege> {
    match tier {
        PrivilegeTier::Admin => BTreeSet::from([RawPrivilege::Membership, RawPrivilege::Write]),
        PrivilegeTier::Editor => BTreeSet::from([RawPrivilege::Write]),
        PrivilegeTier::Viewer => BTreeSet::new(),
    }
}

/// `None` when the member has no records at all, which is not the same as
/// being a viewer. Only for display.
pub fn highest_tier(member: &Member) -> Option<PrivilegeTier> {
    if member.records.is_empty() {
        return None;
    }
    Some(tier_of(&member.grants()))
}

/// Display label, the empty string standing for "no explicit grant".
pub fn tier_label(tier: Option<PrivilegeTier>) -> String {
    tier.map(|t| t.to_string()).unwrap_or_default()
}

impl fmt::Display for PrivilegeTier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PrivilegeTier::Viewer => write!(f, "VIEWER"),
            PrivilegeTier::Editor => write!(f, "EDITOR"),
            PrivilegeTier::Admin => write!(f, "ADMIN"),
        }
    }
}

impl FromStr for PrivilegeTier {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "VIEWER" => Ok(PrivilegeTier::Viewer),
            "EDITOR" => Ok(PrivilegeTier::Editor),
            "ADMIN" => Ok(PrivilegeTier::Admin),
            _ => Err(()),
        }
    }
}

impl fmt::Display for RawPrivilege {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RawPrivilege::Read => write!(f, "READ"),
            RawPrivilege::Write => write!(f, "WRITE"),
            RawPrivilege::Membership => write!(f, "MEMBERSHIP"),
        }
    }
}
