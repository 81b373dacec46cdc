//! User model and account lifecycle

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Lifecycle stage of an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    /// Signed up, waiting for an admin
    Pending,
    /// May log in
    Active,
    /// Temporarily locked out, reversible
    Suspended,
    /// Locked out; also where rejected signups land
    Banned,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Pending => "pending",
            UserStatus::Active => "active",
            UserStatus::Suspended => "suspended",
            UserStatus::Banned => "banned",
        }
    }

    /// Status reached by applying `action`, or `None` if the transition is illegal.
    ///
    /// | from              | action    | to        |
    /// |-------------------|-----------|-----------|
    /// | pending           | approve   | active    |
    /// | pending           | reject    | banned    |
    /// | active            | suspend   | suspended |
    /// | suspended         | reinstate | active    |
    /// | active, suspended | ban       | banned    |
    pub fn apply(self, action: ModerationAction) -> Option<UserStatus> {
        use ModerationAction::*;
        use UserStatus::*;

        match (self, action) {
            (Pending, Approve) => Some(Active),
            (Pending, Reject) => Some(Banned),
            (Active, Suspend) => Some(Suspended),
            (Suspended, Reinstate) => Some(Active),
            (Active | Suspended, Ban) => Some(Banned),
            _ => None,
        }
    }

    pub fn all() -> &'static [UserStatus] {
        &[
            UserStatus::Pending,
            UserStatus::Active,
            UserStatus::Suspended,
            UserStatus::Banned,
        ]
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authorization tier, orthogonal to status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// Admin-issued status changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModerationAction {
    Approve,
    Reject,
    Suspend,
    Reinstate,
    Ban,
}

impl ModerationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModerationAction::Approve => "approve",
            ModerationAction::Reject => "reject",
            ModerationAction::Suspend => "suspend",
            ModerationAction::Reinstate => "reinstate",
            ModerationAction::Ban => "ban",
        }
    }
}

impl fmt::Display for ModerationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Equal to the username
    pub id: String,
    pub username: String,
    /// Stored credential, as produced by the configured verifier
    pub password_secret: String,
    pub email: String,
    pub status: UserStatus,
    pub role: Role,
    pub join_date: NaiveDate,
    /// Free-text values such as "2 minutes ago" read as never
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub last_active: Option<DateTime<Utc>>,
    #[serde(default)]
    pub message_count: u64,
    #[serde(default)]
    pub report_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(serde_json::Value::as_str)
        .and_then(|s| s.parse::<DateTime<Utc>>().ok()))
}

impl User {
    pub fn new(username: String, password_secret: String, status: UserStatus, role: Role) -> Self {
        Self {
            id: username.clone(),
            email: format!("{username}@example.com"),
            username,
            password_secret,
            status,
            role,
            join_date: Utc::now().date_naive(),
            last_active: None,
            message_count: 0,
            report_count: 0,
            avatar: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Merge a patch; identity fields are never touched
    pub fn apply_patch(&mut self, patch: UserPatch) {
        if let Some(email) = patch.email {
            self.email = email;
        }
        if let Some(avatar) = patch.avatar {
            self.avatar = avatar;
        }
        if let Some(last_active) = patch.last_active {
            self.last_active = Some(last_active);
        }
        if let Some(count) = patch.message_count {
            self.message_count = count;
        }
        if let Some(count) = patch.report_count {
            self.report_count = count;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(role) = patch.role {
            self.role = role;
        }
    }
}

/// Partial update for a user record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserPatch {
    pub email: Option<String>,
    /// `Some(None)` clears the avatar
    pub avatar: Option<Option<String>>,
    pub last_active: Option<DateTime<Utc>>,
    pub message_count: Option<u64>,
    pub report_count: Option<u64>,
    pub status: Option<UserStatus>,
    pub role: Option<Role>,
}

impl UserPatch {
    pub fn status(status: UserStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn avatar(avatar: Option<String>) -> Self {
        Self {
            avatar: Some(avatar),
            ..Self::default()
        }
    }
}

/// Account counts for dashboard cards
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UserStats {
    pub total: usize,
    pub pending: usize,
    pub active: usize,
    pub suspended: usize,
    pub banned: usize,
    pub admins: usize,
}

impl UserStats {
    pub fn from_users<'a>(users: impl IntoIterator<Item = &'a User>) -> Self {
        let mut stats = Self::default();
        for user in users {
            stats.total += 1;
            match user.status {
                UserStatus::Pending => stats.pending += 1,
                UserStatus::Active => stats.active += 1,
                UserStatus::Suspended => stats.suspended += 1,
                UserStatus::Banned => stats.banned += 1,
            }
            if user.is_admin() {
                stats.admins += 1;
            }
        }
        stats
    }
}
