//! Demo accounts for a fresh store

use chrono::{NaiveDate, Utc};

use crate::credentials::CredentialVerifier;
use crate::error::Result;
use crate::models::{Role, User, UserStatus};

struct DemoAccount {
    username: &'static str,
    email: &'static str,
    password: &'static str,
    status: UserStatus,
    role: Role,
    joined: (i32, u32, u32),
    message_count: u64,
    report_count: u64,
}

const DEMO_ACCOUNTS: &[DemoAccount] = &[
    DemoAccount {
        username: "admin",
        email: "admin@offchat.com",
        password: "12341234",
        status: UserStatus::Active,
        role: Role::Admin,
        joined: (2024, 1, 1),
        message_count: 1250,
        report_count: 0,
    },
    DemoAccount {
        username: "john_doe",
        email: "john@example.com",
        password: "password",
        status: UserStatus::Active,
        role: Role::User,
        joined: (2024, 1, 15),
        message_count: 89,
        report_count: 1,
    },
    DemoAccount {
        username: "jane_smith",
        email: "jane@example.com",
        password: "password",
        status: UserStatus::Suspended,
        role: Role::User,
        joined: (2024, 1, 10),
        message_count: 156,
        report_count: 3,
    },
];

/// Build the demo accounts, sealing their passwords with `verifier`
pub fn demo_accounts(verifier: &dyn CredentialVerifier) -> Result<Vec<User>> {
    DEMO_ACCOUNTS
        .iter()
        .map(|account| {
            let (y, m, d) = account.joined;
            let mut user = User::new(
                account.username.to_string(),
                verifier.seal(account.password)?,
                account.status,
                account.role,
            );
            user.email = account.email.to_string();
            user.join_date =
                NaiveDate::from_ymd_opt(y, m, d).unwrap_or_else(|| Utc::now().date_naive());
            user.message_count = account.message_count;
            user.report_count = account.report_count;
            Ok(user)
        })
        .collect()
}
