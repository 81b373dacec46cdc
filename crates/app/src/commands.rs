//! Subcommand dispatch and plain-text rendering

use offchat_core::{Console, Result, Session, User, UserStats};

use crate::cli::Command;

/// Run one command against the console, returning what to print
pub fn run(console: &Console, command: Command) -> Result<String> {
    let output = match command {
        Command::Users { search } => {
            let users = match search {
                Some(query) => console.search_users(&query),
                None => console.list_users(),
            };
            render_users(&users)
        }
        Command::Stats => render_stats(&console.user_stats()),
        Command::Whoami => render_session(console.current_session()?.as_ref()),
        Command::Signup { username, password } => {
            let user = console.signup(&username, &password)?;
            format!("Account '{}' created! Waiting for admin approval.", user.username)
        }
        Command::Login { username, password } => {
            let session = console.login(&username, &password)?;
            format!("Logged in as {}.", session.username)
        }
        Command::Logout => match console.logout()? {
            Some(session) => format!("Logged out {}.", session.username),
            None => "No active session.".to_string(),
        },
        Command::Presence { presence } => match console.set_presence(presence)? {
            Some(session) => format!("{} is now {}.", session.username, session.presence),
            None => "No active session.".to_string(),
        },
        Command::Avatar { url } => match console.set_avatar(url)? {
            Some(session) => format!(
                "Avatar for {} {}.",
                session.username,
                session.avatar.as_deref().map_or("cleared".to_string(), |a| format!("set to {a}"))
            ),
            None => "No active session.".to_string(),
        },
        Command::Approve { id } => status_line(&console.approve(&id)?),
        Command::Reject { id } => status_line(&console.reject(&id)?),
        Command::Suspend { id } => status_line(&console.suspend(&id)?),
        Command::Reinstate { id } => status_line(&console.reinstate(&id)?),
        Command::Ban { id } => status_line(&console.ban(&id)?),
        Command::Delete { id } => {
            let deletion = console.delete(&id)?;
            let mut line = format!("User '{}' has been deleted.", deletion.user.username);
            if deletion.session_cleared {
                line.push_str(" Their session was ended.");
            }
            line
        }
        Command::AddUser {
            username,
            password,
            role,
        } => {
            let user = console.add_user(&username, &password, role)?;
            format!("User '{}' added and approved as {}.", user.username, user.role)
        }
        Command::ForceLogout { id } => {
            let outcome = console.force_logout(&id)?;
            format!("User '{}' has been forcefully logged out.", outcome.username)
        }
    };

    Ok(output)
}

fn status_line(user: &User) -> String {
    format!("User '{}' is now {}.", user.username, user.status)
}

fn render_users(users: &[User]) -> String {
    if users.is_empty() {
        return "No users.".to_string();
    }

    let width = users.iter().map(|u| u.username.len()).max().unwrap_or(0).max(8);
    let mut out = format!(
        "{:<width$}  {:<9}  {:<5}  {:<10}  {:>8}  {:>7}\n",
        "USERNAME", "STATUS", "ROLE", "JOINED", "MESSAGES", "REPORTS"
    );
    for user in users {
        out.push_str(&format!(
            "{:<width$}  {:<9}  {:<5}  {:<10}  {:>8}  {:>7}\n",
            user.username,
            user.status.as_str(),
            user.role.as_str(),
            user.join_date.to_string(),
            user.message_count,
            user.report_count,
        ));
    }
    out.truncate(out.trim_end().len());
    out
}

fn render_stats(stats: &UserStats) -> String {
    format!(
        "Total users: {}\nActive: {}\nPending: {}\nSuspended: {}\nBanned: {}\nAdmins: {}",
        stats.total, stats.active, stats.pending, stats.suspended, stats.banned, stats.admins
    )
}

fn render_session(session: Option<&Session>) -> String {
    match session {
        Some(s) => format!(
            "{} ({}) since {}",
            s.username,
            s.presence,
            s.established_at.format("%Y-%m-%d %H:%M UTC")
        ),
        None => "Not logged in.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use offchat_core::{ErrorKind, MemoryStore, PlainCredentials, Presence, Role};

    use super::*;

    fn console() -> Console {
        Console::with_store(Arc::new(MemoryStore::new()), Arc::new(PlainCredentials)).unwrap()
    }

    fn add(username: &str, password: &str) -> Command {
        Command::AddUser {
            username: username.into(),
            password: password.into(),
            role: Role::User,
        }
    }

    #[test]
    fn test_add_login_whoami() {
        let console = console();
        let out = run(&console, add("bob", "pw2")).unwrap();
        assert_eq!(out, "User 'bob' added and approved as user.");

        assert_eq!(run(&console, Command::Whoami).unwrap(), "Not logged in.");

        let out = run(
            &console,
            Command::Login {
                username: "bob".into(),
                password: "pw2".into(),
            },
        )
        .unwrap();
        assert_eq!(out, "Logged in as bob.");
        assert!(run(&console, Command::Whoami).unwrap().starts_with("bob (online)"));

        let out = run(&console, Command::Presence { presence: Presence::Away }).unwrap();
        assert_eq!(out, "bob is now away.");
    }

    #[test]
    fn test_errors_propagate() {
        let console = console();
        let err = run(
            &console,
            Command::Login {
                username: "ghost".into(),
                password: "x".into(),
            },
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UserNotFound);

        run(&console, add("bob", "pw")).unwrap();
        let err = run(&console, Command::Approve { id: "bob".into() }).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTransition);
    }

    #[test]
    fn test_moderation_lines() {
        let console = console();
        run(
            &console,
            Command::Signup {
                username: "alice".into(),
                password: "pw1".into(),
            },
        )
        .unwrap();

        let out = run(&console, Command::Approve { id: "alice".into() }).unwrap();
        assert_eq!(out, "User 'alice' is now active.");

        let out = run(&console, Command::ForceLogout { id: "alice".into() }).unwrap();
        assert_eq!(out, "User 'alice' has been forcefully logged out.");

        let out = run(&console, Command::Delete { id: "alice".into() }).unwrap();
        assert_eq!(out, "User 'alice' has been deleted.");
    }

    #[test]
    fn test_users_table_and_stats() {
        let console = console();
        assert_eq!(run(&console, Command::Users { search: None }).unwrap(), "No users.");

        run(&console, add("john_doe", "pw")).unwrap();
        run(&console, add("zoe", "pw")).unwrap();

        let table = run(&console, Command::Users { search: None }).unwrap();
        let lines: Vec<_> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("USERNAME"));
        assert!(lines[1].starts_with("john_doe"));

        let filtered = run(
            &console,
            Command::Users {
                search: Some("ZO".into()),
            },
        )
        .unwrap();
        assert_eq!(filtered.lines().count(), 2);

        let stats = run(&console, Command::Stats).unwrap();
        assert!(stats.starts_with("Total users: 2\nActive: 2"));
    }
}
