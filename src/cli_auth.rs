//! User administration tool.
//!
//! Manages accounts, passwords and roles in the user database used by the
//! songbook server.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use songbook_server::cli_style::get_styles;
use songbook_server::config::DEFAULT_TOKEN_EXPIRY_HOURS;
use songbook_server::user::{SqliteUserStore, UserManager, UserRole};
use std::path::PathBuf;
use std::time::Duration;

fn parse_path(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s);
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
#[command(name = "cli-auth", styles = get_styles())]
#[command(about = "Manage songbook server users")]
struct CliArgs {
    /// Path to the SQLite user database file.
    #[clap(value_parser = parse_path)]
    pub path: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Creates a user with the given handle.
    AddUser {
        user_handle: String,
        /// Sets a password right away.
        #[clap(long)]
        password: Option<String>,
        /// Grants a role right away (admin, editor, regular).
        #[clap(long)]
        role: Option<String>,
    },

    /// Creates or replaces the password of a user.
    SetPassword {
        user_handle: String,
        password: String,
    },

    /// Adds a role to a user.
    AddRole { user_handle: String, role: String },

    /// Removes a role from a user.
    RemoveRole { user_handle: String, role: String },

    /// Shows roles and resolved permissions of a user.
    Show { user_handle: String },

    /// Shows all user handles.
    ListUsers,

    /// Shows all available roles and their permissions.
    ListRoles,
}

fn parse_role(role: &str) -> Result<UserRole> {
    match UserRole::from_str(role) {
        Some(role) => Ok(role),
        None => bail!(
            "Invalid role '{}'. Valid roles are: Admin, Editor, Regular",
            role
        ),
    }
}

fn require_user(user_manager: &UserManager, user_handle: &str) -> Result<i64> {
    user_manager
        .get_user_id(user_handle)?
        .with_context(|| format!("User '{}' not found", user_handle))
}

fn execute_command(command: Command, user_manager: &UserManager) -> Result<()> {
    match command {
        Command::AddUser {
            user_handle,
            password,
            role,
        } => {
            let role = role.as_deref().map(parse_role).transpose()?;
            let user_id = user_manager.add_user(&user_handle)?;
            println!("Created user '{}' with id {}", user_handle, user_id);
            if let Some(password) = password {
                user_manager.set_password(&user_handle, &password)?;
                println!("Password set");
            }
            if let Some(role) = role {
                user_manager.add_user_role(user_id, role)?;
                println!("Role '{}' added", role.as_str());
            }
        }
        Command::SetPassword {
            user_handle,
            password,
        } => {
            user_manager.set_password(&user_handle, &password)?;
            println!("Password of '{}' updated", user_handle);
        }
        Command::AddRole { user_handle, role } => {
            let role = parse_role(&role)?;
            let user_id = require_user(user_manager, &user_handle)?;
            user_manager.add_user_role(user_id, role)?;
            println!("Role '{}' added to user '{}'", role.as_str(), user_handle);
        }
        Command::RemoveRole { user_handle, role } => {
            let role = parse_role(&role)?;
            let user_id = require_user(user_manager, &user_handle)?;
            user_manager.remove_user_role(user_id, role)?;
            println!("Role '{}' removed from user '{}'", role.as_str(), user_handle);
        }
        Command::Show { user_handle } => {
            let user_id = require_user(user_manager, &user_handle)?;
            println!("User '{}' (id {})", user_handle, user_id);

            let roles = user_manager.get_user_roles(user_id)?;
            println!("\nRoles:");
            if roles.is_empty() {
                println!("  (no roles assigned)");
            }
            for role in roles {
                println!("  - {}", role.as_str());
            }

            let permissions = user_manager.get_user_permissions(user_id)?;
            println!("\nResolved Permissions:");
            if permissions.is_empty() {
                println!("  (no permissions)");
            }
            for permission in permissions {
                println!("  - {:?}", permission);
            }
        }
        Command::ListUsers => {
            for handle in user_manager.get_all_user_handles()? {
                println!("{}", handle);
            }
        }
        Command::ListRoles => {
            println!("Available Roles:\n");
            for role in [UserRole::Admin, UserRole::Editor, UserRole::Regular] {
                println!("Role: {}", role.as_str());
                println!("Permissions:");
                for permission in role.permissions() {
                    println!("  - {:?}", permission);
                }
                println!();
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();
    let user_store = SqliteUserStore::new(&cli_args.path)
        .with_context(|| format!("Could not open user database {:?}", cli_args.path))?;
    let user_manager = UserManager::new(
        Box::new(user_store),
        Duration::from_secs(DEFAULT_TOKEN_EXPIRY_HOURS * 3600),
    );
    execute_command(cli_args.command, &user_manager)
}
