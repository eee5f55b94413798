//! User management commands.

use super::Context;
use crate::output::{self, OutputFormat};
use anyhow::Result;
use gallery_store::{NewUser, Role, SqliteUsers, PROVIDER_PASSWORD};
use tracing::info;

/// Arguments of `users add`.
pub struct AddUser {
    pub name: String,
    pub email: String,
    pub provider: String,
    pub provider_id: String,
    pub password_hash: Option<String>,
    pub role: Role,
}

fn open(ctx: &Context) -> Result<SqliteUsers> {
    Ok(SqliteUsers::with_pool(ctx.pool()?))
}

/// List all users.
pub fn list(ctx: &Context) -> Result<()> {
    let users = open(ctx)?.list()?;
    match ctx.format {
        OutputFormat::Json => output::print_json(&users),
        OutputFormat::Text => {
            for user in &users {
                println!("{}", output::user_line(user));
            }
        }
    }
    Ok(())
}

/// Add an active user. Names must be unique.
pub fn add(ctx: &Context, args: AddUser) -> Result<()> {
    ctx.ensure_writable("add users")?;
    let users = open(ctx)?;

    match users.by_name(&args.name) {
        Ok(_) => anyhow::bail!("user '{}' already exists", args.name),
        Err(e) if e.is_not_found() => {}
        Err(e) => return Err(e.into()),
    }
    if args.provider == PROVIDER_PASSWORD && args.password_hash.is_none() {
        anyhow::bail!("--password-hash is required for the password provider");
    }

    let id = users.add(&NewUser {
        name: args.name.clone(),
        password: args.password_hash.unwrap_or_default().into_bytes(),
        email: args.email,
        role: args.role,
        active: true,
        created_at: None,
        provider: args.provider,
        provider_id: args.provider_id,
    })?;
    info!(user_id = id, role = args.role.as_str(), "User created");

    output::print_success(&format!("created user '{}' with id {id}", args.name), &ctx.format);
    Ok(())
}

/// Change a user's role.
pub fn set_role(ctx: &Context, id: i64, role: Role) -> Result<()> {
    ctx.ensure_writable("change roles")?;
    let user = open(ctx)?.update_with(id, |mut user| {
        user.role = role;
        user
    })?;
    info!(user_id = id, role = role.as_str(), "Role changed");

    output::print_success(
        &format!("user '{}' is now {}", user.name, role.as_str()),
        &ctx.format,
    );
    Ok(())
}

/// Replace a user's password hash.
pub fn passwd(ctx: &Context, name: &str, password_hash: &str) -> Result<()> {
    ctx.ensure_writable("change passwords")?;
    if password_hash.is_empty() {
        anyhow::bail!("password hash is empty");
    }
    let users = open(ctx)?;
    let user = users.by_name(name)?;
    let hash = password_hash.as_bytes().to_vec();
    users.update_with(user.id, move |mut user| {
        user.password = hash;
        user
    })?;
    info!(user_id = user.id, "Password changed");

    output::print_success(&format!("updated password for '{name}'"), &ctx.format);
    Ok(())
}
