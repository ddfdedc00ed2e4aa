use anyhow::Context;
use clap::{Parser, Subcommand};

use pawclub_app::modules::profiles::repository::ProfileRepository;
use pawclub_authz::Role;
use pawclub_kernel::settings::Settings;

#[derive(Parser, Debug)]
#[command(name = "pawclub", version, about = "Book-club service control")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server until interrupted.
    Serve,
    /// Apply module seeds to the configured store and exit.
    Seed,
    /// Grant a role entry to a user.
    GrantRole {
        user_id: String,
        /// One of: admin, moderator, user.
        role: String,
    },
    /// Remove every role entry a user holds.
    RevokeRoles { user_id: String },
    /// List users holding the admin role.
    ListAdmins,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load().with_context(|| "failed to load Pawclub settings")?;
    pawclub_telemetry::init(&settings.telemetry)
        .with_context(|| "failed to initialize telemetry")?;

    match cli.command {
        Command::Serve => pawclub_app::run(settings).await,
        Command::Seed => {
            let store = pawclub_store::connect(&settings.store.endpoint)?;
            let registry = pawclub_app::modules::register_all(&store, &settings);
            pawclub_app::apply_seeds(&registry, store.as_ref()).await?;
            println!("seeds applied");
            Ok(())
        }
        Command::GrantRole { user_id, role } => {
            let role: Role = role
                .parse()
                .with_context(|| "expected one of: admin, moderator, user")?;
            let entry = profile_repo(&settings)?
                .assign_role(&user_id, role)
                .await
                .with_context(|| format!("failed to grant {role} to {user_id}"))?;
            println!("granted {role} to {user_id} (entry {entry})");
            Ok(())
        }
        Command::RevokeRoles { user_id } => {
            profile_repo(&settings)?
                .remove_all_roles(&user_id)
                .await
                .with_context(|| format!("failed to revoke roles of {user_id}"))?;
            println!("removed all roles from {user_id}");
            Ok(())
        }
        Command::ListAdmins => {
            let admins = profile_repo(&settings)?
                .list_admins()
                .await
                .context("failed to list admins")?;
            if admins.is_empty() {
                println!("no admins");
            }
            for admin in admins {
                let roles: Vec<String> =
                    admin.roles.values().map(|role| role.to_string()).collect();
                println!("{}\t{}", admin.user_id, roles.join(","));
            }
            Ok(())
        }
    }
}

fn profile_repo(settings: &Settings) -> anyhow::Result<ProfileRepository> {
    let store = pawclub_store::connect(&settings.store.endpoint)?;
    Ok(ProfileRepository::new(store))
}
