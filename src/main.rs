//! Laurel - Progress Synchronization and Reward Engine
//!
//! CLI entry point.

use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use laurel::catalog::{DefinitionCache, FileCatalogSource};
use laurel::cli::{
    active_user, DefsCommand, InitCommand, LoginCommand, QuizCommand, ReadCommand, StatusCommand,
    SyncCommand,
};
use laurel::config::{catalogs_dir, Config};
use laurel::store::{FileProgressStore, ProgressStore};

/// Laurel - Progress Synchronization and Reward Engine
#[derive(Parser)]
#[command(name = "laurel")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the Laurel home and seed starter catalogs
    Init,

    /// Sign in as a user (persisted for later invocations)
    Login {
        /// The user id to sign in as
        user_id: String,
    },

    /// Sign out
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Mark a resource as read
    Read {
        /// The resource id
        resource_id: String,
        /// XP granted for a first-time read
        #[arg(long, default_value_t = 10)]
        xp: u32,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
    },

    /// Mark a quiz as complete
    Quiz {
        /// The quiz id
        quiz_id: String,
        /// XP granted for a first-time completion
        #[arg(long, default_value_t = 20)]
        xp: u32,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
    },

    /// Show the signed-in user's progress
    Status {
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
    },

    /// Run one award pass over the current record
    Sync {
        /// Grant every passed-but-unclaimed milestone, not only the highest
        #[arg(long)]
        catch_up: bool,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
    },

    /// List the loaded task and badge definitions
    Defs {
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_env("LAUREL_LOG").unwrap_or_else(|_| {
            EnvFilter::new("warn")
        }))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load();

    match cli.command {
        Commands::Init => {
            let cmd = match InitCommand::new() {
                Ok(cmd) => cmd,
                Err(err) => return fail(&err.to_string()),
            };
            let output = cmd.run();
            if output.success {
                println!("Initialized Laurel home at {}", output.home);
                if output.seeded_catalogs {
                    println!("Seeded starter catalogs");
                }
                ExitCode::SUCCESS
            } else {
                fail(output.error.as_deref().unwrap_or("init failed"))
            }
        }

        Commands::Login { user_id } => {
            let cmd = match LoginCommand::new() {
                Ok(cmd) => cmd,
                Err(err) => return fail(&err.to_string()),
            };
            let output = cmd.login(&user_id);
            if output.success {
                println!("Signed in as {}", output.user_id.unwrap_or_default());
                ExitCode::SUCCESS
            } else {
                fail(output.error.as_deref().unwrap_or("login failed"))
            }
        }

        Commands::Logout => {
            let cmd = match LoginCommand::new() {
                Ok(cmd) => cmd,
                Err(err) => return fail(&err.to_string()),
            };
            let output = cmd.logout();
            if output.success {
                println!("Signed out");
                ExitCode::SUCCESS
            } else {
                fail(output.error.as_deref().unwrap_or("logout failed"))
            }
        }

        Commands::Whoami => {
            let cmd = match LoginCommand::new() {
                Ok(cmd) => cmd,
                Err(err) => return fail(&err.to_string()),
            };
            match cmd.whoami().user_id {
                Some(user) => {
                    println!("{}", user);
                    ExitCode::SUCCESS
                }
                None => fail("not signed in (run `laurel login <user-id>`)"),
            }
        }

        Commands::Read {
            resource_id,
            xp,
            json,
        } => {
            let Some(user) = active_user() else {
                return fail("not signed in (run `laurel login <user-id>`)");
            };
            let (store, defs) = match open_store_and_defs() {
                Ok(pair) => pair,
                Err(code) => return code,
            };
            let output = ReadCommand::new(store, defs, config.engine).run(&user, &resource_id, xp);
            if json {
                print_json(&output);
            } else {
                println!("Marked {} as read (+{} XP)", output.resource_id, output.xp_reward);
                for reward in &output.rewards {
                    println!("{}", reward.message);
                }
            }
            ExitCode::SUCCESS
        }

        Commands::Quiz { quiz_id, xp, json } => {
            let Some(user) = active_user() else {
                return fail("not signed in (run `laurel login <user-id>`)");
            };
            let (store, defs) = match open_store_and_defs() {
                Ok(pair) => pair,
                Err(code) => return code,
            };
            let output = QuizCommand::new(store, defs, config.engine).run(&user, &quiz_id, xp);
            if json {
                print_json(&output);
            } else if output.awarded {
                println!("Quiz {} complete (+{} XP)", output.quiz_id, output.xp_reward);
                for reward in &output.rewards {
                    println!("{}", reward.message);
                }
            } else {
                println!("Quiz {} not awarded ({:?})", output.quiz_id, output.reason);
            }
            ExitCode::SUCCESS
        }

        Commands::Status { json } => {
            let Some(user) = active_user() else {
                return fail("not signed in (run `laurel login <user-id>`)");
            };
            let store = match open_store() {
                Ok(store) => store,
                Err(code) => return code,
            };
            let output = StatusCommand::new(store, config.engine).run(&user);
            if json {
                print_json(&output);
            } else if output.success {
                println!("{} - level {} ({} XP)", output.user_id, output.level, output.xp);
                println!(
                    "streak: {} day(s), resources: {}, quizzes: {}",
                    output.streak, output.resources_read, output.quizzes_completed
                );
                if !output.tasks_completed.is_empty() {
                    println!("tasks: {}", output.tasks_completed.join(", "));
                }
                if !output.badges.is_empty() {
                    println!("badges: {}", output.badges.join(", "));
                }
            } else {
                return fail(output.error.as_deref().unwrap_or("status failed"));
            }
            ExitCode::SUCCESS
        }

        Commands::Sync { catch_up, json } => {
            let Some(user) = active_user() else {
                return fail("not signed in (run `laurel login <user-id>`)");
            };
            let (store, defs) = match open_store_and_defs() {
                Ok(pair) => pair,
                Err(code) => return code,
            };
            let catch_up = catch_up || config.engine.allow_catchup;
            let output = SyncCommand::new(store, defs).run(&user, catch_up);
            if json {
                print_json(&output);
            } else if output.success {
                if output.rewards.is_empty() {
                    println!("Nothing to award");
                } else {
                    for reward in &output.rewards {
                        println!("{}", reward.message);
                    }
                    println!("+{} XP total", output.xp_applied);
                }
            } else {
                return fail(output.error.as_deref().unwrap_or("sync failed"));
            }
            ExitCode::SUCCESS
        }

        Commands::Defs { json } => {
            let defs = match load_defs() {
                Ok(defs) => defs,
                Err(code) => return code,
            };
            let output = DefsCommand::new(defs).run();
            if json {
                print_json(&output);
            } else {
                if !output.ready {
                    println!("No definitions loaded (run `laurel init`)");
                }
                for task in &output.tasks {
                    println!(
                        "task  {} ({:?} >= {}) +{} XP",
                        task.id, task.kind, task.required, task.xp_reward
                    );
                }
                for badge in &output.badges {
                    println!(
                        "badge {} ({:?} >= {}) +{} XP",
                        badge.id, badge.condition.kind, badge.condition.value, badge.xp_reward
                    );
                }
            }
            ExitCode::SUCCESS
        }
    }
}

fn open_store() -> Result<Arc<dyn ProgressStore>, ExitCode> {
    match FileProgressStore::new() {
        Ok(store) => Ok(Arc::new(store)),
        Err(err) => {
            eprintln!("Error: {}", err);
            Err(ExitCode::FAILURE)
        }
    }
}

fn load_defs() -> Result<Arc<DefinitionCache>, ExitCode> {
    let Some(dir) = catalogs_dir() else {
        eprintln!("Error: could not determine catalogs directory");
        return Err(ExitCode::FAILURE);
    };
    let source = FileCatalogSource::new(dir);
    Ok(Arc::new(DefinitionCache::load(&source)))
}

fn open_store_and_defs() -> Result<(Arc<dyn ProgressStore>, Arc<DefinitionCache>), ExitCode> {
    Ok((open_store()?, load_defs()?))
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(err) => eprintln!("Error: failed to serialize output: {}", err),
    }
}

fn fail(message: &str) -> ExitCode {
    eprintln!("Error: {}", message);
    ExitCode::FAILURE
}
