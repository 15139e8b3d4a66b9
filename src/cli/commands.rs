use clap::{Parser, Subcommand};
use rusqlite::Connection;
use crate::config::Config;
use crate::db::DbConnection;
use crate::repo::{BuildRepo, TaskRepo};
use crate::status::{get_public_build_status, DbStatusSource};
use crate::models::TaskStatus;
use crate::cli::parser::{parse_task_spec, parse_task_specs};
use crate::cli::output::{format_anticipated_status, format_build_detail, format_build_list, get_terminal_width, is_tty};
use crate::cli::error::{user_error, validate_build_id, validate_depth, validate_task_name};
use anyhow::{Context, Result};

#[derive(Parser)]
#[command(name = "trendline")]
#[command(about = "Build trend ledger - anticipates CI build health from recent build history")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Record a new build
    Record {
        /// Commit the build was made from
        commit: String,
        /// Branch the commit belongs to
        #[arg(long, default_value = "main")]
        branch: String,
        /// Tasks as stage:name[=status][+flaky] (status defaults to new)
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        tasks: Vec<String>,
    },
    /// Set the status of a task in a build
    Task {
        /// Task as stage:name=status[+flaky]
        spec: String,
        /// Build ID (defaults to the most recent build)
        #[arg(long)]
        build: Option<String>,
    },
    /// Mark a task name as flaky in every build
    Flaky {
        /// Task name
        name: String,
        /// Clear the flaky flag instead
        #[arg(long)]
        off: bool,
    },
    /// List recent builds, newest first
    Builds {
        /// Maximum number of builds to show
        #[arg(long)]
        limit: Option<String>,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Show stages and tasks of a build
    Show {
        /// Build ID
        build_id: String,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Show the anticipated status of the current build
    Status {
        /// Number of recent builds to consult (defaults to history.depth)
        #[arg(long)]
        depth: Option<String>,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

pub fn run() -> Result<()> {
    // Help, version and usage errors exit inside clap
    let cli = Cli::parse();
    handle_command(cli)
}

fn handle_command(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Record { commit, branch, tasks } => handle_record(commit, branch, tasks),
        Commands::Task { spec, build } => handle_task(spec, build),
        Commands::Flaky { name, off } => handle_flaky(name, !off),
        Commands::Builds { limit, json } => handle_builds(limit, json),
        Commands::Show { build_id, json } => handle_show(build_id, json),
        Commands::Status { depth, json } => handle_status(depth, json),
    }
}

fn connect() -> Result<Connection> {
    DbConnection::connect().context("Failed to connect to database")
}

fn handle_record(commit: String, branch: String, tasks: Vec<String>) -> Result<()> {
    let commit = commit.trim().to_string();
    if commit.is_empty() {
        user_error("Commit cannot be empty");
    }
    if branch.trim().is_empty() {
        user_error("Branch cannot be empty");
    }

    let specs = parse_task_specs(&tasks).unwrap_or_else(|e| user_error(&e.to_string()));

    let mut seen = std::collections::HashSet::new();
    for spec in &specs {
        if !seen.insert(spec.name.as_str()) {
            user_error(&format!("Task '{}' is listed more than once", spec.name));
        }
    }

    let conn = connect()?;
    let tx = conn.unchecked_transaction()?;

    let build = BuildRepo::create(&tx, &commit, branch.trim())?;
    let build_id = build.id.context("Recorded build has no id")?;
    for spec in &specs {
        TaskRepo::upsert(
            &tx,
            build_id,
            &spec.stage,
            &spec.name,
            spec.status.unwrap_or(TaskStatus::New),
            Some(spec.flaky),
        )?;
    }

    tx.commit().context("Failed to record build")?;

    println!("Recorded build {} ({})", build_id, commit);
    Ok(())
}

fn handle_task(spec: String, build: Option<String>) -> Result<()> {
    let spec = parse_task_spec(&spec).unwrap_or_else(|e| user_error(&e.to_string()));
    let Some(status) = spec.status else {
        user_error(&format!("Missing status for task '{}'. Expected stage:name=status", spec.name));
    };

    let conn = connect()?;
    let build_id = match build {
        Some(id_str) => {
            let id = validate_build_id(&id_str).unwrap_or_else(|e| user_error(&e));
            if BuildRepo::get_by_id(&conn, id)?.is_none() {
                user_error(&format!("Build {} not found", id));
            }
            id
        }
        None => BuildRepo::latest_id(&conn)?
            .unwrap_or_else(|| user_error("No builds recorded. Use 'trendline record' first.")),
    };

    let flaky = if spec.flaky { Some(true) } else { None };
    let task = match TaskRepo::upsert(&conn, build_id, &spec.stage, &spec.name, status, flaky) {
        Ok(task) => task,
        Err(e) if e.to_string().contains("already belongs to stage") => user_error(&e.to_string()),
        Err(e) => return Err(e),
    };

    println!(
        "Build {}: {}:{} is {}{}",
        build_id,
        task.stage_name,
        task.name,
        task.status.as_str(),
        if task.flaky { " (flaky)" } else { "" }
    );
    Ok(())
}

fn handle_flaky(name: String, flaky: bool) -> Result<()> {
    if let Err(e) = validate_task_name(&name) {
        user_error(&e);
    }

    let conn = connect()?;
    let changed = TaskRepo::set_flaky(&conn, &name, flaky)?;
    if changed == 0 {
        user_error(&format!("Task '{}' not found in any build", name));
    }

    println!(
        "Marked task '{}' as {} in {} build{}",
        name,
        if flaky { "flaky" } else { "not flaky" },
        changed,
        if changed == 1 { "" } else { "s" }
    );
    Ok(())
}

fn handle_builds(limit: Option<String>, json: bool) -> Result<()> {
    let limit = match limit {
        Some(value) => validate_depth(&value).unwrap_or_else(|e| user_error(&e)),
        None => Config::load()?.history_depth,
    };

    let conn = connect()?;
    let builds = BuildRepo::list_recent(&conn, limit).context("Failed to list builds")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&builds)?);
    } else {
        println!("{}", format_build_list(&builds, get_terminal_width(), is_tty()));
    }
    Ok(())
}

fn handle_show(build_id: String, json: bool) -> Result<()> {
    let id = validate_build_id(&build_id).unwrap_or_else(|e| user_error(&e));

    let conn = connect()?;
    let build = BuildRepo::get_by_id(&conn, id)?
        .unwrap_or_else(|| user_error(&format!("Build {} not found", id)));

    if json {
        println!("{}", serde_json::to_string_pretty(&build)?);
    } else {
        println!("{}", format_build_detail(&build, is_tty()));
    }
    Ok(())
}

fn handle_status(depth: Option<String>, json: bool) -> Result<()> {
    let config = Config::load()?;
    let depth = match depth {
        Some(value) => validate_depth(&value).unwrap_or_else(|e| user_error(&e)),
        None => config.history_depth,
    };

    let conn = DbConnection::connect_at(&config.data_location)
        .context("Failed to connect to database")?;
    let source = DbStatusSource::new(&conn, depth);
    let status = get_public_build_status(&source)?;

    if json {
        println!("{}", serde_json::to_string(&status)?);
    } else {
        println!("{}", format_anticipated_status(status.anticipated_build_status, is_tty()));
    }
    Ok(())
}
