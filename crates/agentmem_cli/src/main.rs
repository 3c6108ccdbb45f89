//! `agentmem` command-line front end.
//!
//! # Responsibility
//! - Resolve configuration, start logging and open the filesystem store.
//! - Map subcommands onto `TaskService` calls and print line-oriented text.
//!
//! # Invariants
//! - Any failure prints `error: ...` to stderr and exits with status 1.
//! - Stdout only carries command results.

use std::error::Error;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use agentmem_core::{
    init_logging_from_config, Artifact, ArtifactType, Config, CreateProjectRequest,
    CreateTaskRequest, FsTaskRepository, ListOptions, ListResult, Metadata, Project,
    SaveArtifactRequest, SearchArtifactsRequest, Task, TaskService, TaskStatus,
    UpdateTaskRequest,
};
use clap::{Args, Parser, Subcommand};
use log::{info, warn};

type CliResult = Result<(), Box<dyn Error>>;
type Service = TaskService<FsTaskRepository>;

#[derive(Parser)]
#[command(name = "agentmem", version, about = "Project, task and artifact memory on disk")]
struct Cli {
    /// YAML config file; defaults to the first of ./agentmem.yaml,
    /// ~/.agentmem/config.yaml, /etc/agentmem/config.yaml
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Store base directory, overriding `tasks_path` from config
    #[arg(long, global = true)]
    tasks_path: Option<String>,
    /// Log level, overriding `log_level` from config
    #[arg(long, global = true)]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage projects
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },
    /// Manage tasks inside a project
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },
    /// Manage artifacts recorded against a task
    Artifact {
        #[command(subcommand)]
        command: ArtifactCommands,
    },
    /// Case-insensitive substring search over artifact content
    Search {
        query: String,
        #[arg(long)]
        project: Option<String>,
        /// Only honored together with --project
        #[arg(long)]
        task: Option<String>,
        #[command(flatten)]
        page: PageArgs,
    },
}

#[derive(Subcommand)]
enum ProjectCommands {
    Create {
        id: String,
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "")]
        workspace: String,
        /// Repeatable `key=value` metadata entry
        #[arg(long = "meta", value_parser = parse_key_value)]
        metadata: Vec<(String, String)>,
    },
    Get {
        id: String,
    },
    List {
        #[command(flatten)]
        page: PageArgs,
    },
    /// Delete a project with every task and artifact in it
    Delete {
        id: String,
    },
}

#[derive(Subcommand)]
enum TaskCommands {
    Create {
        project: String,
        id: String,
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "")]
        workspace: String,
        #[arg(long = "meta", value_parser = parse_key_value)]
        metadata: Vec<(String, String)>,
    },
    Get {
        project: String,
        id: String,
    },
    /// List tasks of one project, or of every project when omitted
    List {
        project: Option<String>,
        #[arg(long, value_parser = parse_status)]
        status: Option<TaskStatus>,
        #[command(flatten)]
        page: PageArgs,
    },
    /// Move a task to open|in_progress|completed|archived
    Status {
        project: String,
        id: String,
        #[arg(value_parser = parse_status)]
        status: TaskStatus,
    },
    Delete {
        project: String,
        id: String,
    },
}

#[derive(Subcommand)]
enum ArtifactCommands {
    /// Save content from --content, --file, or stdin
    Save {
        project: String,
        task: String,
        #[arg(long = "type")]
        kind: Option<String>,
        #[arg(long, conflicts_with = "file")]
        content: Option<String>,
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long = "meta", value_parser = parse_key_value)]
        metadata: Vec<(String, String)>,
    },
    List {
        project: String,
        task: String,
        #[command(flatten)]
        page: PageArgs,
    },
    Get {
        project: String,
        task: String,
        id: String,
    },
    Delete {
        project: String,
        task: String,
        id: String,
    },
}

#[derive(Args)]
struct PageArgs {
    /// Page size; 0 means the default of 50
    #[arg(long, default_value_t = 0)]
    limit: usize,
    #[arg(long, default_value_t = 0)]
    offset: usize,
}

impl PageArgs {
    fn options(&self) -> ListOptions {
        ListOptions::new(self.limit, self.offset)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> CliResult {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_from_default_locations()?,
    };
    if let Some(tasks_path) = cli.tasks_path {
        config.tasks_path = tasks_path;
    }
    if let Some(log_level) = cli.log_level {
        config.log_level = log_level;
    }

    // A broken log directory must not block store access.
    if let Err(err) = init_logging_from_config(&config) {
        eprintln!("warning: file logging disabled: {err}");
    }

    let base_path = config.resolve_tasks_path()?;
    let service = TaskService::new(FsTaskRepository::open(&base_path)?);
    info!(
        "event=cli_start module=cli status=ok base_path={}",
        base_path.display()
    );

    match cli.command {
        Commands::Project { command } => run_project(&service, command),
        Commands::Task { command } => run_task(&service, command),
        Commands::Artifact { command } => run_artifact(&service, command),
        Commands::Search {
            query,
            project,
            task,
            page,
        } => {
            if task.is_some() && project.is_none() {
                warn!("event=cli_search module=cli status=ignored reason=task_without_project");
            }
            let request = SearchArtifactsRequest {
                query,
                project_id: project.unwrap_or_default(),
                task_id: task.unwrap_or_default(),
            };
            let result = service.search_artifacts(&request, &page.options())?;
            print_page(&result, |artifact| {
                format!(
                    "{}/{}\t{}",
                    artifact.project_id,
                    artifact.task_id,
                    artifact_line(artifact)
                )
            });
            Ok(())
        }
    }
}

fn run_project(service: &Service, command: ProjectCommands) -> CliResult {
    match command {
        ProjectCommands::Create {
            id,
            name,
            description,
            workspace,
            metadata,
        } => {
            let project = service.create_project(CreateProjectRequest {
                id,
                name,
                description,
                workspace_path: workspace,
                metadata: collect_metadata(metadata),
            })?;
            println!("created project {}", project.id);
        }
        ProjectCommands::Get { id } => print_project(&service.get_project(&id)?),
        ProjectCommands::List { page } => {
            let result = service.list_projects(&page.options())?;
            print_page(&result, |project| {
                format!("{}\t{}", project.id, project.name)
            });
        }
        ProjectCommands::Delete { id } => {
            service.delete_project(&id)?;
            println!("deleted project {id}");
        }
    }
    Ok(())
}

fn run_task(service: &Service, command: TaskCommands) -> CliResult {
    match command {
        TaskCommands::Create {
            project,
            id,
            name,
            description,
            workspace,
            metadata,
        } => {
            let task = service.create_task(CreateTaskRequest {
                project_id: project,
                id,
                name,
                description,
                workspace_path: workspace,
                metadata: collect_metadata(metadata),
            })?;
            println!("created task {}/{}", task.project_id, task.id);
        }
        TaskCommands::Get { project, id } => {
            let task = service.get_task(&project, &id)?;
            let workspace = service.effective_workspace_path(&project, &id)?;
            print_task(&task, &workspace);
        }
        TaskCommands::List {
            project,
            status,
            page,
        } => {
            let mut opts = page.options();
            opts.status = status;
            let result = match project {
                Some(project) => service.list_tasks(&project, &opts)?,
                None => service.list_all_tasks(&opts)?,
            };
            print_page(&result, task_line);
        }
        TaskCommands::Status {
            project,
            id,
            status,
        } => {
            let task = service.update_task(UpdateTaskRequest {
                project_id: project,
                id,
                status: Some(status),
                ..UpdateTaskRequest::default()
            })?;
            println!("{}", task_line(&task));
        }
        TaskCommands::Delete { project, id } => {
            service.delete_task(&project, &id)?;
            println!("deleted task {project}/{id}");
        }
    }
    Ok(())
}

fn run_artifact(service: &Service, command: ArtifactCommands) -> CliResult {
    match command {
        ArtifactCommands::Save {
            project,
            task,
            kind,
            content,
            file,
            metadata,
        } => {
            let content = match (content, file) {
                (Some(content), _) => content,
                (None, Some(path)) => fs::read_to_string(&path)
                    .map_err(|err| format!("cannot read `{}`: {err}", path.display()))?,
                (None, None) => {
                    let mut buffer = String::new();
                    io::stdin().read_to_string(&mut buffer)?;
                    buffer
                }
            };
            let artifact = service.save_artifact(SaveArtifactRequest {
                project_id: project,
                task_id: task,
                kind: kind.as_deref().map(ArtifactType::parse),
                content,
                metadata: collect_metadata(metadata),
            })?;
            println!("saved artifact {}", artifact_line(&artifact));
        }
        ArtifactCommands::List {
            project,
            task,
            page,
        } => {
            let result = service.list_artifacts(&project, &task, &page.options())?;
            print_page(&result, artifact_line);
        }
        ArtifactCommands::Get { project, task, id } => {
            print_artifact(&service.get_artifact(&project, &task, &id)?);
        }
        ArtifactCommands::Delete { project, task, id } => {
            service.delete_artifact(&project, &task, &id)?;
            println!("deleted artifact {id}");
        }
    }
    Ok(())
}

fn print_page<T>(result: &ListResult<T>, line: impl Fn(&T) -> String) {
    for item in &result.items {
        println!("{}", line(item));
    }
    let mut footer = format!(
        "-- {} of {} (offset {})",
        result.items.len(),
        result.total,
        result.offset
    );
    if result.has_more {
        footer.push_str(&format!(
            ", more with --offset {}",
            result.offset + result.items.len()
        ));
    }
    println!("{footer}");
}

fn print_project(project: &Project) {
    println!("id: {}", project.id);
    println!("name: {}", project.name);
    if !project.description.is_empty() {
        println!("description: {}", project.description);
    }
    if !project.workspace_path.is_empty() {
        println!("workspace: {}", project.workspace_path);
    }
    print_metadata(&project.metadata);
    println!("created: {}", project.created_at.to_rfc3339());
    println!("updated: {}", project.updated_at.to_rfc3339());
}

fn print_task(task: &Task, workspace: &str) {
    println!("id: {}", task.id);
    println!("project: {}", task.project_id);
    println!("name: {}", task.name);
    println!("status: {} {}", task.status.marker(), task.status);
    if !task.description.is_empty() {
        println!("description: {}", task.description);
    }
    if !workspace.is_empty() {
        println!("workspace: {workspace}");
    }
    print_metadata(&task.metadata);
    println!("created: {}", task.created_at.to_rfc3339());
    println!("updated: {}", task.updated_at.to_rfc3339());
}

fn print_artifact(artifact: &Artifact) {
    println!("id: {}", artifact.id);
    println!("type: {}", artifact.kind);
    println!("created: {}", artifact.created_at.to_rfc3339());
    print_metadata(&artifact.metadata);
    println!();
    println!("{}", artifact.content);
}

fn print_metadata(metadata: &Metadata) {
    for (key, value) in metadata {
        println!("meta.{key}: {value}");
    }
}

fn task_line(task: &Task) -> String {
    format!(
        "{} {}/{}\t{}\t{}",
        task.status.marker(),
        task.project_id,
        task.id,
        task.status,
        task.name
    )
}

fn artifact_line(artifact: &Artifact) -> String {
    let preview = artifact.content.lines().next().unwrap_or_default();
    format!("{}\t{}\t{}", artifact.id, artifact.kind, preview)
}

fn collect_metadata(entries: Vec<(String, String)>) -> Metadata {
    entries.into_iter().collect()
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{raw}`"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("metadata key cannot be empty in `{raw}`"));
    }
    if key.contains(':') {
        return Err(format!("metadata key cannot contain `:` in `{raw}`"));
    }
    Ok((key.to_string(), value.to_string()))
}

fn parse_status(raw: &str) -> Result<TaskStatus, String> {
    TaskStatus::parse(raw).ok_or_else(|| {
        format!("unknown status `{raw}`; expected open|in_progress|completed|archived")
    })
}
