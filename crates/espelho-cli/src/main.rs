//! espelho - drive the offline mirror from the command line

mod cli;

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use espelho_core::{
    Error, EventBus, HttpRemote, LocalStore, QueryFacade, Result, SyncConfig, SyncCoordinator,
    SyncOutcome, Task,
};

use cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(error) = run(cli).await {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let store = Arc::new(LocalStore::open(&cli.db_path)?);

    match cli.command {
        Commands::Add {
            title,
            user,
            workspace,
        } => {
            let mut task = Task::new(title.join(" "), user);
            task.workspace_id = workspace;
            let id = store.create(task)?;
            println!("created task {id}");
        }
        Commands::List { user, json } => {
            let facade = QueryFacade::new(&store);
            let tasks = facade.tasks_by_user(user)?;
            if json {
                let records: Vec<&Task> = tasks.iter().map(|t| &t.record).collect();
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                for task in &tasks {
                    let marker = if task.dirty { "*" } else { " " };
                    println!(
                        "{marker} {:>4}  [{}] {}",
                        task.record.id.unwrap_or_default(),
                        task.record.status,
                        task.record.title
                    );
                }
                println!("{} task(s); * = not yet synced", tasks.len());
            }
        }
        Commands::Show { id } => {
            let facade = QueryFacade::new(&store);
            let detail = facade
                .task_by_id(id)?
                .ok_or_else(|| Error::NotFound(format!("tarefa {id}")))?;
            println!("{}", serde_json::to_string_pretty(&detail.task.record)?);
            for category in &detail.categories {
                println!("category: {}", category.name);
            }
        }
        Commands::Delete { id } => {
            store.delete(espelho_core::EntityKind::Task, id)?;
            println!("deleted task {id} (queued for upload)");
        }
        Commands::Log => {
            let pending = store.pending_operations()?;
            for op in &pending {
                println!(
                    "{}  {:<6} {:<10} #{}  retries={}",
                    op.client_ts, op.op_type, op.entity, op.entity_id, op.retry_count
                );
            }
            println!("{} pending operation(s)", pending.len());
        }
        Commands::Sync => {
            let coordinator = coordinator(&cli, store)?;
            match coordinator.trigger().await {
                SyncOutcome::Synced { uploaded } => println!("synced {uploaded} operation(s)"),
                SyncOutcome::Skipped => println!("a sync is already running"),
                SyncOutcome::Failed { message } => {
                    return Err(Error::Transport(message));
                }
            }
        }
        Commands::Pull => {
            let coordinator = coordinator(&cli, store)?;
            let stats = coordinator.pull_snapshot().await?;
            println!("snapshot applied: {} record(s)", stats.total());
        }
        Commands::Status => {
            let facade = QueryFacade::new(&store);
            let counts = facade.table_counts()?;
            println!("tasks: {}", counts.tasks);
            println!("workspaces: {}", counts.workspaces);
            println!("categories: {}", counts.categories);
            println!("comments: {}", counts.comments);
            println!("attachments: {}", counts.attachments);
            println!("pending operations: {}", counts.pending_operations);
            for table in store.sync_status()? {
                let last = table
                    .last_sync
                    .map_or_else(|| "never".to_string(), |ts| ts.to_string());
                let flag = if table.pending_sync { " (pending)" } else { "" };
                println!("{:<16} last_sync={last}{flag}", table.table_name);
            }
        }
        Commands::Reset => {
            store.clear()?;
            println!("local mirror cleared");
        }
    }
    Ok(())
}

fn coordinator(
    cli: &Cli,
    store: Arc<LocalStore>,
) -> Result<SyncCoordinator<HttpRemote>> {
    let endpoint = cli
        .endpoint
        .clone()
        .ok_or_else(|| Error::InvalidInput("--endpoint is required".into()))?;
    let email = cli
        .email
        .clone()
        .ok_or_else(|| Error::InvalidInput("--email is required".into()))?;

    let mut config = SyncConfig::new(endpoint, email)?;
    if let Some(token) = &cli.token {
        config = config.with_auth_token(token);
    }
    let remote = HttpRemote::new(&config)?;
    Ok(SyncCoordinator::new(
        store,
        remote,
        config,
        EventBus::default(),
    ))
}
