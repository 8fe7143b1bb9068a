use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use task_scheduler::config::{SchedulerConfig, DEFAULT_STATE_PATH};
use task_scheduler::scheduler::index::DEFAULT_BUCKET_COUNT;
use task_scheduler::scheduler::timestamp;
use task_scheduler::scheduler::{JobId, JobLocation, JobRef, SnapshotJob};
use task_scheduler::{SchedulerError, SchedulerService};

/// Small enough that the demo's ids visibly share buckets.
const DEMO_BUCKET_COUNT: usize = 7;

#[derive(Parser, Debug)]
#[command(name = "task-scheduler")]
#[command(version)]
#[command(about = "A FIFO job scheduler with duplicate detection and execution history")]
#[command(propagate_version = true)]
struct Args {
    /// JSON file holding the queue and history between runs
    #[arg(long, global = true, default_value = DEFAULT_STATE_PATH)]
    state: PathBuf,

    /// Number of buckets in the lookup index (minimum 3). Defaults to 53, or
    /// 7 for the demo
    #[arg(long, global = true)]
    buckets: Option<usize>,

    /// Output format
    #[arg(long, short = 'o', global = true, default_value = "table")]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Queue one or more jobs
    Submit {
        /// Job IDs, queued in the order given
        #[arg(required = true, allow_negative_numbers = true)]
        ids: Vec<JobId>,
    },
    /// Execute the job at the head of the queue
    RunNext,
    /// Execute every queued job in order
    RunAll,
    /// Show where a job is and its timestamps
    Find {
        #[arg(allow_negative_numbers = true)]
        job_id: JobId,
    },
    /// List queued jobs, head first
    Queue,
    /// List executed jobs in execution order
    History {
        /// Only show the N most recent jobs
        #[arg(long)]
        last: Option<usize>,
    },
    /// Show the ids held in each lookup index bucket
    Index,
    /// Walk through submit, run, save and reload against the state file
    Demo,
}

// =============================================================================
// JSON Output Types
// =============================================================================

#[derive(Serialize)]
struct FindOutput {
    location: String,
    job: SnapshotJob,
}

#[derive(Serialize)]
struct BucketOutput {
    bucket: usize,
    job_ids: Vec<JobId>,
}

// =============================================================================
// Output Helpers
// =============================================================================

fn print_jobs(
    title: &str,
    jobs: &[JobRef],
    output_format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match output_format {
        OutputFormat::Json => {
            let output: Vec<SnapshotJob> = jobs.iter().map(|j| j.to_snapshot()).collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Table => {
            println!("{}:", title);
            if jobs.is_empty() {
                println!("  (empty)");
                return Ok(());
            }
            println!("{:<10} {:<10} {:<32} EXECUTED", "JOB ID", "STATUS", "SUBMITTED");
            println!("{}", "-".repeat(86));
            for job in jobs {
                let executed = job
                    .executed_at
                    .as_ref()
                    .map(timestamp::format)
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{:<10} {:<10} {:<32} {}",
                    job.id,
                    job.status,
                    timestamp::format(&job.submitted_at),
                    executed
                );
            }
        }
    }
    Ok(())
}

fn print_index(
    buckets: &[Vec<JobId>],
    output_format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match output_format {
        OutputFormat::Json => {
            let output: Vec<BucketOutput> = buckets
                .iter()
                .enumerate()
                .map(|(bucket, ids)| BucketOutput {
                    bucket,
                    job_ids: ids.clone(),
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Table => {
            println!("Lookup index:");
            for (bucket, ids) in buckets.iter().enumerate() {
                let ids: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
                println!("  {:>3}: [{}]", bucket, ids.join(", "));
            }
        }
    }
    Ok(())
}

// =============================================================================
// Command Handlers
// =============================================================================

/// Submit each id in turn. Duplicates are reported and skipped.
async fn handle_submit(
    service: &SchedulerService,
    ids: &[JobId],
    output_format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut submitted = Vec::with_capacity(ids.len());
    for &id in ids {
        match service.submit(id).await {
            Ok(job) => submitted.push(job),
            Err(e) if e.is_duplicate_submission() => {
                tracing::info!(job_id = id, "{}", e);
            }
            Err(e) => return Err(e.into()),
        }
    }
    print_jobs("Submitted", &submitted, output_format)
}

async fn handle_run_next(
    service: &SchedulerService,
    output_format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match service.run_next().await {
        Some(job) => print_jobs("Executed", &[job], output_format),
        None => {
            tracing::info!("No jobs in queue");
            print_jobs("Executed", &[], output_format)
        }
    }
}

async fn handle_find(
    service: &SchedulerService,
    job_id: JobId,
    output_format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let Some((location, job)) = service.find_job(job_id).await else {
        match output_format {
            OutputFormat::Json => println!("null"),
            OutputFormat::Table => println!("Job {} not found.", job_id),
        }
        return Ok(());
    };

    match output_format {
        OutputFormat::Json => {
            let output = FindOutput {
                location: location.to_string(),
                job: job.to_snapshot(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Table => {
            println!("Job ID:    {}", job.id);
            println!("Location:  {}", location);
            println!("Status:    {}", job.status);
            println!("Submitted: {}", timestamp::format(&job.submitted_at));
            if let Some(executed_at) = &job.executed_at {
                println!("Executed:  {}", timestamp::format(executed_at));
            }
            if location == JobLocation::Queued {
                let position = service
                    .queue_snapshot()
                    .await
                    .iter()
                    .position(|j| j.id == job.id);
                if let Some(position) = position {
                    println!("Position:  {}", position + 1);
                }
            }
        }
    }
    Ok(())
}

async fn submit_all(service: &SchedulerService, ids: &[JobId]) -> Result<(), SchedulerError> {
    for &id in ids {
        match service.submit(id).await {
            Ok(_) => {}
            Err(e) if e.is_duplicate_submission() => tracing::info!(job_id = id, "{}", e),
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Two schedulers sharing one state file: the first does the work, the
/// second reloads what the first saved.
async fn run_demo(
    config: &SchedulerConfig,
    output_format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let scheduler = SchedulerService::new(config);

    submit_all(&scheduler, &[10, 15, 8]).await?;
    print_index(&scheduler.index_snapshot().await, output_format)?;
    print_jobs("Queue", &scheduler.queue_snapshot().await, output_format)?;

    scheduler.run_next().await;
    print_jobs("History", &scheduler.history_snapshot().await, output_format)?;
    scheduler.save().await?;

    let reloaded = SchedulerService::new(config);
    reloaded.load().await?;
    print_jobs("Reloaded queue", &reloaded.queue_snapshot().await, output_format)?;
    print_jobs("Reloaded history", &reloaded.history_snapshot().await, output_format)?;

    submit_all(&scheduler, &[101, 112, 80]).await?;
    print_index(&scheduler.index_snapshot().await, output_format)?;
    print_jobs("Queue", &scheduler.queue_snapshot().await, output_format)?;

    scheduler.run_next().await;
    print_jobs("History", &scheduler.history_snapshot().await, output_format)?;
    scheduler.save().await?;

    reloaded.load().await?;
    print_jobs("Reloaded queue", &reloaded.queue_snapshot().await, output_format)?;
    print_jobs("Reloaded history", &reloaded.history_snapshot().await, output_format)?;
    Ok(())
}

// =============================================================================
// Main Entry Point
// =============================================================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = resolve_config(&args);

    run_command(&config, args.command, &args.output).await
}

/// An explicit `--buckets` always wins; otherwise the demo gets its own
/// default.
fn resolve_config(args: &Args) -> SchedulerConfig {
    let default_buckets = match args.command {
        Commands::Demo => DEMO_BUCKET_COUNT,
        _ => DEFAULT_BUCKET_COUNT,
    };
    SchedulerConfig::new(
        args.buckets.unwrap_or(default_buckets),
        args.state.clone(),
    )
}

async fn run_command(
    config: &SchedulerConfig,
    command: Commands,
    output_format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let service = SchedulerService::new(config);
    if !matches!(command, Commands::Demo) {
        service.load_if_exists().await?;
    }

    match command {
        Commands::Submit { ids } => {
            handle_submit(&service, &ids, output_format).await?;
            service.save().await?;
        }
        Commands::RunNext => {
            handle_run_next(&service, output_format).await?;
            service.save().await?;
        }
        Commands::RunAll => {
            let executed = service.run_all().await;
            if executed.is_empty() {
                tracing::info!("No jobs in queue");
            }
            print_jobs("Executed", &executed, output_format)?;
            service.save().await?;
        }
        Commands::Find { job_id } => {
            handle_find(&service, job_id, output_format).await?;
        }
        Commands::Queue => {
            print_jobs("Queue", &service.queue_snapshot().await, output_format)?;
        }
        Commands::History { last } => {
            let jobs = match last {
                Some(n) => service.recent_history(n).await,
                None => service.history_snapshot().await,
            };
            print_jobs("History", &jobs, output_format)?;
        }
        Commands::Index => {
            print_index(&service.index_snapshot().await, output_format)?;
        }
        Commands::Demo => run_demo(config, output_format).await?,
    }

    Ok(())
}
