use athena_runner::{
    AthenaClient, AthenaConfig, AthenaOverrides, CachePolicy, ExecutionHandle, ExecutorOptions,
    QueryExecutor, QueryRequest, QueryService, ResultCache,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "athena-runner")]
#[command(about = "Run SQL on Athena and print the decoded rows as JSON")]
#[command(version)]
struct Args {
    /// Override the service endpoint (or set ATHENA_ENDPOINT)
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Override the region (or set AWS_REGION)
    #[arg(long, global = true)]
    region: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a query, wait for it and print its results
    Run {
        /// SQL text to execute
        query: String,

        #[arg(short, long)]
        database: Option<String>,

        #[arg(short, long)]
        catalog: Option<String>,

        /// Result location (or set ATHENA_OUTPUT_LOCATION)
        #[arg(short, long)]
        output_location: Option<String>,

        /// Workgroup (or set ATHENA_WORKGROUP)
        #[arg(short, long)]
        workgroup: Option<String>,

        /// Name under which completed executions are reused
        #[arg(long)]
        cache_key: Option<String>,

        /// Length of the cache bucket in seconds
        #[arg(long, default_value_t = 300)]
        cache_expiry_secs: u64,

        /// Run the query this many times, sharing one cache
        #[arg(long, default_value_t = 1)]
        repeat: usize,

        /// Give up waiting after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Print the undecoded result set with column metadata
        #[arg(long)]
        raw: bool,
    },
    /// Print the current status of an execution
    Status {
        /// Execution id returned on submission
        execution_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = AthenaConfig::from_env()?.merge(AthenaOverrides {
        endpoint: args.endpoint,
        region: args.region,
        ..Default::default()
    })?;
    info!("Using endpoint {}", config.endpoint);
    let client: Arc<dyn QueryService> = Arc::new(AthenaClient::new(config)?);

    match args.command {
        Commands::Run {
            query,
            database,
            catalog,
            output_location,
            workgroup,
            cache_key,
            cache_expiry_secs,
            repeat,
            timeout_secs,
            raw,
        } => {
            let mut request = QueryRequest::new(query);
            if let Some(database) = database {
                request = request.with_database(database);
            }
            if let Some(catalog) = catalog {
                request = request.with_catalog(catalog);
            }
            if let Some(location) = output_location {
                request = request.with_output_location(location);
            }
            if let Some(workgroup) = workgroup {
                request = request.with_workgroup(workgroup);
            }

            let mut options = ExecutorOptions::from_env()?;
            if let Some(secs) = timeout_secs {
                options = options.with_timeout(Duration::from_secs(secs));
            }
            let policy = cache_key
                .map(|key| CachePolicy::new(Duration::from_secs(cache_expiry_secs), key))
                .transpose()?;
            let cache = Arc::new(ResultCache::new().with_ttl(Duration::from_secs(cache_expiry_secs)));

            for _ in 0..repeat.max(1) {
                let mut executor = QueryExecutor::new(client.clone(), request.clone())
                    .with_options(options.clone());
                if let Some(policy) = &policy {
                    executor = executor.with_cache(cache.clone(), policy);
                }

                let output = if raw {
                    executor.submit().await?;
                    executor.await_terminal().await?;
                    serde_json::to_string_pretty(&executor.raw_results().await?)?
                } else {
                    serde_json::to_string_pretty(&executor.run_and_get_results().await?)?
                };
                println!("{}", output);
            }
        }
        Commands::Status { execution_id } => {
            let handle = ExecutionHandle::new(execution_id);
            let status = client
                .get_execution_status(&handle)
                .await
                .with_context(|| format!("Failed to read status of {}", handle))?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
    }

    Ok(())
}
