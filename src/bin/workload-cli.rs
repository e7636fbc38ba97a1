use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use futures_util::stream::{self, StreamExt};
use serde_json::Value;

use synthetic_workload::config::{ConfigError, ConfigLoader};

#[derive(Parser)]
#[command(name = "workload-cli")]
#[command(about = "Companion CLI for the synthetic workload emulator", long_about = None)]
struct Cli {
    #[arg(short, long, env = "WORKLOAD_URL", default_value = "http://localhost:3000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a workload document without starting the service
    Check {
        path: PathBuf,
    },
    /// Send requests and summarize statuses and latencies
    Hit {
        #[arg(short = 'n', long, default_value_t = 100)]
        requests: usize,
        #[arg(short, long, default_value_t = 10)]
        concurrency: usize,
    },
    /// Print the Prometheus scrape
    Metrics,
    /// Print the active configuration snapshot
    Config,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let base = cli.url.trim_end_matches('/').to_string();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Check { path } => return Ok(check(&path)),
        Commands::Hit {
            requests,
            concurrency,
        } => {
            hit(&client, &base, requests, concurrency.max(1)).await;
        }
        Commands::Metrics => {
            let res = client.get(format!("{}/metrics", base)).send().await?;
            println!("{}", res.text().await?);
        }
        Commands::Config => {
            let res = client.get(format!("{}/config", base)).send().await?;
            print_response(res).await?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn check(path: &std::path::Path) -> ExitCode {
    let loader = ConfigLoader::new(path);
    match loader.load() {
        Ok(config) => {
            println!("{} is valid ({:?})", path.display(), loader.format());
            println!("{:#?}", *config);
            ExitCode::SUCCESS
        }
        Err(ConfigError::Validation(errors)) => {
            eprintln!("{} is invalid:", path.display());
            for err in errors {
                eprintln!("  - {}", err);
            }
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn hit(client: &reqwest::Client, base: &str, requests: usize, concurrency: usize) {
    let url = format!("{}/", base);
    let start = Instant::now();

    let results: Vec<(Option<u16>, Duration)> = stream::iter(0..requests)
        .map(|_| {
            let client = client.clone();
            let url = url.clone();
            async move {
                let req_start = Instant::now();
                let status = match client.get(&url).send().await {
                    Ok(res) => Some(res.status().as_u16()),
                    Err(_) => None,
                };
                (status, req_start.elapsed())
            }
        })
        .buffer_unordered(concurrency)
        .collect()
        .await;

    let elapsed = start.elapsed();
    let mut statuses: BTreeMap<String, usize> = BTreeMap::new();
    let mut latencies: Vec<Duration> = Vec::with_capacity(results.len());
    for (status, latency) in results {
        let key = status.map_or_else(|| "transport error".to_string(), |s| s.to_string());
        *statuses.entry(key).or_default() += 1;
        latencies.push(latency);
    }
    latencies.sort();

    println!("\n--- Workload Results ---");
    println!("Total Requests: {}", requests);
    println!("Concurrency:    {}", concurrency);
    println!("Total Duration: {:?}", elapsed);
    println!("Requests/sec:   {:.2}", requests as f64 / elapsed.as_secs_f64());
    if !latencies.is_empty() {
        println!("P50 Latency:    {:?}", percentile(&latencies, 0.50));
        println!("P95 Latency:    {:?}", percentile(&latencies, 0.95));
        println!("P99 Latency:    {:?}", percentile(&latencies, 0.99));
    }
    for (status, count) in &statuses {
        println!("Status {:<9} {}", format!("{}:", status), count);
    }
    println!("------------------------\n");
}

fn percentile(sorted: &[Duration], p: f64) -> Duration {
    let idx = ((sorted.len() as f64 * p) as usize).min(sorted.len() - 1);
    sorted[idx]
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: service returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
