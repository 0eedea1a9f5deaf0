//! Subcommand implementations.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use spoolq_core::{BoxError, Envelope, JobHandler, Queue, QueueConfig, WorkerGroup, sync_handler};

use crate::cli::{CliArgs, Command};

/// Prints each payload on its own line, prefixed by the job id.
struct PrintHandler;

#[async_trait]
impl JobHandler for PrintHandler {
    async fn handle(&self, envelope: &Envelope) -> Result<(), BoxError> {
        println!("{} {}", envelope.id, serde_json::to_string(&envelope.payload)?);
        Ok(())
    }
}

/// Config file first, then flag overrides.
pub fn resolve_config(args: &CliArgs) -> Result<QueueConfig> {
    let mut config = match &args.config {
        Some(path) => QueueConfig::from_path(path)?,
        None => QueueConfig::default(),
    };
    if let Some(dir) = &args.dir {
        config.dir = dir.clone();
    }
    if let Some(ttl) = args.ttl_ms {
        config.ttl = ttl;
    }
    if let Some(retries) = args.retries {
        config.retries = retries;
    }
    Ok(config)
}

pub async fn run(args: CliArgs) -> Result<()> {
    let config = resolve_config(&args)?;
    let queue = Queue::open(args.name.as_str(), config)
        .await
        .with_context(|| format!("open queue {:?}", args.name))?;

    match args.command {
        Command::Add { payload } => {
            let payload: serde_json::Value =
                serde_json::from_str(&payload).context("payload is not valid JSON")?;
            let envelope = queue.add(&payload).await?;
            print_json(&envelope)?;
        }
        Command::Pop { fail } => {
            let popped = if fail {
                queue.pop(&sync_handler(|_: &Envelope| Err("failed on request"))).await?
            } else {
                queue.pop(&sync_handler(|_: &Envelope| Ok::<_, BoxError>(()))).await?
            };
            match popped {
                Some(envelope) => print_json(&envelope)?,
                None => println!("no item found"),
            }
        }
        Command::List => print_json(&queue.list().await?)?,
        Command::Count => println!("{}", queue.count().await?),
        Command::Status => print_json(&queue.counts().await?)?,
        Command::Empty => println!("{}", queue.empty().await?),
        Command::Work { workers, poll_ms } => {
            let group = WorkerGroup::spawn(
                workers,
                queue,
                Arc::new(PrintHandler),
                Duration::from_millis(poll_ms),
            );
            info!("press Ctrl-C to stop");
            tokio::signal::ctrl_c().await.context("wait for Ctrl-C")?;
            info!("shutting down, waiting for in-flight jobs");
            group.shutdown_and_join().await;
        }
        Command::Demo => {
            queue.add(&serde_json::json!({"hello": "world"})).await?;
            match queue.pop(&PrintHandler).await? {
                Some(item) => println!("item {} finished", item.id),
                None => println!("no item found"),
            }
        }
    }
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::path::PathBuf;
    use tempfile::tempdir;

    #[test]
    fn flags_override_config_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("queue.json");
        std::fs::write(&path, r#"{"dir": "/from/file", "ttl": 5, "retries": 2}"#).unwrap();

        let args = CliArgs::try_parse_from([
            "spoolq",
            "--config",
            path.to_str().unwrap(),
            "--retries",
            "-1",
            "count",
        ])
        .unwrap();
        let config = resolve_config(&args).unwrap();

        assert_eq!(config.dir, PathBuf::from("/from/file"));
        assert_eq!(config.ttl, 5);
        assert_eq!(config.retry_limit(), None);
    }
}
