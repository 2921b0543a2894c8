mod cli;
mod document;
mod error;
mod graph;
mod kubernetes;
mod model;
mod pipeline;
mod render;
mod types;
mod utils;

use clap::Parser;
use futures::stream::{self, StreamExt};
use kube::Client;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use cli::Cli;
use kubernetes::{fetch_namespace, initialize_client, list_namespaces};
use pipeline::{NamespaceRecords, RenderOptions, WorkloadDocument, render_namespace};
use utils::parse_labels;

/// Per-namespace tallies folded into the run summary.
#[derive(Debug, Default)]
struct NamespaceReport {
    written: usize,
    failed: usize,
    skipped: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let exclude = match &cli.exclude_namespace {
        Some(pattern) => Some(
            Regex::new(pattern)
                .map_err(|e| anyhow::anyhow!("Invalid regex pattern '{}': {}", pattern, e))?,
        ),
        None => None,
    };
    let selector = match cli.selector.as_deref() {
        Some(sel) => parse_labels(sel)?,
        None => BTreeMap::new(),
    };

    let (cluster, client) = initialize_client(cli.context.as_deref()).await?;
    let output_root = cli
        .output_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("output_{}", cluster)));

    let mut namespaces = if cli.namespaces.is_empty() {
        list_namespaces(&client).await?
    } else {
        cli.namespaces.clone()
    };
    if let Some(re) = &exclude {
        namespaces.retain(|ns| {
            let keep = !re.is_match(ns);
            if !keep {
                debug!("Excluding namespace {}", ns);
            }
            keep
        });
    }
    info!(
        "Rendering {} namespace(s) into {}",
        namespaces.len(),
        output_root.display()
    );

    let options = RenderOptions {
        build: graph::BuildOptions {
            show_replica_sets: cli.show_replica_sets,
        },
        hide_fields: cli.no_fields,
    };

    let reports: Vec<NamespaceReport> = stream::iter(namespaces)
        .map(|ns| {
            let client = client.clone();
            let output_root = output_root.clone();
            let selector = selector.clone();
            async move { process_namespace(client, ns, &output_root, &selector, &options).await }
        })
        .buffer_unordered(cli.concurrency as usize)
        .collect()
        .await;

    let total = reports.iter().fold(NamespaceReport::default(), |acc, r| NamespaceReport {
        written: acc.written + r.written,
        failed: acc.failed + r.failed,
        skipped: acc.skipped + r.skipped,
    });
    info!(
        "Done: {} document(s) written, {} workload(s) failed, {} record(s) skipped",
        total.written, total.failed, total.skipped
    );
    Ok(())
}

async fn process_namespace(
    client: Client,
    namespace: String,
    output_root: &Path,
    selector: &BTreeMap<String, String>,
    options: &RenderOptions,
) -> NamespaceReport {
    let mut report = NamespaceReport::default();
    info!("Processing namespace: {}", namespace);

    let snapshot = match fetch_namespace(&client, &namespace).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!("Skipping namespace {}: {}", namespace, e);
            return report;
        }
    };

    let mut records = NamespaceRecords::from_snapshot(&snapshot);
    records.retain_workloads(selector);
    report.skipped = records.skipped.len();

    let mut taken = HashSet::new();
    for result in render_namespace(&records, options) {
        let doc = match result {
            Ok(doc) => doc,
            Err(e) => {
                error!("[{}] Failed to render workload: {}", namespace, e);
                report.failed += 1;
                continue;
            }
        };
        let path = document_path(output_root, &doc, &mut taken);
        match write_document(&path, &doc).await {
            Ok(()) => report.written += 1,
            Err(e) => {
                error!("[{}] {}", namespace, e);
                report.failed += 1;
            }
        }
    }
    report
}

/// `<root>/<namespace>/<name>.md`; a workload whose path is already taken
/// gets its kind appended, then a counter until the path is free.
fn document_path(root: &Path, doc: &WorkloadDocument, taken: &mut HashSet<PathBuf>) -> PathBuf {
    let dir = root.join(&doc.namespace);
    let path = dir.join(format!("{}.md", doc.name));
    if taken.insert(path.clone()) {
        return path;
    }
    let kind = doc.kind.as_str().to_lowercase();
    let path = dir.join(format!("{}.{}.md", doc.name, kind));
    if taken.insert(path.clone()) {
        return path;
    }
    let mut n = 2u32;
    loop {
        let path = dir.join(format!("{}.{}-{}.md", doc.name, kind, n));
        if taken.insert(path.clone()) {
            return path;
        }
        n += 1;
    }
}

async fn write_document(path: &Path, doc: &WorkloadDocument) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create {}: {}", parent.display(), e))?;
    }
    tokio::fs::write(path, &doc.text)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to write {}: {}", path.display(), e))?;
    debug!("Wrote {}", path.display());
    Ok(())
}
