use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "kube-topology")]
#[command(about = "Render a Mermaid topology document for every workload in a cluster")]
pub struct Cli {
    /// Kubeconfig context (defaults to the current context)
    #[arg(long)]
    pub context: Option<String>,

    /// Namespace to inspect; repeat for several (defaults to all namespaces)
    #[arg(short = 'n', long = "namespace")]
    pub namespaces: Vec<String>,

    /// Skip namespaces whose name matches this regex
    #[arg(long)]
    pub exclude_namespace: Option<String>,

    /// Only render workloads carrying these labels (k=v,k2=v2)
    #[arg(short = 'l', long)]
    pub selector: Option<String>,

    /// Output root (defaults to output_<cluster>)
    #[arg(short = 'o', long)]
    pub output_dir: Option<PathBuf>,

    /// Draw ReplicaSets between Deployments and their pods
    #[arg(long)]
    pub show_replica_sets: bool,

    /// Leave spec/status fields out of the diagrams
    #[arg(long)]
    pub no_fields: bool,

    /// Namespaces processed concurrently
    #[arg(long, default_value_t = 4, value_parser = clap::value_parser!(u16).range(1..))]
    pub concurrency: u16,

    /// Enable verbose output
    #[arg(short = 'v', long)]
    pub verbose: bool,
}
