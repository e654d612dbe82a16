//! Context command - show which cluster the server would talk to

use console::style;
use std::path::Path;

use crate::error::{CliError, Result};

/// Run the context command
pub fn run(kubeconfig: Option<&Path>) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::internal(format!("failed to start runtime: {}", e)))?;

    let path = kubedeck_kube::kubeconfig_path(kubeconfig)?;
    let handle = runtime.block_on(kubedeck_kube::resolve(Some(path.as_path())))?;

    println!("{}", style("CLUSTER").bold().underlined());
    println!("  Kubeconfig: {}", style(path.display()).dim());
    println!("  Context:    {}", style(handle.context()).cyan());
    println!("  Cluster:    {}", style(handle.cluster_name()).yellow());

    Ok(())
}
