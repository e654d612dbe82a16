use kubedeck_core::ResourceSummary;

pub mod assistant;
pub mod cluster;
pub mod deployments;
pub mod health_check;
pub mod pods;

const SUCCESS: &str = "success";

/// Names of the summaries, for endpoints that only report names
fn names(summaries: Vec<ResourceSummary>) -> Vec<String> {
    summaries.iter().map(|s| s.name().to_string()).collect()
}
