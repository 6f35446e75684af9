//! Request loop and final report

use std::time::Instant;

use futures_util::StreamExt;
use futures_util::stream;
use hostpool_core::routing::{HostRouter, HostStats, Transport};
use serde::Serialize;

/// Totals of one run plus the final per-host statistics
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub requests: usize,
    pub succeeded: usize,
    pub unsuccessful: usize,
    pub errors: usize,
    pub elapsed_ms: u64,
    pub hosts: Vec<HostStats>,
}

/// Send `requests` requests through the router, `concurrency` at a time
pub async fn drive<T, F>(
    router: &HostRouter<T>,
    requests: usize,
    concurrency: usize,
    make_request: F,
) -> RunSummary
where
    T: Transport,
    F: Fn(usize) -> T::Request,
{
    let started = Instant::now();
    let mut summary = RunSummary {
        requests,
        succeeded: 0,
        unsuccessful: 0,
        errors: 0,
        elapsed_ms: 0,
        hosts: Vec::new(),
    };

    let mut responses = stream::iter(0..requests)
        .map(|i| {
            let request = make_request(i);
            async move { router.route(request).await }
        })
        .buffer_unordered(concurrency.max(1));

    while let Some(result) = responses.next().await {
        match result {
            Ok(response) if router.transport().is_success(&response) => summary.succeeded += 1,
            Ok(_) => summary.unsuccessful += 1,
            Err(_) => summary.errors += 1,
        }
    }

    summary.elapsed_ms = started.elapsed().as_millis() as u64;
    summary.hosts = router.stats();
    summary
}

/// Render a summary as human-readable text
pub fn render_text(summary: &RunSummary) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Routed {} requests in {} ms ({} ok, {} unsuccessful, {} errors)\n\n",
        summary.requests,
        summary.elapsed_ms,
        summary.succeeded,
        summary.unsuccessful,
        summary.errors
    ));
    out.push_str(&format!(
        "{:<24} {:>10} {:>10} {:>8} {:>10} {:>10}\n",
        "HOST", "REQUESTS", "OBSERVED", "MEAN", "ALPHA", "BETA"
    ));
    for stats in &summary.hosts {
        out.push_str(&format!(
            "{:<24} {:>10} {:>10} {:>8.3} {:>10.2} {:>10.2}\n",
            stats.host.as_str(),
            stats.selections,
            stats.observations,
            stats.belief.mean(),
            stats.belief.success_weight,
            stats.belief.failure_weight
        ));
    }
    out.push_str(&format!("\nFinal counts: {}\n", final_counts(&summary.hosts)));
    out
}

fn final_counts(hosts: &[HostStats]) -> String {
    let counts: Vec<String> = hosts
        .iter()
        .map(|s| format!("{}:{}", s.host, s.selections))
        .collect();
    format!("map[{}]", counts.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulated::{BackendSpec, SimulatedTransport};

    #[tokio::test(start_paused = true)]
    async fn test_drive_counts_every_request() {
        let specs: Vec<BackendSpec> = ["a:10", "b:40:1.0"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        let router = HostRouter::builder()
            .hosts(["a", "b"])
            .transport(SimulatedTransport::new(&specs, Some(3)))
            .seed(3)
            .build()
            .unwrap();

        let summary = drive(&router, 40, 4, |i| i).await;

        assert_eq!(summary.requests, 40);
        assert_eq!(summary.succeeded + summary.unsuccessful + summary.errors, 40);
        assert_eq!(summary.unsuccessful, 0);
        let selected: u64 = summary.hosts.iter().map(|s| s.selections).sum();
        assert_eq!(selected, 40);
        assert_eq!(summary.errors as u64, summary.hosts[1].selections);
    }

    #[test]
    fn test_render_text_lists_hosts() {
        let summary = RunSummary {
            requests: 0,
            succeeded: 0,
            unsuccessful: 0,
            errors: 0,
            elapsed_ms: 0,
            hosts: vec![HostStats::new("x:1".into()), HostStats::new("y:2".into())],
        };

        let text = render_text(&summary);
        assert!(text.contains("x:1"));
        assert!(text.contains("Final counts: map[x:1:0 y:2:0]"));
    }
}
