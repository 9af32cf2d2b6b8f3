//! Stress helpers for the sync server.
//!
//! These drive many clients against one server from several threads and
//! report what happened, so tests can assert on the final state.

use crate::fixtures::create_todo;
use rowsync_protocol::{Cookie, PullRequest, PushRequest};
use rowsync_server::SyncServer;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total requests sent.
    pub total_requests: usize,
    /// Requests that succeeded.
    pub successful_requests: usize,
    /// Requests that failed.
    pub failed_requests: usize,
    /// Total duration.
    pub duration: Duration,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(successful: usize, failed: usize, duration: Duration) -> Self {
        Self {
            total_requests: successful + failed,
            successful_requests: successful,
            failed_requests: failed,
            duration,
        }
    }

    /// Requests per second.
    pub fn requests_per_second(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.total_requests as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }
}

/// Configuration for stress runs.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of concurrent client groups, one thread each.
    pub groups: usize,
    /// Pushes per group.
    pub pushes_per_group: usize,
    /// Mutations per push.
    pub mutations_per_push: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            groups: 4,
            pushes_per_group: 25,
            mutations_per_push: 4,
        }
    }
}

/// Each group pushes `createTodo` batches and pulls after every push,
/// echoing the cookie it got last.
///
/// Group `n` uses client `client-n` and creates todos `todo/n-<i>`.
pub fn stress_push_pull(server: Arc<SyncServer>, config: &StressConfig) -> StressTestResult {
    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let start = Instant::now();

    let handles: Vec<_> = (0..config.groups)
        .map(|g| {
            let server = Arc::clone(&server);
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);
            let config = config.clone();

            thread::spawn(move || {
                let group = format!("group-{g}");
                let client = format!("client-{g}");
                let mut cookie: Option<Cookie> = None;
                let mut next_id = 1u64;

                let record = |ok: bool| {
                    let counter = if ok { &successful } else { &failed };
                    counter.fetch_add(1, Ordering::Relaxed);
                };

                for _ in 0..config.pushes_per_group {
                    let mutations = (0..config.mutations_per_push)
                        .map(|_| {
                            let id = next_id;
                            next_id += 1;
                            create_todo(&client, id, &format!("todo/{g}-{id}"), "stress")
                        })
                        .collect();
                    record(
                        server
                            .handle_push(PushRequest::new(group.as_str(), mutations))
                            .is_ok(),
                    );

                    match server.handle_pull(PullRequest::new(group.as_str(), cookie)) {
                        Ok(response) => {
                            cookie = response.cookie;
                            record(true);
                        }
                        Err(_) => record(false),
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        if handle.join().is_err() {
            failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    )
}
