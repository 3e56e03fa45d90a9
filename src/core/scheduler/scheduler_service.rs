use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use chrono_tz::Tz;
use dashmap::DashMap;
use tokio::task::JoinHandle;

use super::schedule::TaskSchedule;

pub type TaskError = Box<dyn std::error::Error + Send + Sync>;

/// A unit of recurring background work.
///
/// The scheduler owns the loop: implementations only say *when* (`schedule`)
/// and *what* (`run`). A failed run is logged and the next run happens on the
/// normal schedule.
#[async_trait]
pub trait ScheduledTask: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    /// Re-evaluated before every sleep, so settings changes take effect on the
    /// next cycle without restarting the task.
    async fn schedule(&self) -> TaskSchedule;

    async fn run(&self) -> Result<(), TaskError>;
}

/// Snapshot of a registered task for status commands.
#[derive(Debug, Clone)]
pub struct TaskStatus {
    pub running: bool,
    pub next_run: Option<DateTime<Utc>>,
}

pub struct Scheduler {
    timezone: Tz,
    handles: DashMap<&'static str, JoinHandle<()>>,
    next_runs: Arc<DashMap<&'static str, DateTime<Utc>>>,
}

impl Scheduler {
    pub fn new(timezone: Tz) -> Self {
        Self {
            timezone,
            handles: DashMap::new(),
            next_runs: Arc::new(DashMap::new()),
        }
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Current wall-clock time in the bot's timezone.
    pub fn local_now(&self) -> NaiveDateTime {
        local_now(self.timezone)
    }

    /// Start `task` in its own tokio task. Re-registering a name replaces the
    /// previous loop.
    pub fn spawn<T: ScheduledTask>(&self, task: T) {
        let task = Arc::new(task);
        let name = task.name();
        let next_runs = Arc::clone(&self.next_runs);
        let timezone = self.timezone;

        let handle = tokio::spawn(async move {
            let schedule = task.schedule().await;
            if !schedule.runs_on_start() {
                let delay = schedule.next_delay(local_now(timezone), rand::random::<f64>());
                park(name, &next_runs, delay).await;
            }

            loop {
                run_once(Arc::clone(&task)).await;

                let schedule = task.schedule().await;
                let delay = schedule.next_delay(local_now(timezone), rand::random::<f64>());
                park(name, &next_runs, delay).await;
            }
        });

        if let Some(previous) = self.handles.insert(name, handle) {
            previous.abort();
        }
        tracing::info!(task = name, "scheduled task registered");
    }

    pub fn status(&self, name: &str) -> TaskStatus {
        let running = self
            .handles
            .get(name)
            .map(|handle| !handle.is_finished())
            .unwrap_or(false);
        let next_run = self.next_runs.get(name).map(|entry| *entry.value());

        TaskStatus { running, next_run }
    }

    /// Abort every task loop.
    pub fn shutdown(&self) {
        for entry in self.handles.iter() {
            entry.value().abort();
        }
        self.handles.clear();
        self.next_runs.clear();
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn local_now(timezone: Tz) -> NaiveDateTime {
    Utc::now().with_timezone(&timezone).naive_local()
}

async fn park(
    name: &'static str,
    next_runs: &DashMap<&'static str, DateTime<Utc>>,
    delay: Duration,
) {
    let next = Utc::now() + chrono::Duration::from_std(delay).unwrap_or_default();
    next_runs.insert(name, next);
    tracing::debug!(task = name, next_run = %next, "sleeping until next run");
    tokio::time::sleep(delay).await;
}

/// Each run gets its own tokio task so a panic only fails that run.
async fn run_once<T: ScheduledTask>(task: Arc<T>) {
    let name = task.name();
    tracing::debug!(task = name, "running scheduled task");
    match tokio::spawn(async move { task.run().await }).await {
        Ok(Ok(())) => tracing::debug!(task = name, "scheduled task finished"),
        Ok(Err(err)) => tracing::error!(task = name, error = %err, "scheduled task failed"),
        Err(join_err) if join_err.is_panic() => {
            tracing::error!(task = name, "scheduled task panicked")
        }
        Err(join_err) => tracing::warn!(task = name, error = %join_err, "scheduled task cancelled"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingTask {
        runs: Arc<AtomicU32>,
        fail: bool,
    }

    #[async_trait]
    impl ScheduledTask for CountingTask {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn schedule(&self) -> TaskSchedule {
            TaskSchedule::every(Duration::from_secs(60))
        }

        async fn run(&self) -> Result<(), TaskError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err("always fails".into())
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn interval_task_runs_immediately_and_repeats() {
        let runs = Arc::new(AtomicU32::new(0));
        let scheduler = Scheduler::new(chrono_tz::UTC);
        scheduler.spawn(CountingTask {
            runs: Arc::clone(&runs),
            fail: false,
        });

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);

        let status = scheduler.status("counting");
        assert!(status.running);
        assert!(status.next_run.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn failures_do_not_stop_the_loop() {
        let runs = Arc::new(AtomicU32::new(0));
        let scheduler = Scheduler::new(chrono_tz::UTC);
        scheduler.spawn(CountingTask {
            runs: Arc::clone(&runs),
            fail: true,
        });

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert!(scheduler.status("counting").running);
    }

    struct PanickingTask {
        runs: Arc<AtomicU32>,
    }

    #[async_trait]
    impl ScheduledTask for PanickingTask {
        fn name(&self) -> &'static str {
            "panicking"
        }

        async fn schedule(&self) -> TaskSchedule {
            TaskSchedule::every(Duration::from_secs(60))
        }

        async fn run(&self) -> Result<(), TaskError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            panic!("task blew up");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_run_is_retried_on_next_interval() {
        let runs = Arc::new(AtomicU32::new(0));
        let scheduler = Scheduler::new(chrono_tz::UTC);
        scheduler.spawn(PanickingTask {
            runs: Arc::clone(&runs),
        });

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert!(runs.load(Ordering::SeqCst) > 2);
        assert!(scheduler.status("panicking").running);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_tasks() {
        let runs = Arc::new(AtomicU32::new(0));
        let scheduler = Scheduler::new(chrono_tz::UTC);
        scheduler.spawn(CountingTask {
            runs: Arc::clone(&runs),
            fail: false,
        });
        tokio::time::sleep(Duration::from_secs(1)).await;

        scheduler.shutdown();
        tokio::time::sleep(Duration::from_secs(600)).await;

        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(!scheduler.status("counting").running);
    }

    #[tokio::test(start_paused = true)]
    async fn respawning_replaces_the_running_loop() {
        let first = Arc::new(AtomicU32::new(0));
        let second = Arc::new(AtomicU32::new(0));
        let scheduler = Scheduler::new(chrono_tz::UTC);

        scheduler.spawn(CountingTask {
            runs: Arc::clone(&first),
            fail: false,
        });
        tokio::time::sleep(Duration::from_secs(1)).await;

        scheduler.spawn(CountingTask {
            runs: Arc::clone(&second),
            fail: false,
        });
        tokio::time::sleep(Duration::from_secs(130)).await;

        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 3);
        assert!(scheduler.status("counting").running);
    }

    #[test]
    fn unknown_task_is_not_running() {
        let scheduler = Scheduler::new(chrono_tz::UTC);
        let status = scheduler.status("missing");
        assert!(!status.running);
        assert!(status.next_run.is_none());
    }
}
