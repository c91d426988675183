//! Lifecycle of every pipeline declared in configuration.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use analytics_config::AnalyticsConfig;
use tokio::signal;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::{ManagerError, ManagerResult};
use crate::pipeline::Pipeline;

/// Bounded grace period a forwarder is given to finish in-flight work after a stop is
/// requested, before its pipeline task is forcibly aborted.
const STOP_GRACE_PERIOD: Duration = Duration::from_secs(10);

struct RunningPipeline {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Owns and supervises every pipeline declared in configuration.
pub struct Manager {
    config: Arc<AnalyticsConfig>,
    running: Mutex<HashMap<String, RunningPipeline>>,
}

impl Manager {
    /// Builds a manager over the given root configuration. No pipelines are started yet.
    pub fn new(config: Arc<AnalyticsConfig>) -> Self {
        Self { config, running: Mutex::new(HashMap::new()) }
    }

    /// The configuration this manager was built from.
    pub fn config(&self) -> &Arc<AnalyticsConfig> {
        &self.config
    }

    /// Starts one pipeline by name. Fails if the name is unknown, the pipeline is
    /// declared `enabled: false`, or it is already running.
    pub async fn start_pipeline(&self, name: &str) -> ManagerResult<()> {
        let spec = self
            .config
            .pipelines
            .get(name)
            .ok_or_else(|| ManagerError::UnknownPipeline(name.to_string()))?
            .clone();

        if !spec.enabled {
            return Err(ManagerError::Disabled(name.to_string()));
        }

        let mut running = self.running.lock().await;
        if let Some(entry) = running.get(name) {
            if !entry.handle.is_finished() {
                return Err(ManagerError::AlreadyRunning(name.to_string()));
            }
            // The task stopped on its own (e.g. `restart: false` after exhausting its
            // retry budget) and nobody has called `stop_pipeline` to reap it yet.
            // Treat that the same as "not running" so a fresh start is idempotent.
            running.remove(name);
        }

        let pipeline = Arc::new(Pipeline::new(self.config.clone(), spec));
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let task_name = name.to_string();

        let handle = tokio::spawn(async move {
            if let Err(e) = pipeline.run(task_cancel).await {
                error!(pipeline = %task_name, error = %e, "pipeline stopped permanently");
            }
        });

        running.insert(name.to_string(), RunningPipeline { cancel, handle });
        info!(pipeline = %name, "pipeline started");
        Ok(())
    }

    /// Stops one running pipeline by name, waiting (up to a bounded grace period) for
    /// its current attempt to finish cleanly before aborting the task outright.
    pub async fn stop_pipeline(&self, name: &str) -> ManagerResult<()> {
        let entry = {
            let mut running = self.running.lock().await;
            running.remove(name)
        };

        let Some(mut entry) = entry else {
            return Err(ManagerError::NotRunning(name.to_string()));
        };

        entry.cancel.cancel();

        if tokio::time::timeout(STOP_GRACE_PERIOD, &mut entry.handle).await.is_err() {
            warn!(pipeline = %name, "pipeline did not stop within the grace period, aborting");
            entry.handle.abort();
            let _ = entry.handle.await;
        }

        info!(pipeline = %name, "pipeline stopped");
        Ok(())
    }

    /// Starts every enabled pipeline. Individual failures are logged and collected,
    /// never fatal to the others.
    pub async fn start_pipelines(&self) -> Vec<(String, ManagerError)> {
        let names: Vec<String> = self.config.pipelines.keys().cloned().collect();
        let mut failures = Vec::new();

        for name in names {
            if let Err(e) = self.start_pipeline(&name).await {
                warn!(pipeline = %name, error = %e, "failed to start pipeline");
                failures.push((name, e));
            }
        }

        failures
    }

    /// Stops every currently running pipeline. Individual failures are logged and
    /// collected, never fatal to the others.
    pub async fn stop_pipelines(&self) -> Vec<(String, ManagerError)> {
        let names: Vec<String> = {
            let running = self.running.lock().await;
            running.keys().cloned().collect()
        };
        let mut failures = Vec::new();

        for name in names {
            if let Err(e) = self.stop_pipeline(&name).await {
                warn!(pipeline = %name, error = %e, "failed to stop pipeline");
                failures.push((name, e));
            }
        }

        failures
    }

    /// Starts every enabled pipeline, then blocks until externally cancelled, then
    /// stops everything gracefully.
    pub async fn run(&self, cancel: CancellationToken) {
        self.start_pipelines().await;
        info!("manager running; waiting for shutdown signal");

        cancel.cancelled().await;

        info!("shutdown requested, stopping pipelines");
        self.stop_pipelines().await;
    }

    /// Runs until Ctrl+C or SIGTERM is received, using the host process's own signal
    /// handling (no dependency on an externally supplied cancellation token).
    pub async fn run_until_signal(&self) {
        self.start_pipelines().await;
        info!("manager running; press Ctrl+C to stop");

        Self::wait_for_shutdown_signal().await;

        info!("shutdown signal received, stopping pipelines");
        self.stop_pipelines().await;
    }

    async fn wait_for_shutdown_signal() {
        #[cfg(unix)]
        {
            let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(e) => {
                    warn!(error = %e, "failed to register SIGTERM handler, watching only Ctrl+C");
                    let _ = signal::ctrl_c().await;
                    return;
                }
            };

            tokio::select! {
                _ = signal::ctrl_c() => info!("received Ctrl+C"),
                _ = sigterm.recv() => info!("received SIGTERM"),
            }
        }

        #[cfg(not(unix))]
        {
            let _ = signal::ctrl_c().await;
            info!("received Ctrl+C");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analytics_config::{AnalyticsConfig, PipelineSpec};
    use std::collections::HashMap as StdHashMap;

    fn config_with_pipeline(name: &str, enabled: bool) -> Arc<AnalyticsConfig> {
        let mut pipelines = StdHashMap::new();
        pipelines.insert(
            name.to_string(),
            PipelineSpec {
                name: name.to_string(),
                collect: Vec::new(),
                process: Vec::new(),
                forward: Vec::new(),
                enabled,
                restart: true,
            },
        );

        Arc::new(AnalyticsConfig {
            collectors: StdHashMap::new(),
            processors: StdHashMap::new(),
            forwarders: StdHashMap::new(),
            pipelines,
            host_config: serde_json::Value::Null,
        })
    }

    #[tokio::test]
    async fn starting_an_unknown_pipeline_fails() {
        let manager = Manager::new(config_with_pipeline("p", true));
        let err = manager.start_pipeline("nope").await.unwrap_err();
        assert!(matches!(err, ManagerError::UnknownPipeline(_)));
    }

    #[tokio::test]
    async fn starting_a_disabled_pipeline_fails() {
        let manager = Manager::new(config_with_pipeline("p", false));
        let err = manager.start_pipeline("p").await.unwrap_err();
        assert!(matches!(err, ManagerError::Disabled(_)));
    }

    #[tokio::test]
    async fn starting_twice_fails_the_second_time() {
        let manager = Manager::new(config_with_pipeline("p", true));
        manager.start_pipeline("p").await.unwrap();
        let err = manager.start_pipeline("p").await.unwrap_err();
        assert!(matches!(err, ManagerError::AlreadyRunning(_)));
        manager.stop_pipeline("p").await.unwrap();
    }

    #[tokio::test]
    async fn stopping_a_pipeline_that_is_not_running_fails() {
        let manager = Manager::new(config_with_pipeline("p", true));
        let err = manager.stop_pipeline("p").await.unwrap_err();
        assert!(matches!(err, ManagerError::NotRunning(_)));
    }

    #[tokio::test]
    async fn start_pipeline_reaps_a_task_that_finished_on_its_own() {
        let manager = Manager::new(config_with_pipeline("p", true));

        // Simulate a pipeline whose run() already returned on its own (e.g. restart:
        // false after exhausting its retry budget) without anyone calling
        // stop_pipeline to reap the entry first.
        let handle = tokio::spawn(async {});
        while !handle.is_finished() {
            tokio::task::yield_now().await;
        }
        manager
            .running
            .lock()
            .await
            .insert("p".to_string(), RunningPipeline { cancel: CancellationToken::new(), handle });

        manager.start_pipeline("p").await.unwrap();
        manager.stop_pipeline("p").await.unwrap();
    }

    /// A task that never honors cancellation forces `stop_pipeline` onto the abort
    /// path. The call must not return until that task has actually finished.
    #[tokio::test(start_paused = true)]
    async fn stop_pipeline_waits_out_an_abort_before_returning() {
        let manager = Manager::new(config_with_pipeline("p", true));

        let handle = tokio::spawn(async {
            loop {
                tokio::task::yield_now().await;
            }
        });
        let abort_handle = handle.abort_handle();
        manager
            .running
            .lock()
            .await
            .insert("p".to_string(), RunningPipeline { cancel: CancellationToken::new(), handle });

        manager.stop_pipeline("p").await.unwrap();

        assert!(abort_handle.is_finished());
    }

    #[tokio::test]
    async fn stop_then_start_again_succeeds() {
        let manager = Manager::new(config_with_pipeline("p", true));
        manager.start_pipeline("p").await.unwrap();
        manager.stop_pipeline("p").await.unwrap();
        manager.start_pipeline("p").await.unwrap();
        manager.stop_pipeline("p").await.unwrap();
    }
}
