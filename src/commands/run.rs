//! Interval driver: repeat passes until shut down

use crate::commands::sync::SyncEngine;
use crate::executor::EventSink;
use crate::types::MirrorError;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::{Builder, Runtime};
use tokio::sync::watch;
use tracing::{debug, error, warn};

/// Handle that stops a running [`Driver`] after its current pass.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }
}

/// What the loop did before it stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub passes: usize,
    pub failed_passes: usize,
}

/// Scheduling loop.
///
/// Passes run on the calling thread, one at a time. The driver's own runtime
/// only waits out the interval and listens for the shutdown signal, which is
/// observed between passes: a pass in flight always runs to completion.
pub struct Driver {
    runtime: Runtime,
    shutdown: ShutdownHandle,
    interval: Duration,
}

impl Driver {
    pub fn new(interval: Duration) -> Result<Self, MirrorError> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("dirmirror-driver")
            .enable_all()
            .build()
            .map_err(MirrorError::Io)?;
        let (tx, _rx) = watch::channel(false);

        Ok(Self {
            runtime,
            shutdown: ShutdownHandle { tx: Arc::new(tx) },
            interval,
        })
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Trigger shutdown on Ctrl-C / SIGINT.
    pub fn listen_for_ctrl_c(&self) {
        let handle = self.shutdown_handle();
        self.runtime.spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    debug!("Interrupt received, stopping after the current pass");
                    handle.trigger();
                }
                Err(e) => warn!("Cannot listen for Ctrl-C: {e}"),
            }
        });
    }

    /// Run passes every `interval` until shutdown.
    ///
    /// A failed pass is logged at ERROR and the loop carries on; the next
    /// pass re-diffs from scratch.
    pub fn run(&self, engine: &SyncEngine, sink: &dyn EventSink) -> RunSummary {
        let mut summary = RunSummary::default();
        let mut shutdown = self.shutdown.tx.subscribe();

        while !*shutdown.borrow() {
            summary.passes += 1;
            if let Err(err) = engine.run_pass(sink) {
                summary.failed_passes += 1;
                error!("Synchronization pass failed: {err}");
            }

            let stop = self
                .runtime
                .block_on(wait_for_next_pass(self.interval, &mut shutdown));
            if stop {
                break;
            }
        }

        summary
    }
}

/// Sleep for `interval`; true if shutdown fired first.
async fn wait_for_next_pass(interval: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    let fired = tokio::select! {
        _ = tokio::time::sleep(interval) => false,
        fired = async { shutdown.wait_for(|stop| *stop).await.is_ok() } => fired,
    };
    fired || *shutdown.borrow()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::SyncEvent;
    use std::fs;
    use std::thread;
    use std::time::Instant;

    struct Discard;

    impl EventSink for Discard {
        fn record(&self, _event: &SyncEvent<'_>) {}
    }

    #[test]
    fn test_shutdown_before_run_performs_no_pass() {
        let root = tempfile::tempdir().unwrap();
        let engine = SyncEngine::new(root.path().join("s"), root.path().join("r"), 1).unwrap();
        let driver = Driver::new(Duration::from_secs(3600)).unwrap();

        driver.shutdown_handle().trigger();
        let summary = driver.run(&engine, &Discard);

        assert_eq!(summary.passes, 0);
    }

    #[test]
    fn test_shutdown_interrupts_the_wait() {
        let root = tempfile::tempdir().unwrap();
        let source = root.path().join("s");
        fs::create_dir_all(&source).unwrap();
        fs::write(source.join("a.txt"), b"a").unwrap();

        let engine = SyncEngine::new(&source, root.path().join("r"), 1).unwrap();
        let driver = Driver::new(Duration::from_secs(3600)).unwrap();
        let handle = driver.shutdown_handle();

        let trigger = thread::spawn(move || {
            thread::sleep(Duration::from_millis(200));
            handle.trigger();
        });

        let started = Instant::now();
        let summary = driver.run(&engine, &Discard);
        trigger.join().unwrap();

        assert_eq!(summary, RunSummary { passes: 1, failed_passes: 0 });
        assert!(started.elapsed() < Duration::from_secs(60));
        assert!(root.path().join("r/a.txt").exists());
    }

    #[test]
    fn test_failed_pass_does_not_stop_loop() {
        let root = tempfile::tempdir().unwrap();
        let engine = SyncEngine::new(root.path().join("missing"), root.path().join("r"), 1).unwrap();
        let driver = Driver::new(Duration::from_millis(20)).unwrap();
        let handle = driver.shutdown_handle();

        let trigger = thread::spawn(move || {
            thread::sleep(Duration::from_millis(300));
            handle.trigger();
        });

        let summary = driver.run(&engine, &Discard);
        trigger.join().unwrap();

        assert!(summary.passes >= 2, "loop kept going: {summary:?}");
        assert_eq!(summary.passes, summary.failed_passes);
    }
}
