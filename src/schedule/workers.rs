use crate::foundation::core::OwnerId;
use crate::foundation::error::{DiffuseError, DiffuseResult};
use crate::host::ShadowSurface;
use std::sync::mpsc;
use std::time::Duration;

/// A finished build, posted back to the engine's completion channel.
pub(crate) struct BuildOutcome {
    pub(crate) owner: OwnerId,
    /// Owner generation the build was dispatched at; the engine discards the
    /// surface when the owner has moved on since.
    pub(crate) generation: u64,
    pub(crate) surface: Option<ShadowSurface>,
}

/// Rayon pool running shadow builds, with an mpsc channel carrying outcomes
/// back to the thread that ticks the engine.
pub(crate) struct WorkerPool {
    pool: rayon::ThreadPool,
    tx: mpsc::Sender<BuildOutcome>,
    rx: mpsc::Receiver<BuildOutcome>,
}

impl WorkerPool {
    /// Build the pool. `threads: None` uses rayon's default sizing.
    pub(crate) fn new(threads: Option<usize>) -> DiffuseResult<Self> {
        if let Some(n) = threads
            && n == 0
        {
            return Err(DiffuseError::validation(
                "worker 'threads' must be >= 1 when set",
            ));
        }
        let mut builder = rayon::ThreadPoolBuilder::new();
        if let Some(n) = threads {
            builder = builder.num_threads(n);
        }
        let pool = builder
            .build()
            .map_err(|e| DiffuseError::schedule(format!("failed to build worker pool: {e}")))?;
        let (tx, rx) = mpsc::channel();
        Ok(Self { pool, tx, rx })
    }

    /// Run a build on a worker thread and post its outcome.
    pub(crate) fn submit(&self, job: impl FnOnce() -> BuildOutcome + Send + 'static) {
        let tx = self.tx.clone();
        self.pool.spawn(move || {
            // The receiver only disappears when the engine is being dropped;
            // the outcome is moot then.
            let _ = tx.send(job());
        });
    }

    /// Next finished build, if one has already landed.
    pub(crate) fn try_recv(&self) -> Option<BuildOutcome> {
        self.rx.try_recv().ok()
    }

    /// Block up to `timeout` for a finished build.
    pub(crate) fn recv_timeout(&self, timeout: Duration) -> DiffuseResult<BuildOutcome> {
        self.rx.recv_timeout(timeout).map_err(|e| match e {
            mpsc::RecvTimeoutError::Timeout => {
                DiffuseError::schedule("timed out waiting for a shadow build")
            }
            mpsc::RecvTimeoutError::Disconnected => {
                DiffuseError::schedule("worker channel disconnected unexpectedly")
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(owner: u64) -> BuildOutcome {
        BuildOutcome {
            owner: OwnerId::from_raw(owner),
            generation: 1,
            surface: None,
        }
    }

    #[test]
    fn zero_threads_is_rejected() {
        assert!(WorkerPool::new(Some(0)).is_err());
        assert!(WorkerPool::new(Some(1)).is_ok());
    }

    #[test]
    fn submitted_jobs_post_outcomes() {
        let pool = WorkerPool::new(Some(2)).unwrap();
        for n in 0..4u64 {
            pool.submit(move || outcome(n));
        }
        let mut seen = Vec::new();
        for _ in 0..4 {
            let out = pool.recv_timeout(Duration::from_secs(5)).unwrap();
            seen.push(out.owner);
        }
        seen.sort();
        let want: Vec<_> = (0..4).map(OwnerId::from_raw).collect();
        assert_eq!(seen, want);
        assert!(pool.try_recv().is_none());
    }
}
