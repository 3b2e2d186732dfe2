use std::future::Future;

/// Bridges the thread-per-agent scheduling model onto a single shared Tokio runtime.
#[derive(Debug)]
pub struct Executor {
    runtime: tokio::runtime::Runtime,
}

impl Executor {
    pub(crate) fn new(runtime: tokio::runtime::Runtime) -> Self {
        Self { runtime }
    }

    /// Run async code in place, blocking the calling agent thread until it completes.
    ///
    /// Futures submitted here are never cancelled by the runner. The end of a run stops agents
    /// between behaviour cycles, so an iteration that is already in flight always finishes
    /// naturally.
    pub fn execute_in_place<T>(
        &self,
        fut: impl Future<Output = anyhow::Result<T>>,
    ) -> anyhow::Result<T> {
        self.runtime.block_on(fut)
    }

    /// Submit async code to run in the background.
    ///
    /// The runner does not wait for background futures before finishing; anything that must
    /// complete within a behaviour cycle belongs in [Executor::execute_in_place].
    pub fn spawn(&self, fut: impl Future<Output = ()> + Send + 'static) {
        self.runtime.spawn(fut);
    }
}
