use std::sync::atomic::{AtomicU64, Ordering};

static ITERATION_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Idempotency keys for the three idempotent operations of one workflow iteration.
///
/// All three keys share a per-iteration suffix built from a process-wide sequence number, the
/// agent index and a random tail. That makes them pairwise distinct within the iteration and
/// distinct from the keys of every other iteration in the run, including concurrent ones.
#[derive(Clone, Debug)]
pub struct IterationKeys {
    suffix: String,
    pub usage: String,
    pub invoice: String,
    pub orchestration: String,
}

impl IterationKeys {
    pub fn generate(agent_index: usize) -> Self {
        let sequence = ITERATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let suffix = format!("{}-{}-{}", sequence, agent_index, nanoid::nanoid!(8));

        Self {
            usage: format!("usage-{suffix}"),
            invoice: format!("invoice-{suffix}"),
            orchestration: format!("orchestration-{suffix}"),
            suffix,
        }
    }

    /// The synthetic customer unique to this iteration.
    pub fn customer_id(&self) -> String {
        format!("cust-{}", self.suffix)
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }
}
