mod common;
mod config;
mod context;
mod keys;
mod pool;

pub mod prelude {
    /// Common hook operations for billing platform scenarios.
    ///
    /// This is a good place to start when writing a new scenario.
    pub use crate::common::*;

    pub use crate::config::RunConfig;
    pub use crate::context::BillingRunnerContext;
    pub use crate::keys::IterationKeys;
    pub use crate::pool::{warm_up_tenant_pool, TenantPool};

    /// Re-export of the `loadcell_runner` prelude.
    ///
    /// For convenience, so that scenarios can depend on a single crate for the runner.
    pub use loadcell_runner::prelude::*;

    /// Re-export of the instrumented client for convenience.
    pub use billing_client_instrumented::prelude::*;
}
