use billing_client_instrumented::prelude::{BillingApi, CreateTenantRequest};

use crate::config::RunConfig;

/// The set of tenants that measured traffic is spread across.
///
/// Built once during warm-up and frozen before any agent starts, then shared read-only. Nothing
/// may mutate the pool after that point; the lock-free sharing model depends on it.
#[derive(Clone, Debug, Default)]
pub struct TenantPool {
    tenants: Vec<String>,
}

impl TenantPool {
    pub fn new(tenants: Vec<String>) -> Self {
        Self { tenants }
    }

    pub fn len(&self) -> usize {
        self.tenants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tenants.is_empty()
    }

    pub fn tenants(&self) -> &[String] {
        &self.tenants
    }

    /// Deterministic round-robin selection: `(iteration + agent) mod len`.
    ///
    /// Each agent walks the whole pool over `len` iterations; the agent index offsets the walk
    /// so concurrent agents start from different tenants instead of hot-spotting one.
    pub fn select(&self, iteration: u64, agent_index: usize) -> Option<&str> {
        if self.tenants.is_empty() {
            return None;
        }

        let index = (iteration + agent_index as u64) % self.tenants.len() as u64;
        self.tenants.get(index as usize).map(String::as_str)
    }
}

/// Provision the tenant pool, retrying each slot with linear backoff.
///
/// A slot whose attempts are exhausted is abandoned rather than failing the warm-up; only the
/// final count matters. Falling short of `min_pool_size` is fatal: a run over an
/// under-provisioned pool would produce statistically meaningless results, so no measured
/// traffic is generated at all.
pub async fn warm_up_tenant_pool<A>(
    api: &A,
    config: &RunConfig,
    run_seed: &str,
) -> anyhow::Result<TenantPool>
where
    A: BillingApi + ?Sized,
{
    log::info!(
        "Warming up a pool of {} tenants (minimum {})",
        config.pool_size,
        config.min_pool_size
    );

    let mut tenants = Vec::with_capacity(config.pool_size);
    for slot in 0..config.pool_size {
        let display_name = format!("Perf Tenant Pool {}-{}", run_seed, slot);
        match create_tenant_with_retry(api, config, &display_name).await {
            Some(tenant_code) => tenants.push(tenant_code),
            None => log::warn!(
                "Abandoning tenant slot {} after {} attempts",
                slot,
                config.create_tenant_retries
            ),
        }
    }

    if tenants.len() < config.min_pool_size {
        anyhow::bail!(
            "Tenant pool initialization failed: created={}, required={}",
            tenants.len(),
            config.min_pool_size
        );
    }

    log::info!("Tenant pool ready with {} tenants", tenants.len());
    Ok(TenantPool::new(tenants))
}

async fn create_tenant_with_retry<A>(
    api: &A,
    config: &RunConfig,
    display_name: &str,
) -> Option<String>
where
    A: BillingApi + ?Sized,
{
    for attempt in 1..=config.create_tenant_retries {
        if let Some(tenant_code) = try_create_tenant(api, display_name).await {
            return Some(tenant_code);
        }

        if attempt < config.create_tenant_retries {
            // Linear backoff to ride out transient overload without hammering the service.
            tokio::time::sleep(config.retry_backoff * attempt as u32).await;
        }
    }

    None
}

/// One creation attempt. Anything other than a 201 carrying a non-empty tenant code is a failed
/// attempt, not an error.
async fn try_create_tenant<A>(api: &A, display_name: &str) -> Option<String>
where
    A: BillingApi + ?Sized,
{
    let request = CreateTenantRequest {
        display_name: display_name.to_string(),
    };

    match api.create_tenant(&request).await {
        Ok(response) if response.is_status(201) => response
            .body
            .as_ref()
            .and_then(|body| body.usable_tenant_code())
            .map(str::to_string),
        Ok(response) => {
            log::debug!("Tenant creation rejected with status {}", response.status);
            None
        }
        Err(e) => {
            log::debug!("Tenant creation attempt failed: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use billing_client_instrumented::prelude::{
        ApiResponse, ClientError, GenerateInvoiceRequest, InvoiceGenerated, RateUsageRequest,
        RatedAmount, SettlementOutcome, TenantCreated, UsageEventRequest,
    };
    use loadcell_instruments::prelude::SloTargets;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    /// How a stubbed tenant slot behaves across attempts.
    #[derive(Clone, Copy)]
    enum SlotPlan {
        /// Succeed after this many failed attempts.
        SucceedAfter(usize),
        /// Fail every attempt.
        AlwaysFail,
        /// Answer 201 but with an empty tenant code.
        EmptyCode,
    }

    struct StubDirectory {
        plan: Vec<SlotPlan>,
        attempts: Mutex<HashMap<usize, usize>>,
    }

    impl StubDirectory {
        fn new(plan: Vec<SlotPlan>) -> Self {
            Self {
                plan,
                attempts: Mutex::new(HashMap::new()),
            }
        }

        fn attempts_for(&self, slot: usize) -> usize {
            self.attempts.lock().unwrap().get(&slot).copied().unwrap_or(0)
        }
    }

    #[async_trait]
    impl BillingApi for StubDirectory {
        async fn create_tenant(
            &self,
            request: &CreateTenantRequest,
        ) -> Result<ApiResponse<TenantCreated>, ClientError> {
            let slot: usize = request
                .display_name
                .rsplit('-')
                .next()
                .and_then(|n| n.parse().ok())
                .expect("display name should end with the slot index");

            let attempt = {
                let mut attempts = self.attempts.lock().unwrap();
                let entry = attempts.entry(slot).or_insert(0);
                *entry += 1;
                *entry
            };

            let response = match self.plan[slot] {
                SlotPlan::SucceedAfter(failures) if attempt > failures => ApiResponse::new(
                    201,
                    Some(TenantCreated {
                        tenant_code: Some(format!("tenant-{slot}")),
                    }),
                ),
                SlotPlan::EmptyCode => ApiResponse::new(
                    201,
                    Some(TenantCreated {
                        tenant_code: Some(String::new()),
                    }),
                ),
                _ => ApiResponse::new(503, None),
            };

            Ok(response)
        }

        async fn ingest_usage(
            &self,
            _tenant: &str,
            _request: &UsageEventRequest,
        ) -> Result<ApiResponse<serde_json::Value>, ClientError> {
            unreachable!("not exercised by pool tests")
        }

        async fn usage_total(
            &self,
            _tenant: &str,
            _customer: &str,
            _metric: &str,
        ) -> Result<ApiResponse<serde_json::Value>, ClientError> {
            unreachable!("not exercised by pool tests")
        }

        async fn rate_usage(
            &self,
            _tenant: &str,
            _request: &RateUsageRequest,
        ) -> Result<ApiResponse<RatedAmount>, ClientError> {
            unreachable!("not exercised by pool tests")
        }

        async fn generate_invoice(
            &self,
            _tenant: &str,
            _request: &GenerateInvoiceRequest,
        ) -> Result<ApiResponse<InvoiceGenerated>, ClientError> {
            unreachable!("not exercised by pool tests")
        }

        async fn generate_and_settle(
            &self,
            _tenant: &str,
            _request: &GenerateInvoiceRequest,
        ) -> Result<ApiResponse<SettlementOutcome>, ClientError> {
            unreachable!("not exercised by pool tests")
        }

        async fn get_invoice(
            &self,
            _tenant: &str,
            _invoice_id: &str,
        ) -> Result<ApiResponse<serde_json::Value>, ClientError> {
            unreachable!("not exercised by pool tests")
        }
    }

    fn config(pool_size: usize, min_pool_size: usize) -> RunConfig {
        RunConfig {
            tenant_base_url: "http://localhost:8081".to_string(),
            usage_base_url: "http://localhost:8082".to_string(),
            billing_base_url: "http://localhost:8083".to_string(),
            invoice_base_url: "http://localhost:8084".to_string(),
            auth_token: "dev-admin-token".to_string(),
            agents: 1,
            duration: Duration::from_secs(60),
            pool_size,
            min_pool_size,
            create_tenant_retries: 3,
            retry_backoff: Duration::ZERO,
            slo: SloTargets {
                max_p95_ms: 300.0,
                max_error_rate: 0.01,
            },
        }
    }

    #[tokio::test]
    async fn full_pool_on_first_attempts() {
        let api = StubDirectory::new(vec![SlotPlan::SucceedAfter(0); 5]);

        let pool = warm_up_tenant_pool(&api, &config(5, 5), "seed").await.unwrap();

        assert_eq!(pool.len(), 5);
        for slot in 0..5 {
            assert_eq!(api.attempts_for(slot), 1, "no retries should be consumed");
        }
    }

    #[tokio::test]
    async fn abandoned_slots_do_not_fail_a_sufficient_pool() {
        let api = StubDirectory::new(vec![
            SlotPlan::AlwaysFail,
            SlotPlan::AlwaysFail,
            SlotPlan::SucceedAfter(0),
            SlotPlan::SucceedAfter(0),
            SlotPlan::SucceedAfter(0),
        ]);

        let pool = warm_up_tenant_pool(&api, &config(5, 3), "seed").await.unwrap();

        assert_eq!(pool.len(), 3);
        assert_eq!(
            pool.tenants(),
            &["tenant-2".to_string(), "tenant-3".to_string(), "tenant-4".to_string()]
        );
        // Exhausted slots stop at the retry bound.
        assert_eq!(api.attempts_for(0), 3);
        assert_eq!(api.attempts_for(1), 3);
    }

    #[tokio::test]
    async fn underfilled_pool_is_fatal() {
        let api = StubDirectory::new(vec![
            SlotPlan::AlwaysFail,
            SlotPlan::AlwaysFail,
            SlotPlan::SucceedAfter(0),
            SlotPlan::SucceedAfter(0),
            SlotPlan::SucceedAfter(0),
        ]);

        let result = warm_up_tenant_pool(&api, &config(5, 4), "seed").await;

        let message = result.unwrap_err().to_string();
        assert!(message.contains("created=3"));
        assert!(message.contains("required=4"));
    }

    #[tokio::test]
    async fn a_slot_recovers_within_the_retry_bound() {
        let api = StubDirectory::new(vec![SlotPlan::SucceedAfter(2)]);

        let pool = warm_up_tenant_pool(&api, &config(1, 1), "seed").await.unwrap();

        assert_eq!(pool.len(), 1);
        assert_eq!(api.attempts_for(0), 3);
    }

    #[tokio::test]
    async fn an_empty_tenant_code_is_a_failed_attempt() {
        let api = StubDirectory::new(vec![SlotPlan::EmptyCode]);

        let result = warm_up_tenant_pool(&api, &config(1, 1), "seed").await;

        assert!(result.is_err());
        assert_eq!(api.attempts_for(0), 3);
    }

    #[test]
    fn round_robin_visits_every_tenant_exactly_once() {
        let pool = TenantPool::new((0..5).map(|n| format!("tenant-{n}")).collect());

        let mut visited = std::collections::HashSet::new();
        for iteration in 0..5u64 {
            visited.insert(pool.select(iteration, 0).unwrap().to_string());
        }

        assert_eq!(visited.len(), 5);
    }

    #[test]
    fn agent_index_offsets_the_walk() {
        let pool = TenantPool::new((0..5).map(|n| format!("tenant-{n}")).collect());

        assert_eq!(pool.select(0, 0), Some("tenant-0"));
        assert_eq!(pool.select(0, 2), Some("tenant-2"));
        assert_eq!(pool.select(4, 2), Some("tenant-1"));
    }

    #[test]
    fn selection_from_an_empty_pool_is_none() {
        let pool = TenantPool::default();

        assert_eq!(pool.select(0, 0), None);
    }
}
