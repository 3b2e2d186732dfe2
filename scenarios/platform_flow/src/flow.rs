use std::time::Duration;

use billing_loadcell_runner::prelude::{
    ApiResponse, BillingApi, ClientError, GenerateInvoiceRequest, IterationKeys, RateUsageRequest,
    Reporter, TenantPool, UsageEventRequest,
};
use chrono::Utc;

const METRIC_CODE: &str = "api_call";
const USAGE_QUANTITY: u64 = 120;
const UNIT_PRICE: f64 = 0.05;
const CURRENCY: &str = "USD";
const BILLING_PERIOD: &str = "2026-02";
const LINE_AMOUNTS: [f64; 3] = [15.0, 20.0, 25.0];

/// Pause at the end of every iteration so agents pace like real clients instead of issuing
/// back-to-back bursts.
const PACING_PAUSE: Duration = Duration::from_millis(100);

/// One pass through the synthetic customer billing lifecycle: ingest usage, rate it, generate
/// an invoice, drive the generate-and-settle saga and read the invoice back.
///
/// Stages run in strict order and each records its checks independently. A missing
/// prerequisite skips the stages that depend on it, but the iteration itself always returns
/// `Ok`; failures surface as failed checks and errored operations, never as a crash. No
/// operation is retried within an iteration, so failure rates reflect the platform rather than
/// client-side masking.
pub async fn run_iteration(
    api: &dyn BillingApi,
    pool: &TenantPool,
    reporter: &Reporter,
    iteration: u64,
    agent_index: usize,
) -> anyhow::Result<()> {
    let keys = IterationKeys::generate(agent_index);
    let customer_id = keys.customer_id();

    // Stage 1: pick a tenant from the pool.
    let Some(tenant) = pool.select(iteration, agent_index) else {
        reporter.check("tenant_selected_from_pool", false);
        return Ok(());
    };
    reporter.check("tenant_selected_from_pool", true);

    // Stage 2: ingest one usage event, then read back the aggregated total. Acceptance is
    // asynchronous, the read-back validates that ingested usage becomes visible.
    let ingest = api
        .ingest_usage(
            tenant,
            &UsageEventRequest {
                tenant_id: tenant.to_string(),
                customer_id: customer_id.clone(),
                idempotency_key: keys.usage.clone(),
                metric_code: METRIC_CODE.to_string(),
                quantity: USAGE_QUANTITY,
                occurred_at: Utc::now().to_rfc3339(),
            },
        )
        .await;
    reporter.check("usage_ingest_accepted", status_is(&ingest, 202));

    let total = api.usage_total(tenant, &customer_id, METRIC_CODE).await;
    reporter.check("usage_total_readable", status_is(&total, 200));

    // Stage 3: rate the quantity just ingested. Only the presence of a total is asserted, the
    // amount itself is covered by the billing service's own tests.
    let rated = api
        .rate_usage(
            tenant,
            &RateUsageRequest {
                tenant_id: tenant.to_string(),
                customer_id: customer_id.clone(),
                metric_code: METRIC_CODE.to_string(),
                quantity: USAGE_QUANTITY,
                unit_price: UNIT_PRICE,
                currency: CURRENCY.to_string(),
            },
        )
        .await;
    reporter.check("billing_rate_ok", status_is(&rated, 200));
    reporter.check(
        "billing_total_amount_present",
        matches!(&rated, Ok(r) if r.body().is_some_and(|b| b.total_amount.is_some())),
    );

    // Stage 4: request asynchronous invoice generation. The identifier is carried forward to
    // the read-back stage.
    let generated = api
        .generate_invoice(
            tenant,
            &invoice_request(tenant, &customer_id, keys.invoice.clone()),
        )
        .await;
    reporter.check("invoice_generate_accepted", status_is(&generated, 202));
    let invoice_id = match &generated {
        Ok(r) => r
            .body()
            .and_then(|b| b.usable_invoice_id())
            .map(str::to_string),
        Err(_) => None,
    };
    reporter.check("invoice_id_present", invoice_id.is_some());

    // Stage 5: the orchestrated saga. Generates an invoice and drives it through payment and
    // settlement in one call, spanning the platform's full blast radius.
    let settled = api
        .generate_and_settle(
            tenant,
            &invoice_request(tenant, &customer_id, keys.orchestration.clone()),
        )
        .await;
    reporter.check("orchestration_accepted", status_is(&settled, 202));
    let outcome = match &settled {
        Ok(r) => r.body(),
        Err(_) => None,
    };
    reporter.check(
        "orchestration_invoice_present",
        outcome.and_then(|o| o.invoice_id()).is_some(),
    );
    reporter.check(
        "orchestration_payment_present",
        outcome.and_then(|o| o.transaction_id()).is_some(),
    );
    reporter.check(
        "orchestration_settlement_present",
        outcome.and_then(|o| o.saga_id()).is_some(),
    );
    let payment_status = outcome.and_then(|o| o.payment_status()).map(str::to_string);

    // Stage 6: read the invoice back. Only possible when stage 4 yielded an identifier, and
    // skipping it is not a failure.
    if let Some(invoice_id) = &invoice_id {
        let fetched = api.get_invoice(tenant, invoice_id).await;
        reporter.check("invoice_readable", status_is(&fetched, 200));
    }

    // Stage 7: the saga must have driven payment to a resolved status.
    reporter.check(
        "payment_status_resolved",
        payment_status.as_deref().is_some_and(|status| !status.is_empty()),
    );
    tokio::time::sleep(PACING_PAUSE).await;

    Ok(())
}

fn status_is<T>(response: &Result<ApiResponse<T>, ClientError>, expected: u16) -> bool {
    matches!(response, Ok(r) if r.is_status(expected))
}

fn invoice_request(
    tenant: &str,
    customer_id: &str,
    idempotency_key: String,
) -> GenerateInvoiceRequest {
    GenerateInvoiceRequest {
        tenant_id: tenant.to_string(),
        customer_id: customer_id.to_string(),
        billing_period: BILLING_PERIOD.to_string(),
        currency: CURRENCY.to_string(),
        line_amounts: LINE_AMOUNTS.to_vec(),
        idempotency_key,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use billing_loadcell_runner::prelude::{
        CheckRecord, CreateTenantRequest, InvoiceGenerated, InvoicePart, OperationRecord,
        PaymentPart, RatedAmount, ReportCollector, ReportConfig, SettlementOutcome,
        SettlementPart, TenantCreated,
    };
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct CheckLog {
        checks: Arc<Mutex<Vec<CheckRecord>>>,
    }

    impl CheckLog {
        fn passed(&self, name: &str) -> Option<bool> {
            self.checks
                .lock()
                .unwrap()
                .iter()
                .find(|check| check.name == name)
                .map(|check| check.passed)
        }

        fn names(&self) -> Vec<String> {
            self.checks
                .lock()
                .unwrap()
                .iter()
                .map(|check| check.name.clone())
                .collect()
        }
    }

    impl ReportCollector for CheckLog {
        fn add_operation(&mut self, _operation_record: &OperationRecord) {}

        fn add_check(&mut self, check: &CheckRecord) {
            self.checks.lock().unwrap().push(check.clone());
        }

        fn finalize(&self) {}
    }

    /// A scripted platform: every endpoint answers with a fixed response.
    struct StubPlatform {
        ingest_status: u16,
        total_status: u16,
        rate_status: u16,
        rate_body: Option<RatedAmount>,
        generate_status: u16,
        generate_body: Option<InvoiceGenerated>,
        settle_status: u16,
        settle_body: Option<SettlementOutcome>,
        invoice_get_status: u16,
        fetched_invoices: Mutex<Vec<String>>,
    }

    impl StubPlatform {
        fn healthy() -> Self {
            Self {
                ingest_status: 202,
                total_status: 200,
                rate_status: 200,
                rate_body: Some(RatedAmount {
                    total_amount: Some(serde_json::json!(17.0)),
                }),
                generate_status: 202,
                generate_body: Some(InvoiceGenerated {
                    invoice_id: Some("inv-123".to_string()),
                }),
                settle_status: 202,
                settle_body: Some(SettlementOutcome {
                    invoice: Some(InvoicePart {
                        invoice_id: Some("inv-124".to_string()),
                    }),
                    payment: Some(PaymentPart {
                        transaction_id: Some("txn-9".to_string()),
                        status: Some("SETTLED".to_string()),
                    }),
                    settlement: Some(SettlementPart {
                        saga_id: Some("saga-4".to_string()),
                    }),
                }),
                invoice_get_status: 200,
                fetched_invoices: Mutex::new(Vec::new()),
            }
        }

        fn degraded() -> Self {
            Self {
                ingest_status: 500,
                total_status: 500,
                rate_status: 500,
                rate_body: None,
                generate_status: 500,
                generate_body: None,
                settle_status: 500,
                settle_body: None,
                invoice_get_status: 500,
                fetched_invoices: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl BillingApi for StubPlatform {
        async fn create_tenant(
            &self,
            _request: &CreateTenantRequest,
        ) -> Result<ApiResponse<TenantCreated>, ClientError> {
            unreachable!("the workflow never creates tenants")
        }

        async fn ingest_usage(
            &self,
            _tenant: &str,
            _request: &UsageEventRequest,
        ) -> Result<ApiResponse<serde_json::Value>, ClientError> {
            Ok(ApiResponse::new(self.ingest_status, None))
        }

        async fn usage_total(
            &self,
            _tenant: &str,
            _customer: &str,
            _metric: &str,
        ) -> Result<ApiResponse<serde_json::Value>, ClientError> {
            Ok(ApiResponse::new(self.total_status, None))
        }

        async fn rate_usage(
            &self,
            _tenant: &str,
            _request: &RateUsageRequest,
        ) -> Result<ApiResponse<RatedAmount>, ClientError> {
            Ok(ApiResponse::new(self.rate_status, self.rate_body.clone()))
        }

        async fn generate_invoice(
            &self,
            _tenant: &str,
            _request: &GenerateInvoiceRequest,
        ) -> Result<ApiResponse<InvoiceGenerated>, ClientError> {
            Ok(ApiResponse::new(
                self.generate_status,
                self.generate_body.clone(),
            ))
        }

        async fn generate_and_settle(
            &self,
            _tenant: &str,
            _request: &GenerateInvoiceRequest,
        ) -> Result<ApiResponse<SettlementOutcome>, ClientError> {
            Ok(ApiResponse::new(
                self.settle_status,
                self.settle_body.clone(),
            ))
        }

        async fn get_invoice(
            &self,
            _tenant: &str,
            invoice_id: &str,
        ) -> Result<ApiResponse<serde_json::Value>, ClientError> {
            self.fetched_invoices
                .lock()
                .unwrap()
                .push(invoice_id.to_string());
            Ok(ApiResponse::new(self.invoice_get_status, None))
        }
    }

    fn test_reporter() -> (Reporter, CheckLog) {
        let log = CheckLog::default();
        let reporter = ReportConfig::new("test-run")
            .with_collector(Box::new(log.clone()))
            .init();
        (reporter, log)
    }

    fn single_tenant_pool() -> TenantPool {
        TenantPool::new(vec!["tenant-0".to_string()])
    }

    #[tokio::test]
    async fn healthy_platform_passes_every_stage_check() {
        let api = StubPlatform::healthy();
        let (reporter, log) = test_reporter();

        run_iteration(&api, &single_tenant_pool(), &reporter, 0, 0)
            .await
            .unwrap();

        for name in [
            "tenant_selected_from_pool",
            "usage_ingest_accepted",
            "usage_total_readable",
            "billing_rate_ok",
            "billing_total_amount_present",
            "invoice_generate_accepted",
            "invoice_id_present",
            "orchestration_accepted",
            "orchestration_invoice_present",
            "orchestration_payment_present",
            "orchestration_settlement_present",
            "invoice_readable",
            "payment_status_resolved",
        ] {
            assert_eq!(log.passed(name), Some(true), "check {name} should pass");
        }

        // The read-back targets the invoice generated in stage 4, not the saga's.
        assert_eq!(
            *api.fetched_invoices.lock().unwrap(),
            vec!["inv-123".to_string()]
        );
    }

    #[tokio::test]
    async fn empty_pool_ends_the_iteration_after_stage_one() {
        let api = StubPlatform::healthy();
        let (reporter, log) = test_reporter();

        run_iteration(&api, &TenantPool::default(), &reporter, 0, 0)
            .await
            .unwrap();

        assert_eq!(log.passed("tenant_selected_from_pool"), Some(false));
        assert_eq!(log.names(), vec!["tenant_selected_from_pool".to_string()]);
    }

    #[tokio::test]
    async fn missing_invoice_id_skips_the_read_back_only() {
        let mut api = StubPlatform::healthy();
        api.generate_body = Some(InvoiceGenerated { invoice_id: None });
        let (reporter, log) = test_reporter();

        run_iteration(&api, &single_tenant_pool(), &reporter, 0, 0)
            .await
            .unwrap();

        assert_eq!(log.passed("invoice_generate_accepted"), Some(true));
        assert_eq!(log.passed("invoice_id_present"), Some(false));
        // No read-back happened and no check was recorded for it.
        assert!(api.fetched_invoices.lock().unwrap().is_empty());
        assert_eq!(log.passed("invoice_readable"), None);
        // The stages after the gap still ran.
        assert_eq!(log.passed("payment_status_resolved"), Some(true));
    }

    #[tokio::test]
    async fn an_empty_invoice_id_is_treated_as_missing() {
        let mut api = StubPlatform::healthy();
        api.generate_body = Some(InvoiceGenerated {
            invoice_id: Some(String::new()),
        });
        let (reporter, log) = test_reporter();

        run_iteration(&api, &single_tenant_pool(), &reporter, 0, 0)
            .await
            .unwrap();

        assert_eq!(log.passed("invoice_id_present"), Some(false));
        assert!(api.fetched_invoices.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn a_degraded_platform_fails_checks_without_crashing() {
        let api = StubPlatform::degraded();
        let (reporter, log) = test_reporter();

        run_iteration(&api, &single_tenant_pool(), &reporter, 0, 0)
            .await
            .unwrap();

        assert_eq!(log.passed("tenant_selected_from_pool"), Some(true));
        for name in [
            "usage_ingest_accepted",
            "usage_total_readable",
            "billing_rate_ok",
            "billing_total_amount_present",
            "invoice_generate_accepted",
            "invoice_id_present",
            "orchestration_accepted",
            "orchestration_invoice_present",
            "orchestration_payment_present",
            "orchestration_settlement_present",
            "payment_status_resolved",
        ] {
            assert_eq!(log.passed(name), Some(false), "check {name} should fail");
        }
    }

    #[test]
    fn round_robin_spreads_iterations_across_the_pool() {
        let pool = TenantPool::new(vec![
            "tenant-0".to_string(),
            "tenant-1".to_string(),
            "tenant-2".to_string(),
        ]);

        let selected: Vec<_> = (0..3).map(|i| pool.select(i, 1).unwrap()).collect();

        assert_eq!(selected, vec!["tenant-1", "tenant-2", "tenant-0"]);
    }
}
