use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use loadcell_instruments::prelude::{OperationRecord, Reporter};
use serde::de::DeserializeOwned;

use crate::api::BillingApi;
use crate::error::ClientError;
use crate::response::ApiResponse;
use crate::types::{
    CreateTenantRequest, GenerateInvoiceRequest, InvoiceGenerated, RateUsageRequest, RatedAmount,
    SettlementOutcome, TenantCreated, UsageEventRequest,
};

const TENANT_HEADER: &str = "X-Tenant-Id";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Base URLs of the four billing platform services.
#[derive(Clone, Debug)]
pub struct ServiceEndpoints {
    tenant: String,
    usage: String,
    billing: String,
    invoice: String,
}

impl ServiceEndpoints {
    pub fn new(
        tenant: impl Into<String>,
        usage: impl Into<String>,
        billing: impl Into<String>,
        invoice: impl Into<String>,
    ) -> Self {
        Self {
            tenant: normalise(tenant.into()),
            usage: normalise(usage.into()),
            billing: normalise(billing.into()),
            invoice: normalise(invoice.into()),
        }
    }
}

fn normalise(mut base: String) -> String {
    while base.ends_with('/') {
        base.pop();
    }
    base
}

/// HTTP client for the billing platform with per-request instrumentation.
///
/// Every call is recorded to the shared [Reporter] under a stable operation id. A request is
/// recorded as an error when the transport fails or the service answers 4xx/5xx; response
/// bodies that fail to parse are recorded as successful requests with an absent body.
pub struct PlatformClient {
    http: reqwest::Client,
    endpoints: ServiceEndpoints,
    auth_token: String,
    reporter: Arc<Reporter>,
}

impl PlatformClient {
    pub fn new(
        endpoints: ServiceEndpoints,
        auth_token: impl Into<String>,
        reporter: Arc<Reporter>,
    ) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            endpoints,
            auth_token: auth_token.into(),
            reporter,
        })
    }

    fn post(&self, url: String, tenant: Option<&str>) -> reqwest::RequestBuilder {
        self.request(self.http.post(url), tenant)
    }

    fn get(&self, url: String, tenant: Option<&str>) -> reqwest::RequestBuilder {
        self.request(self.http.get(url), tenant)
    }

    fn request(
        &self,
        mut builder: reqwest::RequestBuilder,
        tenant: Option<&str>,
    ) -> reqwest::RequestBuilder {
        builder = builder.bearer_auth(&self.auth_token);
        if let Some(tenant) = tenant {
            builder = builder.header(TENANT_HEADER, tenant);
        }
        builder
    }

    /// Issue the request and record the outcome. The operation is timed from just before the
    /// request is sent until the full body has been received.
    async fn execute<T: DeserializeOwned>(
        &self,
        operation_id: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<ApiResponse<T>, ClientError> {
        let record = OperationRecord::new(operation_id);

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                self.reporter.add_operation(record.finish(true));
                log::debug!("{operation_id} transport failure: {e}");
                return Err(ClientError::Transport(e));
            }
        };

        let status = response.status();
        let is_error = status.is_client_error() || status.is_server_error();

        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                self.reporter.add_operation(record.finish(true));
                log::debug!("{operation_id} failed reading response body: {e}");
                return Err(ClientError::Transport(e));
            }
        };

        self.reporter.add_operation(record.finish(is_error));

        Ok(ApiResponse::new(
            status.as_u16(),
            serde_json::from_slice(&bytes).ok(),
        ))
    }
}

#[async_trait]
impl BillingApi for PlatformClient {
    async fn create_tenant(
        &self,
        request: &CreateTenantRequest,
    ) -> Result<ApiResponse<TenantCreated>, ClientError> {
        let url = format!("{}/api/v1/tenants", self.endpoints.tenant);
        self.execute("tenant_create", self.post(url, None).json(request))
            .await
    }

    async fn ingest_usage(
        &self,
        tenant: &str,
        request: &UsageEventRequest,
    ) -> Result<ApiResponse<serde_json::Value>, ClientError> {
        let url = format!("{}/api/v1/usage/events", self.endpoints.usage);
        self.execute("usage_ingest", self.post(url, Some(tenant)).json(request))
            .await
    }

    async fn usage_total(
        &self,
        tenant: &str,
        customer: &str,
        metric: &str,
    ) -> Result<ApiResponse<serde_json::Value>, ClientError> {
        let url = format!(
            "{}/api/v1/usage/totals/{}/{}/{}",
            self.endpoints.usage, tenant, customer, metric
        );
        self.execute("usage_total", self.get(url, Some(tenant))).await
    }

    async fn rate_usage(
        &self,
        tenant: &str,
        request: &RateUsageRequest,
    ) -> Result<ApiResponse<RatedAmount>, ClientError> {
        let url = format!("{}/api/v1/billing/rate", self.endpoints.billing);
        self.execute("billing_rate", self.post(url, Some(tenant)).json(request))
            .await
    }

    async fn generate_invoice(
        &self,
        tenant: &str,
        request: &GenerateInvoiceRequest,
    ) -> Result<ApiResponse<InvoiceGenerated>, ClientError> {
        let url = format!("{}/api/v1/invoices/generate", self.endpoints.invoice);
        self.execute(
            "invoice_generate",
            self.post(url, Some(tenant)).json(request),
        )
        .await
    }

    async fn generate_and_settle(
        &self,
        tenant: &str,
        request: &GenerateInvoiceRequest,
    ) -> Result<ApiResponse<SettlementOutcome>, ClientError> {
        let url = format!(
            "{}/api/v1/invoices/generate-and-settle",
            self.endpoints.invoice
        );
        self.execute(
            "invoice_generate_and_settle",
            self.post(url, Some(tenant)).json(request),
        )
        .await
    }

    async fn get_invoice(
        &self,
        tenant: &str,
        invoice_id: &str,
    ) -> Result<ApiResponse<serde_json::Value>, ClientError> {
        let url = format!("{}/api/v1/invoices/{}", self.endpoints.invoice, invoice_id);
        self.execute("invoice_get", self.get(url, Some(tenant))).await
    }
}

impl std::fmt::Debug for PlatformClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformClient")
            .field("endpoints", &self.endpoints)
            .finish()
    }
}
