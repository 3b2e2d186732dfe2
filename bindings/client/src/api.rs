use async_trait::async_trait;

use crate::error::ClientError;
use crate::response::ApiResponse;
use crate::types::{
    CreateTenantRequest, GenerateInvoiceRequest, InvoiceGenerated, RateUsageRequest, RatedAmount,
    SettlementOutcome, TenantCreated, UsageEventRequest,
};

/// The client-side contract of the billing platform, one method per endpoint the harness
/// exercises.
///
/// [crate::client::PlatformClient] is the production implementation. The trait exists so pool
/// warm-up and workflow logic can be exercised against a stub without a running platform.
#[async_trait]
pub trait BillingApi: Send + Sync {
    async fn create_tenant(
        &self,
        request: &CreateTenantRequest,
    ) -> Result<ApiResponse<TenantCreated>, ClientError>;

    async fn ingest_usage(
        &self,
        tenant: &str,
        request: &UsageEventRequest,
    ) -> Result<ApiResponse<serde_json::Value>, ClientError>;

    async fn usage_total(
        &self,
        tenant: &str,
        customer: &str,
        metric: &str,
    ) -> Result<ApiResponse<serde_json::Value>, ClientError>;

    async fn rate_usage(
        &self,
        tenant: &str,
        request: &RateUsageRequest,
    ) -> Result<ApiResponse<RatedAmount>, ClientError>;

    async fn generate_invoice(
        &self,
        tenant: &str,
        request: &GenerateInvoiceRequest,
    ) -> Result<ApiResponse<InvoiceGenerated>, ClientError>;

    async fn generate_and_settle(
        &self,
        tenant: &str,
        request: &GenerateInvoiceRequest,
    ) -> Result<ApiResponse<SettlementOutcome>, ClientError>;

    async fn get_invoice(
        &self,
        tenant: &str,
        invoice_id: &str,
    ) -> Result<ApiResponse<serde_json::Value>, ClientError>;
}
