mod api;
mod client;
mod error;
mod response;
mod types;

pub mod prelude {
    pub use crate::api::BillingApi;
    pub use crate::client::{PlatformClient, ServiceEndpoints};
    pub use crate::error::ClientError;
    pub use crate::response::ApiResponse;
    pub use crate::types::{
        CreateTenantRequest, GenerateInvoiceRequest, InvoiceGenerated, InvoicePart, PaymentPart,
        RateUsageRequest, RatedAmount, SettlementOutcome, SettlementPart, TenantCreated,
        UsageEventRequest,
    };
}
