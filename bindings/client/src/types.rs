use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTenantRequest {
    pub display_name: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TenantCreated {
    pub tenant_code: Option<String>,
}

impl TenantCreated {
    /// The tenant identifier, if the service returned a usable one.
    pub fn usable_tenant_code(&self) -> Option<&str> {
        self.tenant_code
            .as_deref()
            .filter(|code| !code.is_empty())
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageEventRequest {
    pub tenant_id: String,
    pub customer_id: String,
    pub idempotency_key: String,
    pub metric_code: String,
    pub quantity: u64,
    pub occurred_at: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateUsageRequest {
    pub tenant_id: String,
    pub customer_id: String,
    pub metric_code: String,
    pub quantity: u64,
    pub unit_price: f64,
    pub currency: String,
}

/// Rating response. Only the presence of the total matters to the harness; the amount itself is
/// billing domain behaviour that other suites cover.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RatedAmount {
    pub total_amount: Option<serde_json::Value>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateInvoiceRequest {
    pub tenant_id: String,
    pub customer_id: String,
    pub billing_period: String,
    pub currency: String,
    pub line_amounts: Vec<f64>,
    pub idempotency_key: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InvoiceGenerated {
    pub invoice_id: Option<String>,
}

impl InvoiceGenerated {
    pub fn usable_invoice_id(&self) -> Option<&str> {
        self.invoice_id.as_deref().filter(|id| !id.is_empty())
    }
}

/// Result of the orchestrated generate-and-settle saga, as observed by the client: one nested
/// object per downstream service, each optional because the saga reports partial progress.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettlementOutcome {
    pub invoice: Option<InvoicePart>,
    pub payment: Option<PaymentPart>,
    pub settlement: Option<SettlementPart>,
}

impl SettlementOutcome {
    pub fn invoice_id(&self) -> Option<&str> {
        self.invoice.as_ref()?.invoice_id.as_deref()
    }

    pub fn transaction_id(&self) -> Option<&str> {
        self.payment.as_ref()?.transaction_id.as_deref()
    }

    pub fn payment_status(&self) -> Option<&str> {
        self.payment.as_ref()?.status.as_deref()
    }

    pub fn saga_id(&self) -> Option<&str> {
        self.settlement.as_ref()?.saga_id.as_deref()
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InvoicePart {
    pub invoice_id: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaymentPart {
    pub transaction_id: Option<String>,
    pub status: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettlementPart {
    pub saga_id: Option<String>,
}
