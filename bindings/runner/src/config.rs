use std::str::FromStr;
use std::time::Duration;

use billing_client_instrumented::prelude::ServiceEndpoints;
use loadcell_instruments::prelude::SloTargets;

/// Run configuration for the billing platform scenarios.
///
/// Resolved from the environment exactly once, in `main`, then handed to the runner context and
/// passed by reference into every component that needs it. Every variable has a safe default
/// aimed at a local docker-compose deployment of the platform.
#[derive(Clone, Debug)]
pub struct RunConfig {
    pub tenant_base_url: String,
    pub usage_base_url: String,
    pub billing_base_url: String,
    pub invoice_base_url: String,
    pub auth_token: String,
    /// Number of concurrent agents generating traffic.
    pub agents: usize,
    /// Length of the measured phase.
    pub duration: Duration,
    /// Number of tenant slots to attempt during pool warm-up.
    pub pool_size: usize,
    /// Smallest pool the run is allowed to proceed with.
    pub min_pool_size: usize,
    /// Attempts per tenant slot before the slot is abandoned.
    pub create_tenant_retries: usize,
    /// Base unit for the linear backoff between tenant creation attempts.
    pub retry_backoff: Duration,
    pub slo: SloTargets,
}

impl RunConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::resolve(|name| std::env::var(name).ok())
    }

    fn resolve<G>(get: G) -> anyhow::Result<Self>
    where
        G: Fn(&str) -> Option<String>,
    {
        let agents = parse_or(&get, "PERF_VUS", 10usize)?;

        let config = Self {
            tenant_base_url: get("TENANT_BASE_URL")
                .unwrap_or_else(|| "http://localhost:8081".to_string()),
            usage_base_url: get("USAGE_BASE_URL")
                .unwrap_or_else(|| "http://localhost:8082".to_string()),
            billing_base_url: get("BILLING_BASE_URL")
                .unwrap_or_else(|| "http://localhost:8083".to_string()),
            invoice_base_url: get("INVOICE_BASE_URL")
                .unwrap_or_else(|| "http://localhost:8084".to_string()),
            auth_token: get("PERF_AUTH_TOKEN").unwrap_or_else(|| "dev-admin-token".to_string()),
            agents,
            duration: match get("PERF_DURATION") {
                Some(raw) => parse_duration(&raw)?,
                None => Duration::from_secs(180),
            },
            pool_size: parse_or(&get, "PERF_TENANT_POOL_SIZE", 200usize)?,
            min_pool_size: parse_or(&get, "PERF_MIN_TENANT_POOL_SIZE", 10usize.max(agents))?,
            create_tenant_retries: parse_or(&get, "PERF_TENANT_CREATE_RETRIES", 3usize)?,
            retry_backoff: Duration::from_millis(parse_or(
                &get,
                "PERF_TENANT_RETRY_BACKOFF_MS",
                100u64,
            )?),
            slo: SloTargets {
                max_p95_ms: parse_or(&get, "TARGET_P95_MS", 300.0f64)?,
                max_error_rate: parse_or(&get, "TARGET_ERROR_RATE", 0.01f64)?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.agents > 0, "PERF_VUS must be at least 1");
        anyhow::ensure!(
            self.min_pool_size <= self.pool_size,
            "PERF_MIN_TENANT_POOL_SIZE ({}) must not exceed PERF_TENANT_POOL_SIZE ({})",
            self.min_pool_size,
            self.pool_size
        );
        anyhow::ensure!(
            self.create_tenant_retries > 0,
            "PERF_TENANT_CREATE_RETRIES must be at least 1"
        );
        Ok(())
    }

    pub fn endpoints(&self) -> ServiceEndpoints {
        ServiceEndpoints::new(
            &self.tenant_base_url,
            &self.usage_base_url,
            &self.billing_base_url,
            &self.invoice_base_url,
        )
    }
}

fn parse_or<T, G>(get: &G, name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Invalid value {:?} for {}: {}", raw, name, e)),
        None => Ok(default),
    }
}

/// Parse a duration such as `90`, `90s`, `3m` or `1h`. A bare number is seconds.
fn parse_duration(raw: &str) -> anyhow::Result<Duration> {
    let raw = raw.trim();
    let (value, multiplier) = if let Some(value) = raw.strip_suffix('h') {
        (value, 3600)
    } else if let Some(value) = raw.strip_suffix('m') {
        (value, 60)
    } else if let Some(value) = raw.strip_suffix('s') {
        (value, 1)
    } else {
        (raw, 1)
    };

    let seconds = value
        .trim()
        .parse::<u64>()
        .map_err(|e| anyhow::anyhow!("Invalid value {:?} for PERF_DURATION: {}", raw, e))?
        * multiplier;
    anyhow::ensure!(seconds > 0, "PERF_DURATION must be at least one second");

    Ok(Duration::from_secs(seconds))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use pretty_assertions::assert_eq;

    fn resolve_with(vars: &[(&str, &str)]) -> anyhow::Result<RunConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        RunConfig::resolve(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_target_a_local_deployment() {
        let config = resolve_with(&[]).unwrap();

        assert_eq!(config.tenant_base_url, "http://localhost:8081");
        assert_eq!(config.invoice_base_url, "http://localhost:8084");
        assert_eq!(config.auth_token, "dev-admin-token");
        assert_eq!(config.agents, 10);
        assert_eq!(config.duration, Duration::from_secs(180));
        assert_eq!(config.pool_size, 200);
        assert_eq!(config.min_pool_size, 10);
        assert_eq!(config.create_tenant_retries, 3);
        assert_eq!(config.slo.max_p95_ms, 300.0);
        assert_eq!(config.slo.max_error_rate, 0.01);
    }

    #[test]
    fn min_pool_size_tracks_concurrency() {
        let config = resolve_with(&[("PERF_VUS", "50")]).unwrap();

        assert_eq!(config.min_pool_size, 50);
    }

    #[test]
    fn explicit_values_override_defaults() {
        let config = resolve_with(&[
            ("TENANT_BASE_URL", "http://tenant-service:8081"),
            ("PERF_VUS", "25"),
            ("PERF_DURATION", "5m"),
            ("PERF_TENANT_POOL_SIZE", "40"),
            ("PERF_MIN_TENANT_POOL_SIZE", "30"),
            ("TARGET_P95_MS", "150"),
        ])
        .unwrap();

        assert_eq!(config.tenant_base_url, "http://tenant-service:8081");
        assert_eq!(config.agents, 25);
        assert_eq!(config.duration, Duration::from_secs(300));
        assert_eq!(config.pool_size, 40);
        assert_eq!(config.min_pool_size, 30);
        assert_eq!(config.slo.max_p95_ms, 150.0);
    }

    #[test]
    fn minimum_above_desired_pool_size_is_rejected() {
        let result = resolve_with(&[
            ("PERF_TENANT_POOL_SIZE", "5"),
            ("PERF_MIN_TENANT_POOL_SIZE", "6"),
        ]);

        assert!(result.is_err());
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        assert!(resolve_with(&[("PERF_VUS", "many")]).is_err());
        assert!(resolve_with(&[("TARGET_ERROR_RATE", "one percent")]).is_err());
    }

    #[test]
    fn duration_suffixes() {
        assert_eq!(parse_duration("90").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("90s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("3m").unwrap(), Duration::from_secs(180));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert!(parse_duration("0").is_err());
        assert!(parse_duration("soon").is_err());
    }
}
