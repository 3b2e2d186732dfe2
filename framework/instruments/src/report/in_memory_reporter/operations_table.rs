use tabled::Tabled;

use crate::OperationRecord;

#[derive(Tabled)]
pub struct OperationRow {
    pub operation_id: String,
    #[tabled(display = "float2")]
    pub avg_time_ms: f64,
    #[tabled(display = "float2")]
    pub min_time_ms: f64,
    #[tabled(display = "float2")]
    pub max_time_ms: f64,
    pub total_operations: usize,
    pub failed_operations: usize,
    #[tabled(display = "float2")]
    pub total_duration_ms: f64,
}

impl OperationRow {
    pub fn summarise(operation_id: String, records: &[&OperationRecord]) -> Self {
        let total_operations = records.len();
        let failed_operations = records.iter().filter(|record| record.is_error).count();

        let mut total_duration_micro = 0u128;
        let mut min_micro = u128::MAX;
        let mut max_micro = 0u128;
        for record in records {
            // Unfinished records carry no duration, count them as zero rather than skewing min.
            let micros = record.duration().unwrap_or_default().as_micros();
            total_duration_micro += micros;
            min_micro = min_micro.min(micros);
            max_micro = max_micro.max(micros);
        }

        if total_operations == 0 {
            min_micro = 0;
        }

        Self {
            operation_id,
            avg_time_ms: if total_operations == 0 {
                0.0
            } else {
                (total_duration_micro as f64 / total_operations as f64) / 1000.0
            },
            min_time_ms: min_micro as f64 / 1000.0,
            max_time_ms: max_micro as f64 / 1000.0,
            total_operations,
            failed_operations,
            total_duration_ms: total_duration_micro as f64 / 1000.0,
        }
    }
}

fn float2(n: &f64) -> String {
    format!("{:.2}", n)
}
