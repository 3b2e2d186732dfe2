use tabled::Tabled;

#[derive(Tabled)]
pub struct CheckRow {
    pub check: String,
    pub passes: usize,
    pub failures: usize,
    #[tabled(display = "percent1")]
    pub pass_rate: f64,
}

impl CheckRow {
    pub fn new(check: String, passes: usize, failures: usize) -> Self {
        let total = passes + failures;
        Self {
            check,
            passes,
            failures,
            pass_rate: if total == 0 {
                0.0
            } else {
                passes as f64 / total as f64
            },
        }
    }
}

fn percent1(n: &f64) -> String {
    format!("{:.1}%", n * 100.0)
}
