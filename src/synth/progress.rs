/// Coarse progress reporting through `tracing`.
///
/// Emits an event each time another tenth of `total` is reached.
#[derive(Debug)]
pub struct ProgressLog {
    label: String,
    total: u64,
    done: u64,
    next_report: u64,
}

impl ProgressLog {
    pub fn new(label: impl Into<String>, total: u64) -> Self {
        let mut p = Self {
            label: label.into(),
            total,
            done: 0,
            next_report: 0,
        };
        p.next_report = p.step_size();
        p
    }

    fn step_size(&self) -> u64 {
        (self.total / 10).max(1)
    }

    pub fn advance(&mut self) {
        self.done += 1;
        if self.done >= self.next_report || self.done == self.total {
            let pct = if self.total == 0 {
                100
            } else {
                (self.done * 100 / self.total).min(100)
            };
            tracing::info!(label = %self.label, done = self.done, total = self.total, "{pct}%");
            self.next_report = self.done + self.step_size();
        }
    }
}
