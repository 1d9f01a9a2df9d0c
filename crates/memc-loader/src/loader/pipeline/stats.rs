use memc_loader_core::NORMAL_ERR_RATE;

/// Aggregate outcome of one file.
///
/// `processed` counts successful writes; `errors` counts failed writes,
/// records with an unknown destination and lines the parser rejected.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FileStats {
    pub processed: u64,
    pub errors: u64,
}

/// What a file's statistics say about the load. Informational only: every
/// verdict leads to the same disposition.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Verdict {
    /// Nothing was processed (open failure, or no parseable records).
    Empty,
    /// `errors / processed` is below the tolerated rate.
    Acceptable { rate: f64 },
    /// `errors / processed` is at or above the tolerated rate.
    HighErrorRate { rate: f64 },
}

impl FileStats {
    /// Counts one worker outcome.
    pub fn record(&mut self, ok: bool) {
        if ok {
            self.processed += 1;
        } else {
            self.errors += 1;
        }
    }

    /// `errors / processed`, or `None` when nothing was processed.
    pub fn error_rate(&self) -> Option<f64> {
        (self.processed > 0).then(|| self.errors as f64 / self.processed as f64)
    }

    pub fn verdict(&self) -> Verdict {
        self.verdict_with(NORMAL_ERR_RATE)
    }

    pub fn verdict_with(&self, tolerated: f64) -> Verdict {
        match self.error_rate() {
            None => Verdict::Empty,
            Some(rate) if rate < tolerated => Verdict::Acceptable { rate },
            Some(rate) => Verdict::HighErrorRate { rate },
        }
    }
}
