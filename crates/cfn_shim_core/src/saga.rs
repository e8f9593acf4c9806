//! Compensation bookkeeping for multi-step side effects.
//!
//! Each completed step registers a named compensating closure; when a later
//! step fails, `unwind` runs the registered compensations in reverse order
//! so a retried Create never observes leaked partial state.

type CompensateFn<'a> = Box<dyn FnOnce() -> Result<(), String> + 'a>;

#[derive(Default)]
pub struct Compensations<'a> {
    entries: Vec<(&'static str, CompensateFn<'a>)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompensationOutcome {
    pub step: &'static str,
    pub error: Option<String>,
}

impl CompensationOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UnwindReport {
    pub outcomes: Vec<CompensationOutcome>,
}

impl UnwindReport {
    pub fn fully_compensated(&self) -> bool {
        self.outcomes.iter().all(CompensationOutcome::succeeded)
    }

    /// Renders the report for a callback `Reason` string.
    pub fn summary(&self) -> String {
        if self.outcomes.is_empty() {
            return "no side effects to roll back".to_string();
        }

        let parts: Vec<String> = self
            .outcomes
            .iter()
            .map(|outcome| match &outcome.error {
                None => format!("{} rolled back", outcome.step),
                Some(error) => format!("{} rollback failed: {error}", outcome.step),
            })
            .collect();
        parts.join("; ")
    }
}

impl<'a> Compensations<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the compensation for a step that just completed.
    pub fn push(
        &mut self,
        step: &'static str,
        compensate: impl FnOnce() -> Result<(), String> + 'a,
    ) {
        self.entries.push((step, Box::new(compensate)));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Runs all registered compensations in reverse registration order.
    /// Every compensation is attempted even when an earlier one fails.
    pub fn unwind(self) -> UnwindReport {
        let mut outcomes = Vec::with_capacity(self.entries.len());
        for (step, compensate) in self.entries.into_iter().rev() {
            outcomes.push(CompensationOutcome {
                step,
                error: compensate().err(),
            });
        }
        UnwindReport { outcomes }
    }

    /// Drops the log without running anything; the action committed.
    pub fn discard(self) {}
}
