use tracing::trace;

// Counters are emitted as trace events; a batch job has nothing to scrape them.

pub fn card_outcome(outcome: &'static str) {
    trace!(
        target = "unitsync.metrics",
        outcome = outcome,
        "card_outcome_inc"
    );
}

pub fn batch_pushed(api: &'static str, size: usize, ok: bool) {
    trace!(
        target = "unitsync.metrics",
        api = api,
        size = size as u64,
        ok = ok,
        "batch_pushed"
    );
}

pub fn stage_elapsed(stage: &'static str, elapsed_ms: u128) {
    trace!(
        target = "unitsync.metrics",
        stage = stage,
        elapsed_ms = elapsed_ms as u64,
        "stage_elapsed"
    );
}
