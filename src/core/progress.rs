/*
 * Defines the transport between batch loops (file adds, print merges) and
 * whatever surface displays progress. Loops report once per processed item
 * and poll for cancellation between items, so cancellation takes
 * effect at the next iteration boundary, never mid-file, and work already
 * completed is not rolled back.
 */

pub trait BatchProgress {
    /// Called once per processed item with the 1-based count, the total and
    /// the display name of the item just handled.
    fn report(&mut self, done: usize, total: usize, label: &str);

    /// Polled between items; returning `true` stops the loop before the next
    /// item is touched.
    fn is_cancelled(&self) -> bool;
}

/// No-op progress sink for non-interactive callers and tests.
pub struct SilentProgress;

impl BatchProgress for SilentProgress {
    fn report(&mut self, _done: usize, _total: usize, _label: &str) {}

    fn is_cancelled(&self) -> bool {
        false
    }
}

#[cfg(test)]
pub struct CancelAfter {
    pub after: usize,
    pub seen: usize,
}

#[cfg(test)]
impl BatchProgress for CancelAfter {
    fn report(&mut self, _done: usize, _total: usize, _label: &str) {
        self.seen += 1;
    }

    fn is_cancelled(&self) -> bool {
        self.seen >= self.after
    }
}
