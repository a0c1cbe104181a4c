//! Single-slot gate serialising outbound writes.

use crate::metrics;

/// Tracks whether a block write is in flight.
///
/// Only the transport's send path may close the gate and only the driver's
/// write completion may open it again.
#[derive(Debug, Default)]
pub struct WriteGate {
    busy: bool,
}

impl WriteGate {
    /// Whether a write is in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool { self.busy }

    /// Whether a new write may be issued now.
    #[must_use]
    pub fn can_send(&self) -> bool { !self.busy }

    /// Close the gate for a new write. Returns `false` if a write is already
    /// in flight, leaving the gate untouched.
    pub(crate) fn try_acquire(&mut self) -> bool {
        if self.busy {
            return false;
        }
        self.busy = true;
        metrics::set_write_busy(true);
        true
    }

    /// Open the gate after a write completion. Returns whether a write was
    /// actually in flight.
    pub(crate) fn release(&mut self) -> bool {
        let was_busy = std::mem::replace(&mut self.busy, false);
        metrics::set_write_busy(false);
        was_busy
    }
}

#[cfg(test)]
mod tests {
    use super::WriteGate;

    #[test]
    fn gate_admits_one_write_at_a_time() {
        let mut gate = WriteGate::default();
        assert!(gate.can_send());

        assert!(gate.try_acquire());
        assert!(gate.is_busy());
        assert!(!gate.try_acquire());

        assert!(gate.release());
        assert!(gate.can_send());
        assert!(!gate.release());
    }
}
