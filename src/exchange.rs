//! Parameter Exchange (C3): lock-free `DDSState` publication from the
//! control core to the DDS core.
//!
//! There is no mutex on this path (§5 "Shared-resource policy"). A plain
//! double buffer addressed by an index-plus-flag pair is *not* safe here:
//! if `publish()` computes which slot is "pending" from a stale read of
//! the active index, and `acquire_active()` promotes-and-resyncs in
//! between that read and the write, the write lands in the block the DDS
//! core is currently reading and is then clobbered by the resync. So
//! instead this is the classic triple-buffer exchange: three fixed
//! blocks, and a single `shared` atomic that always names exactly one of
//! them plus a new-data bit. Each side additionally owns one buffer
//! outright (`write_index` for the control core, `read_index` for the
//! DDS core) between calls, so at any instant the three indices
//! (write/read/shared) are a permutation of `{0, 1, 2}` -- no two sides
//! ever address the same block, and the handoff is one atomic swap, not
//! a read-then-write pair that can be torn by a concurrent swap.
use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

/// The parameter block exchanged between the control core and the DDS
/// core once per buffer refill. This is exactly `dsp::SynthesisParams`
/// (signed frequency, per-channel phase offsets, amplitude, filter
/// config, phase mode, enabled) -- the DDS engine itself lives in the
/// hardware-free `dsp` crate, so the exchanged type is defined there and
/// re-exported here rather than duplicated.
pub use dsp::SynthesisParams as DDSState;

/// Set on the `shared` index whenever it names a block the control core
/// has written into but the DDS core has not yet picked up.
const NEW_DATA: u8 = 0b100;
const INDEX_MASK: u8 = 0b011;

/// Three equally sized `DDSState` blocks, plus the one atomic that names
/// the currently shared one.
///
/// # Safety
/// `Sync` is upheld because `write_index`/`read_index` are touched by
/// exactly one side each (the control core and the DDS refill task,
/// respectively), and the only block either side can name -- its own
/// write/read slot or the one named by `shared` -- is never the block
/// the other side currently owns; `shared`'s atomic swap is what hands a
/// block from one side's ownership to the other's.
pub struct ParameterExchange {
    blocks: [UnsafeCell<DDSState>; 3],
    shared: AtomicU8,
    write_index: AtomicUsize,
    read_index: AtomicUsize,
}

unsafe impl Sync for ParameterExchange {}

impl ParameterExchange {
    pub const fn new() -> Self {
        Self {
            blocks: [
                UnsafeCell::new(DDSState::silent()),
                UnsafeCell::new(DDSState::silent()),
                UnsafeCell::new(DDSState::silent()),
            ],
            // Buffer 0 starts shared (no new data), 1 is the writer's, 2 the reader's.
            shared: AtomicU8::new(0),
            write_index: AtomicUsize::new(1),
            read_index: AtomicUsize::new(2),
        }
    }

    /// Control-core side: write a new parameter block into the slot this
    /// side currently owns, then atomically exchange it for the shared
    /// slot. Safe to call repeatedly before the DDS core consumes it --
    /// only the most recent write before the next buffer boundary takes
    /// effect.
    pub fn publish(&self, state: DDSState) {
        let write_index = self.write_index.load(Ordering::Relaxed);
        // Note(unsafe): `write_index` names a block only the control core
        // ever addresses between calls to `publish` -- the DDS core only
        // reaches a block via `shared` or its own `read_index`.
        unsafe {
            *self.blocks[write_index].get() = state;
        }
        let previous = self
            .shared
            .swap(write_index as u8 | NEW_DATA, Ordering::AcqRel);
        self.write_index
            .store((previous & INDEX_MASK) as usize, Ordering::Relaxed);
    }

    /// DDS-core side: called at the start of every refill. If a publish is
    /// pending, atomically exchanges this side's owned slot for the
    /// shared one (the linearisation point, §4.3) and reads from the
    /// newly owned block; otherwise just rereads the block already owned
    /// from the last swap. Returns a copy of the active state for this
    /// buffer's synthesis.
    pub fn acquire_active(&self) -> DDSState {
        let peek = self.shared.load(Ordering::Acquire);
        if peek & NEW_DATA != 0 {
            let read_index = self.read_index.load(Ordering::Relaxed);
            let previous = self.shared.swap(read_index as u8, Ordering::AcqRel);
            self.read_index
                .store((previous & INDEX_MASK) as usize, Ordering::Relaxed);
        }
        let read_index = self.read_index.load(Ordering::Relaxed);
        // Note(unsafe): `read_index` names a block only the DDS core ever
        // addresses between calls to `acquire_active` -- the control core
        // only reaches a block via `shared` or its own `write_index`.
        unsafe { *self.blocks[read_index].get() }
    }
}

impl Default for ParameterExchange {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_silent() {
        let exchange = ParameterExchange::new();
        let state = exchange.acquire_active();
        assert!(!state.enabled);
        assert_eq!(state.amplitude, 0.0);
    }

    #[test]
    fn publish_takes_effect_on_next_acquire() {
        let exchange = ParameterExchange::new();
        let mut state = DDSState::silent();
        state.frequency_hz = 50.0;
        state.amplitude = 0.8;
        state.enabled = true;
        exchange.publish(state);

        let active = exchange.acquire_active();
        assert_eq!(active.frequency_hz, 50.0);
        assert!((active.amplitude - 0.8).abs() < f32::EPSILON);
        assert!(active.enabled);
    }

    #[test]
    fn no_publish_returns_unchanged_state_repeatedly() {
        let exchange = ParameterExchange::new();
        let mut state = DDSState::silent();
        state.frequency_hz = 67.5;
        state.enabled = true;
        exchange.publish(state);
        let first = exchange.acquire_active();
        let second = exchange.acquire_active();
        assert_eq!(first.frequency_hz, second.frequency_hz);
        assert_eq!(first.enabled, second.enabled);
    }

    #[test]
    fn pending_slot_resyncs_from_active_after_swap() {
        let exchange = ParameterExchange::new();

        let mut first = DDSState::silent();
        first.frequency_hz = 10.0;
        exchange.publish(first);
        exchange.acquire_active();

        // A second publish that only flips `enabled` should not resurrect
        // the stale frequency that existed before the first publish.
        let mut second = DDSState::silent();
        second.frequency_hz = 20.0;
        second.enabled = true;
        exchange.publish(second);
        let active = exchange.acquire_active();
        assert_eq!(active.frequency_hz, 20.0);
        assert!(active.enabled);
    }

    #[test]
    fn concurrent_publish_and_acquire_never_observe_a_torn_state() {
        use std::sync::atomic::{AtomicBool, Ordering as StdOrdering};
        use std::sync::Arc;
        use std::thread;

        const ITERATIONS: u32 = 20_000;

        let exchange = Arc::new(ParameterExchange::new());
        let done = Arc::new(AtomicBool::new(false));

        let writer = {
            let exchange = Arc::clone(&exchange);
            thread::spawn(move || {
                for i in 0..ITERATIONS {
                    let mut state = DDSState::silent();
                    state.enabled = true;
                    state.frequency_hz = i as f32;
                    state.phase_offset_turns[0] = i;
                    exchange.publish(state);
                }
            })
        };

        let reader = {
            let exchange = Arc::clone(&exchange);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                while !done.load(StdOrdering::Relaxed) {
                    let active = exchange.acquire_active();
                    // Both fields are always stamped from the same `i` by the
                    // writer; any mismatch means the reader observed a state
                    // half-written by one publish and half by another.
                    assert_eq!(active.frequency_hz as u32, active.phase_offset_turns[0]);
                }
            })
        };

        writer.join().unwrap();
        done.store(true, StdOrdering::Relaxed);
        reader.join().unwrap();
    }
}
