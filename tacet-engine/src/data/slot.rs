use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use array_macro::array;

/// Two buffers in flight would let the writer's next write race the
/// reader's current read; three are enough without blocking either side.
const SLOT_COUNT: usize = 3;

struct SlotShared<T> {
  slots: [UnsafeCell<T>; SLOT_COUNT],
  read: AtomicUsize,
  write: AtomicUsize,
}

// The read/write offset protocol keeps the two sides on disjoint slots;
// see the safety notes on `publish` and `fetch`.
unsafe impl<T: Send> Sync for SlotShared<T> {}

/// Creates a wait-free triple-buffered slot for handing whole `T`
/// instances from exactly one producer thread to exactly one consumer
/// thread. The split into two owned halves is what enforces the
/// single-producer/single-consumer contract.
///
/// All three instances exist for the lifetime of the slot; fetching
/// before the first publish yields a default `T`.
pub fn resource_slot<T: Default + Send>() -> (SlotWriter<T>, SlotReader<T>) {
  let shared = Arc::new(SlotShared {
    slots: array![_ => UnsafeCell::new(T::default()); SLOT_COUNT],
    read: AtomicUsize::new(SLOT_COUNT - 1),
    write: AtomicUsize::new(0),
  });
  (
    SlotWriter {
      shared: shared.clone(),
    },
    SlotReader { shared },
  )
}

/// Producer half. May allocate and drop; lives on the control thread.
pub struct SlotWriter<T> {
  shared: Arc<SlotShared<T>>,
}

/// Consumer half. Never blocks, never allocates; lives on the real-time
/// thread.
pub struct SlotReader<T> {
  shared: Arc<SlotShared<T>>,
}

impl<T> SlotWriter<T> {
  /// Moves `value` into the next slot and publishes it. Refuses, handing
  /// the value back, when the consumer has not advanced past the slot
  /// that would be overwritten; never blocks and never clobbers a slot
  /// the reader may still reference. The previous occupant of the slot
  /// is dropped here, on the producer thread.
  pub fn publish(&mut self, value: T) -> Result<(), T> {
    let read = self.shared.read.load(Ordering::Acquire);
    let write = self.shared.write.load(Ordering::Relaxed);
    let next = (write + 1) % SLOT_COUNT;
    if next == read {
      return Err(value);
    }
    // Safety: slot `write` is unpublished, and the reader's announced
    // offset can never equal `write`, so this side has exclusive access.
    unsafe {
      *self.shared.slots[write].get() = value;
    }
    self.shared.write.store(next, Ordering::Release);
    Ok(())
  }
}

impl<T> SlotReader<T> {
  /// Returns the most recently published instance. Always succeeds;
  /// announcing the offset first makes a concurrent `publish` refuse to
  /// reuse the slot while the reference is alive.
  pub fn fetch(&mut self) -> &mut T {
    let write = self.shared.write.load(Ordering::Acquire);
    let read = (write + SLOT_COUNT - 1) % SLOT_COUNT;
    self.shared.read.store(read, Ordering::Release);
    // Safety: `read` was fully published by the release store in
    // `publish` (or holds the initial default), and the writer refuses
    // to touch an announced slot.
    unsafe { &mut *self.shared.slots[read].get() }
  }
}
