//! Sigplace Scheduler Library
//!
//! Cooperative scheduling primitives for the single-threaded render pipeline.
//!
//! Everything here assumes one logical thread driven by the host's frame
//! callback: work advances in small steps, superseded work is cancelled
//! through a shared token, and bursts of triggers are coalesced by a
//! debouncer that is polled with an explicit clock.
//!
//! # Example
//!
//! ```
//! use sigplace_scheduler::{Debouncer, TaskSlot};
//! use std::time::{Duration, Instant};
//!
//! let mut slot: TaskSlot<&'static str> = TaskSlot::new();
//! let first = slot.start(|_token| Ok::<_, ()>("render @1.0")).unwrap();
//! let second = slot.start(|_token| Ok::<_, ()>("render @1.5")).unwrap();
//! assert!(second > first);
//! assert_eq!(slot.get(), Some(&"render @1.5"));
//!
//! let mut debounce = Debouncer::new(Duration::from_millis(300));
//! let t0 = Instant::now();
//! debounce.trigger(t0, 1.0_f32);
//! debounce.trigger(t0 + Duration::from_millis(100), 1.5_f32);
//! assert_eq!(debounce.poll(t0 + Duration::from_millis(200)), None);
//! assert_eq!(debounce.poll(t0 + Duration::from_millis(400)), Some(1.5));
//! ```

mod cancel;
mod debounce;
mod slot;

// Re-export public API
pub use cancel::CancellationToken;
pub use debounce::Debouncer;
pub use slot::{Generation, TaskSlot};
