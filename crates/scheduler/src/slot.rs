//! Single-owner slot for the one in-flight task
//!
//! At most one task occupies the slot. Starting a new task cancels the
//! previous occupant first (without waiting for it), then mints a fresh
//! token for the newcomer. Each start bumps a generation counter so callers
//! can tell a stale completion from the current one.

use crate::cancel::CancellationToken;

/// Monotonic start counter for tasks placed in a [`TaskSlot`]
pub type Generation = u64;

struct SlotEntry<T> {
    generation: Generation,
    token: CancellationToken,
    task: T,
}

/// Slot holding the current in-flight task and its cancellation token
pub struct TaskSlot<T> {
    current: Option<SlotEntry<T>>,
    next_generation: Generation,
}

impl<T> TaskSlot<T> {
    /// Create an empty slot
    pub fn new() -> Self {
        Self { current: None, next_generation: 1 }
    }

    /// Cancel the current occupant (if any) and start a new task
    ///
    /// The previous task is cancelled before `start` runs, so a failing
    /// start still leaves no stale task behind. Returns the generation of
    /// the new task.
    pub fn start<E, F>(&mut self, start: F) -> Result<Generation, E>
    where
        F: FnOnce(CancellationToken) -> Result<T, E>,
    {
        self.cancel();

        let token = CancellationToken::new();
        let task = start(token.clone())?;

        let generation = self.next_generation;
        self.next_generation += 1;
        self.current = Some(SlotEntry { generation, token, task });

        Ok(generation)
    }

    /// Cancel and drop the current occupant
    ///
    /// Returns `true` if a task was cancelled.
    pub fn cancel(&mut self) -> bool {
        match self.current.take() {
            Some(entry) => {
                entry.token.cancel();
                log::trace!("superseded task generation {}", entry.generation);
                true
            }
            None => false,
        }
    }

    /// Remove the current occupant without cancelling it
    ///
    /// Used when the task finished on its own.
    pub fn finish(&mut self) -> Option<T> {
        self.current.take().map(|entry| entry.task)
    }

    /// Get the current task
    pub fn get(&self) -> Option<&T> {
        self.current.as_ref().map(|entry| &entry.task)
    }

    /// Get the current task mutably
    pub fn get_mut(&mut self) -> Option<&mut T> {
        self.current.as_mut().map(|entry| &mut entry.task)
    }

    /// Generation of the current task
    pub fn generation(&self) -> Option<Generation> {
        self.current.as_ref().map(|entry| entry.generation)
    }

    /// Check if a task is in flight
    pub fn is_occupied(&self) -> bool {
        self.current.is_some()
    }
}

impl<T> Default for TaskSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for TaskSlot<T> {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_occupies_slot() {
        let mut slot = TaskSlot::new();
        let generation = slot.start(|_| Ok::<_, ()>(7)).unwrap();

        assert!(slot.is_occupied());
        assert_eq!(slot.get(), Some(&7));
        assert_eq!(slot.generation(), Some(generation));
    }

    #[test]
    fn test_start_cancels_previous() {
        let mut slot = TaskSlot::new();
        let mut first_token = None;
        let mut second_token = None;
        slot.start(|token| {
            first_token = Some(token);
            Ok::<_, ()>("first")
        })
        .unwrap();

        slot.start(|token| {
            second_token = Some(token);
            Ok::<_, ()>("second")
        })
        .unwrap();

        assert!(first_token.unwrap().is_cancelled());
        assert_eq!(slot.get(), Some(&"second"));
        assert!(!second_token.unwrap().is_cancelled());
    }

    #[test]
    fn test_failed_start_still_cancels_previous() {
        let mut slot = TaskSlot::new();
        let mut first_token = None;
        slot.start(|token| {
            first_token = Some(token);
            Ok::<_, &str>(1)
        })
        .unwrap();

        let result = slot.start(|_| Err::<i32, _>("decode failed"));

        assert_eq!(result, Err("decode failed"));
        assert!(first_token.unwrap().is_cancelled());
        assert!(!slot.is_occupied());
    }

    #[test]
    fn test_finish_does_not_cancel() {
        let mut slot = TaskSlot::new();
        let mut token = None;
        slot.start(|t| {
            token = Some(t);
            Ok::<_, ()>(1)
        })
        .unwrap();

        assert_eq!(slot.finish(), Some(1));
        assert!(!token.unwrap().is_cancelled());
        assert!(!slot.is_occupied());
    }

    #[test]
    fn test_generations_increase() {
        let mut slot = TaskSlot::new();
        let a = slot.start(|_| Ok::<_, ()>(())).unwrap();
        slot.finish();
        let b = slot.start(|_| Ok::<_, ()>(())).unwrap();
        assert!(b > a);
    }

    #[test]
    fn test_drop_cancels_in_flight_task() {
        let mut token = None;
        {
            let mut slot = TaskSlot::new();
            slot.start(|t| {
                token = Some(t);
                Ok::<_, ()>(())
            })
            .unwrap();
        }
        assert!(token.unwrap().is_cancelled());
    }
}
