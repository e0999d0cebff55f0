//! Instance pool - per-clip reuse of playback instances
//!
//! Amortizes instance/voice creation across repeated `play()` calls on the
//! same clip. Every instance the pool ever created lives in exactly one of
//! three sets:
//!
//! - `playing`: believed still active
//! - `pending_recycle`: observed stopped during the sweep, not yet reclaimed
//! - `available`: ready for reuse
//!
//! Reclamation is two-phase (sweep into `pending_recycle`, then drain into
//! `available`) and happens at the start of each `acquire()`; that sweep is
//! the single place instance state is reconciled with backend truth. The pool
//! never shrinks: instances are reused, not freed, for the lifetime of the
//! owning clip.
//!
//! `acquire()` checks the instance out by value so the caller can start its
//! voice without holding the pool lock; `commit()` returns it to the
//! `playing` set. A checked-out instance is invisible to other `acquire()`
//! calls, so it can never be handed out twice.

use crate::audio::AudioResult;
use crate::instance::PlaybackInstance;
use crate::types::InstanceState;

/// Per-clip collection managing reuse of playback instances
#[derive(Default)]
pub struct InstancePool {
    playing: Vec<PlaybackInstance>,
    pending_recycle: Vec<PlaybackInstance>,
    available: Vec<PlaybackInstance>,
    /// Total instances ever created; doubles as the next instance id
    created: u64,
}

impl InstancePool {
    /// Create an empty pool. The sets allocate nothing until first use.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check out a ready instance, reusing a finished one when possible.
    ///
    /// Order per call: sweep `playing` for voices that report stopped, stage
    /// them in `pending_recycle`, drain the stage into `available`, then pop
    /// an available instance or build a new one via `make`. Always succeeds
    /// unless the backend cannot create a voice — there is deliberately no
    /// hard instance cap. The caller starts the instance and hands it back
    /// through [`InstancePool::commit`].
    pub fn acquire<F>(&mut self, make: F) -> AudioResult<PlaybackInstance>
    where
        F: FnOnce(u64) -> AudioResult<PlaybackInstance>,
    {
        // Sweep: stage instances which have finished playing
        let mut i = 0;
        while i < self.playing.len() {
            if self.playing[i].state() == InstanceState::Stopped {
                self.pending_recycle.push(self.playing.swap_remove(i));
            } else {
                i += 1;
            }
        }

        // Drain: reclaim everything staged, in one move
        if !self.pending_recycle.is_empty() {
            log::debug!(
                "Recycling {} finished instance(s)",
                self.pending_recycle.len()
            );
            for instance in &mut self.pending_recycle {
                instance.recycle();
            }
            self.available.append(&mut self.pending_recycle);
        }

        // Reuse if possible, otherwise grow the pool
        match self.available.pop() {
            Some(instance) => Ok(instance),
            None => {
                let instance = make(self.created)?;
                self.created += 1;
                log::debug!("Instance pool grew to {} instance(s)", self.created);
                Ok(instance)
            }
        }
    }

    /// Return a checked-out instance to the `playing` set
    pub fn commit(&mut self, instance: PlaybackInstance) {
        self.playing.push(instance);
    }

    /// Stop every instance the pool currently tracks as active
    pub fn stop_all(&mut self) {
        for instance in &mut self.playing {
            instance.stop();
        }
    }

    /// Instances currently believed active
    pub fn playing_count(&self) -> usize {
        self.playing.len()
    }

    /// Instances staged for reclamation (empty between `acquire()` calls)
    pub fn pending_recycle_count(&self) -> usize {
        self.pending_recycle.len()
    }

    /// Instances ready for reuse
    pub fn available_count(&self) -> usize {
        self.available.len()
    }

    /// Total instances ever created by this pool
    pub fn created_count(&self) -> u64 {
        self.created
    }
}
