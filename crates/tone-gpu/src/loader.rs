//! Decode supersession.
//!
//! Decoding happens outside the pipeline and completes asynchronously.
//! Every load is issued a [`LoadTicket`]; only the newest outstanding
//! ticket may bind its image, so a slow decode finishing after a newer
//! request is dropped instead of overwriting it.

use tracing::debug;

/// Generation counter for invalidating stale decodes.
pub type Generation = u64;

/// Proof of a started load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LoadTicket(Generation);

impl LoadTicket {
    /// Generation of this ticket.
    pub fn generation(&self) -> Generation {
        self.0
    }
}

/// Issues tickets and decides which completion wins.
#[derive(Debug, Clone, Default)]
pub struct ImageLoader {
    generation: Generation,
    pending: bool,
}

impl ImageLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a load, superseding any outstanding one.
    pub fn begin(&mut self) -> LoadTicket {
        if self.pending {
            debug!(superseded = self.generation, "load superseded");
        }
        self.generation += 1;
        self.pending = true;
        LoadTicket(self.generation)
    }

    /// True if `ticket` is the newest outstanding load.
    pub fn is_current(&self, ticket: LoadTicket) -> bool {
        self.pending && ticket.0 == self.generation
    }

    /// Completes `ticket`. Returns true if its image should be bound;
    /// stale or already completed tickets return false.
    pub fn complete(&mut self, ticket: LoadTicket) -> bool {
        if self.is_current(ticket) {
            self.pending = false;
            true
        } else {
            debug!(ticket = ticket.0, current = self.generation, "stale decode ignored");
            false
        }
    }

    /// Abandons the outstanding load, if any.
    pub fn cancel(&mut self) {
        if self.pending {
            self.generation += 1;
            self.pending = false;
        }
    }

    /// Whether a load is outstanding.
    pub fn is_pending(&self) -> bool {
        self.pending
    }
}
