//! Session job registry
//!
//! Owns the reference→job mapping. At most one job is registered per
//! document reference; registering a new job cancels and replaces any
//! existing entry. Jobs carry a monotonic generation so a finished job can
//! only remove its own registration, never a successor's. The map itself
//! is never exposed.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;

use crate::error::{Result, SeshatError};
use crate::types::{DocumentUri, JobKind};

/// Monotonic generation clock for job tickets
#[derive(Debug, Default, Clone)]
struct GenerationClock {
    next: Arc<AtomicU64>,
}

impl GenerationClock {
    fn next(&self) -> u64 {
        self.next.fetch_add(1, Ordering::AcqRel).wrapping_add(1)
    }
}

/// Ticket held by a running session job
///
/// Bundles the document reference, the job's generation and its
/// cancellation token. Workers check the token between awaited steps.
#[derive(Debug, Clone)]
pub struct JobTicket {
    uri: DocumentUri,
    generation: u64,
    kind: JobKind,
    token: CancellationToken,
}

impl JobTicket {
    /// The document this job is bound to
    pub fn uri(&self) -> &DocumentUri {
        &self.uri
    }

    /// Generation issued at registration
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// What the job is doing
    pub fn kind(&self) -> JobKind {
        self.kind
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Future resolving when cancellation is requested
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// Cooperative checkpoint: errors with `Cancelled` once the token has
    /// been tripped. Called between awaited steps.
    pub fn check(&self) -> Result<()> {
        if self.token.is_cancelled() {
            Err(SeshatError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[derive(Debug)]
struct JobEntry {
    generation: u64,
    kind: JobKind,
    token: CancellationToken,
}

/// Registry mapping document references to their in-flight job
#[derive(Debug, Default, Clone)]
pub struct JobRegistry {
    clock: GenerationClock,
    inner: Arc<Mutex<HashMap<DocumentUri, JobEntry>>>,
}

impl JobRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job for `uri`, cancelling and replacing any existing
    /// entry. Returns the ticket the new job runs under.
    pub fn begin(&self, uri: &DocumentUri, kind: JobKind) -> JobTicket {
        let generation = self.clock.next();
        let token = CancellationToken::new();
        let entry = JobEntry {
            generation,
            kind,
            token: token.clone(),
        };

        let mut guard = self.lock();
        if let Some(replaced) = guard.insert(uri.clone(), entry) {
            replaced.token.cancel();
        }

        JobTicket {
            uri: uri.clone(),
            generation,
            kind,
            token,
        }
    }

    /// Request cooperative cancellation of the job registered for `uri`.
    ///
    /// Returns the generation observed, or `None` when no job was in
    /// flight. `None` is the "previous job completed on its own" signal
    /// the open sequence keys its flush decision on.
    pub fn request_cancel(&self, uri: &DocumentUri) -> Option<u64> {
        let guard = self.lock();
        guard.get(uri).map(|entry| {
            entry.token.cancel();
            entry.generation
        })
    }

    /// Remove the entry for a finished job. A successor registered under
    /// the same reference holds a newer generation and stays.
    pub fn finish(&self, ticket: &JobTicket) {
        let mut guard = self.lock();
        if let Some(entry) = guard.get(&ticket.uri) {
            if entry.generation == ticket.generation {
                guard.remove(&ticket.uri);
            }
        }
    }

    /// Drop a lingering entry whose generation is at most `generation`.
    /// Used by a successor job to clear a cancelled predecessor that never
    /// reached its own `finish`.
    pub fn evict(&self, uri: &DocumentUri, generation: u64) {
        let mut guard = self.lock();
        if let Some(entry) = guard.get(uri) {
            if entry.generation <= generation {
                guard.remove(uri);
            }
        }
    }

    /// Whether a job is registered for `uri`
    pub fn is_registered(&self, uri: &DocumentUri) -> bool {
        self.lock().contains_key(uri)
    }

    /// The kind of the registered job, if any
    pub fn registered_kind(&self, uri: &DocumentUri) -> Option<JobKind> {
        self.lock().get(uri).map(|entry| entry.kind)
    }

    /// Number of registered jobs
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no jobs are registered
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// A panicked holder leaves the map intact, so poisoning is recovered
    /// rather than propagated.
    fn lock(&self) -> MutexGuard<'_, HashMap<DocumentUri, JobEntry>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
