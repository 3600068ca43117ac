//! Per-document session coordination.
//!
//! `SessionCoordinator` owns everything a single editing session touches:
//! the storage provider, the snapshot store, the preference store, the job
//! registry, the shared editing flags and the editor shell. Opening and
//! saving documents run as spawned jobs that talk back to the host through
//! an event channel; prompts the jobs raise are delivered as events too and
//! block the raising job until the host answers (or the job is cancelled).
//!
//! The coordinator applies flag effects only while the host is pumping
//! `next_event`, so a job that was superseded and reports `Cancelled`
//! changes nothing the replacement job would have to undo.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::SeshatConfig;
use crate::document::DocumentRef;
use crate::editor::{EditorShell, Language, SearchSpec};
use crate::error::{Result, SeshatError};
use crate::hash::hash_str;
use crate::prefs::PrefStore;
use crate::session::flags::EditingFlags;
use crate::session::job::{JobRegistry, JobTicket};
use crate::session::prompt::{await_choice, PromptChoice, PromptKind, PromptRequest};
use crate::snapshot::{EditorState, SnapshotStore};
use crate::storage::{LocalFileStorage, StorageProvider};
use crate::types::{DocumentUri, JobKind, JobOutcome};

/// Terminal report for a spawned session job.
#[derive(Debug, Clone)]
pub struct JobFinished {
    /// Document the job was registered under
    pub uri: DocumentUri,

    /// What the job was doing
    pub kind: JobKind,

    /// How it ended
    pub outcome: JobOutcome,
}

/// Events the coordinator delivers to its host.
#[derive(Debug)]
pub enum SessionEvent {
    /// A job needs an answer before it can continue
    Prompt(PromptRequest),

    /// A session job reached a terminal state
    JobFinished(JobFinished),

    /// The debounced search task refreshed the match list
    SearchUpdated {
        /// Number of matches after re-evaluation
        matches: usize,
    },
}

/// Everything a spawned job needs, detached from the coordinator's lifetime.
#[derive(Clone)]
struct JobContext {
    storage: Arc<dyn StorageProvider>,
    snapshots: SnapshotStore,
    registry: JobRegistry,
    flags: Arc<EditingFlags>,
    editor: Arc<Mutex<EditorShell>>,
    events: mpsc::UnboundedSender<SessionEvent>,
}

/// Coordinates document opens, saves, snapshots and search for one editor.
pub struct SessionCoordinator {
    config: SeshatConfig,
    storage: Arc<dyn StorageProvider>,
    snapshots: SnapshotStore,
    prefs: PrefStore,
    registry: JobRegistry,
    flags: Arc<EditingFlags>,
    editor: Arc<Mutex<EditorShell>>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
    search_tx: watch::Sender<Option<SearchSpec>>,
    _search_task: JoinHandle<()>,
    active: Option<DocumentRef>,
    inflight: AtomicUsize,
}

impl SessionCoordinator {
    /// Creates a coordinator over the given storage provider.
    pub fn new(config: SeshatConfig, storage: Arc<dyn StorageProvider>) -> Self {
        let snapshots = SnapshotStore::new(config.snapshot_path());
        let prefs = PrefStore::load(config.prefs_path(), config.recent_documents_cap);
        let flags = Arc::new(EditingFlags::new());
        let editor = Arc::new(Mutex::new(EditorShell::new()));
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (search_tx, search_rx) = watch::channel(None);

        let search_task = spawn_search_task(
            search_rx,
            Arc::clone(&editor),
            events_tx.clone(),
            config.search_debounce(),
        );

        Self {
            config,
            storage,
            snapshots,
            prefs,
            registry: JobRegistry::new(),
            flags,
            editor,
            events_tx,
            events_rx,
            search_tx,
            _search_task: search_task,
            active: None,
            inflight: AtomicUsize::new(0),
        }
    }

    /// Creates a coordinator backed by the local filesystem.
    pub fn with_local_storage(config: SeshatConfig) -> Self {
        Self::new(config, Arc::new(LocalFileStorage))
    }

    /// Starts an open job for `document`, superseding any job on the
    /// previously active document.
    ///
    /// Returns as soon as the job is registered and spawned. The previous
    /// document's unsaved edits are flushed by the job, but only when the
    /// previous job had already finished on its own; a cancelled-in-flight
    /// predecessor skips the flush.
    pub async fn open(&mut self, document: DocumentRef) {
        let previous = self.active.take();
        let prev_generation = previous
            .as_ref()
            .and_then(|doc| self.registry.request_cancel(&doc.uri));
        self.active = Some(document.clone());

        // Last-active is committed before any job I/O starts, so a crash
        // mid-open still finds the right document on restart.
        if let Err(e) = self.prefs.set_last_active(&document.uri) {
            warn!(uri = %document.uri, error = %e, "failed to persist last-active document");
        }

        self.flags.set_busy(true);
        self.search_tx.send_replace(None);
        {
            let mut shell = self.editor.lock().await;
            shell.begin_transition();
        }

        let ticket = self.registry.begin(&document.uri, JobKind::Open);
        debug!(
            uri = %document.uri,
            generation = ticket.generation(),
            "starting open job"
        );

        let ctx = self.job_context();
        self.inflight.fetch_add(1, Ordering::SeqCst);
        tokio::spawn(run_open_job(ctx, ticket, document, previous, prev_generation));
    }

    /// Starts a save job for the active document.
    ///
    /// The job writes the buffer to storage, then persists the state and
    /// text snapshots concurrently. An in-flight job on the same document
    /// is superseded first.
    pub async fn save(&mut self) -> Result<()> {
        let document = self
            .active
            .clone()
            .ok_or_else(|| SeshatError::Other("no active document to save".to_string()))?;

        self.flags.set_busy(true);
        self.registry.request_cancel(&document.uri);
        let ticket = self.registry.begin(&document.uri, JobKind::Save);
        debug!(
            uri = %document.uri,
            generation = ticket.generation(),
            "starting save job"
        );

        let ctx = self.job_context();
        self.inflight.fetch_add(1, Ordering::SeqCst);
        tokio::spawn(run_save_job(ctx, ticket, document));
        Ok(())
    }

    /// Best-effort flush on memory pressure.
    ///
    /// When a document is active and carries unsaved edits, writes the
    /// buffer and both snapshots in a detached task: no registry entry, no
    /// events, no flag changes, and errors are only logged. Returns the
    /// task handle so callers can await it, or `None` when there was
    /// nothing to do.
    pub fn on_memory_pressure(&self) -> Option<JoinHandle<()>> {
        let document = self.active.clone()?;
        if !self.flags.snapshot().text_changed {
            return None;
        }

        info!(uri = %document.uri, "memory pressure: flushing unsaved edits");
        let storage = Arc::clone(&self.storage);
        let snapshots = self.snapshots.clone();
        let editor = Arc::clone(&self.editor);

        Some(tokio::spawn(async move {
            let (text, state) = {
                let shell = editor.lock().await;
                let text = shell.buffer.text();
                let state = EditorState::capture(&shell, Some(hash_str(&text)));
                (text, state)
            };
            if let Err(e) = storage.write(&document.uri, &text).await {
                warn!(uri = %document.uri, error = %e, "memory pressure write failed");
                return;
            }
            let (state_res, text_res) = tokio::join!(
                snapshots.write_state(&document.uri, &state),
                snapshots.write_text(&document.uri, &text),
            );
            if let Err(e) = state_res {
                warn!(uri = %document.uri, error = %e, "memory pressure state snapshot failed");
            }
            if let Err(e) = text_res {
                warn!(uri = %document.uri, error = %e, "memory pressure text snapshot failed");
            }
        }))
    }

    /// Submits a search query; evaluation happens after the debounce
    /// window, with only the latest query surviving rapid resubmission.
    pub fn submit_search(&self, spec: SearchSpec) {
        self.search_tx.send_replace(Some(spec));
    }

    /// Mutates the editor shell and refreshes the editing flags.
    ///
    /// Refused while a job holds the busy posture, since the buffer is
    /// about to be replaced underneath the caller.
    pub async fn edit<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut EditorShell) -> R,
    {
        if self.flags.snapshot().busy {
            return Err(SeshatError::Busy);
        }
        let mut shell = self.editor.lock().await;
        let out = f(&mut shell);
        self.flags.set_text_changed(shell.buffer.is_dirty());
        self.flags
            .set_editing(shell.buffer.can_undo(), shell.buffer.can_redo());
        Ok(out)
    }

    /// Read-only access to the editor shell.
    pub async fn with_editor<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&EditorShell) -> R,
    {
        let shell = self.editor.lock().await;
        f(&shell)
    }

    /// Receives the next session event, applying its flag effects first.
    ///
    /// Effects of a finished job land here and nowhere else: a host that
    /// never pumps events never observes half-applied transitions.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        let event = self.events_rx.recv().await?;
        if let SessionEvent::JobFinished(finished) = &event {
            self.apply_finish(finished).await;
        }
        Some(event)
    }

    /// Pumps events until no spawned job remains in flight, answering
    /// prompts through `policy`. Returns the finished-job reports in
    /// completion order.
    pub async fn drive_until_idle<F>(&mut self, mut policy: F) -> Vec<JobFinished>
    where
        F: FnMut(&PromptRequest) -> PromptChoice,
    {
        let mut finished = Vec::new();
        while self.inflight.load(Ordering::SeqCst) > 0 {
            let Some(event) = self.next_event().await else {
                break;
            };
            match event {
                SessionEvent::Prompt(request) => {
                    let choice = policy(&request);
                    request.respond(choice);
                }
                SessionEvent::JobFinished(report) => finished.push(report),
                SessionEvent::SearchUpdated { .. } => {}
            }
        }
        finished
    }

    /// Currently active document, if any.
    pub fn active(&self) -> Option<&DocumentRef> {
        self.active.as_ref()
    }

    /// Number of registered-and-spawned jobs whose reports have not been
    /// consumed yet.
    pub fn inflight(&self) -> usize {
        self.inflight.load(Ordering::SeqCst)
    }

    /// Shared editing flags.
    pub fn flags(&self) -> Arc<EditingFlags> {
        Arc::clone(&self.flags)
    }

    /// The job registry, for observing registration state.
    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    /// The snapshot store backing this session.
    pub fn snapshots(&self) -> &SnapshotStore {
        &self.snapshots
    }

    /// Last document recorded as active, surviving restarts.
    pub fn last_active(&self) -> Option<DocumentUri> {
        self.prefs.last_active().cloned()
    }

    /// Recently active documents, most recent first.
    pub fn recent_documents(&self) -> Vec<DocumentUri> {
        self.prefs.recent().to_vec()
    }

    /// Configuration this coordinator was built with.
    pub fn config(&self) -> &SeshatConfig {
        &self.config
    }

    fn job_context(&self) -> JobContext {
        JobContext {
            storage: Arc::clone(&self.storage),
            snapshots: self.snapshots.clone(),
            registry: self.registry.clone(),
            flags: Arc::clone(&self.flags),
            editor: Arc::clone(&self.editor),
            events: self.events_tx.clone(),
        }
    }

    async fn apply_finish(&self, finished: &JobFinished) {
        self.inflight.fetch_sub(1, Ordering::SeqCst);
        match &finished.outcome {
            JobOutcome::Opened {
                can_undo, can_redo, ..
            } => {
                self.flags.reset();
                self.flags.set_editing(*can_undo, *can_redo);
            }
            JobOutcome::Saved => {
                self.flags.set_busy(false);
                self.flags.set_text_changed(false);
                self.editor.lock().await.buffer.mark_clean();
            }
            JobOutcome::Cancelled => {
                // Superseded: the replacement job owns every effect.
            }
            JobOutcome::Failed { message } => {
                warn!(uri = %finished.uri, kind = %finished.kind, error = %message, "job failed");
                self.flags.set_busy(false);
            }
        }
    }
}

async fn run_open_job(
    ctx: JobContext,
    ticket: JobTicket,
    document: DocumentRef,
    previous: Option<DocumentRef>,
    prev_generation: Option<u64>,
) {
    let result = open_job_body(&ctx, &ticket, &document, previous.as_ref(), prev_generation).await;
    let outcome = match result {
        Ok(state) => {
            info!(uri = %document.uri, restored = state.is_some(), "document opened");
            JobOutcome::Opened {
                restored: state.is_some(),
                can_undo: state.as_ref().map(EditorState::can_undo).unwrap_or(false),
                can_redo: state.as_ref().map(EditorState::can_redo).unwrap_or(false),
            }
        }
        Err(e) if e.is_cancelled() => {
            debug!(uri = %document.uri, generation = ticket.generation(), "open job cancelled");
            JobOutcome::Cancelled
        }
        Err(e) => JobOutcome::Failed {
            message: e.to_string(),
        },
    };
    finish_job(&ctx, ticket, JobKind::Open, outcome);
}

async fn run_save_job(ctx: JobContext, ticket: JobTicket, document: DocumentRef) {
    let result = save_job_body(&ctx, &ticket, &document).await;
    let outcome = match result {
        Ok(()) => {
            info!(uri = %document.uri, "document saved");
            JobOutcome::Saved
        }
        Err(e) if e.is_cancelled() => {
            debug!(uri = %document.uri, generation = ticket.generation(), "save job cancelled");
            JobOutcome::Cancelled
        }
        Err(e) => JobOutcome::Failed {
            message: e.to_string(),
        },
    };
    finish_job(&ctx, ticket, JobKind::Save, outcome);
}

/// Deregisters the job and reports its outcome. The report is sent even
/// for cancelled jobs so the host's in-flight accounting stays balanced.
fn finish_job(ctx: &JobContext, ticket: JobTicket, kind: JobKind, outcome: JobOutcome) {
    ctx.registry.finish(&ticket);
    let report = JobFinished {
        uri: ticket.uri().clone(),
        kind,
        outcome,
    };
    if ctx.events.send(SessionEvent::JobFinished(report)).is_err() {
        debug!("event channel closed, dropping job report");
    }
}

async fn open_job_body(
    ctx: &JobContext,
    ticket: &JobTicket,
    document: &DocumentRef,
    previous: Option<&DocumentRef>,
    prev_generation: Option<u64>,
) -> Result<Option<EditorState>> {
    if let Some(prev) = previous {
        let dirty = ctx.flags.snapshot().text_changed;
        match prev_generation {
            // The predecessor finished on its own; unsaved edits are safe
            // to write back before the shell is repurposed.
            None if dirty => flush_previous(ctx, ticket, prev).await?,
            None => {}
            // The predecessor was still in flight when it was superseded.
            // Its edits are not flushed; the snapshot pair still holds the
            // last persisted state.
            Some(generation) => {
                if dirty {
                    warn!(uri = %prev.uri, "previous job still in flight, skipping flush of unsaved edits");
                }
                ctx.registry.evict(&prev.uri, generation);
            }
        }
    }
    ticket.check()?;
    load_document(ctx, ticket, document).await
}

/// Writes the previous document's buffer back to storage and refreshes
/// its snapshot pair. Runs before the new document touches the shell, so
/// the buffer still holds the previous text.
async fn flush_previous(ctx: &JobContext, ticket: &JobTicket, prev: &DocumentRef) -> Result<()> {
    ticket.check()?;
    let (text, state) = {
        let shell = ctx.editor.lock().await;
        let text = shell.buffer.text();
        let state = EditorState::capture(&shell, Some(hash_str(&text)));
        (text, state)
    };
    ctx.storage.write(&prev.uri, &text).await?;
    ticket.check()?;
    let (state_res, text_res) = tokio::join!(
        ctx.snapshots.write_state(&prev.uri, &state),
        ctx.snapshots.write_text(&prev.uri, &text),
    );
    state_res?;
    text_res?;
    debug!(uri = %prev.uri, "flushed previous document");
    Ok(())
}

async fn load_document(
    ctx: &JobContext,
    ticket: &JobTicket,
    document: &DocumentRef,
) -> Result<Option<EditorState>> {
    let uri = &document.uri;
    ticket.check()?;

    if !ctx.snapshots.exists(uri).await {
        let text = ctx.storage.read_to_string(uri).await?;
        ticket.check()?;
        let mut shell = ctx.editor.lock().await;
        shell.load_document(&document.name, &text)?;
        return Ok(None);
    }

    let (state_res, text_res) = tokio::join!(ctx.snapshots.read_state(uri), ctx.snapshots.read_text(uri));
    let state = state_res?;
    let snapshot_text = text_res?;
    ticket.check()?;

    let restored = state.is_some() && snapshot_text.is_some();
    if let (Some(state), Some(text)) = (state.as_ref(), snapshot_text.as_ref()) {
        let mut shell = ctx.editor.lock().await;
        shell.buffer.load_text(text);
        state.apply(&mut shell);
    } else {
        // Half of the pair is missing or unreadable. Fall back to the live
        // file so the shell never keeps showing the previous document.
        match ctx.storage.read_to_string(uri).await {
            Ok(text) => ctx.editor.lock().await.buffer.load_text(&text),
            Err(SeshatError::DocumentNotFound(_)) => {
                ctx.editor.lock().await.buffer.load_text("")
            }
            Err(e) => return Err(e),
        }
    }

    let stored_hash = state.as_ref().and_then(|s| s.content_hash);
    let live_hash = ctx.storage.content_hash(uri).await?;
    ticket.check()?;

    if live_hash != stored_hash {
        if live_hash.is_some() {
            // File content moved on without us since the snapshot was taken.
            let (request, rx) =
                PromptRequest::new(document.name.clone(), PromptKind::ReloadChangedFile);
            send_prompt(ctx, request)?;
            if await_choice(rx, ticket).await? == PromptChoice::Confirmed {
                let text = ctx.storage.read_to_string(uri).await?;
                ticket.check()?;
                ctx.editor.lock().await.buffer.load_text(&text);
            }
        } else {
            // File is gone but the snapshot survives. Declining discards it.
            let (request, rx) =
                PromptRequest::new(document.name.clone(), PromptKind::KeepDeletedFile);
            send_prompt(ctx, request)?;
            if await_choice(rx, ticket).await? == PromptChoice::Declined {
                ctx.snapshots.delete(uri).await?;
            }
        }
    }

    ticket.check()?;
    {
        let mut shell = ctx.editor.lock().await;
        let text = shell.buffer.text();
        let language = Language::from_path(Path::new(&document.name)).unwrap_or(Language::PlainText);
        shell.syntax.initialize(language, &text)?;
    }

    if restored {
        Ok(state)
    } else {
        Ok(None)
    }
}

async fn save_job_body(ctx: &JobContext, ticket: &JobTicket, document: &DocumentRef) -> Result<()> {
    ticket.check()?;
    let (text, state) = {
        let shell = ctx.editor.lock().await;
        let text = shell.buffer.text();
        let state = EditorState::capture(&shell, Some(hash_str(&text)));
        (text, state)
    };
    ctx.storage.write(&document.uri, &text).await?;
    ticket.check()?;
    let (state_res, text_res) = tokio::join!(
        ctx.snapshots.write_state(&document.uri, &state),
        ctx.snapshots.write_text(&document.uri, &text),
    );
    state_res?;
    text_res?;
    Ok(())
}

fn send_prompt(ctx: &JobContext, request: PromptRequest) -> Result<()> {
    ctx.events
        .send(SessionEvent::Prompt(request))
        .map_err(|_| SeshatError::Cancelled)
}

fn spawn_search_task(
    mut queries: watch::Receiver<Option<SearchSpec>>,
    editor: Arc<Mutex<EditorShell>>,
    events: mpsc::UnboundedSender<SessionEvent>,
    debounce: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if queries.changed().await.is_err() {
                return;
            }
            let mut spec = queries.borrow_and_update().clone();
            // Debounce window restarts on every resubmission; only the
            // latest query is evaluated.
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(debounce) => break,
                    changed = queries.changed() => match changed {
                        Ok(()) => spec = queries.borrow_and_update().clone(),
                        Err(_) => return,
                    },
                }
            }
            let Some(spec) = spec else { continue };
            let matches = {
                let mut shell = editor.lock().await;
                shell.run_search(&spec)
            };
            if events.send(SessionEvent::SearchUpdated { matches }).is_err() {
                return;
            }
        }
    })
}
