use std::{
    collections::{HashSet, VecDeque},
    time::Duration,
};

use futures::{
    FutureExt, StreamExt,
    future::BoxFuture,
    stream::{FuturesOrdered, FuturesUnordered},
};
use tokio::sync::{mpsc, watch};

use crate::{
    codec::{command::DecodedResult, decode::decode},
    engine::{FontCacheSlots, LayoutEngine},
    foundation::{
        config::DispatcherOpts,
        error::{TextRenderError, TextRenderResult},
    },
    model::text_data::TextData,
    protocol::message::{
        Envelope, FontCache, FontFamily, JobContent, LoadErr, LoadedFont, RenderErr, RenderOk,
    },
    relay::requests::RelayRequests,
};

/// Lifecycle of the worker context.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkerState {
    Uninitialized,
    Initializing,
    Ready,
    Busy,
    InitFailed,
}

/// Channels and thread of a running worker.
#[derive(Debug)]
pub struct WorkerChannels {
    /// Controller -> worker. Dropping every sender shuts the worker down.
    pub to_worker: mpsc::UnboundedSender<Envelope>,
    /// Worker -> controller.
    pub from_worker: mpsc::UnboundedReceiver<Envelope>,
    /// Current lifecycle state, updated by the worker thread.
    pub state: watch::Receiver<WorkerState>,
    pub thread: std::thread::JoinHandle<()>,
}

/// Start a worker on its own OS thread.
///
/// `factory` runs on that thread, so the engine itself never crosses threads.
/// Initialization (engine construction and the default font load) proceeds in
/// the background and is reported with `loaded` or `loadErr`.
pub fn spawn_worker<E, F>(factory: F, opts: &DispatcherOpts) -> TextRenderResult<WorkerChannels>
where
    E: LayoutEngine + 'static,
    F: FnOnce() -> anyhow::Result<E> + Send + 'static,
{
    opts.validate()?;
    let (to_worker, inbound) = mpsc::unbounded_channel();
    let (outbound, from_worker) = mpsc::unbounded_channel();
    let (state_tx, state) = watch::channel(WorkerState::Uninitialized);
    let worker_opts = opts.clone();

    let thread = std::thread::Builder::new()
        .name(opts.worker_thread_name.clone())
        .spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build();
            match rt {
                Ok(rt) => {
                    let worker = WorkerRuntime::<E>::new(&worker_opts, outbound, state_tx);
                    rt.block_on(worker.run(factory, inbound));
                }
                Err(err) => {
                    tracing::error!(error = %err, "worker runtime could not start");
                    let _ = outbound.send(Envelope::LoadErr(LoadErr {
                        message: format!("worker runtime could not start: {err}"),
                    }));
                }
            }
        })
        .map_err(|err| TextRenderError::init(format!("spawn worker thread: {err}")))?;

    Ok(WorkerChannels {
        to_worker,
        from_worker,
        state,
        thread,
    })
}

type Gate = BoxFuture<'static, TextRenderResult<()>>;

enum Ticket {
    Init,
    Preload(String),
}

/// The worker's event loop state. Owns the engine once it exists.
pub struct WorkerRuntime<E> {
    state: watch::Sender<WorkerState>,
    engine: Option<E>,
    loaded: HashSet<String>,
    slots: FontCacheSlots,
    relay: RelayRequests,
    outbound: mpsc::UnboundedSender<Envelope>,
    default_family: String,
    relay_timeout: Option<Duration>,
    /// Messages that arrived before initialization settled.
    deferred: VecDeque<Envelope>,
}

impl<E: LayoutEngine> WorkerRuntime<E> {
    pub fn new(
        opts: &DispatcherOpts,
        outbound: mpsc::UnboundedSender<Envelope>,
        state: watch::Sender<WorkerState>,
    ) -> Self {
        state.send_replace(WorkerState::Uninitialized);
        Self {
            state,
            engine: None,
            loaded: HashSet::new(),
            slots: FontCacheSlots::new(),
            relay: RelayRequests::new(),
            outbound,
            default_family: opts.default_font_family.clone(),
            relay_timeout: opts.relay_timeout(),
            deferred: VecDeque::new(),
        }
    }

    pub fn state(&self) -> WorkerState {
        *self.state.borrow()
    }

    fn set_state(&self, next: WorkerState) {
        let prev = self.state.send_replace(next);
        tracing::trace!(?prev, ?next, "worker state");
    }

    /// Run until every controller-side sender is gone.
    ///
    /// Jobs are admitted in arrival order and wait, in that order, for their
    /// fonts; the engine only ever sees one job at a time.
    #[tracing::instrument(name = "worker", skip_all)]
    pub async fn run<F>(mut self, factory: F, mut inbound: mpsc::UnboundedReceiver<Envelope>)
    where
        F: FnOnce() -> anyhow::Result<E>,
    {
        let mut jobs: FuturesOrdered<BoxFuture<'static, (JobContent, TextRenderResult<()>)>> =
            FuturesOrdered::new();
        let mut tickets: FuturesUnordered<BoxFuture<'static, (Ticket, TextRenderResult<()>)>> =
            FuturesUnordered::new();

        self.set_state(WorkerState::Initializing);
        match factory() {
            Ok(engine) => {
                self.engine = Some(engine);
                let gate = self.gate(vec![self.default_family.clone()]);
                tickets.push(gate.map(|r| (Ticket::Init, r)).boxed());
            }
            Err(err) => self.fail_init(format!("engine construction failed: {err:#}")),
        }

        loop {
            tokio::select! {
                msg = inbound.recv() => match msg {
                    Some(env) => self.on_message(env, &mut jobs, &mut tickets),
                    None => break,
                },
                Some((job, gate)) = jobs.next(), if !jobs.is_empty() => {
                    self.run_job(job, gate);
                    self.relay.prune_abandoned();
                }
                Some((ticket, gate)) = tickets.next(), if !tickets.is_empty() => {
                    match ticket {
                        Ticket::Init => {
                            self.finish_init(gate);
                            while let Some(env) = self.deferred.pop_front() {
                                self.on_message(env, &mut jobs, &mut tickets);
                            }
                        }
                        Ticket::Preload(family) => self.finish_preload(family, gate),
                    }
                    self.relay.prune_abandoned();
                }
            }
        }
        tracing::debug!("controller gone, worker exiting");
    }

    fn on_message(
        &mut self,
        env: Envelope,
        jobs: &mut FuturesOrdered<BoxFuture<'static, (JobContent, TextRenderResult<()>)>>,
        tickets: &mut FuturesUnordered<BoxFuture<'static, (Ticket, TextRenderResult<()>)>>,
    ) {
        match env {
            Envelope::FontCache(cache) => self.on_font_cache(cache),
            env @ (Envelope::TextData(_) | Envelope::Preload(_))
                if self.state() == WorkerState::Initializing =>
            {
                self.deferred.push_back(env);
            }
            Envelope::TextData(job) => {
                if self.state() == WorkerState::InitFailed {
                    let err = TextRenderError::init("worker failed to initialize");
                    self.emit(Self::rejection(&job, &err));
                    return;
                }
                let gate = self.gate(job.text_data.font_families());
                jobs.push_back(gate.map(move |r| (job, r)).boxed());
            }
            Envelope::Preload(FontFamily { font_family }) => {
                if self.state() == WorkerState::InitFailed {
                    self.emit(Envelope::LoadedFont(LoadedFont {
                        font_family,
                        error: Some("worker failed to initialize".to_string()),
                    }));
                } else if self.loaded.contains(&font_family) {
                    self.emit(Envelope::LoadedFont(LoadedFont {
                        font_family,
                        error: None,
                    }));
                } else {
                    let gate = self.gate(vec![font_family.clone()]);
                    tickets.push(gate.map(move |r| (Ticket::Preload(font_family), r)).boxed());
                }
            }
            Envelope::Unrecognized { kind } => {
                tracing::warn!(%kind, "ignoring unrecognized envelope");
            }
            other => {
                tracing::debug!(kind = other.kind(), "ignoring controller-bound envelope");
            }
        }
    }

    fn on_font_cache(&mut self, cache: FontCache) {
        let family = cache.font_family.clone();
        if !self.relay.is_pending(&family) {
            tracing::warn!(%family, "dropping font delivery nobody is waiting for");
            return;
        }
        let outcome = match cache.into_result() {
            Ok(bytes) => {
                tracing::debug!(%family, bytes = bytes.len(), "font bytes delivered");
                self.slots.put(family.clone(), bytes);
                Ok(())
            }
            Err(reason) => {
                tracing::warn!(%family, %reason, "font relay failed");
                Err(reason)
            }
        };
        self.relay.fulfill(&family, outcome);
    }

    /// Future that settles once every family in `families` is loaded or has bytes
    /// waiting in a slot. Emits one `requestCache` per family not already asked for.
    fn gate(&mut self, families: Vec<String>) -> Gate {
        let mut waits = Vec::new();
        for family in families {
            if self.loaded.contains(&family) || self.slots.contains(&family) {
                continue;
            }
            let (rx, first) = self.relay.subscribe(&family);
            if first {
                tracing::debug!(%family, "requesting font bytes");
                self.emit(Envelope::RequestCache(FontFamily {
                    font_family: family.clone(),
                }));
            }
            waits.push(async move {
                match rx.await {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(reason)) => Err(TextRenderError::relay(format!(
                        "font {family:?} unavailable: {reason}"
                    ))),
                    Err(_) => Err(TextRenderError::relay(format!(
                        "request for font {family:?} was abandoned"
                    ))),
                }
            });
        }

        let timeout = self.relay_timeout;
        async move {
            let all = futures::future::try_join_all(waits);
            match timeout {
                Some(after) => match tokio::time::timeout(after, all).await {
                    Ok(settled) => settled.map(drop),
                    Err(_) => Err(TextRenderError::timeout("font relay", after)),
                },
                None => all.await.map(drop),
            }
        }
        .boxed()
    }

    fn ensure_loaded(&mut self, family: &str) -> TextRenderResult<()> {
        if self.loaded.contains(family) {
            return Ok(());
        }
        let engine = self
            .engine
            .as_mut()
            .ok_or_else(|| TextRenderError::init("worker has no engine"))?;
        engine
            .load_font(family, &mut self.slots)
            .map_err(|err| TextRenderError::engine(format!("load font {family:?}: {err:#}")))?;
        tracing::info!(%family, "font loaded");
        self.loaded.insert(family.to_string());
        Ok(())
    }

    fn finish_init(&mut self, gate: TextRenderResult<()>) {
        let family = self.default_family.clone();
        match gate.and_then(|()| self.ensure_loaded(&family)) {
            Ok(()) => {
                self.set_state(WorkerState::Ready);
                tracing::info!(default_font = %family, "worker ready");
                self.emit(Envelope::Loaded);
            }
            Err(err) => self.fail_init(format!("default font {family:?}: {err}")),
        }
    }

    fn fail_init(&mut self, message: String) {
        tracing::error!(%message, "worker initialization failed");
        self.set_state(WorkerState::InitFailed);
        self.emit(Envelope::LoadErr(LoadErr { message }));
    }

    fn finish_preload(&mut self, family: String, gate: TextRenderResult<()>) {
        let error = gate
            .and_then(|()| self.ensure_loaded(&family))
            .err()
            .map(|err| err.to_string());
        self.emit(Envelope::LoadedFont(LoadedFont {
            font_family: family,
            error,
        }));
    }

    #[tracing::instrument(skip_all, fields(job_id = job.job_id))]
    fn run_job(&mut self, job: JobContent, gate: TextRenderResult<()>) {
        self.set_state(WorkerState::Busy);
        let reply = match gate.and_then(|()| self.exec_job(&job.text_data)) {
            Ok(result) => {
                tracing::debug!(commands = result.commands.len(), "job done");
                Envelope::RenderOk(RenderOk {
                    job_id: job.job_id,
                    result,
                })
            }
            Err(err) => {
                tracing::warn!(error = %err, "job failed");
                Self::rejection(&job, &err)
            }
        };
        self.set_state(WorkerState::Ready);
        self.emit(reply);
    }

    fn exec_job(&mut self, data: &TextData) -> TextRenderResult<DecodedResult> {
        for family in data.font_families() {
            self.ensure_loaded(&family)?;
        }
        let json = serde_json::to_string(&data.normalized())?;
        let engine = self
            .engine
            .as_mut()
            .ok_or_else(|| TextRenderError::init("worker has no engine"))?;
        let raw = engine
            .exec(&json)
            .map_err(|err| TextRenderError::engine(format!("{err:#}")))?;
        Ok(decode(&raw)?)
    }

    fn rejection(job: &JobContent, err: &TextRenderError) -> Envelope {
        Envelope::RenderErr(RenderErr {
            job_id: job.job_id,
            message: err.to_string(),
            text_data: serde_json::to_string(&job.text_data).unwrap_or_default(),
        })
    }

    fn emit(&self, env: Envelope) {
        if self.outbound.send(env).is_err() {
            tracing::debug!("controller channel closed, dropping outbound envelope");
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/worker/runtime.rs"]
mod tests;
