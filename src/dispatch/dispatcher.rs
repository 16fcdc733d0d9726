use std::{
    collections::{HashMap, VecDeque},
    future::Future,
    sync::Arc,
    time::Duration,
};

use tokio::{
    sync::{mpsc, oneshot},
    task::JoinSet,
    time::Instant,
};

use crate::{
    codec::command::DecodedResult,
    engine::LayoutEngine,
    foundation::{
        config::DispatcherOpts,
        error::{TextRenderError, TextRenderResult},
    },
    model::text_data::TextData,
    protocol::message::{
        Envelope, FontCache, FontFamily, JobContent, LoadedFont, RenderErr, RenderOk,
    },
    relay::resolver::FontResolver,
    worker::runtime::spawn_worker,
};

type InitFailureHook = Box<dyn FnOnce(&str) + Send + 'static>;

enum Control {
    Render {
        job: TextData,
        reply: oneshot::Sender<TextRenderResult<DecodedResult>>,
    },
    Preload {
        family: String,
        reply: oneshot::Sender<TextRenderResult<()>>,
    },
    Bind(Arc<dyn FontResolver>),
    OnInitFailure(InitFailureHook),
    Terminate,
}

/// Controller-side facade over one worker.
///
/// Jobs are queued and handed to the worker one at a time, in submission order;
/// a job's reply settles only the caller that submitted it. Font requests from
/// the worker are answered by the bound [`FontResolver`].
///
/// Must be created inside a tokio runtime. Dropping the dispatcher (or calling
/// [`Dispatcher::terminate`]) stops the controller task and the worker.
#[derive(Debug)]
pub struct Dispatcher {
    control: mpsc::UnboundedSender<Control>,
}

impl Dispatcher {
    /// Start a worker thread running the engine built by `factory` and attach to it.
    pub fn spawn<E, F>(factory: F, opts: DispatcherOpts) -> TextRenderResult<Self>
    where
        E: LayoutEngine + 'static,
        F: FnOnce() -> anyhow::Result<E> + Send + 'static,
    {
        let handle = tokio::runtime::Handle::try_current().map_err(|_| {
            TextRenderError::init("Dispatcher::spawn must run inside a tokio runtime")
        })?;
        let worker = spawn_worker(factory, &opts)?;
        Ok(Self::start(&handle, worker.to_worker, worker.from_worker, &opts))
    }

    /// Attach to an already running worker reachable through the given channels.
    pub fn attach(
        to_worker: mpsc::UnboundedSender<Envelope>,
        from_worker: mpsc::UnboundedReceiver<Envelope>,
        opts: DispatcherOpts,
    ) -> TextRenderResult<Self> {
        opts.validate()?;
        let handle = tokio::runtime::Handle::try_current().map_err(|_| {
            TextRenderError::init("Dispatcher::attach must run inside a tokio runtime")
        })?;
        Ok(Self::start(&handle, to_worker, from_worker, &opts))
    }

    fn start(
        handle: &tokio::runtime::Handle,
        to_worker: mpsc::UnboundedSender<Envelope>,
        from_worker: mpsc::UnboundedReceiver<Envelope>,
        opts: &DispatcherOpts,
    ) -> Self {
        let (control, control_rx) = mpsc::unbounded_channel();
        let controller = Controller::new(to_worker, opts.render_timeout());
        handle.spawn(controller.run(control_rx, from_worker));
        Self { control }
    }

    /// Submit a layout job.
    ///
    /// The job is enqueued when this is called, not when the future is first
    /// polled, so submission order is call order.
    pub fn render(
        &self,
        job: TextData,
    ) -> impl Future<Output = TextRenderResult<DecodedResult>> + Send + use<> {
        let (reply, rx) = oneshot::channel();
        let sent = job
            .validate()
            .map(|()| self.control.send(Control::Render { job, reply }).is_ok());
        async move {
            if !sent? {
                return Err(TextRenderError::disconnected("dispatcher terminated"));
            }
            rx.await
                .map_err(|_| TextRenderError::disconnected("dispatcher terminated"))?
        }
    }

    /// Load `family` into the worker ahead of any job that needs it.
    ///
    /// Concurrent calls for the same family share one request and all settle
    /// together.
    pub fn preload_font(
        &self,
        family: &str,
    ) -> impl Future<Output = TextRenderResult<()>> + Send + use<> {
        let (reply, rx) = oneshot::channel();
        let sent = self
            .control
            .send(Control::Preload {
                family: family.to_string(),
                reply,
            })
            .is_ok();
        async move {
            if !sent {
                return Err(TextRenderError::disconnected("dispatcher terminated"));
            }
            rx.await
                .map_err(|_| TextRenderError::disconnected("dispatcher terminated"))?
        }
    }

    /// Install the font resolver. Requests that arrived earlier are answered now.
    pub fn bind(&self, resolver: impl FontResolver) {
        self.bind_shared(Arc::new(resolver));
    }

    pub fn bind_shared(&self, resolver: Arc<dyn FontResolver>) {
        if self.control.send(Control::Bind(resolver)).is_err() {
            tracing::debug!("bind after terminate ignored");
        }
    }

    /// Register a callback fired once if worker initialization fails.
    ///
    /// Registering after the failure fires the callback right away.
    pub fn on_init_failure(&self, hook: impl FnOnce(&str) + Send + 'static) {
        if self
            .control
            .send(Control::OnInitFailure(Box::new(hook)))
            .is_err()
        {
            tracing::debug!("init failure hook after terminate ignored");
        }
    }

    /// Stop the worker. Pending and later calls fail with a disconnect error.
    pub fn terminate(&self) {
        let _ = self.control.send(Control::Terminate);
    }

    pub fn is_terminated(&self) -> bool {
        self.control.is_closed()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Phase {
    Starting,
    Ready,
    Failed(String),
}

struct QueuedJob {
    job: TextData,
    reply: oneshot::Sender<TextRenderResult<DecodedResult>>,
}

struct InFlight {
    job_id: u64,
    reply: oneshot::Sender<TextRenderResult<DecodedResult>>,
    deadline: Option<Instant>,
}

struct Controller {
    phase: Phase,
    to_worker: mpsc::UnboundedSender<Envelope>,
    resolver: Option<Arc<dyn FontResolver>>,
    /// Families the worker asked for before a resolver was bound.
    parked: Vec<String>,
    resolving: JoinSet<()>,
    queue: VecDeque<QueuedJob>,
    in_flight: Option<InFlight>,
    next_job_id: u64,
    preloads: HashMap<String, Vec<oneshot::Sender<TextRenderResult<()>>>>,
    init_hooks: Vec<InitFailureHook>,
    render_timeout: Option<Duration>,
}

impl Controller {
    fn new(to_worker: mpsc::UnboundedSender<Envelope>, render_timeout: Option<Duration>) -> Self {
        Self {
            phase: Phase::Starting,
            to_worker,
            resolver: None,
            parked: Vec::new(),
            resolving: JoinSet::new(),
            queue: VecDeque::new(),
            in_flight: None,
            next_job_id: 1,
            preloads: HashMap::new(),
            init_hooks: Vec::new(),
            render_timeout,
        }
    }

    #[tracing::instrument(name = "dispatcher", skip_all)]
    async fn run(
        mut self,
        mut control: mpsc::UnboundedReceiver<Control>,
        mut from_worker: mpsc::UnboundedReceiver<Envelope>,
    ) {
        loop {
            let deadline = self.in_flight.as_ref().and_then(|f| f.deadline);
            tokio::select! {
                cmd = control.recv() => match cmd {
                    Some(Control::Terminate) | None => {
                        tracing::info!("terminating worker");
                        break;
                    }
                    Some(cmd) => self.on_control(cmd),
                },
                msg = from_worker.recv() => match msg {
                    Some(env) => self.on_worker(env),
                    None => {
                        self.fail_all(|| TextRenderError::disconnected("worker exited"));
                        break;
                    }
                },
                () = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)),
                    if deadline.is_some() =>
                {
                    self.on_render_timeout();
                }
                Some(joined) = self.resolving.join_next(), if !self.resolving.is_empty() => {
                    if let Err(err) = joined {
                        tracing::warn!(error = %err, "font resolver task did not complete");
                    }
                }
            }
        }
        // dropping `self` closes the worker channel and every pending reply
        self.resolving.abort_all();
    }

    fn on_control(&mut self, cmd: Control) {
        match cmd {
            Control::Render { job, reply } => {
                if let Phase::Failed(msg) = &self.phase {
                    let _ = reply.send(Err(TextRenderError::init(msg.clone())));
                    return;
                }
                self.queue.push_back(QueuedJob { job, reply });
                self.pump();
            }
            Control::Preload { family, reply } => {
                if let Phase::Failed(msg) = &self.phase {
                    let _ = reply.send(Err(TextRenderError::init(msg.clone())));
                    return;
                }
                if let Some(waiters) = self.preloads.get_mut(&family) {
                    waiters.push(reply);
                    return;
                }
                tracing::debug!(%family, "preloading font");
                self.preloads.insert(family.clone(), vec![reply]);
                self.send(Envelope::Preload(FontFamily {
                    font_family: family,
                }));
            }
            Control::Bind(resolver) => {
                self.resolver = Some(resolver);
                for family in std::mem::take(&mut self.parked) {
                    self.resolve(family);
                }
            }
            Control::OnInitFailure(hook) => match &self.phase {
                Phase::Failed(msg) => hook(msg),
                _ => self.init_hooks.push(hook),
            },
            Control::Terminate => {}
        }
    }

    fn on_worker(&mut self, env: Envelope) {
        match env {
            Envelope::RequestCache(FontFamily { font_family }) => self.resolve(font_family),
            Envelope::Loaded => {
                tracing::info!("worker ready");
                self.phase = Phase::Ready;
                self.pump();
            }
            Envelope::LoadErr(err) => self.on_init_failed(err.message),
            Envelope::RenderOk(RenderOk { job_id, result }) => self.settle(job_id, Ok(result)),
            Envelope::RenderErr(RenderErr {
                job_id,
                message,
                text_data,
            }) => {
                tracing::error!(job_id, %message, %text_data, "render failed");
                self.settle(
                    job_id,
                    Err(TextRenderError::Render {
                        job_id,
                        message,
                        text_data,
                    }),
                );
            }
            Envelope::LoadedFont(LoadedFont { font_family, error }) => {
                let Some(waiters) = self.preloads.remove(&font_family) else {
                    tracing::debug!(family = %font_family, "no caller waiting on preload");
                    return;
                };
                for reply in waiters {
                    let outcome = match &error {
                        None => Ok(()),
                        Some(reason) => Err(TextRenderError::relay(format!(
                            "preload of {font_family:?} failed: {reason}"
                        ))),
                    };
                    let _ = reply.send(outcome);
                }
            }
            Envelope::Unrecognized { kind } => {
                tracing::warn!(%kind, "ignoring unrecognized envelope");
            }
            other => {
                tracing::debug!(kind = other.kind(), "ignoring worker-bound envelope");
            }
        }
    }

    fn on_init_failed(&mut self, message: String) {
        tracing::error!(%message, "worker failed to initialize");
        for hook in self.init_hooks.drain(..) {
            hook(&message);
        }
        self.phase = Phase::Failed(message.clone());
        self.fail_all(|| TextRenderError::init(message.clone()));
    }

    fn fail_all(&mut self, err: impl Fn() -> TextRenderError) {
        if let Some(flight) = self.in_flight.take() {
            let _ = flight.reply.send(Err(err()));
        }
        for queued in self.queue.drain(..) {
            let _ = queued.reply.send(Err(err()));
        }
        for (_, waiters) in self.preloads.drain() {
            for reply in waiters {
                let _ = reply.send(Err(err()));
            }
        }
    }

    /// Hand the next queued job to the worker if it is idle.
    fn pump(&mut self) {
        if self.phase != Phase::Ready || self.in_flight.is_some() {
            return;
        }
        while let Some(QueuedJob { job, reply }) = self.queue.pop_front() {
            if reply.is_closed() {
                tracing::debug!("caller gave up before dispatch, skipping job");
                continue;
            }
            let job_id = self.next_job_id;
            self.next_job_id += 1;
            let env = Envelope::TextData(JobContent {
                job_id,
                text_data: job,
            });
            if self.to_worker.send(env).is_err() {
                let _ = reply.send(Err(TextRenderError::disconnected("worker exited")));
                continue;
            }
            tracing::debug!(job_id, queued = self.queue.len(), "job dispatched");
            self.in_flight = Some(InFlight {
                job_id,
                reply,
                deadline: self.render_timeout.map(|after| Instant::now() + after),
            });
            return;
        }
    }

    fn settle(&mut self, job_id: u64, outcome: TextRenderResult<DecodedResult>) {
        match self.in_flight.take() {
            Some(flight) if flight.job_id == job_id => {
                let _ = flight.reply.send(outcome);
                self.pump();
            }
            other => {
                self.in_flight = other;
                tracing::warn!(job_id, "dropping reply for a job that is no longer in flight");
            }
        }
    }

    fn on_render_timeout(&mut self) {
        let Some(flight) = self.in_flight.take() else {
            return;
        };
        let after = self.render_timeout.unwrap_or_default();
        tracing::warn!(job_id = flight.job_id, ?after, "render timed out");
        let what = format!("render job {}", flight.job_id);
        let _ = flight.reply.send(Err(TextRenderError::timeout(what, after)));
        self.pump();
    }

    fn resolve(&mut self, family: String) {
        let Some(resolver) = self.resolver.clone() else {
            tracing::debug!(%family, "no resolver bound yet, parking font request");
            self.parked.push(family);
            return;
        };
        let to_worker = self.to_worker.clone();
        self.resolving.spawn(async move {
            let answer = match resolver.resolve(&family).await {
                Ok(bytes) => FontCache::fulfilled(family.as_str(), bytes),
                Err(err) => {
                    tracing::warn!(%family, error = %err, "font resolver failed");
                    FontCache::failed(family.as_str(), format!("{err:#}"))
                }
            };
            if to_worker.send(Envelope::FontCache(answer)).is_err() {
                tracing::debug!(%family, "worker gone before font delivery");
            }
        });
    }

    fn send(&self, env: Envelope) {
        if self.to_worker.send(env).is_err() {
            tracing::debug!("worker channel closed, dropping envelope");
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/dispatch/dispatcher.rs"]
mod tests;
