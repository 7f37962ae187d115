//! The metadata router: registry, source selection, scheduling, dedup and
//! fallback.
//!
//! The router is the single writer coordinating everything between inputs
//! and outputs. It subscribes to every input, keeps per-output
//! priority-based source selection with automatic fallback as sources
//! expire, schedules delayed cancellable deliveries on the shared
//! [`Timeline`], deduplicates identical deliveries and applies the
//! per-input prefix/suffix and formatter chains.
//!
//! # Tasks
//!
//! [`Router::run`] owns a set of cooperative tasks: one per input's
//! acquisition loop, one consumer per input subscription, one per output,
//! the timeline processor and the 1 Hz expiration checker. A single
//! cancellation token winds all of them down.
//!
//! # Ordering
//!
//! Per output, at most one delivery is ever pending: an input change
//! cancels whatever is still queued for that output before scheduling
//! (the freshest observation always wins), and the expiration checker
//! skips outputs that already have something queued. The last-sent
//! comparison is serialized per output under the router's lock, so dedup
//! is never stale.

use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
    time::{Duration, SystemTime},
};

use futures_util::future::join_all;
use tokio::{sync::mpsc, task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::{
    error::{Error, Result},
    format::Formatter,
    input::Input,
    metadata::Metadata,
    output::Output,
    text::StructuredText,
    timeline::{ScheduledUpdate, Timeline, UpdateKind},
};

/// Capacity of each input's notification channel.
///
/// The consumer is the router itself and drains promptly; ten buffered
/// changes absorb any realistic publish burst. Overflow drops the
/// notification, never blocks the input.
const SUBSCRIBER_CAPACITY: usize = 10;

/// Tick interval of the expiration checker.
///
/// Expiration is minute-grained and delays are whole seconds, so one tick
/// per second is plenty.
const EXPIRATION_TICK: Duration = Duration::from_secs(1);

/// Per-input presentation settings.
#[derive(Default)]
struct InputSettings {
    /// Text rendered before the artist.
    prefix: String,

    /// Text rendered after the title.
    suffix: String,

    /// Ordered formatter chain, applied before the output's chain.
    formatters: Vec<Arc<dyn Formatter>>,
}

/// Everything registered for one output.
struct OutputEntry {
    handle: Arc<dyn Output>,

    /// Priority-ordered input names; selection picks the first available.
    inputs: Vec<String>,

    /// Ordered formatter chain, applied after the input's chain.
    formatters: Vec<Arc<dyn Formatter>>,
}

/// Mutable per-output routing state, under the router's lock.
#[derive(Default)]
struct OutputState {
    /// Most recently delivered rendered text, for dedup.
    last_sent: Option<String>,

    /// Name of the input that last fed this output.
    current_source: Option<String>,

    /// Whether the one-shot "no available sources" warning fired.
    source_warning_logged: bool,
}

/// The central registry, subscription manager and scheduling brain.
///
/// Registration happens before [`Router::run`]; the topology is static
/// afterwards.
pub struct Router {
    inputs: HashMap<String, Arc<dyn Input>>,
    settings: HashMap<String, InputSettings>,
    outputs: HashMap<String, OutputEntry>,
    timeline: Timeline,
    state: RwLock<HashMap<String, OutputState>>,
}

impl Router {
    /// Creates an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inputs: HashMap::new(),
            settings: HashMap::new(),
            outputs: HashMap::new(),
            timeline: Timeline::new(),
            state: RwLock::new(HashMap::new()),
        }
    }

    /// Registers an input.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyExists` for a duplicate name; fatal at startup.
    pub fn add_input(&mut self, input: Arc<dyn Input>) -> Result<()> {
        let name = input.name().to_string();
        if self.inputs.contains_key(&name) {
            return Err(Error::already_exists(format!(
                "input {name} is already registered"
            )));
        }

        self.settings.insert(name.clone(), InputSettings::default());
        self.inputs.insert(name, input);
        Ok(())
    }

    /// Registers an output.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyExists` for a duplicate name; fatal at startup.
    pub fn add_output(&mut self, output: Arc<dyn Output>) -> Result<()> {
        let name = output.name().to_string();
        if self.outputs.contains_key(&name) {
            return Err(Error::already_exists(format!(
                "output {name} is already registered"
            )));
        }

        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.clone(), OutputState::default());
        self.outputs.insert(
            name,
            OutputEntry {
                handle: output,
                inputs: Vec::new(),
                formatters: Vec::new(),
            },
        );
        Ok(())
    }

    /// Installs an output's priority input list, highest priority first.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the output or any referenced input is not
    /// registered.
    pub fn set_output_inputs(&mut self, output: &str, inputs: &[String]) -> Result<()> {
        for name in inputs {
            if !self.inputs.contains_key(name) {
                return Err(Error::not_found(format!(
                    "output {output} references unknown input {name}"
                )));
            }
        }

        self.output_entry_mut(output)?.inputs = inputs.to_vec();
        Ok(())
    }

    /// Installs an output's formatter chain.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the output is not registered.
    pub fn set_output_formatters(
        &mut self,
        output: &str,
        formatters: Vec<Arc<dyn Formatter>>,
    ) -> Result<()> {
        self.output_entry_mut(output)?.formatters = formatters;
        Ok(())
    }

    /// Installs an input's formatter chain.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the input is not registered.
    pub fn set_input_formatters(
        &mut self,
        input: &str,
        formatters: Vec<Arc<dyn Formatter>>,
    ) -> Result<()> {
        self.input_settings_mut(input)?.formatters = formatters;
        Ok(())
    }

    /// Installs an input's prefix and suffix.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the input is not registered.
    pub fn set_input_affixes(&mut self, input: &str, prefix: String, suffix: String) -> Result<()> {
        let settings = self.input_settings_mut(input)?;
        settings.prefix = prefix;
        settings.suffix = suffix;
        Ok(())
    }

    fn output_entry_mut(&mut self, output: &str) -> Result<&mut OutputEntry> {
        self.outputs
            .get_mut(output)
            .ok_or_else(|| Error::not_found(format!("output {output} is not registered")))
    }

    fn input_settings_mut(&mut self, input: &str) -> Result<&mut InputSettings> {
        self.settings
            .get_mut(input)
            .ok_or_else(|| Error::not_found(format!("input {input} is not registered")))
    }

    /// Runs the router until cancellation.
    ///
    /// Spawns the timeline processor, the expiration checker and one task
    /// per input and output, then primes every output from inputs that
    /// already hold an available value (static text). Returns once every
    /// task has wound down after cancellation.
    ///
    /// # Errors
    ///
    /// Returns `FailedPrecondition` when no inputs are registered or when
    /// the router is already running.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) -> Result<()> {
        if self.inputs.is_empty() {
            return Err(Error::failed_precondition("no inputs registered"));
        }

        let waker = self
            .timeline
            .take_waker()
            .ok_or_else(|| Error::failed_precondition("router is already running"))?;

        // Outputs that serve their own clients get the resolved handles.
        for entry in self.outputs.values() {
            let handles = entry
                .inputs
                .iter()
                .filter_map(|name| self.inputs.get(name))
                .cloned()
                .collect();
            entry.handle.set_inputs(handles);
        }

        let mut tasks: Vec<JoinHandle<()>> = Vec::new();

        for input in self.inputs.values() {
            let (notify_tx, notify_rx) = mpsc::channel(SUBSCRIBER_CAPACITY);
            input.subscribe(notify_tx);
            tasks.push(tokio::spawn(Arc::clone(&self).consume_input(
                input.name().to_string(),
                notify_rx,
                shutdown.clone(),
            )));

            let input = Arc::clone(input);
            let shutdown = shutdown.clone();
            tasks.push(tokio::spawn(async move {
                if let Err(e) = input.run(shutdown).await {
                    error!("input {}: {e}", input.name());
                }
            }));
        }

        for entry in self.outputs.values() {
            let output = Arc::clone(&entry.handle);
            let shutdown = shutdown.clone();
            tasks.push(tokio::spawn(async move {
                if let Err(e) = output.run(shutdown).await {
                    error!("output {}: {e}", output.name());
                }
            }));
        }

        tasks.push(tokio::spawn(
            Arc::clone(&self).process_timeline(waker, shutdown.clone()),
        ));
        tasks.push(tokio::spawn(
            Arc::clone(&self).run_expiration_checker(shutdown.clone()),
        ));

        info!(
            "router started with {} input(s), {} output(s)",
            self.inputs.len(),
            self.outputs.len()
        );

        // Prime: a static input already holds its value and will never
        // notify, so walk every input once after subscribing.
        for input in self.inputs.values() {
            if let Some(metadata) = input.metadata() {
                if metadata.is_available() {
                    self.schedule_on_input_change(input.name(), &metadata);
                }
            }
        }

        shutdown.cancelled().await;
        for task in tasks {
            let _ = task.await;
        }
        info!("router stopped");
        Ok(())
    }

    /// Consumes one input's change notifications.
    async fn consume_input(
        self: Arc<Self>,
        input: String,
        mut notifications: mpsc::Receiver<Metadata>,
        shutdown: CancellationToken,
    ) {
        loop {
            tokio::select! {
                biased;

                () = shutdown.cancelled() => break,

                notification = notifications.recv() => match notification {
                    Some(metadata) => self.schedule_on_input_change(&input, &metadata),
                    None => break,
                },
            }
        }
    }

    /// Routes one input change into timeline entries.
    ///
    /// For every output listing the changed input: the change only matters
    /// when priority selection picks that very input; anything still
    /// pending for the output is cancelled, then a delivery is scheduled
    /// at `now + delay` with the changed value snapshot.
    fn schedule_on_input_change(&self, input: &str, metadata: &Metadata) {
        for (output, entry) in &self.outputs {
            if !entry.inputs.iter().any(|name| name == input) {
                continue;
            }

            let Some(selected) = self.select_source(entry) else {
                continue;
            };
            if selected != input {
                trace!("{output}: {selected} outranks {input}, ignoring change");
                continue;
            }
            let delay = entry.handle.delay();

            // Cancel-then-insert is atomic under the router lock, so two
            // inputs changing at once cannot leave this output with more
            // than one pending delivery.
            let _serialized = self.state.write().unwrap_or_else(PoisonError::into_inner);
            let cancelled = self.timeline.cancel_for_output(output);
            if cancelled > 0 {
                debug!("{output}: superseding {cancelled} pending update(s)");
            }

            debug!(
                "{output}: scheduling \"{}\" from {input} in {}s",
                metadata.format_string(),
                delay.as_secs()
            );
            self.timeline.insert(ScheduledUpdate {
                execute_at: SystemTime::now() + delay,
                output: output.clone(),
                metadata: metadata.clone(),
                kind: UpdateKind::InputChange,
            });
        }
    }

    /// First input in the priority list whose value is available.
    fn select_source<'a>(&self, entry: &'a OutputEntry) -> Option<&'a str> {
        entry
            .inputs
            .iter()
            .find(|name| {
                self.inputs
                    .get(name.as_str())
                    .and_then(|input| input.metadata())
                    .is_some_and(|metadata| metadata.is_available())
            })
            .map(String::as_str)
    }

    /// Ticks the expiration checker until cancellation.
    async fn run_expiration_checker(self: Arc<Self>, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(EXPIRATION_TICK);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                () = shutdown.cancelled() => break,

                _ = ticker.tick() => self.check_expirations(),
            }
        }
    }

    /// One expiration sweep over all outputs.
    ///
    /// Outputs with a pending delivery advance on their own. For the rest,
    /// a current source that went unavailable is replaced by the first
    /// available input in priority order; when none exists the current
    /// source is cleared and a one-shot warning logged. A fallback that
    /// would render the text already sent is skipped.
    fn check_expirations(&self) {
        for (output, entry) in &self.outputs {
            if self.timeline.has_pending_for(output) {
                continue;
            }

            let current = self
                .state
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .get(output)
                .and_then(|state| state.current_source.clone());

            let Some(current) = current else {
                // Never fed and nothing to feed it with: say so, once.
                if self.select_source(entry).is_none() {
                    self.warn_no_sources(output);
                }
                continue;
            };

            let still_available = self
                .inputs
                .get(&current)
                .and_then(|input| input.metadata())
                .is_some_and(|metadata| metadata.is_available());
            if still_available {
                continue;
            }

            let Some(fallback) = self.select_source(entry) else {
                self.warn_no_sources(output);
                continue;
            };
            if fallback == current {
                // Selection disagrees with the availability probe above;
                // leave it to the next tick.
                continue;
            }

            let Some(metadata) = self
                .inputs
                .get(fallback)
                .and_then(|input| input.metadata())
            else {
                continue;
            };
            let Some(text) = self.render(entry, &metadata) else {
                continue;
            };
            let rendered = text.to_string();
            let delay = entry.handle.delay();

            // Re-check under the router lock: a delivery scheduled since
            // the probes above supersedes this fallback, and text equal to
            // the last sent would be a no-op.
            let states = self.state.write().unwrap_or_else(PoisonError::into_inner);
            if self.timeline.has_pending_for(output) {
                continue;
            }
            let unchanged = states
                .get(output)
                .is_some_and(|state| state.last_sent.as_deref() == Some(rendered.as_str()));
            if unchanged {
                continue;
            }

            info!("{output}: {current} expired, falling back to {fallback}");
            self.timeline.insert(ScheduledUpdate {
                execute_at: SystemTime::now() + delay,
                output: output.clone(),
                metadata,
                kind: UpdateKind::ExpirationFallback,
            });
        }
    }

    /// Clears an output's current source and logs the condition once.
    fn warn_no_sources(&self, output: &str) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(state) = state.get_mut(output) {
            state.current_source = None;
            if !state.source_warning_logged {
                state.source_warning_logged = true;
                warn!("{output}: no available sources");
            }
        }
    }

    /// Builds an output's structured text for a metadata snapshot.
    ///
    /// Returns `None` when there is no content to deliver. The input's
    /// prefix/suffix and identity are applied first, then the input's
    /// formatter chain, then the output's.
    fn render(&self, entry: &OutputEntry, metadata: &Metadata) -> Option<StructuredText> {
        let mut text = StructuredText::from(metadata);
        if !text.has_content() {
            return None;
        }

        // The snapshot's source name resolves the input identity even when
        // the input has advanced since scheduling.
        if let Some(input) = self.inputs.get(&metadata.source) {
            text.input_kind = input.kind().to_string();
        }
        if let Some(settings) = self.settings.get(&metadata.source) {
            text.prefix = settings.prefix.clone();
            text.suffix = settings.suffix.clone();
            for formatter in &settings.formatters {
                formatter.format(&mut text);
            }
        }
        for formatter in &entry.formatters {
            formatter.format(&mut text);
        }

        Some(text)
    }

    /// Executes one due update: render, dedup, deliver.
    ///
    /// Dedup state advances before the send on purpose: a transient sink
    /// failure is not retried until the content next genuinely changes.
    async fn execute_update(&self, update: &ScheduledUpdate) {
        let Some(entry) = self.outputs.get(&update.output) else {
            return;
        };
        let Some(text) = self.render(entry, &update.metadata) else {
            trace!(
                "{}: nothing to deliver from {}",
                update.output,
                update.metadata.source
            );
            return;
        };

        let rendered = text.to_string();
        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            let Some(state) = state.get_mut(&update.output) else {
                return;
            };
            if state.last_sent.as_deref() == Some(rendered.as_str()) {
                debug!("{}: suppressing duplicate delivery", update.output);
                return;
            }
            state.last_sent = Some(rendered.clone());
            state.current_source = Some(update.metadata.source.clone());
            state.source_warning_logged = false;
        }

        info!("{}: sending \"{rendered}\" ({})", update.output, update.kind);
        if let Err(e) = entry.handle.send(&text).await {
            error!("{}: delivery failed: {e}", update.output);
        }
    }

    /// Event-driven timeline processor.
    ///
    /// Sleeps until the head entry is due, a wake signal arrives (a new
    /// insertion may be due sooner) or cancellation. Due entries are
    /// executed concurrently and the batch is joined before the next
    /// iteration, bounding concurrency to the ready count.
    async fn process_timeline(
        self: Arc<Self>,
        mut waker: mpsc::Receiver<()>,
        shutdown: CancellationToken,
    ) {
        loop {
            match self.timeline.next_execution_time() {
                None => {
                    tokio::select! {
                        biased;

                        () = shutdown.cancelled() => break,

                        wake = waker.recv() => {
                            if wake.is_none() {
                                break;
                            }
                        }
                    }
                }

                Some(due) => {
                    // Wall-clock due time, monotonic sleep; reconciled on
                    // every wake.
                    let wait = due
                        .duration_since(SystemTime::now())
                        .unwrap_or(Duration::ZERO);
                    if !wait.is_zero() {
                        tokio::select! {
                            biased;

                            () = shutdown.cancelled() => break,

                            wake = waker.recv() => {
                                if wake.is_none() {
                                    break;
                                }
                                continue;
                            }

                            () = tokio::time::sleep(wait) => {}
                        }
                    }

                    let ready = self.timeline.drain_ready(SystemTime::now());
                    join_all(ready.iter().map(|update| self.execute_update(update))).await;
                }
            }
        }
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::{
        error::ErrorKind,
        format,
        input::{InputBase, TextInput},
    };

    use super::*;

    /// Input whose value tests set directly through the base.
    struct ProbeInput {
        base: InputBase,
    }

    impl ProbeInput {
        fn new(name: &str) -> Arc<Self> {
            Arc::new(Self {
                base: InputBase::new(name),
            })
        }
    }

    #[async_trait]
    impl Input for ProbeInput {
        fn base(&self) -> &InputBase {
            &self.base
        }

        fn kind(&self) -> &'static str {
            "probe"
        }

        async fn run(&self, shutdown: CancellationToken) -> Result<()> {
            shutdown.cancelled().await;
            Ok(())
        }
    }

    /// Output recording every delivered rendered string.
    struct ProbeOutput {
        name: String,
        delay: Duration,
        sent: Mutex<Vec<String>>,
    }

    impl ProbeOutput {
        fn new(name: &str, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                delay,
                sent: Mutex::new(Vec::new()),
            })
        }

        fn sent(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Output for ProbeOutput {
        fn name(&self) -> &str {
            &self.name
        }

        fn kind(&self) -> &'static str {
            "probe"
        }

        fn delay(&self) -> Duration {
            self.delay
        }

        async fn send(&self, text: &StructuredText) -> Result<()> {
            self.sent.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    fn start(router: Router) -> (Arc<Router>, CancellationToken) {
        let router = Arc::new(router);
        let shutdown = CancellationToken::new();
        tokio::spawn(Arc::clone(&router).run(shutdown.clone()));
        (router, shutdown)
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(400)).await;
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut router = Router::new();
        router.add_input(ProbeInput::new("live")).unwrap();
        let error = router.add_input(ProbeInput::new("live")).unwrap_err();
        assert_eq!(error.kind, ErrorKind::AlreadyExists);

        router
            .add_output(ProbeOutput::new("stream", Duration::ZERO))
            .unwrap();
        let error = router
            .add_output(ProbeOutput::new("stream", Duration::ZERO))
            .unwrap_err();
        assert_eq!(error.kind, ErrorKind::AlreadyExists);
    }

    #[test]
    fn priority_lists_must_reference_registered_inputs() {
        let mut router = Router::new();
        router.add_input(ProbeInput::new("live")).unwrap();
        router
            .add_output(ProbeOutput::new("stream", Duration::ZERO))
            .unwrap();

        let error = router
            .set_output_inputs("stream", &["live".to_string(), "ghost".to_string()])
            .unwrap_err();
        assert_eq!(error.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn start_requires_an_input() {
        let router = Arc::new(Router::new());
        let error = router.run(CancellationToken::new()).await.unwrap_err();
        assert_eq!(error.kind, ErrorKind::FailedPrecondition);
    }

    #[tokio::test]
    async fn priority_fallback_and_takeover() {
        let live = ProbeInput::new("live");
        let output = ProbeOutput::new("stream", Duration::ZERO);

        let mut router = Router::new();
        router.add_input(Arc::clone(&live) as Arc<dyn Input>).unwrap();
        router
            .add_input(Arc::new(TextInput::new("text", "Welcome")))
            .unwrap();
        router
            .add_output(Arc::clone(&output) as Arc<dyn Output>)
            .unwrap();
        router
            .set_output_inputs("stream", &["live".to_string(), "text".to_string()])
            .unwrap();

        let (_router, shutdown) = start(router);
        settle().await;

        // The static fallback primes the output.
        assert_eq!(output.sent(), ["Welcome"]);

        // The higher-priority input takes over as soon as it publishes.
        live.base.set_metadata(Metadata::new("A", "T"));
        settle().await;
        assert_eq!(output.sent(), ["Welcome", "A - T"]);

        shutdown.cancel();
    }

    #[tokio::test]
    async fn delayed_delivery_is_cancelled_by_a_newer_change() {
        let live = ProbeInput::new("live");
        let output = ProbeOutput::new("stream", Duration::from_secs(1));

        let mut router = Router::new();
        router.add_input(Arc::clone(&live) as Arc<dyn Input>).unwrap();
        router
            .add_output(Arc::clone(&output) as Arc<dyn Output>)
            .unwrap();
        router.set_output_inputs("stream", &["live".to_string()]).unwrap();

        let (_router, shutdown) = start(router);
        tokio::time::sleep(Duration::from_millis(200)).await;

        live.base.set_metadata(Metadata::new("", "T1"));
        tokio::time::sleep(Duration::from_millis(300)).await;
        live.base.set_metadata(Metadata::new("", "T2"));

        // Before the (rescheduled) delay elapses nothing went out.
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(output.sent(), Vec::<String>::new());

        // Exactly one delivery, derived from the newer value.
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(output.sent(), ["T2"]);

        shutdown.cancel();
    }

    #[tokio::test]
    async fn identical_content_is_delivered_once() {
        let live = ProbeInput::new("live");
        let output = ProbeOutput::new("stream", Duration::ZERO);

        let mut router = Router::new();
        router.add_input(Arc::clone(&live) as Arc<dyn Input>).unwrap();
        router
            .add_output(Arc::clone(&output) as Arc<dyn Output>)
            .unwrap();
        router.set_output_inputs("stream", &["live".to_string()]).unwrap();

        let (_router, shutdown) = start(router);
        settle().await;

        live.base.set_metadata(Metadata::new("A", "T"));
        settle().await;
        // A re-publish of the same content does not notify; a differing
        // song id does notify but renders identically and is deduplicated.
        let mut same_text = Metadata::new("A", "T");
        same_text.song_id = Some("new-id".to_string());
        live.base.set_metadata(same_text);

        // Give the expiration checker a few ticks as well.
        tokio::time::sleep(Duration::from_millis(2200)).await;
        assert_eq!(output.sent(), ["A - T"]);

        shutdown.cancel();
    }

    #[tokio::test]
    async fn expired_source_falls_back_to_next_available() {
        let live = ProbeInput::new("live");
        let output = ProbeOutput::new("stream", Duration::ZERO);

        let mut router = Router::new();
        router.add_input(Arc::clone(&live) as Arc<dyn Input>).unwrap();
        router
            .add_input(Arc::new(TextInput::new("text", "Welcome")))
            .unwrap();
        router
            .add_output(Arc::clone(&output) as Arc<dyn Output>)
            .unwrap();
        router
            .set_output_inputs("stream", &["live".to_string(), "text".to_string()])
            .unwrap();

        let (_router, shutdown) = start(router);
        settle().await;
        assert_eq!(output.sent(), ["Welcome"]);

        let mut short_lived = Metadata::new("A", "T");
        short_lived.expires_at = Some(SystemTime::now() + Duration::from_secs(1));
        live.base.set_metadata(short_lived);
        settle().await;
        assert_eq!(output.sent(), ["Welcome", "A - T"]);

        // Within a tick or two of the expiry, the checker reinstates the
        // static fallback.
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(output.sent(), ["Welcome", "A - T", "Welcome"]);

        shutdown.cancel();
    }

    #[tokio::test]
    async fn unavailable_everything_delivers_nothing() {
        let live = ProbeInput::new("live");
        let output = ProbeOutput::new("stream", Duration::ZERO);

        let mut router = Router::new();
        router.add_input(Arc::clone(&live) as Arc<dyn Input>).unwrap();
        router
            .add_output(Arc::clone(&output) as Arc<dyn Output>)
            .unwrap();
        router.set_output_inputs("stream", &["live".to_string()]).unwrap();

        let (_router, shutdown) = start(router);
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(output.sent(), Vec::<String>::new());
        shutdown.cancel();
    }

    #[tokio::test]
    async fn affixes_and_formatters_shape_the_delivery() {
        let live = ProbeInput::new("live");
        let output = ProbeOutput::new("stream", Duration::ZERO);

        let mut router = Router::new();
        router.add_input(Arc::clone(&live) as Arc<dyn Input>).unwrap();
        router
            .add_output(Arc::clone(&output) as Arc<dyn Output>)
            .unwrap();
        router.set_output_inputs("stream", &["live".to_string()]).unwrap();
        router
            .set_input_affixes("live", "Nu: ".to_string(), String::new())
            .unwrap();
        router
            .set_output_formatters("stream", vec![format::formatter_by_name("uppercase").unwrap()])
            .unwrap();

        let (_router, shutdown) = start(router);
        settle().await;

        live.base.set_metadata(Metadata::new("Queen", "One Vision"));
        settle().await;
        assert_eq!(output.sent(), ["Nu: QUEEN - ONE VISION"]);

        shutdown.cancel();
    }
}
