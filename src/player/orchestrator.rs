//! The deck orchestrator.
//!
//! [`StoryPlayer`] owns the ordered story records, slides the prefetch
//! window over them, and drives every embedded document through the
//! collaborator seams: containers, messaging channels, the momentum
//! scroller and the viewport arrival watch.  All mutable state lives in
//! one mutex that is never held across an await; asynchronous
//! continuations re-lock and check the record's attach generation before
//! touching anything, so a navigation that supersedes them is always
//! safe.

use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::config::PlayerConfig;
use crate::core::protocol::{
    DocumentStateKind, InboundMessage, Request, StateUpdate, TouchEvent, VisibilityState,
};
use crate::core::signal::Signal;
use crate::core::url::{resolve_cache_url, sanitized_equals, viewer_source_url, SUPPORTED_CACHES};
use crate::error::{PlayerError, Superseded};
use crate::events::PlayerEvent;
use crate::fetch::{expand_endpoint, StoryFetcher};
use crate::host::{ContainerHost, ContainerId, DragStyle, ScrollSurface, StoryPosition, ViewportProbe};
use crate::messaging::{send, ChannelFactory, StoryChannel};
use crate::player::gesture::{GestureRelease, GestureSample, GestureTracker, SwipingState};
use crate::player::scroller::{MomentumScroller, ScrollerTuning};
use crate::player::story::{StoryEntry, StoryRecord};
use crate::player::viewport::{spawn_arrival_watch, ArrivalTuning};

/// Stories within this distance of the current one stay attached.
const MAX_DISTANCE: usize = 1;

/// Fetch more stories once this few remain ahead of the current one.
const FETCH_STORIES_THRESHOLD: usize = 2;

/// Passthrough event names that trigger a forward navigation instead of
/// reaching the embedder.
const SKIP_NEXT_EVENTS: [&str; 2] = ["amp-story-player-skip-next", "amp-story-player-skip-to-next"];

// ───────────────────────────────────────── options ───────────

/// Construction-time knobs.
#[derive(Debug, Clone)]
pub struct PlayerOptions {
    /// Embedding origin advertised to story documents.
    pub origin: String,
    /// CDN cache host for story URL rewriting, when configured.
    pub cache_host: Option<String>,
    /// Horizontal travel needed to commit a swipe navigation.
    pub swipe_commit_px: f64,
    pub arrival: ArrivalTuning,
    pub scroller: ScrollerTuning,
}

impl Default for PlayerOptions {
    fn default() -> Self {
        Self {
            origin: String::new(),
            cache_host: None,
            swipe_commit_px: 50.0,
            arrival: ArrivalTuning::default(),
            scroller: ScrollerTuning::default(),
        }
    }
}

/// Collaborators supplied by the embedding application.
pub struct PlayerDeps {
    pub containers: Arc<dyn ContainerHost>,
    pub channels: Arc<dyn ChannelFactory>,
    pub probe: Arc<dyn ViewportProbe>,
    pub surface: Arc<dyn ScrollSurface>,
    pub fetcher: Arc<dyn StoryFetcher>,
}

// ───────────────────────────────────────── player ────────────

struct PlayerInner {
    stories: Vec<StoryRecord>,
    current: usize,
    playing: bool,
    circular_wrapping: bool,
    attribution_auto: bool,
    page_scroll_enabled: bool,
    /// Lazily derived from the config on the first fetch attempt.
    fetching_enabled: Option<bool>,
    fetch_in_flight: bool,
    cache_host: Option<String>,
    config: PlayerConfig,
    touch: GestureTracker,
    swiping: SwipingState,
    /// Open page attachments veto swipe navigation.
    page_attachment_open: bool,
    /// Gate for neighbor render chains: resolves when the story at the
    /// paired index reports its content loaded.  Re-armed (cancelling the
    /// stale gate) whenever the current story changes.
    current_ready: Option<(usize, Signal)>,
    /// Resolves once the player's root element nears the viewport.
    visible: Signal,
    /// Resolves after the initial render settles.
    interactive: Signal,
    scroller: MomentumScroller,
}

/// Orchestrates a deck of embedded story documents.
///
/// Cheap to clone; all clones share the same deck.  Construction spawns
/// background tasks and therefore must happen inside a Tokio runtime.
#[derive(Clone)]
pub struct StoryPlayer {
    inner: Arc<Mutex<PlayerInner>>,
    containers: Arc<dyn ContainerHost>,
    channels: Arc<dyn ChannelFactory>,
    fetcher: Arc<dyn StoryFetcher>,
    events: mpsc::UnboundedSender<PlayerEvent>,
    opts: Arc<PlayerOptions>,
}

impl StoryPlayer {
    pub fn new(
        deps: PlayerDeps,
        opts: PlayerOptions,
        config: PlayerConfig,
        entries: Vec<StoryEntry>,
    ) -> Result<(Self, mpsc::UnboundedReceiver<PlayerEvent>), PlayerError> {
        for entry in &entries {
            entry.validate()?;
        }
        if let Some(cache) = opts.cache_host.as_deref() {
            if !SUPPORTED_CACHES.contains(&cache) {
                warn!(cache, "unsupported cache host, story urls will not be rewritten");
            }
        }

        let (events, receiver) = mpsc::unbounded_channel();
        let inner = PlayerInner {
            stories: entries
                .into_iter()
                .enumerate()
                .map(|(index, entry)| StoryRecord::new(entry, index, 0))
                .collect(),
            current: 0,
            playing: config.autoplay(),
            circular_wrapping: config.circular_wrapping(),
            attribution_auto: config.attribution_auto(),
            page_scroll_enabled: config.page_scroll(),
            fetching_enabled: None,
            fetch_in_flight: false,
            cache_host: opts.cache_host.clone(),
            config,
            touch: GestureTracker::default(),
            swiping: SwipingState::default(),
            page_attachment_open: false,
            current_ready: None,
            visible: Signal::new(),
            interactive: Signal::new(),
            scroller: MomentumScroller::new(Arc::clone(&deps.surface), opts.scroller.clone()),
        };

        let player = Self {
            inner: Arc::new(Mutex::new(inner)),
            containers: deps.containers,
            channels: deps.channels,
            fetcher: deps.fetcher,
            events,
            opts: Arc::new(opts),
        };

        let (visible, interactive) = {
            let inner = player.lock();
            (inner.visible.clone(), inner.interactive.clone())
        };
        spawn_arrival_watch(deps.probe, player.opts.arrival.clone(), visible);
        player.emit(PlayerEvent::Ready);

        // Initial render: sources are assigned right away (prerendered);
        // visibility promotion waits on the arrival signal inside each
        // chain.
        let layout = player.clone();
        tokio::spawn(async move {
            layout.render_from(None).await;
            interactive.resolve();
        });

        Ok((player, receiver))
    }

    fn lock(&self) -> MutexGuard<'_, PlayerInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit(&self, event: PlayerEvent) {
        let _ = self.events.send(event);
    }

    /// Resolves after the initial render settles.
    pub async fn wait_until_interactive(&self) {
        let interactive = self.lock().interactive.clone();
        let _ = interactive.wait().await;
    }

    pub fn current_index(&self) -> usize {
        self.lock().current
    }

    pub fn story_count(&self) -> usize {
        self.lock().stories.len()
    }

    /// URLs of every story in deck order.
    pub fn story_urls(&self) -> Vec<String> {
        self.lock().stories.iter().map(|record| record.url.clone()).collect()
    }

    // ───────────────────────────────────────── navigation ────────

    /// Append stories to the deck.  All entries are validated before any
    /// is added, so a malformed batch leaves the deck untouched.
    pub async fn add(&self, entries: Vec<StoryEntry>) -> Result<(), PlayerError> {
        if entries.is_empty() {
            return Ok(());
        }
        for entry in &entries {
            entry.validate()?;
        }
        let starting = {
            let mut inner = self.lock();
            let starting = inner.stories.len();
            let current = inner.current;
            for entry in entries {
                let index = inner.stories.len();
                inner.stories.push(StoryRecord::new(entry, index, current));
            }
            starting
        };
        self.render_from(Some(starting)).await;
        Ok(())
    }

    /// Show the story with `url` (the current one when `None`), then jump
    /// to `page_id` when given.
    pub async fn show(
        &self,
        url: Option<&str>,
        page_id: Option<&str>,
        animate: bool,
    ) -> Result<(), PlayerError> {
        let navigated = {
            let mut inner = self.lock();
            let idx = Self::find_record(&inner, url)?;
            if idx == inner.current {
                false
            } else {
                inner.current = idx;
                true
            }
        };
        if navigated {
            if !animate {
                // Host-level: a far jump's destination has no container
                // yet, but the repositioned neighbors must not animate
                // either.
                self.containers.suppress_next_transition();
            }
            self.on_navigation();
            self.render_from(None).await;
        }
        if let Some(page_id) = page_id {
            let current = self.lock().current;
            self.channel_request(current, Request::SelectPageById { id: page_id.to_owned() });
        }
        Ok(())
    }

    /// Navigate `story_delta` stories and `page_delta` pages from here.
    pub async fn go(&self, story_delta: i64, page_delta: i64) -> Result<(), PlayerError> {
        self.go_with(story_delta, page_delta, true).await
    }

    pub async fn go_with(
        &self,
        story_delta: i64,
        page_delta: i64,
        animate: bool,
    ) -> Result<(), PlayerError> {
        if story_delta == 0 && page_delta == 0 {
            return Ok(());
        }
        let target = {
            let inner = self.lock();
            let len = inner.stories.len() as i64;
            if len == 0 {
                return Err(PlayerError::OutOfRange { delta: story_delta, len: 0 });
            }
            let raw = inner.current as i64 + story_delta;
            if !inner.circular_wrapping && (raw < 0 || raw >= len) {
                return Err(PlayerError::OutOfRange {
                    delta: story_delta,
                    len: len as usize,
                });
            }
            inner.stories[raw.rem_euclid(len) as usize].url.clone()
        };
        self.show(Some(&target), None, animate).await?;
        if page_delta != 0 {
            let current = self.lock().current;
            self.channel_request(current, Request::SelectPageDelta { delta: page_delta });
        }
        Ok(())
    }

    /// Navigate to the next story.  At the end of a non-wrapping deck
    /// this emits [`PlayerEvent::NoNextStory`] instead of navigating.
    pub async fn next(&self) {
        self.step(1, PlayerEvent::NoNextStory).await;
    }

    /// Navigate to the previous story.  At the start of a non-wrapping
    /// deck this emits [`PlayerEvent::NoPreviousStory`] instead.
    pub async fn previous(&self) {
        self.step(-1, PlayerEvent::NoPreviousStory).await;
    }

    async fn step(&self, delta: i64, blocked: PlayerEvent) {
        enum Step {
            Move,
            Wrap,
            Blocked,
        }
        let action = {
            let mut inner = self.lock();
            let len = inner.stories.len() as i64;
            let target = inner.current as i64 + delta;
            if target >= 0 && target < len {
                inner.current = target as usize;
                Step::Move
            } else if inner.circular_wrapping {
                Step::Wrap
            } else {
                Step::Blocked
            }
        };
        match action {
            Step::Move => {
                self.on_navigation();
                self.render_from(None).await;
            }
            Step::Wrap => {
                // Wrapping is delegated to go(), which applies the modulo.
                if let Err(err) = self.go(delta, 0).await {
                    warn!(%err, "wrap-around navigation failed");
                }
            }
            Step::Blocked => self.emit(blocked),
        }
    }

    fn on_navigation(&self) {
        let (index, remaining) = {
            let inner = self.lock();
            (inner.current, inner.stories.len() - inner.current - 1)
        };
        self.emit(PlayerEvent::Navigation { index, remaining });
        self.maybe_fetch_more(remaining);
    }

    fn find_record(inner: &PlayerInner, url: Option<&str>) -> Result<usize, PlayerError> {
        let idx = match url {
            None | Some("") => inner.current,
            Some(url) => inner
                .stories
                .iter()
                .position(|record| record.url == url)
                .ok_or_else(|| PlayerError::StoryNotFound { url: url.to_owned() })?,
        };
        if inner.stories.get(idx).is_none() {
            return Err(PlayerError::StoryNotFound {
                url: url.unwrap_or_default().to_owned(),
            });
        }
        Ok(idx)
    }

    // ───────────────────────────────────────── playback ──────────

    pub fn play(&self) {
        self.toggle_paused(false);
    }

    pub fn pause(&self) {
        self.toggle_paused(true);
    }

    fn toggle_paused(&self, paused: bool) {
        let current = {
            let mut inner = self.lock();
            inner.playing = !paused;
            inner.current
        };
        let state = if paused {
            VisibilityState::Paused
        } else {
            VisibilityState::Visible
        };
        self.channel_request(current, Request::VisibilityChange { state });
    }

    pub fn mute(&self) {
        self.set_muted(true);
    }

    pub fn unmute(&self) {
        self.set_muted(false);
    }

    fn set_muted(&self, muted: bool) {
        let current = self.lock().current;
        self.channel_request(
            current,
            Request::SetDocumentState {
                state: DocumentStateKind::Muted,
                value: json!(muted),
            },
        );
    }

    /// Ask the current story for a state and re-emit it as the matching
    /// player event.  Only the page attachment state is queryable.
    pub fn get_story_state(&self, kind: DocumentStateKind) {
        if kind != DocumentStateKind::PageAttachment {
            return;
        }
        let current = self.lock().current;
        let player = self.clone();
        tokio::spawn(async move {
            let request = Request::GetDocumentState {
                state: DocumentStateKind::PageAttachment,
            };
            let Some(response) = player.channel_roundtrip(current, request).await else {
                return;
            };
            if let Some(open) = response.get("value").and_then(Value::as_bool) {
                player.emit(if open {
                    PlayerEvent::PageAttachmentOpen
                } else {
                    PlayerEvent::PageAttachmentClose
                });
            }
        });
    }

    /// Rewind the story with `url` to its first page.  Queued until the
    /// story's container is attached.
    pub fn rewind(&self, url: &str) -> Result<(), PlayerError> {
        let (idx, connected) = {
            let inner = self.lock();
            let idx = Self::find_record(&inner, Some(url))?;
            (idx, inner.stories[idx].connected.clone())
        };
        let player = self.clone();
        tokio::spawn(async move {
            if connected.wait().await.is_err() {
                return;
            }
            player.channel_request(idx, Request::Rewind);
        });
        Ok(())
    }

    // ───────────────────────────────────────── rendering ─────────

    /// Recompute distances from `starting` (the current story when
    /// `None`), slide the attach window, and wait for the per-story
    /// render chains to settle.
    async fn render_from(&self, starting: Option<usize>) {
        let chains = {
            let mut inner = self.lock();
            self.plan_render(&mut inner, starting)
        };
        join_all(chains).await;
    }

    fn plan_render(
        &self,
        inner: &mut PlayerInner,
        starting: Option<usize>,
    ) -> Vec<BoxFuture<'static, ()>> {
        let len = inner.stories.len();
        if len == 0 {
            return Vec::new();
        }
        let starting = starting.unwrap_or(inner.current);
        let current = inner.current;

        // Re-arm the current-load gate when the current story changed,
        // cancelling the stale one so superseded chains unwind.
        let ready = match inner.current_ready.as_ref() {
            Some((idx, signal)) if *idx == current => signal.clone(),
            _ => {
                if let Some((_, stale)) = inner.current_ready.take() {
                    stale.cancel();
                }
                let signal = Signal::new();
                if inner.stories[current].content_loaded {
                    signal.resolve();
                }
                inner.current_ready = Some((current, signal.clone()));
                signal
            }
        };
        // The current story's own chain must not wait on its own load.
        let immediate = Signal::new();
        immediate.resolve();

        let mut chains = Vec::new();
        for i in 0..len {
            let idx = (starting + i) % len;
            let old_distance = inner.stories[idx].distance;
            let new_distance = current.abs_diff(idx);
            inner.stories[idx].distance = new_distance;

            if old_distance <= MAX_DISTANCE && new_distance > MAX_DISTANCE {
                self.detach_record(&mut inner.stories[idx]);
            }
            if new_distance > MAX_DISTANCE {
                continue;
            }
            if !inner.stories[idx].is_attached() {
                let controls = controls_payload(&inner.config, idx + 1 == len);
                self.attach_record(&mut inner.stories[idx], controls);
            }

            let gate = if idx == current {
                immediate.clone()
            } else {
                ready.clone()
            };
            chains.push(self.render_chain(
                idx,
                old_distance,
                inner.stories[idx].attach_generation,
                gate,
            ));
        }
        chains
    }

    fn render_chain(
        &self,
        idx: usize,
        old_distance: usize,
        generation: u64,
        gate: Signal,
    ) -> BoxFuture<'static, ()> {
        let player = self.clone();
        async move {
            if player
                .run_render_chain(idx, old_distance, generation, gate)
                .await
                .is_err()
            {
                debug!(idx, "render chain superseded");
            }
        }
        .boxed()
    }

    async fn run_render_chain(
        &self,
        idx: usize,
        old_distance: usize,
        generation: u64,
        gate: Signal,
    ) -> Result<(), Superseded> {
        // 1. Neighbors wait for the current story's content.
        gate.wait().await?;

        // 2. Assign the source, unless the container already points at
        //    this story.
        let container = {
            let inner = self.lock();
            let record = Self::live_record(&inner, idx, generation)?;
            let Some(container) = record.container else {
                return Err(Superseded);
            };
            let resolved = match resolve_cache_url(&record.url, inner.cache_host.as_deref()) {
                Ok(url) => url,
                Err(err) => {
                    warn!(%err, "cache rewrite failed, using the original url");
                    record.url.clone()
                }
            };
            let assigned = self.containers.source(container).unwrap_or_default();
            if !sanitized_equals(&resolved, &assigned) {
                let src = viewer_source_url(
                    &resolved,
                    VisibilityState::Prerender,
                    &self.opts.origin,
                    inner.attribution_auto,
                );
                self.containers.set_source(container, &src);
                if let Some(title) = record.title.as_deref() {
                    self.containers.set_title(container, title);
                }
            }
            container
        };

        // 3. Wait for the player itself to near the viewport.
        let visible = self.lock().visible.clone();
        visible.wait().await?;

        // 4. Promote visibility and position the container.
        let (visibility, position, is_current) = {
            let inner = self.lock();
            let record = Self::live_record(&inner, idx, generation)?;
            let distance = record.distance;
            let visibility = if distance == 0 && inner.playing {
                Some(VisibilityState::Visible)
            } else if old_distance == 0 && distance == 1 {
                Some(VisibilityState::Inactive)
            } else {
                None
            };
            let position = if distance == 0 {
                StoryPosition::Current
            } else if record.index > inner.current {
                StoryPosition::Next
            } else {
                StoryPosition::Previous
            };
            (visibility, position, distance == 0)
        };
        if let Some(state) = visibility {
            self.channel_request(idx, Request::VisibilityChange { state });
        }
        self.containers.set_position(container, position);
        if is_current {
            self.containers.focus(container);
        }
        Ok(())
    }

    fn live_record<'a>(
        inner: &'a PlayerInner,
        idx: usize,
        generation: u64,
    ) -> Result<&'a StoryRecord, Superseded> {
        match inner.stories.get(idx) {
            Some(record) if record.attach_generation == generation => Ok(record),
            _ => Err(Superseded),
        }
    }

    fn attach_record(&self, record: &mut StoryRecord, controls: Option<Value>) {
        let id = self
            .containers
            .create(&record.url, record.poster_image.as_deref());
        self.containers.attach(id);
        record.container = Some(id);
        record.content_loaded = false;
        record.attach_generation += 1;

        let handshake = self.open_channel(id, record.url.clone(), record.index, record.attach_generation, controls);
        // Kick the shared handshake off eagerly; requests queued behind
        // it just join the same exchange.
        let driver = handshake.clone();
        tokio::spawn(async move {
            let _ = driver.await;
        });
        record.handshake = Some(handshake);
        record.connected.resolve();
    }

    fn open_channel(
        &self,
        container: ContainerId,
        url: String,
        idx: usize,
        generation: u64,
        controls: Option<Value>,
    ) -> crate::messaging::SharedHandshake {
        let player = self.clone();
        async move {
            let connection = player.channels.open(container, &url).await?;
            let channel: Arc<dyn StoryChannel> = connection.channel;
            for state in [
                DocumentStateKind::PageAttachment,
                DocumentStateKind::CurrentPageId,
                DocumentStateKind::Muted,
                DocumentStateKind::Ui,
            ] {
                let _ = send(channel.as_ref(), &Request::OnDocumentState { state }).await;
            }
            if let Some(controls) = controls {
                let _ = send(channel.as_ref(), &Request::CustomDocumentUi { controls }).await;
            }
            player.spawn_inbound_pump(idx, generation, connection.inbound);
            Ok(channel)
        }
        .boxed()
        .shared()
    }

    fn detach_record(&self, record: &mut StoryRecord) {
        if let Some(id) = record.container.take() {
            self.containers.set_source(id, "");
            self.containers.detach(id);
        }
        record.handshake = None;
        record.content_loaded = false;
        record.connected = Signal::new();
        record.attach_generation += 1;
    }

    // ───────────────────────────────────────── messaging ─────────

    /// Fire-and-forget request to the story at `idx`.  Dropped with a log
    /// when the story is detached or the transport fails.
    fn channel_request(&self, idx: usize, request: Request) {
        let Some(handshake) = self
            .lock()
            .stories
            .get(idx)
            .and_then(|record| record.handshake.clone())
        else {
            debug!(idx, name = request.name(), "dropping request to a detached story");
            return;
        };
        tokio::spawn(async move {
            match handshake.await {
                Ok(channel) => {
                    if let Err(err) = send(channel.as_ref(), &request).await {
                        warn!(idx, %err, "story request failed");
                    }
                }
                Err(err) => warn!(idx, %err, "handshake failed"),
            }
        });
    }

    /// Request/response exchange with the story at `idx`.
    async fn channel_roundtrip(&self, idx: usize, request: Request) -> Option<Value> {
        let handshake = self
            .lock()
            .stories
            .get(idx)
            .and_then(|record| record.handshake.clone())?;
        match handshake.await {
            Ok(channel) => match send(channel.as_ref(), &request).await {
                Ok(value) => Some(value),
                Err(err) => {
                    warn!(idx, %err, "story request failed");
                    None
                }
            },
            Err(err) => {
                warn!(idx, %err, "handshake failed");
                None
            }
        }
    }

    fn spawn_inbound_pump(
        &self,
        idx: usize,
        generation: u64,
        mut inbound: mpsc::UnboundedReceiver<InboundMessage>,
    ) {
        let player = self.clone();
        tokio::spawn(async move {
            while let Some(message) = inbound.recv().await {
                // Detached stories stop pumping; the channel belongs to a
                // past attach cycle.
                let live = {
                    let inner = player.lock();
                    inner
                        .stories
                        .get(idx)
                        .is_some_and(|record| record.attach_generation == generation)
                };
                if !live {
                    break;
                }
                player.handle_inbound(idx, message);
            }
        });
    }

    /// Dispatch one inbound message.  Navigations and roundtrips are
    /// spawned, never awaited: they block on the destination's
    /// content-ready gate, and the pump must keep draining while they do.
    fn handle_inbound(&self, idx: usize, message: InboundMessage) {
        match message {
            InboundMessage::TouchStart(event) => self.on_touch_start(&event),
            InboundMessage::TouchMove(event) => self.on_touch_move(&event),
            InboundMessage::TouchEnd(event) => self.on_touch_end(&event),
            InboundMessage::StoryContentLoaded => {
                let mut inner = self.lock();
                if let Some(record) = inner.stories.get_mut(idx) {
                    record.content_loaded = true;
                }
                if let Some((current, signal)) = inner.current_ready.as_ref() {
                    if *current == idx {
                        signal.resolve();
                    }
                }
            }
            InboundMessage::SelectDocument { next, previous } => {
                let player = self.clone();
                tokio::spawn(async move {
                    if next {
                        player.next().await;
                    } else if previous {
                        player.previous().await;
                    }
                });
            }
            InboundMessage::DocumentStateUpdate(update) => {
                self.handle_state_update(idx, update);
            }
        }
    }

    fn handle_state_update(&self, idx: usize, update: StateUpdate) {
        match update {
            StateUpdate::PageAttachment(open) => {
                self.lock().page_attachment_open = open;
                self.emit(if open {
                    PlayerEvent::PageAttachmentOpen
                } else {
                    PlayerEvent::PageAttachmentClose
                });
            }
            StateUpdate::CurrentPageId(page_id) => {
                // Page changes are reported together with overall story
                // progress, which takes a roundtrip to fetch.
                let player = self.clone();
                tokio::spawn(async move {
                    let request = Request::GetDocumentState {
                        state: DocumentStateKind::StoryProgress,
                    };
                    let Some(response) = player.channel_roundtrip(idx, request).await else {
                        return;
                    };
                    let progress =
                        response.get("value").and_then(Value::as_f64).unwrap_or(0.0);
                    player.emit(PlayerEvent::StoryNavigation { page_id, progress });
                });
            }
            StateUpdate::Muted(muted) => self.emit(PlayerEvent::MutedState { muted }),
            StateUpdate::Ui(_) => {}
            StateUpdate::AspectRatio(ratio) => {
                if let Some(record) = self.lock().stories.get_mut(idx) {
                    record.aspect_ratio = Some(ratio);
                }
            }
            StateUpdate::PlayerEvent(name) => {
                if SKIP_NEXT_EVENTS.contains(&name.as_str()) {
                    let player = self.clone();
                    tokio::spawn(async move { player.next().await });
                } else {
                    self.emit(PlayerEvent::Custom { name });
                }
            }
        }
    }

    // ───────────────────────────────────────── gestures ──────────

    pub fn on_touch_start(&self, event: &TouchEvent) {
        {
            let mut inner = self.lock();
            if !inner.touch.on_start(event) {
                return;
            }
            if inner.page_scroll_enabled {
                if let Some(touch) = event.primary() {
                    inner.scroller.on_touch_start(event.timestamp_ms, touch.client_y);
                }
            }
        }
        self.emit(PlayerEvent::TouchStart { event: event.clone() });
    }

    pub fn on_touch_move(&self, event: &TouchEvent) {
        let (sample, navigational) = {
            let mut inner = self.lock();
            let sample = inner.touch.on_move(event);
            (sample, inner.touch.is_navigational())
        };
        self.emit(PlayerEvent::TouchMove {
            event: event.clone(),
            navigational,
        });
        match sample {
            GestureSample::Drag { delta_px } => self.on_swipe(delta_px, false),
            GestureSample::Scroll {
                timestamp_ms,
                client_y,
            } => {
                let mut inner = self.lock();
                if inner.page_scroll_enabled {
                    inner.scroller.on_touch_move(timestamp_ms, client_y);
                }
            }
            GestureSample::None => {}
        }
    }

    pub fn on_touch_end(&self, event: &TouchEvent) {
        let (release, navigational) = {
            let mut inner = self.lock();
            let navigational = inner.touch.is_navigational();
            (inner.touch.on_end(event), navigational)
        };
        self.emit(PlayerEvent::TouchEnd {
            event: event.clone(),
            navigational,
        });
        match release {
            GestureRelease::Horizontal { total_delta_px } => {
                self.on_swipe(total_delta_px, true);
            }
            GestureRelease::Scroll { timestamp_ms } => {
                let mut inner = self.lock();
                if inner.page_scroll_enabled {
                    inner.scroller.on_touch_end(timestamp_ms);
                }
            }
            GestureRelease::None => {}
        }
        self.lock().swiping = SwipingState::NotSwiping;
    }

    /// Horizontal gesture progress.  Non-final samples drag the stories
    /// along; the final one decides commit versus spring-back.
    fn on_swipe(&self, delta_px: f64, last: bool) {
        enum Outcome {
            Ignore,
            Commit { forward: bool },
            SpringBack(Vec<ContainerId>),
            Drag {
                lead: Option<ContainerId>,
                follow: Option<ContainerId>,
            },
        }

        let outcome = {
            let mut inner = self.lock();
            if inner.stories.len() <= 1 || inner.page_attachment_open {
                Outcome::Ignore
            } else if last {
                let direction = match inner.swiping {
                    SwipingState::ToLeft => Some(true),
                    SwipingState::ToRight => Some(false),
                    SwipingState::NotSwiping => None,
                };
                let has_secondary = Self::secondary_idx(&inner).is_some();
                match direction {
                    Some(forward)
                        if delta_px.abs() > self.opts.swipe_commit_px
                            && (has_secondary || inner.circular_wrapping) =>
                    {
                        Outcome::Commit { forward }
                    }
                    Some(_) => {
                        let mut ids = Vec::new();
                        if let Some(id) = inner.stories[inner.current].container {
                            ids.push(id);
                        }
                        if let Some(id) = Self::secondary_idx(&inner)
                            .and_then(|idx| inner.stories[idx].container)
                        {
                            ids.push(id);
                        }
                        Outcome::SpringBack(ids)
                    }
                    None => Outcome::Ignore,
                }
            } else {
                inner.swiping = if delta_px < 0.0 {
                    SwipingState::ToLeft
                } else {
                    SwipingState::ToRight
                };
                Outcome::Drag {
                    lead: inner.stories[inner.current].container,
                    follow: Self::secondary_idx(&inner)
                        .and_then(|idx| inner.stories[idx].container),
                }
            }
        };

        match outcome {
            Outcome::Ignore => {}
            Outcome::Commit { forward } => {
                let player = self.clone();
                tokio::spawn(async move {
                    if forward {
                        player.next().await;
                    } else {
                        player.previous().await;
                    }
                });
            }
            Outcome::SpringBack(ids) => {
                for id in ids {
                    self.containers.clear_drag(id);
                }
            }
            Outcome::Drag { lead, follow } => {
                if let Some(id) = lead {
                    self.containers.apply_drag(id, DragStyle::Lead { delta_px });
                }
                if let Some(id) = follow {
                    self.containers.apply_drag(id, DragStyle::Follow { delta_px });
                }
            }
        }
    }

    /// The story being dragged in alongside the current one, if any.
    fn secondary_idx(inner: &PlayerInner) -> Option<usize> {
        let candidate = match inner.swiping {
            SwipingState::ToLeft => inner.current as i64 + 1,
            SwipingState::ToRight => inner.current as i64 - 1,
            SwipingState::NotSwiping => return None,
        };
        (candidate >= 0 && (candidate as usize) < inner.stories.len())
            .then_some(candidate as usize)
    }

    // ───────────────────────────────────────── fetching ──────────

    /// Fetch more stories when few remain and the config enables it.  At
    /// most one fetch is in flight; failures are logged and retried on
    /// the next navigation.
    fn maybe_fetch_more(&self, remaining: usize) {
        let endpoint = {
            let mut inner = self.lock();
            if remaining > FETCH_STORIES_THRESHOLD || inner.fetch_in_flight {
                return;
            }
            let enabled = match inner.fetching_enabled {
                Some(enabled) => enabled,
                None => {
                    let enabled = inner.config.fetch_endpoint().is_some();
                    inner.fetching_enabled = Some(enabled);
                    enabled
                }
            };
            if !enabled {
                return;
            }
            let Some(template) = inner.config.fetch_endpoint() else {
                return;
            };
            let endpoint = expand_endpoint(template, inner.stories.len());
            inner.fetch_in_flight = true;
            endpoint
        };
        let player = self.clone();
        tokio::spawn(async move {
            let result = player.fetcher.fetch(&endpoint).await;
            player.lock().fetch_in_flight = false;
            match result {
                Ok(entries) if entries.is_empty() => {}
                Ok(entries) => {
                    if let Err(err) = player.add(entries).await {
                        warn!(%err, "fetched stories were rejected");
                    }
                }
                Err(err) => warn!(%err, "story fetch failed"),
            }
        });
    }
}

/// Controls payload forwarded to a story, with skip-to-next disabled on
/// the last story of the deck.
fn controls_payload(config: &PlayerConfig, is_last: bool) -> Option<Value> {
    let mut controls = config.controls.clone()?;
    if is_last {
        if let Some(control) = controls
            .iter_mut()
            .find(|control| control.name == "skip-next" || control.name == "skip-to-next")
        {
            control.state = Some("disabled".to_owned());
        }
    }
    serde_json::to_value(controls).ok()
}
