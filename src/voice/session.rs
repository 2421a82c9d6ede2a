//! Per guild playback sessions.
//!
//! A [`Session`] owns the queue, the vote sets, the DJ and the controller message of one guild.
//! It is created on the first voice command and lives until [`Session::teardown`], after which
//! every operation on it is a no-op. Sessions are kept in a [`SessionManager`].
//!
//! Two flags guard re-entrancy: `waiting` is set while [`Session::advance`] waits for the next
//! track, and `updating` while the controller is being refreshed. A second caller finding either
//! flag set returns immediately.

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard, Weak,
    },
    time::Duration,
};

use poise::serenity_prelude as serenity;
use rand::seq::SliceRandom;
use tokio::sync::{mpsc, Notify};
use tracing::{debug, info, warn};

use super::{
    controller::ControllerView,
    engine::AudioEngine,
    error::MusicCommandError,
    gateway::{ChatGateway, Notice, RosterMember},
    track::{SearchResult, Track},
    vote::{required_votes, VoteAction, VoteOutcome, VoteSets},
};

/// How long an idle session waits for a track before leaving.
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(20);
/// The controller is recreated once this many newer messages push it up.
pub const CONTROLLER_FRESHNESS: u8 = 5;
pub const DEFAULT_VOLUME: u8 = 100;

type Registry = Mutex<HashMap<serenity::GuildId, Arc<Session>>>;

#[derive(Debug)]
struct SessionState {
    voice_channel_id: Option<serenity::ChannelId>,
    dj: serenity::UserId,
    queue: VecDeque<Track>,
    current: Option<Track>,
    paused: bool,
    volume: u8,
    votes: VoteSets,
    controller: Option<serenity::MessageId>,
}

pub struct Session {
    guild_id: serenity::GuildId,
    text_channel_id: serenity::ChannelId,
    engine: Arc<dyn AudioEngine>,
    gateway: Arc<dyn ChatGateway>,
    state: Mutex<SessionState>,
    queue_notify: Notify,
    waiting: AtomicBool,
    updating: AtomicBool,
    torn_down: AtomicBool,
    idle_timeout: Duration,
    registry: Weak<Registry>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("guild_id", &self.guild_id)
            .field("text_channel_id", &self.text_channel_id)
            .field("torn_down", &self.is_torn_down())
            .finish_non_exhaustive()
    }
}

impl Session {
    fn state(&self) -> MutexGuard<'_, SessionState> {
        // the state holds no invariants that a panic mid update could break
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn guild_id(&self) -> serenity::GuildId {
        self.guild_id
    }

    pub fn text_channel_id(&self) -> serenity::ChannelId {
        self.text_channel_id
    }

    pub fn voice_channel_id(&self) -> Option<serenity::ChannelId> {
        self.state().voice_channel_id
    }

    pub fn dj(&self) -> serenity::UserId {
        self.state().dj
    }

    pub fn current(&self) -> Option<Track> {
        self.state().current.clone()
    }

    pub fn is_playing(&self) -> bool {
        self.state().current.is_some()
    }

    pub fn is_paused(&self) -> bool {
        self.state().paused
    }

    pub fn volume(&self) -> u8 {
        self.state().volume
    }

    pub fn controller(&self) -> Option<serenity::MessageId> {
        self.state().controller
    }

    pub fn queue_len(&self) -> usize {
        self.state().queue.len()
    }

    pub fn queued_titles(&self) -> Vec<String> {
        self.state().queue.iter().map(|t| t.title.clone()).collect()
    }

    pub fn vote_count(&self, action: VoteAction) -> usize {
        self.state().votes.count(action)
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst)
    }

    pub fn is_waiting(&self) -> bool {
        self.waiting.load(Ordering::SeqCst)
    }

    /// Members in the session's voice channel, empty when not connected.
    pub fn roster(&self) -> Vec<RosterMember> {
        match self.voice_channel_id() {
            Some(channel_id) => self.gateway.voice_members(self.guild_id, channel_id),
            None => vec![],
        }
    }

    pub fn is_listening(&self, user_id: serenity::UserId) -> bool {
        self.roster().iter().any(|m| m.user_id == user_id)
    }

    /// Joins `channel_id`. Joining the channel the session is already in does nothing.
    pub async fn connect(&self, channel_id: serenity::ChannelId) -> Result<(), MusicCommandError> {
        if self.is_torn_down() || self.voice_channel_id() == Some(channel_id) {
            return Ok(());
        }
        self.engine.connect(self.guild_id, channel_id).await?;
        self.state().voice_channel_id = Some(channel_id);
        Ok(())
    }

    /// Appends a track to the queue and starts playback if nothing is playing.
    pub async fn enqueue(&self, track: Track) {
        if self.is_torn_down() {
            return;
        }
        self.state().queue.push_back(track);
        self.queue_notify.notify_one();
        if !self.is_playing() {
            self.advance().await;
        }
    }

    /// Starts the next track.
    ///
    /// Waits up to the idle timeout for the queue to fill, then tears the session down. Only
    /// one advance runs at a time and none runs while a track is playing.
    pub async fn advance(&self) {
        if self.is_torn_down() || self.waiting.swap(true, Ordering::SeqCst) {
            return;
        }
        if self.is_playing() {
            self.waiting.store(false, Ordering::SeqCst);
            return;
        }
        self.state().votes.clear_all();

        loop {
            let track = match tokio::time::timeout(self.idle_timeout, self.next_track()).await {
                Ok(track) => track,
                Err(_) => {
                    info!("session in guild {} idled out", self.guild_id);
                    self.waiting.store(false, Ordering::SeqCst);
                    self.teardown().await;
                    return;
                }
            };
            if self.is_torn_down() {
                self.waiting.store(false, Ordering::SeqCst);
                return;
            }

            {
                let mut state = self.state();
                state.current = Some(track.clone());
                state.paused = false;
            }
            match self.engine.play(self.guild_id, &track).await {
                Ok(()) => break,
                Err(e) => {
                    warn!("unable to play {} in guild {}: {e}", track.title, self.guild_id);
                    self.state().current = None;
                }
            }
        }

        self.waiting.store(false, Ordering::SeqCst);
        self.refresh_controller().await;
    }

    async fn next_track(&self) -> Track {
        loop {
            let notified = self.queue_notify.notified();
            let next = self.state().queue.pop_front();
            if let Some(track) = next {
                return track;
            }
            notified.await;
        }
    }

    /// Called when the engine reports the current track is over.
    pub async fn on_track_end(&self) {
        if self.is_torn_down() {
            return;
        }
        {
            let mut state = self.state();
            state.current = None;
            state.paused = false;
        }
        self.advance().await;
    }

    fn controller_view(&self) -> Option<ControllerView> {
        let state = self.state();
        let current = state.current.as_ref()?;
        Some(ControllerView {
            guild_id: self.guild_id,
            voice_channel_id: state.voice_channel_id,
            title: current.title.clone(),
            uri: current.uri.clone(),
            thumbnail: current.thumbnail.clone(),
            length: current.length_display(),
            queue_len: state.queue.len(),
            volume: state.volume,
            paused: state.paused,
            requester: current.requester,
            dj: state.dj,
        })
    }

    /// Brings the controller message up to date, recreating it when it has scrolled away.
    pub async fn refresh_controller(&self) {
        if self.is_torn_down() {
            return;
        }
        if self.updating.swap(true, Ordering::SeqCst) {
            return;
        }

        if let Some(view) = self.controller_view() {
            let existing = self.controller();
            match existing {
                Some(message_id) if self.is_controller_fresh(message_id).await => {
                    if let Err(e) = self
                        .gateway
                        .edit_controller(self.text_channel_id, message_id, &view)
                        .await
                    {
                        debug!("unable to edit controller in guild {}: {e}", self.guild_id);
                    }
                }
                Some(message_id) => {
                    if let Err(e) = self
                        .gateway
                        .delete_message(self.text_channel_id, message_id)
                        .await
                    {
                        debug!("unable to delete stale controller in guild {}: {e}", self.guild_id);
                    }
                    self.send_controller(&view).await;
                }
                None => self.send_controller(&view).await,
            }
        }

        self.updating.store(false, Ordering::SeqCst);
    }

    async fn is_controller_fresh(&self, message_id: serenity::MessageId) -> bool {
        match self
            .gateway
            .recent_message_ids(self.text_channel_id, CONTROLLER_FRESHNESS)
            .await
        {
            Ok(recent) => recent.contains(&message_id),
            Err(e) => {
                debug!("unable to read recent messages in guild {}: {e}", self.guild_id);
                false
            }
        }
    }

    async fn send_controller(&self, view: &ControllerView) {
        match self.gateway.send_controller(self.text_channel_id, view).await {
            Ok(message_id) => {
                if self.is_torn_down() {
                    let _ = self.gateway.delete_message(self.text_channel_id, message_id).await;
                } else {
                    self.state().controller = Some(message_id);
                }
            }
            Err(e) => warn!("unable to send controller in guild {}: {e}", self.guild_id),
        }
    }

    /// Posts a notice in the session's text channel.
    pub async fn announce(&self, notice: &Notice) {
        if let Err(e) = self.gateway.say(self.text_channel_id, notice).await {
            warn!("unable to send notice in guild {}: {e}", self.guild_id);
        }
    }

    /// Casts a vote for `action`. Privileged members act immediately; the requester of the
    /// current track may always skip it.
    pub fn cast_vote(
        &self,
        action: VoteAction,
        voter: serenity::UserId,
        privileged: bool,
    ) -> VoteOutcome {
        let member_count = self.roster().len();
        let mut state = self.state();
        if privileged {
            state.votes.clear(action);
            return VoteOutcome::Forced;
        }
        if action == VoteAction::Skip
            && state.current.as_ref().map(|t| t.requester) == Some(voter)
        {
            state.votes.clear(action);
            return VoteOutcome::Requester;
        }
        state
            .votes
            .cast(action, voter, required_votes(action, member_count))
    }

    pub async fn set_pause(&self, paused: bool) -> Result<(), MusicCommandError> {
        if self.is_torn_down() {
            return Ok(());
        }
        self.engine.set_pause(self.guild_id, paused).await?;
        self.state().paused = paused;
        self.refresh_controller().await;
        Ok(())
    }

    /// Stops the current track; the engine's end notification advances the queue.
    pub async fn skip(&self) -> Result<(), MusicCommandError> {
        if self.is_torn_down() {
            return Ok(());
        }
        self.engine.stop(self.guild_id).await
    }

    pub async fn set_volume(&self, volume: u8) -> Result<(), MusicCommandError> {
        if self.is_torn_down() {
            return Ok(());
        }
        let volume = volume.min(100);
        self.engine.set_volume(self.guild_id, volume).await?;
        self.state().volume = volume;
        self.refresh_controller().await;
        Ok(())
    }

    pub async fn shuffle(&self) {
        if self.is_torn_down() {
            return;
        }
        {
            let mut state = self.state();
            state.queue.make_contiguous().shuffle(&mut rand::thread_rng());
        }
        self.refresh_controller().await;
    }

    pub fn set_dj(&self, dj: serenity::UserId) {
        if !self.is_torn_down() {
            self.state().dj = dj;
        }
    }

    /// Keeps a DJ around when members come and go. Returns the new DJ if it changed.
    ///
    /// `left` is true when `member` is no longer in any voice channel, `joined` when their new
    /// channel is the session's channel. `roster` is the channel's current membership.
    pub fn handle_voice_update(
        &self,
        member: serenity::UserId,
        is_bot: bool,
        left: bool,
        joined: bool,
        roster: &[RosterMember],
    ) -> Option<serenity::UserId> {
        if is_bot || self.is_torn_down() {
            return None;
        }
        let mut state = self.state();
        // a session without a channel is on its way out
        state.voice_channel_id?;

        if member == state.dj && left {
            let next = roster
                .iter()
                .find(|m| !m.bot && m.user_id != member)
                .map(|m| m.user_id)?;
            state.dj = next;
            return Some(next);
        }
        if joined && member != state.dj && !roster.iter().any(|m| m.user_id == state.dj) {
            state.dj = member;
            return Some(member);
        }
        None
    }

    /// Ends the session. Safe to call any number of times.
    pub async fn teardown(&self) {
        if self.torn_down.swap(true, Ordering::SeqCst) {
            return;
        }
        let controller = {
            let mut state = self.state();
            state.queue.clear();
            state.current = None;
            state.votes.clear_all();
            state.voice_channel_id = None;
            state.controller.take()
        };

        if let Some(message_id) = controller {
            if let Err(e) = self
                .gateway
                .delete_message(self.text_channel_id, message_id)
                .await
            {
                debug!("unable to delete controller in guild {}: {e}", self.guild_id);
            }
        }
        if let Err(e) = self.engine.disconnect(self.guild_id).await {
            warn!("unable to leave voice in guild {}: {e}", self.guild_id);
        }

        if let Some(registry) = self.registry.upgrade() {
            let mut sessions = registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            if sessions
                .get(&self.guild_id)
                .is_some_and(|s| std::ptr::eq(Arc::as_ptr(s), self))
            {
                sessions.remove(&self.guild_id);
            }
        }
        info!("session in guild {} torn down", self.guild_id);
    }
}

/// Owns every live session, one per guild.
#[derive(Clone)]
pub struct SessionManager {
    sessions: Arc<Registry>,
    engine: Arc<dyn AudioEngine>,
    gateway: Arc<dyn ChatGateway>,
    idle_timeout: Duration,
}

impl SessionManager {
    pub fn new(engine: Arc<dyn AudioEngine>, gateway: Arc<dyn ChatGateway>) -> Self {
        Self::with_idle_timeout(engine, gateway, IDLE_TIMEOUT)
    }

    pub fn with_idle_timeout(
        engine: Arc<dyn AudioEngine>,
        gateway: Arc<dyn ChatGateway>,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            sessions: Default::default(),
            engine,
            gateway,
            idle_timeout,
        }
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<serenity::GuildId, Arc<Session>>> {
        self.sessions.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, guild_id: serenity::GuildId) -> Option<Arc<Session>> {
        self.sessions().get(&guild_id).cloned()
    }

    /// Returns the guild's session, creating one bound to `text_channel_id` with `dj` as DJ.
    pub fn get_or_create(
        &self,
        guild_id: serenity::GuildId,
        text_channel_id: serenity::ChannelId,
        dj: serenity::UserId,
    ) -> Arc<Session> {
        self.sessions()
            .entry(guild_id)
            .or_insert_with(|| {
                debug!("new session in guild {guild_id} bound to {text_channel_id}");
                Arc::new(Session {
                    guild_id,
                    text_channel_id,
                    engine: self.engine.clone(),
                    gateway: self.gateway.clone(),
                    state: Mutex::new(SessionState {
                        voice_channel_id: None,
                        dj,
                        queue: VecDeque::new(),
                        current: None,
                        paused: false,
                        volume: DEFAULT_VOLUME,
                        votes: VoteSets::default(),
                        controller: None,
                    }),
                    queue_notify: Notify::new(),
                    waiting: AtomicBool::new(false),
                    updating: AtomicBool::new(false),
                    torn_down: AtomicBool::new(false),
                    idle_timeout: self.idle_timeout,
                    registry: Arc::downgrade(&self.sessions),
                })
            })
            .clone()
    }

    pub async fn search(&self, query: &str) -> Result<SearchResult, MusicCommandError> {
        self.engine.search(query).await
    }

    pub fn len(&self) -> usize {
        self.sessions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forwards engine track end notifications to the sessions until the engine goes away.
    pub fn listen_track_end(&self, mut track_end: mpsc::UnboundedReceiver<serenity::GuildId>) {
        let manager = self.clone();
        tokio::spawn(async move {
            while let Some(guild_id) = track_end.recv().await {
                if let Some(session) = manager.get(guild_id) {
                    tokio::spawn(async move { session.on_track_end().await });
                }
            }
            debug!("track end listener stopped");
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        constants::*,
        voice::testing::{track, EngineCall, MockEngine, MockGateway},
    };

    struct Fixture {
        engine: Arc<MockEngine>,
        gateway: Arc<MockGateway>,
        manager: SessionManager,
    }

    impl Fixture {
        fn new() -> Self {
            let engine = Arc::new(MockEngine::default());
            let gateway = Arc::new(MockGateway::default());
            let manager = SessionManager::new(engine.clone(), gateway.clone());
            Self {
                engine,
                gateway,
                manager,
            }
        }

        /// A connected session with `USER_ID_1` as DJ.
        async fn session(&self) -> Arc<Session> {
            let session = self.manager.get_or_create(GUILD_ID_1, CHANNEL_ID_1, USER_ID_1);
            session.connect(VOICE_CHANNEL_ID_1).await.unwrap();
            session
        }
    }

    #[tokio::test]
    async fn enqueue_plays_with_the_requester() {
        let fixture = Fixture::new();
        let session = fixture.session().await;

        session.enqueue(track("a", USER_ID_2)).await;

        assert_eq!(session.current().map(|t| t.requester), Some(USER_ID_2));
        assert_eq!(fixture.engine.played(), vec!["a".to_string()]);
        assert_eq!(fixture.gateway.sent_controllers(), 1);
        assert!(session.controller().is_some());
        assert!(!session.is_waiting());
    }

    #[tokio::test]
    async fn enqueue_while_playing_only_queues() {
        let fixture = Fixture::new();
        let session = fixture.session().await;

        session.enqueue(track("a", USER_ID_1)).await;
        session.enqueue(track("b", USER_ID_1)).await;

        assert_eq!(fixture.engine.played(), vec!["a".to_string()]);
        assert_eq!(session.queued_titles(), vec!["b".to_string()]);
    }

    #[tokio::test]
    async fn concurrent_advances_pop_one_track() {
        let fixture = Fixture::new();
        let session = fixture.session().await;
        {
            let mut state = session.state();
            state.queue.push_back(track("a", USER_ID_1));
            state.queue.push_back(track("b", USER_ID_1));
        }

        tokio::join!(session.advance(), session.advance(), session.advance());

        assert_eq!(fixture.engine.played(), vec!["a".to_string()]);
        assert_eq!(session.queue_len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn parallel_advances_pop_one_track() {
        for _ in 0..50 {
            let fixture = Fixture::new();
            let session = fixture.session().await;
            {
                let mut state = session.state();
                state.queue.push_back(track("a", USER_ID_1));
                state.queue.push_back(track("b", USER_ID_1));
            }

            let advances = (0..8)
                .map(|_| {
                    let session = session.clone();
                    tokio::spawn(async move { session.advance().await })
                })
                .collect::<Vec<_>>();
            for advance in advances {
                advance.await.unwrap();
            }

            assert_eq!(fixture.engine.played(), vec!["a".to_string()]);
            assert_eq!(session.queue_len(), 1);
            assert!(!session.is_waiting());
        }
    }

    #[tokio::test]
    async fn advance_while_playing_releases_the_guard() {
        let fixture = Fixture::new();
        let session = fixture.session().await;
        session.enqueue(track("a", USER_ID_1)).await;
        session.state().queue.push_back(track("b", USER_ID_1));

        session.advance().await;

        assert!(!session.is_waiting());
        assert_eq!(fixture.engine.played(), vec!["a".to_string()]);
        assert_eq!(session.queue_len(), 1);
    }

    #[tokio::test]
    async fn track_end_moves_to_the_next_track() {
        let fixture = Fixture::new();
        let session = fixture.session().await;
        session.enqueue(track("a", USER_ID_1)).await;
        session.enqueue(track("b", USER_ID_2)).await;

        session.on_track_end().await;

        assert_eq!(session.current().map(|t| t.title), Some("b".to_string()));
        assert_eq!(session.queue_len(), 0);
    }

    #[tokio::test]
    async fn new_track_clears_every_vote_set() {
        let fixture = Fixture::new();
        fixture.gateway.set_roster(&[
            (BOT_ID, true),
            (USER_ID_1, false),
            (USER_ID_2, false),
            (USER_ID_3, false),
            (USER_ID_4, false),
        ]);
        let session = fixture.session().await;
        session.enqueue(track("a", USER_ID_1)).await;
        session.enqueue(track("b", USER_ID_1)).await;

        for action in [VoteAction::Pause, VoteAction::Resume, VoteAction::Shuffle, VoteAction::Stop] {
            session.cast_vote(action, USER_ID_2, false);
            assert_eq!(session.vote_count(action), 1);
        }
        session.cast_vote(VoteAction::Skip, USER_ID_3, false);

        session.on_track_end().await;

        for action in [
            VoteAction::Pause,
            VoteAction::Resume,
            VoteAction::Skip,
            VoteAction::Shuffle,
            VoteAction::Stop,
        ] {
            assert_eq!(session.vote_count(action), 0, "{action}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn idle_session_tears_down_once() {
        let fixture = Fixture::new();
        let session = fixture.session().await;
        assert_eq!(fixture.manager.len(), 1);

        session.advance().await;

        assert!(session.is_torn_down());
        assert!(fixture.manager.get(GUILD_ID_1).is_none());
        assert_eq!(fixture.engine.count(EngineCall::Disconnect), 1);

        session.teardown().await;
        session.advance().await;
        session.enqueue(track("late", USER_ID_1)).await;
        session.refresh_controller().await;

        assert_eq!(fixture.engine.count(EngineCall::Disconnect), 1);
        assert!(fixture.engine.played().is_empty());
        assert_eq!(fixture.gateway.sent_controllers(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn waiting_advance_picks_up_a_late_track() {
        let fixture = Fixture::new();
        let session = fixture.session().await;

        let waiter = {
            let session = session.clone();
            tokio::spawn(async move { session.advance().await })
        };
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(session.is_waiting());
        session.enqueue(track("late", USER_ID_2)).await;
        waiter.await.unwrap();

        assert!(!session.is_torn_down());
        assert_eq!(fixture.engine.played(), vec!["late".to_string()]);
    }

    #[tokio::test]
    async fn failed_play_moves_on() {
        let fixture = Fixture::new();
        let session = fixture.session().await;
        fixture.engine.fail_play("broken");
        {
            let mut state = session.state();
            state.queue.push_back(track("broken", USER_ID_1));
            state.queue.push_back(track("fine", USER_ID_1));
        }

        session.advance().await;

        assert_eq!(session.current().map(|t| t.title), Some("fine".to_string()));
    }

    #[tokio::test]
    async fn stale_controller_is_replaced_not_edited() {
        let fixture = Fixture::new();
        let session = fixture.session().await;
        session.enqueue(track("a", USER_ID_1)).await;
        let first = session.controller().unwrap();

        fixture.gateway.push_messages(5);
        session.refresh_controller().await;

        let second = session.controller().unwrap();
        assert_ne!(first, second);
        assert_eq!(fixture.gateway.deleted(), vec![first]);
        assert_eq!(fixture.gateway.edited(), 0);
        assert_eq!(fixture.gateway.sent_controllers(), 2);
    }

    #[tokio::test]
    async fn fresh_controller_is_edited_in_place() {
        let fixture = Fixture::new();
        let session = fixture.session().await;
        session.enqueue(track("a", USER_ID_1)).await;
        let first = session.controller().unwrap();

        fixture.gateway.push_messages(4);
        session.refresh_controller().await;

        assert_eq!(session.controller(), Some(first));
        assert_eq!(fixture.gateway.edited(), 1);
        assert_eq!(fixture.gateway.sent_controllers(), 1);
    }

    #[tokio::test]
    async fn controller_failures_are_swallowed() {
        let fixture = Fixture::new();
        let session = fixture.session().await;
        fixture.gateway.fail_everything();

        session.enqueue(track("a", USER_ID_1)).await;
        session.refresh_controller().await;
        session.teardown().await;

        assert!(session.controller().is_none());
        assert!(session.is_torn_down());
    }

    #[tokio::test]
    async fn privileged_vote_is_forced_and_clears() {
        let fixture = Fixture::new();
        fixture.gateway.set_roster(&[
            (BOT_ID, true),
            (USER_ID_1, false),
            (USER_ID_2, false),
            (USER_ID_3, false),
            (USER_ID_4, false),
        ]);
        let session = fixture.session().await;

        session.cast_vote(VoteAction::Pause, USER_ID_2, false);
        assert_eq!(session.vote_count(VoteAction::Pause), 1);

        assert_eq!(
            session.cast_vote(VoteAction::Pause, USER_ID_1, true),
            VoteOutcome::Forced
        );
        assert_eq!(session.vote_count(VoteAction::Pause), 0);
    }

    #[tokio::test]
    async fn vote_passes_at_quorum() {
        let fixture = Fixture::new();
        // five members, two votes needed
        fixture.gateway.set_roster(&[
            (BOT_ID, true),
            (USER_ID_1, false),
            (USER_ID_2, false),
            (USER_ID_3, false),
            (USER_ID_4, false),
        ]);
        let session = fixture.session().await;
        session.enqueue(track("a", USER_ID_1)).await;

        assert_eq!(
            session.cast_vote(VoteAction::Skip, USER_ID_2, false),
            VoteOutcome::Recorded {
                votes: 1,
                required: 2
            }
        );
        assert_eq!(
            session.cast_vote(VoteAction::Skip, USER_ID_3, false),
            VoteOutcome::Passed
        );
        assert_eq!(session.vote_count(VoteAction::Skip), 0);
    }

    #[tokio::test]
    async fn stop_with_three_members_needs_two() {
        let fixture = Fixture::new();
        fixture
            .gateway
            .set_roster(&[(BOT_ID, true), (USER_ID_2, false), (USER_ID_3, false)]);
        let session = fixture.session().await;

        assert!(!session.cast_vote(VoteAction::Stop, USER_ID_2, false).executes());
        assert!(session.cast_vote(VoteAction::Stop, USER_ID_3, false).executes());
    }

    #[tokio::test]
    async fn requester_skips_without_voting() {
        let fixture = Fixture::new();
        fixture.gateway.set_roster(&[
            (BOT_ID, true),
            (USER_ID_1, false),
            (USER_ID_2, false),
            (USER_ID_3, false),
            (USER_ID_4, false),
        ]);
        let session = fixture.session().await;
        session.enqueue(track("a", USER_ID_3)).await;

        assert_eq!(
            session.cast_vote(VoteAction::Skip, USER_ID_3, false),
            VoteOutcome::Requester
        );
        // the bypass only applies to skipping
        assert!(!session.cast_vote(VoteAction::Pause, USER_ID_3, false).executes());
    }

    #[tokio::test]
    async fn departing_dj_hands_over_to_first_human() {
        let fixture = Fixture::new();
        let session = fixture.manager.get_or_create(GUILD_ID_1, CHANNEL_ID_1, USER_ID_2);
        session.connect(VOICE_CHANNEL_ID_1).await.unwrap();
        let roster = [
            RosterMember {
                user_id: BOT_ID,
                bot: true,
            },
            RosterMember {
                user_id: USER_ID_2,
                bot: false,
            },
            RosterMember {
                user_id: USER_ID_3,
                bot: false,
            },
        ];

        assert_eq!(
            session.handle_voice_update(USER_ID_2, false, true, false, &roster),
            Some(USER_ID_3)
        );
        assert_eq!(session.dj(), USER_ID_3);
    }

    #[tokio::test]
    async fn joining_member_becomes_dj_when_dj_is_gone() {
        let fixture = Fixture::new();
        let session = fixture.session().await;
        let roster = [
            RosterMember {
                user_id: BOT_ID,
                bot: true,
            },
            RosterMember {
                user_id: USER_ID_4,
                bot: false,
            },
        ];

        assert_eq!(
            session.handle_voice_update(USER_ID_4, false, false, true, &roster),
            Some(USER_ID_4)
        );
        assert_eq!(session.dj(), USER_ID_4);

        // with the DJ present nothing changes
        let roster = [
            RosterMember {
                user_id: USER_ID_4,
                bot: false,
            },
            RosterMember {
                user_id: USER_ID_2,
                bot: false,
            },
        ];
        assert_eq!(
            session.handle_voice_update(USER_ID_2, false, false, true, &roster),
            None
        );
        assert_eq!(session.dj(), USER_ID_4);
    }

    #[tokio::test]
    async fn voice_updates_without_a_channel_are_ignored() {
        let fixture = Fixture::new();
        let session = fixture.manager.get_or_create(GUILD_ID_1, CHANNEL_ID_1, USER_ID_1);

        assert_eq!(session.handle_voice_update(USER_ID_1, false, true, false, &[]), None);
        assert_eq!(
            session.handle_voice_update(USER_ID_2, false, false, true, &[]),
            None
        );
        assert_eq!(session.dj(), USER_ID_1);
    }

    #[tokio::test]
    async fn bots_never_become_dj() {
        let fixture = Fixture::new();
        let session = fixture.session().await;
        let roster = [RosterMember {
            user_id: BOT_ID,
            bot: true,
        }];

        assert_eq!(session.handle_voice_update(BOT_ID, true, false, true, &roster), None);
        assert_eq!(session.handle_voice_update(USER_ID_1, false, true, false, &roster), None);
        assert_eq!(session.dj(), USER_ID_1);
    }

    #[tokio::test]
    async fn teardown_deletes_controller_and_disconnects() {
        let fixture = Fixture::new();
        let session = fixture.session().await;
        session.enqueue(track("a", USER_ID_1)).await;
        session.enqueue(track("b", USER_ID_1)).await;
        let controller = session.controller().unwrap();

        session.teardown().await;
        session.teardown().await;

        assert_eq!(fixture.gateway.deleted(), vec![controller]);
        assert_eq!(fixture.engine.count(EngineCall::Disconnect), 1);
        assert_eq!(session.queue_len(), 0);
        assert!(fixture.manager.is_empty());

        // a fresh session can take the guild over
        let next = fixture.manager.get_or_create(GUILD_ID_1, CHANNEL_ID_2, USER_ID_2);
        assert!(!next.is_torn_down());
        session.teardown().await;
        assert!(fixture.manager.get(GUILD_ID_1).is_some());
    }

    #[tokio::test]
    async fn volume_and_pause_are_tracked() {
        let fixture = Fixture::new();
        let session = fixture.session().await;
        session.enqueue(track("a", USER_ID_1)).await;

        session.set_volume(150).await.unwrap();
        session.set_pause(true).await.unwrap();

        assert_eq!(session.volume(), 100);
        assert!(session.is_paused());
        assert_eq!(fixture.engine.count(EngineCall::SetVolume(100)), 1);
        assert_eq!(fixture.engine.count(EngineCall::SetPause(true)), 1);
    }

    #[tokio::test]
    async fn shuffle_keeps_every_track() {
        let fixture = Fixture::new();
        let session = fixture.session().await;
        session.enqueue(track("now", USER_ID_1)).await;
        for name in ["a", "b", "c", "d", "e"] {
            session.enqueue(track(name, USER_ID_1)).await;
        }

        session.shuffle().await;

        let mut titles = session.queued_titles();
        titles.sort();
        assert_eq!(titles, vec!["a", "b", "c", "d", "e"]);
    }

    #[tokio::test]
    async fn manager_keeps_the_first_binding() {
        let fixture = Fixture::new();
        let first = fixture.manager.get_or_create(GUILD_ID_1, CHANNEL_ID_1, USER_ID_1);
        let second = fixture.manager.get_or_create(GUILD_ID_1, CHANNEL_ID_2, USER_ID_2);

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.text_channel_id(), CHANNEL_ID_1);
        assert_eq!(second.dj(), USER_ID_1);
        fixture.manager.get_or_create(GUILD_ID_2, CHANNEL_ID_2, USER_ID_2);
        assert_eq!(fixture.manager.len(), 2);
    }
}
