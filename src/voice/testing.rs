//! In memory stand-ins for the audio engine and the chat gateway.

use std::{
    collections::HashSet,
    sync::{Mutex, MutexGuard},
    time::Duration,
};

use poise::serenity_prelude::{self as serenity, async_trait};

use super::{
    controller::ControllerView,
    engine::AudioEngine,
    error::MusicCommandError,
    gateway::{ChatGateway, Notice, RosterMember},
    track::{SearchResult, Track},
};

pub fn track(title: &str, requester: serenity::UserId) -> Track {
    Track {
        id: title.to_string(),
        title: title.to_string(),
        uri: format!("https://www.youtube.com/watch?v={title}"),
        length: Duration::from_secs(205),
        thumbnail: None,
        requester,
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Connect(serenity::ChannelId),
    Play(String),
    SetPause(bool),
    SetVolume(u8),
    Stop,
    Disconnect,
}

#[derive(Default)]
pub struct MockEngine {
    calls: Mutex<Vec<EngineCall>>,
    failing: Mutex<HashSet<String>>,
    search: Mutex<Option<SearchResult>>,
}

impl MockEngine {
    pub fn calls(&self) -> Vec<EngineCall> {
        lock(&self.calls).clone()
    }

    pub fn count(&self, call: EngineCall) -> usize {
        lock(&self.calls).iter().filter(|c| **c == call).count()
    }

    pub fn played(&self) -> Vec<String> {
        lock(&self.calls)
            .iter()
            .filter_map(|c| match c {
                EngineCall::Play(title) => Some(title.clone()),
                _ => None,
            })
            .collect()
    }

    /// Makes playing the track titled `title` fail.
    pub fn fail_play(&self, title: &str) {
        lock(&self.failing).insert(title.to_string());
    }

    pub fn set_search(&self, result: SearchResult) {
        *lock(&self.search) = Some(result);
    }
}

#[async_trait]
impl AudioEngine for MockEngine {
    async fn connect(
        &self,
        _guild_id: serenity::GuildId,
        channel_id: serenity::ChannelId,
    ) -> Result<(), MusicCommandError> {
        lock(&self.calls).push(EngineCall::Connect(channel_id));
        Ok(())
    }

    async fn play(&self, _guild_id: serenity::GuildId, track: &Track) -> Result<(), MusicCommandError> {
        if lock(&self.failing).contains(&track.title) {
            return Err(MusicCommandError::CallDoesNotExist);
        }
        lock(&self.calls).push(EngineCall::Play(track.title.clone()));
        Ok(())
    }

    async fn set_pause(&self, _guild_id: serenity::GuildId, paused: bool) -> Result<(), MusicCommandError> {
        lock(&self.calls).push(EngineCall::SetPause(paused));
        Ok(())
    }

    async fn set_volume(&self, _guild_id: serenity::GuildId, volume: u8) -> Result<(), MusicCommandError> {
        lock(&self.calls).push(EngineCall::SetVolume(volume));
        Ok(())
    }

    async fn stop(&self, _guild_id: serenity::GuildId) -> Result<(), MusicCommandError> {
        lock(&self.calls).push(EngineCall::Stop);
        Ok(())
    }

    async fn disconnect(&self, _guild_id: serenity::GuildId) -> Result<(), MusicCommandError> {
        lock(&self.calls).push(EngineCall::Disconnect);
        Ok(())
    }

    async fn search(&self, _query: &str) -> Result<SearchResult, MusicCommandError> {
        Ok(lock(&self.search).clone().unwrap_or(SearchResult::Empty))
    }
}

#[derive(Default)]
pub struct MockGateway {
    next_id: Mutex<u64>,
    /// Every message in the text channel, oldest first.
    history: Mutex<Vec<serenity::MessageId>>,
    sent: Mutex<usize>,
    edited: Mutex<usize>,
    deleted: Mutex<Vec<serenity::MessageId>>,
    said: Mutex<Vec<String>>,
    roster: Mutex<Vec<RosterMember>>,
    failing: Mutex<bool>,
}

impl MockGateway {
    fn next_message(&self) -> serenity::MessageId {
        let mut next_id = lock(&self.next_id);
        *next_id += 1;
        let id = serenity::MessageId::new(*next_id);
        lock(&self.history).push(id);
        id
    }

    fn check(&self) -> serenity::Result<()> {
        if *lock(&self.failing) {
            Err(serenity::Error::Other("gateway unavailable"))
        } else {
            Ok(())
        }
    }

    pub fn set_roster(&self, members: &[(serenity::UserId, bool)]) {
        *lock(&self.roster) = members
            .iter()
            .map(|&(user_id, bot)| RosterMember { user_id, bot })
            .collect();
    }

    /// Simulates other members talking in the text channel.
    pub fn push_messages(&self, count: usize) {
        for _ in 0..count {
            self.next_message();
        }
    }

    pub fn fail_everything(&self) {
        *lock(&self.failing) = true;
    }

    pub fn sent_controllers(&self) -> usize {
        *lock(&self.sent)
    }

    pub fn edited(&self) -> usize {
        *lock(&self.edited)
    }

    pub fn deleted(&self) -> Vec<serenity::MessageId> {
        lock(&self.deleted).clone()
    }

    pub fn said(&self) -> Vec<String> {
        lock(&self.said).clone()
    }
}

#[async_trait]
impl ChatGateway for MockGateway {
    async fn send_controller(
        &self,
        _channel_id: serenity::ChannelId,
        _view: &ControllerView,
    ) -> serenity::Result<serenity::MessageId> {
        self.check()?;
        *lock(&self.sent) += 1;
        Ok(self.next_message())
    }

    async fn edit_controller(
        &self,
        _channel_id: serenity::ChannelId,
        _message_id: serenity::MessageId,
        _view: &ControllerView,
    ) -> serenity::Result<()> {
        self.check()?;
        *lock(&self.edited) += 1;
        Ok(())
    }

    async fn delete_message(
        &self,
        _channel_id: serenity::ChannelId,
        message_id: serenity::MessageId,
    ) -> serenity::Result<()> {
        self.check()?;
        lock(&self.history).retain(|id| *id != message_id);
        lock(&self.deleted).push(message_id);
        Ok(())
    }

    async fn recent_message_ids(
        &self,
        _channel_id: serenity::ChannelId,
        limit: u8,
    ) -> serenity::Result<Vec<serenity::MessageId>> {
        self.check()?;
        Ok(lock(&self.history)
            .iter()
            .rev()
            .take(limit as usize)
            .copied()
            .collect())
    }

    async fn say(&self, _channel_id: serenity::ChannelId, notice: &Notice) -> serenity::Result<()> {
        self.check()?;
        self.next_message();
        lock(&self.said).push(notice.content.clone());
        Ok(())
    }

    fn voice_members(
        &self,
        _guild_id: serenity::GuildId,
        _channel_id: serenity::ChannelId,
    ) -> Vec<RosterMember> {
        lock(&self.roster).clone()
    }
}
