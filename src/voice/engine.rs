//! The audio engine seam. Sessions talk to [`AudioEngine`] only; [`SongbirdEngine`] is the real
//! implementation on top of songbird and yt-dlp.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use poise::serenity_prelude::{self as serenity, async_trait};
use songbird::{
    input::YoutubeDl, tracks::TrackHandle, Event, EventContext, EventHandler as VoiceEventHandler,
    Songbird, TrackEvent,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use youtube_dl::{SearchOptions, SingleVideo, YoutubeDlOutput};

use super::{
    error::MusicCommandError,
    track::{is_url, SearchResult, Track, TrackInfo},
};
use crate::utils::OptionExt;

const YOUTUBE_DL_COMMAND: &str = "yt-dlp";

#[async_trait]
pub trait AudioEngine: Send + Sync {
    async fn connect(
        &self,
        guild_id: serenity::GuildId,
        channel_id: serenity::ChannelId,
    ) -> Result<(), MusicCommandError>;

    /// Starts `track`, replacing whatever was playing.
    async fn play(&self, guild_id: serenity::GuildId, track: &Track) -> Result<(), MusicCommandError>;

    async fn set_pause(&self, guild_id: serenity::GuildId, paused: bool) -> Result<(), MusicCommandError>;

    /// Volume in percent, 0 to 100.
    async fn set_volume(&self, guild_id: serenity::GuildId, volume: u8) -> Result<(), MusicCommandError>;

    /// Stops the current track. The end of the track is reported like a natural end.
    async fn stop(&self, guild_id: serenity::GuildId) -> Result<(), MusicCommandError>;

    async fn disconnect(&self, guild_id: serenity::GuildId) -> Result<(), MusicCommandError>;

    async fn search(&self, query: &str) -> Result<SearchResult, MusicCommandError>;
}

#[derive(Default)]
struct Player {
    handle: Option<TrackHandle>,
    volume: u8,
}

type Players = Arc<Mutex<HashMap<serenity::GuildId, Player>>>;

pub struct SongbirdEngine {
    songbird: Arc<Songbird>,
    http: reqwest::Client,
    players: Players,
    track_end: mpsc::UnboundedSender<serenity::GuildId>,
}

impl SongbirdEngine {
    /// Creates the engine and the receiving end of its track end notifications.
    pub fn new(
        songbird: Arc<Songbird>,
        http: reqwest::Client,
    ) -> (Self, mpsc::UnboundedReceiver<serenity::GuildId>) {
        let (track_end, receiver) = mpsc::unbounded_channel();
        (
            Self {
                songbird,
                http,
                players: Default::default(),
                track_end,
            },
            receiver,
        )
    }

    fn current_handle(&self, guild_id: serenity::GuildId) -> Option<TrackHandle> {
        self.players
            .lock()
            .ok()?
            .get(&guild_id)
            .and_then(|player| player.handle.clone())
    }

    fn volume(&self, guild_id: serenity::GuildId) -> u8 {
        self.players
            .lock()
            .ok()
            .and_then(|players| players.get(&guild_id).map(|p| p.volume))
            .unwrap_or(100)
    }
}

fn volume_scale(volume: u8) -> f32 {
    f32::from(volume.min(100)) / 100.0
}

#[async_trait]
impl AudioEngine for SongbirdEngine {
    async fn connect(
        &self,
        guild_id: serenity::GuildId,
        channel_id: serenity::ChannelId,
    ) -> Result<(), MusicCommandError> {
        let call = self
            .songbird
            .join(guild_id, channel_id)
            .await
            .map_err(|source| MusicCommandError::FailedJoinCall {
                source,
                guild_id,
                channel_id,
            })?;
        info!("joined channel id: {channel_id} in guild {guild_id}");

        call.lock()
            .await
            .deafen(true)
            .await
            .map_err(|source| MusicCommandError::FailedDeafenCall {
                source,
                guild_id,
                channel_id,
            })?;

        if let Ok(mut players) = self.players.lock() {
            players.entry(guild_id).or_insert(Player {
                handle: None,
                volume: 100,
            });
        }
        Ok(())
    }

    async fn play(&self, guild_id: serenity::GuildId, track: &Track) -> Result<(), MusicCommandError> {
        let call = self
            .songbird
            .get(guild_id)
            .ok_or(MusicCommandError::CallDoesNotExist)?;

        let input = YoutubeDl::new(self.http.clone(), track.uri.clone());
        let audio = songbird::tracks::Track::new(input.into()).volume(volume_scale(self.volume(guild_id)));
        let handle = call.lock().await.play_only(audio);
        debug!("playing {} ({}) in guild {guild_id}", track.title, handle.uuid());

        for event in [TrackEvent::End, TrackEvent::Error] {
            handle
                .add_event(
                    Event::Track(event),
                    TrackEndNotifier {
                        guild_id,
                        track_uuid: handle.uuid(),
                        players: self.players.clone(),
                        track_end: self.track_end.clone(),
                    },
                )
                .map_err(|source| MusicCommandError::FailedTrackControl {
                    action: "watch",
                    source,
                })?;
        }

        if let Ok(mut players) = self.players.lock() {
            players.entry(guild_id).or_insert(Player {
                handle: None,
                volume: 100,
            }).handle = Some(handle);
        }
        Ok(())
    }

    async fn set_pause(&self, guild_id: serenity::GuildId, paused: bool) -> Result<(), MusicCommandError> {
        let handle = self
            .current_handle(guild_id)
            .ok_or(MusicCommandError::NothingPlaying)?;
        if paused {
            handle
                .pause()
                .map_err(|source| MusicCommandError::FailedTrackControl {
                    action: "pause",
                    source,
                })
        } else {
            handle
                .play()
                .map_err(|source| MusicCommandError::FailedTrackControl {
                    action: "resume",
                    source,
                })
        }
    }

    async fn set_volume(&self, guild_id: serenity::GuildId, volume: u8) -> Result<(), MusicCommandError> {
        let handle = {
            let Ok(mut players) = self.players.lock() else {
                return Err(MusicCommandError::CallDoesNotExist);
            };
            let player = players.entry(guild_id).or_default();
            player.volume = volume.min(100);
            player.handle.clone()
        };
        if let Some(handle) = handle {
            handle
                .set_volume(volume_scale(volume))
                .map_err(|source| MusicCommandError::FailedTrackControl {
                    action: "change the volume of",
                    source,
                })?;
        }
        Ok(())
    }

    async fn stop(&self, guild_id: serenity::GuildId) -> Result<(), MusicCommandError> {
        let handle = self
            .current_handle(guild_id)
            .ok_or(MusicCommandError::NothingPlaying)?;
        handle
            .stop()
            .map_err(|source| MusicCommandError::FailedTrackControl {
                action: "stop",
                source,
            })
    }

    async fn disconnect(&self, guild_id: serenity::GuildId) -> Result<(), MusicCommandError> {
        if let Ok(mut players) = self.players.lock() {
            players.remove(&guild_id);
        }
        if self.songbird.get(guild_id).is_none() {
            return Ok(());
        }
        self.songbird
            .remove(guild_id)
            .await
            .map_err(|source| MusicCommandError::FailedLeaveCall { source, guild_id })
    }

    #[tracing::instrument(skip(self))]
    async fn search(&self, query: &str) -> Result<SearchResult, MusicCommandError> {
        let searching = !is_url(query);
        let output = if searching {
            youtube_dl::YoutubeDl::search_for(&SearchOptions::youtube(query).with_count(1))
                .youtube_dl_path(YOUTUBE_DL_COMMAND)
                .flat_playlist(true)
                .process_timeout(Duration::from_secs(45))
                .run_async()
                .await
        } else {
            youtube_dl::YoutubeDl::new(query)
                .youtube_dl_path(YOUTUBE_DL_COMMAND)
                .flat_playlist(true)
                .process_timeout(Duration::from_secs(45))
                .run_async()
                .await
        }
        .map_err(|source| MusicCommandError::YoutubeDlError {
            source,
            query: query.to_string(),
        })?;

        let result = match output {
            YoutubeDlOutput::SingleVideo(video) => SearchResult::Track(track_info(*video)),
            YoutubeDlOutput::Playlist(playlist) => {
                let mut tracks = playlist
                    .entries
                    .unwrap_or_default()
                    .into_iter()
                    .map(track_info)
                    .collect::<Vec<_>>();
                if tracks.is_empty() {
                    SearchResult::Empty
                } else if searching {
                    SearchResult::Track(tracks.swap_remove(0))
                } else {
                    SearchResult::Playlist {
                        name: playlist.title.unwrap_or_unknown(),
                        tracks,
                    }
                }
            }
        };
        Ok(result)
    }
}

fn track_info(video: SingleVideo) -> TrackInfo {
    let uri = video
        .webpage_url
        .clone()
        .unwrap_or_else(|| format!("https://www.youtube.com/watch?v={}", video.id));
    let length = video
        .duration
        .as_ref()
        .and_then(|duration| duration.as_f64())
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(Duration::from_secs_f64)
        .unwrap_or_default();
    TrackInfo {
        id: video.id,
        title: video.title.unwrap_or_unknown(),
        uri,
        length,
        thumbnail: video.thumbnail,
    }
}

/// Reports the end of the track it is attached to, unless another track has replaced it.
struct TrackEndNotifier {
    guild_id: serenity::GuildId,
    track_uuid: uuid::Uuid,
    players: Players,
    track_end: mpsc::UnboundedSender<serenity::GuildId>,
}

#[async_trait]
impl VoiceEventHandler for TrackEndNotifier {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        if let EventContext::Track(tracks) = ctx {
            if let Some((state, _)) = tracks.first() {
                debug!("track {} in guild {} finished as {:?}", self.track_uuid, self.guild_id, state.playing);
            }
        }

        let current = {
            let Ok(mut players) = self.players.lock() else {
                return None;
            };
            match players.get_mut(&self.guild_id) {
                Some(player)
                    if player.handle.as_ref().map(|h| h.uuid()) == Some(self.track_uuid) =>
                {
                    player.handle = None;
                    true
                }
                _ => false,
            }
        };

        if current && self.track_end.send(self.guild_id).is_err() {
            warn!("track end listener is gone, guild {} will not advance", self.guild_id);
        }
        None
    }
}
