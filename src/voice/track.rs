use std::time::Duration;

use poise::serenity_prelude as serenity;

/// Track metadata as returned by a search, before anyone asked for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackInfo {
    pub id: String,
    pub title: String,
    pub uri: String,
    pub length: Duration,
    pub thumbnail: Option<String>,
}

impl TrackInfo {
    pub fn requested_by(self, requester: serenity::UserId) -> Track {
        Track {
            id: self.id,
            title: self.title,
            uri: self.uri,
            length: self.length,
            thumbnail: self.thumbnail,
            requester,
        }
    }
}

/// A queued track together with the member who requested it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub uri: String,
    pub length: Duration,
    pub thumbnail: Option<String>,
    pub requester: serenity::UserId,
}

impl Track {
    /// Track length rounded to whole seconds, e.g. `3m 25s`.
    pub fn length_display(&self) -> String {
        humantime::format_duration(Duration::from_secs(self.length.as_secs())).to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchResult {
    Track(TrackInfo),
    Playlist { name: String, tracks: Vec<TrackInfo> },
    Empty,
}

/// Whether the query should be handed to the engine as is rather than searched for.
pub fn is_url(query: &str) -> bool {
    match url::Url::parse(query) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.host_str().is_some(),
        Err(_) => false,
    }
}

/// Strips the angle brackets used to suppress link embeds.
pub fn clean_query(query: &str) -> &str {
    query.trim().trim_start_matches('<').trim_end_matches('>')
}
