//! Playback actions shared by the music commands and the controller reactions.
//!
//! Each action returns the notice to show in the session's text channel, if any.

use poise::serenity_prelude::{self as serenity, Mentionable};

use super::{
    controller::{queue_pages, ControllerAction, NOTICE_LIFETIME},
    error::MusicCommandError,
    gateway::Notice,
    session::Session,
    track::SearchResult,
    vote::{VoteAction, VoteOutcome},
};

pub type ActionResult = Result<Option<Notice>, MusicCommandError>;

/// The member asking for an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Invoker {
    pub user_id: serenity::UserId,
    pub privileged: bool,
}

fn notice(content: impl Into<String>) -> Option<Notice> {
    Some(Notice::fleeting(content, NOTICE_LIFETIME))
}

struct Wording {
    vote: &'static str,
    forced: &'static str,
    passed: &'static str,
}

fn wording(action: VoteAction) -> Wording {
    match action {
        VoteAction::Pause => Wording {
            vote: "pause the song",
            forced: "paused the song",
            passed: "Vote to pause passed. Pausing player.",
        },
        VoteAction::Resume => Wording {
            vote: "resume the song",
            forced: "resumed the song",
            passed: "Vote to resume passed. Resuming player.",
        },
        VoteAction::Skip => Wording {
            vote: "skip the song",
            forced: "skipped the song",
            passed: "Vote to skip passed. Skipping song.",
        },
        VoteAction::Shuffle => Wording {
            vote: "shuffle the playlist",
            forced: "shuffled the playlist",
            passed: "Vote to shuffle passed. Shuffling the playlist.",
        },
        VoteAction::Stop => Wording {
            vote: "stop the player",
            forced: "stopped the player",
            passed: "Vote to stop passed. Stopping the player.",
        },
    }
}

fn outcome_notice(action: VoteAction, outcome: VoteOutcome, invoker: Invoker) -> Option<Notice> {
    let wording = wording(action);
    match outcome {
        VoteOutcome::Forced => notice(format!("An admin or DJ has {}.", wording.forced)),
        VoteOutcome::Requester => notice("The song requester has skipped the song."),
        VoteOutcome::Passed => notice(wording.passed),
        VoteOutcome::Recorded { .. } => notice(format!(
            "{} has voted to {}.",
            invoker.user_id.mention(),
            wording.vote
        )),
    }
}

fn ensure_playing(session: &Session) -> Result<(), MusicCommandError> {
    if session.is_playing() {
        Ok(())
    } else {
        Err(MusicCommandError::NothingPlaying)
    }
}

pub async fn pause(session: &Session, invoker: Invoker) -> ActionResult {
    ensure_playing(session)?;
    if session.is_paused() {
        return Ok(None);
    }
    let outcome = session.cast_vote(VoteAction::Pause, invoker.user_id, invoker.privileged);
    if outcome.executes() {
        session.set_pause(true).await?;
    }
    Ok(outcome_notice(VoteAction::Pause, outcome, invoker))
}

pub async fn resume(session: &Session, invoker: Invoker) -> ActionResult {
    ensure_playing(session)?;
    if !session.is_paused() {
        return Ok(None);
    }
    let outcome = session.cast_vote(VoteAction::Resume, invoker.user_id, invoker.privileged);
    if outcome.executes() {
        session.set_pause(false).await?;
    }
    Ok(outcome_notice(VoteAction::Resume, outcome, invoker))
}

pub async fn skip(session: &Session, invoker: Invoker) -> ActionResult {
    ensure_playing(session)?;
    let outcome = session.cast_vote(VoteAction::Skip, invoker.user_id, invoker.privileged);
    if outcome.executes() {
        session.skip().await?;
    }
    Ok(outcome_notice(VoteAction::Skip, outcome, invoker))
}

pub const MIN_SHUFFLE_QUEUE: usize = 3;

pub async fn shuffle(session: &Session, invoker: Invoker) -> ActionResult {
    if session.queue_len() < MIN_SHUFFLE_QUEUE {
        return Ok(notice("Add more songs to the queue before shuffling."));
    }
    let outcome = session.cast_vote(VoteAction::Shuffle, invoker.user_id, invoker.privileged);
    if outcome.executes() {
        session.shuffle().await;
    }
    Ok(outcome_notice(VoteAction::Shuffle, outcome, invoker))
}

pub async fn stop(session: &Session, invoker: Invoker) -> ActionResult {
    let outcome = session.cast_vote(VoteAction::Stop, invoker.user_id, invoker.privileged);
    let reply = outcome_notice(VoteAction::Stop, outcome, invoker);
    if outcome.executes() {
        session.teardown().await;
    }
    Ok(reply)
}

pub async fn volume(session: &Session, invoker: Invoker, volume: u8) -> ActionResult {
    if !invoker.privileged {
        return Err(MusicCommandError::NotPrivileged);
    }
    if !(1..=100).contains(&volume) {
        return Err(MusicCommandError::InvalidVolume(volume));
    }
    session.set_volume(volume).await?;
    Ok(notice(format!("Setting the player volume to **`{volume}%`**")))
}

/// The volume one step up, rounded to a multiple of ten. The flag is set when the step hit the
/// ceiling.
fn step_up(volume: u8) -> (u8, bool) {
    let next = ((f64::from(volume) + 10.0) / 10.0).ceil() as i32 * 10;
    if next > 100 {
        (100, true)
    } else {
        (next as u8, false)
    }
}

fn step_down(volume: u8) -> (u8, bool) {
    let next = ((f64::from(volume) - 10.0) / 10.0).ceil() as i32 * 10;
    if next < 0 {
        (0, true)
    } else {
        (next as u8, false)
    }
}

pub async fn volume_up(session: &Session, invoker: Invoker) -> ActionResult {
    if !invoker.privileged {
        return Err(MusicCommandError::NotPrivileged);
    }
    let (volume, capped) = step_up(session.volume());
    session.set_volume(volume).await?;
    if capped {
        Ok(notice("Maximum volume reached"))
    } else {
        Ok(None)
    }
}

pub async fn volume_down(session: &Session, invoker: Invoker) -> ActionResult {
    if !invoker.privileged {
        return Err(MusicCommandError::NotPrivileged);
    }
    let (volume, capped) = step_down(session.volume());
    session.set_volume(volume).await?;
    if capped {
        Ok(notice("Player is currently muted"))
    } else {
        Ok(None)
    }
}

/// The first page of the upcoming tracks.
pub fn queue(session: &Session) -> Option<Notice> {
    let titles = session.queued_titles();
    let pages = queue_pages(titles.iter().map(String::as_str));
    match pages.first() {
        None => notice("There are no more songs in the queue."),
        Some(first) => notice(format!(
            "**Coming Up...**\n{first}\n\nPage 1 of {}",
            pages.len()
        )),
    }
}

/// Hands the DJ role to `target`, or to the first other member in the channel.
pub fn swap_dj(session: &Session, invoker: Invoker, target: Option<serenity::UserId>) -> ActionResult {
    if !invoker.privileged {
        return Err(MusicCommandError::NotPrivileged);
    }
    let roster = session.roster();
    let dj = session.dj();

    let next = match target {
        Some(target) => {
            if !roster.iter().any(|m| m.user_id == target) {
                return Err(MusicCommandError::MemberNotInChannel(target));
            }
            if target == dj {
                return Ok(notice("Cannot swap DJ to the current DJ... :)"));
            }
            target
        }
        None => {
            if roster.len() <= 2 {
                return Ok(notice("No more members to swap to."));
            }
            match roster.iter().find(|m| !m.bot && m.user_id != dj) {
                Some(member) => member.user_id,
                None => return Ok(notice("No more members to swap to.")),
            }
        }
    };
    session.set_dj(next);
    Ok(notice(format!("{} is now the DJ.", next.mention())))
}

/// Queues everything a search found for `requester`.
pub async fn enqueue_result(
    session: &Session,
    requester: serenity::UserId,
    result: SearchResult,
) -> Option<Notice> {
    match result {
        SearchResult::Empty => notice("No songs were found with that query. Please try again."),
        SearchResult::Track(info) => {
            let title = info.title.clone();
            session.enqueue(info.requested_by(requester)).await;
            notice(format!("```ini\nAdded {title} to the Queue\n```"))
        }
        SearchResult::Playlist { name, tracks } => {
            let count = tracks.len();
            for info in tracks {
                session.enqueue(info.requested_by(requester)).await;
            }
            notice(format!(
                "```ini\nAdded the playlist {name} with {count} songs to the queue.\n```"
            ))
        }
    }
}

/// Runs the action behind a controller reaction.
pub async fn perform(session: &Session, invoker: Invoker, action: ControllerAction) -> ActionResult {
    match action {
        ControllerAction::Resume => resume(session, invoker).await,
        ControllerAction::Pause => pause(session, invoker).await,
        ControllerAction::Stop => stop(session, invoker).await,
        ControllerAction::Skip => skip(session, invoker).await,
        ControllerAction::Shuffle => shuffle(session, invoker).await,
        ControllerAction::VolumeUp => volume_up(session, invoker).await,
        ControllerAction::VolumeDown => volume_down(session, invoker).await,
        ControllerAction::Queue => Ok(queue(session)),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        constants::*,
        voice::{
            session::SessionManager,
            testing::{track, EngineCall, MockEngine, MockGateway},
            track::TrackInfo,
        },
    };

    const DJ: Invoker = Invoker {
        user_id: USER_ID_1,
        privileged: true,
    };

    fn listener(user_id: serenity::UserId) -> Invoker {
        Invoker {
            user_id,
            privileged: false,
        }
    }

    async fn setup() -> (Arc<MockEngine>, Arc<MockGateway>, Arc<Session>) {
        let engine = Arc::new(MockEngine::default());
        let gateway = Arc::new(MockGateway::default());
        gateway.set_roster(&[
            (BOT_ID, true),
            (USER_ID_1, false),
            (USER_ID_2, false),
            (USER_ID_3, false),
            (USER_ID_4, false),
        ]);
        let manager = SessionManager::new(engine.clone(), gateway.clone());
        let session = manager.get_or_create(GUILD_ID_1, CHANNEL_ID_1, USER_ID_1);
        session.connect(VOICE_CHANNEL_ID_1).await.unwrap();
        (engine, gateway, session)
    }

    fn content(reply: ActionResult) -> String {
        reply.unwrap().map(|n| n.content).unwrap_or_default()
    }

    #[tokio::test]
    async fn pause_needs_a_track() {
        let (_, _, session) = setup().await;
        assert!(matches!(
            pause(&session, DJ).await,
            Err(MusicCommandError::NothingPlaying)
        ));
    }

    #[tokio::test]
    async fn dj_pauses_and_resumes_directly() {
        let (engine, _, session) = setup().await;
        session.enqueue(track("a", USER_ID_2)).await;

        assert_eq!(
            content(pause(&session, DJ).await),
            "An admin or DJ has paused the song."
        );
        assert!(session.is_paused());
        // already paused
        assert!(pause(&session, DJ).await.unwrap().is_none());

        resume(&session, DJ).await.unwrap();
        assert!(!session.is_paused());
        assert!(resume(&session, DJ).await.unwrap().is_none());
        assert_eq!(engine.count(EngineCall::SetPause(true)), 1);
        assert_eq!(engine.count(EngineCall::SetPause(false)), 1);
    }

    #[tokio::test]
    async fn listeners_vote_to_skip() {
        let (engine, _, session) = setup().await;
        session.enqueue(track("a", USER_ID_1)).await;

        let first = content(skip(&session, listener(USER_ID_2)).await);
        assert_eq!(first, format!("{} has voted to skip the song.", USER_ID_2.mention()));
        assert_eq!(engine.count(EngineCall::Stop), 0);

        let second = content(skip(&session, listener(USER_ID_3)).await);
        assert_eq!(second, "Vote to skip passed. Skipping song.");
        assert_eq!(engine.count(EngineCall::Stop), 1);
    }

    #[tokio::test]
    async fn requester_skip_is_announced() {
        let (engine, _, session) = setup().await;
        session.enqueue(track("a", USER_ID_4)).await;

        assert_eq!(
            content(skip(&session, listener(USER_ID_4)).await),
            "The song requester has skipped the song."
        );
        assert_eq!(engine.count(EngineCall::Stop), 1);
    }

    #[tokio::test]
    async fn shuffle_needs_three_queued() {
        let (_, _, session) = setup().await;
        session.enqueue(track("now", USER_ID_1)).await;
        session.enqueue(track("a", USER_ID_1)).await;
        session.enqueue(track("b", USER_ID_1)).await;

        assert_eq!(
            content(shuffle(&session, DJ).await),
            "Add more songs to the queue before shuffling."
        );

        session.enqueue(track("c", USER_ID_1)).await;
        assert_eq!(
            content(shuffle(&session, DJ).await),
            "An admin or DJ has shuffled the playlist."
        );
    }

    #[tokio::test]
    async fn dj_stop_tears_down() {
        let (engine, _, session) = setup().await;
        session.enqueue(track("a", USER_ID_1)).await;

        assert_eq!(
            content(stop(&session, DJ).await),
            "An admin or DJ has stopped the player."
        );
        assert!(session.is_torn_down());
        assert_eq!(engine.count(EngineCall::Disconnect), 1);
    }

    #[tokio::test]
    async fn volume_is_privileged_and_bounded() {
        let (_, _, session) = setup().await;
        assert!(matches!(
            volume(&session, listener(USER_ID_2), 50).await,
            Err(MusicCommandError::NotPrivileged)
        ));
        assert!(matches!(
            volume(&session, DJ, 0).await,
            Err(MusicCommandError::InvalidVolume(0))
        ));
        assert!(matches!(
            volume(&session, DJ, 101).await,
            Err(MusicCommandError::InvalidVolume(101))
        ));
        assert_eq!(
            content(volume(&session, DJ, 42).await),
            "Setting the player volume to **`42%`**"
        );
        assert_eq!(session.volume(), 42);
    }

    #[test]
    fn volume_steps_land_on_tens() {
        assert_eq!(step_up(42), (60, false));
        assert_eq!(step_up(40), (50, false));
        assert_eq!(step_up(90), (100, false));
        assert_eq!(step_up(95), (100, true));
        assert_eq!(step_up(100), (100, true));
        assert_eq!(step_down(42), (40, false));
        assert_eq!(step_down(40), (30, false));
        assert_eq!(step_down(5), (0, false));
        assert_eq!(step_down(0), (0, true));
    }

    #[tokio::test]
    async fn volume_buttons_report_the_limits() {
        let (_, _, session) = setup().await;
        assert_eq!(content(volume_up(&session, DJ).await), "Maximum volume reached");

        session.set_volume(0).await.unwrap();
        assert_eq!(content(volume_down(&session, DJ).await), "Player is currently muted");
        assert!(volume_up(&session, DJ).await.unwrap().is_none());
        assert_eq!(session.volume(), 10);
    }

    #[tokio::test]
    async fn queue_listing() {
        let (_, _, session) = setup().await;
        assert_eq!(
            queue(&session).map(|n| n.content).unwrap_or_default(),
            "There are no more songs in the queue."
        );

        session.enqueue(track("now", USER_ID_1)).await;
        session.enqueue(track("next", USER_ID_1)).await;
        let listing = queue(&session).map(|n| n.content).unwrap_or_default();
        assert!(listing.starts_with("**Coming Up...**"));
        assert!(listing.contains("`1.` **`next`**"));
    }

    #[tokio::test]
    async fn swap_dj_checks_the_target() {
        let (_, _, session) = setup().await;
        assert!(matches!(
            swap_dj(&session, listener(USER_ID_2), None),
            Err(MusicCommandError::NotPrivileged)
        ));
        assert!(matches!(
            swap_dj(&session, DJ, Some(serenity::UserId::new(42))),
            Err(MusicCommandError::MemberNotInChannel(_))
        ));
        assert_eq!(
            content(swap_dj(&session, DJ, Some(USER_ID_1))),
            "Cannot swap DJ to the current DJ... :)"
        );

        swap_dj(&session, DJ, Some(USER_ID_3)).unwrap();
        assert_eq!(session.dj(), USER_ID_3);

        swap_dj(&session, DJ, None).unwrap();
        assert_eq!(session.dj(), USER_ID_1);
    }

    #[tokio::test]
    async fn swap_dj_needs_someone_else() {
        let (_, gateway, session) = setup().await;
        gateway.set_roster(&[(BOT_ID, true), (USER_ID_1, false)]);
        assert_eq!(
            content(swap_dj(&session, DJ, None)),
            "No more members to swap to."
        );
    }

    #[tokio::test]
    async fn playlists_keep_the_requester() {
        let (engine, _, session) = setup().await;
        let info = |title: &str| TrackInfo {
            id: title.to_string(),
            title: title.to_string(),
            uri: format!("https://example.com/{title}"),
            length: std::time::Duration::from_secs(60),
            thumbnail: None,
        };

        let reply = enqueue_result(
            &session,
            USER_ID_2,
            SearchResult::Playlist {
                name: "mix".to_string(),
                tracks: vec![info("a"), info("b"), info("c")],
            },
        )
        .await;

        assert!(reply
            .unwrap()
            .content
            .contains("Added the playlist mix with 3 songs to the queue."));
        assert_eq!(engine.played(), vec!["a".to_string()]);
        assert_eq!(session.current().map(|t| t.requester), Some(USER_ID_2));
        assert_eq!(session.queue_len(), 2);
    }

    #[tokio::test]
    async fn empty_search_is_reported() {
        let (_, _, session) = setup().await;
        let reply = enqueue_result(&session, USER_ID_2, SearchResult::Empty).await;
        assert_eq!(
            reply.unwrap().content,
            "No songs were found with that query. Please try again."
        );
        assert!(!session.is_playing());
    }

    #[tokio::test]
    async fn reactions_dispatch_to_actions() {
        let (_, _, session) = setup().await;
        session.enqueue(track("a", USER_ID_1)).await;

        perform(&session, DJ, ControllerAction::Pause).await.unwrap();
        assert!(session.is_paused());
        perform(&session, DJ, ControllerAction::VolumeDown).await.unwrap();
        assert_eq!(session.volume(), 90);
        let listing = perform(&session, DJ, ControllerAction::Queue).await.unwrap();
        assert!(listing.is_some());
    }
}
