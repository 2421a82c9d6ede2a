//! Vote bookkeeping for the democratic playback controls.

use std::collections::HashSet;

use poise::serenity_prelude as serenity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum VoteAction {
    Pause,
    Resume,
    Skip,
    Shuffle,
    Stop,
}

/// Result of casting a vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    /// A privileged member acted directly.
    Forced,
    /// The requester of the current track skipped it.
    Requester,
    /// The vote reached the quorum.
    Passed,
    Recorded { votes: usize, required: usize },
}

impl VoteOutcome {
    pub fn executes(&self) -> bool {
        !matches!(self, VoteOutcome::Recorded { .. })
    }
}

#[derive(Debug, Default)]
pub struct VoteSets {
    pause: HashSet<serenity::UserId>,
    resume: HashSet<serenity::UserId>,
    skip: HashSet<serenity::UserId>,
    shuffle: HashSet<serenity::UserId>,
    stop: HashSet<serenity::UserId>,
}

impl VoteSets {
    fn set_mut(&mut self, action: VoteAction) -> &mut HashSet<serenity::UserId> {
        match action {
            VoteAction::Pause => &mut self.pause,
            VoteAction::Resume => &mut self.resume,
            VoteAction::Skip => &mut self.skip,
            VoteAction::Shuffle => &mut self.shuffle,
            VoteAction::Stop => &mut self.stop,
        }
    }

    fn set(&self, action: VoteAction) -> &HashSet<serenity::UserId> {
        match action {
            VoteAction::Pause => &self.pause,
            VoteAction::Resume => &self.resume,
            VoteAction::Skip => &self.skip,
            VoteAction::Shuffle => &self.shuffle,
            VoteAction::Stop => &self.stop,
        }
    }

    pub fn count(&self, action: VoteAction) -> usize {
        self.set(action).len()
    }

    pub fn clear(&mut self, action: VoteAction) {
        self.set_mut(action).clear();
    }

    pub fn clear_all(&mut self) {
        self.pause.clear();
        self.resume.clear();
        self.skip.clear();
        self.shuffle.clear();
        self.stop.clear();
    }

    /// Records the vote and returns whether `required` votes are now present. A passed vote
    /// empties the set.
    pub fn cast(&mut self, action: VoteAction, voter: serenity::UserId, required: usize) -> VoteOutcome {
        let set = self.set_mut(action);
        set.insert(voter);
        let votes = set.len();
        if votes >= required {
            set.clear();
            VoteOutcome::Passed
        } else {
            VoteOutcome::Recorded { votes, required }
        }
    }
}

/// Votes needed for `action` with `member_count` members (the bot included) in the voice channel.
pub fn required_votes(action: VoteAction, member_count: usize) -> usize {
    if action == VoteAction::Stop && member_count == 3 {
        return 2;
    }
    (member_count.saturating_sub(1) as f64 / 2.5).ceil() as usize
}

/// Owners, the DJ and members who can kick or manage the guild bypass votes.
pub fn is_privileged(
    owners: &[serenity::UserId],
    dj: serenity::UserId,
    user_id: serenity::UserId,
    permissions: serenity::Permissions,
) -> bool {
    owners.contains(&user_id)
        || dj == user_id
        || permissions.kick_members()
        || permissions.manage_guild()
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;
    use crate::constants::*;

    #[test]
    fn quorum_table() {
        let expected = [(1, 0), (2, 1), (3, 1), (4, 2), (5, 2), (6, 2), (7, 3), (12, 5)];
        for (members, required) in expected {
            assert_eq!(required_votes(VoteAction::Skip, members), required, "{members} members");
        }
        assert_eq!(required_votes(VoteAction::Stop, 3), 2);
        assert_eq!(required_votes(VoteAction::Stop, 4), 2);
        assert_eq!(required_votes(VoteAction::Stop, 2), 1);
    }

    #[test]
    fn vote_passes_exactly_at_quorum() {
        let mut votes = VoteSets::default();
        assert_eq!(
            votes.cast(VoteAction::Skip, USER_ID_1, 2),
            VoteOutcome::Recorded {
                votes: 1,
                required: 2
            }
        );
        // voting twice does not count twice
        assert_eq!(
            votes.cast(VoteAction::Skip, USER_ID_1, 2),
            VoteOutcome::Recorded {
                votes: 1,
                required: 2
            }
        );
        assert_eq!(votes.cast(VoteAction::Skip, USER_ID_2, 2), VoteOutcome::Passed);
        assert_eq!(votes.count(VoteAction::Skip), 0);
    }

    #[test]
    fn sets_are_independent() {
        let mut votes = VoteSets::default();
        for action in VoteAction::iter() {
            votes.cast(action, USER_ID_1, 5);
        }
        votes.clear(VoteAction::Pause);
        assert_eq!(votes.count(VoteAction::Pause), 0);
        assert_eq!(votes.count(VoteAction::Stop), 1);

        votes.clear_all();
        assert!(VoteAction::iter().all(|action| votes.count(action) == 0));
    }

    #[test]
    fn privilege_sources() {
        let none = serenity::Permissions::empty();
        assert!(is_privileged(&[USER_ID_1], USER_ID_2, USER_ID_1, none));
        assert!(is_privileged(&[], USER_ID_2, USER_ID_2, none));
        assert!(is_privileged(&[], USER_ID_2, USER_ID_3, serenity::Permissions::KICK_MEMBERS));
        assert!(is_privileged(&[], USER_ID_2, USER_ID_3, serenity::Permissions::MANAGE_GUILD));
        assert!(is_privileged(&[], USER_ID_2, USER_ID_3, serenity::Permissions::all()));
        assert!(!is_privileged(&[USER_ID_1], USER_ID_2, USER_ID_3, none));
    }
}
