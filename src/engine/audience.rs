use std::collections::{BTreeMap, BTreeSet};

use crate::types::{Answer, SessionId};

/// Passive audience votes for the open prompt, plus the audience's running score
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AudienceAggregate {
    members: BTreeSet<SessionId>,
    votes: BTreeMap<SessionId, Answer>,
    score: f64,
}

impl AudienceAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn join(&mut self, session: &SessionId) {
        self.members.insert(session.clone());
    }

    /// Forget a member and any vote it has pending
    pub fn leave(&mut self, session: &SessionId) {
        self.members.remove(session);
        self.votes.remove(session);
    }

    /// Record a vote, replacing any earlier one from the same session
    pub fn vote(&mut self, session: &SessionId, answer: Answer) {
        self.members.insert(session.clone());
        self.votes.insert(session.clone(), answer);
    }

    pub fn reset(&mut self) {
        self.votes.clear();
    }

    /// Votes per option; options nobody picked are absent
    pub fn tally(&self) -> BTreeMap<Answer, u32> {
        let mut tally = BTreeMap::new();
        for answer in self.votes.values() {
            *tally.entry(*answer).or_insert(0) += 1;
        }
        tally
    }

    pub fn voted(&self) -> usize {
        self.votes.len()
    }

    pub fn count(&self) -> usize {
        self.members.len()
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    /// Add the share of votes matching `correct` to the score and clear the tally.
    /// Returns the share added (zero when nobody voted).
    pub fn resolve(&mut self, correct: Answer) -> f64 {
        if self.votes.is_empty() {
            return 0.0;
        }

        let matching = self.votes.values().filter(|v| **v == correct).count();
        let share = matching as f64 / self.votes.len() as f64;
        self.score += share;
        self.votes.clear();
        share
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(n: usize) -> SessionId {
        format!("s{}", n)
    }

    #[test]
    fn test_last_vote_wins() {
        let mut audience = AudienceAggregate::new();
        audience.vote(&session(1), Answer::This);
        audience.vote(&session(1), Answer::That);

        assert_eq!(audience.voted(), 1);
        assert_eq!(audience.tally().get(&Answer::That), Some(&1));
        assert_eq!(audience.tally().get(&Answer::This), None);
    }

    #[test]
    fn test_resolve_adds_share_and_resets() {
        let mut audience = AudienceAggregate::new();
        for n in 0..100 {
            let answer = if n < 60 { Answer::This } else { Answer::That };
            audience.vote(&session(n), answer);
        }

        let share = audience.resolve(Answer::This);
        assert!((share - 0.6).abs() < 1e-9);
        assert!((audience.score() - 0.6).abs() < 1e-9);
        assert_eq!(audience.voted(), 0);
        assert_eq!(audience.count(), 100);
    }

    #[test]
    fn test_resolve_without_votes_is_noop() {
        let mut audience = AudienceAggregate::new();
        audience.join(&session(1));
        assert_eq!(audience.resolve(Answer::Both), 0.0);
        assert_eq!(audience.score(), 0.0);
    }

    #[test]
    fn test_leave_drops_pending_vote() {
        let mut audience = AudienceAggregate::new();
        audience.vote(&session(1), Answer::Neither);
        audience.vote(&session(2), Answer::Neither);
        audience.leave(&session(1));

        assert_eq!(audience.count(), 1);
        assert_eq!(audience.voted(), 1);
    }
}
