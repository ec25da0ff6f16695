use crate::error::{EngineError, EngineResult};
use crate::types::{Team, TeamId};

/// Teams in play order and their running scores
#[derive(Debug, Clone, PartialEq)]
pub struct Ledger {
    teams: Vec<Team>,
}

impl Ledger {
    pub fn new(names: &[String]) -> Self {
        Self {
            teams: names.iter().map(|n| Team::new(n.trim())).collect(),
        }
    }

    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    pub fn len(&self) -> usize {
        self.teams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }

    pub fn team(&self, index: usize) -> EngineResult<&Team> {
        self.teams
            .get(index)
            .ok_or_else(|| EngineError::UnknownTeam(format!("#{}", index + 1)))
    }

    pub fn team_mut(&mut self, index: usize) -> EngineResult<&mut Team> {
        self.teams
            .get_mut(index)
            .ok_or_else(|| EngineError::UnknownTeam(format!("#{}", index + 1)))
    }

    pub fn index_of(&self, id: &TeamId) -> EngineResult<usize> {
        self.teams
            .iter()
            .position(|t| &t.id == id)
            .ok_or_else(|| EngineError::UnknownTeam(id.clone()))
    }

    pub fn award(&mut self, index: usize, points: i32) -> EngineResult<()> {
        let team = self.team_mut(index)?;
        team.score += points;
        tracing::debug!("{} +{} (now {})", team.name, points, team.score);
        Ok(())
    }

    pub fn clear_votes(&mut self) {
        for team in &mut self.teams {
            team.vote = None;
        }
    }

    pub fn clear_buzzes(&mut self) {
        for team in &mut self.teams {
            team.buzzed = false;
        }
    }

    /// Team to play first on the wall: the first team, unless the second leads
    pub fn wall_starter(&self) -> usize {
        match (self.teams.first(), self.teams.get(1)) {
            (Some(first), Some(second)) if second.score > first.score => 1,
            _ => 0,
        }
    }
}
