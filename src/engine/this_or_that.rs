use std::collections::BTreeSet;

use super::actions::Action;
use super::audience::AudienceAggregate;
use super::ledger::Ledger;
use crate::episode::{ThisOrThatEpisode, ThisOrThatQuestion};
use crate::error::{EngineError, EngineResult};
use crate::types::Answer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    PreGame,
    /// Votes are open on this question
    Question(usize),
    /// The answer to this question is showing
    Answer(usize),
    PostGame,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::PreGame => "pre-game",
            Stage::Question(_) => "question",
            Stage::Answer(_) => "answer",
            Stage::PostGame => "post-game",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ThisOrThatGame {
    content: ThisOrThatEpisode,
    stage: Stage,
}

impl ThisOrThatGame {
    pub fn new(content: ThisOrThatEpisode) -> Self {
        Self {
            content,
            stage: Stage::PreGame,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn content(&self) -> &ThisOrThatEpisode {
        &self.content
    }

    /// Question on screen, with its index
    pub fn current(&self) -> Option<(usize, &ThisOrThatQuestion)> {
        match self.stage {
            Stage::Question(i) | Stage::Answer(i) => self.content.questions.get(i).map(|q| (i, q)),
            _ => None,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.stage, Stage::Question(_))
    }

    pub fn is_revealed(&self) -> bool {
        matches!(self.stage, Stage::Answer(_))
    }

    pub fn legal_actions(&self) -> BTreeSet<Action> {
        let action = match self.stage {
            Stage::PreGame => Some(Action::StartGame),
            Stage::Question(_) => Some(Action::RevealAnswer),
            Stage::Answer(_) => Some(Action::NextQuestion),
            Stage::PostGame => None,
        };
        action.into_iter().collect()
    }

    pub fn start(&mut self, ledger: &mut Ledger, audience: Option<&mut AudienceAggregate>) -> EngineResult<()> {
        if self.stage != Stage::PreGame {
            return Err(EngineError::invalid(Action::StartGame, "the game has already started"));
        }
        self.open(0, ledger, audience);
        Ok(())
    }

    pub fn next_question(
        &mut self,
        ledger: &mut Ledger,
        audience: Option<&mut AudienceAggregate>,
    ) -> EngineResult<()> {
        let Stage::Answer(index) = self.stage else {
            return Err(EngineError::invalid(Action::NextQuestion, self.stage.name()));
        };
        self.open(index + 1, ledger, audience);
        Ok(())
    }

    fn open(&mut self, index: usize, ledger: &mut Ledger, audience: Option<&mut AudienceAggregate>) {
        if index >= self.content.questions.len() {
            self.stage = Stage::PostGame;
            tracing::info!("This or That finished after {} question(s)", index);
            return;
        }

        ledger.clear_votes();
        if let Some(audience) = audience {
            audience.reset();
        }
        self.stage = Stage::Question(index);
        tracing::info!("Moved to question {}", index + 1);
    }

    /// Score team votes and the audience, then show the answer
    pub fn reveal_answer(
        &mut self,
        ledger: &mut Ledger,
        audience: Option<&mut AudienceAggregate>,
    ) -> EngineResult<()> {
        let Stage::Question(index) = self.stage else {
            return Err(EngineError::invalid(Action::RevealAnswer, self.stage.name()));
        };
        let correct = self
            .content
            .questions
            .get(index)
            .map(|q| q.answer())
            .unwrap_or(Answer::Neither);

        let winners: Vec<usize> = ledger
            .teams()
            .iter()
            .enumerate()
            .filter(|(_, t)| t.vote == Some(correct))
            .map(|(i, _)| i)
            .collect();
        for index in winners {
            ledger.award(index, 1)?;
        }

        if let Some(audience) = audience {
            let share = audience.resolve(correct);
            tracing::debug!("Audience earned {:.3} on question {}", share, index + 1);
        }

        self.stage = Stage::Answer(index);
        Ok(())
    }

    pub fn skip_to_end(&mut self) {
        self.stage = Stage::PostGame;
    }
}
