use super::actions::Hieroglyph;
use crate::error::{EngineError, EngineResult};

/// Tracks which questions of a round are still on the board.
///
/// Selector `n` maps to question `n` of the bank. Once picked a selector is
/// gone for the rest of the round.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionBank {
    slots: Vec<(Hieroglyph, bool)>,
}

impl QuestionBank {
    /// One selector per question, taken from `selectors` in order
    pub fn new(selectors: &[Hieroglyph], questions: usize) -> Self {
        Self {
            slots: selectors
                .iter()
                .take(questions)
                .map(|glyph| (*glyph, false))
                .collect(),
        }
    }

    pub fn empty() -> Self {
        Self { slots: Vec::new() }
    }

    /// Selectors not yet picked, in board order
    pub fn available(&self) -> Vec<Hieroglyph> {
        self.slots
            .iter()
            .filter(|(_, used)| !used)
            .map(|(glyph, _)| *glyph)
            .collect()
    }

    pub fn is_available(&self, glyph: Hieroglyph) -> bool {
        self.slots.iter().any(|(g, used)| *g == glyph && !used)
    }

    pub fn is_exhausted(&self) -> bool {
        self.slots.iter().all(|(_, used)| *used)
    }

    /// Mark a selector as used and return its question index
    pub fn pick(&mut self, glyph: Hieroglyph) -> EngineResult<usize> {
        let index = self
            .slots
            .iter()
            .position(|(g, used)| *g == glyph && !used)
            .ok_or_else(|| EngineError::invalid(glyph.action(), "that question is not on the board"))?;
        self.slots[index].1 = true;
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bank_limits_selectors_to_question_count() {
        let bank = QuestionBank::new(&Hieroglyph::ALL, 3);
        assert_eq!(
            bank.available(),
            vec![Hieroglyph::TwoReeds, Hieroglyph::Lion, Hieroglyph::TwistedFlax]
        );
    }

    #[test]
    fn test_pick_removes_selector() {
        let mut bank = QuestionBank::new(&Hieroglyph::WALLS, 2);
        assert_eq!(bank.pick(Hieroglyph::Water).unwrap(), 1);
        assert!(!bank.is_available(Hieroglyph::Water));
        assert!(bank.pick(Hieroglyph::Water).is_err());
        assert!(!bank.is_exhausted());

        assert_eq!(bank.pick(Hieroglyph::Lion).unwrap(), 0);
        assert!(bank.is_exhausted());
    }

    #[test]
    fn test_empty_bank_is_exhausted() {
        assert!(QuestionBank::empty().is_exhausted());
        assert!(QuestionBank::new(&Hieroglyph::ALL, 0).is_exhausted());
    }
}
