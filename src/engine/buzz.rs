//! Missing-vowels buzz round prompts

use rand::Rng;

use crate::episode::VowelGroup;

/// A single prompt in the buzz round
#[derive(Debug, Clone, PartialEq)]
pub struct BuzzPrompt {
    pub connection: String,
    pub answer: String,
    /// Answer with vowels and spaces stripped, re-spaced
    pub prompt: String,
    /// Team currently answering (has buzzed, not yet scored)
    pub answering: Option<usize>,
}

fn strip(answer: &str) -> String {
    answer
        .to_uppercase()
        .chars()
        .filter(|c| !matches!(c, ' ' | 'A' | 'E' | 'I' | 'O' | 'U'))
        .collect()
}

/// Whether `prompt` is the answer with its vowels removed, ignoring spacing
pub fn prompt_matches(prompt: &str, answer: &str) -> bool {
    let given: String = prompt.to_uppercase().chars().filter(|c| *c != ' ').collect();
    !given.is_empty() && given == strip(answer)
}

/// Strip vowels and spaces from `answer` and re-space the remaining letters at
/// random intervals of two to six
pub fn generate_prompt<R: Rng + ?Sized>(answer: &str, rng: &mut R) -> String {
    let letters: Vec<char> = strip(answer).chars().collect();
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < letters.len() {
        let end = (start + rng.random_range(2..=6)).min(letters.len());
        chunks.push(letters[start..end].iter().collect::<String>());
        start = end;
    }

    chunks.join(" ")
}

/// Flatten the episode's groups into the round's prompt queue
pub fn build_prompts<R: Rng + ?Sized>(groups: &[VowelGroup], rng: &mut R) -> Vec<BuzzPrompt> {
    let mut prompts = Vec::new();

    for group in groups {
        for word in &group.words {
            let prompt = match &word.prompt {
                Some(p) if prompt_matches(p, &word.answer) => p.trim().to_uppercase(),
                Some(p) => {
                    tracing::warn!(
                        "Prompt {:?} does not match answer {:?}, generating one",
                        p,
                        word.answer
                    );
                    generate_prompt(&word.answer, rng)
                }
                None => generate_prompt(&word.answer, rng),
            };

            if prompt.is_empty() {
                tracing::warn!("Skipping answer {:?} with no consonants", word.answer);
                continue;
            }

            prompts.push(BuzzPrompt {
                connection: group.connection.clone(),
                answer: word.answer.clone(),
                prompt,
                answering: None,
            });
        }
    }

    prompts
}
