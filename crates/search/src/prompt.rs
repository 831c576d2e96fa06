//! Answer prompts for the downstream LLM.
//!
//! The model call itself lives outside this crate; here we only pick the
//! persona template, lay out the retrieved passages and split paragraph
//! delimited answers.

use crate::result::RetrievedItem;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Marker the streaming templates ask the model to put between paragraphs
pub const PARAGRAPH_DELIMITER: &str = "[NEW_PARAGRAPH]";

/// Images referenced in a prompt at most
const MAX_PROMPT_IMAGES: usize = 3;

const NO_EMOJI: &str = "Do not use emoji in the answer.";

const PARAGRAPH_RULES: &str = "Split the answer into 3 to 5 natural paragraphs that read as one \
coherent spoken reply, each following on from the previous one. End every paragraph with the \
marker `[NEW_PARAGRAPH]`.";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Persona {
    #[default]
    General,
    Psychology,
    Fitness,
    Campus,
    Paper,
}

impl Persona {
    pub const ALL: [Self; 5] = [
        Self::General,
        Self::Psychology,
        Self::Fitness,
        Self::Campus,
        Self::Paper,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Psychology => "psychology",
            Self::Fitness => "fitness",
            Self::Campus => "campus",
            Self::Paper => "paper",
        }
    }

    const fn voice(self) -> &'static str {
        match self {
            Self::General => "You are a knowledge assistant.",
            Self::Psychology => {
                "You are a professional mental health assistant. Answer in a warm, empathetic \
                 voice, e.g. \"I hear what you are going through, and I know it is hard right now.\""
            }
            Self::Fitness => {
                "You are a professional fitness and nutrition assistant. Answer like an experienced \
                 coach, e.g. \"You should follow this training plan\" or \"This meal table helps \
                 you build muscle.\""
            }
            Self::Campus => {
                "You are a campus knowledge assistant. Answer like a friendly senior student, \
                 e.g. \"Our gym is...\" or \"At our school the GPA is calculated...\""
            }
            Self::Paper => {
                "You are a professional academic writing assistant. Answer like a rigorous \
                 advisor, e.g. \"Your paper should be formatted...\" or \"You can search the \
                 literature of this field through...\""
            }
        }
    }

    /// Domain used when the question falls outside the passages
    const fn fallback(self) -> Option<&'static str> {
        match self {
            Self::General => None,
            Self::Psychology => Some("mental health"),
            Self::Fitness => Some("healthy living"),
            Self::Campus => Some("student services"),
            Self::Paper => Some("academic research"),
        }
    }

    /// Template for a single, non-streamed answer
    #[must_use]
    pub fn system_prompt(self) -> String {
        match self {
            Self::General => format!(
                "{} Give an accurate, concise answer to the user's question from the passages \
                 below. {NO_EMOJI}",
                self.voice()
            ),
            _ => format!("{} {}", self.voice(), self.principles()),
        }
    }

    /// Template for answers delivered paragraph by paragraph
    #[must_use]
    pub fn stream_system_prompt(self) -> String {
        match self {
            Self::General => format!(
                "{} Keep the reply short and conversational. {PARAGRAPH_RULES} {NO_EMOJI} \
                 Stay under 100 words.",
                self.voice()
            ),
            _ => format!("{} {PARAGRAPH_RULES} {}", self.voice(), self.principles()),
        }
    }

    fn principles(self) -> String {
        let fallback = self.fallback().unwrap_or("general");
        format!(
            "Follow these principles: answer from the background knowledge first; do not invent \
             facts; if the question is unrelated to the background knowledge, answer from a \
             {fallback} perspective using general knowledge. {NO_EMOJI}"
        )
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Persona {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "general" | "default" => Ok(Self::General),
            "psychology" => Ok(Self::Psychology),
            "fitness" => Ok(Self::Fitness),
            "campus" => Ok(Self::Campus),
            "paper" => Ok(Self::Paper),
            other => Err(format!("unknown persona '{other}'")),
        }
    }
}

/// A fully laid out prompt ready to send to the answering model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerPrompt {
    pub persona: Persona,
    pub streaming: bool,
    pub text: String,
}

impl AnswerPrompt {
    pub fn build<S: AsRef<str>>(
        persona: Persona,
        query: &str,
        passages: &[S],
        streaming: bool,
    ) -> Self {
        let joined = passages
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join("\n\n");

        let text = if streaming {
            format!(
                "{}\n\nAnswer the user's question concisely using the background knowledge below.\
                 \n\nUser question: {query}\n\nBackground knowledge:\n{joined}\n\nIf the question \
                 is unrelated to the background knowledge, answer from general knowledge. Remember \
                 to separate the answer into 3 to 5 paragraphs with `{PARAGRAPH_DELIMITER}`.\
                 \n\nBegin your answer:\n",
                persona.stream_system_prompt()
            )
        } else {
            format!(
                "{}\n\nUser question: {query}\n\nRelevant passages:\n{joined}\n\nAnswer from the \
                 passages above. Do not invent information and do not use emoji.",
                persona.system_prompt()
            )
        };

        Self {
            persona,
            streaming,
            text,
        }
    }
}

/// Passages for [`AnswerPrompt::build`]: text chunks as they are, followed
/// by an instruction and a short list of the first image results.
#[must_use]
pub fn passages_from(items: &[RetrievedItem]) -> Vec<String> {
    let mut passages: Vec<String> = items
        .iter()
        .filter(|item| !item.is_image())
        .map(|item| item.document.clone())
        .collect();

    let images: Vec<&RetrievedItem> = items
        .iter()
        .filter(|item| item.is_image())
        .take(MAX_PROMPT_IMAGES)
        .collect();
    if images.is_empty() {
        return passages;
    }

    passages.push(
        "Note: when the answer refers to an image, cite the image path directly as [path]."
            .to_string(),
    );
    let mut summary = String::from("Available images:\n");
    for (idx, image) in images.iter().enumerate() {
        summary.push_str(&format!(
            "{}. {} [path: {}]\n",
            idx + 1,
            image.document,
            image.source
        ));
    }
    passages.push(summary);
    passages
}

/// Paragraphs of a delimited answer, trimmed, blanks dropped
#[must_use]
pub fn split_paragraphs(answer: &str) -> Vec<String> {
    answer
        .split(PARAGRAPH_DELIMITER)
        .map(str::trim)
        .filter(|paragraph| !paragraph.is_empty())
        .map(ToString::to_string)
        .collect()
}
