//! Moderator turn filtering.
//!
//! Interview transcripts interleave moderator questions with respondent
//! answers. Only respondent speech may be quoted, so moderator turns are
//! dropped before segmentation.

use regex::Regex;
use std::sync::LazyLock;

/// Optional leading `[00:01:02]`-style marker before a speaker label.
const MARKER: &str = r"^\s*(?:\[[^\]]*\]\s*)?";

static MODERATOR_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i){MARKER}(?:interviewer|moderator|i|q)\s*\d*\s*:"))
        .expect("moderator label pattern is valid")
});

static RESPONDENT_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i){MARKER}(?:respondent|participant|patient|r)\s*\d*\s*:"))
        .expect("respondent label pattern is valid")
});

/// Any other title-cased `Name:` / `Dr. Smith:` / `Charge Nurse:` label.
static NAMED_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"{MARKER}(?P<name>[A-Z][\w.'-]*(?:\s+[A-Z][\w.'-]*){{0,3}})\s*:"
    ))
    .expect("named label pattern is valid")
});

/// Words that open a sentence or an aside, never a speaker name.
const NON_SPEAKER_WORDS: &[&str] = &[
    "also", "and", "background", "but", "context", "e.g.", "example", "follow-up",
    "followup", "for", "i.e.", "note", "ps", "question", "so", "summary", "then", "topic",
];

fn is_named_speaker(line: &str) -> bool {
    NAMED_LABEL
        .captures(line)
        .and_then(|caps| caps.name("name"))
        .is_some_and(|name| {
            !name
                .as_str()
                .split_whitespace()
                .any(|word| NON_SPEAKER_WORDS.contains(&word.to_lowercase().as_str()))
        })
}

/// Which kind of speaker label, if any, starts a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeakerTurn {
    Moderator,
    Respondent,
    Unlabeled,
}

/// Classify a single line by its speaker prefix.
pub fn classify_line(line: &str) -> SpeakerTurn {
    if MODERATOR_LABEL.is_match(line) {
        SpeakerTurn::Moderator
    } else if RESPONDENT_LABEL.is_match(line) || is_named_speaker(line) {
        SpeakerTurn::Respondent
    } else {
        SpeakerTurn::Unlabeled
    }
}

/// Remove moderator turns from a transcript.
///
/// A moderator label starts a drop-zone that lasts until the next
/// respondent or named label. Unlabeled lines inherit the current zone;
/// lines before any label are kept.
pub fn filter_moderator_turns(text: &str) -> String {
    let mut in_moderator_turn = false;
    let mut kept = Vec::new();

    for line in text.lines() {
        match classify_line(line) {
            SpeakerTurn::Moderator => {
                in_moderator_turn = true;
            }
            SpeakerTurn::Respondent => {
                in_moderator_turn = false;
                kept.push(line);
            }
            SpeakerTurn::Unlabeled => {
                if !in_moderator_turn {
                    kept.push(line);
                }
            }
        }
    }

    kept.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_labels() {
        assert_eq!(classify_line("Interviewer: hello"), SpeakerTurn::Moderator);
        assert_eq!(classify_line("MODERATOR: hello"), SpeakerTurn::Moderator);
        assert_eq!(classify_line("Q: what do you do?"), SpeakerTurn::Moderator);
        assert_eq!(classify_line("I: tell me more"), SpeakerTurn::Moderator);
        assert_eq!(classify_line("[00:01:05] Interviewer: ok"), SpeakerTurn::Moderator);
        assert_eq!(classify_line("Respondent: I work nights"), SpeakerTurn::Respondent);
        assert_eq!(classify_line("R: yes"), SpeakerTurn::Respondent);
        assert_eq!(classify_line("Patient: it hurts"), SpeakerTurn::Respondent);
        assert_eq!(classify_line("Dr. Smith: we titrate"), SpeakerTurn::Respondent);
        assert_eq!(classify_line("Charge Nurse: twelve beds"), SpeakerTurn::Respondent);
        assert_eq!(classify_line("and then we left"), SpeakerTurn::Unlabeled);
    }

    #[test]
    fn test_i_think_is_not_a_moderator_label() {
        assert_ne!(classify_line("I think: it depends"), SpeakerTurn::Moderator);
    }

    #[test]
    fn test_sentence_openers_are_not_speaker_labels() {
        assert_eq!(classify_line("For example: do you titrate?"), SpeakerTurn::Unlabeled);
        assert_eq!(classify_line("Follow-up question: how often?"), SpeakerTurn::Unlabeled);
        assert_eq!(classify_line("Note: recorder paused"), SpeakerTurn::Unlabeled);
        assert_eq!(classify_line("Nurse Okafor: twelve beds"), SpeakerTurn::Respondent);
    }

    #[test]
    fn test_moderator_aside_stays_in_drop_zone() {
        let text = "Interviewer: Let's talk about pain control.\n\
                    For example: do you use morphine pumps?\n\
                    Respondent: We mostly use blocks.";

        assert_eq!(filter_moderator_turns(text), "Respondent: We mostly use blocks.");
    }

    #[test]
    fn test_filter_drops_moderator_turns() {
        let text = "Interview 12, recorded on site\n\
                    Interviewer: What is your role?\n\
                    Could you say more?\n\
                    Respondent: I am a nurse in the ER.\n\
                    Mostly nights.\n\
                    Q: How long?\n\
                    R: Six years.";

        let filtered = filter_moderator_turns(text);
        assert_eq!(
            filtered,
            "Interview 12, recorded on site\n\
             Respondent: I am a nurse in the ER.\n\
             Mostly nights.\n\
             R: Six years."
        );
    }

    #[test]
    fn test_unlabeled_text_passes_through() {
        let text = "no labels at all\njust prose";
        assert_eq!(filter_moderator_turns(text), text);
    }
}
