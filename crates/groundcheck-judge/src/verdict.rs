use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Classification the judge model may assign to an answer.
///
/// Deliberately narrower than [`VerdictLabel`]: the judge can never
/// produce `MAX_CYCLES`, only the loop controller records it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JudgeLabel {
    /// Every claim is entailed by the passages and the query is fully
    /// addressed.
    Correct,
    /// At least one claim is not entailed by, or contradicts, the
    /// passages.
    Hallucination,
    /// All claims are entailed but the query is only partially
    /// addressed.
    Incomplete,
}

impl JudgeLabel {
    const ALL: [JudgeLabel; 3] = [
        JudgeLabel::Correct,
        JudgeLabel::Hallucination,
        JudgeLabel::Incomplete,
    ];

    fn token(self) -> &'static str {
        match self {
            JudgeLabel::Correct => "CORRECT",
            JudgeLabel::Hallucination => "HALLUCINATION",
            JudgeLabel::Incomplete => "INCOMPLETE",
        }
    }
}

impl std::fmt::Display for JudgeLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.token())
    }
}

/// Label recorded on a turn's verdicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerdictLabel {
    Correct,
    Hallucination,
    Incomplete,
    /// Terminal label when the cycle budget ran out without a CORRECT
    /// verdict. A normal end state, not a failure.
    MaxCycles,
}

impl From<JudgeLabel> for VerdictLabel {
    fn from(label: JudgeLabel) -> Self {
        match label {
            JudgeLabel::Correct => VerdictLabel::Correct,
            JudgeLabel::Hallucination => VerdictLabel::Hallucination,
            JudgeLabel::Incomplete => VerdictLabel::Incomplete,
        }
    }
}

impl std::fmt::Display for VerdictLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let token = match self {
            VerdictLabel::Correct => "CORRECT",
            VerdictLabel::Hallucination => "HALLUCINATION",
            VerdictLabel::Incomplete => "INCOMPLETE",
            VerdictLabel::MaxCycles => "MAX_CYCLES",
        };
        f.write_str(token)
    }
}

/// What the judge model said about one answer, before the controller
/// assigns a cycle number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JudgeVerdict {
    pub label: JudgeLabel,
    pub rationale: String,
}

/// A recorded verdict for one cycle of a turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub label: VerdictLabel,
    pub rationale: String,
    pub cycle: usize,
}

#[derive(Error, Debug)]
pub enum VerdictParseError {
    #[error("No verdict label found in judge output")]
    NoLabelFound,

    #[error("Ambiguous verdict: multiple labels found in judge output")]
    AmbiguousLabel,
}

impl JudgeVerdict {
    /// Parse the judge model's raw output.
    ///
    /// Expected format:
    /// ```text
    /// LABEL: HALLUCINATION
    /// RATIONALE: The answer cites a 90-day window; the passages say 30 days.
    /// ```
    ///
    /// Judge models echo the format inconsistently, so parsing is
    /// two-stage: when a `LABEL:` marker exists the word after the last
    /// one must be a label token, otherwise the output must contain
    /// exactly one label token as a whole word. Anything else is an
    /// error the caller maps to a judge failure. Labels match whole
    /// words only, so "INCORRECT" never reads as CORRECT.
    pub fn parse(output: &str) -> Result<Self, VerdictParseError> {
        debug!(output_len = output.len(), "Parsing judge verdict");

        let label = match rfind_ignore_ascii_case(output, "LABEL:") {
            Some(pos) => Self::label_after_marker(&output[pos + "LABEL:".len()..])?,
            None => Self::unique_label(output)?,
        };

        Ok(Self {
            label,
            rationale: Self::extract_rationale(output, label),
        })
    }

    /// Label named directly after a `LABEL:` marker. The marker binds:
    /// an unrecognized word after it is an error, never a fallthrough
    /// to the whole-output scan.
    fn label_after_marker(after: &str) -> Result<JudgeLabel, VerdictParseError> {
        let first_word = Self::words(after)
            .next()
            .ok_or(VerdictParseError::NoLabelFound)?;
        JudgeLabel::ALL
            .into_iter()
            .find(|l| l.token().eq_ignore_ascii_case(first_word))
            .ok_or(VerdictParseError::NoLabelFound)
    }

    /// The single label token present as a whole word, erroring on
    /// zero or more than one distinct label.
    fn unique_label(output: &str) -> Result<JudgeLabel, VerdictParseError> {
        let mut found: Option<JudgeLabel> = None;
        for word in Self::words(output) {
            let Some(label) = JudgeLabel::ALL
                .into_iter()
                .find(|l| l.token().eq_ignore_ascii_case(word))
            else {
                continue;
            };
            match found {
                Some(existing) if existing != label => {
                    return Err(VerdictParseError::AmbiguousLabel)
                }
                _ => found = Some(label),
            }
        }
        found.ok_or(VerdictParseError::NoLabelFound)
    }

    fn words(output: &str) -> impl Iterator<Item = &str> {
        output
            .split(|c: char| !c.is_ascii_alphanumeric() && c != '_')
            .filter(|w| !w.is_empty())
    }

    fn extract_rationale(output: &str, label: JudgeLabel) -> String {
        if let Some(pos) = find_ignore_ascii_case(output, "RATIONALE:") {
            return output[pos + "RATIONALE:".len()..].trim().to_string();
        }
        // No marker: drop the label token itself and keep whatever
        // explanation surrounds it.
        let rest: String = match find_word_ignore_ascii_case(output, label.token()) {
            Some(pos) => {
                let end = pos + label.token().len();
                format!("{}{}", &output[..pos], &output[end..])
            }
            None => output.to_string(),
        };
        rest.trim().trim_start_matches(':').trim().to_string()
    }
}

/// ASCII-case-insensitive substring search. Byte offsets stay valid in
/// the original string, unlike searching an uppercased copy.
fn find_ignore_ascii_case(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|w| w.eq_ignore_ascii_case(needle.as_bytes()))
}

fn rfind_ignore_ascii_case(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .as_bytes()
        .windows(needle.len())
        .rposition(|w| w.eq_ignore_ascii_case(needle.as_bytes()))
}

/// Like [`find_ignore_ascii_case`] but only at word boundaries. The
/// needle is ASCII, so a match position is always a char boundary.
fn find_word_ignore_ascii_case(haystack: &str, needle: &str) -> Option<usize> {
    let bytes = haystack.as_bytes();
    let needle = needle.as_bytes();
    if needle.is_empty() || bytes.len() < needle.len() {
        return None;
    }
    let is_word_byte = |b: u8| b.is_ascii_alphanumeric() || b == b'_';
    (0..=bytes.len() - needle.len()).find(|&pos| {
        bytes[pos..pos + needle.len()].eq_ignore_ascii_case(needle)
            && (pos == 0 || !is_word_byte(bytes[pos - 1]))
            && (pos + needle.len() == bytes.len() || !is_word_byte(bytes[pos + needle.len()]))
    })
}
