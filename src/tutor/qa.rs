//! Q&A pair extraction from LLM output.

use crate::models::QaPair;

/// Pair served when the model's answer contains nothing parseable.
pub fn fallback_pair() -> QaPair {
    QaPair::new("What is this video about?", "Ask me to find out!")
}

/// Parse `Q: ...` / `A: ...` lines into pairs.
///
/// A question and its answer may share a line or sit on consecutive lines. Markers
/// count only at the start of a line, after any list numbering or markdown emphasis,
/// so "FAQ:" or a "Q:" inside a sentence is ordinary text. An answer without a
/// pending question is dropped.
pub fn parse_qa_pairs(text: &str) -> Vec<QaPair> {
    let mut pairs = Vec::new();
    let mut question: Option<String> = None;

    for line in text.lines() {
        let line = strip_markup(line);

        if let Some(after_q) = line.strip_prefix("Q:") {
            match find_answer_marker(after_q) {
                Some(a_pos) => {
                    let q = clean(&after_q[..a_pos]);
                    let a = clean(&after_q[a_pos + 2..]);
                    if !q.is_empty() && !a.is_empty() {
                        pairs.push(QaPair::new(q, a));
                    }
                    question = None;
                }
                None => {
                    let q = clean(after_q);
                    question = (!q.is_empty()).then_some(q);
                }
            }
        } else if let Some(after_a) = line.strip_prefix("A:") {
            if let Some(q) = question.take() {
                let a = clean(after_a);
                if !a.is_empty() {
                    pairs.push(QaPair::new(q, a));
                }
            }
        }
    }

    pairs
}

/// Drop leading whitespace, bullets, emphasis and `1.` / `1)` numbering.
fn strip_markup(line: &str) -> &str {
    let is_markup = |c: char| c.is_whitespace() || matches!(c, '-' | '*' | '_' | '#' | '>' | '•');

    let line = line.trim_start_matches(is_markup);
    let unnumbered = line.trim_start_matches(|c: char| c.is_ascii_digit());
    let line = match unnumbered.strip_prefix(['.', ')']) {
        Some(rest) if unnumbered.len() < line.len() => rest,
        _ => line,
    };
    line.trim_start_matches(is_markup)
}

/// Position of an `A:` that starts a word, for pairs written on one line.
fn find_answer_marker(text: &str) -> Option<usize> {
    text.match_indices("A:").map(|(i, _)| i).find(|&i| {
        text[..i]
            .chars()
            .next_back()
            .map_or(true, |c| c.is_whitespace() || c == '*' || c == '_')
    })
}

fn clean(s: &str) -> String {
    s.trim_matches(|c: char| c.is_whitespace() || c == '*' || c == '_')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_two_line_pairs() {
        let text = "Here are some questions:\n\n\
            1. Q: What is the main topic?\n   A: Learning Spanish.\n\n\
            **Q:** Who is speaking?\n**A:** A teacher.\n";

        assert_eq!(
            parse_qa_pairs(text),
            vec![
                QaPair::new("What is the main topic?", "Learning Spanish."),
                QaPair::new("Who is speaking?", "A teacher."),
            ]
        );
    }

    #[test]
    fn test_parse_single_line_pair() {
        assert_eq!(
            parse_qa_pairs("Q: Why? A: Because."),
            vec![QaPair::new("Why?", "Because.")]
        );
    }

    #[test]
    fn test_orphan_answer_and_unanswered_question() {
        assert!(parse_qa_pairs("A: an answer with no question\nQ: left hanging").is_empty());
        assert!(parse_qa_pairs("No structured output at all.").is_empty());
    }

    #[test]
    fn test_markers_only_count_at_line_start() {
        let text = "FAQ: common questions about the video
            Remember the Q: prefix below.
            - Q: What does USA: stand for? A: United States of America.
            2) **Q:** Where is the speaker?
            The speaker says A: nothing here.
            A: In Madrid.
";

        assert_eq!(
            parse_qa_pairs(text),
            vec![
                QaPair::new("What does USA: stand for?", "United States of America."),
                QaPair::new("Where is the speaker?", "In Madrid."),
            ]
        );
    }
}
