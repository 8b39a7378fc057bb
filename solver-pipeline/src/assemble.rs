//! Context assembly: merges retrieved passages with the recognized problem
//! text into one bounded prompt.
//!
//! Pure and deterministic. All budgeting is in UTF-8 bytes; cuts land on
//! char boundaries.

use knowledge_index::ScoredPassage;

use crate::error::PromptTooLongError;
use crate::prompt::{
    passage_header, KNOWLEDGE_HEADER, NO_CONTEXT_LINE, PROBLEM_HEADER, SOLVE_TEMPLATE,
    TRUNCATION_MARK,
};

/// A generation-ready prompt plus the passages that made it in.
#[derive(Clone, Debug)]
pub struct AssembledPrompt {
    pub prompt: String,
    /// Passages with any of their text in the prompt, best first. The last
    /// entry may appear tail-truncated in the prompt itself.
    pub used: Vec<ScoredPassage>,
}

/// Builds the generation prompt: knowledge block, problem block, solving
/// template, in that order.
///
/// The problem text and the fixed template are reserved up front and are
/// never cut. Passages fill the remaining budget in descending score order;
/// the first passage that does not fit is tail-truncated with a marker and
/// everything below it is dropped. When no passage text fits (or none was
/// retrieved), the knowledge block carries an explicit placeholder line
/// instead.
///
/// The returned prompt never exceeds `max_len` bytes.
///
/// # Errors
/// [`PromptTooLongError`] when the reserved sections alone exceed `max_len`.
pub fn assemble(
    problem_text: &str,
    hits: &[ScoredPassage],
    max_len: usize,
) -> Result<AssembledPrompt, PromptTooLongError> {
    let problem = problem_text.trim();

    // The placeholder line is reserved too, so the fallback always fits.
    let reserved = KNOWLEDGE_HEADER.len()
        + NO_CONTEXT_LINE.len()
        + PROBLEM_HEADER.len()
        + problem.len()
        + SOLVE_TEMPLATE.len();
    if reserved > max_len {
        return Err(PromptTooLongError {
            got: reserved,
            limit: max_len,
        });
    }

    let mut sorted: Vec<&ScoredPassage> = hits.iter().collect();
    sorted.sort_by(|a, b| b.score.total_cmp(&a.score));

    // Once a passage lands, the placeholder is not emitted and its
    // reservation can be spent on passage text.
    let mut remaining = max_len - reserved + NO_CONTEXT_LINE.len();
    let mut block = String::new();
    let mut used = Vec::new();

    for (i, hit) in sorted.iter().enumerate() {
        let header = passage_header(i + 1, &hit.passage.source, hit.score);
        let body = hit.passage.text.trim();

        let Some(after_header) = remaining.checked_sub(header.len()) else {
            break;
        };

        if body.len() + 1 <= after_header {
            block.push_str(&header);
            block.push_str(body);
            block.push('\n');
            remaining = after_header - (body.len() + 1);
            used.push((*hit).clone());
            continue;
        }

        let take = after_header.saturating_sub(TRUNCATION_MARK.len());
        let cut = safe_truncate(body, take);
        if !cut.is_empty() {
            block.push_str(&header);
            block.push_str(cut);
            block.push_str(TRUNCATION_MARK);
            used.push((*hit).clone());
        }
        break;
    }

    let mut prompt = String::with_capacity(reserved + block.len());
    prompt.push_str(KNOWLEDGE_HEADER);
    if block.is_empty() {
        prompt.push_str(NO_CONTEXT_LINE);
    } else {
        prompt.push_str(&block);
    }
    prompt.push_str(PROBLEM_HEADER);
    prompt.push_str(problem);
    prompt.push_str(SOLVE_TEMPLATE);

    debug_assert!(prompt.len() <= max_len);
    Ok(AssembledPrompt { prompt, used })
}

/// Cuts `s` to at most `max` bytes without splitting a char.
fn safe_truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        s
    } else {
        let mut end = max;
        while end > 0 && !s.is_char_boundary(end) {
            end -= 1;
        }
        &s[..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use knowledge_index::Passage;

    fn hit(id: &str, score: f32, text: &str) -> ScoredPassage {
        ScoredPassage {
            score,
            passage: Passage {
                id: id.into(),
                text: text.into(),
                source: format!("{id}.md"),
            },
        }
    }

    const PROBLEM: &str = "求解方程 $x^2-5x+6=0$ 的所有实根。";

    #[test]
    fn identical_inputs_yield_identical_prompts() {
        let hits = vec![hit("a", 0.9, "一元二次方程求根公式"), hit("b", 0.7, "因式分解")];
        let one = assemble(PROBLEM, &hits, 4096).unwrap();
        let two = assemble(PROBLEM, &hits, 4096).unwrap();
        assert_eq!(one.prompt, two.prompt);
        assert_eq!(one.used, two.used);
    }

    #[test]
    fn layout_is_knowledge_then_problem_then_template() {
        let hits = vec![hit("a", 0.9, "求根公式"), hit("b", 0.7, "判别式")];
        let out = assemble(PROBLEM, &hits, 4096).unwrap();

        let knowledge = out.prompt.find("==[1]== a.md").unwrap();
        let second = out.prompt.find("==[2]== b.md").unwrap();
        let problem = out.prompt.find("题目：").unwrap();
        let template = out.prompt.find("请开始解答：").unwrap();
        assert!(knowledge < second && second < problem && problem < template);
        assert!(out.prompt.contains(PROBLEM));
        assert_eq!(out.used.len(), 2);
    }

    #[test]
    fn higher_score_is_listed_first_regardless_of_input_order() {
        let hits = vec![hit("low", 0.2, "低分"), hit("high", 0.95, "高分")];
        let out = assemble(PROBLEM, &hits, 4096).unwrap();
        let high = out.prompt.find("==[1]== high.md").unwrap();
        let low = out.prompt.find("==[2]== low.md").unwrap();
        assert!(high < low);
        assert_eq!(out.used[0].passage.id, "high");
    }

    #[test]
    fn problem_text_is_never_truncated() {
        let long_problem = "题".repeat(500);
        let err = assemble(&long_problem, &[], 300).unwrap_err();
        assert!(err.got > err.limit);
        assert_eq!(err.limit, 300);

        // With a sufficient budget, the full problem is present verbatim.
        let ok = assemble(&long_problem, &[], 4096).unwrap();
        assert!(ok.prompt.contains(&long_problem));
    }

    #[test]
    fn overflow_truncates_lowest_scored_passage_first() {
        let hits = vec![
            hit("a", 0.9, &"甲".repeat(40)),
            hit("b", 0.8, &"乙".repeat(40)),
            hit("c", 0.7, &"丙".repeat(40)),
        ];
        let full = assemble(PROBLEM, &hits, 100_000).unwrap();
        assert_eq!(full.used.len(), 3);
        assert!(!full.prompt.contains(TRUNCATION_MARK));

        // Leave room for the first two passages and part of the third.
        let budget = full.prompt.len() - 60;
        let cut = assemble(PROBLEM, &hits, budget).unwrap();
        assert!(cut.prompt.len() <= budget);
        assert_eq!(cut.used.len(), 3);
        assert!(cut.prompt.contains(TRUNCATION_MARK));
        assert!(cut.prompt.contains(&"甲".repeat(40)));
        assert!(cut.prompt.contains(&"乙".repeat(40)));
        assert!(!cut.prompt.contains(&"丙".repeat(40)));
        // Problem and template survive untouched.
        assert!(cut.prompt.contains(PROBLEM));
        assert!(cut.prompt.contains("请开始解答："));
    }

    #[test]
    fn passages_dropped_entirely_are_not_reported_as_used() {
        let hits = vec![
            hit("a", 0.9, &"甲".repeat(30)),
            hit("b", 0.8, &"乙".repeat(3000)),
            hit("c", 0.7, &"丙".repeat(30)),
        ];
        let only_first = {
            let full = assemble(PROBLEM, &[hits[0].clone()], 100_000).unwrap();
            full.prompt.len()
        };
        // Enough for passage `a` plus a sliver of `b`; `c` never fits.
        let out = assemble(PROBLEM, &hits, only_first + 120).unwrap();
        let ids: Vec<&str> = out.used.iter().map(|h| h.passage.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
        assert!(!out.prompt.contains("c.md"));
    }

    #[test]
    fn empty_retrieval_gets_the_placeholder_line() {
        let out = assemble(PROBLEM, &[], 4096).unwrap();
        assert!(out.prompt.contains(NO_CONTEXT_LINE.trim_end()));
        assert!(out.used.is_empty());
        assert!(out.prompt.contains(PROBLEM));
    }

    #[test]
    fn placeholder_appears_when_no_passage_fits() {
        // A header longer than the placeholder reservation cannot land when
        // the budget admits exactly the reserved sections.
        let hits = vec![hit(
            "chapter-07-multivariable-calculus-exam-notes",
            0.9,
            &"甲".repeat(5000),
        )];
        let tight = assemble(PROBLEM, &[], 4096).unwrap().prompt.len();
        let out = assemble(PROBLEM, &hits, tight).unwrap();
        assert!(out.used.is_empty());
        assert!(out.prompt.contains(NO_CONTEXT_LINE.trim_end()));
        assert!(out.prompt.len() <= tight);
    }

    #[test]
    fn truncation_respects_multibyte_boundaries() {
        // Every char here is 3 bytes in UTF-8; any byte budget will land
        // mid-char unless the cut is boundary-aware.
        let hits = vec![hit("a", 0.9, &"数".repeat(1000))];
        let full = assemble(PROBLEM, &hits, 100_000).unwrap().prompt.len();
        for shrink in 1..8 {
            let out = assemble(PROBLEM, &hits, full - shrink).unwrap();
            assert!(out.prompt.len() <= full - shrink);
        }
    }
}
