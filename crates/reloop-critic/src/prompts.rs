use crate::Critique;

/// Prompt templates for the critique and improvement steps
pub struct CritiquePrompts;

impl CritiquePrompts {
    /// Build the critique prompt for a candidate answer
    pub fn build_critique_prompt(
        task: &str,
        answer: &str,
        criteria: &[String],
        iteration: usize,
    ) -> String {
        let criteria_list = criteria
            .iter()
            .map(|c| format!("- {}", c))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            r#"You are a rigorous critic. Evaluate the candidate answer against the original task.

## Original Task
{task}

## Candidate Answer
{answer}

## Evaluation Criteria
{criteria}

## Context
This is refinement iteration {iteration}.

---

Judge the answer on each criterion. Be specific: vague praise or vague complaints are useless to the next revision.

End your response with a critique block:

<critique>
{{"quality_score": 7.5, "strengths": ["..."], "weaknesses": ["..."], "improvement_suggestions": ["..."], "specific_issues": {{"criterion": "note"}}, "reasoning": "..."}}
</critique>

Rules for the block:
- quality_score is a number from 1.0 (unusable) to 10.0 (nothing left to improve).
- specific_issues maps each criterion with a problem to a short note; omit criteria with no issues.
- improvement_suggestions must be concrete edits, not restatements of the weaknesses."#,
            task = task,
            answer = truncate_text(answer, 20000),
            criteria = criteria_list,
            iteration = iteration,
        )
    }

    /// Build the improvement prompt from a critique of the current answer
    pub fn build_improvement_prompt(
        task: &str,
        answer: &str,
        critique: &Critique,
        focus_on: Option<&[String]>,
    ) -> String {
        let weaknesses = bullet_list(&critique.weaknesses, "(none listed)");
        let suggestions = bullet_list(&critique.improvement_suggestions, "(none listed)");

        let issues = if critique.specific_issues.is_empty() {
            "(none listed)".to_string()
        } else {
            critique
                .specific_issues
                .iter()
                .map(|(criterion, note)| format!("- {}: {}", criterion, note))
                .collect::<Vec<_>>()
                .join("\n")
        };

        let focus_instruction = match focus_on {
            Some(focus) if !focus.is_empty() => format!(
                "\n## Focus\nPrioritize improving: {}. Other aspects matter less this pass.\n",
                focus.join(", ")
            ),
            _ => String::new(),
        };

        format!(
            r#"Revise the answer below to address the critique.

## Original Task
{task}

## Current Answer
{answer}

## Weaknesses
{weaknesses}

## Suggested Improvements
{suggestions}

## Specific Issues
{issues}
{focus}
Produce the full improved answer. Keep what already works; fix what the critique flags. Output only the revised answer, with no preamble or commentary."#,
            task = task,
            answer = truncate_text(answer, 20000),
            weaknesses = weaknesses,
            suggestions = suggestions,
            issues = issues,
            focus = focus_instruction,
        )
    }
}

fn bullet_list(items: &[String], empty: &str) -> String {
    if items.is_empty() {
        empty.to_string()
    } else {
        items
            .iter()
            .map(|item| format!("- {}", item))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn truncate_text(text: &str, max_len: usize) -> &str {
    if text.len() <= max_len {
        return text;
    }
    let mut cut = max_len;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    // Try to truncate at a line boundary
    match text[..cut].rfind('\n') {
        Some(pos) => &text[..pos],
        None => &text[..cut],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_critique_prompt_lists_criteria() {
        let criteria = vec!["accuracy".to_string(), "clarity".to_string()];
        let prompt = CritiquePrompts::build_critique_prompt("task", "answer", &criteria, 2);
        assert!(prompt.contains("- accuracy"));
        assert!(prompt.contains("- clarity"));
        assert!(prompt.contains("iteration 2"));
        assert!(prompt.contains("<critique>"));
    }

    #[test]
    fn test_improvement_prompt_carries_critique() {
        let critique = Critique {
            quality_score: 5.0,
            strengths: vec![],
            weaknesses: vec!["too vague".into()],
            improvement_suggestions: vec!["add an example".into()],
            specific_issues: BTreeMap::from([("clarity".to_string(), "dense prose".to_string())]),
            reasoning: String::new(),
        };
        let prompt =
            CritiquePrompts::build_improvement_prompt("task", "answer", &critique, None);
        assert!(prompt.contains("- too vague"));
        assert!(prompt.contains("- add an example"));
        assert!(prompt.contains("- clarity: dense prose"));
        assert!(!prompt.contains("## Focus"));
    }

    #[test]
    fn test_improvement_prompt_focus_instruction() {
        let critique = Critique {
            quality_score: 5.0,
            strengths: vec![],
            weaknesses: vec![],
            improvement_suggestions: vec![],
            specific_issues: BTreeMap::new(),
            reasoning: String::new(),
        };
        let focus = vec!["conciseness".to_string()];
        let prompt =
            CritiquePrompts::build_improvement_prompt("task", "answer", &critique, Some(&focus));
        assert!(prompt.contains("Prioritize improving: conciseness"));
    }
}
