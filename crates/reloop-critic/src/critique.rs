use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

/// Lowest valid quality score
pub const MIN_QUALITY_SCORE: f64 = 1.0;
/// Highest valid quality score
pub const MAX_QUALITY_SCORE: f64 = 10.0;

/// A structured evaluation of a candidate answer, produced by a critic-role
/// model. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Critique {
    /// Overall quality on a 1.0-10.0 scale
    pub quality_score: f64,
    /// What the answer does well
    #[serde(default)]
    pub strengths: Vec<String>,
    /// What the answer does poorly
    #[serde(default)]
    pub weaknesses: Vec<String>,
    /// Concrete changes the next revision should make
    #[serde(default)]
    pub improvement_suggestions: Vec<String>,
    /// Per-criterion notes, keyed by criterion name
    #[serde(default)]
    pub specific_issues: BTreeMap<String, String>,
    /// Free-text justification for the score
    #[serde(default)]
    pub reasoning: String,
}

#[derive(Error, Debug)]
pub enum CritiqueParseError {
    #[error("No critique block found in model output")]
    NoCritiqueFound,

    #[error("Malformed critique block")]
    MalformedBlock,

    #[error("Failed to parse critique JSON: {0}")]
    JsonParseError(#[from] serde_json::Error),

    #[error("Quality score {0} is outside the 1.0-10.0 range")]
    ScoreOutOfRange(f64),
}

impl Critique {
    /// Parse a critique from raw model output
    ///
    /// Expected format in the output:
    /// ```text
    /// <critique>
    /// {"quality_score": 7.5, "strengths": [...], "weaknesses": [...],
    ///  "improvement_suggestions": [...], "specific_issues": {...},
    ///  "reasoning": "..."}
    /// </critique>
    /// ```
    /// Falls back to treating the entire output as the JSON payload, since
    /// some models return the bare object despite the instructions.
    pub fn parse(output: &str) -> Result<Self, CritiqueParseError> {
        debug!(output_len = output.len(), "Parsing critique");

        let critique = match Self::parse_critique_block(output)? {
            Some(critique) => critique,
            None => Self::parse_bare_json(output)?,
        };
        critique.validate()?;
        Ok(critique)
    }

    fn parse_critique_block(output: &str) -> Result<Option<Self>, CritiqueParseError> {
        let start = output.find("<critique>");
        let end = output.find("</critique>");

        match (start, end) {
            (Some(start), Some(end)) if start < end => {
                let json_str = output[start + 10..end].trim();
                debug!(json = json_str, "Found critique block");
                let critique: Critique = serde_json::from_str(json_str)?;
                Ok(Some(critique))
            }
            (Some(_), Some(_)) => Err(CritiqueParseError::MalformedBlock),
            _ => Ok(None),
        }
    }

    fn parse_bare_json(output: &str) -> Result<Self, CritiqueParseError> {
        let trimmed = output.trim();
        if !trimmed.starts_with('{') {
            return Err(CritiqueParseError::NoCritiqueFound);
        }
        debug!("Parsing critique as bare JSON object");
        serde_json::from_str(trimmed).map_err(CritiqueParseError::from)
    }

    fn validate(&self) -> Result<(), CritiqueParseError> {
        if !self.quality_score.is_finite()
            || self.quality_score < MIN_QUALITY_SCORE
            || self.quality_score > MAX_QUALITY_SCORE
        {
            return Err(CritiqueParseError::ScoreOutOfRange(self.quality_score));
        }
        Ok(())
    }

    /// Get a short description of the critique for logging
    pub fn short_description(&self) -> String {
        if self.weaknesses.is_empty() {
            format!("score {:.1}", self.quality_score)
        } else {
            format!(
                "score {:.1} ({} weaknesses)",
                self.quality_score,
                self.weaknesses.len()
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_critique_block() {
        let output = r#"
Here is my evaluation of the answer.

<critique>
{"quality_score": 7.5, "strengths": ["clear"], "weaknesses": ["too short"], "improvement_suggestions": ["expand the second section"], "specific_issues": {"completeness": "missing edge cases"}, "reasoning": "Good but thin"}
</critique>
"#;

        let critique = Critique::parse(output).unwrap();
        assert!((critique.quality_score - 7.5).abs() < 1e-9);
        assert_eq!(critique.strengths, vec!["clear"]);
        assert_eq!(critique.weaknesses, vec!["too short"]);
        assert_eq!(
            critique.specific_issues.get("completeness").unwrap(),
            "missing edge cases"
        );
    }

    #[test]
    fn test_parse_bare_json_fallback() {
        let output = r#"{"quality_score": 4.0, "weaknesses": ["vague"]}"#;
        let critique = Critique::parse(output).unwrap();
        assert!((critique.quality_score - 4.0).abs() < 1e-9);
        assert!(critique.strengths.is_empty());
        assert_eq!(critique.reasoning, "");
    }

    #[test]
    fn test_parse_no_critique() {
        let output = "I think the answer is pretty good overall.";
        let result = Critique::parse(output);
        assert!(matches!(result, Err(CritiqueParseError::NoCritiqueFound)));
    }

    #[test]
    fn test_score_out_of_range() {
        let output = r#"<critique>{"quality_score": 11.0}</critique>"#;
        let result = Critique::parse(output);
        assert!(matches!(
            result,
            Err(CritiqueParseError::ScoreOutOfRange(_))
        ));

        let output = r#"<critique>{"quality_score": 0.0}</critique>"#;
        assert!(matches!(
            Critique::parse(output),
            Err(CritiqueParseError::ScoreOutOfRange(_))
        ));
    }

    #[test]
    fn test_malformed_block() {
        let output = "</critique> backwards <critique>";
        let result = Critique::parse(output);
        assert!(matches!(result, Err(CritiqueParseError::MalformedBlock)));
    }

    #[test]
    fn test_short_description() {
        let critique = Critique {
            quality_score: 6.0,
            strengths: vec![],
            weaknesses: vec!["a".into(), "b".into()],
            improvement_suggestions: vec![],
            specific_issues: BTreeMap::new(),
            reasoning: String::new(),
        };
        assert_eq!(critique.short_description(), "score 6.0 (2 weaknesses)");
    }
}
