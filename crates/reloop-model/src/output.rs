use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Text produced by a single model invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedText {
    /// The generated text, trimmed of surrounding whitespace
    pub text: String,
    /// Duration of the invocation
    #[serde(with = "duration_secs")]
    pub duration: Duration,
}

impl GeneratedText {
    pub fn new(text: String, duration: Duration) -> Self {
        Self {
            text: text.trim().to_string(),
            duration,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// A short excerpt for logs and progress events
    pub fn excerpt(&self, max_chars: usize) -> String {
        if self.text.chars().count() <= max_chars {
            self.text.clone()
        } else {
            let cut: String = self.text.chars().take(max_chars).collect();
            format!("{}...", cut)
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Ok(Duration::from_secs_f64(secs))
    }
}
