use regex::Regex;
use std::sync::LazyLock;

use crate::error::AgentError;

static PYTHON_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&fence_pattern("python")).expect("Invalid code fence regex")
});

/// The label must end the word: an info string may follow after a space,
/// then the block starts on the next line
fn fence_pattern(language: &str) -> String {
    format!(
        r"(?s)```{}(?:[ \t][^\n]*)?\r?\n(.*?)```",
        regex::escape(language)
    )
}

/// Matcher for the first fenced code block tagged with a language label.
///
/// The match is case-sensitive, spans lines and is non-greedy, so only the
/// first block in a response is captured.
#[derive(Debug, Clone)]
pub struct CodeFence {
    language: String,
    regex: Regex,
}

impl CodeFence {
    pub fn new(language: &str) -> Result<Self, AgentError> {
        if language.trim().is_empty() {
            return Err(AgentError::Config(
                "code block language must not be empty".to_string(),
            ));
        }

        let regex = Regex::new(&fence_pattern(language))
            .map_err(|e| AgentError::Config(format!("invalid code fence: {}", e)))?;

        Ok(Self {
            language: language.to_string(),
            regex,
        })
    }

    pub fn python() -> Self {
        Self {
            language: "python".to_string(),
            regex: PYTHON_FENCE.clone(),
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Trimmed interior of the first matching block, or `None` if the text
    /// has no such block.
    pub fn extract(&self, text: &str) -> Option<String> {
        self.regex
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
    }
}

impl Default for CodeFence {
    fn default() -> Self {
        Self::python()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_single_block_verbatim() {
        let fence = CodeFence::python();
        let text = "Here you go:\n```python\ndef factorial(n): ...\n```\nEnjoy.";
        assert_eq!(fence.extract(text).as_deref(), Some("def factorial(n): ..."));
    }

    #[test]
    fn preserves_interior_indentation_and_blank_lines() {
        let fence = CodeFence::python();
        let text = "```python\n\ndef f():\n    x = 1\n\n    return x\n```";
        assert_eq!(
            fence.extract(text).as_deref(),
            Some("def f():\n    x = 1\n\n    return x")
        );
    }

    #[test]
    fn missing_block_yields_none() {
        let fence = CodeFence::python();
        assert_eq!(fence.extract("I could not write that code."), None);
        assert_eq!(fence.extract("```rust\nfn main() {}\n```"), None);
    }

    #[test]
    fn only_first_of_two_blocks_is_captured() {
        let fence = CodeFence::python();
        let text = "```python\nprint('one')\n```\ntext\n```python\nprint('two')\n```";
        assert_eq!(fence.extract(text).as_deref(), Some("print('one')"));
    }

    #[test]
    fn language_tag_is_case_sensitive() {
        let fence = CodeFence::python();
        assert_eq!(fence.extract("```Python\nprint(1)\n```"), None);
    }

    #[test]
    fn longer_label_is_not_the_language() {
        let fence = CodeFence::python();
        assert_eq!(fence.extract("```python3\nprint(1)\n```"), None);
        assert_eq!(fence.extract("```pythonic\nprint(1)\n```"), None);
        assert_eq!(
            fence
                .extract("```python3\nprint(1)\n```\n```python\nprint(2)\n```")
                .as_deref(),
            Some("print(2)")
        );
    }

    #[test]
    fn info_string_after_label_is_not_code() {
        let fence = CodeFence::python();
        assert_eq!(
            fence.extract("```python title=x\nprint(1)\n```").as_deref(),
            Some("print(1)")
        );
        assert_eq!(
            fence.extract("```python\r\nprint(1)\r\n```").as_deref(),
            Some("print(1)")
        );
    }

    #[test]
    fn unterminated_block_is_a_miss() {
        let fence = CodeFence::python();
        assert_eq!(fence.extract("```python\nprint(1)\n"), None);
    }

    #[test]
    fn custom_language_is_escaped() {
        let fence = CodeFence::new("c++").expect("valid language");
        assert_eq!(
            fence.extract("```c++\nint main() {}\n```").as_deref(),
            Some("int main() {}")
        );
        assert_eq!(fence.extract("```cc\nint main() {}\n```"), None);
    }

    #[test]
    fn empty_language_is_rejected() {
        assert!(CodeFence::new("  ").is_err());
    }
}
