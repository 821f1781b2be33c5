//! Prompt templates for file analysis

/// System message used when the endpoint cannot enforce JSON output.
pub const SYSTEM_PROMPT: &str = "You are a code analyzer. Always respond with valid JSON only.";

/// Appended to content cut at the character limit.
pub const TRUNCATION_MARKER: &str = "\n... (content truncated for analysis)";

/// Build the user prompt asking for structured metadata.
pub fn file_analysis_prompt(content: &str, file_type: &str) -> String {
    format!(
        r#"Analyze this {file_type} code and extract metadata as a single JSON object:

{{
  "description": "one sentence summary of the file",
  "functions": [
    {{"name": "...", "arguments": [{{"name": "...", "type": "..."}}], "return_type": "...",
      "decorators": [], "is_static": false, "is_async": false, "docstring": "", "lineno": 1}}
  ],
  "classes": [
    {{"name": "...", "type": "regular|abstract|singleton", "superclasses": [],
      "methods": [{{"name": "..."}}], "attributes": [{{"name": "...", "type": "...", "visibility": "public"}}],
      "docstring": "", "lineno": 1}}
  ],
  "enums": [{{"name": "...", "values": [], "docstring": ""}}],
  "imports": [{{"module": "module or path exactly as written in the import"}}]
}}

Use empty arrays for anything not present. Respond with valid JSON only.

Code:
{content}"#
    )
}

/// Cut `content` to at most `max_chars` characters, marking the cut.
pub fn truncate_content(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}{}", &content[..byte_idx], TRUNCATION_MARKER),
        None => content.to_string(),
    }
}
