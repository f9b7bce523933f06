use vigil_core::{Verdict, VigilError};

const SYSTEM_PROMPT: &str = "\
You are a code reviewer analyzing changes to a file for potentially malicious \
code injections, backdoors, or other security vulnerabilities. You will receive \
the file's name and current content, followed by a description of each change \
made to it.

Focus your analysis on the following potential security issues:

* Code Injection: unsanitized inputs reaching executable contexts (SQL queries, \
command execution, script evaluation)
* Backdoors: hardcoded credentials, hidden accounts, or undocumented remote \
access capabilities
* Trojans/Malware: data exfiltration, system disruption, or propagation to \
other systems
* Logic Bombs: malicious actions triggered by specific conditions or time delays
* Privilege Escalation: attempts to gain higher-level privileges without \
authorization

Respond with a single JSON object:

{\"reason\": \"<explanation of the suspicious change, including the vulnerability \
type, its location, and the potential impact>\", \"severity\": \"<NONE, LOW, \
MEDIUM, or HIGH>\"}

If the changes look benign, use severity NONE.";

/// Build the system prompt instructing the model to act as a security
/// reviewer.
///
/// # Examples
///
/// ```
/// use vigil_review::prompt::build_system_prompt;
///
/// let prompt = build_system_prompt();
/// assert!(prompt.contains("Backdoors"));
/// assert!(prompt.contains("severity"));
/// ```
pub fn build_system_prompt() -> String {
    SYSTEM_PROMPT.to_string()
}

/// Assemble the per-file user prompt: file name, current content, and one
/// rendered change description per line.
///
/// # Examples
///
/// ```
/// use vigil_review::prompt::build_file_prompt;
///
/// let prompt = build_file_prompt(
///     "src/main.rs",
///     "fn main() {}",
///     &["Added content: x at line 1".into()],
/// );
/// assert!(prompt.starts_with("Filename: src/main.rs\n"));
/// assert!(prompt.contains("Content: fn main() {}"));
/// assert!(prompt.ends_with("Added content: x at line 1"));
/// ```
pub fn build_file_prompt(file_name: &str, file_content: &str, descriptions: &[String]) -> String {
    let mut lines = Vec::with_capacity(descriptions.len() + 2);
    lines.push(format!("Filename: {file_name}"));
    lines.push(format!("Content: {file_content}"));
    lines.extend(descriptions.iter().cloned());
    lines.join("\n")
}

/// Extract and parse the model's verdict from a chat response.
///
/// Models wrap the requested JSON object in markdown fences or prose more
/// often than not, so this scans for the first balanced JSON object in the
/// text rather than assuming a fixed wrapping, then deserializes it strictly.
///
/// # Errors
///
/// Returns [`VigilError::Verdict`] when no balanced JSON object is present
/// or the object does not match the verdict shape. Callers treat this as
/// fatal for the whole run: it indicates a broken prompt contract, not a
/// per-file result.
///
/// # Examples
///
/// ```
/// use vigil_core::Severity;
/// use vigil_review::prompt::parse_verdict;
///
/// let verdict =
///     parse_verdict("```json\n{\"reason\": \"ok\", \"severity\": \"NONE\"}\n```").unwrap();
/// assert_eq!(verdict.severity, Severity::None);
/// ```
pub fn parse_verdict(response: &str) -> Result<Verdict, VigilError> {
    let json = extract_json_object(response).ok_or_else(|| {
        VigilError::Verdict(format!(
            "no JSON object in model response: {}",
            preview(response)
        ))
    })?;

    serde_json::from_str(json)
        .map_err(|e| VigilError::Verdict(format!("malformed verdict: {e}: {}", preview(json))))
}

/// Find the first balanced `{ ... }` span, honoring JSON string escapes.
fn extract_json_object(s: &str) -> Option<&str> {
    let start = s.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in s[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[start..=start + offset]);
                }
            }
            _ => {}
        }
    }

    None
}

fn preview(s: &str) -> &str {
    let trimmed = s.trim();
    match trimmed.char_indices().nth(120) {
        Some((idx, _)) => &trimmed[..idx],
        None => trimmed,
    }
}
