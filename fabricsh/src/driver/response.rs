//! Response type for command execution results.

use std::time::Duration;

/// Output of one command run inside an interactive session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// The command that was executed.
    pub command: String,

    /// The command output (normalized - command echo and trailing prompt removed).
    pub result: String,

    /// Captured text before the prompt, as received.
    pub raw_result: String,

    /// Time taken to execute the command.
    pub elapsed: Duration,
}

impl Response {
    /// Build a response from the raw text captured before the prompt.
    pub fn new(command: impl Into<String>, raw_result: impl Into<String>, elapsed: Duration) -> Self {
        let command = command.into();
        let raw_result = raw_result.into();
        let result = normalize_output(&raw_result, &command);
        Self {
            command,
            result,
            raw_result,
            elapsed,
        }
    }

    /// Get the result lines as an iterator.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.result.lines()
    }

    /// Check if the result contains a substring.
    pub fn contains(&self, pattern: &str) -> bool {
        self.result.contains(pattern)
    }
}

impl std::fmt::Display for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.result)
    }
}

/// Strip the echoed command and the trailing prompt line.
///
/// The text before a prompt match ends with whatever precedes the prompt
/// on its line (hostname, mode), so the last line is always dropped.
pub fn normalize_output(raw: &str, command: &str) -> String {
    let text = raw.replace("\r\n", "\n").replace('\r', "");

    let output = text
        .strip_prefix(command)
        .unwrap_or(&text)
        .trim_start_matches('\n');

    match output.rfind('\n') {
        Some(pos) => output[..pos + 1].to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_echo_and_prompt() {
        let raw = "show version\r\nVersion 3.1\r\nBuild 42\r\nleaf1";
        assert_eq!(normalize_output(raw, "show version"), "Version 3.1\nBuild 42\n");
    }

    #[test]
    fn test_normalize_without_echo() {
        assert_eq!(normalize_output("line one\nsw", "show x"), "line one\n");
    }

    #[test]
    fn test_normalize_no_output() {
        assert_eq!(normalize_output("exit\nsw", "exit"), "");
        assert_eq!(normalize_output("sw", "exit"), "");
    }

    #[test]
    fn test_response() {
        let response = Response::new("show ver", "show ver\nv1\nsw", Duration::from_millis(3));
        assert_eq!(response.result, "v1\n");
        assert!(response.contains("v1"));
        assert_eq!(response.lines().collect::<Vec<_>>(), ["v1"]);
        assert_eq!(response.to_string(), "v1\n");
    }
}
