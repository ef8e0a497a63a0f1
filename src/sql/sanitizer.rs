//! Normalizes raw model output into one clean SQL statement.
//!
//! The model is instructed to emit a bare statement, but responses still
//! arrive wrapped in markdown fences, quotes, comments or with stray extra
//! statements. Sanitization is total (never fails) and idempotent.

/// Cleans raw generated text down to a single SQL statement.
///
/// Strips markdown code fences and surrounding quotes, splits into
/// statements on semicolons outside string literals, removes line and block
/// comments, and returns the first non-empty candidate. Later candidates
/// are discarded, which bounds execution to exactly one statement
/// downstream. Returns an empty string for empty input.
pub fn sanitize(raw: &str) -> String {
    // Comment stripping can expose a fence or quote wrapper hidden behind a
    // leading comment line, so the cleanup repeats until nothing changes.
    // Each pass only removes characters, so the loop terminates.
    let mut current = raw.trim().to_string();
    loop {
        let next = sanitize_pass(&current);
        if next == current {
            return next;
        }
        current = next;
    }
}

fn sanitize_pass(text: &str) -> String {
    let text = text.trim();
    if text.is_empty() {
        return String::new();
    }

    let text = strip_code_fences(text);
    let text = strip_surrounding_quotes(&text);

    for candidate in split_statements(&text) {
        let cleaned = strip_comments(&candidate);
        let cleaned = cleaned.trim();
        if !cleaned.is_empty() {
            return cleaned.to_string();
        }
    }

    String::new()
}

/// Returns true if the text contains a semicolon outside string literals.
///
/// Used as a pre-dispatch guard independent of the validator: sanitized SQL
/// must never carry an internal statement separator.
pub fn contains_statement_separator(sql: &str) -> bool {
    let mut quote: Option<char> = None;
    for ch in sql.chars() {
        match quote {
            Some(q) => {
                if ch == q {
                    quote = None;
                }
            }
            None => match ch {
                '\'' | '"' => quote = Some(ch),
                ';' => return true,
                _ => {}
            },
        }
    }
    false
}

/// Removes a markdown code fence wrapper, including an optional language tag
/// on the opening fence.
fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }

    // Drop the opening fence line ("```" or "```sql").
    let body = match trimmed.find('\n') {
        Some(i) => &trimmed[i + 1..],
        None => return trimmed.trim_matches('`').trim().to_string(),
    };

    let body = body.trim_end();
    let body = body.strip_suffix("```").unwrap_or(body);
    body.trim().to_string()
}

/// Removes complete surrounding quote layers when the entire string is one
/// quoted token. Stripping every complete layer (rather than exactly one)
/// keeps sanitization idempotent.
fn strip_surrounding_quotes(text: &str) -> String {
    let mut current = text.trim();
    loop {
        let mut chars = current.chars();
        let (first, last) = match (chars.next(), chars.next_back()) {
            (Some(f), Some(l)) => (f, l),
            _ => break,
        };
        if current.len() >= 2 && first == last && (first == '\'' || first == '"' || first == '`') {
            let inner =
                current[first.len_utf8()..current.len() - last.len_utf8()].trim();
            // A statement that merely starts and ends with a literal also
            // has the quote char at both ends; only treat the quotes as a
            // wrapper when the char never occurs inside.
            if inner.contains(first) {
                break;
            }
            current = inner;
        } else {
            break;
        }
    }
    current.to_string()
}

/// Splits text into statement candidates on semicolons that sit outside
/// string literals. Separators are consumed, not emitted.
fn split_statements(text: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for ch in text.chars() {
        match quote {
            Some(q) => {
                current.push(ch);
                if ch == q {
                    quote = None;
                }
            }
            None => match ch {
                '\'' | '"' => {
                    quote = Some(ch);
                    current.push(ch);
                }
                ';' => {
                    statements.push(std::mem::take(&mut current));
                }
                _ => current.push(ch),
            },
        }
    }

    if !current.trim().is_empty() {
        statements.push(current);
    }
    statements
}

/// Removes `--` line comments and `/* */` block comments that sit outside
/// string literals.
fn strip_comments(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut quote: Option<char> = None;
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        match quote {
            Some(q) => {
                out.push(ch);
                if ch == q {
                    quote = None;
                }
                i += 1;
            }
            None => {
                if ch == '\'' || ch == '"' {
                    quote = Some(ch);
                    out.push(ch);
                    i += 1;
                } else if ch == '-' && chars.get(i + 1) == Some(&'-') {
                    // Line comment: skip to end of line, keep the newline.
                    while i < chars.len() && chars[i] != '\n' {
                        i += 1;
                    }
                } else if ch == '/' && chars.get(i + 1) == Some(&'*') {
                    // Block comment: skip past the closing marker, or to the
                    // end if unterminated.
                    i += 2;
                    while i < chars.len() {
                        if chars[i] == '*' && chars.get(i + 1) == Some(&'/') {
                            i += 2;
                            break;
                        }
                        i += 1;
                    }
                } else {
                    out.push(ch);
                    i += 1;
                }
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_input() {
        assert_eq!(sanitize(""), "");
        assert_eq!(sanitize("   \n\t "), "");
    }

    #[test]
    fn test_plain_statement_with_terminator() {
        assert_eq!(sanitize("SELECT 1;"), "SELECT 1");
    }

    #[test]
    fn test_strips_sql_code_fence() {
        let raw = "```sql\nSELECT * FROM dim_subscriber;\n```";
        assert_eq!(sanitize(raw), "SELECT * FROM dim_subscriber");
    }

    #[test]
    fn test_strips_generic_code_fence() {
        let raw = "```\nSELECT COUNT(*) FROM fact_billing;\n```";
        assert_eq!(sanitize(raw), "SELECT COUNT(*) FROM fact_billing");
    }

    #[test]
    fn test_strips_surrounding_quotes() {
        assert_eq!(sanitize("\"SELECT year FROM dim_time\""), "SELECT year FROM dim_time");
        assert_eq!(sanitize("'SELECT 1'"), "SELECT 1");
    }

    #[test]
    fn test_wrapper_behind_leading_comment_still_stripped() {
        assert_eq!(sanitize("-- c\n'SELECT 1'"), "SELECT 1");
        assert_eq!(sanitize("-- note\n```sql\nSELECT 1;\n```"), "SELECT 1");
    }

    #[test]
    fn test_literals_at_both_ends_are_not_a_wrapper() {
        let raw = "'basic' AS plan, 'premium'";
        assert_eq!(sanitize(raw), raw);
        assert_eq!(
            sanitize("\"SELECT \"\" FROM t\""),
            "\"SELECT \"\" FROM t\""
        );
    }

    #[test]
    fn test_first_statement_wins() {
        let raw = "SELECT 1; SELECT 2; DROP TABLE users;";
        assert_eq!(sanitize(raw), "SELECT 1");
    }

    #[test]
    fn test_semicolon_inside_string_literal_not_split() {
        let raw = "SELECT 'a;b' AS pair FROM dim_time;";
        assert_eq!(sanitize(raw), "SELECT 'a;b' AS pair FROM dim_time");
    }

    #[test]
    fn test_strips_line_comments() {
        let raw = "SELECT 1 -- trailing note\nFROM dim_time;";
        assert_eq!(sanitize(raw), "SELECT 1 \nFROM dim_time");
    }

    #[test]
    fn test_line_comment_marker_inside_literal_preserved() {
        let raw = "SELECT '--not a comment' AS t;";
        assert_eq!(sanitize(raw), "SELECT '--not a comment' AS t");
    }

    #[test]
    fn test_strips_block_comments() {
        let raw = "SELECT /* inline */ year FROM dim_time;";
        assert_eq!(sanitize(raw), "SELECT  year FROM dim_time");
    }

    #[test]
    fn test_empty_first_candidate_skipped() {
        let raw = "-- just a comment\n; SELECT 42;";
        assert_eq!(sanitize(raw), "SELECT 42");
    }

    #[test]
    fn test_idempotence() {
        let inputs = [
            "```sql\nSELECT * FROM t;\n```",
            "'SELECT 1'",
            "SELECT 'a;b' AS x; SELECT 2;",
            "SELECT 1 -- note\n;",
            "SELECT 'LLM offline' AS message;",
            "-- c\n'SELECT 1'",
            "-- note\n```sql\nSELECT 1;\n```",
            "'basic' AS plan, 'premium'",
        ];
        for input in inputs {
            let once = sanitize(input);
            assert_eq!(sanitize(&once), once, "not idempotent for {:?}", input);
        }
    }

    #[test]
    fn test_output_never_contains_separator() {
        let inputs = [
            "SELECT 1; SELECT 2",
            "SELECT ';' AS semi; DELETE FROM t;",
            "```sql\nSELECT 1;\nSELECT 2;\n```",
        ];
        for input in inputs {
            let cleaned = sanitize(input);
            assert!(
                !contains_statement_separator(&cleaned),
                "separator left in output for {:?}: {:?}",
                input,
                cleaned
            );
        }
    }

    #[test]
    fn test_separator_detection_respects_literals() {
        assert!(!contains_statement_separator("SELECT ';' AS semi"));
        assert!(contains_statement_separator("SELECT 1; DROP TABLE t"));
        assert!(!contains_statement_separator("SELECT 1"));
    }
}
