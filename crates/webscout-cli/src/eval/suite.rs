use crate::envelope::{CmdError, ErrorCode};
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct EvalCase {
    pub id: String,
    pub query: String,
    pub expected_domains: Vec<String>,
    pub expected_urls: Vec<String>,
    pub k: Option<usize>,
}

impl EvalCase {
    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "id": self.id,
            "query": self.query,
            "expected_domains": self.expected_domains,
            "expected_urls": self.expected_urls,
            "k": self.k,
        })
    }
}

#[derive(Debug, Clone)]
pub struct EvalSuite {
    pub path: String,
    pub cases: Vec<EvalCase>,
}

fn invalid(message: impl Into<String>) -> CmdError {
    CmdError::new(ErrorCode::InvalidUsage, message)
}

fn coerce_str_list(value: Option<&Value>, field: &str) -> Result<Vec<String>, CmdError> {
    let Some(value) = value else {
        return Ok(Vec::new());
    };
    match value {
        Value::Null => Ok(Vec::new()),
        Value::String(s) => Ok(if s.trim().is_empty() {
            Vec::new()
        } else {
            vec![s.trim().to_string()]
        }),
        Value::Array(items) => {
            let mut out = Vec::new();
            for item in items {
                let Value::String(s) = item else {
                    return Err(invalid(format!("{field} must be a list of strings")));
                };
                if !s.trim().is_empty() {
                    out.push(s.trim().to_string());
                }
            }
            Ok(out)
        }
        _ => Err(invalid(format!("{field} must be a list of strings"))),
    }
}

fn parse_case(raw: &Value, index: usize) -> Result<EvalCase, CmdError> {
    let Some(obj) = raw.as_object() else {
        return Err(invalid("suite cases must be JSON objects"));
    };

    let id = match obj.get("id") {
        None | Some(Value::Null) => format!("case-{index}"),
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(_) => return Err(invalid("case id must be a non-empty string")),
    };

    let query = match obj.get("query") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        _ => {
            return Err(invalid(format!(
                "case {id:?} query must be a non-empty string"
            )))
        }
    };

    let expected_domains = coerce_str_list(obj.get("expected_domains"), "expected_domains")?;
    let expected_urls = coerce_str_list(obj.get("expected_urls"), "expected_urls")?;

    let k = match obj.get("k") {
        None | Some(Value::Null) => None,
        Some(Value::Number(n)) => {
            let k = n
                .as_u64()
                .filter(|k| *k > 0)
                .ok_or_else(|| invalid(format!("case {id:?} k must be a positive integer")))?;
            Some(k as usize)
        }
        Some(_) => return Err(invalid(format!("case {id:?} k must be a positive integer"))),
    };

    Ok(EvalCase {
        id,
        query,
        expected_domains,
        expected_urls,
        k,
    })
}

fn parse_json_cases(payload: &Value) -> Result<Vec<EvalCase>, CmdError> {
    if let Some(items) = payload.as_array() {
        return items
            .iter()
            .enumerate()
            .map(|(i, raw)| parse_case(raw, i + 1))
            .collect();
    }
    if let Some(items) = payload.get("cases").and_then(Value::as_array) {
        return items
            .iter()
            .enumerate()
            .map(|(i, raw)| parse_case(raw, i + 1))
            .collect();
    }
    Err(invalid(
        "suite must be a JSON array or an object with a 'cases' array",
    ))
}

/// Parse a suite from JSONL (blank lines and `#` comments ignored) or JSON
/// (array, or object with a `cases` array). stdin is `-`.
pub fn load_suite(path: &str) -> Result<EvalSuite, CmdError> {
    let content = if path == "-" {
        use std::io::Read;
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| CmdError::new(ErrorCode::IoError, e.to_string()))?;
        buf
    } else {
        std::fs::read_to_string(path)
            .map_err(|e| CmdError::new(ErrorCode::IoError, format!("{path}: {e}")))?
    };

    let is_jsonl = path != "-" && path.to_ascii_lowercase().ends_with(".jsonl");
    let cases = if is_jsonl {
        let mut cases = Vec::new();
        for (lineno, line) in content.lines().enumerate() {
            let stripped = line.trim();
            if stripped.is_empty() || stripped.starts_with('#') {
                continue;
            }
            let raw: Value = serde_json::from_str(stripped).map_err(|e| {
                CmdError::new(
                    ErrorCode::InvalidUsage,
                    format!("invalid JSON on line {}: {e}", lineno + 1),
                )
                .with_details(serde_json::json!({"line": lineno + 1}))
            })?;
            cases.push(parse_case(&raw, cases.len() + 1)?);
        }
        cases
    } else {
        let payload: Value = serde_json::from_str(&content)
            .map_err(|e| invalid(format!("invalid JSON suite: {e}")))?;
        parse_json_cases(&payload)?
    };

    if cases.is_empty() {
        return Err(invalid("suite contains no cases"));
    }
    Ok(EvalSuite {
        path: path.to_string(),
        cases,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_suite(name: &str, content: &str) -> (tempfile::TempDir, String) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        (dir, path.to_string_lossy().to_string())
    }

    #[test]
    fn jsonl_skips_blanks_and_comments() {
        let (_dir, path) = write_suite(
            "s.jsonl",
            "# header\n\n{\"query\": \"rust async\", \"expected_domains\": [\"docs.rs\"]}\n{\"id\": \"two\", \"query\": \"q2\", \"k\": 3}\n",
        );
        let suite = load_suite(&path).unwrap();
        assert_eq!(suite.cases.len(), 2);
        assert_eq!(suite.cases[0].id, "case-1");
        assert_eq!(suite.cases[0].expected_domains, vec!["docs.rs"]);
        assert_eq!(suite.cases[1].id, "two");
        assert_eq!(suite.cases[1].k, Some(3));
    }

    #[test]
    fn json_array_and_cases_object_both_parse() {
        let (_dir, path) = write_suite("s.json", r#"[{"query": "a"}]"#);
        assert_eq!(load_suite(&path).unwrap().cases.len(), 1);

        let (_dir, path) = write_suite(
            "s2.json",
            r#"{"cases": [{"query": "a", "expected_urls": "https://example.com/"}]}"#,
        );
        let suite = load_suite(&path).unwrap();
        assert_eq!(suite.cases[0].expected_urls, vec!["https://example.com/"]);
    }

    #[test]
    fn invalid_cases_are_usage_errors() {
        let (_dir, path) = write_suite("s.json", r#"[{"id": "x"}]"#);
        let err = load_suite(&path).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidUsage);
        assert!(err.message.contains("query"));

        let (_dir, path) = write_suite("s.json", r#"[{"query": "a", "k": 0}]"#);
        assert!(load_suite(&path).is_err());

        let (_dir, path) = write_suite("s.json", "[]");
        let err = load_suite(&path).unwrap_err();
        assert!(err.message.contains("no cases"));
    }

    #[test]
    fn bad_jsonl_line_reports_its_number() {
        let (_dir, path) = write_suite("s.jsonl", "{\"query\": \"ok\"}\nnot json\n");
        let err = load_suite(&path).unwrap_err();
        assert!(err.message.contains("line 2"), "got: {}", err.message);
    }
}
