use regex::Regex;

use crate::commands::command_error::CommandError;
use crate::key_value_store::{now_ms, KeyValueStore};
use crate::resp::RespValue;

/// KEYS: every live key matching the glob pattern, in sorted order.
///
/// Expired rows are evicted before matching so the reply never names a key
/// a subsequent GET would miss.
pub fn keys(store: &mut KeyValueStore, arguments: &[String]) -> Result<String, CommandError> {
    let pattern = arguments
        .first()
        .ok_or_else(|| CommandError::WrongNumberOfArguments("keys".to_string()))?;

    let now = now_ms();
    store.retain(|_, value| !value.is_expired(now));

    let regex = match Regex::new(&glob_to_regex(pattern)) {
        Ok(regex) => regex,
        // a pattern the translation cannot express matches nothing
        Err(_) => return Ok(RespValue::Array(Vec::new()).encode()),
    };

    let mut matched: Vec<String> = store
        .keys()
        .filter(|key| regex.is_match(key))
        .cloned()
        .collect();
    matched.sort();

    Ok(RespValue::encode_array_from_strings(matched))
}

/// Translates the glob grammar to an anchored regex: `*` matches any run
/// (including empty), `?` exactly one character, `[...]` a class with `-`
/// ranges and leading `^` negation, and `\` escapes the next character.
fn glob_to_regex(pattern: &str) -> String {
    let mut regex = String::from("^");
    let mut chars = pattern.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '*' => regex.push_str(".*"),
            '?' => regex.push('.'),
            '\\' => match chars.next() {
                Some(escaped) => regex.push_str(&regex::escape(&escaped.to_string())),
                None => regex.push_str("\\\\"),
            },
            '[' => {
                let mut body = String::new();
                let mut closed = false;

                if chars.peek() == Some(&'^') {
                    chars.next();
                    body.push('^');
                }

                for c in chars.by_ref() {
                    if c == ']' {
                        closed = true;
                        break;
                    }
                    body.push(c);
                }

                let has_content = body != "^" && !body.is_empty();

                if closed && has_content {
                    regex.push('[');
                    regex.push_str(&body.replace('\\', "\\\\"));
                    regex.push(']');
                } else {
                    // unterminated or empty class: match it literally
                    regex.push_str(&regex::escape("["));
                    regex.push_str(&regex::escape(&body));
                    if closed {
                        regex.push_str(&regex::escape("]"));
                    }
                }
            }
            other => regex.push_str(&regex::escape(&other.to_string())),
        }
    }

    regex.push('$');
    regex
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key_value_store::{DataType, Value};

    fn matches(pattern: &str, candidate: &str) -> bool {
        Regex::new(&glob_to_regex(pattern))
            .map(|re| re.is_match(candidate))
            .unwrap_or(false)
    }

    #[test]
    fn test_glob_matching() {
        let test_cases = vec![
            ("*", "anything", true),
            ("*", "", true),
            ("h?llo", "hello", true),
            ("h?llo", "hallo", true),
            ("h?llo", "hllo", false),
            ("h*llo", "hllo", true),
            ("h*llo", "heeeello", true),
            ("h[ae]llo", "hello", true),
            ("h[ae]llo", "hallo", true),
            ("h[ae]llo", "hillo", false),
            ("h[^e]llo", "hallo", true),
            ("h[^e]llo", "hello", false),
            ("h[a-c]llo", "hbllo", true),
            ("h[a-c]llo", "hdllo", false),
            ("key\\*", "key*", true),
            ("key\\*", "keys", false),
            ("user:*", "user:42", true),
            ("user:*", "session:42", false),
            ("exact", "exact", true),
            ("exact", "exac", false),
            ("a.b", "a.b", true),
            ("a.b", "axb", false),
        ];

        for (pattern, candidate, expected) in test_cases {
            assert_eq!(
                matches(pattern, candidate),
                expected,
                "pattern {:?} against {:?}",
                pattern,
                candidate
            );
        }
    }

    #[test]
    fn test_keys_filters_and_sorts() {
        let mut store = KeyValueStore::new();
        for key in ["apple", "apricot", "banana"] {
            store.insert(
                key.to_string(),
                Value::new(DataType::String("v".to_string())),
            );
        }

        let response = keys(&mut store, &["ap*".to_string()]).unwrap();

        assert_eq!(response, "*2\r\n$5\r\napple\r\n$7\r\napricot\r\n");
    }

    #[test]
    fn test_keys_skips_expired_rows() {
        let mut store = KeyValueStore::new();
        store.insert(
            "live".to_string(),
            Value::new(DataType::String("v".to_string())),
        );
        store.insert(
            "dead".to_string(),
            Value::with_expiry(DataType::String("v".to_string()), 1),
        );

        let response = keys(&mut store, &["*".to_string()]).unwrap();

        assert_eq!(response, "*1\r\n$4\r\nlive\r\n");
        assert!(!store.contains_key("dead"));
    }
}
