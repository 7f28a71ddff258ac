//! Response validators over opaque JSON.
//!
//! Paths are dotted (`main.temp`); numeric segments index arrays
//! (`choices.0.message`).

use serde_json::Value;

use crate::resilience::Validation;

/// Resolve a dotted path inside `value`.
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .filter(|segment| !segment.is_empty())
        .try_fold(value, |current, segment| match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
}

/// Accept responses in which every path is present and not null.
pub fn require_fields<S: AsRef<str>>(fields: &[S]) -> impl Fn(&Value) -> Validation {
    let fields: Vec<String> = fields.iter().map(|f| f.as_ref().to_string()).collect();

    move |value: &Value| -> Validation {
        for field in &fields {
            match lookup(value, field) {
                Some(found) if !found.is_null() => {}
                _ => return Err(format!("missing {}", field)),
            }
        }
        Ok(())
    }
}

/// Accept responses in which `path` is a non-empty array, object or string.
pub fn require_non_empty(path: impl Into<String>) -> impl Fn(&Value) -> Validation {
    let path = path.into();

    move |value: &Value| -> Validation {
        let empty = match lookup(value, &path) {
            Some(Value::Array(items)) => items.is_empty(),
            Some(Value::Object(map)) => map.is_empty(),
            Some(Value::String(s)) => s.trim().is_empty(),
            Some(Value::Null) | None => return Err(format!("missing {}", path)),
            Some(_) => false,
        };

        if empty {
            Err(format!("empty {}", path))
        } else {
            Ok(())
        }
    }
}
