//! Input validation applied to free-text query values before they reach the registry.

use thiserror::Error;

/// Longest accepted query value, in bytes.
pub const MAX_QUERY_LEN: usize = 255;

/// Characters never accepted in a query value.
pub const ILLEGAL_CHARS: [char; 4] = ['\'', ';', '/', '\\'];

/// Why a query value was rejected.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryRejection {
    #[error("empty query")]
    Empty,

    #[error("query too long")]
    TooLong,

    #[error("Message contain illegal character!")]
    IllegalCharacter(char),
}

/// Checks a query value: non-empty, at most 255 bytes, and free of `'`, `;`, `/` and `\`.
pub fn qualify_query(value: &str) -> Result<(), QueryRejection> {
    if value.is_empty() {
        return Err(QueryRejection::Empty);
    }
    if value.len() > MAX_QUERY_LEN {
        return Err(QueryRejection::TooLong);
    }
    if let Some(c) = value.chars().find(|c| ILLEGAL_CHARS.contains(c)) {
        return Err(QueryRejection::IllegalCharacter(c));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_plain_values() {
        assert_eq!(qualify_query("192.168.1.5"), Ok(()));
        assert_eq!(qualify_query("dev-1_ABC"), Ok(()));
        assert_eq!(qualify_query(&"a".repeat(MAX_QUERY_LEN)), Ok(()));
    }

    #[test]
    fn test_rejects_empty() {
        assert_eq!(qualify_query(""), Err(QueryRejection::Empty));
    }

    #[test]
    fn test_rejects_too_long() {
        assert_eq!(
            qualify_query(&"a".repeat(MAX_QUERY_LEN + 1)),
            Err(QueryRejection::TooLong)
        );
    }

    #[test]
    fn test_rejects_each_illegal_character() {
        for c in ILLEGAL_CHARS {
            let value = format!("192.168{}1.5", c);
            assert_eq!(
                qualify_query(&value),
                Err(QueryRejection::IllegalCharacter(c)),
                "{value}"
            );
        }
    }
}
