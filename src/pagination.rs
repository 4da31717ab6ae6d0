//! Offset pagination over freshly fetched backend lists.
//!
//! Tokens are opaque to clients; the store maps each one to the offset the
//! next page starts at.

use bridge_common::{BridgeError, Result};
use std::collections::HashMap;

/// Turn a client's `(page_size, page_token)` into `(size, offset)`.
///
/// A size of 0 means "everything from offset". When `max_page_size` is
/// positive it caps the size, including the unbounded case.
pub fn extract_pagination(
    page_size: i32,
    page_token: &str,
    tokens: &HashMap<String, usize>,
    max_page_size: i32,
) -> Result<(usize, usize)> {
    if page_size < 0 {
        return Err(BridgeError::InvalidArgument(
            "negative PageSize is not allowed".to_string(),
        ));
    }

    let mut size = page_size as usize;
    if max_page_size > 0 && (size == 0 || size > max_page_size as usize) {
        size = max_page_size as usize;
    }

    let offset = if page_token.is_empty() {
        0
    } else {
        *tokens.get(page_token).ok_or_else(|| {
            BridgeError::NotFound(format!("unable to find pagination token {}", page_token))
        })?
    };

    Ok((size, offset))
}

/// Cut the `[offset, offset + size)` window out of `items`.
///
/// Returns the window and whether anything is left after it.
pub fn limit_to_pagination<T>(mut items: Vec<T>, offset: usize, size: usize) -> (Vec<T>, bool) {
    let start = offset.min(items.len());
    let end = if size == 0 {
        items.len()
    } else {
        start.saturating_add(size).min(items.len())
    };
    let has_more = end < items.len();

    items.truncate(end);
    let window = items.split_off(start);
    (window, has_more)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_page_size() {
        let err = extract_pagination(-1, "", &HashMap::new(), 0).unwrap_err();
        assert_eq!(
            err,
            BridgeError::InvalidArgument("negative PageSize is not allowed".into())
        );
    }

    #[test]
    fn test_unknown_token() {
        let err = extract_pagination(1, "nope", &HashMap::new(), 0).unwrap_err();
        assert_eq!(
            err,
            BridgeError::NotFound("unable to find pagination token nope".into())
        );
    }

    #[test]
    fn test_known_token_sets_offset() {
        let tokens = HashMap::from([("t".to_string(), 4usize)]);
        assert_eq!(extract_pagination(2, "t", &tokens, 0).unwrap(), (2, 4));
        assert_eq!(extract_pagination(0, "", &tokens, 0).unwrap(), (0, 0));
    }

    #[test]
    fn test_page_size_cap() {
        let tokens = HashMap::new();
        assert_eq!(extract_pagination(0, "", &tokens, 10).unwrap(), (10, 0));
        assert_eq!(extract_pagination(50, "", &tokens, 10).unwrap(), (10, 0));
        assert_eq!(extract_pagination(5, "", &tokens, 10).unwrap(), (5, 0));
    }

    #[test]
    fn test_windows() {
        let items = vec![1, 2, 3];
        assert_eq!(limit_to_pagination(items.clone(), 0, 0), (vec![1, 2, 3], false));
        assert_eq!(limit_to_pagination(items.clone(), 0, 1), (vec![1], true));
        assert_eq!(limit_to_pagination(items.clone(), 1, 1), (vec![2], true));
        assert_eq!(limit_to_pagination(items.clone(), 2, 1), (vec![3], false));
        assert_eq!(limit_to_pagination(items.clone(), 1, 5), (vec![2, 3], false));
        assert_eq!(limit_to_pagination(items.clone(), 1, 0), (vec![2, 3], false));
        assert_eq!(limit_to_pagination(items, 7, 2), (Vec::<i32>::new(), false));
    }
}
