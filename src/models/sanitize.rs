use std::collections::BTreeMap;
use tracing::debug;

const MAX_PROPERTY_KEY_LEN: usize = 150;
const MAX_PROPERTY_VALUE_LEN: usize = 8192;

/// Truncation of fields to the limits the ingestion service enforces,
/// applied once when an envelope is buffered.
pub(crate) trait Sanitize {
    fn sanitize(&mut self);
}

/// Truncate a string to at most `max_len` bytes without splitting a
/// multi-byte character: the cut index is walked back to the nearest char
/// boundary.
pub(crate) fn truncate_chars(s: &mut String, max_len: usize) {
    if s.len() <= max_len {
        return;
    }
    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s.truncate(end);
}

impl Sanitize for BTreeMap<String, String> {
    fn sanitize(&mut self) {
        if self.keys().any(|k| k.len() > MAX_PROPERTY_KEY_LEN) {
            // Keys cannot be mutated in place; rebuild the map. When two
            // keys truncate to the same name the later one wins.
            let entries = std::mem::take(self);
            for (mut key, value) in entries {
                truncate_chars(&mut key, MAX_PROPERTY_KEY_LEN);
                if self.insert(key, value).is_some() {
                    debug!("truncated property name collides with an existing property");
                }
            }
        }
        for value in self.values_mut() {
            truncate_chars(value, MAX_PROPERTY_VALUE_LEN);
        }
    }
}
