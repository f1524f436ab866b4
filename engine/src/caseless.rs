//! Case-insensitive comparisons used for literal text.

fn chars_eq(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

/// Strip `prefix` from the start of `haystack`, comparing case-insensitively.
/// Returns the rest of `haystack` on success.
pub fn strip_prefix_ignore_case<'a>(haystack: &'a str, prefix: &str) -> Option<&'a str> {
    let mut rest = haystack.char_indices();
    let mut end = 0;
    for p in prefix.chars() {
        let (at, h) = rest.next()?;
        if !chars_eq(h, p) {
            return None;
        }
        end = at + h.len_utf8();
    }
    Some(&haystack[end..])
}

/// Byte offsets of every non-overlapping case-insensitive occurrence of
/// `needle` in `haystack`, left to right.
pub fn find_all_ignore_case(haystack: &str, needle: &str) -> Vec<usize> {
    let mut found = Vec::new();
    if needle.is_empty() {
        return found;
    }

    let mut at = 0;
    while at < haystack.len() {
        match strip_prefix_ignore_case(&haystack[at..], needle) {
            Some(rest) => {
                found.push(at);
                at = haystack.len() - rest.len();
            }
            None => {
                at += haystack[at..].chars().next().map_or(1, char::len_utf8);
            }
        }
    }
    found
}
