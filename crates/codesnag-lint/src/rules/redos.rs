//! Structural scan of regular expression sources for nested repetition.
//!
//! A group that is itself repeated without bound and contains another
//! unbounded repetition (`(a+)+`, `(\w*)*`, `(?:x+y?){2,}`) gives a
//! backtracking engine exponentially many ways to split the same input.

/// Location of the first problem found, as byte offsets into the pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NestedQuantifier {
    /// Start of the repeated group.
    pub group_start: usize,
    /// Offset of the outer quantifier.
    pub quantifier: usize,
}

struct Group {
    start: usize,
    has_unbounded: bool,
}

/// Reads a quantifier at `i`; returns (is_unbounded, length) or `None`.
fn quantifier_at(bytes: &[u8], i: usize) -> Option<(bool, usize)> {
    match bytes.get(i)? {
        b'+' | b'*' => Some((true, 1)),
        b'?' => Some((false, 1)),
        b'{' => {
            let close = bytes[i..].iter().position(|b| *b == b'}')? + i;
            let body = std::str::from_utf8(&bytes[i + 1..close]).ok()?;
            let (min, max) = match body.split_once(',') {
                Some((min, max)) => (min, Some(max)),
                None => (body, None),
            };
            if min.is_empty() || !min.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            let unbounded = match max {
                Some(max) if max.is_empty() => true,
                Some(max) if max.bytes().all(|b| b.is_ascii_digit()) => false,
                Some(_) => return None,
                None => false,
            };
            Some((unbounded, close - i + 1))
        }
        _ => None,
    }
}

/// Finds the first group with nested unbounded repetition.
pub fn find_nested_quantifier(pattern: &str) -> Option<NestedQuantifier> {
    let bytes = pattern.as_bytes();
    let mut stack: Vec<Group> = vec![Group {
        start: 0,
        has_unbounded: false,
    }];
    // whether the last atom was a group that contained unbounded repetition
    let mut last_group: Option<(usize, bool)> = None;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                last_group = None;
                i += 2;
                continue;
            }
            b'[' => {
                last_group = None;
                i += 1;
                if bytes.get(i) == Some(&b'^') {
                    i += 1;
                }
                if bytes.get(i) == Some(&b']') {
                    i += 1;
                }
                while i < bytes.len() && bytes[i] != b']' {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
                i += 1;
                continue;
            }
            b'(' => {
                stack.push(Group {
                    start: i,
                    has_unbounded: false,
                });
                last_group = None;
                i += 1;
                continue;
            }
            b')' => {
                if stack.len() > 1 {
                    if let Some(group) = stack.pop() {
                        last_group = Some((group.start, group.has_unbounded));
                        if group.has_unbounded {
                            if let Some(parent) = stack.last_mut() {
                                parent.has_unbounded = true;
                            }
                        }
                    }
                }
                i += 1;
                continue;
            }
            _ => {}
        }

        if let Some((unbounded, len)) = quantifier_at(bytes, i) {
            if unbounded {
                if let Some((start, true)) = last_group {
                    return Some(NestedQuantifier {
                        group_start: start,
                        quantifier: i,
                    });
                }
                if let Some(current) = stack.last_mut() {
                    current.has_unbounded = true;
                }
            }
            last_group = None;
            i += len;
            // lazy suffix
            if bytes.get(i) == Some(&b'?') {
                i += 1;
            }
            continue;
        }

        last_group = None;
        i += 1;
    }
    None
}
