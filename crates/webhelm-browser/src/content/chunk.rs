//! Boundary-aware splitting.

/// Split `content` into pieces of at most `max_chars` characters.
///
/// Each cut prefers, in order: a blank line, a newline, a sentence end,
/// whitespace, the end of a tag. A boundary is only taken if it keeps at
/// least half of the window; otherwise the window is cut at a character
/// boundary. Concatenating the pieces gives back `content`.
pub fn split(content: &str, max_chars: usize) -> Vec<&str> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut rest = content;

    while !rest.is_empty() {
        let Some((window_end, _)) = rest.char_indices().nth(max_chars) else {
            chunks.push(rest);
            break;
        };
        let window = &rest[..window_end];
        let cut = boundary(window).unwrap_or(window_end);
        chunks.push(&rest[..cut]);
        rest = &rest[cut..];
    }

    chunks
}

/// Byte offset just past the preferred boundary in `window`.
fn boundary(window: &str) -> Option<usize> {
    let min = window.len() / 2;
    let accept = |cut: usize| (cut > 0 && cut >= min).then_some(cut);

    if let Some(cut) = window.rfind("\n\n").and_then(|i| accept(i + 2)) {
        return Some(cut);
    }
    if let Some(cut) = window.rfind('\n').and_then(|i| accept(i + 1)) {
        return Some(cut);
    }
    let sentence = [". ", "! ", "? "]
        .iter()
        .filter_map(|p| window.rfind(p))
        .max();
    if let Some(cut) = sentence.and_then(|i| accept(i + 2)) {
        return Some(cut);
    }
    let space = window
        .char_indices()
        .rev()
        .find(|(_, c)| c.is_whitespace())
        .map(|(i, c)| i + c.len_utf8());
    if let Some(cut) = space.and_then(accept) {
        return Some(cut);
    }
    window.rfind('>').and_then(|i| accept(i + 1))
}
