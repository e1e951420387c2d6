use std::borrow::Cow;

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

/// Terminal cells occupied by `s`.
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// First line of a possibly multi-line task text.
pub fn first_line(s: &str) -> &str {
    s.lines().next().unwrap_or("")
}

/// Shorten `s` to at most `max_cells` terminal cells, marking the cut with `…`.
/// Never splits a grapheme cluster.
pub fn fit_width(s: &str, max_cells: usize) -> Cow<'_, str> {
    if display_width(s) <= max_cells {
        return Cow::Borrowed(s);
    }
    if max_cells == 0 {
        return Cow::Borrowed("");
    }

    let budget = max_cells - 1;
    let mut used = 0;
    let mut out = String::new();
    for grapheme in s.graphemes(true) {
        let w = UnicodeWidthStr::width(grapheme);
        if used + w > budget {
            break;
        }
        used += w;
        out.push_str(grapheme);
    }
    out.push('…');
    Cow::Owned(out)
}
