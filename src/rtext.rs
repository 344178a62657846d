//! In-place text editor for text-bearing objects.
//!
//! An [`RText`] owns a UTF-8 buffer plus a byte-offset selection. Mutation
//! happens in byte space; everything reported outward (line spans, caret,
//! selection) is available in character space too, because the renderer
//! addresses text by character.
//!
//! # Layout
//!
//! [`layout_text`] wraps a buffer at a column width `W` (characters). Each
//! line ends at the first of:
//!
//! - an embedded `'\n'` within the next `W` characters (consumed),
//! - the last space at or before column `W` when more than `W` characters
//!   remain (consumed),
//! - exactly `W` characters when there is no space to break at,
//! - the end of the buffer.
//!
//! # Usage
//!
//! ```rust,ignore
//! let mut rt = RText::new(ObjectId(1), "osc~ 440", None, TextStyle::Box);
//! rt.activate();
//! rt.key(TextKey::End);
//! rt.key(TextKey::Char('0'));
//! assert_eq!(rt.text(), "osc~ 4400");
//! ```

use crate::model::ObjectId;
use crate::utf8;

/// Pixel metrics used to turn columns and rows into a box size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextMetrics {
    pub font_width: i32,
    pub font_height: i32,
    /// Total horizontal margin (left + right).
    pub margin_x: i32,
    /// Total vertical margin (top + bottom).
    pub margin_y: i32,
    /// Wrap column used when the object carries no explicit width.
    pub default_width: usize,
}

impl Default for TextMetrics {
    fn default() -> Self {
        Self {
            font_width: 7,
            font_height: 16,
            margin_x: 2,
            margin_y: 2,
            default_width: 60,
        }
    }
}

/// Padding rule for the box: object and message boxes never shrink below
/// three columns, comments may shrink to one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextStyle {
    Box,
    Comment,
}

impl TextStyle {
    fn min_columns(self) -> usize {
        match self {
            TextStyle::Box => 3,
            TextStyle::Comment => 1,
        }
    }
}

/// One wrapped line, in both byte and character coordinates of the source buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSpan {
    pub byte_start: usize,
    pub byte_end: usize,
    pub char_start: usize,
    pub char_end: usize,
}

impl LineSpan {
    pub fn chars(&self) -> usize {
        self.char_end - self.char_start
    }
}

/// Result of wrapping a buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextLayout {
    pub lines: Vec<LineSpan>,
    /// The buffer with a `'\n'` between consecutive lines, as the renderer shows it.
    pub wrapped: String,
    pub columns: usize,
    pub width_px: i32,
    pub height_px: i32,
    /// Selection as byte offsets into `wrapped`.
    pub sel_bytes: (usize, usize),
    /// Selection as character offsets into `wrapped`.
    pub sel_chars: (usize, usize),
}

impl TextLayout {
    pub fn rows(&self) -> usize {
        self.lines.len()
    }
}

/// Wrap `buf` and map the byte selection `sel` onto the wrapped text.
pub fn layout_text(
    buf: &str,
    width: Option<usize>,
    style: TextStyle,
    sel: (usize, usize),
    metrics: &TextMetrics,
) -> TextLayout {
    let limit = width.unwrap_or(metrics.default_width).max(1);
    let total_c = utf8::char_count(buf);
    let mut lines = Vec::new();
    let mut wrapped = String::with_capacity(buf.len() + 8);
    let mut sel_bytes = (0, 0);
    let mut start_b = 0;
    let mut start_c = 0;
    let mut columns = 0;

    while start_c < total_c {
        let rest = &buf[start_b..];
        let remaining_c = total_c - start_c;
        let max_c = remaining_c.min(limit);
        let max_b = utf8::char_to_byte(rest, max_c);

        let (found_b, found_c, eat) = match rest[..max_b].find('\n') {
            Some(nl) => (nl, utf8::byte_to_char(rest, nl), 1),
            None if remaining_c > limit => {
                // a space one past the window is still a valid break
                let upto = utf8::next_boundary(rest, max_b);
                match rest[..upto].rfind(' ') {
                    Some(sp) => (sp, utf8::byte_to_char(rest, sp), 1),
                    None => (max_b, max_c, 0),
                }
            }
            None => (rest.len(), remaining_c, 0),
        };

        let out_start = wrapped.len();
        if sel.0 >= start_b && sel.0 <= start_b + found_b + eat {
            sel_bytes.0 = sel.0 - start_b + out_start;
        }
        if sel.1 >= start_b && sel.1 <= start_b + found_b + eat {
            sel_bytes.1 = sel.1 - start_b + out_start;
        }
        wrapped.push_str(&rest[..found_b]);
        lines.push(LineSpan {
            byte_start: start_b,
            byte_end: start_b + found_b,
            char_start: start_c,
            char_end: start_c + found_c,
        });
        start_b += found_b + eat;
        start_c += found_c + eat;
        if start_b < buf.len() {
            wrapped.push('\n');
        }
        columns = columns.max(found_c);
    }
    if lines.is_empty() {
        lines.push(LineSpan {
            byte_start: 0,
            byte_end: 0,
            char_start: 0,
            char_end: 0,
        });
    }
    // a selection past a consumed break clamps to the output end
    sel_bytes.0 = utf8::floor_boundary(&wrapped, sel_bytes.0);
    sel_bytes.1 = utf8::floor_boundary(&wrapped, sel_bytes.1);

    let columns = match width {
        Some(w) => w,
        None => columns.max(style.min_columns()),
    };
    let sel_chars = (
        utf8::byte_to_char(&wrapped, sel_bytes.0),
        utf8::byte_to_char(&wrapped, sel_bytes.1),
    );
    TextLayout {
        width_px: columns as i32 * metrics.font_width + metrics.margin_x,
        height_px: lines.len() as i32 * metrics.font_height + metrics.margin_y,
        lines,
        wrapped,
        columns,
        sel_bytes,
        sel_chars,
    }
}

/// Byte offset in `buf` closest to the pixel position `(x, y)` relative to
/// the text origin. Positions below the last line map to the buffer end.
pub fn hit_index(buf: &str, layout: &TextLayout, x: i32, y: i32, metrics: &TextMetrics) -> usize {
    let fw = metrics.font_width.max(1);
    let fh = metrics.font_height.max(1);
    let find_x = (x + fw / 2).div_euclid(fw);
    let find_y = y.div_euclid(fh);
    if find_y < 0 {
        return buf.len();
    }
    match layout.lines.get(find_y as usize) {
        Some(line) => {
            let col = (find_x.max(0) as usize).min(line.chars());
            line.byte_start + utf8::char_to_byte(&buf[line.byte_start..], col)
        }
        None => buf.len(),
    }
}

/// Navigation and editing keys understood by the text editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextKey {
    Char(char),
    BackSpace,
    Delete,
    Home,
    End,
    Left,
    Right,
    Up,
    Down,
}

/// Kind of mouse gesture delivered to the text editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextMouse {
    Down,
    DoubleClick,
    ShiftClick,
    Drag,
}

const SEPARATORS: [u8; 4] = [b' ', b'\n', b';', b','];

/// Editable text buffer bound to one object.
#[derive(Debug, Clone)]
pub struct RText {
    owner: ObjectId,
    buf: String,
    sel_start: usize,
    sel_end: usize,
    active: bool,
    drag_from: Option<usize>,
    dirty: bool,
    width: Option<usize>,
    style: TextStyle,
}

impl RText {
    pub fn new(owner: ObjectId, text: &str, width: Option<usize>, style: TextStyle) -> Self {
        Self {
            owner,
            buf: text.to_string(),
            sel_start: 0,
            sel_end: 0,
            active: false,
            drag_from: None,
            dirty: false,
            width,
            style,
        }
    }

    pub fn owner(&self) -> ObjectId {
        self.owner
    }

    pub fn text(&self) -> &str {
        &self.buf
    }

    pub fn selection(&self) -> (usize, usize) {
        (self.sel_start, self.sel_end)
    }

    pub fn selected_text(&self) -> &str {
        &self.buf[self.sel_start..self.sel_end]
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// True once the buffer differs from what the owner was built from.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn width(&self) -> Option<usize> {
        self.width
    }

    /// Start editing with the whole buffer selected.
    pub fn activate(&mut self) {
        self.active = true;
        self.dirty = false;
        self.drag_from = None;
        self.select_all();
    }

    /// Stop editing. Returns whether the buffer was modified.
    pub fn deactivate(&mut self) -> bool {
        self.active = false;
        self.drag_from = None;
        self.sel_start = 0;
        self.sel_end = 0;
        std::mem::take(&mut self.dirty)
    }

    pub fn select_all(&mut self) {
        self.sel_start = 0;
        self.sel_end = self.buf.len();
    }

    /// Change the wrap column; the buffer and selection stay as they are.
    pub fn set_width(&mut self, width: Option<usize>) {
        self.width = width;
    }

    pub fn layout(&self, metrics: &TextMetrics) -> TextLayout {
        layout_text(
            &self.buf,
            self.width,
            self.style,
            (self.sel_start, self.sel_end),
            metrics,
        )
    }

    fn delete_selection(&mut self) -> bool {
        if self.sel_end <= self.sel_start {
            self.sel_end = self.sel_start;
            return false;
        }
        self.buf.replace_range(self.sel_start..self.sel_end, "");
        self.sel_end = self.sel_start;
        true
    }

    /// Replace the selection with `s`, dropping control characters other
    /// than newline and tab.
    pub fn insert_str(&mut self, s: &str) {
        let mut changed = self.delete_selection();
        for c in s.chars() {
            changed |= self.insert_char(c);
        }
        if changed {
            self.dirty = true;
        }
    }

    fn insert_char(&mut self, c: char) -> bool {
        let c = if c == '\r' { '\n' } else { c };
        let printable = c == '\n' || c == '\t' || (c as u32 > 31 && c as u32 != 127);
        if !printable {
            return false;
        }
        self.buf.insert(self.sel_start, c);
        self.sel_start += c.len_utf8();
        self.sel_end = self.sel_start;
        true
    }

    /// Delete the selection without touching the clipboard.
    pub fn cut_selection(&mut self) -> String {
        let taken = self.selected_text().to_string();
        if self.delete_selection() {
            self.dirty = true;
        }
        taken
    }

    /// Apply one key. Returns true when the buffer content changed.
    pub fn key(&mut self, key: TextKey) -> bool {
        let len = self.buf.len();
        let collapsed = self.sel_start == self.sel_end;
        match key {
            TextKey::BackSpace => {
                if collapsed && self.sel_start > 0 {
                    self.sel_start = utf8::prev_boundary(&self.buf, self.sel_start);
                }
                let changed = self.delete_selection();
                self.dirty |= changed;
                changed
            }
            TextKey::Delete => {
                if collapsed && self.sel_end < len {
                    self.sel_end = utf8::next_boundary(&self.buf, self.sel_end);
                }
                let changed = self.delete_selection();
                self.dirty |= changed;
                changed
            }
            TextKey::Char(c) => {
                let mut changed = self.delete_selection();
                changed |= self.insert_char(c);
                self.dirty |= changed;
                changed
            }
            TextKey::Home => {
                if collapsed {
                    self.sel_end = 0;
                }
                self.sel_start = 0;
                false
            }
            TextKey::End => {
                if collapsed {
                    self.sel_start = len;
                }
                self.sel_end = len;
                false
            }
            TextKey::Right => {
                if collapsed && self.sel_start < len {
                    self.sel_start = utf8::next_boundary(&self.buf, self.sel_start);
                    self.sel_end = self.sel_start;
                } else {
                    self.sel_start = self.sel_end;
                }
                false
            }
            TextKey::Left => {
                if collapsed && self.sel_start > 0 {
                    self.sel_start = utf8::prev_boundary(&self.buf, self.sel_start);
                    self.sel_end = self.sel_start;
                } else {
                    self.sel_end = self.sel_start;
                }
                false
            }
            TextKey::Up => {
                let line_start = self.line_start(self.sel_start);
                let target = if line_start == 0 {
                    0
                } else {
                    self.line_start(line_start - 1)
                };
                self.sel_start = target;
                self.sel_end = target;
                false
            }
            TextKey::Down => {
                let bytes = self.buf.as_bytes();
                let mut pos = self.sel_end;
                while pos < len && bytes[pos] != b'\n' {
                    pos += 1;
                }
                if pos < len {
                    pos += 1;
                }
                self.sel_start = pos;
                self.sel_end = pos;
                false
            }
        }
    }

    fn line_start(&self, pos: usize) -> usize {
        self.buf.as_bytes()[..pos.min(self.buf.len())]
            .iter()
            .rposition(|&b| b == b'\n')
            .map(|i| i + 1)
            .unwrap_or(0)
    }

    /// Handle a click or drag at `(x, y)` relative to the text origin.
    pub fn mouse(&mut self, x: i32, y: i32, flag: TextMouse, metrics: &TextMetrics) {
        let layout = self.layout(metrics);
        let idx = hit_index(&self.buf, &layout, x, y, metrics);
        match flag {
            TextMouse::Down => {
                self.drag_from = Some(idx);
                self.sel_start = idx;
                self.sel_end = idx;
            }
            TextMouse::DoubleClick => {
                self.drag_from = None;
                let (start, end) = self.word_bounds(idx);
                self.sel_start = start;
                self.sel_end = end;
            }
            TextMouse::ShiftClick => {
                if idx * 2 > self.sel_start + self.sel_end {
                    self.drag_from = Some(self.sel_start);
                    self.sel_end = idx;
                } else {
                    self.drag_from = Some(self.sel_end);
                    self.sel_start = idx;
                }
            }
            TextMouse::Drag => {
                let Some(from) = self.drag_from else {
                    return;
                };
                self.sel_start = from.min(idx);
                self.sel_end = from.max(idx);
            }
        }
    }

    /// Span around byte offset `idx` bounded by the nearest separators.
    /// Separators are ASCII, so the scan never lands inside a codepoint.
    pub fn word_bounds(&self, idx: usize) -> (usize, usize) {
        let bytes = self.buf.as_bytes();
        let idx = idx.min(bytes.len());
        let start = bytes[..idx]
            .iter()
            .rposition(|b| SEPARATORS.contains(b))
            .map(|i| i + 1)
            .unwrap_or(0);
        let end = bytes[idx..]
            .iter()
            .position(|b| SEPARATORS.contains(b))
            .map(|i| idx + i)
            .unwrap_or(bytes.len());
        (start, end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics() -> TextMetrics {
        TextMetrics::default()
    }

    fn rt(text: &str) -> RText {
        RText::new(ObjectId(1), text, None, TextStyle::Box)
    }

    #[test]
    fn test_hello_world_single_line() {
        let m = metrics();
        let l = layout_text("hello world", None, TextStyle::Box, (0, 0), &m);
        assert_eq!(l.rows(), 1);
        assert_eq!(l.columns, 11);
        assert_eq!(l.width_px, 2 + 11 * m.font_width);
        assert_eq!(l.height_px, m.font_height + m.margin_y);
        assert_eq!(l.wrapped, "hello world");
    }

    #[test]
    fn test_wrap_at_last_space() {
        let m = metrics();
        let l = layout_text("aaa bbb ccc", Some(5), TextStyle::Box, (0, 0), &m);
        assert_eq!(l.wrapped, "aaa\nbbb\nccc");
        assert_eq!(l.rows(), 3);
        assert_eq!(l.columns, 5, "explicit width is reported as-is");
    }

    #[test]
    fn test_space_just_past_window_breaks() {
        let m = metrics();
        let l = layout_text("abcde fg", Some(5), TextStyle::Box, (0, 0), &m);
        assert_eq!(l.wrapped, "abcde\nfg");
    }

    #[test]
    fn test_hard_break_without_space() {
        let m = metrics();
        let l = layout_text("abcdefghij", Some(4), TextStyle::Box, (0, 0), &m);
        assert_eq!(l.wrapped, "abcd\nefgh\nij");
        assert_eq!(l.lines[1].byte_start, 4);
        assert_eq!(l.lines[1].char_end, 8);
    }

    #[test]
    fn test_embedded_newline_wins() {
        let m = metrics();
        let l = layout_text("ab\ncd", None, TextStyle::Box, (0, 0), &m);
        assert_eq!(l.rows(), 2);
        assert_eq!(l.columns, 3, "padded to the minimum box width");
        let empty = layout_text("", None, TextStyle::Comment, (0, 0), &m);
        assert_eq!(empty.rows(), 1);
        assert_eq!(empty.columns, 1);
    }

    #[test]
    fn test_multibyte_never_split() {
        let m = metrics();
        let text = "äöü€ 東京都 ñ𝄞x";
        for w in 1..8 {
            let l = layout_text(text, Some(w), TextStyle::Box, (0, 0), &m);
            for line in &l.lines {
                assert!(text.is_char_boundary(line.byte_start), "w={w}");
                assert!(text.is_char_boundary(line.byte_end), "w={w}");
                assert!(line.chars() <= w);
                assert_eq!(
                    utf8::byte_to_char(text, line.byte_end) - utf8::byte_to_char(text, line.byte_start),
                    line.chars()
                );
            }
        }
    }

    #[test]
    fn test_selection_mapped_to_chars() {
        let m = metrics();
        let l = layout_text("ä bc", None, TextStyle::Box, (3, 5), &m);
        assert_eq!(l.sel_bytes, (3, 5));
        assert_eq!(l.sel_chars, (2, 4));
    }

    #[test]
    fn test_double_click_selects_word_between_separators() {
        let m = metrics();
        let mut r = rt("foo;bar baz");
        r.activate();
        // 'b' of "bar" is at column 4
        r.mouse(4 * m.font_width, 2, TextMouse::DoubleClick, &m);
        assert_eq!(r.selected_text(), "bar");
        // a drag after a double-click is ignored
        r.mouse(0, 2, TextMouse::Drag, &m);
        assert_eq!(r.selected_text(), "bar");
    }

    #[test]
    fn test_click_then_drag_selects_range() {
        let m = metrics();
        let mut r = rt("hello world");
        r.activate();
        r.mouse(2 * m.font_width, 1, TextMouse::Down, &m);
        assert_eq!(r.selection(), (2, 2));
        r.mouse(5 * m.font_width, 1, TextMouse::Drag, &m);
        assert_eq!(r.selected_text(), "llo");
        r.mouse(0, 1, TextMouse::Drag, &m);
        assert_eq!(r.selected_text(), "he");
    }

    #[test]
    fn test_shift_click_extends_from_far_end() {
        let m = metrics();
        let mut r = rt("0123456789");
        r.activate();
        r.mouse(3 * m.font_width, 1, TextMouse::Down, &m);
        r.mouse(5 * m.font_width, 1, TextMouse::Drag, &m);
        assert_eq!(r.selection(), (3, 5));
        r.mouse(8 * m.font_width, 1, TextMouse::ShiftClick, &m);
        assert_eq!(r.selection(), (3, 8));
        r.mouse(1 * m.font_width, 1, TextMouse::ShiftClick, &m);
        assert_eq!(r.selection(), (1, 8));
    }

    #[test]
    fn test_typing_replaces_selection_and_marks_dirty() {
        let mut r = rt("osc~");
        r.activate();
        assert!(!r.is_dirty());
        r.key(TextKey::Char('p'));
        r.key(TextKey::Char('ö'));
        assert_eq!(r.text(), "pö");
        assert_eq!(r.selection(), (3, 3));
        assert!(r.is_dirty());
        r.key(TextKey::BackSpace);
        assert_eq!(r.text(), "p");
        assert!(r.deactivate());
        assert!(!r.is_active());
    }

    #[test]
    fn test_control_chars_dropped_tab_kept() {
        let mut r = rt("");
        r.activate();
        assert!(!r.key(TextKey::Char('\u{1}')));
        assert!(r.key(TextKey::Char('\t')));
        assert!(r.key(TextKey::Char('\r')));
        assert_eq!(r.text(), "\t\n");
    }

    #[test]
    fn test_delete_forward_multibyte() {
        let mut r = rt("a€b");
        r.activate();
        r.key(TextKey::Left);
        r.key(TextKey::Right);
        assert_eq!(r.selection(), (1, 1));
        r.key(TextKey::Delete);
        assert_eq!(r.text(), "ab");
        r.key(TextKey::End);
        r.key(TextKey::Delete);
        assert_eq!(r.text(), "ab", "delete at end is a no-op");
    }

    #[test]
    fn test_left_right_collapse_selection() {
        let mut r = rt("abcd");
        r.activate();
        r.key(TextKey::Right);
        assert_eq!(r.selection(), (4, 4));
        r.select_all();
        r.key(TextKey::Left);
        assert_eq!(r.selection(), (0, 0));
    }

    #[test]
    fn test_home_end_extend_selection() {
        let mut r = rt("abcdef");
        r.activate();
        r.key(TextKey::Left);
        r.key(TextKey::Right);
        assert_eq!(r.selection(), (1, 1));
        r.key(TextKey::Right);
        r.mouse(4 * 7, 1, TextMouse::ShiftClick, &metrics());
        assert_eq!(r.selection(), (2, 4));
        r.key(TextKey::End);
        assert_eq!(r.selection(), (2, 6));
        r.key(TextKey::Home);
        assert_eq!(r.selection(), (0, 6));
    }

    #[test]
    fn test_up_down_jump_between_lines() {
        let mut r = rt("ab\ncd\nef");
        r.activate();
        r.key(TextKey::Left);
        r.key(TextKey::Down);
        assert_eq!(r.selection(), (3, 3));
        r.key(TextKey::Right);
        r.key(TextKey::Down);
        assert_eq!(r.selection(), (6, 6));
        r.key(TextKey::Right);
        r.key(TextKey::Up);
        assert_eq!(r.selection(), (3, 3));
        r.key(TextKey::Up);
        assert_eq!(r.selection(), (0, 0));
        r.key(TextKey::Up);
        assert_eq!(r.selection(), (0, 0));
    }

    #[test]
    fn test_hit_index_clamps_to_line_end() {
        let m = metrics();
        let r = rt("ab\ncdef");
        let l = r.layout(&m);
        assert_eq!(hit_index(r.text(), &l, 50 * m.font_width, 0, &m), 2);
        assert_eq!(hit_index(r.text(), &l, 0, m.font_height, &m), 3);
        assert_eq!(hit_index(r.text(), &l, 0, 9 * m.font_height, &m), 7);
    }
}
