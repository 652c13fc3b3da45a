use std::path::Path;

use eframe::egui::{self, text::CCursor, text::CCursorRange, Response};

pub fn textedit_move_cursor_to_end(resp: &Response, ui: &mut egui::Ui, len: usize) {
    if let Some(mut state) = egui::TextEdit::load_state(ui.ctx(), resp.id) {
        state
            .cursor
            .set_char_range(Some(CCursorRange::one(CCursor::new(len))));
        state.store(ui.ctx(), resp.id);
        resp.request_focus();
    }
}

///Return true if directory starts with '.'
pub fn is_dir_hidden(path: &Path) -> bool {
    path.file_name()
        .unwrap_or_default()
        .to_str()
        .unwrap_or_default()
        .starts_with('.')
}

/// egui key names are capitalized, config files usually are not.
pub fn capitalize_first_char(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
