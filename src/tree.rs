use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use eframe::{
    egui::{self, Key, Sense, TextStyle, TextureHandle},
    emath::{Align2, Pos2, Rect, Vec2},
};
use epaint::Color32;
use regex::{Regex, RegexBuilder};

use crate::report::{truncate, ImageReport, MetadataEntry};

pub const COLUMN_NAMES: [&str; 4] = ["Name", "Pixel size", "Resolution", "Bit depth"];
pub const DEFAULT_COLUMN_WIDTHS: [f32; 4] = [300., 300., 100., 50.];

const INDENT: f32 = 20.;
const CELL_PADDING: f32 = 4.;
const SWATCH_GAP: f32 = 2.;
const MAX_SWATCHES: usize = 64;

/// A visible line of the tree. Top level rows point at a report, child rows
/// also at one of its entries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TreeRow {
    pub depth: usize,
    pub report: usize,
    pub entry: Option<usize>,
    pub expanded: bool,
}

impl TreeRow {
    fn file(report: usize, expanded: bool) -> TreeRow {
        TreeRow {
            depth: 0,
            report,
            entry: None,
            expanded,
        }
    }

    fn child(report: usize, entry: usize) -> TreeRow {
        TreeRow {
            depth: 1,
            report,
            entry: Some(entry),
            expanded: false,
        }
    }
}

//Rows are kept flat like a directory listing, children directly after
//their file. Expanding inserts, collapsing drains the deeper rows.
pub struct MetadataTree {
    reports: Vec<ImageReport>,
    thumbnails: HashMap<PathBuf, TextureHandle>,
    rows: Vec<TreeRow>,
    selected_index: usize,
    //file selected before the last clear, picked again once it is back
    reselect: Option<PathBuf>,
    should_scroll: bool,
    filter: String,
    regex: Option<Regex>,
    filter_error: Option<String>,
    focus_filter: bool,
    column_widths: [f32; 4],
    max_value_chars: usize,
}

impl MetadataTree {
    pub fn new(column_widths: [f32; 4], max_value_chars: usize) -> Self {
        Self {
            reports: vec![],
            thumbnails: HashMap::new(),
            rows: vec![],
            selected_index: 0,
            reselect: None,
            should_scroll: false,
            filter: String::new(),
            regex: None,
            filter_error: None,
            focus_filter: false,
            column_widths,
            max_value_chars,
        }
    }

    /// Drops every file, used when a new scan starts. The filter stays.
    pub fn clear(&mut self) {
        if let Some(row) = self.rows.get(self.selected_index) {
            self.reselect = Some(self.reports[row.report].path.clone());
        }
        self.reports.clear();
        self.thumbnails.clear();
        self.rows.clear();
        self.selected_index = 0;
    }

    pub fn push_report(&mut self, report: ImageReport) {
        let index = self.reports.len();
        let visible = self.report_matches(&report);
        self.reports.push(report);

        if visible {
            self.rows.push(TreeRow::file(index, false));
        }

        if self.reselect.as_deref() == Some(self.reports[index].path.as_path()) {
            if let Some(i) = self.row_of(&self.reports[index].path) {
                self.selected_index = i;
                self.should_scroll = true;
            }
            self.reselect = None;
        }
    }

    fn row_of(&self, path: &Path) -> Option<usize> {
        self.rows
            .iter()
            .position(|r| r.entry.is_none() && self.reports[r.report].path == path)
    }

    pub fn set_thumbnail(&mut self, path: PathBuf, texture: TextureHandle) {
        self.thumbnails.insert(path, texture);
    }

    pub fn reports(&self) -> &[ImageReport] {
        &self.reports
    }

    pub fn rows(&self) -> &[TreeRow] {
        &self.rows
    }

    pub fn selected_index(&self) -> usize {
        self.selected_index
    }

    pub fn visible_files(&self) -> usize {
        self.rows.iter().filter(|r| r.entry.is_none()).count()
    }

    pub fn filter_error(&self) -> Option<&str> {
        self.filter_error.as_deref()
    }

    pub fn request_filter_focus(&mut self) {
        self.focus_filter = true;
    }

    /// Case insensitive regex over file names, tags and values. An invalid
    /// pattern shows everything and keeps the error for display.
    pub fn set_filter(&mut self, pattern: &str) {
        self.filter = pattern.to_string();
        self.apply_filter();
    }

    fn apply_filter(&mut self) {
        self.filter_error = None;
        self.regex = if self.filter.is_empty() {
            None
        } else {
            match RegexBuilder::new(&self.filter).case_insensitive(true).build() {
                Ok(re) => Some(re),
                Err(e) => {
                    tracing::debug!("Invalid filter regex -> {e}");
                    self.filter_error = Some(e.to_string());
                    None
                }
            }
        };

        let expanded: HashSet<usize> = self
            .rows
            .iter()
            .filter(|r| r.entry.is_none() && r.expanded)
            .map(|r| r.report)
            .collect();
        self.rows = self.build_rows(|i| expanded.contains(&i));
        self.clamp_selection();
    }

    fn name_matches(&self, report: &ImageReport) -> bool {
        self.regex.as_ref().map_or(true, |re| re.is_match(&report.name))
    }

    fn entry_matches(&self, entry: &MetadataEntry) -> bool {
        self.regex
            .as_ref()
            .map_or(true, |re| re.is_match(&entry.tag) || re.is_match(&entry.value))
    }

    fn report_matches(&self, report: &ImageReport) -> bool {
        self.name_matches(report) || report.entries.iter().any(|e| self.entry_matches(e))
    }

    /// All entries when the file name matched, otherwise only the entries
    /// that did.
    fn visible_entries(&self, report: &ImageReport) -> Vec<usize> {
        if self.name_matches(report) {
            (0..report.entries.len()).collect()
        } else {
            report
                .entries
                .iter()
                .enumerate()
                .filter(|(_, e)| self.entry_matches(e))
                .map(|(i, _)| i)
                .collect()
        }
    }

    fn build_rows(&self, is_expanded: impl Fn(usize) -> bool) -> Vec<TreeRow> {
        let mut rows = vec![];
        for (i, report) in self.reports.iter().enumerate() {
            if !self.report_matches(report) {
                continue;
            }

            let expanded = is_expanded(i);
            rows.push(TreeRow::file(i, expanded));
            if expanded {
                rows.extend(
                    self.visible_entries(report)
                        .into_iter()
                        .map(|entry| TreeRow::child(i, entry)),
                );
            }
        }
        rows
    }

    fn clamp_selection(&mut self) {
        if self.selected_index >= self.rows.len() {
            self.selected_index = self.rows.len().saturating_sub(1);
        }
    }

    pub fn expand_all(&mut self) {
        self.rows = self.build_rows(|_| true);
        self.clamp_selection();
    }

    pub fn collapse_all(&mut self) {
        let selected_report = self.rows.get(self.selected_index).map(|r| r.report);
        self.rows = self.build_rows(|_| false);
        self.selected_index = selected_report
            .and_then(|report| self.rows.iter().position(|r| r.report == report))
            .unwrap_or(0);
    }

    pub fn toggled_at(&mut self, i: usize) {
        match self.rows.get(i).copied() {
            Some(row) if row.entry.is_some() => self.selected_index = i,
            Some(row) if row.expanded => self.close_at(i),
            Some(_) => self.open_at(i),
            None => {}
        }
    }

    pub fn open_at(&mut self, i: usize) {
        let Some(row) = self.rows.get_mut(i) else {
            return;
        };
        if row.entry.is_some() || row.expanded {
            return;
        }

        row.expanded = true;
        let report = row.report;
        self.selected_index = i;

        let children: Vec<TreeRow> = self
            .visible_entries(&self.reports[report])
            .into_iter()
            .map(|entry| TreeRow::child(report, entry))
            .collect();

        let at = i + 1;
        self.rows.splice(at..at, children);
    }

    /// Collapses the file at `i`. On a child row this collapses its file.
    pub fn close_at(&mut self, i: usize) {
        let Some(row) = self.rows.get(i) else {
            return;
        };

        let i = if row.entry.is_some() {
            match self.rows[..i].iter().rposition(|r| r.entry.is_none()) {
                Some(parent) => parent,
                None => return,
            }
        } else {
            i
        };

        let toggled = &mut self.rows[i];
        if !toggled.expanded {
            return;
        }
        toggled.expanded = false;
        let depth = toggled.depth;

        let removed = self.rows[i + 1..]
            .iter()
            .take_while(|r| r.depth > depth)
            .count();
        self.rows.drain(i + 1..i + 1 + removed);

        //A removed row that was selected moves the selection to its file
        if (i + 1..i + 1 + removed).contains(&self.selected_index) {
            self.selected_index = i;
        } else if self.selected_index > i + removed {
            self.selected_index -= removed;
        }
    }

    pub fn select_next(&mut self) {
        if self.selected_index + 1 < self.rows.len() {
            self.selected_index += 1;
            self.should_scroll = true;
        }
    }

    pub fn select_prev(&mut self) {
        if self.selected_index > 0 {
            self.selected_index -= 1;
            self.should_scroll = true;
        }
    }

    /// Arrow keys move and open/close, space toggles.
    pub fn handle_keys(&mut self, ctx: &egui::Context) {
        if ctx.input(|i| i.key_pressed(Key::ArrowDown)) {
            self.select_next();
        }

        if ctx.input(|i| i.key_pressed(Key::ArrowUp)) {
            self.select_prev();
        }

        if ctx.input(|i| i.key_pressed(Key::ArrowRight)) {
            self.open_at(self.selected_index);
        }

        if ctx.input(|i| i.key_pressed(Key::ArrowLeft)) {
            self.close_at(self.selected_index);
            self.should_scroll = true;
        }

        if ctx.input(|i| i.key_pressed(Key::Space)) {
            self.toggled_at(self.selected_index);
        }
    }

    pub fn ui(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label("Filter");
            let resp = ui.add(
                egui::TextEdit::singleline(&mut self.filter)
                    .hint_text("Regex over names, tags and values")
                    .desired_width(300.),
            );
            if self.focus_filter {
                resp.request_focus();
                self.focus_filter = false;
            }
            if resp.changed() {
                self.apply_filter();
            }
            if let Some(err) = &self.filter_error {
                ui.colored_label(Color32::from_rgb(220, 90, 90), "Invalid regex")
                    .on_hover_text(err);
            }
            ui.label(format!(
                "{} of {} files",
                self.visible_files(),
                self.reports.len()
            ));
        });

        ui.separator();

        let row_height = ui.text_style_height(&TextStyle::Body) + 4.;
        let total_width = self.column_widths.iter().sum::<f32>().max(ui.available_width());

        let (header_rect, _) =
            ui.allocate_exact_size(Vec2::new(total_width, row_height), Sense::hover());
        let mut x = header_rect.left();
        for (name, width) in COLUMN_NAMES.iter().zip(self.column_widths) {
            let cell = Rect::from_min_size(Pos2::new(x, header_rect.top()), Vec2::new(width, row_height));
            paint_cell(ui, cell, name, ui.visuals().strong_text_color());
            x += width;
        }

        ui.separator();

        let mut scroll_area = egui::ScrollArea::both().auto_shrink([false, false]);
        if self.should_scroll {
            let spacing = ui.spacing().item_spacing.y;
            let target = self.selected_index as f32 * (row_height + spacing)
                - ui.available_height() / 2.;
            scroll_area = scroll_area.vertical_scroll_offset(target.max(0.));
            self.should_scroll = false;
        }

        let mut clicked = None;
        scroll_area.show_rows(ui, row_height, self.rows.len(), |ui, range| {
            for i in range {
                let row = self.rows[i];
                let resp = self.row_ui(ui, i, &row, Vec2::new(total_width, row_height));
                if resp.clicked() {
                    clicked = Some(i);
                }
            }
        });

        if let Some(i) = clicked {
            self.toggled_at(i);
        }
    }

    fn row_ui(&self, ui: &mut egui::Ui, i: usize, row: &TreeRow, size: Vec2) -> egui::Response {
        let (rect, resp) = ui.allocate_exact_size(size, Sense::click());
        let visuals = ui.visuals();

        if i == self.selected_index {
            ui.painter().rect_filled(rect, 2., visuals.selection.bg_fill);
        } else if resp.hovered() {
            ui.painter()
                .rect_filled(rect, 2., visuals.widgets.hovered.weak_bg_fill);
        }

        let text_color = if i == self.selected_index {
            visuals.selection.stroke.color
        } else {
            visuals.text_color()
        };

        let report = &self.reports[row.report];
        let [name_w, size_w, res_w, depth_w] = self.column_widths;
        let mut x = rect.left();
        let cell = |x: f32, w: f32| Rect::from_min_size(Pos2::new(x, rect.top()), Vec2::new(w, rect.height()));

        match row.entry {
            None => {
                let arrow = if row.expanded { "⏷" } else { "⏵" };
                let arrow_rect = cell(x, INDENT);
                paint_cell(ui, arrow_rect, arrow, text_color);

                let icon_rect = Rect::from_min_size(
                    Pos2::new(x + INDENT, rect.top() + 1.),
                    Vec2::splat(rect.height() - 2.),
                );
                let name_x = match self.thumbnails.get(&report.path) {
                    Some(texture) => {
                        ui.painter().image(
                            texture.id(),
                            fit_icon(icon_rect, texture.size_vec2()),
                            Rect::from_min_max(Pos2::ZERO, Pos2::new(1., 1.)),
                            Color32::WHITE,
                        );
                        icon_rect.right() + CELL_PADDING
                    }
                    None => x + INDENT,
                };

                paint_cell(ui, cell(name_x, name_w - (name_x - x)), &report.name, text_color);
                x += name_w;
                paint_cell(ui, cell(x, size_w), &report.pixel_size(), text_color);
                x += size_w;
                paint_cell(ui, cell(x, res_w), &report.resolution_text(), text_color);
                x += res_w;
                paint_cell(ui, cell(x, depth_w), &report.bit_depth_text(), text_color);

                resp.on_hover_text(report.path.display().to_string())
            }
            Some(entry) => {
                let entry = &report.entries[entry];
                x += INDENT * row.depth as f32;

                paint_cell(ui, cell(x, name_w - INDENT), &entry.tag, text_color);
                x = rect.left() + name_w;

                let value_w = size_w + res_w + depth_w;
                let value = truncate(&entry.value, self.max_value_chars);
                let text_rect = paint_cell(ui, cell(x, value_w), &value, text_color);

                if let Some(swatches) = &entry.swatches {
                    paint_swatches(ui, text_rect.right() + CELL_PADDING, rect, swatches);
                }

                if value != entry.value {
                    resp.on_hover_text(entry.value.as_str())
                } else {
                    resp
                }
            }
        }
    }
}

/// Paints left aligned text clipped to `cell`, returns the text's rect.
fn paint_cell(ui: &egui::Ui, cell: Rect, text: &str, color: Color32) -> Rect {
    let font = TextStyle::Body.resolve(ui.style());
    ui.painter().with_clip_rect(cell).text(
        Pos2::new(cell.left() + CELL_PADDING, cell.center().y),
        Align2::LEFT_CENTER,
        text,
        font,
        color,
    )
}

fn paint_swatches(ui: &egui::Ui, left: f32, row: Rect, swatches: &[[u8; 3]]) {
    let side = row.height() - 6.;
    let mut x = left;
    for [r, g, b] in swatches.iter().take(MAX_SWATCHES) {
        let swatch = Rect::from_min_size(Pos2::new(x, row.top() + 3.), Vec2::splat(side));
        ui.painter()
            .with_clip_rect(row)
            .rect_filled(swatch, 0., Color32::from_rgb(*r, *g, *b));
        x += side + SWATCH_GAP;
    }
}

fn fit_icon(slot: Rect, image: Vec2) -> Rect {
    if image.x <= 0. || image.y <= 0. {
        return slot;
    }
    let scale = (slot.width() / image.x).min(slot.height() / image.y);
    Rect::from_center_size(slot.center(), image * scale)
}
