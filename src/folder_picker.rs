use std::path::{Path, PathBuf};

use eframe::egui::{self, Area, Id, Key};

use crate::utils;

/// Path entry with directory completion plus a native folder dialog.
/// Returns the folder once one is picked.
pub fn ui(input: &mut String, ui: &mut egui::Ui) -> Option<PathBuf> {
    let ctx = ui.ctx().clone();
    let mut picked = None;

    ui.horizontal(|ui| {
        ui.label("Folder");

        if ui.button("Browse…").clicked() {
            picked = browse(input);
        }

        let prev_input = input.clone();
        let editor_resp = ui.add(
            egui::TextEdit::singleline(input)
                .hint_text("Type a folder path")
                .desired_width(ui.available_width()),
        );

        if take_focus_request(&ctx) {
            editor_resp.request_focus();
        }

        let mut suggestions = if input != &prev_input {
            match directory_suggestions(input) {
                Some(suggestions) => {
                    set_suggestions(&ctx, &suggestions);
                    suggestions
                }
                None => get_prev_suggestions(&ctx),
            }
        } else {
            get_prev_suggestions(&ctx)
        };
        suggestions.retain(|p| p.contains(input.as_str()));

        let mut selected_index = get_index(&ctx);
        if selected_index >= suggestions.len() {
            selected_index = 0;
        }

        let enter_pressed =
            editor_resp.lost_focus() && ctx.input(|i| i.key_pressed(Key::Enter));

        if editor_resp.has_focus() {
            if ctx.input(|i| i.key_pressed(Key::ArrowDown))
                && selected_index + 1 < suggestions.len()
            {
                selected_index += 1;
            }

            if ctx.input(|i| i.key_pressed(Key::ArrowUp)) && selected_index > 0 {
                selected_index -= 1;
                //Arrow up moves the cursor to the start of the input
                utils::textedit_move_cursor_to_end(&editor_resp, ui, input.len());
            }

            if !suggestions.is_empty() && ctx.input(|i| i.key_pressed(Key::Tab)) {
                *input = suggestions[selected_index].clone();
                utils::textedit_move_cursor_to_end(&editor_resp, ui, input.len());
            }
        }

        if enter_pressed {
            match selectable_folder(input) {
                Some(folder) if selected_index == 0 || suggestions.is_empty() => {
                    picked = Some(folder);
                }
                _ if !suggestions.is_empty() => {
                    *input = suggestions[selected_index].clone();
                    utils::textedit_move_cursor_to_end(&editor_resp, ui, input.len());
                }
                _ => {}
            }
        }

        set_index(&ctx, selected_index);

        if editor_resp.has_focus() && !suggestions.is_empty() {
            Area::new(Id::new("folder_picker_suggestions"))
                .fixed_pos(editor_resp.rect.left_bottom())
                .order(egui::Order::Foreground)
                .show(&ctx, |ui| {
                    egui::Frame::popup(ui.style()).show(ui, |ui| {
                        ui.set_width(editor_resp.rect.width());
                        for (i, suggestion) in suggestions.iter().enumerate() {
                            if ui
                                .selectable_label(selected_index == i, suggestion)
                                .clicked()
                            {
                                *input = suggestion.clone();
                                utils::textedit_move_cursor_to_end(
                                    &editor_resp,
                                    ui,
                                    input.len(),
                                );
                            }
                        }
                    });
                });
        }
    });

    if let Some(folder) = &picked {
        *input = folder.to_string_lossy().to_string();
        set_suggestions(&ctx, &[]);
    }

    picked
}

/// Opens the platform folder dialog, starting at the typed folder.
pub fn browse(input: &str) -> Option<PathBuf> {
    let mut dialog = rfd::FileDialog::new();
    if let Some(start) = selectable_folder(input) {
        dialog = dialog.set_directory(start);
    }
    dialog.pick_folder()
}

/// Makes the path entry grab keyboard focus on the next frame.
pub fn request_focus(ctx: &egui::Context) {
    ctx.memory_mut(|mem| mem.data.insert_temp::<bool>(get_focus_request_id(), true));
}

fn take_focus_request(ctx: &egui::Context) -> bool {
    ctx.memory_mut(|mem| mem.data.remove_temp::<bool>(get_focus_request_id()))
        .unwrap_or(false)
}

pub fn selectable_folder(input: &str) -> Option<PathBuf> {
    let path = PathBuf::from(input.trim());
    path.is_dir().then_some(path)
}

/// Visible subdirectories of `input`, sorted. `None` when `input` is not a
/// readable directory so the previous suggestions can be kept.
pub fn directory_suggestions(input: &str) -> Option<Vec<String>> {
    let dir_info = Path::new(input).read_dir().ok()?;

    let mut suggestions: Vec<String> = dir_info
        .flatten()
        .filter(|entry| entry.metadata().is_ok_and(|m| m.is_dir()))
        .map(|entry| entry.path())
        .filter(|path| !utils::is_dir_hidden(path))
        .filter_map(|path| path.to_str().map(str::to_string))
        .collect();
    suggestions.sort();

    Some(suggestions)
}

fn get_data_items_id() -> Id {
    Id::new("folder_picker_items")
}

fn get_data_index_id() -> Id {
    Id::new("folder_picker_index")
}

fn get_focus_request_id() -> Id {
    Id::new("folder_picker_focus")
}

fn get_prev_suggestions(ctx: &egui::Context) -> Vec<String> {
    ctx.memory_mut(|mem| {
        let data = mem.data.get_temp::<Vec<String>>(get_data_items_id());
        data.unwrap_or_default()
    })
}

fn set_suggestions(ctx: &egui::Context, suggestions: &[String]) {
    ctx.memory_mut(|mem| {
        mem.data
            .insert_temp::<Vec<String>>(get_data_items_id(), suggestions.to_vec());
    })
}

fn get_index(ctx: &egui::Context) -> usize {
    ctx.memory_mut(|mem| {
        let data = mem.data.get_temp::<usize>(get_data_index_id());
        data.unwrap_or(0)
    })
}

fn set_index(ctx: &egui::Context, index: usize) {
    ctx.memory_mut(|mem| {
        mem.data.insert_temp::<usize>(get_data_index_id(), index);
    })
}
