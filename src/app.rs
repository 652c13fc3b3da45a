use crate::{
    config::{Config, ShortcutConfig},
    folder_picker,
    report::ScanFailure,
    theme,
    tree::MetadataTree,
    watcher::FolderWatcher,
    worker::{self, ScanEvent, Worker},
};
use eframe::egui::{self, TextureOptions, ViewportCommand};
use std::{
    path::PathBuf,
    sync::{mpsc::Receiver, Arc},
    time::Duration,
};

pub const WINDOW_TITLE: &str = "Metadata reader";

pub struct App {
    cfg: Config,
    shortcuts: ShortcutConfig,
    worker: Worker,
    tree: MetadataTree,
    folder_input: String,
    current_folder: Option<PathBuf>,
    scanning: bool,
    failures: Vec<ScanFailure>,
    last_timing: Option<String>,
    worker_message: Option<Arc<String>>,
    watcher: Option<(FolderWatcher, Receiver<PathBuf>)>,
}

impl App {
    pub fn new(cc: &eframe::CreationContext<'_>, folder: Option<PathBuf>) -> Self {
        let cfg = Config::new();
        theme::apply_theme(&cc.egui_ctx, cfg.general.text_scaling);

        let folder = folder.or_else(|| {
            cfg.general
                .last_folder
                .clone()
                .filter(|folder| folder.is_dir())
        });

        let mut app = Self {
            shortcuts: cfg.shortcuts.clone(),
            worker: Worker::new(cc.egui_ctx.clone()),
            tree: MetadataTree::new(cfg.tree.column_widths, cfg.tree.max_value_chars),
            folder_input: String::new(),
            current_folder: None,
            scanning: false,
            failures: vec![],
            last_timing: None,
            worker_message: None,
            watcher: None,
            cfg,
        };

        if let Some(folder) = folder {
            app.open_folder(folder, &cc.egui_ctx);
        }

        app
    }

    /// Replaces the tree with a fresh scan of `folder`.
    fn open_folder(&mut self, folder: PathBuf, ctx: &egui::Context) {
        tracing::info!("Opening {}", folder.display());

        self.folder_input = folder.to_string_lossy().to_string();
        let changed = self.current_folder.as_ref() != Some(&folder);
        self.current_folder = Some(folder.clone());
        self.rescan();

        if changed {
            self.cfg.general.last_folder = Some(folder);
            self.save_cfg();
            self.restart_watcher(ctx);
        }
    }

    fn rescan(&mut self) {
        let Some(folder) = self.current_folder.clone() else {
            return;
        };

        self.tree.clear();
        self.failures.clear();
        self.last_timing = None;
        self.scanning = true;

        let thumbnails = self
            .cfg
            .general
            .thumbnails
            .then_some(self.cfg.general.thumbnail_size);
        self.worker.scan(folder, thumbnails);
    }

    fn save_cfg(&self) {
        if let Err(e) = self.cfg.save() {
            tracing::warn!("Failure saving config -> {e}");
        }
    }

    fn restart_watcher(&mut self, ctx: &egui::Context) {
        //Dropping the old watcher stops its thread
        self.watcher = None;

        if !self.cfg.general.watch_folder {
            return;
        }

        if let Some(folder) = &self.current_folder {
            let debounce = Duration::from_millis(self.cfg.general.watch_debounce_ms);
            match FolderWatcher::start(folder, debounce, ctx.clone()) {
                Ok(watcher) => self.watcher = Some(watcher),
                Err(e) => tracing::error!("Failure starting folder watcher -> {e}"),
            }
        }
    }

    fn toggle_watcher(&mut self, ctx: &egui::Context) {
        self.cfg.general.watch_folder = !self.cfg.general.watch_folder;
        self.save_cfg();
        self.restart_watcher(ctx);
    }

    fn browse(&mut self, ctx: &egui::Context) {
        if let Some(folder) = folder_picker::browse(&self.folder_input) {
            self.open_folder(folder, ctx);
        }
    }

    fn process_events(&mut self, ctx: &egui::Context) {
        for event in self.worker.events() {
            match event {
                ScanEvent::Started { folder, .. } => {
                    tracing::debug!("Scan of {} started", folder.display());
                    self.scanning = true;
                }
                ScanEvent::Report { report, .. } => self.tree.push_report(report),
                ScanEvent::Failed { failure, .. } => self.failures.push(failure),
                ScanEvent::Thumbnail { path, image, .. } => {
                    let texture = ctx.load_texture(
                        path.to_string_lossy(),
                        image,
                        TextureOptions::LINEAR,
                    );
                    self.tree.set_thumbnail(path, texture);
                }
                ScanEvent::Finished { timing, .. } => {
                    self.scanning = false;
                    self.last_timing = Some(timing);
                }
            }
        }

        if let Some(msg) = worker::take_worker_messages(ctx).pop() {
            self.worker_message = Some(msg);
        }

        let folder_changed = self
            .watcher
            .as_ref()
            .is_some_and(|(_, rx)| rx.try_iter().count() > 0);
        if folder_changed {
            tracing::info!("Folder changed, rescanning");
            self.rescan();
        }
    }

    fn handle_input(&mut self, ctx: &egui::Context) {
        if ctx.input_mut(|i| i.consume_shortcut(&self.shortcuts.sc_exit.kbd_shortcut)) {
            ctx.send_viewport_cmd(ViewportCommand::Close);
        }

        if ctx.input_mut(|i| i.consume_shortcut(&self.shortcuts.sc_open_folder.kbd_shortcut)) {
            self.browse(ctx);
        }

        if ctx.input_mut(|i| i.consume_shortcut(&self.shortcuts.sc_focus_path.kbd_shortcut)) {
            folder_picker::request_focus(ctx);
        }

        if ctx.input_mut(|i| i.consume_shortcut(&self.shortcuts.sc_rescan.kbd_shortcut)) {
            self.rescan();
        }

        if ctx.input_mut(|i| i.consume_shortcut(&self.shortcuts.sc_expand_all.kbd_shortcut)) {
            self.tree.expand_all();
        }

        if ctx.input_mut(|i| i.consume_shortcut(&self.shortcuts.sc_collapse_all.kbd_shortcut)) {
            self.tree.collapse_all();
        }

        if ctx.input_mut(|i| i.consume_shortcut(&self.shortcuts.sc_focus_filter.kbd_shortcut)) {
            self.tree.request_filter_focus();
        }

        if ctx.input_mut(|i| i.consume_shortcut(&self.shortcuts.sc_watch_folder.kbd_shortcut)) {
            self.toggle_watcher(ctx);
        }

        //Typing in the path or filter box must not move the tree selection
        if !ctx.wants_keyboard_input() {
            self.tree.handle_keys(ctx);
        }
    }

    fn menu_ui(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        egui::menu::bar(ui, |ui| {
            ui.menu_button("File", |ui| {
                if ui.button("Open Folder…").clicked() {
                    ui.close_menu();
                    self.browse(ctx);
                }

                if ui
                    .add_enabled(self.current_folder.is_some(), egui::Button::new("Rescan"))
                    .clicked()
                {
                    ui.close_menu();
                    self.rescan();
                }

                let mut watching = self.cfg.general.watch_folder;
                if ui.checkbox(&mut watching, "Watch folder").changed() {
                    self.toggle_watcher(ctx);
                }

                ui.separator();
                if ui.button("Quit").clicked() {
                    ctx.send_viewport_cmd(ViewportCommand::Close);
                }
            });

            ui.menu_button("View", |ui| {
                if ui.button("Expand all").clicked() {
                    ui.close_menu();
                    self.tree.expand_all();
                }

                if ui.button("Collapse all").clicked() {
                    ui.close_menu();
                    self.tree.collapse_all();
                }

                if ui
                    .checkbox(&mut self.cfg.general.thumbnails, "Thumbnails")
                    .changed()
                {
                    self.save_cfg();
                    self.rescan();
                }
            });
        });
    }

    fn status_ui(&self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label(format!("{} files", self.tree.reports().len()));

            if !self.failures.is_empty() {
                ui.separator();
                let failures = self
                    .failures
                    .iter()
                    .map(|f| format!("{} -> {}", f.path.display(), f.reason))
                    .collect::<Vec<_>>()
                    .join("\n");
                ui.label(format!("{} unreadable", self.failures.len()))
                    .on_hover_text(failures);
            }

            ui.separator();
            if self.scanning {
                ui.spinner();
                ui.label("Scanning…");
            } else if let Some(timing) = &self.last_timing {
                ui.label(timing);
            }

            if let Some(msg) = &self.worker_message {
                ui.separator();
                ui.weak(msg.as_str());
            }

            if let Some((watcher, _)) = &self.watcher {
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.label("Watching")
                        .on_hover_text(watcher.folder().display().to_string());
                });
            }
        });
    }
}

impl eframe::App for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_events(ctx);
        self.handle_input(ctx);

        egui::TopBottomPanel::top("menu")
            .show_separator_line(false)
            .show(ctx, |ui| {
                self.menu_ui(ui, ctx);
                if let Some(folder) = folder_picker::ui(&mut self.folder_input, ui) {
                    self.open_folder(folder, ctx);
                }
                ui.add_space(2.);
            });

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            self.status_ui(ui);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            if self.current_folder.is_some() {
                self.tree.ui(ui);
            } else {
                ui.centered_and_justified(|ui| {
                    ui.label("Pick a folder to read image metadata");
                });
            }
        });
    }
}
