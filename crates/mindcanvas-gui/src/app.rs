use crate::editor::{EditorSession, Notice};
use crate::library::LibraryView;
use crate::settings::AppSettings;
use crate::theme;
use eframe::egui;
use egui_notify::Toasts;
use mindcanvas_core::MapId;
use mindcanvas_sync::{MemoryStore, RemoteStore, SyncError};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

pub struct MindCanvasApp {
    store: Arc<dyn RemoteStore>,
    settings: AppSettings,
    library: LibraryView,
    editor: Option<EditorSession>,
    toasts: Toasts,
}

impl MindCanvasApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let settings = AppSettings::load();
        theme::apply(&cc.egui_ctx, settings.theme);

        // The remote store is an external collaborator; the demo profile
        // runs against the in-memory implementation.
        let store: Arc<dyn RemoteStore> = Arc::new(MemoryStore::new());
        let library = LibraryView::new(Arc::clone(&store), settings.owner.clone());
        Self {
            store,
            settings,
            library,
            editor: None,
            toasts: Toasts::default(),
        }
    }

    fn open_editor(&mut self, map_id: MapId) {
        match EditorSession::open(
            Arc::clone(&self.store),
            map_id,
            Duration::from_millis(self.settings.debounce_ms),
            self.settings.history_capacity,
            self.settings.default_node_color.clone(),
        ) {
            Ok(session) => self.editor = Some(session),
            Err(SyncError::NotFound) => {
                self.toasts.error("That map no longer exists.");
            }
            Err(err) => {
                self.toasts.error(err.to_string());
            }
        }
    }

    fn close_editor(&mut self) {
        // Dropping the session cancels its subscriptions.
        self.editor = None;
    }
}

impl eframe::App for MindCanvasApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let open_map_name = self.editor.as_ref().map(|s| s.map().name.clone());
        egui::TopBottomPanel::top("titlebar").show(ctx, |ui| {
            ui.horizontal(|ui| match open_map_name {
                Some(name) => {
                    if ui.button("← Maps").clicked() {
                        self.close_editor();
                    }
                    ui.strong(name);
                }
                None => {
                    ui.strong("MindCanvas");
                }
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            if let Some(session) = &mut self.editor {
                session.show(ui, &self.settings);
                let notices = session.take_notices();
                let mut vanished = false;
                for notice in notices {
                    match notice {
                        Notice::SyncFailed(message) => {
                            self.toasts.error(format!("Change not saved: {message}"));
                        }
                        Notice::MapVanished => vanished = true,
                    }
                }
                if vanished {
                    warn!("map deleted remotely, returning to the library");
                    self.toasts.error("This map was deleted.");
                    self.close_editor();
                }
            } else {
                let response = self.library.ui(ui);
                for error in response.errors {
                    self.toasts.error(error);
                }
                if let Some(map_id) = response.open {
                    self.open_editor(map_id);
                }
            }
        });

        self.toasts.show(ctx);
    }
}
