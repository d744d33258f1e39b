use eframe::egui;
use mindcanvas_core::{MapId, MindMap};
use mindcanvas_sync::{ChangeKind, RemoteStore, Subscription, SyncError};
use std::collections::HashMap;
use std::sync::Arc;

/// What the library screen asked the shell to do this frame.
#[derive(Default)]
pub struct LibraryResponse {
    pub open: Option<MapId>,
    pub errors: Vec<String>,
}

/// Owner-scoped map list: create, rename, archive, delete, open. These are
/// direct store mutations, deliberately outside the Action/undo pipeline.
pub struct LibraryView {
    store: Arc<dyn RemoteStore>,
    owner: String,
    maps: HashMap<MapId, MindMap>,
    subscription: Subscription<MindMap>,
    new_name: String,
    renaming: Option<(MapId, String)>,
    confirm_delete: Option<MapId>,
}

impl LibraryView {
    pub fn new(store: Arc<dyn RemoteStore>, owner: String) -> Self {
        let subscription = store.subscribe_maps(&owner);
        Self {
            store,
            owner,
            maps: HashMap::new(),
            subscription,
            new_name: String::new(),
            renaming: None,
            confirm_delete: None,
        }
    }

    fn pump(&mut self) {
        while let Some(batch) = self.subscription.try_next() {
            for change in batch {
                match change.kind {
                    ChangeKind::Added | ChangeKind::Modified => {
                        self.maps.insert(change.doc.id, change.doc);
                    }
                    ChangeKind::Removed => {
                        self.maps.remove(&change.doc.id);
                    }
                }
            }
        }
    }

    pub fn ui(&mut self, ui: &mut egui::Ui) -> LibraryResponse {
        self.pump();
        let mut response = LibraryResponse::default();

        ui.heading("Mind maps");
        ui.add_space(8.0);

        ui.horizontal(|ui| {
            ui.text_edit_singleline(&mut self.new_name);
            let can_create = !self.new_name.trim().is_empty();
            if ui
                .add_enabled(can_create, egui::Button::new("Create map"))
                .clicked()
            {
                let name = self.new_name.trim().to_string();
                if let Err(err) = self.store.create_map(&name, &self.owner) {
                    response.errors.push(err.to_string());
                } else {
                    self.new_name.clear();
                }
            }
        });
        ui.add_space(12.0);

        let mut active: Vec<MindMap> = self.maps.values().filter(|m| !m.archived).cloned().collect();
        active.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

        if active.is_empty() {
            ui.weak("No mind maps yet. Create one to get started.");
        }

        egui::ScrollArea::vertical().show(ui, |ui| {
            for map in &active {
                self.map_row(ui, map, &mut response);
            }

            let mut archived: Vec<MindMap> =
                self.maps.values().filter(|m| m.archived).cloned().collect();
            if !archived.is_empty() {
                archived.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
                ui.add_space(12.0);
                ui.collapsing("Archived", |ui| {
                    for map in &archived {
                        ui.horizontal(|ui| {
                            ui.label(&map.name);
                            if ui.small_button("Restore").clicked()
                                && let Err(err) = self.store.set_archived(map.id, false)
                            {
                                response.errors.push(err.to_string());
                            }
                        });
                    }
                });
            }
        });

        response
    }

    fn map_row(&mut self, ui: &mut egui::Ui, map: &MindMap, response: &mut LibraryResponse) {
        egui::Frame::group(ui.style()).show(ui, |ui| {
            ui.horizontal(|ui| {
                if let Some((id, name)) = &mut self.renaming
                    && *id == map.id
                {
                    ui.text_edit_singleline(name);
                    if ui.small_button("Save").clicked() {
                        let result = self.store.rename_map(map.id, name.trim());
                        if let Err(err) = result {
                            push_error(response, err);
                        }
                        self.renaming = None;
                    }
                    if ui.small_button("Cancel").clicked() {
                        self.renaming = None;
                    }
                    return;
                }

                if ui
                    .add(egui::Label::new(egui::RichText::new(&map.name).strong()).sense(egui::Sense::click()))
                    .clicked()
                {
                    response.open = Some(map.id);
                }
                ui.weak(format!("updated {}", map.updated_at.format("%Y-%m-%d %H:%M")));

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if self.confirm_delete == Some(map.id) {
                        if ui.small_button("Confirm delete").clicked() {
                            if let Err(err) = self.store.delete_map(map.id) {
                                push_error(response, err);
                            }
                            self.confirm_delete = None;
                        }
                        if ui.small_button("Keep").clicked() {
                            self.confirm_delete = None;
                        }
                        return;
                    }
                    if ui.small_button("Open").clicked() {
                        response.open = Some(map.id);
                    }
                    if ui.small_button("Rename").clicked() {
                        self.renaming = Some((map.id, map.name.clone()));
                    }
                    if ui.small_button("Archive").clicked()
                        && let Err(err) = self.store.set_archived(map.id, true)
                    {
                        push_error(response, err);
                    }
                    if ui.small_button("Delete").clicked() {
                        self.confirm_delete = Some(map.id);
                    }
                });
            });
        });
    }
}

fn push_error(response: &mut LibraryResponse, err: SyncError) {
    response.errors.push(err.to_string());
}
