use egui::color_picker::{Alpha, color_edit_button_srgba};

use crate::app::{StatusKind, StudioApp};
use crate::command::Command;
use crate::scene::transform::TransformDelta;

const ROTATE_STEP: f32 = std::f32::consts::PI / 12.0;
const SCALE_STEP: f32 = 1.1;

pub fn tools_panel(app: &mut StudioApp, ctx: &egui::Context) {
    egui::SidePanel::left("tools_panel")
        .resizable(true)
        .default_width(220.0)
        .show(ctx, |ui| {
            ui.heading("Design");
            ui.separator();

            let has_garment = app.studio().scene().garment().is_some();
            ui.add_enabled_ui(has_garment, |ui| {
                ui.horizontal(|ui| {
                    ui.label("Garment colour");
                    let mut color = app.picker_color;
                    if color_edit_button_srgba(ui, &mut color, Alpha::Opaque).changed() {
                        app.picker_color = color;
                        app.execute(Command::Recolor(color));
                    }
                });
            });

            ui.separator();

            if ui.button("Add text").clicked() {
                app.execute(Command::AddText);
            }

            ui.label("Upload logo");
            ui.horizontal(|ui| {
                ui.text_edit_singleline(&mut app.upload_path)
                    .on_hover_text("Path to an image file, or drop one onto the window");
                if ui.button("Upload").clicked() {
                    app.upload_from_path();
                }
            });

            ui.separator();

            let has_selection = app.studio().selection().is_some();
            ui.add_enabled_ui(has_selection, |ui| {
                ui.horizontal(|ui| {
                    if ui.button("⟲").on_hover_text("Rotate left").clicked() {
                        app.execute(Command::TransformSelected(TransformDelta::rotate_by(
                            -ROTATE_STEP,
                        )));
                    }
                    if ui.button("⟳").on_hover_text("Rotate right").clicked() {
                        app.execute(Command::TransformSelected(TransformDelta::rotate_by(
                            ROTATE_STEP,
                        )));
                    }
                    if ui.button("+").on_hover_text("Larger").clicked() {
                        app.execute(Command::TransformSelected(TransformDelta::scale_by(
                            SCALE_STEP,
                        )));
                    }
                    if ui.button("-").on_hover_text("Smaller").clicked() {
                        app.execute(Command::TransformSelected(TransformDelta::scale_by(
                            1.0 / SCALE_STEP,
                        )));
                    }
                });
                ui.horizontal(|ui| {
                    if ui.button("Bring forward").clicked() {
                        app.execute(Command::BringForward);
                    }
                    if ui.button("Send backward").clicked() {
                        app.execute(Command::SendBackward);
                    }
                });
                if ui.button("Remove selected").clicked() {
                    app.execute(Command::DeleteSelected);
                }
            });

            ui.separator();

            let exporting = app.is_exporting();
            let label = if exporting { "Saving..." } else { "Add to cart" };
            if ui.add_enabled(!exporting, egui::Button::new(label)).clicked() {
                app.start_export(ctx);
            }
            if exporting {
                ui.spinner();
            }

            if let Some(receipt) = app.last_receipt() {
                ui.label(format!("Last saved design: {}", receipt.record_id));
            }

            if let Some(status) = app.status() {
                ui.separator();
                let color = match status.kind {
                    StatusKind::Info => ui.visuals().text_color(),
                    StatusKind::Error => ui.visuals().error_fg_color,
                };
                ui.colored_label(color, &status.text);
            }
        });
}
