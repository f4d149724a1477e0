use egui::{Color32, Pos2, Rect, Sense, Shape, Stroke};

use crate::app::StudioApp;
use crate::command::Command;
use crate::scene::transform::TransformDelta;

const SELECTION_STROKE: Stroke = Stroke {
    width: 1.5,
    color: Color32::from_rgb(0, 120, 215),
};

pub fn central_panel(app: &mut StudioApp, ctx: &egui::Context) {
    egui::CentralPanel::default().show(ctx, |ui| {
        let viewport = app.studio().scene().viewport();
        let available = ui.available_rect_before_wrap();

        // The canvas is never shown larger than its logical size
        let side = available.width().min(available.height()).min(viewport.size).max(1.0);
        let canvas_rect = Rect::from_center_size(available.center(), egui::vec2(side, side));
        let display_scale = side / viewport.size;

        let response = ui.allocate_rect(canvas_rect, Sense::click_and_drag());
        let to_logical = |screen: Pos2| ((screen - canvas_rect.min) / display_scale).to_pos2();
        let to_screen = |logical: Pos2| canvas_rect.min + logical.to_vec2() * display_scale;

        if response.clicked() || response.drag_started() {
            if let Some(pointer) = response.interact_pointer_pos() {
                app.execute(Command::SelectAt(to_logical(pointer)));
            }
        }
        if response.dragged() && app.studio().selection().is_some() {
            let delta = response.drag_delta() / display_scale;
            if delta != egui::Vec2::ZERO {
                app.execute(Command::TransformSelected(TransformDelta::translate(delta)));
            }
        }
        if response.hovered() && ui.input(|i| i.key_pressed(egui::Key::Delete)) {
            app.execute(Command::DeleteSelected);
        }

        let pixel_ratio = display_scale * ctx.pixels_per_point();
        let painter = ui.painter_at(canvas_rect);
        if let Some(texture) = app.preview_texture(ctx, pixel_ratio) {
            let uv = Rect::from_min_max(Pos2::ZERO, egui::pos2(1.0, 1.0));
            painter.image(texture, canvas_rect, uv, Color32::WHITE);
        }

        let scene = app.studio().scene();
        if let Some(selected) = scene.selected() {
            let outline = selected
                .corners(scene.fonts())
                .into_iter()
                .map(to_screen)
                .collect::<Vec<_>>();
            painter.add(Shape::closed_line(outline, SELECTION_STROKE));
        }
    });
}
