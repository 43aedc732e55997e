// src/ui.rs

/// Snapshot of what the HUD shows, taken once per frame.
pub struct HudState {
    pub health: f32,
    pub max_health: f32,
    pub free_fly: bool,
    pub show_colliders: bool,
    pub bloom: bool,
    pub cursor_grabbed: bool,
    pub game_over: bool,
    pub fps: f32,
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}

pub fn build_ui(ctx: &egui::Context, hud: &HudState) {
    egui::Window::new("Sandbox")
        .anchor(egui::Align2::LEFT_TOP, egui::vec2(10.0, 10.0))
        .resizable(false)
        .show(ctx, |ui| {
            ui.vertical(|ui| {
                ui.label(format!("FPS: {:.0}", hud.fps));
                ui.add(
                    egui::ProgressBar::new((hud.health / hud.max_health).clamp(0.0, 1.0))
                        .text(format!("Health {:.0}", hud.health.max(0.0))),
                );
                ui.label(format!("Camera: {}", if hud.free_fly { "free-fly" } else { "follow" }));
                ui.label(format!("Bloom: {}", on_off(hud.bloom)));
                ui.label(format!("Colliders: {}", on_off(hud.show_colliders)));
                ui.separator();

                ui.label("Controls:");
                ui.label("   W/A/S/D: Move");
                ui.label("   Space: Jump");
                ui.label("   Mouse (when grabbed): Look (free-fly)");
                ui.label("   O: Toggle free-fly camera");
                ui.label("   C: Toggle collider boxes");
                ui.label("   B: Toggle bloom");
                if !hud.cursor_grabbed {
                    ui.label("   Click or Escape: Grab mouse");
                } else {
                    ui.label("   Escape: Release mouse");
                }
            });
        });

    if hud.game_over {
        egui::Window::new("Game over")
            .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                ui.heading("You died");
                ui.label("Press R to respawn");
            });
    }
}
