//! Parameter and timing panel (feature `egui`).
//!
//! The panel never touches the engine directly: it edits a copy of the parameters and
//! returns the differences as [`ParamChange`]s for the viewer to apply.

use crate::flow_field::{format_bytes, FlowFieldStats};
use crate::params::{ParamChange, SimulationParams};

/// Draw the panel. Returns the edits made this frame.
///
/// `seed_input` is the text box contents, kept by the caller across frames; the seed is
/// applied when the box loses focus. Grid size sliders stop at `max_texture_dimension`.
pub fn parameter_panel(
    ctx: &egui::Context,
    params: &SimulationParams,
    stats: &FlowFieldStats,
    fps: f32,
    max_texture_dimension: u32,
    seed_input: &mut String,
) -> Vec<ParamChange> {
    let max_lines = max_texture_dimension.clamp(1, 16384);
    let max_points = max_texture_dimension.clamp(1, 256);
    let mut edited = params.clone();
    let mut reseed = false;

    egui::Window::new("Flow Field")
        .default_pos([10.0, 10.0])
        .resizable(false)
        .show(ctx, |ui| {
            ui.heading("Lines");
            ui.horizontal(|ui| {
                ui.label("Seed");
                let response = ui.text_edit_singleline(seed_input);
                if response.lost_focus() && *seed_input != params.seed {
                    reseed = true;
                }
            });
            ui.add(
                egui::Slider::new(&mut edited.num_lines, 1..=max_lines)
                    .logarithmic(true)
                    .text("lines"),
            );
            ui.add(egui::Slider::new(&mut edited.num_line_points, 1..=max_points).text("points"));
            ui.add(egui::Slider::new(&mut edited.step_size, 0.0..=10.0).text("step size"));
            ui.add(egui::Slider::new(&mut edited.line_width, 0.5..=20.0).text("line width"));
            ui.add(egui::Slider::new(&mut edited.line_alpha, 0.0..=1.0).text("line alpha"));

            ui.separator();
            ui.heading("Noise");
            let noise = &mut edited.noise;
            ui.add(egui::Slider::new(&mut noise.frequency, 0.05..=8.0).text("frequency"));
            ui.add(egui::Slider::new(&mut noise.amplitude, 0.0..=4.0).text("amplitude"));
            ui.add(egui::Slider::new(&mut noise.harmonics, 1..=8).text("harmonics"));
            ui.add(egui::Slider::new(&mut noise.harmonic_spread, 1.0..=4.0).text("spread"));
            ui.add(egui::Slider::new(&mut noise.harmonic_gain, 0.0..=1.5).text("gain"));
            ui.add(egui::Slider::new(&mut noise.speed, 0.0..=1.0).text("speed"));
            ui.horizontal(|ui| {
                ui.label("travel");
                ui.add(egui::DragValue::new(&mut noise.harmonic_travel.x).speed(0.1));
                ui.add(egui::DragValue::new(&mut noise.harmonic_travel.y).speed(0.1));
            });

            ui.separator();
            ui.heading("Performance");
            ui.label(format!("{:.0} fps", fps));
            ui.label(format!("trace: {}", stats.trace_summary));
            ui.label(format!("draw: {}", stats.draw_summary));
            ui.label(format!("trace passes: {}", stats.trace_passes));
            ui.label(format!("gpu memory: {}", format_bytes(stats.gpu_memory_bytes)));
        });

    let mut changes = Vec::new();
    if reseed {
        changes.push(ParamChange::Seed(seed_input.clone()));
    }
    if edited.num_lines != params.num_lines {
        changes.push(ParamChange::NumLines(edited.num_lines));
    }
    if edited.num_line_points != params.num_line_points {
        changes.push(ParamChange::NumLinePoints(edited.num_line_points));
    }
    if edited.step_size != params.step_size {
        changes.push(ParamChange::StepSize(edited.step_size));
    }
    if edited.line_width != params.line_width {
        changes.push(ParamChange::LineWidth(edited.line_width));
    }
    if edited.line_alpha != params.line_alpha {
        changes.push(ParamChange::LineAlpha(edited.line_alpha));
    }
    if edited.noise != params.noise {
        changes.push(ParamChange::Noise(edited.noise));
    }
    changes
}
