use eframe::egui::{self, Color32, RichText, Ui};
use egui_extras::{Column, TableBuilder};

use crate::analysis::result::FitSummary;
use crate::app::SelectorSession;

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the action bar: file name, Save / Complete, status line.
pub fn top_bar(ui: &mut Ui, session: &mut SelectorSession) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.strong(session.selector.raw().case_name());
        ui.separator();

        if ui
            .button("Save")
            .on_hover_text("Write results for the current selection now")
            .clicked()
        {
            session.save_now();
        }
        if ui
            .button("Complete")
            .on_hover_text("Accept the current selection and move to the next file")
            .clicked()
        {
            session.complete();
        }

        ui.separator();
        ui.label(format!(
            "{} of {} points used",
            session.selector.current().used_indices.len(),
            session.selector.series().len()
        ));

        if let Some(msg) = &session.status_message {
            ui.separator();
            let color = if msg.starts_with("Error") {
                Color32::RED
            } else {
                Color32::DARK_GREEN
            };
            ui.label(RichText::new(msg).color(color));
        }
    });
}

// ---------------------------------------------------------------------------
// Right side panel – fit summary and metadata
// ---------------------------------------------------------------------------

/// Render the fit summary and the parsed metadata table.
pub fn side_panel(ui: &mut Ui, session: &SelectorSession) {
    let result = session.selector.current();
    let threshold = session.selector.config().analysis.r2_threshold;

    ui.heading("Fit");
    ui.separator();

    if !result.is_sufficient() {
        ui.label(RichText::new("Select at least 2 points").color(Color32::RED));
    } else {
        fit_block(ui, "Phase", &result.phase, threshold);
        ui.add_space(4.0);
        fit_block(ui, "Amplitude", &result.amplitude, threshold);
        ui.add_space(4.0);
        ui.label(format!("Ratio: {:.2}", result.diffusivity_ratio));
        ui.label(format!("kd: {:.2} – {:.2}", result.kd_min, result.kd_max));
        ui.label(format!(
            "√f range: {:.3} – {:.3}",
            result.freq_range_min, result.freq_range_max
        ));
    }
    ui.label(format!("Thickness: {} µm", result.thickness_um));

    ui.add_space(8.0);
    ui.heading("Sample information");
    ui.separator();

    let metadata = &session.selector.raw().metadata;
    if metadata.is_empty() {
        ui.label("No metadata found.");
        return;
    }

    TableBuilder::new(ui)
        .striped(true)
        .auto_shrink([false, false])
        .column(Column::auto())
        .column(Column::remainder())
        .header(20.0, |mut header| {
            header.col(|ui| {
                ui.strong("Key");
            });
            header.col(|ui| {
                ui.strong("Value");
            });
        })
        .body(|mut body| {
            for (key, value) in metadata {
                body.row(18.0, |mut row| {
                    row.col(|ui| {
                        ui.label(key);
                    });
                    row.col(|ui| {
                        ui.label(value.to_string());
                    });
                });
            }
        });
}

fn fit_block(ui: &mut Ui, name: &str, fit: &FitSummary, r2_threshold: f64) {
    match fit {
        FitSummary::Present {
            slope,
            r_squared,
            diffusivity,
            ..
        } => {
            ui.strong(name);
            ui.label(format!("α = {diffusivity:.2e} m²/s"));
            let r2_text = RichText::new(format!("R² = {r_squared:.3}"));
            // NaN compares false, so it is flagged too.
            let r2_ok = *r_squared >= r2_threshold;
            ui.label(if r2_ok {
                r2_text
            } else {
                r2_text.color(Color32::RED)
            });
            ui.label(format!("slope = {slope:.4}"));
        }
        FitSummary::Absent => {
            ui.strong(name);
            ui.label("no fit");
        }
    }
}
