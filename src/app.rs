use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{anyhow, Context, Result};
use eframe::egui;

use crate::batch::{persist_case, SessionRunner};
use crate::state::{RangeSelector, SelectorEvent};
use crate::ui::{panels, plot};

// ---------------------------------------------------------------------------
// Session state shared between the window and the batch driver
// ---------------------------------------------------------------------------

/// Everything the selector window needs, independent of rendering.
pub struct SelectorSession {
    pub selector: RangeSelector,
    /// Destination for the "Save" button.
    pub case_dir: PathBuf,
    /// √f where the current primary drag started.
    pub drag_anchor: Option<f64>,
    /// √f under the pointer while dragging.
    pub drag_current: Option<f64>,
    /// Status / error message shown in the top bar.
    pub status_message: Option<String>,
    pub close_requested: bool,
}

impl SelectorSession {
    pub fn new(selector: RangeSelector, case_dir: PathBuf) -> Self {
        Self {
            selector,
            case_dir,
            drag_anchor: None,
            drag_current: None,
            status_message: None,
            close_requested: false,
        }
    }

    /// Forward an event to the selector, reporting failures in the status line.
    pub fn apply(&mut self, event: SelectorEvent) {
        if let Err(e) = self.selector.handle(event) {
            log::error!("Selection update failed: {e}");
            self.status_message = Some(format!("Error: {e}"));
        }
    }

    /// Persist the current result right away.
    pub fn save_now(&mut self) {
        let config = self.selector.config();
        let result = self.selector.current();
        if !result.is_sufficient() && !config.analysis.persist_insufficient {
            self.status_message = Some("Select at least 2 points before saving".to_string());
            return;
        }
        let mut result = result.clone();
        result.sample_name = Some(self.selector.raw().case_name());
        match persist_case(&result, self.selector.raw(), &self.case_dir, config) {
            Ok(saved) => {
                self.status_message = Some(format!("Saved to {}", self.case_dir.display()));
                log::info!("Saved (manual): {}", saved.results.display());
            }
            Err(e) => {
                log::error!("Save failed: {e}");
                self.status_message = Some(format!("Error: {e}"));
            }
        }
    }

    pub fn complete(&mut self) {
        self.apply(SelectorEvent::Completed);
        self.close_requested = true;
    }
}

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct TwaApp {
    shared: Rc<RefCell<Option<SelectorSession>>>,
}

impl TwaApp {
    pub fn new(shared: Rc<RefCell<Option<SelectorSession>>>) -> Self {
        Self { shared }
    }
}

impl eframe::App for TwaApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let mut guard = self.shared.borrow_mut();
        let Some(session) = guard.as_mut() else {
            return;
        };

        // ---- Top panel: actions + status ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, session);
        });

        // ---- Right side panel: fit summary + metadata ----
        egui::SidePanel::right("summary_panel")
            .default_width(280.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, session);
            });

        // ---- Central panel: interactive phase plot ----
        egui::CentralPanel::default().show(ctx, |ui| {
            plot::phase_plot(ui, session);
        });

        if session.close_requested {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }
    }
}

// ---------------------------------------------------------------------------
// Blocking per-file window
// ---------------------------------------------------------------------------

/// Opens one selector window per file and blocks until it is closed.
/// Closing the window counts as completing the selection.
#[derive(Debug, Default, Clone, Copy)]
pub struct GuiRunner;

impl SessionRunner for GuiRunner {
    fn run(&mut self, selector: RangeSelector, case_dir: &Path) -> Result<RangeSelector> {
        let title = format!("TWA Analyzer – {}", selector.raw().case_name());
        let shared = Rc::new(RefCell::new(Some(SelectorSession::new(
            selector,
            case_dir.to_path_buf(),
        ))));
        let app_shared = Rc::clone(&shared);

        let options = eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_inner_size([1200.0, 800.0])
                .with_min_inner_size([600.0, 400.0]),
            ..Default::default()
        };

        eframe::run_native(
            &title,
            options,
            Box::new(move |_cc| Ok(Box::new(TwaApp::new(app_shared)))),
        )
        .map_err(|e| anyhow!("selector window failed: {e}"))?;

        let session = shared
            .borrow_mut()
            .take()
            .context("selector session was lost")?;
        let mut selector = session.selector;
        selector.handle(SelectorEvent::Completed)?;
        Ok(selector)
    }
}
