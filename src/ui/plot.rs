use eframe::egui::{Color32, PointerButton, Pos2, RichText, Ui};
use egui_plot::{Legend, Line, MarkerShape, Plot, PlotPoint, PlotPoints, PlotUi, Points, VLine};

use crate::app::SelectorSession;
use crate::state::SelectorEvent;

/// Screen distance (px) within which a click picks a point.
const PICK_RADIUS: f32 = 8.0;

/// What the user did to the plot during this frame.
#[derive(Debug, Default)]
struct PlotGesture {
    pointer_x: Option<f64>,
    drag_started: bool,
    dragging: bool,
    drag_stopped: bool,
    clicked_point: Option<usize>,
}

// ---------------------------------------------------------------------------
// Phase plot (central panel)
// ---------------------------------------------------------------------------

/// Render the phase-vs-√f plot and feed drag / click gestures to the selector.
pub fn phase_plot(ui: &mut Ui, session: &mut SelectorSession) {
    for line in session.selector.current().summary_lines() {
        ui.label(RichText::new(line).strong());
    }
    ui.label("Drag to select range. Click points to exclude.");

    let series = session.selector.series();
    let xs = series.sqrt_freq.clone();
    let ys = series.phase.clone();
    let active = session.selector.active_indices();
    let excluded = session.selector.excluded_indices();
    let fit_line = session.selector.fit_line();
    let plot_cfg = &session.selector.config().plot;
    let phase_color = rgb(plot_cfg.color_phase);
    let fit_color = rgb(plot_cfg.color_fit);
    let span = session.drag_anchor.zip(session.drag_current);

    let gesture = Plot::new("phase_plot")
        .legend(Legend::default())
        .x_axis_label("√f [Hz^0.5]")
        .y_axis_label("Phase [rad]")
        .allow_drag(false)
        .allow_boxed_zoom(false)
        .allow_zoom(true)
        .allow_scroll(true)
        .show(ui, |plot_ui| {
            let pick = |idx: &[usize]| idx.iter().map(|&i| [xs[i], ys[i]]).collect::<Vec<_>>();

            let all: Vec<[f64; 2]> = xs.iter().zip(&ys).map(|(&x, &y)| [x, y]).collect();
            plot_ui.points(
                Points::new(all)
                    .name("All Data")
                    .shape(MarkerShape::Square)
                    .radius(4.0)
                    .color(Color32::LIGHT_GRAY),
            );
            plot_ui.points(
                Points::new(pick(&active))
                    .name("Used Data")
                    .shape(MarkerShape::Square)
                    .radius(4.0)
                    .color(phase_color),
            );
            plot_ui.points(
                Points::new(pick(&excluded))
                    .name("Excluded")
                    .shape(MarkerShape::Cross)
                    .radius(5.0)
                    .color(Color32::RED),
            );
            if let Some([a, b]) = fit_line {
                plot_ui.line(
                    Line::new(PlotPoints::from(vec![a, b]))
                        .name("Fit")
                        .color(fit_color)
                        .width(2.0),
                );
            }
            if let Some((from, to)) = span {
                for x in [from, to] {
                    plot_ui.vline(VLine::new(x).color(Color32::DARK_GREEN).width(1.5));
                }
            }

            read_gesture(plot_ui, &xs, &ys)
        })
        .inner;

    apply_gesture(session, gesture);
}

fn read_gesture(plot_ui: &PlotUi, xs: &[f64], ys: &[f64]) -> PlotGesture {
    let response = plot_ui.response();
    let clicked_point = if response.clicked() {
        response
            .interact_pointer_pos()
            .and_then(|pos| nearest_point(plot_ui, xs, ys, pos))
    } else {
        None
    };
    PlotGesture {
        pointer_x: plot_ui.pointer_coordinate().map(|p| p.x),
        drag_started: response.drag_started_by(PointerButton::Primary),
        dragging: response.dragged_by(PointerButton::Primary),
        drag_stopped: response.drag_stopped_by(PointerButton::Primary),
        clicked_point,
    }
}

fn nearest_point(plot_ui: &PlotUi, xs: &[f64], ys: &[f64], pos: Pos2) -> Option<usize> {
    xs.iter()
        .zip(ys)
        .enumerate()
        .filter(|(_, (x, y))| x.is_finite() && y.is_finite())
        .map(|(i, (&x, &y))| {
            let screen = plot_ui.screen_from_plot(PlotPoint::new(x, y));
            (i, screen.distance(pos))
        })
        .filter(|&(_, d)| d <= PICK_RADIUS)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
}

fn apply_gesture(session: &mut SelectorSession, gesture: PlotGesture) {
    if gesture.drag_started {
        session.drag_anchor = gesture.pointer_x;
        session.drag_current = gesture.pointer_x;
    } else if gesture.dragging {
        if let Some(x) = gesture.pointer_x {
            session.drag_current = Some(x);
        }
    }

    if gesture.drag_stopped {
        if let (Some(min), Some(max)) = (session.drag_anchor.take(), session.drag_current.take()) {
            session.apply(SelectorEvent::RangeSelected { min, max });
        }
    }

    if let Some(index) = gesture.clicked_point {
        session.apply(SelectorEvent::PointToggled(index));
    }
}

fn rgb(c: [u8; 3]) -> Color32 {
    Color32::from_rgb(c[0], c[1], c[2])
}
