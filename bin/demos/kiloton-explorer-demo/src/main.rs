// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

use eframe::egui;
use egui_plot::{Bar, BarChart, Legend, Line, PlotPoints, Points, Polygon};
use std::path::{Path, PathBuf};

use kiloton::{
    ChartData, ChartOutcome, ChartRequest, ClosedRange, DetonationExplorer, ErrorReporter,
    FilterCriteria, Hemisphere, Membership, Rgba, ChartCategory,
};

fn main() -> std::result::Result<(), eframe::Error> {
    env_logger::init();
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 860.0])
            .with_title("Detonation Explorer"),
        ..Default::default()
    };
    eframe::run_native(
        "Detonation Explorer",
        options,
        Box::new(|_cc| Ok(Box::new(ExplorerApp::new()))),
    )
}

#[derive(Debug, Clone)]
struct Selection {
    items: Vec<(String, bool)>,
}
impl Selection {
    fn all_of(values: Vec<String>) -> Self {
        Self {
            items: values.into_iter().map(|v| (v, true)).collect(),
        }
    }
    fn membership(&self) -> Membership {
        Membership::of(
            self.items
                .iter()
                .filter(|(_, checked)| *checked)
                .map(|(name, _)| name.clone()),
        )
    }
    fn selected_count(&self) -> usize {
        self.items.iter().filter(|(_, checked)| *checked).count()
    }
}

struct ExplorerApp {
    explorer: DetonationExplorer,
    reporter: ErrorReporter,
    error_message: Option<String>,
    notice: Option<String>,

    full_years: (i32, i32),
    year_window: (i32, i32),
    hemisphere: Hemisphere,
    full_yield: (f64, f64),
    yield_window: (f64, f64),
    full_body: (f64, f64),
    body_window: (f64, f64),
    full_surface: (f64, f64),
    surface_window: (f64, f64),
    full_depth: (f64, f64),
    depth_window: (f64, f64),
    locations: Selection,
    suppliers: Selection,
    deployment_types: Selection,
    purposes: Selection,
    reporting_sources: Selection,

    new_category: Option<ChartCategory>,
    new_name: String,
}

impl ExplorerApp {
    fn new() -> Self {
        // Same dataset whether launched from the workspace root or from the
        // demo directory.
        let candidates = [
            "data/nuclear_explosions.csv",
            "bin/demos/kiloton-explorer-demo/data/nuclear_explosions.csv",
            "nuclear_explosions.csv",
        ];
        let path = candidates
            .iter()
            .map(Path::new)
            .find(|p| p.exists())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(candidates[0]));

        let reporter = ErrorReporter {
            show_suggestions: true,
            coloured_output: false,
        };
        let (explorer, load_error) = DetonationExplorer::from_csv_or_empty(&path);
        let error_message = load_error.map(|e| reporter.report(&e));

        let mut app = Self {
            explorer,
            reporter,
            error_message,
            notice: None,
            full_years: (1945, 1998),
            year_window: (1945, 1998),
            hemisphere: Hemisphere::All,
            full_yield: (0.0, 0.0),
            yield_window: (0.0, 0.0),
            full_body: (0.0, 0.0),
            body_window: (0.0, 0.0),
            full_surface: (0.0, 0.0),
            surface_window: (0.0, 0.0),
            full_depth: (0.0, 0.0),
            depth_window: (0.0, 0.0),
            locations: Selection::all_of(Vec::new()),
            suppliers: Selection::all_of(Vec::new()),
            deployment_types: Selection::all_of(Vec::new()),
            purposes: Selection::all_of(Vec::new()),
            reporting_sources: Selection::all_of(Vec::new()),
            new_category: None,
            new_name: String::new(),
        };
        app.reset_filters_to_dataset();
        app
    }

    fn reset_filters_to_dataset(&mut self) {
        let dataset = self.explorer.dataset();
        let extents = dataset.extents();
        self.full_years = extents.years.unwrap_or((1945, 1998));
        self.year_window = self.full_years;
        self.hemisphere = Hemisphere::All;
        self.full_yield = extents.average_yield.unwrap_or((0.0, 0.0));
        self.yield_window = self.full_yield;
        self.full_body = extents.body_magnitude.unwrap_or((0.0, 0.0));
        self.body_window = self.full_body;
        self.full_surface = extents.surface_magnitude.unwrap_or((0.0, 0.0));
        self.surface_window = self.full_surface;
        self.full_depth = extents.depth.unwrap_or((0.0, 0.0));
        self.depth_window = self.full_depth;
        self.locations =
            Selection::all_of(dataset.distinct(|r| Some(r.deployment_location.as_str())));
        self.suppliers = Selection::all_of(dataset.distinct(|r| Some(r.source_country.as_str())));
        self.deployment_types =
            Selection::all_of(dataset.distinct(|r| Some(r.deployment_type.as_str())));
        self.purposes = Selection::all_of(dataset.distinct(|r| Some(r.purpose.as_str())));
        self.reporting_sources =
            Selection::all_of(dataset.distinct(|r| r.reporting_source.as_deref()));
    }

    fn load_dataset(&mut self, path: PathBuf) {
        let (fresh, load_error) = DetonationExplorer::from_csv_or_empty(&path);
        self.error_message = load_error.map(|e| self.reporter.report(&e));
        // Queued visuals survive a reload; the next render pass simply
        // replays them against the new records.
        let queue = self.explorer.queue().clone();
        self.explorer = fresh.with_queue(queue);
        self.reset_filters_to_dataset();
    }

    fn criteria(&self) -> FilterCriteria {
        FilterCriteria {
            date: ClosedRange::year_window(self.year_window.0, self.year_window.1),
            latitude: self.hemisphere.latitude_band(),
            deployment_locations: self.locations.membership(),
            source_countries: self.suppliers.membership(),
            average_yield: ClosedRange::new(self.yield_window.0, self.yield_window.1),
            body_magnitude: ClosedRange::new(self.body_window.0, self.body_window.1),
            surface_magnitude: ClosedRange::new(self.surface_window.0, self.surface_window.1),
            deployment_types: self.deployment_types.membership(),
            depth: ClosedRange::new(self.depth_window.0, self.depth_window.1),
            purposes: self.purposes.membership(),
            reporting_sources: self.reporting_sources.membership(),
        }
    }

    fn add_visual_clicked(&mut self) {
        match self.new_category {
            None => {
                self.notice = Some("Please select a visual category before adding.".to_string());
            }
            Some(category) => match self.explorer.add_visual(category, self.new_name.clone()) {
                Ok(id) => {
                    self.notice = Some(format!("Added '{category}' as visual #{id}."));
                    self.new_name.clear();
                    self.new_category = None;
                }
                Err(err) => {
                    self.notice = Some(err.to_string());
                }
            },
        }
    }
}

impl eframe::App for ExplorerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let criteria = self.criteria();
        let matching = self.explorer.reduce(&criteria).len();

        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Detonation Explorer");
                ui.separator();
                if ui.button("Select CSV File").clicked() {
                    if let Some(path) = rfd::FileDialog::new()
                        .add_filter("CSV files", &["csv"])
                        .pick_file()
                    {
                        self.load_dataset(path);
                    }
                }
                if let Some(path) = &self.explorer.dataset().metadata.source_path {
                    ui.label(format!("File: {}", path.display()));
                }
                ui.separator();
                ui.strong(format!("Showing {matching} detonations"));
            });
        });

        egui::TopBottomPanel::bottom("bottom_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(format!("Records: {}", self.explorer.dataset().len()));
                ui.label(format!(
                    "Visuals: {}/{}",
                    self.explorer.queue().len(),
                    self.explorer.queue().capacity()
                ));
                if let Some(notice) = &self.notice {
                    ui.separator();
                    ui.colored_label(egui::Color32::YELLOW, notice);
                }
            });
        });

        egui::SidePanel::left("filter_panel")
            .default_width(300.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    self.render_filter_panel(ui);
                });
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            if let Some(error) = self.error_message.clone() {
                ui.colored_label(egui::Color32::RED, "Dataset problem:");
                ui.monospace(&error);
                ui.separator();
            }
            egui::ScrollArea::vertical().show(ui, |ui| {
                self.render_add_form(ui);
                ui.separator();
                let requests = self.explorer.render_pass(&criteria);
                if requests.is_empty() {
                    ui.centered_and_justified(|ui| {
                        ui.label(
                            "Pick a visual category and click 'Add Visual' to chart the \
                             currently filtered detonations (max 10).",
                        );
                    });
                    return;
                }
                for request in &requests {
                    render_request(ui, request);
                    ui.separator();
                }
            });
        });
    }
}

impl ExplorerApp {
    fn render_filter_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("Filters");

        ui.collapsing("Date window", |ui| {
            let (min_year, max_year) = self.full_years;
            ui.label(format!(
                "We have data on detonations from {min_year} to {max_year}."
            ));
            ui.add(
                egui::Slider::new(&mut self.year_window.0, min_year..=max_year).text("From year"),
            );
            ui.add(egui::Slider::new(&mut self.year_window.1, min_year..=max_year).text("To year"));
            if self.year_window.1 < self.year_window.0 {
                self.year_window.1 = self.year_window.0;
            }
        });

        ui.collapsing("Hemisphere", |ui| {
            egui::ComboBox::from_label("Detonation hemisphere")
                .selected_text(self.hemisphere.label())
                .show_ui(ui, |ui| {
                    for hemisphere in Hemisphere::ALL {
                        ui.selectable_value(&mut self.hemisphere, hemisphere, hemisphere.label());
                    }
                });
        });

        selection_ui(ui, "Countries of detonation", &mut self.locations);
        selection_ui(ui, "Supplier nations", &mut self.suppliers);

        range_ui(
            ui,
            "Yield (kt)",
            &mut self.yield_window,
            self.full_yield,
        );
        range_ui(
            ui,
            "Body-wave magnitude",
            &mut self.body_window,
            self.full_body,
        );
        range_ui(
            ui,
            "Surface-wave magnitude",
            &mut self.surface_window,
            self.full_surface,
        );
        range_ui(
            ui,
            "Test depth (km, above ground negative)",
            &mut self.depth_window,
            self.full_depth,
        );

        selection_ui(ui, "Deployment types", &mut self.deployment_types);
        selection_ui(ui, "Purposes", &mut self.purposes);
        selection_ui(ui, "Reporting sources", &mut self.reporting_sources);
    }

    fn render_add_form(&mut self, ui: &mut egui::Ui) {
        ui.heading("Custom Visualisations");
        ui.label(
            "Use the filter panel to narrow the dataset, then add visuals built from the \
             current selection.",
        );
        ui.horizontal(|ui| {
            egui::ComboBox::from_label("Category")
                .selected_text(
                    self.new_category
                        .map(|c| c.label())
                        .unwrap_or("Select a category..."),
                )
                .show_ui(ui, |ui| {
                    for category in ChartCategory::ALL {
                        ui.selectable_value(
                            &mut self.new_category,
                            Some(category),
                            category.label(),
                        );
                    }
                });
            ui.label("Optional name:");
            ui.text_edit_singleline(&mut self.new_name);
            if ui.button("Add Visual").clicked() {
                self.add_visual_clicked();
            }
        });
    }
}

fn selection_ui(ui: &mut egui::Ui, title: &str, selection: &mut Selection) {
    ui.collapsing(title, |ui| {
        ui.horizontal(|ui| {
            if ui.small_button("All").clicked() {
                for (_, checked) in &mut selection.items {
                    *checked = true;
                }
            }
            if ui.small_button("None").clicked() {
                for (_, checked) in &mut selection.items {
                    *checked = false;
                }
            }
            ui.label(format!(
                "{} of {} selected",
                selection.selected_count(),
                selection.items.len()
            ));
        });
        egui::ScrollArea::vertical()
            .id_salt(title)
            .max_height(140.0)
            .show(ui, |ui| {
                for (name, checked) in &mut selection.items {
                    ui.checkbox(checked, name.as_str());
                }
            });
    });
}

fn range_ui(ui: &mut egui::Ui, title: &str, window: &mut (f64, f64), full: (f64, f64)) {
    ui.collapsing(title, |ui| {
        let (min, max) = full;
        if min >= max {
            ui.weak("No data for this field.");
            return;
        }
        ui.add(egui::Slider::new(&mut window.0, min..=max).text("Low"));
        ui.add(egui::Slider::new(&mut window.1, min..=max).text("High"));
        if window.1 < window.0 {
            window.1 = window.0;
        }
        ui.weak(format!("Active window: {:.2} to {:.2}", window.0, window.1));
    });
}

fn colour32(rgba: Rgba) -> egui::Color32 {
    egui::Color32::from_rgba_unmultiplied(rgba[0], rgba[1], rgba[2], rgba[3])
}

fn render_request(ui: &mut egui::Ui, request: &ChartRequest) {
    ui.group(|ui| {
        ui.horizontal(|ui| {
            ui.strong(&request.display_name);
            ui.weak(format!("({})", request.category.label()));
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.small_button("Copy JSON").clicked() {
                    if let Ok(json) = serde_json::to_string_pretty(request) {
                        ui.ctx().copy_text(json);
                    }
                }
            });
        });
        match &request.outcome {
            ChartOutcome::NoData { message } => {
                ui.weak(message.as_str());
            }
            ChartOutcome::Ready { chart, .. } => render_chart(ui, request, chart),
        }
    });
}

fn render_chart(ui: &mut egui::Ui, request: &ChartRequest, chart: &ChartData) {
    let plot_id = format!("visual_{}", request.display_name);
    match chart {
        ChartData::DetonationMap { points, style: _ } => {
            // One point series per supplier nation so the legend doubles as a
            // colour key.
            let mut by_country: Vec<(String, Option<Rgba>, Vec<[f64; 2]>)> = Vec::new();
            for point in points {
                let entry = by_country
                    .iter_mut()
                    .find(|(country, _, _)| country == &point.source_country);
                match entry {
                    Some((_, _, coords)) => coords.push([point.longitude, point.latitude]),
                    None => by_country.push((
                        point.source_country.clone(),
                        point.colour,
                        vec![[point.longitude, point.latitude]],
                    )),
                }
            }
            egui_plot::Plot::new(plot_id)
                .height(320.0)
                .data_aspect(1.0)
                .legend(Legend::default())
                .show(ui, |plot_ui| {
                    for (country, colour, coords) in by_country {
                        let mut series = Points::new(country, PlotPoints::from(coords))
                            .radius(2.5);
                        if let Some(rgba) = colour {
                            series = series.color(colour32(rgba));
                        }
                        plot_ui.points(series);
                    }
                });
        }
        ChartData::YieldHistogram {
            values,
            labels,
            style,
        } => {
            let bars = histogram_bars(values, style.bins, colour32(style.fill), colour32(style.edge_colour));
            egui_plot::Plot::new(plot_id)
                .height(260.0)
                .x_axis_label(labels.x)
                .y_axis_label(labels.y)
                .show(ui, |plot_ui| {
                    plot_ui.bar_chart(BarChart::new(String::new(), bars));
                });
        }
        ChartData::YearlyTimeline {
            counts,
            labels,
            style,
        } => {
            let series: Vec<[f64; 2]> = counts
                .iter()
                .map(|(year, n)| [f64::from(*year), *n as f64])
                .collect();
            egui_plot::Plot::new(plot_id)
                .height(260.0)
                .x_axis_label(labels.x)
                .y_axis_label(labels.y)
                .show(ui, |plot_ui| {
                    plot_ui.line(
                        Line::new(String::new(), PlotPoints::from(series.clone()))
                            .color(colour32(style.colour))
                            .width(style.line_width),
                    );
                    plot_ui.points(
                        Points::new(String::new(), PlotPoints::from(series))
                            .color(colour32(style.colour))
                            .radius(style.marker_radius),
                    );
                });
        }
        ChartData::PurposeBars {
            counts,
            labels,
            style,
        } => {
            egui_plot::Plot::new(plot_id)
                .height((counts.len() as f32 * 22.0).max(120.0))
                .x_axis_label(labels.x)
                .legend(Legend::default())
                .show_axes([true, false])
                .show(ui, |plot_ui| {
                    for (index, (label, count)) in counts.iter().enumerate() {
                        let bar = Bar::new((counts.len() - index) as f64, *count as f64)
                            .fill(colour32(style.fill));
                        plot_ui.bar_chart(
                            BarChart::new(label, vec![bar])
                                .horizontal(),
                        );
                    }
                });
        }
        ChartData::YieldDepthScatter {
            points,
            labels,
            style,
        } => {
            let alpha = (style.alpha * 255.0) as u8;
            let fill = egui::Color32::from_rgba_unmultiplied(70, 130, 180, alpha);
            egui_plot::Plot::new(plot_id)
                .height(280.0)
                .x_axis_label(labels.x)
                .y_axis_label(labels.y)
                .show(ui, |plot_ui| {
                    plot_ui.points(
                        Points::new(String::new(), PlotPoints::from(points.clone()))
                            .color(fill)
                            .radius(style.radius),
                    );
                });
        }
        ChartData::SupplierPie { slices, style } => {
            let total: u64 = slices.iter().map(|(_, n)| n).sum();
            if total == 0 {
                ui.weak("No supplier counts to draw.");
                return;
            }
            egui_plot::Plot::new(plot_id)
                .height(300.0)
                .data_aspect(1.0)
                .legend(Legend::default())
                .show_axes([false, false])
                .show_grid([false, false])
                .show(ui, |plot_ui| {
                    let mut angle = f64::from(style.start_angle_degrees).to_radians();
                    for (index, (label, count)) in slices.iter().enumerate() {
                        let fraction = *count as f64 / total as f64;
                        let sweep = fraction * std::f64::consts::TAU;
                        let wedge = pie_wedge(angle, sweep);
                        let percent = 100.0 * fraction;
                        plot_ui.polygon(
                            Polygon::new(
                                format!(
                                    "{label} ({percent:.prec$}%)",
                                    prec = style.percent_decimals
                                ),
                                PlotPoints::from(wedge),
                            )
                            .fill_color(slice_colour(index, slices.len())),
                        );
                        angle += sweep;
                    }
                });
        }
    }
}

fn histogram_bars(values: &[f64], bins: usize, fill: egui::Color32, edge: egui::Color32) -> Vec<Bar> {
    let bins = bins.max(1);
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let width = if max > min { (max - min) / bins as f64 } else { 1.0 };
    let mut counts = vec![0u64; bins];
    for &value in values {
        let mut index = ((value - min) / width) as usize;
        if index >= bins {
            index = bins - 1;
        }
        counts[index] += 1;
    }
    counts
        .into_iter()
        .enumerate()
        .map(|(index, count)| {
            let centre = min + (index as f64 + 0.5) * width;
            Bar::new(centre, count as f64)
                .width(width)
                .fill(fill)
                .stroke(egui::Stroke::new(1.0, edge))
        })
        .collect()
}

// Anticlockwise wedge of the unit circle starting at `start` radians.
fn pie_wedge(start: f64, sweep: f64) -> Vec<[f64; 2]> {
    let steps = ((sweep.to_degrees() / 4.0).ceil() as usize).max(2);
    let mut vertices = vec![[0.0, 0.0]];
    for step in 0..=steps {
        let angle = start + sweep * step as f64 / steps as f64;
        vertices.push([angle.cos(), angle.sin()]);
    }
    vertices
}

fn slice_colour(index: usize, total: usize) -> egui::Color32 {
    // Dark-to-light sweep so neighbouring slices stay distinguishable.
    let t = if total <= 1 {
        0.0
    } else {
        index as f32 / (total - 1) as f32
    };
    let lerp = |a: f32, b: f32| (a + (b - a) * t) as u8;
    egui::Color32::from_rgb(lerp(68.0, 253.0), lerp(1.0, 231.0), lerp(84.0, 37.0))
}
