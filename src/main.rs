//! StreetWalk Desktop
//! Dashboard and drive-mode viewer for the StreetWalk street-content platform

// Hide console window on Windows release builds
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

// Use mimalloc for faster memory allocation (Linux, macOS)
#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use eframe::egui;
use std::process::Command;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread;

mod api;
mod dashboard;
mod map;
mod models;
mod settings;
mod sim;
mod sim_tests;

use api::{world_route, SummaryClient};
use dashboard::{format_chart_label, format_count, chart_meta, DashboardState, ModeFilter};
use map::MapOverlay;
use models::*;
use settings::{DriveSettings, FileStore, SettingsStore};
use sim::{gear_label, resolve_direction, DriveState, InputState};

/// Get current time as HH:MM:SS (UTC)
fn timestamp_now() -> String {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let secs = now % 86400;
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

/// Application icon: a road vanishing into a sunset gradient
fn load_icon() -> egui::IconData {
    let size: usize = 64;
    let mut rgba = vec![0u8; size * size * 4];

    for y in 0..size {
        for x in 0..size {
            let idx = (y * size + x) * 4;
            let nx = x as f32 / size as f32;
            let ny = y as f32 / size as f32;

            // Sky gradient (#667eea to #f6ad55), horizon at 45%
            let (r, g, b) = if ny < 0.45 {
                let t = ny / 0.45;
                (
                    (102.0 + (246.0 - 102.0) * t) as u8,
                    (126.0 + (173.0 - 126.0) * t) as u8,
                    (234.0 + (85.0 - 234.0) * t) as u8,
                )
            } else {
                // Road: trapezoid widening toward the bottom
                let depth = (ny - 0.45) / 0.55;
                let half_width = 0.06 + 0.44 * depth;
                let on_road = (nx - 0.5).abs() <= half_width;
                if on_road {
                    // Dashed center line
                    let on_dash = (nx - 0.5).abs() < 0.015 + 0.01 * depth
                        && ((ny * 10.0) as i32) % 2 == 0;
                    if on_dash {
                        (240, 220, 130)
                    } else {
                        (45, 48, 56)
                    }
                } else {
                    // Shoulder green
                    (64, 120, 82)
                }
            };

            rgba[idx] = r;
            rgba[idx + 1] = g;
            rgba[idx + 2] = b;
            rgba[idx + 3] = 255;
        }
    }

    egui::IconData {
        rgba,
        width: size as u32,
        height: size as u32,
    }
}

/// Open a world route in the system browser
fn open_in_browser(url: &str) -> Result<(), std::io::Error> {
    #[cfg(target_os = "windows")]
    let result = Command::new("cmd").args(["/C", "start", "", url]).spawn();
    #[cfg(target_os = "macos")]
    let result = Command::new("open").arg(url).spawn();
    #[cfg(all(not(target_os = "windows"), not(target_os = "macos")))]
    let result = Command::new("xdg-open").arg(url).spawn();

    result.map(|_| ())
}

/// Background task messages
enum TaskResult {
    SummaryLoaded { token: u64, summary: Box<DashboardSummary> },
    SummaryFailed { token: u64, message: String },
    StreetDeleted { name: String },
    DeleteFailed(String),
}

/// Pre-resolved street row for list rendering
struct StreetRow {
    id: String,
    name: String,
    location: String,
    badge: &'static str,
    metric: String,
    route: String,
}

fn main() -> Result<(), eframe::Error> {
    // Force X11 backend on Linux before any windowing code runs
    #[cfg(target_os = "linux")]
    {
        std::env::set_var("WINIT_UNIX_BACKEND", "x11");
        std::env::remove_var("WAYLAND_DISPLAY");
    }

    let icon = load_icon();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1180.0, 720.0])
            .with_min_inner_size([900.0, 560.0])
            .with_icon(icon),
        vsync: true,
        hardware_acceleration: eframe::HardwareAcceleration::Preferred,
        ..Default::default()
    };

    eframe::run_native(
        "StreetWalk Desktop",
        options,
        Box::new(|cc| {
            cc.egui_ctx.set_visuals(egui::Visuals::dark());
            Ok(Box::new(StreetwalkApp::new()))
        }),
    )
}

struct StreetwalkApp {
    // Connection
    server: String,

    // State
    current_tab: Tab,
    status_message: String,
    /// Single blocking alert for fetch failures
    alert: Option<String>,

    // Background task channel
    task_receiver: Receiver<TaskResult>,
    task_sender: Sender<TaskResult>,

    // Dashboard
    dashboard: DashboardState,
    dash_markers: Vec<map::Marker>,
    dash_viewport: Option<map::Viewport>,
    confirm_delete: Option<(String, String)>, // (id, name)
    startup_fetch_triggered: bool,

    // Drive simulation
    streets: Vec<Street>,
    world_config: WorldConfig,
    drive: DriveState,
    drive_settings: DriveSettings,
    settings_store: Box<dyn SettingsStore>,
    joystick_axis: f32,
    drive_overlay: MapOverlay,

    // Console log
    console_log: Vec<String>,
}

impl StreetwalkApp {
    fn new() -> Self {
        let mut settings_store: Box<dyn SettingsStore> = Box::new(FileStore::new());
        let drive_settings = DriveSettings::load(settings_store.as_mut());
        let (task_sender, task_receiver) = channel();

        // Optional bootstrap blob as the first CLI argument: world config,
        // street collection and the initially selected street
        let bootstrap = std::env::args()
            .nth(1)
            .and_then(|path| std::fs::read_to_string(path).ok())
            .and_then(|content| Bootstrap::from_json(&content).ok())
            .unwrap_or_default();

        let mut console_log = vec![format!("[{}] [INFO] StreetWalk Desktop started", timestamp_now())];
        if !bootstrap.streets.is_empty() {
            console_log.push(format!(
                "[{}] [INFO] Bootstrap loaded: {} streets",
                timestamp_now(),
                bootstrap.streets.len()
            ));
        }

        let mut drive = DriveState::new();
        let mut current_tab = Tab::Dashboard;
        if let Some(selected) = &bootstrap.selected {
            if let Some(index) = bootstrap.streets.iter().position(|s| s.id == selected.id) {
                drive.switch_street(index, &bootstrap.streets[index]);
                current_tab = Tab::Drive;
            }
        }

        Self {
            server: bootstrap.config.server.clone(),
            current_tab,
            status_message: "Ready".to_string(),
            alert: None,
            task_receiver,
            task_sender,
            dashboard: DashboardState::new(),
            dash_markers: Vec::new(),
            dash_viewport: None,
            confirm_delete: None,
            startup_fetch_triggered: false,
            streets: bootstrap.streets,
            world_config: bootstrap.config,
            drive,
            drive_settings,
            settings_store,
            joystick_axis: 0.0,
            drive_overlay: MapOverlay::default(),
            console_log,
        }
    }

    fn log(&mut self, message: &str) {
        let timestamp = timestamp_now();
        self.console_log.push(format!("[{}] {}", timestamp, message));
        // Keep last 500 lines
        if self.console_log.len() > 500 {
            self.console_log.remove(0);
        }
    }

    fn save_settings(&mut self) {
        self.drive_settings.save(self.settings_store.as_mut());
    }

    /// Kick off a summary fetch for the current reporting window. The
    /// returned token serializes rapid window changes: only the latest
    /// response is applied.
    fn fetch_summary(&mut self) {
        let token = self.dashboard.begin_fetch();
        let days = self.dashboard.window_days;
        let server = self.server.clone();
        let sender = self.task_sender.clone();

        self.status_message = format!("Loading {}-day summary...", days);
        self.log(&format!("[INFO] Fetching dashboard summary ({} days)", days));

        thread::spawn(move || {
            let client = SummaryClient::new(&server);
            match client.fetch_summary(days) {
                Ok(summary) => {
                    let _ = sender.send(TaskResult::SummaryLoaded {
                        token,
                        summary: Box::new(summary),
                    });
                }
                Err(e) => {
                    let _ = sender.send(TaskResult::SummaryFailed {
                        token,
                        message: e.to_string(),
                    });
                }
            }
        });
    }

    /// Send the confirmed delete for one street. No local removal; the
    /// row list refreshes with the next summary fetch.
    fn delete_street(&mut self, id: &str, name: &str) {
        let server = self.server.clone();
        let id = id.to_string();
        let name = name.to_string();
        let sender = self.task_sender.clone();

        self.log(&format!("[INFO] Deleting street '{}'", name));
        thread::spawn(move || {
            let client = SummaryClient::new(&server);
            match client.delete_street(&id) {
                Ok(()) => {
                    let _ = sender.send(TaskResult::StreetDeleted { name });
                }
                Err(e) => {
                    let _ = sender.send(TaskResult::DeleteFailed(format!(
                        "Failed to delete '{}': {}",
                        name, e
                    )));
                }
            }
        });
    }

    fn navigate_to(&mut self, route: &str) {
        let url = format!("{}{}", self.server.trim_end_matches('/'), route);
        match open_in_browser(&url) {
            Ok(()) => {
                self.log(&format!("[INFO] Opening {}", url));
                self.status_message = format!("Opened {}", url);
            }
            Err(e) => {
                self.log(&format!("[ERROR] Failed to open browser: {}", e));
                self.status_message = format!("Failed to open browser: {}", e);
            }
        }
    }

    /// Select a street for the drive view and reset the simulation
    fn select_street(&mut self, index: usize) {
        if index >= self.streets.len() {
            return;
        }
        let street = self.streets[index].clone();
        self.drive.switch_street(index, &street);
        self.log(&format!("[INFO] Switched to street '{}'", street.name));
    }

    // ---------- dashboard ----------

    fn show_dashboard(&mut self, ui: &mut egui::Ui) {
        let Some(summary) = self.dashboard.summary.clone() else {
            ui.add_space(40.0);
            ui.vertical_centered(|ui| {
                ui.heading("🛣 StreetWalk Dashboard");
                ui.add_space(10.0);
                if self.dashboard.loading {
                    ui.spinner();
                    ui.label("Loading summary...");
                } else {
                    ui.label("No data loaded yet.");
                    if ui.button("⟳ Load summary").clicked() {
                        self.fetch_summary();
                    }
                }
            });
            return;
        };

        egui::ScrollArea::vertical().show(ui, |ui| {
            self.show_stat_tiles(ui, &summary.totals);
            ui.add_space(8.0);
            self.show_views_chart(ui, &summary.views_chart);
            ui.add_space(8.0);

            ui.columns(3, |cols| {
                Self::show_ranked_list(
                    &mut cols[0],
                    "🏆 Most viewed",
                    &summary.top_viewed,
                    |s| format!("{} views", format_count(s.views)),
                );
                Self::show_ranked_list(
                    &mut cols[1],
                    "❤ Most liked",
                    &summary.top_liked,
                    |s| format!("{} likes", format_count(s.likes)),
                );
                Self::show_activity_list(&mut cols[2], &summary.recent_activity);
            });

            ui.add_space(8.0);
            ui.separator();
            self.show_street_list(ui);
            ui.add_space(8.0);
            ui.separator();
            ui.label(egui::RichText::new("🗺 Street map").strong());
            self.show_dashboard_map(ui);
        });
    }

    fn show_stat_tiles(&self, ui: &mut egui::Ui, totals: &Totals) {
        let tiles = [
            ("Streets", totals.total_streets),
            ("Views", totals.total_views),
            ("Likes", totals.total_likes),
            ("Walk", totals.walk_count),
            ("Drive", totals.drive_count),
            ("Fly", totals.fly_count),
            ("Sit", totals.sit_count),
        ];
        ui.horizontal_wrapped(|ui| {
            for (label, value) in tiles {
                ui.group(|ui| {
                    ui.set_min_width(90.0);
                    ui.vertical_centered(|ui| {
                        ui.label(egui::RichText::new(format_count(value)).size(20.0).strong());
                        ui.label(egui::RichText::new(label).weak());
                    });
                });
            }
        });
    }

    fn show_views_chart(&self, ui: &mut egui::Ui, chart: &ViewsChart) {
        ui.label(egui::RichText::new("📈 Daily views").strong());
        ui.label(egui::RichText::new(chart_meta(chart)).weak());

        if chart.data.is_empty() {
            ui.label("No view data for this window");
            return;
        }

        let desired = egui::vec2(ui.available_width(), 140.0);
        let (response, painter) = ui.allocate_painter(desired, egui::Sense::hover());
        let rect = response.rect;
        painter.rect_filled(rect, 4.0, ui.visuals().extreme_bg_color);

        let max = chart.data.iter().copied().max().unwrap_or(1).max(1) as f32;
        let n = chart.data.len();
        let slot = rect.width() / n as f32;
        let bar_w = (slot * 0.7).max(1.0);
        let label_every = (n / 10).max(1);

        for (i, value) in chart.data.iter().enumerate() {
            let h = (rect.height() - 24.0) * (*value as f32 / max);
            let x = rect.left() + slot * i as f32 + (slot - bar_w) / 2.0;
            let bar = egui::Rect::from_min_max(
                egui::pos2(x, rect.bottom() - 18.0 - h),
                egui::pos2(x + bar_w, rect.bottom() - 18.0),
            );
            painter.rect_filled(bar, 2.0, egui::Color32::from_rgb(102, 126, 234));

            if i % label_every == 0 {
                let raw = chart.labels.get(i).map(String::as_str).unwrap_or("");
                painter.text(
                    egui::pos2(x + bar_w / 2.0, rect.bottom() - 2.0),
                    egui::Align2::CENTER_BOTTOM,
                    format_chart_label(raw),
                    egui::FontId::proportional(9.0),
                    ui.visuals().weak_text_color(),
                );
            }
        }
    }

    fn show_ranked_list(
        ui: &mut egui::Ui,
        title: &str,
        streets: &[Street],
        metric: impl Fn(&Street) -> String,
    ) {
        ui.label(egui::RichText::new(title).strong());
        if streets.is_empty() {
            ui.label(egui::RichText::new("No streets yet").weak());
            return;
        }
        for street in streets {
            ui.horizontal(|ui| {
                ui.label(egui::RichText::new(&street.name).strong());
                ui.label(egui::RichText::new(street.mode.badge()).small().weak());
            });
            ui.horizontal(|ui| {
                ui.label(egui::RichText::new(street.location()).small());
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.label(egui::RichText::new(metric(street)).small().weak());
                });
            });
            ui.separator();
        }
    }

    fn show_activity_list(ui: &mut egui::Ui, activity: &[ActivityEvent]) {
        ui.label(egui::RichText::new("🕐 Recent activity").strong());
        if activity.is_empty() {
            ui.label(egui::RichText::new("No recent activity").weak());
            return;
        }
        for entry in activity {
            ui.horizontal(|ui| {
                ui.label(egui::RichText::new(&entry.event).strong());
                ui.label(&entry.street_name);
            });
            ui.label(egui::RichText::new(&entry.timestamp).small().weak());
            ui.separator();
        }
    }

    fn show_street_list(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label(egui::RichText::new("🛣 Streets").strong());
            ui.add(
                egui::TextEdit::singleline(&mut self.dashboard.query)
                    .hint_text("Search name, city, country...")
                    .desired_width(220.0),
            );

            egui::ComboBox::from_id_salt("mode_filter")
                .selected_text(self.dashboard.mode_filter.label())
                .show_ui(ui, |ui| {
                    ui.selectable_value(&mut self.dashboard.mode_filter, ModeFilter::All, "All modes");
                    ui.selectable_value(&mut self.dashboard.mode_filter, ModeFilter::Only(Mode::Walk), "WALK");
                    ui.selectable_value(&mut self.dashboard.mode_filter, ModeFilter::Only(Mode::Drive), "DRIVE");
                    ui.selectable_value(&mut self.dashboard.mode_filter, ModeFilter::Only(Mode::Fly), "FLY");
                    ui.selectable_value(&mut self.dashboard.mode_filter, ModeFilter::Only(Mode::Sit), "SIT");
                });
        });

        // Every keystroke recomputes from the authoritative collection
        let rows: Vec<StreetRow> = self
            .dashboard
            .filtered_streets()
            .into_iter()
            .map(|s| StreetRow {
                id: s.id.clone(),
                name: s.name.clone(),
                location: s.location(),
                badge: s.mode.badge(),
                metric: format!("{} views", format_count(s.views)),
                route: world_route(s),
            })
            .collect();

        if rows.is_empty() {
            ui.label(egui::RichText::new("No streets match").weak());
            return;
        }

        let mut to_navigate: Option<String> = None;
        for row in &rows {
            ui.horizontal(|ui| {
                // Row click navigates to the mode-appropriate world route
                if ui.link(egui::RichText::new(&row.name).strong()).clicked() {
                    to_navigate = Some(row.route.clone());
                }
                ui.label(egui::RichText::new(row.badge).small().weak());
                ui.label(egui::RichText::new(&row.location).small());

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    // Delete is a distinct control: it asks for
                    // confirmation and never triggers navigation
                    if ui.button("🗑").on_hover_text("Delete street").clicked() {
                        self.confirm_delete = Some((row.id.clone(), row.name.clone()));
                    }
                    if ui.button("▶ Open").clicked() {
                        to_navigate = Some(row.route.clone());
                    }
                    ui.label(egui::RichText::new(&row.metric).small().weak());
                });
            });
        }

        if let Some(route) = to_navigate {
            self.navigate_to(&route);
        }
    }

    fn show_dashboard_map(&mut self, ui: &mut egui::Ui) {
        if self.dash_markers.is_empty() {
            ui.label(egui::RichText::new("No streets with coordinates").weak());
            return;
        }

        let desired = egui::vec2(ui.available_width(), 220.0);
        let (response, painter) = ui.allocate_painter(desired, egui::Sense::hover());
        let rect = response.rect;

        let viewport = self.dash_viewport.unwrap_or_else(|| {
            map::fit_bounds(
                &self.dash_markers,
                rect.width() as f64,
                rect.height() as f64,
                (self.world_config.map_center_lat, self.world_config.map_center_lng),
            )
        });

        paint_map(
            &painter,
            rect,
            &viewport,
            &self.dash_markers,
            response.hover_pos(),
            ui.visuals().dark_mode,
        );
    }

    // ---------- drive ----------

    fn show_drive(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        if self.streets.is_empty() {
            ui.add_space(40.0);
            ui.vertical_centered(|ui| {
                ui.heading("🚗 Drive mode");
                ui.label("No streets loaded. Fetch the dashboard summary or pass a bootstrap file.");
            });
            return;
        }

        let index = self.drive.street_index.min(self.streets.len() - 1);
        let street = self.streets[index].clone();

        // Input only sets intent; the tick below is the single writer of
        // the continuous variables
        let input = InputState {
            key_forward: ctx.input(|i| {
                i.key_down(egui::Key::ArrowUp) || i.key_down(egui::Key::W)
            }),
            key_reverse: ctx.input(|i| {
                i.key_down(egui::Key::ArrowDown) || i.key_down(egui::Key::S)
            }),
            joystick_axis: self.joystick_axis,
            autopilot: self.drive_settings.autopilot,
        };
        self.drive.set_intent(resolve_direction(&input));

        // Media metadata arrival clears the loading indicator
        if self.drive.playback.loading {
            let known = street
                .segment_durations
                .get(self.drive.playback.segment)
                .copied()
                .filter(|d| d.is_finite() && *d > 0.0);
            if let Some(duration) = known {
                self.drive.playback.media_loaded(duration);
            }
        }

        let dt = ctx.input(|i| i.stable_dt).min(0.1);
        self.drive.tick(dt, self.drive_settings.shake, &street);

        self.show_drive_scene(ui, &street);
        ui.add_space(6.0);
        self.show_hud(ui, &street);
        ui.add_space(6.0);

        ui.horizontal(|ui| {
            let pause_text = if self.drive.paused { "▶ Resume" } else { "⏸ Pause" };
            if ui.button(pause_text).clicked() {
                self.drive.paused = !self.drive.paused;
            }
            if ui.button("⚙ Settings").clicked() {
                self.drive.settings_open = !self.drive.settings_open;
            }
            if ui.button("🗺 Map").clicked() {
                let size = ctx.screen_rect().size();
                self.drive_overlay.open(
                    &self.streets,
                    size.x as f64,
                    (size.y - 120.0) as f64,
                    (self.world_config.map_center_lat, self.world_config.map_center_lng),
                );
                self.drive.map_ready = true;
            }
            ui.label(egui::RichText::new("drive: ↑/W forward, ↓/S reverse, or drag the stick").weak());
        });

        self.show_settings_panel(ctx);
        self.show_drive_overlay(ctx);
    }

    /// First-person road scene with head-bob applied to the horizon
    fn show_drive_scene(&mut self, ui: &mut egui::Ui, street: &Street) {
        let desired = egui::vec2(ui.available_width(), 260.0);
        let (response, painter) = ui.allocate_painter(desired, egui::Sense::hover());
        let rect = response.rect;
        let night = self.drive_settings.night_mode;

        let sky = if night {
            egui::Color32::from_rgb(18, 20, 38)
        } else {
            egui::Color32::from_rgb(120, 160, 220)
        };
        let ground = if night {
            egui::Color32::from_rgb(24, 30, 26)
        } else {
            egui::Color32::from_rgb(64, 120, 82)
        };
        let asphalt = if night {
            egui::Color32::from_rgb(28, 30, 36)
        } else {
            egui::Color32::from_rgb(45, 48, 56)
        };

        let bob = self.drive.bob_offset;
        let horizon = rect.top() + rect.height() * 0.45 + bob;

        painter.rect_filled(
            egui::Rect::from_min_max(rect.min, egui::pos2(rect.right(), horizon)),
            0.0,
            sky,
        );
        painter.rect_filled(
            egui::Rect::from_min_max(egui::pos2(rect.left(), horizon), rect.max),
            0.0,
            ground,
        );

        // Road trapezoid
        let center_x = rect.center().x;
        let road = vec![
            egui::pos2(center_x - 14.0, horizon),
            egui::pos2(center_x + 14.0, horizon),
            egui::pos2(center_x + rect.width() * 0.38, rect.bottom()),
            egui::pos2(center_x - rect.width() * 0.38, rect.bottom()),
        ];
        painter.add(egui::Shape::convex_polygon(road, asphalt, egui::Stroke::NONE));

        // Center dashes scroll with playback position
        let phase = (self.drive.playback.position * 3.0).fract() as f32;
        for i in 0..6 {
            let t = ((i as f32 + phase) / 6.0).clamp(0.0, 1.0);
            let y = horizon + (rect.bottom() - horizon) * t * t;
            let w = 1.5 + 6.0 * t;
            let h = 3.0 + 14.0 * t;
            painter.rect_filled(
                egui::Rect::from_center_size(egui::pos2(center_x, y), egui::vec2(w, h)),
                1.0,
                egui::Color32::from_rgb(240, 220, 130),
            );
        }

        // Street banner appears only after the switch transition so the
        // HUD never shows a stale name
        if !self.drive.in_transition() {
            painter.text(
                egui::pos2(rect.left() + 12.0, rect.top() + 10.0),
                egui::Align2::LEFT_TOP,
                format!("{}  •  {}", street.name, street.location()),
                egui::FontId::proportional(16.0),
                egui::Color32::WHITE,
            );
        } else {
            // Fade overlay while the new street settles in
            let a = (self.drive.transition / sim::TRANSITION_SECS).clamp(0.0, 1.0);
            painter.rect_filled(
                rect,
                0.0,
                egui::Color32::from_black_alpha((a * 255.0) as u8),
            );
        }

        if self.drive.playback.loading {
            painter.text(
                rect.center(),
                egui::Align2::CENTER_CENTER,
                "⏳ loading segment...",
                egui::FontId::proportional(14.0),
                egui::Color32::LIGHT_GRAY,
            );
        }
    }

    fn show_hud(&mut self, ui: &mut egui::Ui, street: &Street) {
        let speed = self.drive.speed;
        let gear = gear_label(speed, self.drive.direction);
        let fuel = self.drive.fuel;

        ui.horizontal(|ui| {
            ui.group(|ui| {
                ui.vertical_centered(|ui| {
                    ui.label(egui::RichText::new(format!("{:>3.0}", speed)).size(26.0).strong());
                    ui.label(egui::RichText::new("km/h").weak());
                });
            });
            ui.group(|ui| {
                ui.vertical_centered(|ui| {
                    ui.label(egui::RichText::new(gear).size(26.0).strong());
                    ui.label(egui::RichText::new("gear").weak());
                });
            });

            ui.vertical(|ui| {
                ui.add(
                    egui::ProgressBar::new(fuel / 100.0)
                        .text(format!("⛽ {:.0}%", fuel))
                        .desired_width(180.0),
                );
                if !street.segments.is_empty() {
                    let pb = &self.drive.playback;
                    let frac = (pb.position / pb.duration.max(0.001)).clamp(0.0, 1.0) as f32;
                    ui.add(
                        egui::ProgressBar::new(frac)
                            .text(format!(
                                "segment {}/{}  {:.0}s",
                                pb.segment + 1,
                                street.segments.len(),
                                pb.position
                            ))
                            .desired_width(180.0),
                    );
                }
            });

            // Virtual joystick: vertical displacement maps to
            // forward/reverse with a dead zone
            self.joystick_axis = joystick(ui);
        });
    }

    fn show_settings_panel(&mut self, ctx: &egui::Context) {
        if !self.drive.settings_open {
            return;
        }
        let mut open = true;
        let mut changed = false;
        let mut reset = false;

        egui::Window::new("⚙ Drive Settings")
            .collapsible(false)
            .resizable(false)
            .open(&mut open)
            .show(ctx, |ui| {
                changed |= ui.checkbox(&mut self.drive_settings.autopilot, "Autopilot").changed();
                changed |= ui.checkbox(&mut self.drive_settings.night_mode, "Night mode").changed();
                changed |= ui.checkbox(&mut self.drive_settings.shake, "Camera shake").changed();
                changed |= ui.checkbox(&mut self.drive_settings.sound_effects, "Sound effects").changed();
                changed |= ui.checkbox(&mut self.drive_settings.video_audio, "Video audio").changed();
                changed |= ui
                    .add(egui::Slider::new(&mut self.drive_settings.volume, 0..=100).text("Volume"))
                    .changed();

                ui.add_space(8.0);
                if ui.button("Reset to defaults").clicked() {
                    reset = true;
                }
            });

        if reset {
            // Clears the stored bundle and reapplies defaults immediately
            self.drive_settings = DriveSettings::reset(self.settings_store.as_mut());
            self.log("[INFO] Drive settings reset to defaults");
        } else if changed {
            self.save_settings();
        }
        if !open {
            self.drive.settings_open = false;
        }
    }

    fn show_drive_overlay(&mut self, ctx: &egui::Context) {
        if !self.drive_overlay.visible {
            return;
        }

        let mut selected: Option<usize> = None;
        let mut close = false;

        egui::Window::new("🗺 Pick a street")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                let size = ctx.screen_rect().size();
                let desired = egui::vec2((size.x - 120.0).max(400.0), (size.y - 200.0).max(300.0));
                let (response, painter) = ui.allocate_painter(desired, egui::Sense::click());
                let rect = response.rect;

                paint_map(
                    &painter,
                    rect,
                    &self.drive_overlay.viewport,
                    self.drive_overlay.markers(),
                    response.hover_pos(),
                    ui.visuals().dark_mode,
                );

                if response.clicked() {
                    if let Some(pos) = response.interact_pointer_pos() {
                        let click = ((pos.x - rect.left()) as f64, (pos.y - rect.top()) as f64);
                        if let Some(hit) = map::hit_test(
                            self.drive_overlay.markers(),
                            &self.drive_overlay.viewport,
                            rect.width() as f64,
                            rect.height() as f64,
                            click,
                            12.0,
                        ) {
                            selected = Some(self.drive_overlay.markers()[hit].street_index);
                        }
                    }
                }

                if ui.button("Close").clicked() {
                    close = true;
                }
            });

        // Marker click selects the street and closes the overlay
        if let Some(index) = selected {
            self.select_street(index);
            self.drive_overlay.close();
        } else if close {
            self.drive_overlay.close();
        }
    }

    // ---------- console ----------

    fn show_console(&self, ui: &mut egui::Ui) {
        egui::ScrollArea::vertical()
            .stick_to_bottom(true)
            .show(ui, |ui| {
                for line in &self.console_log {
                    ui.label(egui::RichText::new(line).monospace().size(11.0));
                }
            });
    }

    // ---------- dialogs ----------

    fn show_alert(&mut self, ctx: &egui::Context) {
        let Some(message) = self.alert.clone() else { return };
        egui::Window::new("⚠ Load failed")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.add_space(6.0);
                ui.label(&message);
                ui.label(egui::RichText::new("The previous data is still shown.").weak());
                ui.add_space(6.0);
                if ui.button("OK").clicked() {
                    self.alert = None;
                }
            });
    }

    fn show_delete_confirm(&mut self, ctx: &egui::Context) {
        let Some((id, name)) = self.confirm_delete.clone() else { return };
        let mut decided = false;

        egui::Window::new("⚠ Delete street")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.add_space(6.0);
                ui.label(format!("Delete '{}' permanently?", name));
                ui.label(
                    egui::RichText::new("This action cannot be undone!")
                        .color(egui::Color32::from_rgb(200, 80, 80)),
                );
                ui.add_space(6.0);
                ui.horizontal(|ui| {
                    if ui.button("Cancel").clicked() {
                        // Declined: the destructive request is simply not sent
                        decided = true;
                    }
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui
                            .button(
                                egui::RichText::new("Delete")
                                    .color(egui::Color32::from_rgb(200, 80, 80)),
                            )
                            .clicked()
                        {
                            self.delete_street(&id, &name);
                            decided = true;
                        }
                    });
                });
            });

        if decided {
            self.confirm_delete = None;
        }
    }
}

impl eframe::App for StreetwalkApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Process background task results (non-blocking)
        while let Ok(result) = self.task_receiver.try_recv() {
            match result {
                TaskResult::SummaryLoaded { token, summary } => {
                    let street_count = summary.streets.len();
                    if self.dashboard.apply(token, *summary) {
                        self.log(&format!("[INFO] Summary loaded: {} streets", street_count));
                        self.status_message = format!("Loaded {} streets", street_count);

                        // Replace the shared snapshot wholesale and rebuild
                        // the derived map state
                        if let Some(s) = &self.dashboard.summary {
                            self.streets = s.streets.clone();
                            self.dash_markers = map::build_markers(&s.streets);
                        }
                        self.dash_viewport = Some(map::fit_bounds(
                            &self.dash_markers,
                            760.0,
                            220.0,
                            (self.world_config.map_center_lat, self.world_config.map_center_lng),
                        ));
                        self.drive_overlay.invalidate();
                        if self.drive.street_index >= self.streets.len() {
                            self.drive = DriveState::new();
                        }
                    } else {
                        self.log("[INFO] Dropped stale summary response");
                    }
                }
                TaskResult::SummaryFailed { token, message } => {
                    if self.dashboard.fail(token) {
                        self.log(&format!("[ERROR] Summary fetch failed: {}", message));
                        self.status_message = "Summary fetch failed".to_string();
                        self.alert = Some(message);
                    } else {
                        self.log("[INFO] Dropped stale fetch error");
                    }
                }
                TaskResult::StreetDeleted { name } => {
                    self.log(&format!("[INFO] Deleted street '{}'", name));
                    self.status_message = format!("Deleted '{}'", name);
                    // No optimistic removal: refresh via the next load
                    self.fetch_summary();
                }
                TaskResult::DeleteFailed(message) => {
                    self.log(&format!("[ERROR] {}", message));
                    self.status_message = message;
                }
            }
        }

        // Initial load on startup
        if !self.startup_fetch_triggered {
            self.startup_fetch_triggered = true;
            self.fetch_summary();
        }

        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("🛣 StreetWalk");
                ui.separator();

                // Identity header from the last summary
                let (user, role) = self
                    .dashboard
                    .summary
                    .as_ref()
                    .map(|s| (s.username.clone(), s.role.clone()))
                    .unwrap_or_default();
                if !user.is_empty() {
                    ui.label(format!("👤 {} ({})", user, if role.is_empty() { "viewer".to_string() } else { role }));
                    ui.separator();
                }

                ui.label("Server:");
                ui.add(egui::TextEdit::singleline(&mut self.server).desired_width(190.0));
                ui.separator();

                ui.label("Window:");
                let mut window_changed = false;
                for days in [7u32, 30, 90] {
                    let selected = self.dashboard.window_days == days;
                    if ui.selectable_label(selected, format!("{}d", days)).clicked() && !selected {
                        self.dashboard.window_days = days;
                        window_changed = true;
                    }
                }
                if ui.button("⟳").on_hover_text("Reload summary").clicked() {
                    window_changed = true;
                }
                if window_changed {
                    self.fetch_summary();
                }

                if self.dashboard.loading {
                    ui.spinner();
                }
            });
        });

        egui::TopBottomPanel::bottom("bottom_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(&self.status_message);
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            // Tab bar
            ui.horizontal(|ui| {
                ui.selectable_value(&mut self.current_tab, Tab::Dashboard, "📊 DASHBOARD");
                ui.selectable_value(&mut self.current_tab, Tab::Drive, "🚗 DRIVE");
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.selectable_value(&mut self.current_tab, Tab::Console, "🖥 CONSOLE");
                });
            });
            ui.separator();

            match self.current_tab {
                Tab::Dashboard => self.show_dashboard(ui),
                Tab::Drive => self.show_drive(ui, ctx),
                Tab::Console => self.show_console(ui),
            }
        });

        self.show_alert(ctx);
        self.show_delete_confirm(ctx);

        // The drive loop runs at the display refresh rate
        if self.current_tab == Tab::Drive || self.dashboard.loading {
            ctx.request_repaint();
        }
    }
}

/// Paint markers into a map rect; hovered markers get their popup drawn
/// beside them
fn paint_map(
    painter: &egui::Painter,
    rect: egui::Rect,
    viewport: &map::Viewport,
    markers: &[map::Marker],
    hover: Option<egui::Pos2>,
    dark: bool,
) {
    let bg = if dark {
        egui::Color32::from_rgb(22, 30, 40)
    } else {
        egui::Color32::from_rgb(214, 228, 238)
    };
    painter.rect_filled(rect, 4.0, bg);

    let w = rect.width() as f64;
    let h = rect.height() as f64;

    let hovered = hover.and_then(|pos| {
        let local = ((pos.x - rect.left()) as f64, (pos.y - rect.top()) as f64);
        map::hit_test(markers, viewport, w, h, local, 12.0)
    });

    for (i, marker) in markers.iter().enumerate() {
        let (x, y) = map::screen_pos(viewport, marker.lat, marker.lng, w, h);
        let pos = egui::pos2(rect.left() + x as f32, rect.top() + y as f32);
        if !rect.contains(pos) {
            continue;
        }
        let color = if hovered == Some(i) {
            egui::Color32::from_rgb(246, 173, 85)
        } else {
            egui::Color32::from_rgb(102, 126, 234)
        };
        painter.circle_filled(pos, 5.0, color);
        painter.circle_stroke(pos, 5.0, egui::Stroke::new(1.0, egui::Color32::WHITE));
    }

    if let Some(i) = hovered {
        let marker = &markers[i];
        let (x, y) = map::screen_pos(viewport, marker.lat, marker.lng, w, h);
        let anchor = egui::pos2(rect.left() + x as f32 + 10.0, rect.top() + y as f32 - 10.0);
        painter.text(
            anchor,
            egui::Align2::LEFT_BOTTOM,
            &marker.popup,
            egui::FontId::proportional(11.0),
            if dark { egui::Color32::WHITE } else { egui::Color32::BLACK },
        );
    }
}

/// Virtual joystick: returns the vertical axis, +1 fully forward
fn joystick(ui: &mut egui::Ui) -> f32 {
    let desired = egui::vec2(56.0, 92.0);
    let (response, painter) = ui.allocate_painter(desired, egui::Sense::drag());
    let rect = response.rect;
    let center = rect.center();
    let half = rect.height() / 2.0 - 12.0;

    let axis = if response.dragged() {
        response
            .interact_pointer_pos()
            .map(|pos| ((center.y - pos.y) / half).clamp(-1.0, 1.0))
            .unwrap_or(0.0)
    } else {
        0.0
    };

    painter.rect_filled(rect, 8.0, ui.visuals().extreme_bg_color);
    painter.line_segment(
        [
            egui::pos2(center.x, rect.top() + 10.0),
            egui::pos2(center.x, rect.bottom() - 10.0),
        ],
        egui::Stroke::new(2.0, ui.visuals().weak_text_color()),
    );
    let knob = egui::pos2(center.x, center.y - axis * half);
    painter.circle_filled(knob, 10.0, egui::Color32::from_rgb(102, 126, 234));
    painter.circle_stroke(knob, 10.0, egui::Stroke::new(1.5, egui::Color32::WHITE));

    axis
}
