//! Street map: marker building, viewport fitting and hit testing.
//!
//! Pure Web-Mercator math; painting stays in the UI layer. The full-map
//! overlay is built lazily on first open and reused afterwards.

use std::f64::consts::PI;

use crate::models::Street;

/// Marker cap for the dashboard map
pub const MAX_MARKERS: usize = 400;
/// Fixed padding around fitted bounds, in screen pixels
pub const FIT_PADDING: f64 = 40.0;
/// Zoom ceiling when fitting bounds
pub const MAX_FIT_ZOOM: f64 = 16.0;
/// Zoom used when only a single point exists
pub const SINGLE_POINT_ZOOM: f64 = 12.0;

const TILE_SIZE: f64 = 256.0;

/// One plotted street location
#[derive(Debug, Clone)]
pub struct Marker {
    pub street_index: usize,
    pub lat: f64,
    pub lng: f64,
    pub popup: String,
}

/// Popup body: name, location, type and mode
fn popup_text(street: &Street) -> String {
    format!(
        "{}\n{}\n{} / {}",
        street.name,
        street.location(),
        street.content_type.as_str(),
        street.mode.as_str()
    )
}

/// Markers for every street with valid coordinates, capped at
/// `MAX_MARKERS` in collection order.
pub fn build_markers(streets: &[Street]) -> Vec<Marker> {
    streets
        .iter()
        .enumerate()
        .filter(|(_, s)| s.has_coords())
        .take(MAX_MARKERS)
        .map(|(i, s)| Marker {
            street_index: i,
            lat: s.lat.unwrap_or(0.0),
            lng: s.lng.unwrap_or(0.0),
            popup: popup_text(s),
        })
        .collect()
}

/// Map camera: center plus zoom level
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub center_lat: f64,
    pub center_lng: f64,
    pub zoom: f64,
}

/// Normalized Web-Mercator projection, both axes in 0..1
fn project(lat: f64, lng: f64) -> (f64, f64) {
    let lat = lat.clamp(-85.05112878, 85.05112878);
    let x = (lng + 180.0) / 360.0;
    let lat_rad = lat.to_radians();
    let y = (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0;
    (x, y)
}

fn unproject(x: f64, y: f64) -> (f64, f64) {
    let lng = x * 360.0 - 180.0;
    let lat = (PI * (1.0 - 2.0 * y)).sinh().atan().to_degrees();
    (lat, lng)
}

/// Fit a viewport around the markers. With fewer than two points the
/// camera centers on the fallback (or the lone point) instead of
/// computing bounds; with two or more, every point fits inside the view
/// with fixed padding, capped at the maximum zoom.
pub fn fit_bounds(
    markers: &[Marker],
    view_w: f64,
    view_h: f64,
    fallback: (f64, f64),
) -> Viewport {
    match markers.len() {
        0 => Viewport {
            center_lat: fallback.0,
            center_lng: fallback.1,
            zoom: SINGLE_POINT_ZOOM,
        },
        1 => Viewport {
            center_lat: markers[0].lat,
            center_lng: markers[0].lng,
            zoom: SINGLE_POINT_ZOOM,
        },
        _ => {
            let mut min_x = f64::MAX;
            let mut min_y = f64::MAX;
            let mut max_x = f64::MIN;
            let mut max_y = f64::MIN;
            for m in markers {
                let (x, y) = project(m.lat, m.lng);
                min_x = min_x.min(x);
                min_y = min_y.min(y);
                max_x = max_x.max(x);
                max_y = max_y.max(y);
            }

            let usable_w = (view_w - 2.0 * FIT_PADDING).max(1.0);
            let usable_h = (view_h - 2.0 * FIT_PADDING).max(1.0);
            let span_x = (max_x - min_x).max(1e-9);
            let span_y = (max_y - min_y).max(1e-9);

            // Largest zoom where the padded bounds still fit both axes
            let zoom_x = (usable_w / (TILE_SIZE * span_x)).log2();
            let zoom_y = (usable_h / (TILE_SIZE * span_y)).log2();
            let zoom = zoom_x.min(zoom_y).min(MAX_FIT_ZOOM).max(0.0);

            let (center_lat, center_lng) =
                unproject((min_x + max_x) / 2.0, (min_y + max_y) / 2.0);
            Viewport { center_lat, center_lng, zoom }
        }
    }
}

/// Screen position of a lat/lng within a view of the given size
pub fn screen_pos(
    viewport: &Viewport,
    lat: f64,
    lng: f64,
    view_w: f64,
    view_h: f64,
) -> (f64, f64) {
    let scale = TILE_SIZE * viewport.zoom.exp2();
    let (px, py) = project(lat, lng);
    let (cx, cy) = project(viewport.center_lat, viewport.center_lng);
    (
        view_w / 2.0 + (px - cx) * scale,
        view_h / 2.0 + (py - cy) * scale,
    )
}

/// Index of the closest marker within `radius` pixels of a click
pub fn hit_test(
    markers: &[Marker],
    viewport: &Viewport,
    view_w: f64,
    view_h: f64,
    click: (f64, f64),
    radius: f64,
) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, m) in markers.iter().enumerate() {
        let (x, y) = screen_pos(viewport, m.lat, m.lng, view_w, view_h);
        let d2 = (x - click.0).powi(2) + (y - click.1).powi(2);
        if d2 <= radius * radius && best.map_or(true, |(_, bd)| d2 < bd) {
            best = Some((i, d2));
        }
    }
    best.map(|(i, _)| i)
}

/// Full-screen street map overlay, initialized on first open
pub struct MapOverlay {
    pub visible: bool,
    markers: Option<Vec<Marker>>,
    pub viewport: Viewport,
}

impl Default for MapOverlay {
    fn default() -> Self {
        Self {
            visible: false,
            markers: None,
            viewport: Viewport {
                center_lat: 0.0,
                center_lng: 0.0,
                zoom: SINGLE_POINT_ZOOM,
            },
        }
    }
}

impl MapOverlay {
    pub fn is_initialized(&self) -> bool {
        self.markers.is_some()
    }

    /// Open the overlay, building markers and fitting the viewport only
    /// on the first call; later opens reuse the existing state.
    pub fn open(
        &mut self,
        streets: &[Street],
        view_w: f64,
        view_h: f64,
        fallback: (f64, f64),
    ) {
        if self.markers.is_none() {
            let markers = build_markers(streets);
            self.viewport = fit_bounds(&markers, view_w, view_h, fallback);
            self.markers = Some(markers);
        }
        self.visible = true;
    }

    pub fn close(&mut self) {
        self.visible = false;
    }

    pub fn markers(&self) -> &[Marker] {
        self.markers.as_deref().unwrap_or(&[])
    }

    /// Drop cached markers so the next open rebuilds from a fresh
    /// street collection
    pub fn invalidate(&mut self) {
        self.markers = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Mode, Street};

    fn street_at(name: &str, lat: Option<f64>, lng: Option<f64>) -> Street {
        Street {
            id: name.to_string(),
            name: name.to_string(),
            city: "Dubai".to_string(),
            country: "UAE".to_string(),
            lat,
            lng,
            mode: Mode::Walk,
            ..Default::default()
        }
    }

    #[test]
    fn test_markers_skip_missing_coords() {
        let streets = vec![
            street_at("a", Some(25.0), Some(55.0)),
            street_at("b", None, Some(55.0)),
            street_at("c", Some(25.1), Some(55.1)),
        ];
        let markers = build_markers(&streets);
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0].street_index, 0);
        assert_eq!(markers[1].street_index, 2);
    }

    #[test]
    fn test_markers_capped() {
        let streets: Vec<Street> = (0..500)
            .map(|i| street_at(&format!("s{}", i), Some(25.0), Some(55.0)))
            .collect();
        assert_eq!(build_markers(&streets).len(), MAX_MARKERS);
    }

    #[test]
    fn test_popup_contents() {
        let streets = vec![street_at("Main St", Some(25.0), Some(55.0))];
        let markers = build_markers(&streets);
        assert!(markers[0].popup.contains("Main St"));
        assert!(markers[0].popup.contains("Dubai, UAE"));
        assert!(markers[0].popup.contains("video"));
        assert!(markers[0].popup.contains("walk"));
    }

    #[test]
    fn test_fit_bounds_single_point_centers() {
        let streets = vec![street_at("a", Some(25.2), Some(55.3))];
        let markers = build_markers(&streets);
        let vp = fit_bounds(&markers, 800.0, 600.0, (0.0, 0.0));
        assert!((vp.center_lat - 25.2).abs() < 1e-9);
        assert!((vp.center_lng - 55.3).abs() < 1e-9);
        assert_eq!(vp.zoom, SINGLE_POINT_ZOOM);
    }

    #[test]
    fn test_fit_bounds_contains_all_points_with_padding() {
        let streets = vec![
            street_at("a", Some(25.0), Some(55.0)),
            street_at("b", Some(25.5), Some(55.8)),
            street_at("c", Some(24.8), Some(55.4)),
        ];
        let markers = build_markers(&streets);
        let (w, h) = (800.0, 600.0);
        let vp = fit_bounds(&markers, w, h, (0.0, 0.0));
        assert!(vp.zoom <= MAX_FIT_ZOOM);
        for m in &markers {
            let (x, y) = screen_pos(&vp, m.lat, m.lng, w, h);
            assert!(x >= FIT_PADDING - 1.0 && x <= w - FIT_PADDING + 1.0);
            assert!(y >= FIT_PADDING - 1.0 && y <= h - FIT_PADDING + 1.0);
        }
    }

    #[test]
    fn test_fit_bounds_respects_max_zoom() {
        // Two nearly coincident points would need an enormous zoom
        let streets = vec![
            street_at("a", Some(25.200000), Some(55.300000)),
            street_at("b", Some(25.200001), Some(55.300001)),
        ];
        let markers = build_markers(&streets);
        let vp = fit_bounds(&markers, 800.0, 600.0, (0.0, 0.0));
        assert_eq!(vp.zoom, MAX_FIT_ZOOM);
    }

    #[test]
    fn test_hit_test_picks_nearest_marker() {
        let streets = vec![
            street_at("a", Some(25.0), Some(55.0)),
            street_at("b", Some(25.5), Some(55.8)),
        ];
        let markers = build_markers(&streets);
        let vp = fit_bounds(&markers, 800.0, 600.0, (0.0, 0.0));
        let (x, y) = screen_pos(&vp, 25.5, 55.8, 800.0, 600.0);
        assert_eq!(hit_test(&markers, &vp, 800.0, 600.0, (x + 2.0, y - 2.0), 12.0), Some(1));
        assert_eq!(hit_test(&markers, &vp, 800.0, 600.0, (x + 200.0, y), 12.0), None);
    }

    #[test]
    fn test_overlay_lazy_init_and_reuse() {
        let mut overlay = MapOverlay::default();
        assert!(!overlay.is_initialized());

        let streets = vec![street_at("a", Some(25.0), Some(55.0))];
        overlay.open(&streets, 800.0, 600.0, (0.0, 0.0));
        assert!(overlay.visible);
        assert!(overlay.is_initialized());
        assert_eq!(overlay.markers().len(), 1);

        // Reopening with a different collection keeps the cached markers
        overlay.close();
        let more = vec![
            street_at("a", Some(25.0), Some(55.0)),
            street_at("b", Some(26.0), Some(56.0)),
        ];
        overlay.open(&more, 800.0, 600.0, (0.0, 0.0));
        assert_eq!(overlay.markers().len(), 1);

        overlay.invalidate();
        overlay.open(&more, 800.0, 600.0, (0.0, 0.0));
        assert_eq!(overlay.markers().len(), 2);
    }
}
