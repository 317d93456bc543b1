use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub font_size: f64,
    pub background: String,
    pub polygon_stroke_width: f64,
    pub polygon_fill_opacity: f64,
    pub default_polygon_color: String,
    pub label_background: String,
    pub label_border: String,
    pub manual_label_border: String,
    pub label_text: String,
    pub leader_color: String,
    pub leader_outline: String,
    pub leader_width: f64,
    pub leader_outline_width: f64,
    pub name_text: String,
    pub name_halo: String,
    pub debug_vertex_field: String,
    pub debug_label_field: String,
    pub debug_center_field: String,
}

impl Theme {
    pub fn classic() -> Self {
        Self {
            font_family: "\"Helvetica Neue\", Arial, sans-serif".to_string(),
            font_size: 12.0,
            background: "#F4F1EA".to_string(),
            polygon_stroke_width: 2.0,
            polygon_fill_opacity: 0.18,
            default_polygon_color: "#3388FF".to_string(),
            label_background: "#FFFFFF".to_string(),
            label_border: "#555555".to_string(),
            manual_label_border: "#D9480F".to_string(),
            label_text: "#222222".to_string(),
            leader_color: "#333333".to_string(),
            leader_outline: "#FFFFFF".to_string(),
            leader_width: 1.2,
            leader_outline_width: 3.6,
            name_text: "#1B1B1B".to_string(),
            name_halo: "#FFFFFF".to_string(),
            debug_vertex_field: "#E03131".to_string(),
            debug_label_field: "#1971C2".to_string(),
            debug_center_field: "#2F9E44".to_string(),
        }
    }

    pub fn modern() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 11.0,
            background: "#1E2229".to_string(),
            polygon_stroke_width: 1.6,
            polygon_fill_opacity: 0.24,
            default_polygon_color: "#74C0FC".to_string(),
            label_background: "#2B313B".to_string(),
            label_border: "#7A8AA6".to_string(),
            manual_label_border: "#FFA94D".to_string(),
            label_text: "#E9EEF5".to_string(),
            leader_color: "#C7D2E5".to_string(),
            leader_outline: "#14171C".to_string(),
            leader_width: 1.0,
            leader_outline_width: 3.0,
            name_text: "#F8FAFF".to_string(),
            name_halo: "#14171C".to_string(),
            debug_vertex_field: "#FF8787".to_string(),
            debug_label_field: "#74C0FC".to_string(),
            debug_center_field: "#8CE99A".to_string(),
        }
    }
}
