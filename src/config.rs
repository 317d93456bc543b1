use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Two labeled vertices closer than this (screen pixels) compete; the
    /// sharper one wins.
    pub min_vertex_distance_px: f64,
    /// Vertices whose interior angle exceeds `180 - min_vertex_angle_deg`
    /// are considered straight and skipped.
    pub min_vertex_angle_deg: f64,
    pub initial_offset_px: f64,
    pub initial_jitter_px: f64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            min_vertex_distance_px: 30.0,
            min_vertex_angle_deg: 10.0,
            initial_offset_px: 60.0,
            initial_jitter_px: 45.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForceConfig {
    pub vertex_repulsion_strength: f64,
    pub vertex_padding_px: f64,
    pub falloff: f64,
    pub label_repulsion_strength: f64,
    pub label_penetration_strength: f64,
    pub label_buffer_px: f64,
    pub spring_strength: f64,
    /// Double the anchor spring on odd vertex indices.
    pub alternate_spring_boost: bool,
    pub center_repulsion_strength: f64,
    pub leader_avoidance_strength: f64,
    pub force_scale: f64,
    pub damping: f64,
    pub max_label_distance_px: f64,
    pub viewport_padding_px: f64,
}

impl Default for ForceConfig {
    fn default() -> Self {
        Self {
            vertex_repulsion_strength: 200.0,
            vertex_padding_px: 15.0,
            falloff: 2.0,
            label_repulsion_strength: 0.6,
            label_penetration_strength: 30.0,
            label_buffer_px: 2.0,
            spring_strength: 0.05,
            alternate_spring_boost: false,
            center_repulsion_strength: 400.0,
            leader_avoidance_strength: 2.0,
            force_scale: 0.2,
            damping: 0.8,
            max_label_distance_px: 150.0,
            viewport_padding_px: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    pub max_iterations: usize,
    pub steps_per_tick: usize,
    /// Average per-step kinetic energy (px²) below which a run settles.
    pub energy_floor: f64,
    /// Relative energy change between ticks still counted as "stable".
    pub energy_change_tolerance: f64,
    pub stable_ticks: usize,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            max_iterations: 300,
            steps_per_tick: 5,
            energy_floor: 0.001,
            energy_change_tolerance: 0.01,
            stable_ticks: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameConfig {
    pub offset_px: f64,
    pub padding_px: f64,
}

impl Default for NameConfig {
    fn default() -> Self {
        Self {
            offset_px: 40.0,
            padding_px: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelTextConfig {
    pub height_px: f64,
    pub char_width_px: f64,
    pub padding_px: f64,
    pub font_family: String,
    pub font_size: f64,
    /// Measure label text with a system font instead of the per-character
    /// estimate.
    pub measure_text: bool,
}

impl Default for LabelTextConfig {
    fn default() -> Self {
        Self {
            height_px: 20.0,
            char_width_px: 7.0,
            padding_px: 12.0,
            font_family: "Inter, Segoe UI, system-ui, sans-serif".to_string(),
            font_size: 12.0,
            measure_text: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SolverConfig {
    pub selection: SelectionConfig,
    pub forces: ForceConfig,
    pub schedule: ScheduleConfig,
    pub names: NameConfig,
    pub label: LabelTextConfig,
}

/// Partial solver settings, as pushed from UI controls or a config file.
/// Only the fields that are present are merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SolverSettings {
    pub min_vertex_distance: Option<f64>,
    pub min_vertex_angle: Option<f64>,
    pub initial_offset: Option<f64>,
    pub initial_jitter: Option<f64>,
    pub vertex_repulsion_strength: Option<f64>,
    pub vertex_padding: Option<f64>,
    pub falloff: Option<f64>,
    pub label_repulsion_strength: Option<f64>,
    pub label_penetration_strength: Option<f64>,
    pub label_buffer: Option<f64>,
    pub spring_strength: Option<f64>,
    pub alternate_spring_boost: Option<bool>,
    pub center_repulsion_strength: Option<f64>,
    pub leader_avoidance_strength: Option<f64>,
    pub force_scale: Option<f64>,
    pub damping: Option<f64>,
    pub max_label_distance: Option<f64>,
    pub viewport_padding: Option<f64>,
    pub max_iterations: Option<usize>,
    pub steps_per_tick: Option<usize>,
    pub energy_floor: Option<f64>,
    pub energy_change_tolerance: Option<f64>,
    pub stable_ticks: Option<usize>,
    pub name_offset: Option<f64>,
    pub name_padding: Option<f64>,
    pub label_height: Option<f64>,
    pub char_width: Option<f64>,
    pub label_padding: Option<f64>,
    pub font_family: Option<String>,
    pub font_size: Option<f64>,
    pub measure_text: Option<bool>,
}

fn non_negative(value: f64) -> Option<f64> {
    value.is_finite().then(|| value.max(0.0))
}

impl SolverSettings {
    pub fn apply(&self, config: &mut SolverConfig) {
        let selection = &mut config.selection;
        if let Some(v) = self.min_vertex_distance.and_then(non_negative) {
            selection.min_vertex_distance_px = v;
        }
        if let Some(v) = self.min_vertex_angle.and_then(non_negative) {
            selection.min_vertex_angle_deg = v.min(180.0);
        }
        if let Some(v) = self.initial_offset.and_then(non_negative) {
            selection.initial_offset_px = v;
        }
        if let Some(v) = self.initial_jitter.and_then(non_negative) {
            selection.initial_jitter_px = v;
        }

        let forces = &mut config.forces;
        if let Some(v) = self.vertex_repulsion_strength.and_then(non_negative) {
            forces.vertex_repulsion_strength = v;
        }
        if let Some(v) = self.vertex_padding.and_then(non_negative) {
            forces.vertex_padding_px = v;
        }
        if let Some(v) = self.falloff.and_then(non_negative) {
            // Below 1 the centroid term would grow with distance.
            forces.falloff = v.max(1.0);
        }
        if let Some(v) = self.label_repulsion_strength.and_then(non_negative) {
            forces.label_repulsion_strength = v;
        }
        if let Some(v) = self.label_penetration_strength.and_then(non_negative) {
            forces.label_penetration_strength = v;
        }
        if let Some(v) = self.label_buffer.and_then(non_negative) {
            forces.label_buffer_px = v;
        }
        if let Some(v) = self.spring_strength.and_then(non_negative) {
            forces.spring_strength = v;
        }
        if let Some(v) = self.alternate_spring_boost {
            forces.alternate_spring_boost = v;
        }
        if let Some(v) = self.center_repulsion_strength.and_then(non_negative) {
            forces.center_repulsion_strength = v;
        }
        if let Some(v) = self.leader_avoidance_strength.and_then(non_negative) {
            forces.leader_avoidance_strength = v;
        }
        if let Some(v) = self.force_scale.and_then(non_negative) {
            forces.force_scale = v;
        }
        if let Some(v) = self.damping.and_then(non_negative) {
            forces.damping = v.min(0.99);
        }
        if let Some(v) = self.max_label_distance.and_then(non_negative) {
            forces.max_label_distance_px = v;
        }
        if let Some(v) = self.viewport_padding.and_then(non_negative) {
            forces.viewport_padding_px = v;
        }

        let schedule = &mut config.schedule;
        if let Some(v) = self.max_iterations {
            schedule.max_iterations = v.max(1);
        }
        if let Some(v) = self.steps_per_tick {
            schedule.steps_per_tick = v.max(1);
        }
        if let Some(v) = self.energy_floor.and_then(non_negative) {
            schedule.energy_floor = v;
        }
        if let Some(v) = self.energy_change_tolerance.and_then(non_negative) {
            schedule.energy_change_tolerance = v;
        }
        if let Some(v) = self.stable_ticks {
            schedule.stable_ticks = v.max(1);
        }

        if let Some(v) = self.name_offset.and_then(non_negative) {
            config.names.offset_px = v;
        }
        if let Some(v) = self.name_padding.and_then(non_negative) {
            config.names.padding_px = v;
        }

        let label = &mut config.label;
        if let Some(v) = self.label_height.and_then(non_negative) {
            label.height_px = v;
        }
        if let Some(v) = self.char_width.and_then(non_negative) {
            label.char_width_px = v;
        }
        if let Some(v) = self.label_padding.and_then(non_negative) {
            label.padding_px = v;
        }
        if let Some(v) = &self.font_family {
            label.font_family = v.clone();
        }
        if let Some(v) = self.font_size.and_then(non_negative) {
            label.font_size = v;
        }
        if let Some(v) = self.measure_text {
            label.measure_text = v;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub width: f64,
    pub height: f64,
    pub background: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
            background: "#F4F1EA".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub theme: Theme,
    pub solver: SolverConfig,
    pub render: RenderConfig,
}

impl Default for Config {
    fn default() -> Self {
        let theme = Theme::classic();
        let render = RenderConfig {
            background: theme.background.clone(),
            ..Default::default()
        };
        Self {
            theme,
            solver: SolverConfig::default(),
            render,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    font_size: Option<f64>,
    background: Option<String>,
    polygon_stroke_width: Option<f64>,
    polygon_fill_opacity: Option<f64>,
    label_background: Option<String>,
    label_border: Option<String>,
    manual_label_border: Option<String>,
    label_text_color: Option<String>,
    leader_color: Option<String>,
    leader_outline_color: Option<String>,
    leader_width: Option<f64>,
    leader_outline_width: Option<f64>,
    name_text_color: Option<String>,
    name_halo_color: Option<String>,
    debug_vertex_color: Option<String>,
    debug_label_color: Option<String>,
    debug_center_color: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RenderConfigFile {
    width: Option<f64>,
    height: Option<f64>,
    background: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    solver: Option<SolverSettings>,
    render: Option<RenderConfigFile>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Parse a JSON5 config document on top of the defaults.
pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let parsed: ConfigFile = json5::from_str(contents)?;

    if let Some(theme_name) = parsed.theme.as_deref() {
        if theme_name == "modern" || theme_name == "dark" {
            config.theme = Theme::modern();
        } else if theme_name == "classic" || theme_name == "default" {
            config.theme = Theme::classic();
        } else {
            log::warn!("unknown theme `{theme_name}`, keeping the default");
        }
    }

    if let Some(vars) = parsed.theme_variables {
        let theme = &mut config.theme;
        if let Some(v) = vars.font_family {
            theme.font_family = v;
        }
        if let Some(v) = vars.font_size {
            theme.font_size = v;
        }
        if let Some(v) = vars.background {
            theme.background = v;
        }
        if let Some(v) = vars.polygon_stroke_width {
            theme.polygon_stroke_width = v;
        }
        if let Some(v) = vars.polygon_fill_opacity {
            theme.polygon_fill_opacity = v.clamp(0.0, 1.0);
        }
        if let Some(v) = vars.label_background {
            theme.label_background = v;
        }
        if let Some(v) = vars.label_border {
            theme.label_border = v;
        }
        if let Some(v) = vars.manual_label_border {
            theme.manual_label_border = v;
        }
        if let Some(v) = vars.label_text_color {
            theme.label_text = v;
        }
        if let Some(v) = vars.leader_color {
            theme.leader_color = v;
        }
        if let Some(v) = vars.leader_outline_color {
            theme.leader_outline = v;
        }
        if let Some(v) = vars.leader_width {
            theme.leader_width = v;
        }
        if let Some(v) = vars.leader_outline_width {
            theme.leader_outline_width = v;
        }
        if let Some(v) = vars.name_text_color {
            theme.name_text = v;
        }
        if let Some(v) = vars.name_halo_color {
            theme.name_halo = v;
        }
        if let Some(v) = vars.debug_vertex_color {
            theme.debug_vertex_field = v;
        }
        if let Some(v) = vars.debug_label_color {
            theme.debug_label_field = v;
        }
        if let Some(v) = vars.debug_center_color {
            theme.debug_center_field = v;
        }
    }

    if let Some(settings) = parsed.solver {
        settings.apply(&mut config.solver);
    }

    config.render.background = config.theme.background.clone();
    if let Some(render) = parsed.render {
        if let Some(v) = render.width {
            config.render.width = v;
        }
        if let Some(v) = render.height {
            config.render.height = v;
        }
        if let Some(v) = render.background {
            config.render.background = v;
        }
    }

    Ok(config)
}
