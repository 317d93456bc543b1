use fontdb::{Database, Family, Query, Stretch, Style, Weight};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Mutex;
use ttf_parser::Face;

use crate::config::LabelTextConfig;
use crate::layout::LabelSize;

static TEXT_MEASURER: Lazy<Mutex<TextMeasurer>> = Lazy::new(|| Mutex::new(TextMeasurer::new()));

/// Width of `text` in pixels using the first installed font matching
/// `font_family`. `None` when no usable font is found.
pub fn measure_text_width(text: &str, font_size: f64, font_family: &str) -> Option<f64> {
    if text.is_empty() || font_size <= 0.0 {
        return Some(0.0);
    }
    let mut guard = TEXT_MEASURER.lock().ok()?;
    guard.measure(text, font_size, font_family)
}

/// Pixel size of a label box holding `text`.
pub fn label_size(text: &str, config: &LabelTextConfig) -> LabelSize {
    let estimate = || text.chars().count() as f64 * config.char_width_px;
    let text_width = if config.measure_text {
        measure_text_width(text, config.font_size, &config.font_family).unwrap_or_else(estimate)
    } else {
        estimate()
    };
    LabelSize {
        width: text_width + config.padding_px,
        height: config.height_px,
    }
}

struct TextMeasurer {
    db: Database,
    loaded_system_fonts: bool,
    cache: HashMap<String, Option<FontAdvances>>,
}

impl TextMeasurer {
    fn new() -> Self {
        Self {
            db: Database::new(),
            loaded_system_fonts: false,
            cache: HashMap::new(),
        }
    }

    fn measure(&mut self, text: &str, font_size: f64, font_family: &str) -> Option<f64> {
        let family_key = normalize_family_key(font_family);
        if !self.cache.contains_key(&family_key) {
            let advances = self.load_advances(font_family);
            if advances.is_none() {
                log::debug!("no font found for `{family_key}`, using estimated label widths");
            }
            self.cache.insert(family_key.clone(), advances);
        }
        let advances = self.cache.get(&family_key)?.as_ref()?;
        Some(advances.width(text, font_size))
    }

    fn load_advances(&mut self, font_family: &str) -> Option<FontAdvances> {
        let mut names: Vec<String> = Vec::new();
        let mut generics: Vec<Option<Family<'static>>> = Vec::new();
        for part in font_family.split(',') {
            let raw = part.trim().trim_matches('"').trim_matches('\'');
            if raw.is_empty() {
                continue;
            }
            match raw.to_ascii_lowercase().as_str() {
                "serif" => generics.push(Some(Family::Serif)),
                "sans-serif" | "system-ui" | "-apple-system" | "ui-sans-serif" => {
                    generics.push(Some(Family::SansSerif))
                }
                "monospace" | "ui-monospace" => generics.push(Some(Family::Monospace)),
                _ => {
                    names.push(raw.to_string());
                    generics.push(None);
                }
            }
        }
        if generics.is_empty() {
            generics.push(Some(Family::SansSerif));
        }

        let mut named = names.iter();
        let families: Vec<Family<'_>> = generics
            .into_iter()
            .filter_map(|generic| match generic {
                Some(family) => Some(family),
                None => named.next().map(|name| Family::Name(name.as_str())),
            })
            .collect();

        if !self.loaded_system_fonts {
            self.db.load_system_fonts();
            self.loaded_system_fonts = true;
        }

        let query = Query {
            families: &families,
            weight: Weight::NORMAL,
            stretch: Stretch::Normal,
            style: Style::Normal,
        };
        let id = self.db.query(&query)?;
        self.db
            .with_face_data(id, |data, index| {
                Face::parse(data, index).ok().map(|face| FontAdvances::from_face(&face))
            })
            .flatten()
    }
}

/// ASCII advance widths of one face, in font units.
struct FontAdvances {
    units_per_em: u16,
    ascii: [u16; 128],
}

impl FontAdvances {
    fn from_face(face: &Face<'_>) -> Self {
        let mut ascii = [0u16; 128];
        for byte in 0u8..=127 {
            if let Some(glyph_id) = face.glyph_index(byte as char) {
                ascii[byte as usize] = face.glyph_hor_advance(glyph_id).unwrap_or(0);
            }
        }
        Self {
            units_per_em: face.units_per_em().max(1),
            ascii,
        }
    }

    fn width(&self, text: &str, font_size: f64) -> f64 {
        let scale = font_size / self.units_per_em as f64;
        let fallback = font_size * 0.56;
        text.chars()
            .filter(|ch| *ch != '\n')
            .map(|ch| {
                let advance = if ch.is_ascii() { self.ascii[ch as usize] } else { 0 };
                if advance == 0 {
                    fallback
                } else {
                    advance as f64 * scale
                }
            })
            .sum::<f64>()
            .max(0.0)
    }
}

fn normalize_family_key(font_family: &str) -> String {
    let trimmed = font_family.trim();
    if trimmed.is_empty() {
        "sans-serif".to_string()
    } else {
        trimmed.to_string()
    }
}
