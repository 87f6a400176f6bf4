//! Palette catalog and indexed-color lookup tables.
//!
//! Two concerns live here:
//! 1. A fixed catalog of named pixel-art palettes, selectable by id with a
//!    fallback to the default palette.
//! 2. `PaletteLookup` — the deduplicated, power-of-two-padded index table
//!    required by the GIF encoder (global color tables must be a power of
//!    two in size, 2..=256 entries).

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

// ============================================================================
// CATALOG
// ============================================================================

const PICO8: &[&str] = &[
    "#000000", "#1d2b53", "#7e2553", "#008751", "#ab5236", "#5f574f", "#c2c3c7", "#fff1e8",
    "#ff004d", "#ffa300", "#ffec27", "#00e436", "#29adff", "#83769c", "#ff77a8", "#ffccaa",
];

const SWEETIE16: &[&str] = &[
    "#1a1c2c", "#5d275d", "#b13e53", "#ef7d57", "#ffcd75", "#a7f070", "#38b764", "#257179",
    "#29366f", "#3b5dc9", "#41a6f6", "#73eff7", "#f4f4f4", "#94b0c2", "#566c86", "#333c57",
];

const GAMEBOY: &[&str] = &["#0f380f", "#306230", "#8bac0f", "#9bbc0f"];

const GRAYSCALE: &[&str] = &["#000000", "#555555", "#aaaaaa", "#ffffff"];

const MONO: &[&str] = &["#000000", "#ffffff"];

/// Default palette id used when an unknown id is requested
pub const DEFAULT_PALETTE: &str = "pico8";

// Parsed once per process; the default palette sits at slot 0
static CATALOG: LazyLock<Vec<Palette>> = LazyLock::new(|| {
    [
        ("pico8", PICO8),
        ("sweetie16", SWEETIE16),
        ("gameboy", GAMEBOY),
        ("grayscale", GRAYSCALE),
        ("mono", MONO),
    ]
    .into_iter()
    .map(|(id, hexes)| Palette::from_hex(id, hexes))
    .collect()
});

/// A single quantization target: normalized hex string plus decoded RGB
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaletteColor {
    pub hex: String,
    pub rgb: [u8; 3],
}

/// An ordered, non-empty set of colors used as quantization targets.
///
/// Immutable once built; selection from the catalog is a pure lookup.
#[derive(Debug, Clone)]
pub struct Palette {
    pub id: String,
    pub colors: Vec<PaletteColor>,
}

impl Palette {
    /// Build a palette from hex strings. Invalid entries are skipped, so the
    /// static catalog (known-good) always round-trips completely.
    pub fn from_hex(id: &str, hexes: &[&str]) -> Self {
        let colors: Vec<PaletteColor> = hexes
            .iter()
            .filter_map(|h| {
                let hex = h.to_ascii_lowercase();
                parse_hex(&hex).map(|rgb| PaletteColor { hex, rgb })
            })
            .collect();
        debug_assert!(!colors.is_empty(), "palette {} has no valid colors", id);
        Self {
            id: id.to_string(),
            colors,
        }
    }

    /// Catalog lookup by id. Total: unknown ids return the default palette.
    pub fn get(id: &str) -> &'static Palette {
        CATALOG.iter().find(|p| p.id == id).unwrap_or(&CATALOG[0])
    }

    /// All catalog ids, in display order
    pub fn catalog_ids() -> &'static [&'static str] {
        &["pico8", "sweetie16", "gameboy", "grayscale", "mono"]
    }

    /// Ordered hex strings of this palette
    pub fn hexes(&self) -> Vec<String> {
        self.colors.iter().map(|c| c.hex.clone()).collect()
    }
}

/// Parse `#rrggbb` or `rrggbb` (case-insensitive) into an RGB triple
pub fn parse_hex(hex: &str) -> Option<[u8; 3]> {
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    if digits.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&digits[0..2], 16).ok()?;
    let g = u8::from_str_radix(&digits[2..4], 16).ok()?;
    let b = u8::from_str_radix(&digits[4..6], 16).ok()?;
    Some([r, g, b])
}

// ============================================================================
// INDEXED LOOKUP TABLE
// ============================================================================

/// Index table derived from a palette for indexed (GIF) encoding.
///
/// The color list is deduplicated in first-seen order and padded to the next
/// power of two by repeating the last real color. Any hex not present in the
/// source palette resolves to the fallback slot, never out of range.
#[derive(Debug, Clone)]
pub struct PaletteLookup {
    /// Padded hex list, power-of-two length (2..=256)
    pub colors: Vec<String>,
    /// Packed 0xRRGGBB value per slot
    pub packed: Vec<u32>,
    index: HashMap<String, u8>,
    /// Slot of the last original (pre-padding) color
    pub fallback: u8,
}

impl PaletteLookup {
    /// Build a lookup table from an ordered list of hex colors.
    ///
    /// Pure and deterministic: the same ordered input always yields the same
    /// slot assignments and packed values.
    pub fn build(hexes: &[String]) -> Self {
        // Normalize and dedup, preserving first-seen order
        let mut seen: HashSet<String> = HashSet::new();
        let mut unique: Vec<String> = Vec::new();
        for hex in hexes {
            let hex = hex.to_ascii_lowercase();
            if parse_hex(&hex).is_none() {
                continue;
            }
            if seen.insert(hex.clone()) {
                unique.push(hex);
            }
        }

        // Indexed encoders require at least 2 entries
        if unique.is_empty() {
            unique = vec!["#000000".to_string(), "#ffffff".to_string()];
        } else if unique.len() == 1 {
            unique.push(unique[0].clone());
        }

        // Hard format ceiling
        unique.truncate(256);

        let last_original = unique.last().cloned().unwrap_or_default();
        let padded_len = unique.len().next_power_of_two().max(2);
        let mut colors = unique;
        while colors.len() < padded_len {
            colors.push(last_original.clone());
        }

        let mut index: HashMap<String, u8> = HashMap::new();
        for (slot, hex) in colors.iter().enumerate() {
            // Duplicates from padding map to the earliest slot
            index.entry(hex.clone()).or_insert(slot as u8);
        }
        let fallback = index[&last_original];

        let packed = colors
            .iter()
            .map(|hex| {
                let [r, g, b] = parse_hex(hex).unwrap_or([0, 0, 0]);
                (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b)
            })
            .collect();

        Self {
            colors,
            packed,
            index,
            fallback,
        }
    }

    /// Resolve a hex color to its palette slot. Unmapped colors (including
    /// antialiasing artifacts) resolve to the fallback slot.
    pub fn slot(&self, hex: &str) -> u8 {
        match self.index.get(hex) {
            Some(&slot) => slot,
            None => match self.index.get(&hex.to_ascii_lowercase()) {
                Some(&slot) => slot,
                None => self.fallback,
            },
        }
    }

    /// Flat `[R,G,B, R,G,B, ...]` bytes for the GIF global color table
    pub fn global_table(&self) -> Vec<u8> {
        let mut table = Vec::with_capacity(self.colors.len() * 3);
        for &packed in &self.packed {
            table.push((packed >> 16) as u8);
            table.push((packed >> 8) as u8);
            table.push(packed as u8);
        }
        table
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn hexes(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_hex("#ff8000"), Some([255, 128, 0]));
        assert_eq!(parse_hex("FF8000"), Some([255, 128, 0]));
        assert_eq!(parse_hex("#fff"), None);
        assert_eq!(parse_hex("#gg0000"), None);
    }

    #[test]
    fn test_catalog_fallback_to_default() {
        let unknown = Palette::get("no-such-palette");
        assert_eq!(unknown.id, DEFAULT_PALETTE);
        assert_eq!(unknown.colors.len(), 16);
    }

    #[test]
    fn test_catalog_is_built_once() {
        // Repeated lookups hand out the same static entry, no re-parsing
        assert!(std::ptr::eq(Palette::get("mono"), Palette::get("mono")));
        assert!(std::ptr::eq(
            Palette::get("no-such-palette"),
            Palette::get(DEFAULT_PALETTE)
        ));
    }

    #[test]
    fn test_catalog_palettes_nonempty() {
        for id in Palette::catalog_ids() {
            let palette = Palette::get(id);
            assert!(!palette.colors.is_empty(), "{} is empty", id);
            for color in &palette.colors {
                assert_eq!(color.hex, color.hex.to_ascii_lowercase());
            }
        }
    }

    #[test]
    fn test_lookup_is_deterministic() {
        let input = hexes(&["#FF0000", "#00ff00", "#ff0000", "#0000FF"]);
        let a = PaletteLookup::build(&input);
        let b = PaletteLookup::build(&input);
        assert_eq!(a.colors, b.colors);
        assert_eq!(a.packed, b.packed);
        assert_eq!(a.fallback, b.fallback);
    }

    #[test]
    fn test_lookup_dedup_preserves_first_seen_order() {
        let lookup = PaletteLookup::build(&hexes(&["#FF0000", "#00ff00", "#ff0000"]));
        assert_eq!(lookup.colors[0], "#ff0000");
        assert_eq!(lookup.colors[1], "#00ff00");
        assert_eq!(lookup.slot("#ff0000"), 0);
        assert_eq!(lookup.slot("#00ff00"), 1);
    }

    #[test]
    fn test_lookup_power_of_two_invariant() {
        for count in [0usize, 1, 2, 3, 5, 16, 17, 200, 255, 256, 300] {
            let input: Vec<String> = (0..count).map(|i| format!("#{:06x}", i * 7 + 1)).collect();
            let lookup = PaletteLookup::build(&input);
            let len = lookup.colors.len();
            assert!(len.is_power_of_two(), "{} not a power of two", len);
            assert!((2..=256).contains(&len));
            assert_eq!(lookup.packed.len(), len);
        }
    }

    #[test]
    fn test_lookup_empty_input_gets_black_white_default() {
        let lookup = PaletteLookup::build(&[]);
        assert_eq!(lookup.colors, vec!["#000000", "#ffffff"]);
        assert_eq!(lookup.fallback, 1);
    }

    #[test]
    fn test_lookup_single_color_is_duplicated() {
        let lookup = PaletteLookup::build(&hexes(&["#123456"]));
        assert_eq!(lookup.colors.len(), 2);
        assert_eq!(lookup.colors[0], lookup.colors[1]);
        // The duplicate maps back to the earliest slot
        assert_eq!(lookup.slot("#123456"), 0);
        assert_eq!(lookup.fallback, 0);
    }

    #[test]
    fn test_lookup_padding_repeats_last_color() {
        let lookup = PaletteLookup::build(&hexes(&["#111111", "#222222", "#333333"]));
        assert_eq!(lookup.colors.len(), 4);
        assert_eq!(lookup.colors[3], "#333333");
        assert_eq!(lookup.fallback, 2);
    }

    #[test]
    fn test_lookup_fallback_covers_unknown_hex() {
        let lookup = PaletteLookup::build(&hexes(&["#111111", "#222222", "#333333"]));
        for unknown in ["#abcdef", "#fefefe", "not-a-color", ""] {
            let slot = lookup.slot(unknown);
            assert_eq!(slot, lookup.fallback);
            assert!((slot as usize) < lookup.colors.len());
        }
        // Case-mismatched known colors still resolve to their real slot
        assert_eq!(lookup.slot("#222222"), 1);
        assert_eq!(lookup.slot("#222222".to_ascii_uppercase().as_str()), 1);
    }

    #[test]
    fn test_lookup_packed_values() {
        let lookup = PaletteLookup::build(&hexes(&["#ff8000", "#000001"]));
        assert_eq!(lookup.packed[0], 0xff8000);
        assert_eq!(lookup.packed[1], 0x000001);
        assert_eq!(lookup.global_table(), vec![0xff, 0x80, 0x00, 0x00, 0x00, 0x01]);
    }

    #[test]
    fn test_lookup_caps_at_256() {
        let input: Vec<String> = (0..400).map(|i| format!("#{:06x}", i)).collect();
        let lookup = PaletteLookup::build(&input);
        assert_eq!(lookup.colors.len(), 256);
    }
}
