//! Color Assignment Service
//!
//! Deterministic label -> hex color mapping.
//!
//! - **Curated**: the label is case-folded and slugified, then looked up in a
//!   fixed taxonomy of energy families, sectors and gases. A miss logs a
//!   warning and returns [`DEFAULT_COLOR`]; it is never an error.
//! - **Hashed**: a pinned 32-bit string hash over UTF-16 code units, whose
//!   three low bytes become the RGB channels. Used for open-ended labels
//!   (countries, groups, zones, trade partners).

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

/// Color returned when a curated lookup misses
pub const DEFAULT_COLOR: &str = "#DDD";

/// Which mapping to apply to a label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorStrategy {
    /// Fixed taxonomy lookup with a default fallback
    Curated,
    /// Hash of the label
    Hashed,
}

/// Color of `key` under `strategy`
pub fn color_for(key: &str, strategy: ColorStrategy) -> String {
    match strategy {
        ColorStrategy::Curated => curated_color(key).to_string(),
        ColorStrategy::Hashed => hashed_color(key),
    }
}

// ============================================================================
// Curated palette
// ============================================================================

/// (slug, color). First entry wins on duplicate slugs.
const PALETTE: &[(&str, &str)] = &[
    ("transport", "#0390c0"),
    ("industry", "#a852d9"),
    ("fuel-ethanol", "#a6d8e3"),
    ("biodiesel", "#abe9bc"),
    ("tide", "#CB8A01"),
    ("solar-thermal", "#CB8A01"),
    ("solar-pv", "#CB8A01"),
    ("biomass", "#a852d9"),
    ("wind", "#00C7B4"),
    ("hydro", "#8daacb"),
    ("electricityheat", "#fc7362"),
    ("electricity-heat", "#fc7362"),
    ("manufacturing-construction", "#b3b3b3"),
    ("manufacturingconstruction", "#b3b3b3"),
    ("bunker", "#e5b694"),
    ("bunkers", "#e5b694"),
    ("f-gas", "#996800"),
    ("transportation", "#0390c0"),
    ("industrial", "#66c296"),
    ("fugitive", "#CB8A01"),
    ("gas", "#FB8888"),
    ("commercial-and-public-services", "#CB8A01"),
    ("crude-oil", "#6D6D6D"),
    ("residential", "#996800"),
    ("other", "#a6d8e3"),
    ("others", "#a6d8e3"),
    ("biofuels-and-waste", "#abe9bc"),
    ("oil-products", "#fc7362"),
    ("biomass-and-waste-electricity", "#a852d9"),
    ("biomass-and-waste", "#a852d9"),
    ("solar-tide-wave-fuel-cell", "#CB8A01"),
    ("solar-tide-and-wave-electricity", "#CB8A01"),
    ("solar-tide-and-wave", "#CB8A01"),
    ("solar", "#CB8A01"),
    ("geothermal-electricity", "#b4dcbc"),
    ("geothermal", "#b4dcbc"),
    ("hydroelectric-pumped-storage", "#8daacb"),
    ("hydroelectric-electricity", "#8daacb"),
    ("hydroelectricity", "#8daacb"),
    ("nuclear", "#ffd92f"),
    ("oil", "#BC301A"),
    ("brown-coal", "#143c00"),
    ("hard-coal", "#ff7800"),
    ("coal", "#4F1008"),
    ("waste", "#abe9bc"),
    ("other-fuel-combustion", "#a6d8e3"),
    ("construction", "#b3b3b3"),
    ("manufacturing", "#b3b3b3"),
    ("lucf", "#e78ad2"),
    ("land-use-change-and-forestry", "#e78ad2"),
    ("international-bunkers", "#e5b694"),
    ("industrial-processes", "#66c296"),
    ("fugitive-emissions", "#CB8A01"),
    ("energy", "#bbd854"),
    ("heat", "#C648FF"),
    ("electricity", "#CB8A01"),
    ("agriculture", "#8daacb"),
    ("sf6s", "#e7c52b"),
    ("pfcs", "#e5b694"),
    ("n2o", "#996800"),
    ("hfcss", "#8daacb"),
    ("co2", "#ff2500"),
    ("ch4", "#008000"),
    ("solvent-and-other-product-use", "#8daacb"),
    ("industrial-processes-and-product-use", "#a852d9"),
    ("land-use-land-use-change-and-forestry", "#e78ad2"),
    ("solvent-and-other-product-use:-paint", "#e78ad2"),
    ("non-energy-use-of-lubricantswaxes-(co2)", "#e78ad2"),
    ("indirect-n2o-from-non-agricultural-nh3", "#e78ad2"),
    ("production-of-other-minerals", "#e78ad2"),
    ("fugitive-emissions-from-gaseous-fuels", "#e78ad2"),
    ("solvent-and-other-product-use:-chemicals", "#e78ad2"),
    ("solvent-and-other-product-use:-degrease", "#e78ad2"),
    ("public-electricity-and-heat-production", "#e78ad2"),
    ("manufacturing-industries-and-construction", "#e78ad2"),
    ("fugitive-emissions-from-oil-and-gas", "#e78ad2"),
    ("fugitive-emissions-from-solid-fuels", "#e78ad2"),
    ("solid-waste-disposal-on-land", "#e78ad2"),
    ("wastewater-handling", "#e78ad2"),
    ("manure-in-pasturerangepaddock", "#e78ad2"),
    ("solvent-and-other-product-use:-other", "#e78ad2"),
    ("indirect-n2o-from-non-agricultural-nox", "#e78ad2"),
    ("residential-and-other-sectors", "#8daacb"),
    ("road-transportation", "#0390c0"),
    ("enteric-fermentation", "#e5b694"),
    ("other-energy-industries", "#e78ad2"),
    ("rice-cultivation", "#0390c0"),
    ("production-of-chemicals", "#e78ad2"),
    ("agricultural-waste-burning", "#8daacb"),
    ("direct-soil-emissions", "#CB8A01"),
    ("cement-production", "#e78ad2"),
    ("manure-management", "#e78ad2"),
    ("domestic-aviation", "#b3b3b3"),
    ("production-of-metals", "#e78ad2"),
    ("indirect-n2o-from-agriculture", "#e78ad2"),
    ("rail-transportation", "#0390c0"),
    ("lime-production", "#e78ad2"),
    ("other-transportation", "#0390c0"),
    ("memo:-international-navigation", "#e5b694"),
    ("inland-navigation", "#e5b694"),
    ("other-direct-soil-emissions", "#a6d8e3"),
    ("memo:-international-aviation", "#e5b694"),
    ("limestone-and-dolomite-use", "#a852d9"),
    ("waste-incineration", "#e5b694"),
    ("fossil-fuel-fires", "#a6d8e3"),
    ("soda-ash-production-and-use", "#e78ad2"),
    ("other-waste-handling", "#e78ad2"),
    ("lulucf", "#e78ad2"),
    ("f-gases", "#e78ad2"),
    ("peat", "#834200"),
    ("other-energy", "#CB8A01"),
    ("electricity-and-heat", "#fc7362"),
    ("industry-and-construction", "#a852d9"),
    ("other-agriculture", "#8daacb"),
    ("other-sectors", "#e5b694"),
    ("electricity-gas-and-water", "#fc7362"),
    ("petroleum-chemical-and-non-metallic-mineral-products", "#BC301A"),
    ("mining-and-quarrying", "#e5b694"),
    ("electrical-and-machinery", "#8daacb"),
    ("metal-products", "#e78ad2"),
    ("transport-equipment", "#0390c0"),
    ("textiles-and-wearing-apparel", "#fc7362"),
    ("food-and-beverages", "#fc7362"),
    ("finacial-intermediation-and-business-activities", "#fc7362"),
    ("wood-and-paper", "#fc7362"),
    ("other-manufacturing", "#fc7362"),
    ("wholesale-trade", "#fc7362"),
    ("education-health-and-other-services", "#fc7362"),
    ("post-and-telecommunications", "#fc7362"),
    ("retail-trade", "#fc7362"),
    ("recycling", "#fc7362"),
    ("hotels-and-restraurants", "#fc7362"),
    ("fishing", "#fc7362"),
    ("maintenance-and-repair", "#fc7362"),
    ("public-administration", "#fc7362"),
    ("private-households", "#fc7362"),
    ("re-export-and-re-import", "#fc7362"),
    ("fossil-fuels", "#fc7362"),
];

lazy_static! {
    static ref PALETTE_BY_SLUG: HashMap<&'static str, &'static str> = {
        let mut map = HashMap::with_capacity(PALETTE.len());
        for (slug, color) in PALETTE {
            map.entry(*slug).or_insert(*color);
        }
        map
    };
}

/// Curated color of `key`, [`DEFAULT_COLOR`] on a miss
pub fn curated_color(key: &str) -> &'static str {
    if key.trim().is_empty() {
        warn!("Empty category label, using default color");
        return DEFAULT_COLOR;
    }

    let slug = slugify(&key.to_lowercase());
    match PALETTE_BY_SLUG.get(slug.as_str()) {
        Some(color) => color,
        None => {
            warn!(label = key, slug = %slug, "No curated color, using default");
            DEFAULT_COLOR
        },
    }
}

/// Turn a label into its palette slug
///
/// `&` becomes `and`, characters outside `[A-Za-z0-9_$*+~.()'"!:@-]` and
/// whitespace are dropped, and whitespace runs collapse into a single `-`.
pub fn slugify(label: &str) -> String {
    let mut cleaned = String::with_capacity(label.len());
    for c in label.chars() {
        match c {
            '&' => cleaned.push_str("and"),
            c if c.is_alphanumeric() || c.is_whitespace() => cleaned.push(c),
            '_' | '$' | '*' | '+' | '~' | '.' | '(' | ')' | '\'' | '"' | '!' | ':' | '@' | '-' => {
                cleaned.push(c)
            },
            _ => {},
        }
    }
    cleaned.split_whitespace().collect::<Vec<_>>().join("-")
}

// ============================================================================
// Hashed colors
// ============================================================================

/// Hash color of `key`
///
/// `h = code_unit + (h << 5) - h` over UTF-16 code units in 32-bit wrapping
/// arithmetic; bytes 0, 1, 2 of `h` are the red, green and blue channels.
pub fn hashed_color(key: &str) -> String {
    let hash = key.encode_utf16().fold(0i32, |h, unit| {
        (unit as i32).wrapping_add(h.wrapping_shl(5).wrapping_sub(h))
    });

    let channel = |i: u32| (hash >> (i * 8)) & 0xFF;
    format!("#{:02x}{:02x}{:02x}", channel(0), channel(1), channel(2))
}
