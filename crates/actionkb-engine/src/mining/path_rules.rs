//! Platform, brand and screen classification from source locations

use actionkb_common::{Brand, Platform};

/// Path fragment → platform, first match wins
///
/// Fragments wrapped in `/` must match a whole directory name.
const PLATFORM_FRAGMENTS: &[(&str, Platform)] = &[
    ("ctvscreens", Platform::Ctv),
    ("/ctv/", Platform::Ctv),
    ("mobilescreens", Platform::Mobile),
    ("/android/", Platform::Mobile),
    ("/ios/", Platform::Mobile),
    ("webscreens", Platform::Web),
    ("/web/", Platform::Web),
    ("html5", Platform::Html5),
    ("hdmi", Platform::Hdmi),
];

/// Path fragment → brand, first match wins; international before domestic
const BRAND_FRAGMENTS: &[(&str, Brand)] = &[
    ("pplusintl", Brand::PplusIntl),
    ("pplus_intl", Brand::PplusIntl),
    ("/intl/", Brand::PplusIntl),
    ("pplus", Brand::Pplus),
];

const SCREEN_SUFFIXES: &[&str] = &["Screen", "Page"];

fn lookup<T: Copy>(relative_path: &str, table: &[(&str, T)], default: T) -> T {
    let haystack = format!("/{}/", relative_path.replace('\\', "/").to_lowercase());
    table
        .iter()
        .find(|(fragment, _)| haystack.contains(fragment))
        .map_or(default, |(_, value)| *value)
}

/// Platform for a file, `Platform::None` when no fragment matches
pub fn platform_for(relative_path: &str) -> Platform {
    lookup(relative_path, PLATFORM_FRAGMENTS, Platform::None)
}

/// Brand for a file, `Brand::None` when no fragment matches
pub fn brand_for(relative_path: &str) -> Brand {
    lookup(relative_path, BRAND_FRAGMENTS, Brand::None)
}

/// Screen modelled by a class: `PlayerScreen` → `player`
pub fn target_screen_for(class_name: &str) -> Option<String> {
    let base = SCREEN_SUFFIXES
        .iter()
        .find_map(|suffix| class_name.strip_suffix(suffix))
        .unwrap_or(class_name);
    let screen = base.to_lowercase();
    (!screen.is_empty()).then_some(screen)
}
