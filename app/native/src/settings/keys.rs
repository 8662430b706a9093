//! MATE schema ids and key names.
//!
//! All settings addresses used by the engine are defined here so the Rust
//! side stays in sync with what the MATE desktop actually persists.

use super::Namespace;

/// Schema holding the desktop background configuration.
pub const BACKGROUND_SCHEMA: &str = "org.mate.background";

/// Key holding the wallpaper image path. A MATE slideshow or gradient is
/// stored as an `.xml` descriptor under the same key.
pub const PICTURE_FILENAME: &str = "picture-filename";

/// Schema holding the global panel configuration.
pub const PANEL_SCHEMA: &str = "org.mate.panel";

/// Key listing the ids of all configured panels.
pub const TOPLEVEL_ID_LIST: &str = "toplevel-id-list";

/// Relocatable schema for a single panel's background, instantiated at
/// [`panel_background_path`].
pub const PANEL_BACKGROUND_SCHEMA: &str = "org.mate.panel.toplevel.background";

/// Key selecting a panel's background style (`"none"`, `"color"`, `"image"`).
pub const BACKGROUND_TYPE: &str = "type";

/// Value of [`BACKGROUND_TYPE`] that makes the panel show a solid color.
pub const BACKGROUND_TYPE_COLOR: &str = "color";

/// Key holding a panel's background color string.
pub const BACKGROUND_COLOR: &str = "color";

/// Namespace of the desktop background settings.
#[must_use]
pub fn background() -> Namespace { Namespace::new(BACKGROUND_SCHEMA) }

/// Namespace of the global panel settings.
#[must_use]
pub fn panel() -> Namespace { Namespace::new(PANEL_SCHEMA) }

/// Settings path of one panel's background sub-namespace.
#[must_use]
pub fn panel_background_path(panel_id: &str) -> String {
    format!("/org/mate/panel/toplevels/{panel_id}/background/")
}

/// Namespace of one panel's background settings.
#[must_use]
pub fn panel_background(panel_id: &str) -> Namespace {
    Namespace::with_path(PANEL_BACKGROUND_SCHEMA, panel_background_path(panel_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_background_namespace() {
        assert_eq!(background().address(), "org.mate.background");
    }

    #[test]
    fn test_panel_namespace() {
        assert_eq!(panel().address(), "org.mate.panel");
    }

    #[test]
    fn test_panel_background_namespace_embeds_panel_id() {
        let ns = panel_background("top");
        assert_eq!(
            ns.address(),
            "org.mate.panel.toplevel.background:/org/mate/panel/toplevels/top/background/"
        );
    }

    #[test]
    fn test_distinct_panels_have_distinct_addresses() {
        assert_ne!(
            panel_background("top").address(),
            panel_background("bottom").address()
        );
    }

    #[test]
    fn test_type_value_matches_color_key_by_coincidence_only() {
        // MATE happens to use "color" both as the style name and the key
        assert_eq!(BACKGROUND_TYPE_COLOR, BACKGROUND_COLOR);
    }
}
