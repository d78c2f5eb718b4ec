//! Static device preset catalog.
//!
//! Read-only list of simulated devices consumed by the view controller.
//! No mutation path exists for this catalog.

use crate::model::{DeviceKind, DeviceViewport, Orientation};

/// One catalog entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DevicePreset {
    pub id: &'static str,
    pub name: &'static str,
    pub width: u32,
    pub height: u32,
    pub kind: DeviceKind,
    pub orientation: Orientation,
    pub pixel_ratio: f32,
    pub category: &'static str,
}

impl DevicePreset {
    /// Owned viewport value for this preset.
    pub fn viewport(&self) -> DeviceViewport {
        DeviceViewport {
            kind: self.kind,
            width: self.width,
            height: self.height,
            name: self.name.to_string(),
            orientation: self.orientation,
            pixel_ratio: self.pixel_ratio,
        }
    }
}

const CATALOG: &[DevicePreset] = &[
    DevicePreset {
        id: "iphone-se",
        name: "iPhone SE",
        width: 375,
        height: 667,
        kind: DeviceKind::Mobile,
        orientation: Orientation::Portrait,
        pixel_ratio: 2.0,
        category: "compact",
    },
    DevicePreset {
        id: "iphone-14",
        name: "iPhone 14",
        width: 390,
        height: 844,
        kind: DeviceKind::Mobile,
        orientation: Orientation::Portrait,
        pixel_ratio: 3.0,
        category: "popular",
    },
    DevicePreset {
        id: "iphone-14-pro-max",
        name: "iPhone 14 Pro Max",
        width: 430,
        height: 932,
        kind: DeviceKind::Mobile,
        orientation: Orientation::Portrait,
        pixel_ratio: 3.0,
        category: "wide",
    },
    DevicePreset {
        id: "pixel-7",
        name: "Pixel 7",
        width: 412,
        height: 915,
        kind: DeviceKind::Mobile,
        orientation: Orientation::Portrait,
        pixel_ratio: 2.625,
        category: "popular",
    },
    DevicePreset {
        id: "galaxy-s23",
        name: "Galaxy S23",
        width: 360,
        height: 780,
        kind: DeviceKind::Mobile,
        orientation: Orientation::Portrait,
        pixel_ratio: 3.0,
        category: "compact",
    },
    DevicePreset {
        id: "ipad-mini",
        name: "iPad Mini",
        width: 768,
        height: 1024,
        kind: DeviceKind::Tablet,
        orientation: Orientation::Portrait,
        pixel_ratio: 2.0,
        category: "compact",
    },
    DevicePreset {
        id: "ipad-pro-11",
        name: "iPad Pro 11\"",
        width: 834,
        height: 1194,
        kind: DeviceKind::Tablet,
        orientation: Orientation::Portrait,
        pixel_ratio: 2.0,
        category: "popular",
    },
    DevicePreset {
        id: "ipad-pro-13",
        name: "iPad Pro 12.9\"",
        width: 1024,
        height: 1366,
        kind: DeviceKind::Tablet,
        orientation: Orientation::Portrait,
        pixel_ratio: 2.0,
        category: "wide",
    },
    DevicePreset {
        id: "laptop",
        name: "Laptop",
        width: 1280,
        height: 800,
        kind: DeviceKind::Desktop,
        orientation: Orientation::Landscape,
        pixel_ratio: 1.0,
        category: "compact",
    },
    DevicePreset {
        id: "desktop-hd",
        name: "Desktop HD",
        width: 1440,
        height: 900,
        kind: DeviceKind::Desktop,
        orientation: Orientation::Landscape,
        pixel_ratio: 1.0,
        category: "popular",
    },
    DevicePreset {
        id: "desktop-full",
        name: "Desktop Full HD",
        width: 1920,
        height: 1080,
        kind: DeviceKind::Desktop,
        orientation: Orientation::Landscape,
        pixel_ratio: 1.0,
        category: "wide",
    },
];

/// The full catalog.
pub fn all() -> &'static [DevicePreset] {
    CATALOG
}

/// Look up one preset by id.
pub fn by_id(id: &str) -> Option<&'static DevicePreset> {
    CATALOG.iter().find(|p| p.id == id)
}

/// All presets in a category.
pub fn in_category(category: &str) -> Vec<&'static DevicePreset> {
    CATALOG.iter().filter(|p| p.category == category).collect()
}

/// The preset a fresh view starts on.
pub fn default_preset() -> &'static DevicePreset {
    // Catalog is non-empty by construction; desktop-hd is entry 9.
    &CATALOG[9]
}
