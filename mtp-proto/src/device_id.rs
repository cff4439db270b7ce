use std::collections::HashMap;

use once_cell::sync::Lazy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceFamily {
    Keel,
    Scorpius,
    Draco,
    Pavo,
    Unknown(u8),
}

impl DeviceFamily {
    fn from_id(id: u8) -> Self {
        match id {
            0 => DeviceFamily::Keel,
            2 => DeviceFamily::Scorpius,
            3 => DeviceFamily::Draco,
            6 => DeviceFamily::Pavo,
            other => DeviceFamily::Unknown(other),
        }
    }

    /// Network mode (PPP-over-USB tunneling) is only supported on Pavo.
    pub fn supports_network_mode(self) -> bool {
        matches!(self, DeviceFamily::Pavo)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceColor {
    Named(&'static str),
    Unknown(u8),
}

static COLOR_TABLES: Lazy<HashMap<&'static str, HashMap<u8, &'static str>>> = Lazy::new(|| {
    let mut tables = HashMap::new();
    tables.insert(
        "Keel",
        HashMap::from([(1, "White"), (2, "Black"), (3, "Brown")]),
    );
    tables.insert(
        "Scorpius",
        HashMap::from([
            (2, "Black"),
            (4, "Pink"),
            (5, "Camo"),
            (6, "Red"),
            (7, "Citron"),
            (20, "BlackBlack"),
            (22, "Blue"),
            (24, "RedBlackBack"),
            (25, "White"),
        ]),
    );
    tables.insert(
        "Draco",
        HashMap::from([
            (2, "Black"),
            (6, "Red"),
            (20, "BlackBlack"),
            (21, "Black"),
            (22, "BlueSilver"),
            (23, "BlackBlack"),
            (24, "RedBlack"),
            (25, "WhiteSilver"),
            (26, "BlueBlack"),
            (27, "WhiteBlack"),
            (28, "BlackBlack"),
        ]),
    );
    tables.insert(
        "Pavo",
        HashMap::from([
            (0, "Black"),
            (1, "Platinum"),
            (3, "Pink"),
            (4, "Red"),
            (5, "Blue"),
            (6, "Purple"),
            (7, "Magenta"),
            (8, "Citron"),
            (9, "Atomic"),
        ]),
    );
    tables
});

fn family_key(family: DeviceFamily) -> Option<&'static str> {
    match family {
        DeviceFamily::Keel => Some("Keel"),
        DeviceFamily::Scorpius => Some("Scorpius"),
        DeviceFamily::Draco => Some("Draco"),
        DeviceFamily::Pavo => Some("Pavo"),
        DeviceFamily::Unknown(_) => None,
    }
}

fn lookup_color(family: DeviceFamily, color_id: u8) -> DeviceColor {
    family_key(family)
        .and_then(|key| COLOR_TABLES.get(key))
        .and_then(|table| table.get(&color_id))
        .map(|&name| DeviceColor::Named(name))
        .unwrap_or(DeviceColor::Unknown(color_id))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub family: DeviceFamily,
    pub color: DeviceColor,
}

/// Decode vendor property 0xD21A: a big-endian-packed
/// `(family_id:u8, _:u8, _:u8, color_id:u8)`.
pub fn decode_device_property(value: u32) -> DeviceIdentity {
    let bytes = value.to_be_bytes();
    let family = DeviceFamily::from_id(bytes[0]);
    let color_id = bytes[3];
    DeviceIdentity {
        family,
        color: lookup_color(family, color_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_pavo_with_known_color() {
        let value = u32::from_be_bytes([6, 0, 0, 5]);
        let id = decode_device_property(value);
        assert_eq!(id.family, DeviceFamily::Pavo);
        assert_eq!(id.color, DeviceColor::Named("Blue"));
        assert!(id.family.supports_network_mode());
    }

    #[test]
    fn decodes_unknown_family_and_color() {
        let value = u32::from_be_bytes([99, 0, 0, 200]);
        let id = decode_device_property(value);
        assert_eq!(id.family, DeviceFamily::Unknown(99));
        assert_eq!(id.color, DeviceColor::Unknown(200));
        assert!(!id.family.supports_network_mode());
    }

    #[test]
    fn keel_never_supports_network_mode() {
        let value = u32::from_be_bytes([0, 0, 0, 2]);
        let id = decode_device_property(value);
        assert_eq!(id.family, DeviceFamily::Keel);
        assert_eq!(id.color, DeviceColor::Named("Black"));
        assert!(!id.family.supports_network_mode());
    }
}
