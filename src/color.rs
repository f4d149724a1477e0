use egui::Color32;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ColorParseError {
    #[error("color `{0}` must start with '#'")]
    MissingHash(String),
    #[error("color `{0}` must have 3, 6 or 8 hex digits")]
    InvalidLength(String),
    #[error("color `{0}` contains a non-hex digit")]
    InvalidDigit(String),
}

/// Parses `#rgb`, `#rrggbb` or `#rrggbbaa` into a color.
pub fn parse_hex(input: &str) -> Result<Color32, ColorParseError> {
    let trimmed = input.trim();
    let digits = trimmed
        .strip_prefix('#')
        .ok_or_else(|| ColorParseError::MissingHash(input.to_owned()))?;

    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ColorParseError::InvalidDigit(input.to_owned()));
    }

    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&digits[range], 16)
            .map_err(|_| ColorParseError::InvalidDigit(input.to_owned()))
    };

    match digits.len() {
        3 => {
            // #abc expands to #aabbcc
            let short = |i: usize| channel(i..i + 1).map(|v| v * 17);
            Ok(Color32::from_rgb(short(0)?, short(1)?, short(2)?))
        }
        6 => Ok(Color32::from_rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?)),
        8 => Ok(Color32::from_rgba_unmultiplied(
            channel(0..2)?,
            channel(2..4)?,
            channel(4..6)?,
            channel(6..8)?,
        )),
        _ => Err(ColorParseError::InvalidLength(input.to_owned())),
    }
}

/// Formats a color as `#rrggbb`, or `#rrggbbaa` when it is not opaque.
pub fn to_hex(color: Color32) -> String {
    let [r, g, b, a] = color.to_srgba_unmultiplied();
    if a == u8::MAX {
        format!("#{r:02x}{g:02x}{b:02x}")
    } else {
        format!("#{r:02x}{g:02x}{b:02x}{a:02x}")
    }
}

/// Serde adapter storing a color as a hex string.
pub mod serde_hex {
    use egui::Color32;
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(color: &Color32, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::to_hex(*color))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Color32, D::Error> {
        let text = String::deserialize(deserializer)?;
        super::parse_hex(&text).map_err(<D::Error as de::Error>::custom)
    }

    /// Same, for optional colors. `null` means no color.
    pub mod option {
        use egui::Color32;
        use serde::{Deserialize, Deserializer, Serializer, de};

        pub fn serialize<S: Serializer>(
            color: &Option<Color32>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match color {
                Some(color) => serializer.serialize_some(&super::super::to_hex(*color)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Color32>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .map(|text| {
                    super::super::parse_hex(&text).map_err(<D::Error as de::Error>::custom)
                })
                .transpose()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_long_and_short_forms() {
        assert_eq!(parse_hex("#ff0000"), Ok(Color32::from_rgb(255, 0, 0)));
        assert_eq!(parse_hex("#333"), Ok(Color32::from_rgb(0x33, 0x33, 0x33)));
        assert_eq!(parse_hex("  #00FF7f "), Ok(Color32::from_rgb(0, 255, 127)));
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(matches!(parse_hex("ff0000"), Err(ColorParseError::MissingHash(_))));
        assert!(matches!(parse_hex("#ff00"), Err(ColorParseError::InvalidLength(_))));
        assert!(matches!(parse_hex("#gg0000"), Err(ColorParseError::InvalidDigit(_))));
    }

    #[test]
    fn formats_opaque_colors_without_alpha() {
        assert_eq!(to_hex(Color32::from_rgb(255, 0, 0)), "#ff0000");
        assert_eq!(to_hex(parse_hex("#12345678").unwrap()).len(), 9);
    }
}
