//! Panel color model.
//!
//! MATE stores a panel's background color as a plain string in one of three
//! encodings: `#rrggbb` hex, `rgb(r,g,b)`, or `rgba(r,g,b,a)`. A transition
//! must write each panel back in the encoding it was originally stored in, so
//! the parsed representation keeps the encoding alongside the channel values.

use std::fmt;

use thiserror::Error;

/// Errors raised when a stored color string cannot be parsed.
///
/// A string matching none of the three known encodings is reported rather
/// than guessed at, so a transition never writes back a corrupted value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColorParseError {
    /// The string matches none of the known encodings.
    #[error("unrecognized color encoding: '{0}'")]
    UnrecognizedEncoding(String),
    /// A channel component is missing, not a decimal integer, or out of range.
    #[error("invalid {channel} channel in '{value}'")]
    InvalidChannel {
        /// Which channel failed to parse.
        channel: &'static str,
        /// The full color string being parsed.
        value: String,
    },
    /// The alpha component is missing, not a number, or outside `0..=1`.
    #[error("invalid alpha component in '{0}'")]
    InvalidAlpha(String),
}

/// An RGB triple with 8-bit channels.
///
/// The default value is black, matching the engine's dominant color before
/// the first wallpaper has been observed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// Creates an RGB value from its channels.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self { Self { r, g, b } }

    /// Formats the value as lowercase hex without a leading `#`.
    #[must_use]
    pub fn hex(&self) -> String { format!("{:02x}{:02x}{:02x}", self.r, self.g, self.b) }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// A panel background color together with the encoding it was stored in.
///
/// `Display` produces exactly the string the MATE panel itself writes for
/// that encoding: lowercase `#rrggbb`, `rgb(r,g,b)` without spaces, or
/// `rgba(r,g,b,a)` with the alpha printed to six decimal places.
#[derive(Debug, Clone, PartialEq)]
pub enum PanelColor {
    /// `#rrggbb` hex form.
    Hex(Rgb),
    /// `rgb(r,g,b)` decimal form.
    Rgb(Rgb),
    /// `rgba(r,g,b,a)` decimal form with a float alpha.
    Rgba(Rgb, f64),
}

impl PanelColor {
    /// Parses a stored color string.
    ///
    /// Hex digits are accepted in either case; `rgb()`/`rgba()` components
    /// may carry surrounding whitespace. Anything else is rejected with
    /// [`ColorParseError::UnrecognizedEncoding`].
    ///
    /// # Errors
    ///
    /// Returns a [`ColorParseError`] describing the first component that
    /// failed to parse.
    pub fn parse(value: &str) -> Result<Self, ColorParseError> {
        let trimmed = value.trim();

        // rgba must be checked before rgb since it shares the prefix
        if let Some(body) = strip_call(trimmed, "rgba") {
            return parse_rgba(body, value);
        }
        if let Some(body) = strip_call(trimmed, "rgb") {
            return parse_rgb(body, value);
        }
        if trimmed.starts_with('#') {
            return parse_hex(trimmed, value);
        }

        Err(ColorParseError::UnrecognizedEncoding(value.to_string()))
    }

    /// Returns the channel values, regardless of encoding.
    #[must_use]
    pub const fn rgb(&self) -> Rgb {
        match self {
            Self::Hex(rgb) | Self::Rgb(rgb) | Self::Rgba(rgb, _) => *rgb,
        }
    }

    /// Returns the alpha component for RGBA colors.
    #[must_use]
    pub const fn alpha(&self) -> Option<f64> {
        match self {
            Self::Hex(_) | Self::Rgb(_) => None,
            Self::Rgba(_, alpha) => Some(*alpha),
        }
    }

    /// Returns a color with the same encoding (and alpha) but new channels.
    ///
    /// This is how a transition writes intermediate and final values without
    /// changing how the panel stores its color.
    #[must_use]
    pub const fn with_rgb(&self, rgb: Rgb) -> Self {
        match self {
            Self::Hex(_) => Self::Hex(rgb),
            Self::Rgb(_) => Self::Rgb(rgb),
            Self::Rgba(_, alpha) => Self::Rgba(rgb, *alpha),
        }
    }
}

impl fmt::Display for PanelColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hex(rgb) => write!(f, "{rgb}"),
            Self::Rgb(rgb) => write!(f, "rgb({},{},{})", rgb.r, rgb.g, rgb.b),
            Self::Rgba(rgb, alpha) => {
                write!(f, "rgba({},{},{},{alpha:.6})", rgb.r, rgb.g, rgb.b)
            }
        }
    }
}

/// Strips a `name(...)` call wrapper, returning the inner component list.
fn strip_call<'a>(value: &'a str, name: &str) -> Option<&'a str> {
    value.strip_prefix(name)?.trim_start().strip_prefix('(')?.strip_suffix(')')
}

fn parse_hex(trimmed: &str, value: &str) -> Result<PanelColor, ColorParseError> {
    // exactly "#rrggbb"; shorthand forms are not written by the panel
    if trimmed.len() != 7 || !trimmed.is_ascii() {
        return Err(ColorParseError::UnrecognizedEncoding(value.to_string()));
    }

    let channel = |range: std::ops::Range<usize>, name: &'static str| {
        u8::from_str_radix(&trimmed[range], 16).map_err(|_| ColorParseError::InvalidChannel {
            channel: name,
            value: value.to_string(),
        })
    };

    Ok(PanelColor::Hex(Rgb::new(
        channel(1..3, "red")?,
        channel(3..5, "green")?,
        channel(5..7, "blue")?,
    )))
}

fn parse_rgb(body: &str, value: &str) -> Result<PanelColor, ColorParseError> {
    let mut parts = body.split(',');
    let rgb = parse_channels(&mut parts, value)?;

    if parts.next().is_some() {
        return Err(ColorParseError::UnrecognizedEncoding(value.to_string()));
    }

    Ok(PanelColor::Rgb(rgb))
}

fn parse_rgba(body: &str, value: &str) -> Result<PanelColor, ColorParseError> {
    let mut parts = body.split(',');
    let rgb = parse_channels(&mut parts, value)?;

    let alpha = parts
        .next()
        .ok_or_else(|| ColorParseError::InvalidAlpha(value.to_string()))?
        .trim()
        .parse::<f64>()
        .map_err(|_| ColorParseError::InvalidAlpha(value.to_string()))?;

    if !(0.0..=1.0).contains(&alpha) {
        return Err(ColorParseError::InvalidAlpha(value.to_string()));
    }
    if parts.next().is_some() {
        return Err(ColorParseError::UnrecognizedEncoding(value.to_string()));
    }

    Ok(PanelColor::Rgba(rgb, alpha))
}

/// Parses the three leading channel components of an `rgb()`/`rgba()` body.
fn parse_channels<'a, I>(parts: &mut I, value: &str) -> Result<Rgb, ColorParseError>
where I: Iterator<Item = &'a str> {
    let mut channel = |name: &'static str| {
        parts
            .next()
            .and_then(|part| part.trim().parse::<u8>().ok())
            .ok_or_else(|| ColorParseError::InvalidChannel { channel: name, value: value.to_string() })
    };

    Ok(Rgb::new(channel("red")?, channel("green")?, channel("blue")?))
}
