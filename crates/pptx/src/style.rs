//! Slide styling and text-box geometry.
//!
//! All positions are in EMUs (English Metric Units, 914400 EMU = 1 inch).

/// EMUs per inch.
pub const EMU_PER_INCH: i64 = 914_400;

/// Convert inches to EMUs.
pub fn inches(value: f64) -> i64 {
    (value * EMU_PER_INCH as f64).round() as i64
}

/// Smallest width or height a text box is given on very small slides.
const MIN_BOX_EXTENT: i64 = EMU_PER_INCH / 2;

/// An RGB color written as `srgbClr`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Hex form used in DrawingML, e.g. `00008B`.
    pub fn hex(&self) -> String {
        format!("{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }
}

/// Slide dimensions in EMUs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlideSize {
    pub width: i64,
    pub height: i64,
}

impl Default for SlideSize {
    /// 10in x 7.5in (4:3).
    fn default() -> Self {
        Self {
            width: 9_144_000,
            height: 6_858_000,
        }
    }
}

/// A text-box rectangle in EMUs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i64,
    pub y: i64,
    pub cx: i64,
    pub cy: i64,
}

impl Rect {
    fn new(x: i64, y: i64, cx: i64, cy: i64) -> Self {
        Self {
            x,
            y,
            cx: cx.max(MIN_BOX_EXTENT),
            cy: cy.max(MIN_BOX_EXTENT),
        }
    }
}

/// Horizontal paragraph alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

impl Align {
    pub(crate) fn as_attr(&self) -> &'static str {
        match self {
            Align::Left => "l",
            Align::Right => "r",
        }
    }
}

/// Fonts, sizes and colors of generated slides.
///
/// Sizes are in points.
#[derive(Debug, Clone, PartialEq)]
pub struct SlideStyle {
    pub font: String,
    pub text_color: Rgb,
    pub title_size: u32,
    pub counter_size: u32,
    pub counter_color: Rgb,
    pub lyric_size: u32,
    pub lyric_space_after: u32,
    pub index_entry_size: u32,
    pub index_entry_space_after: u32,
    pub link_color: Rgb,
}

impl Default for SlideStyle {
    fn default() -> Self {
        Self {
            font: "Calibri".to_string(),
            text_color: Rgb(0, 0, 0),
            title_size: 32,
            counter_size: 24,
            counter_color: Rgb(100, 100, 100),
            lyric_size: 28,
            lyric_space_after: 16,
            index_entry_size: 20,
            index_entry_space_after: 6,
            link_color: Rgb(0, 0, 139),
        }
    }
}

impl SlideStyle {
    /// Create the default style (Calibri, black text, dark blue links).
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different font for every text box.
    pub fn with_font(mut self, font: impl Into<String>) -> Self {
        self.font = font.into();
        self
    }

    /// Use a different lyric font size.
    pub fn with_lyric_size(mut self, points: u32) -> Self {
        self.lyric_size = points.max(1);
        self
    }
}

/// Song title box, top left, leaving room for the counter.
pub fn song_title_box(size: SlideSize) -> Rect {
    Rect::new(inches(0.5), inches(0.6), size.width - inches(7.0), inches(1.0))
}

/// Slide counter box, top right.
pub fn counter_box(size: SlideSize) -> Rect {
    Rect::new(size.width - inches(2.0), inches(0.6), inches(1.5), inches(1.0))
}

/// Lyrics box below the title.
pub fn lyrics_box(size: SlideSize) -> Rect {
    Rect::new(
        inches(0.5),
        inches(1.4),
        size.width - inches(1.0),
        size.height - inches(1.9),
    )
}

/// Index page heading, full width.
pub fn index_heading_box(size: SlideSize) -> Rect {
    Rect::new(inches(0.5), inches(0.6), size.width - inches(1.0), inches(1.0))
}

/// Left index column.
pub fn index_left_box(size: SlideSize) -> Rect {
    Rect::new(inches(0.5), inches(1.6), inches(4.5), size.height - inches(2.8))
}

/// Right index column.
pub fn index_right_box(size: SlideSize) -> Rect {
    Rect::new(inches(5.2), inches(1.6), inches(4.3), size.height - inches(2.8))
}
