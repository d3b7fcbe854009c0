use std::fmt::{Display, Formatter};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Default)]
pub enum PixelFormat {
    Rgb565,
    Rgb565A8,
    Rgb888,
    Xrgb8888,
    #[default]
    Argb8888,
}

pub const FORMAT_RGB_565: u32 = 1;
pub const FORMAT_RGB_565A8: u32 = 2;
pub const FORMAT_RGB_888: u32 = 3;
pub const FORMAT_XRGB_8888: u32 = 4;
pub const FORMAT_ARGB_8888: u32 = 5;

impl PixelFormat {
    /// Maps a client layout code to a format. Unknown codes map to `Argb8888`.
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            FORMAT_RGB_565 => Self::Rgb565,
            FORMAT_RGB_565A8 => Self::Rgb565A8,
            FORMAT_RGB_888 => Self::Rgb888,
            FORMAT_XRGB_8888 => Self::Xrgb8888,
            _ => Self::Argb8888,
        }
    }

    pub fn raw(self) -> u32 {
        match self {
            Self::Rgb565 => FORMAT_RGB_565,
            Self::Rgb565A8 => FORMAT_RGB_565A8,
            Self::Rgb888 => FORMAT_RGB_888,
            Self::Xrgb8888 => FORMAT_XRGB_8888,
            Self::Argb8888 => FORMAT_ARGB_8888,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Rgb565 => "rgb565",
            Self::Rgb565A8 => "rgb565a8",
            Self::Rgb888 => "rgb888",
            Self::Xrgb8888 => "xrgb8888",
            Self::Argb8888 => "argb8888",
        }
    }

    /// Bytes per pixel of the color plane. `Rgb565A8` carries an additional
    /// 8-bit alpha plane which is not included here.
    pub fn bpp(self) -> u32 {
        match self {
            Self::Rgb565 | Self::Rgb565A8 => 2,
            Self::Rgb888 => 3,
            Self::Xrgb8888 | Self::Argb8888 => 4,
        }
    }

    pub fn has_alpha(self) -> bool {
        matches!(self, Self::Rgb565A8 | Self::Argb8888)
    }
}

impl Display for PixelFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
