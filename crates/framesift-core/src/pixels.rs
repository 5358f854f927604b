use ndarray::{s, Array2, Array3, Axis};

/// BGR2GRAY luma weights, BGR plane order.
const LUMA_WEIGHTS: [f32; 3] = [0.114, 0.587, 0.299];

/// A decoded pixel matrix at its native depth. Color planes are
/// interleaved in BGR order, shape `(height, width, 3)`.
#[derive(Clone, Debug, PartialEq)]
pub enum Decoded {
    Mono8(Array2<u8>),
    Mono16(Array2<u16>),
    MonoF32(Array2<f32>),
    Bgr8(Array3<u8>),
    Bgr16(Array3<u16>),
}

impl Decoded {
    pub fn width(&self) -> usize {
        match self {
            Self::Mono8(m) => m.ncols(),
            Self::Mono16(m) => m.ncols(),
            Self::MonoF32(m) => m.ncols(),
            Self::Bgr8(m) => m.dim().1,
            Self::Bgr16(m) => m.dim().1,
        }
    }

    pub fn height(&self) -> usize {
        match self {
            Self::Mono8(m) => m.nrows(),
            Self::Mono16(m) => m.nrows(),
            Self::MonoF32(m) => m.nrows(),
            Self::Bgr8(m) => m.dim().0,
            Self::Bgr16(m) => m.dim().0,
        }
    }

    pub fn channels(&self) -> usize {
        match self {
            Self::Mono8(_) | Self::Mono16(_) | Self::MonoF32(_) => 1,
            Self::Bgr8(_) | Self::Bgr16(_) => 3,
        }
    }

    pub fn bytes_per_sample(&self) -> usize {
        match self {
            Self::Mono8(_) | Self::Bgr8(_) => 1,
            Self::Mono16(_) | Self::Bgr16(_) => 2,
            Self::MonoF32(_) => 4,
        }
    }

    /// Negative image: subtract every sample from the channel maximum.
    /// Integer depths use the type maximum; float uses the observed
    /// per-matrix maximum.
    pub fn invert(&mut self) {
        match self {
            Self::Mono8(m) => m.mapv_inplace(|v| u8::MAX - v),
            Self::Mono16(m) => m.mapv_inplace(|v| u16::MAX - v),
            Self::MonoF32(m) => {
                let max = m.iter().copied().fold(f32::NEG_INFINITY, f32::max);
                if max.is_finite() {
                    m.mapv_inplace(|v| max - v);
                }
            }
            Self::Bgr8(m) => m.mapv_inplace(|v| u8::MAX - v),
            Self::Bgr16(m) => m.mapv_inplace(|v| u16::MAX - v),
        }
    }

    /// Convert to float planes (BGR order for color), keeping raw sample
    /// values.
    pub fn to_float_planes(&self) -> Vec<Array2<f32>> {
        match self {
            Self::Mono8(m) => vec![m.mapv(|v| v as f32)],
            Self::Mono16(m) => vec![m.mapv(|v| v as f32)],
            Self::MonoF32(m) => vec![m.clone()],
            Self::Bgr8(m) => (0..3)
                .map(|c| m.index_axis(Axis(2), c).mapv(|v| v as f32))
                .collect(),
            Self::Bgr16(m) => (0..3)
                .map(|c| m.index_axis(Axis(2), c).mapv(|v| v as f32))
                .collect(),
        }
    }

    /// Copy the rectangle into a fresh matrix of the same depth. The
    /// rectangle must lie within the image.
    pub fn crop(&self, rect: &CropRect) -> Decoded {
        let (y, x) = (rect.y as usize, rect.x as usize);
        let (h, w) = (rect.height as usize, rect.width as usize);
        match self {
            Self::Mono8(m) => Self::Mono8(m.slice(s![y..y + h, x..x + w]).to_owned()),
            Self::Mono16(m) => Self::Mono16(m.slice(s![y..y + h, x..x + w]).to_owned()),
            Self::MonoF32(m) => Self::MonoF32(m.slice(s![y..y + h, x..x + w]).to_owned()),
            Self::Bgr8(m) => Self::Bgr8(m.slice(s![y..y + h, x..x + w, ..]).to_owned()),
            Self::Bgr16(m) => Self::Bgr16(m.slice(s![y..y + h, x..x + w, ..]).to_owned()),
        }
    }

    /// Like [`crop`](Self::crop) but reuses `buffer`'s allocation when
    /// its depth and geometry already match.
    pub fn crop_reusing(&self, rect: &CropRect, buffer: Option<Decoded>) -> Decoded {
        let (y, x) = (rect.y as usize, rect.x as usize);
        let (h, w) = (rect.height as usize, rect.width as usize);
        match (self, buffer) {
            (Self::Mono8(m), Some(Self::Mono8(mut b))) if b.dim() == (h, w) => {
                b.assign(&m.slice(s![y..y + h, x..x + w]));
                Self::Mono8(b)
            }
            (Self::Mono16(m), Some(Self::Mono16(mut b))) if b.dim() == (h, w) => {
                b.assign(&m.slice(s![y..y + h, x..x + w]));
                Self::Mono16(b)
            }
            (Self::MonoF32(m), Some(Self::MonoF32(mut b))) if b.dim() == (h, w) => {
                b.assign(&m.slice(s![y..y + h, x..x + w]));
                Self::MonoF32(b)
            }
            (Self::Bgr8(m), Some(Self::Bgr8(mut b))) if b.dim() == (h, w, 3) => {
                b.assign(&m.slice(s![y..y + h, x..x + w, ..]));
                Self::Bgr8(b)
            }
            (Self::Bgr16(m), Some(Self::Bgr16(mut b))) if b.dim() == (h, w, 3) => {
                b.assign(&m.slice(s![y..y + h, x..x + w, ..]));
                Self::Bgr16(b)
            }
            _ => self.crop(rect),
        }
    }
}

/// Grayscale conversion: single plane is passed through, BGR planes are
/// combined with the usual luma weights.
pub fn grayscale(planes: &[Array2<f32>]) -> Array2<f32> {
    if planes.len() == 1 {
        return planes[0].clone();
    }
    let mut gray = &planes[0] * LUMA_WEIGHTS[0];
    gray.scaled_add(LUMA_WEIGHTS[1], &planes[1]);
    gray.scaled_add(LUMA_WEIGHTS[2], &planes[2]);
    gray
}

/// An axis-aligned rectangle in image pixels. Coordinates are signed so
/// a rectangle centered near an edge can extend outside the image before
/// being rejected.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CropRect {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    pub fn full(width: usize, height: usize) -> Self {
        Self {
            x: 0,
            y: 0,
            width: width as u32,
            height: height as u32,
        }
    }

    /// Square of side `side` whose center is the given point.
    pub fn centered_square(center_x: f64, center_y: f64, side: u32) -> Self {
        Self {
            x: center_x.round() as i64 - side as i64 / 2,
            y: center_y.round() as i64 - side as i64 / 2,
            width: side,
            height: side,
        }
    }

    pub fn fits_within(&self, width: usize, height: usize) -> bool {
        self.x >= 0
            && self.y >= 0
            && self.x + self.width as i64 <= width as i64
            && self.y + self.height as i64 <= height as i64
    }

    /// Grown by `margin` pixels on every side.
    pub fn inflated(&self, margin: u32) -> Self {
        Self {
            x: self.x - margin as i64,
            y: self.y - margin as i64,
            width: self.width + 2 * margin,
            height: self.height + 2 * margin,
        }
    }
}
