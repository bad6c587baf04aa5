//! The exclusion pixel kernel, independent of GStreamer.
//!
//! Every pixel is four bytes: three 8-bit color channels and one unused byte,
//! in the byte order described by [`PixelLayout`].

use thiserror::Error;

/// Saturation factor of the exclusion formula.
pub const EXCLUSION_FACTOR: i32 = 175;

const BYTES_PER_PIXEL: usize = 4;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame dimensions have not been configured")]
    NotConfigured,

    #[error("frame is {actual} bytes, expected {expected}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("stride {stride} is shorter than a row of {row_bytes} bytes")]
    StrideTooSmall { stride: usize, row_bytes: usize },

    #[error("frame dimensions overflow")]
    DimensionsOverflow,
}

/// Byte order of a packed 32-bit pixel.
///
/// `Bgrx` and `Rgbx` are the little-endian packings of `0x00RRGGBB` and
/// `0x00BBGGRR`, `Xrgb` and `Xbgr` the big-endian ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PixelLayout {
    #[default]
    Bgrx,
    Rgbx,
    Xrgb,
    Xbgr,
}

impl PixelLayout {
    /// Byte offsets of red, green, blue and the unused byte.
    const fn offsets(self) -> [usize; 4] {
        match self {
            PixelLayout::Bgrx => [2, 1, 0, 3],
            PixelLayout::Rgbx => [0, 1, 2, 3],
            PixelLayout::Xrgb => [1, 2, 3, 0],
            PixelLayout::Xbgr => [3, 2, 1, 0],
        }
    }

    pub fn unpack(self, pixel: &[u8]) -> (u8, u8, u8) {
        let [r, g, b, _] = self.offsets();
        (pixel[r], pixel[g], pixel[b])
    }

    pub fn pack(self, pixel: &mut [u8], (red, green, blue): (u8, u8, u8)) {
        let [r, g, b, x] = self.offsets();
        pixel[r] = red;
        pixel[g] = green;
        pixel[b] = blue;
        pixel[x] = 0;
    }
}

/// Keep the value inside `[min, max]`.
pub fn gate_int(value: i32, min: i32, max: i32) -> i32 {
    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}

#[inline]
fn exclude(own: i32, other: i32) -> u8 {
    let f = EXCLUSION_FACTOR;
    let value = f - ((f - own) * (f - own) / f + (other * own) / f);
    gate_int(value, 0, 255) as u8
}

/// Apply the exclusion formula to one pixel.
///
/// Red is coupled with green, green and blue only with themselves.
pub fn exclude_pixel(red: u8, green: u8, blue: u8) -> (u8, u8, u8) {
    let (red, green, blue) = (i32::from(red), i32::from(green), i32::from(blue));
    (
        exclude(red, green),
        exclude(green, green),
        exclude(blue, blue),
    )
}

fn exclude_row(layout: PixelLayout, src: &[u8], dst: &mut [u8]) {
    for (in_px, out_px) in src
        .chunks_exact(BYTES_PER_PIXEL)
        .zip(dst.chunks_exact_mut(BYTES_PER_PIXEL))
    {
        let (red, green, blue) = layout.unpack(in_px);
        layout.pack(out_px, exclude_pixel(red, green, blue));
    }
}

/// Maps frames of the negotiated size through the exclusion formula.
///
/// Holds nothing but the negotiated geometry; every call is independent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PixelTransformer {
    width: usize,
    height: usize,
    layout: PixelLayout,
}

impl PixelTransformer {
    pub fn new(width: usize, height: usize, layout: PixelLayout) -> Self {
        PixelTransformer {
            width,
            height,
            layout,
        }
    }

    pub fn configure(&mut self, width: usize, height: usize, layout: PixelLayout) {
        self.width = width;
        self.height = height;
        self.layout = layout;
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn layout(&self) -> PixelLayout {
        self.layout
    }

    pub fn pixel_count(&self) -> usize {
        self.width.saturating_mul(self.height)
    }

    fn row_bytes(&self) -> Result<usize, FrameError> {
        if self.width == 0 || self.height == 0 {
            return Err(FrameError::NotConfigured);
        }
        self.width
            .checked_mul(BYTES_PER_PIXEL)
            .ok_or(FrameError::DimensionsOverflow)
    }

    /// Size in bytes of one packed frame.
    pub fn frame_size(&self) -> Result<usize, FrameError> {
        self.row_bytes()?
            .checked_mul(self.height)
            .ok_or(FrameError::DimensionsOverflow)
    }

    /// Transform a packed frame into a newly allocated one.
    pub fn transform(&self, input: &[u8]) -> Result<Vec<u8>, FrameError> {
        let mut output = vec![0; self.frame_size()?];
        self.transform_into(input, &mut output)?;
        Ok(output)
    }

    /// Transform a packed frame into `output`, which must be the same size.
    pub fn transform_into(&self, input: &[u8], output: &mut [u8]) -> Result<(), FrameError> {
        let row_bytes = self.row_bytes()?;
        self.transform_strided(input, row_bytes, output, row_bytes)
    }

    /// Transform a plane whose rows are `in_stride` bytes apart into one whose
    /// rows are `out_stride` bytes apart. Padding bytes in `output` are left alone.
    pub fn transform_strided(
        &self,
        input: &[u8],
        in_stride: usize,
        output: &mut [u8],
        out_stride: usize,
    ) -> Result<(), FrameError> {
        let row_bytes = self.row_bytes()?;
        let expected_in = plane_size(in_stride, row_bytes, self.height)?;
        let expected_out = plane_size(out_stride, row_bytes, self.height)?;

        if input.len() < expected_in {
            return Err(FrameError::SizeMismatch {
                expected: expected_in,
                actual: input.len(),
            });
        }
        if output.len() < expected_out {
            return Err(FrameError::SizeMismatch {
                expected: expected_out,
                actual: output.len(),
            });
        }
        if in_stride == row_bytes && input.len() != expected_in {
            return Err(FrameError::SizeMismatch {
                expected: expected_in,
                actual: input.len(),
            });
        }
        if out_stride == row_bytes && output.len() != expected_out {
            return Err(FrameError::SizeMismatch {
                expected: expected_out,
                actual: output.len(),
            });
        }

        for (src, dst) in input
            .chunks(in_stride)
            .zip(output.chunks_mut(out_stride))
            .take(self.height)
        {
            exclude_row(self.layout, &src[..row_bytes], &mut dst[..row_bytes]);
        }

        Ok(())
    }
}

/// Bytes needed for `height` rows of `row_bytes`, `stride` apart. The last
/// row does not need its padding.
fn plane_size(stride: usize, row_bytes: usize, height: usize) -> Result<usize, FrameError> {
    if stride < row_bytes {
        return Err(FrameError::StrideTooSmall { stride, row_bytes });
    }
    stride
        .checked_mul(height - 1)
        .and_then(|n| n.checked_add(row_bytes))
        .ok_or(FrameError::DimensionsOverflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bgrx(pixels: &[(u8, u8, u8)]) -> Vec<u8> {
        pixels
            .iter()
            .flat_map(|&(r, g, b)| [b, g, r, 0xff])
            .collect()
    }

    #[test]
    fn gate_int_is_identity_in_range() {
        for c in 0..=255 {
            assert_eq!(gate_int(c, 0, 255), c);
        }
    }

    #[test]
    fn gate_int_clamps() {
        assert_eq!(gate_int(-1, 0, 255), 0);
        assert_eq!(gate_int(-232, 0, 255), 0);
        assert_eq!(gate_int(i32::MIN, 0, 255), 0);
        assert_eq!(gate_int(256, 0, 255), 255);
        assert_eq!(gate_int(i32::MAX, 0, 255), 255);
    }

    #[test]
    fn black_stays_black() {
        // (F - 0)^2 / F == F, so every channel cancels out.
        assert_eq!(exclude_pixel(0, 0, 0), (0, 0, 0));
    }

    #[test]
    fn white_goes_black() {
        assert_eq!(exclude_pixel(255, 255, 255), (0, 0, 0));
    }

    #[test]
    fn pinned_values() {
        assert_eq!(exclude_pixel(100, 50, 200), (115, 72, 0));
        assert_eq!(exclude_pixel(50, 100, 87), (58, 86, 88));
        assert_eq!(exclude_pixel(87, 87, 87), (88, 88, 88));
        assert_eq!(exclude_pixel(175, 175, 175), (0, 0, 0));
    }

    #[test]
    fn red_depends_on_green() {
        let (r1, _, _) = exclude_pixel(100, 0, 0);
        let (r2, _, _) = exclude_pixel(100, 200, 0);
        assert_ne!(r1, r2);

        let (_, g1, b1) = exclude_pixel(0, 120, 30);
        let (_, g2, b2) = exclude_pixel(255, 120, 30);
        assert_eq!((g1, b1), (g2, b2));
    }

    #[test]
    fn output_never_exceeds_factor() {
        for c in 0..=255u8 {
            let (r, g, b) = exclude_pixel(c, c, c);
            assert!(i32::from(r) <= EXCLUSION_FACTOR);
            assert!(i32::from(g) <= EXCLUSION_FACTOR);
            assert!(i32::from(b) <= EXCLUSION_FACTOR);
        }
    }

    #[test]
    fn transform_one_pixel() {
        let t = PixelTransformer::new(1, 1, PixelLayout::Bgrx);
        let out = t.transform(&bgrx(&[(100, 50, 200)])).unwrap();
        assert_eq!(out, vec![0, 72, 115, 0]);
    }

    #[test]
    fn transform_keeps_size_and_is_deterministic() {
        let t = PixelTransformer::new(3, 2, PixelLayout::Bgrx);
        let input = bgrx(&[
            (0, 0, 0),
            (255, 255, 255),
            (100, 50, 200),
            (50, 100, 87),
            (1, 2, 3),
            (200, 150, 100),
        ]);
        let a = t.transform(&input).unwrap();
        let b = t.transform(&input).unwrap();
        assert_eq!(a.len(), input.len());
        assert_eq!(a.len(), t.pixel_count() * 4);
        assert_eq!(a, b);
        assert_eq!(&a[8..12], &[0, 72, 115, 0]);
    }

    #[test]
    fn transform_does_not_touch_input() {
        let t = PixelTransformer::new(2, 1, PixelLayout::Rgbx);
        let input = vec![10, 20, 30, 40, 50, 60, 70, 80];
        let copy = input.clone();
        t.transform(&input).unwrap();
        assert_eq!(input, copy);
    }

    #[test]
    fn layouts_agree_on_logical_pixels() {
        let (r, g, b) = (100, 50, 200);
        let expected = exclude_pixel(r, g, b);
        for layout in [
            PixelLayout::Bgrx,
            PixelLayout::Rgbx,
            PixelLayout::Xrgb,
            PixelLayout::Xbgr,
        ] {
            let mut input = [0xaa; 4];
            layout.pack(&mut input, (r, g, b));
            let t = PixelTransformer::new(1, 1, layout);
            let out = t.transform(&input).unwrap();
            assert_eq!(layout.unpack(&out), expected, "{layout:?}");
        }
    }

    #[test]
    fn byte_positions_per_layout() {
        let input_rgbx = [100, 50, 200, 9];
        let out = PixelTransformer::new(1, 1, PixelLayout::Rgbx)
            .transform(&input_rgbx)
            .unwrap();
        assert_eq!(out, [115, 72, 0, 0]);

        let input_xrgb = [9, 100, 50, 200];
        let out = PixelTransformer::new(1, 1, PixelLayout::Xrgb)
            .transform(&input_xrgb)
            .unwrap();
        assert_eq!(out, [0, 115, 72, 0]);

        let input_xbgr = [9, 200, 50, 100];
        let out = PixelTransformer::new(1, 1, PixelLayout::Xbgr)
            .transform(&input_xbgr)
            .unwrap();
        assert_eq!(out, [0, 0, 72, 115]);
    }

    #[test]
    fn unconfigured_is_an_error() {
        let t = PixelTransformer::default();
        assert_eq!(t.transform(&[]), Err(FrameError::NotConfigured));

        let t = PixelTransformer::new(4, 0, PixelLayout::Bgrx);
        assert_eq!(t.transform(&[]), Err(FrameError::NotConfigured));
    }

    #[test]
    fn size_mismatch_is_an_error() {
        let t = PixelTransformer::new(2, 2, PixelLayout::Bgrx);
        assert_eq!(
            t.transform(&[0; 12]),
            Err(FrameError::SizeMismatch {
                expected: 16,
                actual: 12
            })
        );
        assert_eq!(
            t.transform(&[0; 20]),
            Err(FrameError::SizeMismatch {
                expected: 16,
                actual: 20
            })
        );

        let mut out = [0; 8];
        assert_eq!(
            t.transform_into(&[0; 16], &mut out),
            Err(FrameError::SizeMismatch {
                expected: 16,
                actual: 8
            })
        );
    }

    #[test]
    fn overflowing_dimensions_are_an_error() {
        let t = PixelTransformer::new(usize::MAX, 2, PixelLayout::Bgrx);
        assert_eq!(t.frame_size(), Err(FrameError::DimensionsOverflow));
    }

    #[test]
    fn reconfigure_changes_geometry() {
        let mut t = PixelTransformer::new(1, 1, PixelLayout::Bgrx);
        assert_eq!(t.frame_size(), Ok(4));

        t.configure(2, 3, PixelLayout::Xbgr);
        assert_eq!((t.width(), t.height(), t.layout()), (2, 3, PixelLayout::Xbgr));
        assert_eq!(t.frame_size(), Ok(24));
        assert_eq!(t.transform(&[0; 24]).unwrap().len(), 24);
    }

    #[test]
    fn strided_planes() {
        let t = PixelTransformer::new(1, 2, PixelLayout::Bgrx);
        // Two rows of one pixel, each padded to 8 bytes.
        let input = [200, 50, 100, 0, 7, 7, 7, 7, 0, 0, 0, 0];
        let mut output = [0xee; 16];
        t.transform_strided(&input, 8, &mut output, 8).unwrap();
        assert_eq!(&output[0..4], &[0, 72, 115, 0]);
        assert_eq!(&output[4..8], &[0xee; 4]);
        assert_eq!(&output[8..12], &[0, 0, 0, 0]);
        assert_eq!(&output[12..16], &[0xee; 4]);
    }

    #[test]
    fn stride_shorter_than_row_is_an_error() {
        let t = PixelTransformer::new(2, 1, PixelLayout::Bgrx);
        let mut output = [0; 8];
        assert_eq!(
            t.transform_strided(&[0; 8], 4, &mut output, 8),
            Err(FrameError::StrideTooSmall {
                stride: 4,
                row_bytes: 8
            })
        );
    }
}
