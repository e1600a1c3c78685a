use std::cell::OnceCell;

use ndarray::{s, ArrayView2, ArrayView3};

use crate::shared::region::Region;

/// A decoded raster: contiguous RGB bytes in row-major order.
///
/// The grayscale projection used for detection and scoring is derived on
/// first access and cached for the lifetime of the image. Images are owned
/// by the stage that decoded them and are never shared across sources.
#[derive(Clone, Debug)]
pub struct DecodedImage {
    data: Vec<u8>,
    width: u32,
    height: u32,
    gray: OnceCell<Vec<u8>>,
}

impl DecodedImage {
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * 3,
            "data length must equal width * height * 3"
        );
        Self {
            data,
            width,
            height,
            gray: OnceCell::new(),
        }
    }

    pub fn from_rgb(image: image::RgbImage) -> Self {
        let (width, height) = image.dimensions();
        Self::new(image.into_raw(), width, height)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bounds(&self) -> Region {
        Region::new(0, 0, self.width, self.height)
    }

    /// Single-channel luma projection, one byte per pixel.
    pub fn gray(&self) -> &[u8] {
        self.gray.get_or_init(|| to_gray(&self.data))
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(
            (self.height as usize, self.width as usize, 3),
            &self.data,
        )
        .expect("image data length must match dimensions")
    }

    pub fn gray_ndarray(&self) -> ArrayView2<'_, u8> {
        ArrayView2::from_shape((self.height as usize, self.width as usize), self.gray())
            .expect("gray data length must match dimensions")
    }

    /// Grayscale view of `region`, clipped to the image.
    pub fn gray_region(&self, region: &Region) -> ArrayView2<'_, u8> {
        let (x1, y1, x2, y2) = self.clip(region);
        self.gray_ndarray().slice_move(s![y1..y2, x1..x2])
    }

    /// Copies the RGB pixels of `region` (clipped to the image) into a new buffer.
    pub fn crop(&self, region: &Region) -> image::RgbImage {
        let (x1, y1, x2, y2) = self.clip(region);
        let view = self.as_ndarray().slice_move(s![y1..y2, x1..x2, ..]);
        let data: Vec<u8> = view.iter().copied().collect();
        image::RgbImage::from_raw((x2 - x1) as u32, (y2 - y1) as u32, data)
            .expect("crop buffer length must match crop dimensions")
    }

    fn clip(&self, region: &Region) -> (usize, usize, usize, usize) {
        let x1 = region.x.min(self.width) as usize;
        let y1 = region.y.min(self.height) as usize;
        let x2 = region.right().min(self.width) as usize;
        let y2 = region.bottom().min(self.height) as usize;
        (x1, y1, x2.max(x1), y2.max(y1))
    }
}

/// ITU-R BT.601 luma, the weighting most cascade detectors are trained on.
fn to_gray(rgb: &[u8]) -> Vec<u8> {
    rgb.chunks_exact(3)
        .map(|px| {
            let luma = 299 * px[0] as u32 + 587 * px[1] as u32 + 114 * px[2] as u32;
            ((luma + 500) / 1000) as u8
        })
        .collect()
}
