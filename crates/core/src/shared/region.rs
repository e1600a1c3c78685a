/// Axis-aligned face box in source-image pixel coordinates.
///
/// Coordinates are always non-negative; detectors clamp their raw output
/// to the image before handing regions to the rest of the pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Builds a region from a detector box that may extend past the image,
    /// clipping it to `[0, image_width) x [0, image_height)`.
    ///
    /// Returns `None` when nothing of the box lies inside the image.
    pub fn clipped(
        x: i64,
        y: i64,
        width: i64,
        height: i64,
        image_width: u32,
        image_height: u32,
    ) -> Option<Self> {
        let x1 = x.max(0);
        let y1 = y.max(0);
        let x2 = (x + width).min(image_width as i64);
        let y2 = (y + height).min(image_height as i64);
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some(Self::new(
            x1 as u32,
            y1 as u32,
            (x2 - x1) as u32,
            (y2 - y1) as u32,
        ))
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// Grows every side by `round(width * margin)` and clamps the result to
    /// the image bounds.
    ///
    /// The margin is width-relative on both axes. Near an edge the clamp
    /// silently eats into the margin; the face box itself is never cut.
    pub fn expand(&self, margin: f64, image_width: u32, image_height: u32) -> Region {
        let m = (self.width as f64 * margin.max(0.0)).round() as i64;
        Region::clipped(
            self.x as i64 - m,
            self.y as i64 - m,
            self.width as i64 + 2 * m,
            self.height as i64 + 2 * m,
            image_width,
            image_height,
        )
        .unwrap_or(*self)
    }

    pub fn contains(&self, other: &Region) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }
}
