use ndarray::ArrayView3;

/// Number of interleaved channels in every captured frame (RGB24).
pub const RGB_CHANNELS: u8 = 3;

/// One image pulled from the capture device.
///
/// Pixels are tightly packed RGB in row-major order; stride padding is
/// stripped at the capture boundary. `index` counts frames from the start
/// of the session and is strictly increasing in capture order.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * RGB_CHANNELS as usize,
            "data length must equal width * height * 3"
        );
        Self {
            data,
            width,
            height,
            index,
        }
    }

    /// A frame of uniform colour, mostly useful for tests and placeholders.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3], index: usize) -> Self {
        let pixels = (width as usize) * (height as usize);
        let mut data = Vec::with_capacity(pixels * RGB_CHANNELS as usize);
        for _ in 0..pixels {
            data.extend_from_slice(&rgb);
        }
        Self::new(data, width, height, index)
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

    pub fn channels(&self) -> u8 {
        RGB_CHANNELS
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        let offset = self.offset(x, y)?;
        Some([
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
        ])
    }

    /// Writes one pixel; coordinates outside the frame are ignored.
    pub fn put_pixel(&mut self, x: u32, y: u32, rgb: [u8; 3]) {
        if let Some(offset) = self.offset(x, y) {
            self.data[offset..offset + 3].copy_from_slice(&rgb);
        }
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    fn offset(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(((y as usize) * (self.width as usize) + x as usize) * RGB_CHANNELS as usize)
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            RGB_CHANNELS as usize,
        )
    }
}
