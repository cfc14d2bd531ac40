use crate::RasterizerError;

/// Dimensions of a row-major image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Shape {
    /// Width of the image
    pub width: usize,
    /// Height of the image
    pub height: usize,
}

impl Shape {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn offset(&self, row: usize, col: usize) -> usize {
        row * self.width + col
    }

    /// Number of pixels
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub trait Image {
    type Pixel;

    fn data(&self) -> &[Self::Pixel];

    fn shape(&self) -> Shape;

    fn width(&self) -> usize {
        self.shape().width
    }

    fn height(&self) -> usize {
        self.shape().height
    }

    fn get(&self, row: usize, col: usize) -> Option<&Self::Pixel> {
        let shape = self.shape();
        if row >= shape.height || col >= shape.width {
            return None;
        }
        self.data().get(shape.offset(row, col))
    }

    /// Iterate over rows of the image
    fn rows(&self) -> std::slice::Chunks<'_, Self::Pixel> {
        self.data().chunks(self.width().max(1))
    }
}

pub trait ImageMut: Image {
    fn data_mut(&mut self) -> &mut [Self::Pixel];

    fn get_mut(&mut self, row: usize, col: usize) -> Option<&mut Self::Pixel> {
        let shape = self.shape();
        if row >= shape.height || col >= shape.width {
            return None;
        }
        self.data_mut().get_mut(shape.offset(row, col))
    }

    /// Set every pixel to `value`
    fn fill(&mut self, value: Self::Pixel)
    where
        Self::Pixel: Clone,
    {
        self.data_mut().fill(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageOwned<P> {
    shape: Shape,
    data: Vec<P>,
}

impl<P> ImageOwned<P> {
    pub fn new_default(width: usize, height: usize) -> Self
    where
        P: Default + Clone,
    {
        Self {
            shape: Shape::new(width, height),
            data: vec![P::default(); width * height],
        }
    }
}

impl<P> Image for ImageOwned<P> {
    type Pixel = P;

    fn shape(&self) -> Shape {
        self.shape
    }

    fn data(&self) -> &[Self::Pixel] {
        &self.data
    }
}

impl<P> ImageMut for ImageOwned<P> {
    fn data_mut(&mut self) -> &mut [Self::Pixel] {
        &mut self.data
    }
}

impl<I> Image for &I
where
    I: Image + ?Sized,
{
    type Pixel = I::Pixel;

    fn shape(&self) -> Shape {
        (*self).shape()
    }

    fn data(&self) -> &[Self::Pixel] {
        (*self).data()
    }
}

impl<I> Image for &mut I
where
    I: Image + ?Sized,
{
    type Pixel = I::Pixel;

    fn shape(&self) -> Shape {
        (**self).shape()
    }

    fn data(&self) -> &[Self::Pixel] {
        (**self).data()
    }
}

impl<I> ImageMut for &mut I
where
    I: ImageMut + ?Sized,
{
    fn data_mut(&mut self) -> &mut [Self::Pixel] {
        (**self).data_mut()
    }
}

/// Pixel layout of a caller owned image buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PixelFormat {
    GreyScale8bit,
    Rgb24bit,
    Rgba32bit,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::GreyScale8bit => 1,
            PixelFormat::Rgb24bit => 3,
            PixelFormat::Rgba32bit => 4,
        }
    }
}

/// Image buffer provided by the caller of the rasterizer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    pixel_format: PixelFormat,
    shape: Shape,
    data: Vec<u8>,
}

impl ImageData {
    /// Allocate zeroed buffer
    pub fn new(
        pixel_format: PixelFormat,
        width: u32,
        height: u32,
    ) -> Result<Self, RasterizerError> {
        if width == 0 || height == 0 {
            return Err(RasterizerError::InvalidPixelCount);
        }
        let shape = Shape::new(width as usize, height as usize);
        Ok(Self {
            pixel_format,
            shape,
            data: vec![0; shape.len() * pixel_format.bytes_per_pixel()],
        })
    }

    pub fn pixel_format(&self) -> PixelFormat {
        self.pixel_format
    }

    pub fn size(&self) -> (u32, u32) {
        (self.shape.width as u32, self.shape.height as u32)
    }

    /// Raw bytes, `bytes_per_pixel` per pixel
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

/// Pixel access is only meaningful for greyscale buffers, for other formats
/// the data is exposed as raw bytes with the width scaled accordingly.
impl Image for ImageData {
    type Pixel = u8;

    fn shape(&self) -> Shape {
        Shape::new(
            self.shape.width * self.pixel_format.bytes_per_pixel(),
            self.shape.height,
        )
    }

    fn data(&self) -> &[Self::Pixel] {
        &self.data
    }
}

impl ImageMut for ImageData {
    fn data_mut(&mut self) -> &mut [Self::Pixel] {
        &mut self.data
    }
}
