use crate::{
    DEFAULT_PIXELS_PER_BLOCK, DEFAULT_UNITS_PER_SUBPIXEL, Image, ImageData, ImageObject,
    LayerDataObject, MAX_PIXELS_PER_BLOCK, MAX_SUBSAMPLING, MAX_UNITS_PER_SUBPIXEL,
    MIN_PIXELS_PER_BLOCK, MIN_SUBSAMPLING, MIN_UNITS_PER_SUBPIXEL, PixelFormat, Point,
    RasterizerError, Scalar, mm_per_pixel,
};

/// Resolution of the block grid used for rasterization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SamplingParameters {
    pub units_per_subpixel: u32,
    pub pixels_per_block: u32,
}

impl Default for SamplingParameters {
    fn default() -> Self {
        Self {
            units_per_subpixel: DEFAULT_UNITS_PER_SUBPIXEL,
            pixels_per_block: DEFAULT_PIXELS_PER_BLOCK,
        }
    }
}

impl SamplingParameters {
    pub fn validate(&self) -> Result<(), RasterizerError> {
        if !(MIN_UNITS_PER_SUBPIXEL..=MAX_UNITS_PER_SUBPIXEL).contains(&self.units_per_subpixel)
            || self.units_per_subpixel % 2 != 0
        {
            return Err(RasterizerError::InvalidUnitsPerSubpixel);
        }
        if !(MIN_PIXELS_PER_BLOCK..=MAX_PIXELS_PER_BLOCK).contains(&self.pixels_per_block) {
            return Err(RasterizerError::InvalidPixelsPerBlock);
        }
        Ok(())
    }
}

/// Rasterization target with fixed pixel dimensions accumulating layers
#[derive(Debug, Clone)]
pub struct RasterizerInstance {
    pixel_count: (u32, u32),
    dpi: (Scalar, Scalar),
    position: Point,
    subsampling: (u32, u32),
    sampling: SamplingParameters,
    layers: Vec<LayerDataObject>,
}

impl RasterizerInstance {
    pub fn new(
        pixel_count_x: u32,
        pixel_count_y: u32,
        dpi_x: Scalar,
        dpi_y: Scalar,
    ) -> Result<Self, RasterizerError> {
        if pixel_count_x == 0 || pixel_count_y == 0 {
            return Err(RasterizerError::InvalidPixelCount);
        }
        if !(dpi_x > 0.0 && dpi_y > 0.0) {
            return Err(RasterizerError::InvalidDpiValue);
        }
        Ok(Self {
            pixel_count: (pixel_count_x, pixel_count_y),
            dpi: (dpi_x, dpi_y),
            position: Point::default(),
            subsampling: (1, 1),
            sampling: SamplingParameters::default(),
            layers: Vec::new(),
        })
    }

    pub fn dpi(&self) -> (Scalar, Scalar) {
        self.dpi
    }

    /// Size in millimeters
    pub fn size(&self) -> (Scalar, Scalar) {
        (
            self.pixel_count.0 as Scalar * mm_per_pixel(self.dpi.0),
            self.pixel_count.1 as Scalar * mm_per_pixel(self.dpi.1),
        )
    }

    /// Size in pixels
    pub fn pixel_size(&self) -> (u32, u32) {
        self.pixel_count
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn set_position(&mut self, x: Scalar, y: Scalar) {
        self.position = Point::new(x, y);
    }

    pub fn subsampling(&self) -> (u32, u32) {
        self.subsampling
    }

    pub fn set_subsampling(&mut self, x: u32, y: u32) -> Result<(), RasterizerError> {
        let range = MIN_SUBSAMPLING..=MAX_SUBSAMPLING;
        if !range.contains(&x) || !range.contains(&y) {
            return Err(RasterizerError::InvalidSubsampling);
        }
        self.subsampling = (x, y);
        Ok(())
    }

    pub fn sampling_parameters(&self) -> SamplingParameters {
        self.sampling
    }

    pub fn set_sampling_parameters(
        &mut self,
        units_per_subpixel: u32,
        pixels_per_block: u32,
    ) -> Result<(), RasterizerError> {
        let sampling = SamplingParameters {
            units_per_subpixel,
            pixels_per_block,
        };
        sampling.validate()?;
        self.sampling = sampling;
        Ok(())
    }

    pub fn add_layer(&mut self, layer: LayerDataObject) {
        self.layers.push(layer);
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Rasterize all added layers into `image` and drop them afterwards.
    ///
    /// `image` must be an 8-bit greyscale buffer of the instance size.
    pub fn calculate_image(
        &mut self,
        image: &mut ImageData,
        anti_aliased: bool,
    ) -> Result<(), RasterizerError> {
        if image.pixel_format() != PixelFormat::GreyScale8bit {
            return Err(RasterizerError::PixelFormatMismatch);
        }
        if image.size() != self.pixel_count {
            return Err(RasterizerError::PixelSizeMismatch);
        }
        if self.layers.is_empty() {
            return Err(RasterizerError::RasterizationNotInitialized);
        }

        let (width, height) = self.pixel_count;
        let mut object = ImageObject::new(width, height, self.dpi.0, self.dpi.1)?;
        object.set_position(self.position.x(), self.position.y());
        object.init_rasterization_algorithms(
            self.sampling.units_per_subpixel,
            self.sampling.pixels_per_block,
            self.subsampling.0,
            self.subsampling.1,
        )?;
        for layer in self.layers.iter() {
            object.add_rasterization_layer(layer)?;
        }
        object.calculate_rasterization_image(anti_aliased)?;

        image.bytes_mut().copy_from_slice(object.image().data());
        self.layers.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GeometryType, MM_PER_INCH, assert_approx_eq};

    fn square(x0: Scalar, y0: Scalar, x1: Scalar, y1: Scalar) -> LayerDataObject {
        let mut layer = LayerDataObject::new();
        let points = [
            Point::new(x0, y0),
            Point::new(x1, y0),
            Point::new(x1, y1),
            Point::new(x0, y1),
        ];
        layer
            .add_entity(&points, GeometryType::SolidGeometry)
            .expect("non empty entity");
        layer
    }

    #[test]
    fn test_configuration() -> Result<(), RasterizerError> {
        assert!(matches!(
            RasterizerInstance::new(10, 0, 96.0, 96.0),
            Err(RasterizerError::InvalidPixelCount)
        ));
        assert!(matches!(
            RasterizerInstance::new(10, 10, -1.0, 96.0),
            Err(RasterizerError::InvalidDpiValue)
        ));

        let mut instance = RasterizerInstance::new(508, 254, 254.0, 254.0)?;
        let (size_x, size_y) = instance.size();
        assert_approx_eq!(size_x, 50.8, 1e-9);
        assert_approx_eq!(size_y, 25.4, 1e-9);
        assert_eq!(instance.subsampling(), (1, 1));
        assert_eq!(instance.sampling_parameters(), SamplingParameters::default());

        instance.set_position(1.5, -2.0);
        assert_eq!(instance.position(), Point::new(1.5, -2.0));

        instance.set_subsampling(32, 1)?;
        assert_eq!(instance.subsampling(), (32, 1));
        assert!(matches!(
            instance.set_subsampling(33, 1),
            Err(RasterizerError::InvalidSubsampling)
        ));
        assert!(matches!(
            instance.set_subsampling(1, 0),
            Err(RasterizerError::InvalidSubsampling)
        ));

        instance.set_sampling_parameters(64, 16)?;
        assert_eq!(instance.sampling_parameters().units_per_subpixel, 64);
        assert!(matches!(
            instance.set_sampling_parameters(63, 16),
            Err(RasterizerError::InvalidUnitsPerSubpixel)
        ));
        assert!(matches!(
            instance.set_sampling_parameters(64, 2048),
            Err(RasterizerError::InvalidPixelsPerBlock)
        ));
        assert_eq!(instance.sampling_parameters().pixels_per_block, 16);
        Ok(())
    }

    #[test]
    fn test_calculate_image_validation() -> Result<(), RasterizerError> {
        let mut instance = RasterizerInstance::new(10, 10, 96.0, 96.0)?;
        let mut rgb = ImageData::new(PixelFormat::Rgb24bit, 10, 10)?;
        let mut small = ImageData::new(PixelFormat::GreyScale8bit, 10, 9)?;
        let mut image = ImageData::new(PixelFormat::GreyScale8bit, 10, 10)?;
        assert!(matches!(
            instance.calculate_image(&mut rgb, false),
            Err(RasterizerError::PixelFormatMismatch)
        ));
        assert!(matches!(
            instance.calculate_image(&mut small, false),
            Err(RasterizerError::PixelSizeMismatch)
        ));
        assert!(matches!(
            instance.calculate_image(&mut image, false),
            Err(RasterizerError::RasterizationNotInitialized)
        ));
        Ok(())
    }

    #[test]
    fn test_calculate_image() -> Result<(), RasterizerError> {
        // one pixel per millimeter
        let mut instance = RasterizerInstance::new(12, 8, MM_PER_INCH, MM_PER_INCH)?;
        instance.set_position(10.0, 10.0);
        instance.set_subsampling(4, 4)?;
        instance.set_sampling_parameters(16, 4)?;
        instance.add_layer(square(12.0, 11.0, 15.5, 14.0));
        assert_eq!(instance.layer_count(), 1);

        let mut image = ImageData::new(PixelFormat::GreyScale8bit, 12, 8)?;
        instance.calculate_image(&mut image, true)?;
        assert_eq!(instance.layer_count(), 0);
        assert_eq!(image.rows().nth(2), Some(&[0, 0, 255, 255, 255, 128, 0, 0, 0, 0, 0, 0][..]));
        assert_eq!(image.rows().nth(0), Some(&[0; 12][..]));
        assert_eq!(image.rows().nth(4), Some(&[0; 12][..]));
        Ok(())
    }
}
