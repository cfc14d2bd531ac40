//! Greyscale pixel buffer with direct drawing and layer rasterization
use crate::{
    BlockType, GeometryType, GridParameters, Image, ImageMut, ImageOwned, LayerDataEntity,
    LayerDataObject, Point, RasterizationAlgorithm, RasterizerError, Scalar, UnitTransform,
    mm_per_pixel, utils::ArrayIter,
};
#[cfg(feature = "png")]
use std::io::Write;

pub const MIN_SUBSAMPLING: u32 = 1;
pub const MAX_SUBSAMPLING: u32 = 32;

/// State shared by all rasterization layers of an image
#[derive(Debug)]
struct RasterizationSetup {
    params: GridParameters,
    transform: UnitTransform,
    max_units: Point,
    algorithms: Vec<RasterizationAlgorithm>,
}

/// 8-bit greyscale image placed in millimeter space
#[derive(Debug)]
pub struct ImageObject {
    image: ImageOwned<u8>,
    dpi: (Scalar, Scalar),
    position: Point,
    rasterization: Option<RasterizationSetup>,
}

impl ImageObject {
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
            image: ImageOwned::new_default(pixel_count_x as usize, pixel_count_y as usize),
            dpi: (dpi_x, dpi_y),
            position: Point::default(),
            rasterization: None,
        })
    }

    pub fn dpi(&self) -> (Scalar, Scalar) {
        self.dpi
    }

    /// Size in pixels
    pub fn pixel_size(&self) -> (u32, u32) {
        (self.image.width() as u32, self.image.height() as u32)
    }

    /// Size in millimeters
    pub fn size(&self) -> (Scalar, Scalar) {
        (
            self.image.width() as Scalar * mm_per_pixel(self.dpi.0),
            self.image.height() as Scalar * mm_per_pixel(self.dpi.1),
        )
    }

    /// Millimeter position of the top left corner of the image
    pub fn position(&self) -> Point {
        self.position
    }

    pub fn set_position(&mut self, x: Scalar, y: Scalar) {
        self.position = Point::new(x, y);
    }

    /// Pixel data
    pub fn image(&self) -> &ImageOwned<u8> {
        &self.image
    }

    pub fn clear(&mut self, value: u8) {
        self.image.fill(value);
    }

    fn check_x(&self, x: u32) -> Result<(), RasterizerError> {
        if (x as usize) < self.image.width() {
            Ok(())
        } else {
            Err(RasterizerError::InvalidXCoordinate)
        }
    }

    fn check_y(&self, y: u32) -> Result<(), RasterizerError> {
        if (y as usize) < self.image.height() {
            Ok(())
        } else {
            Err(RasterizerError::InvalidYCoordinate)
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Result<u8, RasterizerError> {
        self.check_x(x)?;
        self.check_y(y)?;
        self.image
            .get(y as usize, x as usize)
            .copied()
            .ok_or(RasterizerError::InvalidYCoordinate)
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, value: u8) -> Result<(), RasterizerError> {
        self.check_x(x)?;
        self.check_y(y)?;
        let pixel = self
            .image
            .get_mut(y as usize, x as usize)
            .ok_or(RasterizerError::InvalidYCoordinate)?;
        *pixel = value;
        Ok(())
    }

    fn check_range(
        &self,
        x_min: u32,
        y_min: u32,
        x_max: u32,
        y_max: u32,
    ) -> Result<usize, RasterizerError> {
        self.check_x(x_min)?;
        self.check_y(y_min)?;
        self.check_x(x_max)?;
        self.check_y(y_max)?;
        if x_min > x_max {
            return Err(RasterizerError::InvalidXCoordinateRange);
        }
        if y_min > y_max {
            return Err(RasterizerError::InvalidYCoordinateRange);
        }
        Ok((x_max - x_min + 1) as usize * (y_max - y_min + 1) as usize)
    }

    /// Copy of the inclusive pixel rectangle in row-major order
    pub fn pixel_range(
        &self,
        x_min: u32,
        y_min: u32,
        x_max: u32,
        y_max: u32,
    ) -> Result<Vec<u8>, RasterizerError> {
        let count = self.check_range(x_min, y_min, x_max, y_max)?;
        let mut result = Vec::with_capacity(count);
        for row in self
            .image
            .rows()
            .skip(y_min as usize)
            .take((y_max - y_min + 1) as usize)
        {
            result.extend_from_slice(&row[x_min as usize..=x_max as usize]);
        }
        Ok(result)
    }

    /// Overwrite the inclusive pixel rectangle, `data` must match its size exactly
    pub fn set_pixel_range(
        &mut self,
        x_min: u32,
        y_min: u32,
        x_max: u32,
        y_max: u32,
        data: &[u8],
    ) -> Result<(), RasterizerError> {
        let count = self.check_range(x_min, y_min, x_max, y_max)?;
        if data.len() != count {
            return Err(RasterizerError::InvalidPixelDataCount);
        }
        let shape = self.image.shape();
        let row_len = (x_max - x_min + 1) as usize;
        let pixels = self.image.data_mut();
        for (index, src) in data.chunks(row_len).enumerate() {
            let offset = shape.offset(y_min as usize + index, x_min as usize);
            pixels[offset..offset + row_len].copy_from_slice(src);
        }
        Ok(())
    }

    /// Write image as 8-bit greyscale PNG
    #[cfg(feature = "png")]
    pub fn write_png(&self, writer: impl Write) -> Result<(), RasterizerError> {
        let (width, height) = self.pixel_size();
        let mut encoder = png::Encoder::new(writer, width, height);
        encoder.set_color(png::ColorType::Grayscale);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(self.image.data())?;
        writer.finish()?;
        Ok(())
    }

    /// Encode image as 8-bit greyscale PNG
    #[cfg(feature = "png")]
    pub fn encode_png(&self) -> Result<Vec<u8>, RasterizerError> {
        let mut data = Vec::new();
        self.write_png(&mut data)?;
        Ok(data)
    }

    /// Draw outlines of all entities of the layer
    pub fn draw_layer_object(&mut self, layer: &LayerDataObject, value: u8) {
        for entity in layer.entities() {
            self.draw_layer_entity(entity, value);
        }
    }

    /// Draw outline of the entity
    pub fn draw_layer_entity(&mut self, entity: &LayerDataEntity, value: u8) {
        for (start, end) in entity.segments() {
            self.draw_line(start.x(), start.y(), end.x(), end.y(), value);
        }
    }

    fn to_pixel(&self, x: Scalar, y: Scalar) -> (i64, i64) {
        (
            ((x - self.position.x()) / mm_per_pixel(self.dpi.0)).round() as i64,
            ((y - self.position.y()) / mm_per_pixel(self.dpi.1)).round() as i64,
        )
    }

    /// Draw line given in millimeters with Bresenham's algorithm, pixels
    /// outside of the image are skipped.
    pub fn draw_line(&mut self, x1: Scalar, y1: Scalar, x2: Scalar, y2: Scalar, value: u8) {
        let (mut x, mut y) = self.to_pixel(x1, y1);
        let (x_end, y_end) = self.to_pixel(x2, y2);
        let (width, height) = (self.image.width() as i64, self.image.height() as i64);
        if (x < 0 && x_end < 0)
            || (y < 0 && y_end < 0)
            || (x >= width && x_end >= width)
            || (y >= height && y_end >= height)
        {
            return;
        }

        let dx = (x_end - x).abs();
        let dy = -(y_end - y).abs();
        let step_x = if x < x_end { 1 } else { -1 };
        let step_y = if y < y_end { 1 } else { -1 };
        let mut error = dx + dy;
        let shape = self.image.shape();
        let pixels = self.image.data_mut();
        loop {
            if (0..width).contains(&x) && (0..height).contains(&y) {
                pixels[shape.offset(y as usize, x as usize)] = value;
            }
            if x == x_end && y == y_end {
                break;
            }
            let error2 = 2 * error;
            if error2 >= dy {
                error += dy;
                x += step_x;
            }
            if error2 <= dx {
                error += dx;
                y += step_y;
            }
        }
    }

    /// Set up the block grid shared by all rasterization layers.
    ///
    /// The grid covers the whole image, its position is fixed at the time of
    /// the call.
    pub fn init_rasterization_algorithms(
        &mut self,
        units_per_subpixel: u32,
        pixels_per_block: u32,
        subsampling_x: u32,
        subsampling_y: u32,
    ) -> Result<(), RasterizerError> {
        let subsampling = MIN_SUBSAMPLING..=MAX_SUBSAMPLING;
        if !subsampling.contains(&subsampling_x) || !subsampling.contains(&subsampling_y) {
            return Err(RasterizerError::InvalidSubsampling);
        }
        if pixels_per_block == 0 {
            return Err(RasterizerError::InvalidPixelsPerBlock);
        }
        let (width, height) = self.pixel_size();
        let params = GridParameters {
            units_per_subpixel,
            subpixels_per_pixel_x: subsampling_x,
            subpixels_per_pixel_y: subsampling_y,
            pixels_per_block,
            block_count_x: width.div_ceil(pixels_per_block),
            block_count_y: height.div_ceil(pixels_per_block),
        };
        params.validate()?;

        let (total_x, total_y) = params.total_size_in_units();
        let max_units = Point::new((total_x - 1) as Scalar, (total_y - 1) as Scalar);
        let transform = UnitTransform::new(
            self.position,
            self.dpi,
            (params.units_per_pixel_x(), params.units_per_pixel_y()),
        );
        tracing::debug!(
            "[init_rasterization_algorithms] blocks: {}x{}",
            params.block_count_x,
            params.block_count_y
        );
        self.rasterization = Some(RasterizationSetup {
            params,
            transform,
            max_units,
            algorithms: Vec::new(),
        });
        Ok(())
    }

    /// Convert solid geometry of the layer into a new rasterization algorithm.
    ///
    /// Open polylines and hatches do not enclose any area and are skipped.
    pub fn add_rasterization_layer(
        &mut self,
        layer: &LayerDataObject,
    ) -> Result<(), RasterizerError> {
        let setup = self
            .rasterization
            .as_mut()
            .ok_or(RasterizerError::RasterizationNotInitialized)?;
        let _span = tracing::debug_span!(
            "[add_rasterization_layer]",
            layer = setup.algorithms.len(),
            entities = layer.entity_count()
        )
        .entered();

        let solid = || {
            layer
                .entities()
                .filter(|entity| entity.geometry_type() == GeometryType::SolidGeometry)
        };
        let expected_lines: usize = solid().map(|entity| entity.points().len()).sum();
        let mut algorithm = RasterizationAlgorithm::new(setup.params, expected_lines)?;

        let Point([max_x, max_y]) = setup.max_units;
        let quantize = |value: Scalar, max: Scalar| value.round().clamp(0.0, max) as i32;
        for (index, entity) in solid().enumerate() {
            for (start, end) in entity.segments() {
                let start = setup.transform.apply(start);
                let end = setup.transform.apply(end);
                if !(start.x().is_finite()
                    && start.y().is_finite()
                    && end.x().is_finite()
                    && end.y().is_finite())
                {
                    return Err(RasterizerError::InvalidParam);
                }
                for (p0, p1) in clip_segment(start, end, setup.max_units) {
                    algorithm.add_line(
                        quantize(p0.x(), max_x),
                        quantize(p0.y(), max_y),
                        quantize(p1.x(), max_x),
                        quantize(p1.y(), max_y),
                        index as i32,
                    )?;
                }
            }
        }

        algorithm.build_blocks();
        algorithm.build_all_block_scan_lines()?;
        setup.algorithms.push(algorithm);
        Ok(())
    }

    /// Composite all rasterization layers into the pixel buffer.
    ///
    /// Pixel value is the share of inside samples over all layers, either
    /// scaled to `0..=255` or thresholded at one half. Rasterization state is
    /// consumed, a new image requires another initialization.
    pub fn calculate_rasterization_image(
        &mut self,
        anti_aliased: bool,
    ) -> Result<(), RasterizerError> {
        match &self.rasterization {
            Some(setup) if !setup.algorithms.is_empty() => {}
            _ => return Err(RasterizerError::RasterizationNotInitialized),
        }
        let Some(setup) = self.rasterization.take() else {
            return Err(RasterizerError::RasterizationNotInitialized);
        };
        let _span = tracing::debug_span!(
            "[calculate_rasterization_image]",
            layers = setup.algorithms.len(),
            anti_aliased
        )
        .entered();

        let params = setup.params;
        let pixels_per_block = params.pixels_per_block as usize;
        let full = setup.algorithms.len() as u64 * params.samples_per_pixel() as u64;
        let value = |total: u32| -> u8 {
            let total = total as u64;
            if anti_aliased {
                ((255 * total + full / 2) / full) as u8
            } else if 2 * total >= full {
                255
            } else {
                0
            }
        };

        let shape = self.image.shape();
        let pixels = self.image.data_mut();
        let mut buffer = vec![0u32; pixels_per_block * pixels_per_block];
        let mut border_blocks = 0usize;
        for block_y in 0..params.block_count_y {
            for block_x in 0..params.block_count_x {
                buffer.fill(0);
                for algorithm in setup.algorithms.iter() {
                    if algorithm.block_info(block_x as i32, block_y as i32)
                        == BlockType::Border
                    {
                        border_blocks += 1;
                    }
                    algorithm.add_block_to_buffer(block_x, block_y, &mut buffer)?;
                }

                let origin_x = block_x as usize * pixels_per_block;
                let origin_y = block_y as usize * pixels_per_block;
                for (index, total) in buffer.iter().enumerate() {
                    let x = origin_x + index % pixels_per_block;
                    let y = origin_y + index / pixels_per_block;
                    if x < shape.width && y < shape.height {
                        pixels[shape.offset(y, x)] = value(*total);
                    }
                }
            }
        }
        tracing::debug!("[calculate_rasterization_image] border blocks: {}", border_blocks);
        Ok(())
    }
}

/// Clip segment given in units to `[0, max.x] x [0, max.y]`.
///
/// Parts above or below the area and parts to the right of it can not change
/// the winding of any sample and are dropped. Parts to the left are projected
/// onto `x = 0` so they still contribute their winding.
fn clip_segment(
    start: Point,
    end: Point,
    max: Point,
) -> ArrayIter<[Option<(Point, Point)>; 3]> {
    let mut result = ArrayIter::new();
    let Point([max_x, max_y]) = max;

    let (mut t0, mut t1): (Scalar, Scalar) = (0.0, 1.0);
    let dy = end.y() - start.y();
    if dy == 0.0 {
        if start.y() < 0.0 || start.y() > max_y {
            return result;
        }
    } else {
        let ta = -start.y() / dy;
        let tb = (max_y - start.y()) / dy;
        t0 = t0.max(ta.min(tb));
        t1 = t1.min(ta.max(tb));
        if t0 >= t1 {
            return result;
        }
    }
    let lerp = |p0: Point, p1: Point, t: Scalar| p0 + t * (p1 - p0);
    let (start, end) = (lerp(start, end, t0), lerp(start, end, t1));

    let mut params = [0.0; 4];
    let mut count = 1;
    let dx = end.x() - start.x();
    if dx != 0.0 {
        for border in [0.0, max_x] {
            let t = (border - start.x()) / dx;
            if t > 0.0 && t < 1.0 {
                params[count] = t;
                count += 1;
            }
        }
    }
    params[count] = 1.0;
    count += 1;
    params[..count].sort_by(|a, b| a.total_cmp(b));

    for pair in params[..count].windows(2) {
        let (p0, p1) = (lerp(start, end, pair[0]), lerp(start, end, pair[1]));
        let mid_x = (p0.x() + p1.x()) / 2.0;
        if mid_x < 0.0 {
            result.push((Point::new(0.0, p0.y()), Point::new(0.0, p1.y())));
        } else if mid_x <= max_x {
            result.push((p0, p1));
        }
    }
    result
}
