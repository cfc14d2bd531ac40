//! Block based scan-line rasterizer for sliced layer geometry.
//!
//! Main features:
//!  - Layer data model (polygons, polylines, hatches) and slice stacks
//!  - Fixed-point block rasterization with nonzero fill rule
//!  - Binary and anti-aliased greyscale images with multiple stacked layers
//!  - Driver facade with a registry of named rasterizer instances
//!
#![deny(warnings)]

mod driver;
mod error;
mod fixed;
mod geometry;
mod image;
mod image_object;
mod layer;
mod rasterize;
mod rasterizer;
mod slice_stack;
mod utils;

pub use driver::{DRIVER_TYPE, DriverEnvironment, DriverRasterizer, DriverVersion, ParameterValue};
pub use error::RasterizerError;
pub use fixed::{
    calculate_x_scan_line_cross_point, calculate_y_block_border_cross_point, int_floor_div,
    int_floor_div64,
};
pub use geometry::{EPSILON, MM_PER_INCH, Point, Scalar, UnitTransform, mm_per_pixel, scalar_fmt};
pub use image::{Image, ImageData, ImageMut, ImageOwned, PixelFormat, Shape};
pub use image_object::{ImageObject, MAX_SUBSAMPLING, MIN_SUBSAMPLING};
pub use layer::{
    ClipPath, ClipPaths, DEFAULT_CALCULATION_UNITS, EntitySegments, GeometryType, IntPoint,
    LayerDataEntity, LayerDataObject, PolygonClipper,
};
pub use rasterize::{
    BlockType, DEFAULT_PIXELS_PER_BLOCK, DEFAULT_UNITS_PER_SUBPIXEL, GridParameters,
    MAX_BLOCK_COUNT, MAX_COORDINATE, MAX_LINE_COUNT, MAX_PIXELS_PER_BLOCK,
    MAX_SUBPIXELS_PER_PIXEL, MAX_UNITS_PER_SUBPIXEL, MIN_BLOCK_COUNT, MIN_PIXELS_PER_BLOCK,
    MIN_SUBPIXELS_PER_PIXEL, MIN_UNITS_PER_SUBPIXEL, RasterLine, RasterizationAlgorithm,
};
pub use rasterizer::{RasterizerInstance, SamplingParameters};
pub use slice_stack::SliceStack;
