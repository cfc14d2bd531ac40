use std::fmt;

/// Error reported by the rasterizer and its driver facade
#[derive(Debug)]
pub enum RasterizerError {
    /// Generic invalid parameter
    InvalidParam,
    /// Pixel count must be positive
    InvalidPixelCount,
    /// DPI value must be positive
    InvalidDpiValue,
    /// Subsampling is outside of `[1, 32]`
    InvalidSubsampling,
    /// Units per subpixel must be even and within `[4, 1048576]`
    InvalidUnitsPerSubpixel,
    /// Subpixels per pixel is outside of `[1, 32]`
    InvalidSubpixelsPerPixel,
    /// Pixels per block is outside of `[4, 1024]`
    InvalidPixelsPerBlock,
    /// Block count is outside of `[1, 1048576]`
    InvalidBlockCount,
    /// Block index does not address a block of the grid
    InvalidBlockIndex,
    /// Line coordinate or size of the block grid exceeds the hard coordinate ceiling
    LineCoordinateOverflow,
    /// Layer contains more lines than supported
    TooManyLinesInLayer,
    /// Block scan lines must be built column by column from left to right
    BlockScanOrder,
    /// Buffer does not have the expected size
    InvalidBufferSize,
    /// Target image is not an 8-bit greyscale image
    PixelFormatMismatch,
    /// Target image size does not match the rasterizer size
    PixelSizeMismatch,
    /// Rasterization grid was not initialized or no layer has been added
    RasterizationNotInitialized,
    /// Operation is not implemented
    NotImplemented,
    /// Empty identifier
    InvalidIdentifier,
    /// Identifier is already in use
    IdentifierAlreadyRegistered(String),
    /// Identifier is unknown
    IdentifierNotRegistered(String),
    /// X coordinate outside of the image
    InvalidXCoordinate,
    /// Y coordinate outside of the image
    InvalidYCoordinate,
    /// Minimum X is larger than maximum X
    InvalidXCoordinateRange,
    /// Minimum Y is larger than maximum Y
    InvalidYCoordinateRange,
    /// Pixel data does not match the size of the pixel range
    InvalidPixelDataCount,
    /// Entity index out of range
    InvalidEntityIndex(usize),
    /// Layer index out of range
    InvalidLayerIndex(usize),
    /// Slice stack requires at least one layer
    InvalidLayerCount,
    /// Layer thickness must be positive
    InvalidLayerThickness,
    /// Failure reported by the hosting driver environment
    Environment(String),
    /// PNG encoder failure
    #[cfg(feature = "png")]
    PngEncoding(png::EncodingError),
    /// IO error propagated while writing output
    IoError(std::io::Error),
}

impl fmt::Display for RasterizerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use RasterizerError::*;
        match self {
            IdentifierAlreadyRegistered(id) => write!(f, "identifier already registered: {id}"),
            IdentifierNotRegistered(id) => write!(f, "identifier not registered: {id}"),
            InvalidEntityIndex(index) => write!(f, "invalid entity index: {index}"),
            InvalidLayerIndex(index) => write!(f, "invalid layer index: {index}"),
            Environment(reason) => write!(f, "driver environment: {reason}"),
            #[cfg(feature = "png")]
            PngEncoding(error) => write!(f, "png encoding: {error}"),
            IoError(error) => write!(f, "io: {error}"),
            _ => write!(f, "Rasterizer::{:?}", self),
        }
    }
}

impl From<std::io::Error> for RasterizerError {
    fn from(error: std::io::Error) -> Self {
        Self::IoError(error)
    }
}

#[cfg(feature = "png")]
impl From<png::EncodingError> for RasterizerError {
    fn from(error: png::EncodingError) -> Self {
        Self::PngEncoding(error)
    }
}

impl std::error::Error for RasterizerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::IoError(error) => Some(error),
            #[cfg(feature = "png")]
            Self::PngEncoding(error) => Some(error),
            _ => None,
        }
    }
}
