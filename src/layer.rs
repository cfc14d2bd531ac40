//! Geometry content of a single slice layer
use crate::{Point, RasterizerError, Scalar};

/// Default size of one integer unit used for polygon clipping, in millimeters
pub const DEFAULT_CALCULATION_UNITS: Scalar = 0.001;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GeometryType {
    /// Closed polygon, last point connects to the first one
    SolidGeometry,
    /// Polyline that is not closed
    OpenPolyline,
    /// Pairs of points, each pair is an independent segment
    OpenHatches,
}

/// One polyline, polygon or hatch set in millimeters
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LayerDataEntity {
    geometry_type: GeometryType,
    points: Vec<Point>,
}

impl LayerDataEntity {
    pub fn new(geometry_type: GeometryType, points: Vec<Point>) -> Self {
        Self {
            geometry_type,
            points,
        }
    }

    pub fn geometry_type(&self) -> GeometryType {
        self.geometry_type
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Line segments making up the entity
    pub fn segments(&self) -> EntitySegments<'_> {
        EntitySegments {
            geometry_type: self.geometry_type,
            points: &self.points,
            index: 0,
        }
    }
}

/// Iterator over segments of an entity, see [`LayerDataEntity::segments`]
pub struct EntitySegments<'a> {
    geometry_type: GeometryType,
    points: &'a [Point],
    index: usize,
}

impl Iterator for EntitySegments<'_> {
    type Item = (Point, Point);

    fn next(&mut self) -> Option<Self::Item> {
        let points = self.points;
        let segment = match self.geometry_type {
            GeometryType::SolidGeometry => {
                if points.len() < 2 || self.index >= points.len() {
                    return None;
                }
                (points[self.index], points[(self.index + 1) % points.len()])
            }
            GeometryType::OpenPolyline => {
                let end = points.get(self.index + 1)?;
                (points[self.index], *end)
            }
            GeometryType::OpenHatches => {
                // dangling last point is ignored
                let end = points.get(2 * self.index + 1)?;
                (points[2 * self.index], *end)
            }
        };
        self.index += 1;
        Some(segment)
    }
}

/// Integer point of the polygon clipping representation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct IntPoint {
    pub x: i64,
    pub y: i64,
}

impl IntPoint {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

pub type ClipPath = Vec<IntPoint>;
pub type ClipPaths = Vec<ClipPath>;

/// Polygon clipping backend operating on integer paths.
///
/// Layer operations that change topology (union, offsetting) are delegated to
/// an implementation of this trait.
pub trait PolygonClipper {
    /// Union of all closed paths using the positive fill rule
    fn union_positive(&mut self, paths: &ClipPaths) -> Result<ClipPaths, RasterizerError>;

    /// Offset closed polygons by `delta` units using round joins
    fn offset_round(&mut self, paths: &ClipPaths, delta: f64)
    -> Result<ClipPaths, RasterizerError>;
}

/// Ordered collection of entities making up one slice layer
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LayerDataObject {
    #[cfg_attr(feature = "serde", serde(default))]
    entities: Vec<LayerDataEntity>,
    #[cfg_attr(feature = "serde", serde(default = "default_calculation_units"))]
    calculation_units: Scalar,
}

#[cfg(feature = "serde")]
fn default_calculation_units() -> Scalar {
    DEFAULT_CALCULATION_UNITS
}

impl Default for LayerDataObject {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerDataObject {
    pub fn new() -> Self {
        Self {
            entities: Vec::new(),
            calculation_units: DEFAULT_CALCULATION_UNITS,
        }
    }

    /// Build solid geometry from clipping paths, scaling each coordinate by `units`
    pub fn from_clip_paths(paths: &ClipPaths, units: Scalar) -> Self {
        let entities = paths
            .iter()
            .map(|path| {
                let points = path
                    .iter()
                    .map(|p| Point::new(p.x as Scalar * units, p.y as Scalar * units))
                    .collect();
                LayerDataEntity::new(GeometryType::SolidGeometry, points)
            })
            .collect();
        Self {
            entities,
            calculation_units: units,
        }
    }

    /// Size of one clipping unit in millimeters
    pub fn calculation_units(&self) -> Scalar {
        self.calculation_units
    }

    pub fn set_calculation_units(&mut self, units: Scalar) -> Result<(), RasterizerError> {
        if !(units.is_finite() && units > 0.0) {
            return Err(RasterizerError::InvalidParam);
        }
        self.calculation_units = units;
        Ok(())
    }

    /// Add new entity, returns its index
    pub fn add_entity(
        &mut self,
        points: &[Point],
        geometry_type: GeometryType,
    ) -> Result<usize, RasterizerError> {
        if points.is_empty() {
            return Err(RasterizerError::InvalidParam);
        }
        self.entities
            .push(LayerDataEntity::new(geometry_type, points.to_vec()));
        Ok(self.entities.len() - 1)
    }

    pub fn entity(&self, index: usize) -> Result<&LayerDataEntity, RasterizerError> {
        self.entities
            .get(index)
            .ok_or(RasterizerError::InvalidEntityIndex(index))
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn entities(&self) -> impl Iterator<Item = &LayerDataEntity> + '_ {
        self.entities.iter()
    }

    /// Append copies of all entities to `other`
    pub fn merge_into(&self, other: &mut LayerDataObject) {
        other.entities.extend(self.entities.iter().cloned());
    }

    /// Convert solid geometry into integer clipping paths.
    ///
    /// Coordinates are divided by `units` and truncated towards zero.
    pub fn create_paths_from_geometry(&self, units: Scalar) -> Result<ClipPaths, RasterizerError> {
        if !(units > 0.0) {
            return Err(RasterizerError::InvalidParam);
        }
        Ok(self
            .entities
            .iter()
            .filter(|entity| entity.geometry_type == GeometryType::SolidGeometry)
            .map(|entity| {
                entity
                    .points
                    .iter()
                    .map(|p| IntPoint::new((p.x() / units) as i64, (p.y() / units) as i64))
                    .collect()
            })
            .collect())
    }

    /// New layer with the union of all solid geometry
    pub fn remove_self_intersections(
        &self,
        clipper: &mut dyn PolygonClipper,
    ) -> Result<LayerDataObject, RasterizerError> {
        let units = self.calculation_units;
        let paths = self.create_paths_from_geometry(units)?;
        let solution = clipper.union_positive(&paths)?;
        Ok(Self::from_clip_paths(&solution, units))
    }

    /// New layer with solid geometry offset by `distance` millimeters,
    /// positive distance shrinks polygons.
    pub fn calculate_offset(
        &self,
        distance: Scalar,
        clipper: &mut dyn PolygonClipper,
    ) -> Result<LayerDataObject, RasterizerError> {
        let units = self.calculation_units;
        let paths = self.create_paths_from_geometry(units)?;
        let solution = clipper.offset_round(&paths, -distance / units)?;
        Ok(Self::from_clip_paths(&solution, units))
    }

    pub fn thicken_polylines(
        &self,
        _thickness: Scalar,
    ) -> Result<LayerDataObject, RasterizerError> {
        Err(RasterizerError::NotImplemented)
    }

    pub fn thicken_hatches(&self, _thickness: Scalar) -> Result<LayerDataObject, RasterizerError> {
        Err(RasterizerError::NotImplemented)
    }

    pub fn distort_layer<F>(
        &self,
        _refinement: Scalar,
        _distortion: F,
    ) -> Result<LayerDataObject, RasterizerError>
    where
        F: FnMut(Point) -> Point,
    {
        Err(RasterizerError::NotImplemented)
    }
}
