use crate::{LayerDataObject, RasterizerError, Scalar};

/// Fixed number of equally thick layers stacked on top of `bottom_z`
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SliceStack {
    layer_thickness: Scalar,
    bottom_z: Scalar,
    layers: Vec<LayerDataObject>,
}

impl SliceStack {
    pub fn new(
        layer_count: u32,
        layer_thickness: Scalar,
        bottom_z: Scalar,
    ) -> Result<Self, RasterizerError> {
        if layer_count == 0 {
            return Err(RasterizerError::InvalidLayerCount);
        }
        if !(layer_thickness.is_finite() && layer_thickness > 0.0) {
            return Err(RasterizerError::InvalidLayerThickness);
        }
        if !bottom_z.is_finite() {
            return Err(RasterizerError::InvalidParam);
        }
        Ok(Self {
            layer_thickness,
            bottom_z,
            layers: vec![LayerDataObject::new(); layer_count as usize],
        })
    }

    pub fn layer_count(&self) -> u32 {
        self.layers.len() as u32
    }

    pub fn layer_thickness(&self) -> Scalar {
        self.layer_thickness
    }

    pub fn bottom_z(&self) -> Scalar {
        self.bottom_z
    }

    pub fn top_z(&self) -> Scalar {
        self.bottom_z + self.layers.len() as Scalar * self.layer_thickness
    }

    /// Z coordinate of the top of layer `index`
    pub fn layer_z(&self, index: u32) -> Result<Scalar, RasterizerError> {
        self.check_index(index)?;
        Ok(self.bottom_z + (index as Scalar + 1.0) * self.layer_thickness)
    }

    pub fn layer(&self, index: u32) -> Result<&LayerDataObject, RasterizerError> {
        self.check_index(index)?;
        Ok(&self.layers[index as usize])
    }

    pub fn layer_mut(&mut self, index: u32) -> Result<&mut LayerDataObject, RasterizerError> {
        self.check_index(index)?;
        Ok(&mut self.layers[index as usize])
    }

    fn check_index(&self, index: u32) -> Result<(), RasterizerError> {
        if (index as usize) < self.layers.len() {
            Ok(())
        } else {
            Err(RasterizerError::InvalidLayerIndex(index as usize))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GeometryType, Point, assert_approx_eq};

    #[test]
    fn test_slice_stack() -> Result<(), RasterizerError> {
        let mut stack = SliceStack::new(4, 0.05, 1.0)?;
        assert_eq!(stack.layer_count(), 4);
        assert_approx_eq!(stack.layer_z(0)?, 1.05, 1e-12);
        assert_approx_eq!(stack.layer_z(3)?, 1.2, 1e-12);
        assert_approx_eq!(stack.top_z(), 1.2, 1e-12);
        assert!(matches!(
            stack.layer(4),
            Err(RasterizerError::InvalidLayerIndex(4))
        ));

        stack
            .layer_mut(2)?
            .add_entity(&[Point::new(0.0, 0.0)], GeometryType::OpenPolyline)?;
        assert_eq!(stack.layer(2)?.entity_count(), 1);
        assert_eq!(stack.layer(1)?.entity_count(), 0);
        Ok(())
    }

    #[test]
    fn test_invalid_stack() {
        assert!(matches!(
            SliceStack::new(0, 0.05, 0.0),
            Err(RasterizerError::InvalidLayerCount)
        ));
        assert!(matches!(
            SliceStack::new(1, 0.0, 0.0),
            Err(RasterizerError::InvalidLayerThickness)
        ));
        assert!(matches!(
            SliceStack::new(1, Scalar::NAN, 0.0),
            Err(RasterizerError::InvalidLayerThickness)
        ));
    }
}
