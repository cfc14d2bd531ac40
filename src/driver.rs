//! Driver facade exposing the rasterizer to a hosting runtime
use crate::{LayerDataObject, RasterizerError, RasterizerInstance, Scalar, SliceStack};
use std::{collections::BTreeMap, fmt, path::PathBuf};

pub const DRIVER_TYPE: &str = "rasterizer";

/// Value of a parameter published to the hosting runtime
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    Float32(f32),
    Float64(f64),
    String(String),
}

impl ParameterValue {
    pub fn type_name(&self) -> &'static str {
        use ParameterValue::*;
        match self {
            Bool(_) => "bool",
            Int8(_) => "int8",
            Int16(_) => "int16",
            Int32(_) => "int32",
            UInt8(_) => "uint8",
            UInt16(_) => "uint16",
            UInt32(_) => "uint32",
            Float32(_) => "float32",
            Float64(_) => "float64",
            String(_) => "string",
        }
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use ParameterValue::*;
        match self {
            Bool(value) => write!(f, "{}", value),
            Int8(value) => write!(f, "{}", value),
            Int16(value) => write!(f, "{}", value),
            Int32(value) => write!(f, "{}", value),
            UInt8(value) => write!(f, "{}", value),
            UInt16(value) => write!(f, "{}", value),
            UInt32(value) => write!(f, "{}", value),
            Float32(value) => write!(f, "{}", value),
            Float64(value) => write!(f, "{}", value),
            String(value) => write!(f, "{}", value),
        }
    }
}

macro_rules! impl_parameter_from(
    ($($type:ty => $variant:ident),+) => {
        $(
            impl From<$type> for ParameterValue {
                fn from(value: $type) -> Self {
                    ParameterValue::$variant(value.into())
                }
            }
        )+
    }
);

impl_parameter_from!(
    bool => Bool,
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    f32 => Float32,
    f64 => Float64,
    String => String,
    &str => String
);

/// Services provided by the hosting runtime
pub trait DriverEnvironment {
    /// Content of a named resource
    fn retrieve_resource(&self, name: &str) -> Result<Vec<u8>, RasterizerError>;

    /// Create a new temporary working directory
    fn create_working_directory(&mut self) -> Result<PathBuf, RasterizerError>;

    /// Publish or update a parameter
    fn register_parameter(
        &mut self,
        name: &str,
        description: &str,
        value: ParameterValue,
    ) -> Result<(), RasterizerError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverVersion {
    pub major: u32,
    pub minor: u32,
    pub micro: u32,
    pub build: String,
}

impl fmt::Display for DriverVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}+{}", self.major, self.minor, self.micro, self.build)
    }
}

/// Registry of rasterizer instances addressed by string identifiers
pub struct DriverRasterizer<E> {
    name: String,
    environment: E,
    instances: BTreeMap<String, RasterizerInstance>,
}

impl<E: DriverEnvironment> DriverRasterizer<E> {
    pub fn new(name: impl Into<String>, environment: E) -> Self {
        Self {
            name: name.into(),
            environment,
            instances: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn driver_type(&self) -> &'static str {
        DRIVER_TYPE
    }

    pub fn version(&self) -> DriverVersion {
        DriverVersion {
            major: env!("CARGO_PKG_VERSION_MAJOR").parse().unwrap_or(0),
            minor: env!("CARGO_PKG_VERSION_MINOR").parse().unwrap_or(0),
            micro: env!("CARGO_PKG_VERSION_PATCH").parse().unwrap_or(0),
            build: option_env!("LAYER_RASTERIZER_BUILD")
                .unwrap_or(env!("CARGO_PKG_NAME"))
                .to_string(),
        }
    }

    pub fn environment(&self) -> &E {
        &self.environment
    }

    pub fn environment_mut(&mut self) -> &mut E {
        &mut self.environment
    }

    /// Publish driver state through the environment
    pub fn query_parameters(&mut self) -> Result<(), RasterizerError> {
        let count = self.instances.len() as u32;
        self.environment.register_parameter(
            "instance_count",
            "Number of registered rasterizer instances",
            count.into(),
        )
    }

    pub fn create_slice_stack(
        &self,
        layer_count: u32,
        layer_thickness: Scalar,
        bottom_z: Scalar,
    ) -> Result<SliceStack, RasterizerError> {
        SliceStack::new(layer_count, layer_thickness, bottom_z)
    }

    pub fn create_empty_layer(&self) -> LayerDataObject {
        LayerDataObject::new()
    }

    /// Load layer stored as JSON resource of the environment
    #[cfg(feature = "serde")]
    pub fn load_layer(&self, resource: &str) -> Result<LayerDataObject, RasterizerError> {
        let data = self.environment.retrieve_resource(resource)?;
        serde_json::from_slice(&data)
            .map_err(|error| RasterizerError::Environment(format!("{resource}: {error}")))
    }

    fn check_identifier(identifier: &str) -> Result<(), RasterizerError> {
        if identifier.is_empty() {
            Err(RasterizerError::InvalidIdentifier)
        } else {
            Ok(())
        }
    }

    pub fn register_instance(
        &mut self,
        identifier: &str,
        pixel_size_x: u32,
        pixel_size_y: u32,
        dpi_x: Scalar,
        dpi_y: Scalar,
    ) -> Result<&mut RasterizerInstance, RasterizerError> {
        Self::check_identifier(identifier)?;
        if self.instances.contains_key(identifier) {
            return Err(RasterizerError::IdentifierAlreadyRegistered(
                identifier.to_string(),
            ));
        }
        let instance = RasterizerInstance::new(pixel_size_x, pixel_size_y, dpi_x, dpi_y)?;
        tracing::info!(
            "[register_instance] {}: {}x{} pixels",
            identifier,
            pixel_size_x,
            pixel_size_y
        );
        Ok(self
            .instances
            .entry(identifier.to_string())
            .or_insert(instance))
    }

    pub fn unregister_instance(&mut self, identifier: &str) -> Result<(), RasterizerError> {
        Self::check_identifier(identifier)?;
        match self.instances.remove(identifier) {
            Some(_) => {
                tracing::info!("[unregister_instance] {}", identifier);
                Ok(())
            }
            None => Err(RasterizerError::IdentifierNotRegistered(
                identifier.to_string(),
            )),
        }
    }

    pub fn get_instance(
        &mut self,
        identifier: &str,
    ) -> Result<&mut RasterizerInstance, RasterizerError> {
        Self::check_identifier(identifier)?;
        self.instances
            .get_mut(identifier)
            .ok_or_else(|| RasterizerError::IdentifierNotRegistered(identifier.to_string()))
    }

    pub fn has_instance(&self, identifier: &str) -> Result<bool, RasterizerError> {
        Self::check_identifier(identifier)?;
        Ok(self.instances.contains_key(identifier))
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }
}
