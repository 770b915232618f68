//! Binary binding descriptors and the typed little-endian column reader
//!
//! A table value of the form `{"byteOffset": 16, "componentType": "FLOAT", "type": "VEC3"}`
//! points into the table's companion binary block instead of inlining data.
//! Every binding, in either table, is resolved through [`BindingDescriptor::resolve`].

use serde_json::Value;

use crate::error::{B3dmError, B3dmResult};

/// Scalar component encodings a binding may declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
    Byte,
    UnsignedByte,
    Short,
    UnsignedShort,
    Int,
    UnsignedInt,
    Int64,
    UnsignedInt64,
    Float,
    Double,
}

impl ComponentType {
    /// Parse a table tag such as `"UNSIGNED_SHORT"`.
    pub fn from_tag(tag: &str) -> B3dmResult<Self> {
        Ok(match tag {
            "BYTE" => Self::Byte,
            "UNSIGNED_BYTE" => Self::UnsignedByte,
            "SHORT" => Self::Short,
            "UNSIGNED_SHORT" => Self::UnsignedShort,
            "INT" => Self::Int,
            "UNSIGNED_INT" => Self::UnsignedInt,
            "INT64" => Self::Int64,
            "UNSIGNED_INT64" => Self::UnsignedInt64,
            "FLOAT" => Self::Float,
            "DOUBLE" => Self::Double,
            other => return Err(B3dmError::UnknownComponentType(other.to_string())),
        })
    }

    /// Map a glTF accessor `componentType` code (5120..=5126).
    pub fn from_gl_code(code: u64) -> Option<Self> {
        match code {
            5120 => Some(Self::Byte),
            5121 => Some(Self::UnsignedByte),
            5122 => Some(Self::Short),
            5123 => Some(Self::UnsignedShort),
            5124 => Some(Self::Int),
            5125 => Some(Self::UnsignedInt),
            5126 => Some(Self::Float),
            _ => None,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Self::Byte => "BYTE",
            Self::UnsignedByte => "UNSIGNED_BYTE",
            Self::Short => "SHORT",
            Self::UnsignedShort => "UNSIGNED_SHORT",
            Self::Int => "INT",
            Self::UnsignedInt => "UNSIGNED_INT",
            Self::Int64 => "INT64",
            Self::UnsignedInt64 => "UNSIGNED_INT64",
            Self::Float => "FLOAT",
            Self::Double => "DOUBLE",
        }
    }

    /// Size of one component in bytes
    pub fn byte_width(self) -> usize {
        match self {
            Self::Byte | Self::UnsignedByte => 1,
            Self::Short | Self::UnsignedShort => 2,
            Self::Int | Self::UnsignedInt | Self::Float => 4,
            Self::Int64 | Self::UnsignedInt64 | Self::Double => 8,
        }
    }
}

/// Component multiplicity of one element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    Scalar,
    Vec2,
    Vec3,
    Vec4,
}

impl ElementType {
    pub fn from_tag(tag: &str) -> B3dmResult<Self> {
        Ok(match tag {
            "SCALAR" => Self::Scalar,
            "VEC2" => Self::Vec2,
            "VEC3" => Self::Vec3,
            "VEC4" => Self::Vec4,
            other => return Err(B3dmError::UnknownComponentType(format!("element type {other}"))),
        })
    }

    pub fn component_count(self) -> usize {
        match self {
            Self::Scalar => 1,
            Self::Vec2 => 2,
            Self::Vec3 => 3,
            Self::Vec4 => 4,
        }
    }
}

/// A table value bound to a byte range of the companion binary block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindingDescriptor {
    /// Offset relative to the start of the owning binary block
    pub byte_offset: u64,
    pub component_type: ComponentType,
    pub element_type: ElementType,
}

impl BindingDescriptor {
    /// Recognize a binding in a table value.
    ///
    /// Returns `Ok(None)` when the value is a literal. `defaults` supplies the
    /// component and element type for semantics that may omit them.
    pub fn from_json(
        value: &Value,
        defaults: Option<(ComponentType, ElementType)>,
    ) -> B3dmResult<Option<Self>> {
        let Some(object) = value.as_object() else {
            return Ok(None);
        };
        let Some(offset) = object.get("byteOffset") else {
            return Ok(None);
        };
        let byte_offset = offset.as_u64().ok_or_else(|| {
            B3dmError::invalid_table("binding", format!("byteOffset {offset} is not an unsigned integer"))
        })?;

        let component_type = match object.get("componentType") {
            Some(Value::String(tag)) => ComponentType::from_tag(tag)?,
            Some(other) => return Err(B3dmError::UnknownComponentType(other.to_string())),
            None => match defaults {
                Some((component_type, _)) => component_type,
                None => return Err(B3dmError::UnknownComponentType("<missing>".to_string())),
            },
        };

        let element_type = match object.get("type") {
            Some(Value::String(tag)) => ElementType::from_tag(tag)?,
            Some(other) => return Err(B3dmError::UnknownComponentType(format!("element type {other}"))),
            None => defaults.map(|(_, element)| element).unwrap_or(ElementType::Scalar),
        };

        Ok(Some(Self {
            byte_offset,
            component_type,
            element_type,
        }))
    }

    /// Number of bytes covered by `count` elements
    pub fn span_len(&self, count: usize) -> Option<u64> {
        (count as u64)
            .checked_mul(self.element_type.component_count() as u64)?
            .checked_mul(self.component_type.byte_width() as u64)
    }

    /// Read `count` elements from `block`, failing if the span leaves the block.
    pub fn resolve(&self, key: &str, block: &[u8], count: usize) -> B3dmResult<TypedColumn> {
        let available = block.len() as u64;
        let out_of_range = |length: u64| B3dmError::BindingOutOfRange {
            key: key.to_string(),
            offset: self.byte_offset,
            length,
            available,
        };

        let length = self.span_len(count).ok_or_else(|| out_of_range(u64::MAX))?;
        let end = self
            .byte_offset
            .checked_add(length)
            .ok_or_else(|| out_of_range(length))?;
        if end > available {
            return Err(out_of_range(length));
        }

        let bytes = &block[self.byte_offset as usize..end as usize];
        Ok(TypedColumn::read(self.component_type, bytes))
    }
}

/// Decoded components, flat, in the declared component type
#[derive(Debug, Clone, PartialEq)]
pub enum TypedColumn {
    I8(Vec<i8>),
    U8(Vec<u8>),
    I16(Vec<i16>),
    U16(Vec<u16>),
    I32(Vec<i32>),
    U32(Vec<u32>),
    I64(Vec<i64>),
    U64(Vec<u64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

trait LeComponent: Copy {
    const WIDTH: usize;
    fn read_le(bytes: &[u8]) -> Self;
}

macro_rules! impl_le_component {
    ($($t:ty),*) => {
        $(
            impl LeComponent for $t {
                const WIDTH: usize = std::mem::size_of::<$t>();

                fn read_le(bytes: &[u8]) -> Self {
                    let mut buf = [0u8; std::mem::size_of::<$t>()];
                    buf.copy_from_slice(&bytes[..Self::WIDTH]);
                    <$t>::from_le_bytes(buf)
                }
            }
        )*
    };
}

impl_le_component!(i8, u8, i16, u16, i32, u32, i64, u64, f32, f64);

fn read_le_vec<T: LeComponent>(bytes: &[u8]) -> Vec<T> {
    bytes.chunks_exact(T::WIDTH).map(T::read_le).collect()
}

macro_rules! column_map {
    ($column:expr, $values:ident => $body:expr) => {
        match $column {
            TypedColumn::I8($values) => $body,
            TypedColumn::U8($values) => $body,
            TypedColumn::I16($values) => $body,
            TypedColumn::U16($values) => $body,
            TypedColumn::I32($values) => $body,
            TypedColumn::U32($values) => $body,
            TypedColumn::I64($values) => $body,
            TypedColumn::U64($values) => $body,
            TypedColumn::F32($values) => $body,
            TypedColumn::F64($values) => $body,
        }
    };
}

impl TypedColumn {
    /// Decode tightly packed little-endian components. Trailing bytes that do
    /// not form a whole component are ignored.
    pub fn read(component_type: ComponentType, bytes: &[u8]) -> Self {
        match component_type {
            ComponentType::Byte => Self::I8(read_le_vec(bytes)),
            ComponentType::UnsignedByte => Self::U8(read_le_vec(bytes)),
            ComponentType::Short => Self::I16(read_le_vec(bytes)),
            ComponentType::UnsignedShort => Self::U16(read_le_vec(bytes)),
            ComponentType::Int => Self::I32(read_le_vec(bytes)),
            ComponentType::UnsignedInt => Self::U32(read_le_vec(bytes)),
            ComponentType::Int64 => Self::I64(read_le_vec(bytes)),
            ComponentType::UnsignedInt64 => Self::U64(read_le_vec(bytes)),
            ComponentType::Float => Self::F32(read_le_vec(bytes)),
            ComponentType::Double => Self::F64(read_le_vec(bytes)),
        }
    }

    pub fn component_type(&self) -> ComponentType {
        match self {
            Self::I8(_) => ComponentType::Byte,
            Self::U8(_) => ComponentType::UnsignedByte,
            Self::I16(_) => ComponentType::Short,
            Self::U16(_) => ComponentType::UnsignedShort,
            Self::I32(_) => ComponentType::Int,
            Self::U32(_) => ComponentType::UnsignedInt,
            Self::I64(_) => ComponentType::Int64,
            Self::U64(_) => ComponentType::UnsignedInt64,
            Self::F32(_) => ComponentType::Float,
            Self::F64(_) => ComponentType::Double,
        }
    }

    /// Number of components (not elements)
    pub fn len(&self) -> usize {
        column_map!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get_f64(&self, index: usize) -> Option<f64> {
        column_map!(self, v => v.get(index).map(|&x| x as f64))
    }

    pub fn to_f64_vec(&self) -> Vec<f64> {
        column_map!(self, v => v.iter().map(|&x| x as f64).collect())
    }

    pub fn to_f32_vec(&self) -> Vec<f32> {
        column_map!(self, v => v.iter().map(|&x| x as f32).collect())
    }

    /// Normalized-integer conversion as glTF defines it; floats pass through.
    pub fn to_normalized_f32_vec(&self) -> Vec<f32> {
        match self {
            Self::I8(v) => v.iter().map(|&x| (x as f32 / 127.0).max(-1.0)).collect(),
            Self::U8(v) => v.iter().map(|&x| x as f32 / 255.0).collect(),
            Self::I16(v) => v.iter().map(|&x| (x as f32 / 32767.0).max(-1.0)).collect(),
            Self::U16(v) => v.iter().map(|&x| x as f32 / 65535.0).collect(),
            Self::U32(v) => v.iter().map(|&x| x as f32 / u32::MAX as f32).collect(),
            _ => self.to_f32_vec(),
        }
    }

    /// Integer view used for index buffers. `None` for float and signed columns.
    pub fn to_u32_vec(&self) -> Option<Vec<u32>> {
        match self {
            Self::U8(v) => Some(v.iter().map(|&x| x as u32).collect()),
            Self::U16(v) => Some(v.iter().map(|&x| x as u32).collect()),
            Self::U32(v) => Some(v.clone()),
            _ => None,
        }
    }

    /// One JSON value per component.
    pub fn json_component(&self, index: usize) -> Option<Value> {
        Some(match self {
            Self::I8(v) => Value::from(*v.get(index)?),
            Self::U8(v) => Value::from(*v.get(index)?),
            Self::I16(v) => Value::from(*v.get(index)?),
            Self::U16(v) => Value::from(*v.get(index)?),
            Self::I32(v) => Value::from(*v.get(index)?),
            Self::U32(v) => Value::from(*v.get(index)?),
            Self::I64(v) => Value::from(*v.get(index)?),
            Self::U64(v) => Value::from(*v.get(index)?),
            Self::F32(v) => Value::from(*v.get(index)? as f64),
            Self::F64(v) => Value::from(*v.get(index)?),
        })
    }

    /// Element `index` as JSON: a number for scalars, an array for vectors.
    pub fn json_element(&self, index: usize, arity: usize) -> Option<Value> {
        if arity == 1 {
            return self.json_component(index);
        }
        let start = index.checked_mul(arity)?;
        (start..start + arity)
            .map(|i| self.json_component(i))
            .collect::<Option<Vec<_>>>()
            .map(Value::Array)
    }
}
