use std::fmt;

use crate::error::{Error, Result};

use super::{DateTime, Guid, LocalizedText, NodeId, QualifiedName, StatusCode};

/// Default cap (§4.1) on the length of a single `String`/`ByteString`/`XmlElement` scalar when
/// encoding to transport form.
pub const DEFAULT_ENCODING_LIMIT: usize = 16 * 1024 * 1024;

/// Discriminant of a [`Scalar`], used for type queries and the widening conversion matrix.
///
/// This is deliberately a plain enum rather than a raw numeric tag stored alongside the payload:
/// the discriminant always comes from (and only from) the [`Scalar`] value itself, so tag and
/// payload can never drift apart (§9, "tag-discriminated void* payloads").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScalarType {
    Boolean,
    SByte,
    Byte,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float,
    Double,
    String,
    DateTime,
    Guid,
    ByteString,
    XmlElement,
    NodeId,
    QualifiedName,
    LocalizedText,
    StatusCode,
}

/// A single value of one of the OPC UA built-in types (§3).
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Scalar {
    Boolean(bool),
    SByte(i8),
    Byte(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Float(f32),
    Double(f64),
    String(String),
    DateTime(DateTime),
    Guid(Guid),
    ByteString(Vec<u8>),
    XmlElement(String),
    NodeId(NodeId),
    QualifiedName(QualifiedName),
    LocalizedText(LocalizedText),
    StatusCode(StatusCode),
}

impl Scalar {
    #[must_use]
    pub const fn scalar_type(&self) -> ScalarType {
        match self {
            Self::Boolean(_) => ScalarType::Boolean,
            Self::SByte(_) => ScalarType::SByte,
            Self::Byte(_) => ScalarType::Byte,
            Self::Int16(_) => ScalarType::Int16,
            Self::UInt16(_) => ScalarType::UInt16,
            Self::Int32(_) => ScalarType::Int32,
            Self::UInt32(_) => ScalarType::UInt32,
            Self::Int64(_) => ScalarType::Int64,
            Self::UInt64(_) => ScalarType::UInt64,
            Self::Float(_) => ScalarType::Float,
            Self::Double(_) => ScalarType::Double,
            Self::String(_) => ScalarType::String,
            Self::DateTime(_) => ScalarType::DateTime,
            Self::Guid(_) => ScalarType::Guid,
            Self::ByteString(_) => ScalarType::ByteString,
            Self::XmlElement(_) => ScalarType::XmlElement,
            Self::NodeId(_) => ScalarType::NodeId,
            Self::QualifiedName(_) => ScalarType::QualifiedName,
            Self::LocalizedText(_) => ScalarType::LocalizedText,
            Self::StatusCode(_) => ScalarType::StatusCode,
        }
    }

    /// Encoding-form byte length of `String`/`ByteString`/`XmlElement` scalars; other types are
    /// considered fixed-size and always pass the check in [`Self::check_encoding_limit`].
    fn encoded_len(&self) -> Option<usize> {
        match self {
            Self::String(value) | Self::XmlElement(value) => Some(value.len()),
            Self::ByteString(value) => Some(value.len()),
            _ => None,
        }
    }

    /// Fails with `BadEncodingLimitsExceeded` if this scalar's encoded length exceeds `max_bytes`.
    pub fn check_encoding_limit(&self, max_bytes: usize) -> Result<()> {
        match self.encoded_len() {
            Some(len) if len > max_bytes => {
                Err(Error::StatusCode(StatusCode::BAD_ENCODING_LIMITS_EXCEEDED))
            }
            _ => Ok(()),
        }
    }

    fn as_i128(&self) -> Option<i128> {
        match *self {
            Self::SByte(value) => Some(i128::from(value)),
            Self::Byte(value) => Some(i128::from(value)),
            Self::Int16(value) => Some(i128::from(value)),
            Self::UInt16(value) => Some(i128::from(value)),
            Self::Int32(value) => Some(i128::from(value)),
            Self::UInt32(value) => Some(i128::from(value)),
            Self::Int64(value) => Some(i128::from(value)),
            Self::UInt64(value) => Some(i128::from(value)),
            _ => None,
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::Float(value) => Some(f64::from(value)),
            Self::Double(value) => Some(value),
            _ => self.as_i128().map(|value| value as f64),
        }
    }

    fn from_i128(target: ScalarType, value: i128) -> Option<Self> {
        match target {
            ScalarType::SByte => i8::try_from(value).ok().map(Self::SByte),
            ScalarType::Byte => u8::try_from(value).ok().map(Self::Byte),
            ScalarType::Int16 => i16::try_from(value).ok().map(Self::Int16),
            ScalarType::UInt16 => u16::try_from(value).ok().map(Self::UInt16),
            ScalarType::Int32 => i32::try_from(value).ok().map(Self::Int32),
            ScalarType::UInt32 => u32::try_from(value).ok().map(Self::UInt32),
            ScalarType::Int64 => i64::try_from(value).ok().map(Self::Int64),
            ScalarType::UInt64 => u64::try_from(value).ok().map(Self::UInt64),
            ScalarType::Float => Some(Self::Float(value as f32)),
            ScalarType::Double => Some(Self::Double(value as f64)),
            _ => None,
        }
    }

    /// Widens this scalar to `target`, following the OPC UA built-in numeric conversion matrix
    /// (§4.1): lossless widening between integer types always succeeds; narrowing and
    /// float-to-integer truncation succeed only if the truncated value fits in `target`'s range.
    /// Non-numeric types only "widen" to their own type.
    pub fn widen_to(&self, target: ScalarType) -> Result<Self> {
        if self.scalar_type() == target {
            return Ok(self.clone());
        }

        let is_float_target = matches!(target, ScalarType::Float | ScalarType::Double);
        if is_float_target {
            if let Some(value) = self.as_f64() {
                return Ok(if matches!(target, ScalarType::Float) {
                    Self::Float(value as f32)
                } else {
                    Self::Double(value)
                });
            }
        } else if let Some(value) = self.as_i128() {
            if let Some(widened) = Self::from_i128(target, value) {
                return Ok(widened);
            }
        } else if let Some(value) = self.as_f64() {
            // Float/double truncating into an integer target.
            let truncated = value.trunc();
            if truncated.is_finite() {
                if let Some(widened) = Self::from_i128(target, truncated as i128) {
                    return Ok(widened);
                }
            }
        }

        Err(Error::StatusCode(StatusCode::BAD_TYPE_MISMATCH))
    }
}

impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::SByte(a), Self::SByte(b)) => a == b,
            (Self::Byte(a), Self::Byte(b)) => a == b,
            (Self::Int16(a), Self::Int16(b)) => a == b,
            (Self::UInt16(a), Self::UInt16(b)) => a == b,
            (Self::Int32(a), Self::Int32(b)) => a == b,
            (Self::UInt32(a), Self::UInt32(b)) => a == b,
            (Self::Int64(a), Self::Int64(b)) => a == b,
            (Self::UInt64(a), Self::UInt64(b)) => a == b,
            // NaN is unequal to itself, per the deep-equality rule in §4.1.
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Double(a), Self::Double(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::DateTime(a), Self::DateTime(b)) => a == b,
            (Self::Guid(a), Self::Guid(b)) => a == b,
            (Self::ByteString(a), Self::ByteString(b)) => a == b,
            (Self::XmlElement(a), Self::XmlElement(b)) => a == b,
            (Self::NodeId(a), Self::NodeId(b)) => a == b,
            (Self::QualifiedName(a), Self::QualifiedName(b)) => a == b,
            (Self::LocalizedText(a), Self::LocalizedText(b)) => a == b,
            (Self::StatusCode(a), Self::StatusCode(b)) => a == b,
            _ => false,
        }
    }
}

/// A one-dimensional, homogeneously-typed array of [`Scalar`] values with explicit length.
///
/// The design reserves but does not implement two-dimensional arrays (§3).
#[derive(Debug, Clone, PartialEq)]
pub struct Array {
    element_type: ScalarType,
    elements: Vec<Scalar>,
}

impl Array {
    /// Builds an array, requiring every element to share `elements[0]`'s scalar type.
    ///
    /// An empty array still needs an explicit `element_type`, since the length-0 case must
    /// remain distinguishable from `Variant::Empty` (§8 boundary behaviour).
    pub fn new(element_type: ScalarType, elements: Vec<Scalar>) -> Result<Self> {
        if elements.iter().any(|element| element.scalar_type() != element_type) {
            return Err(Error::StatusCode(StatusCode::BAD_TYPE_MISMATCH));
        }
        Ok(Self {
            element_type,
            elements,
        })
    }

    #[must_use]
    pub const fn element_type(&self) -> ScalarType {
        self.element_type
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Scalar] {
        &self.elements
    }

    pub fn check_encoding_limit(&self, max_bytes: usize) -> Result<()> {
        self.elements
            .iter()
            .try_for_each(|element| element.check_encoding_limit(max_bytes))
    }
}

/// A tagged-union value covering the OPC UA built-in types, in either scalar or one-dimensional
/// array shape (§3). `Empty` is distinct from a length-0 array.
#[derive(Debug, Clone, PartialEq)]
pub enum Variant {
    Empty,
    Scalar(Scalar),
    Array(Array),
}

impl Variant {
    #[must_use]
    pub const fn scalar(value: Scalar) -> Self {
        Self::Scalar(value)
    }

    pub fn array(element_type: ScalarType, elements: Vec<Scalar>) -> Result<Self> {
        Ok(Self::Array(Array::new(element_type, elements)?))
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    #[must_use]
    pub const fn is_scalar(&self) -> bool {
        matches!(self, Self::Scalar(_))
    }

    #[must_use]
    pub const fn is_array(&self) -> bool {
        matches!(self, Self::Array(_))
    }

    /// Length of the value: `0` for `Empty`, `1` for a scalar, the element count for an array.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Scalar(_) => 1,
            Self::Array(array) => array.len(),
        }
    }

    /// The scalar type carried by this value, if any (an `Empty` value carries none).
    #[must_use]
    pub fn scalar_type(&self) -> Option<ScalarType> {
        match self {
            Self::Empty => None,
            Self::Scalar(scalar) => Some(scalar.scalar_type()),
            Self::Array(array) => Some(array.element_type()),
        }
    }

    pub fn check_encoding_limit(&self, max_bytes: usize) -> Result<()> {
        match self {
            Self::Empty => Ok(()),
            Self::Scalar(scalar) => scalar.check_encoding_limit(max_bytes),
            Self::Array(array) => array.check_encoding_limit(max_bytes),
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Scalar(scalar) => write!(f, "{scalar:?}"),
            Self::Array(array) => write!(f, "{:?}[{}]", array.element_type(), array.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Array, Scalar, ScalarType, Variant};

    #[test]
    fn nan_is_unequal_to_itself() {
        let nan = Scalar::Double(f64::NAN);
        assert_ne!(nan, nan.clone());
    }

    #[test]
    fn widen_uint16_to_int32_is_lossless() {
        let widened = Scalar::UInt16(1234).widen_to(ScalarType::Int32).unwrap();
        assert_eq!(widened, Scalar::Int32(1234));
    }

    #[test]
    fn widen_double_to_int32_truncates() {
        let widened = Scalar::Double(4.9).widen_to(ScalarType::Int32).unwrap();
        assert_eq!(widened, Scalar::Int32(4));
    }

    #[test]
    fn widen_double_to_int32_out_of_range_fails() {
        assert!(Scalar::Double(1e20).widen_to(ScalarType::Int32).is_err());
    }

    #[test]
    fn empty_array_is_distinct_from_empty_variant() {
        let array = Variant::array(ScalarType::Double, Vec::new()).unwrap();
        assert_eq!(array.len(), 0);
        assert!(array.is_array());
        assert!(!array.is_empty());
        assert_ne!(array, Variant::Empty);
    }

    #[test]
    fn array_rejects_heterogeneous_elements() {
        let result = Array::new(
            ScalarType::Double,
            vec![Scalar::Double(1.0), Scalar::Int32(2)],
        );
        assert!(result.is_err());
    }
}
