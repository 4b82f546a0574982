use crate::error::{Error, Result};

use super::{Array, StatusCode, Variant};

/// A single-dimension index range used by Read/Write to address a slice of an array Value.
///
/// The design reserves but does not implement multi-dimensional ranges (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumericRange {
    pub min: u32,
    pub max: u32,
}

impl NumericRange {
    #[must_use]
    pub const fn single(index: u32) -> Self {
        Self {
            min: index,
            max: index,
        }
    }

    #[must_use]
    pub const fn span(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    #[must_use]
    pub const fn len(&self) -> u32 {
        self.max - self.min + 1
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Projects the addressed slice out of an array value, for Read (§4.5 "apply numeric range if
    /// present"). Only array values carry an index range; a scalar or `Empty` value rejects it.
    pub fn apply(&self, value: &Variant) -> Result<Variant> {
        let Variant::Array(array) = value else {
            return Err(Error::StatusCode(StatusCode::BAD_INDEX_RANGE_INVALID));
        };
        let (min, max) = (self.min as usize, self.max as usize);
        if min > max || max >= array.len() {
            return Err(Error::StatusCode(StatusCode::BAD_INDEX_RANGE_NO_DATA));
        }
        let slice = array.as_slice()[min..=max].to_vec();
        Ok(Variant::Array(Array::new(array.element_type(), slice)?))
    }

    /// Splices `segment` into the addressed slice of `current`, for Write. `segment` must itself
    /// be an array of exactly `self.len()` elements of the same element type as `current`.
    pub fn splice(&self, current: &Variant, segment: &Variant) -> Result<Variant> {
        let Variant::Array(array) = current else {
            return Err(Error::StatusCode(StatusCode::BAD_INDEX_RANGE_INVALID));
        };
        let Variant::Array(segment) = segment else {
            return Err(Error::StatusCode(StatusCode::BAD_TYPE_MISMATCH));
        };
        let (min, max) = (self.min as usize, self.max as usize);
        if min > max || max >= array.len() || segment.len() != self.len() as usize {
            return Err(Error::StatusCode(StatusCode::BAD_INDEX_RANGE_NO_DATA));
        }
        if segment.element_type() != array.element_type() {
            return Err(Error::StatusCode(StatusCode::BAD_TYPE_MISMATCH));
        }
        let mut elements = array.as_slice().to_vec();
        elements[min..=max].clone_from_slice(segment.as_slice());
        Ok(Variant::Array(Array::new(array.element_type(), elements)?))
    }
}

#[cfg(test)]
mod tests {
    use super::NumericRange;
    use crate::ua::{Array, Scalar, ScalarType, Variant};

    fn array(values: Vec<i32>) -> Variant {
        Variant::Array(Array::new(ScalarType::Int32, values.into_iter().map(Scalar::Int32).collect()).unwrap())
    }

    #[test]
    fn apply_projects_the_addressed_slice() {
        let value = array(vec![10, 20, 30, 40]);
        let sliced = NumericRange::span(1, 2).apply(&value).unwrap();
        assert_eq!(sliced, array(vec![20, 30]));
    }

    #[test]
    fn apply_rejects_a_scalar() {
        assert!(NumericRange::single(0).apply(&Variant::Scalar(Scalar::Int32(1))).is_err());
    }

    #[test]
    fn apply_out_of_bounds_fails() {
        let value = array(vec![10, 20]);
        assert!(NumericRange::span(1, 5).apply(&value).is_err());
    }

    #[test]
    fn splice_replaces_the_addressed_slice() {
        let current = array(vec![10, 20, 30, 40]);
        let segment = array(vec![99, 98]);
        let spliced = NumericRange::span(1, 2).splice(&current, &segment).unwrap();
        assert_eq!(spliced, array(vec![10, 99, 98, 40]));
    }

    #[test]
    fn splice_rejects_mismatched_segment_length() {
        let current = array(vec![10, 20, 30]);
        let segment = array(vec![1]);
        assert!(NumericRange::span(0, 1).splice(&current, &segment).is_err());
    }
}
