//! Typed, shaped tensors.

use std::fmt;

use ndarray::{Array1, ArrayD, IxDyn};

use crate::error::{Error, Result};

/// Element type of a [`Tensor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    UInt8,
    Float,
    Int32,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::UInt8 => "uint8",
            Self::Float => "float",
            Self::Int32 => "int32",
        };
        f.write_str(name)
    }
}

/// A dense tensor with a dynamic rank.
#[derive(Debug, Clone, PartialEq)]
pub enum Tensor {
    UInt8(ArrayD<u8>),
    Float(ArrayD<f32>),
    Int32(ArrayD<i32>),
}

impl Tensor {
    /// Build a tensor from a shape and a flat row-major buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if `data.len()` does not match the shape.
    pub fn from_shape_vec<T: Element>(shape: &[usize], data: Vec<T>) -> Result<Self> {
        let len = data.len();
        ArrayD::from_shape_vec(IxDyn(shape), data)
            .map(T::wrap)
            .map_err(|_| Error::ShapeMismatch {
                expected: format!("{} elements for shape {shape:?}", shape.iter().product::<usize>()),
                actual: format!("{len} elements"),
            })
    }

    /// Build a rank-0 tensor.
    #[must_use]
    pub fn scalar<T: Element>(value: T) -> Self {
        T::wrap(ArrayD::from_elem(IxDyn(&[]), value))
    }

    /// Build a rank-1 tensor.
    #[must_use]
    pub fn vector<T: Element>(values: &[T]) -> Self {
        T::wrap(Array1::from(values.to_vec()).into_dyn())
    }

    /// Element type of the payload.
    #[must_use]
    pub const fn data_type(&self) -> DataType {
        match self {
            Self::UInt8(_) => DataType::UInt8,
            Self::Float(_) => DataType::Float,
            Self::Int32(_) => DataType::Int32,
        }
    }

    /// Dimensions, outermost first.
    #[must_use]
    pub fn shape(&self) -> &[usize] {
        match self {
            Self::UInt8(a) => a.shape(),
            Self::Float(a) => a.shape(),
            Self::Int32(a) => a.shape(),
        }
    }

    /// Number of dimensions.
    #[must_use]
    pub fn rank(&self) -> usize {
        self.shape().len()
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shape().iter().product()
    }

    /// Whether the tensor has no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrow the float payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the tensor is not a float tensor.
    pub fn as_f32(&self) -> Result<&ArrayD<f32>> {
        match self {
            Self::Float(a) => Ok(a),
            other => Err(other.type_error(DataType::Float)),
        }
    }

    /// Borrow the int32 payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the tensor is not an int32 tensor.
    pub fn as_i32(&self) -> Result<&ArrayD<i32>> {
        match self {
            Self::Int32(a) => Ok(a),
            other => Err(other.type_error(DataType::Int32)),
        }
    }

    /// Borrow the uint8 payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the tensor is not a uint8 tensor.
    pub fn as_u8(&self) -> Result<&ArrayD<u8>> {
        match self {
            Self::UInt8(a) => Ok(a),
            other => Err(other.type_error(DataType::UInt8)),
        }
    }

    fn type_error(&self, expected: DataType) -> Error {
        Error::execution(format!(
            "expected a {expected} tensor, got {} {:?}",
            self.data_type(),
            self.shape()
        ))
    }
}

/// Element types a [`Tensor`] can hold.
pub trait Element: Copy + 'static {
    /// Wrap an array in the matching [`Tensor`] variant.
    fn wrap(array: ArrayD<Self>) -> Tensor;
}

impl Element for u8 {
    fn wrap(array: ArrayD<Self>) -> Tensor {
        Tensor::UInt8(array)
    }
}

impl Element for f32 {
    fn wrap(array: ArrayD<Self>) -> Tensor {
        Tensor::Float(array)
    }
}

impl Element for i32 {
    fn wrap(array: ArrayD<Self>) -> Tensor {
        Tensor::Int32(array)
    }
}

impl<T: Element> From<ArrayD<T>> for Tensor {
    fn from(array: ArrayD<T>) -> Self {
        T::wrap(array)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_shape_vec() {
        let t = Tensor::from_shape_vec(&[2, 3], vec![0u8; 6]).unwrap();
        assert_eq!(t.data_type(), DataType::UInt8);
        assert_eq!(t.shape(), &[2, 3]);
        assert_eq!(t.len(), 6);
    }

    #[test]
    fn test_from_shape_vec_wrong_length() {
        let err = Tensor::from_shape_vec(&[2, 2], vec![1.0f32; 3]).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }

    #[test]
    fn test_scalar_and_vector() {
        assert_eq!(Tensor::scalar(0i32).rank(), 0);
        assert_eq!(Tensor::scalar(0i32).len(), 1);
        let v = Tensor::vector(&[224i32, 224]);
        assert_eq!(v.shape(), &[2]);
        assert_eq!(v.as_i32().unwrap().iter().copied().collect::<Vec<_>>(), [224, 224]);
    }

    #[test]
    fn test_wrong_type_access() {
        let t = Tensor::scalar(1.0f32);
        assert!(t.as_i32().is_err());
        assert!(t.as_f32().is_ok());
    }
}
