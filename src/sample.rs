use std::ops::Range;

use serde::{Deserialize, Serialize};
use zarrs::array::{ArrayBytes, DataType, data_type};

use crate::{Error, Result};

/// Numeric type of the samples held in a source dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleType {
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float32,
    Float64,
}

impl SampleType {
    /// Size of one sample in bytes.
    pub fn size(&self) -> usize {
        match self {
            SampleType::Int8 | SampleType::Uint8 => 1,
            SampleType::Int16 | SampleType::Uint16 => 2,
            SampleType::Int32 | SampleType::Uint32 | SampleType::Float32 => 4,
            SampleType::Int64 | SampleType::Uint64 | SampleType::Float64 => 8,
        }
    }

    /// The equivalent Zarr data type.
    pub fn data_type(&self) -> DataType {
        match self {
            SampleType::Int8 => data_type::int8(),
            SampleType::Int16 => data_type::int16(),
            SampleType::Int32 => data_type::int32(),
            SampleType::Int64 => data_type::int64(),
            SampleType::Uint8 => data_type::uint8(),
            SampleType::Uint16 => data_type::uint16(),
            SampleType::Uint32 => data_type::uint32(),
            SampleType::Uint64 => data_type::uint64(),
            SampleType::Float32 => data_type::float32(),
            SampleType::Float64 => data_type::float64(),
        }
    }
}

/// A primitive which can be stored in a [Block].
pub trait Sample: Copy + Send + Sync + 'static {
    const SAMPLE_TYPE: SampleType;

    fn extend_ne_bytes(self, out: &mut Vec<u8>);

    /// `bytes` must be exactly `SAMPLE_TYPE.size()` long.
    fn from_ne_slice(bytes: &[u8]) -> Self;
}

macro_rules! impl_sample {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl Sample for $t {
                const SAMPLE_TYPE: SampleType = SampleType::$variant;

                fn extend_ne_bytes(self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_ne_bytes());
                }

                fn from_ne_slice(bytes: &[u8]) -> Self {
                    let mut buf = [0u8; size_of::<$t>()];
                    buf.copy_from_slice(bytes);
                    <$t>::from_ne_bytes(buf)
                }
            }
        )*
    };
}

impl_sample!(
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => Uint8,
    u16 => Uint16,
    u32 => Uint32,
    u64 => Uint64,
    f32 => Float32,
    f64 => Float64,
);

/// Encode a slice of samples as native-endian bytes.
pub fn samples_to_bytes<T: Sample>(samples: &[T]) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * T::SAMPLE_TYPE.size());
    for s in samples {
        s.extend_ne_bytes(&mut out);
    }
    out
}

/// A C-ordered, in-memory block of samples read from a source dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    shape: Vec<u64>,
    sample_type: SampleType,
    bytes: Vec<u8>,
}

impl Block {
    pub fn new(shape: Vec<u64>, sample_type: SampleType, bytes: Vec<u8>) -> Result<Self> {
        let expected = shape.iter().product::<u64>() * sample_type.size() as u64;
        if bytes.len() as u64 != expected {
            return Err(Error::general(format!(
                "block of shape {shape:?} and type {sample_type:?} needs {expected} bytes, got {}",
                bytes.len()
            )));
        }
        Ok(Self {
            shape,
            sample_type,
            bytes,
        })
    }

    pub fn from_samples<T: Sample>(shape: Vec<u64>, samples: &[T]) -> Result<Self> {
        Self::new(shape, T::SAMPLE_TYPE, samples_to_bytes(samples))
    }

    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    pub fn sample_type(&self) -> SampleType {
        self.sample_type
    }

    pub fn num_elements(&self) -> u64 {
        self.shape.iter().product()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Decode the samples, failing if `T` is not the block's sample type.
    pub fn to_vec<T: Sample>(&self) -> Result<Vec<T>> {
        if T::SAMPLE_TYPE != self.sample_type {
            return Err(Error::general(format!(
                "cannot view {:?} block as {:?}",
                self.sample_type,
                T::SAMPLE_TYPE
            )));
        }
        Ok(self
            .bytes
            .chunks_exact(self.sample_type.size())
            .map(T::from_ne_slice)
            .collect())
    }

    /// Copy a C-ordered sub-region out of this block.
    ///
    /// `region` is relative to the block origin.
    pub fn extract(&self, region: &[Range<u64>]) -> Result<Block> {
        if region.len() != self.shape.len()
            || region
                .iter()
                .zip(&self.shape)
                .any(|(r, &n)| r.start > r.end || r.end > n)
        {
            return Err(Error::general(format!(
                "region {region:?} is not within block shape {:?}",
                self.shape
            )));
        }
        if self.shape.is_empty() {
            return Ok(self.clone());
        }
        let out_shape: Vec<u64> = region.iter().map(|r| r.end - r.start).collect();
        let item = self.sample_type.size();
        let numel: u64 = out_shape.iter().product();
        let mut out = Vec::with_capacity(numel as usize * item);
        if numel == 0 {
            return Block::new(out_shape, self.sample_type, out);
        }

        let ndim = self.shape.len();
        let mut strides = vec![1u64; ndim];
        for d in (0..ndim.saturating_sub(1)).rev() {
            strides[d] = strides[d + 1] * self.shape[d + 1];
        }
        // Copy contiguous runs along the innermost axis.
        let run = region[ndim - 1].end - region[ndim - 1].start;
        let outer = &region[..ndim - 1];
        let mut cursor: Vec<u64> = outer.iter().map(|r| r.start).collect();
        loop {
            let offset: u64 = cursor
                .iter()
                .zip(&strides)
                .map(|(i, s)| i * s)
                .sum::<u64>()
                + region[ndim - 1].start;
            let start = offset as usize * item;
            out.extend_from_slice(&self.bytes[start..start + run as usize * item]);

            let mut d = outer.len();
            loop {
                if d == 0 {
                    return Block::new(out_shape, self.sample_type, out);
                }
                d -= 1;
                cursor[d] += 1;
                if cursor[d] < outer[d].end {
                    break;
                }
                cursor[d] = outer[d].start;
            }
        }
    }

    pub fn into_array_bytes(self) -> ArrayBytes<'static> {
        ArrayBytes::new_flen(self.bytes)
    }
}
