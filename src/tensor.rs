//! Dense numeric arrays decoded from nested JSON lists.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::{DashboardError, DashboardResult};

/// Row-major n-dimensional array of `f32`.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    shape: Vec<usize>,
    data: Vec<f32>,
    /// Every element was written as a JSON integer.
    integral: bool,
}

impl Tensor {
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> DashboardResult<Self> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(DashboardError::protocol(format!(
                "shape {shape:?} needs {expected} values, got {}",
                data.len()
            )));
        }
        Ok(Self {
            shape,
            data,
            integral: false,
        })
    }

    pub fn from_vec(data: Vec<f32>) -> Self {
        Self {
            shape: vec![data.len()],
            data,
            integral: false,
        }
    }

    /// Decodes a JSON number or a rectangular nest of lists of numbers.
    pub fn from_json(value: &Value) -> DashboardResult<Self> {
        let mut shape = Vec::new();
        let mut probe = value;
        while let Value::Array(items) = probe {
            shape.push(items.len());
            match items.first() {
                Some(first) => probe = first,
                None => break,
            }
        }
        let mut data = Vec::with_capacity(shape.iter().product());
        let mut integral = true;
        flatten(value, &shape, &mut data, &mut integral)?;
        Ok(Self {
            integral: integral && !data.is_empty(),
            shape,
            data,
        })
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// True when decoded from integers only, e.g. an 8-bit image.
    pub fn is_integral(&self) -> bool {
        self.integral
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Drops every dimension of size one.
    pub fn squeeze(mut self) -> Self {
        self.shape.retain(|&d| d != 1);
        self
    }
}

fn flatten(
    value: &Value,
    shape: &[usize],
    out: &mut Vec<f32>,
    integral: &mut bool,
) -> DashboardResult<()> {
    match (value, shape.split_first()) {
        (Value::Number(n), None) => {
            *integral &= n.is_i64() || n.is_u64();
            let v = n
                .as_f64()
                .ok_or_else(|| DashboardError::protocol(format!("non-finite number {n}")))?;
            out.push(v as f32);
            Ok(())
        }
        (Value::Array(items), Some((&len, rest))) => {
            if items.len() != len {
                return Err(DashboardError::protocol(format!(
                    "ragged array: expected {len} elements, found {}",
                    items.len()
                )));
            }
            for item in items {
                flatten(item, rest, out, integral)?;
            }
            Ok(())
        }
        (other, _) => Err(DashboardError::protocol(format!(
            "expected a numeric array, found {}",
            kind(other)
        ))),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

impl<'de> Deserialize<'de> for Tensor {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Tensor::from_json(&value).map_err(serde::de::Error::custom)
    }
}
