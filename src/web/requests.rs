//! Validation of add/delete payloads before they reach the world.

use serde_json::{Map, Value};

use crate::{
    error::RequestError,
    math::Vector3,
    sphere::{NewSphere, SphereId},
};

/// Parses an add-sphere body into sphere parameters with a unit-density mass.
pub fn parse_add_sphere(body: &[u8]) -> Result<NewSphere, RequestError> {
    let value = parse_object(body)?;
    let fields = value.as_object().ok_or(RequestError::MalformedBody)?;

    for field in ["position", "velocity", "radius"] {
        if !fields.contains_key(field) {
            return Err(RequestError::MissingField(field));
        }
    }

    let position = vector_field(fields, "position")?;
    let velocity = vector_field(fields, "velocity")?;
    let radius = fields
        .get("radius")
        .and_then(Value::as_f64)
        .ok_or(RequestError::NotNumeric("radius"))?;
    if radius <= 0.0 {
        return Err(RequestError::NonPositiveRadius);
    }

    Ok(NewSphere::with_unit_density(position, velocity, radius))
}

/// What a delete request refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteTarget {
    Sphere(SphereId),
    /// A well-formed integer no sphere can carry.
    Unassignable(i64),
}

impl std::fmt::Display for DeleteTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeleteTarget::Sphere(id) => write!(f, "{id}"),
            DeleteTarget::Unassignable(raw) => write!(f, "{raw}"),
        }
    }
}

pub fn parse_delete_sphere(body: &[u8]) -> Result<DeleteTarget, RequestError> {
    let value = parse_object(body)?;
    let id = value.get("id").ok_or(RequestError::InvalidId)?;
    if let Some(raw) = id.as_u64() {
        return Ok(DeleteTarget::Sphere(SphereId::new(raw)));
    }
    id.as_i64()
        .map(DeleteTarget::Unassignable)
        .ok_or(RequestError::InvalidId)
}

fn parse_object(body: &[u8]) -> Result<Value, RequestError> {
    let value: Value = serde_json::from_slice(body).map_err(|_| RequestError::MalformedBody)?;
    if !value.is_object() {
        return Err(RequestError::MalformedBody);
    }
    Ok(value)
}

fn vector_field(fields: &Map<String, Value>, name: &'static str) -> Result<Vector3, RequestError> {
    let items = fields
        .get(name)
        .and_then(Value::as_array)
        .ok_or(RequestError::NotNumeric(name))?;
    if items.len() != 3 {
        return Err(RequestError::WrongArity {
            field: name,
            expected: 3,
            found: items.len(),
        });
    }
    let mut out = [0.0; 3];
    for (slot, item) in out.iter_mut().zip(items) {
        *slot = item.as_f64().ok_or(RequestError::NotNumeric(name))?;
    }
    Ok(Vector3::from(out))
}
