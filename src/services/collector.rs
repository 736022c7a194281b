use std::collections::BTreeMap;

use crate::models::catalog::{ParameterKind, ParameterSpec, VideoModel, RESERVED_PARAMETER_NAMES};
use crate::models::generation::{GenerationRequest, ParamValue};

/// Edited parameter values for one model, seeded from its declared defaults.
#[derive(Debug, Clone)]
pub struct ParameterForm<'a> {
    model: &'a VideoModel,
    values: BTreeMap<String, ParamValue>,
}

impl<'a> ParameterForm<'a> {
    pub fn from_model(model: &'a VideoModel) -> Self {
        let values = model
            .parameters
            .iter()
            .filter_map(|spec| {
                if is_reserved(&spec.name) {
                    tracing::warn!(
                        model = %model.slug,
                        parameter = %spec.name,
                        "Ignoring parameter that shadows a request field"
                    );
                    return None;
                }
                let default = spec.default.as_ref()?;
                match default_value(spec, default) {
                    Some(value) => Some((spec.name.clone(), value)),
                    None => {
                        tracing::warn!(
                            model = %model.slug,
                            parameter = %spec.name,
                            "Ignoring default that does not match the parameter type"
                        );
                        None
                    }
                }
            })
            .collect();

        Self { model, values }
    }

    pub fn model(&self) -> &VideoModel {
        self.model
    }

    pub fn values(&self) -> &BTreeMap<String, ParamValue> {
        &self.values
    }

    /// Apply a textual edit to a declared parameter.
    pub fn set(&mut self, name: &str, raw: &str) -> Result<&ParamValue, CollectorError> {
        if is_reserved(name) {
            return Err(CollectorError::ReservedName(name.to_string()));
        }
        let spec = self
            .model
            .parameter(name)
            .ok_or_else(|| CollectorError::UnknownParameter(name.to_string()))?;
        let value = parse_value(spec, raw)?;
        self.values.insert(spec.name.clone(), value);
        Ok(&self.values[&spec.name])
    }

    /// Remove an edited value so the parameter is omitted from the request.
    pub fn unset(&mut self, name: &str) {
        self.values.remove(name);
    }

    pub fn build(&self, prompt: &str, image_url: Option<String>) -> GenerationRequest {
        GenerationRequest {
            prompt: prompt.to_string(),
            parameters: self.values.clone(),
            image_url,
        }
    }
}

fn is_reserved(name: &str) -> bool {
    RESERVED_PARAMETER_NAMES.contains(&name)
}

fn clamp(spec: &ParameterSpec, n: f64) -> f64 {
    let n = spec.min.map_or(n, |min| n.max(min));
    spec.max.map_or(n, |max| n.min(max))
}

/// Decimal places in the shortest representation of `n`, capped at 9.
fn decimals(n: f64) -> i32 {
    format!("{n}")
        .split_once('.')
        .map_or(0, |(_, frac)| frac.len().min(9) as i32)
}

/// Clamp to `[min, max]`, then snap to the `step` grid anchored at `min`
/// the way a range input settles a value. The top of the range is the
/// largest grid value not above `max`.
fn constrain(spec: &ParameterSpec, n: f64) -> f64 {
    let n = clamp(spec, n);
    let Some(step) = spec.step.filter(|step| step.is_finite() && *step > 0.0) else {
        return n;
    };

    let base = spec.min.unwrap_or(0.0);
    let scale = 10f64.powi(decimals(step).max(decimals(base)));
    let round = |v: f64| (v * scale).round() / scale;

    let mut snapped = round(base + ((n - base) / step).round() * step);
    if spec.max.is_some_and(|max| snapped > max) {
        snapped = round(snapped - step);
    }
    clamp(spec, snapped)
}

fn default_value(spec: &ParameterSpec, default: &serde_json::Value) -> Option<ParamValue> {
    use serde_json::Value;

    match (spec.kind, default) {
        (ParameterKind::Number, Value::Number(n)) => n.as_f64().map(|n| ParamValue::Number(constrain(spec, n))),
        (ParameterKind::Boolean, Value::Bool(b)) => Some(ParamValue::Bool(*b)),
        (ParameterKind::Select, Value::String(s)) if spec.options.contains(s) => {
            Some(ParamValue::Text(s.clone()))
        }
        (ParameterKind::Select, Value::Number(n)) if spec.options.contains(&n.to_string()) => {
            Some(ParamValue::Text(n.to_string()))
        }
        (ParameterKind::String, Value::String(s)) => Some(ParamValue::Text(s.clone())),
        _ => None,
    }
}

/// Parse a raw edit the way the matching form control would accept it.
pub fn parse_value(spec: &ParameterSpec, raw: &str) -> Result<ParamValue, CollectorError> {
    let trimmed = raw.trim();
    let invalid = || CollectorError::InvalidValue {
        name: spec.name.clone(),
        kind: spec.kind,
        value: raw.to_string(),
    };

    match spec.kind {
        ParameterKind::Number => {
            let n: f64 = trimmed.parse().map_err(|_| invalid())?;
            if !n.is_finite() {
                return Err(invalid());
            }
            Ok(ParamValue::Number(constrain(spec, n)))
        }
        ParameterKind::Boolean => match trimmed.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(ParamValue::Bool(true)),
            "false" | "0" | "no" | "off" => Ok(ParamValue::Bool(false)),
            _ => Err(invalid()),
        },
        ParameterKind::Select => {
            if spec.options.iter().any(|option| option == trimmed) {
                Ok(ParamValue::Text(trimmed.to_string()))
            } else {
                Err(CollectorError::NotAnOption {
                    name: spec.name.clone(),
                    value: raw.to_string(),
                    options: spec.options.clone(),
                })
            }
        }
        ParameterKind::String => Ok(ParamValue::Text(raw.to_string())),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),

    #[error("Parameter name {0:?} is reserved for the request body")]
    ReservedName(String),

    #[error("Invalid {kind} value for {name}: {value:?}")]
    InvalidValue {
        name: String,
        kind: ParameterKind,
        value: String,
    },

    #[error("{value:?} is not an option for {name} (expected one of {options:?})")]
    NotAnOption {
        name: String,
        value: String,
        options: Vec<String>,
    },
}
