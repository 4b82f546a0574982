//! Binds method nodes to in-process callables (§4.3).

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::{
    error::{Error, Result},
    ua::{NodeId, ScalarType, StatusCode, Variant},
};

/// A single bound method: its declared argument shape and the callable invoked on dispatch.
///
/// The callable receives the already-validated input values and writes its outputs into the
/// vector it returns; the registry has already checked argument count and type widening by the
/// time it runs.
pub trait Method: Send + Sync {
    fn input_types(&self) -> &[ScalarType];
    fn output_types(&self) -> &[ScalarType];
    fn call(&self, inputs: &[Variant]) -> Result<Vec<Variant>>;
}

/// Adapts a plain closure into a [`Method`], for the common case of a stateless callable.
pub struct FnMethod<F> {
    input_types: Vec<ScalarType>,
    output_types: Vec<ScalarType>,
    call: F,
}

impl<F> FnMethod<F>
where
    F: Fn(&[Variant]) -> Result<Vec<Variant>> + Send + Sync,
{
    pub fn new(input_types: Vec<ScalarType>, output_types: Vec<ScalarType>, call: F) -> Self {
        Self {
            input_types,
            output_types,
            call,
        }
    }
}

impl<F> Method for FnMethod<F>
where
    F: Fn(&[Variant]) -> Result<Vec<Variant>> + Send + Sync,
{
    fn input_types(&self) -> &[ScalarType] {
        &self.input_types
    }

    fn output_types(&self) -> &[ScalarType] {
        &self.output_types
    }

    fn call(&self, inputs: &[Variant]) -> Result<Vec<Variant>> {
        (self.call)(inputs)
    }
}

/// NodeId → callable map (§4.3). A node store's Method node is only reachable once a callable is
/// registered here for the same [`NodeId`] (§3 invariant).
#[derive(Default)]
pub struct MethodRegistry {
    methods: RwLock<HashMap<NodeId, Box<dyn Method>>>,
}

impl MethodRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, method_id: NodeId, method: Box<dyn Method>) {
        self.methods.write().insert(method_id, method);
    }

    pub fn unregister(&self, method_id: &NodeId) {
        self.methods.write().remove(method_id);
    }

    #[must_use]
    pub fn is_registered(&self, method_id: &NodeId) -> bool {
        self.methods.read().contains_key(method_id)
    }

    /// Validates argument count and per-argument widening, then invokes the callable.
    ///
    /// On mismatch, returns `BadInvalidArgument` with the offending argument index threaded
    /// through the error message, since `Error::InvalidArgument` is the only variant with room
    /// for that detail.
    pub fn call(&self, method_id: &NodeId, inputs: Vec<Variant>) -> Result<Vec<Variant>> {
        let methods = self.methods.read();
        let method = methods
            .get(method_id)
            .ok_or(Error::StatusCode(StatusCode::BAD_METHOD_INVALID))?;

        let expected = method.input_types();
        if inputs.len() != expected.len() {
            return Err(Error::invalid_argument(format!(
                "method {method_id}: expected {} arguments, got {}",
                expected.len(),
                inputs.len()
            )));
        }

        let mut widened = Vec::with_capacity(inputs.len());
        for (index, (value, expected_type)) in inputs.into_iter().zip(expected).enumerate() {
            let scalar = match value {
                Variant::Scalar(scalar) => scalar,
                _ => {
                    return Err(Error::invalid_argument(format!(
                        "method {method_id}: argument {index} is not a scalar"
                    )));
                }
            };
            match scalar.widen_to(*expected_type) {
                Ok(widened_scalar) => widened.push(Variant::Scalar(widened_scalar)),
                Err(_) => {
                    return Err(Error::invalid_argument(format!(
                        "method {method_id}: argument {index} does not widen to {expected_type:?}"
                    )));
                }
            }
        }

        method.call(&widened)
    }
}

#[cfg(test)]
mod tests {
    use super::{FnMethod, MethodRegistry};
    use crate::ua::{NodeId, Scalar, ScalarType, Variant};

    #[test]
    fn sqrt_method_round_trips() {
        let registry = MethodRegistry::new();
        let method_id = NodeId::numeric(2, 1);
        registry.register(
            method_id.clone(),
            Box::new(FnMethod::new(
                vec![ScalarType::Double],
                vec![ScalarType::Double],
                |inputs| match &inputs[0] {
                    Variant::Scalar(Scalar::Double(value)) => {
                        Ok(vec![Variant::Scalar(Scalar::Double(value.sqrt()))])
                    }
                    _ => unreachable!(),
                },
            )),
        );

        let outputs = registry
            .call(&method_id, vec![Variant::Scalar(Scalar::Double(16.0))])
            .unwrap();
        assert_eq!(outputs, vec![Variant::Scalar(Scalar::Double(4.0))]);
    }

    #[test]
    fn wrong_argument_count_is_rejected() {
        let registry = MethodRegistry::new();
        let method_id = NodeId::numeric(2, 2);
        registry.register(
            method_id.clone(),
            Box::new(FnMethod::new(vec![ScalarType::Double], vec![ScalarType::Double], |_| {
                Ok(vec![])
            })),
        );
        let error = registry.call(&method_id, vec![]).unwrap_err();
        assert_eq!(error.status_code(), crate::ua::StatusCode::BAD_INVALID_ARGUMENT);
        assert!(error.to_string().contains("expected 1 arguments, got 0"));
    }

    #[test]
    fn unregistered_method_is_invalid() {
        let registry = MethodRegistry::new();
        assert!(registry.call(&NodeId::numeric(2, 99), vec![]).is_err());
    }
}
