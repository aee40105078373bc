//! Inference engine boundary.
//!
//! The classifier is opaque to the control loop: a function from a
//! quantized feature vector to one quantized score per class.  Its shape
//! and schema version are checked exactly once, in [`bind`]; after that
//! the only failure left is a transient [`InferenceError`] per call.
//!
//! ```text
//!   engine ──bind(expected schema)──▶ BoundModel ──run([i8; 9])──▶ QuantizedOutput
//!                │ mismatch                             │ failure
//!                ▼                                      ▼
//!          ConfigFault (halt)                 InferenceError (skip tick)
//! ```

pub mod decoder;
pub mod dense;

use crate::error::{ConfigFault, InferenceError};
use crate::features::FEATURE_COUNT;
use crate::features::quantizer::QuantizedVector;

/// Schema version this firmware's feature layout was built against.
pub const SCHEMA_VERSION: u32 = 3;

/// Upper bound on the number of classes a model may expose.
pub const MAX_CLASSES: usize = 16;

/// One quantized score per class.
pub type QuantizedOutput = heapless::Vec<i8, MAX_CLASSES>;

/// Declared tensor layout of a compiled model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelSchema {
    pub version: u32,
    pub input_len: usize,
    pub output_len: usize,
}

impl ModelSchema {
    /// The schema the control loop requires for `classes` output labels.
    pub const fn expected(classes: usize) -> Self {
        Self {
            version: SCHEMA_VERSION,
            input_len: FEATURE_COUNT,
            output_len: classes,
        }
    }
}

/// A quantized classifier.
///
/// Implementations own their working memory (tensor arena, scratch
/// buffers); `invoke` must not allocate per call on the device.
pub trait InferenceEngine {
    /// Layout the compiled model declares.
    fn schema(&self) -> ModelSchema;

    /// Run one inference.  `input` and `output` have exactly the declared
    /// lengths.
    fn invoke(&mut self, input: &[i8], output: &mut [i8]) -> Result<(), InferenceError>;
}

/// An engine whose schema has been checked against the deployment.
#[derive(Debug)]
pub struct BoundModel<E> {
    engine: E,
    schema: ModelSchema,
}

/// Validate `engine` against `expected`; any difference is fatal.
pub fn bind<E: InferenceEngine>(
    engine: E,
    expected: ModelSchema,
) -> Result<BoundModel<E>, ConfigFault> {
    let declared = engine.schema();
    if declared.version != expected.version {
        return Err(ConfigFault::SchemaVersion {
            expected: expected.version,
            found: declared.version,
        });
    }
    if declared.input_len != expected.input_len {
        return Err(ConfigFault::InputShape {
            expected: expected.input_len,
            found: declared.input_len,
        });
    }
    if declared.output_len != expected.output_len || declared.output_len > MAX_CLASSES {
        return Err(ConfigFault::OutputShape {
            expected: expected.output_len,
            found: declared.output_len,
        });
    }
    log::info!(
        "model bound: schema v{} ({} -> {})",
        declared.version,
        declared.input_len,
        declared.output_len
    );
    Ok(BoundModel {
        engine,
        schema: declared,
    })
}

impl<E: InferenceEngine> BoundModel<E> {
    pub fn schema(&self) -> ModelSchema {
        self.schema
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn run(&mut self, input: &QuantizedVector) -> Result<QuantizedOutput, InferenceError> {
        let mut output = QuantizedOutput::new();
        output
            .resize(self.schema.output_len, 0)
            .map_err(|()| InferenceError::BufferLength)?;
        self.engine.invoke(input, &mut output)?;
        Ok(output)
    }
}
