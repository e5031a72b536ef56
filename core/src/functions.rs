//! Scalar functions for ytspark jobs.
//!
//! A [`UserDefinedFunction`] pairs a Rust closure with a declared input
//! arity, input types and output type. It can be applied to column
//! expressions directly or registered on a [`JobContext`](crate::JobContext)
//! and called from SQL.

use crate::error::TransformError;
use datafusion::arrow::array::{Array, ArrayRef, AsArray, StringBuilder};
use datafusion::arrow::datatypes::DataType;
use datafusion::error::{DataFusionError, Result as DFResult};
use datafusion::logical_expr::{
    ColumnarValue, Expr, ScalarFunctionArgs, ScalarUDF, ScalarUDFImpl, Signature, Volatility,
};
use datafusion::scalar::ScalarValue;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

pub use datafusion::prelude::{col, lit};

/// Vectorised body of a scalar function.
pub type ScalarImplementation =
    Arc<dyn Fn(&[ColumnarValue]) -> DFResult<ColumnarValue> + Send + Sync>;

/// A named scalar function with a declared signature.
#[derive(Debug, Clone)]
pub struct UserDefinedFunction {
    udf: ScalarUDF,
}

impl UserDefinedFunction {
    /// Create a function taking `input_types.len()` arguments and producing `return_type`.
    ///
    /// Arguments are coerced to `input_types` before `implementation` runs;
    /// applying the function to the wrong number of arguments fails at planning.
    pub fn new(
        name: impl Into<String>,
        input_types: Vec<DataType>,
        return_type: DataType,
        implementation: ScalarImplementation,
    ) -> Self {
        let signature = if input_types.is_empty() {
            Signature::exact(vec![], Volatility::Immutable)
        } else {
            Signature::user_defined(Volatility::Immutable)
        };
        let inner = ClosureUdf {
            name: name.into(),
            signature,
            input_types,
            return_type,
            implementation,
        };
        Self {
            udf: ScalarUDF::new_from_impl(inner),
        }
    }

    pub fn name(&self) -> &str {
        self.udf.name()
    }

    /// Apply the function to argument expressions, producing a new column expression.
    pub fn apply(&self, args: Vec<Expr>) -> Expr {
        self.udf.call(args)
    }

    pub fn to_scalar_udf(&self) -> ScalarUDF {
        self.udf.clone()
    }
}

struct ClosureUdf {
    name: String,
    signature: Signature,
    input_types: Vec<DataType>,
    return_type: DataType,
    implementation: ScalarImplementation,
}

impl fmt::Debug for ClosureUdf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClosureUdf")
            .field("name", &self.name)
            .field("input_types", &self.input_types)
            .field("return_type", &self.return_type)
            .finish_non_exhaustive()
    }
}

impl ScalarUDFImpl for ClosureUdf {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn coerce_types(&self, arg_types: &[DataType]) -> DFResult<Vec<DataType>> {
        if arg_types.len() != self.input_types.len() {
            return Err(DataFusionError::Plan(format!(
                "{} expects {} argument(s), got {}",
                self.name,
                self.input_types.len(),
                arg_types.len()
            )));
        }
        Ok(self.input_types.clone())
    }

    fn return_type(&self, _arg_types: &[DataType]) -> DFResult<DataType> {
        Ok(self.return_type.clone())
    }

    fn invoke_with_args(&self, args: ScalarFunctionArgs) -> DFResult<ColumnarValue> {
        (self.implementation)(&args.args)
    }
}

/// Wrap a string-to-string closure as a one-argument `Utf8` function.
///
/// Null input yields null output. An `Err` from the closure aborts the
/// evaluation with a [`TransformError`] naming the function, value and row.
pub fn udf_str<F>(name: impl Into<String>, f: F) -> UserDefinedFunction
where
    F: Fn(&str) -> Result<String, TransformError> + Send + Sync + 'static,
{
    let name = name.into();
    let function_name = name.clone();

    let implementation: ScalarImplementation = Arc::new(move |args: &[ColumnarValue]| {
        let scalar_input = args
            .iter()
            .all(|arg| matches!(arg, ColumnarValue::Scalar(_)));
        let arrays = ColumnarValue::values_to_arrays(args)?;
        let input = arrays
            .first()
            .and_then(|array| array.as_string_opt::<i32>())
            .ok_or_else(|| {
                DataFusionError::Internal(format!("{} expects a Utf8 argument", function_name))
            })?;

        let mut builder = StringBuilder::with_capacity(input.len(), input.value_data().len());
        for (row, value) in input.iter().enumerate() {
            match value {
                Some(value) => {
                    let output = f(value).map_err(|e| {
                        DataFusionError::External(Box::new(e.located(&function_name, value, row)))
                    })?;
                    builder.append_value(output);
                }
                None => builder.append_null(),
            }
        }

        let result: ArrayRef = Arc::new(builder.finish());
        if scalar_input {
            Ok(ColumnarValue::Scalar(ScalarValue::try_from_array(&result, 0)?))
        } else {
            Ok(ColumnarValue::Array(result))
        }
    });

    UserDefinedFunction::new(name, vec![DataType::Utf8], DataType::Utf8, implementation)
}

/// Split on `delimiter` and take the segment at `index` (zero based).
///
/// A value with fewer segments is a transformation failure, not a null.
pub fn split_part_strict(
    delimiter: &str,
    index: usize,
) -> impl Fn(&str) -> Result<String, TransformError> + Send + Sync + Clone + use<> {
    let delimiter = delimiter.to_string();
    move |value: &str| {
        if delimiter.is_empty() {
            return Err(TransformError::new("delimiter must not be empty"));
        }
        value
            .split(delimiter.as_str())
            .nth(index)
            .map(str::to_string)
            .ok_or_else(|| {
                TransformError::new(format!(
                    "no segment {} after splitting on {:?}",
                    index, delimiter
                ))
            })
    }
}
