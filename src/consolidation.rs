use crate::Value;

/// Reduces the per-namespace values of one series at one step to a single value.
///
/// Values arrive in namespace order; gaps are `NaN`. Any
/// `Fn(&[Value]) -> Value + Clone` closure is a consolidation, too.
pub trait Consolidation: Clone {
    /// Consolidates `values`, which may be empty.
    fn consolidate(&self, values: &[Value]) -> Value;
}

impl<F> Consolidation for F
where
    F: Fn(&[Value]) -> Value + Clone,
{
    fn consolidate(&self, values: &[Value]) -> Value {
        self(values)
    }
}

/// Takes the value of the first namespace, even if it is a gap.
#[derive(Copy, Clone, Debug, Default)]
pub struct First;

impl Consolidation for First {
    fn consolidate(&self, values: &[Value]) -> Value {
        values.first().copied().unwrap_or(Value::NAN)
    }
}

/// Takes the first value that is not a gap.
///
/// With namespaces ordered finest resolution first, this prefers the most
/// granular value available at each step.
#[derive(Copy, Clone, Debug, Default)]
pub struct FirstPresent;

impl Consolidation for FirstPresent {
    fn consolidate(&self, values: &[Value]) -> Value {
        values
            .iter()
            .copied()
            .find(|v| !v.is_nan())
            .unwrap_or(Value::NAN)
    }
}

/// Smallest value, ignoring gaps.
#[derive(Copy, Clone, Debug, Default)]
pub struct Min;

impl Consolidation for Min {
    fn consolidate(&self, values: &[Value]) -> Value {
        // NOTE: f64::min returns the other operand if one is NaN
        values.iter().copied().fold(Value::NAN, Value::min)
    }
}

/// Largest value, ignoring gaps.
#[derive(Copy, Clone, Debug, Default)]
pub struct Max;

impl Consolidation for Max {
    fn consolidate(&self, values: &[Value]) -> Value {
        values.iter().copied().fold(Value::NAN, Value::max)
    }
}

/// Sum of all values, ignoring gaps.
#[derive(Copy, Clone, Debug, Default)]
pub struct Sum;

impl Consolidation for Sum {
    fn consolidate(&self, values: &[Value]) -> Value {
        values
            .iter()
            .copied()
            .filter(|v| !v.is_nan())
            .fold(Value::NAN, |accu, x| if accu.is_nan() { x } else { accu + x })
    }
}

/// Mean of all values, ignoring gaps.
#[derive(Copy, Clone, Debug, Default)]
pub struct Avg;

impl Consolidation for Avg {
    #[allow(clippy::cast_precision_loss)]
    fn consolidate(&self, values: &[Value]) -> Value {
        let (sum, len) = values
            .iter()
            .copied()
            .filter(|v| !v.is_nan())
            .fold((0.0, 0usize), |(sum, len), x| (sum + x, len + 1));

        if len == 0 {
            Value::NAN
        } else {
            sum / len as Value
        }
    }
}
