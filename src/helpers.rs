use itertools::Itertools;
use serde::de::{DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::{from_value, Value};

use crate::Scope;

pub(crate) fn deserialize_string_or_vec<'de, T, D>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    T: DeserializeOwned,
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let value: Value = Deserialize::deserialize(deserializer)?;
    match from_value::<Vec<T>>(value.clone()) {
        Ok(val) => Ok(val),
        Err(_) => {
            let single_val: T = from_value(value).map_err(Error::custom)?;
            Ok(vec![single_val])
        }
    }
}

// Largest magnitude at which every integer is exactly representable as an `f64` (2^53 - 1).
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

// Strings pass through as-is and `null` becomes `None`. Any other JSON value is rendered as
// compact JSON (so `12345678` becomes `"12345678"`) instead of being rejected. Integral floats
// in the safe integer range drop their fraction, so `12345678.0` also becomes `"12345678"`.
pub(crate) fn stringify(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(number) if number.is_f64() => Some(match number.as_f64() {
            Some(float) if float.fract() == 0.0 && float.abs() <= MAX_SAFE_INTEGER => {
                (float as i64).to_string()
            }
            _ => number.to_string(),
        }),
        other => Some(other.to_string()),
    }
}

pub(crate) fn join_scopes(scopes: &[Scope], separator: &str) -> String {
    scopes.iter().map(|scope| scope.as_str()).join(separator)
}
