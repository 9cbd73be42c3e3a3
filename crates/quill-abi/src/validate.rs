//! Value validation against a type
//!
//! Fail-fast: the first violation in declaration order is returned, with the
//! element indices leading to it.

use quill_primitives::I256;

use crate::error::{ValidationError, ValidationKind};
use crate::types::{ArrayLength, ParamType, TupleType};
use crate::value::Value;

/// Check `value` against `ty`
pub fn validate(ty: &ParamType, value: &Value) -> Result<(), ValidationError> {
    match (ty, value) {
        (ParamType::Bool, Value::Bool(_)) => Ok(()),
        (ParamType::Int { bits, signed }, Value::Int(i)) => check_int(i, *bits, *signed),
        (ParamType::Address, Value::Address(_)) => Ok(()),
        (
            ParamType::Fixed {
                bits,
                scale,
                signed,
            },
            Value::Decimal(d),
        ) => {
            if d.scale() != *scale {
                return Err(ValidationError::new(ValidationKind::ScaleMismatch {
                    expected: *scale,
                    actual: d.scale(),
                }));
            }
            check_int(&d.unscaled(), *bits, *signed)
        }
        (ParamType::FixedBytes(len), Value::FixedBytes(data)) => check_len(*len, data.len()),
        (ParamType::Function, Value::FixedBytes(data)) => check_len(ParamType::FUNCTION_LEN, data.len()),
        (ParamType::Bytes, Value::Bytes(_)) => Ok(()),
        (ParamType::String, Value::String(_)) => Ok(()),
        (ParamType::Array(array), Value::Array(items)) => {
            if let ArrayLength::Fixed(n) = array.length() {
                check_len(n as usize, items.len())?;
            }
            for (i, item) in items.iter().enumerate() {
                validate(array.element(), item).map_err(|e| e.at(i))?;
            }
            Ok(())
        }
        (ParamType::Tuple(tuple), Value::Tuple(items)) => validate_tuple(tuple, items),
        (ty, value) => Err(ValidationError::new(ValidationKind::ClassMismatch {
            expected: ty.canonical_type().into_owned(),
            found: value.kind_name(),
        })),
    }
}

/// Check a list of values against the members of `tuple`
pub fn validate_tuple(tuple: &TupleType, values: &[Value]) -> Result<(), ValidationError> {
    if values.len() != tuple.len() {
        return Err(ValidationError::new(ValidationKind::ArityMismatch {
            expected: tuple.len(),
            actual: values.len(),
        }));
    }
    for (i, (ty, value)) in tuple.members().iter().zip(values).enumerate() {
        validate(ty, value).map_err(|e| e.at(i))?;
    }
    Ok(())
}

/// Range check for `intN`/`uintN`; signed types keep one bit for the sign
pub(crate) fn check_int(value: &I256, bits: u16, signed: bool) -> Result<(), ValidationError> {
    if !signed && value.is_negative() {
        return Err(ValidationError::new(ValidationKind::SignMismatch));
    }
    let limit = if signed {
        usize::from(bits) - 1
    } else {
        usize::from(bits)
    };
    let actual = value.bit_length();
    if actual > limit {
        return Err(ValidationError::new(ValidationKind::BitLimitExceeded { limit, actual }));
    }
    Ok(())
}

fn check_len(expected: usize, actual: usize) -> Result<(), ValidationError> {
    if expected != actual {
        return Err(ValidationError::new(ValidationKind::LengthMismatch {
            expected,
            actual,
        }));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_tuple_type, parse_type};
    use crate::value::Decimal;
    use quill_primitives::{Address, U256};

    fn kind(ty: &str, value: Value) -> ValidationKind {
        validate(&parse_type(ty).unwrap(), &value).unwrap_err().kind
    }

    // ==================== Integers ====================

    #[test]
    fn test_int_bounds() {
        let int8 = parse_type("int8").unwrap();
        assert!(validate(&int8, &Value::int(127)).is_ok());
        assert!(validate(&int8, &Value::int(-128)).is_ok());
        assert_eq!(
            kind("int8", Value::int(128)),
            ValidationKind::BitLimitExceeded { limit: 7, actual: 8 }
        );
        assert_eq!(
            kind("int8", Value::int(-129)),
            ValidationKind::BitLimitExceeded { limit: 7, actual: 8 }
        );
    }

    #[test]
    fn test_uint_bounds_and_sign() {
        let uint256 = parse_type("uint256").unwrap();
        assert!(validate(&uint256, &Value::uint(U256::MAX)).is_ok());
        assert_eq!(kind("uint8", Value::int(-1)), ValidationKind::SignMismatch);
        assert_eq!(
            kind("uint8", Value::uint(256u64)),
            ValidationKind::BitLimitExceeded { limit: 8, actual: 9 }
        );
        assert_eq!(
            kind("int256", Value::uint(U256::MAX)),
            ValidationKind::BitLimitExceeded {
                limit: 255,
                actual: 256
            }
        );
    }

    // ==================== Decimals and bytes ====================

    #[test]
    fn test_decimal_scale() {
        let ty = parse_type("fixed128x18").unwrap();
        let ok = Decimal::new(I256::from_i128(-15), 18);
        assert!(validate(&ty, &Value::Decimal(ok)).is_ok());
        let wrong = Decimal::new(I256::from_i128(-15), 2);
        assert_eq!(
            kind("fixed128x18", Value::Decimal(wrong)),
            ValidationKind::ScaleMismatch {
                expected: 18,
                actual: 2
            }
        );
        let negative = Decimal::new(I256::from_i128(-1), 1);
        assert_eq!(kind("ufixed8x1", Value::Decimal(negative)), ValidationKind::SignMismatch);
    }

    #[test]
    fn test_fixed_bytes_length() {
        assert!(validate(&ParamType::FixedBytes(4), &Value::FixedBytes(vec![0; 4])).is_ok());
        assert_eq!(
            kind("bytes4", Value::FixedBytes(vec![0; 3])),
            ValidationKind::LengthMismatch {
                expected: 4,
                actual: 3
            }
        );
        assert_eq!(
            kind("function", Value::FixedBytes(vec![0; 20])),
            ValidationKind::LengthMismatch {
                expected: 24,
                actual: 20
            }
        );
    }

    // ==================== Composites ====================

    #[test]
    fn test_fixed_array_length() {
        assert_eq!(
            kind("bool[2]", Value::Array(vec![Value::Bool(true)])),
            ValidationKind::LengthMismatch {
                expected: 2,
                actual: 1
            }
        );
        assert!(validate(
            &parse_type("bool[]").unwrap(),
            &Value::Array(vec![Value::Bool(true); 5])
        )
        .is_ok());
    }

    #[test]
    fn test_error_path_is_outermost_first() {
        let tuple = parse_tuple_type("(address,(bool,uint8[])[])").unwrap();
        let values = vec![
            Value::Address(Address::ZERO),
            Value::Array(vec![
                Value::Tuple(vec![Value::Bool(true), Value::Array(vec![])]),
                Value::Tuple(vec![
                    Value::Bool(false),
                    Value::Array(vec![Value::uint(1u64), Value::uint(300u64)]),
                ]),
            ]),
        ];
        let err = validate_tuple(&tuple, &values).unwrap_err();
        assert_eq!(err.path, vec![1, 1, 1, 1]);
        assert_eq!(err.kind, ValidationKind::BitLimitExceeded { limit: 8, actual: 9 });
    }

    #[test]
    fn test_arity_and_class_mismatch() {
        let tuple = parse_tuple_type("(bool,string)").unwrap();
        let err = validate_tuple(&tuple, &[Value::Bool(true)]).unwrap_err();
        assert_eq!(
            err.kind,
            ValidationKind::ArityMismatch {
                expected: 2,
                actual: 1
            }
        );
        assert!(err.path.is_empty());

        let err = validate_tuple(&tuple, &[Value::Bool(true), Value::bytes(vec![1])]).unwrap_err();
        assert_eq!(err.path, vec![1]);
        assert_eq!(
            err.kind,
            ValidationKind::ClassMismatch {
                expected: "string".into(),
                found: "bytes"
            }
        );
    }

    #[test]
    fn test_first_violation_wins() {
        let tuple = parse_tuple_type("(uint8,uint8)").unwrap();
        let err = validate_tuple(&tuple, &[Value::int(-1), Value::uint(999u64)]).unwrap_err();
        assert_eq!(err.path, vec![0]);
        assert_eq!(err.kind, ValidationKind::SignMismatch);
    }
}
