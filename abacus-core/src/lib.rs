//! Abacus Core - Fundamental types
//!
//! This crate provides the core types used throughout Abacus:
//! - `Number`: Exact decimal operands and results
//! - `CalcError`: Structured errors returned as values

mod number;
mod error;

pub use number::{Number, NumberError, DEFAULT_PRECISION, EXPONENT_LIMIT};
pub use error::{CalcError, Severity, codes};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{Number, CalcError, Severity};
    pub use crate::error::codes;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(s: &str) -> Number {
        s.parse().unwrap()
    }

    mod number_tests {
        use super::*;

        #[test]
        fn test_from_i64() {
            let n = Number::from_i64(42);
            assert_eq!(n.to_i64(), Some(42));
        }

        #[test]
        fn test_parse_integer() {
            assert_eq!(num("123").to_i64(), Some(123));
        }

        #[test]
        fn test_parse_decimal() {
            let n = num("3.14");
            assert!(!n.is_integer());
            assert_eq!(n.to_string(), "3.14");
            assert!(num("2.000").is_integer());
        }

        #[test]
        fn test_parse_signs_and_whitespace() {
            assert_eq!(num("  -7 ").to_i64(), Some(-7));
            assert_eq!(num("+7").to_i64(), Some(7));
            assert_eq!(num(".5").to_string(), "0.5");
            assert_eq!(num("5.").to_string(), "5");
        }

        #[test]
        fn test_parse_scientific() {
            assert_eq!(num("1.5e2").to_i64(), Some(150));
            assert_eq!(num("1.5e2").to_string(), "1.5E+2");
            assert_eq!(num("602214076e15").to_string(), "6.02214076E+23");
            assert_eq!(num("25e-2").to_string(), "0.25");
            assert_eq!(num("1E-7").to_string(), "1E-7");
        }

        #[test]
        fn test_parse_rejects_garbage() {
            for bad in ["a", "", "   ", ".", "1e", "e5", "NaN", "inf", "Infinity", "1/3", "0x10", "1,5", "--1", "1e+-2"] {
                assert!(bad.parse::<Number>().is_err(), "{bad:?} should not parse");
            }
        }

        #[test]
        fn test_parse_error_keeps_input() {
            let err = "abc".parse::<Number>().unwrap_err();
            assert_eq!(err, NumberError::ParseError("abc".to_string()));
        }

        #[test]
        fn test_parse_rejects_out_of_range_exponent() {
            for bad in [
                "1e100000000000000000", "1e1000000", "-5e-1000000", "1e99999999999999999999",
                "1e-9223372036854775808", "12e9223372036854775807", "0e-9223372036854775808",
            ] {
                assert_eq!(
                    bad.parse::<Number>(),
                    Err(NumberError::ParseError(bad.to_string())),
                    "{bad:?}"
                );
            }
            assert!("1e999999".parse::<Number>().is_ok());
            assert!("1e-999999".parse::<Number>().is_ok());
        }

        #[test]
        fn test_large_magnitudes_render_compactly() {
            let big = num("1e999999");
            assert_eq!(big.to_string(), "1E+999999");
            assert_eq!(big.mul(&num("1")).unwrap().to_string(), "1E+999999");
            let sum = num("1e999999").add(&num("1")).unwrap();
            assert_eq!(sum.to_string(), format!("1.{}E+999999", "0".repeat(DEFAULT_PRECISION - 1)));
        }

        #[test]
        fn test_result_out_of_range() {
            let big = num("9e999999");
            assert_eq!(big.mul(&num("10")), Err(NumberError::Overflow));
            assert_eq!(big.add(&big), Err(NumberError::Overflow));
            assert_eq!(num("1e-999999").checked_div(&num("1e5")), Err(NumberError::Overflow));
        }

        #[test]
        fn test_exact_decimal_addition() {
            // 0.1 + 0.2 is exactly 0.3 in base 10
            let sum = num("0.1").add(&num("0.2")).unwrap();
            assert_eq!(sum, num("0.3"));
            assert_eq!(sum.to_string(), "0.3");
        }

        #[test]
        fn test_arithmetic() {
            assert_eq!(num("5").add(&num("3")).unwrap().to_string(), "8");
            assert_eq!(num("10").sub(&num("2")).unwrap().to_string(), "8");
            assert_eq!(num("6").mul(&num("4")).unwrap().to_string(), "24");
            assert_eq!(num("3").sub(&num("5")).unwrap().to_string(), "-2");
        }

        #[test]
        fn test_scale_is_carried() {
            assert_eq!(num("1.50").add(&num("2.5")).unwrap().to_string(), "4.00");
            assert_eq!(num("2.50").mul(&num("2")).unwrap().to_string(), "5.00");
            assert_eq!(num("1.5").sub(&num("1.5")).unwrap().to_string(), "0.0");
            assert_eq!(num("0.000").add(&num("5")).unwrap().to_string(), "5.000");
            assert_eq!(num("4.0").checked_div(&num("2")).unwrap().to_string(), "2.0");
        }

        #[test]
        fn test_results_rounded_half_even() {
            let long = format!("1{}", "0".repeat(50));
            // 10^50 + 5 rounds to even at 50 significant digits
            let sum = num(&long).add(&num("5")).unwrap();
            assert_eq!(sum, num(&long));
            let sum = num(&long).add(&num("15")).unwrap();
            assert_eq!(sum, num(&long).add(&num("20")).unwrap());
        }

        #[test]
        fn test_checked_div() {
            assert_eq!(num("20").checked_div(&num("4")).unwrap().to_string(), "5");
            assert_eq!(num("1").checked_div(&num("8")).unwrap().to_string(), "0.125");
            assert_eq!(num("0").checked_div(&num("5")).unwrap().to_string(), "0");
            assert_eq!(num("-9").checked_div(&num("2")).unwrap().to_string(), "-4.5");
            assert_eq!(num("1").checked_div(&num("0")), Err(NumberError::DivisionByZero));
            assert_eq!(num("-9.5").checked_div(&num("0.0")), Err(NumberError::DivisionByZero));
        }

        #[test]
        fn test_non_terminating_division_is_rounded() {
            let third = num("1").checked_div(&num("3")).unwrap().to_string();
            assert_eq!(third, format!("0.{}", "3".repeat(DEFAULT_PRECISION)));
            let two_thirds = num("2").checked_div(&num("3")).unwrap().to_string();
            assert!(two_thirds.ends_with("667"));
        }

        #[test]
        fn test_pow() {
            assert_eq!(num("2").pow(10).unwrap().to_i64(), Some(1024));
            assert_eq!(num("2").pow(-2).unwrap().to_string(), "0.25");
            assert_eq!(num("7").pow(0).unwrap().to_i64(), Some(1));
            assert_eq!(num("0").pow(-1), Err(NumberError::DivisionByZero));
            assert_eq!(num("1e1000").pow(1000), Err(NumberError::Overflow));
        }

        #[test]
        fn test_display_keeps_scale() {
            assert_eq!(num("2.50").to_string(), "2.50");
            assert_eq!(num("1.000").to_string(), "1.000");
            assert_eq!(num("1200").to_string(), "1200");
            assert_eq!(num("-0.0").to_string(), "0.0");
            assert_eq!(num("0.007").to_string(), "0.007");
            assert_eq!(num("0.0000001").to_string(), "1E-7");
        }

        #[test]
        fn test_ordering_and_equality() {
            assert_eq!(num("2.0"), num("2"));
            assert_eq!(num("1.5e2"), num("150.00"));
            assert!(num("-1") < num("0.5"));
            assert!(num("-2") < num("-1.5"));
            assert!(num("1e-5") < num("2e-5"));
            assert!(num("99") < num("1e2"));
            assert_eq!(num("-4").abs(), num("4"));
            assert_eq!(num("4").neg(), num("-4"));
        }

        #[test]
        fn test_serde_as_string() {
            let json = serde_json::to_string(&num("12.50")).unwrap();
            assert_eq!(json, "\"12.50\"");
            let back: Number = serde_json::from_str(&json).unwrap();
            assert_eq!(back, num("12.5"));
        }
    }

    mod error_tests {
        use super::*;

        #[test]
        fn test_error_display_is_message() {
            let err = CalcError::div_zero();
            assert_eq!(err.to_string(), "Cannot divide by zero.");
            assert!(err.is(codes::DIV_ZERO));
        }

        #[test]
        fn test_from_number_error() {
            let err: CalcError = NumberError::ParseError("x".into()).into();
            assert_eq!(err.code, codes::PARSE_ERROR);

            let err: CalcError = NumberError::DivisionByZero.into();
            assert_eq!(err.code, codes::DIV_ZERO);

            let err: CalcError = NumberError::Overflow.into();
            assert_eq!(err.code, codes::DOMAIN_ERROR);
        }

        #[test]
        fn test_plugin_load_is_warning() {
            let err = CalcError::plugin_load("broken.toml", "bad formula");
            assert_eq!(err.severity, Severity::Warning);
            assert!(err.message.contains("broken.toml"));
        }

        #[test]
        fn test_error_serialization() {
            let err = CalcError::unknown_operation("modulo");
            let json = serde_json::to_value(&err).unwrap();
            assert_eq!(json["code"], "UNKNOWN_OPERATION");
            assert_eq!(json["severity"], "error");
        }
    }
}
