//! Result type alias for CityKML
//!
//! This module provides a convenient Result type alias that uses CityKmlError
//! as the error type.

use super::errors::CityKmlError;

/// Result type alias for CityKML operations
///
/// # Examples
///
/// ```
/// use citykml::domain::result::Result;
/// use citykml::domain::errors::CityKmlError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(CityKmlError::Validation("Invalid input".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, CityKmlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_with_question_mark() -> Result<()> {
        fn inner() -> Result<i32> {
            Ok(42)
        }

        let value = inner()?;
        assert_eq!(value, 42);
        Ok(())
    }

    #[test]
    fn test_result_err() {
        let result: Result<i32> = Err(CityKmlError::Validation("test error".to_string()));
        assert!(result.is_err());
    }
}
