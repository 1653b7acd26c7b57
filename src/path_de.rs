use serde::de::DeserializeOwned;

use crate::error::LoadError;

fn located(err: serde_path_to_error::Error<serde_json::Error>) -> LoadError {
    LoadError { path: err.path().to_string(), source: err.into_inner() }
}

/// Deserialize with JSON-path context in error messages.
pub fn from_slice_with_path<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, LoadError> {
    let de = &mut serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize::<_, T>(de).map_err(located)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Schema;

    #[test]
    fn schema_errors_name_the_failing_path() {
        let src = r#"{"types": [{"name": "T", "fields": [{"name": "x", "type": "string", "directives": [{"bogus": 1}]}]}]}"#;
        let err = from_slice_with_path::<Schema>(src.as_bytes()).unwrap_err();
        assert_eq!(err.path, "types[0].fields[0].directives[0]");
        assert!(err.to_string().contains("bogus"));
    }
}
