use std::collections::HashMap;

/// Variable container: name to JSON value.
///
/// Serialization of values beyond JSON is the store's concern.
pub type Variables = HashMap<String, serde_json::Value>;
