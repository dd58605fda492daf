//! Documents handed to `insert` and the normalized records returned from
//! queries, plus the stored-parameters blob contract shared by all drivers.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Reserved stored field carrying the encoded parameters blob.
///
/// The blob is the standard-alphabet base64 encoding of the parameters
/// serialized as canonical JSON (object keys in sorted order). It is
/// stored on every backend but never indexed or searched. The format is
/// stable; indexes written by one version decode in any other.
pub const PARAMETERS_FIELD: &str = "_parameters";

/// A single item to be indexed.
///
/// `fields` are indexed and returned with results; `parameters` are
/// stored opaquely and only come back on retrieval. Inserting a document
/// whose id already exists replaces the previous document.
///
/// # Examples
///
/// ```
/// use sagitta::document::Document;
///
/// let doc = Document::builder()
///     .id("42")
///     .field("title", "red shoes")
///     .parameter("sku", "A1")
///     .build();
/// assert_eq!(doc.id, "42");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Stable external identifier.
    pub id: String,
    /// Indexed field values.
    pub fields: Map<String, Value>,
    /// Opaque stored parameters.
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

impl Document {
    /// Create an empty document with the given id.
    pub fn new<S: Into<String>>(id: S) -> Self {
        Document {
            id: id.into(),
            fields: Map::new(),
            parameters: Map::new(),
        }
    }

    /// Create a builder for constructing documents.
    pub fn builder() -> DocumentBuilder {
        DocumentBuilder::new()
    }

    /// The encoded parameters blob, or `None` when there are none.
    pub fn encoded_parameters(&self) -> Option<String> {
        if self.parameters.is_empty() {
            None
        } else {
            Some(encode_parameters(&self.parameters))
        }
    }
}

/// A builder for constructing documents in a fluent manner.
#[derive(Debug, Default)]
pub struct DocumentBuilder {
    id: String,
    fields: Map<String, Value>,
    parameters: Map<String, Value>,
}

impl DocumentBuilder {
    /// Create a new document builder.
    pub fn new() -> Self {
        DocumentBuilder::default()
    }

    /// Set the document id. Integer ids convert via `to_string`.
    pub fn id<S: ToString>(mut self, id: S) -> Self {
        self.id = id.to_string();
        self
    }

    /// Add an indexed field.
    pub fn field<S: Into<String>, V: Into<Value>>(mut self, name: S, value: V) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Add a stored, non-indexed parameter.
    pub fn parameter<S: Into<String>, V: Into<Value>>(mut self, name: S, value: V) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    /// Build the document.
    pub fn build(self) -> Document {
        Document {
            id: self.id,
            fields: self.fields,
            parameters: self.parameters,
        }
    }
}

/// A normalized search hit.
///
/// Every record carries the backend identifier and, when the backend
/// scores results, a relevance score. `fields` holds all backend-returned
/// fields with decoded parameters merged on top (decoded values win ties
/// with indexed fields of the same name); the raw blob field is stripped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Backend identifier of the hit.
    pub id: String,
    /// Relevance score, when the backend reports one.
    #[serde(rename = "_score", skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    /// Merged field values.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Record {
    /// Create a record with no fields.
    pub fn new<S: Into<String>>(id: S, score: Option<f64>) -> Self {
        Record {
            id: id.into(),
            score,
            fields: Map::new(),
        }
    }

    /// Build a record from raw backend fields.
    ///
    /// Decodes and merges the parameters blob if present, strips the blob
    /// field itself, and lets decoded parameters win ties.
    pub fn from_source<S: Into<String>>(
        id: S,
        score: Option<f64>,
        mut fields: Map<String, Value>,
    ) -> Self {
        let parameters = fields
            .remove(PARAMETERS_FIELD)
            .as_ref()
            .and_then(Value::as_str)
            .map(decode_parameters)
            .unwrap_or_default();

        for (name, value) in parameters {
            fields.insert(name, value);
        }

        Record {
            id: id.into(),
            score,
            fields,
        }
    }

    /// Get a field value.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

/// Encode a parameter map into the transport-safe blob.
pub fn encode_parameters(parameters: &Map<String, Value>) -> String {
    // Map keys serialize in sorted order, so the encoding is canonical.
    let json = serde_json::to_string(parameters).unwrap_or_else(|_| "{}".to_string());
    BASE64.encode(json)
}

/// Decode a parameters blob, best-effort.
///
/// Anything that fails to decode (bad base64, bad JSON, a non-object)
/// yields an empty map rather than an error.
pub fn decode_parameters(blob: &str) -> Map<String, Value> {
    let Ok(bytes) = BASE64.decode(blob) else {
        return Map::new();
    };

    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder() {
        let doc = Document::builder()
            .id(42)
            .field("title", "red shoes")
            .parameter("sku", "A1")
            .build();

        assert_eq!(doc.id, "42");
        assert_eq!(doc.fields.get("title"), Some(&json!("red shoes")));
        assert_eq!(doc.parameters.get("sku"), Some(&json!("A1")));
    }

    #[test]
    fn test_parameters_roundtrip() {
        let doc = Document::builder()
            .id("1")
            .parameter("sku", "A1")
            .parameter("stock", 3)
            .build();

        let blob = doc.encoded_parameters().unwrap();
        let decoded = decode_parameters(&blob);

        assert_eq!(decoded.get("sku"), Some(&json!("A1")));
        assert_eq!(decoded.get("stock"), Some(&json!(3)));
    }

    #[test]
    fn test_empty_parameters_have_no_blob() {
        let doc = Document::builder().id("1").field("title", "x").build();
        assert_eq!(doc.encoded_parameters(), None);
    }

    #[test]
    fn test_decode_tolerates_garbage() {
        assert!(decode_parameters("not base64 at all!").is_empty());

        let not_json = BASE64.encode("definitely not json");
        assert!(decode_parameters(&not_json).is_empty());

        let not_object = BASE64.encode("[1, 2, 3]");
        assert!(decode_parameters(&not_object).is_empty());
    }

    #[test]
    fn test_record_merges_decoded_parameters() {
        let mut fields = Map::new();
        fields.insert("title".to_string(), json!("red shoes"));
        // Indexed field colliding with a stored parameter.
        fields.insert("sku".to_string(), json!("stale"));

        let mut parameters = Map::new();
        parameters.insert("sku".to_string(), json!("A1"));
        fields.insert(
            PARAMETERS_FIELD.to_string(),
            json!(encode_parameters(&parameters)),
        );

        let record = Record::from_source("42", Some(1.0), fields);

        assert_eq!(record.id, "42");
        assert_eq!(record.get("title"), Some(&json!("red shoes")));
        // Decoded parameters win ties.
        assert_eq!(record.get("sku"), Some(&json!("A1")));
        // The raw blob never leaks into results.
        assert_eq!(record.get(PARAMETERS_FIELD), None);
    }
}
