//! Remote payload adapters
//!
//! Exposes remote objects to the matcher through a small field-lookup
//! capability instead of depending on each payload's concrete shape.

use serde_json::Value;

/// A remote object the identity matcher can inspect.
pub trait RemoteMatchable {
    /// Remote identifier, if present and non-empty.
    fn id(&self) -> Option<String>;

    /// String value of a named field.
    fn field(&self, name: &str) -> Option<String>;
}

/// JSON payload returned by a remote list or fetch call.
///
/// Lookups try the outer object first and then, if configured, one level
/// of embedded payload (`{"eventGatewayInfo": {"id": .., "name": ..}}`).
#[derive(Debug, Clone, Copy)]
pub struct RemoteObject<'a> {
    raw: &'a Value,
    embedded: Option<&'static str>,
}

impl<'a> RemoteObject<'a> {
    pub fn new(raw: &'a Value) -> Self {
        Self {
            raw,
            embedded: None,
        }
    }

    pub fn with_embedded(raw: &'a Value, embedded: Option<&'static str>) -> Self {
        Self { raw, embedded }
    }

    pub fn raw(&self) -> &'a Value {
        self.raw
    }

    fn lookup(object: &Value, name: &str) -> Option<String> {
        let map = object.as_object()?;
        let value = map.get(name).or_else(|| {
            let wanted = capitalize_first(name);
            map.iter()
                .find(|(key, _)| capitalize_first(key) == wanted)
                .map(|(_, v)| v)
        })?;
        scalar_to_string(value)
    }
}

impl RemoteMatchable for RemoteObject<'_> {
    fn id(&self) -> Option<String> {
        self.field("id").filter(|id| !id.is_empty())
    }

    fn field(&self, name: &str) -> Option<String> {
        Self::lookup(self.raw, name).or_else(|| {
            let inner = self.raw.get(self.embedded?)?;
            Self::lookup(inner, name)
        })
    }
}

/// Normalize a field name by capitalizing its first character.
pub fn capitalize_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_lookup_is_first_letter_case_insensitive() {
        let value = json!({"Name": "billing", "id": "42"});
        let object = RemoteObject::new(&value);
        assert_eq!(object.field("name").as_deref(), Some("billing"));
        assert_eq!(object.field("Name").as_deref(), Some("billing"));
        assert_eq!(object.id().as_deref(), Some("42"));
    }

    #[test]
    fn test_embedded_payload_is_second_choice() {
        let value = json!({
            "id": "outer",
            "eventGatewayInfo": {"id": "inner", "name": "events"}
        });
        let object = RemoteObject::with_embedded(&value, Some("eventGatewayInfo"));
        assert_eq!(object.id().as_deref(), Some("outer"));
        assert_eq!(object.field("name").as_deref(), Some("events"));

        let plain = RemoteObject::new(&value);
        assert_eq!(plain.field("name"), None);
    }

    #[test]
    fn test_empty_id_is_absent() {
        let value = json!({"id": "", "name": "x"});
        assert_eq!(RemoteObject::new(&value).id(), None);
    }

    #[test]
    fn test_non_scalar_fields_are_ignored() {
        let value = json!({"labels": {"a": "b"}, "count": 3, "enabled": true});
        let object = RemoteObject::new(&value);
        assert_eq!(object.field("labels"), None);
        assert_eq!(object.field("count").as_deref(), Some("3"));
        assert_eq!(object.field("enabled").as_deref(), Some("true"));
    }
}
