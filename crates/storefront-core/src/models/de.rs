//! Lenient deserializers for fields the backend encodes inconsistently.

use serde::{Deserialize, Deserializer};

/// Long ids are serialized as strings to avoid precision loss in JavaScript
/// clients, but some endpoints still send plain numbers.
pub fn id<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(i64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid id: {:?}", s))),
    }
}

pub fn optional_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Wrapper(#[serde(deserialize_with = "id")] i64);

    Ok(Option::<Wrapper>::deserialize(deserializer)?.map(|Wrapper(v)| v))
}

/// Roles arrive either as bare strings or as role objects.
pub fn roles<'de, D, C>(deserializer: D) -> Result<C, D::Error>
where
    D: Deserializer<'de>,
    C: FromIterator<String>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Name(String),
        Object {
            #[serde(default)]
            name: Option<String>,
            #[serde(default)]
            code: Option<String>,
        },
    }

    let raw: Option<Vec<Raw>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(|r| match r {
            Raw::Name(name) => Some(name),
            Raw::Object { name, code } => name.or(code),
        })
        .collect())
}
