use serde::{Deserialize, Serialize};

/// Request de importación: el archivo viaja como base64 dentro del JSON,
/// igual que los adjuntos de email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRecipientsRequest {
    pub file_name: String,
    #[serde(
        serialize_with = "serialize_base64",
        deserialize_with = "deserialize_base64"
    )]
    pub content: Vec<u8>,
}

pub fn serialize_base64<S>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&base64::encode(data))
}

pub fn deserialize_base64<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    base64::decode(&s).map_err(serde::de::Error::custom)
}

/// Resultado de una importación: cuántas filas entraron, cuántas se
/// descartaron por email inválido y cuántas eran duplicadas.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub valid: u64,
    pub invalid: u64,
    pub duplicates: u64,
}
