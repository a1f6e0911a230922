// ABOUTME: Custom serde deserializers for config types.
// ABOUTME: Validates image name segments and port mappings at parse time.

use serde::Deserialize;

use crate::runtime::traits::PortMapping;

/// A single lowercase image-name segment, e.g. a registry namespace.
pub fn deserialize_name_segment<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    validate_name_segment(&s).map_err(serde::de::Error::custom)?;
    Ok(s)
}

pub(super) fn validate_name_segment(s: &str) -> Result<(), String> {
    if s.is_empty() {
        return Err("name cannot be empty".to_string());
    }
    if let Some(c) = s
        .chars()
        .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '-' | '_')))
    {
        return Err(format!("invalid character '{}' in '{}'", c, s));
    }
    Ok(())
}

pub fn deserialize_ports<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let ports: Vec<String> = Vec::deserialize(deserializer)?;
    for port in &ports {
        if PortMapping::parse(port).is_none() {
            return Err(serde::de::Error::custom(format!(
                "invalid port mapping '{}'",
                port
            )));
        }
    }
    Ok(ports)
}
