use serde::{Deserialize, Serialize};

/// Static capability descriptor returned by `agent_card`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCard {
    pub name: String,
    pub description: String,
    pub url: String,
    pub version: String,
    pub protocol_version: String,
    pub default_input_modes: Vec<String>,
    pub default_output_modes: Vec<String>,
    pub skills: Vec<AgentSkill>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentSkill {
    pub id: String,
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub examples: Vec<String>,
}

impl AgentCard {
    /// Card for the weather lookup agent served at `url`.
    pub fn weather(url: impl Into<String>) -> Self {
        Self {
            name: "Weather Agent".into(),
            description: "Helps with weather".into(),
            url: url.into(),
            version: "1.0.0".into(),
            protocol_version: "0.3.0".into(),
            default_input_modes: vec!["text".into()],
            default_output_modes: vec!["text".into()],
            skills: vec![AgentSkill {
                id: "weather_search".into(),
                name: "Search weather".into(),
                description: "Helps with weather in cities or states".into(),
                tags: vec!["weather".into()],
                examples: vec!["weather in LA, CA".into()],
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weather_card_wire_shape() {
        let card = AgentCard::weather("http://localhost:10001");
        let v = serde_json::to_value(&card).unwrap();
        assert_eq!(v["name"], "Weather Agent");
        assert_eq!(v["protocolVersion"], "0.3.0");
        assert_eq!(v["defaultInputModes"][0], "text");
        assert_eq!(v["skills"][0]["id"], "weather_search");
        assert_eq!(v["url"], "http://localhost:10001");
    }
}
