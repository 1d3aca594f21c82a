use crate::error::EngineError;

/// The unit of work behind a streamed task: a synchronous function of a
/// query string. Implementations must be callable from any thread.
pub trait LookupAgent: Send + Sync {
    fn search(&self, query: &str) -> Result<String, EngineError>;
}

const PREFIX: &str = "weather in";

/// Deterministic placeholder lookup. Always sunny.
#[derive(Clone, Copy, Debug, Default)]
pub struct WeatherLookup;

impl WeatherLookup {
    pub fn new() -> Self {
        Self
    }
}

impl LookupAgent for WeatherLookup {
    fn search(&self, query: &str) -> Result<String, EngineError> {
        let location = normalise_location(query);
        tracing::debug!(query, location, "weather lookup");
        if location.is_empty() {
            return Ok("Please provide a valid location.".to_string());
        }
        Ok(format!("Weather in {location}: Sunny 25°C"))
    }
}

/// Strip an optional `weather in` prefix and surrounding punctuation.
fn normalise_location(raw: &str) -> &str {
    let mut rest = raw.trim();

    let has_prefix = rest
        .get(..PREFIX.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(PREFIX));
    if has_prefix {
        rest = rest[PREFIX.len()..].trim_start();
        rest = rest.strip_prefix(':').unwrap_or(rest);
    }

    rest.trim_start_matches(|c: char| c.is_whitespace() || matches!(c, ',' | ':' | '-'))
        .trim_end_matches(|c: char| c.is_whitespace() || matches!(c, '?' | '.' | '!'))
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn search(q: &str) -> String {
        WeatherLookup.search(q).unwrap()
    }

    #[test]
    fn blank_query_asks_for_location() {
        assert_eq!(search(""), "Please provide a valid location.");
        assert_eq!(search("   "), "Please provide a valid location.");
        assert_eq!(search("weather in"), "Please provide a valid location.");
        assert_eq!(search("weather in: ?!"), "Please provide a valid location.");
    }

    #[test]
    fn strips_prefix_case_insensitively() {
        assert_eq!(search("weather in London"), "Weather in London: Sunny 25°C");
        assert_eq!(search("Weather in LA, CA? "), "Weather in LA, CA: Sunny 25°C");
        assert_eq!(search("WEATHER IN: Paris"), "Weather in Paris: Sunny 25°C");
    }

    #[test]
    fn leaves_plain_locations_alone() {
        assert_eq!(search("New York, NY"), "Weather in New York, NY: Sunny 25°C");
    }

    #[test]
    fn trims_leading_and_trailing_punctuation() {
        assert_eq!(search(" - , Berlin!!"), "Weather in Berlin: Sunny 25°C");
        assert_eq!(search("weather in - Tokyo..."), "Weather in Tokyo: Sunny 25°C");
    }

    #[test]
    fn multibyte_input_does_not_panic() {
        assert_eq!(search("天气 北京"), "Weather in 天气 北京: Sunny 25°C");
        assert_eq!(search("wé"), "Weather in wé: Sunny 25°C");
    }

    #[test]
    fn usable_as_trait_object() {
        let agent: std::sync::Arc<dyn LookupAgent> = std::sync::Arc::new(WeatherLookup::new());
        assert_eq!(
            agent.search("weather in Paris").unwrap(),
            "Weather in Paris: Sunny 25°C"
        );
    }
}
