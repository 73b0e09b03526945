//! Config utils.

use std::collections::HashMap;
use std::str::FromStr;

use crate::core::error::CloudError;

/// Parses config value string, which consists of two parts - name and options.
/// Example: Mad[safety=2.5] parts are name Mad and options string "safety=2.5".
pub fn parse_config_value(config_str: &str) -> (String, Option<String>) {
    match config_str.split_once('[') {
        Some((l, r)) => (l.trim().to_string(), Some(r.to_string().replace(']', ""))),
        None => (config_str.trim().to_string(), None),
    }
}

/// Parses options string from config value, returns map with option names and values.
pub fn parse_options(options_str: &str) -> HashMap<String, String> {
    let mut options = HashMap::new();
    for option_str in options_str.split(',') {
        if let Some((name, value)) = option_str.split_once('=') {
            options.insert(name.trim().to_string(), value.trim().to_string());
        }
    }
    options
}

/// Returns the parsed value of the option or `default` if the option is absent.
pub fn parse_option<T: FromStr>(options: &HashMap<String, String>, name: &str, default: T) -> Result<T, CloudError> {
    match options.get(name) {
        Some(value) => value
            .parse::<T>()
            .map_err(|_| CloudError::Config(format!("invalid value of option {}: {}", name, value))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config_value() {
        assert_eq!(
            parse_config_value("Mad[safety=2.5,fallback=0.8]"),
            ("Mad".to_string(), Some("safety=2.5,fallback=0.8".to_string()))
        );
        assert_eq!(parse_config_value("FirstFit"), ("FirstFit".to_string(), None));
    }

    #[test]
    fn test_parse_options() {
        let options = parse_options("option1=0.8,option2=something");
        assert_eq!(options.get("option1").unwrap(), "0.8");
        assert_eq!(options.get("option2").unwrap(), "something");
        assert_eq!(options.get("option3"), None);

        assert_eq!(parse_option(&options, "option1", 0.5).unwrap(), 0.8);
        assert_eq!(parse_option(&options, "option3", 7).unwrap(), 7);
        assert!(parse_option::<f64>(&options, "option2", 0.).is_err());
    }
}
