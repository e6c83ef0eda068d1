use super::schema::Config;

/// Validate configuration at startup.
/// Returns all validation errors at once (not just the first).
pub fn validate_config(config: &Config) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if let Some(location) = config.location {
        if !(-90.0..=90.0).contains(&location.lat) {
            errors.push(format!("location.lat: {} is outside -90..90", location.lat));
        }
        if !(-180.0..=180.0).contains(&location.lon) {
            errors.push(format!("location.lon: {} is outside -180..180", location.lon));
        }
    }

    check_duration(&mut errors, "almanac.timeout", config.almanac.timeout.as_deref());
    check_duration(&mut errors, "weather.timeout", config.weather.timeout.as_deref());
    check_duration(&mut errors, "cache.ttl", config.cache.ttl.as_deref());

    if let Some(ref template) = config.almanac.url_template {
        if !template.contains("{date}") {
            errors.push(format!(
                "almanac.url_template: '{}' has no {{date}} placeholder",
                template
            ));
        }
        if !is_http_url(template) {
            errors.push(format!("almanac.url_template: '{}' is not an http(s) URL", template));
        }
    }

    if let Some(ref base_url) = config.weather.base_url {
        if !is_http_url(base_url) {
            errors.push(format!("weather.base_url: '{}' is not an http(s) URL", base_url));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_duration(errors: &mut Vec<String>, field: &str, value: Option<&str>) {
    if let Some(value) = value {
        if let Err(e) = humantime::parse_duration(value.trim()) {
            errors.push(format!("{}: invalid duration '{}' - {}", field, value, e));
        }
    }
}

fn is_http_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}
