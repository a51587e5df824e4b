use super::service::ConfigError;
use super::settings::Settings;

pub fn validate_settings(settings: &Settings) -> Result<(), ConfigError> {
    let models = &settings.models;
    validate_required_string("models.embedder", &models.embedder)?;
    validate_required_string("models.generator", &models.generator)?;
    validate_required_string("models.base_url", &models.base_url)?;
    validate_range(
        "models.max_generation_tokens",
        models.max_generation_tokens as u64,
        1,
        32_768,
    )?;
    validate_range(
        "models.generation_timeout_secs",
        models.generation_timeout_secs,
        1,
        86_400,
    )?;
    validate_range(
        "models.request_timeout_secs",
        models.request_timeout_secs,
        1,
        86_400,
    )?;

    let retrieval = &settings.retrieval;
    validate_range("retrieval.top_k", retrieval.top_k as u64, 1, 1_000)?;
    validate_range(
        "retrieval.retrieve_multiplier",
        retrieval.retrieve_multiplier as u64,
        1,
        1_000,
    )?;
    validate_range(
        "retrieval.max_section_chars",
        retrieval.max_section_chars as u64,
        1,
        10_000_000,
    )?;
    let threshold = retrieval.similarity_threshold;
    if !threshold.is_finite() || !(-1.0..=1.0).contains(&threshold) {
        return Err(ConfigError::Invalid(format!(
            "'retrieval.similarity_threshold' must be between -1 and 1, got {}",
            threshold
        )));
    }

    validate_required_string(
        "index.vector_index_path",
        &settings.index.vector_index_path.to_string_lossy(),
    )?;
    validate_required_string("index.meta_path", &settings.index.meta_path.to_string_lossy())?;

    validate_required_string("server.host", &settings.server.host)?;
    for (index, origin) in settings.server.cors_origins.iter().enumerate() {
        validate_required_string(&format!("server.cors_origins[{}]", index), origin)?;
    }

    Ok(())
}

fn validate_range(path: &str, value: u64, min: u64, max: u64) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::Invalid(format!(
            "'{}' must be between {} and {}, got {}",
            path, min, max, value
        )));
    }
    Ok(())
}

fn validate_required_string(path: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Invalid(format!(
            "'{}' cannot be empty",
            path
        )));
    }
    Ok(())
}
