use super::settings::{Settings, StorageBackend};
use crate::core::errors::ConfigError;

pub fn validate_settings(settings: &Settings) -> Result<(), ConfigError> {
    validate_required_string(
        "huggingface.chat_model (HF_MODEL)",
        settings.huggingface.chat_model.as_deref(),
    )?;
    validate_required_string(
        "huggingface.embedding_model",
        Some(settings.huggingface.embedding_model.as_str()),
    )?;
    validate_required_string(
        "huggingface.base_url",
        Some(settings.huggingface.base_url.as_str()),
    )?;
    validate_u64_range(
        "huggingface.http_timeout_secs",
        settings.huggingface.http_timeout_secs,
        1,
        3_600,
    )?;

    if settings.backend == StorageBackend::Supabase {
        validate_required_string("supabase.url (SUPABASE_URL)", settings.supabase.url.as_deref())?;
        validate_required_string("supabase.key (SUPABASE_KEY)", settings.supabase.key.as_deref())?;
        // pgvector columns stop at 16000 dimensions.
        validate_u64_range(
            "supabase.embedding_dimension",
            settings.supabase.embedding_dimension as u64,
            1,
            16_000,
        )?;
    }

    let retrieval = &settings.retrieval;
    validate_u64_range("retrieval.top_k", retrieval.top_k as u64, 1, 100)?;
    validate_u64_range(
        "retrieval.embed_batch_size",
        retrieval.embed_batch_size as u64,
        1,
        1_024,
    )?;
    validate_f32_range(
        "retrieval.supabase_match_threshold",
        retrieval.supabase_match_threshold,
        -1.0,
        1.0,
    )?;
    if let Some(threshold) = retrieval.local_match_threshold {
        validate_f32_range("retrieval.local_match_threshold", threshold, -1.0, 1.0)?;
    }

    validate_u64_range(
        "generation.max_tokens",
        u64::from(settings.generation.max_tokens),
        1,
        8_192,
    )?;
    validate_f32_range(
        "generation.temperature",
        settings.generation.temperature,
        0.0,
        2.0,
    )?;

    Ok(())
}

fn validate_required_string(path: &str, value: Option<&str>) -> Result<(), ConfigError> {
    match value {
        Some(text) if !text.trim().is_empty() => Ok(()),
        Some(_) => Err(ConfigError::Invalid(format!(
            "'{}': value cannot be empty",
            path
        ))),
        None => Err(ConfigError::Invalid(format!(
            "'{}': value is required",
            path
        ))),
    }
}

fn validate_u64_range(path: &str, value: u64, min: u64, max: u64) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::Invalid(format!(
            "'{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_f32_range(path: &str, value: f32, min: f32, max: f32) -> Result<(), ConfigError> {
    if !value.is_finite() || value < min || value > max {
        return Err(ConfigError::Invalid(format!(
            "'{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}
