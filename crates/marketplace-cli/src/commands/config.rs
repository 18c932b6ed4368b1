use std::env;

use marketplace_core::config::{
    ENV_API_KEY, ENV_GEOCODING_API_KEY, ENV_PROJECT_ID, ENV_STORAGE_BUCKET,
};

use crate::cli::ConfigCommands;
use crate::config_profiles::{default_config_path, normalize_text_option, CliProfilesConfig};
use crate::error::CliError;

/// Values passed to `config init`; unset ones fall back to env, then the stored profile.
#[derive(Debug, Default)]
pub struct ProfileInput {
    pub api_key: Option<String>,
    pub project_id: Option<String>,
    pub storage_bucket: Option<String>,
    pub geocoding_api_key: Option<String>,
}

pub fn run_config(command: ConfigCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            profile,
            api_key,
            project_id,
            storage_bucket,
            geocoding_api_key,
            no_activate,
        } => run_config_init(
            profile.as_deref().or(global_profile),
            ProfileInput {
                api_key,
                project_id,
                storage_bucket,
                geocoding_api_key,
            },
            no_activate,
        ),
        ConfigCommands::Show { profile } => run_config_show(profile.as_deref().or(global_profile)),
    }
}

pub fn run_config_init(
    profile_name: Option<&str>,
    input: ProfileInput,
    no_activate: bool,
) -> Result<(), CliError> {
    let mut config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(profile_name);
    merge_profile(&mut config, &profile_name, input, |key| env::var(key).ok())?;

    if !no_activate {
        config.active_profile = Some(profile_name.clone());
    }

    let path = config.save().map_err(CliError::Config)?;
    println!(
        "Profile '{}' initialized at {}",
        profile_name,
        path.display()
    );

    let profile = config
        .profile(&profile_name)
        .ok_or_else(|| CliError::Config("Failed to persist profile".to_string()))?;
    let missing_fields = profile.missing_fields();
    if missing_fields.is_empty() {
        println!(
            "Profile '{profile_name}' is ready. Run `marketplace auth login --email <email> --password <password>`."
        );
    } else {
        println!(
            "Profile '{}' is missing: {}",
            profile_name,
            missing_fields.join(", ")
        );
    }

    Ok(())
}

/// Merge explicit values, then env vars, then what the profile already holds.
pub fn merge_profile(
    config: &mut CliProfilesConfig,
    profile_name: &str,
    input: ProfileInput,
    lookup_env: impl Fn(&str) -> Option<String>,
) -> Result<(), CliError> {
    let merge = |explicit: Option<String>, env_key: &str, existing: Option<String>| {
        normalize_text_option(explicit)
            .or_else(|| normalize_text_option(lookup_env(env_key)))
            .or_else(|| normalize_text_option(existing))
    };

    let existing = config.profile(profile_name).cloned().unwrap_or_default();
    let profile = config.profile_mut_or_default(profile_name);
    profile.api_key = merge(input.api_key, ENV_API_KEY, existing.api_key);
    profile.project_id = merge(input.project_id, ENV_PROJECT_ID, existing.project_id);
    profile.storage_bucket = merge(
        input.storage_bucket,
        ENV_STORAGE_BUCKET,
        existing.storage_bucket,
    );
    profile.geocoding_api_key = merge(
        input.geocoding_api_key,
        ENV_GEOCODING_API_KEY,
        existing.geocoding_api_key,
    );

    if let Some(project_id) = &profile.project_id {
        if project_id.contains('/') {
            return Err(CliError::Config(
                "project_id must not contain '/'".to_string(),
            ));
        }
    }
    Ok(())
}

pub fn run_config_show(profile_name: Option<&str>) -> Result<(), CliError> {
    let config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(profile_name);
    let path = default_config_path().map_err(CliError::Config)?;
    println!("Config file: {}", path.display());

    let Some(profile) = config.profile(&profile_name) else {
        println!("Profile '{profile_name}' is not configured.");
        return Ok(());
    };

    let set_or_missing = |value: &Option<String>| if value.is_some() { "set" } else { "missing" };
    println!("Profile:            {profile_name}");
    println!("API key:            {}", set_or_missing(&profile.api_key));
    println!(
        "Project ID:         {}",
        profile.project_id.as_deref().unwrap_or("missing")
    );
    println!(
        "Storage bucket:     {}",
        profile.storage_bucket.as_deref().unwrap_or("missing")
    );
    println!(
        "Geocoding:          {}",
        if profile.geocoding_api_key.is_some() {
            "enabled"
        } else {
            "disabled (coordinates entered manually)"
        }
    );
    Ok(())
}
