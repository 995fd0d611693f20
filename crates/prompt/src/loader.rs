//! Loader for persona role overrides.
//!
//! Overrides live in `<workspace>/.nexus/personas/<persona>.yml`. Only the
//! role description can be replaced.

use crate::persona::Persona;
use crate::types::PersonaDefinition;
use nexus_core::{AppError, AppResult};
use std::path::{Path, PathBuf};

/// Path of the override file for `persona` inside `personas_dir`.
pub fn override_path(personas_dir: &Path, persona: Persona) -> PathBuf {
    personas_dir.join(format!("{}.yml", persona.as_str()))
}

/// Load the role override for a persona, if one exists.
///
/// # Returns
/// `Ok(None)` when no override file is present, the parsed definition when
/// it is valid, and `AppError::Prompt` when the file is unreadable or invalid.
///
/// # Example
/// ```no_run
/// use nexus_prompt::{load_persona_override, Persona};
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// if let Some(def) = load_persona_override(Path::new(".nexus/personas"), Persona::Ops)? {
///     println!("Ops role: {}", def.role);
/// }
/// # Ok(())
/// # }
/// ```
pub fn load_persona_override(
    personas_dir: &Path,
    persona: Persona,
) -> AppResult<Option<PersonaDefinition>> {
    let persona_file = override_path(personas_dir, persona);

    if !persona_file.exists() {
        return Ok(None);
    }

    tracing::debug!("Loading persona override from: {:?}", persona_file);

    let contents = std::fs::read_to_string(&persona_file).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to read persona file {:?}: {}",
            persona_file, e
        ))
    })?;

    let definition: PersonaDefinition = serde_yaml::from_str(&contents).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to parse persona YAML {:?}: {}",
            persona_file, e
        ))
    })?;

    validate_definition(&definition, persona)?;

    tracing::info!("Loaded role override for persona {}", persona);

    Ok(Some(definition))
}

/// List personas that have an override file.
pub fn list_persona_overrides(personas_dir: &Path) -> AppResult<Vec<Persona>> {
    if !personas_dir.exists() {
        return Ok(Vec::new());
    }

    let mut personas = Vec::new();

    for entry in walkdir::WalkDir::new(personas_dir)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("yml") {
            if let Some(persona) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|stem| stem.parse::<Persona>().ok())
            {
                personas.push(persona);
            }
        }
    }

    Ok(personas)
}

fn validate_definition(def: &PersonaDefinition, expected: Persona) -> AppResult<()> {
    if def.persona != expected {
        return Err(AppError::Prompt(format!(
            "Persona file for '{}' declares persona '{}'",
            expected, def.persona
        )));
    }

    if def.role.trim().is_empty() {
        return Err(AppError::Prompt(format!(
            "Role for persona '{}' cannot be empty",
            expected
        )));
    }

    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_override(dir: &Path, file: &str, content: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join(file), content).unwrap();
    }

    #[test]
    fn test_missing_override_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let result = load_persona_override(temp_dir.path(), Persona::Ops).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_load_valid_override() {
        let temp_dir = TempDir::new().unwrap();
        write_override(
            temp_dir.path(),
            "ops.yml",
            "apiVersion: \"1.0\"\npersona: ops\nrole: You are the on-call SRE.\n",
        );

        let def = load_persona_override(temp_dir.path(), Persona::Ops)
            .unwrap()
            .unwrap();
        assert_eq!(def.role, "You are the on-call SRE.");
    }

    #[test]
    fn test_mismatched_persona_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        write_override(
            temp_dir.path(),
            "ops.yml",
            "apiVersion: \"1.0\"\npersona: product\nrole: Wrong file.\n",
        );

        let result = load_persona_override(temp_dir.path(), Persona::Ops);
        assert!(matches!(result, Err(AppError::Prompt(_))));
    }

    #[test]
    fn test_invalid_yaml_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        write_override(temp_dir.path(), "product.yml", "invalid: yaml: content:");

        assert!(load_persona_override(temp_dir.path(), Persona::Product).is_err());
    }

    #[test]
    fn test_empty_role_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        write_override(
            temp_dir.path(),
            "engineering.yml",
            "apiVersion: \"1.0\"\npersona: engineering\nrole: \"  \"\n",
        );

        assert!(load_persona_override(temp_dir.path(), Persona::Engineering).is_err());
    }

    #[test]
    fn test_list_overrides_skips_unknown_files() {
        let temp_dir = TempDir::new().unwrap();
        let body = "apiVersion: \"1.0\"\npersona: ops\nrole: r\n";
        write_override(temp_dir.path(), "ops.yml", body);
        write_override(temp_dir.path(), "marketing.yml", body);
        write_override(temp_dir.path(), "notes.txt", "ignored");

        let personas = list_persona_overrides(temp_dir.path()).unwrap();
        assert_eq!(personas, vec![Persona::Ops]);
    }
}
