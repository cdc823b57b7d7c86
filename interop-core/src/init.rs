use log::{debug, info};

use crate::config::Config;
use crate::registry::{global, ConversionRegistry};
use crate::types::Result;

/// Build the sealed registry described by `config`.
///
/// Built-ins are always present. Each configured domain converter is
/// registered in order with the configured conflict policy, then the
/// registry is sealed.
pub fn init(config: &Config) -> Result<ConversionRegistry> {
    let mut registry = ConversionRegistry::new();
    for converter in &config.converters {
        converter
            .register(&mut registry, config.on_conflict, &config.default_tzone)
            .map_err(|e| e.with_context(format!("registering `{}`", converter)))?;
    }
    registry.seal();
    debug!("Registered converters: {}", registry.registered().len());
    info!(
        "Conversion registry initialized with {} domain converter(s)",
        config.converters.len()
    );
    Ok(registry)
}

/// [`init`], then install the result process-wide.
pub fn init_global(config: &Config) -> Result<&'static ConversionRegistry> {
    global::install(init(config)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DomainConverter, SparseMatrix};
    use crate::registry::OnConflict;

    #[test]
    fn init_registers_and_seals() {
        let registry = init(&Config::default()).unwrap();
        assert!(registry.is_sealed());
        assert!(registry.contains::<SparseMatrix>());
        assert!(registry.contains::<Vec<f64>>());
    }

    #[test]
    fn repeated_converter_follows_policy() {
        let mut config = Config {
            converters: vec![DomainConverter::Factor, DomainConverter::Factor],
            ..Config::default()
        };
        let err = init(&config).unwrap_err();
        assert!(err.is_duplicate_converter());
        assert_eq!(err.context(), &["registering `factor`".to_string()]);

        config.on_conflict = OnConflict::Overwrite;
        assert!(init(&config).is_ok());
    }

    #[test]
    fn empty_config_keeps_builtins_only() {
        let config = Config {
            converters: vec![],
            ..Config::default()
        };
        let registry = init(&config).unwrap();
        assert!(!registry.contains::<SparseMatrix>());
        assert!(registry.contains::<String>());
    }
}
