//! Runtime parameter binding for package modules.
//!
//! Parameters live in the first input of a module. Binding rewrites that
//! input in place, so it must happen before the request for the next session
//! is built: a request already handed to the channel carries its own copy of
//! the package and never observes later bindings.

use blockstream_types::{ModuleInput, Package, PositionRange};
use tracing::debug;

use crate::error::ConfigurationError;

/// Rewrite the parameter string of `module`.
///
/// Returns `true` when the stored value changed, `false` when it already held
/// `value`.
pub fn bind(package: &mut Package, module: &str, value: &str) -> Result<bool, ConfigurationError> {
    let target = package
        .module_mut(module)
        .ok_or_else(|| ConfigurationError::ModuleNotFound(module.to_string()))?;

    match target.inputs.first_mut() {
        Some(ModuleInput::Params { value: current }) => {
            if current == value {
                return Ok(false);
            }
            debug!(module = %module, from = %current, to = %value, "Binding module params");
            *current = value.to_string();
            Ok(true)
        }
        _ => Err(ConfigurationError::ModuleHasNoParams(module.to_string())),
    }
}

/// Apply a list of `module=value` parameters, in order.
///
/// Everything after the first `=` is the value, so values may contain `=`.
pub fn apply_params<S: AsRef<str>>(
    package: &mut Package,
    params: &[S],
) -> Result<(), ConfigurationError> {
    for param in params {
        let param = param.as_ref();
        let (module, value) = param
            .split_once('=')
            .filter(|(module, _)| !module.trim().is_empty())
            .ok_or_else(|| ConfigurationError::MalformedParam(param.to_string()))?;
        bind(package, module.trim(), value)?;
    }
    Ok(())
}

/// Default parameter string for an active block window
pub fn window_param(range: &PositionRange) -> String {
    format!("Range {} - {}", range.start, range.resolved_stop())
}

#[cfg(test)]
mod tests {
    use blockstream_types::{Module, ModuleKind};

    use super::*;

    fn package() -> Package {
        Package {
            network: None,
            modules: vec![
                Module {
                    name: "map_block_meta".to_string(),
                    kind: ModuleKind::Map,
                    inputs: vec![
                        ModuleInput::Params {
                            value: String::new(),
                        },
                        ModuleInput::Source {
                            name: "sf.ethereum.type.v2.Block".to_string(),
                        },
                    ],
                    output_type: None,
                },
                Module {
                    name: "store_meta".to_string(),
                    kind: ModuleKind::Store,
                    inputs: vec![ModuleInput::Map {
                        module_name: "map_block_meta".to_string(),
                    }],
                    output_type: None,
                },
            ],
            types: vec![],
        }
    }

    #[test]
    fn test_bind_rewrites_params() {
        let mut package = package();
        let changed = bind(&mut package, "map_block_meta", "Range 1 - 2").unwrap();

        assert!(changed);
        assert_eq!(
            package.module("map_block_meta").unwrap().params(),
            Some("Range 1 - 2")
        );
    }

    #[test]
    fn test_bind_is_idempotent() {
        let mut package = package();
        assert!(bind(&mut package, "map_block_meta", "Range 1 - 2").unwrap());
        assert!(!bind(&mut package, "map_block_meta", "Range 1 - 2").unwrap());

        let before = package.clone();
        bind(&mut package, "map_block_meta", "Range 1 - 2").unwrap();
        assert_eq!(package, before);
    }

    #[test]
    fn test_bind_unknown_module() {
        let mut package = package();
        assert_eq!(
            bind(&mut package, "map_missing", "x"),
            Err(ConfigurationError::ModuleNotFound("map_missing".to_string()))
        );
    }

    #[test]
    fn test_bind_module_without_params() {
        let mut package = package();
        assert_eq!(
            bind(&mut package, "store_meta", "x"),
            Err(ConfigurationError::ModuleHasNoParams("store_meta".to_string()))
        );
    }

    #[test]
    fn test_apply_params() {
        let mut package = package();
        apply_params(&mut package, &["map_block_meta=Range 100000 - 100009"]).unwrap();
        assert_eq!(
            package.module("map_block_meta").unwrap().params(),
            Some("Range 100000 - 100009")
        );

        apply_params(&mut package, &["map_block_meta=a=b"]).unwrap();
        assert_eq!(package.module("map_block_meta").unwrap().params(), Some("a=b"));
    }

    #[test]
    fn test_apply_params_malformed() {
        let mut package = package();
        assert_eq!(
            apply_params(&mut package, &["no_separator"]),
            Err(ConfigurationError::MalformedParam("no_separator".to_string()))
        );
        assert_eq!(
            apply_params(&mut package, &["=value"]),
            Err(ConfigurationError::MalformedParam("=value".to_string()))
        );
    }

    #[test]
    fn test_window_param() {
        assert_eq!(
            window_param(&PositionRange::absolute(100_000, 100_009)),
            "Range 100000 - 100009"
        );
    }
}
