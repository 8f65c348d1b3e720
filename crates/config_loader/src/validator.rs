//! 配置校验模块
//!
//! 校验规则：
//! - 派生规则 (validator): window >= 1, ba_freq >= 1, every_keyframe >= 1, scene 非空
//! - 阈值必须是有限数
//! - handshake.address 必须是合法的 socket 地址
//! - mono_prior.depth_pretrained 非空

use std::net::SocketAddr;

use contracts::{ContractError, SlamConfig};
use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

/// 校验 SlamConfig 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &SlamConfig) -> Result<(), ContractError> {
    validate_derived(config)?;
    validate_thresholds(config)?;
    validate_address(config)?;
    validate_mono_prior(config)?;
    Ok(())
}

/// 派生规则校验，错误映射到字段路径
fn validate_derived(config: &SlamConfig) -> Result<(), ContractError> {
    match config.validate() {
        Ok(()) => Ok(()),
        Err(errors) => {
            let (field, message) = first_violation(&errors, "")
                .unwrap_or_else(|| (String::from("<root>"), errors.to_string()));
            Err(ContractError::config_validation(field, message))
        }
    }
}

/// 按字段名排序后深度优先取第一个错误，保证输出稳定
fn first_violation(errors: &ValidationErrors, prefix: &str) -> Option<(String, String)> {
    let mut entries: Vec<_> = errors.errors().iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    for (field, kind) in entries {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(errs) => {
                if let Some(err) = errs.first() {
                    return Some((path, describe(err)));
                }
            }
            ValidationErrorsKind::Struct(inner) => {
                if let Some(found) = first_violation(inner, &path) {
                    return Some(found);
                }
            }
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    if let Some(found) = first_violation(inner, &format!("{path}[{index}]")) {
                        return Some(found);
                    }
                }
            }
        }
    }
    None
}

fn describe(err: &ValidationError) -> String {
    if let Some(message) = &err.message {
        return message.to_string();
    }
    match (err.code.as_ref(), err.params.get("min")) {
        ("range", Some(min)) => format!("must be >= {min}"),
        ("length", Some(min)) => format!("length must be >= {min}"),
        (code, _) => format!("failed '{code}' check"),
    }
}

/// 校验阈值为有限数 (NaN 会绕过区间比较)
fn validate_thresholds(config: &SlamConfig) -> Result<(), ContractError> {
    let checks = [
        (
            "tracking.motion_filter.thresh",
            config.tracking.motion_filter.thresh,
        ),
        (
            "tracking.frontend.keyframe_thresh",
            config.tracking.frontend.keyframe_thresh,
        ),
    ];
    for (field, value) in checks {
        if !value.is_finite() {
            return Err(ContractError::config_validation(
                field,
                format!("must be a finite number, got {value}"),
            ));
        }
    }
    Ok(())
}

/// 校验 TCP 地址
fn validate_address(config: &SlamConfig) -> Result<(), ContractError> {
    let address = &config.handshake.address;
    address.parse::<SocketAddr>().map_err(|e| {
        ContractError::config_validation(
            "handshake.address",
            format!("invalid socket address '{address}': {e}"),
        )
    })?;
    Ok(())
}

/// 校验单目深度先验
fn validate_mono_prior(config: &SlamConfig) -> Result<(), ContractError> {
    if let Some(prior) = &config.mono_prior {
        if prior.depth_pretrained.as_os_str().is_empty() {
            return Err(ContractError::config_validation(
                "mono_prior.depth_pretrained",
                format!("checkpoint path required for depth model '{}'", prior.depth),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{DepthModel, MonoPriorConfig};
    use std::path::PathBuf;

    fn field_of(err: ContractError) -> String {
        match err {
            ContractError::ConfigValidation { field, .. } => field,
            other => panic!("Expected ConfigValidation, got {other:?}"),
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&SlamConfig::default()).is_ok());
    }

    #[test]
    fn test_zero_every_keyframe() {
        let mut config = SlamConfig::default();
        config.mapping.every_keyframe = 0;
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("must be >="), "got: {err}");
        assert_eq!(field_of(err), "mapping.every_keyframe");
    }

    #[test]
    fn test_zero_ba_freq() {
        let mut config = SlamConfig::default();
        config.tracking.backend.ba_freq = 0;
        assert_eq!(
            field_of(validate(&config).unwrap_err()),
            "tracking.backend.ba_freq"
        );
    }

    #[test]
    fn test_zero_window() {
        let mut config = SlamConfig::default();
        config.tracking.frontend.window = 0;
        assert_eq!(
            field_of(validate(&config).unwrap_err()),
            "tracking.frontend.window"
        );
    }

    #[test]
    fn test_empty_scene() {
        let mut config = SlamConfig::default();
        config.scene.clear();
        assert_eq!(field_of(validate(&config).unwrap_err()), "scene");
    }

    #[test]
    fn test_nan_threshold() {
        let mut config = SlamConfig::default();
        config.tracking.motion_filter.thresh = f64::NAN;
        assert_eq!(
            field_of(validate(&config).unwrap_err()),
            "tracking.motion_filter.thresh"
        );
    }

    #[test]
    fn test_bad_address() {
        let mut config = SlamConfig::default();
        config.handshake.address = "localhost".into();
        assert_eq!(
            field_of(validate(&config).unwrap_err()),
            "handshake.address"
        );
    }

    #[test]
    fn test_empty_checkpoint_path() {
        let mut config = SlamConfig::default();
        config.mono_prior = Some(MonoPriorConfig {
            depth: DepthModel::Omnidata,
            depth_pretrained: PathBuf::new(),
        });
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("omnidata"));
        assert_eq!(field_of(err), "mono_prior.depth_pretrained");
    }
}
