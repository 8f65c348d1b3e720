//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::SlamConfig;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    scene: String,
    clear_init: bool,
    only_tracking: bool,
    every_keyframe: u64,
    ba_freq: u64,
    enable_online_ba: bool,
    address: String,
    wire_format: String,
    ack_timeout_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    depth_model: Option<String>,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(summarize(&config)),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

fn summarize(config: &SlamConfig) -> ConfigSummary {
    ConfigSummary {
        scene: config.scene.clone(),
        clear_init: config.clear_init,
        only_tracking: config.only_tracking,
        every_keyframe: config.mapping.every_keyframe,
        ba_freq: config.tracking.backend.ba_freq,
        enable_online_ba: config.tracking.frontend.enable_online_ba,
        address: config.handshake.address.clone(),
        wire_format: config.handshake.format.as_str().to_string(),
        ack_timeout_ms: config.handshake.ack_timeout_ms,
        depth_model: config.mono_prior.as_ref().map(|m| m.depth.to_string()),
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &SlamConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.only_tracking {
        warnings.push("only_tracking is set - the mapper will never be notified".to_string());
    }

    if !config.only_tracking && config.handshake.ack_timeout_ms == 0 {
        warnings.push(
            "handshake.ack_timeout_ms is 0 - a stalled mapper blocks the tracker indefinitely"
                .to_string(),
        );
    }

    if !config.tracking.frontend.enable_online_ba {
        warnings.push(
            "tracking.frontend.enable_online_ba is off - no global BA during tracking".to_string(),
        );
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Scene: {}", summary.scene);
            println!("  Clear init: {}", summary.clear_init);
            println!("  Only tracking: {}", summary.only_tracking);
            println!("  Notify every: {} keyframe(s)", summary.every_keyframe);
            println!(
                "  Global BA: {} (every {} keyframes)",
                if summary.enable_online_ba { "on" } else { "off" },
                summary.ba_freq
            );
            println!("  Mapper: {} ({})", summary.address, summary.wire_format);
            if let Some(ref model) = summary.depth_model {
                println!("  Depth prior: {}", model);
            }
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn validate_str(content: &str) -> ValidationResult {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(file, "{content}").unwrap();
        validate_config(&ValidateArgs {
            config: file.path().to_path_buf(),
            json: true,
        })
    }

    const BASE: &str = r#"
scene = "room0"

[tracking.frontend]
window = 25
enable_online_ba = true

[tracking.motion_filter]
thresh = 4.0

[tracking.backend]
ba_freq = 20

[mapping]
every_keyframe = 1
"#;

    #[test]
    fn test_valid_config_summary() {
        let result = validate_str(BASE);
        assert!(result.valid);
        let summary = result.summary.unwrap();
        assert_eq!(summary.scene, "room0");
        assert_eq!(summary.wire_format, "json");
        assert!(summary.depth_model.is_none());

        let warnings = result.warnings.unwrap();
        assert!(warnings.iter().any(|w| w.contains("ack_timeout_ms")));
    }

    #[test]
    fn test_unknown_depth_model_is_invalid() {
        let content = format!(
            "{BASE}\n[mono_prior]\ndepth = \"midas\"\ndepth_pretrained = \"ckpt\"\n"
        );
        let result = validate_str(&content);
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("midas"));
    }

    #[test]
    fn test_missing_file() {
        let result = validate_config(&ValidateArgs {
            config: "/nonexistent/slam.toml".into(),
            json: false,
        });
        assert!(!result.valid);
        assert!(result.summary.is_none());
    }
}
