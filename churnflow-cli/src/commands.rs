//! CLI subcommand handlers.

use crate::Commands;
use crate::ConfigAction;
use churnflow_core::config::CONFIG_FILE_NAME;
use churnflow_core::{PipelineConfig, load_config};
use churnflow_ml::PipelineOrchestrator;
use std::path::Path;

/// Handle a CLI subcommand.
pub async fn handle_command(
    command: Commands,
    workspace: &Path,
    config_file: Option<&Path>,
) -> anyhow::Result<()> {
    match command {
        Commands::Train { json } => handle_train(workspace, config_file, json).await,
        Commands::Predict { input, output } => {
            handle_predict(workspace, config_file, &input, output.as_deref()).await
        }
        Commands::Config { action } => handle_config(action, workspace, config_file),
    }
}

fn resolve_config(workspace: &Path, config_file: Option<&Path>) -> anyhow::Result<PipelineConfig> {
    let config = load_config(Some(workspace), config_file)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
    Ok(config.with_workspace(workspace))
}

async fn handle_train(
    workspace: &Path,
    config_file: Option<&Path>,
    json: bool,
) -> anyhow::Result<()> {
    let config = resolve_config(workspace, config_file)?;
    let pipeline = PipelineOrchestrator::from_config(config)?;
    let report = pipeline.train().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "Trained {} on {} rows ({} train / {} validation)",
        report.model, report.n_rows, report.n_train, report.n_validation
    );
    if let Some(accuracy) = report.validation_accuracy {
        println!("  validation accuracy: {accuracy:.4}");
    }
    if let Some(loss) = report.validation_log_loss {
        println!("  validation log loss: {loss:.4}");
    }
    for receipt in &report.artifacts {
        match &receipt.remote_key {
            Some(key) => println!("  {} -> {} (remote: {key})", receipt.logical_path, receipt.local_path.display()),
            None => println!("  {} -> {}", receipt.logical_path, receipt.local_path.display()),
        }
    }
    Ok(())
}

async fn handle_predict(
    workspace: &Path,
    config_file: Option<&Path>,
    input: &Path,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let mut config = resolve_config(workspace, config_file)?;
    if let Some(output) = output {
        config.prediction.output_path = output.to_path_buf();
    }
    let pipeline = PipelineOrchestrator::from_config(config)?;
    let prediction = pipeline.predict_file(input).await?;

    println!(
        "Scored {} rows over classes [{}] -> {}",
        prediction.probabilities.nrows(),
        prediction.class_labels.join(", "),
        prediction.output_path.display()
    );
    Ok(())
}

fn handle_config(
    action: ConfigAction,
    workspace: &Path,
    config_file: Option<&Path>,
) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let config_path = workspace.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                println!(
                    "Configuration file already exists at: {}",
                    config_path.display()
                );
                return Ok(());
            }

            let toml_str = toml::to_string_pretty(&PipelineConfig::default())?;
            std::fs::create_dir_all(workspace)?;
            std::fs::write(&config_path, &toml_str)?;
            println!(
                "Created default configuration at: {}",
                config_path.display()
            );
            Ok(())
        }
        ConfigAction::Show => {
            let config = load_config(Some(workspace), config_file)
                .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
            println!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
    }
}
