//! Diagnostic command to check configuration and providers.

use secrecy::ExposeSecret;

use aiagent_core::ProviderOverrides;
use aiagent_providers::OllamaProvider;

use crate::AppContext;

pub async fn run(ctx: &AppContext) -> anyhow::Result<()> {
    println!("Running diagnostics...\n");

    let settings = &ctx.settings;
    println!("Project: {}", settings.project_name);
    println!("Log file: {}", settings.log_path().display());
    println!("Agent max iterations: {}", settings.agent_max_iterations);

    // Settings were validated on load; only warnings can remain.
    let validation = settings.validate();
    for warning in validation.warnings() {
        println!("  ! {}: {}", warning.field, warning.message);
    }

    println!("\nProviders:");
    for name in ctx.registry.names() {
        let marker = if name == ctx.provider_name() {
            " (selected)"
        } else {
            ""
        };
        match ctx.registry.resolve(settings, name, ProviderOverrides::none()) {
            Ok(provider) => {
                let model = provider.get_model();
                println!(
                    "  ✓ {}{} - model {} at {}",
                    provider.name(),
                    marker,
                    model.model_name(),
                    model.base_url()
                );
            }
            Err(e) => println!("  ✗ {}{} - {}", name, marker, e),
        }
    }

    println!("\nAPI Keys:");
    for (var, key) in [
        ("OPENAI_API_KEY", &settings.openai_api_key),
        ("GEMINI_API_KEY", &settings.gemini_api_key),
    ] {
        if key.expose_secret().is_empty() {
            println!("  ✗ {} is not set", var);
        } else {
            println!("  ✓ {} is set", var);
        }
    }

    println!("\nLocal Models (Ollama at {}):", settings.ollama_base_url);
    let ollama = match OllamaProvider::new(settings, ProviderOverrides::none()) {
        Ok(ollama) => ollama,
        Err(e) => {
            println!("  ✗ {}", e);
            println!("\nDiagnostics complete.");
            return Ok(());
        }
    };

    if ollama.is_running().await {
        println!("  ✓ Ollama is running");
        match ollama.list_models().await {
            Ok(models) if models.is_empty() => println!("  ✗ No models installed"),
            Ok(models) => {
                println!("  Available models:");
                for model in models.iter().take(5) {
                    let size_mb = model.size / 1024 / 1024;
                    println!("    - {} ({} MB)", model.name, size_mb);
                }
                if models.len() > 5 {
                    println!("    ... and {} more", models.len() - 5);
                }
                if !models.iter().any(|m| m.name == settings.ollama_model_name) {
                    println!(
                        "  ✗ Configured model {} is not pulled (ollama pull {})",
                        settings.ollama_model_name, settings.ollama_model_name
                    );
                }
            }
            Err(e) => println!("  ✗ Failed to list models: {}", e),
        }
    } else {
        println!("  ✗ Ollama is not running");
        println!("    Install from: https://ollama.ai");
    }

    println!("\nDiagnostics complete.");
    Ok(())
}
