//! tg-relay setup wizard.
//!
//! Asks for the bot token, public webhook URL and provider keys on the
//! terminal and writes a commented `config.toml` to the project root
//! (`TG_RELAY_ROOT`, or the current directory). An existing file is only
//! replaced with `--force`.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

// ── Config formatting ──────────────────────────────────────────────────────────

struct ConfigParams<'a> {
    tg_token: &'a str,
    webhook_url: &'a str,
    provider: &'a str,
    llm_key: &'a str,
    model: &'a str,
    db_path: &'a str,
    speech_endpoint: &'a str,
    rapidapi_key: &'a str,
    ocr: bool,
}

/// Produces a valid config.toml string. Extracted so it can be unit-tested.
fn format_config(p: &ConfigParams<'_>) -> String {
    let tg_token = p.tg_token;
    let webhook_url = p.webhook_url;
    let provider = p.provider;
    let llm_key = p.llm_key;
    let model = p.model;
    let db_path = p.db_path;

    // Optional sections stay in the file, commented out, so they are easy to enable later
    let speech = if p.speech_endpoint.is_empty() {
        "# [speech]\n# endpoint = \"http://localhost:8080\"\n# replies = \"voice_only\"".to_owned()
    } else {
        format!(
            "[speech]\nendpoint = \"{}\"\nreplies = \"all\"\nffmpeg_path = \"ffmpeg\"",
            p.speech_endpoint
        )
    };

    let media = if p.rapidapi_key.is_empty() {
        "# [media]\n# rapidapi_key = \"\"  # or set X_RAPIDAPI_KEY".to_owned()
    } else {
        format!("[media]\nrapidapi_key = \"{}\"", p.rapidapi_key)
    };

    let ocr = if p.ocr {
        "[ocr]\ncommand = \"tesseract\""
    } else {
        "# [ocr]\n# command = \"tesseract\""
    };

    format!(
        r#"[telegram]
bot_token = "{tg_token}"
webhook_url = "{webhook_url}"

[server]
bind_address = "0.0.0.0:8000"

[llm]
provider = "{provider}"
api_key = "{llm_key}"
model = "{model}"
temperature = 1.0
max_tokens = 1024
top_p = 1.0

[transcription]
model = "whisper-large-v3"

{speech}

{media}

{ocr}

[storage]
database_path = "{db_path}"

[replies]
fallback_link = "https://blogforge.pythonanywhere.com/blogs/"
"#
    )
}

// ── CLI ────────────────────────────────────────────────────────────────────────

fn run_cli(project_root: &Path, force: bool) -> Result<()> {
    use std::io::{self, Write};

    let config_path = project_root.join("config.toml");
    if config_path.exists() && !force {
        bail!(
            "{} already exists, rerun with --force to overwrite it",
            config_path.display()
        );
    }

    println!("=== tg-relay setup ===\n");

    let read_line = |prompt: &str| -> Result<String> {
        print!("{prompt}");
        io::stdout().flush()?;
        let mut buf = String::new();
        io::stdin().read_line(&mut buf)?;
        Ok(buf.trim().to_owned())
    };

    let or_default = |s: String, default: &str| {
        if s.is_empty() {
            default.to_owned()
        } else {
            s
        }
    };

    let tg_token = read_line("Telegram bot token: ")?;
    let webhook_url = read_line("Public webhook URL (e.g. https://example.com/webhook): ")?;
    let provider = or_default(
        read_line("LLM provider (groq/openrouter/ollama/openai) [groq]: ")?,
        "groq",
    );
    let llm_key = read_line("LLM API key (empty to use LLM_API_KEY): ")?;
    let model = or_default(
        read_line("Model [llama-3.2-1b-preview]: ")?,
        "llama-3.2-1b-preview",
    );
    let speech_endpoint = read_line("TTS endpoint for voice replies (optional): ")?;
    let rapidapi_key = read_line("RapidAPI key for Twitter/X links (optional): ")?;
    let ocr = read_line("Enable OCR on photos via tesseract? [y/N]: ")?
        .eq_ignore_ascii_case("y");
    let db_path = or_default(read_line("Audit DB path [relay.db]: ")?, "relay.db");

    let config = format_config(&ConfigParams {
        tg_token: &tg_token,
        webhook_url: &webhook_url,
        provider: &provider,
        llm_key: &llm_key,
        model: &model,
        db_path: &db_path,
        speech_endpoint: &speech_endpoint,
        rapidapi_key: &rapidapi_key,
        ocr,
    });

    std::fs::write(&config_path, &config)
        .with_context(|| format!("Could not write {}", config_path.display()))?;

    println!("\n✓  config.toml saved to {}", config_path.display());
    println!("   Run the relay with:  cargo run");
    println!("   Then open http://<host>:8000/ once to register the webhook.");
    Ok(())
}

fn main() -> Result<()> {
    let force = std::env::args().any(|a| a == "--force");

    // Resolve project root: prefer TG_RELAY_ROOT env, fall back to cwd.
    let project_root =
        PathBuf::from(std::env::var("TG_RELAY_ROOT").unwrap_or_else(|_| ".".to_string()));

    run_cli(&project_root, force)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
