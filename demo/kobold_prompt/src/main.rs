use clap::Parser;
use kobold_core::{KoboldClient, KoboldConfig, KoboldSettings};
use std::io::Read;
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Prompt to complete; read from stdin when omitted (trailing line breaks dropped)
    prompt: Option<String>,

    /// TOML settings laid over the KOBOLD_* environment variables
    #[arg(short, long, env = "KOBOLD_CONFIG", default_value = "kobold.toml")]
    config: PathBuf,

    /// Tokens to hold back from the configured max_length
    #[arg(short, long, default_value_t = 0, allow_negative_numbers = true)]
    reserved_tokens: i64,
}

/// Use the argument if given, otherwise all of `input` minus its final line breaks.
fn read_prompt(arg: Option<String>, mut input: impl Read) -> std::io::Result<String> {
    if let Some(p) = arg {
        return Ok(p);
    }
    let mut buf = String::new();
    input.read_to_string(&mut buf)?;
    let trimmed = buf.trim_end_matches(['\n', '\r']).len();
    buf.truncate(trimmed);
    Ok(buf)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logging / tracing
    let filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "info,kobold_core=info,kobold_prompt=info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let prompt = read_prompt(args.prompt, std::io::stdin().lock())?;

    // Defaults + env + optional TOML overlay
    let settings = KoboldSettings::load(&args.config)?;
    let client = KoboldClient::new(KoboldConfig::from_settings(settings))?;
    info!(
        target: "kobold_prompt",
        url = %client.generate_url(),
        model = %client.config().model(),
        "Sending prompt"
    );

    match client.generate(&prompt, args.reserved_tokens).await {
        Ok(text) => {
            println!("{text}");
            Ok(())
        }
        Err(e) => {
            error!(target: "kobold_prompt", error = %e, "Generation failed");
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stdin_prompt_loses_trailing_newlines() {
        let prompt = read_prompt(None, "Write a haiku\n".as_bytes()).unwrap();
        assert_eq!(prompt, "Write a haiku");

        let prompt = read_prompt(None, "line one\nline two\r\n\n".as_bytes()).unwrap();
        assert_eq!(prompt, "line one\nline two");
    }

    #[test]
    fn stdin_prompt_keeps_leading_and_inner_whitespace() {
        let prompt = read_prompt(None, "  indented\n\nbody \n".as_bytes()).unwrap();
        assert_eq!(prompt, "  indented\n\nbody ");
    }

    #[test]
    fn argument_prompt_is_used_verbatim() {
        let prompt = read_prompt(Some("Hi\n".into()), "ignored".as_bytes()).unwrap();
        assert_eq!(prompt, "Hi\n");
    }
}
