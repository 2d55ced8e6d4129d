use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use carebot_core::{load_config, CareConfig, CareServices, ChatTurnRequest, IntentMatcher};
use carebot_server::state::AppState;
use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "carebot", version, about = "carebot customer-care assistant")]
struct Cli {
    #[arg(
        long,
        default_value = ".",
        help = "Project root directory (contains config/ and logs/)"
    )]
    config_root: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Start the HTTP API server")]
    Serve {
        #[arg(long, help = "Bind address, overrides server.bind from main.yaml")]
        bind: Option<String>,
    },
    #[command(about = "Validate config files")]
    Validate,
    #[command(about = "Match a message against the intent rules (no remote calls)")]
    Intent {
        #[arg(help = "Customer message")]
        text: String,
    },
    #[command(about = "Send one chat turn, or read turns from stdin when no message is given")]
    Chat {
        #[arg(help = "Customer message")]
        message: Option<String>,
        #[arg(long, help = "Continue an existing session")]
        session: Option<String>,
    },
    #[command(about = "Classify and route a grievance")]
    Grievance {
        #[arg(help = "Grievance text")]
        text: String,
    },
    #[command(about = "Summarize, tag and score a call transcript")]
    Call {
        #[arg(long, short = 'f', help = "Read the transcript from a file")]
        file: Option<PathBuf>,
        #[arg(help = "Transcript text", conflicts_with = "file")]
        text: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_dir = cli.config_root.join("logs");
    std::fs::create_dir_all(&log_dir)?;
    let file_appender = tracing_appender::rolling::daily(&log_dir, "carebot.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("carebot=info,tower_http=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(non_blocking),
        )
        .init();

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    match command {
        Commands::Validate => {
            let config = resolve_config(&cli.config_root)?;
            println!(
                "Config valid. model {} at {}, {} intent rules, reply mode {:?}.",
                config.inference.model,
                config.inference.base_url,
                config.intent_rules.len(),
                config.reply.mode
            );
        }
        Commands::Intent { text } => {
            println!("{}", intent_matcher(&cli.config_root).match_intent(&text));
        }
        Commands::Serve { bind } => {
            let config = resolve_config(&cli.config_root)?;
            let addr = bind.unwrap_or_else(|| config.server.bind.clone());
            let services = CareServices::from_config(config)?;
            carebot_server::serve(AppState::new(services), &addr).await?;
        }
        Commands::Chat { message, session } => {
            let services = CareServices::from_config(resolve_config(&cli.config_root)?)?;
            match message {
                Some(message) => {
                    let mut request = ChatTurnRequest::text(message);
                    request.session_id = session;
                    let outcome = services.chat(request).await?;
                    print_json(&outcome)?;
                }
                None => chat_repl(&services, session).await?,
            }
        }
        Commands::Grievance { text } => {
            let services = CareServices::from_config(resolve_config(&cli.config_root)?)?;
            print_json(&services.grievance(&text).await?)?;
        }
        Commands::Call { file, text } => {
            let transcript = match (file, text) {
                (Some(path), _) => std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read transcript: {}", path.display()))?,
                (None, Some(text)) => text,
                (None, None) => anyhow::bail!("give a transcript or --file <path>"),
            };
            let services = CareServices::from_config(resolve_config(&cli.config_root)?)?;
            print_json(&services.analyze_call(&transcript).await?)?;
        }
    }

    Ok(())
}

/// `config/main.yaml` under the root when present, the environment otherwise.
fn resolve_config(root: &Path) -> Result<CareConfig> {
    let config_dir = root.join("config");
    if config_dir.join("main.yaml").is_file() {
        load_config(&config_dir)
    } else {
        tracing::debug!("no config/main.yaml under {}, using environment", root.display());
        CareConfig::from_env()
    }
}

/// Intent matching needs no credentials, so a config that fails to load falls
/// back to the built-in rules after a warning.
fn intent_matcher(root: &Path) -> IntentMatcher {
    match resolve_config(root) {
        Ok(config) => IntentMatcher::from_rules_or_default(&config.intent_rules),
        Err(err) => {
            tracing::warn!(
                error = %format!("{err:#}"),
                "config not loaded, using built-in intent rules"
            );
            IntentMatcher::default()
        }
    }
}

async fn chat_repl(services: &CareServices, mut session: Option<String>) -> Result<()> {
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    write!(stdout, "you> ")?;
    stdout.flush()?;

    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            write!(stdout, "you> ")?;
            stdout.flush()?;
            continue;
        }

        let mut request = ChatTurnRequest::text(line);
        request.session_id = session.clone();
        let outcome = services.chat(request).await?;
        session = Some(outcome.session_id.clone());

        writeln!(
            stdout,
            "bot> {}\n     [{} / {}]",
            outcome.response, outcome.detected_intent, outcome.sentiment
        )?;
        if outcome.escalate_to_human {
            writeln!(stdout, "     [handed off to a human agent]")?;
            break;
        }
        write!(stdout, "you> ")?;
        stdout.flush()?;
    }
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_call_with_file() {
        let cli = Cli::try_parse_from(["carebot", "call", "--file", "t.txt"]).unwrap();
        match cli.command {
            Some(Commands::Call { file, text }) => {
                assert_eq!(file, Some(PathBuf::from("t.txt")));
                assert!(text.is_none());
            }
            _ => panic!("expected call command"),
        }
    }

    #[test]
    fn cli_rejects_file_and_text_together() {
        assert!(Cli::try_parse_from(["carebot", "call", "--file", "t.txt", "hello"]).is_err());
    }

    #[test]
    fn cli_chat_message_is_optional() {
        let cli = Cli::try_parse_from(["carebot", "--config-root", "/srv/care", "chat"]).unwrap();
        assert_eq!(cli.config_root, PathBuf::from("/srv/care"));
        assert!(matches!(
            cli.command,
            Some(Commands::Chat { message: None, session: None })
        ));
    }

    #[test]
    fn resolve_config_reads_main_yaml_when_present() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("config")).unwrap();
        std::fs::write(
            tmp.path().join("config/main.yaml"),
            "inference:\n  api_key: sk-file\n  model: mixtral-8x7b\n",
        )
        .unwrap();

        let config = resolve_config(tmp.path()).unwrap();
        assert_eq!(config.inference.api_key, "sk-file");
        assert_eq!(config.inference.model, "mixtral-8x7b");
    }

    fn write_config(root: &Path, intents: &str) {
        std::fs::create_dir_all(root.join("config")).unwrap();
        std::fs::write(
            root.join("config/main.yaml"),
            "inference:\n  api_key: sk-file\n",
        )
        .unwrap();
        std::fs::write(root.join("config/intents.yaml"), intents).unwrap();
    }

    #[test]
    fn intent_matcher_uses_configured_rules() {
        let tmp = tempfile::TempDir::new().unwrap();
        write_config(
            tmp.path(),
            "rules:\n  - intent: order_status\n    phrases: [parcel]\n",
        );
        let matcher = intent_matcher(tmp.path());
        assert_eq!(matcher.rules().len(), 1);
        assert_eq!(matcher.match_intent("where is my parcel").as_str(), "order_status");
    }

    #[test]
    fn malformed_intents_file_falls_back_to_built_in_rules() {
        let tmp = tempfile::TempDir::new().unwrap();
        write_config(tmp.path(), "rules: [this is: not, valid");
        let matcher = intent_matcher(tmp.path());
        assert_eq!(matcher.rules(), carebot_core::intent::default_rules().as_slice());
    }
}
