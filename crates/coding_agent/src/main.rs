use anyhow::Result;
use clap::Parser;
use coding_agent::app::{App, HostOps};
use coding_agent::config::{Cli, Config};
use coding_agent::models::{auto_pick_model, available_models_line, process_env, ModelName};
use coding_agent::repl::{ConsoleHost, PromptLine};
use coding_agent::tools::ShellTool;
use glassbox::Console;
use session_log::SessionLogger;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let config = Config::resolve(Cli::parse(), &process_env)?;
    let mut host = ConsoleHost::new(Console::new(), config.provider_source)?;
    let mut logger = SessionLogger::with_file_counter(&config.session_root, config.transcript_format);
    host.ui().info(&format!(
        "Session logging to: {}",
        logger.session_dir().display()
    ));

    let model = config.model.unwrap_or_else(|| startup_model(&mut host));
    let mut app = App::new(
        model,
        config.approval,
        config.system_instructions,
        ShellTool::new(config.shell_timeout),
    );
    host.ui()
        .info("Glassbox ready. Type your request. Use /model, /approval, /new.");

    while !app.should_exit {
        match host.read_prompt()? {
            PromptLine::Line(line) => app.on_submit(&line, &mut logger, &mut host),
            PromptLine::Interrupted => {
                host.ui().info("Exiting. Bye.");
                break;
            }
            PromptLine::Eof => {
                host.ui().info("EOF. Bye.");
                break;
            }
        }
    }

    host.save_history();
    Ok(())
}

fn startup_model(host: &mut ConsoleHost) -> ModelName {
    let available = host.available_models();
    let model = auto_pick_model(&available);
    if available.is_empty() {
        host.ui().info(&available_models_line(&available));
    } else if model != ModelName::default() {
        host.ui().info(&format!("Using available model: {model}"));
    }
    model
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
