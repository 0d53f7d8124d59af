//! toolbuddy - Main CLI Entry Point

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use toolbuddy::{
    agent::{RunReport, ToolCallingAgent},
    chain::{research_and_calculate, ChainManager, SeedContext, SequentialChainRunner},
    cli::{parse_assignment, Args, Commands, Config, Verbosity},
    model::OllamaClient,
    tools::{implementations::builtin_registry, ParallelDispatcher},
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let verbosity = args.verbosity();
    init_tracing(verbosity);

    let config = load_config(&args)?;

    match &args.command {
        Commands::Ask { question, stream } => {
            let question = question.join(" ");
            if *stream {
                ask_streamed(&config, &question).await?;
            } else {
                ask(&config, verbosity, &question).await?;
            }
        }
        Commands::Chat => {
            chat(&config, verbosity).await?;
        }
        Commands::Chain { name, input, set } => {
            run_chain(&config, verbosity, name, input, set).await?;
        }
        Commands::Tools => {
            list_tools(&config)?;
        }
        Commands::Config => {
            show_config(&args, &config)?;
        }
    }

    Ok(())
}

/// RUST_LOG wins over the verbosity flags
fn init_tracing(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.filter_directive()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Load the config file and apply command-line overrides
fn load_config(args: &Args) -> Result<Config> {
    let mut config =
        Config::load(args.config.as_deref()).context("Failed to load configuration")?;

    if let Some(model) = &args.model {
        config.model.name = model.clone();
    }
    if let Some(url) = &args.ollama_url {
        config.model.ollama_url = url.clone();
    }
    if args.no_tools {
        config.agent.enable_tool_calling = false;
    }

    Ok(config)
}

fn build_dispatcher(config: &Config) -> ParallelDispatcher {
    let registry = builtin_registry(
        &config.tools.search_api_key_env,
        &config.tools.serper_api_key_env,
    );
    ParallelDispatcher::new(Arc::new(registry))
        .with_max_parallel(config.tools.max_parallel_tools)
        .with_timeout(config.tool_timeout())
}

async fn build_agent(config: &Config) -> Result<ToolCallingAgent<OllamaClient>> {
    let client = OllamaClient::with_config(
        &config.model.ollama_url,
        &config.model.name,
        config.request_timeout(),
    )
    .context("Failed to create Ollama client")?;

    if !client.health_check().await {
        eprintln!(
            "{} Ollama is not reachable at {} (start it with: ollama serve)",
            "⚠".yellow(),
            config.model.ollama_url
        );
    }

    Ok(ToolCallingAgent::new(
        config.agent.clone(),
        client,
        build_dispatcher(config),
    ))
}

fn spinner(verbosity: Verbosity, message: &str) -> Option<ProgressBar> {
    if !verbosity.show_progress() {
        return None;
    }

    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    Some(pb)
}

fn print_report(report: &RunReport, verbosity: Verbosity) {
    println!("{}", report.answer);

    if verbosity.show_stats() {
        println!();
        println!(
            "{} {} model call(s), {} tool round(s), {} tool call(s){}",
            "ℹ".cyan(),
            report.model_calls,
            report.iterations,
            report.tool_calls,
            if report.forced_final {
                ", final answer forced by iteration cap"
            } else {
                ""
            }
        );
    }
}

async fn ask(config: &Config, verbosity: Verbosity, question: &str) -> Result<()> {
    let mut agent = build_agent(config).await?;

    let pb = spinner(verbosity, "Thinking...");
    let result = agent.run_with_report(question).await;
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    let report = result.context("Agent run failed")?;
    print_report(&report, verbosity);

    if verbosity.show_stats() {
        println!("\n{}", agent.telemetry().summary());
    }
    Ok(())
}

async fn ask_streamed(config: &Config, question: &str) -> Result<()> {
    let mut agent = build_agent(config).await?;

    let mut stdout = std::io::stdout();
    agent
        .stream_run(question, |piece| {
            print!("{}", piece);
            let _ = stdout.flush();
        })
        .await
        .context("Agent run failed")?;
    println!();
    Ok(())
}

async fn chat(config: &Config, verbosity: Verbosity) -> Result<()> {
    let mut agent = build_agent(config).await?;
    let mut editor = DefaultEditor::new().context("Failed to initialize line editor")?;

    println!("{}", format!("{} chat", config.agent.name).bold().cyan());
    println!(
        "Commands: {} {} {} {}\n",
        "/tools".green(),
        "/clear".green(),
        "/stats".green(),
        "/exit".green()
    );

    loop {
        let line = match editor.readline(&format!("{} ", ">".cyan())) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e).context("Failed to read input"),
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        let _ = editor.add_history_entry(input);

        match input {
            "/exit" | "/quit" => break,
            "/clear" => {
                agent.clear_history();
                println!("{}", "History cleared".green());
                continue;
            }
            "/tools" => {
                for name in agent.list_tools() {
                    println!("  {}", name.green());
                }
                continue;
            }
            "/stats" => {
                println!("{}", agent.telemetry().summary());
                continue;
            }
            _ => {}
        }

        let pb = spinner(verbosity, "Thinking...");
        let result = agent.run_with_report(input).await;
        if let Some(pb) = pb {
            pb.finish_and_clear();
        }

        match result {
            Ok(report) => {
                print_report(&report, verbosity);
                println!();
            }
            Err(e) => eprintln!("{} {}", "✗".red(), e),
        }
    }

    println!("{}", "Goodbye!".green());
    Ok(())
}

async fn run_chain(
    config: &Config,
    verbosity: Verbosity,
    name: &str,
    input: &str,
    assignments: &[String],
) -> Result<()> {
    let mut seed = SeedContext::new();
    for raw in assignments {
        let (key, value) = parse_assignment(raw).map_err(anyhow::Error::msg)?;
        seed.insert(key, value);
    }

    let mut manager = ChainManager::new(SequentialChainRunner::new(build_dispatcher(config)));
    manager.register(research_and_calculate()?);

    let pb = spinner(verbosity, &format!("Running chain '{}'...", name));
    let result = manager.execute(name, input, Some(&seed)).await;
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    let output = result.with_context(|| format!("Chain '{}' failed", name))?;
    if verbosity.show_stats() {
        for (key, value) in output.context.iter() {
            println!("{} {}", format!("{}:", key).bold(), value);
        }
        println!();
    }
    println!("{}", output.result);
    Ok(())
}

fn list_tools(config: &Config) -> Result<()> {
    let dispatcher = build_dispatcher(config);
    let registry = dispatcher.registry();

    println!("{}", "Tools:".bold().cyan());
    for name in registry.tool_names() {
        let description = registry
            .lookup(&name)
            .map(|t| t.description().to_string())
            .unwrap_or_default();
        println!("  {:<14} {}", name.green(), description);
    }

    let mut manager = ChainManager::new(SequentialChainRunner::new(dispatcher.clone()));
    manager.register(research_and_calculate()?);

    println!("\n{}", "Chains:".bold().cyan());
    for name in manager.list() {
        let description = manager.get(name).map(|c| c.description()).unwrap_or("");
        println!("  {:<24} {}", name.green(), description);
    }
    Ok(())
}

fn show_config(args: &Args, config: &Config) -> Result<()> {
    let path = match &args.config {
        Some(path) => path.clone(),
        None => Config::default_path()?,
    };

    println!("{} {}", "Config file:".bold(), path.display());
    println!();
    println!(
        "{}",
        toml::to_string_pretty(config).context("Failed to render configuration")?
    );
    Ok(())
}
