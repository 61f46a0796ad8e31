//! Main module for the Marin CLI application (`marin`).
//!
//! Loads the configuration, builds the memory index from the seed knowledge base, and
//! dispatches to the requested subcommand.
//!
//! ```sh
//! marin init
//! marin ask "Tell me about cosplay"
//! marin search "sewing" -k 5
//! marin interactive
//! ```

use clap::Parser;
use crossterm::{
    ExecutableCommand,
    style::{Attribute, Color, Print, SetAttribute, SetForegroundColor},
};
use once_cell::sync::OnceCell;
use std::{
    error::Error,
    fs,
    io::{BufRead, Write, stdout},
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::{debug, info};

use marin_memory::{
    commands::{Cli, Commands},
    config::{self, MarinConfig},
    config_dir, default_seed,
    generator::OpenAiGenerator,
    index::MemoryIndex,
    knowledge_base::{KnowledgeBase, SeedFile},
    pipeline::{GenerateRequest, Pipeline},
    retriever::Retriever,
    template::{self, PersonaTemplate},
    writer::MemoryWriter,
};

static TRACING: OnceCell<()> = OnceCell::new();

fn main() -> Result<(), Box<dyn Error>> {
    TRACING.get_or_init(|| {
        tracing_subscriber::fmt::init();
    });
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run())
}

async fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let config_path = match cli.config {
        Some(path) => path,
        None => config_dir()?.join("config.yaml"),
    };

    if let Commands::Init = cli.command {
        debug!("Initializing configuration");
        return init(&config_path);
    }

    let base_dir = base_dir_of(&config_path);

    let marin_config = config::load_config(&config_path)?;
    debug!("Config loaded: {:?}", marin_config);

    let pipeline = bootstrap(&marin_config, &base_dir).await?;

    match cli.command {
        Commands::Ask { query } => {
            let response = pipeline.generate(GenerateRequest { query }).await?;
            print_answer(&response.response)?;
        }
        Commands::Search { query, top_k } => {
            for hit in pipeline.retriever().recall(&query, top_k).await {
                println!("{:.3}  [{}] {}", hit.score, hit.position, hit.text);
            }
        }
        Commands::Interactive => interactive_mode(&pipeline).await?,
        Commands::Init => {}
    }

    Ok(())
}

/// Directory holding the config file. Seed and templates are resolved against it.
fn base_dir_of(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Startup: seed load and bulk build. Any failure here ends the process.
async fn bootstrap(marin_config: &MarinConfig, base_dir: &Path) -> Result<Pipeline, Box<dyn Error>> {
    let fragments = KnowledgeBase::load(marin_config.knowledge_base_path_in(base_dir))?;
    let embedder = marin_config.embedding_provider()?;
    let index = MemoryIndex::bootstrap(fragments, embedder.as_ref())
        .await?
        .into_shared();
    info!("Knowledge base encoded and indexed successfully");

    let template_path = base_dir.join(format!("templates/{}.yaml", marin_config.template));
    let persona = if template_path.exists() {
        template::load_template_from(&template_path)?
    } else {
        info!("No template at {}, using the default persona", template_path.display());
        PersonaTemplate::marin()
    };

    Ok(Pipeline::new(
        Retriever::new(index.clone(), Arc::clone(&embedder)),
        MemoryWriter::new(index, embedder),
        Arc::new(OpenAiGenerator::new(marin_config)),
        persona,
        marin_config.top_k,
    ))
}

fn print_answer(answer: &str) -> Result<(), Box<dyn Error>> {
    let mut stdout = stdout();
    stdout.execute(SetForegroundColor(Color::Blue))?;
    stdout.execute(SetAttribute(Attribute::Bold))?;
    stdout.execute(Print(answer))?;
    stdout.execute(SetAttribute(Attribute::Reset))?;
    stdout.execute(SetForegroundColor(Color::Reset))?;
    writeln!(stdout)?;
    Ok(())
}

/// Chat on stdin until the user types `exit`. Memory grows with every turn.
async fn interactive_mode(pipeline: &Pipeline) -> Result<(), Box<dyn Error>> {
    let stdin = std::io::stdin();
    let mut stdout = stdout();

    loop {
        stdout.execute(Print("\nYou: "))?;
        stdout.execute(SetForegroundColor(Color::Green))?;
        stdout.flush()?;

        let mut input = String::new();
        let read = stdin.lock().read_line(&mut input)?;
        stdout.execute(SetForegroundColor(Color::Reset))?;

        let input = input.trim();
        if read == 0 || input.eq_ignore_ascii_case("exit") {
            break;
        }
        if input.is_empty() {
            continue;
        }

        match pipeline
            .generate(GenerateRequest {
                query: input.to_string(),
            })
            .await
        {
            Ok(response) => print_answer(&response.response)?,
            Err(e) => eprintln!("Error: {e}"),
        }
    }

    Ok(())
}

/// Write the default configuration to `config_path`, with the persona template and seed
/// knowledge base beside it.
///
/// Existing files are left alone.
fn init(config_path: &Path) -> Result<(), Box<dyn Error>> {
    let config_dir = base_dir_of(config_path);
    let templates_dir = config_dir.join("templates");
    info!("Creating template config directory: {}", templates_dir.display());
    fs::create_dir_all(&templates_dir)?;

    let marin_config = MarinConfig::default();

    write_if_missing(
        &templates_dir.join(format!("{}.yaml", marin_config.template)),
        &serde_yaml::to_string(&PersonaTemplate::marin())?,
    )?;
    write_if_missing(
        &config_dir.join(&marin_config.knowledge_base_path),
        &serde_json::to_string_pretty(&SeedFile {
            dialogues: default_seed(),
        })?,
    )?;
    write_if_missing(config_path, &serde_yaml::to_string(&marin_config)?)?;

    Ok(())
}

fn write_if_missing(path: &Path, content: &str) -> Result<(), Box<dyn Error>> {
    if path.exists() {
        info!("Keeping existing file: {}", path.display());
        return Ok(());
    }
    info!("Creating file: {}", path.display());
    fs::write(path, content)?;
    Ok(())
}
