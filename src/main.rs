use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use coursechat::catalog::CourseCatalog;
use coursechat::chat::ChatEngine;
use coursechat::config::{load_config, Config};
use coursechat::content::ContentIndex;
use coursechat::embedding::{create_provider, EmbeddingProvider};
use coursechat::ingest::Ingestor;
use coursechat::llm::AnthropicClient;
use coursechat::search_tool::{OutlineTool, SearchTool};
use coursechat::session::SessionStore;
use coursechat::store::MemoryStore;
use coursechat::tools::ToolRegistry;

#[derive(Parser)]
#[command(name = "cchat", about = "Course materials chatbot", version)]
struct Cli {
    /// Path to the config file
    #[arg(long, global = true, default_value = "./config/cchat.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest course documents from the docs directory
    Ingest {
        /// Clear the catalog and index before ingesting
        #[arg(long)]
        clear: bool,
    },
    /// Ask a single question
    ///
    /// Sessions are in-memory, so follow-up context is only available
    /// inside one `chat` run; a one-shot ask always starts fresh.
    Ask { question: String },
    /// Interactive chat session
    Chat,
    /// Search course content directly, without the LLM
    Search {
        query: String,
        /// Restrict to a course (partial name accepted)
        #[arg(long)]
        course: Option<String>,
        /// Restrict to a lesson number
        #[arg(long)]
        lesson: Option<u32>,
        /// Maximum number of results
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show a course outline
    Outline { course: String },
}

struct App {
    config: Config,
    catalog: Arc<CourseCatalog>,
    index: Arc<ContentIndex>,
}

impl App {
    fn new(config: Config) -> Result<Self> {
        let embedder: Arc<dyn EmbeddingProvider> = Arc::from(create_provider(&config.embedding)?);
        let catalog = Arc::new(CourseCatalog::new(Arc::new(MemoryStore::new(
            embedder.clone(),
        ))));
        let index = Arc::new(ContentIndex::new(Arc::new(MemoryStore::new(embedder))));
        Ok(Self {
            config,
            catalog,
            index,
        })
    }

    async fn load_docs(&self) -> Result<()> {
        let ingestor = Ingestor::new(self.catalog.clone(), self.index.clone(), &self.config);
        let stats = ingestor
            .ingest_dir(&self.config.docs.path, false)
            .await?;
        println!(
            "Loaded {} courses ({} chunks, {} already present)",
            stats.courses_added, stats.chunks_indexed, stats.courses_skipped
        );
        Ok(())
    }

    fn engine(&self) -> Result<ChatEngine> {
        let llm = Arc::new(AnthropicClient::new(&self.config.llm)?);

        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(SearchTool::new(
            self.catalog.clone(),
            self.index.clone(),
            self.config.retrieval.max_results,
        )));
        registry.register(Arc::new(OutlineTool::new(self.catalog.clone())));

        let sessions = Arc::new(SessionStore::new(self.config.session.max_history));
        Ok(ChatEngine::new(llm, Arc::new(registry), sessions))
    }
}

fn print_answer(answer: &str, sources: &[coursechat::models::Source]) {
    println!("{answer}");
    if !sources.is_empty() {
        println!();
        println!("Sources:");
        for source in sources {
            match &source.link {
                Some(link) => println!("  {} <{}>", source.label, link),
                None => println!("  {}", source.label),
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let config = if cli.config.exists() {
        load_config(&cli.config)?
    } else {
        Config::minimal()
    };

    match cli.command {
        Command::Ingest { clear } => {
            let app = App::new(config)?;
            let ingestor = Ingestor::new(app.catalog.clone(), app.index.clone(), &app.config);
            let stats = ingestor.ingest_dir(&app.config.docs.path, clear).await?;
            println!(
                "Ingested {} courses, {} chunks ({} skipped)",
                stats.courses_added, stats.chunks_indexed, stats.courses_skipped
            );
        }
        Command::Ask { question } => {
            let app = App::new(config)?;
            app.load_docs().await?;
            let engine = app.engine()?;

            let response = engine.ask(&question, None).await?;
            print_answer(&response.answer, &response.sources);
        }
        Command::Chat => {
            let app = App::new(config)?;
            app.load_docs().await?;
            let engine = app.engine()?;

            println!("Ask about your courses (empty line to quit).");
            let stdin = std::io::stdin();
            let mut session_id: Option<String> = None;

            loop {
                print!("> ");
                std::io::stdout().flush()?;
                let mut line = String::new();
                if stdin.lock().read_line(&mut line)? == 0 {
                    break;
                }
                let question = line.trim();
                if question.is_empty() {
                    break;
                }

                let response = engine.ask(question, session_id.as_deref()).await?;
                print_answer(&response.answer, &response.sources);
                session_id = Some(response.session_id);
            }
        }
        Command::Search {
            query,
            course,
            lesson,
            limit,
        } => {
            let app = App::new(config)?;
            app.load_docs().await?;

            let max_results = limit.unwrap_or(app.config.retrieval.max_results);
            let tool = SearchTool::new(app.catalog.clone(), app.index.clone(), max_results);

            match tool.search(&query, course.as_deref(), lesson).await {
                Ok(results) if results.is_empty() => println!("No relevant content found"),
                Ok(results) => {
                    for hit in &results.hits {
                        let label = match hit.lesson_number {
                            Some(n) => format!("{} - Lesson {}", hit.course_title, n),
                            None => hit.course_title.clone(),
                        };
                        println!("[{label}] (score {:.3})", hit.score);
                        println!("{}", hit.text);
                        println!();
                    }
                }
                Err(e) => println!("{e}"),
            }
        }
        Command::Outline { course } => {
            let app = App::new(config)?;
            app.load_docs().await?;

            let tool = OutlineTool::new(app.catalog.clone());
            let out = coursechat::tools::Tool::execute(
                &tool,
                &serde_json::json!({ "course_name": course }),
            )
            .await?;
            println!("{out}");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ask_takes_only_a_question() {
        let cli = Cli::try_parse_from(["cchat", "ask", "What is chunking?"]).unwrap();
        assert!(matches!(cli.command, Command::Ask { .. }));
        // one-shot asks cannot resume a session
        assert!(Cli::try_parse_from(["cchat", "ask", "q", "--session", "abc"]).is_err());
    }

    #[test]
    fn search_accepts_filters() {
        let cli = Cli::try_parse_from([
            "cchat", "search", "context windows", "--course", "MCP", "--lesson", "2",
        ])
        .unwrap();
        match cli.command {
            Command::Search { course, lesson, .. } => {
                assert_eq!(course.as_deref(), Some("MCP"));
                assert_eq!(lesson, Some(2));
            }
            _ => panic!("expected search command"),
        }
    }
}
