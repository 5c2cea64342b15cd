//! Search Bangladeshi listing sites and print a market and valuation report.
//!
//! Credentials and defaults come from the environment (see `config.rs`);
//! the query comes from the command line.

mod config;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use property_scout::ai::{Gemini, OpenAI};
use property_scout::format::render_markdown;
use property_scout::sources::FirecrawlSource;
use property_scout::{Inference, Pipeline, PropertyType, SearchQuery, TransactionMode};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{parse_sites, Config, Provider};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    Buy,
    Rent,
}

impl From<Mode> for TransactionMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Buy => TransactionMode::Buy,
            Mode::Rent => TransactionMode::Rent,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Kind {
    House,
    Flat,
    Office,
    Land,
}

impl From<Kind> for PropertyType {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::House => PropertyType::House,
            Kind::Flat => PropertyType::Flat,
            Kind::Office => PropertyType::Office,
            Kind::Land => PropertyType::Land,
        }
    }
}

#[derive(Parser)]
#[command(name = "scout")]
#[command(about = "Search Bangladeshi property sites and value what they list")]
struct Cli {
    /// Buy or rent
    #[arg(value_enum)]
    mode: Mode,

    /// Property type
    #[arg(value_enum)]
    property_type: Kind,

    /// City or district, e.g. Dhaka
    location: String,

    /// Neighbourhood within the location, e.g. Gulshan
    #[arg(long)]
    area: Option<String>,

    /// Minimum total price in BDT
    #[arg(long)]
    min_price: Option<f64>,

    /// Maximum total price in BDT
    #[arg(long)]
    max_price: Option<f64>,

    /// Minimum area in square feet
    #[arg(long)]
    min_area: Option<f64>,

    /// Maximum area in square feet
    #[arg(long)]
    max_area: Option<f64>,

    #[arg(long)]
    bedrooms: Option<u8>,

    /// Comma-separated sites to search (overrides SCOUT_SITES)
    #[arg(long)]
    sites: Option<String>,

    /// Print the report as JSON instead of Markdown
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn query(&self) -> Result<SearchQuery> {
        let mut builder = SearchQuery::builder(
            self.mode.into(),
            self.property_type.into(),
            self.location.clone(),
        );
        if let Some(area) = &self.area {
            builder = builder.neighbourhood(area.clone());
        }
        if let Some(min) = self.min_price {
            builder = builder.min_price(min);
        }
        if let Some(max) = self.max_price {
            builder = builder.max_price(max);
        }
        if let Some(min) = self.min_area {
            builder = builder.min_area_sqft(min);
        }
        if let Some(max) = self.max_area {
            builder = builder.max_area_sqft(max);
        }
        if let Some(bedrooms) = self.bedrooms {
            builder = builder.bedrooms(bedrooms);
        }
        builder.build().context("Invalid search query")
    }
}

fn inference(config: &Config) -> Result<Box<dyn Inference>> {
    match config.provider {
        Provider::Gemini => {
            let Some(key) = &config.gemini_api_key else {
                bail!("GEMINI_API_KEY or GOOGLE_API_KEY must be set for the gemini provider");
            };
            let mut gemini = Gemini::new(key.clone());
            if let Some(model) = &config.model {
                gemini = gemini.with_model(model.clone());
            }
            Ok(Box::new(gemini))
        }
        Provider::OpenAI => {
            let Some(key) = &config.openai_api_key else {
                bail!("OPENAI_API_KEY must be set for the openai provider");
            };
            let mut openai = OpenAI::new(key.clone());
            if let Some(model) = &config.model {
                openai = openai.with_model(model.clone());
            }
            Ok(Box::new(openai))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout carries only the report
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,property_scout=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let query = cli.query()?;

    let mut config = Config::from_env().context("Failed to load configuration")?;
    if let Some(list) = &cli.sites {
        config.sites = parse_sites(list).context("--sites must list known sites")?;
    }
    tracing::info!(
        provider = ?config.provider,
        firecrawl_key = %config.firecrawl_api_key.hint(),
        sites = config.sites.len(),
        "Configuration loaded"
    );

    let source = FirecrawlSource::new(config.firecrawl_api_key.clone())
        .context("Failed to create Firecrawl client")?;
    let pipeline = Pipeline::new(source, inference(&config)?)
        .with_config(config.pipeline_config())
        .with_observer(|state, progress| {
            eprintln!("[{:>3.0}%] {}", progress * 100.0, state);
        });

    let report = match pipeline.run(&query).await {
        Ok(report) => report,
        Err(e) => {
            for failure in e.site_failures() {
                eprintln!("  {}", failure);
            }
            return Err(e).context(format!("No report for {}", query.describe()));
        }
    };

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize report")?
        );
    } else {
        print!("{}", render_markdown(&report));
    }

    Ok(())
}
