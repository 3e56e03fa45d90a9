// Entry point of the bot.
//
// **Architecture Overview:**
// - `core/` = Business logic (platform-agnostic)
// - `infra/` = Implementations of core traits (HTTP clients, settings file)
// - `discord/` = Discord-specific adapters (commands, events, scheduled posts)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Set up the Discord framework
// 4. Register commands, event handlers and background tasks

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "discord/discord_layer.rs"]
mod discord;
#[path = "infra/infra_layer.rs"]
mod infra;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use chrono_tz::Tz;
use poise::serenity_prelude as serenity;
use tracing_subscriber::EnvFilter;

use crate::core::assistant::assistant_models::{
    DEFAULT_MAX_TOKENS, DEFAULT_SYSTEM_PROMPT, DEFAULT_TEMPERATURE,
};
use crate::core::assistant::{AiConfig, AiProvider, AiService, AssistantService};
use crate::core::media::{
    CatalogService, InactivityService, LibraryStatsService, MediaConnector, NewContentService,
    ProvisioningService,
};
use crate::core::metadata::MetadataProvider;
use crate::core::netwatch::{IpWatchService, PortMonitorService};
use crate::core::scheduler::Scheduler;
use crate::core::settings::SettingsService;
use crate::core::translation::Translator;
use crate::discord::commands::{presence, Store};
use crate::discord::{Data, Error};
use crate::infra::ai::{AnthropicClient, GeminiClient};
use crate::infra::media::JellyfinConnector;
use crate::infra::metadata::TmdbClient;
use crate::infra::netwatch::{IpifyClient, TcpProbe};
use crate::infra::settings::JsonSettingsStore;
use crate::infra::translation::GoogleTranslateClient;

const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-haiku-latest";
const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_TRIGGER_WORD: &str = "assistant";

/// Event handler for non-command Discord events.
async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::Ready { data_about_bot } => {
            tracing::info!(user = %data_about_bot.user.name, "connected to Discord");
        }
        serenity::FullEvent::Message { new_message } => {
            discord::assistant::handle_message(ctx, new_message, data).await?;
        }
        _ => {}
    }
    Ok(())
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(variable = name, value = %raw, "invalid value, using default");
            default
        }),
        Err(_) => default,
    }
}

/// Pick the AI backend from `AI_PROVIDER`, falling back to whichever key is set.
/// Returns `None` when no key is configured; the assistant is then disabled.
fn build_ai_provider() -> anyhow::Result<Option<(Box<dyn AiProvider>, &'static str)>> {
    let anthropic_key = std::env::var("ANTHROPIC_API_KEY").ok().filter(|k| !k.is_empty());
    let gemini_key = std::env::var("GEMINI_API_KEY").ok().filter(|k| !k.is_empty());
    let choice = std::env::var("AI_PROVIDER")
        .map(|p| p.trim().to_lowercase())
        .unwrap_or_default();

    let provider = match (choice.as_str(), anthropic_key, gemini_key) {
        ("gemini", _, Some(key)) | ("", None, Some(key)) => {
            let client: Box<dyn AiProvider> =
                Box::new(GeminiClient::new(key).context("failed to build Gemini client")?);
            Some((client, DEFAULT_GEMINI_MODEL))
        }
        ("anthropic", Some(key), _) | ("", Some(key), _) => {
            let client: Box<dyn AiProvider> =
                Box::new(AnthropicClient::new(key).context("failed to build Anthropic client")?);
            Some((client, DEFAULT_ANTHROPIC_MODEL))
        }
        (other, _, _) => {
            if !other.is_empty() {
                tracing::warn!(provider = other, "AI provider selected but its API key is missing");
            }
            None
        }
    };
    Ok(provider)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file (if it exists) before the
    // subscriber reads RUST_LOG.
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let token = std::env::var("DISCORD_TOKEN")
        .context("missing DISCORD_TOKEN environment variable; put it in .env")?;

    let data_dir = PathBuf::from(env_or("DATA_DIR", "data"));
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

    let timezone_name = env_or("BOT_TIMEZONE", "UTC");
    let timezone: Tz = timezone_name
        .parse()
        .map_err(|err| anyhow::anyhow!("invalid BOT_TIMEZONE `{timezone_name}`: {err}"))?;

    // ========================================================================
    // SERVICE INITIALIZATION
    // ========================================================================

    let store = JsonSettingsStore::new(data_dir.join("settings.json"));
    tracing::info!(path = %store.path().display(), "loading settings");
    let settings: Arc<SettingsService<Store>> = Arc::new(
        SettingsService::new(store)
            .await
            .context("failed to load settings")?,
    );

    let connector: Arc<dyn MediaConnector> = Arc::new(JellyfinConnector);
    let metadata: Arc<dyn MetadataProvider> =
        Arc::new(TmdbClient::new().context("failed to build TMDb client")?);
    let translator: Arc<dyn Translator> =
        Arc::new(GoogleTranslateClient::new().context("failed to build translation client")?);

    let catalog = Arc::new(CatalogService::new(
        Arc::clone(&settings),
        Arc::clone(&connector),
        Arc::clone(&metadata),
        translator,
    ));
    let inactivity = Arc::new(InactivityService::new(Arc::clone(&settings), Arc::clone(&connector)));
    let new_content = Arc::new(NewContentService::new(
        Arc::clone(&settings),
        Arc::clone(&connector),
        metadata,
    ));
    let library_stats =
        Arc::new(LibraryStatsService::new(Arc::clone(&settings), Arc::clone(&connector)));
    let provisioning = Arc::new(ProvisioningService::new(Arc::clone(&settings), connector));

    let ip_source = IpifyClient::new().context("failed to build public IP client")?;
    let ip_watch = Arc::new(IpWatchService::new(Arc::clone(&settings), Arc::new(ip_source)));
    let ports = Arc::new(PortMonitorService::new(Arc::clone(&settings), Arc::new(TcpProbe)));

    let assistant = match build_ai_provider()? {
        Some((provider, default_model)) => {
            let mut config = AiConfig::new(env_or("AI_MODEL", default_model));
            config.max_tokens = env_parse("AI_MAX_TOKENS", DEFAULT_MAX_TOKENS);
            config.temperature = env_parse("AI_TEMPERATURE", DEFAULT_TEMPERATURE);
            tracing::info!(model = %config.model, "AI assistant enabled");

            let ai = AiService::new(provider, env_or("AI_SYSTEM_PROMPT", DEFAULT_SYSTEM_PROMPT), config);
            let trigger = env_or("AI_TRIGGER_WORD", DEFAULT_TRIGGER_WORD);
            Some(Arc::new(
                AssistantService::new(Arc::clone(&settings), ai, trigger).await,
            ))
        }
        None => {
            tracing::info!("no AI API key configured, assistant disabled");
            None
        }
    };

    let scheduler = Arc::new(Scheduler::new(timezone));
    tracing::info!(%timezone, "scheduler timezone");

    let data = Data {
        settings,
        catalog,
        inactivity,
        new_content,
        library_stats,
        provisioning,
        ip_watch,
        ports,
        assistant,
        scheduler,
    };

    // ========================================================================
    // DISCORD FRAMEWORK SETUP
    // ========================================================================

    let intents = serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT // Required to read message content
        | serenity::GatewayIntents::GUILDS
        | serenity::GatewayIntents::DIRECT_MESSAGES;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: discord::commands::all(),
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(|ctx, _ready, framework| {
            Box::pin(async move {
                tracing::info!("bot is starting up");

                // Global registration can take a while to reach every guild.
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                tracing::info!(count = framework.options().commands.len(), "commands registered");

                presence::on_ready(ctx);
                discord::tasks::spawn_all(&data, ctx.http.clone());

                Ok(data)
            })
        })
        .build();

    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await
        .context("failed to create Discord client")?;

    client.start().await.context("Discord client stopped")?;
    Ok(())
}
