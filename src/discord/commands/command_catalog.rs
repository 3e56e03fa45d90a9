// Discord commands module.
// Each feature gets its own command file; this file owns the shared `Data`.

pub mod accounts;
pub mod assistant;
pub mod help;
pub mod inactivity;
pub mod ip_monitor;
pub mod jellyfin;
pub mod library_stats;
pub mod new_content;
pub mod port_monitor;
pub mod presence;
pub mod recommend;

use std::sync::Arc;

use crate::core::assistant::AssistantService;
use crate::core::media::{
    CatalogService, InactivityService, LibraryStatsService, NewContentService, ProvisioningService,
};
use crate::core::netwatch::{IpWatchService, PortMonitorService};
use crate::core::scheduler::Scheduler;
use crate::core::settings::SettingsService;
use crate::infra::settings::JsonSettingsStore;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

/// The settings backend every service is wired to.
pub type Store = JsonSettingsStore;

/// Data that's shared across all commands, events and scheduled tasks.
pub struct Data {
    pub settings: Arc<SettingsService<Store>>,
    pub catalog: Arc<CatalogService<Store>>,
    pub inactivity: Arc<InactivityService<Store>>,
    pub new_content: Arc<NewContentService<Store>>,
    pub library_stats: Arc<LibraryStatsService<Store>>,
    pub provisioning: Arc<ProvisioningService<Store>>,
    pub ip_watch: Arc<IpWatchService<Store>>,
    pub ports: Arc<PortMonitorService<Store>>,
    /// `None` when no AI provider key is configured.
    pub assistant: Option<Arc<AssistantService<Store>>>,
    pub scheduler: Arc<Scheduler>,
}

/// Every command the bot registers.
pub fn all() -> Vec<poise::Command<Data, Error>> {
    vec![
        help::help(),
        jellyfin::jellyfin(),
        recommend::recommend(),
        new_content::newcontent(),
        library_stats::librarystats(),
        inactivity::jellyfinmon(),
        accounts::accounts(),
        ip_monitor::ipmonitor(),
        port_monitor::portmonitor(),
        assistant::assistant(),
    ]
}

/// The guild a command was used in.
pub fn guild_id(ctx: Context<'_>) -> Result<u64, Error> {
    Ok(ctx
        .guild_id()
        .ok_or("This command only works in servers")?
        .get())
}
