use std::fmt::Display;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};

use enmedd_admin::admin::{
    document_sets as ds_admin, llm_providers as llm_admin, search_settings as ss_admin,
    slack_bots as slack_admin, standard_answers as sa_admin,
};
use enmedd_admin::api::{
    self, document_sets::DOCUMENT_SET_PATH, llm_providers::LLM_PROVIDER_PATH,
    slack_bots::SLACK_BOT_CONFIG_PATH, standard_answers::STANDARD_ANSWER_PATH,
};
use enmedd_admin::config::Config;
use enmedd_admin::logging;
use enmedd_admin::ui::form::Values;
use enmedd_admin::ui::{ListingTable, RowActions, Wizard, WizardOutcome};
use enmedd_admin::Session;

#[derive(Parser)]
#[command(name = "enmedd-admin")]
#[command(about = "Admin client for enMedD AI")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long)]
    config: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Backend URL, overriding the configured one
    #[arg(long)]
    base_url: Option<String>,
}

#[derive(clap::Args)]
struct ListArgs {
    /// Only show rows matching this text
    #[arg(short, long)]
    filter: Option<String>,

    /// Page to show (1-based)
    #[arg(short, long, default_value_t = 1)]
    page: usize,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the backend is reachable
    Health,

    /// Manage document sets
    #[command(subcommand)]
    DocumentSets(DocumentSetCommand),

    /// Manage Slack bot configurations
    #[command(subcommand)]
    SlackBots(SlackBotCommand),

    /// Manage LLM providers
    #[command(subcommand)]
    LlmProviders(LlmProviderCommand),

    /// Show or change the embedding model
    #[command(subcommand)]
    SearchSettings(SearchSettingsCommand),

    /// Manage standard answers
    #[command(subcommand)]
    StandardAnswers(StandardAnswerCommand),
}

#[derive(Subcommand)]
enum DocumentSetCommand {
    List(ListArgs),
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: String,
        /// Connector id (repeatable)
        #[arg(long = "cc-pair-id")]
        cc_pair_ids: Vec<i64>,
    },
    Update {
        id: i64,
        #[arg(long)]
        description: Option<String>,
        /// Replace the connectors (repeatable)
        #[arg(long = "cc-pair-id")]
        cc_pair_ids: Vec<i64>,
    },
    Delete {
        id: i64,
    },
}

#[derive(Subcommand)]
enum SlackBotCommand {
    List(ListArgs),
    Delete {
        id: i64,
    },
    SetTokens {
        #[arg(long)]
        bot_token: String,
        #[arg(long)]
        app_token: String,
    },
}

#[derive(Subcommand)]
enum LlmProviderCommand {
    List(ListArgs),
    /// Show the built-in provider options
    Options,
    Create {
        /// Built-in provider name, e.g. "openai"
        #[arg(long)]
        provider: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        api_key: Option<String>,
        #[arg(long)]
        api_base: Option<String>,
        #[arg(long)]
        api_version: Option<String>,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        fast_model: Option<String>,
        /// Custom config entry as KEY=VALUE (repeatable)
        #[arg(long = "custom-config", value_parser = parse_key_value)]
        custom_config: Vec<(String, String)>,
    },
    Delete {
        id: i64,
    },
    SetDefault {
        id: i64,
    },
}

#[derive(Subcommand)]
enum SearchSettingsCommand {
    /// Show the active and pending embedding settings
    Current,
    /// Switch to a new embedding model (starts a re-index)
    Set {
        /// "self_hosted" or a cloud provider
        #[arg(long, default_value = ss_admin::SELF_HOSTED)]
        provider: String,
        #[arg(long)]
        model_name: String,
        #[arg(long)]
        model_dim: i64,
        #[arg(long)]
        no_normalize: bool,
        #[arg(long)]
        query_prefix: Option<String>,
        #[arg(long)]
        passage_prefix: Option<String>,
        #[arg(long)]
        multipass: bool,
    },
}

#[derive(Subcommand)]
enum StandardAnswerCommand {
    List(ListArgs),
    Delete { id: i64 },
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(base_url) = cli.base_url {
        config.api.base_url = base_url;
    }

    let logging_handle = logging::init_logging(&config, cli.debug)?;

    let session = Session::new(config).context("Failed to create API client")?;

    let cancel = session.cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let result = match cli.command {
        Commands::Health => cmd_health(&session).await,
        Commands::DocumentSets(cmd) => cmd_document_sets(&session, cmd).await,
        Commands::SlackBots(cmd) => cmd_slack_bots(&session, cmd).await,
        Commands::LlmProviders(cmd) => cmd_llm_providers(&session, cmd).await,
        Commands::SearchSettings(cmd) => cmd_search_settings(&session, cmd).await,
        Commands::StandardAnswers(cmd) => cmd_standard_answers(&session, cmd).await,
    };

    for notification in session.notifications.history() {
        eprintln!("{notification}");
    }
    if let Some(log_path) = logging_handle.log_file_path {
        eprintln!("Session log: {}", log_path.display());
    }

    result
}

// ─── Shared helpers ─────────────────────────────────────────────────────────

/// Fill each step from `input` and press "next" until the wizard finishes
async fn run_wizard(session: &Session, wizard: Wizard, input: &Values) -> Result<Value> {
    let mut wizard = wizard
        .with_cache(session.cache.clone())
        .with_notifications(session.notifications.clone());

    loop {
        let names: Vec<String> = wizard
            .current_step()
            .schema
            .field_names()
            .map(str::to_string)
            .collect();
        for name in names {
            if let Some(value) = input.get(&name) {
                wizard.set_field(&name, value.clone())?;
            }
        }

        match wizard.next(&session.cancel).await {
            WizardOutcome::Advanced => {}
            WizardOutcome::Submitted(response) => return Ok(response),
            WizardOutcome::Blocked(errors) => {
                eprintln!("{}:", wizard.current_step().title);
                for (field, message) in &errors {
                    eprintln!("  {field}: {message}");
                }
                bail!("validation failed");
            }
            WizardOutcome::Failed(e) => return Err(anyhow!(e.user_message())),
            WizardOutcome::Cancelled => bail!("cancelled"),
            WizardOutcome::Busy | WizardOutcome::Closed => bail!("wizard is not accepting input"),
        }
    }
}

fn print_table<T>(table: &ListingTable<T>, title: &str, row: impl Fn(&T) -> String) {
    if let Some(e) = table.error() {
        eprintln!("Failed to load {title}: {}", e.user_message());
    }
    if table.filtered_items().is_empty() {
        println!("No {title} found");
        return;
    }

    println!("{title} ({})", table.footer());
    println!("{}", "─".repeat(60));
    for item in table.page_items() {
        println!("{}", row(item));
    }
}

async fn list<T>(
    session: &Session,
    mut table: ListingTable<T>,
    key: &str,
    args: ListArgs,
) -> Result<ListingTable<T>>
where
    T: serde::de::DeserializeOwned,
{
    table
        .load(&session.cache, key)
        .await
        .map_err(|e| anyhow!(e.user_message()))?;
    if let Some(filter) = args.filter {
        table.set_query(filter);
    }
    table.set_page(args.page);
    Ok(table)
}

/// Find row `id` in `key`'s listing and delete it through the table
async fn delete_by_id<T, A>(
    session: &Session,
    mut table: ListingTable<T>,
    actions: &A,
    id: i64,
    id_of: impl Fn(&T) -> i64,
) -> Result<()>
where
    T: serde::de::DeserializeOwned + Clone + Sync,
    A: RowActions<T>,
{
    table
        .load(&session.cache, actions.cache_key())
        .await
        .map_err(|e| anyhow!(e.user_message()))?;
    let item = table
        .items()
        .iter()
        .find(|item| id_of(item) == id)
        .cloned()
        .ok_or_else(|| anyhow!("no row with id {id}"))?;

    table
        .delete_row(
            &item,
            actions,
            &session.cache,
            &session.notifications,
            &session.cancel,
        )
        .await
        .map_err(|e| anyhow!(e.user_message()))
}

fn values(value: Value) -> Values {
    match value {
        Value::Object(map) => map,
        _ => Values::new(),
    }
}

fn or_dash(value: Option<impl Display>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

// ─── Commands ───────────────────────────────────────────────────────────────

async fn cmd_health(session: &Session) -> Result<()> {
    let status = session.health.check_once().await;
    match session.health.banner() {
        None => println!("{} is healthy", session.client.base_url()),
        Some(banner) => {
            println!("{}", banner.message);
            bail!("health check failed: {status:?}");
        }
    }
    Ok(())
}

async fn cmd_document_sets(session: &Session, cmd: DocumentSetCommand) -> Result<()> {
    let client = session.client.clone();
    match cmd {
        DocumentSetCommand::List(args) => {
            let table = list(
                session,
                ds_admin::listing(session.page_size()),
                DOCUMENT_SET_PATH,
                args,
            )
            .await?;
            print_table(&table, "Document sets", |set| {
                let status = if set.is_up_to_date { "synced" } else { "syncing" };
                format!(
                    "{:>4}  {:<30} {:<8} {} connectors",
                    set.id,
                    set.name,
                    status,
                    set.cc_pair_descriptors.len()
                )
            });
        }
        DocumentSetCommand::Create {
            name,
            description,
            cc_pair_ids,
        } => {
            let input = values(json!({
                "name": name,
                "description": description,
                "cc_pair_ids": cc_pair_ids,
            }));
            run_wizard(session, ds_admin::create_wizard(client)?, &input).await?;
        }
        DocumentSetCommand::Update {
            id,
            description,
            cc_pair_ids,
        } => {
            let sets = api::document_sets::list(&client)
                .await
                .map_err(|e| anyhow!(e.user_message()))?;
            let set = sets
                .iter()
                .find(|s| s.id == id)
                .ok_or_else(|| anyhow!("no document set with id {id}"))?;

            let mut input = Values::new();
            if let Some(description) = description {
                input.insert("description".to_string(), json!(description));
            }
            if !cc_pair_ids.is_empty() {
                input.insert("cc_pair_ids".to_string(), json!(cc_pair_ids));
            }
            run_wizard(session, ds_admin::edit_wizard(client, set)?, &input).await?;
        }
        DocumentSetCommand::Delete { id } => {
            let actions = ds_admin::DocumentSetActions::new(client);
            delete_by_id(
                session,
                ds_admin::listing(session.page_size()),
                &actions,
                id,
                |s| s.id,
            )
            .await?;
        }
    }
    Ok(())
}

async fn cmd_slack_bots(session: &Session, cmd: SlackBotCommand) -> Result<()> {
    let client = session.client.clone();
    match cmd {
        SlackBotCommand::List(args) => {
            let table = list(
                session,
                slack_admin::listing(session.page_size()),
                SLACK_BOT_CONFIG_PATH,
                args,
            )
            .await?;
            print_table(&table, "Slack bot configs", |config| {
                format!(
                    "{:>4}  {:<40} {}",
                    config.id,
                    config.channel_label(),
                    config.response_type.as_str()
                )
            });
        }
        SlackBotCommand::Delete { id } => {
            let actions = slack_admin::SlackBotConfigActions::new(client);
            delete_by_id(
                session,
                slack_admin::listing(session.page_size()),
                &actions,
                id,
                |c| c.id,
            )
            .await?;
        }
        SlackBotCommand::SetTokens {
            bot_token,
            app_token,
        } => {
            let input = values(json!({"bot_token": bot_token, "app_token": app_token}));
            run_wizard(session, slack_admin::tokens_wizard(client)?, &input).await?;
        }
    }
    Ok(())
}

async fn cmd_llm_providers(session: &Session, cmd: LlmProviderCommand) -> Result<()> {
    let client = session.client.clone();
    match cmd {
        LlmProviderCommand::List(args) => {
            let table = list(
                session,
                llm_admin::listing(session.page_size()),
                LLM_PROVIDER_PATH,
                args,
            )
            .await?;
            print_table(&table, "LLM providers", |p| {
                let marker = if p.is_default() { "*" } else { " " };
                format!(
                    "{marker}{:>3}  {:<24} {:<12} {}",
                    p.id, p.name, p.provider, p.default_model_name
                )
            });
        }
        LlmProviderCommand::Options => {
            let options = api::llm_providers::built_in_options(&client)
                .await
                .map_err(|e| anyhow!(e.user_message()))?;
            for option in options {
                println!(
                    "{:<12} {:<20} key:{} default:{}",
                    option.name,
                    option.display_name,
                    if option.api_key_required { "required" } else { "optional" },
                    or_dash(option.default_model.as_deref())
                );
            }
        }
        LlmProviderCommand::Create {
            provider,
            name,
            api_key,
            api_base,
            api_version,
            model,
            fast_model,
            custom_config,
        } => {
            let options = api::llm_providers::built_in_options(&client)
                .await
                .map_err(|e| anyhow!(e.user_message()))?;
            let descriptor = options
                .iter()
                .find(|o| o.name == provider)
                .ok_or_else(|| anyhow!("unknown provider '{provider}'"))?;

            let mut input = values(json!({
                "name": name,
                "api_key": api_key.unwrap_or_default(),
                "api_base": api_base.unwrap_or_default(),
                "api_version": api_version.unwrap_or_default(),
            }));
            if let Some(model) = model {
                input.insert("default_model_name".to_string(), json!(model));
            }
            if let Some(fast_model) = fast_model {
                input.insert("fast_default_model_name".to_string(), json!(fast_model));
            }
            for (key, value) in custom_config {
                input.insert(format!("custom_config.{key}"), json!(value));
            }
            run_wizard(session, llm_admin::create_wizard(client, descriptor)?, &input).await?;
        }
        LlmProviderCommand::Delete { id } => {
            let actions = llm_admin::LlmProviderActions::new(client);
            delete_by_id(
                session,
                llm_admin::listing(session.page_size()),
                &actions,
                id,
                |p| p.id,
            )
            .await?;
        }
        LlmProviderCommand::SetDefault { id } => {
            api::llm_providers::set_default(&client, id)
                .await
                .map_err(|e| anyhow!(e.user_message()))?;
            session
                .notifications
                .success(format!("LLM provider {id} is now the default"));
        }
    }
    Ok(())
}

async fn cmd_search_settings(session: &Session, cmd: SearchSettingsCommand) -> Result<()> {
    let client = session.client.clone();
    match cmd {
        SearchSettingsCommand::Current => {
            let current = api::search_settings::current(&client)
                .await
                .map_err(|e| anyhow!(e.user_message()))?;
            let secondary = api::search_settings::secondary(&client)
                .await
                .map_err(|e| anyhow!(e.user_message()))?;
            match current {
                Some(s) => println!(
                    "Current: {} ({} dims, provider {})",
                    s.model_name,
                    s.model_dim,
                    or_dash(s.provider_type.as_deref())
                ),
                None => println!("Current: none"),
            }
            if let Some(s) = secondary {
                println!("Re-indexing towards: {} ({} dims)", s.model_name, s.model_dim);
            }
        }
        SearchSettingsCommand::Set {
            provider,
            model_name,
            model_dim,
            no_normalize,
            query_prefix,
            passage_prefix,
            multipass,
        } => {
            let input = values(json!({
                "provider_type": provider,
                "model_name": model_name,
                "model_dim": model_dim,
                "normalize": !no_normalize,
                "query_prefix": query_prefix.unwrap_or_default(),
                "passage_prefix": passage_prefix.unwrap_or_default(),
                "multipass_indexing": multipass,
            }));
            run_wizard(session, ss_admin::create_wizard(client)?, &input).await?;
        }
    }
    Ok(())
}

async fn cmd_standard_answers(session: &Session, cmd: StandardAnswerCommand) -> Result<()> {
    let client = session.client.clone();
    match cmd {
        StandardAnswerCommand::List(args) => {
            let table = list(
                session,
                sa_admin::listing(session.page_size()),
                STANDARD_ANSWER_PATH,
                args,
            )
            .await?;
            print_table(&table, "Standard answers", |a| {
                let categories: Vec<&str> = a.categories.iter().map(|c| c.name.as_str()).collect();
                format!("{:>4}  {:<24} [{}]", a.id, a.keyword, categories.join(", "))
            });
        }
        StandardAnswerCommand::Delete { id } => {
            let actions = sa_admin::StandardAnswerActions::new(client);
            delete_by_id(
                session,
                sa_admin::listing(session.page_size()),
                &actions,
                id,
                |a| a.id,
            )
            .await?;
        }
    }
    Ok(())
}
