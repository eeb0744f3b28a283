//! calltrack CLI — operator interface to the callback CRM core.
//!
//! Stands in for the transport layer: each subcommand maps onto one
//! library operation. Timestamps are stored in UTC and converted to the
//! configured display timezone here, at the output boundary only.

use calltrack_rs::config::Config;
use calltrack_rs::db::Db;
use calltrack_rs::model::{
    Callback, CallbackFilter, CallbackId, CallbackUpdate, NewCallback, Page, Snapshot, Status,
};
use calltrack_rs::telemetry::{TelemetryConfig, init_telemetry};
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use clap::{Parser, Subcommand};
use secrecy::ExposeSecret;

#[derive(Parser)]
#[command(name = "calltrack", about = "Callback CRM: claims and audit trail")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Callback record operations
    Callback {
        #[command(subcommand)]
        action: CallbackAction,
    },
    /// Activity log operations
    Activity {
        #[command(subcommand)]
        action: ActivityAction,
    },
    /// Actor directory operations
    Actor {
        #[command(subcommand)]
        action: ActorAction,
    },
}

#[derive(Subcommand)]
enum CallbackAction {
    /// Create a callback
    Create {
        /// Customer name
        customer_name: String,
        /// Callback phone number
        callback_number: String,
        #[arg(long)]
        product: Option<String>,
        #[arg(long)]
        vehicle_year: Option<i32>,
        #[arg(long)]
        car_make: Option<String>,
        #[arg(long)]
        car_model: Option<String>,
        #[arg(long)]
        zip_code: Option<String>,
        /// Follow-up date (YYYY-MM-DD)
        #[arg(long)]
        follow_up: Option<NaiveDate>,
        #[arg(long)]
        agent: Option<String>,
        #[arg(long)]
        lead_score: Option<f64>,
        #[arg(long)]
        comments: Option<String>,
        /// Creating actor
        #[arg(long)]
        actor: Option<String>,
    },
    /// Show a callback
    Show {
        id: i64,
        /// Acting user; records a view activity when given
        #[arg(long)]
        actor: Option<String>,
    },
    /// List callbacks
    List {
        /// Follow-up date range start (inclusive, YYYY-MM-DD)
        #[arg(long)]
        follow_up_from: Option<NaiveDate>,
        /// Follow-up date range end (inclusive, YYYY-MM-DD)
        #[arg(long)]
        follow_up_to: Option<NaiveDate>,
        #[arg(long)]
        status: Option<Status>,
        #[arg(long)]
        agent: Option<String>,
        /// Only claimed (true) or only unclaimed (false)
        #[arg(long)]
        claimed: Option<bool>,
        #[arg(long)]
        claimed_by: Option<String>,
        #[arg(long, default_value_t = 0)]
        skip: i64,
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// Update a callback (only provided fields change)
    Update {
        id: i64,
        #[arg(long)]
        product: Option<String>,
        #[arg(long)]
        vehicle_year: Option<i32>,
        #[arg(long)]
        car_make: Option<String>,
        #[arg(long)]
        car_model: Option<String>,
        #[arg(long)]
        zip_code: Option<String>,
        #[arg(long)]
        customer_name: Option<String>,
        #[arg(long)]
        callback_number: Option<String>,
        #[arg(long)]
        follow_up: Option<NaiveDate>,
        #[arg(long)]
        status: Option<Status>,
        #[arg(long)]
        agent: Option<String>,
        #[arg(long)]
        lead_score: Option<f64>,
        #[arg(long)]
        comments: Option<String>,
        /// Acting user, attributed on the audit entries
        #[arg(long)]
        actor: Option<String>,
    },
    /// Delete a callback and its activity history
    Delete { id: i64 },
    /// Search callbacks (min 3 characters)
    Search {
        query: String,
        #[arg(long, default_value_t = 0)]
        skip: i64,
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// Claim a callback for an actor
    Claim { id: i64, actor: String },
    /// Release a claim (claimant only)
    Unclaim { id: i64, actor: String },
}

#[derive(Subcommand)]
enum ActivityAction {
    /// List activities for a callback, newest first
    List {
        callback_id: i64,
        #[arg(long, default_value_t = 0)]
        skip: i64,
        #[arg(long, default_value_t = 50)]
        limit: i64,
    },
    /// Record an arbitrary activity
    Record {
        callback_id: i64,
        /// view | edit | status_change | claim | unclaim | comment
        activity_type: String,
        description: String,
        #[arg(long)]
        actor: Option<String>,
        /// Previous-value snapshot as a JSON object
        #[arg(long)]
        previous: Option<String>,
        /// New-value snapshot as a JSON object
        #[arg(long)]
        new: Option<String>,
    },
}

#[derive(Subcommand)]
enum ActorAction {
    /// Create or rename an actor
    Upsert { id: String, username: String },
    /// Delete an actor (history keeps its rows, attribution is nulled)
    Delete { id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = Config::from_env()?;
    let _guard = init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: "calltrack".to_string(),
        log_level: config.log_level.clone(),
    })?;

    let db = Db::connect(config.database_url.expose_secret()).await?;
    db.migrate().await?;
    let tz = config.display_timezone;

    match cli.command {
        Command::Callback { action } => match action {
            CallbackAction::Create {
                customer_name,
                callback_number,
                product,
                vehicle_year,
                car_make,
                car_model,
                zip_code,
                follow_up,
                agent,
                lead_score,
                comments,
                actor,
            } => {
                let mut new = NewCallback::new(customer_name, callback_number);
                if let Some(v) = product {
                    new = new.product(v);
                }
                if let Some(v) = vehicle_year {
                    new = new.vehicle_year(v);
                }
                if let Some(v) = car_make {
                    new = new.car_make(v);
                }
                if let Some(v) = car_model {
                    new = new.car_model(v);
                }
                if let Some(v) = zip_code {
                    new = new.zip_code(v);
                }
                if let Some(v) = follow_up {
                    new = new.follow_up_date(v);
                }
                if let Some(v) = agent {
                    new = new.agent_name(v);
                }
                if let Some(v) = lead_score {
                    new = new.lead_score(v);
                }
                if let Some(v) = comments {
                    new = new.comments(v);
                }
                if let Some(v) = actor {
                    new = new.created_by(v);
                }
                let callback = db.create_callback(new).await?;
                println!("Created callback {}", callback.id);
                print_callback(&callback, tz);
            }
            CallbackAction::Show { id, actor } => {
                let id = CallbackId(id);
                let callback = match actor {
                    Some(ref actor) => db.get_callback_as(id, actor).await?,
                    None => db.get_callback(id).await?,
                };
                print_callback(&callback, tz);
            }
            CallbackAction::List {
                follow_up_from,
                follow_up_to,
                status,
                agent,
                claimed,
                claimed_by,
                skip,
                limit,
            } => {
                let filter = CallbackFilter {
                    follow_up_from,
                    follow_up_to,
                    status,
                    agent_name: agent,
                    claimed,
                    claimed_by,
                };
                let callbacks = db.list_callbacks(&filter, Page { skip, limit }).await?;
                print_callback_table(&callbacks);
            }
            CallbackAction::Update {
                id,
                product,
                vehicle_year,
                car_make,
                car_model,
                zip_code,
                customer_name,
                callback_number,
                follow_up,
                status,
                agent,
                lead_score,
                comments,
                actor,
            } => {
                let update = CallbackUpdate {
                    product,
                    vehicle_year,
                    car_make,
                    car_model,
                    zip_code,
                    customer_name,
                    callback_number,
                    follow_up_date: follow_up,
                    status,
                    agent_name: agent,
                    lead_score,
                    comments,
                };
                let callback = db
                    .update_callback(CallbackId(id), update, actor.as_deref())
                    .await?;
                println!("Updated callback {}", callback.id);
                print_callback(&callback, tz);
            }
            CallbackAction::Delete { id } => {
                db.delete_callback(CallbackId(id)).await?;
                println!("Deleted callback {id} and its activity history");
            }
            CallbackAction::Search { query, skip, limit } => {
                let callbacks = db.search_callbacks(&query, Page { skip, limit }).await?;
                print_callback_table(&callbacks);
            }
            CallbackAction::Claim { id, actor } => {
                let callback = db.claim_callback(CallbackId(id), &actor).await?;
                println!(
                    "Callback {} claimed by {}",
                    callback.id,
                    callback.claimed_by.as_deref().unwrap_or("-")
                );
            }
            CallbackAction::Unclaim { id, actor } => {
                let callback = db.unclaim_callback(CallbackId(id), &actor).await?;
                println!("Callback {} released", callback.id);
            }
        },
        Command::Activity { action } => match action {
            ActivityAction::List {
                callback_id,
                skip,
                limit,
            } => {
                let activities = db
                    .list_activities(CallbackId(callback_id), Page { skip, limit })
                    .await?;
                if activities.is_empty() {
                    println!("No activity recorded.");
                }
                for activity in &activities {
                    let who = activity
                        .actor
                        .as_ref()
                        .map(|a| a.username.as_str())
                        .unwrap_or("(removed user)");
                    println!(
                        "{}  {:<13}  {:<20}  {}",
                        fmt_ts(activity.created_at, tz),
                        activity.activity_type,
                        who,
                        activity.description
                    );
                }
            }
            ActivityAction::Record {
                callback_id,
                activity_type,
                description,
                actor,
                previous,
                new,
            } => {
                let previous = previous.as_deref().map(parse_snapshot).transpose()?;
                let new = new.as_deref().map(parse_snapshot).transpose()?;
                let activity = db
                    .record_activity(
                        CallbackId(callback_id),
                        actor.as_deref(),
                        &activity_type,
                        &description,
                        previous.as_ref(),
                        new.as_ref(),
                    )
                    .await?;
                println!(
                    "Recorded {} activity {} on callback {}",
                    activity.activity_type, activity.id, activity.callback_id
                );
            }
        },
        Command::Actor { action } => match action {
            ActorAction::Upsert { id, username } => {
                db.upsert_actor(&id, &username).await?;
                println!("Actor {id} ({username}) upserted");
            }
            ActorAction::Delete { id } => {
                if db.delete_actor(&id).await? {
                    println!("Actor {id} deleted; their history remains, unattributed");
                } else {
                    println!("No actor {id}");
                }
            }
        },
    }

    Ok(())
}

fn parse_snapshot(text: &str) -> anyhow::Result<Snapshot> {
    serde_json::from_str(text).map_err(|e| anyhow::anyhow!("snapshot must be a JSON object: {e}"))
}

fn fmt_ts(ts: DateTime<Utc>, tz: Tz) -> String {
    ts.with_timezone(&tz).format("%Y-%m-%d %H:%M %Z").to_string()
}

fn print_callback(callback: &Callback, tz: Tz) {
    println!("ID:            {}", callback.id);
    println!("Customer:      {}", callback.customer_name);
    println!("Number:        {}", callback.callback_number);
    println!("Status:        {}", callback.status);
    println!(
        "Product:       {}",
        callback.product.as_deref().unwrap_or("-")
    );
    println!(
        "Vehicle:       {} {} {}",
        callback
            .vehicle_year
            .map(|y| y.to_string())
            .unwrap_or_else(|| "-".to_string()),
        callback.car_make.as_deref().unwrap_or("-"),
        callback.car_model.as_deref().unwrap_or("-")
    );
    println!(
        "Zip:           {}",
        callback.zip_code.as_deref().unwrap_or("-")
    );
    println!(
        "Follow-up:     {}",
        callback
            .follow_up_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string())
    );
    println!(
        "Agent:         {}",
        callback.agent_name.as_deref().unwrap_or("-")
    );
    println!(
        "Lead score:    {}",
        callback
            .lead_score
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string())
    );
    println!(
        "Comments:      {}",
        callback.comments.as_deref().unwrap_or("-")
    );
    match (callback.claimed_by.as_deref(), callback.claimed_at) {
        (Some(actor), Some(at)) => println!("Claimed:       by {} at {}", actor, fmt_ts(at, tz)),
        _ => println!("Claimed:       no"),
    }
    println!("Created:       {}", fmt_ts(callback.created_at, tz));
    println!("Modified:      {}", fmt_ts(callback.last_modified, tz));
    println!(
        "Modified by:   {}",
        callback.last_modified_by.as_deref().unwrap_or("-")
    );
}

fn print_callback_table(callbacks: &[Callback]) {
    if callbacks.is_empty() {
        println!("No callbacks found.");
        return;
    }
    println!(
        "{:<6}  {:<24}  {:<14}  {:<16}  {:<10}  CLAIMED BY",
        "ID", "CUSTOMER", "NUMBER", "STATUS", "FOLLOW-UP"
    );
    println!("{}", "-".repeat(96));
    for callback in callbacks {
        println!(
            "{:<6}  {:<24}  {:<14}  {:<16}  {:<10}  {}",
            callback.id,
            truncate(&callback.customer_name, 24),
            callback.callback_number,
            callback.status,
            callback
                .follow_up_date
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".to_string()),
            callback.claimed_by.as_deref().unwrap_or("-")
        );
    }
    println!("\n{} callback(s)", callbacks.len());
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
