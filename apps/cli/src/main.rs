#![deny(warnings)]

//! Headless admin CLI for the events-ticketing API.
//!
//! Runs the pre-submission rule checks locally (capacity invariant, patch
//! planning, registration admission) and leaves the authoritative decision
//! to the server; on conflict the server's answer wins.

use anyhow::{anyhow, bail, Context, Result};
use api_client::{ApiClient, EventFilter};
use chrono::NaiveDate;
use serde::Deserialize;
use std::time::Duration;
use ticket_core::{
    format_major_units, to_count, to_minor_units, validate_attendee_draft, validate_new_event,
    AttendeeDraft, AttendeeId, EventId, NewEvent,
};
use ticket_rules::{authorize_registration, build_patch, check_purchase, EventEdit};
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct CliConfig {
    api_url: String,
    timeout_secs: u64,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000".to_string(),
            timeout_secs: 10,
        }
    }
}

fn load_config(path: Option<&str>) -> Result<CliConfig> {
    let mut cfg = match path {
        Some(p) => {
            let raw = std::fs::read_to_string(p).with_context(|| format!("reading config {p}"))?;
            serde_yaml::from_str(&raw).with_context(|| format!("parsing config {p}"))?
        }
        None => CliConfig::default(),
    };
    if let Ok(url) = std::env::var("EVENTDESK_API_URL") {
        cfg.api_url = url;
    }
    Ok(cfg)
}

/// Flag values collected from the command line. Everything stays a string
/// here; normalization happens in the rules layer.
#[derive(Debug, Default, PartialEq)]
struct Flags {
    config: Option<String>,
    id: Option<String>,
    title: Option<String>,
    date: Option<String>,
    location: Option<String>,
    description: Option<String>,
    capacity: Option<String>,
    price: Option<String>,
    name: Option<String>,
    email: Option<String>,
    quantity: Option<String>,
    file: Option<String>,
    from: Option<String>,
    to: Option<String>,
}

fn parse_flags<I: Iterator<Item = String>>(mut it: I) -> Flags {
    let mut f = Flags::default();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--config" => f.config = it.next(),
            "--id" => f.id = it.next(),
            "--title" => f.title = it.next(),
            "--date" => f.date = it.next(),
            "--location" => f.location = it.next(),
            "--description" => f.description = it.next(),
            "--capacity" => f.capacity = it.next(),
            "--price" => f.price = it.next(),
            "--name" => f.name = it.next(),
            "--email" => f.email = it.next(),
            "--quantity" => f.quantity = it.next(),
            "--file" => f.file = it.next(),
            "--from" => f.from = it.next(),
            "--to" => f.to = it.next(),
            _ => {}
        }
    }
    f
}

fn required(value: Option<String>, flag: &str) -> Result<String> {
    value.ok_or_else(|| anyhow!("missing required flag {flag}"))
}

fn event_id(flags: &Flags) -> Result<EventId> {
    let raw = required(flags.id.clone(), "--id")?;
    Ok(EventId(raw.parse().context("--id must be an integer")?))
}

fn attendee_id(flags: &Flags) -> Result<AttendeeId> {
    let raw = required(flags.id.clone(), "--id")?;
    Ok(AttendeeId(raw.parse().context("--id must be an integer")?))
}

fn draft_from_flags(flags: &Flags) -> Result<AttendeeDraft> {
    let draft = AttendeeDraft {
        name: required(flags.name.clone(), "--name")?,
        email: required(flags.email.clone(), "--email")?,
    };
    validate_attendee_draft(&draft)?;
    Ok(draft)
}

fn parse_date(raw: &str, flag: &str) -> Result<NaiveDate> {
    raw.parse()
        .with_context(|| format!("{flag} must be YYYY-MM-DD"))
}

const USAGE: &str = "usage: eventdesk <command> [flags]
  list       [--title s] [--from YYYY-MM-DD] [--to YYYY-MM-DD]
  show       --id n
  create     --title s --date YYYY-MM-DD --capacity n [--price d.dd] [--location s] [--description s]
  edit       --id n [--title s] [--date YYYY-MM-DD] [--capacity n] [--price d.dd] [--location s] [--description s]
  delete     --id n
  attendees  --id n
  register   --id n --name s --email s
  update-attendee --id n --name s --email s
  purchase   --id n --name s --email s --quantity n
  import     --file path.csv
  report
common: --config path.yaml (or EVENTDESK_API_URL)";

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::INFO)
        .init();

    let mut args = std::env::args().skip(1);
    let command = match args.next() {
        Some(c) => c,
        None => {
            eprintln!("{USAGE}");
            bail!("no command given");
        }
    };
    let flags = parse_flags(args);

    let cfg = load_config(flags.config.as_deref())?;
    info!(git_sha = env!("GIT_SHA"), api_url = %cfg.api_url, "eventdesk starting");
    let api = ApiClient::new(&cfg.api_url, Duration::from_secs(cfg.timeout_secs))?;

    match command.as_str() {
        "list" => list(&api, &flags).await,
        "show" => show(&api, &flags).await,
        "create" => create(&api, &flags).await,
        "edit" => edit(&api, &flags).await,
        "delete" => delete(&api, &flags).await,
        "attendees" => attendees(&api, &flags).await,
        "register" => register(&api, &flags).await,
        "update-attendee" => update_attendee(&api, &flags).await,
        "purchase" => purchase(&api, &flags).await,
        "import" => import(&api, &flags).await,
        "report" => report(&api).await,
        other => {
            eprintln!("{USAGE}");
            bail!("unknown command: {other}");
        }
    }
}

async fn list(api: &ApiClient, flags: &Flags) -> Result<()> {
    let filter = EventFilter {
        title: flags.title.clone(),
        date_from: flags
            .from
            .as_deref()
            .map(|d| parse_date(d, "--from"))
            .transpose()?,
        date_to: flags
            .to
            .as_deref()
            .map(|d| parse_date(d, "--to"))
            .transpose()?,
    };
    let events = api.list_events(&filter).await?;
    if events.is_empty() {
        println!("no events");
        return Ok(());
    }
    println!(
        "{:>5}  {:10}  {:30}  {:>8}  {:>6}  {:>9}  {:>10}",
        "id", "date", "title", "capacity", "sold", "available", "price"
    );
    for e in &events {
        println!(
            "{:>5}  {:10}  {:30}  {:>8}  {:>6}  {:>9}  {:>10}",
            e.id.0,
            e.date.to_string(),
            e.title,
            e.capacity,
            e.tickets_sold,
            e.tickets_available(),
            format_major_units(e.ticket_price_cents)
        );
    }
    Ok(())
}

async fn show(api: &ApiClient, flags: &Flags) -> Result<()> {
    let e = api.get_event(event_id(flags)?).await?;
    println!("#{} {}", e.id.0, e.title);
    println!("date:        {}", e.date);
    if !e.location.is_empty() {
        println!("location:    {}", e.location);
    }
    if !e.description.is_empty() {
        println!("description: {}", e.description);
    }
    println!(
        "capacity:    {} ({} sold, {} available)",
        e.capacity,
        e.tickets_sold,
        e.tickets_available()
    );
    println!("price:       {}", format_major_units(e.ticket_price_cents));
    println!("revenue:     {}", format_major_units(e.revenue_cents()));
    Ok(())
}

async fn create(api: &ApiClient, flags: &Flags) -> Result<()> {
    let capacity_raw = required(flags.capacity.clone(), "--capacity")?;
    let capacity = to_count(capacity_raw.parse().unwrap_or(f64::NAN))?;
    let price = flags.price.as_deref().unwrap_or("0.00");
    let event = NewEvent {
        title: required(flags.title.clone(), "--title")?,
        date: parse_date(&required(flags.date.clone(), "--date")?, "--date")?,
        description: flags.description.clone().unwrap_or_default(),
        location: flags.location.clone().unwrap_or_default(),
        capacity,
        ticket_price_cents: to_minor_units(price)?,
    };
    validate_new_event(&event)?;
    let created = api.create_event(&event).await?;
    println!("created event #{}: {}", created.id.0, created.title);
    Ok(())
}

async fn edit(api: &ApiClient, flags: &Flags) -> Result<()> {
    let id = event_id(flags)?;
    let original = api.get_event(id).await?;
    let proposed = EventEdit {
        title: flags.title.clone(),
        date: flags.date.clone(),
        location: flags.location.clone(),
        description: flags.description.clone(),
        // Unparseable input becomes NaN so the normalizer rejects it.
        capacity: flags
            .capacity
            .as_deref()
            .map(|c| c.parse().unwrap_or(f64::NAN)),
        price: flags.price.clone(),
    };
    let patch = build_patch(&original, &proposed)?;
    if patch.is_empty() {
        println!("no changes for event #{}", id.0);
        return Ok(());
    }
    let updated = api.update_event(id, &patch).await?;
    println!(
        "updated event #{} | capacity: {} | sold: {} | price: {}",
        updated.id.0,
        updated.capacity,
        updated.tickets_sold,
        format_major_units(updated.ticket_price_cents)
    );
    Ok(())
}

async fn delete(api: &ApiClient, flags: &Flags) -> Result<()> {
    let id = event_id(flags)?;
    api.delete_event(id).await?;
    println!("deleted event #{}", id.0);
    Ok(())
}

async fn attendees(api: &ApiClient, flags: &Flags) -> Result<()> {
    let id = event_id(flags)?;
    let attendees = api.list_attendees(id).await?;
    if attendees.is_empty() {
        println!("no attendees for event #{}", id.0);
        return Ok(());
    }
    for a in &attendees {
        println!("{:>5}  {:25}  {}", a.id.0, a.name, a.email);
    }
    Ok(())
}

async fn register(api: &ApiClient, flags: &Flags) -> Result<()> {
    let id = event_id(flags)?;
    let draft = AttendeeDraft {
        name: required(flags.name.clone(), "--name")?,
        email: required(flags.email.clone(), "--email")?,
    };
    // Advisory check against the current snapshot; the server re-checks and
    // its decision is final.
    let event = api.get_event(id).await?;
    authorize_registration(&event, &draft)?;
    let attendee = api.register_attendee(id, &draft).await?;
    println!(
        "registered {} (#{}) for event #{}",
        attendee.name, attendee.id.0, id.0
    );
    Ok(())
}

async fn update_attendee(api: &ApiClient, flags: &Flags) -> Result<()> {
    let id = attendee_id(flags)?;
    let draft = draft_from_flags(flags)?;
    let updated = api.update_attendee(id, &draft).await?;
    println!(
        "updated attendee #{}: {} <{}>",
        updated.id.0, updated.name, updated.email
    );
    Ok(())
}

async fn purchase(api: &ApiClient, flags: &Flags) -> Result<()> {
    let id = event_id(flags)?;
    let name = required(flags.name.clone(), "--name")?;
    let email = required(flags.email.clone(), "--email")?;
    let quantity: u32 = required(flags.quantity.clone(), "--quantity")?
        .parse()
        .context("--quantity must be a non-negative integer")?;
    let event = api.get_event(id).await?;
    check_purchase(&event, quantity)?;
    let receipt = api.purchase_tickets(id, &name, &email, quantity).await?;
    println!(
        "purchased {} ticket(s) | revenue: {} | now sold: {}",
        receipt.tickets_purchased,
        format_major_units(receipt.revenue_cents),
        receipt.tickets_sold
    );
    Ok(())
}

async fn import(api: &ApiClient, flags: &Flags) -> Result<()> {
    let path = required(flags.file.clone(), "--file")?;
    let contents = tokio::fs::read(&path)
        .await
        .with_context(|| format!("reading {path}"))?;
    let file_name = std::path::Path::new(&path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("events.csv");
    let outcome = api.import_events(file_name, contents).await?;
    println!(
        "import finished | created: {} | errors: {}",
        outcome.created.len(),
        outcome.errors.len()
    );
    for row in &outcome.created {
        println!(
            "  row {:>3}: created #{} {}",
            row.row, row.event_id.0, row.title
        );
    }
    for err in &outcome.errors {
        println!("  row {:>3}: {}", err.row, err.error);
    }
    Ok(())
}

async fn report(api: &ApiClient) -> Result<()> {
    let report = api.sales_report().await?;
    println!(
        "{:>5}  {:10}  {:30}  {:>6}  {:>9}  {:>12}",
        "id", "date", "title", "sold", "available", "revenue"
    );
    let mut total_cents: i64 = 0;
    for r in &report.report {
        total_cents += r.revenue_cents;
        println!(
            "{:>5}  {:10}  {:30}  {:>6}  {:>9}  {:>12}",
            r.event_id.0,
            r.date.to_string(),
            r.title,
            r.tickets_sold,
            r.tickets_available,
            format_major_units(r.revenue_cents)
        );
    }
    println!(
        "total revenue: {} (generated {})",
        format_major_units(total_cents),
        report.generated_at
    );
    Ok(())
}
