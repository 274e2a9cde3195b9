#![deny(warnings)]

//! Headless runner: plays Oil Empire for a number of months under a simple
//! autopilot, logs what happens and prints the final KPIs.

use anyhow::{Context, Result};
use oil_core::{Catalog, ChaChaSource, ContinentId, FieldTypeId, RuleConfig};
use oil_goals::GameOutcome;
use oil_runtime::{Session, SessionTick, Simulation, TickError};
use persistence::{FileStore, DEFAULT_SAVE_KEY};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
struct Args {
    months: u32,
    seed: u64,
    save_dir: Option<PathBuf>,
    catalog: Option<PathBuf>,
    rules: Option<PathBuf>,
    new_game: bool,
    print_rules: bool,
    version: bool,
}

fn parse_args() -> Args {
    let mut args = Args {
        months: 120,
        seed: 42,
        save_dir: None,
        catalog: None,
        rules: None,
        new_game: false,
        print_rules: false,
        version: false,
    };
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--months" => {
                if let Some(m) = it.next().and_then(|s| s.parse().ok()) {
                    args.months = m;
                }
            }
            "--seed" => {
                if let Some(s) = it.next().and_then(|s| s.parse().ok()) {
                    args.seed = s;
                }
            }
            "--save-dir" => args.save_dir = it.next().map(PathBuf::from),
            "--catalog" => args.catalog = it.next().map(PathBuf::from),
            "--rules" => args.rules = it.next().map(PathBuf::from),
            "--new" => args.new_game = true,
            "--print-rules" => args.print_rules = true,
            "--version" => args.version = true,
            other => warn!(arg = other, "ignoring unknown argument"),
        }
    }
    args
}

fn load_simulation(args: &Args) -> Result<Simulation> {
    let catalog = match &args.catalog {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading catalog {}", path.display()))?;
            Catalog::from_yaml_str(&text)
                .with_context(|| format!("loading catalog {}", path.display()))?
        }
        None => Catalog::builtin().context("loading built-in catalog")?,
    };
    let rules = match &args.rules {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading rules {}", path.display()))?;
            RuleConfig::from_yaml_str(&text)
                .with_context(|| format!("loading rules {}", path.display()))?
        }
        None => RuleConfig::default(),
    };
    Ok(Simulation::new(catalog, rules))
}

/// Keeps the lights on: maintenance, research, steady field purchases,
/// shipping to the best market and selling whatever has arrived.
fn autopilot(session: &mut Session<ChaChaSource>) {
    let grace = session.simulation().rules().maintenance_grace_months;
    let overdue = session
        .state()
        .fields
        .iter()
        .any(|f| f.months_since_maintenance() >= grace);
    if overdue {
        if let Err(e) = session.perform_maintenance() {
            debug!(error = %e, "maintenance skipped");
        }
    }

    if session.state().research.in_progress.is_none() {
        let next = session
            .simulation()
            .technology()
            .available(session.state())
            .into_iter()
            .filter(|t| t.cost * 4 <= session.state().money)
            .min_by_key(|t| t.cost)
            .map(|t| t.id.clone());
        if let Some(tech) = next {
            if let Err(e) = session.start_research(&tech) {
                debug!(error = %e, "research skipped");
            }
        }
    }

    let conventional = FieldTypeId::from("conventional");
    let cost = session
        .simulation()
        .fields()
        .purchase_cost(session.state(), &conventional);
    if matches!(cost, Ok(c) if c * 2 <= session.state().money) {
        if let Err(e) = session.purchase_field(&conventional) {
            debug!(error = %e, "purchase skipped");
        }
    }

    let upgrade = session.simulation().fields().upgrade_cost(session.state());
    if matches!(upgrade, Ok(c) if c * 3 <= session.state().money) {
        if let Err(e) = session.upgrade_equipment() {
            debug!(error = %e, "upgrade skipped");
        }
    }

    let best: Option<ContinentId> = {
        let sim = session.simulation();
        let shipping = sim.shipping();
        sim.catalog()
            .continents
            .iter()
            .filter_map(|c| {
                shipping
                    .continent_price(session.state(), &c.id)
                    .ok()
                    .map(|p| (p, c.id.clone()))
            })
            .max_by_key(|(p, _)| *p)
            .map(|(_, id)| id)
    };
    let stock = session.state().oil_stock;
    if let (Some(target), true) = (best, stock > 0) {
        if let Err(e) = session.ship(&target, stock) {
            debug!(error = %e, "shipment skipped");
        }
    }

    let ready: Vec<(ContinentId, u64)> = session
        .state()
        .ledgers
        .iter()
        .filter(|(_, l)| l.available > 0)
        .map(|(id, l)| (id.clone(), l.available))
        .collect();
    for (id, amount) in ready {
        if let Err(e) = session.sell(&id, amount) {
            debug!(error = %e, continent = %id, "sale skipped");
        }
    }
}

fn report_month(tick: &SessionTick) {
    let r = &tick.report;
    for tech in &r.completed_research {
        info!(%tech, "research completed");
    }
    for crisis in &r.triggered {
        info!(crisis = %crisis.name, impact = ?crisis.impact, "crisis");
    }
    for id in &tick.unlocked {
        println!("Achievement unlocked: {id}");
    }
    debug!(
        date = %r.date,
        production = r.production,
        price = r.base_price,
        trend = ?r.trend,
        "month"
    );
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::DEBUG)
        .init();

    let args = parse_args();
    if args.version {
        println!("oil-empire {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }
    info!(?args, version = env!("CARGO_PKG_VERSION"), "starting oil-empire");

    let sim = load_simulation(&args)?;
    if args.print_rules {
        print!("{}", serde_yaml::to_string(sim.rules())?);
        return Ok(());
    }

    let rng = ChaChaSource::seed_from_u64(args.seed);
    let mut session = match &args.save_dir {
        Some(dir) if !args.new_game => {
            Session::resume(sim, rng, Box::new(FileStore::new(dir)), DEFAULT_SAVE_KEY)
        }
        Some(dir) => {
            let mut fresh = Session::new(sim, rng)
                .with_store(Box::new(FileStore::new(dir)), DEFAULT_SAVE_KEY);
            fresh.restart();
            fresh
        }
        None => Session::new(sim, rng),
    };

    let mut played = 0;
    for _ in 0..args.months {
        autopilot(&mut session);
        match session.tick() {
            Ok(tick) => {
                report_month(&tick);
                played += 1;
            }
            Err(TickError::GameOver(outcome)) => {
                info!(?outcome, "game already finished");
                break;
            }
            Err(e) => return Err(e.into()),
        }
        if session.outcome().is_over() {
            break;
        }
    }

    let s = session.state();
    let p = s.progress();
    println!(
        "KPI | months: {} | date: {}-{:02} | money: ${} | peak: ${} | stock: {} bbl | in transit: {} bbl | fields: {} | equipment: {} | techs: {} | drilled: {} | sold: {}",
        played,
        s.year(),
        s.month(),
        p.money,
        p.max_money,
        p.oil_stock,
        p.total_in_transit,
        p.fields_owned,
        p.equipment_level,
        p.technologies_completed,
        p.total_drilled,
        p.total_sold
    );
    println!(
        "Market | trend: {:?} | base price: ${}",
        s.market.trend, s.market.base_price
    );
    if let Some(outlook) = session.outlook() {
        println!(
            "Outlook | down: {:.0}% | stay: {:.0}% | up: {:.0}%",
            outlook.down * 100.0,
            outlook.stay * 100.0,
            outlook.up * 100.0
        );
    }
    println!(
        "Achievements: {} / crises so far: {}",
        session.achievements().unlocked.len(),
        s.crises.history.len() + s.crises.active.len()
    );
    match session.outcome() {
        GameOutcome::InProgress => println!("Game in progress"),
        GameOutcome::Won => println!("Won: the empire is complete"),
        GameOutcome::Bankrupt => println!("Bankrupt"),
        GameOutcome::TimeUp => println!("Time is up"),
    }
    Ok(())
}
