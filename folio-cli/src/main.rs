//! Folio CLI — portfolio, watchlist, simulation and advisor commands.
//!
//! Commands:
//! - `portfolio list|show|add|update|remove`: manage holdings
//! - `watchlist list|add|remove|alerts`: target-price watchlist
//! - `simulate --amount X`: what-if contribution, optionally saved or exported
//! - `history`: saved simulations, newest first
//! - `quote TICKER`: one live price through the provider chain
//! - `prefs theme`: show or change the display theme
//! - `advise PROMPT`: ask the text-generation advisor

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use folio_core::data::{QuoteError, QuoteOrigin};
use folio_core::domain::{HoldingInput, Theme, Ticker, UserId, UserRecommendation, WatchItem};
use folio_core::rebalance::{value_portfolio, SimulationResult};
use folio_core::validation::parse_investment_amount;
use folio_runner::export::write_recommendations_csv;
use folio_runner::logging::init_logging;
use folio_runner::{build_prompt, AppConfig, AppContext, Session};

#[derive(Parser)]
#[command(name = "folio", about = "Folio CLI — portfolio rebalancing calculator")]
struct Cli {
    /// User whose saved data to use. Without it, nothing is read or written.
    #[arg(long, global = true, env = "FOLIO_USER")]
    user: Option<String>,

    /// Path to folio.toml. Defaults to ./folio.toml when present.
    #[arg(long, global = true, env = "FOLIO_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage portfolio holdings.
    Portfolio {
        #[command(subcommand)]
        action: PortfolioAction,
    },
    /// Manage the target-price watchlist.
    Watchlist {
        #[command(subcommand)]
        action: WatchlistAction,
    },
    /// Simulate investing an amount across the portfolio.
    Simulate {
        /// Amount to invest, e.g. 1000 or "$1,250.50".
        #[arg(long)]
        amount: String,

        /// Save the result to history.
        #[arg(long, default_value_t = false)]
        save: bool,

        /// Write the recommendations to a CSV file.
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// List saved simulations, newest first.
    History {
        /// Show the recommendations of one record (id or unique id prefix).
        #[arg(long)]
        id: Option<String>,
    },
    /// Fetch a live price.
    Quote {
        ticker: String,
    },
    /// Show or change preferences.
    Prefs {
        #[command(subcommand)]
        action: PrefsAction,
    },
    /// Ask the advisor a free-text question.
    Advise {
        prompt: String,

        /// Include the current portfolio in the prompt.
        #[arg(long, default_value_t = false)]
        with_portfolio: bool,
    },
}

#[derive(Subcommand)]
enum PortfolioAction {
    /// List saved holdings.
    List,
    /// Current vs target allocation at live prices.
    Show,
    /// Add a holding.
    Add(HoldingArgs),
    /// Replace an existing holding.
    Update(HoldingArgs),
    /// Remove a holding.
    Remove { ticker: String },
}

#[derive(clap::Args)]
struct HoldingArgs {
    ticker: String,

    /// Number of shares held.
    #[arg(long)]
    quantity: f64,

    /// Target allocation in percent (0-100).
    #[arg(long)]
    target: f64,

    /// Buy, Hold or Sell.
    #[arg(long, default_value = "buy")]
    recommendation: UserRecommendation,

    /// Do not recommend buying above this price.
    #[arg(long)]
    ceiling: Option<f64>,

    /// Average cost per share, for yield on cost.
    #[arg(long)]
    cost: Option<f64>,
}

impl HoldingArgs {
    fn into_input(self) -> HoldingInput {
        HoldingInput {
            ticker: self.ticker,
            quantity: self.quantity,
            target_percentage: self.target,
            user_recommendation: self.recommendation,
            price_ceiling: self.ceiling,
            average_cost: self.cost,
        }
    }
}

#[derive(Subcommand)]
enum WatchlistAction {
    /// List watched tickers.
    List,
    /// Add or replace a watched ticker.
    Add {
        ticker: String,

        /// Price at or below which to alert.
        #[arg(long)]
        target: f64,

        #[arg(long)]
        notes: Option<String>,
    },
    /// Stop watching a ticker.
    Remove { ticker: String },
    /// Watched tickers trading at or below their target.
    Alerts,
}

#[derive(Subcommand)]
enum PrefsAction {
    /// Show the theme, or set it to light, dark or toggle.
    Theme { value: Option<String> },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_logging("warn,folio_core=warn,folio_runner=warn");

    let cli = Cli::parse();
    let session = session_for(cli.user.as_deref())?;
    let config = AppConfig::load(cli.config.as_deref())?;
    let ctx = AppContext::build(config).context("failed to initialise services")?;

    match cli.command {
        Commands::Portfolio { action } => run_portfolio(&ctx, &session, action),
        Commands::Watchlist { action } => run_watchlist(&ctx, &session, action),
        Commands::Simulate { amount, save, csv } => run_simulate(&ctx, &session, &amount, save, csv),
        Commands::History { id } => run_history(&ctx, &session, id.as_deref()),
        Commands::Quote { ticker } => run_quote(&ctx, &ticker),
        Commands::Prefs {
            action: PrefsAction::Theme { value },
        } => run_theme(&ctx, &session, value.as_deref()),
        Commands::Advise {
            prompt,
            with_portfolio,
        } => run_advise(&ctx, &session, &prompt, with_portfolio),
    }
}

fn session_for(user: Option<&str>) -> Result<Session> {
    match user.map(str::trim).filter(|u| !u.is_empty()) {
        Some(raw) => Ok(Session::signed_in(UserId::parse(raw)?)),
        None => Ok(Session::anonymous()),
    }
}

fn report_write(written: bool, what: &str) {
    if written {
        println!("{what}");
    } else {
        println!("Not signed in: {what} (not written; pass --user or set FOLIO_USER)");
    }
}

fn run_portfolio(ctx: &AppContext, session: &Session, action: PortfolioAction) -> Result<()> {
    let accounts = &ctx.accounts;
    match action {
        PortfolioAction::List => {
            let portfolio = accounts.portfolio(session)?;
            if portfolio.is_empty() {
                println!("Portfolio is empty.");
                return Ok(());
            }
            println!(
                "{:<8} {:>10} {:>8} {:<10} {:>10} {:>10}",
                "Ticker", "Quantity", "Target", "Action", "Ceiling", "Avg Cost"
            );
            println!("{}", "-".repeat(61));
            for h in portfolio.holdings() {
                println!(
                    "{:<8} {:>10.4} {:>7.1}% {:<10} {:>10} {:>10}",
                    h.ticker,
                    h.quantity,
                    h.target_percentage,
                    h.user_recommendation,
                    format_optional_money(h.price_ceiling),
                    format_optional_money(h.average_cost),
                );
            }
            warn_target_total(portfolio.target_total());
        }
        PortfolioAction::Show => {
            let view = ctx.simulations.allocation(session)?;
            if view.rows.is_empty() {
                println!("Portfolio is empty.");
                return Ok(());
            }
            println!("Portfolio value: ${:.2}", view.total_value);
            println!();
            println!("{:<8} {:>12} {:>9} {:>9} {:>9}", "Ticker", "Value", "Current", "Target", "Drift");
            println!("{}", "-".repeat(51));
            for row in &view.rows {
                println!(
                    "{:<8} {:>12.2} {:>8.2}% {:>8.2}% {:>+8.2}%",
                    row.ticker, row.current_value, row.current_percentage, row.target_percentage, row.drift
                );
            }
            warn_target_total(view.target_total);
            print_quote_failures(&view.quote_failures);
        }
        PortfolioAction::Add(args) => {
            let holding = args.into_input().validate()?;
            let ticker = holding.ticker.clone();
            report_write(accounts.add_holding(session, holding)?, &format!("Added {ticker}."));
        }
        PortfolioAction::Update(args) => {
            let holding = args.into_input().validate()?;
            let ticker = holding.ticker.clone();
            report_write(accounts.update_holding(session, holding)?, &format!("Updated {ticker}."));
        }
        PortfolioAction::Remove { ticker } => {
            let ticker = Ticker::parse(&ticker)?;
            report_write(accounts.remove_holding(session, &ticker)?, &format!("Removed {ticker}."));
        }
    }
    Ok(())
}

fn run_watchlist(ctx: &AppContext, session: &Session, action: WatchlistAction) -> Result<()> {
    let accounts = &ctx.accounts;
    match action {
        WatchlistAction::List => {
            let watchlist = accounts.watchlist(session)?;
            if watchlist.is_empty() {
                println!("Watchlist is empty.");
                return Ok(());
            }
            println!("{:<8} {:>10} {:<12} Notes", "Ticker", "Target", "Added");
            println!("{}", "-".repeat(44));
            for item in watchlist.items() {
                println!(
                    "{:<8} {:>10.2} {:<12} {}",
                    item.ticker,
                    item.target_price,
                    item.added_at.format("%Y-%m-%d"),
                    item.notes.as_deref().unwrap_or("")
                );
            }
        }
        WatchlistAction::Add { ticker, target, notes } => {
            let item = WatchItem::new(Ticker::parse(&ticker)?, target, notes, Utc::now())?;
            let ticker = item.ticker.clone();
            report_write(
                accounts.upsert_watch_item(session, item)?,
                &format!("Watching {ticker} at ${target:.2}."),
            );
        }
        WatchlistAction::Remove { ticker } => {
            let ticker = Ticker::parse(&ticker)?;
            report_write(
                accounts.remove_watch_item(session, &ticker)?,
                &format!("Stopped watching {ticker}."),
            );
        }
        WatchlistAction::Alerts => {
            let alerts = ctx.simulations.watchlist_alerts(session)?;
            if alerts.is_empty() {
                println!("No watched ticker is at or below its target.");
                return Ok(());
            }
            for alert in &alerts {
                println!(
                    "{:<8} ${:.2} (target ${:.2}, {:.1}% below)",
                    alert.ticker, alert.current_price, alert.target_price, alert.below_target_pct
                );
            }
        }
    }
    Ok(())
}

fn run_simulate(
    ctx: &AppContext,
    session: &Session,
    raw_amount: &str,
    save: bool,
    csv: Option<PathBuf>,
) -> Result<()> {
    let amount = parse_investment_amount(raw_amount)?;
    let portfolio = ctx.accounts.portfolio(session)?;
    if portfolio.is_empty() {
        println!("Portfolio is empty; nothing to allocate.");
    } else {
        warn_target_total(portfolio.target_total());
    }

    let outcome = ctx.simulations.run_for(&portfolio, amount)?;
    print_simulation(&outcome.result);
    print_quote_failures(&outcome.quote_failures);

    if let Some(path) = csv {
        write_recommendations_csv(&path, &outcome.result)?;
        println!("Recommendations written to: {}", path.display());
    }

    if save {
        match ctx.simulations.save(session, &outcome)? {
            Some(record) => println!("Saved to history as {}.", record.id),
            None => report_write(false, "Simulation saved"),
        }
    }
    Ok(())
}

fn run_history(ctx: &AppContext, session: &Session, id: Option<&str>) -> Result<()> {
    let history = ctx.simulations.history();
    if let Some(id) = id {
        let Some(record) = history.find(session, id)? else {
            bail!("no single saved simulation matches '{id}'");
        };
        println!("Simulation {} ({})", record.id, record.created_at.format("%Y-%m-%d %H:%M UTC"));
        println!("Invested:       ${:.2}", record.investment_amount);
        println!("Allocated:      ${:.2}", record.allocated_investment);
        println!(
            "Value:          ${:.2} -> ${:.2} ({:+.2}%)",
            record.portfolio_value_before, record.portfolio_value_after, record.percentage_change
        );
        println!();
        print_recommendation_rows(&record.recommendations);
        return Ok(());
    }

    let records = history.read_all(session)?;
    if records.is_empty() {
        println!("No saved simulations.");
        return Ok(());
    }
    println!("{:<18} {:<18} {:>12} {:>12} {:>9}", "Id", "Saved", "Invested", "Value After", "Change");
    println!("{}", "-".repeat(73));
    for r in &records {
        println!(
            "{:<18} {:<18} {:>12.2} {:>12.2} {:>+8.2}%",
            r.id,
            r.created_at.format("%Y-%m-%d %H:%M"),
            r.investment_amount,
            r.portfolio_value_after,
            r.percentage_change
        );
    }
    Ok(())
}

fn run_quote(ctx: &AppContext, raw: &str) -> Result<()> {
    let ticker = Ticker::parse(raw)?;
    let quote = ctx.quotes.quote(&ticker)?;
    let origin = match &quote.origin {
        QuoteOrigin::Cache => "cache".to_string(),
        QuoteOrigin::Provider(name) => name.clone(),
        QuoteOrigin::Placeholder => "placeholder".to_string(),
    };
    println!("{} ${:.2} ({origin}, {})", quote.ticker, quote.price, quote.fetched_at.format("%H:%M:%S UTC"));
    Ok(())
}

fn run_theme(ctx: &AppContext, session: &Session, value: Option<&str>) -> Result<()> {
    let mut prefs = ctx.accounts.preferences(session)?;
    let Some(value) = value else {
        println!("Theme: {}", prefs.theme);
        return Ok(());
    };
    prefs.theme = match value.trim().to_ascii_lowercase().as_str() {
        "toggle" => prefs.theme.toggled(),
        other => other.parse::<Theme>().map_err(anyhow::Error::msg)?,
    };
    report_write(
        ctx.accounts.save_preferences(session, &prefs)?,
        &format!("Theme set to {}.", prefs.theme),
    );
    Ok(())
}

fn run_advise(ctx: &AppContext, session: &Session, question: &str, with_portfolio: bool) -> Result<()> {
    let prompt = if with_portfolio {
        let portfolio = ctx.accounts.portfolio(session)?;
        let snapshot = ctx.simulations.price_snapshot(portfolio.tickers());
        let valuation = value_portfolio(&portfolio, &snapshot.prices, &ctx.config.valuation.yield_assumption());
        build_prompt(&valuation, None, question)
    } else {
        question.to_string()
    };
    let answer = ctx.advisor.generate(&prompt)?;
    println!("{answer}");
    Ok(())
}

// ── Output helpers ───────────────────────────────────────────────────

fn print_simulation(result: &SimulationResult) {
    println!();
    println!("=== Simulation ===");
    println!("Invest:         ${:.2}", result.total_investment);
    println!("Allocated:      ${:.2}", result.allocated_investment);
    if result.unallocated_cash > 0.0 {
        println!("Unallocated:    ${:.2}", result.unallocated_cash);
    }
    println!("Value before:   ${:.2}", result.portfolio_value_before);
    println!("Value after:    ${:.2}", result.portfolio_value_after);
    println!("Change:         {:+.2}%", result.percentage_change);
    if let Some(yoc) = result.average_yield_on_cost {
        let note = if result.yield_is_estimate { " (estimate)" } else { "" };
        println!("Yield on cost:  {yoc:.2}%{note}");
    }
    println!();
    print_recommendation_rows(&result.recommendations);
    if result.has_any_above_ceiling {
        println!();
        println!("NOTE: some holdings trade above their price ceiling and were skipped.");
    }
    println!();
}

fn print_recommendation_rows(recs: &[folio_core::rebalance::Recommendation]) {
    println!(
        "{:<8} {:>10} {:>8} {:>8} {:>12} {:>12}  Note",
        "Ticker", "Price", "Current", "Target", "Invest", "Shares"
    );
    println!("{}", "-".repeat(80));
    for r in recs {
        let note = r.override_reason.map(|o| o.to_string()).unwrap_or_default();
        println!(
            "{:<8} {:>10} {:>7.2}% {:>7.2}% {:>12.2} {:>12.4}  {note}",
            r.ticker,
            format_optional_money(Some(r.current_price).filter(|p| *p > 0.0)),
            r.current_percentage,
            r.target_percentage,
            r.recommended_investment,
            r.expected_shares,
        );
    }
}

fn print_quote_failures(failures: &[(Ticker, QuoteError)]) {
    for (ticker, err) in failures {
        println!("WARNING: no price for {ticker}, treated as unpriced ({err})");
    }
}

/// Targets are independent; a total other than 100 is informational.
fn warn_target_total(total: f64) {
    if (total - 100.0).abs() > 0.01 {
        println!("WARNING: target percentages add up to {total:.2}%, not 100%");
    }
}

fn format_optional_money(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.2}")).unwrap_or_else(|| "-".into())
}
