//! `duka` - drive the cart and checkout from a terminal.
//!
//! ```bash
//! duka add 42          # add product 42 from the catalog
//! duka show
//! duka dec 1           # line numbers are 1-based
//! duka checkout
//! duka orders
//! ```
//!
//! Configuration comes from `DUKA_*` environment variables; checkout, orders
//! and add need `DUKA_API_URL` and `DUKA_API_KEY`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use duka_cart::{Cart, Decremented};
use duka_client::rest::{RestCatalog, RestClient, RestOrderStore};
use duka_client::{
    CartModel, CartStore, CheckoutSession, ClientConfig, PaymentSettings, SqliteCartStore,
    SubmitOutcome,
};
use duka_core::{ProductId, UserId};

#[derive(Parser)]
#[command(name = "duka")]
#[command(author, version, about = "Duka storefront cart")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the cart and its total
    Show,
    /// Add a catalog product to the cart
    Add { product_id: String },
    /// Increase the quantity of a line
    Inc { line: usize },
    /// Decrease the quantity of a line (removes it below one)
    Dec { line: usize },
    /// Remove a line
    Remove { line: usize },
    /// Empty the cart
    Clear,
    /// Submit the cart as an order
    Checkout,
    /// List your previous orders
    Orders,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("configuration error: {err}");
            std::process::exit(2);
        }
    };
    duka_observability::init(config.log_format);

    if let Err(err) = run(cli.command, &config).await {
        tracing::error!("command failed: {err:#}");
        std::process::exit(1);
    }
}

async fn run(command: Command, config: &ClientConfig) -> anyhow::Result<()> {
    let slot: Arc<dyn CartStore> = Arc::new(SqliteCartStore::from_config(config));

    match command {
        Command::Show => {
            let model = CartModel::open(slot).await;
            print_cart(model.cart(), config);
        }
        Command::Inc { line } => {
            let mut model = CartModel::open(slot).await;
            let quantity = model.increment(to_index(line)?)?;
            model.flush().await;
            println!("line {line}: quantity {quantity}");
        }
        Command::Dec { line } => {
            let mut model = CartModel::open(slot).await;
            match model.decrement(to_index(line)?)? {
                Decremented::Quantity(q) => println!("line {line}: quantity {q}"),
                Decremented::Removed(removed) => println!("removed {}", removed.name),
            }
            model.flush().await;
        }
        Command::Remove { line } => {
            let mut model = CartModel::open(slot).await;
            let removed = model.remove(to_index(line)?)?;
            model.flush().await;
            println!("removed {}", removed.name);
        }
        Command::Clear => {
            let mut model = CartModel::open(slot).await;
            model.clear();
            model.flush().await;
            println!("cart cleared");
        }
        Command::Add { product_id } => {
            let client = RestClient::from_config(config)?;
            let session = open_session(slot, &client, config).await?;
            let id = ProductId::parse(&product_id)?;
            let index = session
                .add_from_catalog(&RestCatalog::new(client), &id)
                .await?;
            session.flush().await;
            if let Some(line) = session.lines().get(index) {
                println!("{} x{}", line.name, line.quantity);
            }
        }
        Command::Checkout => {
            let client = RestClient::from_config(config)?;
            let session = open_session(slot, &client, config).await?;
            let outcome = session.submit().await;
            session.flush().await;
            match outcome {
                SubmitOutcome::Declined => println!("cart is empty"),
                SubmitOutcome::AlreadySubmitting | SubmitOutcome::Stale => {}
                SubmitOutcome::Placed { order, payment, notice } => {
                    println!("{notice} (order {})", order.order_id);
                    println!("{}", payment.message());
                }
                SubmitOutcome::Failed { error, notice } => {
                    anyhow::bail!("{notice} ({error})");
                }
            }
        }
        Command::Orders => {
            let client = RestClient::from_config(config)?;
            let session = open_session(slot, &client, config).await?;
            let orders = match session.order_history().await {
                Ok(orders) => orders,
                Err(err) => anyhow::bail!("{} ({err})", err.notice()),
            };
            if orders.is_empty() {
                println!("no orders yet");
            }
            for order in orders {
                println!(
                    "{}  {}  {:<10} {}  ({} items)",
                    order.created_at.format("%Y-%m-%d %H:%M"),
                    order.id,
                    order.status.as_str(),
                    order.amount.labelled(&config.currency_label),
                    order.item_count(),
                );
                for line in &order.lines {
                    println!("    {} x{}", line.label(), line.quantity);
                }
            }
        }
    }
    Ok(())
}

async fn open_session(
    slot: Arc<dyn CartStore>,
    client: &RestClient,
    config: &ClientConfig,
) -> anyhow::Result<CheckoutSession> {
    let user_id = config
        .user_id
        .as_deref()
        .map(UserId::parse)
        .transpose()
        .context("DUKA_USER_ID is not a valid id")?;
    Ok(CheckoutSession::open(
        slot,
        Arc::new(RestOrderStore::new(client.clone())),
        user_id,
        PaymentSettings::from_config(config),
    )
    .await)
}

fn to_index(line: usize) -> anyhow::Result<usize> {
    line.checked_sub(1).context("line numbers start at 1")
}

fn print_cart(cart: &Cart, config: &ClientConfig) {
    if cart.is_empty() {
        println!("cart is empty");
        return;
    }
    for (i, line) in cart.lines().iter().enumerate() {
        println!(
            "{:>3}. {:<30} {:>4} x {:>12} = {:>12}",
            i + 1,
            line.name,
            line.quantity,
            line.unit_price.labelled(&config.currency_label),
            line.subtotal().labelled(&config.currency_label),
        );
    }
    println!("total: {}", cart.total().labelled(&config.currency_label));
}
