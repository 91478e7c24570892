//! # Swift-Checkout CLI
//!
//! Thin presentation stand-in that drives the checkout orchestrator from the
//! terminal.
//!
//! ```bash
//! # Point at the backend and authenticate
//! export CHECKOUT_API_URL=http://localhost:5000
//! export CHECKOUT_API_TOKEN=<bearer token from the auth service>
//!
//! # Inspect and build the cart
//! swift-checkout cart
//! swift-checkout add prod-123 --quantity 2
//!
//! # Pay
//! swift-checkout checkout legacy
//! swift-checkout checkout card --number 4242424242424242 \
//!     --exp-month 12 --exp-year 2030 --cvc 123
//! ```

use anyhow::Context;
use checkout_core::{
    Cart, CardDetails, CartStore, CheckoutMethod, CheckoutOrchestrator, CheckoutState,
};
use checkout_remote::{ApiClient, RemoteCartService, RemoteConfig, RemoteGateway};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "swift-checkout")]
#[command(author, version, about = "Cart and checkout driver")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the current cart
    Cart,
    /// Add a product to the cart
    Add {
        /// Product id
        product_id: String,

        /// Quantity to add
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Change the quantity of a cart line
    Update {
        /// Cart line id
        item_id: String,

        /// New quantity
        #[arg(short, long)]
        quantity: u32,
    },
    /// Remove a cart line
    Remove {
        /// Cart line id
        item_id: String,
    },
    /// Check out the cart
    Checkout {
        #[command(subcommand)]
        method: CheckoutCommand,
    },
}

#[derive(Subcommand)]
enum CheckoutCommand {
    /// Immediate server-side settlement
    Legacy,
    /// Card payment through the gateway
    Card {
        /// Card number
        #[arg(long)]
        number: String,

        /// Expiry month (1-12)
        #[arg(long)]
        exp_month: u8,

        /// Expiry year
        #[arg(long)]
        exp_year: u16,

        /// Card verification code
        #[arg(long)]
        cvc: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::WARN.into())
                .from_env_lossy(),
        )
        .init();

    let cli = Cli::parse();

    let config = RemoteConfig::from_env().context("loading checkout configuration")?;
    let client = ApiClient::new(&config)?;
    let cart_service = Arc::new(RemoteCartService::new(client, config.currency));
    let gateway = Arc::new(RemoteGateway::from_config(&config)?);

    let mut cart = CartStore::new(cart_service, config.currency);
    cart.load().await.context("loading cart")?;
    let mut checkout = CheckoutOrchestrator::new(cart, gateway);

    match cli.command {
        Commands::Cart => {
            print_cart(checkout.cart().snapshot());
        }
        Commands::Add {
            product_id,
            quantity,
        } => {
            let cart = checkout.cart_mut().add_item(&product_id, quantity).await?;
            print_cart(cart);
        }
        Commands::Update { item_id, quantity } => {
            let cart = checkout.cart_mut().update_item(&item_id, quantity).await?;
            print_cart(cart);
        }
        Commands::Remove { item_id } => {
            let cart = checkout.cart_mut().remove_item(&item_id).await?;
            print_cart(cart);
        }
        Commands::Checkout { method } => {
            run_checkout(&mut checkout, method).await?;
        }
    }

    Ok(())
}

async fn run_checkout(
    checkout: &mut CheckoutOrchestrator,
    method: CheckoutCommand,
) -> anyhow::Result<()> {
    let total = checkout.cart().snapshot().grand_total;

    let state = match method {
        CheckoutCommand::Legacy => {
            info!(%total, "starting legacy checkout");
            checkout.start_checkout(CheckoutMethod::Legacy).await?;
            checkout.submit().await?
        }
        CheckoutCommand::Card {
            number,
            exp_month,
            exp_year,
            cvc,
        } => {
            info!(%total, "starting card checkout");
            checkout.start_checkout(CheckoutMethod::GatewayCard).await?;
            checkout.submit().await?;
            let card = CardDetails::new(number, exp_month, exp_year, cvc);
            checkout.submit_card(card).await?
        }
    };

    match state {
        CheckoutState::Succeeded { order } => {
            println!(
                "Checkout successful! Order #{} for {}",
                order.id, order.total_amount
            );
        }
        CheckoutState::RequiresAction { payment_intent_id } => {
            println!(
                "The gateway needs additional authentication for {payment_intent_id}; \
                 complete it and start checkout again"
            );
        }
        state => println!("Checkout ended in state: {state}"),
    }

    Ok(())
}

fn print_cart(cart: &Cart) {
    if cart.is_empty() {
        println!("Your cart is empty");
        return;
    }
    for item in &cart.items {
        println!(
            "{:<12} {:<24} {} x{:<3} = {}",
            item.id,
            item.product_name,
            item.unit_price,
            item.quantity,
            item.total
        );
    }
    println!("Total: {}", cart.grand_total);
}
