//! Command-line front-end.
//!
//! A thin layer over [`DebtBook`] and the catalog: parse arguments, call one operation, render
//! the result as text. The StatusHutang rollup started by a mutation is handed back to the
//! caller so the process can wait for it before exiting.

pub mod format;

use crate::core::catalog::{self, NewContact, NewProduct};
use crate::core::reader::{ensure_workbook, find_product, load_records};
use crate::core::rollup::RollupReport;
use crate::core::{Committed, DebtBook, DebtItem, NewDebt, PaymentRequest, PaymentTarget, Tender};
use crate::errors::{Error, Result};
use crate::records::{Contact, ContactType, DebtRecord, Product, Purchase, Sale};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tokio::task::JoinHandle;

/// `hutang-buddy` arguments
#[derive(Debug, Parser)]
#[command(name = "hutang-buddy")]
#[command(about = "Inventory, sales and debt ledger kept in a spreadsheet")]
#[command(version)]
pub struct Cli {
    /// Configuration file
    #[arg(long, default_value = "config.toml")]
    pub config: PathBuf,

    /// What to do
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create missing sheets and header rows
    Init,

    /// List contacts
    Contacts,

    /// Add a customer or supplier
    AddContact {
        /// Display name
        #[arg(long)]
        name: String,
        /// customer or supplier
        #[arg(long = "type", default_value = "customer")]
        contact_type: ContactType,
        /// Phone number
        #[arg(long, default_value = "")]
        phone: String,
        /// Address
        #[arg(long, default_value = "")]
        address: String,
        /// Notes
        #[arg(long, default_value = "")]
        notes: String,
    },

    /// List products
    Products,

    /// Add a product
    AddProduct {
        /// Display name
        #[arg(long)]
        name: String,
        /// Category
        #[arg(long, default_value = "")]
        category: String,
        /// Unit of sale
        #[arg(long, default_value = "pcs")]
        unit: String,
        /// Purchase cost per unit
        #[arg(long, default_value_t = 0.0)]
        cost: f64,
        /// Selling price per unit
        #[arg(long, default_value_t = 0.0)]
        price: f64,
        /// Opening stock
        #[arg(long, default_value_t = 0.0)]
        stock: f64,
    },

    /// List sales
    Sales,

    /// List purchases
    Purchases,

    /// List ledger entries
    Debts {
        /// Only this contact
        #[arg(long)]
        contact: Option<String>,
        /// Only entries with something remaining
        #[arg(long)]
        open: bool,
    },

    /// Show balances per contact
    Summary {
        /// Only this contact
        #[arg(long)]
        contact: Option<String>,
    },

    /// Record a new debt
    AddDebt {
        /// Owing contact
        #[arg(long)]
        contact: String,
        /// Money amount, or the total for a product debt
        #[arg(long)]
        amount: Option<f64>,
        /// Product taken on credit
        #[arg(long, requires = "quantity")]
        product: Option<String>,
        /// Units taken
        #[arg(long)]
        quantity: Option<f64>,
        /// Due date text
        #[arg(long)]
        due: Option<String>,
        #[command(flatten)]
        common: Submission,
    },

    /// Apply a payment to a contact or one entry
    Pay {
        /// Pay the contact's open debts, oldest first
        #[arg(long, conflicts_with = "debt", required_unless_present = "debt")]
        contact: Option<String>,
        /// Pay one ledger entry
        #[arg(long)]
        debt: Option<String>,
        /// Money paid
        #[arg(long, conflicts_with = "product", required_unless_present = "product")]
        amount: Option<f64>,
        /// Goods handed over
        #[arg(long, requires = "quantity")]
        product: Option<String>,
        /// Units handed over
        #[arg(long)]
        quantity: Option<f64>,
        #[command(flatten)]
        common: Submission,
    },

    /// Pay every open debt of a contact in full
    Settle {
        /// Contact to settle
        #[arg(long)]
        contact: String,
        /// Idempotency key
        #[arg(long)]
        request_id: Option<String>,
    },

    /// Pay a customer's credit balance back out
    CashOut {
        /// Customer
        #[arg(long)]
        contact: String,
        /// Idempotency key
        #[arg(long)]
        request_id: Option<String>,
    },

    /// Rebuild StatusHutang for every contact
    Rollup,
}

/// Options shared by mutating commands.
#[derive(Debug, Clone, Default, Args)]
pub struct Submission {
    /// Free-text notes
    #[arg(long)]
    pub notes: Option<String>,
    /// Idempotency key; a completed key is rejected
    #[arg(long)]
    pub request_id: Option<String>,
}

/// Result of one command.
#[derive(Debug)]
pub struct CommandOutput {
    /// Text to print
    pub text: String,
    /// Background rollup to wait for before exiting
    pub rollup: Option<JoinHandle<Result<RollupReport>>>,
}

impl CommandOutput {
    fn text(text: String) -> Self {
        Self { text, rollup: None }
    }

    fn committed<T>(committed: Committed<T>, render: impl FnOnce(&T) -> String) -> Self {
        Self {
            text: render(&committed.value),
            rollup: Some(committed.rollup),
        }
    }
}

fn lines<T>(items: &[T], render: impl Fn(&T) -> String, empty: &str) -> String {
    if items.is_empty() {
        return empty.to_string();
    }
    items.iter().map(render).collect::<Vec<_>>().join("\n")
}

async fn debt_item(
    book: &DebtBook,
    amount: Option<f64>,
    product: Option<String>,
    quantity: Option<f64>,
) -> Result<DebtItem> {
    match (product, amount) {
        (None, Some(amount)) => Ok(DebtItem::Money { amount }),
        (None, None) => Err(Error::validation("either --amount or --product is required")),
        (Some(product_id), amount) => {
            let quantity = quantity.unwrap_or_default();
            let amount = match amount {
                Some(amount) => amount,
                None => find_product(book.sheet(), &product_id).await?.price * quantity,
            };
            Ok(DebtItem::Product {
                product_id,
                quantity,
                amount,
            })
        }
    }
}

fn tender(amount: Option<f64>, product: Option<String>, quantity: Option<f64>) -> Result<Tender> {
    match (amount, product) {
        (Some(amount), None) => Ok(Tender::Money { amount }),
        (None, Some(product_id)) => Ok(Tender::Goods {
            product_id,
            quantity: quantity.unwrap_or_default(),
        }),
        _ => Err(Error::validation(
            "pay with either --amount or --product and --quantity",
        )),
    }
}

/// Runs one command against `book`.
#[allow(clippy::too_many_lines)] // one arm per subcommand
pub async fn execute(command: Command, book: &DebtBook) -> Result<CommandOutput> {
    let sheet = book.sheet();
    let output = match command {
        Command::Init => {
            ensure_workbook(sheet, book.settings().pace).await?;
            CommandOutput::text("Workbook ready".to_string())
        }
        Command::Contacts => {
            let contacts = load_records::<Contact>(sheet).await?;
            CommandOutput::text(lines(&contacts, format::contact_line, "No contacts yet"))
        }
        Command::AddContact {
            name,
            contact_type,
            phone,
            address,
            notes,
        } => {
            let contact = catalog::add_contact(
                sheet,
                &NewContact {
                    name,
                    contact_type,
                    phone,
                    address,
                    notes,
                },
            )
            .await?;
            CommandOutput::text(format!("Added {}", format::contact_line(&contact)))
        }
        Command::Products => {
            let products = load_records::<Product>(sheet).await?;
            CommandOutput::text(lines(&products, format::product_line, "No products yet"))
        }
        Command::AddProduct {
            name,
            category,
            unit,
            cost,
            price,
            stock,
        } => {
            let product = catalog::add_product(
                sheet,
                &NewProduct {
                    name,
                    category,
                    unit,
                    cost,
                    price,
                    stock,
                },
            )
            .await?;
            CommandOutput::text(format!("Added {}", format::product_line(&product)))
        }
        Command::Sales => {
            let sales = load_records::<Sale>(sheet).await?;
            CommandOutput::text(lines(&sales, format::sale_line, "No sales yet"))
        }
        Command::Purchases => {
            let purchases = load_records::<Purchase>(sheet).await?;
            CommandOutput::text(lines(&purchases, format::purchase_line, "No purchases yet"))
        }
        Command::Debts { contact, open } => {
            let debts: Vec<DebtRecord> = load_records::<DebtRecord>(sheet)
                .await?
                .into_iter()
                .filter(|d| contact.as_deref().is_none_or(|id| d.contact_id == id))
                .filter(|d| !open || d.is_outstanding())
                .collect();
            CommandOutput::text(lines(&debts, format::debt_line, "No ledger entries"))
        }
        Command::Summary {
            contact: Some(contact_id),
        } => CommandOutput::text(format::summary_block(
            &book.summary_for(&contact_id).await?,
        )),
        Command::Summary { contact: None } => {
            let summaries: Vec<_> = book.summaries().await?.into_values().collect();
            CommandOutput::text(lines(
                &summaries,
                format::summary_block,
                "No ledger entries",
            ))
        }
        Command::AddDebt {
            contact,
            amount,
            product,
            quantity,
            due,
            common,
        } => {
            let item = debt_item(book, amount, product, quantity).await?;
            let committed = book
                .create_debt(NewDebt {
                    contact_id: contact,
                    item,
                    notes: common.notes,
                    due_date: due,
                    request_id: common.request_id,
                })
                .await?;
            CommandOutput::committed(committed, |debt| {
                format!("Recorded {}", format::debt_line(debt))
            })
        }
        Command::Pay {
            contact,
            debt,
            amount,
            product,
            quantity,
            common,
        } => {
            let target = match (contact, debt) {
                (Some(contact_id), None) => PaymentTarget::Contact(contact_id),
                (None, Some(debt_id)) => PaymentTarget::Debt(debt_id),
                _ => return Err(Error::validation("pay either --contact or --debt")),
            };
            let committed = book
                .apply_payment(PaymentRequest {
                    target,
                    tender: tender(amount, product, quantity)?,
                    notes: common.notes,
                    request_id: common.request_id,
                })
                .await?;
            CommandOutput::committed(committed, format::payment_report)
        }
        Command::Settle {
            contact,
            request_id,
        } => {
            let committed = book.settle_all(&contact, request_id).await?;
            CommandOutput::committed(committed, format::payment_report)
        }
        Command::CashOut {
            contact,
            request_id,
        } => {
            let committed = book.cash_out(&contact, request_id).await?;
            CommandOutput::committed(committed, |record| {
                format!(
                    "Paid out {} to {}",
                    format::format_rupiah(record.total_amount.abs()),
                    record.contact_name
                )
            })
        }
        Command::Rollup => {
            let report = book.refresh_all_status().await?;
            let mut text = format!(
                "StatusHutang: {} updated, {} appended",
                report.updated, report.appended
            );
            if !report.failed.is_empty() {
                text.push_str(&format!(", failed for {}", report.failed.join(", ")));
            }
            CommandOutput::text(text)
        }
    };
    Ok(output)
}
