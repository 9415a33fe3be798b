use std::error::Error;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use engine::{AccountKind, Engine, Money, NewCategoryCmd};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "salvadanaio_admin")]
#[command(about = "Admin utilities for Salvadanaio (bootstrap and maintenance)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./salvadanaio.db?mode=rwc"
    )]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Account(Account),
    Category(Category),
    /// Generate due recurring instances and settle due transactions.
    Process {
        /// Settle as if today were this date (defaults to the current day).
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Rebuild balances, the daily timeline and budgets from processed
    /// transactions.
    Recompute,
    /// Print the daily balances of an account.
    Balances {
        account: Uuid,
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
    },
}

#[derive(Args, Debug)]
struct Account {
    #[command(subcommand)]
    command: AccountCommand,
}

#[derive(Subcommand, Debug)]
enum AccountCommand {
    Create(AccountCreateArgs),
    List {
        /// Include obsolete accounts.
        #[arg(long)]
        all: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum KindArg {
    Normal,
    Splitwise,
}

impl From<KindArg> for AccountKind {
    fn from(value: KindArg) -> Self {
        match value {
            KindArg::Normal => AccountKind::Normal,
            KindArg::Splitwise => AccountKind::Splitwise,
        }
    }
}

#[derive(Args, Debug)]
struct AccountCreateArgs {
    #[arg(long)]
    description: String,
    #[arg(long, value_enum, default_value = "normal")]
    kind: KindArg,
    #[arg(long)]
    default: bool,
}

#[derive(Args, Debug)]
struct Category {
    #[command(subcommand)]
    command: CategoryCommand,
}

#[derive(Subcommand, Debug)]
enum CategoryCommand {
    Create(CategoryCreateArgs),
    List {
        /// Include obsolete categories.
        #[arg(long)]
        all: bool,
    },
}

#[derive(Args, Debug)]
struct CategoryCreateArgs {
    #[arg(long)]
    description: String,
    #[arg(long)]
    parent: Option<Uuid>,
    /// Expected monthly spending, e.g. `120.50`.
    #[arg(long)]
    expected: Option<Money>,
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    let db = connect_db(&cli.database_url).await?;
    let engine = Engine::builder().database(db).build().await?;

    match cli.command {
        Command::Account(Account {
            command: AccountCommand::Create(args),
        }) => {
            let id = engine
                .create_account(&args.description, args.kind.into(), args.default)
                .await?;
            println!("created account: {} ({id})", args.description);
        }
        Command::Account(Account {
            command: AccountCommand::List { all },
        }) => {
            for account in engine.list_accounts(all).await? {
                let mut flags = Vec::new();
                if account.is_default {
                    flags.push("default");
                }
                if account.kind == AccountKind::Splitwise {
                    flags.push("splitwise");
                }
                if account.is_obsolete {
                    flags.push("obsolete");
                }
                println!(
                    "{}  {:>12}  {} {}",
                    account.id,
                    Money::new(account.current_balance_minor).to_string(),
                    account.description,
                    if flags.is_empty() {
                        String::new()
                    } else {
                        format!("[{}]", flags.join(", "))
                    }
                );
            }
        }
        Command::Category(Category {
            command: CategoryCommand::Create(args),
        }) => {
            let mut cmd = NewCategoryCmd::new(args.description.clone());
            if let Some(parent) = args.parent {
                cmd = cmd.parent(parent);
            }
            if let Some(expected) = args.expected {
                cmd = cmd.expected_monthly(expected.cents());
            }
            let id = engine.create_category(cmd).await?;
            println!("created category: {} ({id})", args.description);
        }
        Command::Category(Category {
            command: CategoryCommand::List { all },
        }) => {
            for category in engine.list_categories(all).await? {
                let parent = category
                    .parent_id
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{}  {}  parent={}  expected={}{}",
                    category.id,
                    category.description,
                    parent,
                    Money::new(category.expected_monthly_minor),
                    if category.is_obsolete { " [obsolete]" } else { "" }
                );
            }
        }
        Command::Process { date } => {
            let report = match date {
                Some(date) => engine.process_pending_at(date).await?,
                None => engine.process_pending().await?,
            };
            println!(
                "generated {} recurring instances, processed {} transactions",
                report.generated, report.processed
            );
        }
        Command::Recompute => {
            engine.recompute_balances().await?;
            println!("balances recomputed");
        }
        Command::Balances { account, from, to } => {
            for day in engine.daily_balances(account, from, to).await? {
                println!("{}  {:>12}", day.date, Money::new(day.balance_minor).to_string());
            }
        }
    }

    Ok(())
}
