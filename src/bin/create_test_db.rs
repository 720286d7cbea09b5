use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rusqlite::Connection;
use rust_decimal_macros::dec;
use time::{OffsetDateTime, macros::date};

use finwise::{
    Budget, BudgetMonth, FinancialGoal, Transaction, TransactionType, UserId, create_budget,
    create_goal, create_transaction, initialize_db,
};

/// A utility for creating a test database for the REST API server of FinWise.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,

    /// The user ID to create the sample data for.
    #[arg(long, default_value = "demo-user")]
    user_id: String,
}

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let conn = Connection::open(output_path)?;

    initialize_db(&conn)?;

    let user_id = UserId::new(args.user_id);

    println!("Creating transactions for {user_id}...");
    let transactions = [
        Transaction::build(dec!(5000), TransactionType::Income, "Salary", date!(2024 - 07 - 25)),
        Transaction::build(dec!(75.50), TransactionType::Expense, "Food", date!(2024 - 07 - 24))
            .note("Lunch with colleagues"),
        Transaction::build(dec!(30), TransactionType::Expense, "Transport", date!(2024 - 07 - 24)),
        Transaction::build(
            dec!(200),
            TransactionType::Expense,
            "Entertainment",
            date!(2024 - 07 - 23),
        )
        .note("Movie night"),
        Transaction::build(dec!(1200), TransactionType::Expense, "Rent", date!(2024 - 07 - 20)),
    ];
    for transaction in transactions {
        create_transaction(&user_id, transaction, &conn)?;
    }

    println!("Creating budgets...");
    let july = BudgetMonth::new(2024, time::Month::July);
    let today = OffsetDateTime::now_utc().date();
    for (category, limit) in [
        ("Food", dec!(400)),
        ("Transport", dec!(150)),
        ("Entertainment", dec!(200)),
        ("Utilities", dec!(100)),
    ] {
        create_budget(&user_id, Budget::build(category, limit).month(july), today, &conn)?;
    }

    println!("Creating goal...");
    create_goal(
        &user_id,
        FinancialGoal::build(
            "Vacation to Japan",
            dec!(3000),
            dec!(1200),
            date!(2025 - 06 - 01),
        ),
        &conn,
    )?;

    println!("Success!");

    Ok(())
}
