//! Interface tests for the history store and subscription registry using
//! Cucumber.
//!
//! ```bash
//! cargo test --test interfaces
//! ```

mod steps;

use cucumber::writer::Stats as _;
use cucumber::World;
use steps::history_store::HistoryStoreWorld;
use steps::subscriptions::SubscriptionWorld;

#[tokio::main]
async fn main() {
    // Run HistoryStore tests
    println!("\n=== Running HistoryStore Interface Tests ===\n");
    let history = HistoryStoreWorld::cucumber()
        .fail_on_skipped()
        .run("tests/interfaces/features/history_store.feature")
        .await;

    // Run SubscriptionRegistry tests
    println!("\n=== Running SubscriptionRegistry Interface Tests ===\n");
    let subscriptions = SubscriptionWorld::cucumber()
        .fail_on_skipped()
        .run("tests/interfaces/features/subscriptions.feature")
        .await;

    if history.execution_has_failed() || subscriptions.execution_has_failed() {
        std::process::exit(1);
    }
}
