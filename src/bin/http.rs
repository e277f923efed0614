#[cfg(all(feature = "http_api", feature = "sqlite"))]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use std::net::SocketAddr;

    use staffplan::{FixedHolidays, Planner, PlannerConfig, SqliteSeriesStore, http_api};

    let addr: SocketAddr = std::env::var("STAFFPLAN_HTTP_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
        .parse()?;
    let db_path = std::env::var("STAFFPLAN_DB").unwrap_or_else(|_| "staffplan.db".to_string());

    let store = SqliteSeriesStore::new(&db_path)?;
    // Region-specific holiday tables are deployment configuration; the bare
    // server starts without any.
    let planner = Planner::new(store, FixedHolidays::empty(), PlannerConfig::default())?;

    println!("staffplan HTTP API listening on http://{addr} (db: {db_path})");
    http_api::serve(addr, planner).await?;
    Ok(())
}

#[cfg(not(all(feature = "http_api", feature = "sqlite")))]
fn main() {
    eprintln!("Rebuild with the `http_api` and `sqlite` features to enable the HTTP server.");
}
