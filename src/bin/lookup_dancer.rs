use anyhow::Context;
use clap::Parser;
use points_etl::adapters::http::DEFAULT_API_ENDPOINT;
use points_etl::core::classifier::eligibility_for;
use points_etl::core::normalizer::{role_from_name, Normalizer, DEFAULT_DANCE_STYLE};
use points_etl::domain::ports::RecordFetcher;
use points_etl::utils::logger;
use points_etl::HttpRecordFetcher;

/// 查詢單一舞者並印出攤平後的成績與可報名分級
#[derive(Debug, Parser)]
#[command(name = "lookup_dancer")]
struct Args {
    id: u64,

    #[arg(long, default_value = DEFAULT_API_ENDPOINT)]
    api_endpoint: String,

    #[arg(long, default_value = DEFAULT_DANCE_STYLE)]
    dance_style: String,

    #[arg(long, help = "Print the raw record as JSON")]
    raw: bool,

    #[arg(long, help = "Enable verbose output")]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose);

    let fetcher = HttpRecordFetcher::new(args.api_endpoint.clone());
    let Some(record) = fetcher.fetch(args.id).await? else {
        println!("🔍 No record for dancer {}", args.id);
        return Ok(());
    };

    if args.raw {
        println!("{}", serde_json::to_string_pretty(&record)?);
    }

    let normalizer = Normalizer::new(args.dance_style);
    let leader = normalizer.normalize(record.id, record.leader.placements.as_ref())?;
    let follower = normalizer.normalize(record.id, record.follower.placements.as_ref())?;
    let mut placements: Vec<_> = leader.placements.into_iter().chain(follower.placements).collect();
    placements.sort_by(|a, b| b.date.cmp(&a.date));

    let primary_role = role_from_name(&record.dominant_role)
        .with_context(|| format!("dancer {} has an unusable dominant role", record.id))?;

    println!("👤 {} ({}) - primary role {}", record.display_name(), record.id, primary_role.name());
    for placement in &placements {
        println!(
            "  {}  {:<12} {:<8} {:>3} pts  result {:<4} event {}",
            placement.date,
            placement.division.name(),
            placement.role.name(),
            placement.points,
            placement.result,
            placement.event
        );
    }

    println!("🎯 Eligible divisions");
    for (role, divisions) in eligibility_for(primary_role, &placements) {
        let names: Vec<&str> = divisions.iter().map(|d| d.name()).collect();
        println!("  {:<8} {}", role.name(), names.join(", "));
    }

    Ok(())
}
