use base64::Engine;
use clap::{Args, Parser, Subcommand};
use rand::Rng;
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "faiss-cli")]
#[command(about = "Command-line client for the FAISS HTTP gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:3839")]
    url: String,

    #[arg(long, default_value = "faiss")]
    namespace: String,

    #[arg(long = "api-version", default_value = "1.0")]
    api_version: String,

    /// Correlation id; generated when omitted
    #[arg(short, long, global = true)]
    request_id: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct FeatureArgs {
    /// Comma-separated float values
    #[arg(short, long, conflicts_with = "random", required_unless_present = "random")]
    feature: Option<String>,

    /// Use a random vector of this dimension
    #[arg(long)]
    random: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the backend answers
    Ping {
        #[arg(default_value = "ping")]
        payload: String,
    },
    /// Create a database
    DbNew {
        name: String,
        #[arg(long, default_value_t = 100_000)]
        max_size: u64,
        #[arg(long, default_value = "")]
        model: String,
    },
    /// List databases
    DbList,
    /// Delete a database
    DbDel { name: String },
    /// Insert a vector
    Hset {
        db: String,
        #[command(flatten)]
        feature: FeatureArgs,
    },
    /// Fetch a vector by id
    Hget { db: String, id: u64 },
    /// Search nearest vectors
    Hsearch {
        db: String,
        #[command(flatten)]
        feature: FeatureArgs,
    },
    /// Delete a vector by id
    Hdel { db: String, id: u64 },
    /// Print the API description
    Docs,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = format!(
        "{}/{}/{}",
        cli.url.trim_end_matches('/'),
        cli.namespace,
        cli.api_version
    );
    let request_id = cli
        .request_id
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let (path, body) = match cli.command {
        Commands::Ping { payload } => ("ping", json!({ "payload": payload })),
        Commands::DbNew {
            name,
            max_size,
            model,
        } => (
            "db/new",
            json!({ "db_name": name, "max_size": max_size, "model": model, "request_id": request_id }),
        ),
        Commands::DbList => ("db/list", json!({ "request_id": request_id })),
        Commands::DbDel { name } => (
            "db/del",
            json!({ "db_name": name, "request_id": request_id }),
        ),
        Commands::Hset { db, feature } => (
            "hset",
            json!({ "db_name": db, "feature": encode_feature(&feature)?, "request_id": request_id }),
        ),
        Commands::Hget { db, id } => (
            "hget",
            json!({ "db_name": db, "id": id, "request_id": request_id }),
        ),
        Commands::Hsearch { db, feature } => (
            "hsearch",
            json!({ "db_name": db, "feature": encode_feature(&feature)?, "request_id": request_id }),
        ),
        Commands::Hdel { db, id } => (
            "hdel",
            json!({ "db_name": db, "id": id, "request_id": request_id }),
        ),
        Commands::Docs => {
            let res = client.get(format!("{base}/swagger.json")).send().await?;
            print_response(res).await?;
            return Ok(());
        }
    };

    let res = client
        .post(format!("{base}/{path}"))
        .json(&body)
        .send()
        .await?;
    print_response(res).await?;

    Ok(())
}

/// Little-endian float32 bytes, base64-encoded.
fn encode_feature(args: &FeatureArgs) -> Result<String, Box<dyn std::error::Error>> {
    let values: Vec<f32> = match (&args.feature, args.random) {
        (_, Some(dim)) => {
            let mut rng = rand::thread_rng();
            (0..dim).map(|_| rng.gen::<f32>()).collect()
        }
        (Some(list), None) => list
            .split(',')
            .map(|v| v.trim().parse::<f32>())
            .collect::<Result<_, _>>()?,
        (None, None) => return Err("either --feature or --random is required".into()),
    };

    let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
    Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
