use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, RANGE};
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "webhub-cli")]
#[command(about = "Client for the webhub built-in API", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Sent as `Authorization: Bearer <token>` when the server verifies tokens.
    #[arg(short, long)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Call /api/hello
    Hello,
    /// Server time in Unix milliseconds
    Time,
    /// Echo a value through /api/echo/{val}
    Echo { value: String },
    /// Download a file from the static root
    Download {
        filename: String,
        /// Byte range, e.g. `0-1023` or `512-`
        #[arg(short, long)]
        range: Option<String>,
        /// Where to write the bytes (defaults to the file name)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Upload one file as the raw request body
    Upload {
        file: PathBuf,
        /// Name to store it under (defaults to the local file name)
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Upload files and fields as multipart/form-data
    UploadForm {
        files: Vec<PathBuf>,
        /// Extra form field as `key=value`; may repeat
        #[arg(short, long = "field")]
        fields: Vec<String>,
    },
    /// Post a JSON notification
    Notify { json: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let mut headers = HeaderMap::new();
    if let Some(token) = &cli.token {
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}"))?,
        );
    }

    match cli.command {
        Commands::Hello => {
            let res = client.get(format!("{base}/api/hello"))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Time => {
            let res = client.get(format!("{base}/api/time"))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Echo { value } => {
            let res = client.get(format!("{base}/api/echo/{value}"))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Download { filename, range, output } => {
            if let Some(range) = range {
                headers.insert(RANGE, HeaderValue::from_str(&format!("bytes={range}"))?);
            }
            let res = client.get(format!("{base}/api/download/{filename}"))
                .headers(headers)
                .send()
                .await?;
            let status = res.status();
            if !status.is_success() {
                return report_failure(res).await;
            }
            let bytes = res.bytes().await?;
            let output = output.unwrap_or_else(|| PathBuf::from(&filename));
            tokio::fs::write(&output, &bytes).await?;
            println!("{status}: wrote {} bytes to {}", bytes.len(), output.display());
        }
        Commands::Upload { file, name } => {
            let name = match name {
                Some(name) => name,
                None => file_name(&file)?,
            };
            let body = tokio::fs::read(&file).await?;
            let res = client.post(format!("{base}/api/upload/{name}"))
                .headers(headers)
                .body(body)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::UploadForm { files, fields } => {
            let mut form = Form::new();
            for field in fields {
                let (key, value) = field
                    .split_once('=')
                    .ok_or_else(|| format!("field {field:?} is not key=value"))?;
                form = form.text(key.to_string(), value.to_string());
            }
            for path in files {
                let bytes = tokio::fs::read(&path).await?;
                form = form.part("file", Part::bytes(bytes).file_name(file_name(&path)?));
            }
            let res = client.post(format!("{base}/api/upload"))
                .headers(headers)
                .multipart(form)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Notify { json } => {
            let res = client.post(format!("{base}/api/notification"))
                .headers(headers)
                .header("content-type", "application/json")
                .body(json)
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

fn file_name(path: &Path) -> Result<String, Box<dyn std::error::Error>> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| format!("{} has no file name", path.display()).into())
}

async fn report_failure(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("Error: server returned status {}", res.status());
    if let Ok(text) = res.text().await {
        eprintln!("Response: {}", text);
    }
    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    if !res.status().is_success() {
        return report_failure(res).await;
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
