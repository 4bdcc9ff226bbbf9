use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use coursefit::build_app;
use coursefit::conversion::types::GPX_POINT_SPACING_SECS;
use coursefit::conversion::{ConversionError, ConversionOptions, convert_file};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "coursefit", about = "Convert TCX/GPX tracks into FIT course files")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert one TCX or GPX file into a FIT course
    Convert {
        /// TCX or GPX document to read
        input: PathBuf,
        /// FIT file to write (replaced if it exists)
        output: PathBuf,
        /// Seconds between GPX points that carry no timestamp
        #[arg(long, default_value_t = GPX_POINT_SPACING_SECS, value_parser = clap::value_parser!(u32).range(1..))]
        gpx_spacing: u32,
        /// Override file_id.time_created (seconds since 1989-12-31T00:00:00Z)
        #[arg(long)]
        time_created: Option<u32>,
    },
    /// Serve the upload page and conversion endpoint
    Serve {
        #[arg(long, default_value = "0.0.0.0:3000")]
        addr: SocketAddr,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "coursefit=info,tower_http=info,info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Convert {
            input,
            output,
            gpx_spacing,
            time_created,
        } => {
            let options = ConversionOptions {
                gpx_point_spacing: gpx_spacing,
                time_created,
            };
            run_convert(&input, &output, &options)
        }
        Commands::Serve { addr } => serve(addr),
    }
}

fn run_convert(input: &Path, output: &Path, options: &ConversionOptions) -> ExitCode {
    match convert_file(input, output, options) {
        Ok(converted) => {
            println!("{}", converted.course.name);
            println!("Size: {} bytes", converted.bytes.len());
            ExitCode::SUCCESS
        }
        // Unrecognized documents exit cleanly and write nothing.
        Err(ConversionError::UnsupportedFormat(tag)) => {
            println!("Unrecognized root tag: {tag}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

#[tokio::main]
async fn serve(addr: SocketAddr) -> ExitCode {
    let app = build_app();
    tracing::info!("listening on {}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            eprintln!("Error: failed to bind {addr}: {err}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(err) = axum::serve(listener, app.into_make_service()).await {
        eprintln!("Error: server stopped: {err}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
