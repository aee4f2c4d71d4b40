use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use client_core::{ClientEvent, CourseClient, HttpCourseApi};
use shared::domain::{CourseId, SequenceId};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
struct Cli {
    /// Base URL of the course API.
    #[arg(long, default_value = "http://localhost:18000")]
    api_url: String,
    /// Username the blocks and completion endpoints are scoped to.
    #[arg(long)]
    username: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    FetchCourse {
        course_id: String,
    },
    FetchSequence {
        sequence_id: String,
    },
    SavePosition {
        course_id: String,
        sequence_id: String,
        unit_index: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let api = HttpCourseApi::new(&cli.api_url, cli.username)?;
    let client = CourseClient::with_api(Arc::new(api));
    let mut events = client.subscribe_events();

    match cli.command {
        Command::FetchCourse { course_id } => {
            let course_id = CourseId::new(course_id);
            client.fetch_course(&course_id).await;
            println!("status: {:?}", client.course_status(&course_id).await);
            if let Some(course) = client.course(&course_id).await {
                println!("course: {course:#?}");
            }
        }
        Command::FetchSequence { sequence_id } => {
            let sequence_id = SequenceId::new(sequence_id);
            client.fetch_sequence(&sequence_id).await;
            println!("status: {:?}", client.sequence_status(&sequence_id).await);
            if let Some(sequence) = client.sequence(&sequence_id).await {
                println!("sequence: {sequence:#?}");
            }
        }
        Command::SavePosition {
            course_id,
            sequence_id,
            unit_index,
        } => {
            let course_id = CourseId::new(course_id);
            let sequence_id = SequenceId::new(sequence_id);
            client.fetch_sequence(&sequence_id).await;
            client
                .save_sequence_position(&course_id, &sequence_id, unit_index)
                .await?;
            if let Some(sequence) = client.sequence(&sequence_id).await {
                println!("active_unit_index: {:?}", sequence.active_unit_index);
            }
        }
    }

    while let Ok(event) = events.try_recv() {
        if let ClientEvent::Error(message) = event {
            eprintln!("error: {message}");
        }
    }

    Ok(())
}
