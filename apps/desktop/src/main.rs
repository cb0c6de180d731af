use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{
    load_settings, ImageAttachment, MedicinesView, ResultView, SessionController, SessionEvent,
};
use dictation::ScriptedDictation;
use shared::domain::Phase;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;
use url::Url;

#[derive(Parser, Debug)]
struct Args {
    /// Analysis service base URL; overrides client.toml and APP__SERVICE_URL.
    #[arg(long)]
    server_url: Option<String>,
    /// Sign in immediately with this patient identifier.
    #[arg(long)]
    username: Option<String>,
    /// Ask the service for its canned demo verdict instead of a real analysis.
    #[arg(long)]
    mock: bool,
    /// Canned transcript for the `dictate` command; repeat for several.
    #[arg(long = "dictation-transcript")]
    dictation_transcripts: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();

    let mut settings = load_settings();
    if let Some(server_url) = args.server_url {
        settings.service_url = server_url;
    }
    if args.mock {
        settings.mock_analysis = true;
    }
    let service_url = Url::parse(&settings.service_url).context("invalid analysis service url")?;

    let controller = if args.dictation_transcripts.is_empty() {
        SessionController::new(settings)
    } else {
        SessionController::new_with_dictation(
            settings,
            Arc::new(ScriptedDictation::new(args.dictation_transcripts)),
        )
    };

    println!("Medication interaction checker");
    println!("analysis service: {service_url}");

    let mut events = controller.subscribe_events();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            print_event(&event);
        }
    });

    if let Some(username) = args.username {
        let patient = controller.sign_in(&username).await?;
        println!("signed in as {patient}");
    } else {
        println!("sign in with: login <patient id or name>");
    }
    println!("type 'help' for commands");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (command, rest) = match line.split_once(' ') {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };

        match command {
            "help" => print_help(),
            "login" => match controller.sign_in(rest).await {
                Ok(patient) => println!("signed in as {patient}"),
                Err(err) => println!("{err}"),
            },
            "attach" => {
                if rest.is_empty() {
                    println!("usage: attach <path-to-image>");
                    continue;
                }
                match load_attachment(rest).await {
                    Ok(attachment) => {
                        if let Err(err) = controller.attach_image(attachment).await {
                            println!("{err}");
                        }
                    }
                    Err(err) => println!("{err:#}"),
                }
            }
            "describe" => {
                if let Err(err) = controller.set_description(rest).await {
                    println!("{err}");
                }
            }
            "dictate" => {
                let controller = Arc::clone(&controller);
                tokio::spawn(async move {
                    match controller.dictate().await {
                        Ok(transcript) => println!("[mic] captured: {transcript}"),
                        Err(err) => println!("[mic] {err}"),
                    }
                });
            }
            "condition" => {
                if rest.is_empty() {
                    println!("usage: condition <name>");
                    continue;
                }
                match controller.toggle_condition(rest).await {
                    Ok(true) => println!("condition '{rest}' checked"),
                    Ok(false) => println!("condition '{rest}' unchecked"),
                    Err(err) => println!("{err}"),
                }
            }
            "language" => {
                if rest.is_empty() {
                    println!("usage: language <tag>");
                    continue;
                }
                if let Err(err) = controller.set_language(rest).await {
                    println!("{err}");
                }
            }
            "status" => print_status(&controller).await,
            "submit" => {
                let controller = Arc::clone(&controller);
                tokio::spawn(async move {
                    if let Err(err) = controller.submit().await {
                        debug!("session: submission ended with error: {err}");
                    }
                });
            }
            "reset" => {
                if let Err(err) = controller.reset().await {
                    println!("{err}");
                }
            }
            "logout" => controller.sign_out().await,
            "health" => match controller.check_health().await {
                Ok(health) => println!("service status: {}", health.status),
                Err(err) => println!("service unreachable: {err}"),
            },
            "quit" | "exit" => break,
            other => println!("unknown command: {other} (try 'help')"),
        }
    }

    Ok(())
}

fn print_help() {
    println!("commands:");
    println!("  login <identifier>   sign in with a patient id or name");
    println!("  attach <path>        stage a prescription image");
    println!("  describe <text>      set the medication description");
    println!("  dictate              capture speech into the description");
    println!("  condition <name>     toggle a pre-existing condition");
    println!("  language <tag>       pick the output language");
    println!("  status               show the session");
    println!("  submit               run the interaction check");
    println!("  reset                clear the form");
    println!("  logout               end the session");
    println!("  health               probe the analysis service");
    println!("  quit                 exit");
}

async fn load_attachment(path: &str) -> Result<ImageAttachment> {
    let path = PathBuf::from(path);
    let bytes = tokio::fs::read(&path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "prescription".to_string());
    let mime_type = mime_guess::from_path(&path).first_raw().map(str::to_string);
    Ok(ImageAttachment {
        filename,
        mime_type,
        bytes,
    })
}

async fn print_status(controller: &SessionController) {
    let snapshot = controller.snapshot().await;
    println!("phase: {:?}", snapshot.phase);
    match &snapshot.patient {
        Some(patient) => println!("patient: {patient}"),
        None => println!("patient: (not signed in)"),
    }
    match &snapshot.attachment_label {
        Some(label) => println!("files: {label}"),
        None => println!("files: none"),
    }
    if snapshot.description.is_empty() {
        println!("description: (empty)");
    } else {
        println!("description: {}", snapshot.description);
    }
    let conditions = snapshot
        .conditions
        .iter()
        .map(|(name, checked)| format!("{} {name}", if *checked { "[x]" } else { "[ ]" }))
        .collect::<Vec<_>>()
        .join("  ");
    println!("conditions: {conditions}");
    println!(
        "language: {}",
        snapshot
            .language
            .as_deref()
            .unwrap_or(&controller.settings().default_language)
    );
    println!(
        "dictation: {}",
        if controller.dictation_supported() {
            "available"
        } else {
            "unavailable"
        }
    );
    if let Some(view) = &snapshot.last_result {
        print_result(view);
    }
}

fn print_event(event: &SessionEvent) {
    match event {
        SessionEvent::PhaseChanged(phase) => match phase {
            Phase::Unauthenticated => println!("[phase] signed out"),
            Phase::Input => println!("[phase] input form ready"),
            Phase::Loading => println!("[phase] analyzing..."),
            Phase::Results => println!("[phase] results ready"),
        },
        SessionEvent::AttachmentsChanged { label } => match label {
            Some(label) => println!("[files] {label}"),
            None => println!("[files] cleared"),
        },
        SessionEvent::DictationStarted => println!("[mic] listening..."),
        SessionEvent::ValidationRejected { message } => println!("[blocked] {message}"),
        SessionEvent::ResultReady(view) => print_result(view),
        SessionEvent::SubmissionFailed { message } => {
            println!("[error] unable to complete analysis: {message}");
        }
    }
}

fn print_result(view: &ResultView) {
    println!("== analysis result ==");
    println!("risk: {} ({})", view.risk_label, view.risk_hex);
    match &view.medicines {
        MedicinesView::Tags(tags) => println!("medicines: {}", tags.join(", ")),
        MedicinesView::NoneIdentified => {
            println!("medicines: {}", client_core::render::MEDICINES_PLACEHOLDER);
        }
    }
    println!("alert: {}", view.alert);
    if let Some(alternatives) = &view.alternatives {
        for line in alternatives {
            println!("  {line}");
        }
    }
}
