//! Line-driven event loop over a controls panel.

use std::sync::Arc;

use anyhow::Result;
use controls_client::{ControlSurface, ControlsPanel, MemorySurface, StatusUpdate};
use futures::StreamExt;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    task::JoinSet,
};
use tokio_stream::wrappers::LinesStream;
use tracing::debug;

const HELP: &str = "\
<control>=<value>  move a control (e.g. gain=40, exposure=-3.5)
apply              press the apply button
click <id>         click any element
status             reload the backend snapshot
show               print the page
help               this text
quit               leave after pending applies finish";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Input { id: String, value: String },
    Click(String),
    Status,
    Show,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

impl ShellCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if let Some((id, value)) = line.split_once('=') {
            let id = id.trim();
            if !id.is_empty() {
                return ShellCommand::Input {
                    id: id.to_string(),
                    value: value.trim().to_string(),
                };
            }
        }
        match line.split_whitespace().collect::<Vec<_>>().as_slice() {
            [] => ShellCommand::Empty,
            ["apply"] => ShellCommand::Click(String::new()),
            ["click", id] => ShellCommand::Click(id.to_string()),
            ["status"] => ShellCommand::Status,
            ["show"] => ShellCommand::Show,
            ["help"] | ["?"] => ShellCommand::Help,
            ["quit"] | ["exit"] => ShellCommand::Quit,
            _ => ShellCommand::Unknown(line.to_string()),
        }
    }
}

pub async fn run(panel: Arc<ControlsPanel<MemorySurface>>) -> Result<()> {
    match panel.initialize().await {
        Ok(update) => print_update(&update),
        Err(err) => eprintln!("{err}"),
    }
    println!("type `help` for commands");

    let mut pending = JoinSet::new();
    let mut lines = LinesStream::new(BufReader::new(tokio::io::stdin()).lines());

    while let Some(line) = lines.next().await {
        match ShellCommand::parse(&line?) {
            ShellCommand::Input { id, value } => {
                panel.input(&id, &value).await;
                let label_id = panel.ids().label_for(&id);
                if let Some(label) = panel.with_surface(|page| page.text(&label_id)).await {
                    println!("{label_id}: {label}");
                }
            }
            ShellCommand::Click(id) => {
                let id = if id.is_empty() {
                    panel.ids().apply.clone()
                } else {
                    id
                };
                let panel = panel.clone();
                // Submits run concurrently; the panel keeps only the last issued answer.
                pending.spawn(async move {
                    match panel.click(&id).await {
                        Some(Ok(update)) => print_update(&update),
                        Some(Err(err)) => eprintln!("{err}"),
                        None => debug!(%id, "click had no handler"),
                    }
                });
            }
            ShellCommand::Status => match panel.load_status().await {
                Ok(update) => print_update(&update),
                Err(err) => eprintln!("{err}"),
            },
            ShellCommand::Show => {
                let page = panel.with_surface(|page| page.to_string()).await;
                print!("{page}");
            }
            ShellCommand::Help => println!("{HELP}"),
            ShellCommand::Quit => break,
            ShellCommand::Empty => {}
            ShellCommand::Unknown(line) => eprintln!("unrecognised: {line} (try `help`)"),
        }
    }

    while pending.join_next().await.is_some() {}
    Ok(())
}

fn print_update(update: &StatusUpdate) {
    match update {
        StatusUpdate::Shown(text) => println!("{text}"),
        StatusUpdate::Superseded => println!("(an earlier answer arrived late and was dropped)"),
    }
}
