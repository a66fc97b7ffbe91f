use crate::render::ConsoleRenderer;
use anyhow::{Context, Result};
use projectchat_core::{ConversationSession, ProjectStore, Settings, TurnOutcome};
use tokio::io::{AsyncBufReadExt, BufReader};

/// Interactive chat loop on stdin/stdout.
///
/// The credential is checked and the project context rendered once, before
/// the first prompt; later edits to the project are not picked up.
pub async fn run_chat(settings: &Settings, store: &ProjectStore, project: Option<&str>) -> Result<()> {
    let llm = settings.build_llm_client()?;

    let context = match project {
        Some(name) => {
            let loaded = store
                .open(name)
                .with_context(|| format!("Failed to open project {name}"))?;
            Some(loaded.render_context())
        }
        None => None,
    };

    tracing::info!(
        model = llm.model(),
        project = project.unwrap_or("-"),
        context_len = context.as_ref().map_or(0, String::len),
        "starting chat session"
    );

    let mut session =
        ConversationSession::new(Box::new(llm), context).with_params(settings.generation_params());
    let mut renderer = ConsoleRenderer::new(std::io::stdout());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    renderer.banner()?;

    while !session.is_terminated() {
        renderer.prompt()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            session.terminate();
            println!();
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let interrupt = async {
            let _ = tokio::signal::ctrl_c().await;
        };
        let outcome = session
            .handle_input_until(&line, interrupt, |event| {
                if let Err(e) = renderer.render(event) {
                    tracing::warn!("failed to write to terminal: {e}");
                }
            })
            .await;

        if outcome == TurnOutcome::Exit {
            break;
        }
    }

    Ok(())
}
