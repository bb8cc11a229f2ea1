use std::io::{self, BufRead};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use chat_core::{update, AppState, Msg};
use chat_engine::ClientSettings;
use chat_logging::{chat_debug, chat_info};

use super::effects::EffectRunner;
use super::ui::render::Renderer;

const CANCEL_COMMAND: &str = "/cancel";
const QUIT_COMMAND: &str = "/quit";

/// Everything the front-end loop reacts to.
enum Inbound {
    Core(Msg),
    Quit,
}

/// Runs the terminal chat front end until stdin closes or `/quit`.
pub fn run_chat(settings: ClientSettings) -> anyhow::Result<()> {
    chat_info!("chat front end using {}", settings.chat_url());
    let (tx, rx) = mpsc::channel::<Inbound>();

    let engine_tx = tx.clone();
    let effects = EffectRunner::new(settings, move |msg| {
        let _ = engine_tx.send(Inbound::Core(msg));
    })?;

    spawn_input_reader(tx.clone());

    // Background tick to coalesce rendering of fast fragment bursts.
    thread::spawn(move || {
        let interval = Duration::from_millis(40);
        while tx.send(Inbound::Core(Msg::Tick)).is_ok() {
            thread::sleep(interval);
        }
    });

    println!("Type a prompt and press Enter. {CANCEL_COMMAND} stops a reply, {QUIT_COMMAND} exits.");
    let mut renderer = Renderer::new(io::stdout().lock());
    renderer.prompt()?;

    let mut state = AppState::new();
    while let Ok(inbound) = rx.recv() {
        let msg = match inbound {
            Inbound::Core(msg) => msg,
            Inbound::Quit => break,
        };

        if msg == Msg::PromptSubmitted && state.is_busy() {
            renderer.notice(&format!("still replying, type {CANCEL_COMMAND} to stop"))?;
        }
        let is_tick = msg == Msg::Tick;
        let (next, effects_out) = update(state, msg);
        state = next;
        effects.enqueue(effects_out);

        if is_tick && state.consume_dirty() {
            renderer.render(&state.view())?;
        }
    }

    chat_debug!("chat front end exiting");
    Ok(())
}

fn spawn_input_reader(tx: mpsc::Sender<Inbound>) {
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            let command = line.trim();
            let sent = if command == QUIT_COMMAND {
                break;
            } else if command == CANCEL_COMMAND {
                tx.send(Inbound::Core(Msg::CancelRequested))
            } else {
                tx.send(Inbound::Core(Msg::InputChanged(line)))
                    .and_then(|()| tx.send(Inbound::Core(Msg::PromptSubmitted)))
            };
            if sent.is_err() {
                return;
            }
        }
        let _ = tx.send(Inbound::Quit);
    });
}
