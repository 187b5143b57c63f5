//! Interactive video-call overlay.

use std::sync::Arc;

use carelink_call::{CallCommand, CallController, CallView, SocketIoDialer, SyntheticDevices, WebRtcConnector};
use carelink_common::EventBus;
use carelink_config::CareConfig;
use tokio::io::{AsyncBufRead, Lines};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::render;

const HELP: &str = "\
Call commands:
  <n> | select <n>  pick peer number n
  call              call the selected peer
  end               hang up
  mute              mute or unmute your microphone
  list              show the overlay again
  back              leave the call overlay";

/// Map a line to a controller command. `Ok(None)` means "just redraw".
pub fn parse_call_input(line: &str, view: &CallView) -> Result<Option<CallCommand>, String> {
    let mut words = line.split_whitespace();
    let Some(first) = words.next() else {
        return Ok(None);
    };
    let pick = |arg: Option<&str>| -> Result<Option<CallCommand>, String> {
        let n: usize = arg
            .ok_or("usage: select <n>")?
            .parse()
            .map_err(|_| "peer number expected".to_string())?;
        view.peers
            .get(n.wrapping_sub(1))
            .map(|p| Some(CallCommand::SelectPeer(p.id.clone())))
            .ok_or_else(|| format!("no peer number {n}"))
    };
    match first.to_ascii_lowercase().as_str() {
        "list" | "ls" => Ok(None),
        "select" | "s" => pick(words.next()),
        "call" | "start" => Ok(Some(CallCommand::StartCall)),
        "end" | "hangup" => Ok(Some(CallCommand::EndCall)),
        "mute" | "unmute" => Ok(Some(CallCommand::ToggleMute)),
        "back" | "quit" | "exit" | "close" => Ok(Some(CallCommand::Close)),
        "help" | "?" => Err(HELP.to_string()),
        other if other.chars().all(|c| c.is_ascii_digit()) => pick(Some(other)),
        other => Err(format!("unknown command {other:?} (try help)")),
    }
}

pub async fn run<R>(
    config: &CareConfig,
    events: &EventBus,
    lines: &mut Lines<R>,
) -> carelink_common::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let connector = WebRtcConnector::new(&config.ice)?;
    let dialer = SocketIoDialer::new(config.signaling.clone());
    println!("Joining the call relay as {}. Type help for commands.", dialer.display_name());

    let mut controller = CallController::new(
        Arc::new(dialer),
        Arc::new(connector),
        Arc::new(SyntheticDevices::new()),
        events.clone(),
    );
    let mut view_rx = controller.subscribe();
    let (cmd_tx, cmd_rx) = mpsc::channel(16);
    let task = tokio::spawn(async move { controller.run(cmd_rx).await });

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let view = view_rx.borrow().clone();
                match parse_call_input(&line, &view) {
                    Ok(Some(command)) => {
                        let close = command == CallCommand::Close;
                        if cmd_tx.send(command).await.is_err() || close {
                            break;
                        }
                    }
                    Ok(None) => println!("{}", render::call_view(&view)),
                    Err(message) => println!("{message}"),
                }
            }
            changed = view_rx.changed() => {
                if changed.is_err() {
                    debug!("call controller stopped");
                    break;
                }
                println!("{}", render::call_view(&view_rx.borrow_and_update()));
            }
        }
    }

    let _ = cmd_tx.send(CallCommand::Close).await;
    drop(cmd_tx);
    let _ = task.await;
    info!("left call overlay");
    Ok(())
}

#[cfg(test)]
mod tests {
    use carelink_call::Peer;

    use super::*;

    fn view() -> CallView {
        CallView {
            peers: vec![
                Peer {
                    id: "sid-a".into(),
                    display_name: "User-1".into(),
                },
                Peer {
                    id: "sid-b".into(),
                    display_name: "User-2".into(),
                },
            ],
            connected: true,
            ..Default::default()
        }
    }

    #[test]
    fn numbers_select_peers() {
        assert_eq!(
            parse_call_input("2", &view()),
            Ok(Some(CallCommand::SelectPeer("sid-b".into())))
        );
        assert_eq!(
            parse_call_input("select 1", &view()),
            Ok(Some(CallCommand::SelectPeer("sid-a".into())))
        );
        assert!(parse_call_input("3", &view()).is_err());
        assert!(parse_call_input("0", &view()).is_err());
        assert!(parse_call_input("select x", &view()).is_err());
    }

    #[test]
    fn verbs_map_to_commands() {
        assert_eq!(parse_call_input("call", &view()), Ok(Some(CallCommand::StartCall)));
        assert_eq!(parse_call_input("END", &view()), Ok(Some(CallCommand::EndCall)));
        assert_eq!(parse_call_input("mute", &view()), Ok(Some(CallCommand::ToggleMute)));
        assert_eq!(parse_call_input("back", &view()), Ok(Some(CallCommand::Close)));
        assert_eq!(parse_call_input("   ", &view()), Ok(None));
        assert!(parse_call_input("dance", &view()).is_err());
    }
}
