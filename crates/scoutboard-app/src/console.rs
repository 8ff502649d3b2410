// Line-oriented console front end: parses stdin commands into `UserCommand`s
// and prints `UiUpdate`s as text.

use std::fmt::Write as _;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info};

use scoutboard_core::identity::PlayerIdentity;
use scoutboard_core::model::{ListUpdate, PlayerProfile, Stage};

use crate::protocol::{BoardSnapshot, UiUpdate, UserCommand};

pub const HELP: &str = "\
commands:
  refresh                      reload every list
  toggle <list>                show or hide a list on the board
  move <item> <from> <to>      move an item between stages 1-4
  reorder <item> <position>    move an item to a position in its stage column
  search <text>                search players (empty text clears)
  close                        close the search panel
  add <list> <identity>        add a player, e.g. `add 1 external_501`
  new <name>                   create a list
  rename <list> <name>         rename a list
  delete <list>                delete a list
  remove <list> <item>         remove an item from a list
  quit";

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse one input line. Errors are short messages for the user.
pub fn parse_command(line: &str) -> Result<UserCommand, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    let args: Vec<&str> = rest.split_whitespace().collect();

    let cmd = match word.to_ascii_lowercase().as_str() {
        "refresh" => UserCommand::Refresh,
        "toggle" => UserCommand::ToggleList(number(&args, 0, "list")?),
        "move" => UserCommand::MoveItem {
            item_id: number(&args, 0, "item")?,
            from: stage(&args, 1)?,
            to: stage(&args, 2)?,
        },
        "reorder" => {
            let item_id = number(&args, 0, "item")?;
            let position: usize = number(&args, 1, "position")?;
            if position == 0 {
                return Err("positions start at 1".to_string());
            }
            UserCommand::ReorderInColumn {
                item_id,
                position: position - 1,
            }
        }
        // Keep the text as typed; the search path trims it for the request.
        "search" => UserCommand::SearchInput(line.get(word.len() + 1..).unwrap_or("").to_string()),
        "close" => UserCommand::CloseSearch,
        "add" => {
            let list_id = number(&args, 0, "list")?;
            let raw = args.get(1).ok_or("missing player identity")?;
            let identity: PlayerIdentity = raw.parse().map_err(|e| format!("{e}"))?;
            UserCommand::SelectResult { list_id, identity }
        }
        "new" => {
            if rest.is_empty() {
                return Err("missing list name".to_string());
            }
            UserCommand::CreateList {
                name: rest.to_string(),
                description: None,
            }
        }
        "rename" => {
            let list_id = number(&args, 0, "list")?;
            let name = rest
                .split_once(char::is_whitespace)
                .map(|(_, name)| name.trim())
                .filter(|name| !name.is_empty())
                .ok_or("missing list name")?;
            UserCommand::UpdateList {
                list_id,
                update: ListUpdate {
                    name: Some(name.to_string()),
                    description: None,
                },
            }
        }
        "delete" => UserCommand::DeleteList(number(&args, 0, "list")?),
        "remove" => UserCommand::RemovePlayer {
            list_id: number(&args, 0, "list")?,
            item_id: number(&args, 1, "item")?,
        },
        "quit" | "exit" => UserCommand::Quit,
        other => return Err(format!("unknown command `{other}`")),
    };
    Ok(cmd)
}

fn number<T: std::str::FromStr>(args: &[&str], index: usize, what: &str) -> Result<T, String> {
    let raw = args.get(index).ok_or_else(|| format!("missing {what}"))?;
    raw.parse()
        .map_err(|_| format!("{what} must be a number, got `{raw}`"))
}

fn stage(args: &[&str], index: usize) -> Result<Stage, String> {
    let n: u8 = number(args, index, "stage")?;
    Stage::from_number(n).ok_or_else(|| format!("stage must be 1-4, got {n}"))
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

pub fn render_update(update: &UiUpdate) -> String {
    match update {
        UiUpdate::Board(board) => render_board(board),
        UiUpdate::SearchLoading { query } => format!("searching for \"{}\"...", query.trim()),
        UiUpdate::SearchResults { query, results } => {
            if query.trim().is_empty() {
                return "search cleared".to_string();
            }
            if results.is_empty() {
                return format!("no players match \"{}\"", query.trim());
            }
            let mut out = format!("{} result(s) for \"{}\":", results.len(), query.trim());
            for result in results {
                let _ = write!(
                    out,
                    "\n  {:<14} {}",
                    result.identity.to_string(),
                    describe(&result.profile)
                );
            }
            out
        }
        UiUpdate::Notice(message) => format!("! {message}"),
        UiUpdate::LoadFailed(message) => {
            format!("!! could not load the board: {message} (type `refresh` to retry)")
        }
    }
}

fn render_board(board: &BoardSnapshot) -> String {
    let mut out = String::from("lists:");
    for list in &board.lists {
        let mark = if list.visible { 'x' } else { ' ' };
        let _ = write!(out, " [{mark}] {} {} ({})", list.id, list.name, list.item_count);
    }

    for column in &board.columns {
        let _ = write!(out, "\n== {} ({})", column.stage, column.len());
        if let Some(avg) = column.average_score {
            let _ = write!(out, " avg {avg:.2}");
        }
        for (position, entry) in column.entries.iter().enumerate() {
            let _ = write!(
                out,
                "\n  {:>2}. #{} {} [{}]",
                position + 1,
                entry.item_id(),
                describe(&entry.item.profile),
                entry.list_name
            );
        }
    }
    out
}

fn describe(profile: &PlayerProfile) -> String {
    let details: Vec<String> = [
        profile.position.clone(),
        profile.squad_name.clone(),
        profile.age.map(|age| age.to_string()),
    ]
    .into_iter()
    .flatten()
    .collect();

    if details.is_empty() {
        profile.player_name.clone()
    } else {
        format!("{} ({})", profile.player_name, details.join(", "))
    }
}

// ---------------------------------------------------------------------------
// I/O tasks
// ---------------------------------------------------------------------------

/// Read stdin line by line until EOF or `quit`, forwarding parsed commands.
pub async fn read_commands(cmd_tx: mpsc::Sender<UserCommand>) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        if line.trim() == "help" {
            println!("{HELP}");
            continue;
        }
        match parse_command(&line) {
            Ok(cmd) => {
                debug!(?cmd, "console command");
                let quit = cmd == UserCommand::Quit;
                if cmd_tx.send(cmd).await.is_err() || quit {
                    break;
                }
            }
            Err(message) => println!("? {message} (type `help` for commands)"),
        }
    }
    info!("Console input finished");
    let _ = cmd_tx.send(UserCommand::Quit).await;
    Ok(())
}

/// Print every update until the event loop drops its sender.
pub async fn print_updates(mut ui_rx: mpsc::Receiver<UiUpdate>) {
    while let Some(update) = ui_rx.recv().await {
        println!("{}\n", render_update(&update));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scoutboard_core::model::{ListItem, PlayerListDetail};
    use scoutboard_core::projection::project;
    use scoutboard_core::visibility::VisibleLists;

    use crate::protocol::ListSummary;

    #[test]
    fn parses_board_commands() {
        assert_eq!(parse_command("refresh"), Ok(UserCommand::Refresh));
        assert_eq!(parse_command("  toggle 2 "), Ok(UserCommand::ToggleList(2)));
        assert_eq!(
            parse_command("move 7 1 3"),
            Ok(UserCommand::MoveItem {
                item_id: 7,
                from: Stage::One,
                to: Stage::Three
            })
        );
        assert_eq!(
            parse_command("reorder 3 1"),
            Ok(UserCommand::ReorderInColumn {
                item_id: 3,
                position: 0
            })
        );
        assert_eq!(
            parse_command("remove 1 4"),
            Ok(UserCommand::RemovePlayer {
                list_id: 1,
                item_id: 4
            })
        );
        assert_eq!(parse_command("QUIT"), Ok(UserCommand::Quit));
    }

    #[test]
    fn parses_list_and_search_commands() {
        assert_eq!(
            parse_command("add 1 internal_12"),
            Ok(UserCommand::SelectResult {
                list_id: 1,
                identity: PlayerIdentity::Internal(12)
            })
        );
        assert_eq!(
            parse_command("new Loan Targets"),
            Ok(UserCommand::CreateList {
                name: "Loan Targets".into(),
                description: None
            })
        );
        assert_eq!(
            parse_command("rename 3 First Team  Targets"),
            Ok(UserCommand::UpdateList {
                list_id: 3,
                update: ListUpdate {
                    name: Some("First Team  Targets".into()),
                    description: None
                }
            })
        );
        assert_eq!(
            parse_command("search roy k"),
            Ok(UserCommand::SearchInput("roy k".into()))
        );
        assert_eq!(parse_command("search"), Ok(UserCommand::SearchInput(String::new())));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse_command("move 7 0 3").unwrap_err().contains("1-4"));
        assert!(parse_command("move 7 1").unwrap_err().contains("missing stage"));
        assert!(parse_command("reorder 3 0").unwrap_err().contains("start at 1"));
        assert!(parse_command("reorder 3").unwrap_err().contains("missing position"));
        assert!(parse_command("toggle x").unwrap_err().contains("number"));
        assert!(parse_command("add 1 player_9").is_err());
        assert!(parse_command("new").is_err());
        assert!(parse_command("rename 3").is_err());
        assert!(parse_command("jump").unwrap_err().contains("unknown"));
    }

    fn sample_board() -> BoardSnapshot {
        let list = PlayerListDetail {
            list: scoutboard_core::model::PlayerList {
                id: 1,
                name: "Shortlist".into(),
                description: None,
                owner: "scout".into(),
                created_at: chrono::Utc::now(),
                updated_at: chrono::Utc::now(),
            },
            items: vec![ListItem::new(
                5,
                1,
                PlayerIdentity::External(501),
                PlayerProfile {
                    player_name: "Roy Keane".into(),
                    position: Some("CM".into()),
                    squad_name: None,
                    age: Some(19),
                },
                0,
            )],
        };
        let columns = project(std::slice::from_ref(&list), &VisibleLists::with_visible([1]));
        BoardSnapshot {
            columns,
            lists: vec![ListSummary {
                id: 1,
                name: "Shortlist".into(),
                item_count: 1,
                visible: true,
            }],
            revision: 1,
        }
    }

    #[test]
    fn renders_board_columns_with_provenance() {
        let text = render_update(&UiUpdate::Board(Box::new(sample_board())));
        assert!(text.starts_with("lists: [x] 1 Shortlist (1)"));
        assert!(text.contains("== Stage 1 (1)"));
        assert!(text.contains("#5 Roy Keane (CM, 19) [Shortlist]"));
        assert!(text.contains("== Stage 4 (0)"));
    }

    #[test]
    fn renders_search_states() {
        let empty = UiUpdate::SearchResults {
            query: "zzz".into(),
            results: vec![],
        };
        assert_eq!(render_update(&empty), "no players match \"zzz\"");

        let cleared = UiUpdate::SearchResults {
            query: " ".into(),
            results: vec![],
        };
        assert_eq!(render_update(&cleared), "search cleared");

        let notice = UiUpdate::Notice("Could not reach the server".into());
        assert_eq!(render_update(&notice), "! Could not reach the server");
    }
}
