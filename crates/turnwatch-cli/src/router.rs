//! Line-oriented command router.
//!
//! Maps `--command args` lines onto [`TurnWatch`] operations and renders the
//! reply text shown to whoever issued the command.

use turnwatch_core::{CommandError, Game, TurnWatch};
use turnwatch_proto::{CallerId, ChannelRef};

/// Prefix every command line starts with.
pub const COMMAND_PREFIX: &str = "--";

/// Who issued a command, and where.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub guild: String,
    pub channel: ChannelRef,
    pub caller: CallerId,
    pub caller_name: String,
}

/// A parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Follow { url: String, friendly_name: Option<String> },
    Unfollow { game_id: String },
    Reset,
    Games,
    Register { handle: String },
    Unregister,
    Players,
    Poke,
    Mute,
    Unmute,
    Help,
}

/// Errors from parsing a command line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("Unknown command \"{0}\". Use \"--help\" to list commands.")]
    Unknown(String),

    #[error("Usage: {0}")]
    Usage(&'static str),
}

impl Command {
    /// Parses one line. Returns `None` for lines that are not commands.
    pub fn parse(line: &str) -> Option<Result<Self, ParseError>> {
        let rest = line.trim().strip_prefix(COMMAND_PREFIX)?;
        let (name, args) = match rest.split_once(char::is_whitespace) {
            Some((name, args)) => (name, args.trim()),
            None => (rest, ""),
        };

        let command = match name {
            "follow" | "f" => {
                let (url, friendly) = match args.split_once(char::is_whitespace) {
                    Some((url, friendly)) => (url, Some(friendly.trim())),
                    None => (args, None),
                };
                if url.is_empty() {
                    return Some(Err(ParseError::Usage("--follow <url> [friendly name]")));
                }
                Ok(Self::Follow {
                    url: url.to_string(),
                    friendly_name: friendly.filter(|n| !n.is_empty()).map(str::to_string),
                })
            }
            "unfollow" => Ok(Self::Unfollow {
                game_id: args.to_string(),
            }),
            "reset" => Ok(Self::Reset),
            "games" | "list" => Ok(Self::Games),
            "register" => {
                if args.is_empty() {
                    return Some(Err(ParseError::Usage("--register <handle>")));
                }
                Ok(Self::Register {
                    handle: args.to_string(),
                })
            }
            "unregister" => Ok(Self::Unregister),
            "players" => Ok(Self::Players),
            "poke" => Ok(Self::Poke),
            "mute" => Ok(Self::Mute),
            "unmute" => Ok(Self::Unmute),
            "help" => Ok(Self::Help),
            other => Err(ParseError::Unknown(other.to_string())),
        };
        Some(command)
    }
}

const HELP: &str = "\
--follow <url> [friendly name]  (alias --f) adds a game to monitor
--unfollow <game id>            stop following a game
--reset                         clear the games list
--games                         show currently monitored games
--register <handle>             get pinged when it's your turn
--unregister                    stop being pinged
--players                       list registered players
--poke                          remind players who is up
--mute                          mute notifications for one hour
--unmute                        unmute notifications";

fn game_link(game: &Game) -> String {
    format!("[{}]({})", game.friendly_name, game.url)
}

fn unfollowed(game: &Game) -> String {
    format!("Game {}: {} unfollowed.", game.id, game_link(game))
}

/// Runs a command and returns the reply, if it has one.
pub async fn execute(tw: &TurnWatch, ctx: &CommandContext, command: Command) -> Option<String> {
    let guild = ctx.guild.as_str();
    match command {
        Command::Follow { url, friendly_name } => {
            let game = tw.follow(guild, &url, ctx.channel.clone(), friendly_name.as_deref());
            Some(format!("Now following game {}: {}.", game.id, game_link(&game)))
        }
        Command::Unfollow { game_id } => Some(match tw.unfollow(guild, &game_id) {
            Ok(game) => unfollowed(&game),
            Err(CommandError::InvalidGameId(text)) => format!(
                "\"{text}\" is not a valid game id. Use the \"games\" command and lookup the game's integer id."
            ),
        }),
        Command::Reset => {
            let removed = tw.reset(guild);
            if removed.is_empty() {
                return Some("No games currently being monitored.".to_string());
            }
            Some(removed.iter().map(unfollowed).collect::<Vec<_>>().join("\n"))
        }
        Command::Games => {
            let games = tw.list_games(guild);
            if games.is_empty() {
                return Some("No games currently being monitored.".to_string());
            }
            let lines: Vec<String> = games
                .iter()
                .map(|game| {
                    let player = if game.last_player_up.is_empty() {
                        "nobody known"
                    } else {
                        game.last_player_up.as_str()
                    };
                    format!("{}: {} --> {} is up", game.id, game_link(game), player)
                })
                .collect();
            Some(lines.join("\n"))
        }
        Command::Register { handle } => {
            tw.register_player(guild, &handle, ctx.caller.clone(), &ctx.caller_name);
            Some(format!(
                "Registered handle \"{}\" as user \"{}\".",
                handle.trim(),
                ctx.caller_name
            ))
        }
        Command::Unregister => {
            let removed = tw.unregister_player(guild, &ctx.caller);
            if removed.is_empty() {
                return Some("No handle registered for you on this server.".to_string());
            }
            Some(
                removed
                    .iter()
                    .map(|handle| format!("Unregistered handle \"{handle}\"."))
                    .collect::<Vec<_>>()
                    .join("\n"),
            )
        }
        Command::Players => {
            let players = tw.list_players(guild);
            if players.is_empty() {
                return Some("No handles registered on this server.".to_string());
            }
            let mut lines = vec!["Handle - User".to_string()];
            lines.extend(
                players
                    .iter()
                    .map(|(handle, player)| format!("{handle} - {}", player.display_name)),
            );
            Some(lines.join("\n"))
        }
        Command::Poke => {
            tw.poke(guild).await;
            None
        }
        Command::Mute => {
            tw.mute(guild);
            Some("Notifications muted for one hour.".to_string())
        }
        Command::Unmute => {
            tw.unmute(guild);
            Some("Notifications unmuted.".to_string())
        }
        Command::Help => Some(HELP.to_string()),
    }
}

/// Parses and runs one input line.
pub async fn dispatch(tw: &TurnWatch, ctx: &CommandContext, line: &str) -> Option<String> {
    match Command::parse(line)? {
        Ok(command) => execute(tw, ctx, command).await,
        Err(e) => Some(e.to_string()),
    }
}
