//! Minimal stand-in for a MUD's game loop: reads player commands from
//! stdin, hands them to the I3 client and prints gateway events once per
//! "tick".
//!
//! ```text
//! RUST_LOG=i3link=debug cargo run -p i3-console -- config/i3.conf
//! ```

use std::io::BufRead;
use std::sync::mpsc::{self, TryRecvError};
use std::thread;
use std::time::Duration;

use i3link::prelude::*;
use tracing_subscriber::EnvFilter;

const TICK: Duration = Duration::from_millis(100);
const PLAYER: &str = "Console";

// ---------------------------------------------------------------------------
// Player commands
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq)]
enum Input {
    Tell { user: String, mud: String, message: String },
    Emote { user: String, mud: String, message: String },
    Chat(String),
    Who(String),
    Finger { user: String, mud: String },
    Locate(String),
    MudList,
    Channels,
    Join(String),
    Leave(String),
    Status,
    Reconnect,
    Help,
    Quit,
}

fn split_target(target: &str) -> Option<(String, String)> {
    let (user, mud) = target.split_once('@')?;
    (!user.is_empty() && !mud.is_empty()).then(|| (user.to_string(), mud.to_string()))
}

fn parse_input(line: &str) -> Result<Input, String> {
    let line = line.trim();
    let (verb, rest) = line.split_once(' ').unwrap_or((line, ""));
    let rest = rest.trim();

    let need = |what: &str| -> Result<String, String> {
        if rest.is_empty() {
            Err(format!("usage: {verb} {what}"))
        } else {
            Ok(rest.to_string())
        }
    };

    match verb.to_ascii_lowercase().as_str() {
        "tell" | "emote" => {
            let (target, message) = rest.split_once(' ').unwrap_or((rest, ""));
            let (user, mud) = split_target(target).ok_or(format!("usage: {verb} <user>@<mud> <message>"))?;
            let message = message.trim().to_string();
            if message.is_empty() {
                return Err(format!("usage: {verb} <user>@<mud> <message>"));
            }
            Ok(if verb.eq_ignore_ascii_case("tell") {
                Input::Tell { user, mud, message }
            } else {
                Input::Emote { user, mud, message }
            })
        }
        "chat" => need("<message>").map(Input::Chat),
        "who" => need("<mud>").map(Input::Who),
        "finger" => {
            let (user, mud) = split_target(rest).ok_or("usage: finger <user>@<mud>")?;
            Ok(Input::Finger { user, mud })
        }
        "locate" => need("<user>").map(Input::Locate),
        "mudlist" => Ok(Input::MudList),
        "channels" => Ok(Input::Channels),
        "join" => need("<channel>").map(Input::Join),
        "leave" => need("<channel>").map(Input::Leave),
        "status" => Ok(Input::Status),
        "reconnect" => Ok(Input::Reconnect),
        "help" | "?" => Ok(Input::Help),
        "quit" | "exit" => Ok(Input::Quit),
        "" => Err(String::new()),
        other => Err(format!("unknown command '{other}', try 'help'")),
    }
}

fn execute(client: &I3Client, input: Input) -> Result<(), I3Error> {
    let submission = match input {
        Input::Tell { user, mud, message } => {
            // Unknown MUDs go through; the directory may not be loaded yet.
            if client.find_mud(&mud).is_some_and(|m| !m.online) {
                println!("{mud} is not online right now.");
                return Ok(());
            }
            client.send_tell(PLAYER, &mud, &user, &message)?
        }
        Input::Emote { user, mud, message } => client.send_emoteto(PLAYER, &mud, &user, &message)?,
        Input::Chat(message) => client.send_chat(PLAYER, &message)?,
        Input::Who(mud) => client.request_who(&mud)?,
        Input::Finger { user, mud } => client.request_finger(&mud, &user)?,
        Input::Locate(user) => client.request_locate(&user)?,
        Input::MudList => client.request_mudlist(true)?,
        Input::Channels => client.list_channels()?,
        Input::Join(channel) => client.join_channel(&channel, PLAYER, false)?,
        Input::Leave(channel) => client.leave_channel(&channel, PLAYER)?,
        Input::Status => {
            print_status(client);
            return Ok(());
        }
        Input::Reconnect => {
            client.request_reconnect()?;
            println!("Reconnecting to the I3 gateway...");
            return Ok(());
        }
        Input::Help => {
            print_help();
            return Ok(());
        }
        Input::Quit => return Ok(()),
    };
    if submission == Submission::Dropped {
        println!("The I3 outbound queue is full, try again later.");
    } else if !client.is_connected() {
        println!("Queued; the I3 gateway is {}.", client.state_name().to_lowercase());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn render(event: &Event) -> String {
    match event {
        Event::Connected { mud_name, .. } => format!("[I3] Connected to the gateway as {mud_name}."),
        Event::Disconnected { reason } => format!("[I3] Disconnected: {reason}"),
        Event::Tell(m) => {
            let who = m.visname.as_deref().unwrap_or(&m.from_user);
            format!("{who}@{} tells you: {}", m.from_mud, m.message)
        }
        Event::Emote(m) => {
            let who = m.visname.as_deref().unwrap_or(&m.from_user);
            format!("{who}@{} {}", m.from_mud, m.message)
        }
        Event::ChannelMessage(m) => {
            let who = m.visname.as_deref().unwrap_or(&m.from_user);
            format!("[{}] {who}@{}: {}", m.channel, m.from_mud, m.message)
        }
        Event::ChannelEmote(m) => {
            let who = m.visname.as_deref().unwrap_or(&m.from_user);
            format!("[{}] {who}@{} {}", m.channel, m.from_mud, m.message)
        }
        Event::MudOnline { mud_name } => format!("[I3] {mud_name} has come online."),
        Event::MudOffline { mud_name } => format!("[I3] {mud_name} has gone offline."),
        Event::ChannelJoined(m) => format!(
            "[{}] {}@{} joined.",
            m.channel,
            m.user.as_deref().unwrap_or("someone"),
            m.mud.as_deref().unwrap_or("?")
        ),
        Event::ChannelLeft(m) => format!(
            "[{}] {}@{} left.",
            m.channel,
            m.user.as_deref().unwrap_or("someone"),
            m.mud.as_deref().unwrap_or("?")
        ),
        Event::Error(e) => format!("[I3] Error: {}", e.message),
        Event::WhoReply { mud_name, channel, users } => {
            let place = channel
                .as_ref()
                .map(|c| format!("channel {c}"))
                .or_else(|| mud_name.clone())
                .unwrap_or_else(|| "remote MUD".to_string());
            let names: Vec<&str> = users.iter().map(|u| u.name.as_str()).collect();
            format!("Users on {place} ({}): {}", names.len(), names.join(", "))
        }
        Event::MudList { total, online } => format!("[I3] {online} of {total} MUDs are online."),
        Event::ChannelList { channels } => format!("Channels: {}", channels.join(", ")),
        Event::LocateReply { user_name, locations } if locations.is_empty() => {
            format!("{user_name} was not found on any MUD.")
        }
        Event::LocateReply { user_name, locations } => {
            format!("{user_name} was found on: {}", locations.join(", "))
        }
        Event::FingerReply { info } => format!("Finger: {info}"),
    }
}

fn print_status(client: &I3Client) {
    let stats = client.stats();
    println!("I3 state:       {}", stats.state);
    println!("MUD name:       {}", client.mud_name());
    if let Some(up) = stats.uptime {
        println!("Connected for:  {}s", up.as_secs());
    }
    println!(
        "Messages:       {} sent, {} received, {} errors",
        stats.counters.messages_sent, stats.counters.messages_received, stats.counters.errors
    );
    println!("Reconnects:     {}", stats.counters.reconnects);
    println!(
        "Queues:         {}/{} commands, {}/{} events ({} + {} dropped)",
        stats.commands.len,
        stats.commands.capacity,
        stats.events.len,
        stats.events.capacity,
        stats.commands.dropped,
        stats.events.dropped
    );
    println!("Known MUDs:     {} ({} online)", stats.known_muds, stats.online_muds);
    println!("Known channels: {}", stats.known_channels);
}

fn print_help() {
    println!(
        "Commands:\n  \
         tell <user>@<mud> <message>\n  \
         emote <user>@<mud> <message>\n  \
         chat <message>\n  \
         who <mud>\n  \
         finger <user>@<mud>\n  \
         locate <user>\n  \
         mudlist | channels | join <channel> | leave <channel>\n  \
         status | reconnect | quit"
    );
}

// ---------------------------------------------------------------------------
// Main loop
// ---------------------------------------------------------------------------

fn main() -> Result<(), I3Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_thread_names(true)
        .init();

    let path = std::env::args().nth(1).unwrap_or_else(|| "config/i3.conf".to_string());
    let client = I3Client::initialize_from_file(&path)?;

    let (tx, rx) = mpsc::channel::<String>();
    thread::Builder::new()
        .name("stdin".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        })
        .map_err(I3Error::ThreadSpawn)?;

    print_help();
    'game: loop {
        loop {
            match rx.try_recv() {
                Ok(line) => match parse_input(&line) {
                    Ok(Input::Quit) => break 'game,
                    Ok(input) => {
                        if let Err(e) = execute(&client, input) {
                            println!("{e}");
                        }
                    }
                    Err(msg) if msg.is_empty() => {}
                    Err(msg) => println!("{msg}"),
                },
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => break 'game,
            }
        }

        for event in client.drain_events() {
            println!("{}", render(&event));
        }
        thread::sleep(TICK);
    }

    tracing::info!("console exiting");
    client.shutdown();
    Ok(())
}
