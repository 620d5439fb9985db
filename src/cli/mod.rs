use crate::catalog::SortOrder;
use crate::playback::{MAX_PITCH_SEMITONES, MAX_SPEED, MIN_SPEED};
use clap::{Parser, Subcommand};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

pub mod status;
pub use status::StatusDisplay;

/// Soundboard CLI
#[derive(Parser)]
#[command(name = "soundboard")]
#[command(about = "Play short sound clips with fades, speed/pitch effects, looping and auto-advance")]
#[command(version = "0.1.0")]
pub struct CliApp {
    /// Use this config file instead of ~/.config/soundboard/config.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// An on/off argument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Switch {
    On,
    Off,
}

impl Switch {
    pub fn is_on(&self) -> bool {
        matches!(self, Switch::On)
    }
}

impl fmt::Display for Switch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.is_on() { "on" } else { "off" })
    }
}

impl FromStr for Switch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "on" | "true" | "yes" | "1" => Ok(Switch::On),
            "off" | "false" | "no" | "0" => Ok(Switch::Off),
            other => Err(format!("expected on or off, got '{}'", other)),
        }
    }
}

/// Available CLI commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List sounds in the catalog
    #[command(alias = "ls")]
    List {
        /// Only show sounds whose title contains this text
        #[arg(long)]
        search: Option<String>,
        /// Order: title, plays or newest
        #[arg(long, default_value = "title")]
        sort: SortOrder,
    },
    /// Add a sound to the catalog
    Add {
        /// Title shown on the board
        title: String,
        /// Path to the audio file
        audio: String,
        /// Optional cover image
        #[arg(long)]
        image: Option<String>,
        /// Loop this sound until stopped
        #[arg(long = "loop")]
        looping: bool,
    },
    /// Edit a sound's title, audio or image
    Edit {
        id: u64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        audio: Option<String>,
        #[arg(long)]
        image: Option<String>,
    },
    /// Remove a sound from the catalog
    #[command(alias = "rm")]
    Remove { id: u64 },
    /// Set whether a sound loops
    Loop {
        id: u64,
        /// on or off
        #[arg(default_value = "on")]
        state: Switch,
    },
    /// List available audio output devices
    Devices,
    /// Play through this output device; omit the name to use the system default
    Device { name: Option<String> },
    /// Play a sound; playing the sound that is already on stops it
    Play { id: u64 },
    /// Fade out the current sound
    Stop,
    /// Set playback volume (0-100)
    Volume { level: u8 },
    /// Set playback speed multiplier, 0.25 to 4 (e.g. 0.5, 1.0, 2.0)
    Speed {
        #[arg(value_parser = parse_speed_arg)]
        value: f64,
    },
    /// Shift pitch in semitones, -24 to 24 (e.g. -12, 0, 7)
    Pitch {
        #[arg(allow_hyphen_values = true, value_parser = parse_pitch_arg)]
        semitones: f64,
    },
    /// Advance to another sound when one finishes
    Auto { state: Switch },
    /// Pick the next sound at random when advancing
    Shuffle { state: Switch },
    /// Display current playback status
    Status,
    /// Show recent playback events
    History {
        #[arg(default_value_t = 20)]
        count: usize,
    },
}

impl CliApp {
    /// Parse command line arguments
    pub fn parse() -> Self {
        <Self as clap::Parser>::parse()
    }

    /// Expand tilde (~) in path to home directory
    pub fn expand_path(path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/") {
            if let Some(home_dir) = dirs::home_dir() {
                return home_dir.join(rest);
            }
        } else if path == "~" {
            if let Some(home_dir) = dirs::home_dir() {
                return home_dir;
            }
        }
        PathBuf::from(path)
    }

    /// Parse command from string (for interactive mode)
    pub fn parse_command(input: &str) -> Result<Commands, ParseError> {
        let args: Vec<&str> = input.split_whitespace().collect();
        if args.is_empty() {
            return Err(ParseError::EmptyCommand);
        }

        match args[0] {
            "play" | "p" => Ok(Commands::Play {
                id: parse_id("play", args.get(1))?,
            }),
            "stop" | "s" => Ok(Commands::Stop),
            "volume" | "vol" => {
                let value = required("volume", "level", args.get(1))?;
                match value.parse::<u8>() {
                    Ok(level) if level <= 100 => Ok(Commands::Volume { level }),
                    _ => Err(ParseError::InvalidArgument {
                        argument: "volume level".to_string(),
                        value: value.to_string(),
                        expected: "0-100".to_string(),
                    }),
                }
            }
            "speed" => Ok(Commands::Speed {
                value: speed_value(required("speed", "multiplier", args.get(1))?)?,
            }),
            "pitch" => Ok(Commands::Pitch {
                semitones: pitch_value(required("pitch", "semitones", args.get(1))?)?,
            }),
            "auto" => Ok(Commands::Auto {
                state: parse_switch("auto", args.get(1))?,
            }),
            "shuffle" => Ok(Commands::Shuffle {
                state: parse_switch("shuffle", args.get(1))?,
            }),
            "loop" => Ok(Commands::Loop {
                id: parse_id("loop", args.get(1))?,
                state: match args.get(2) {
                    Some(_) => parse_switch("loop", args.get(2))?,
                    None => Switch::On,
                },
            }),
            "list" | "ls" => {
                let search = args[1..].join(" ");
                Ok(Commands::List {
                    search: if search.is_empty() { None } else { Some(search) },
                    sort: SortOrder::Title,
                })
            }
            "status" => Ok(Commands::Status),
            "history" => {
                let count = match args.get(1) {
                    Some(value) => value.parse::<usize>().map_err(|_| ParseError::InvalidArgument {
                        argument: "count".to_string(),
                        value: value.to_string(),
                        expected: "a positive number".to_string(),
                    })?,
                    None => 20,
                };
                Ok(Commands::History { count })
            }
            "devices" => Ok(Commands::Devices),
            "device" => {
                let name = args[1..].join(" ");
                Ok(Commands::Device {
                    name: if name.is_empty() || name == "default" { None } else { Some(name) },
                })
            }
            "help" | "?" => Err(ParseError::HelpRequested),
            _ => Err(ParseError::UnknownCommand {
                command: args[0].to_string(),
            }),
        }
    }

    pub fn display_help() {
        println!("Soundboard - Available Commands:");
        println!();
        println!("Playback:");
        println!("  play <id>          - Play a sound (again to stop it)");
        println!("  stop               - Fade out the current sound");
        println!("  status             - Show what is playing");
        println!();
        println!("Effects:");
        println!("  volume <0-100>     - Set volume");
        println!("  speed <x>          - Set speed multiplier, 0.25-4 (e.g. 0.5, 1.5)");
        println!("  pitch <semitones>  - Shift pitch, -24 to 24 (e.g. -12, 7)");
        println!();
        println!("Advance:");
        println!("  auto on|off        - Play another sound when one ends");
        println!("  shuffle on|off     - Pick that sound at random");
        println!();
        println!("Catalog:");
        println!("  list [text]        - List sounds, optionally filtered");
        println!("  loop <id> [on|off] - Set whether a sound loops");
        println!("  devices            - List audio output devices");
        println!("  device [name]      - Use an output device (no name: default)");
        println!("  history [n]        - Show recent playback events");
        println!();
        println!("  help               - Show this help");
        println!("  quit               - Exit");
    }
}

fn required<'a>(command: &str, argument: &str, value: Option<&&'a str>) -> Result<&'a str, ParseError> {
    value.copied().ok_or_else(|| ParseError::MissingArgument {
        command: command.to_string(),
        argument: argument.to_string(),
    })
}

fn parse_id(command: &str, value: Option<&&str>) -> Result<u64, ParseError> {
    let value = required(command, "sound id", value)?;
    value.parse::<u64>().map_err(|_| ParseError::InvalidArgument {
        argument: "sound id".to_string(),
        value: value.to_string(),
        expected: "a numeric id from 'list'".to_string(),
    })
}

fn speed_value(value: &str) -> Result<f64, ParseError> {
    value
        .trim_end_matches('x')
        .parse::<f64>()
        .ok()
        .filter(|speed| (MIN_SPEED..=MAX_SPEED).contains(speed))
        .ok_or_else(|| ParseError::InvalidArgument {
            argument: "speed".to_string(),
            value: value.to_string(),
            expected: format!("a multiplier from {} to {}", MIN_SPEED, MAX_SPEED),
        })
}

fn pitch_value(value: &str) -> Result<f64, ParseError> {
    value
        .parse::<f64>()
        .ok()
        .filter(|semitones| (-MAX_PITCH_SEMITONES..=MAX_PITCH_SEMITONES).contains(semitones))
        .ok_or_else(|| ParseError::InvalidArgument {
            argument: "pitch".to_string(),
            value: value.to_string(),
            expected: format!("semitones from -{0} to {0}", MAX_PITCH_SEMITONES),
        })
}

fn parse_speed_arg(value: &str) -> Result<f64, String> {
    speed_value(value).map_err(|e| e.to_string())
}

fn parse_pitch_arg(value: &str) -> Result<f64, String> {
    pitch_value(value).map_err(|e| e.to_string())
}

fn parse_switch(command: &str, value: Option<&&str>) -> Result<Switch, ParseError> {
    let value = required(command, "on|off", value)?;
    value.parse::<Switch>().map_err(|_| ParseError::InvalidArgument {
        argument: command.to_string(),
        value: value.to_string(),
        expected: "on or off".to_string(),
    })
}

/// Command parsing errors
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Empty command")]
    EmptyCommand,

    #[error("Unknown command: {command}")]
    UnknownCommand { command: String },

    #[error("Missing argument for {command}: {argument}")]
    MissingArgument { command: String, argument: String },

    #[error("Invalid argument {argument}: got '{value}', expected {expected}")]
    InvalidArgument {
        argument: String,
        value: String,
        expected: String,
    },

    #[error("Help requested")]
    HelpRequested,
}
