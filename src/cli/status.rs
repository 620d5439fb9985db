use crate::error::{ErrorSeverity, SoundboardError};
use crate::logging::{EventStatistics, PlaybackEvent};
use crate::models::{PlaybackState, PlayerStatus, Sound};

/// Status display formatter for the CLI
pub struct StatusDisplay;

impl StatusDisplay {
    /// Display playback state, the bound sound and the current effect settings
    pub fn display_full_status(status: &PlayerStatus) {
        println!("┌─ Soundboard ────────────────────────────────────────────┐");

        match &status.current_sound {
            Some(sound) => {
                println!("│ Sound:    {}", Self::truncate(&sound.display_name(), 45));
                println!("│ Id:       {}", sound.id);
                println!("│ Plays:    {}", sound.play_count);
                println!("│ State:    {}", Self::format_playback_state(status.state));
                if status.looping {
                    println!("│ Looping until stopped");
                }
            }
            None => {
                println!("│ Nothing playing");
            }
        }

        println!("│");
        println!(
            "│ Volume:   {} {}",
            Self::create_volume_bar(status.settings.volume, 20),
            Self::format_volume(status.settings.volume)
        );
        println!(
            "│ Speed:    {}   Pitch: {}   Rate: {}",
            Self::format_speed(status.settings.speed),
            Self::format_pitch(status.settings.pitch_semitones),
            Self::format_speed(status.playback_rate)
        );
        println!(
            "│ Auto:     {}   Shuffle: {}   Candidates: {}",
            Self::on_off(status.settings.auto_advance),
            Self::on_off(status.settings.shuffle),
            status.candidates
        );
        println!("└─────────────────────────────────────────────────────────┘");
    }

    /// Display the catalog, marking the sound that is playing
    pub fn display_sounds(sounds: &[Sound], playing: Option<&Sound>) {
        if sounds.is_empty() {
            println!("No sounds yet. Add one with 'soundboard add <title> <audio file>'.");
            return;
        }

        println!("{:<2} {:<15} {:<32} {:>6}  {}", "", "ID", "TITLE", "PLAYS", "");
        for sound in sounds {
            let is_playing = playing.map_or(false, |current| current.id == sound.id);
            println!("{}", Self::sound_row(sound, is_playing));
        }
    }

    pub fn sound_row(sound: &Sound, is_playing: bool) -> String {
        format!(
            "{:<2} {:<15} {:<32} {:>6}  {}",
            if is_playing { "▶" } else { "" },
            sound.id,
            Self::truncate(&sound.display_name(), 32),
            sound.play_count,
            if sound.is_looping { "loop" } else { "" }
        )
        .trim_end()
        .to_string()
    }

    pub fn display_history(events: &[PlaybackEvent], stats: &EventStatistics) {
        if events.is_empty() {
            println!("No playback events yet.");
            return;
        }

        for event in events {
            println!(
                "{} [{}] {}",
                event.timestamp.format("%H:%M:%S%.3f"),
                event.event_type.as_str(),
                event.details
            );
        }
        println!("{}", Self::history_summary(stats));
    }

    /// Totals over the whole session history
    pub fn history_summary(stats: &EventStatistics) -> String {
        let mut summary = format!(
            "{} events: {} started, {} ended, {} auto-advanced",
            stats.total_events, stats.sessions_started, stats.tracks_ended, stats.auto_advances
        );
        if stats.start_failures > 0 {
            summary.push_str(&format!(", {} failed to start", stats.start_failures));
        }
        if stats.catalog_failures > 0 {
            summary.push_str(&format!(", {} play counts not saved", stats.catalog_failures));
        }
        summary
    }

    /// Display error message with formatting and recovery suggestions
    pub fn display_error(error: &SoundboardError) {
        let severity = error.severity();
        let severity_icon = match severity {
            ErrorSeverity::Info => "ℹ",
            ErrorSeverity::Warning => "⚠",
            ErrorSeverity::Error => "✗",
            ErrorSeverity::Critical => "🔥",
        };

        eprintln!("┌─ {} {} ─────────────────────────────────────────────────┐", severity_icon, severity.as_str());

        for line in Self::wrap_text(&error.user_message(), 55) {
            eprintln!("│ {}", line);
        }

        let suggestions = error.recovery_suggestions();
        if !suggestions.is_empty() {
            eprintln!("│");
            eprintln!("│ Suggestions:");
            for suggestion in suggestions.iter().take(3) {
                for line in Self::wrap_text(&format!("• {}", suggestion), 53) {
                    eprintln!("│   {}", line);
                }
            }
        }

        eprintln!("└─────────────────────────────────────────────────────────┘");
    }

    /// Display a simple error message for non-interactive contexts
    pub fn display_simple_error(error: &SoundboardError) {
        eprintln!("[{}] {}", error.severity().as_str(), error.user_message());

        if let Some(suggestion) = error.recovery_suggestions().first() {
            eprintln!("Suggestion: {}", suggestion);
        }
    }

    /// Wrap text to fit within specified width
    fn wrap_text(text: &str, width: usize) -> Vec<String> {
        let mut lines = Vec::new();
        let mut current_line = String::new();

        for word in text.split_whitespace() {
            if current_line.is_empty() {
                current_line = word.to_string();
            } else if current_line.chars().count() + word.chars().count() < width {
                current_line.push(' ');
                current_line.push_str(word);
            } else {
                lines.push(std::mem::take(&mut current_line));
                current_line = word.to_string();
            }
        }

        if !current_line.is_empty() {
            lines.push(current_line);
        }

        lines
    }

    pub fn format_volume(volume: f32) -> String {
        format!("{}%", (volume.clamp(0.0, 1.0) * 100.0).round() as u32)
    }

    pub fn format_speed(speed: f64) -> String {
        format!("{:.2}x", speed)
    }

    pub fn format_pitch(semitones: f64) -> String {
        if semitones == 0.0 {
            "0 st".to_string()
        } else {
            format!("{:+} st", semitones)
        }
    }

    fn on_off(enabled: bool) -> &'static str {
        if enabled {
            "on"
        } else {
            "off"
        }
    }

    /// Truncate to `max_len` characters, ending in "..."
    pub fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len || max_len <= 3 {
            s.to_string()
        } else {
            let kept: String = s.chars().take(max_len - 3).collect();
            format!("{}...", kept)
        }
    }

    pub fn create_volume_bar(volume: f32, width: usize) -> String {
        let filled = ((volume.clamp(0.0, 1.0) * width as f32).round() as usize).min(width);
        format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
    }

    pub fn format_playback_state(state: PlaybackState) -> String {
        match state {
            PlaybackState::Idle => "⏹ Idle".to_string(),
            PlaybackState::Starting => "… Starting".to_string(),
            PlaybackState::Playing => "▶ Playing".to_string(),
            PlaybackState::Ending => "↘ Fading out".to_string(),
        }
    }
}
