use log::{info, warn};
use soundboard::audio::{DesktopBackend, DeviceManager};
use soundboard::catalog::{MediaCatalog, NewSound, SoundEdit, SoundLibrary, SoundQuery};
use soundboard::cli::{CliApp, Commands, ParseError, StatusDisplay};
use soundboard::config::ConfigManager;
use soundboard::error::{PlaybackError, SoundboardError};
use soundboard::logging::{PlaybackEventType, PlaybackLogger};
use soundboard::models::{PlayerStatus, Sound, SoundId};
use soundboard::playback::{playback_rate, PlaybackEngine};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const STOP_TIMEOUT: Duration = Duration::from_secs(3);

/// Main application controller that coordinates all components
pub struct AppController {
    config_manager: ConfigManager,
    library: Arc<SoundLibrary>,
    engine: Option<PlaybackEngine>,
    logger: PlaybackLogger,
    shutdown_flag: Arc<AtomicBool>,
    interactive: bool,
}

impl AppController {
    pub fn new(config_path: Option<PathBuf>, interactive: bool) -> Result<Self, SoundboardError> {
        let config_manager = match config_path {
            Some(path) => ConfigManager::with_path(path),
            None => ConfigManager::new()?,
        };

        info!("Using config {}", config_manager.config_path().display());
        let catalog_path = config_manager.get_config().catalog_path.clone();
        let library = Arc::new(SoundLibrary::open(catalog_path)?);

        info!(
            "Loaded {} sounds from {}",
            library.len(),
            library.path().display()
        );

        Ok(Self {
            config_manager,
            library,
            engine: None,
            logger: PlaybackLogger::new(),
            shutdown_flag: Arc::new(AtomicBool::new(false)),
            interactive,
        })
    }

    /// Route Ctrl-C into a flag checked by the wait loops
    pub fn install_interrupt_handler(&self) {
        let shutdown_flag = Arc::clone(&self.shutdown_flag);
        if let Err(e) = ctrlc::set_handler(move || {
            println!("\nReceived interrupt signal. Shutting down gracefully...");
            shutdown_flag.store(true, Ordering::Relaxed);
        }) {
            warn!("Could not install Ctrl-C handler: {}", e);
        }
    }

    fn interrupted(&self) -> bool {
        self.shutdown_flag.load(Ordering::Relaxed)
    }

    /// The board order auto-advance walks through
    fn candidates(&self) -> Result<Vec<Sound>, SoundboardError> {
        Ok(SoundQuery::new().apply(self.library.list_sounds()?))
    }

    /// Start the engine on first use so catalog commands never touch the audio device
    fn engine(&mut self) -> Result<PlaybackEngine, SoundboardError> {
        if let Some(engine) = &self.engine {
            return Ok(engine.clone());
        }

        let config = self.config_manager.get_config();
        let backend = DesktopBackend::new(config.preferred_device.as_deref())?;
        let catalog: Arc<dyn MediaCatalog> = self.library.clone();
        let engine = PlaybackEngine::spawn_with(
            Box::new(backend),
            catalog,
            config.engine_settings(),
            config.timing(),
            self.logger.clone(),
        );

        if self.interactive {
            engine.register_end_of_track(|sound| {
                println!("\nFinished: {}", sound.display_name());
            });
        }
        engine.set_candidates(self.candidates()?);

        self.engine = Some(engine.clone());
        Ok(engine)
    }

    fn refresh_candidates(&self) -> Result<(), SoundboardError> {
        if let Some(engine) = &self.engine {
            engine.set_candidates(self.candidates()?);
        }
        Ok(())
    }

    async fn current_status(&self) -> PlayerStatus {
        match &self.engine {
            Some(engine) => engine.status().await,
            None => {
                let settings = self.config_manager.get_config().engine_settings();
                PlayerStatus {
                    playback_rate: playback_rate(settings.speed, settings.pitch_semitones),
                    settings,
                    candidates: self.library.len(),
                    ..PlayerStatus::new()
                }
            }
        }
    }

    /// Execute a single command
    pub async fn execute_command(&mut self, command: Commands) -> Result<(), SoundboardError> {
        match command {
            Commands::List { search, sort } => {
                let query = SoundQuery::new().search(search.unwrap_or_default()).order(sort);
                let sounds = query.apply(self.library.list_sounds()?);
                let playing = self.current_status().await.current_sound;
                StatusDisplay::display_sounds(&sounds, playing.as_ref());
            }
            Commands::Add {
                title,
                audio,
                image,
                looping,
            } => {
                let sound = self.library.add_sound(NewSound {
                    title,
                    audio_url: CliApp::expand_path(&audio).display().to_string(),
                    image_url: image,
                    is_looping: looping,
                    owner: None,
                })?;
                println!("Added '{}' as #{}", sound.display_name(), sound.id);
                self.refresh_candidates()?;
            }
            Commands::Edit {
                id,
                title,
                audio,
                image,
            } => {
                let edit = SoundEdit {
                    title,
                    audio_url: audio.map(|audio| CliApp::expand_path(&audio).display().to_string()),
                    image_url: image,
                };
                if edit.is_empty() {
                    println!("Nothing to change. Use --title, --audio or --image.");
                    return Ok(());
                }
                let sound = self.library.update_sound(SoundId(id), edit)?;
                println!("Updated #{}: {}", sound.id, sound.display_name());
                self.refresh_candidates()?;
            }
            Commands::Remove { id } => {
                let sound = self.library.remove_sound(SoundId(id))?;
                println!("Removed '{}'", sound.display_name());
                self.refresh_candidates()?;
            }
            Commands::Loop { id, state } => {
                let sound = self.library.set_looping(SoundId(id), state.is_on())?;
                println!("Looping for '{}' is {}", sound.display_name(), state);
                self.refresh_candidates()?;
            }
            Commands::Devices => {
                let devices = DeviceManager::new()?;
                let preferred = self.config_manager.get_config().preferred_device.clone();
                let names = devices.list_devices();
                if names.is_empty() {
                    println!("No output devices found");
                }
                for name in names {
                    let marker = if preferred.as_deref() == Some(name.as_str()) { "*" } else { " " };
                    println!("{} {}", marker, name);
                }
            }
            Commands::Device { name } => {
                if let Some(name) = &name {
                    if !DeviceManager::new()?.list_devices().contains(name) {
                        return Err(PlaybackError::DeviceUnavailable(format!("No output device named '{}'", name)).into());
                    }
                }
                self.config_manager.set_preferred_device(name.clone())?;

                // The next play reopens the backend on the new device
                if let Some(engine) = self.engine.take() {
                    self.stop_and_wait(&engine).await;
                    engine.shutdown().await;
                }
                println!("Output device: {}", name.as_deref().unwrap_or("system default"));
            }
            Commands::Play { id } => {
                let sound = self.library.get(SoundId(id))?;
                let engine = self.engine()?;
                if self.interactive {
                    engine.play(sound);
                } else {
                    self.play_and_wait(&engine, sound).await;
                }
            }
            Commands::Stop => match &self.engine {
                Some(engine) => engine.stop(),
                None => println!("Nothing is playing"),
            },
            Commands::Volume { level } => {
                let volume = f32::from(level.min(100)) / 100.0;
                if let Some(engine) = &self.engine {
                    engine.set_volume(volume);
                }
                self.config_manager.set_volume(volume)?;
                println!("Volume: {}%", level.min(100));
            }
            Commands::Speed { value } => {
                if let Some(engine) = &self.engine {
                    engine.set_speed(value);
                }
                self.config_manager.set_speed(value)?;
                println!("Speed: {}", StatusDisplay::format_speed(value));
            }
            Commands::Pitch { semitones } => {
                if let Some(engine) = &self.engine {
                    engine.set_pitch(semitones);
                }
                self.config_manager.set_pitch(semitones)?;
                println!("Pitch: {}", StatusDisplay::format_pitch(semitones));
            }
            Commands::Auto { state } => {
                if let Some(engine) = &self.engine {
                    engine.set_auto_advance(state.is_on());
                }
                self.config_manager.set_auto_advance(state.is_on())?;
                println!("Auto-advance: {}", state);
            }
            Commands::Shuffle { state } => {
                if let Some(engine) = &self.engine {
                    engine.set_shuffle(state.is_on());
                }
                self.config_manager.set_shuffle(state.is_on())?;
                println!("Shuffle: {}", state);
            }
            Commands::Status => {
                let status = self.current_status().await;
                StatusDisplay::display_full_status(&status);
            }
            Commands::History { count } => {
                StatusDisplay::display_history(&self.logger.recent_events(count), &self.logger.event_statistics());
            }
        }

        Ok(())
    }

    /// One-shot play: block until the sound ends, fails or Ctrl-C stops it
    async fn play_and_wait(&self, engine: &PlaybackEngine, sound: Sound) {
        let (done_tx, mut done_rx) = mpsc::unbounded_channel();
        engine.register_end_of_track(move |finished| {
            let _ = done_tx.send(finished.id);
        });

        let id = sound.id;
        if sound.is_looping {
            println!("Looping '{}'. Press Ctrl-C to stop.", sound.display_name());
        } else {
            println!("Playing '{}'", sound.display_name());
        }
        engine.play(sound);

        let mut interval = tokio::time::interval(POLL_INTERVAL);
        loop {
            tokio::select! {
                biased;

                finished = done_rx.recv() => {
                    if finished == Some(id) || finished.is_none() {
                        break;
                    }
                }

                _ = interval.tick() => {
                    if self.interrupted() {
                        self.stop_and_wait(engine).await;
                        break;
                    }
                    if engine.status().await.is_idle() {
                        if let Some(failure) = self.logger.events_of_type(PlaybackEventType::StartFailed).last() {
                            eprintln!("{}", failure.details);
                        }
                        break;
                    }
                }
            }
        }
    }

    /// Let the fade-out finish before the process exits
    async fn stop_and_wait(&self, engine: &PlaybackEngine) {
        engine.stop();
        let waited = tokio::time::timeout(STOP_TIMEOUT, async {
            while !engine.status().await.is_idle() {
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        })
        .await;

        if waited.is_err() {
            warn!("Timed out waiting for the fade-out to finish");
        }
    }

    /// Run interactive mode
    pub async fn run_interactive_mode(&mut self) -> Result<(), SoundboardError> {
        println!("Soundboard v0.1.0 ({} sounds)", self.library.len());
        println!("Type 'help' for available commands, 'exit' or 'quit' to quit.");
        println!();

        let mut interval = tokio::time::interval(POLL_INTERVAL);
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        std::thread::spawn(move || {
            let stdin = std::io::stdin();
            let mut line = String::new();
            loop {
                line.clear();
                match stdin.read_line(&mut line) {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {
                        if tx.send(line.trim().to_string()).is_err() {
                            break;
                        }
                    }
                }
            }
        });
        let mut awaiting_input = false;

        loop {
            if !awaiting_input {
                print!("> ");
                let _ = std::io::Write::flush(&mut std::io::stdout());
                awaiting_input = true;
            }

            tokio::select! {
                biased;

                line = rx.recv() => {
                    awaiting_input = false;
                    let Some(line) = line else {
                        println!();
                        break;
                    };
                    if line.is_empty() {
                        continue;
                    }
                    if line == "exit" || line == "quit" {
                        println!("Goodbye!");
                        break;
                    }
                    match CliApp::parse_command(&line) {
                        Ok(command) => {
                            if let Err(e) = self.execute_command(command).await {
                                self.handle_error(&e);
                            }
                        }
                        Err(ParseError::HelpRequested) => CliApp::display_help(),
                        Err(e) => {
                            eprintln!("Error: {}", e);
                            println!("Type 'help' for available commands.");
                        }
                    }
                }

                _ = interval.tick() => {
                    if self.interrupted() {
                        break;
                    }
                }
            }
        }

        self.shutdown().await
    }

    /// Fade out whatever is playing, persist the live settings and stop the engine
    pub async fn shutdown(&mut self) -> Result<(), SoundboardError> {
        if let Some(engine) = self.engine.take() {
            if !engine.status().await.is_idle() {
                self.stop_and_wait(&engine).await;
            }

            let settings = engine.settings().await;
            if let Err(e) = self
                .config_manager
                .update_config(|config| config.apply_settings(&settings))
            {
                warn!("Error saving configuration: {}", e);
            }

            engine.shutdown().await;
        }

        info!("Soundboard shut down");
        Ok(())
    }

    fn handle_error(&self, error: &SoundboardError) {
        log::log!(error.severity().log_level(), "{}", error);

        if self.interactive {
            StatusDisplay::display_error(error);
        } else {
            StatusDisplay::display_simple_error(error);
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), SoundboardError> {
    let cli = CliApp::parse();

    if std::env::var("SOUNDBOARD_LOG_LEVEL").is_err() {
        std::env::set_var("SOUNDBOARD_LOG_LEVEL", "warn");
    }
    if let Err(e) = PlaybackLogger::init() {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }

    let config_path = cli.config.as_deref().and_then(|path| path.to_str()).map(CliApp::expand_path);
    let mut app = match AppController::new(config_path, cli.command.is_none()) {
        Ok(app) => app,
        Err(e) => {
            StatusDisplay::display_simple_error(&e);
            std::process::exit(1);
        }
    };
    app.install_interrupt_handler();

    match cli.command {
        Some(command) => {
            if let Err(e) = app.execute_command(command).await {
                app.handle_error(&e);
                let _ = app.shutdown().await;
                std::process::exit(e.exit_code());
            }
            app.shutdown().await?;
        }
        None => app.run_interactive_mode().await?,
    }

    Ok(())
}
