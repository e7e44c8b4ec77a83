// Standup CLI - terminal front end for the break reminder
// Runs the session on the main thread; keys are read in raw mode between ticks

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use crossterm::{
    cursor::MoveToColumn,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute, queue,
    style::Print,
    terminal::{disable_raw_mode, enable_raw_mode, Clear, ClearType},
};
use log::{error, info, warn};
use standup::autostart::{Autostart, SystemAutostart};
use standup::display::format_clock;
use standup::notifications::DesktopNotifier;
use standup::overlay::OverlayCommand;
use standup::{
    apply_settings, config, Adjustment, PreferencesStore, Session, SessionEvent, SessionPhase,
    SettingsForm, Ticker,
};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Instant;

/// Desktop break reminder
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Reminds you to stand up and take a break",
    long_about = "Reminds you to stand up and take a break.

Counts down a work period, then asks you to rest until the break countdown
runs out. Afterwards the work countdown starts over.

SETUP:
  Run the interactive setup once to choose your durations:
    standup --setup

  Preferences are stored in standup.toml in the working directory
  (override with --config or STANDUP_CONFIG).

KEYS:
  p        Pause / resume the work countdown
  + / -    Add or remove 10 minutes
  s        Restart the work period
  x        Stop (pause and close any overlay)
  e, Esc   End the break early
  v        Preview the overlay
  q        Save and quit (also Ctrl+C)"
)]
struct Args {
    /// Path to the preferences file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Work period in minutes (saved to preferences)
    #[arg(short, long)]
    work: Option<u32>,

    /// Break period in minutes (saved to preferences)
    #[arg(short, long = "break")]
    break_minutes: Option<u32>,

    /// Hide the countdown until the last minute
    #[arg(long)]
    hide_timer: Option<Toggle>,

    /// Register or remove the start-at-login entry
    #[arg(long)]
    autostart: Option<Toggle>,

    /// Show the overlay for this many seconds at startup
    #[arg(long)]
    preview: Option<u64>,

    /// Run interactive setup to choose durations and autostart
    #[arg(long)]
    setup: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Toggle {
    On,
    Off,
}

/// One key press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    TogglePause,
    Adjust(Adjustment),
    Restart,
    Stop,
    Interrupt,
    Preview,
    Quit,
}

fn command_for_key(key: KeyEvent) -> Option<Command> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return (key.code == KeyCode::Char('c')).then_some(Command::Quit);
    }

    match key.code {
        KeyCode::Esc => Some(Command::Interrupt),
        KeyCode::Char(c) => match c.to_ascii_lowercase() {
            'p' => Some(Command::TogglePause),
            '+' | '=' => Some(Command::Adjust(Adjustment::Increase)),
            '-' => Some(Command::Adjust(Adjustment::Decrease)),
            's' => Some(Command::Restart),
            'x' => Some(Command::Stop),
            'e' => Some(Command::Interrupt),
            'v' => Some(Command::Preview),
            'q' => Some(Command::Quit),
            _ => None,
        },
        _ => None,
    }
}

/// Line prompts for setup, run before the terminal enters raw mode
struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    /// Helper function to prompt for a value with a default
    fn value(&mut self, prompt: &str, default: &str) -> Result<String> {
        write!(self.output, "{} (default: {}): ", prompt, default)?;
        self.output.flush()?;

        let mut input = String::new();
        self.input.read_line(&mut input)?;
        let input = input.trim();

        if input.is_empty() {
            Ok(default.to_string())
        } else {
            Ok(input.to_string())
        }
    }

    fn yes_no(&mut self, prompt: &str, default: bool) -> Result<bool> {
        let answer = self.value(prompt, if default { "y" } else { "n" })?;
        Ok(matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes"))
    }

    /// Ask for every editable field, keeping the current text as default
    fn fill_form(&mut self, mut form: SettingsForm) -> Result<SettingsForm> {
        form.work_duration = self.value("Work period in minutes", &form.work_duration)?;
        form.break_duration = self.value("Break period in minutes", &form.break_duration)?;
        form.overlay_color = self.value("Overlay color (#RRGGBB or #RRGGBBAA)", &form.overlay_color)?;
        form.overlay_opacity = self.value("Overlay opacity in percent", &form.overlay_opacity)?;
        form.timer_width = self.value("Timer width in pixels (100-500)", &form.timer_width)?;
        form.timer_height = self.value("Timer height in pixels (100-500)", &form.timer_height)?;
        form.font_size = self.value("Timer font size in pixels (12-72)", &form.font_size)?;
        form.hide_timer = self.yes_no("Hide the timer until the last minute? [y/n]", form.hide_timer)?;
        form.autostart = self.yes_no("Start at login? [y/n]", form.autostart)?;
        Ok(form)
    }
}

/// Run interactive setup to choose durations, display and autostart
fn run_setup(store: &PreferencesStore) -> Result<()> {
    println!("Standup Setup");
    println!("=============\n");

    let current = store.load();
    let mut prompter = Prompter {
        input: io::stdin().lock(),
        output: io::stdout(),
    };
    let form = prompter.fill_form(SettingsForm::from_preferences(&current))?;

    let mut prefs = form
        .parse(&current)
        .map_err(|e| anyhow::anyhow!("Error: {}", e))?;

    if prefs.autostart_enabled != current.autostart_enabled {
        let mut autostart = SystemAutostart::new()?;
        if let Err(e) = autostart.set_registered(prefs.autostart_enabled) {
            warn!("Failed to update autostart: {:#}", e);
            prefs.autostart_enabled = current.autostart_enabled;
        }
    }

    store.save(&prefs).context("Failed to save preferences")?;

    println!("\nPreferences saved to: {}", store.path().display());
    println!("Setup complete!");
    println!("\nYou can now run 'standup' to start the reminder.");

    Ok(())
}

/// Draws session state on one status line, with phase changes above it
#[derive(Default)]
struct TerminalView {
    widget_visible: bool,
}

impl TerminalView {
    fn status(&self, text: &str) -> io::Result<()> {
        let mut stdout = io::stdout();
        queue!(stdout, MoveToColumn(0), Clear(ClearType::CurrentLine), Print(text))?;
        stdout.flush()
    }

    fn line(&self, text: &str) -> io::Result<()> {
        let mut stdout = io::stdout();
        queue!(
            stdout,
            MoveToColumn(0),
            Clear(ClearType::CurrentLine),
            Print(text),
            Print("\r\n")
        )?;
        stdout.flush()
    }

    fn render_event(&mut self, event: &SessionEvent) -> io::Result<()> {
        match event {
            SessionEvent::RemainingChanged {
                phase: SessionPhase::Working,
                remaining_secs,
            } if self.widget_visible => {
                self.status(&format!("Work  {}", format_clock(*remaining_secs)))?;
            }
            SessionEvent::PhaseChanged { to, .. } => match to {
                SessionPhase::Working => self.line("Back to work.")?,
                SessionPhase::Paused => self.line("Paused. Press p to resume.")?,
                SessionPhase::Resting => self.line("Time to stand up!")?,
            },
            SessionEvent::DisplayVisibility(visible) => {
                self.widget_visible = *visible;
                if !visible {
                    self.status("")?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn render_overlay(&self, command: &OverlayCommand) -> io::Result<()> {
        match command {
            OverlayCommand::Present(appearance) => {
                self.line("==============================================")?;
                self.line(&format!("  {}", appearance.label))?;
                self.line("==============================================")?;
            }
            OverlayCommand::Label(label) => self.status(label)?,
            OverlayCommand::Destroy => self.status("")?,
        }
        Ok(())
    }
}

fn handle_command(session: &mut Session, command: Command) {
    match command {
        Command::TogglePause => session.toggle_pause(),
        Command::Adjust(adjustment) => session.adjust(adjustment),
        Command::Restart => session.start_session(None),
        Command::Stop => session.stop_session(),
        Command::Interrupt => {
            session.interrupt();
        }
        Command::Preview => {
            session.preview_overlay(0);
        }
        Command::Quit => {}
    }
}

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    // Initialize logger
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let store = PreferencesStore::new(config::resolve_preferences_path(args.config.clone()));

    // Handle setup command
    if args.setup {
        return run_setup(&store);
    }

    info!("Starting Standup v{}", env!("CARGO_PKG_VERSION"));

    let (overlay_tx, overlay_rx) = mpsc::channel();
    let (event_tx, event_rx) = mpsc::channel();
    let mut session = standup::load_session(&store, Box::new(overlay_tx));
    session.subscribe(Box::new(event_tx));
    session.subscribe(Box::new(DesktopNotifier));

    // Command-line overrides go through the regular save flow
    let mut updated = session.preferences().clone();
    if let Some(work) = args.work {
        updated.work_duration_minutes = work;
    }
    if let Some(minutes) = args.break_minutes {
        updated.break_duration_minutes = minutes;
    }
    if let Some(toggle) = args.hide_timer {
        updated.hide_timer_until_last_minute = toggle == Toggle::On;
    }
    if let Some(toggle) = args.autostart {
        updated.autostart_enabled = toggle == Toggle::On;
    }
    if &updated != session.preferences() {
        let restart = updated.work_duration_minutes != session.preferences().work_duration_minutes;
        let mut autostart = SystemAutostart::new()?;
        match apply_settings(&mut session, &store, &mut autostart, updated) {
            Ok(()) => info!("Command-line preferences saved"),
            Err(e) => error!("Failed to apply command-line preferences: {:#}", e),
        }
        if restart {
            session.start_session(None);
        }
    }

    if let Some(seconds) = args.preview {
        session.preview_overlay(seconds);
    }

    info!("Standup is running - press q to quit");
    let interactive = match enable_raw_mode() {
        Ok(()) => true,
        Err(e) => {
            warn!("No terminal for key input ({}); running until interrupted", e);
            false
        }
    };

    let result = run(&mut session, &event_rx, &overlay_rx, interactive);

    if interactive {
        disable_raw_mode()?;
        execute!(io::stdout(), Print("\r\n"))?;
    }
    result?;

    session
        .shutdown(&store, None)
        .context("Failed to save preferences on quit")?;
    info!("Standup stopped");
    Ok(())
}

/// Tick the session and handle keys until quit
fn run(
    session: &mut Session,
    events: &Receiver<SessionEvent>,
    overlay: &Receiver<OverlayCommand>,
    interactive: bool,
) -> Result<()> {
    let mut view = TerminalView::default();
    let mut ticker = Ticker::new(Instant::now());

    loop {
        let wait = ticker.wait_time(Instant::now());
        if interactive {
            if event::poll(wait)? {
                if let Event::Key(key) = event::read()? {
                    match command_for_key(key) {
                        Some(Command::Quit) => return Ok(()),
                        Some(command) => handle_command(session, command),
                        None => {}
                    }
                }
            }
        } else {
            thread::sleep(wait);
        }

        for _ in 0..ticker.take_due(Instant::now()) {
            session.tick();
        }

        for event in events.try_iter() {
            view.render_event(&event)?;
        }
        for command in overlay.try_iter() {
            view.render_overlay(&command)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_command_for_key() {
        assert_eq!(command_for_key(key(KeyCode::Char('p'))), Some(Command::TogglePause));
        assert_eq!(command_for_key(key(KeyCode::Char('P'))), Some(Command::TogglePause));
        assert_eq!(
            command_for_key(key(KeyCode::Char('+'))),
            Some(Command::Adjust(Adjustment::Increase))
        );
        assert_eq!(
            command_for_key(key(KeyCode::Char('-'))),
            Some(Command::Adjust(Adjustment::Decrease))
        );
        assert_eq!(command_for_key(key(KeyCode::Esc)), Some(Command::Interrupt));
        assert_eq!(command_for_key(key(KeyCode::Char('e'))), Some(Command::Interrupt));
        assert_eq!(command_for_key(key(KeyCode::Char('q'))), Some(Command::Quit));
        assert_eq!(command_for_key(key(KeyCode::Char('h'))), None);
        assert_eq!(command_for_key(key(KeyCode::Enter)), None);
    }

    #[test]
    fn test_ctrl_c_quits_in_raw_mode() {
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(command_for_key(ctrl_c), Some(Command::Quit));

        let ctrl_p = KeyEvent::new(KeyCode::Char('p'), KeyModifiers::CONTROL);
        assert_eq!(command_for_key(ctrl_p), None, "Only Ctrl+C is bound");
    }

    #[test]
    fn test_key_release_is_ignored() {
        let release = KeyEvent::new_with_kind(
            KeyCode::Char('p'),
            KeyModifiers::NONE,
            KeyEventKind::Release,
        );
        assert_eq!(command_for_key(release), None);
    }

    #[test]
    fn test_args_parse() {
        let args = Args::parse_from([
            "standup",
            "--work",
            "45",
            "--break",
            "5",
            "--autostart",
            "off",
        ]);
        assert_eq!(args.work, Some(45));
        assert_eq!(args.break_minutes, Some(5));
        assert_eq!(args.autostart, Some(Toggle::Off));
        assert_eq!(args.hide_timer, None);
    }

    #[test]
    fn test_setup_prompts_for_display_fields() {
        let current = standup::Preferences::default();
        // Enter keeps a default; width, height and font are answered
        let answers = "\n\n\n\n320\n180\n40\ny\n\n";
        let mut prompter = Prompter {
            input: answers.as_bytes(),
            output: Vec::new(),
        };

        let form = prompter
            .fill_form(SettingsForm::from_preferences(&current))
            .unwrap();
        let prefs = form.parse(&current).unwrap();

        assert_eq!(prefs.window_width, 320);
        assert_eq!(prefs.window_height, 180);
        assert_eq!(prefs.font_size_px, 40);
        assert!(prefs.hide_timer_until_last_minute);
        assert_eq!(prefs.work_duration_minutes, current.work_duration_minutes);

        let shown = String::from_utf8(prompter.output).unwrap();
        assert!(shown.contains("Timer font size"), "{}", shown);
    }

    #[test]
    fn test_setup_rejects_out_of_range_font() {
        let current = standup::Preferences::default();
        let answers = "\n\n\n\n\n\n200\n\n\n";
        let mut prompter = Prompter {
            input: answers.as_bytes(),
            output: io::sink(),
        };

        let form = prompter
            .fill_form(SettingsForm::from_preferences(&current))
            .unwrap();
        assert!(form.parse(&current).is_err(), "Font size 200 is out of range");
    }

    #[test]
    fn test_hide_timer_can_be_switched_off() {
        let args = Args::parse_from(["standup", "--hide-timer", "off"]);
        assert_eq!(args.hide_timer, Some(Toggle::Off));

        let args = Args::parse_from(["standup", "--hide-timer", "on"]);
        assert_eq!(args.hide_timer, Some(Toggle::On));
    }
}
