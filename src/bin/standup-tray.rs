// Standup Tray App - tray icon, countdown widget and rest overlay
// Everything runs on the tao event loop; overlay calls arrive over a channel

use anyhow::{anyhow, Context, Result};
use global_hotkey::GlobalHotKeyEvent;
use log::{debug, error, info, warn};
use softbuffer::Surface;
use standup::constants::{MENU_POLL_INTERVAL_MS, OVERLAY_LABEL_FONT_PX, TRAY_ICON_SIZE};
use standup::display::{format_clock, resolve_position, DisplayGeometry};
use standup::hotkeys::InterruptHotkey;
use standup::notifications::{show_error, DesktopNotifier};
use standup::overlay::{OverlayAppearance, OverlayCommand};
use standup::preferences::WindowPosition;
use standup::render::{copy_to_buffer, render_overlay, render_widget};
use standup::{
    apply_settings, config, Adjustment, PreferencesStore, Session, SessionEvent, SessionPhase,
    SystemAutostart, Ticker,
};
use std::num::NonZeroU32;
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};
use tiny_skia::Pixmap;
use tao::dpi::{LogicalPosition, LogicalSize};
use tao::event::{ElementState, Event, WindowEvent};
use tao::event_loop::{ControlFlow, EventLoopBuilder, EventLoopWindowTarget};
use tao::keyboard::KeyCode;
use tao::window::{Fullscreen, Window, WindowBuilder, WindowId};
use tray_icon::menu::{CheckMenuItem, Menu, MenuEvent, MenuId, MenuItem, PredefinedMenuItem};
use tray_icon::{TrayIcon, TrayIconBuilder};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Tray icon colors per phase
const WORKING_COLOR: [u8; 4] = [76, 175, 80, 255];
const PAUSED_COLOR: [u8; 4] = [255, 193, 7, 255];
const RESTING_COLOR: [u8; 4] = [33, 150, 243, 255];

struct MenuIds {
    pause: MenuId,
    plus: MenuId,
    minus: MenuId,
    restart: MenuId,
    preview: MenuId,
    autostart: MenuId,
    reload: MenuId,
    quit: MenuId,
}

/// A window with a software pixel surface
struct Canvas {
    window: Rc<Window>,
    surface: Surface<Rc<Window>, Rc<Window>>,
}

impl Canvas {
    fn new(window: Window) -> Result<Self> {
        let window = Rc::new(window);
        let context = softbuffer::Context::new(window.clone())
            .map_err(|e| anyhow!("Failed to create drawing context: {}", e))?;
        let surface = Surface::new(&context, window.clone())
            .map_err(|e| anyhow!("Failed to create drawing surface: {}", e))?;
        Ok(Self { window, surface })
    }

    /// Font size in physical pixels for this window's display
    fn scaled(&self, font_px: u32) -> u32 {
        (f64::from(font_px) * self.window.scale_factor()).round() as u32
    }

    fn draw(&mut self, frame: impl FnOnce(u32, u32) -> Option<Pixmap>) -> Result<()> {
        let size = self.window.inner_size();
        let (Some(width), Some(height)) = (NonZeroU32::new(size.width), NonZeroU32::new(size.height))
        else {
            return Ok(());
        };
        let Some(pixmap) = frame(size.width, size.height) else {
            return Ok(());
        };

        self.surface
            .resize(width, height)
            .map_err(|e| anyhow!("Failed to resize surface: {}", e))?;
        let mut buffer = self
            .surface
            .buffer_mut()
            .map_err(|e| anyhow!("Failed to map surface: {}", e))?;
        copy_to_buffer(&pixmap, &mut buffer);
        buffer
            .present()
            .map_err(|e| anyhow!("Failed to present frame: {}", e))
    }
}

struct OverlayWindow {
    canvas: Canvas,
    /// The rest label is drawn on the primary display only
    primary: bool,
}

struct TrayApp {
    session: Option<Session>,
    store: PreferencesStore,
    autostart: SystemAutostart,
    ticker: Ticker,
    events: Receiver<SessionEvent>,
    overlay_commands: Receiver<OverlayCommand>,
    widget: Canvas,
    clock: String,
    paused: bool,
    font_size_px: u32,
    overlay_windows: Vec<OverlayWindow>,
    appearance: Option<OverlayAppearance>,
    hotkey: Option<InterruptHotkey>,
    tray: TrayIcon,
    pause_item: MenuItem,
    autostart_item: CheckMenuItem,
    ids: MenuIds,
}

impl TrayApp {
    /// Run due ticks and apply everything the session reported
    fn pump(&mut self, target: &EventLoopWindowTarget<()>) {
        if let Some(session) = self.session.as_mut() {
            for _ in 0..self.ticker.take_due(Instant::now()) {
                session.tick();
            }
        }

        while let Ok(command) = self.overlay_commands.try_recv() {
            self.apply_overlay_command(target, command);
        }
        while let Ok(event) = self.events.try_recv() {
            self.apply_session_event(event);
        }
    }

    fn apply_overlay_command(&mut self, target: &EventLoopWindowTarget<()>, command: OverlayCommand) {
        match command {
            OverlayCommand::Present(appearance) => {
                if self.overlay_windows.is_empty() {
                    self.overlay_windows = create_overlay_windows(target, &appearance);
                }
                debug!("Overlay tint {}", appearance.tint.to_hex());
                self.set_status(&appearance.label);
                self.appearance = Some(appearance);
            }
            OverlayCommand::Label(label) => {
                self.set_status(&label);
                if let Some(appearance) = self.appearance.as_mut() {
                    appearance.label = label;
                }
            }
            OverlayCommand::Destroy => {
                self.overlay_windows.clear();
                self.appearance = None;
                return;
            }
        }
        self.draw_overlays();
    }

    fn draw_overlays(&mut self) {
        let Some(appearance) = self.appearance.as_ref() else {
            return;
        };
        for overlay in &mut self.overlay_windows {
            let label = overlay.primary.then_some(appearance.label.as_str());
            let font_px = overlay.canvas.scaled(OVERLAY_LABEL_FONT_PX);
            let drawn = overlay.canvas.draw(|width, height| {
                render_overlay(width, height, appearance.tint, label, font_px)
            });
            if let Err(e) = drawn {
                error!("{:#}", e);
            }
        }
    }

    fn draw_widget(&mut self) {
        let font_px = self.widget.scaled(self.font_size_px);
        let (clock, paused) = (&self.clock, self.paused);
        let drawn = self
            .widget
            .draw(|width, height| render_widget(width, height, clock, font_px, paused));
        if let Err(e) = drawn {
            error!("{:#}", e);
        }
    }

    fn redraw(&mut self, window_id: WindowId) {
        if window_id == self.widget.window.id() {
            self.draw_widget();
        } else {
            self.draw_overlays();
        }
    }

    fn apply_session_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::RemainingChanged {
                phase,
                remaining_secs,
            } if phase != SessionPhase::Resting => {
                self.clock = format_clock(remaining_secs);
                self.widget.window.set_title(&self.clock);
                self.set_status(&format!("Work {}", self.clock));
                self.draw_widget();
            }
            SessionEvent::PhaseChanged { to, .. } => {
                self.paused = to == SessionPhase::Paused;
                self.draw_widget();
                let (label, color) = match to {
                    SessionPhase::Working => ("Pause", WORKING_COLOR),
                    SessionPhase::Paused => ("Resume", PAUSED_COLOR),
                    SessionPhase::Resting => ("Pause", RESTING_COLOR),
                };
                self.pause_item.set_text(label);
                self.pause_item.set_enabled(to != SessionPhase::Resting);
                match create_icon(color) {
                    Ok(icon) => {
                        if let Err(e) = self.tray.set_icon(Some(icon)) {
                            error!("Failed to update tray icon: {}", e);
                        }
                    }
                    Err(e) => error!("{:#}", e),
                }
            }
            SessionEvent::DisplayVisibility(visible) => self.widget.window.set_visible(visible),
            SessionEvent::DisplayReconfigured(geometry) => self.apply_geometry(geometry),
            SessionEvent::OverlayOpened { .. } => {
                if let Some(hotkey) = self.hotkey.as_mut() {
                    hotkey.arm();
                }
            }
            SessionEvent::OverlayClosed { .. } => {
                if let Some(hotkey) = self.hotkey.as_mut() {
                    hotkey.disarm();
                }
            }
            _ => {}
        }
    }

    fn apply_geometry(&mut self, geometry: DisplayGeometry) {
        let window = &self.widget.window;
        window.set_inner_size(LogicalSize::new(geometry.size.width, geometry.size.height));
        if !geometry.position.is_unset() {
            window.set_outer_position(LogicalPosition::new(geometry.position.x, geometry.position.y));
        }
        self.font_size_px = geometry.font_size_px;
        window.request_redraw();
    }

    fn set_status(&self, text: &str) {
        let _ = self.tray.set_tooltip(Some(format!("Standup - {}", text)));
        self.tray.set_title(Some(text));
    }

    fn widget_position(&self) -> Option<WindowPosition> {
        let window = &self.widget.window;
        let position = window.outer_position().ok()?;
        let logical: LogicalPosition<i32> = position.to_logical(window.scale_factor());
        Some(WindowPosition::new(logical.x, logical.y))
    }

    fn handle_menu(&mut self, id: &MenuId) -> bool {
        let ids = &self.ids;
        let Some(session) = self.session.as_mut() else {
            return false;
        };

        if *id == ids.pause {
            session.toggle_pause();
        } else if *id == ids.plus {
            session.adjust(Adjustment::Increase);
        } else if *id == ids.minus {
            session.adjust(Adjustment::Decrease);
        } else if *id == ids.restart {
            session.start_session(None);
        } else if *id == ids.preview {
            session.preview_overlay(0);
        } else if *id == ids.autostart {
            let mut prefs = session.preferences().clone();
            prefs.autostart_enabled = self.autostart_item.is_checked();
            if let Err(e) = apply_settings(session, &self.store, &mut self.autostart, prefs) {
                error!("Failed to save preferences: {:#}", e);
                show_error(&format!("Failed to save preferences: {}", e));
            }
            self.autostart_item
                .set_checked(session.preferences().autostart_enabled);
        } else if *id == ids.reload {
            let prefs = self.store.load();
            info!("Reloading preferences from {}", self.store.path().display());
            if let Err(e) = apply_settings(session, &self.store, &mut self.autostart, prefs) {
                error!("Failed to apply preferences: {:#}", e);
                show_error(&format!("Failed to apply preferences: {}", e));
            }
            self.autostart_item
                .set_checked(session.preferences().autostart_enabled);
        } else if *id == ids.quit {
            info!("Quit menu item clicked, exiting");
            return true;
        }
        false
    }

    fn handle_window_event(&mut self, window_id: WindowId, event: WindowEvent<'_>) -> bool {
        let is_widget = window_id == self.widget.window.id();
        let Some(session) = self.session.as_mut() else {
            return false;
        };

        match event {
            WindowEvent::CloseRequested if is_widget => return true,
            WindowEvent::Moved(position) if is_widget => {
                let logical: LogicalPosition<i32> =
                    position.to_logical(self.widget.window.scale_factor());
                session.window_moved(WindowPosition::new(logical.x, logical.y));
            }
            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                self.redraw(window_id);
            }
            WindowEvent::MouseInput { .. } if !is_widget => session.overlay_clicked(),
            WindowEvent::KeyboardInput { event, .. }
                if !is_widget
                    && event.physical_key == KeyCode::Escape
                    && event.state == ElementState::Pressed =>
            {
                session.interrupt();
            }
            _ => {}
        }
        false
    }

    fn shutdown(&mut self) {
        let position = self.widget_position();
        if let Some(hotkey) = self.hotkey.as_mut() {
            hotkey.disarm();
        }
        if let Some(session) = self.session.take() {
            if let Err(e) = session.shutdown(&self.store, position) {
                error!("{:#}", e);
            }
        }
        self.overlay_windows.clear();
    }
}

/// One borderless full-screen window per monitor
fn create_overlay_windows(
    target: &EventLoopWindowTarget<()>,
    appearance: &OverlayAppearance,
) -> Vec<OverlayWindow> {
    let primary_position = target.primary_monitor().map(|monitor| monitor.position());
    let mut windows: Vec<OverlayWindow> = Vec::new();
    for monitor in target.available_monitors() {
        let primary = match primary_position {
            Some(position) => monitor.position() == position,
            None => windows.is_empty(),
        };
        let built = WindowBuilder::new()
            .with_title(&appearance.label)
            .with_decorations(false)
            .with_always_on_top(true)
            .with_resizable(false)
            .with_fullscreen(Some(Fullscreen::Borderless(Some(monitor))))
            .build(target)
            .context("Failed to create overlay window")
            .and_then(Canvas::new);
        match built {
            Ok(canvas) => windows.push(OverlayWindow { canvas, primary }),
            Err(e) => error!("{:#}", e),
        }
    }
    info!("Overlay shown on {} display(s)", windows.len());
    windows
}

/// Solid square icon in the given color
fn create_icon(color: [u8; 4]) -> Result<tray_icon::Icon> {
    let pixels = (TRAY_ICON_SIZE * TRAY_ICON_SIZE) as usize;
    let rgba = color.repeat(pixels);
    tray_icon::Icon::from_rgba(rgba, TRAY_ICON_SIZE, TRAY_ICON_SIZE)
        .context("Failed to create tray icon image")
}

fn main() -> Result<()> {
    // Initialize logger
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    info!("Starting Standup Tray App v{}", VERSION);

    let store = PreferencesStore::new(config::resolve_preferences_path(None));
    let autostart = SystemAutostart::new()?;

    let (overlay_tx, overlay_rx) = mpsc::channel();
    let (event_tx, event_rx) = mpsc::channel();
    let mut session = standup::load_session(&store, Box::new(overlay_tx));
    session.subscribe(Box::new(DesktopNotifier));
    session.subscribe(Box::new(event_tx));
    let prefs = session.preferences().clone();

    // Create event loop for tray app
    let event_loop = EventLoopBuilder::new().build();

    // Countdown widget in the corner of the primary display
    let geometry = DisplayGeometry::from_preferences(&prefs);
    let position = match event_loop.primary_monitor() {
        Some(monitor) => {
            let screen: LogicalSize<u32> = monitor.size().to_logical(monitor.scale_factor());
            resolve_position(geometry.position, screen.width, screen.height, geometry.size)
        }
        None => geometry.position,
    };
    let work_secs = session.work_remaining_secs();
    let widget = WindowBuilder::new()
        .with_title(format_clock(work_secs))
        .with_always_on_top(true)
        .with_resizable(false)
        .with_inner_size(LogicalSize::new(geometry.size.width, geometry.size.height))
        .with_position(LogicalPosition::new(position.x, position.y))
        .with_visible(session.is_widget_visible())
        .build(&event_loop)
        .context("Failed to create countdown window")?;
    let widget = Canvas::new(widget)?;

    // Build tray menu
    let pause_item = MenuItem::new("Pause", true, None);
    let plus_item = MenuItem::new("+10 min", true, None);
    let minus_item = MenuItem::new("-10 min", true, None);
    let restart_item = MenuItem::new("Restart work period", true, None);
    let preview_item = MenuItem::new("Preview overlay", true, None);
    let autostart_item = CheckMenuItem::new("Start at login", true, prefs.autostart_enabled, None);
    let reload_item = MenuItem::new("Reload preferences", true, None);
    let version_item = MenuItem::new(format!("Version {}", VERSION), false, None);
    let quit_item = MenuItem::new("Quit", true, None);

    let menu = Menu::new();
    menu.append(&pause_item).context("Failed to add pause menu item")?;
    menu.append(&plus_item).context("Failed to add +10 menu item")?;
    menu.append(&minus_item).context("Failed to add -10 menu item")?;
    menu.append(&restart_item).context("Failed to add restart menu item")?;
    menu.append(&PredefinedMenuItem::separator()).context("Failed to add separator")?;
    menu.append(&preview_item).context("Failed to add preview menu item")?;
    menu.append(&autostart_item).context("Failed to add autostart menu item")?;
    menu.append(&reload_item).context("Failed to add reload menu item")?;
    menu.append(&PredefinedMenuItem::separator()).context("Failed to add separator")?;
    menu.append(&version_item).context("Failed to add version menu item")?;
    menu.append(&quit_item).context("Failed to add quit menu item")?;

    // Create tray icon
    let tray = TrayIconBuilder::new()
        .with_menu(Box::new(menu))
        .with_tooltip("Standup - Break Reminder")
        .with_icon(create_icon(WORKING_COLOR)?)
        .build()
        .context("Failed to create tray icon")?;

    let hotkey = match InterruptHotkey::new() {
        Ok(hotkey) => Some(hotkey),
        Err(e) => {
            warn!("Global hotkeys unavailable: {:#}", e);
            None
        }
    };

    let ids = MenuIds {
        pause: pause_item.id().clone(),
        plus: plus_item.id().clone(),
        minus: minus_item.id().clone(),
        restart: restart_item.id().clone(),
        preview: preview_item.id().clone(),
        autostart: autostart_item.id().clone(),
        reload: reload_item.id().clone(),
        quit: quit_item.id().clone(),
    };

    let mut app = TrayApp {
        session: Some(session),
        store,
        autostart,
        ticker: Ticker::new(Instant::now()),
        events: event_rx,
        overlay_commands: overlay_rx,
        widget,
        clock: format_clock(work_secs),
        paused: false,
        font_size_px: geometry.font_size_px,
        overlay_windows: Vec::new(),
        appearance: None,
        hotkey,
        tray,
        pause_item,
        autostart_item,
        ids,
    };

    info!("Tray icon created, running event loop");
    let poll = Duration::from_millis(MENU_POLL_INTERVAL_MS);

    // Run event loop
    event_loop.run(move |event, target, control_flow| {
        let mut quit = false;

        match event {
            Event::WindowEvent {
                window_id, event, ..
            } => quit |= app.handle_window_event(window_id, event),
            Event::RedrawRequested(window_id) => app.redraw(window_id),
            _ => {}
        }

        // Handle menu events
        while let Ok(event) = MenuEvent::receiver().try_recv() {
            quit |= app.handle_menu(&event.id);
        }

        // Escape pressed anywhere while resting
        while let Ok(event) = GlobalHotKeyEvent::receiver().try_recv() {
            let interrupt = app
                .hotkey
                .as_ref()
                .is_some_and(|hotkey| hotkey.is_interrupt(event.id));
            if interrupt {
                if let Some(session) = app.session.as_mut() {
                    session.interrupt();
                }
            }
        }

        if quit {
            app.shutdown();
            *control_flow = ControlFlow::Exit;
            return;
        }

        app.pump(target);

        let now = Instant::now();
        *control_flow = ControlFlow::WaitUntil(app.ticker.deadline().min(now + poll));
    });
}
