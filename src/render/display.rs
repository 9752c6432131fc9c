//! Window abstraction and viewer interaction state

use crate::error::Result;
use std::fmt;
use tracing::{debug, warn};

/// Default window size when no frame size is known
pub const DEFAULT_WINDOW_WIDTH: u32 = 1920;
pub const DEFAULT_WINDOW_HEIGHT: u32 = 1080;

/// Screen-space rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    fn right(&self) -> i64 {
        self.x as i64 + self.width as i64
    }

    fn bottom(&self) -> i64 {
        self.y as i64 + self.height as i64
    }

    /// Area shared with another rectangle
    pub fn overlap_area(&self, other: &Rect) -> u64 {
        let w = self.right().min(other.right()) - (self.x as i64).max(other.x as i64);
        let h = self.bottom().min(other.bottom()) - (self.y as i64).max(other.y as i64);
        if w <= 0 || h <= 0 {
            0
        } else {
            (w * h) as u64
        }
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

/// Attached monitor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Monitor {
    pub name: String,
    /// Position and current video mode size
    pub area: Rect,
}

/// Keys the viewer reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    F2,
    F5,
    KeypadAdd,
    KeypadSubtract,
    KeypadEnter,
    C,
    Other,
}

/// Window and input collaborator, driven from the render thread
pub trait Display {
    /// Drawable surface size in pixels
    fn surface_size(&self) -> (u32, u32);

    /// Process pending window events and return key presses
    fn poll_events(&mut self) -> Vec<Key>;

    fn should_close(&self) -> bool;

    fn set_should_close(&mut self, close: bool);

    fn window_rect(&self) -> Rect;

    fn set_window_rect(&mut self, rect: Rect);

    /// Toggle between a decorated window and a borderless always-on-top one
    fn set_decorated_floating(&mut self, decorated: bool);

    fn monitors(&self) -> Vec<Monitor>;

    /// Swap buffers; may block until the next refresh
    fn present(&mut self) -> Result<()>;
}

/// Pick the monitor sharing the largest area with the window
///
/// Returns `None` when the window lies entirely off-screen.
pub fn pick_monitor<'a>(window: &Rect, monitors: &'a [Monitor]) -> Option<&'a Monitor> {
    let mut best: Option<(&Monitor, u64)> = None;

    for monitor in monitors {
        let overlap = window.overlap_area(&monitor.area);
        if overlap == 0 {
            continue;
        }
        if best.map_or(true, |(_, area)| overlap > area) {
            best = Some((monitor, overlap));
        }
    }

    best.map(|(monitor, _)| monitor)
}

/// User-controlled view settings owned by the render loop
#[derive(Debug, Clone)]
pub struct ViewState {
    pub brightness: f32,
    pub brightness_step: f32,
    /// Clear the background each frame (blending disabled)
    pub clear: bool,
    fullscreen: bool,
    saved_position: Option<(i32, i32)>,
}

impl ViewState {
    pub fn new(brightness_step: f32) -> Self {
        Self {
            brightness: 1.0,
            brightness_step,
            clear: true,
            fullscreen: false,
            saved_position: None,
        }
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    /// Apply one key press
    ///
    /// `frame_size` is the current source size, used to restore the window
    /// when leaving fullscreen.
    pub fn handle_key<D: Display + ?Sized>(
        &mut self,
        key: Key,
        display: &mut D,
        frame_size: Option<(u32, u32)>,
    ) {
        match key {
            Key::F2 => self.toggle_fullscreen(display, frame_size),
            Key::F5 => display.set_should_close(true),
            Key::KeypadAdd => self.brightness += self.brightness_step,
            Key::KeypadSubtract => self.brightness -= self.brightness_step,
            Key::KeypadEnter => self.brightness = 1.0,
            Key::C => self.clear = !self.clear,
            Key::Other => {}
        }
    }

    pub fn toggle_fullscreen<D: Display + ?Sized>(
        &mut self,
        display: &mut D,
        frame_size: Option<(u32, u32)>,
    ) {
        if self.fullscreen {
            self.exit_fullscreen(display, frame_size);
        } else {
            self.enter_fullscreen(display);
        }
    }

    fn enter_fullscreen<D: Display + ?Sized>(&mut self, display: &mut D) {
        let window = display.window_rect();
        let monitors = display.monitors();

        let Some(monitor) = pick_monitor(&window, &monitors) else {
            warn!("Window {} is not on any monitor, staying windowed", window);
            return;
        };

        debug!("Entering fullscreen on {} ({})", monitor.name, monitor.area);
        self.saved_position = Some((window.x, window.y));
        display.set_decorated_floating(false);
        display.set_window_rect(monitor.area);
        self.fullscreen = true;
    }

    fn exit_fullscreen<D: Display + ?Sized>(&mut self, display: &mut D, frame_size: Option<(u32, u32)>) {
        display.set_decorated_floating(true);

        let (width, height) = frame_size.unwrap_or((DEFAULT_WINDOW_WIDTH, DEFAULT_WINDOW_HEIGHT));
        let (x, y) = self.saved_position.take().unwrap_or((0, 0));
        display.set_window_rect(Rect::new(x, y, width, height));

        debug!("Left fullscreen, window restored to {}x{}", width, height);
        self.fullscreen = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monitor(name: &str, x: i32, y: i32) -> Monitor {
        Monitor {
            name: name.into(),
            area: Rect::new(x, y, 1920, 1080),
        }
    }

    #[test]
    fn test_overlap_area() {
        let a = Rect::new(0, 0, 100, 100);
        assert_eq!(a.overlap_area(&Rect::new(50, 50, 100, 100)), 2500);
        assert_eq!(a.overlap_area(&Rect::new(100, 0, 100, 100)), 0);
        assert_eq!(a.overlap_area(&Rect::new(-10, -10, 400, 400)), 10_000);
    }

    #[test]
    fn test_pick_monitor_largest_overlap() {
        let monitors = [monitor("left", 0, 0), monitor("right", 1920, 0)];

        let window = Rect::new(1800, 100, 800, 600);
        assert_eq!(pick_monitor(&window, &monitors).unwrap().name, "right");

        let window = Rect::new(1500, 100, 800, 600);
        assert_eq!(pick_monitor(&window, &monitors).unwrap().name, "left");
    }

    #[test]
    fn test_pick_monitor_window_above_monitor() {
        // Window straddling the top edge still counts
        let monitors = [monitor("main", 0, 0)];
        let window = Rect::new(100, -200, 800, 600);
        assert_eq!(pick_monitor(&window, &monitors).unwrap().name, "main");
    }

    #[test]
    fn test_pick_monitor_off_screen() {
        let monitors = [monitor("main", 0, 0)];
        assert!(pick_monitor(&Rect::new(5000, 5000, 10, 10), &monitors).is_none());
        assert!(pick_monitor(&Rect::new(0, 0, 10, 10), &[]).is_none());
    }
}
