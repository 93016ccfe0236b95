use crossterm::event::KeyEvent;
use kup_io::InstallEvent;

/// Messages driving the main event loop.
pub enum Msg {
    Key(KeyEvent),
    Resize,
    Tick,
    Install(InstallEvent),
}
