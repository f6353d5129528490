use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc::Sender,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::playlist::{Command, ControlEvent};

pub fn map_key(key: KeyEvent) -> Option<Command> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    match key.code {
        KeyCode::Char(' ') => Some(Command::TogglePause),
        KeyCode::Char('+') | KeyCode::Char('n') | KeyCode::Right => Some(Command::Next),
        KeyCode::Char('-') | KeyCode::Char('N') | KeyCode::Left => Some(Command::Previous),
        KeyCode::Char('s') => Some(Command::Shuffle),
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Command::Quit),
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => Some(Command::Quit),
        _ => None,
    }
}

/// Background thread turning terminal key presses into control events.
/// Stopped and joined on drop.
pub struct KeyReader {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl KeyReader {
    pub fn spawn(tx: Sender<ControlEvent>, poll_interval: Duration) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let handle = thread::spawn(move || {
            while !flag.load(Ordering::Relaxed) {
                match event::poll(poll_interval) {
                    Ok(true) => match event::read() {
                        Ok(Event::Key(key)) => {
                            let Some(command) = map_key(key) else {
                                continue;
                            };
                            tracing::debug!(?command, "key");
                            if tx.send(ControlEvent::Command(command)).is_err() {
                                break;
                            }
                        }
                        Ok(_) => {}
                        Err(err) => {
                            tracing::warn!(%err, "reading terminal event failed");
                            thread::sleep(poll_interval);
                        }
                    },
                    Ok(false) => {}
                    Err(err) => {
                        tracing::warn!(%err, "polling terminal events failed");
                        thread::sleep(poll_interval);
                    }
                }
            }
        });
        KeyReader {
            stop,
            handle: Some(handle),
        }
    }
}

impl Drop for KeyReader {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn bindings() {
        assert_eq!(map_key(press(KeyCode::Char(' '))), Some(Command::TogglePause));
        for code in [KeyCode::Char('+'), KeyCode::Char('n'), KeyCode::Right] {
            assert_eq!(map_key(press(code)), Some(Command::Next));
        }
        for code in [KeyCode::Char('-'), KeyCode::Char('N'), KeyCode::Left] {
            assert_eq!(map_key(press(code)), Some(Command::Previous));
        }
        assert_eq!(map_key(press(KeyCode::Char('s'))), Some(Command::Shuffle));
        for code in [KeyCode::Char('q'), KeyCode::Char('Q'), KeyCode::Esc] {
            assert_eq!(map_key(press(code)), Some(Command::Quit));
        }
        assert_eq!(
            map_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(Command::Quit)
        );
        assert_eq!(map_key(press(KeyCode::Char('x'))), None);
        assert_eq!(map_key(press(KeyCode::Char('c'))), None);
    }

    #[test]
    fn releases_are_ignored() {
        let release = KeyEvent {
            code: KeyCode::Char(' '),
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        };
        assert_eq!(map_key(release), None);
    }
}
