use std::io::{self, Write};

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};

use crate::apply::{ApplyObserver, ConflictPrompt, OverwriteMode};

/// Prints progress lines and answers conflict prompts from the keyboard.
pub struct TerminalObserver {
    interactive: bool,
    /// Answer used when nobody can be asked.
    fallback: OverwriteMode,
}

impl TerminalObserver {
    pub fn new(interactive: bool, fallback: OverwriteMode) -> Self {
        Self {
            interactive,
            fallback,
        }
    }
}

impl ApplyObserver for TerminalObserver {
    fn progress(&mut self, step: &str, current: usize, total: usize) {
        println!("[{current}/{total}] {step}");
    }

    fn conflicts(&mut self, prompt: ConflictPrompt) {
        eprintln!("{} output file(s) already exist:", prompt.conflicts().len());
        for c in prompt.conflicts() {
            eprintln!("  {}", c.file_name);
        }

        if !self.interactive {
            log::info!("no terminal, resolving conflicts with {:?}", self.fallback);
            prompt.resolve(self.fallback);
            return;
        }

        match read_choice() {
            Ok(mode) => prompt.resolve(mode),
            Err(e) => {
                log::warn!("could not read conflict answer: {e}");
                prompt.cancel();
            }
        }
    }
}

/// Map a key to a resolution; `Ask` means cancel.
pub fn choice_for_key(code: KeyCode, modifiers: KeyModifiers) -> OverwriteMode {
    if modifiers.contains(KeyModifiers::CONTROL) {
        return OverwriteMode::Ask;
    }
    match code {
        KeyCode::Char('o') | KeyCode::Char('O') => OverwriteMode::Overwrite,
        KeyCode::Char('s') | KeyCode::Char('S') => OverwriteMode::Skip,
        _ => OverwriteMode::Ask,
    }
}

fn read_choice() -> io::Result<OverwriteMode> {
    eprint!("[o]verwrite, [s]kip, any other key cancels: ");
    io::stderr().flush()?;

    enable_raw_mode()?;
    let key = loop {
        match event::read() {
            Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => break Ok(key),
            Ok(_) => continue,
            Err(e) => break Err(e),
        }
    };
    // Always leave raw mode, even when the read failed.
    disable_raw_mode()?;
    eprintln!();

    let key = key?;
    Ok(choice_for_key(key.code, key.modifiers))
}
