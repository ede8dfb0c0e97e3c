// Background keyboard reader feeding a one-byte memory-mapped slot. The shape
// mirrors original_source/src/keyboard-input/keyboard-input.c almost exactly:
// a pthread there becomes a std::thread here, and the termios dance to unblock
// the reader on teardown (VMIN/VTIME -> 0) is reproduced verbatim because none
// of the higher-level terminal crates in the pack expose that knob.

use libc::termios;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

pub struct KeyboardPort {
    slot: Arc<Mutex<u8>>,
    active: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
    original_termios: Option<termios>,
}

impl KeyboardPort {
    pub fn new() -> Self {
        KeyboardPort {
            slot: Arc::new(Mutex::new(0)),
            active: Arc::new(AtomicBool::new(false)),
            reader: None,
            original_termios: None,
        }
    }

    /// Switches stdin to raw, no-echo mode and launches the background reader.
    pub fn start_character_input(&mut self) {
        if self.reader.is_some() {
            return;
        }

        unsafe {
            let mut original: termios = std::mem::zeroed();
            if libc::tcgetattr(libc::STDIN_FILENO, &mut original) == 0 {
                self.original_termios = Some(original);
                let mut raw = original;
                raw.c_lflag &= !(libc::ICANON | libc::ECHO);
                raw.c_cc[libc::VMIN] = 1;
                raw.c_cc[libc::VTIME] = 0;
                libc::tcsetattr(libc::STDIN_FILENO, libc::TCSANOW, &raw);
            }
        }

        self.active.store(true, Ordering::SeqCst);
        let slot = Arc::clone(&self.slot);
        let active = Arc::clone(&self.active);
        self.reader = Some(thread::spawn(move || {
            read_loop(slot, active);
        }));
    }

    /// Unblocks and joins the reader, then restores cooked, echoing mode.
    pub fn end_character_input(&mut self) {
        self.active.store(false, Ordering::SeqCst);

        unsafe {
            let mut attr: termios = std::mem::zeroed();
            if libc::tcgetattr(libc::STDIN_FILENO, &mut attr) == 0 {
                attr.c_cc[libc::VMIN] = 0;
                attr.c_cc[libc::VTIME] = 0;
                libc::tcsetattr(libc::STDIN_FILENO, libc::TCSANOW, &attr);
            }
        }

        if let Some(handle) = self.reader.take() {
            let _ = handle.join();
        }

        unsafe {
            if let Some(original) = self.original_termios.take() {
                libc::tcsetattr(libc::STDIN_FILENO, libc::TCSANOW, &original);
            }
        }
    }

    /// Reads and zeroes the latched byte.
    pub fn get_last_char(&self) -> u8 {
        let mut guard = self.slot.lock().unwrap();
        let value = *guard;
        *guard = 0;
        value
    }

    /// Reads the latched byte without clearing it.
    pub fn peek_last_char(&self) -> u8 {
        *self.slot.lock().unwrap()
    }

    /// Latches a byte as if the reader thread had just received it. Exists
    /// for driving the port from tests without a real terminal attached.
    pub fn simulate_keypress(&self, byte: u8) {
        *self.slot.lock().unwrap() = byte;
    }
}

impl Default for KeyboardPort {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for KeyboardPort {
    fn drop(&mut self) {
        if self.reader.is_some() {
            self.end_character_input();
        }
    }
}

fn read_loop(slot: Arc<Mutex<u8>>, active: Arc<AtomicBool>) {
    let mut byte: u8 = 0;
    while active.load(Ordering::SeqCst) {
        let n = unsafe {
            libc::read(
                libc::STDIN_FILENO,
                &mut byte as *mut u8 as *mut libc::c_void,
                1,
            )
        };
        if n > 0 {
            let mut guard = slot.lock().unwrap();
            *guard = byte;
        } else if n < 0 {
            // Transient read error: clear it and keep polling, mirroring the
            // source's clearerr(stdin) recovery.
            let _ = io::Error::last_os_error();
        }
    }
}
