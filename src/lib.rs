pub mod cli;
pub mod clock;
pub mod commands;
pub mod debugger;
pub mod expr;
pub mod keyboard;
pub mod loader;
pub mod machine;
pub mod runtime;
pub mod symbols;

use std::fmt;

use clock::Clock;
use debugger::DebugRuntime;
use machine::MachineState;
use symbols::SymbolTable;

pub use cli::Configuration;

#[derive(Debug)]
pub enum StartupError {
    Load(loader::LoadError),
    Symbols(symbols::SymbolError),
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartupError::Load(err) => write!(f, "{}", err),
            StartupError::Symbols(err) => write!(f, "{}", err),
        }
    }
}

impl From<loader::LoadError> for StartupError {
    fn from(err: loader::LoadError) -> Self {
        StartupError::Load(err)
    }
}

impl From<symbols::SymbolError> for StartupError {
    fn from(err: symbols::SymbolError) -> Self {
        StartupError::Symbols(err)
    }
}

/// Boots a machine from `config` and runs it to completion, dispatching to
/// the debug runtime or the default runtime depending on `config.debug`.
pub fn run(config: Configuration) -> Result<(), StartupError> {
    let program = loader::load_program(&config.binary_path)?;
    let clock = Clock::new();
    let mut state = MachineState::get_initial_state(&clock);
    state.memory[..program.len()].copy_from_slice(&program);

    if config.debug {
        let symbols = match &config.symbols_path {
            Some(path) => SymbolTable::load(path)?,
            None => SymbolTable::empty(),
        };
        let mut debugger = DebugRuntime::new(symbols);
        debugger.run(&mut state).expect("debugger I/O failed");
    } else {
        runtime::run_default(&mut state, config.clock_frequency_khz).expect("runtime I/O failed");
    }

    Ok(())
}
