// Configuration loaded from the environment and the state built from it

pub mod environment;
pub mod state;

pub use environment::EnvironmentVariables;
pub use state::AppState;
