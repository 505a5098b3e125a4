pub mod classify;
pub mod game;
pub mod session;
pub mod terminal;
pub mod transport;

pub use classify::{classify, ClassifyContext, GameLoopState, Transition};
pub use game::{GameController, GameError, GameExit, WaitTimer};
pub use session::{AuthError, LoginOutcome, Session, SessionEvent, SessionManager};
pub use terminal::Terminal;
pub use transport::{GameService, HttpGameService, RpcError};

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
