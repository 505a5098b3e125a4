use anyhow::Result;
use async_trait::async_trait;

/// The interactive surface the menu and game loop talk to.
///
/// `read_line` is raced against session events, so implementations must be
/// cancel safe: dropping the future before it resolves must not lose input
/// that was already read.
#[async_trait]
pub trait Terminal: Send {
    fn show(&mut self, line: &str);

    fn clear(&mut self) {}

    /// Prompts and waits for one line. `Ok(None)` means input is closed.
    async fn read_line(&mut self, prompt: &str) -> Result<Option<String>>;
}
