// ABOUTME: In-process RoutingOps double holding a single path rewrite.
// ABOUTME: Records every update so tests can assert the routing side effects of a command.

use async_trait::async_trait;
use parking_lot::Mutex;

use super::RoutingOps;
use super::error::RoutingError;

#[derive(Debug, Default)]
pub struct MemoryRouting {
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    rewrite: Option<String>,
    updates: Vec<String>,
    unavailable: bool,
}

impl MemoryRouting {
    pub fn new(rewrite: Option<&str>) -> Self {
        Self {
            state: Mutex::new(State {
                rewrite: rewrite.map(str::to_string),
                ..State::default()
            }),
        }
    }

    /// Make every call fail, as if gcloud were missing.
    pub fn unavailable() -> Self {
        Self {
            state: Mutex::new(State {
                unavailable: true,
                ..State::default()
            }),
        }
    }

    pub fn rewrite(&self) -> Option<String> {
        self.state.lock().rewrite.clone()
    }

    /// Every path written through `set_rewrite`, in order.
    pub fn updates(&self) -> Vec<String> {
        self.state.lock().updates.clone()
    }

    fn check(&self, operation: &str) -> Result<(), RoutingError> {
        if self.state.lock().unavailable {
            return Err(RoutingError::CommandFailed {
                operation: operation.to_string(),
                message: "routing backend unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RoutingOps for MemoryRouting {
    async fn current_rewrite(&self) -> Result<Option<String>, RoutingError> {
        self.check("describe")?;
        Ok(self.rewrite())
    }

    async fn set_rewrite(&self, path: &str) -> Result<(), RoutingError> {
        self.check("update")?;
        let mut state = self.state.lock();
        state.rewrite = Some(path.to_string());
        state.updates.push(path.to_string());
        Ok(())
    }
}
