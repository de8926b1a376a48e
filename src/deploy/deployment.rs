// ABOUTME: Generic deployment struct parameterized by state.
// ABOUTME: Holds the resolved config and the warnings collected along the way.

use crate::config::Config;
use crate::diagnostics::Diagnostics;

use super::state::{Cleared, Compressed, Configured, Named, Target, Uploaded, Verified};

/// A deployment in progress, parameterized by its current state.
///
/// Transitions consume the deployment, so a release cannot be uploaded
/// before its version was checked for conflicts.
#[derive(Debug)]
pub struct Deployment<S> {
    pub(crate) config: Config,
    pub(crate) diag: Diagnostics,
    pub(crate) state: S,
}

impl Deployment<Configured> {
    pub fn new(config: Config) -> Self {
        Deployment {
            config,
            diag: Diagnostics::default(),
            state: Configured,
        }
    }
}

impl<S> Deployment<S> {
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Warnings collected so far.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diag
    }

    /// Move to the next state, building it from the current one.
    pub(crate) fn advance<T>(self, next: impl FnOnce(S) -> T) -> Deployment<T> {
        Deployment {
            config: self.config,
            diag: self.diag,
            state: next(self.state),
        }
    }
}

impl Deployment<Named> {
    pub fn target(&self) -> &Target {
        &self.state.target
    }
}

impl Deployment<Cleared> {
    pub fn target(&self) -> &Target {
        &self.state.target
    }
}

impl Deployment<Compressed> {
    pub fn target(&self) -> &Target {
        &self.state.target
    }

    /// Number of gzip intermediates written.
    pub fn compressed(&self) -> usize {
        self.state.compressed.len()
    }
}

impl Deployment<Uploaded> {
    pub fn target(&self) -> &Target {
        &self.state.target
    }
}

impl Deployment<Verified> {
    pub fn target(&self) -> &Target {
        &self.state.target
    }
}
