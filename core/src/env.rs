//! Where the controller runs, which decides whether it performs I/O.

/// Execution environment of a hook instance.
///
/// `Server` is a render-only context: calls mark themselves loading and
/// settle immediately without touching the network.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Browser,
    Server,
}

impl Environment {
    pub fn is_browser(&self) -> bool {
        matches!(self, Environment::Browser)
    }

    pub fn is_server(&self) -> bool {
        matches!(self, Environment::Server)
    }
}
